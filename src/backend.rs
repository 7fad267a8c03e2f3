//! C4: Backend Channel.
//!
//! A length-delimited framing over an abstract async transport, generalizing
//! the teacher's synchronous `transport::Transport` trait
//! (`read_xml`/`write_xml` over a NETCONF `]]>]]>`-delimited stream) to the
//! internal backend wire, which `spec.md` §4.4 specifies as a length-delimited
//! envelope rather than client-facing NETCONF framing.
//!
//! `call` is the unary request/reply pairing used by every built-in
//! operation except `create-subscription`: send one frame, block for
//! exactly one frame back. For `create-subscription`, the dispatcher calls
//! `call` like any other operation to get the `<rpc-reply>`, then — if it
//! carries no `<rpc-error>` — hands the same transport to
//! [`crate::subscription::Worker`], which keeps reading `<notification>`
//! frames off of it with `recv_notification` (spec.md §4.4: "the same
//! socket remains readable for asynchronous `<notification>` frames").

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::EngineError;
use crate::tree::XmlNode;

/// A backend connection: one unary call plus, for the lifetime of an open
/// subscription, a notification read loop over the same connection.
#[async_trait]
pub trait BackendTransport: Send {
    /// Send `request` as one frame and block for exactly one frame back.
    /// Any closure before a full reply frame arrives is fatal — unlike
    /// [`BackendTransport::recv_notification`], a unary call always expects
    /// a reply.
    async fn call(&mut self, request: &XmlNode) -> Result<XmlNode, EngineError>;

    /// Read the next `<notification>` frame. `Ok(None)` means the backend
    /// closed the connection cleanly at a frame boundary (upstream closure,
    /// spec.md §5); a partial frame is still fatal.
    async fn recv_notification(&mut self) -> Result<Option<XmlNode>, EngineError>;
}

/// Outcome of attempting to read one length-delimited frame.
enum FrameRead {
    Frame(Vec<u8>),
    /// Clean EOF exactly at a frame boundary.
    Eof,
    /// EOF in the middle of a length prefix or body — a corrupt/truncated
    /// connection, always fatal.
    Truncated,
}

async fn read_frame<R: AsyncRead + Unpin + Send>(stream: &mut R) -> std::io::Result<FrameRead> {
    let mut len_buf = [0u8; 4];
    let mut read = 0;
    while read < len_buf.len() {
        let n = stream.read(&mut len_buf[read..]).await?;
        if n == 0 {
            return Ok(if read == 0 { FrameRead::Eof } else { FrameRead::Truncated });
        }
        read += n;
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut body = vec![0u8; len];
    let mut read = 0;
    while read < len {
        let n = stream.read(&mut body[read..]).await?;
        if n == 0 {
            return Ok(FrameRead::Truncated);
        }
        read += n;
    }
    Ok(FrameRead::Frame(body))
}

async fn write_frame<W: AsyncWrite + Unpin + Send>(stream: &mut W, body: &str) -> std::io::Result<()> {
    let len = (body.len() as u32).to_be_bytes();
    stream.write_all(&len).await?;
    stream.write_all(body.as_bytes()).await?;
    stream.flush().await
}

fn fatal_eof(context: &str) -> EngineError {
    EngineError::Fatal(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        format!("backend connection closed {context}"),
    ))
}

fn parse_frame(bytes: Vec<u8>) -> Result<XmlNode, EngineError> {
    let text = String::from_utf8(bytes).map_err(|e| {
        EngineError::Fatal(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    })?;
    XmlNode::parse(&text)
}

/// A [`BackendTransport`] over any async duplex stream (a Unix domain
/// socket in production; an in-memory duplex in tests).
pub struct FramedBackendTransport<S> {
    stream: S,
}

impl<S> FramedBackendTransport<S> {
    pub fn new(stream: S) -> FramedBackendTransport<S> {
        FramedBackendTransport { stream }
    }
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Unpin + Send> BackendTransport for FramedBackendTransport<S> {
    async fn call(&mut self, request: &XmlNode) -> Result<XmlNode, EngineError> {
        write_frame(&mut self.stream, &request.to_xml_string())
            .await
            .map_err(EngineError::Fatal)?;
        match read_frame(&mut self.stream).await.map_err(EngineError::Fatal)? {
            FrameRead::Frame(bytes) => parse_frame(bytes),
            FrameRead::Eof | FrameRead::Truncated => Err(fatal_eof("before a reply was received")),
        }
    }

    async fn recv_notification(&mut self) -> Result<Option<XmlNode>, EngineError> {
        match read_frame(&mut self.stream).await.map_err(EngineError::Fatal)? {
            FrameRead::Frame(bytes) => Ok(Some(parse_frame(bytes)?)),
            FrameRead::Eof => Ok(None),
            FrameRead::Truncated => Err(fatal_eof("mid-frame while awaiting a notification")),
        }
    }
}
