//! Shared error and result types.
//!
//! The NETCONF error vocabulary (error-tag/error-type/severity, RFC 6241
//! §4.3) is a first-class return value, not a side channel: most decoders in
//! [`crate::operations`] produce an [`RpcError`] directly rather than
//! propagating an exception. [`EngineError`] exists for the smaller set of
//! call sites that can also fail fatally (I/O, frame corruption).

use std::fmt;
use std::io;

use crate::tree::XmlNode;

/// `error-type` per RFC 6241 §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Transport,
    Rpc,
    Protocol,
    Application,
}

impl ErrorType {
    fn as_str(self) -> &'static str {
        match self {
            ErrorType::Transport => "transport",
            ErrorType::Rpc => "rpc",
            ErrorType::Protocol => "protocol",
            // Note: the original clixon source spells this "applicatio" in
            // two call sites. That is a bug (spec.md §9); we always emit the
            // correct spelling.
            ErrorType::Application => "application",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `error-severity` per RFC 6241 §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        })
    }
}

/// A single `<rpc-error>` element.
#[derive(Debug, Clone)]
pub struct RpcError {
    pub tag: &'static str,
    pub error_type: ErrorType,
    pub severity: Severity,
    pub message: Option<String>,
    /// Rendered as `<error-info>`. Most call sites only ever need a single
    /// `<bad-element>` child, so this carries that case directly; anything
    /// richer can be built by hand and attached via [`RpcError::with_info_xml`].
    pub bad_element: Option<String>,
    pub info_text: Option<String>,
}

impl RpcError {
    pub fn new(tag: &'static str, error_type: ErrorType) -> RpcError {
        RpcError {
            tag,
            error_type,
            severity: Severity::Error,
            message: None,
            bad_element: None,
            info_text: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> RpcError {
        self.message = Some(message.into());
        self
    }

    pub fn with_bad_element(mut self, name: impl Into<String>) -> RpcError {
        self.bad_element = Some(name.into());
        self
    }

    pub fn with_info_text(mut self, text: impl Into<String>) -> RpcError {
        self.info_text = Some(text.into());
        self
    }

    /// `missing-element` / protocol, with `<bad-element>`.
    pub fn missing_element(bad_element: impl Into<String>) -> RpcError {
        RpcError::new("missing-element", ErrorType::Protocol).with_bad_element(bad_element)
    }

    /// `invalid-value` / protocol.
    pub fn invalid_value() -> RpcError {
        RpcError::new("invalid-value", ErrorType::Protocol)
    }

    /// `operation-not-supported` / protocol.
    pub fn operation_not_supported() -> RpcError {
        RpcError::new("operation-not-supported", ErrorType::Protocol)
    }

    /// `operation-failed` / application, with a message.
    pub fn operation_failed_application(message: impl Into<String>) -> RpcError {
        RpcError::new("operation-failed", ErrorType::Application).with_message(message)
    }

    /// `operation-failed` / rpc, with a message.
    pub fn operation_failed_rpc(message: impl Into<String>) -> RpcError {
        RpcError::new("operation-failed", ErrorType::Rpc).with_message(message)
    }

    /// `access-denied` / protocol.
    pub fn access_denied(message: impl Into<String>) -> RpcError {
        RpcError::new("access-denied", ErrorType::Protocol).with_message(message)
    }

    /// `data-not-unique` / application.
    pub fn data_not_unique(key: impl Into<String>) -> RpcError {
        RpcError::new("data-not-unique", ErrorType::Application).with_bad_element(key)
    }

    /// `unknown-element` / application.
    pub fn unknown_element(name: impl Into<String>) -> RpcError {
        RpcError::new("unknown-element", ErrorType::Application).with_bad_element(name)
    }

    /// Render as an `<rpc-error>` XML tree.
    pub fn to_xml(&self) -> XmlNode {
        let mut node = XmlNode::new("rpc-error");
        node.push_child(XmlNode::with_text("error-tag", self.tag));
        node.push_child(XmlNode::with_text(
            "error-type",
            self.error_type.as_str(),
        ));
        node.push_child(XmlNode::with_text("error-severity", self.severity.to_string()));
        if let Some(message) = &self.message {
            node.push_child(XmlNode::with_text("error-message", message.clone()));
        }
        if self.bad_element.is_some() || self.info_text.is_some() {
            let mut info = XmlNode::new("error-info");
            if let Some(bad_element) = &self.bad_element {
                info.push_child(XmlNode::with_text("bad-element", bad_element.clone()));
            }
            if let Some(text) = &self.info_text {
                info.set_text(text.clone());
            }
            node.push_child(info);
        }
        node
    }
}

/// spec.md §7's class 3 (unrecoverable I/O: `ESHUTDOWN`-equivalent
/// conditions, malformed frames). Classes 1 and 2 (per-request protocol
/// rejections, backend-reported `<rpc-error>`s) never propagate as
/// exceptions in this engine — they are [`RpcError`] values returned
/// directly by the decoders in [`crate::operations`], or XML fragments
/// surfaced verbatim by [`crate::dispatcher`]/[`crate::restconf`] — so
/// `EngineError` only ever carries the fatal case.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Unrecoverable I/O. Aborts the current request, closes the session,
    /// and signals the host to exit its read loop.
    #[error("fatal I/O error: {0}")]
    Fatal(#[from] io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
