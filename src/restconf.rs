//! C7: RESTCONF Stream Gateway.
//!
//! Maps `GET /<streampath>/<stream-name>` to a backend `<create-subscription>`
//! and, on success, wires a [`crate::subscription`] worker to relay
//! notifications as SSE. Grounded on
//! `original_source/apps/restconf/restconf_stream.c` (`api_stream`,
//! `restconf_stream`).

use async_trait::async_trait;

use crate::backend::BackendTransport;
use crate::config::EngineConfig;
use crate::error::RpcError;
use crate::subscription::{ClientSink, SubscriptionRegistry};
use crate::tree::XmlNode;
use std::sync::Arc;

const EVENT_RFC5277_NAMESPACE: &str = "urn:ietf:params:xml:ns:netconf:notification:1.0";

/// A parsed, valid stream request: the stream name plus the recognized
/// query-string keys. Anything else about the HTTP request (headers, method)
/// is the host's concern.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub stream_name: String,
    pub start_time: Option<String>,
    pub stop_time: Option<String>,
    pub filter: Option<String>,
}

/// Why a stream request was rejected before any backend call was attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRequestError {
    /// Path did not split into exactly `["", streampath, name]`, or the
    /// first segment was non-empty, or the second did not match
    /// `streampath`.
    NotFound,
}

/// Parse `path` (e.g. `/streams/NETCONF`) against the configured
/// `streampath` (e.g. `streams`), and `query` (the raw query string, already
/// percent-decoded by the host) into recognized keys. Spec.md §4.7: "path
/// must split into exactly `["", streampath, stream-name]`" — any other
/// shape is a 404, not a structured error, since an attacker should not be
/// able to distinguish "wrong path shape" from "no such resource."
pub fn parse_stream_request(
    path: &str,
    streampath: &str,
    query: &str,
) -> Result<StreamRequest, StreamRequestError> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() != 3 {
        return Err(StreamRequestError::NotFound);
    }
    if !segments[0].is_empty() || segments[1] != streampath {
        return Err(StreamRequestError::NotFound);
    }
    let stream_name = segments[2].to_string();
    if stream_name.is_empty() {
        return Err(StreamRequestError::NotFound);
    }

    let mut start_time = None;
    let mut stop_time = None;
    let mut filter = None;
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        match key {
            "start-time" => start_time = Some(value.to_string()),
            "stop-time" => stop_time = Some(value.to_string()),
            "filter" => filter = Some(value.to_string()),
            _ => {}
        }
    }

    Ok(StreamRequest { stream_name, start_time, stop_time, filter })
}

/// Build the `<rpc><create-subscription xmlns="...">...</create-subscription></rpc>`
/// tree the request translates to (spec.md §F.7/§F.8's supplemented
/// `<stream>` child and RFC 5277 namespace).
pub fn build_subscription_request(request: &StreamRequest) -> XmlNode {
    let mut create_subscription =
        XmlNode::new("create-subscription").with_namespace(EVENT_RFC5277_NAMESPACE);
    create_subscription.push_child(XmlNode::with_text("stream", request.stream_name.clone()));
    if let Some(start_time) = &request.start_time {
        create_subscription.push_child(XmlNode::with_text("startTime", start_time.clone()));
    }
    if let Some(stop_time) = &request.stop_time {
        create_subscription.push_child(XmlNode::with_text("stopTime", stop_time.clone()));
    }
    if let Some(filter) = &request.filter {
        create_subscription.push_child(XmlNode::with_text("filter", filter.clone()));
    }

    let mut rpc = XmlNode::new("rpc");
    rpc.push_child(create_subscription);
    rpc
}

/// The exact 201 header block from spec.md §4.7, in order.
pub const SUCCESS_HEADERS: &[(&str, &str)] = &[
    ("Content-Type", "text/event-stream"),
    ("Cache-Control", "no-cache"),
    ("Connection", "keep-alive"),
    ("X-Accel-Buffering", "no"),
];

/// Host-side authentication outcome, supplied by the external auth plugin
/// chain (spec.md §6: "consumed, not implemented here").
pub enum AuthOutcome {
    Authenticated { username: Option<String> },
    Unauthenticated,
}

/// What to do with an opened stream request, once authenticated and the
/// backend has accepted the subscription.
pub enum StreamOutcome {
    /// `401`/`404`/error-document path: nothing was opened.
    Rejected(RpcError),
    /// `201 Created`: the SSE body follows on `client`, fed by a worker
    /// wired to `transport`.
    Opened { subscription_id: u64 },
}

/// Drive one stream request end to end: authenticate, translate the query
/// into `<create-subscription>`, call the backend, and on success hand the
/// transport + client sink to the subscription registry (spawning a task
/// when `config.stream_tasks`, matching `STREAM_FORK`; otherwise the caller
/// is expected to `await` the worker inline via
/// [`crate::subscription::run`] directly instead of calling this function,
/// since an inline run blocks the calling connection for the stream's
/// lifetime exactly as the original's non-`STREAM_FORK` branch does).
pub async fn open_stream(
    request: &StreamRequest,
    auth: AuthOutcome,
    mut transport: Box<dyn BackendTransport>,
    client: Box<dyn ClientSink>,
    config: &EngineConfig,
    registry: &Arc<SubscriptionRegistry>,
) -> StreamOutcome {
    let username = match auth {
        AuthOutcome::Unauthenticated => {
            return StreamOutcome::Rejected(RpcError::access_denied("not authenticated"));
        }
        // Authenticated with no username: placeholder per spec.md §4.7.
        AuthOutcome::Authenticated { username } => username.unwrap_or_else(|| "none".to_string()),
    };

    // Attach the username to the outbound rpc for backend attribution,
    // mirroring dispatcher::dispatch's own username-attach step.
    let mut rpc = build_subscription_request(request);
    rpc.set_attr("username", username);
    let reply = match transport.call(&rpc).await {
        Ok(reply) => reply,
        Err(_fatal) => {
            // The backend channel itself failed (fatal I/O, spec.md §7 class
            // 3) rather than replying with an `<rpc-error>` — there is no
            // RpcError to surface verbatim, so fall back to a synthesized one.
            return StreamOutcome::Rejected(RpcError::operation_failed_application(
                "backend unavailable",
            ));
        }
    };

    if let Some(error) = reply.find_descendant("rpc-error") {
        return StreamOutcome::Rejected(rpc_error_from_xml(error));
    }

    if config.stream_tasks {
        let id = registry.spawn(transport, client, config.restconf_pretty);
        StreamOutcome::Opened { subscription_id: id }
    } else {
        crate::subscription::run(transport, client, config.restconf_pretty).await;
        StreamOutcome::Opened { subscription_id: 0 }
    }
}

/// Reconstruct an [`RpcError`]-shaped summary from a backend-returned
/// `<rpc-error>` element, for the "backend rejects create-subscription"
/// path (spec.md §7: "error document, no fork"). Only the tag and message
/// are preserved; the full element is still what actually reaches the
/// client as the error body.
fn rpc_error_from_xml(error: &XmlNode) -> RpcError {
    let message = error
        .child("error-message")
        .map(|n| n.body().to_string())
        .unwrap_or_default();
    RpcError::operation_failed_application(message)
}
