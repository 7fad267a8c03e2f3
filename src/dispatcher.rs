//! C6: NETCONF Dispatcher.
//!
//! Top-level request walker: attaches and scrubs the `username` attribute,
//! iterates `<rpc>` children in document order, routes each to a built-in
//! decoder or the YANG-declared-RPC fallback, and assembles one `<rpc-reply>`
//! from the per-child fragments. Grounded on
//! `original_source/apps/netconf/netconf_rpc.c`'s `netconf_rpc_dispatch` and
//! `netconf_application_rpc`.

use async_trait::async_trait;
use log::{debug, warn};

use crate::backend::BackendTransport;
use crate::error::{EngineError, RpcError};
use crate::operations::{self, DecodedOperation, YangRpcDecoded};
use crate::schema::SchemaIndex;
use crate::session::{CloseSessionCounter, Session};
use crate::tree::XmlNode;
use crate::validate;
use crate::filter;

/// A local, client-side plugin consulted before a YANG-declared RPC is
/// forwarded to the backend (spec.md §4.3: "first consult local client-side
/// plugins (they may produce a full reply); if none handle it, forward to
/// the backend"). Returning `None` means "not handled here, forward it."
#[async_trait]
pub trait LocalRpcHandler: Send {
    async fn try_handle(&mut self, decoded: &YangRpcDecoded) -> Option<XmlNode>;
}

/// A [`LocalRpcHandler`] that never handles anything, for callers with no
/// local plugins registered.
pub struct NoLocalHandlers;

#[async_trait]
impl LocalRpcHandler for NoLocalHandlers {
    async fn try_handle(&mut self, _decoded: &YangRpcDecoded) -> Option<XmlNode> {
        None
    }
}

/// Dispatch one `<rpc>` element. `rpc` is mutated in place: a `username`
/// attribute is attached before processing and unconditionally removed
/// before this function returns, on every path including a fatal error, so
/// the caller's tree never carries it across a `dispatch` call (spec.md §8's
/// "Username scrub" invariant).
///
/// `Err` is only ever [`EngineError::Fatal`] — per-request protocol and
/// backend errors are folded into `<rpc-error>` fragments in the returned
/// reply rather than propagated, per spec.md §7's three-class disposition.
///
/// `close_sessions` is the host-wide `<close-session>` tally (spec.md §3's
/// "Session counters", grounded on the original's `cc_closed`); it is bumped
/// once per dispatched `<close-session>` child, independent of `session`'s
/// own per-session `Open`/`Closing` transition.
pub async fn dispatch(
    rpc: &mut XmlNode,
    session: &mut Session,
    index: &SchemaIndex,
    transport: &mut dyn BackendTransport,
    local: &mut dyn LocalRpcHandler,
    close_sessions: &CloseSessionCounter,
) -> Result<XmlNode, EngineError> {
    if let Some(username) = session.username.clone() {
        rpc.set_attr("username", username);
    }
    let result = dispatch_children(rpc, session, index, transport, local, close_sessions).await;
    rpc.remove_attr("username");
    result
}

async fn dispatch_children(
    rpc: &XmlNode,
    session: &mut Session,
    index: &SchemaIndex,
    transport: &mut dyn BackendTransport,
    local: &mut dyn LocalRpcHandler,
    close_sessions: &CloseSessionCounter,
) -> Result<XmlNode, EngineError> {
    let mut reply = XmlNode::new("rpc-reply");
    if let Some(message_id) = rpc.attr("message-id") {
        reply.set_attr("message-id", message_id.to_string());
    }

    for child in &rpc.children {
        let fragments = match operations::decode_builtin(child) {
            Some(Ok(decoded)) => {
                let operation_name = decoded.operation_name();
                session.observe_operation(operation_name);
                if operation_name == "close-session" {
                    close_sessions.increment();
                }
                dispatch_builtin(decoded, transport).await?
            }
            Some(Err(err)) => {
                debug!("rejected {}: {}/{}", child.name, err.error_type, err.tag);
                vec![err.to_xml()]
            }
            None => dispatch_yang_rpc(child, index, transport, local).await?,
        };
        for fragment in fragments {
            reply.push_child(fragment);
        }
    }

    Ok(reply)
}

/// Unwrap a backend `<rpc-reply>` envelope into the fragments to splice into
/// the dispatcher's own aggregate reply; a backend reply that is not itself
/// wrapped in `<rpc-reply>` is used as a single fragment verbatim.
fn backend_fragments(reply: XmlNode) -> Vec<XmlNode> {
    if reply.name == "rpc-reply" {
        reply.children
    } else {
        vec![reply]
    }
}

async fn dispatch_builtin(
    decoded: DecodedOperation,
    transport: &mut dyn BackendTransport,
) -> Result<Vec<XmlNode>, EngineError> {
    let get_filter = match &decoded {
        DecodedOperation::GetConfig { filter, .. } | DecodedOperation::Get { filter, .. } => {
            filter.clone()
        }
        _ => None,
    };

    let backend_reply = transport.call(decoded.request()).await?;
    let mut fragments = backend_fragments(backend_reply);

    if matches!(decoded, DecodedOperation::GetConfig { .. } | DecodedOperation::Get { .. }) {
        for fragment in &mut fragments {
            if fragment.name == "data" {
                if let Err(err) = filter::apply_get_filter(get_filter.as_ref(), fragment) {
                    return Ok(vec![err.to_xml()]);
                }
            }
        }
    }

    Ok(fragments)
}

async fn dispatch_yang_rpc(
    child: &XmlNode,
    index: &SchemaIndex,
    transport: &mut dyn BackendTransport,
    local: &mut dyn LocalRpcHandler,
) -> Result<Vec<XmlNode>, EngineError> {
    let decoded = match operations::decode_yang_rpc(child, index) {
        Ok(decoded) => decoded,
        Err(errors) => return Ok(errors.into_iter().map(|e| e.to_xml()).collect()),
    };

    let fragments = match local.try_handle(&decoded).await {
        Some(reply) => backend_fragments(reply),
        None => {
            let backend_reply = transport.call(&decoded.request).await?;
            backend_fragments(backend_reply)
        }
    };

    if let Some(output) = &decoded.output_schema {
        for fragment in &fragments {
            let populated = validate::populate(fragment, output);
            let errors = validate::validate(&populated, output, false);
            if !errors.is_empty() {
                // Outbound validation is advisory: log and forward the
                // backend's answer unchanged (spec.md §7, §4.3).
                warn!(
                    "output validation failed for {}.{}: {} error(s)",
                    decoded.module_name,
                    decoded.rpc_name,
                    errors.len()
                );
            }
        }
    }

    Ok(fragments)
}
