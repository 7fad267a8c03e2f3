//! C3: Operation Decoder.
//!
//! One decoder per built-in NETCONF operation, grounded on the per-tag
//! functions in `original_source/apps/netconf/netconf_rpc.c`
//! (`netconf_get_config`, `netconf_edit_config`, ...). Decoding only: each
//! function turns an `<rpc>` child element into a [`DecodedOperation`] ready
//! to forward, or an [`RpcError`] to return directly without touching the
//! backend. The actual backend round-trip, YANG-RPC output validation, and
//! local-plugin hook live in [`crate::dispatcher`], which owns the backend
//! channel.

use crate::error::RpcError;
use crate::filter;
use crate::options::{EditOptions, ErrorOption, Operation as EditOperation, TestOption};
use crate::schema::{Keyword, ModuleLookupError, SchemaIndex, SchemaNode};
use crate::tree::XmlNode;
use crate::validate;

/// The datastore named by a `<source>`/`<target>` wrapper's single child
/// element, e.g. `<source><running/></source>` -> `"running"`. Mirrors the
/// original's `netconf_get_target`, which does not care which keyword is
/// there — callers that need a specific one (`edit-config` wants
/// `candidate`, `delete-config` rejects `running`) check the returned name
/// themselves.
fn target_name<'a>(wrapper: Option<&'a XmlNode>) -> Option<&'a str> {
    wrapper.and_then(|w| w.children.first()).map(|c| c.name.as_str())
}

/// One decoded and pre-validated operation, ready to forward to the
/// backend. Carries the operation element to forward (cloned out of the
/// `<rpc>` tree) plus whatever the dispatcher needs to post-process the
/// reply.
#[derive(Debug, Clone)]
pub enum DecodedOperation {
    GetConfig { request: XmlNode, filter: Option<XmlNode> },
    Get { request: XmlNode, filter: Option<XmlNode> },
    EditConfig { request: XmlNode, options: EditOptions },
    CopyConfig { request: XmlNode },
    DeleteConfig { request: XmlNode },
    Lock { request: XmlNode },
    Unlock { request: XmlNode },
    Validate { request: XmlNode },
    Commit { request: XmlNode },
    DiscardChanges { request: XmlNode },
    CloseSession { request: XmlNode },
    KillSession { request: XmlNode },
    CreateSubscription { request: XmlNode },
}

impl DecodedOperation {
    /// The NETCONF element name this was decoded from, for session state
    /// transitions (`close-session`) and logging.
    pub fn operation_name(&self) -> &'static str {
        match self {
            DecodedOperation::GetConfig { .. } => "get-config",
            DecodedOperation::Get { .. } => "get",
            DecodedOperation::EditConfig { .. } => "edit-config",
            DecodedOperation::CopyConfig { .. } => "copy-config",
            DecodedOperation::DeleteConfig { .. } => "delete-config",
            DecodedOperation::Lock { .. } => "lock",
            DecodedOperation::Unlock { .. } => "unlock",
            DecodedOperation::Validate { .. } => "validate",
            DecodedOperation::Commit { .. } => "commit",
            DecodedOperation::DiscardChanges { .. } => "discard-changes",
            DecodedOperation::CloseSession { .. } => "close-session",
            DecodedOperation::KillSession { .. } => "kill-session",
            DecodedOperation::CreateSubscription { .. } => "create-subscription",
        }
    }

    /// The element to forward to the backend as the request body.
    pub fn request(&self) -> &XmlNode {
        match self {
            DecodedOperation::GetConfig { request, .. }
            | DecodedOperation::Get { request, .. }
            | DecodedOperation::EditConfig { request, .. }
            | DecodedOperation::CopyConfig { request }
            | DecodedOperation::DeleteConfig { request }
            | DecodedOperation::Lock { request }
            | DecodedOperation::Unlock { request }
            | DecodedOperation::Validate { request }
            | DecodedOperation::Commit { request }
            | DecodedOperation::DiscardChanges { request }
            | DecodedOperation::CloseSession { request }
            | DecodedOperation::KillSession { request }
            | DecodedOperation::CreateSubscription { request } => request,
        }
    }
}

/// Decode a built-in operation by element name. Returns `None` for anything
/// not in the built-in set, so the caller can fall through to the
/// YANG-declared-RPC path ([`decode_yang_rpc`]).
pub fn decode_builtin(xe: &XmlNode) -> Option<Result<DecodedOperation, RpcError>> {
    Some(match xe.name.as_str() {
        "get-config" => decode_get_config(xe),
        "get" => decode_get(xe),
        "edit-config" => decode_edit_config(xe),
        "copy-config" => decode_copy_config(xe),
        "delete-config" => decode_delete_config(xe),
        "lock" => decode_lock_or_unlock(xe),
        "unlock" => decode_lock_or_unlock(xe),
        "validate" => decode_validate(xe),
        "commit" => Ok(DecodedOperation::Commit { request: xe.clone() }),
        "discard-changes" => Ok(DecodedOperation::DiscardChanges { request: xe.clone() }),
        "close-session" => Ok(DecodedOperation::CloseSession { request: xe.clone() }),
        "kill-session" => decode_kill_session(xe),
        "create-subscription" => decode_create_subscription(xe),
        _ => return None,
    })
}

fn decode_get_config(xe: &XmlNode) -> Result<DecodedOperation, RpcError> {
    if target_name(xe.child("source")).is_none() {
        return Err(RpcError::missing_element("source"));
    }
    let filter = xe.child("filter").cloned();
    filter::check_filter_type(filter.as_ref())?;
    Ok(DecodedOperation::GetConfig { request: xe.clone(), filter })
}

fn decode_get(xe: &XmlNode) -> Result<DecodedOperation, RpcError> {
    let filter = xe.child("filter").cloned();
    filter::check_filter_type(filter.as_ref())?;
    Ok(DecodedOperation::Get { request: xe.clone(), filter })
}

fn decode_edit_config(xe: &XmlNode) -> Result<DecodedOperation, RpcError> {
    if target_name(xe.child("target")) != Some("candidate") {
        return Err(RpcError::missing_element("target"));
    }
    // CLIXON addition: `<filter type="restconf" select="...">` passes
    // through unexamined; any other type is rejected outright.
    if let Some(filter) = xe.child("filter") {
        match filter.attr("type") {
            None | Some("restconf") => {}
            Some(_) => return Err(RpcError::invalid_value()),
        }
    }
    let operation = match xe.child("default-operation") {
        Some(n) => EditOperation::parse(n.body()).ok_or_else(RpcError::invalid_value)?,
        None => EditOperation::default(),
    };
    let test_option = match xe.child("test-option") {
        Some(n) => TestOption::parse(n.body()).ok_or_else(RpcError::invalid_value)?,
        None => TestOption::default(),
    };
    let error_option = match xe.child("error-option") {
        Some(n) => ErrorOption::parse(n.body()).ok_or_else(RpcError::invalid_value)?,
        None => ErrorOption::default(),
    };
    let options = EditOptions { operation, test_option, error_option };
    if !options.is_supported() {
        return Err(RpcError::operation_not_supported());
    }
    Ok(DecodedOperation::EditConfig { request: xe.clone(), options })
}

fn decode_copy_config(xe: &XmlNode) -> Result<DecodedOperation, RpcError> {
    if target_name(xe.child("source")).is_none() {
        return Err(RpcError::missing_element("source"));
    }
    if target_name(xe.child("target")).is_none() {
        return Err(RpcError::missing_element("target"));
    }
    Ok(DecodedOperation::CopyConfig { request: xe.clone() })
}

fn decode_delete_config(xe: &XmlNode) -> Result<DecodedOperation, RpcError> {
    match target_name(xe.child("target")) {
        None | Some("running") => Err(RpcError::missing_element("target")),
        Some(_) => Ok(DecodedOperation::DeleteConfig { request: xe.clone() }),
    }
}

fn decode_lock_or_unlock(xe: &XmlNode) -> Result<DecodedOperation, RpcError> {
    if target_name(xe.child("target")).is_none() {
        return Err(RpcError::missing_element("target"));
    }
    Ok(if xe.name == "unlock" {
        DecodedOperation::Unlock { request: xe.clone() }
    } else {
        DecodedOperation::Lock { request: xe.clone() }
    })
}

/// `netconf_validate` checks for `<source>` but, in the original, reports
/// the missing element as `target` regardless — spec.md §9's first Open
/// Question preserves this as observed behavior rather than "fixing" it.
fn decode_validate(xe: &XmlNode) -> Result<DecodedOperation, RpcError> {
    if target_name(xe.child("source")).is_none() {
        return Err(RpcError::missing_element("target"));
    }
    Ok(DecodedOperation::Validate { request: xe.clone() })
}

fn decode_kill_session(xe: &XmlNode) -> Result<DecodedOperation, RpcError> {
    if xe.find_descendant("session-id").is_none() {
        return Err(RpcError::missing_element("session-id"));
    }
    Ok(DecodedOperation::KillSession { request: xe.clone() })
}

fn decode_create_subscription(xe: &XmlNode) -> Result<DecodedOperation, RpcError> {
    if let Some(filter) = xe.find_descendant("filter") {
        if let Some(ftype) = filter.attr("type") {
            if ftype != "xpath" {
                return Err(RpcError::operation_failed_application(
                    "only xpath filter type supported",
                )
                .with_info_text("type"));
            }
        }
    }
    Ok(DecodedOperation::CreateSubscription { request: xe.clone() })
}

/// A YANG-declared RPC resolved against the schema index: the module and
/// RPC name (for error messages and logging), the input-populated-and-
/// validated request ready to forward, and the output schema (if any) the
/// dispatcher must validate the backend's reply against.
#[derive(Debug, Clone)]
pub struct YangRpcDecoded {
    pub module_name: String,
    pub rpc_name: String,
    pub request: XmlNode,
    pub output_schema: Option<SchemaNode>,
}

/// Resolve and input-validate a YANG-declared RPC fallback (spec.md §4.3's
/// "YANG-declared RPCs" paragraph). `Err` carries the accumulated
/// `<rpc-error>` set to return directly without a backend call.
pub fn decode_yang_rpc(xe: &XmlNode, index: &SchemaIndex) -> Result<YangRpcDecoded, Vec<RpcError>> {
    let module = match index.module_by_xml(xe, None) {
        Ok(module) => module,
        Err(ModuleLookupError::MissingNamespace) | Err(ModuleLookupError::UnknownElement) => {
            return Err(vec![RpcError::operation_failed_rpc(xe.name.clone())
                .with_info_text("Not recognized module")]);
        }
    };
    let Some(rpc) = module.find(Keyword::Rpc, Some(xe.name.as_str())) else {
        return Err(vec![RpcError::operation_failed_rpc(xe.name.clone())
            .with_info_text("Not recognized")]);
    };

    let mut request = xe.clone();
    if let Some(input) = rpc.find(Keyword::Input, None) {
        request = validate::populate(&request, input);
        let errors = validate::validate(&request, input, true);
        if !errors.is_empty() {
            return Err(errors);
        }
    }

    let output_schema = rpc.find(Keyword::Output, None).cloned();
    Ok(YangRpcDecoded {
        module_name: module.argument.clone(),
        rpc_name: xe.name.clone(),
        request,
        output_schema,
    })
}
