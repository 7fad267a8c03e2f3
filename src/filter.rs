//! Shared `<filter>` handling for `get-config` and `get` (spec.md §4.3).
//!
//! The original C source duplicates this block verbatim between
//! `netconf_get_config` and `netconf_get` (`original_source/apps/netconf/netconf_rpc.c`);
//! `SPEC_FULL.md` §F.2 calls for deduplicating it into one helper without
//! changing observable behavior, which is what this module is.
//!
//! Policy: `xpath` filters (the default when `type` is absent) are forwarded
//! to the backend verbatim and never touched again here — pruning only
//! happens for `type="subtree"`, applied to the `<data>` the backend
//! returned.

use crate::error::RpcError;
use crate::tree::XmlNode;

/// Apply the subtree-filter compatibility shim to a backend reply's `<data>`
/// subtree, in place. No-op for an absent filter or `type="xpath"` (the
/// xpath expression was already forwarded verbatim in the request). Returns
/// `operation-failed`/application on an unsupported filter type, or on a
/// subtree/data root name mismatch or failed prune.
pub fn apply_get_filter(filter: Option<&XmlNode>, data: &mut XmlNode) -> Result<(), RpcError> {
    let filter_type = filter.and_then(|f| f.attr("type"));
    match filter_type {
        None | Some("xpath") => Ok(()),
        Some("subtree") => {
            let filter = filter.expect("filter_type came from filter.and_then above");
            let Some(filter_conf) = filter.find_descendant("configuration") else {
                // No `<configuration>` selector present: nothing to prune
                // against, forward the data as-is (matches the original's
                // `xfilterconf` being NULL skipping the whole block).
                return Ok(());
            };
            if filter_conf.name != data.name {
                return Err(RpcError::operation_failed_application("").with_info_text("filtering"));
            }
            match prune_subtree(filter_conf, data) {
                Some(pruned) => {
                    *data = pruned;
                    Ok(())
                }
                None => Err(RpcError::operation_failed_application("").with_info_text("filtering")),
            }
        }
        Some(_) => Err(RpcError::operation_failed_application("filter type not supported")
            .with_info_text("type")),
    }
}

/// Reject a `<filter>` whose `type` attribute is neither absent, `xpath`,
/// nor `subtree`, before any backend round-trip is attempted. Used by
/// `get`/`get-config` decoding; `create-subscription` has its own, stricter
/// xpath-only rule and does not use this helper.
pub fn check_filter_type(filter: Option<&XmlNode>) -> Result<(), RpcError> {
    match filter.and_then(|f| f.attr("type")) {
        None | Some("xpath") | Some("subtree") => Ok(()),
        Some(_) => Err(RpcError::operation_failed_application("filter type not supported")
            .with_info_text("type")),
    }
}

/// Recursively intersect `data` with `filter` by element name: a filter node
/// with no children selects its matching data node and everything beneath
/// it unchanged; a filter node with children recurses, keeping only data
/// children whose name also appears among the filter's children.
pub fn prune_subtree(filter: &XmlNode, data: &XmlNode) -> Option<XmlNode> {
    if filter.name != data.name {
        return None;
    }
    if filter.children.is_empty() {
        return Some(data.clone());
    }
    let mut result = data.clone();
    result.children.clear();
    for child in &data.children {
        if let Some(filter_child) = filter.children.iter().find(|f| f.name == child.name) {
            if let Some(pruned_child) = prune_subtree(filter_child, child) {
                result.children.push(pruned_child);
            }
        }
    }
    Some(result)
}
