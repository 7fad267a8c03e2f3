//! C2: Payload Validator.
//!
//! Two passes over a subtree rooted at an RPC input/output node (spec.md
//! §4.2): populate attaches schema and fills in leaf defaults, validate
//! checks mandatory presence, list key uniqueness, leaf type parsing, and
//! choice/case disjointness. Errors accumulate into a `Vec<RpcError>`; an
//! empty vector means success, matching clixon's `xml_yang_validate_all_top`
//! / `xml_yang_validate_add` pair in
//! `original_source/apps/netconf/netconf_rpc.c`.

use std::collections::HashSet;

use crate::error::RpcError;
use crate::schema::{Keyword, SchemaNode};
use crate::tree::XmlNode;

/// Populate pass: returns a copy of `node` with leaf defaults filled in from
/// `schema` wherever the element body is absent. Children are matched to
/// their schema node by name; elements with no matching schema child are
/// left as-is (strict-mode rejection of unknown elements happens in the
/// validate pass, not here, since populate must not lose data clixon would
/// still forward to the backend).
pub fn populate(node: &XmlNode, schema: &SchemaNode) -> XmlNode {
    let mut result = node.clone();
    for child in &mut result.children {
        if let Some(child_schema) = schema.find_data_child(&child.name) {
            if child.text().is_none() {
                if let Some(default) = &child_schema.flags.default {
                    child.set_text(default.clone());
                }
            }
            *child = populate(child, child_schema);
        }
    }
    result
}

impl SchemaNode {
    /// A data-definition child matching `name`, searching through
    /// transparent `choice`/`case` wrappers the way a populated XML
    /// document never names explicitly.
    fn find_data_child(&self, name: &str) -> Option<&SchemaNode> {
        for child in &self.children {
            if child.is_data_node() && child.argument == name {
                return Some(child);
            }
            if matches!(child.keyword, Keyword::Choice | Keyword::Case) {
                if let Some(found) = child.find_data_child(name) {
                    return Some(found);
                }
            }
        }
        None
    }
}

/// Validate pass: checks mandatory presence, list key uniqueness, leaf type
/// parsing, and choice/case disjointness. Strict mode additionally rejects
/// unrecognized children with `unknown-element`.
pub fn validate(node: &XmlNode, schema: &SchemaNode, strict: bool) -> Vec<RpcError> {
    let mut errors = Vec::new();
    validate_into(node, schema, strict, &mut errors);
    errors
}

fn validate_into(node: &XmlNode, schema: &SchemaNode, strict: bool, errors: &mut Vec<RpcError>) {
    // (a) mandatory children present.
    for data_def in all_data_definitions(schema) {
        if data_def.flags.mandatory && node.child(&data_def.argument).is_none() {
            errors.push(RpcError::missing_element(data_def.argument.clone()));
        }
    }

    // (d) choice/case disjointness: at most one case's children present
    // among a choice's children.
    for choice in schema.find_all(Keyword::Choice) {
        let mut present_case: Option<&str> = None;
        for case in choice.find_all(Keyword::Case) {
            let has_any = case
                .children
                .iter()
                .any(|member| node.child(&member.argument).is_some());
            if has_any {
                if let Some(first) = present_case {
                    if first != case.argument.as_str() {
                        errors.push(
                            RpcError::invalid_value()
                                .with_message(format!("multiple cases present for choice {}", choice.argument)),
                        );
                    }
                } else {
                    present_case = Some(case.argument.as_str());
                }
            }
        }
    }

    // `validate_list_keys` itself rescans every same-named entry under
    // `node`, so it must run exactly once per distinct list regardless of
    // how many entries that list has — otherwise an N-entry list re-reports
    // each duplicate N times as this loop visits entry after entry.
    let mut checked_lists: HashSet<&str> = HashSet::new();
    for child in &node.children {
        match schema.find_data_child(&child.name) {
            Some(child_schema) => {
                if child_schema.keyword == Keyword::Leaf {
                    validate_leaf(child, child_schema, errors);
                }
                if child_schema.keyword == Keyword::List && checked_lists.insert(child.name.as_str()) {
                    validate_list_keys(node, child.name.as_str(), child_schema, errors);
                }
                validate_into(child, child_schema, strict, errors);
            }
            None if strict => {
                errors.push(RpcError::unknown_element(child.name.clone()));
            }
            None => {}
        }
    }
}

fn all_data_definitions(schema: &SchemaNode) -> Vec<&SchemaNode> {
    let mut result = Vec::new();
    collect_data_definitions(schema, &mut result);
    result
}

fn collect_data_definitions<'a>(schema: &'a SchemaNode, out: &mut Vec<&'a SchemaNode>) {
    for child in &schema.children {
        if child.is_data_node() {
            out.push(child);
        } else if matches!(child.keyword, Keyword::Choice | Keyword::Case) {
            collect_data_definitions(child, out);
        }
    }
}

fn validate_leaf(node: &XmlNode, schema: &SchemaNode, errors: &mut Vec<RpcError>) {
    let body = node.body();
    if body.is_empty() {
        return;
    }
    let type_name = schema.flags.type_name.as_deref().unwrap_or("string");
    if !leaf_value_parses(type_name, body) {
        errors.push(
            RpcError::invalid_value()
                .with_bad_element(node.name.clone())
                .with_message(format!("value does not match type {}", type_name)),
        );
    }
}

/// Minimal structural type check for the built-in YANG primitive types the
/// decoders actually encounter. A full YANG type system (ranges, patterns,
/// derived types, identityref resolution, ...) is out of scope — the
/// grammar parser that built `schema` is assumed to have already validated
/// the type definition itself.
fn leaf_value_parses(type_name: &str, value: &str) -> bool {
    match type_name {
        "boolean" => value == "true" || value == "false",
        "int8" => value.parse::<i8>().is_ok(),
        "int16" => value.parse::<i16>().is_ok(),
        "int32" => value.parse::<i32>().is_ok(),
        "int64" => value.parse::<i64>().is_ok(),
        "uint8" => value.parse::<u8>().is_ok(),
        "uint16" => value.parse::<u16>().is_ok(),
        "uint32" => value.parse::<u32>().is_ok(),
        "uint64" => value.parse::<u64>().is_ok(),
        _ => true,
    }
}

fn validate_list_keys(
    parent: &XmlNode,
    list_name: &str,
    schema: &SchemaNode,
    errors: &mut Vec<RpcError>,
) {
    let mut seen: HashSet<Vec<Option<String>>> = HashSet::new();
    for entry in parent.children_named(list_name) {
        let mut missing_key = false;
        let mut key_values = Vec::with_capacity(schema.flags.keys.len());
        for key in &schema.flags.keys {
            let value = entry.child(key).map(|n| n.body().to_string());
            if value.is_none() {
                missing_key = true;
                errors.push(RpcError::missing_element(key.clone()));
            }
            key_values.push(value);
        }
        if missing_key {
            continue;
        }
        if !seen.insert(key_values.clone()) {
            errors.push(RpcError::data_not_unique(schema.flags.keys.join(",")));
        }
    }
}
