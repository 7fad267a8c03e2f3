//! C1: Schema Index.
//!
//! Holds an already-populated YANG schema tree (the grammar parser that
//! produces it is out of scope — spec.md §1) and answers the three
//! questions the rest of the engine needs: which module owns an element,
//! what child a parent statement has under a given keyword, and whether a
//! node is a data/data-definition/schema node per RFC 7950 §3.
//!
//! Grounded on `original_source/lib/clixon/clixon_yang.h`'s `yang_stmt`
//! keyword enum (`Y_MODULE`, `Y_CONTAINER`, `Y_RPC`, `Y_INPUT`, ...) and
//! `yang_find`/`ys_module_by_xml`.

use crate::tree::XmlNode;

/// YANG statement keywords relevant to RPC/config validation. Not
/// exhaustive of RFC 7950's full statement set — only the ones the engine
/// needs to classify or look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Module,
    Container,
    Leaf,
    LeafList,
    List,
    Choice,
    Case,
    Rpc,
    Input,
    Output,
    Notification,
    Type,
    Key,
    Mandatory,
    Default,
}

/// A node in the schema tree (Y in spec.md §3).
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub keyword: Keyword,
    pub argument: String,
    /// For `module` nodes: the namespace URI declared by its `namespace`
    /// statement. Unused for every other keyword.
    pub namespace: Option<String>,
    pub children: Vec<SchemaNode>,
    pub flags: SchemaFlags,
}

/// Per-node flags the validator consults — mandatory-ness, list keys, the
/// declared type name, and any `default` value.
#[derive(Debug, Clone, Default)]
pub struct SchemaFlags {
    pub mandatory: bool,
    /// For `list` nodes: the key leaf names, in declared order.
    pub keys: Vec<String>,
    /// For `leaf`/`leaf-list` nodes: the declared type name.
    pub type_name: Option<String>,
    /// For `leaf` nodes: the `default` statement's argument, if any.
    pub default: Option<String>,
}

impl SchemaNode {
    pub fn new(keyword: Keyword, argument: impl Into<String>) -> SchemaNode {
        SchemaNode {
            keyword,
            argument: argument.into(),
            namespace: None,
            children: Vec::new(),
            flags: SchemaFlags::default(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> SchemaNode {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_children(mut self, children: Vec<SchemaNode>) -> SchemaNode {
        self.children = children;
        self
    }

    pub fn with_flags(mut self, flags: SchemaFlags) -> SchemaNode {
        self.flags = flags;
        self
    }

    /// Find the first child matching `keyword`, and `argument` by byte
    /// equality when given; an empty/`None` argument matches the first
    /// child with that keyword (mirrors clixon's `yang_find`, which treats
    /// a `NULL` argument as "don't care").
    pub fn find(&self, keyword: Keyword, argument: Option<&str>) -> Option<&SchemaNode> {
        self.children.iter().find(|c| {
            c.keyword == keyword
                && match argument {
                    Some(arg) if !arg.is_empty() => c.argument == arg,
                    _ => true,
                }
        })
    }

    pub fn find_all(&self, keyword: Keyword) -> impl Iterator<Item = &SchemaNode> {
        self.children.iter().filter(move |c| c.keyword == keyword)
    }

    /// RFC 7950 §3: container, leaf, leaf-list, list, anydata, anyxml
    /// (anydata/anyxml are not modeled here, since no decoder needs them).
    pub fn is_data_node(&self) -> bool {
        matches!(
            self.keyword,
            Keyword::Container | Keyword::Leaf | Keyword::LeafList | Keyword::List
        )
    }

    /// RFC 7950 §3: data nodes, plus choice/case, which structure data nodes
    /// without being one themselves. `augment`/`uses` are also
    /// data-definition statements in the RFC grammar, but they are resolution
    /// directives of the (out-of-scope, spec.md §1) YANG grammar parser: by
    /// the time a populated `SchemaNode` tree reaches this engine, `uses`
    /// expansions and `augment` targets are already inlined at their
    /// resolved location, so no decoder ever needs to recognize either
    /// keyword here.
    pub fn is_data_definition(&self) -> bool {
        self.is_data_node() || matches!(self.keyword, Keyword::Choice | Keyword::Case)
    }

    /// RFC 7950 §3: data definitions plus rpc/notification/input/output —
    /// anything that can appear in the schema tree as a structural node.
    pub fn is_schema_node(&self) -> bool {
        self.is_data_definition()
            || matches!(
                self.keyword,
                Keyword::Rpc | Keyword::Input | Keyword::Output | Keyword::Notification
            )
    }
}

/// Whether an unmatched namespace falls back to insertion order (compat
/// shim) or is a hard failure. See spec.md §4.1 tie-break rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceStrictness {
    Strict,
    NonStrict,
}

/// The root of the schema tree: a pseudo-node whose children are modules.
pub struct SchemaIndex {
    root: SchemaNode,
    /// namespace URI -> index into `root.children`, populated alongside the
    /// module list so `module_by_xml` doesn't need a linear namespace scan.
    namespace_index: Vec<(String, usize)>,
    strictness: NamespaceStrictness,
}

/// Failure modes for [`SchemaIndex::module_by_xml`], per spec.md §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleLookupError {
    MissingNamespace,
    UnknownElement,
}

impl SchemaIndex {
    pub fn new(modules: Vec<SchemaNode>, strictness: NamespaceStrictness) -> SchemaIndex {
        let mut namespace_index = Vec::new();
        let mut root = SchemaNode::new(Keyword::Module, "spec");
        for (i, module) in modules.into_iter().enumerate() {
            if let Some(ns) = module.namespace.clone() {
                namespace_index.push((ns, i));
            }
            root.children.push(module);
        }
        SchemaIndex {
            root,
            namespace_index,
            strictness,
        }
    }

    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    pub fn modules(&self) -> &[SchemaNode] {
        &self.root.children
    }

    fn module_by_namespace(&self, namespace: &str) -> Option<&SchemaNode> {
        self.namespace_index
            .iter()
            .find(|(ns, _)| ns == namespace)
            .map(|(_, i)| &self.root.children[*i])
    }

    fn module_by_name(&self, name: &str) -> Option<&SchemaNode> {
        self.root.children.iter().find(|m| m.argument == name)
    }

    /// Resolve the YANG module that owns `node`, using its own `xmlns` if
    /// present, otherwise the nearest ancestor's default namespace.
    /// `ancestor_namespace` carries that inherited value in since `XmlNode`
    /// does not store parent pointers.
    pub fn module_by_xml(
        &self,
        node: &XmlNode,
        ancestor_namespace: Option<&str>,
    ) -> Result<&SchemaNode, ModuleLookupError> {
        let namespace = node.namespace.as_deref().or(ancestor_namespace);
        match namespace {
            Some(ns) => self
                .module_by_namespace(ns)
                .ok_or(ModuleLookupError::UnknownElement),
            None => {
                if self.strictness == NamespaceStrictness::Strict {
                    Err(ModuleLookupError::MissingNamespace)
                } else {
                    // Compatibility shim: first module declaring a matching
                    // top-level name, else the first module by insertion
                    // order (spec.md §4.1).
                    self.module_by_name(&node.name)
                        .or_else(|| self.root.children.first())
                        .ok_or(ModuleLookupError::UnknownElement)
                }
            }
        }
    }

    /// `find` delegated to the root pseudo-node, for symmetry with
    /// `SchemaNode::find` when callers only have the index.
    pub fn find(&self, keyword: Keyword, argument: Option<&str>) -> Option<&SchemaNode> {
        self.root.find(keyword, argument)
    }
}
