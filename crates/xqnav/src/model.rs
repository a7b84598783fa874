use core::cmp::Ordering;
use core::fmt;

use crate::xdm::XdmAtomicValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
    Namespace,
}

impl NodeKind {
    /// Attribute and namespace nodes hang off an element but are never its children.
    pub fn is_attribute_like(self) -> bool {
        matches!(self, NodeKind::Attribute | NodeKind::Namespace)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::Document => "document-node()",
            NodeKind::Element => "element()",
            NodeKind::Attribute => "attribute()",
            NodeKind::Text => "text()",
            NodeKind::Comment => "comment()",
            NodeKind::ProcessingInstruction => "processing-instruction()",
            NodeKind::Namespace => "namespace-node()",
        })
    }
}

/// Qualified name. Equality used by name tests compares `(ns_uri, local)` only, see
/// [`QName::matches`]; the derived `PartialEq` also compares the prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub ns_uri: Option<String>,
}

impl QName {
    pub fn local(local: impl Into<String>) -> Self {
        Self { prefix: None, local: local.into(), ns_uri: None }
    }

    pub fn with_ns(prefix: Option<&str>, local: impl Into<String>, ns_uri: impl Into<String>) -> Self {
        let ns: String = ns_uri.into();
        Self {
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
            local: local.into(),
            ns_uri: if ns.is_empty() { None } else { Some(ns) },
        }
    }

    /// Prefix-insensitive comparison.
    pub fn matches(&self, other: &QName) -> bool {
        self.local == other.local && self.ns_uri == other.ns_uri
    }

    pub fn prefix_str(&self) -> &str {
        self.prefix.as_deref().unwrap_or("")
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix.as_deref() {
            Some(p) if !p.is_empty() => write!(f, "{}:{}", p, self.local),
            _ => f.write_str(&self.local),
        }
    }
}

/// Position of a node in the global document order.
///
/// `tree` orders unrelated trees by creation, `rank` is the pre-order rank inside a tree
/// (element, its namespace nodes, its attributes, then its children).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderKey {
    pub tree: u64,
    pub rank: u32,
}

/// Adapter trait over an immutable node tree.
///
/// Implementors provide structure and an order key; axis navigation, document order and
/// the set operators are generic over this trait. The sibling and first/last child
/// helpers have scanning defaults that arena-backed trees override with O(1) lookups.
pub trait XdmNode: Clone + Eq + fmt::Debug + Send + Sync + 'static {
    type Children<'a>: Iterator<Item = Self> + Send + 'a
    where
        Self: 'a;
    type Attributes<'a>: Iterator<Item = Self> + Send + 'a
    where
        Self: 'a;
    type Namespaces<'a>: Iterator<Item = Self> + Send + 'a
    where
        Self: 'a;

    fn kind(&self) -> NodeKind;
    fn name(&self) -> Option<QName>;
    fn string_value(&self) -> String;

    /// Typed value without schema information.
    fn typed_value(&self) -> Vec<XdmAtomicValue> {
        match self.kind() {
            NodeKind::Document | NodeKind::Element | NodeKind::Attribute | NodeKind::Text => {
                vec![XdmAtomicValue::UntypedAtomic(self.string_value())]
            }
            NodeKind::Comment | NodeKind::ProcessingInstruction | NodeKind::Namespace => {
                vec![XdmAtomicValue::String(self.string_value())]
            }
        }
    }

    fn parent(&self) -> Option<Self>;
    fn children(&self) -> Self::Children<'_>;
    fn attributes(&self) -> Self::Attributes<'_>;
    fn namespaces(&self) -> Self::Namespaces<'_>;

    fn order_key(&self) -> OrderKey;

    fn compare_document_order(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }

    fn first_child(&self) -> Option<Self> {
        self.children().next()
    }

    fn last_child(&self) -> Option<Self> {
        self.children().last()
    }

    fn next_sibling(&self) -> Option<Self> {
        if self.kind().is_attribute_like() {
            return None;
        }
        let parent = self.parent()?;
        let mut it = parent.children();
        it.by_ref().find(|c| c == self)?;
        it.next()
    }

    fn previous_sibling(&self) -> Option<Self> {
        if self.kind().is_attribute_like() {
            return None;
        }
        let parent = self.parent()?;
        let mut prev = None;
        for c in parent.children() {
            if &c == self {
                return prev;
            }
            prev = Some(c);
        }
        None
    }

    fn attributes_vec(&self) -> Vec<Self>
    where
        Self: Sized,
    {
        self.attributes().collect()
    }

    fn namespaces_vec(&self) -> Vec<Self>
    where
        Self: Sized,
    {
        self.namespaces().collect()
    }
}
