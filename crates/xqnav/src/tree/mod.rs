//! Arena-backed immutable node trees.
//!
//! A [`Tree`] owns all of its nodes in one vector indexed by [`NodeId`]; parent and
//! sibling links are index lookups, so there are no reference cycles. Ids are handed
//! out in document order (element, its namespace nodes, its attributes, its children),
//! which turns document-order comparison into an integer comparison and descendant
//! checks into a range test.
//!
//! ```
//! use xqnav::tree::{doc, elem, text, attr};
//! use xqnav::XdmNode;
//!
//! let document = doc()
//!     .child(elem("root").attr(attr("id", "r")).child(elem("child").child(text("Hello"))))
//!     .build()
//!     .unwrap();
//! let root = document.first_child().unwrap();
//! assert_eq!(root.name().unwrap().local, "root");
//! assert_eq!(root.string_value(), "Hello");
//! ```
mod builder;
mod fluent;

pub use builder::TreeBuilder;
pub use fluent::{NodeBuilder, NodeOrBuilder, attr, attr_ns, comment, doc, elem, elem_ns, ns, pi, text};

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::model::{NodeKind, OrderKey, QName, XdmNode};
use crate::namespaces::InScopeNamespaces;

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

fn next_tree_id() -> u64 {
    NEXT_TREE_ID.fetch_add(1, AtomicOrdering::Relaxed)
}

/// Index of a node inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub(crate) struct NodeData {
    kind: NodeKind,
    name: Option<QName>,
    value: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: Vec<NodeId>,
    namespaces: Vec<NodeId>,
    sibling_index: u32,
    // one past the last id of this node's subtree (attributes and namespaces included)
    subtree_end: u32,
}

impl NodeData {
    fn new(kind: NodeKind, name: Option<QName>, value: Option<String>, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            name,
            value,
            parent,
            children: Vec::new(),
            attributes: Vec::new(),
            namespaces: Vec::new(),
            sibling_index: 0,
            subtree_end: 0,
        }
    }
}

/// An immutable tree. Shared between all of its [`Node`] handles.
#[derive(Debug)]
pub struct Tree {
    id: u64,
    nodes: Vec<NodeData>,
}

impl Tree {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }
}

/// Handle to one node of a [`Tree`]. Cloning is cheap; equality is node identity.
#[derive(Clone)]
pub struct Node {
    tree: Arc<Tree>,
    id: NodeId,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree) && self.id == other.id
    }
}
impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.tree.id.hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.data();
        f.debug_struct("Node")
            .field("tree", &self.tree.id)
            .field("id", &self.id.0)
            .field("kind", &d.kind)
            .field("name", &d.name)
            .field("value", &d.value)
            .finish()
    }
}

impl Node {
    fn new(tree: Arc<Tree>, id: NodeId) -> Self {
        Self { tree, id }
    }

    fn at(&self, id: NodeId) -> Node {
        Node::new(self.tree.clone(), id)
    }

    fn data(&self) -> &NodeData {
        self.tree.data(self.id)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &Arc<Tree> {
        &self.tree
    }

    /// Range test on ids; true only for proper descendants, including attributes and
    /// namespace nodes of descendants and of `self`.
    pub fn is_ancestor_of(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree) && self.id < other.id && other.id.0 < self.data().subtree_end
    }

    /// Complete in-scope namespace set of an element (`xml` implied).
    pub fn in_scope_namespaces(&self) -> InScopeNamespaces {
        crate::namespaces::in_scope_namespaces(self)
    }

    /// Raw value of text, comment, PI, attribute and namespace nodes.
    pub fn value(&self) -> Option<&str> {
        self.data().value.as_deref()
    }
}

/// Iterator over a list of node ids of one tree.
pub struct NodeIter<'a> {
    tree: &'a Arc<Tree>,
    ids: std::slice::Iter<'a, NodeId>,
}

impl Iterator for NodeIter<'_> {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        self.ids.next().map(|id| Node::new(self.tree.clone(), *id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl DoubleEndedIterator for NodeIter<'_> {
    fn next_back(&mut self) -> Option<Node> {
        self.ids.next_back().map(|id| Node::new(self.tree.clone(), *id))
    }
}

impl ExactSizeIterator for NodeIter<'_> {}

impl XdmNode for Node {
    type Children<'a> = NodeIter<'a>;
    type Attributes<'a> = NodeIter<'a>;
    type Namespaces<'a> = NodeIter<'a>;

    fn kind(&self) -> NodeKind {
        self.data().kind
    }

    fn name(&self) -> Option<QName> {
        self.data().name.clone()
    }

    fn string_value(&self) -> String {
        let d = self.data();
        match d.kind {
            NodeKind::Document | NodeKind::Element => {
                // text descendants are exactly the text nodes in the id range of the subtree
                let start = self.id.index() + 1;
                let end = d.subtree_end as usize;
                self.tree.nodes[start..end]
                    .iter()
                    .filter(|n| n.kind == NodeKind::Text)
                    .filter_map(|n| n.value.as_deref())
                    .collect()
            }
            _ => d.value.clone().unwrap_or_default(),
        }
    }

    fn parent(&self) -> Option<Self> {
        self.data().parent.map(|p| self.at(p))
    }

    fn children(&self) -> NodeIter<'_> {
        NodeIter { tree: &self.tree, ids: self.data().children.iter() }
    }

    fn attributes(&self) -> NodeIter<'_> {
        NodeIter { tree: &self.tree, ids: self.data().attributes.iter() }
    }

    fn namespaces(&self) -> NodeIter<'_> {
        NodeIter { tree: &self.tree, ids: self.data().namespaces.iter() }
    }

    fn order_key(&self) -> OrderKey {
        OrderKey { tree: self.tree.id, rank: self.id.0 }
    }

    fn first_child(&self) -> Option<Self> {
        self.data().children.first().map(|id| self.at(*id))
    }

    fn last_child(&self) -> Option<Self> {
        self.data().children.last().map(|id| self.at(*id))
    }

    fn next_sibling(&self) -> Option<Self> {
        let d = self.data();
        if d.kind.is_attribute_like() {
            return None;
        }
        let parent = self.tree.data(d.parent?);
        parent.children.get(d.sibling_index as usize + 1).map(|id| self.at(*id))
    }

    fn previous_sibling(&self) -> Option<Self> {
        let d = self.data();
        if d.kind.is_attribute_like() || d.sibling_index == 0 {
            return None;
        }
        let parent = self.tree.data(d.parent?);
        parent.children.get(d.sibling_index as usize - 1).map(|id| self.at(*id))
    }
}
