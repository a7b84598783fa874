use std::sync::Arc;

use tracing::debug;

use super::{Node, NodeData, NodeId, Tree, next_tree_id};
use crate::consts::XML_URI;
use crate::error::{Error, ErrorCode};
use crate::model::{NodeKind, QName};
use crate::namespaces::InScopeNamespaces;

/// Node ids and sibling positions are `u32`; the id after the last node must fit as well.
fn checked_u32(n: usize) -> Result<u32, Error> {
    u32::try_from(n).map_err(|_| Error::from_code(ErrorCode::FOER0000, "tree exceeds the maximum number of nodes"))
}

struct Open {
    id: NodeId,
    has_content: bool,
}

/// Event-style builder that lays nodes out in document order.
///
/// Containers are opened with [`start_document`](Self::start_document) or
/// [`start_element`](Self::start_element) and closed with [`end`](Self::end). Adjacent
/// text is merged into one text node and zero-length text content is dropped.
///
/// ```
/// use xqnav::tree::TreeBuilder;
/// use xqnav::model::QName;
/// use xqnav::namespaces::InScopeNamespaces;
/// use xqnav::XdmNode;
///
/// let mut b = TreeBuilder::new();
/// b.start_element(QName::local("e"), InScopeNamespaces::new()).unwrap();
/// b.text("te").unwrap();
/// b.text("").unwrap();
/// b.text("xt").unwrap();
/// b.end().unwrap();
/// let e = b.finish().unwrap();
/// assert_eq!(e.children().count(), 1);
/// assert_eq!(e.string_value(), "text");
/// ```
#[derive(Default)]
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
    open: Vec<Open>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree consisting of a single leaf node (text, comment, PI, attribute or
    /// namespace). A standalone text node may have an empty value.
    pub fn leaf(kind: NodeKind, name: Option<QName>, value: impl Into<String>) -> Node {
        let mut data = NodeData::new(kind, name, Some(value.into()), None);
        data.subtree_end = 1;
        let tree = Tree { id: next_tree_id(), nodes: vec![data] };
        Node::new(Arc::new(tree), NodeId::ROOT)
    }

    fn next_id(&self) -> Result<NodeId, Error> {
        let end = checked_u32(self.nodes.len() + 1)?;
        Ok(NodeId(end - 1))
    }

    fn current(&self) -> Option<NodeId> {
        self.open.last().map(|o| o.id)
    }

    fn check_root_slot(&self) -> Result<(), Error> {
        if self.open.is_empty() && !self.nodes.is_empty() {
            return Err(Error::from_code(ErrorCode::FOER0000, "a tree has exactly one root node"));
        }
        Ok(())
    }

    fn push_child(&mut self, kind: NodeKind, name: Option<QName>, value: Option<String>) -> Result<NodeId, Error> {
        self.check_root_slot()?;
        let id = self.next_id()?;
        let parent = self.current();
        let mut data = NodeData::new(kind, name, value, parent);
        data.subtree_end = id.0 + 1;
        if let Some(p) = parent {
            let siblings = &mut self.nodes[p.index()].children;
            data.sibling_index = checked_u32(siblings.len())?;
            siblings.push(id);
        }
        if let Some(o) = self.open.last_mut() {
            o.has_content = true;
        }
        self.nodes.push(data);
        Ok(id)
    }

    pub fn start_document(&mut self) -> Result<NodeId, Error> {
        if !self.nodes.is_empty() {
            return Err(Error::from_code(ErrorCode::XPTY0004, "a document node must be the root of its tree"));
        }
        let id = self.push_child(NodeKind::Document, None, None)?;
        self.open.push(Open { id, has_content: false });
        Ok(id)
    }

    /// Open an element. `in_scope` is the element's complete in-scope namespace set; one
    /// namespace node per binding (plus the `xml` binding) is created right away.
    pub fn start_element(&mut self, name: QName, in_scope: InScopeNamespaces) -> Result<NodeId, Error> {
        let id = self.push_child(NodeKind::Element, Some(name), None)?;
        let mut namespaces = Vec::with_capacity(in_scope.len() + 1);
        let xml = self.push_attached(id, NodeKind::Namespace, Some(QName::local("xml")), XML_URI.to_string())?;
        namespaces.push(xml);
        for b in in_scope.iter() {
            let name = (!b.prefix.is_empty()).then(|| QName::local(b.prefix.clone()));
            namespaces.push(self.push_attached(id, NodeKind::Namespace, name, b.uri.clone())?);
        }
        self.nodes[id.index()].namespaces = namespaces;
        self.open.push(Open { id, has_content: false });
        Ok(id)
    }

    fn push_attached(
        &mut self,
        owner: NodeId,
        kind: NodeKind,
        name: Option<QName>,
        value: String,
    ) -> Result<NodeId, Error> {
        let id = self.next_id()?;
        let mut data = NodeData::new(kind, name, Some(value), Some(owner));
        data.subtree_end = id.0 + 1;
        self.nodes.push(data);
        Ok(id)
    }

    /// Add an attribute to the open element. Attributes must precede all child content
    /// and be unique by expanded name.
    pub fn attribute(&mut self, name: QName, value: impl Into<String>) -> Result<NodeId, Error> {
        let Some(open) = self.open.last() else {
            return Err(Error::from_code(ErrorCode::XPTY0004, "attribute outside of an element"));
        };
        let owner = open.id;
        if self.nodes[owner.index()].kind != NodeKind::Element {
            return Err(Error::from_code(ErrorCode::XPTY0004, "attribute nodes cannot be added to a document"));
        }
        if open.has_content {
            return Err(Error::from_code(
                ErrorCode::XQTY0024,
                format!("attribute '{name}' follows non-attribute content"),
            ));
        }
        let duplicate = self.nodes[owner.index()]
            .attributes
            .iter()
            .any(|a| self.nodes[a.index()].name.as_ref().is_some_and(|n| n.matches(&name)));
        if duplicate {
            return Err(Error::from_code(ErrorCode::XQDY0025, format!("duplicate attribute '{name}'")));
        }
        let id = self.push_attached(owner, NodeKind::Attribute, Some(name), value.into())?;
        self.nodes[owner.index()].attributes.push(id);
        Ok(id)
    }

    /// Append text content; merged with a directly preceding text sibling.
    pub fn text(&mut self, value: &str) -> Result<(), Error> {
        if value.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.current()
            && let Some(&last) = self.nodes[parent.index()].children.last()
            && self.nodes[last.index()].kind == NodeKind::Text
            && last.index() + 1 == self.nodes.len()
        {
            if let Some(v) = self.nodes[last.index()].value.as_mut() {
                v.push_str(value);
            }
            return Ok(());
        }
        self.push_child(NodeKind::Text, None, Some(value.to_string())).map(|_| ())
    }

    pub fn comment(&mut self, value: impl Into<String>) -> Result<NodeId, Error> {
        self.push_child(NodeKind::Comment, None, Some(value.into()))
    }

    pub fn processing_instruction(&mut self, target: &str, data: impl Into<String>) -> Result<NodeId, Error> {
        self.push_child(NodeKind::ProcessingInstruction, Some(QName::local(target)), Some(data.into()))
    }

    /// Close the innermost open document or element.
    pub fn end(&mut self) -> Result<(), Error> {
        let Some(open) = self.open.pop() else {
            return Err(Error::from_code(ErrorCode::FOER0000, "end() without open container"));
        };
        self.nodes[open.id.index()].subtree_end = checked_u32(self.nodes.len())?;
        Ok(())
    }

    pub fn finish(self) -> Result<Node, Error> {
        if !self.open.is_empty() {
            return Err(Error::from_code(ErrorCode::FOER0000, "unclosed container in tree builder"));
        }
        if self.nodes.is_empty() {
            return Err(Error::from_code(ErrorCode::FOER0000, "empty tree"));
        }
        debug!(nodes = self.nodes.len(), "tree built");
        let tree = Tree { id: next_tree_id(), nodes: self.nodes };
        Ok(Node::new(Arc::new(tree), NodeId::ROOT))
    }
}
