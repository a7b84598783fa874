//! Axis navigation.
//!
//! [`axis`] returns a lazy iterator over the nodes an axis selects from a context node;
//! [`step`] additionally filters by a [`NodeTest`]. Forward axes yield document order,
//! reverse axes (`parent`, `ancestor`, `ancestor-or-self`, `preceding`,
//! `preceding-sibling`) yield reverse document order, nearest node first. Order is a
//! property of the traversal, never a post-hoc sort. Iterators are `Clone`; cloning an
//! untouched iterator gives a restartable view of the same axis.
use core::fmt;
use core::str::FromStr;

use smallvec::SmallVec;
use string_cache::DefaultAtom;

use crate::error::{Error, ErrorCode};
use crate::model::{NodeKind, QName, XdmNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    Following,
    FollowingSibling,
    Preceding,
    PrecedingSibling,
    SelfAxis,
    Attribute,
    Namespace,
}

impl Axis {
    pub const ALL: [Axis; 13] = [
        Axis::Child,
        Axis::Descendant,
        Axis::DescendantOrSelf,
        Axis::Parent,
        Axis::Ancestor,
        Axis::AncestorOrSelf,
        Axis::Following,
        Axis::FollowingSibling,
        Axis::Preceding,
        Axis::PrecedingSibling,
        Axis::SelfAxis,
        Axis::Attribute,
        Axis::Namespace,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Axis::Child => "child",
            Axis::Descendant => "descendant",
            Axis::DescendantOrSelf => "descendant-or-self",
            Axis::Parent => "parent",
            Axis::Ancestor => "ancestor",
            Axis::AncestorOrSelf => "ancestor-or-self",
            Axis::Following => "following",
            Axis::FollowingSibling => "following-sibling",
            Axis::Preceding => "preceding",
            Axis::PrecedingSibling => "preceding-sibling",
            Axis::SelfAxis => "self",
            Axis::Attribute => "attribute",
            Axis::Namespace => "namespace",
        }
    }

    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Parent | Axis::Ancestor | Axis::AncestorOrSelf | Axis::Preceding | Axis::PrecedingSibling
        )
    }

    /// Kind selected by name tests and `*` on this axis.
    pub fn principal_kind(self) -> NodeKind {
        match self {
            Axis::Attribute => NodeKind::Attribute,
            Axis::Namespace => NodeKind::Namespace,
            _ => NodeKind::Element,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Axis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Axis::ALL
            .iter()
            .copied()
            .find(|a| a.name() == s)
            .ok_or_else(|| Error::from_code(ErrorCode::XPST0003, format!("unknown axis '{s}'")))
    }
}

/// Expanded name with interned parts, compared against node names in name tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InternedName {
    pub ns_uri: Option<DefaultAtom>,
    pub local: DefaultAtom,
}

impl InternedName {
    pub fn new(ns_uri: Option<&str>, local: &str) -> Self {
        Self { ns_uri: ns_uri.filter(|u| !u.is_empty()).map(DefaultAtom::from), local: DefaultAtom::from(local) }
    }

    /// Prefix-insensitive match on `(namespace URI, local name)`.
    pub fn matches(&self, name: &QName) -> bool {
        self.local.as_ref() == name.local.as_str() && self.ns_uri.as_deref() == name.ns_uri.as_deref()
    }
}

impl From<&QName> for InternedName {
    fn from(q: &QName) -> Self {
        InternedName::new(q.ns_uri.as_deref(), &q.local)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `node()`
    AnyKind,
    /// `prefix:local` or `local`, already resolved to an expanded name
    Name(InternedName),
    /// `*`
    Wildcard,
    /// `prefix:*`, holding the resolved namespace URI
    NamespaceWildcard(DefaultAtom),
    /// `*:local`
    LocalWildcard(DefaultAtom),
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
    Document(Option<Box<NodeTest>>),
    Element(Option<InternedName>),
    Attribute(Option<InternedName>),
    NamespaceNode,
}

impl NodeTest {
    pub fn name(ns_uri: Option<&str>, local: &str) -> Self {
        NodeTest::Name(InternedName::new(ns_uri, local))
    }

    pub fn local(local: &str) -> Self {
        NodeTest::name(None, local)
    }

    pub fn matches<N: XdmNode>(&self, node: &N, principal: NodeKind) -> bool {
        use NodeTest::*;
        let kind = node.kind();
        match self {
            AnyKind => true,
            Name(expected) => kind == principal && node.name().is_some_and(|q| expected.matches(&q)),
            Wildcard => kind == principal,
            NamespaceWildcard(uri) => {
                kind == principal && node.name().is_some_and(|q| q.ns_uri.as_deref() == Some(uri.as_ref()))
            }
            LocalWildcard(local) => kind == principal && node.name().is_some_and(|q| q.local == local.as_ref()),
            Text => kind == NodeKind::Text,
            Comment => kind == NodeKind::Comment,
            ProcessingInstruction(target) => {
                kind == NodeKind::ProcessingInstruction
                    && target.as_ref().is_none_or(|t| node.name().is_some_and(|q| &q.local == t))
            }
            Document(inner) => {
                if kind != NodeKind::Document {
                    return false;
                }
                let Some(inner) = inner else {
                    return true;
                };
                let mut elements = node.children().filter(|c| c.kind() == NodeKind::Element);
                match (elements.next(), elements.next()) {
                    (Some(only), None) => {
                        let text_free = node.children().all(|c| c.kind() != NodeKind::Text);
                        text_free && inner.matches(&only, NodeKind::Element)
                    }
                    _ => false,
                }
            }
            Element(name) => {
                kind == NodeKind::Element && name.as_ref().is_none_or(|n| node.name().is_some_and(|q| n.matches(&q)))
            }
            Attribute(name) => {
                kind == NodeKind::Attribute
                    && name.as_ref().is_none_or(|n| node.name().is_some_and(|q| n.matches(&q)))
            }
            NamespaceNode => kind == NodeKind::Namespace,
        }
    }
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn name(n: &InternedName) -> String {
            match &n.ns_uri {
                Some(ns) => format!("Q{{{}}}{}", ns, n.local),
                None => n.local.to_string(),
            }
        }
        match self {
            NodeTest::AnyKind => f.write_str("node()"),
            NodeTest::Name(n) => f.write_str(&name(n)),
            NodeTest::Wildcard => f.write_str("*"),
            NodeTest::NamespaceWildcard(ns) => write!(f, "Q{{{ns}}}*"),
            NodeTest::LocalWildcard(l) => write!(f, "*:{l}"),
            NodeTest::Text => f.write_str("text()"),
            NodeTest::Comment => f.write_str("comment()"),
            NodeTest::ProcessingInstruction(None) => f.write_str("processing-instruction()"),
            NodeTest::ProcessingInstruction(Some(t)) => write!(f, "processing-instruction({t})"),
            NodeTest::Document(None) => f.write_str("document-node()"),
            NodeTest::Document(Some(inner)) => write!(f, "document-node({inner})"),
            NodeTest::Element(None) => f.write_str("element()"),
            NodeTest::Element(Some(n)) => write!(f, "element({})", name(n)),
            NodeTest::Attribute(None) => f.write_str("attribute()"),
            NodeTest::Attribute(Some(n)) => write!(f, "attribute({})", name(n)),
            NodeTest::NamespaceNode => f.write_str("namespace-node()"),
        }
    }
}

#[derive(Clone)]
enum AxisState<N> {
    Done,
    // self / parent
    Once(Option<N>),
    Children(Option<N>),
    // attribute:: and namespace:: (small, collected up front)
    List(std::vec::IntoIter<N>),
    Ancestors(Option<N>),
    // pre-order walk bounded by the subtree of `anchor`
    Descend { anchor: N, next: Option<N> },
    FollowingSiblings(Option<N>),
    PrecedingSiblings(Option<N>),
    Following(Option<N>),
    // reverse pre-order walk; `ancestors` of the context are skipped
    Preceding { next: Option<N>, ancestors: SmallVec<[N; 16]> },
}

/// Lazy sequence of the nodes selected by one axis from one context node.
#[derive(Clone)]
pub struct AxisIter<N> {
    axis: Axis,
    state: AxisState<N>,
}

impl<N> fmt::Debug for AxisIter<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AxisIter").field("axis", &self.axis).finish_non_exhaustive()
    }
}

/// Start navigating `axis` from `node`.
pub fn axis<N: XdmNode>(node: &N, axis: Axis) -> AxisIter<N> {
    let kind = node.kind();
    let state = match axis {
        Axis::SelfAxis => AxisState::Once(Some(node.clone())),
        Axis::Parent => AxisState::Once(node.parent()),
        Axis::Child => AxisState::Children(node.first_child()),
        Axis::Attribute if kind == NodeKind::Element => AxisState::List(node.attributes_vec().into_iter()),
        Axis::Namespace if kind == NodeKind::Element => AxisState::List(node.namespaces_vec().into_iter()),
        Axis::Attribute | Axis::Namespace => AxisState::Done,
        Axis::Ancestor => AxisState::Ancestors(node.parent()),
        Axis::AncestorOrSelf => AxisState::Ancestors(Some(node.clone())),
        Axis::Descendant => AxisState::Descend { anchor: node.clone(), next: node.first_child() },
        Axis::DescendantOrSelf => AxisState::Descend { anchor: node.clone(), next: Some(node.clone()) },
        Axis::FollowingSibling => AxisState::FollowingSiblings(node.next_sibling()),
        Axis::PrecedingSibling => AxisState::PrecedingSiblings(node.previous_sibling()),
        Axis::Following => {
            let start = if kind.is_attribute_like() {
                // everything inside the owner element comes after its attributes
                node.parent().and_then(|owner| owner.first_child().or_else(|| after_subtree(&owner)))
            } else {
                after_subtree(node)
            };
            AxisState::Following(start)
        }
        Axis::Preceding => {
            let context = if kind.is_attribute_like() { node.parent() } else { Some(node.clone()) };
            match context {
                Some(c) => {
                    let mut ancestors = SmallVec::new();
                    let mut cur = c.parent();
                    while let Some(a) = cur {
                        cur = a.parent();
                        ancestors.push(a);
                    }
                    AxisState::Preceding { next: preceding_in_doc(&c), ancestors }
                }
                None => AxisState::Done,
            }
        }
    };
    AxisIter { axis, state }
}

/// Navigate `axis` from `node` and keep the nodes matching `test`.
pub fn step<N: XdmNode>(node: &N, ax: Axis, test: &NodeTest) -> StepIter<N> {
    StepIter { inner: axis(node, ax), test: test.clone(), principal: ax.principal_kind() }
}

/// First node after the subtree of `node` in document order (attributes excluded).
fn after_subtree<N: XdmNode>(node: &N) -> Option<N> {
    let mut cur = node.clone();
    loop {
        if let Some(s) = cur.next_sibling() {
            return Some(s);
        }
        cur = cur.parent()?;
    }
}

/// Previous node in document order among child-axis nodes: the deepest last descendant
/// of the previous sibling, or the parent.
fn preceding_in_doc<N: XdmNode>(node: &N) -> Option<N> {
    match node.previous_sibling() {
        Some(mut p) => {
            while let Some(last) = p.last_child() {
                p = last;
            }
            Some(p)
        }
        None => node.parent(),
    }
}

impl<N: XdmNode> AxisIter<N> {
    pub fn axis(&self) -> Axis {
        self.axis
    }
}

impl<N: XdmNode> Iterator for AxisIter<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        match &mut self.state {
            AxisState::Done => None,
            AxisState::Once(n) => n.take(),
            AxisState::Children(next) | AxisState::FollowingSiblings(next) => {
                let cur = next.take()?;
                *next = cur.next_sibling();
                Some(cur)
            }
            AxisState::PrecedingSiblings(next) => {
                let cur = next.take()?;
                *next = cur.previous_sibling();
                Some(cur)
            }
            AxisState::List(it) => it.next(),
            AxisState::Ancestors(next) => {
                let cur = next.take()?;
                *next = cur.parent();
                Some(cur)
            }
            AxisState::Descend { anchor, next } => {
                let cur = next.take()?;
                *next = match cur.first_child() {
                    Some(c) => Some(c),
                    None => {
                        let mut n = cur.clone();
                        loop {
                            if &n == anchor {
                                break None;
                            }
                            if let Some(s) = n.next_sibling() {
                                break Some(s);
                            }
                            match n.parent() {
                                Some(p) => n = p,
                                None => break None,
                            }
                        }
                    }
                };
                Some(cur)
            }
            AxisState::Following(next) => {
                let cur = next.take()?;
                *next = cur.first_child().or_else(|| after_subtree(&cur));
                Some(cur)
            }
            AxisState::Preceding { next, ancestors } => loop {
                let cur = next.take()?;
                *next = preceding_in_doc(&cur);
                if !ancestors.contains(&cur) {
                    return Some(cur);
                }
            },
        }
    }
}

/// Axis iterator filtered by a node test.
#[derive(Clone, Debug)]
pub struct StepIter<N> {
    inner: AxisIter<N>,
    test: NodeTest,
    principal: NodeKind,
}

impl<N: XdmNode> Iterator for StepIter<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        let (test, principal) = (&self.test, self.principal);
        self.inner.by_ref().find(|n| test.matches(n, principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{attr, elem, text};

    #[test]
    fn axis_names_round_trip() {
        for a in Axis::ALL {
            assert_eq!(a.name().parse::<Axis>().unwrap(), a);
        }
        assert_eq!("sideways".parse::<Axis>().unwrap_err().code_enum(), ErrorCode::XPST0003);
    }

    #[test]
    fn cloned_iterator_restarts() {
        let r = elem("r").child(elem("a")).child(elem("b")).build().unwrap();
        let it = axis(&r, Axis::Child);
        let first: Vec<_> = it.clone().collect();
        let second: Vec<_> = it.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn name_test_respects_principal_kind() {
        let r = elem("r").attr(attr("a", "1")).child(elem("a")).child(text("t")).build().unwrap();
        assert_eq!(step(&r, Axis::Child, &NodeTest::local("a")).count(), 1);
        assert_eq!(step(&r, Axis::Attribute, &NodeTest::local("a")).count(), 1);
        assert_eq!(step(&r, Axis::Child, &NodeTest::Wildcard).count(), 1);
        assert_eq!(step(&r, Axis::Child, &NodeTest::AnyKind).count(), 2);
        let a = r.attributes().next().unwrap();
        assert_eq!(step(&a, Axis::SelfAxis, &NodeTest::local("a")).count(), 0);
        assert_eq!(step(&a, Axis::SelfAxis, &NodeTest::Attribute(None)).count(), 1);
    }
}
