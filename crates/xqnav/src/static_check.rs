//! Pessimistic static typing of axis steps.
//!
//! Every step is typed by the set of node kinds it can possibly return, given the kinds
//! its context may have. A step whose set is empty can never select anything; with
//! static typing enabled it is rejected with XPST0005 before evaluation.
use bitflags::bitflags;
use tracing::debug;

use crate::axis::{Axis, NodeTest};
use crate::context::StaticContext;
use crate::error::{Error, ErrorCode};
use crate::model::NodeKind;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KindSet: u8 {
        const DOCUMENT = 1 << 0;
        const ELEMENT = 1 << 1;
        const ATTRIBUTE = 1 << 2;
        const TEXT = 1 << 3;
        const COMMENT = 1 << 4;
        const PROCESSING_INSTRUCTION = 1 << 5;
        const NAMESPACE = 1 << 6;

        const CONTAINER = Self::DOCUMENT.bits() | Self::ELEMENT.bits();
        const CHILD = Self::ELEMENT.bits() | Self::TEXT.bits() | Self::COMMENT.bits() | Self::PROCESSING_INSTRUCTION.bits();
        const ATTRIBUTE_LIKE = Self::ATTRIBUTE.bits() | Self::NAMESPACE.bits();
    }
}

impl From<NodeKind> for KindSet {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Document => KindSet::DOCUMENT,
            NodeKind::Element => KindSet::ELEMENT,
            NodeKind::Attribute => KindSet::ATTRIBUTE,
            NodeKind::Text => KindSet::TEXT,
            NodeKind::Comment => KindSet::COMMENT,
            NodeKind::ProcessingInstruction => KindSet::PROCESSING_INSTRUCTION,
            NodeKind::Namespace => KindSet::NAMESPACE,
        }
    }
}

impl FromIterator<NodeKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = NodeKind>>(iter: I) -> Self {
        iter.into_iter().fold(KindSet::empty(), |acc, k| acc | KindSet::from(k))
    }
}

/// Kinds an axis can reach from a context of the given kinds.
pub fn axis_kinds(axis: Axis, context: KindSet) -> KindSet {
    let has_parent = context.intersects(KindSet::CHILD | KindSet::ATTRIBUTE_LIKE);
    let descendants = if context.intersects(KindSet::CONTAINER) { KindSet::CHILD } else { KindSet::empty() };
    let ancestors = if has_parent { KindSet::CONTAINER } else { KindSet::empty() };
    match axis {
        Axis::SelfAxis => context,
        Axis::Child | Axis::Descendant => descendants,
        Axis::DescendantOrSelf => context | descendants,
        Axis::Parent | Axis::Ancestor => ancestors,
        Axis::AncestorOrSelf => context | ancestors,
        Axis::FollowingSibling | Axis::PrecedingSibling => {
            if context.intersects(KindSet::CHILD) { KindSet::CHILD } else { KindSet::empty() }
        }
        Axis::Following | Axis::Preceding => {
            if has_parent { KindSet::CHILD } else { KindSet::empty() }
        }
        Axis::Attribute => {
            if context.contains(KindSet::ELEMENT) { KindSet::ATTRIBUTE } else { KindSet::empty() }
        }
        Axis::Namespace => {
            if context.contains(KindSet::ELEMENT) { KindSet::NAMESPACE } else { KindSet::empty() }
        }
    }
}

/// Kinds a node test can accept on an axis with the given principal kind.
pub fn test_kinds(test: &NodeTest, principal: NodeKind) -> KindSet {
    match test {
        NodeTest::AnyKind => KindSet::all(),
        NodeTest::Text => KindSet::TEXT,
        NodeTest::Comment => KindSet::COMMENT,
        NodeTest::ProcessingInstruction(_) => KindSet::PROCESSING_INSTRUCTION,
        NodeTest::Document(_) => KindSet::DOCUMENT,
        NodeTest::Element(_) => KindSet::ELEMENT,
        NodeTest::Attribute(_) => KindSet::ATTRIBUTE,
        NodeTest::NamespaceNode => KindSet::NAMESPACE,
        NodeTest::Name(_) | NodeTest::Wildcard | NodeTest::NamespaceWildcard(_) | NodeTest::LocalWildcard(_) => {
            KindSet::from(principal)
        }
    }
}

/// Static type of one step. Fails with XPST0005 when the step can never select a node
/// and `ctx.static_typing` is on; otherwise returns the (possibly empty) kind set.
pub fn check_step(context: KindSet, axis: Axis, test: &NodeTest, ctx: &StaticContext) -> Result<KindSet, Error> {
    let kinds = axis_kinds(axis, context) & test_kinds(test, axis.principal_kind());
    if kinds.is_empty() && ctx.static_typing {
        debug!(%axis, %test, ?context, "statically empty step rejected");
        return Err(Error::from_code(
            ErrorCode::XPST0005,
            format!("{axis}::{test} can never select a node from {context:?}"),
        ));
    }
    Ok(kinds)
}
