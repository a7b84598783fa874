//! `union`, `intersect`, `except` and `fn:deep-equal`.
//!
//! The set operators work on node identity. In ordered mode their result is in document
//! order; in unordered mode every node still occurs exactly once but the order is the
//! order of first appearance.
use std::collections::HashSet;

use tracing::trace;

use crate::context::OrderingMode;
use crate::error::Error;
use crate::model::{NodeKind, OrderKey, XdmNode};
use crate::order::{nodes_of, normalize};
use crate::xdm::{XdmAtomicValue, XdmItem, XdmSequence, node_sequence};

pub fn union<N: XdmNode>(a: XdmSequence<N>, b: XdmSequence<N>, mode: OrderingMode) -> Result<XdmSequence<N>, Error> {
    let mut nodes = nodes_of(a, "union")?;
    nodes.extend(nodes_of(b, "union")?);
    Ok(node_sequence(union_nodes(nodes, Vec::new(), mode)))
}

pub fn intersect<N: XdmNode>(
    a: XdmSequence<N>,
    b: XdmSequence<N>,
    mode: OrderingMode,
) -> Result<XdmSequence<N>, Error> {
    let lhs = nodes_of(a, "intersect")?;
    let rhs = nodes_of(b, "intersect")?;
    Ok(node_sequence(intersect_nodes(lhs, &rhs, mode)))
}

pub fn except<N: XdmNode>(a: XdmSequence<N>, b: XdmSequence<N>, mode: OrderingMode) -> Result<XdmSequence<N>, Error> {
    let lhs = nodes_of(a, "except")?;
    let rhs = nodes_of(b, "except")?;
    Ok(node_sequence(except_nodes(lhs, &rhs, mode)))
}

/// Node-level union for callers that already hold plain node vectors.
pub fn union_nodes<N: XdmNode>(mut a: Vec<N>, b: Vec<N>, mode: OrderingMode) -> Vec<N> {
    a.extend(b);
    let out = normalize(a, mode);
    trace!(len = out.len(), %mode, "union");
    out
}

pub fn intersect_nodes<N: XdmNode>(a: Vec<N>, b: &[N], mode: OrderingMode) -> Vec<N> {
    filter_by(a, b, true, mode)
}

pub fn except_nodes<N: XdmNode>(a: Vec<N>, b: &[N], mode: OrderingMode) -> Vec<N> {
    filter_by(a, b, false, mode)
}

fn filter_by<N: XdmNode>(lhs: Vec<N>, rhs: &[N], keep_members: bool, mode: OrderingMode) -> Vec<N> {
    let keys: HashSet<OrderKey> = rhs.iter().map(|n| n.order_key()).collect();
    let out: Vec<N> = normalize(lhs, mode).into_iter().filter(|n| keys.contains(&n.order_key()) == keep_members).collect();
    trace!(len = out.len(), keep_members, %mode, "intersect/except");
    out
}

/// `fn:deep-equal` with the codepoint collation.
///
/// Items are compared pairwise: atomics by value with numeric promotion (`NaN` equals
/// `NaN`), nodes structurally. Node identity and in-scope namespaces are ignored, and so
/// are comment and processing-instruction children.
pub fn deep_equal<N: XdmNode>(a: &XdmSequence<N>, b: &XdmSequence<N>) -> bool {
    a.len() == b.len()
        && a.iter().zip(b.iter()).all(|pair| match pair {
            (XdmItem::Atomic(x), XdmItem::Atomic(y)) => atomic_deep_equal(x, y),
            (XdmItem::Node(x), XdmItem::Node(y)) => node_deep_equal(x, y),
            _ => false,
        })
}

fn atomic_deep_equal(a: &XdmAtomicValue, b: &XdmAtomicValue) -> bool {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return (x.is_nan() && y.is_nan()) || x == y;
    }
    if let (Some(x), Some(y)) = (a.as_str_like(), b.as_str_like()) {
        return x == y;
    }
    match (a, b) {
        (XdmAtomicValue::Boolean(x), XdmAtomicValue::Boolean(y)) => x == y,
        (
            XdmAtomicValue::QName { ns_uri: n1, local: l1, .. },
            XdmAtomicValue::QName { ns_uri: n2, local: l2, .. },
        ) => n1 == n2 && l1 == l2,
        _ => false,
    }
}

pub fn node_deep_equal<N: XdmNode>(a: &N, b: &N) -> bool {
    if a.kind() != b.kind() {
        return false;
    }
    match (a.name(), b.name()) {
        (Some(x), Some(y)) if !x.matches(&y) => return false,
        (Some(_), None) | (None, Some(_)) => return false,
        _ => {}
    }
    match a.kind() {
        NodeKind::Text
        | NodeKind::Comment
        | NodeKind::ProcessingInstruction
        | NodeKind::Attribute
        | NodeKind::Namespace => a.string_value() == b.string_value(),
        NodeKind::Element | NodeKind::Document => {
            attribute_set(a) == attribute_set(b) && {
                let ca = significant_children(a);
                let cb = significant_children(b);
                ca.len() == cb.len() && ca.iter().zip(cb.iter()).all(|(x, y)| node_deep_equal(x, y))
            }
        }
    }
}

fn attribute_set<N: XdmNode>(n: &N) -> Vec<(Option<String>, String, String)> {
    let mut attrs: Vec<_> = n
        .attributes()
        .filter_map(|a| {
            let q = a.name()?;
            Some((q.ns_uri, q.local, a.string_value()))
        })
        .collect();
    attrs.sort();
    attrs
}

fn significant_children<N: XdmNode>(n: &N) -> Vec<N> {
    n.children()
        .filter(|c| !matches!(c.kind(), NodeKind::Comment | NodeKind::ProcessingInstruction))
        .collect()
}
