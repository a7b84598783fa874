//! Document order: the `<<`, `>>` and `is` comparisons plus sorting and deduplication.
//!
//! Order is total over all nodes: inside a tree it is the pre-order rank (document node
//! first, an element before its namespace nodes, those before its attributes, those
//! before its children), across trees it follows tree creation and stays stable for the
//! lifetime of the trees.
use core::cmp::Ordering;

use itertools::Itertools;
use smallvec::SmallVec;
use tracing::trace;

use crate::context::OrderingMode;
use crate::error::{Error, ErrorCode};
use crate::model::{OrderKey, XdmNode};
use crate::xdm::{XdmItem, XdmSequence};

pub fn compare<N: XdmNode>(a: &N, b: &N) -> Ordering {
    a.compare_document_order(b)
}

/// `a << b`. An empty operand yields the empty sequence (`None`).
pub fn node_before<N: XdmNode>(a: &XdmSequence<N>, b: &XdmSequence<N>) -> Result<Option<bool>, Error> {
    compare_operands(a, b, "<<", |a, b| compare(a, b) == Ordering::Less)
}

/// `a >> b`.
pub fn node_after<N: XdmNode>(a: &XdmSequence<N>, b: &XdmSequence<N>) -> Result<Option<bool>, Error> {
    compare_operands(a, b, ">>", |a, b| compare(a, b) == Ordering::Greater)
}

/// `a is b`: node identity.
pub fn is_same_node<N: XdmNode>(a: &XdmSequence<N>, b: &XdmSequence<N>) -> Result<Option<bool>, Error> {
    compare_operands(a, b, "is", |a, b| a == b)
}

fn compare_operands<N: XdmNode>(
    a: &XdmSequence<N>,
    b: &XdmSequence<N>,
    op: &str,
    f: impl FnOnce(&N, &N) -> bool,
) -> Result<Option<bool>, Error> {
    let lhs = single_node(a, op)?;
    let rhs = single_node(b, op)?;
    Ok(match (lhs, rhs) {
        (Some(l), Some(r)) => Some(f(l, r)),
        _ => None,
    })
}

fn single_node<'a, N>(seq: &'a XdmSequence<N>, op: &str) -> Result<Option<&'a N>, Error> {
    match seq.as_slice() {
        [] => Ok(None),
        [XdmItem::Node(n)] => Ok(Some(n)),
        [XdmItem::Atomic(a)] => Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!("operand of '{op}' must be a node, got {}", a.type_name()),
        )),
        _ => Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!("operand of '{op}' must be a single node, got {} items", seq.len()),
        )),
    }
}

/// Extract the nodes of a sequence; any atomic item is a type error.
pub fn nodes_of<N>(seq: XdmSequence<N>, op: &str) -> Result<Vec<N>, Error> {
    seq.into_iter()
        .map(|item| match item {
            XdmItem::Node(n) => Ok(n),
            XdmItem::Atomic(a) => Err(Error::from_code(
                ErrorCode::XPTY0004,
                format!("'{op}' requires node sequences, got {}", a.type_name()),
            )),
        })
        .collect()
}

/// Stable sort into document order (duplicates kept).
pub fn sort_document_order<N: XdmNode>(nodes: &mut [N]) {
    nodes.sort_by_cached_key(|n| n.order_key());
}

/// Sort into document order and drop duplicate nodes.
pub fn sorted_distinct<N: XdmNode>(nodes: Vec<N>) -> Vec<N> {
    let before = nodes.len();
    let mut keyed: SmallVec<[(OrderKey, N); 16]> = nodes.into_iter().map(|n| (n.order_key(), n)).collect();
    keyed.sort_by_key(|(k, _)| *k);
    keyed.dedup_by(|a, b| a.0 == b.0);
    trace!(before, after = keyed.len(), "sorted into document order");
    keyed.into_iter().map(|(_, n)| n).collect()
}

/// Drop duplicate nodes, keeping the first occurrence and the incoming order.
pub fn distinct_unordered<N: XdmNode>(nodes: Vec<N>) -> Vec<N> {
    nodes.into_iter().unique_by(|n| n.order_key()).collect()
}

/// Deduplicate and, in ordered mode, sort into document order.
pub fn normalize<N: XdmNode>(nodes: Vec<N>, mode: OrderingMode) -> Vec<N> {
    match mode {
        OrderingMode::Ordered => sorted_distinct(nodes),
        OrderingMode::Unordered => distinct_unordered(nodes),
    }
}

/// True if `nodes` is strictly increasing in document order (sorted, no duplicates).
pub fn is_document_ordered<N: XdmNode>(nodes: &[N]) -> bool {
    nodes.iter().tuple_windows().all(|(a, b)| compare(a, b) == Ordering::Less)
}
