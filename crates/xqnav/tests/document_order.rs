use core::cmp::Ordering;

use rstest::{fixture, rstest};
use xqnav::order::{compare, is_same_node, node_after, node_before, sort_document_order, sorted_distinct};
use xqnav::tree::{attr, doc, elem, ns, text};
use xqnav::xdm::{XdmAtomicValue, node_sequence};
use xqnav::{Axis, ErrorCode, Node, XdmItem, XdmNode, axis};

type N = Node;

#[fixture]
fn tree() -> N {
    doc()
        .child(
            elem("r")
                .namespace(ns("p", "urn:p"))
                .attr(attr("a", "1"))
                .attr(attr("b", "2"))
                .child(elem("x").attr(attr("c", "3")).child(text("t")))
                .child(elem("y")),
        )
        .build()
        .unwrap()
}

fn every_node(root: &N) -> Vec<N> {
    let mut out = Vec::new();
    for n in axis(root, Axis::DescendantOrSelf) {
        out.push(n.clone());
        out.extend(n.namespaces());
        out.extend(n.attributes());
    }
    out
}

fn one(n: &N) -> Vec<XdmItem<N>> {
    node_sequence([n.clone()])
}

#[rstest]
fn before_and_after_are_irreflexive(tree: N) {
    for n in every_node(&tree) {
        assert_eq!(node_before(&one(&n), &one(&n)).unwrap(), Some(false));
        assert_eq!(node_after(&one(&n), &one(&n)).unwrap(), Some(false));
        assert_eq!(is_same_node(&one(&n), &one(&n)).unwrap(), Some(true));
    }
}

#[rstest]
fn exactly_one_direction_holds_for_distinct_nodes(tree: N) {
    let nodes = every_node(&tree);
    for m in &nodes {
        for n in &nodes {
            if m == n {
                continue;
            }
            let before = node_before(&one(m), &one(n)).unwrap().unwrap();
            let after = node_before(&one(n), &one(m)).unwrap().unwrap();
            assert!(before ^ after, "{m:?} vs {n:?}");
            assert_eq!(node_after(&one(m), &one(n)).unwrap(), Some(after));
        }
    }
}

#[rstest]
fn order_is_transitive(tree: N) {
    let nodes = every_node(&tree);
    for a in &nodes {
        for b in &nodes {
            for c in &nodes {
                if compare(a, b) == Ordering::Less && compare(b, c) == Ordering::Less {
                    assert_eq!(compare(a, c), Ordering::Less);
                }
            }
        }
    }
}

#[rstest]
fn element_then_namespaces_then_attributes_then_children(tree: N) {
    let r = tree.first_child().unwrap();
    let nss: Vec<_> = r.namespaces().collect();
    let attrs: Vec<_> = r.attributes().collect();
    let x = r.first_child().unwrap();
    assert_eq!(compare(&tree, &r), Ordering::Less);
    for n in &nss {
        assert_eq!(compare(&r, n), Ordering::Less);
        for a in &attrs {
            assert_eq!(compare(n, a), Ordering::Less);
        }
    }
    for a in &attrs {
        assert_eq!(compare(a, &x), Ordering::Less);
    }
    // an attribute of x comes after r's attributes and before x's children
    let c = x.attributes().next().unwrap();
    assert_eq!(compare(&attrs[1], &c), Ordering::Less);
    assert_eq!(compare(&c, &x.first_child().unwrap()), Ordering::Less);
}

#[rstest]
fn every_node_list_is_already_in_document_order(tree: N) {
    let nodes = every_node(&tree);
    let mut shuffled: Vec<_> = nodes.iter().rev().cloned().collect();
    sort_document_order(&mut shuffled);
    assert_eq!(shuffled, nodes);
}

#[test]
fn distinct_trees_order_consistently() {
    let first = elem("a").build().unwrap();
    let second = elem("a").build().unwrap();
    let a = node_before(&one(&first), &one(&second)).unwrap();
    let b = node_after(&one(&first), &one(&second)).unwrap();
    assert_eq!(a, Some(true));
    assert_eq!(b, Some(false));
    assert_eq!(is_same_node(&one(&first), &one(&second)).unwrap(), Some(false));
    // repeated comparisons are stable
    for _ in 0..3 {
        assert_eq!(compare(&first, &second), Ordering::Less);
    }
}

#[rstest]
fn identity_survives_repeated_traversal(tree: N) {
    let a: Vec<_> = axis(&tree, Axis::Descendant).collect();
    let b: Vec<_> = axis(&tree, Axis::Descendant).collect();
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(is_same_node(&one(x), &one(y)).unwrap(), Some(true));
    }
    assert_eq!(sorted_distinct([a.clone(), b].concat()), a);
}

#[rstest]
#[case::atomic(vec![XdmItem::Atomic(XdmAtomicValue::Integer(1))])]
#[case::two_nodes(node_sequence(tree().children().chain(tree().children())))]
fn invalid_operands(#[case] lhs: Vec<XdmItem<N>>, tree: N) {
    let err = node_before(&lhs, &one(&tree)).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
    let err = is_same_node(&one(&tree), &lhs).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
}

#[rstest]
fn empty_operand_yields_empty(tree: N) {
    assert_eq!(node_before(&Vec::new(), &one(&tree)).unwrap(), None);
    assert_eq!(node_after(&one(&tree), &Vec::new()).unwrap(), None);
}
