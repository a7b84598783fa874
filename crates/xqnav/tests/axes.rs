use std::collections::HashSet;

use rstest::{fixture, rstest};
use xqnav::path::{PathExpr, Step};
use xqnav::static_check::KindSet;
use xqnav::tree::{attr, comment, doc, elem, ns, pi, text};
use xqnav::{Axis, Node, NodeKind, NodeTest, StaticContext, XdmNode, axis, step};

type N = Node;

fn local(n: &N) -> String {
    n.name().map(|q| q.local).unwrap_or_else(|| format!("#{}", n.kind()))
}

fn names(nodes: impl IntoIterator<Item = N>) -> Vec<String> {
    nodes.into_iter().map(|n| local(&n)).collect()
}

/// Every node of the tree: child-axis nodes plus attributes and namespace nodes.
fn all_nodes(root: &N) -> Vec<N> {
    let mut out = Vec::new();
    for n in axis(root, Axis::DescendantOrSelf) {
        out.push(n.clone());
        out.extend(n.namespaces());
        out.extend(n.attributes());
    }
    out
}

// <root><child><preceding2/><child2><preceding1/><child3><leaf/></child3><following/></child2>
// <following/></child><following/></root>
#[fixture]
fn k2_preceding() -> N {
    doc()
        .child(
            elem("root")
                .child(
                    elem("child")
                        .child(elem("preceding2"))
                        .child(
                            elem("child2")
                                .child(elem("preceding1"))
                                .child(elem("child3").child(elem("leaf")))
                                .child(elem("following")),
                        )
                        .child(elem("following")),
                )
                .child(elem("following")),
        )
        .build()
        .unwrap()
}

#[fixture]
fn mixed() -> N {
    doc()
        .child(comment("head"))
        .child(
            elem("r")
                .namespace(ns("p", "urn:p"))
                .attr(attr("id", "1"))
                .attr(attr("class", "c"))
                .child(elem("a").attr(attr("x", "1")).child(text("one")).child(elem("b")))
                .child(pi("go", "now"))
                .child(elem("p:c").child(text("two")).child(comment("inner")))
                .child(text("tail")),
        )
        .build()
        .unwrap()
}

fn leaf(root: &N) -> N {
    step(root, Axis::Descendant, &NodeTest::local("leaf")).next().unwrap()
}

#[rstest]
fn raw_preceding_axis_is_nearest_first(k2_preceding: N) {
    let leaf = leaf(&k2_preceding);
    assert_eq!(names(axis(&leaf, Axis::Preceding)), ["preceding1", "preceding2"]);
}

#[rstest]
fn preceding_path_result_is_in_document_order(k2_preceding: N) {
    let ctx = StaticContext::default();
    let path = PathExpr::new(vec![
        Step::descendant_or_self(),
        Step::new(Axis::Child, NodeTest::local("leaf")),
        Step::new(Axis::Preceding, NodeTest::AnyKind),
    ])
    .compile(KindSet::DOCUMENT, &ctx)
    .unwrap();
    let out = path.evaluate_nodes(vec![k2_preceding]);
    assert_eq!(names(out), ["preceding2", "preceding1"]);
}

#[rstest]
fn following_excludes_descendants(k2_preceding: N) {
    let child2 = step(&k2_preceding, Axis::Descendant, &NodeTest::local("child2")).next().unwrap();
    assert_eq!(names(axis(&child2, Axis::Following)), ["following", "following"]);
    let leaf = leaf(&k2_preceding);
    assert_eq!(names(axis(&leaf, Axis::Following)), ["following", "following", "following"]);
}

#[rstest]
#[case(Axis::Ancestor, &["child3", "child2", "child", "root", "#document-node()"])]
#[case(Axis::AncestorOrSelf, &["leaf", "child3", "child2", "child", "root", "#document-node()"])]
#[case(Axis::Parent, &["child3"])]
#[case(Axis::SelfAxis, &["leaf"])]
#[case(Axis::Child, &[])]
fn axes_from_leaf(k2_preceding: N, #[case] ax: Axis, #[case] expected: &[&str]) {
    let leaf = leaf(&k2_preceding);
    assert_eq!(names(axis(&leaf, ax)), expected);
}

#[rstest]
fn sibling_axes(mixed: N) {
    let r = mixed.last_child().unwrap();
    let pi = r.children().nth(1).unwrap();
    assert_eq!(pi.kind(), NodeKind::ProcessingInstruction);
    assert_eq!(names(axis(&pi, Axis::FollowingSibling)), ["c", "#text()"]);
    assert_eq!(names(axis(&pi, Axis::PrecedingSibling)), ["a"]);
}

#[rstest]
fn descendant_is_preorder(mixed: N) {
    let r = mixed.last_child().unwrap();
    assert_eq!(
        names(axis(&r, Axis::Descendant)),
        ["a", "#text()", "b", "go", "c", "#text()", "#comment()", "#text()"]
    );
}

#[rstest]
fn attribute_and_namespace_context(mixed: N) {
    let r = mixed.last_child().unwrap();
    let id = r.attributes().next().unwrap();
    assert!(axis(&id, Axis::Child).next().is_none());
    assert!(axis(&id, Axis::Descendant).next().is_none());
    assert!(axis(&id, Axis::FollowingSibling).next().is_none());
    assert!(axis(&id, Axis::PrecedingSibling).next().is_none());
    assert!(axis(&id, Axis::Attribute).next().is_none());
    assert_eq!(axis(&id, Axis::DescendantOrSelf).collect::<Vec<_>>(), vec![id.clone()]);
    assert_eq!(axis(&id, Axis::Parent).next(), Some(r.clone()));
    // following of an attribute starts with the owner's content
    assert_eq!(axis(&id, Axis::Following).next(), r.first_child());
    // preceding of an attribute: everything before the owner element, ancestors excluded
    assert_eq!(names(axis(&id, Axis::Preceding)), ["#comment()"]);
}

#[rstest]
fn namespace_axis_lists_in_scope_bindings(mixed: N) {
    let r = mixed.last_child().unwrap();
    let c = step(&r, Axis::Child, &NodeTest::Wildcard).last().unwrap();
    let prefixes: Vec<_> = axis(&c, Axis::Namespace).map(|n| local(&n)).collect();
    assert_eq!(prefixes, ["xml", "p"]);
    assert!(axis(&mixed, Axis::Namespace).next().is_none());
}

#[rstest]
fn namespace_nodes_keep_identity(mixed: N) {
    let r = mixed.last_child().unwrap();
    let first: Vec<_> = axis(&r, Axis::Namespace).collect();
    let second: Vec<_> = axis(&r, Axis::Namespace).collect();
    assert_eq!(first, second);
}

#[rstest]
#[case::k2(k2_preceding())]
#[case::mixed(mixed())]
fn parent_and_child_axes_are_inverse(#[case] root: N) {
    for n in all_nodes(&root) {
        let Some(p) = n.parent() else {
            assert_eq!(n, root);
            continue;
        };
        let via = match n.kind() {
            NodeKind::Attribute => Axis::Attribute,
            NodeKind::Namespace => Axis::Namespace,
            _ => Axis::Child,
        };
        assert!(axis(&p, via).any(|c| c == n), "{n:?} missing from {via} of its parent");
        assert_eq!(axis(&n, Axis::Parent).collect::<Vec<_>>(), vec![p.clone()]);
    }
    for n in all_nodes(&root) {
        for c in axis(&n, Axis::Child).chain(axis(&n, Axis::Attribute)).chain(axis(&n, Axis::Namespace)) {
            assert_eq!(c.parent(), Some(n.clone()));
        }
    }
}

#[rstest]
#[case::k2(k2_preceding())]
#[case::mixed(mixed())]
fn preceding_ancestor_following_descendant_partition(#[case] root: N) {
    let tree: HashSet<N> = axis(&root, Axis::DescendantOrSelf).collect();
    for n in axis(&root, Axis::Descendant) {
        let mut seen = HashSet::new();
        let groups = [
            axis(&n, Axis::Preceding).collect::<Vec<_>>(),
            vec![n.clone()],
            axis(&n, Axis::Ancestor).collect(),
            axis(&n, Axis::Descendant).collect(),
            axis(&n, Axis::Following).collect(),
        ];
        for g in groups {
            for m in g {
                assert!(seen.insert(m.clone()), "{m:?} appears twice around {n:?}");
            }
        }
        assert_eq!(seen, tree);
    }
}

#[rstest]
#[case(Axis::Descendant)]
#[case(Axis::Following)]
#[case(Axis::Child)]
#[case(Axis::FollowingSibling)]
fn forward_axes_are_document_ordered(mixed: N, #[case] ax: Axis) {
    for n in all_nodes(&mixed) {
        let out: Vec<_> = axis(&n, ax).collect();
        assert!(xqnav::order::is_document_ordered(&out), "{ax} from {n:?}");
    }
}

#[rstest]
#[case(Axis::Ancestor)]
#[case(Axis::Preceding)]
#[case(Axis::PrecedingSibling)]
fn reverse_axes_are_reverse_document_ordered(mixed: N, #[case] ax: Axis) {
    for n in all_nodes(&mixed) {
        let mut out: Vec<_> = axis(&n, ax).collect();
        out.reverse();
        assert!(xqnav::order::is_document_ordered(&out), "{ax} from {n:?}");
    }
}

#[rstest]
fn kind_tests(mixed: N) {
    let r = mixed.last_child().unwrap();
    assert_eq!(step(&r, Axis::Descendant, &NodeTest::Text).count(), 3);
    assert_eq!(step(&r, Axis::Descendant, &NodeTest::Comment).count(), 1);
    assert_eq!(step(&r, Axis::Child, &NodeTest::ProcessingInstruction(Some("go".into()))).count(), 1);
    assert_eq!(step(&r, Axis::Child, &NodeTest::ProcessingInstruction(Some("stop".into()))).count(), 0);
    assert_eq!(step(&r, Axis::Child, &NodeTest::name(Some("urn:p"), "c")).count(), 1);
    assert_eq!(step(&r, Axis::Child, &NodeTest::local("c")).count(), 0);
    assert_eq!(step(&r, Axis::Attribute, &NodeTest::Wildcard).count(), 2);
    assert_eq!(step(&r, Axis::Namespace, &NodeTest::local("p")).count(), 1);
    let doc_test = NodeTest::Document(Some(Box::new(NodeTest::Element(None))));
    assert_eq!(step(&mixed, Axis::SelfAxis, &doc_test).count(), 1);
}
