use rstest::rstest;
use xqnav::accessors::in_scope_prefixes;
use xqnav::consts::{XML_URI, XMLNS_URI};
use xqnav::construct::{self, Content, ElementConstructor, atomic_string};
use xqnav::context::StaticContextBuilder;
use xqnav::xdm::node_sequence;
use xqnav::{Axis, CopyNamespacesMode, ErrorCode, Node, NodeTest, QName, StaticContext, XdmItem, XdmNode, step};

fn ctx(preserve: bool, inherit: bool) -> StaticContext {
    StaticContextBuilder::new().with_copy_namespaces(CopyNamespacesMode::new(preserve, inherit)).build()
}

fn prefixes(n: &Node) -> String {
    in_scope_prefixes(n).unwrap().join(" ")
}

fn child(n: &Node, local: &str) -> Node {
    step(n, Axis::Child, &NodeTest::local(local)).next().unwrap()
}

/// `<element3 xmlns:namespace3>{<element2 xmlns:namespace2>{$element1}</element2>}</element3>`
/// where every element is bound to a variable first, so each level is a copy.
fn nested_through_variables(ctx: &StaticContext) -> Node {
    let element1 =
        construct::element(ctx, ElementConstructor::new("element1").namespace("namespace1", "http://www.namespace1.com"))
            .unwrap();
    let element2 = construct::element(
        ctx,
        ElementConstructor::new("element2")
            .namespace("namespace2", "http://www.namespace2.com")
            .enclosed(node_sequence([element1])),
    )
    .unwrap();
    construct::element(
        ctx,
        ElementConstructor::new("element3")
            .namespace("namespace3", "http://www.namespace3.com")
            .enclosed(node_sequence([element2])),
    )
    .unwrap()
}

#[rstest]
#[case::preserve_inherit(true, true, "namespace1 namespace2 namespace3 xml", "namespace2 namespace3 xml")]
#[case::no_preserve_inherit(false, true, "namespace3 xml", "namespace3 xml")]
#[case::no_preserve_no_inherit(false, false, "xml", "xml")]
#[case::preserve_no_inherit(true, false, "namespace1 xml", "namespace2 xml")]
fn copy_namespaces_matrix(
    #[case] preserve: bool,
    #[case] inherit: bool,
    #[case] innermost: &str,
    #[case] middle: &str,
) {
    let ctx = ctx(preserve, inherit);
    let element3 = nested_through_variables(&ctx);
    let element2 = child(&element3, "element2");
    let element1 = child(&element2, "element1");
    assert_eq!(prefixes(&element1), innermost);
    assert_eq!(prefixes(&element2), middle);
    assert_eq!(prefixes(&element3), "namespace3 xml");
}

#[test]
fn enclosed_copy_and_authored_child_differ_under_no_preserve() {
    // <doc><a>{<b xmlns:p="urn:p"/>}</a><a><b xmlns:p="urn:p"/></a></doc>
    let ctx = ctx(false, true);
    let b = || ElementConstructor::new("b").namespace("p", "urn:p");
    let doc = construct::element(
        &ctx,
        ElementConstructor::new("doc")
            .content(ElementConstructor::new("a").enclosed_element(b()))
            .content(ElementConstructor::new("a").content(b())),
    )
    .unwrap();
    let mut bs = step(&doc, Axis::Descendant, &NodeTest::local("b"));
    assert_eq!(prefixes(&bs.next().unwrap()), "xml");
    assert_eq!(prefixes(&bs.next().unwrap()), "p xml");
}

#[test]
fn default_namespace_reaches_constructors_inside_enclosed_expressions() {
    // <e xmlns="http://example.com/">{<b/>}</e>
    let ctx = ctx(true, false);
    let e = construct::element(
        &ctx,
        ElementConstructor::new("e").namespace("", "http://example.com/").enclosed_element(ElementConstructor::new("b")),
    )
    .unwrap();
    let b = e.first_child().unwrap();
    assert_eq!(b.name().unwrap().ns_uri.as_deref(), Some("http://example.com/"));
    assert_eq!(prefixes(&b), " xml");
}

#[rstest]
#[case::default_mode(true, true, "appearsUnused xml")]
#[case::no_preserve_no_inherit(false, false, "xml")]
fn used_prefix_survives_copy(#[case] preserve: bool, #[case] inherit: bool, #[case] b_prefixes: &str) {
    // <e xmlns:appearsUnused="urn:u">{<b><appearsUnused:c/></b>}</e>
    let ctx = ctx(preserve, inherit);
    let e = construct::element(
        &ctx,
        ElementConstructor::new("e")
            .namespace("appearsUnused", "urn:u")
            .enclosed_element(ElementConstructor::new("b").content(ElementConstructor::new("appearsUnused:c"))),
    )
    .unwrap();
    let b = child(&e, "b");
    let c = b.first_child().unwrap();
    assert_eq!(prefixes(&e), "appearsUnused xml");
    assert_eq!(prefixes(&b), b_prefixes);
    assert_eq!(prefixes(&c), "appearsUnused xml");
}

#[test]
fn unused_declaration_dropped_under_no_preserve() {
    // <e>{<b><c xmlns:unused="urn:u"/></b>}</e>
    let ctx = ctx(false, false);
    let e = construct::element(
        &ctx,
        ElementConstructor::new("e").enclosed_element(
            ElementConstructor::new("b").content(ElementConstructor::new("c").namespace("unused", "urn:u")),
        ),
    )
    .unwrap();
    let c = step(&e, Axis::Descendant, &NodeTest::local("c")).next().unwrap();
    assert_eq!(prefixes(&c), "xml");
}

#[test]
fn lexically_nested_constructors_keep_every_enclosing_declaration() {
    // <element3 ns3>{<element2 ns2>{<element1 ns1/>}</element2>}</element3>
    let ctx = ctx(true, false);
    let element3 = construct::element(
        &ctx,
        ElementConstructor::new("element3").namespace("namespace3", "http://www.namespace3.com").enclosed_element(
            ElementConstructor::new("element2").namespace("namespace2", "http://www.namespace2.com").enclosed_element(
                ElementConstructor::new("element1").namespace("namespace1", "http://www.namespace1.com"),
            ),
        ),
    )
    .unwrap();
    let element1 = child(&child(&element3, "element2"), "element1");
    assert_eq!(prefixes(&element1), "namespace1 namespace2 namespace3 xml");
}

#[test]
fn constructed_nodes_have_no_parent() {
    let c = construct::comment(&[atomic_string("comment")]).unwrap();
    assert_eq!(step(&c, Axis::Parent, &NodeTest::AnyKind).count(), 0);
    let e = construct::element(&StaticContext::default(), ElementConstructor::new("e")).unwrap();
    assert!(e.parent().is_none());
    let a = construct::attribute(QName::local("a"), &[atomic_string("v")]).unwrap();
    assert!(a.parent().is_none());
}

#[test]
fn adjacent_text_nodes_merge() {
    let t1 = construct::text(&[atomic_string("te")]).unwrap();
    let t2 = construct::text(&[atomic_string("xt")]).unwrap();
    let e = construct::element(
        &StaticContext::default(),
        ElementConstructor::new("elem").content(Content::enclosed_nodes([t1, t2])),
    )
    .unwrap();
    assert_eq!(step(&e, Axis::Child, &NodeTest::Text).count(), 1);
    assert_eq!(e.string_value(), "text");
}

#[test]
fn text_constructor_edge_cases() {
    assert!(construct::text(&[]).is_none());
    let empty = construct::text(&[atomic_string("")]).unwrap();
    assert_eq!(empty.string_value(), "");
    // an empty text node disappears inside an element
    let e = construct::element(
        &StaticContext::default(),
        ElementConstructor::new("e").content(Content::enclosed_nodes([empty])),
    )
    .unwrap();
    assert_eq!(e.children().count(), 0);
}

#[test]
fn copied_tree_is_a_new_identity() {
    let ctx = StaticContext::default();
    let original = construct::element(&ctx, ElementConstructor::new("e").text("x")).unwrap();
    let copy = construct::copy(&ctx, &original).unwrap();
    assert_ne!(copy, original);
    assert!(xqnav::set_ops::deep_equal(&node_sequence([copy]), &node_sequence([original])));
}

#[test]
fn document_constructor_takes_children_of_documents() {
    let ctx = StaticContext::default();
    let inner = construct::document(&ctx, vec![ElementConstructor::new("a").into()]).unwrap();
    let outer = construct::document(&ctx, vec![Content::enclosed_nodes([inner.clone()])]).unwrap();
    let a = outer.first_child().unwrap();
    assert_eq!(a.name().unwrap().local, "a");
    assert_ne!(Some(a), inner.first_child());

    let attr = construct::attribute(QName::local("a"), &[]).unwrap();
    let err = construct::document(&ctx, vec![Content::enclosed_nodes([attr])]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
}

#[rstest]
#[case::xml_prefix_rebound(ElementConstructor::new("e").namespace("xml", "urn:x"), ErrorCode::XQST0070)]
#[case::xmlns_prefix(ElementConstructor::new("e").namespace("xmlns", "urn:x"), ErrorCode::XQST0070)]
#[case::xml_uri_rebound(
    ElementConstructor::new("e").namespace("p", "http://www.w3.org/XML/1998/namespace"),
    ErrorCode::XQST0070
)]
#[case::duplicate(ElementConstructor::new("e").namespace("p", "urn:a").namespace("p", "urn:b"), ErrorCode::XQST0071)]
#[case::undeclare_prefix(ElementConstructor::new("e").namespace("p", ""), ErrorCode::XQST0085)]
#[case::duplicate_attribute(ElementConstructor::new("e").attribute("a", "1").attribute("a", "2"), ErrorCode::XQDY0025)]
#[case::unbound_prefix(ElementConstructor::new("q:e"), ErrorCode::XPST0081)]
#[case::xmlns_attribute(ElementConstructor::new("e").attribute("xmlns", "urn:p"), ErrorCode::XQDY0044)]
#[case::computed_xmlns_prefix(
    ElementConstructor::computed(QName::with_ns(Some("xmlns"), "e", "urn:x")),
    ErrorCode::XQDY0096
)]
#[case::computed_xml_uri_other_prefix(
    ElementConstructor::computed(QName::with_ns(Some("p"), "e", XML_URI)),
    ErrorCode::XQDY0096
)]
#[case::computed_xml_uri_no_prefix(ElementConstructor::computed(QName::with_ns(None, "e", XML_URI)), ErrorCode::XQDY0096)]
#[case::computed_xml_prefix_other_uri(
    ElementConstructor::computed(QName::with_ns(Some("xml"), "e", "urn:x")),
    ErrorCode::XQDY0096
)]
#[case::computed_xmlns_uri(ElementConstructor::computed(QName::with_ns(Some("p"), "e", XMLNS_URI)), ErrorCode::XQDY0096)]
fn constructor_errors(#[case] ctor: ElementConstructor, #[case] code: ErrorCode) {
    let err = construct::element(&StaticContext::default(), ctor).unwrap_err();
    assert_eq!(err.code_enum(), code);
}

#[rstest]
#[case::xml_uri_other_prefix(QName::with_ns(Some("p"), "a", XML_URI))]
#[case::xml_prefix_other_uri(QName::with_ns(Some("xml"), "a", "urn:x"))]
#[case::xmlns_prefix(QName::with_ns(Some("xmlns"), "a", "urn:x"))]
#[case::xmlns_uri(QName::with_ns(Some("p"), "a", XMLNS_URI))]
fn computed_attribute_names_in_reserved_namespaces(#[case] name: QName) {
    let err = construct::attribute(name, &[atomic_string("1")]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XQDY0044);
}

#[test]
fn reserved_names_that_stay_valid() {
    let ctx = StaticContext::default();
    let e = construct::element(&ctx, ElementConstructor::computed(QName::with_ns(Some("xml"), "e", XML_URI))).unwrap();
    assert_eq!(prefixes(&e), "xml");
    let lang = construct::attribute(QName::with_ns(None, "lang", XML_URI), &[atomic_string("en")]).unwrap();
    let e = construct::element(&ctx, ElementConstructor::new("e").enclosed(node_sequence([lang]))).unwrap();
    let a = e.attributes().next().unwrap();
    assert_eq!(a.name().unwrap().prefix.as_deref(), Some("xml"));
    assert_eq!(prefixes(&e), "xml");
}

#[test]
fn computed_namespace_nodes_join_the_element_scope() {
    let ctx = StaticContext::default();
    let n = construct::namespace("p", "urn:p").unwrap();
    assert!(n.parent().is_none());
    let e = construct::element(&ctx, ElementConstructor::new("e").enclosed(node_sequence([n]))).unwrap();
    assert_eq!(prefixes(&e), "p xml");
    assert!(matches!(
        construct::namespace("1bad", "urn:p").map_err(|e| e.code_enum()),
        Err(ErrorCode::XQDY0101)
    ));
}

#[test]
fn atomics_in_enclosed_content_become_text() {
    let items: Vec<XdmItem<Node>> = vec![atomic_string("a"), atomic_string("b")];
    let e = construct::element(&StaticContext::default(), ElementConstructor::new("e").enclosed(items)).unwrap();
    assert_eq!(e.string_value(), "a b");
}
