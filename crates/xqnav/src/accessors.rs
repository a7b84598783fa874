//! Node accessor functions: `fn:node-name`, `fn:root`, `fn:string`, `fn:data`,
//! `fn:in-scope-prefixes` and `fn:namespace-uri-for-prefix`.
use crate::error::{Error, ErrorCode};
use crate::model::{NodeKind, XdmNode};
use crate::namespaces::{in_scope_namespaces, resolve_prefix};
use crate::xdm::{XdmAtomicValue, XdmItem};

/// Name of a node as an `xs:QName`. PIs are named by their target, namespace nodes by
/// their prefix; documents, text, comments and the default namespace node have none.
pub fn node_name<N: XdmNode>(node: &N) -> Option<XdmAtomicValue> {
    node.name().map(|q| XdmAtomicValue::QName { ns_uri: q.ns_uri, prefix: q.prefix, local: q.local })
}

pub fn root<N: XdmNode>(node: &N) -> N {
    let mut cur = node.clone();
    while let Some(p) = cur.parent() {
        cur = p;
    }
    cur
}

pub fn string<N: XdmNode>(item: &XdmItem<N>) -> String {
    match item {
        XdmItem::Node(n) => n.string_value(),
        XdmItem::Atomic(a) => a.lexical(),
    }
}

/// Atomize a sequence.
pub fn data<N: XdmNode>(items: &[XdmItem<N>]) -> Vec<XdmAtomicValue> {
    items
        .iter()
        .flat_map(|i| match i {
            XdmItem::Node(n) => n.typed_value(),
            XdmItem::Atomic(a) => vec![a.clone()],
        })
        .collect()
}

fn require_element<N: XdmNode>(node: &N, func: &str) -> Result<(), Error> {
    if node.kind() == NodeKind::Element {
        Ok(())
    } else {
        Err(Error::from_code(ErrorCode::XPTY0004, format!("{func} expects an element, got {}", node.kind())))
    }
}

/// Prefixes of the in-scope namespaces of an element, sorted, `xml` included and the
/// default namespace reported as `""`.
pub fn in_scope_prefixes<N: XdmNode>(element: &N) -> Result<Vec<String>, Error> {
    require_element(element, "fn:in-scope-prefixes")?;
    let mut out: Vec<String> = in_scope_namespaces(element).iter().map(|b| b.prefix.clone()).collect();
    out.push("xml".to_string());
    out.sort();
    Ok(out)
}

/// URI bound to `prefix` (empty for the default namespace) on `element`.
pub fn namespace_uri_for_prefix<N: XdmNode>(prefix: &str, element: &N) -> Result<Option<String>, Error> {
    require_element(element, "fn:namespace-uri-for-prefix")?;
    Ok(resolve_prefix(element, prefix))
}
