//! Fluent builder for source trees, the stand-in for a document loader.
//!
//! Names are resolved the way an XML parser resolves them: `p:local` looks the prefix up
//! in the namespace declarations of the element and its ancestors, unprefixed element
//! names take the default namespace, unprefixed attribute names stay in no namespace.
//!
//! ```
//! use xqnav::tree::{doc, elem, ns, text};
//! use xqnav::XdmNode;
//!
//! let document = doc()
//!     .child(elem("p:root").namespace(ns("p", "urn:one")).child(elem("p:child").child(text("Hi"))))
//!     .build()
//!     .unwrap();
//! let root = document.first_child().unwrap();
//! assert_eq!(root.name().unwrap().ns_uri.as_deref(), Some("urn:one"));
//! assert_eq!(root.string_value(), "Hi");
//! ```
use crate::consts::XML_URI;
use crate::error::{Error, ErrorCode};
use crate::model::{NodeKind, QName};
use crate::namespaces::{InScopeNamespaces, NamespaceBinding, attribute_prefix, validate_declaration};

use super::{Node, TreeBuilder};

#[derive(Debug, Clone)]
enum PendingName {
    Lexical(String),
    Explicit(QName),
}

#[derive(Debug, Clone)]
pub struct AttrSpec {
    name: PendingName,
    value: String,
}

#[derive(Debug, Clone)]
pub struct NodeBuilder {
    kind: NodeKind,
    name: Option<PendingName>,
    namespaces: Vec<NamespaceBinding>,
    attributes: Vec<AttrSpec>,
    children: Vec<NodeOrBuilder>,
}

#[derive(Debug, Clone)]
pub enum NodeOrBuilder {
    Text(String),
    Comment(String),
    ProcessingInstruction(String, String),
    Builder(NodeBuilder),
}

impl From<NodeBuilder> for NodeOrBuilder {
    fn from(b: NodeBuilder) -> Self {
        NodeOrBuilder::Builder(b)
    }
}

pub fn doc() -> NodeBuilder {
    NodeBuilder::new(NodeKind::Document, None)
}
pub fn elem(name: &str) -> NodeBuilder {
    NodeBuilder::new(NodeKind::Element, Some(PendingName::Lexical(name.to_string())))
}
pub fn elem_ns(prefix: &str, local: &str, uri: &str) -> NodeBuilder {
    NodeBuilder::new(NodeKind::Element, Some(PendingName::Explicit(QName::with_ns(Some(prefix), local, uri))))
}
pub fn text(v: &str) -> NodeOrBuilder {
    NodeOrBuilder::Text(v.to_string())
}
pub fn comment(v: &str) -> NodeOrBuilder {
    NodeOrBuilder::Comment(v.to_string())
}
pub fn pi(target: &str, data: &str) -> NodeOrBuilder {
    NodeOrBuilder::ProcessingInstruction(target.to_string(), data.to_string())
}
pub fn attr(name: &str, v: &str) -> AttrSpec {
    AttrSpec { name: PendingName::Lexical(name.to_string()), value: v.to_string() }
}
pub fn attr_ns(prefix: &str, local: &str, uri: &str, v: &str) -> AttrSpec {
    AttrSpec { name: PendingName::Explicit(QName::with_ns(Some(prefix), local, uri)), value: v.to_string() }
}
pub fn ns(prefix: &str, uri: &str) -> NamespaceBinding {
    NamespaceBinding::new(prefix, uri)
}

impl NodeBuilder {
    fn new(kind: NodeKind, name: Option<PendingName>) -> Self {
        Self { kind, name, namespaces: Vec::new(), attributes: Vec::new(), children: Vec::new() }
    }

    pub fn child(mut self, child: impl Into<NodeOrBuilder>) -> Self {
        self.children.push(child.into());
        self
    }
    pub fn children<I: IntoIterator<Item = NodeOrBuilder>>(mut self, it: I) -> Self {
        self.children.extend(it);
        self
    }
    pub fn attr(mut self, attr: AttrSpec) -> Self {
        self.attributes.push(attr);
        self
    }
    pub fn attrs<I: IntoIterator<Item = AttrSpec>>(mut self, attrs: I) -> Self {
        self.attributes.extend(attrs);
        self
    }
    pub fn namespace(mut self, binding: NamespaceBinding) -> Self {
        self.namespaces.push(binding);
        self
    }

    pub fn build(self) -> Result<Node, Error> {
        let mut b = TreeBuilder::new();
        emit(&mut b, self, &InScopeNamespaces::new())?;
        b.finish()
    }
}

fn emit(b: &mut TreeBuilder, spec: NodeBuilder, outer: &InScopeNamespaces) -> Result<(), Error> {
    match spec.kind {
        NodeKind::Document => {
            b.start_document()?;
            let scope = InScopeNamespaces::new();
            emit_children(b, spec.children, &scope)?;
            b.end()
        }
        _ => {
            let mut scope = outer.clone();
            let mut own = InScopeNamespaces::new();
            let mut declared: Vec<&str> = Vec::with_capacity(spec.namespaces.len());
            for d in &spec.namespaces {
                validate_declaration(&d.prefix, &d.uri)?;
                if declared.contains(&d.prefix.as_str()) {
                    return Err(Error::from_code(
                        ErrorCode::XQST0071,
                        format!("namespace prefix '{}' declared twice", d.prefix),
                    ));
                }
                declared.push(&d.prefix);
                scope.bind(&d.prefix, &d.uri);
                own.bind(&d.prefix, &d.uri);
            }
            let name = match spec.name {
                Some(n) => resolve(n, &mut scope, &mut own, true)?,
                None => return Err(Error::from_code(ErrorCode::FOER0000, "element without a name")),
            };
            let mut attributes = Vec::with_capacity(spec.attributes.len());
            for a in spec.attributes {
                attributes.push((resolve(a.name, &mut scope, &mut own, false)?, a.value));
            }
            b.start_element(name, scope.clone())?;
            for (name, value) in attributes {
                b.attribute(name, value)?;
            }
            emit_children(b, spec.children, &scope)?;
            b.end()
        }
    }
}

fn emit_children(b: &mut TreeBuilder, children: Vec<NodeOrBuilder>, scope: &InScopeNamespaces) -> Result<(), Error> {
    for c in children {
        match c {
            NodeOrBuilder::Text(t) => b.text(&t)?,
            NodeOrBuilder::Comment(c) => {
                b.comment(c)?;
            }
            NodeOrBuilder::ProcessingInstruction(t, d) => {
                b.processing_instruction(&t, d)?;
            }
            NodeOrBuilder::Builder(nb) => emit(b, nb, scope)?,
        }
    }
    Ok(())
}

/// Resolve a name against `scope`. Explicit names add their binding to the element; `own`
/// holds the bindings the element itself introduces, which an explicit name may not contradict.
fn resolve(
    name: PendingName,
    scope: &mut InScopeNamespaces,
    own: &mut InScopeNamespaces,
    is_element: bool,
) -> Result<QName, Error> {
    match name {
        PendingName::Explicit(mut q) => {
            let Some(uri) = q.ns_uri.clone() else {
                return Ok(q);
            };
            // unprefixed attributes are never in the default namespace
            if !is_element && q.prefix_str().is_empty() {
                q.prefix = Some(attribute_prefix(scope, &uri));
            }
            let prefix = q.prefix_str();
            validate_declaration(prefix, &uri)?;
            if own.get(prefix).is_some_and(|u| u != uri) {
                return Err(Error::from_code(
                    ErrorCode::XQDY0102,
                    format!("prefix '{prefix}' of '{q}' conflicts with a binding on the same element"),
                ));
            }
            own.bind(prefix, &uri);
            scope.bind(prefix, &uri);
            Ok(q)
        }
        PendingName::Lexical(lexical) => match lexical.split_once(':') {
            Some(("xml", local)) => Ok(QName::with_ns(Some("xml"), local, XML_URI)),
            Some((prefix, local)) => match scope.get(prefix) {
                Some(uri) => Ok(QName::with_ns(Some(prefix), local, uri)),
                None => Err(Error::from_code(ErrorCode::XPST0081, format!("unbound prefix '{prefix}'"))),
            },
            None if is_element => match scope.get("") {
                Some(uri) => Ok(QName::with_ns(None, lexical.as_str(), uri)),
                None => Ok(QName::local(lexical)),
            },
            None => Ok(QName::local(lexical)),
        },
    }
}
