//! Node constructors.
//!
//! Every constructor returns the root of a fresh tree: a constructed node has no parent.
//! Element and document constructors take a content list mixing authored parts (nested
//! direct element constructors, literal text, comments, PIs) with the items of enclosed
//! expressions. Authored nested elements are built in place and see the namespace
//! declarations of their enclosing constructors. Nodes coming out of enclosed
//! expressions are copied under the copy-namespaces mode of the static context.
//!
//! ```
//! use xqnav::construct::{self, Content, ElementConstructor};
//! use xqnav::context::StaticContext;
//! use xqnav::XdmNode;
//!
//! let ctx = StaticContext::default();
//! let t1 = construct::text(&[construct::atomic_string("te")]).unwrap();
//! let t2 = construct::text(&[construct::atomic_string("xt")]).unwrap();
//! let e = construct::element(
//!     &ctx,
//!     ElementConstructor::new("elem").content(Content::enclosed_nodes([t1, t2])),
//! )
//! .unwrap();
//! assert_eq!(e.children().count(), 1);
//! assert_eq!(e.string_value(), "text");
//! ```
use tracing::debug;

use crate::consts::{XML_URI, XMLNS_URI};
use crate::context::StaticContext;
use crate::error::{Error, ErrorCode};
use crate::model::{NodeKind, QName, XdmNode};
use crate::namespaces::{
    CopyNamespacesMode, InScopeNamespaces, NamespaceBinding, attribute_prefix, is_ncname, used_bindings,
    validate_computed, validate_declaration,
};
use crate::tree::{Node, TreeBuilder};
use crate::xdm::{XdmAtomicValue, XdmItem, XdmSequence, node_sequence};

#[derive(Debug, Clone)]
enum CtorName {
    Lexical(String),
    Resolved(QName),
}

/// One entry of an element or document constructor's content.
#[derive(Debug, Clone)]
pub enum Content {
    /// Nested direct element constructor.
    Element(ElementConstructor),
    /// Literal character data.
    Text(String),
    Comment(String),
    ProcessingInstruction(String, String),
    /// Value of an enclosed expression `{ ... }`.
    Enclosed(XdmSequence<Node>),
    /// Element constructor written inside an enclosed expression (`{ <b/> }`). It is
    /// built on its own with the lexical namespace scope of the enclosing constructors and
    /// then copied like any other enclosed node.
    EnclosedElement(ElementConstructor),
}

impl Content {
    pub fn enclosed_nodes<I: IntoIterator<Item = Node>>(nodes: I) -> Self {
        Content::Enclosed(node_sequence(nodes))
    }
}

impl From<ElementConstructor> for Content {
    fn from(c: ElementConstructor) -> Self {
        Content::Element(c)
    }
}

/// A direct (`<p:name a="v" xmlns:p="...">...</p:name>`) or computed
/// (`element {QName} {...}`) element constructor.
#[derive(Debug, Clone)]
pub struct ElementConstructor {
    name: CtorName,
    declarations: Vec<NamespaceBinding>,
    attributes: Vec<(CtorName, String)>,
    content: Vec<Content>,
}

impl ElementConstructor {
    /// Lexical name, resolved against the enclosing declarations and the static context.
    pub fn new(name: &str) -> Self {
        Self::with_name(CtorName::Lexical(name.to_string()))
    }

    /// Computed constructor with an already expanded name.
    pub fn computed(name: QName) -> Self {
        Self::with_name(CtorName::Resolved(name))
    }

    fn with_name(name: CtorName) -> Self {
        Self { name, declarations: Vec::new(), attributes: Vec::new(), content: Vec::new() }
    }

    /// Namespace declaration attribute (`xmlns:prefix="uri"`, `xmlns="uri"` for an empty prefix).
    pub fn namespace(mut self, prefix: &str, uri: &str) -> Self {
        self.declarations.push(NamespaceBinding::new(prefix, uri));
        self
    }

    pub fn attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((CtorName::Lexical(name.to_string()), value.to_string()));
        self
    }

    pub fn content(mut self, c: impl Into<Content>) -> Self {
        self.content.push(c.into());
        self
    }

    pub fn text(self, t: &str) -> Self {
        self.content(Content::Text(t.to_string()))
    }

    pub fn enclosed(self, items: XdmSequence<Node>) -> Self {
        self.content(Content::Enclosed(items))
    }

    pub fn enclosed_element(self, ctor: ElementConstructor) -> Self {
        self.content(Content::EnclosedElement(ctor))
    }
}

/// Lexical namespace scope of direct constructors: the static context plus the
/// declaration attributes of all enclosing constructors (`declared`).
#[derive(Clone)]
struct Lexical<'a> {
    ctx: &'a StaticContext,
    declared: InScopeNamespaces,
    default_ns: Option<String>,
}

impl<'a> Lexical<'a> {
    fn new(ctx: &'a StaticContext) -> Self {
        Self { ctx, declared: InScopeNamespaces::new(), default_ns: ctx.default_element_namespace.clone() }
    }

    fn declare(&mut self, b: &NamespaceBinding) {
        if b.is_default() {
            self.default_ns = (!b.uri.is_empty()).then(|| b.uri.clone());
        }
        self.declared.bind(&b.prefix, &b.uri);
    }

    fn resolve(&self, name: &CtorName, is_element: bool) -> Result<QName, Error> {
        let lexical = match name {
            CtorName::Resolved(q) => return Ok(q.clone()),
            CtorName::Lexical(l) => l.as_str(),
        };
        match lexical.split_once(':') {
            Some((prefix, local)) => {
                let uri = self.declared.get(prefix).or_else(|| self.ctx.resolve_prefix(prefix));
                match uri {
                    Some(uri) => Ok(QName::with_ns(Some(prefix), local, uri)),
                    None => Err(Error::from_code(ErrorCode::XPST0081, format!("unbound prefix '{prefix}'"))),
                }
            }
            None => match self.default_ns.as_deref().filter(|_| is_element) {
                Some(uri) => Ok(QName::with_ns(None, lexical, uri)),
                None => Ok(QName::local(lexical)),
            },
        }
    }
}

/// Content after enclosed expressions have been flattened.
enum Part {
    Attribute(QName, String),
    Namespace(NamespaceBinding),
    Text(String),
    Comment(String),
    ProcessingInstruction(String, String),
    Element(ElementConstructor),
    Standalone(ElementConstructor),
    Copy(Node),
}

impl Part {
    fn is_attribute_like(&self) -> bool {
        matches!(self, Part::Attribute(..) | Part::Namespace(_))
    }
}

fn flatten(content: Vec<Content>) -> Result<Vec<Part>, Error> {
    let mut parts = Vec::new();
    for c in content {
        match c {
            Content::Element(e) => parts.push(Part::Element(e)),
            Content::Text(t) => parts.push(Part::Text(t)),
            Content::Comment(c) => parts.push(Part::Comment(c)),
            Content::ProcessingInstruction(t, d) => parts.push(Part::ProcessingInstruction(t, d)),
            Content::Enclosed(items) => flatten_enclosed(items, &mut parts),
            Content::EnclosedElement(e) => parts.push(Part::Standalone(e)),
        }
    }
    let mut seen_content = false;
    for p in &parts {
        match p {
            Part::Text(t) if t.is_empty() => {}
            p if p.is_attribute_like() && seen_content => {
                return Err(Error::from_code(
                    ErrorCode::XQTY0024,
                    "attribute or namespace node follows other element content",
                ));
            }
            p if !p.is_attribute_like() => seen_content = true,
            _ => {}
        }
    }
    Ok(parts)
}

fn flatten_enclosed(items: XdmSequence<Node>, parts: &mut Vec<Part>) {
    // adjacent atomic values become one text node, separated by single spaces
    let mut atomics: Vec<String> = Vec::new();
    let flush = |atomics: &mut Vec<String>, parts: &mut Vec<Part>| {
        if !atomics.is_empty() {
            parts.push(Part::Text(atomics.join(" ")));
            atomics.clear();
        }
    };
    for item in items {
        match item {
            XdmItem::Atomic(a) => atomics.push(a.lexical()),
            XdmItem::Node(n) => {
                flush(&mut atomics, parts);
                match n.kind() {
                    NodeKind::Document => parts.extend(n.children().map(Part::Copy)),
                    NodeKind::Attribute => {
                        if let Some(name) = n.name() {
                            parts.push(Part::Attribute(name, n.string_value()));
                        }
                    }
                    NodeKind::Namespace => {
                        let prefix = n.name().map(|q| q.local).unwrap_or_default();
                        parts.push(Part::Namespace(NamespaceBinding::new(prefix, n.string_value())));
                    }
                    NodeKind::Text => parts.push(Part::Text(n.string_value())),
                    _ => parts.push(Part::Copy(n)),
                }
            }
        }
    }
    flush(&mut atomics, parts);
}

/// Evaluate an element constructor.
pub fn element(ctx: &StaticContext, ctor: ElementConstructor) -> Result<Node, Error> {
    let mut b = TreeBuilder::new();
    build_element(&mut b, ctx, ctor, &Lexical::new(ctx), &InScopeNamespaces::new())?;
    b.finish()
}

fn build_element(
    b: &mut TreeBuilder,
    ctx: &StaticContext,
    ctor: ElementConstructor,
    outer: &Lexical<'_>,
    parent_scope: &InScopeNamespaces,
) -> Result<(), Error> {
    let mut lexical = outer.clone();
    let mut own = InScopeNamespaces::new();
    let mut declared_prefixes: Vec<&str> = Vec::with_capacity(ctor.declarations.len());
    for d in &ctor.declarations {
        validate_declaration(&d.prefix, &d.uri)?;
        if declared_prefixes.contains(&d.prefix.as_str()) {
            return Err(Error::from_code(
                ErrorCode::XQST0071,
                format!("namespace prefix '{}' declared twice", d.prefix),
            ));
        }
        declared_prefixes.push(&d.prefix);
        lexical.declare(d);
        own.bind(&d.prefix, &d.uri);
    }

    let name = lexical.resolve(&ctor.name, true)?;
    check_element_name(&name)?;
    let mut attributes = Vec::with_capacity(ctor.attributes.len());
    for (n, v) in &ctor.attributes {
        let q = lexical.resolve(n, false)?;
        check_attribute_name(&q)?;
        attributes.push((q, v.clone()));
    }

    let parts = flatten(ctor.content)?;
    for p in &parts {
        match p {
            Part::Attribute(q, v) => attributes.push((q.clone(), v.clone())),
            Part::Namespace(binding) => {
                validate_computed(&binding.prefix, &binding.uri)?;
                if own.get(&binding.prefix).is_some_and(|u| u != binding.uri) {
                    return Err(Error::from_code(
                        ErrorCode::XQDY0102,
                        format!("namespace node for '{}' conflicts with another binding", binding.prefix),
                    ));
                }
                own.bind(&binding.prefix, &binding.uri);
            }
            _ => {}
        }
    }

    let mut scope = parent_scope.clone();
    for binding in own.iter() {
        scope.bind(&binding.prefix, &binding.uri);
    }
    if own.get("").is_none() && ctor.declarations.iter().any(|d| d.is_default() && d.uri.is_empty()) {
        scope.remove("");
    }
    bind_element_name(&name, &own, &mut scope)?;
    let attributes = fixup_attributes(attributes, &mut scope);

    b.start_element(name, scope.clone())?;
    for (q, v) in attributes {
        b.attribute(q, v)?;
    }
    for p in parts {
        match p {
            Part::Attribute(..) | Part::Namespace(_) => {}
            Part::Text(t) => b.text(&t)?,
            Part::Comment(c) => {
                b.comment(check_comment(c)?)?;
            }
            Part::ProcessingInstruction(t, d) => {
                let d = check_processing_instruction(&t, d)?;
                b.processing_instruction(&t, d)?;
            }
            Part::Element(nested) => build_element(b, ctx, nested, &lexical, &scope)?,
            Part::Standalone(nested) => {
                let built = build_standalone(ctx, nested, &lexical)?;
                copy_into(b, &built, ctx.copy_namespaces, Some(&scope))?;
            }
            Part::Copy(n) => copy_into(b, &n, ctx.copy_namespaces, Some(&scope))?,
        }
    }
    b.end()
}

fn build_standalone(ctx: &StaticContext, ctor: ElementConstructor, lexical: &Lexical<'_>) -> Result<Node, Error> {
    let mut b = TreeBuilder::new();
    build_element(&mut b, ctx, ctor, lexical, &lexical.declared)?;
    b.finish()
}

/// Make the element's own name resolvable in `scope`.
fn bind_element_name(name: &QName, own: &InScopeNamespaces, scope: &mut InScopeNamespaces) -> Result<(), Error> {
    let prefix = name.prefix_str();
    match &name.ns_uri {
        Some(uri) => {
            if own.get(prefix).is_some_and(|u| u != uri.as_str()) {
                return Err(Error::from_code(
                    ErrorCode::XQDY0102,
                    format!("prefix '{prefix}' of element '{name}' is bound to another namespace"),
                ));
            }
            if prefix != "xml" {
                scope.bind(prefix, uri);
            }
        }
        None => {
            if own.get("").is_some() {
                return Err(Error::from_code(
                    ErrorCode::XQDY0102,
                    format!("element '{name}' in no namespace cannot carry a default namespace binding"),
                ));
            }
            scope.remove("");
        }
    }
    Ok(())
}

/// Give namespaced attributes a prefix that is bound to their URI in `scope`, adding
/// bindings (or inventing prefixes) as needed.
fn fixup_attributes(attributes: Vec<(QName, String)>, scope: &mut InScopeNamespaces) -> Vec<(QName, String)> {
    attributes
        .into_iter()
        .map(|(mut q, v)| {
            if let Some(uri) = q.ns_uri.clone() {
                let prefix = q.prefix_str();
                if prefix == "xml" {
                    return (q, v);
                }
                if !prefix.is_empty() && scope.get(prefix).is_none_or(|u| u == uri) {
                    scope.bind(prefix, &uri);
                } else {
                    q.prefix = Some(attribute_prefix(scope, &uri));
                }
            }
            (q, v)
        })
        .collect()
}

/// Deep copy of `node` appended to the open container of `b`.
fn copy_into(
    b: &mut TreeBuilder,
    node: &Node,
    mode: CopyNamespacesMode,
    new_parent: Option<&InScopeNamespaces>,
) -> Result<(), Error> {
    match node.kind() {
        NodeKind::Element => {
            let Some(name) = node.name() else {
                return Err(Error::from_code(ErrorCode::FOER0000, "element without a name"));
            };
            let attributes: Vec<(QName, String)> =
                node.attributes().filter_map(|a| a.name().map(|q| (q, a.string_value()))).collect();
            let used = used_bindings(&name, attributes.iter().map(|(q, _)| q));
            let scope = mode.copy_bindings(&name, &node.in_scope_namespaces(), &used, new_parent);
            b.start_element(name, scope.clone())?;
            for (q, v) in attributes {
                b.attribute(q, v)?;
            }
            for c in node.children() {
                copy_into(b, &c, mode, Some(&scope))?;
            }
            b.end()
        }
        NodeKind::Document => {
            for c in node.children() {
                copy_into(b, &c, mode, new_parent)?;
            }
            Ok(())
        }
        NodeKind::Text => b.text(&node.string_value()),
        NodeKind::Comment => b.comment(node.string_value()).map(|_| ()),
        NodeKind::ProcessingInstruction => {
            let target = node.name().map(|q| q.local).unwrap_or_default();
            b.processing_instruction(&target, node.string_value()).map(|_| ())
        }
        NodeKind::Attribute => match node.name() {
            Some(q) => b.attribute(q, node.string_value()).map(|_| ()),
            None => Ok(()),
        },
        NodeKind::Namespace => Err(Error::from_code(
            ErrorCode::XPTY0004,
            "namespace nodes cannot be copied as element children",
        )),
    }
}

/// Standalone deep copy of a node (`copy` without modifications).
pub fn copy(ctx: &StaticContext, node: &Node) -> Result<Node, Error> {
    match node.kind() {
        NodeKind::Text => Ok(TreeBuilder::leaf(NodeKind::Text, None, node.string_value())),
        NodeKind::Attribute | NodeKind::Namespace => {
            Ok(TreeBuilder::leaf(node.kind(), node.name(), node.string_value()))
        }
        NodeKind::Document => {
            let mut b = TreeBuilder::new();
            b.start_document()?;
            copy_into(&mut b, node, ctx.copy_namespaces, None)?;
            b.end()?;
            b.finish()
        }
        _ => {
            debug!(mode = %ctx.copy_namespaces, kind = %node.kind(), "copy node");
            let mut b = TreeBuilder::new();
            copy_into(&mut b, node, ctx.copy_namespaces, None)?;
            b.finish()
        }
    }
}

/// `document { ... }`. Attribute and namespace items are a type error.
pub fn document(ctx: &StaticContext, content: Vec<Content>) -> Result<Node, Error> {
    let parts = flatten(content)?;
    let lexical = Lexical::new(ctx);
    let empty = InScopeNamespaces::new();
    let mut b = TreeBuilder::new();
    b.start_document()?;
    for p in parts {
        match p {
            Part::Attribute(..) | Part::Namespace(_) => {
                return Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    "document constructor content contains an attribute or namespace node",
                ));
            }
            Part::Text(t) => b.text(&t)?,
            Part::Comment(c) => {
                b.comment(check_comment(c)?)?;
            }
            Part::ProcessingInstruction(t, d) => {
                let d = check_processing_instruction(&t, d)?;
                b.processing_instruction(&t, d)?;
            }
            Part::Element(e) => build_element(&mut b, ctx, e, &lexical, &empty)?,
            Part::Standalone(e) => {
                let built = build_standalone(ctx, e, &lexical)?;
                copy_into(&mut b, &built, ctx.copy_namespaces, None)?;
            }
            Part::Copy(n) => copy_into(&mut b, &n, ctx.copy_namespaces, None)?,
        }
    }
    b.end()?;
    b.finish()
}

/// Atomized string content of a computed constructor: string values of nodes and
/// lexical forms of atomics, joined by single spaces. `None` for the empty sequence.
fn atomized_content(content: &[XdmItem<Node>]) -> Option<String> {
    if content.is_empty() {
        return None;
    }
    let parts: Vec<String> = content
        .iter()
        .map(|i| match i {
            XdmItem::Node(n) => n.string_value(),
            XdmItem::Atomic(a) => a.lexical(),
        })
        .collect();
    Some(parts.join(" "))
}

/// `text { ... }`. The empty sequence constructs nothing; an empty string constructs a
/// text node with an empty string value.
pub fn text(content: &[XdmItem<Node>]) -> Option<Node> {
    atomized_content(content).map(|s| TreeBuilder::leaf(NodeKind::Text, None, s))
}

pub fn atomic_string(s: &str) -> XdmItem<Node> {
    XdmItem::Atomic(XdmAtomicValue::String(s.to_string()))
}

fn check_comment(content: String) -> Result<String, Error> {
    if content.contains("--") || content.ends_with('-') {
        return Err(Error::from_code(
            ErrorCode::XQDY0072,
            "comment content must not contain '--' or end with '-'",
        ));
    }
    Ok(content)
}

/// `comment { ... }`.
pub fn comment(content: &[XdmItem<Node>]) -> Result<Node, Error> {
    let s = check_comment(atomized_content(content).unwrap_or_default())?;
    Ok(TreeBuilder::leaf(NodeKind::Comment, None, s))
}

fn check_processing_instruction(target: &str, content: String) -> Result<String, Error> {
    if !is_ncname(target) {
        return Err(Error::from_code(ErrorCode::XQDY0041, format!("'{target}' is not a valid PI target")));
    }
    if target.eq_ignore_ascii_case("xml") {
        return Err(Error::from_code(ErrorCode::XQDY0064, "PI target must not be 'xml'"));
    }
    if content.contains("?>") {
        return Err(Error::from_code(ErrorCode::XQDY0026, "PI content must not contain '?>'"));
    }
    Ok(content.trim_start().to_string())
}

/// `processing-instruction target { ... }`. Leading whitespace of the content is removed.
pub fn processing_instruction(target: &str, content: &[XdmItem<Node>]) -> Result<Node, Error> {
    let data = check_processing_instruction(target, atomized_content(content).unwrap_or_default())?;
    Ok(TreeBuilder::leaf(NodeKind::ProcessingInstruction, Some(QName::local(target)), data))
}

fn check_attribute_name(name: &QName) -> Result<(), Error> {
    let xmlns_name = name.ns_uri.is_none() && name.local == "xmlns";
    if xmlns_name || name.ns_uri.as_deref() == Some(XMLNS_URI) || name.prefix_str() == "xmlns" {
        return Err(Error::from_code(ErrorCode::XQDY0044, format!("'{name}' is not a valid attribute name")));
    }
    if name.prefix_str() == "xml" && name.ns_uri.as_deref() != Some(XML_URI) {
        return Err(Error::from_code(ErrorCode::XQDY0044, "the xml prefix must denote the XML namespace"));
    }
    if name.ns_uri.as_deref() == Some(XML_URI) && !matches!(name.prefix_str(), "xml" | "") {
        return Err(Error::from_code(
            ErrorCode::XQDY0044,
            format!("attribute '{name}' in the XML namespace must use the xml prefix"),
        ));
    }
    Ok(())
}

/// Element names may not live in the xmlns namespace, use the `xmlns` prefix, or pair
/// the `xml` prefix and the XML namespace with anything but each other.
fn check_element_name(name: &QName) -> Result<(), Error> {
    let prefix = name.prefix_str();
    let uri = name.ns_uri.as_deref();
    if prefix == "xmlns" || uri == Some(XMLNS_URI) || (prefix == "xml") != (uri == Some(XML_URI)) {
        return Err(Error::from_code(ErrorCode::XQDY0096, format!("'{name}' is not a valid element name")));
    }
    Ok(())
}

/// `attribute name { ... }`.
pub fn attribute(name: QName, content: &[XdmItem<Node>]) -> Result<Node, Error> {
    check_attribute_name(&name)?;
    Ok(TreeBuilder::leaf(NodeKind::Attribute, Some(name), atomized_content(content).unwrap_or_default()))
}

/// `namespace prefix { uri }`. Namespace nodes are named by their prefix; the default
/// namespace node has no name.
pub fn namespace(prefix: &str, uri: &str) -> Result<Node, Error> {
    if !prefix.is_empty() && !is_ncname(prefix) {
        return Err(Error::from_code(ErrorCode::XQDY0101, format!("'{prefix}' is not a valid prefix")));
    }
    validate_computed(prefix, uri)?;
    let name = (!prefix.is_empty()).then(|| QName::local(prefix));
    Ok(TreeBuilder::leaf(NodeKind::Namespace, name, uri))
}
