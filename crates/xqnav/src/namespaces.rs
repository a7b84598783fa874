//! Namespace bindings, in-scope namespace sets and copy-namespaces handling.
//!
//! Every element of an arena tree carries its complete in-scope namespace set, so
//! prefix resolution only ever looks at the nearest element. The `xml` binding is
//! implicit in every set and is never stored or removed.

use core::fmt;

use crate::consts::{XML_URI, XMLNS_URI};
use crate::error::{Error, ErrorCode};
use crate::model::{NodeKind, QName, XdmNode};

/// A `(prefix, uri)` pair. The empty prefix denotes the default element namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceBinding {
    pub prefix: String,
    pub uri: String,
}

impl NamespaceBinding {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), uri: uri.into() }
    }

    pub fn is_default(&self) -> bool {
        self.prefix.is_empty()
    }
}

impl fmt::Display for NamespaceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "xmlns=\"{}\"", self.uri)
        } else {
            write!(f, "xmlns:{}=\"{}\"", self.prefix, self.uri)
        }
    }
}

/// Validate a namespace declaration (prolog or namespace declaration attribute).
///
/// An empty `uri` with the empty prefix undeclares the default namespace; undeclaring a
/// non-empty prefix is rejected.
pub fn validate_declaration(prefix: &str, uri: &str) -> Result<(), Error> {
    if prefix == "xmlns" {
        return Err(Error::from_code(ErrorCode::XQST0070, "the xmlns prefix cannot be declared"));
    }
    if prefix == "xml" && uri != XML_URI {
        return Err(Error::from_code(
            ErrorCode::XQST0070,
            format!("the xml prefix cannot be bound to '{uri}'"),
        ));
    }
    if uri == XML_URI && prefix != "xml" {
        return Err(Error::from_code(
            ErrorCode::XQST0070,
            format!("the XML namespace cannot be bound to prefix '{prefix}'"),
        ));
    }
    if uri == XMLNS_URI {
        return Err(Error::from_code(ErrorCode::XQST0070, "the xmlns namespace cannot be bound"));
    }
    if !prefix.is_empty() && uri.is_empty() {
        return Err(Error::from_code(
            ErrorCode::XQST0085,
            format!("namespace prefix '{prefix}' cannot be undeclared"),
        ));
    }
    if !prefix.is_empty() && !is_ncname(prefix) {
        return Err(Error::from_code(ErrorCode::XQST0070, format!("'{prefix}' is not a valid prefix")));
    }
    Ok(())
}

/// Validate a computed namespace node. Same rules as declarations, but dynamic and the
/// URI may never be empty.
pub fn validate_computed(prefix: &str, uri: &str) -> Result<(), Error> {
    if uri.is_empty() {
        return Err(Error::from_code(ErrorCode::XQDY0101, "namespace node URI must not be empty"));
    }
    validate_declaration(prefix, uri).map_err(|e| Error::from_code(ErrorCode::XQDY0101, e.message))
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '\u{B7}')
}

/// Non-colonized XML name.
pub fn is_ncname(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_name_start(c) => chars.all(is_name_char),
        _ => false,
    }
}

/// In-scope namespace set of one element, unique by prefix and sorted by prefix.
///
/// The `xml` binding is implied and never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InScopeNamespaces {
    bindings: Vec<NamespaceBinding>,
}

impl InScopeNamespaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_URI);
        }
        self.bindings
            .binary_search_by(|b| b.prefix.as_str().cmp(prefix))
            .ok()
            .map(|i| self.bindings[i].uri.as_str())
    }

    pub fn contains_prefix(&self, prefix: &str) -> bool {
        prefix == "xml" || self.bindings.binary_search_by(|b| b.prefix.as_str().cmp(prefix)).is_ok()
    }

    /// Add or replace a binding. Binding the default prefix to the empty URI removes it.
    pub fn bind(&mut self, prefix: &str, uri: &str) {
        if prefix == "xml" {
            return;
        }
        match self.bindings.binary_search_by(|b| b.prefix.as_str().cmp(prefix)) {
            Ok(i) if uri.is_empty() => {
                self.bindings.remove(i);
            }
            Ok(i) => self.bindings[i].uri = uri.to_string(),
            Err(_) if uri.is_empty() => {}
            Err(i) => self.bindings.insert(i, NamespaceBinding::new(prefix, uri)),
        }
    }

    pub fn remove(&mut self, prefix: &str) {
        if let Ok(i) = self.bindings.binary_search_by(|b| b.prefix.as_str().cmp(prefix)) {
            self.bindings.remove(i);
        }
    }

    /// Add every binding of `outer` whose prefix is not bound here.
    pub fn inherit_from(&mut self, outer: &InScopeNamespaces) {
        for b in &outer.bindings {
            if !self.contains_prefix(&b.prefix) {
                self.bind(&b.prefix, &b.uri);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamespaceBinding> {
        self.bindings.iter()
    }

    /// Number of stored bindings, excluding the implicit `xml` binding.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl FromIterator<NamespaceBinding> for InScopeNamespaces {
    fn from_iter<I: IntoIterator<Item = NamespaceBinding>>(iter: I) -> Self {
        let mut out = InScopeNamespaces::new();
        for b in iter {
            out.bind(&b.prefix, &b.uri);
        }
        out
    }
}

/// Prefix for a namespaced attribute whose own prefix is empty or already taken by
/// another URI: `xml` for the XML namespace, else a prefix bound to `uri` in `scope`,
/// else the first free `nsN`, which is then bound.
pub fn attribute_prefix(scope: &mut InScopeNamespaces, uri: &str) -> String {
    if uri == XML_URI {
        return "xml".to_string();
    }
    if let Some(b) = scope.iter().find(|b| !b.is_default() && b.uri == uri) {
        return b.prefix.clone();
    }
    let mut n = 0usize;
    loop {
        let candidate = format!("ns{n}");
        if !scope.contains_prefix(&candidate) {
            scope.bind(&candidate, uri);
            return candidate;
        }
        n += 1;
    }
}

/// Bindings an element needs for its own name and its attribute names (namespace fixup).
///
/// Unprefixed attributes never use the default namespace, so namespaced attributes
/// without a prefix are skipped here; the constructor assigns them a prefix first.
pub fn used_bindings<'a>(name: &QName, attributes: impl IntoIterator<Item = &'a QName>) -> Vec<NamespaceBinding> {
    let mut out = Vec::new();
    if let Some(uri) = &name.ns_uri {
        out.push(NamespaceBinding::new(name.prefix_str(), uri.as_str()));
    }
    for a in attributes {
        if let (Some(p), Some(uri)) = (a.prefix.as_deref(), a.ns_uri.as_deref())
            && !p.is_empty()
            && p != "xml"
        {
            out.push(NamespaceBinding::new(p, uri));
        }
    }
    out
}

/// The `declare copy-namespaces` setting: `preserve`/`no-preserve` × `inherit`/`no-inherit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CopyNamespacesMode {
    pub preserve: bool,
    pub inherit: bool,
}

impl Default for CopyNamespacesMode {
    fn default() -> Self {
        Self { preserve: true, inherit: true }
    }
}

impl CopyNamespacesMode {
    pub const fn new(preserve: bool, inherit: bool) -> Self {
        Self { preserve, inherit }
    }

    /// In-scope namespaces of an element copied under this mode.
    ///
    /// `original` is the source element's in-scope set, `used` the bindings its own name
    /// and attributes require, and `new_parent` the in-scope set of the element the
    /// copy is placed under (if any).
    pub fn copy_bindings(
        &self,
        element_name: &QName,
        original: &InScopeNamespaces,
        used: &[NamespaceBinding],
        new_parent: Option<&InScopeNamespaces>,
    ) -> InScopeNamespaces {
        let mut out = if self.preserve { original.clone() } else { used.iter().cloned().collect() };
        if self.inherit
            && let Some(parent) = new_parent
        {
            out.inherit_from(parent);
        }
        if element_name.ns_uri.is_none() {
            out.remove("");
        }
        out
    }
}

impl fmt::Display for CopyNamespacesMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}",
            if self.preserve { "preserve" } else { "no-preserve" },
            if self.inherit { "inherit" } else { "no-inherit" }
        )
    }
}

/// In-scope set of a node as seen through the adapter trait.
///
/// Attributes and namespace nodes resolve through their parent element; documents,
/// detached attributes and leaf nodes only see the implicit `xml` binding.
pub fn in_scope_namespaces<N: XdmNode>(node: &N) -> InScopeNamespaces {
    let Some(element) = nearest_element(node) else {
        return InScopeNamespaces::new();
    };
    element
        .namespaces()
        .filter_map(|ns| {
            let prefix = ns.name().map(|q| q.local).unwrap_or_default();
            (prefix != "xml").then(|| NamespaceBinding::new(prefix, ns.string_value()))
        })
        .collect()
}

/// Resolve `prefix` (empty for the default namespace) in the scope of `node`.
pub fn resolve_prefix<N: XdmNode>(node: &N, prefix: &str) -> Option<String> {
    if prefix == "xml" {
        return Some(XML_URI.to_string());
    }
    let element = nearest_element(node)?;
    element.namespaces().find_map(|ns| {
        let p = ns.name().map(|q| q.local).unwrap_or_default();
        (p == prefix).then(|| ns.string_value())
    })
}

fn nearest_element<N: XdmNode>(node: &N) -> Option<N> {
    match node.kind() {
        NodeKind::Element => Some(node.clone()),
        NodeKind::Attribute | NodeKind::Namespace => node.parent().filter(|p| p.kind() == NodeKind::Element),
        _ => None,
    }
}
