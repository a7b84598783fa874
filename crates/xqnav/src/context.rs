//! Static configuration threaded through every call: ordering mode, copy-namespaces
//! mode, statically known namespaces and the static typing policy.
//!
//! A [`StaticContext`] is an immutable value. Nested `ordered { }` / `unordered { }`
//! expressions evaluate against a locally overridden copy ([`StaticContext::ordered`],
//! [`StaticContext::unordered`]); nothing here is global state.
use core::fmt;
use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::consts::{ERR_NS, FNS, LOCAL_NS, XML_URI, XS_NS, XSI_NS};
use crate::error::{Error, ErrorCode};
use crate::model::QName;
use crate::namespaces::{CopyNamespacesMode, validate_declaration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrderingMode {
    #[default]
    Ordered,
    Unordered,
}

impl fmt::Display for OrderingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderingMode::Ordered => "ordered",
            OrderingMode::Unordered => "unordered",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceBindings {
    pub by_prefix: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct StaticContext {
    pub ordering: OrderingMode,
    pub copy_namespaces: CopyNamespacesMode,
    pub namespaces: NamespaceBindings,
    pub default_element_namespace: Option<String>,
    /// Reject statically impossible steps with XPST0005 instead of evaluating them to
    /// the empty sequence.
    pub static_typing: bool,
}

impl Default for StaticContext {
    fn default() -> Self {
        let mut ns = NamespaceBindings::default();
        for (p, uri) in [("xml", XML_URI), ("xs", XS_NS), ("xsi", XSI_NS), ("fn", FNS), ("local", LOCAL_NS), ("err", ERR_NS)] {
            ns.by_prefix.insert(p.to_string(), uri.to_string());
        }
        Self {
            ordering: OrderingMode::Ordered,
            copy_namespaces: CopyNamespacesMode::default(),
            namespaces: ns,
            default_element_namespace: None,
            static_typing: true,
        }
    }
}

impl StaticContext {
    /// Copy with the ordering mode forced to `ordered` (an `ordered { }` expression).
    pub fn ordered(&self) -> Self {
        self.with_ordering(OrderingMode::Ordered)
    }

    /// Copy with the ordering mode forced to `unordered` (an `unordered { }` expression).
    pub fn unordered(&self) -> Self {
        self.with_ordering(OrderingMode::Unordered)
    }

    pub fn with_ordering(&self, ordering: OrderingMode) -> Self {
        Self { ordering, ..self.clone() }
    }

    pub fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        if prefix.is_empty() {
            return self.default_element_namespace.as_deref();
        }
        self.namespaces.by_prefix.get(prefix).map(String::as_str)
    }

    /// Resolve a lexical `prefix:local` or `local` name against the statically known
    /// namespaces. Unprefixed names take the default element namespace only when
    /// `use_default` is set (element names and element name tests).
    pub fn resolve_qname(&self, lexical: &str, use_default: bool) -> Result<QName, Error> {
        match lexical.split_once(':') {
            Some((prefix, local)) => match self.resolve_prefix(prefix) {
                Some(uri) => Ok(QName::with_ns(Some(prefix), local, uri)),
                None => Err(Error::from_code(ErrorCode::XPST0081, format!("unbound prefix '{prefix}'"))),
            },
            None => match self.default_element_namespace.as_deref().filter(|_| use_default) {
                Some(uri) => Ok(QName::with_ns(None, lexical, uri)),
                None => Ok(QName::local(lexical)),
            },
        }
    }
}

/// Builder for `StaticContext`. The `xml` binding is fixed and cannot be overridden.
pub struct StaticContextBuilder {
    ctx: StaticContext,
}

impl Default for StaticContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticContextBuilder {
    pub fn new() -> Self {
        Self { ctx: StaticContext::default() }
    }

    pub fn with_ordering(mut self, ordering: OrderingMode) -> Self {
        self.ctx.ordering = ordering;
        self
    }

    pub fn with_copy_namespaces(mut self, mode: CopyNamespacesMode) -> Self {
        self.ctx.copy_namespaces = mode;
        self
    }

    /// Register a namespace prefix → URI mapping. Attempts to override the reserved `xml`
    /// prefix are ignored.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        let p = prefix.into();
        if p == "xml" {
            return self;
        }
        self.ctx.namespaces.by_prefix.insert(p, uri.into());
        self
    }

    pub fn with_default_element_namespace(mut self, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        self.ctx.default_element_namespace = (!uri.is_empty()).then_some(uri);
        self
    }

    pub fn with_static_typing(mut self, enabled: bool) -> Self {
        self.ctx.static_typing = enabled;
        self
    }

    pub fn build(self) -> StaticContext {
        self.ctx
    }
}

/// Applies prolog declarations to a static context.
///
/// Each of `declare ordering`, `declare copy-namespaces` and
/// `declare default element namespace` may occur at most once, even with the same
/// value; a prefix may be declared only once.
///
/// ```
/// use xqnav::context::{OrderingMode, Prolog};
/// use xqnav::error::ErrorCode;
///
/// let mut prolog = Prolog::default();
/// prolog.declare_ordering(OrderingMode::Unordered).unwrap();
/// let err = prolog.declare_ordering(OrderingMode::Unordered).unwrap_err();
/// assert_eq!(err.code_enum(), ErrorCode::XQST0065);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Prolog {
    ctx: StaticContext,
    ordering_declared: bool,
    copy_namespaces_declared: bool,
    default_element_declared: bool,
    declared_prefixes: HashSet<String>,
}

impl Prolog {
    pub fn new(base: StaticContext) -> Self {
        Self { ctx: base, ..Self::default() }
    }

    pub fn declare_ordering(&mut self, mode: OrderingMode) -> Result<(), Error> {
        if std::mem::replace(&mut self.ordering_declared, true) {
            return Err(Error::from_code(ErrorCode::XQST0065, "ordering mode declared more than once"));
        }
        debug!(%mode, "declare ordering");
        self.ctx.ordering = mode;
        Ok(())
    }

    pub fn declare_copy_namespaces(&mut self, mode: CopyNamespacesMode) -> Result<(), Error> {
        if std::mem::replace(&mut self.copy_namespaces_declared, true) {
            return Err(Error::from_code(ErrorCode::XQST0055, "copy-namespaces mode declared more than once"));
        }
        debug!(%mode, "declare copy-namespaces");
        self.ctx.copy_namespaces = mode;
        Ok(())
    }

    /// `declare namespace prefix = "uri"`. A zero-length URI removes the binding.
    pub fn declare_namespace(&mut self, prefix: &str, uri: &str) -> Result<(), Error> {
        if prefix == "xml" || prefix == "xmlns" {
            return Err(Error::from_code(
                ErrorCode::XQST0070,
                format!("the {prefix} prefix cannot be declared in the prolog"),
            ));
        }
        if !uri.is_empty() {
            validate_declaration(prefix, uri)?;
        }
        if !self.declared_prefixes.insert(prefix.to_string()) {
            return Err(Error::from_code(ErrorCode::XQST0033, format!("namespace prefix '{prefix}' declared twice")));
        }
        debug!(prefix, uri, "declare namespace");
        if uri.is_empty() {
            self.ctx.namespaces.by_prefix.remove(prefix);
        } else {
            self.ctx.namespaces.by_prefix.insert(prefix.to_string(), uri.to_string());
        }
        Ok(())
    }

    pub fn declare_default_element_namespace(&mut self, uri: &str) -> Result<(), Error> {
        if std::mem::replace(&mut self.default_element_declared, true) {
            return Err(Error::from_code(ErrorCode::XQST0066, "default element namespace declared more than once"));
        }
        if uri == XML_URI || uri == crate::consts::XMLNS_URI {
            return Err(Error::from_code(ErrorCode::XQST0070, format!("'{uri}' cannot be the default namespace")));
        }
        debug!(uri, "declare default element namespace");
        self.ctx.default_element_namespace = (!uri.is_empty()).then(|| uri.to_string());
        Ok(())
    }

    pub fn context(&self) -> &StaticContext {
        &self.ctx
    }

    pub fn finish(self) -> StaticContext {
        self.ctx
    }
}
