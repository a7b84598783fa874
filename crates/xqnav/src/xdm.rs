use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpandedName {
    pub ns_uri: Option<String>,
    pub local: String,
}

impl ExpandedName {
    pub fn new(ns_uri: Option<String>, local: impl Into<String>) -> Self {
        Self { ns_uri, local: local.into() }
    }

    /// Name in no namespace.
    pub fn local(local: impl Into<String>) -> Self {
        Self::new(None, local)
    }
}

impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns_uri {
            Some(ns) => write!(f, "Q{{{}}}{}", ns, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Atomic values without schema-derived types.
///
/// Only the primitive types that node typed values and deep-equal need are modelled.
#[derive(Debug, Clone, PartialEq)]
pub enum XdmAtomicValue {
    Boolean(bool),
    String(String),
    Integer(i64),
    Decimal(f64),
    Double(f64),
    Float(f32),
    AnyUri(String),
    QName { ns_uri: Option<String>, prefix: Option<String>, local: String },
    UntypedAtomic(String),
}

impl XdmAtomicValue {
    /// Lexical form used when atomics are turned into text content.
    pub fn lexical(&self) -> String {
        match self {
            XdmAtomicValue::Boolean(b) => b.to_string(),
            XdmAtomicValue::String(s) | XdmAtomicValue::AnyUri(s) | XdmAtomicValue::UntypedAtomic(s) => s.clone(),
            XdmAtomicValue::Integer(i) => i.to_string(),
            XdmAtomicValue::Decimal(d) => format_decimal(*d),
            XdmAtomicValue::Double(d) => format_double(*d),
            XdmAtomicValue::Float(f) => format_double(f64::from(*f)),
            XdmAtomicValue::QName { prefix, local, .. } => match prefix {
                Some(p) if !p.is_empty() => format!("{p}:{local}"),
                _ => local.clone(),
            },
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            XdmAtomicValue::Boolean(_) => "xs:boolean",
            XdmAtomicValue::String(_) => "xs:string",
            XdmAtomicValue::Integer(_) => "xs:integer",
            XdmAtomicValue::Decimal(_) => "xs:decimal",
            XdmAtomicValue::Double(_) => "xs:double",
            XdmAtomicValue::Float(_) => "xs:float",
            XdmAtomicValue::AnyUri(_) => "xs:anyURI",
            XdmAtomicValue::QName { .. } => "xs:QName",
            XdmAtomicValue::UntypedAtomic(_) => "xs:untypedAtomic",
        }
    }

    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            XdmAtomicValue::Integer(i) => Some(*i as f64),
            XdmAtomicValue::Decimal(d) | XdmAtomicValue::Double(d) => Some(*d),
            XdmAtomicValue::Float(f) => Some(f64::from(*f)),
            _ => None,
        }
    }

    pub(crate) fn as_str_like(&self) -> Option<&str> {
        match self {
            XdmAtomicValue::String(s) | XdmAtomicValue::AnyUri(s) | XdmAtomicValue::UntypedAtomic(s) => Some(s),
            _ => None,
        }
    }
}

fn format_decimal(d: f64) -> String {
    if d.fract() == 0.0 && d.abs() < 1e15 { format!("{d:.0}") } else { d.to_string() }
}

fn format_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d.is_infinite() {
        if d > 0.0 { "INF".to_string() } else { "-INF".to_string() }
    } else if d == 0.0 {
        if d.is_sign_negative() { "-0".to_string() } else { "0".to_string() }
    } else {
        format_decimal(d)
    }
}

pub type XdmSequence<N> = Vec<XdmItem<N>>;

#[derive(Debug, Clone, PartialEq)]
pub enum XdmItem<N> {
    Node(N),
    Atomic(XdmAtomicValue),
}

impl<N> XdmItem<N> {
    pub fn as_node(&self) -> Option<&N> {
        match self {
            XdmItem::Node(n) => Some(n),
            XdmItem::Atomic(_) => None,
        }
    }
}

impl<N> From<XdmAtomicValue> for XdmItem<N> {
    fn from(v: XdmAtomicValue) -> Self {
        XdmItem::Atomic(v)
    }
}

impl<N> fmt::Display for XdmItem<N>
where
    N: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XdmItem::Node(_) => write!(f, "<node>"),
            XdmItem::Atomic(a) => write!(f, "{a:?}"),
        }
    }
}

/// Wrap nodes as a sequence.
pub fn node_sequence<N, I: IntoIterator<Item = N>>(nodes: I) -> XdmSequence<N> {
    nodes.into_iter().map(XdmItem::Node).collect()
}
