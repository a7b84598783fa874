use core::fmt;
use std::sync::Arc;

use crate::consts::ERR_NS;
use crate::xdm::ExpandedName;

/// Error codes raised by the navigation and construction core.
///
/// The set is closed on purpose: callers match on `Error::code_enum()` instead of
/// comparing raw strings. Codes coming from elsewhere round-trip as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    FOER0000, // generic
    XPST0003, // syntax error (unknown axis name)
    XPST0005, // static type of an expression is empty-sequence
    XPST0081, // unbound namespace prefix
    XPTY0004, // operand type / cardinality mismatch
    XPTY0020, // axis step context item is not a node
    XQST0033, // duplicate namespace prefix declaration
    XQST0055, // more than one copy-namespaces declaration
    XQST0065, // more than one ordering mode declaration
    XQST0066, // more than one default element namespace declaration
    XQST0070, // invalid xml/xmlns prefix or namespace binding
    XQST0071, // duplicate namespace declaration attribute
    XQST0085, // undeclaration of a non-empty prefix
    XQTY0024, // attribute node after non-attribute content
    XQDY0025, // duplicate attribute name
    XQDY0026, // processing-instruction content contains "?>"
    XQDY0041, // invalid processing-instruction target
    XQDY0044, // attribute named xmlns / in the xmlns namespace
    XQDY0064, // processing-instruction target "xml"
    XQDY0072, // invalid comment content
    XQDY0096, // element name in the xmlns namespace or misusing the XML namespace
    XQDY0101, // invalid computed namespace binding
    XQDY0102, // conflicting namespace bindings on one element
    Unknown,
}

/// Coarse classification used to separate static from dynamic failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Static,
    Type,
    Dynamic,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FOER0000 => "FOER0000",
            ErrorCode::XPST0003 => "XPST0003",
            ErrorCode::XPST0005 => "XPST0005",
            ErrorCode::XPST0081 => "XPST0081",
            ErrorCode::XPTY0004 => "XPTY0004",
            ErrorCode::XPTY0020 => "XPTY0020",
            ErrorCode::XQST0033 => "XQST0033",
            ErrorCode::XQST0055 => "XQST0055",
            ErrorCode::XQST0065 => "XQST0065",
            ErrorCode::XQST0066 => "XQST0066",
            ErrorCode::XQST0070 => "XQST0070",
            ErrorCode::XQST0071 => "XQST0071",
            ErrorCode::XQST0085 => "XQST0085",
            ErrorCode::XQTY0024 => "XQTY0024",
            ErrorCode::XQDY0025 => "XQDY0025",
            ErrorCode::XQDY0026 => "XQDY0026",
            ErrorCode::XQDY0041 => "XQDY0041",
            ErrorCode::XQDY0044 => "XQDY0044",
            ErrorCode::XQDY0064 => "XQDY0064",
            ErrorCode::XQDY0072 => "XQDY0072",
            ErrorCode::XQDY0096 => "XQDY0096",
            ErrorCode::XQDY0101 => "XQDY0101",
            ErrorCode::XQDY0102 => "XQDY0102",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }

    /// Returns the QName (ExpandedName) for this code in the xqt-errors namespace.
    pub fn qname(&self) -> ExpandedName {
        ExpandedName::new(Some(ERR_NS.to_string()), self.as_str())
    }

    pub fn from_code(s: &str) -> Self {
        use ErrorCode::*;
        match s.strip_prefix("err:").unwrap_or(s) {
            "FOER0000" => FOER0000,
            "XPST0003" => XPST0003,
            "XPST0005" => XPST0005,
            "XPST0081" => XPST0081,
            "XPTY0004" => XPTY0004,
            "XPTY0020" => XPTY0020,
            "XQST0033" => XQST0033,
            "XQST0055" => XQST0055,
            "XQST0065" => XQST0065,
            "XQST0066" => XQST0066,
            "XQST0070" => XQST0070,
            "XQST0071" => XQST0071,
            "XQST0085" => XQST0085,
            "XQTY0024" => XQTY0024,
            "XQDY0025" => XQDY0025,
            "XQDY0026" => XQDY0026,
            "XQDY0041" => XQDY0041,
            "XQDY0044" => XQDY0044,
            "XQDY0064" => XQDY0064,
            "XQDY0072" => XQDY0072,
            "XQDY0096" => XQDY0096,
            "XQDY0101" => XQDY0101,
            "XQDY0102" => XQDY0102,
            _ => Unknown,
        }
    }

    /// Class is encoded in the code itself: `..ST` static, `..TY` type, everything else dynamic.
    pub fn class(&self) -> ErrorClass {
        let s = self.as_str();
        match s.get(2..4) {
            Some("ST") => ErrorClass::Static,
            Some("TY") => ErrorClass::Type,
            _ => ErrorClass::Dynamic,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub struct Error {
    pub code: ExpandedName,
    pub message: String,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new_qname(code: ExpandedName, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), source: None }
    }

    pub fn from_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self::new_qname(code.qname(), msg)
    }

    pub fn with_source(mut self, source: impl Into<Option<Arc<dyn std::error::Error + Send + Sync>>>) -> Self {
        self.source = source.into();
        self
    }

    pub fn code_enum(&self) -> ErrorCode {
        if self.code.ns_uri.as_deref() == Some(ERR_NS) {
            ErrorCode::from_code(&self.code.local)
        } else {
            ErrorCode::Unknown
        }
    }

    /// Foreign codes (outside xqt-errors) are treated as dynamic failures.
    pub fn class(&self) -> ErrorClass {
        match self.code_enum() {
            ErrorCode::Unknown => ErrorClass::Dynamic,
            code => code.class(),
        }
    }

    pub fn is_static(&self) -> bool {
        self.class() == ErrorClass::Static
    }

    /// Format the code as a human-readable string (err:LOCAL or Q{ns}local).
    pub fn format_code(&self) -> String {
        if self.code.ns_uri.as_deref() == Some(ERR_NS) {
            format!("err:{}", self.code.local)
        } else if let Some(ns) = &self.code.ns_uri {
            format!("Q{{{}}}{}", ns, self.code.local)
        } else {
            self.code.local.clone()
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {} ({})", self.message, self.format_code())
    }
}
