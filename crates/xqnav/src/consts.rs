//! Well-known namespace URIs.

/// Namespace permanently bound to the `xml` prefix.
pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace of namespace declaration attributes; never bindable.
pub const XMLNS_URI: &str = "http://www.w3.org/2000/xmlns/";

/// Namespace URI used for W3C-defined XPath/XQuery error codes (xqt-errors).
pub const ERR_NS: &str = "http://www.w3.org/2005/xqt-errors";

pub const XS_NS: &str = "http://www.w3.org/2001/XMLSchema";

pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

pub const FNS: &str = "http://www.w3.org/2005/xpath-functions";

pub const LOCAL_NS: &str = "http://www.w3.org/2005/xquery-local-functions";
