//! Qualified Names
//!
//! Expanded XML names (namespace URI + local name) with an optional
//! lexical prefix, plus the well-known namespaces the builder and the
//! materializer need to recognise.

use memchr::memchr;
use std::borrow::Cow;
use std::fmt;

/// Well-known namespace URIs and prefixes
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
    pub const XML_PREFIX: &str = "xml";
    /// Lexical name of namespace declaration attributes (`xmlns`, `xmlns:p`)
    pub const XMLNS_ATTRIBUTE: &str = "xmlns";

    /// Reserved internal namespace used to tag the synthetic wrapper element
    pub const EXIST: &str = "http://exist.sourceforge.net/NS/exist";
    pub const EXIST_PREFIX: &str = "exist";
}

/// An expanded XML name.
///
/// The empty string stands for "no namespace"; a missing prefix means the
/// name is unprefixed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    namespace_uri: String,
    local_name: String,
    prefix: Option<String>,
}

impl QName {
    /// Create a name from its parts. An empty prefix is treated as no prefix.
    pub fn new(
        local_name: impl Into<String>,
        namespace_uri: impl Into<String>,
        prefix: Option<&str>,
    ) -> Self {
        QName {
            namespace_uri: namespace_uri.into(),
            local_name: local_name.into(),
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_owned),
        }
    }

    /// Create an unprefixed name in no namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        QName::new(local_name, "", None)
    }

    /// Parse a lexical `prefix:local` name in the given namespace
    pub fn parse(lexical: &str, namespace_uri: impl Into<String>) -> Self {
        let (prefix, local) = split_qname(lexical);
        QName::new(local, namespace_uri, prefix)
    }

    /// The `xml:id` attribute name
    pub fn xml_id() -> Self {
        QName::new("id", ns::XML, Some(ns::XML_PREFIX))
    }

    /// Name of the synthetic wrapper element placed around stored fragments
    pub fn wrapper() -> Self {
        QName::new("temp", ns::EXIST, Some(ns::EXIST_PREFIX))
    }

    /// Name of a namespace node declaring `prefix` (or the default
    /// namespace when `prefix` is empty) bound to `uri`.
    pub fn namespace_decl(prefix: &str, uri: impl Into<String>) -> Self {
        if prefix.is_empty() {
            QName::new(ns::XMLNS_ATTRIBUTE, uri, None)
        } else {
            QName::new(prefix, uri, Some(ns::XMLNS_ATTRIBUTE))
        }
    }

    #[inline]
    pub fn namespace_uri(&self) -> &str {
        &self.namespace_uri
    }

    #[inline]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    #[inline]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// True if the name is in no namespace
    #[inline]
    pub fn has_no_namespace(&self) -> bool {
        self.namespace_uri.is_empty()
    }

    /// Compare expanded names, ignoring the prefix
    pub fn matches(&self, other: &QName) -> bool {
        self.local_name == other.local_name && self.namespace_uri == other.namespace_uri
    }

    /// True for `xmlns` and `xmlns:*` attribute names
    pub fn is_namespace_declaration(&self) -> bool {
        match self.prefix() {
            Some(p) => p == ns::XMLNS_ATTRIBUTE,
            None => self.local_name == ns::XMLNS_ATTRIBUTE,
        }
    }

    /// For a namespace-node name, the prefix being declared (`""` for the
    /// default namespace).
    pub fn declared_prefix(&self) -> &str {
        if self.prefix.is_none() && self.local_name == ns::XMLNS_ATTRIBUTE {
            ""
        } else {
            &self.local_name
        }
    }

    /// The lexical form, `prefix:local` or `local`
    pub fn lexical(&self) -> Cow<'_, str> {
        match &self.prefix {
            Some(p) => Cow::Owned(format!("{}:{}", p, self.local_name)),
            None => Cow::Borrowed(&self.local_name),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lexical())
    }
}

/// Split a lexical name into prefix and local name at the first colon
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match memchr(b':', name.as_bytes()) {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("svg:rect"), (Some("svg"), "rect"));
        assert_eq!(split_qname("rect"), (None, "rect"));
    }

    #[test]
    fn test_parse_and_lexical() {
        let qn = QName::parse("repo:meta", "http://exist-db.org/xquery/repo");
        assert_eq!(qn.prefix(), Some("repo"));
        assert_eq!(qn.local_name(), "meta");
        assert_eq!(qn.lexical(), "repo:meta");
        assert_eq!(QName::local("a").lexical(), "a");
    }

    #[test]
    fn test_empty_prefix_is_none() {
        let qn = QName::new("a", "urn:x", Some(""));
        assert_eq!(qn.prefix(), None);
    }

    #[test]
    fn test_namespace_declarations() {
        let default = QName::namespace_decl("", "urn:x");
        assert!(default.is_namespace_declaration());
        assert_eq!(default.declared_prefix(), "");

        let prefixed = QName::namespace_decl("p", "urn:x");
        assert!(prefixed.is_namespace_declaration());
        assert_eq!(prefixed.declared_prefix(), "p");
        assert_eq!(prefixed.lexical(), "xmlns:p");

        assert!(!QName::local("xmlnsfoo").is_namespace_declaration());
    }

    #[test]
    fn test_matches_ignores_prefix() {
        let a = QName::new("id", ns::XML, Some("xml"));
        let b = QName::new("id", ns::XML, Some("x"));
        assert!(a.matches(&b));
        assert_ne!(a, b);
        assert!(QName::xml_id().matches(&a));
    }
}
