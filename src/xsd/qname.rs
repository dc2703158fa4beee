use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;

pub type NCName = String;
pub type AnyURI = String;

/// The XML Schema definition namespace. References into it name built-in
/// types and are never rewritten or traversed.
pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Conventional prefix for [`XS_NAMESPACE`] in generated documents.
pub const XS_PREFIX: &str = "xs";

lazy_static! {
    /// Bindings a document can rely on even when it does not declare them
    /// itself: the conventional `xs` prefix and the reserved `xml` prefix
    /// (Namespaces in XML 1.0, §3).
    pub static ref BUILTIN_BINDINGS: PrefixBindings = {
        let mut bindings = PrefixBindings::new();
        bindings.insert(XS_PREFIX, XS_NAMESPACE);
        bindings.insert("xml", XML_NAMESPACE);
        bindings
    };
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub namespace_name: Option<AnyURI>,
    pub local_name: NCName,
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(namespace_name) = self.namespace_name.as_ref() {
            write!(f, "{{{}}}:{}", namespace_name, self.local_name)
        } else {
            write!(f, "{}", self.local_name)
        }
    }
}

impl QName {
    pub fn with_namespace(
        namespace_name: impl Into<String>,
        local_name: impl Into<String>,
    ) -> Self {
        Self::with_optional_namespace(Some(namespace_name), local_name)
    }

    pub fn with_optional_namespace(
        namespace_name: Option<impl Into<String>>,
        local_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace_name: namespace_name.map(Into::into),
            local_name: local_name.into(),
        }
    }
}

/// Prefix → namespace bindings of exactly one document. Bindings are never
/// merged across documents; every reference is resolved in the scope of the
/// document that contains it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrefixBindings(HashMap<String, AnyURI>);

impl PrefixBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, prefix: impl Into<String>, uri: impl Into<AnyURI>) {
        self.0.insert(prefix.into(), uri.into());
    }

    pub fn uri_for(&self, prefix: &str) -> Option<&str> {
        self.0.get(prefix).map(String::as_str)
    }

    /// Bindings sorted by prefix, for deterministic scans.
    pub fn iter_sorted(&self) -> impl Iterator<Item = (&str, &str)> {
        let mut bindings: Vec<_> = self
            .0
            .iter()
            .map(|(prefix, uri)| (prefix.as_str(), uri.as_str()))
            .collect();
        bindings.sort_unstable();
        bindings.into_iter()
    }
}

/// Outcome of resolving a raw qualified-name string.
///
/// A prefix that cannot be mapped to a namespace is kept as an explicit
/// variant instead of a sentinel namespace, so downstream passes can treat
/// it as "cannot verify, do not traverse" without mistaking it for a real
/// namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedRef {
    Known(QName),
    UnknownPrefix { prefix: String, local_name: NCName },
}

/// Resolves a raw value like `cns:OrderType` against the bindings and target
/// namespace of the document it was found in. An unprefixed value names a
/// declaration in the document's own target namespace. Returns `None` for an
/// empty value.
pub fn resolve_reference(
    raw: &str,
    target_namespace: Option<&str>,
    bindings: &PrefixBindings,
) -> Option<ResolvedRef> {
    if raw.is_empty() {
        return None;
    }
    match raw.rsplit_once(':') {
        Some((prefix, local_name)) => {
            let uri = bindings
                .uri_for(prefix)
                .or_else(|| BUILTIN_BINDINGS.uri_for(prefix));
            match uri {
                Some(uri) => Some(ResolvedRef::Known(QName::with_namespace(uri, local_name))),
                None => Some(ResolvedRef::UnknownPrefix {
                    prefix: prefix.to_string(),
                    local_name: local_name.to_string(),
                }),
            }
        }
        None => Some(ResolvedRef::Known(QName::with_optional_namespace(
            target_namespace,
            raw,
        ))),
    }
}
