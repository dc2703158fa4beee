//! Resolver and rewriter for multi-file NDC message schemas: loads an entry
//! document and everything it transitively imports, computes the set of
//! declarations actually reachable from the message, and re-emits them as a
//! small, self-contained document set with a consistent prefix vocabulary.

pub mod flatten;
pub mod manifest;
pub mod xsd;

pub use flatten::{flatten_message, FlattenError, FlattenOutcome};
pub use manifest::{ManifestError, MessageManifest};
pub use xsd::corpus::{Corpus, DocId, NamespaceFamily};
pub use xsd::document::{Declaration, SchemaDocument};
pub use xsd::qname::{QName, ResolvedRef};
