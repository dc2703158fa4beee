pub mod corpus;
pub mod document;
pub mod error;
pub mod qname;
pub mod tree;

pub use corpus::{Corpus, DocId, NamespaceFamily};
pub use document::{Declaration, ImportDirective, SchemaDocument};
pub use error::ParseError;
pub use qname::{PrefixBindings, QName, ResolvedRef};
pub use tree::{XmlContent, XmlElement};
