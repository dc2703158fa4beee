use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("not well-formed XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("root element <{root}> is not a schema")]
    NotASchema { root: String },
}
