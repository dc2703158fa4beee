pub mod emit;
pub mod plan;
pub mod reachability;
pub mod rewrite;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::xsd::corpus::Corpus;

pub use plan::OutputPlan;
pub use rewrite::OutputTarget;

#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("entry document {} does not exist", .0.display())]
    MissingEntry(PathBuf),
    #[error("entry document {} could not be loaded", .0.display())]
    EntryUnloadable(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What one flatten run wrote.
#[derive(Debug)]
pub struct FlattenOutcome {
    pub main_document: PathBuf,
    pub common_documents: Vec<PathBuf>,
    /// Schema locations of foreign documents copied verbatim this run.
    pub copied_foreign: Vec<String>,
}

/// Flattens one entry document into a self-contained document set under
/// `output_dir`.
///
/// A missing or unloadable entry fails only this call; the corpus keeps
/// whatever it has already loaded and can serve further entries.
pub fn flatten_message(
    corpus: &mut Corpus,
    entry_filename: &str,
    output_dir: &Path,
) -> Result<FlattenOutcome, FlattenError> {
    let entry_path = corpus.source_dir().join(entry_filename);
    if !entry_path.exists() {
        return Err(FlattenError::MissingEntry(entry_path));
    }
    let entry = corpus
        .load(entry_filename)
        .ok_or(FlattenError::EntryUnloadable(entry_path))?;

    let reachable = reachability::compute_reachable(corpus, entry);
    debug!(entry = entry_filename, reachable = reachable.len(), "computed reachable set");

    let plan = OutputPlan::build(corpus, &reachable, entry);
    emit::emit(corpus, &plan, entry_filename, output_dir)
}
