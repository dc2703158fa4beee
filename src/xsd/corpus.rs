use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::document::{Declaration, SchemaDocument};
use super::qname::{AnyURI, QName};

/// Index of a loaded document inside a [`Corpus`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocId(usize);

/// Decides which namespaces belong to the project itself. An import whose
/// namespace falls outside the family is foreign: its document is never
/// loaded or flattened, only copied verbatim when actually referenced.
#[derive(Clone, Debug)]
pub struct NamespaceFamily(String);

impl NamespaceFamily {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    pub fn contains(&self, namespace: &str) -> bool {
        namespace.starts_with(&self.0)
    }
}

#[derive(Copy, Clone, Debug)]
struct SymbolEntry {
    doc: DocId,
    index: usize,
}

/// All documents loaded for one flatten session, together with the symbol
/// table of every named declaration seen so far. Owned and passed explicitly;
/// there is no process-wide state, so independent sessions cannot interfere.
pub struct Corpus {
    source_dir: PathBuf,
    family: NamespaceFamily,
    documents: Vec<SchemaDocument>,
    /// Memoization by canonical path, including negative results so a broken
    /// document is parsed and reported once.
    by_path: HashMap<PathBuf, Option<DocId>>,
    symbols: HashMap<QName, SymbolEntry>,
    foreign_imports: BTreeMap<AnyURI, String>,
}

impl Corpus {
    pub fn new(source_dir: impl Into<PathBuf>, family: NamespaceFamily) -> Self {
        Self {
            source_dir: source_dir.into(),
            family,
            documents: Vec::new(),
            by_path: HashMap::new(),
            symbols: HashMap::new(),
            foreign_imports: BTreeMap::new(),
        }
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn document(&self, id: DocId) -> &SchemaDocument {
        &self.documents[id.0]
    }

    /// Documents in load order.
    pub fn documents(&self) -> impl Iterator<Item = &SchemaDocument> {
        self.documents.iter()
    }

    pub fn contains(&self, key: &QName) -> bool {
        self.symbols.contains_key(key)
    }

    /// Looks up a declaration together with its origin document, so callers
    /// can resolve the declaration's references in the correct prefix scope.
    pub fn lookup(&self, key: &QName) -> Option<(DocId, &Declaration)> {
        let entry = self.symbols.get(key)?;
        let declaration = self.documents[entry.doc.0].declarations.get(entry.index)?;
        Some((entry.doc, declaration))
    }

    /// Foreign namespaces recorded while loading, with their schema locations.
    pub fn foreign_imports(&self) -> &BTreeMap<AnyURI, String> {
        &self.foreign_imports
    }

    pub fn foreign_location(&self, namespace: &str) -> Option<&str> {
        self.foreign_imports.get(namespace).map(String::as_str)
    }

    /// Loads a document (and, recursively, everything it imports or includes
    /// within the project family), memoized by canonical path. Returns `None`
    /// if the document cannot be read or parsed; the failure is logged and
    /// siblings are unaffected.
    pub fn load(&mut self, location: &str) -> Option<DocId> {
        let joined = self.source_dir.join(location);
        let path = fs::canonicalize(&joined).unwrap_or(joined);
        if let Some(cached) = self.by_path.get(&path) {
            return *cached;
        }

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to read schema document");
                self.by_path.insert(path, None);
                return None;
            }
        };
        let document = match SchemaDocument::parse(&path, &text) {
            Ok(document) => document,
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to parse schema document");
                self.by_path.insert(path, None);
                return None;
            }
        };
        debug!(path = %path.display(), declarations = document.declarations.len(), "loaded schema document");

        let id = DocId(self.documents.len());
        // Registered before recursing so import cycles terminate.
        self.by_path.insert(path, Some(id));
        self.documents.push(document);
        self.index_declarations(id);

        for directive in self.documents[id.0].imports.clone() {
            let Some(location) = directive.schema_location else {
                continue;
            };
            match &directive.namespace {
                Some(namespace) if !directive.is_include && !self.family.contains(namespace) => {
                    self.foreign_imports
                        .entry(namespace.clone())
                        .or_insert(location);
                }
                _ => {
                    if let Some(imported) = self.load(&location) {
                        let imported_path = self.documents[imported.0].path.clone();
                        self.documents[id.0].imported_paths.push(imported_path);
                    }
                }
            }
        }

        Some(id)
    }

    /// Inserts the document's declarations into the symbol table. Collisions
    /// keep the most recently loaded declaration; a collision between
    /// structurally different content is reported rather than silently
    /// resolved.
    fn index_declarations(&mut self, id: DocId) {
        for (index, declaration) in self.documents[id.0].declarations.iter().enumerate() {
            let key = declaration.key.clone();
            if let Some(existing) = self.symbols.get(&key) {
                if existing.doc != id {
                    let previous = &self.documents[existing.doc.0];
                    if previous.declarations[existing.index].element != declaration.element {
                        warn!(
                            key = %key,
                            kept = %self.documents[id.0].path.display(),
                            replaced = %previous.path.display(),
                            "conflicting definitions for the same qualified name"
                        );
                    }
                }
            }
            self.symbols.insert(key, SymbolEntry { doc: id, index });
        }
    }
}
