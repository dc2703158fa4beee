use std::path::{Path, PathBuf};

use roxmltree::Document;

use super::error::ParseError;
use super::qname::{resolve_reference, AnyURI, PrefixBindings, QName, ResolvedRef};
use super::tree::XmlElement;

/// Top-level element kinds that contribute named, reusable declarations.
pub const DECLARATION_KINDS: [&str; 5] =
    ["complexType", "simpleType", "element", "group", "attributeGroup"];

/// A named top-level declaration keyed by (target namespace, name).
#[derive(Clone, Debug)]
pub struct Declaration {
    pub key: QName,
    pub element: XmlElement,
}

/// An `import` or `include` child of the schema root. Whether the referenced
/// document is loaded or recorded as foreign is decided by the corpus, not
/// here.
#[derive(Clone, Debug)]
pub struct ImportDirective {
    pub namespace: Option<AnyURI>,
    pub schema_location: Option<String>,
    pub is_include: bool,
}

/// Structural record of one parsed schema document: its namespace identity,
/// its own prefix scope, and its named top-level declarations.
#[derive(Clone, Debug)]
pub struct SchemaDocument {
    pub path: PathBuf,
    pub target_namespace: Option<AnyURI>,
    pub version: Option<String>,
    pub prefix_bindings: PrefixBindings,
    pub declarations: Vec<Declaration>,
    pub imports: Vec<ImportDirective>,
    /// Paths of project documents this one pulled in; grows while loading
    /// recurses.
    pub imported_paths: Vec<PathBuf>,
}

impl SchemaDocument {
    pub fn parse(path: &Path, text: &str) -> Result<Self, ParseError> {
        let document = Document::parse(text)?;
        let root = document.root_element();
        if root.tag_name().name() != "schema" {
            return Err(ParseError::NotASchema {
                root: root.tag_name().name().to_string(),
            });
        }

        let target_namespace = root.attribute("targetNamespace").map(str::to_string);
        let version = root.attribute("version").map(str::to_string);

        // Prefix bindings can be declared on any element, not just the root.
        // Fold them the way a start-ns event stream would, the last
        // declaration of a prefix winning. The parse tree itself normalizes
        // prefixes away, so this is the only place they are visible.
        let mut prefix_bindings = PrefixBindings::new();
        for node in root.descendants().filter(|node| node.is_element()) {
            for namespace in node.namespaces() {
                if let Some(prefix) = namespace.name() {
                    prefix_bindings.insert(prefix, namespace.uri());
                }
            }
        }

        let mut declarations = Vec::new();
        let mut imports = Vec::new();
        for child in root.children().filter(|child| child.is_element()) {
            match child.tag_name().name() {
                kind if DECLARATION_KINDS.contains(&kind) => {
                    // Unnamed top-level declarations carry nothing referable.
                    if let Some(name) = child.attribute("name") {
                        declarations.push(Declaration {
                            key: QName::with_optional_namespace(target_namespace.as_deref(), name),
                            element: XmlElement::from_node(child),
                        });
                    }
                }
                "import" => imports.push(ImportDirective {
                    namespace: child.attribute("namespace").map(str::to_string),
                    schema_location: child.attribute("schemaLocation").map(str::to_string),
                    is_include: false,
                }),
                "include" => imports.push(ImportDirective {
                    namespace: None,
                    schema_location: child.attribute("schemaLocation").map(str::to_string),
                    is_include: true,
                }),
                _ => {}
            }
        }

        Ok(SchemaDocument {
            path: path.to_path_buf(),
            target_namespace,
            version,
            prefix_bindings,
            declarations,
            imports,
            imported_paths: Vec::new(),
        })
    }

    /// Resolves a raw reference value in this document's scope.
    pub fn resolve_reference(&self, raw: &str) -> Option<ResolvedRef> {
        resolve_reference(raw, self.target_namespace.as_deref(), &self.prefix_bindings)
    }
}
