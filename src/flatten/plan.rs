use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::debug;

use crate::xsd::corpus::{Corpus, DocId};
use crate::xsd::qname::{AnyURI, QName, ResolvedRef, XS_NAMESPACE, XS_PREFIX};

/// Prefix a common document uses to refer back into the main namespace.
pub const BACKREF_PREFIX: &str = "msg";

/// Marker in a namespace URI that routes its declarations to the
/// optional-types output document.
pub const OPTIONAL_NAMESPACE_MARKER: &str = "FullyOptional";

/// Namespaces one output document references, recorded so the emitter can
/// produce the matching import statements and prefix declarations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocDeps {
    pub commons: BTreeSet<AnyURI>,
    pub foreigns: BTreeSet<AnyURI>,
    /// Set when a common document references the main namespace and must
    /// import it under the back-reference prefix.
    pub main: bool,
}

/// One generated common-namespace document.
#[derive(Clone, Debug)]
pub struct CommonDocPlan {
    pub prefix: String,
    pub decls: Vec<QName>,
    pub deps: DocDeps,
}

/// A foreign namespace that at least one reachable declaration references.
/// Its schema file is copied verbatim and its prefix preserved.
#[derive(Clone, Debug)]
pub struct ForeignDep {
    pub prefix: String,
    pub schema_location: String,
}

/// Complete output layout for one flatten run, fixed before any rewriting
/// begins. Prefix assignment is injective: every namespace that needs a
/// prefix gets exactly one, used identically in every generated document.
#[derive(Clone, Debug)]
pub struct OutputPlan {
    pub main_namespace: Option<AnyURI>,
    pub main_version: String,
    pub main_decls: Vec<QName>,
    pub main_deps: DocDeps,
    pub commons: BTreeMap<AnyURI, CommonDocPlan>,
    pub foreign: BTreeMap<AnyURI, ForeignDep>,
}

impl OutputPlan {
    pub fn build(corpus: &Corpus, reachable: &BTreeSet<QName>, entry: DocId) -> Self {
        let entry_document = corpus.document(entry);
        let main_namespace = entry_document.target_namespace.clone();
        let main_version = entry_document
            .version
            .clone()
            .unwrap_or_else(|| "1.0".to_string());

        // Group reachable keys by namespace. Declarations without a target
        // namespace ride with the main document; they are referenced
        // unprefixed either way.
        let mut main_decls = Vec::new();
        let mut common_decls: BTreeMap<AnyURI, Vec<QName>> = BTreeMap::new();
        for key in reachable {
            match &key.namespace_name {
                Some(namespace)
                    if main_namespace.as_deref() != Some(namespace.as_str())
                        && namespace != XS_NAMESPACE =>
                {
                    common_decls
                        .entry(namespace.clone())
                        .or_default()
                        .push(key.clone());
                }
                _ => main_decls.push(key.clone()),
            }
        }
        sort_declarations(&mut main_decls);

        // Prefix assignment: prefer a prefix some source document already
        // binds to the namespace, otherwise synthesize one from a stable
        // counter so re-runs are reproducible.
        let mut used_prefixes: HashSet<String> = [
            String::new(),
            XS_PREFIX.to_string(),
            BACKREF_PREFIX.to_string(),
            "xml".to_string(),
        ]
        .into();
        let mut commons = BTreeMap::new();
        let mut counter = 0usize;
        for (namespace, mut decls) in common_decls {
            sort_declarations(&mut decls);
            let prefix = match find_author_prefix(corpus, &namespace, &used_prefixes) {
                Some(prefix) => prefix,
                None => loop {
                    let candidate = format!("cns{counter}");
                    counter += 1;
                    if !used_prefixes.contains(&candidate) {
                        break candidate;
                    }
                },
            };
            debug!(%namespace, %prefix, "assigned common namespace prefix");
            used_prefixes.insert(prefix.clone());
            commons.insert(
                namespace,
                CommonDocPlan {
                    prefix,
                    decls,
                    deps: DocDeps::default(),
                },
            );
        }

        // Second pass over every reachable declaration's subtree: record
        // which namespaces each output document references, and materialize
        // only the foreign namespaces that are actually used.
        let mut deps_by_owner: BTreeMap<Option<AnyURI>, DocDeps> = BTreeMap::new();
        let mut foreign: BTreeMap<AnyURI, ForeignDep> = BTreeMap::new();
        let mut foreign_counter = 0usize;
        for key in reachable {
            let Some((origin, declaration)) = corpus.lookup(key) else {
                continue;
            };
            let origin = corpus.document(origin);

            let mut targets = Vec::new();
            declaration.element.for_each_reference(&mut |raw| {
                if let Some(ResolvedRef::Known(target)) = origin.resolve_reference(raw) {
                    targets.push(target);
                }
            });

            let owner = match &key.namespace_name {
                Some(namespace) if commons.contains_key(namespace) => Some(namespace.clone()),
                _ => None,
            };
            let deps = deps_by_owner.entry(owner.clone()).or_default();
            for target in targets {
                let Some(target_namespace) = target.namespace_name else {
                    continue;
                };
                if target_namespace == XS_NAMESPACE
                    || owner.as_deref() == Some(target_namespace.as_str())
                {
                    continue;
                }
                if commons.contains_key(&target_namespace) {
                    deps.commons.insert(target_namespace);
                } else if main_namespace.as_deref() == Some(target_namespace.as_str()) {
                    if owner.is_some() {
                        deps.main = true;
                    }
                } else if let Some(location) = corpus.foreign_location(&target_namespace) {
                    if !foreign.contains_key(&target_namespace) {
                        let prefix = find_author_prefix(corpus, &target_namespace, &used_prefixes)
                            .unwrap_or_else(|| loop {
                                let candidate = format!("ns{foreign_counter}");
                                foreign_counter += 1;
                                if !used_prefixes.contains(&candidate) {
                                    break candidate;
                                }
                            });
                        used_prefixes.insert(prefix.clone());
                        foreign.insert(
                            target_namespace.clone(),
                            ForeignDep {
                                prefix,
                                schema_location: location.to_string(),
                            },
                        );
                    }
                    deps.foreigns.insert(target_namespace);
                }
                // Anything else is dangling; the rewriter degrades it to a
                // bare local name.
            }
        }

        let mut main_deps = DocDeps::default();
        for (owner, deps) in deps_by_owner {
            match owner {
                Some(namespace) => {
                    if let Some(common) = commons.get_mut(&namespace) {
                        common.deps = deps;
                    }
                }
                None => main_deps = deps,
            }
        }

        OutputPlan {
            main_namespace,
            main_version,
            main_decls,
            main_deps,
            commons,
            foreign,
        }
    }

    pub fn common_prefix(&self, namespace: &str) -> Option<&str> {
        self.commons.get(namespace).map(|common| common.prefix.as_str())
    }

    pub fn foreign_prefix(&self, namespace: &str) -> Option<&str> {
        self.foreign.get(namespace).map(|dep| dep.prefix.as_str())
    }

    pub fn is_optional_namespace(namespace: &str) -> bool {
        namespace.contains(OPTIONAL_NAMESPACE_MARKER)
    }
}

fn sort_declarations(decls: &mut [QName]) {
    decls.sort_by(|a, b| {
        a.local_name
            .cmp(&b.local_name)
            .then_with(|| a.namespace_name.cmp(&b.namespace_name))
    });
}

/// Scans loaded documents (in load order, bindings sorted by prefix) for a
/// prefix an author already bound to this namespace.
fn find_author_prefix(
    corpus: &Corpus,
    namespace: &str,
    used_prefixes: &HashSet<String>,
) -> Option<String> {
    for document in corpus.documents() {
        for (prefix, uri) in document.prefix_bindings.iter_sorted() {
            if uri == namespace && !prefix.is_empty() && !used_prefixes.contains(prefix) {
                return Some(prefix.to_string());
            }
        }
    }
    None
}
