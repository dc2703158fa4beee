use std::collections::{BTreeSet, VecDeque};

use crate::xsd::corpus::{Corpus, DocId};
use crate::xsd::qname::{QName, ResolvedRef, XS_NAMESPACE};

/// Computes the closure of declarations reachable from the entry document.
///
/// Every declaration physically present in the entry document is seeded (a
/// message document may declare several mutually-referenced top-level
/// symbols), then the queue follows each reference-bearing attribute in each
/// declaration's subtree, resolved in the origin document's prefix scope.
/// Built-in XSD types are not traversed. A reference that resolves to a key
/// absent from the corpus is dangling and simply not followed.
pub fn compute_reachable(corpus: &Corpus, entry: DocId) -> BTreeSet<QName> {
    let mut reachable = BTreeSet::new();
    let mut queue = VecDeque::new();

    for declaration in &corpus.document(entry).declarations {
        if reachable.insert(declaration.key.clone()) {
            queue.push_back(declaration.key.clone());
        }
    }

    while let Some(key) = queue.pop_front() {
        // A key whose origin can no longer be found is skipped, not an error.
        let Some((origin, declaration)) = corpus.lookup(&key) else {
            continue;
        };
        let origin = corpus.document(origin);

        let mut targets = Vec::new();
        declaration.element.for_each_reference(&mut |raw| {
            if let Some(ResolvedRef::Known(target)) = origin.resolve_reference(raw) {
                if target.namespace_name.as_deref() != Some(XS_NAMESPACE) {
                    targets.push(target);
                }
            }
        });

        for target in targets {
            if corpus.contains(&target) && reachable.insert(target.clone()) {
                queue.push_back(target);
            }
        }
    }

    reachable
}
