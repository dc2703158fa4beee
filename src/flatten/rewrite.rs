use crate::xsd::document::{Declaration, SchemaDocument};
use crate::xsd::qname::{ResolvedRef, XS_NAMESPACE, XS_PREFIX};
use crate::xsd::tree::XmlElement;

use super::plan::{OutputPlan, BACKREF_PREFIX};

/// Which generated document a rewritten declaration is destined for. The
/// distinction matters only for references into the main namespace.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutputTarget {
    Main,
    Common,
}

/// Deep-copies a declaration and re-encodes every reference in its subtree to
/// the plan's prefix scheme. Raw values are resolved in the origin document's
/// scope, never the output document's.
pub fn rewrite_declaration(
    declaration: &Declaration,
    origin: &SchemaDocument,
    plan: &OutputPlan,
    target: OutputTarget,
) -> XmlElement {
    let mut element = declaration.element.clone();
    element.rewrite_references(&mut |raw| Some(rewrite_value(raw, origin, plan, target)));
    element
}

fn rewrite_value(
    raw: &str,
    origin: &SchemaDocument,
    plan: &OutputPlan,
    target: OutputTarget,
) -> String {
    match origin.resolve_reference(raw) {
        Some(ResolvedRef::Known(key)) => {
            let local = key.local_name;
            match key.namespace_name.as_deref() {
                Some(XS_NAMESPACE) => format!("{XS_PREFIX}:{local}"),
                // A common namespace keeps its assigned prefix even inside
                // its own document, so self-references and cross-document
                // references are spelled identically.
                Some(namespace) if plan.common_prefix(namespace).is_some() => {
                    format!("{}:{local}", plan.common_prefix(namespace).unwrap())
                }
                namespace if namespace == plan.main_namespace.as_deref() => match target {
                    OutputTarget::Main => local,
                    OutputTarget::Common => format!("{BACKREF_PREFIX}:{local}"),
                },
                Some(namespace) if plan.foreign_prefix(namespace).is_some() => {
                    format!("{}:{local}", plan.foreign_prefix(namespace).unwrap())
                }
                // Unknown namespace: degrade to the bare local name so the
                // output stays well-formed.
                _ => local,
            }
        }
        Some(ResolvedRef::UnknownPrefix { local_name, .. }) => local_name,
        None => raw.to_string(),
    }
}
