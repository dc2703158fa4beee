use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::xsd::corpus::Corpus;
use crate::xsd::qname::{XS_NAMESPACE, XS_PREFIX};
use crate::xsd::tree::{XmlContent, XmlElement};

use super::plan::{CommonDocPlan, OutputPlan, BACKREF_PREFIX};
use super::rewrite::{rewrite_declaration, OutputTarget};
use super::{FlattenError, FlattenOutcome};

const INDENT: &str = "  ";

/// Serializes the plan into one main document plus one document per common
/// namespace, and copies every referenced foreign schema into the output
/// directory. Declarations are emitted sorted by local name and file names
/// derive only from the entry name, so re-runs are byte-identical.
pub fn emit(
    corpus: &Corpus,
    plan: &OutputPlan,
    entry_filename: &str,
    output_dir: &Path,
) -> Result<FlattenOutcome, FlattenError> {
    fs::create_dir_all(output_dir)?;
    let base = entry_base_name(entry_filename);

    let mut common_documents = Vec::new();
    for (namespace, common) in &plan.commons {
        let filename = common_filename(&base, namespace);
        let path = output_dir.join(&filename);
        let text = render_common(corpus, plan, namespace, common, &base, entry_filename);
        fs::write(&path, text)?;
        debug!(path = %path.display(), declarations = common.decls.len(), "wrote common document");
        common_documents.push(path);
    }

    let main_path = output_dir.join(entry_filename);
    fs::write(&main_path, render_main(corpus, plan, &base))?;
    info!(path = %main_path.display(), declarations = plan.main_decls.len(), "wrote main document");

    let copied_foreign = copy_foreign_schemas(corpus, plan, output_dir)?;

    Ok(FlattenOutcome {
        main_document: main_path,
        common_documents,
        copied_foreign,
    })
}

fn entry_base_name(entry_filename: &str) -> String {
    Path::new(entry_filename)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| entry_filename.to_string())
}

/// Output file name for a common namespace, derived purely from the entry
/// document's base name.
pub fn common_filename(base: &str, namespace: &str) -> String {
    if OutputPlan::is_optional_namespace(namespace) {
        format!("{base}_OptionalCommonTypes.xsd")
    } else {
        format!("{base}_CommonTypes.xsd")
    }
}

fn render_common(
    corpus: &Corpus,
    plan: &OutputPlan,
    namespace: &str,
    common: &CommonDocPlan,
    base: &str,
    entry_filename: &str,
) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = write!(out, "<xs:schema xmlns:{XS_PREFIX}=\"{XS_NAMESPACE}\"");
    let _ = write!(
        out,
        " xmlns:{}=\"{}\"",
        common.prefix,
        escape_attribute(namespace)
    );
    for other in &common.deps.commons {
        if let Some(prefix) = plan.common_prefix(other) {
            let _ = write!(out, " xmlns:{}=\"{}\"", prefix, escape_attribute(other));
        }
    }
    for foreign in &common.deps.foreigns {
        if let Some(prefix) = plan.foreign_prefix(foreign) {
            let _ = write!(out, " xmlns:{}=\"{}\"", prefix, escape_attribute(foreign));
        }
    }
    if common.deps.main {
        if let Some(main_namespace) = &plan.main_namespace {
            let _ = write!(
                out,
                " xmlns:{BACKREF_PREFIX}=\"{}\"",
                escape_attribute(main_namespace)
            );
        }
    }
    let _ = write!(
        out,
        " targetNamespace=\"{}\" elementFormDefault=\"qualified\" version=\"1.0\">",
        escape_attribute(namespace)
    );
    out.push('\n');

    if common.deps.main {
        if let Some(main_namespace) = &plan.main_namespace {
            write_import(&mut out, main_namespace, entry_filename);
        }
    }
    for other in &common.deps.commons {
        write_import(&mut out, other, &common_filename(base, other));
    }
    for foreign in &common.deps.foreigns {
        if let Some(dep) = plan.foreign.get(foreign) {
            write_import(&mut out, foreign, &dep.schema_location);
        }
    }

    for key in &common.decls {
        let Some((origin, declaration)) = corpus.lookup(key) else {
            continue;
        };
        let origin = corpus.document(origin);
        let element = rewrite_declaration(declaration, origin, plan, OutputTarget::Common);
        write_element(&mut out, &element, 1);
    }

    out.push_str("</xs:schema>\n");
    out
}

fn render_main(corpus: &Corpus, plan: &OutputPlan, base: &str) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = write!(out, "<xs:schema xmlns:{XS_PREFIX}=\"{XS_NAMESPACE}\"");
    if let Some(main_namespace) = &plan.main_namespace {
        // The default namespace makes unprefixed type references inside the
        // main document resolve back to it.
        let _ = write!(out, " xmlns=\"{}\"", escape_attribute(main_namespace));
    }
    for common in &plan.main_deps.commons {
        if let Some(prefix) = plan.common_prefix(common) {
            let _ = write!(out, " xmlns:{}=\"{}\"", prefix, escape_attribute(common));
        }
    }
    for foreign in &plan.main_deps.foreigns {
        if let Some(prefix) = plan.foreign_prefix(foreign) {
            let _ = write!(out, " xmlns:{}=\"{}\"", prefix, escape_attribute(foreign));
        }
    }
    if let Some(main_namespace) = &plan.main_namespace {
        let _ = write!(
            out,
            " targetNamespace=\"{}\"",
            escape_attribute(main_namespace)
        );
    }
    let _ = write!(
        out,
        " elementFormDefault=\"qualified\" version=\"{}\">",
        escape_attribute(&plan.main_version)
    );
    out.push('\n');

    for common in &plan.main_deps.commons {
        write_import(&mut out, common, &common_filename(base, common));
    }
    for foreign in &plan.main_deps.foreigns {
        if let Some(dep) = plan.foreign.get(foreign) {
            write_import(&mut out, foreign, &dep.schema_location);
        }
    }

    for key in &plan.main_decls {
        let Some((origin, declaration)) = corpus.lookup(key) else {
            continue;
        };
        let origin = corpus.document(origin);
        let element = rewrite_declaration(declaration, origin, plan, OutputTarget::Main);
        write_element(&mut out, &element, 1);
    }

    out.push_str("</xs:schema>\n");
    out
}

fn write_import(out: &mut String, namespace: &str, schema_location: &str) {
    let _ = writeln!(
        out,
        "{INDENT}<xs:import namespace=\"{}\" schemaLocation=\"{}\"/>",
        escape_attribute(namespace),
        escape_attribute(schema_location)
    );
}

fn write_element(out: &mut String, element: &XmlElement, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    let tag = tag_name(element);
    let _ = write!(out, "<{tag}");
    for (name, value) in &element.attributes {
        let _ = write!(out, " {}=\"{}\"", name, escape_attribute(value));
    }
    if element.children.is_empty() {
        out.push_str("/>\n");
        return;
    }
    if let [XmlContent::Text(text)] = element.children.as_slice() {
        let _ = writeln!(out, ">{}</{tag}>", escape_text(text.trim()));
        return;
    }
    out.push_str(">\n");
    for child in &element.children {
        match child {
            XmlContent::Element(child) => write_element(out, child, depth + 1),
            XmlContent::Text(text) => {
                for _ in 0..=depth {
                    out.push_str(INDENT);
                }
                let _ = writeln!(out, "{}", escape_text(text.trim()));
            }
        }
    }
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    let _ = writeln!(out, "</{tag}>");
}

fn tag_name(element: &XmlElement) -> String {
    match element.namespace.as_deref() {
        Some(XS_NAMESPACE) => format!("{XS_PREFIX}:{}", element.name),
        _ => element.name.clone(),
    }
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Copies every foreign schema the plan marked used into the output
/// directory. An existing copy is never overwritten.
fn copy_foreign_schemas(
    corpus: &Corpus,
    plan: &OutputPlan,
    output_dir: &Path,
) -> Result<Vec<String>, FlattenError> {
    let mut copied = Vec::new();
    for (namespace, dep) in &plan.foreign {
        let source = corpus.source_dir().join(&dep.schema_location);
        let destination = output_dir.join(&dep.schema_location);
        if destination.exists() {
            debug!(%namespace, location = %dep.schema_location, "foreign schema already present");
            continue;
        }
        if !source.exists() {
            warn!(%namespace, location = %dep.schema_location, "referenced foreign schema is missing from the corpus");
            continue;
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&source, &destination)?;
        info!(%namespace, location = %dep.schema_location, "copied foreign schema");
        copied.push(dep.schema_location.clone());
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_attribute_values() {
        assert_eq!(
            escape_attribute(r#"a<b>&"c""#),
            "a&lt;b&gt;&amp;&quot;c&quot;"
        );
        assert_eq!(escape_text("1 < 2 & 3 > 2"), "1 &lt; 2 &amp; 3 &gt; 2");
    }

    #[test]
    fn optional_marker_selects_the_optional_filename() {
        assert_eq!(
            common_filename("IATA_OrderViewRS", "urn:x:CommonTypes"),
            "IATA_OrderViewRS_CommonTypes.xsd"
        );
        assert_eq!(
            common_filename("IATA_OrderViewRS", "urn:x:FullyOptionalTypes"),
            "IATA_OrderViewRS_OptionalCommonTypes.xsd"
        );
    }
}
