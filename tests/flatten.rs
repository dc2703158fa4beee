use std::fs;
use std::path::Path;

use ndc_flatten::flatten::{flatten_message, FlattenError};
use ndc_flatten::xsd::corpus::{Corpus, NamespaceFamily};

const MAIN_NS: &str = "http://www.iata.org/IATA/2015/00/2021.3/IATA_OrderViewRS";
const COMMON_NS: &str = "http://www.iata.org/IATA/2015/00/2021.3/IATA_OffersAndOrdersCommonTypes";
const OPTIONAL_NS: &str = "http://www.iata.org/IATA/2015/00/2021.3/IATA_FullyOptionalTypes";
const DSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";

/// Writes a small corpus: an entry message, a common-types document, an
/// optional-types document and a foreign signature schema. When `signed` is
/// set, the message pulls in the declaration that references the foreign
/// namespace; otherwise that declaration stays unreachable.
fn write_corpus(dir: &Path, signed: bool) {
    let signature_element = if signed {
        r#"<xs:element name="Sig" type="cns:SignedOrderType"/>"#
    } else {
        ""
    };
    fs::write(
        dir.join("IATA_OrderViewRS.xsd"),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:cns="{COMMON_NS}"
           targetNamespace="{MAIN_NS}"
           elementFormDefault="qualified"
           version="5.000">
  <xs:import namespace="{COMMON_NS}" schemaLocation="IATA_OffersAndOrdersCommonTypes.xsd"/>
  <xs:element name="IATA_OrderViewRS" type="IATA_OrderViewRS_Type"/>
  <xs:complexType name="IATA_OrderViewRS_Type">
    <xs:sequence>
      <xs:element name="Response" type="cns:ResponseType"/>
      {signature_element}
    </xs:sequence>
  </xs:complexType>
</xs:schema>"#
        ),
    )
    .unwrap();

    fs::write(
        dir.join("IATA_OffersAndOrdersCommonTypes.xsd"),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:cns="{COMMON_NS}"
           xmlns:opt="{OPTIONAL_NS}"
           xmlns:ds="{DSIG_NS}"
           xmlns:vms="{MAIN_NS}"
           targetNamespace="{COMMON_NS}"
           elementFormDefault="qualified"
           version="1.0">
  <xs:import namespace="{OPTIONAL_NS}" schemaLocation="IATA_FullyOptionalTypes.xsd"/>
  <xs:import namespace="{DSIG_NS}" schemaLocation="xmldsig-core-schema.xsd"/>
  <xs:complexType name="ResponseType">
    <xs:sequence>
      <xs:element name="OrderRef" type="cns:OrderRefType"/>
      <xs:element name="Pointer" type="cns:PointerType"/>
      <xs:element name="Extras" type="opt:ExtrasType"/>
    </xs:sequence>
  </xs:complexType>
  <xs:complexType name="OrderRefType">
    <xs:simpleContent>
      <xs:extension base="xs:string"/>
    </xs:simpleContent>
  </xs:complexType>
  <xs:complexType name="PointerType">
    <xs:sequence>
      <xs:element name="Original" type="vms:IATA_OrderViewRS_Type"/>
    </xs:sequence>
  </xs:complexType>
  <xs:complexType name="SignedOrderType">
    <xs:sequence>
      <xs:element ref="ds:Signature"/>
    </xs:sequence>
  </xs:complexType>
  <xs:simpleType name="UnusedType">
    <xs:restriction base="xs:string"/>
  </xs:simpleType>
</xs:schema>"#
        ),
    )
    .unwrap();

    fs::write(
        dir.join("IATA_FullyOptionalTypes.xsd"),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           targetNamespace="{OPTIONAL_NS}"
           elementFormDefault="qualified">
  <xs:complexType name="ExtrasType">
    <xs:sequence>
      <xs:element name="Note" type="xs:string"/>
    </xs:sequence>
  </xs:complexType>
</xs:schema>"#
        ),
    )
    .unwrap();

    fs::write(
        dir.join("xmldsig-core-schema.xsd"),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="{DSIG_NS}">
  <xs:element name="Signature" type="xs:string"/>
</xs:schema>"#
        ),
    )
    .unwrap();
}

fn flatten_into(source: &Path, output: &Path) -> Result<ndc_flatten::FlattenOutcome, FlattenError> {
    let mut corpus = Corpus::new(source, NamespaceFamily::new("http://www.iata.org"));
    flatten_message(&mut corpus, "IATA_OrderViewRS.xsd", output)
}

#[test]
fn produces_main_and_common_documents() {
    let source = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_corpus(source.path(), false);
    let outcome = flatten_into(source.path(), output.path()).unwrap();

    let main = fs::read_to_string(output.path().join("IATA_OrderViewRS.xsd")).unwrap();
    assert!(main.contains(&format!("targetNamespace=\"{MAIN_NS}\"")));
    assert!(main.contains("version=\"5.000\""));
    assert!(main.contains(&format!("xmlns=\"{MAIN_NS}\"")));
    assert!(main.contains(&format!("xmlns:cns=\"{COMMON_NS}\"")));
    assert!(main.contains(
        &format!("<xs:import namespace=\"{COMMON_NS}\" schemaLocation=\"IATA_OrderViewRS_CommonTypes.xsd\"/>")
    ));
    // Same-namespace references stay unprefixed in the main document.
    assert!(main.contains("type=\"IATA_OrderViewRS_Type\""));
    assert!(main.contains("type=\"cns:ResponseType\""));
    // The optional namespace is not referenced by any main declaration.
    assert!(!main.contains(OPTIONAL_NS));

    let common = fs::read_to_string(output.path().join("IATA_OrderViewRS_CommonTypes.xsd")).unwrap();
    assert!(common.contains(&format!("targetNamespace=\"{COMMON_NS}\"")));
    assert!(common.contains("version=\"1.0\""));
    assert!(common.contains("base=\"xs:string\""));
    // Self-references use the assigned prefix even inside their own document.
    assert!(common.contains("type=\"cns:OrderRefType\""));
    // References into the optional common namespace keep the author prefix.
    assert!(common.contains("type=\"opt:ExtrasType\""));
    assert!(common.contains(&format!(
        "<xs:import namespace=\"{OPTIONAL_NS}\" schemaLocation=\"IATA_OrderViewRS_OptionalCommonTypes.xsd\"/>"
    )));

    let optional =
        fs::read_to_string(output.path().join("IATA_OrderViewRS_OptionalCommonTypes.xsd")).unwrap();
    assert!(optional.contains(&format!("targetNamespace=\"{OPTIONAL_NS}\"")));
    assert!(optional.contains("name=\"ExtrasType\""));

    assert_eq!(outcome.common_documents.len(), 2);
    assert!(outcome.copied_foreign.is_empty());
}

#[test]
fn common_document_backreferences_the_main_namespace() {
    let source = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_corpus(source.path(), false);
    flatten_into(source.path(), output.path()).unwrap();

    let common = fs::read_to_string(output.path().join("IATA_OrderViewRS_CommonTypes.xsd")).unwrap();
    // The entry namespace is imported under the dedicated back-reference
    // prefix, not the author's `vms` binding and not an empty one.
    assert!(common.contains(&format!("xmlns:msg=\"{MAIN_NS}\"")));
    assert!(common.contains(&format!(
        "<xs:import namespace=\"{MAIN_NS}\" schemaLocation=\"IATA_OrderViewRS.xsd\"/>"
    )));
    assert!(common.contains("type=\"msg:IATA_OrderViewRS_Type\""));
    assert!(!common.contains("vms:"));
}

#[test]
fn output_is_minimal_and_never_leaks_main_declarations() {
    let source = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_corpus(source.path(), false);
    flatten_into(source.path(), output.path()).unwrap();

    let common = fs::read_to_string(output.path().join("IATA_OrderViewRS_CommonTypes.xsd")).unwrap();
    assert!(!common.contains("UnusedType"));
    assert!(!common.contains("SignedOrderType"));
    assert!(!common.contains("name=\"IATA_OrderViewRS_Type\""));

    // Declarations are sorted by local name for reproducible diffs.
    let order = common.find("name=\"OrderRefType\"").unwrap();
    let pointer = common.find("name=\"PointerType\"").unwrap();
    let response = common.find("name=\"ResponseType\"").unwrap();
    assert!(order < pointer && pointer < response);
}

#[test]
fn unused_foreign_schema_is_not_copied_or_imported() {
    let source = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_corpus(source.path(), false);
    let outcome = flatten_into(source.path(), output.path()).unwrap();

    assert!(outcome.copied_foreign.is_empty());
    assert!(!output.path().join("xmldsig-core-schema.xsd").exists());
    for entry in fs::read_dir(output.path()).unwrap() {
        let text = fs::read_to_string(entry.unwrap().path()).unwrap();
        assert!(!text.contains(DSIG_NS));
    }
}

#[test]
fn used_foreign_schema_is_copied_and_imported_once() {
    let source = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_corpus(source.path(), true);
    let outcome = flatten_into(source.path(), output.path()).unwrap();

    assert_eq!(outcome.copied_foreign, vec!["xmldsig-core-schema.xsd"]);
    let copied = fs::read_to_string(output.path().join("xmldsig-core-schema.xsd")).unwrap();
    let original = fs::read_to_string(source.path().join("xmldsig-core-schema.xsd")).unwrap();
    assert_eq!(copied, original);

    let common = fs::read_to_string(output.path().join("IATA_OrderViewRS_CommonTypes.xsd")).unwrap();
    assert!(common.contains(&format!("xmlns:ds=\"{DSIG_NS}\"")));
    assert!(common.contains(&format!(
        "<xs:import namespace=\"{DSIG_NS}\" schemaLocation=\"xmldsig-core-schema.xsd\"/>"
    )));
    assert!(common.contains("ref=\"ds:Signature\""));

    // A second run against the same output never overwrites the copy.
    let marker = "<!-- locally modified -->";
    fs::write(
        output.path().join("xmldsig-core-schema.xsd"),
        format!("{original}{marker}"),
    )
    .unwrap();
    let outcome = flatten_into(source.path(), output.path()).unwrap();
    assert!(outcome.copied_foreign.is_empty());
    let kept = fs::read_to_string(output.path().join("xmldsig-core-schema.xsd")).unwrap();
    assert!(kept.ends_with(marker));
}

#[test]
fn flattening_is_idempotent() {
    let source = tempfile::tempdir().unwrap();
    write_corpus(source.path(), true);

    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    flatten_into(source.path(), first.path()).unwrap();
    flatten_into(source.path(), second.path()).unwrap();

    for name in [
        "IATA_OrderViewRS.xsd",
        "IATA_OrderViewRS_CommonTypes.xsd",
        "IATA_OrderViewRS_OptionalCommonTypes.xsd",
    ] {
        let a = fs::read_to_string(first.path().join(name)).unwrap();
        let b = fs::read_to_string(second.path().join(name)).unwrap();
        assert_eq!(a, b, "{name} differs between runs");
    }
}

#[test]
fn prefixes_are_consistent_across_documents() {
    let source = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_corpus(source.path(), false);
    flatten_into(source.path(), output.path()).unwrap();

    let main = fs::read_to_string(output.path().join("IATA_OrderViewRS.xsd")).unwrap();
    let common = fs::read_to_string(output.path().join("IATA_OrderViewRS_CommonTypes.xsd")).unwrap();
    let binding = format!("xmlns:cns=\"{COMMON_NS}\"");
    assert!(main.contains(&binding));
    assert!(common.contains(&binding));
}

#[test]
fn missing_entry_fails_without_poisoning_the_corpus() {
    let source = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_corpus(source.path(), false);

    let mut corpus = Corpus::new(source.path(), NamespaceFamily::new("http://www.iata.org"));
    let error = flatten_message(&mut corpus, "IATA_Nonexistent.xsd", output.path()).unwrap_err();
    assert!(matches!(error, FlattenError::MissingEntry(_)));

    // The same corpus still serves the next entry in the batch.
    flatten_message(&mut corpus, "IATA_OrderViewRS.xsd", output.path()).unwrap();
    assert!(output.path().join("IATA_OrderViewRS.xsd").exists());
}
