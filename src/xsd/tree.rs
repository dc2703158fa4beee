use roxmltree::Node;

use super::qname::{AnyURI, NCName};

/// Attributes whose values are qualified references to other declarations.
/// Every pass that inspects or rewrites references goes through
/// [`XmlElement::for_each_reference`] / [`XmlElement::rewrite_references`],
/// so this list is the single definition of what counts as a reference.
pub const REFERENCE_ATTRIBUTES: [&str; 5] = ["type", "base", "ref", "itemType", "substitutionGroup"];

/// One named top-level declaration together with all of its nested content,
/// detached from the parse arena. Originals owned by a document are never
/// mutated; rewriting operates on clones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlElement {
    pub namespace: Option<AnyURI>,
    pub name: NCName,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlContent>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XmlContent {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    /// Deep-copies a parsed element into an owned tree. Whitespace-only text
    /// nodes are dropped; documentation text is kept.
    pub fn from_node(node: Node) -> Self {
        let attributes = node
            .attributes()
            .map(|attribute| (attribute.name().to_string(), attribute.value().to_string()))
            .collect();
        let mut children = Vec::new();
        for child in node.children() {
            if child.is_element() {
                children.push(XmlContent::Element(Self::from_node(child)));
            } else if child.is_text() {
                let text = child.text().unwrap_or_default();
                if !text.trim().is_empty() {
                    children.push(XmlContent::Text(text.to_string()));
                }
            }
        }
        XmlElement {
            namespace: node.tag_name().namespace().map(str::to_string),
            name: node.tag_name().name().to_string(),
            attributes,
            children,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attribute, _)| attribute == name)
            .map(|(_, value)| value.as_str())
    }

    /// Visits the non-empty value of every reference-bearing attribute on
    /// this element and all of its descendants.
    pub fn for_each_reference<F: FnMut(&str)>(&self, f: &mut F) {
        for (name, value) in &self.attributes {
            if REFERENCE_ATTRIBUTES.contains(&name.as_str()) && !value.is_empty() {
                f(value);
            }
        }
        for child in &self.children {
            if let XmlContent::Element(element) = child {
                element.for_each_reference(f);
            }
        }
    }

    /// Rewrites reference-bearing attribute values in place, in the same
    /// subtree order as [`Self::for_each_reference`]. The callback returns
    /// `None` to leave a value untouched.
    pub fn rewrite_references<F: FnMut(&str) -> Option<String>>(&mut self, f: &mut F) {
        for (name, value) in &mut self.attributes {
            if REFERENCE_ATTRIBUTES.contains(&name.as_str()) && !value.is_empty() {
                if let Some(rewritten) = f(value) {
                    *value = rewritten;
                }
            }
        }
        for child in &mut self.children {
            if let XmlContent::Element(element) = child {
                element.rewrite_references(f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_element(text: &str) -> XmlElement {
        let document = roxmltree::Document::parse(text).unwrap();
        XmlElement::from_node(document.root_element())
    }

    #[test]
    fn collects_references_from_nested_content() {
        let element = parse_element(
            r#"<complexType name="A" xmlns:c="urn:c">
                 <complexContent>
                   <extension base="c:Base">
                     <sequence>
                       <element name="Inner" type="c:Inner"/>
                       <element ref="c:Other"/>
                     </sequence>
                   </extension>
                 </complexContent>
               </complexType>"#,
        );
        let mut seen = Vec::new();
        element.for_each_reference(&mut |value| seen.push(value.to_string()));
        assert_eq!(seen, vec!["c:Base", "c:Inner", "c:Other"]);
    }

    #[test]
    fn rewrite_touches_only_reference_attributes() {
        let mut element = parse_element(
            r#"<element name="Order" type="cns:OrderType" minOccurs="0"/>"#,
        );
        element.rewrite_references(&mut |_| Some("x:Rewritten".to_string()));
        assert_eq!(element.attribute("type"), Some("x:Rewritten"));
        assert_eq!(element.attribute("name"), Some("Order"));
        assert_eq!(element.attribute("minOccurs"), Some("0"));
    }

    #[test]
    fn keeps_documentation_text() {
        let element = parse_element(
            r#"<element name="Order" xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:annotation><xs:documentation>An order.</xs:documentation></xs:annotation>
               </element>"#,
        );
        let XmlContent::Element(annotation) = &element.children[0] else {
            panic!("expected annotation element");
        };
        let XmlContent::Element(documentation) = &annotation.children[0] else {
            panic!("expected documentation element");
        };
        assert_eq!(
            documentation.children,
            vec![XmlContent::Text("An order.".to_string())]
        );
    }
}
