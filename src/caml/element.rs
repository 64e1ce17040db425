//! Generic attributed XML element tree.
//!
//! The decoder never maps XML straight onto the typed layer model. It goes
//! through this intermediate form first, so unknown tags and malformed
//! values can degrade field by field instead of aborting the decode.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{MicamlError, MicamlResult};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    /// Attributes in document order.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: Option<String>,
}

impl XmlElement {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Look up a string value for `key`, in priority order: an attribute,
    /// a plist-style `<key>k</key><value/>` sibling pair among the
    /// children, then the text of a same-named child element.
    pub fn string_value(&self, key: &str) -> Option<String> {
        if let Some(v) = self.attr(key) {
            return Some(v.to_string());
        }

        let mut iter = self.children.iter();
        while let Some(child) = iter.next() {
            if child.name == "key" && child.text.as_deref() == Some(key) {
                if let Some(value_el) = iter.next() {
                    return value_el.text.clone().or(Some(String::new()));
                }
            }
        }

        self.child(key).and_then(|c| c.text.clone())
    }

    pub fn f64_value(&self, key: &str) -> Option<f64> {
        self.string_value(key).and_then(|s| s.trim().parse().ok())
    }

    pub fn int_value(&self, key: &str) -> Option<i64> {
        self.string_value(key).and_then(|s| s.trim().parse().ok())
    }
}

/// Parse XML text into an element tree.
///
/// The only failures are syntax-level: unparseable markup or a document
/// with no root element. Everything above that is the decoder's business.
pub fn parse_document(xml: &str) -> MicamlResult<XmlElement> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                stack.push(element_from_start(e)?);
            }
            Ok(Event::Empty(ref e)) => {
                let el = element_from_start(e)?;
                attach(&mut stack, &mut root, el);
            }
            Ok(Event::End(_)) => {
                if let Some(el) = stack.pop() {
                    attach(&mut stack, &mut root, el);
                }
            }
            Ok(Event::Text(ref t)) => {
                if let Some(top) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| MicamlError::parse(format!("bad text content: {e}")))?;
                    match &mut top.text {
                        Some(existing) => existing.push_str(&text),
                        None => top.text = Some(text.into_owned()),
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(MicamlError::parse(format!(
                    "XML parse error at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            // Declarations, comments, processing instructions.
            Ok(_) => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| MicamlError::parse("document has no root element"))
}

fn element_from_start(e: &quick_xml::events::BytesStart<'_>) -> MicamlResult<XmlElement> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| MicamlError::parse(format!("bad attribute: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| MicamlError::parse(format!("bad attribute value: {e}")))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(XmlElement {
        name,
        attrs,
        children: Vec::new(),
        text: None,
    })
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, el: XmlElement) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(el);
    } else if root.is_none() {
        *root = Some(el);
    }
    // Trailing top-level elements after the root are dropped.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let el = parse_document(r#"<a x="1"><b y="2">text</b><b/></a>"#).unwrap();
        assert_eq!(el.name, "a");
        assert_eq!(el.attr("x"), Some("1"));
        assert_eq!(el.children.len(), 2);
        assert_eq!(el.children[0].text.as_deref(), Some("text"));
        assert_eq!(el.children_named("b").count(), 2);
    }

    #[test]
    fn empty_document_is_a_parse_error() {
        assert!(matches!(
            parse_document("  "),
            Err(MicamlError::Parse(_))
        ));
    }

    #[test]
    fn broken_markup_is_a_parse_error() {
        assert!(parse_document("<a><b></a>").is_err());
    }

    #[test]
    fn string_value_priority_order() {
        // Attribute beats plist pair beats same-named child.
        let el = parse_document(
            r#"<l opacity="0.5"><key>opacity</key><real>0.7</real><opacity>0.9</opacity></l>"#,
        )
        .unwrap();
        assert_eq!(el.string_value("opacity").as_deref(), Some("0.5"));

        let el = parse_document(
            r#"<l><key>opacity</key><real>0.7</real><opacity>0.9</opacity></l>"#,
        )
        .unwrap();
        assert_eq!(el.string_value("opacity").as_deref(), Some("0.7"));

        let el = parse_document(r#"<l><opacity>0.9</opacity></l>"#).unwrap();
        assert_eq!(el.string_value("opacity").as_deref(), Some("0.9"));
    }

    #[test]
    fn numeric_lookups_tolerate_garbage() {
        let el = parse_document(r#"<l w="12.5" h="tall"/>"#).unwrap();
        assert_eq!(el.f64_value("w"), Some(12.5));
        assert_eq!(el.f64_value("h"), None);
        assert_eq!(el.int_value("w"), None);
    }

    #[test]
    fn entities_are_unescaped() {
        let el = parse_document(r#"<l t="a &amp; b"><s>&lt;hi&gt;</s></l>"#).unwrap();
        assert_eq!(el.attr("t"), Some("a & b"));
        assert_eq!(el.children[0].text.as_deref(), Some("<hi>"));
    }
}
