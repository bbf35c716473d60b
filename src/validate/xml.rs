//! Minimal element tree over `quick-xml`.
//!
//! Tag names keep only their local part (`cas:user` becomes `user`) and are
//! matched case-insensitively, so `serviceResponse`, `serviceresponse` and
//! `cas:ServiceResponse` all address the same node. Attribute names are
//! matched exactly.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, thiserror::Error)]
pub(crate) enum XmlError {
    #[error("XML syntax: {0}")]
    Syntax(#[from] quick_xml::Error),
    #[error("XML attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
    #[error("XML structure: {0}")]
    Structure(&'static str),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, XmlError> {
        let name = std::str::from_utf8(start.local_name().as_ref())
            .map_err(|_| XmlError::Structure("tag name is not UTF-8"))?
            .to_owned();

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let key = std::str::from_utf8(attr.key.local_name().as_ref())
                .map_err(|_| XmlError::Structure("attribute name is not UTF-8"))?
                .to_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    #[must_use]
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub(crate) fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// First child with the given local name.
    #[must_use]
    pub(crate) fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(name))
    }

    pub(crate) fn children_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.is(name))
    }

    pub(crate) fn children(&self) -> &[Element] {
        &self.children
    }

    /// Follow a chain of first-match children.
    #[must_use]
    pub(crate) fn descend(&self, path: &[&str]) -> Option<&Element> {
        path.iter().try_fold(self, |el, name| el.child(name))
    }

    #[must_use]
    pub(crate) fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Concatenated character data directly inside this element, trimmed.
    #[must_use]
    pub(crate) fn text(&self) -> &str {
        self.text.trim()
    }
}

/// Deepest element nesting accepted. CAS and SAML replies stay well below.
const MAX_DEPTH: usize = 64;

/// Decode a complete document into its root element.
///
/// Truncated input, mismatched end tags, an empty body, multiple root
/// elements and nesting deeper than [`MAX_DEPTH`] are all errors.
pub(crate) fn parse(body: &str) -> Result<Element, XmlError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(XmlError::Structure("document too deeply nested"));
                }
                stack.push(Element::from_start(&start)?);
            }
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or(XmlError::Structure("unexpected end tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::Structure("unclosed element"));
    }
    root.ok_or(XmlError::Structure("empty document"))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_some() {
        Err(XmlError::Structure("multiple root elements"))
    } else {
        *root = Some(element);
        Ok(())
    }
}
