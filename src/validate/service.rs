use std::collections::btree_map::Entry;

use super::ValidationOutcome;
use super::xml::{self, Element};
use crate::types::{AttributeValue, Attributes};

/// Parse a CAS 2.0 / 3.0 `<cas:serviceResponse>` body.
///
/// Attributes under `<cas:attributes>` are extracted for both versions; a
/// CAS 2.0 server simply never sends them. Names are lowercased. A name that
/// repeats becomes a multi-valued attribute in document order, and an
/// attribute with nested elements makes the whole response malformed.
#[must_use]
pub fn parse(body: &str) -> ValidationOutcome {
    let root = match xml::parse(body) {
        Ok(root) => root,
        Err(e) => {
            tracing::debug!(error = %e, "CAS serviceResponse is not well-formed XML");
            return ValidationOutcome::malformed();
        }
    };

    if !root.is("serviceResponse") {
        tracing::debug!(root = %root.name(), "Unexpected CAS response root element");
        return ValidationOutcome::malformed();
    }

    if let Some(failure) = root.child("authenticationFailure") {
        tracing::debug!(
            code = failure.attribute("code").unwrap_or_default(),
            message = %failure.text(),
            "CAS authenticationFailure"
        );
        return ValidationOutcome::rejected(failure.attribute("code").map(str::to_owned));
    }

    let Some(success) = root.child("authenticationSuccess") else {
        return ValidationOutcome::malformed();
    };

    let user = success.child("user").map(Element::text).unwrap_or_default();
    if user.is_empty() {
        tracing::debug!("CAS authenticationSuccess without a user");
        return ValidationOutcome::malformed();
    }

    let attributes = match success.child("attributes").map(collect_attributes) {
        None => Attributes::new(),
        Some(Some(attributes)) => attributes,
        Some(None) => {
            tracing::debug!("CAS attributes contain nested elements");
            return ValidationOutcome::malformed();
        }
    };

    ValidationOutcome::success(user, attributes)
}

fn collect_attributes(element: &Element) -> Option<Attributes> {
    let mut attributes = Attributes::new();
    for child in element.children() {
        if !child.children().is_empty() {
            return None;
        }
        let value = child.text().to_owned();
        match attributes.entry(child.name().to_ascii_lowercase()) {
            Entry::Occupied(mut existing) => existing.get_mut().push(value),
            Entry::Vacant(slot) => {
                slot.insert(AttributeValue::Single(value));
            }
        }
    }
    Some(attributes)
}
