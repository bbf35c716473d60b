use std::collections::BTreeMap;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Authenticated user identifier released by the CAS server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct Principal(pub String);

impl Principal {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Principal {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// One released attribute: a single value or an ordered list of values.
///
/// Serialized untagged, so session storage sees either a JSON string or a
/// JSON array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(String),
    Multiple(Vec<String>),
}

impl AttributeValue {
    /// All values in document order.
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(v) => vec![v.as_str()],
            Self::Multiple(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    /// Append a value, promoting `Single` to `Multiple`.
    pub(crate) fn push(&mut self, value: String) {
        match self {
            Self::Single(first) => {
                *self = Self::Multiple(vec![std::mem::take(first), value]);
            }
            Self::Multiple(vs) => vs.push(value),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::Single(s.to_owned())
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(vs: Vec<String>) -> Self {
        Self::Multiple(vs)
    }
}

/// Attributes released alongside the principal, keyed by attribute name.
pub type Attributes = BTreeMap<String, AttributeValue>;
