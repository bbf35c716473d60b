use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::validate::Parser;

/// CAS protocol version spoken with the CAS server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(try_from = "String", into = "String")]
pub enum ProtocolVersion {
    #[default]
    #[display("3.0")]
    Cas30,
    #[display("2.0")]
    Cas20,
    #[display("1.0")]
    Cas10,
    #[display("saml1.1")]
    Saml11,
}

impl ProtocolVersion {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cas10 => "1.0",
            Self::Cas20 => "2.0",
            Self::Cas30 => "3.0",
            Self::Saml11 => "saml1.1",
        }
    }

    /// Whether this version can release attributes alongside the principal.
    #[must_use]
    pub fn releases_attributes(self) -> bool {
        !matches!(self, Self::Cas10)
    }
}

impl std::str::FromStr for ProtocolVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1.0" => Ok(Self::Cas10),
            "2.0" => Ok(Self::Cas20),
            "3.0" => Ok(Self::Cas30),
            "saml1.1" => Ok(Self::Saml11),
            other => Err(Error::UnsupportedVersion(other.to_owned())),
        }
    }
}

impl TryFrom<String> for ProtocolVersion {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ProtocolVersion> for String {
    fn from(v: ProtocolVersion) -> Self {
        v.as_str().to_owned()
    }
}

/// HTTP method used for the validation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Validation endpoint, request shape and parser for one protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub version: ProtocolVersion,
    pub path: &'static str,
    pub method: Method,
    pub parser: Parser,
}

impl Profile {
    /// Look up the fixed profile for `version`.
    #[must_use]
    pub fn resolve(version: ProtocolVersion) -> Self {
        let (path, method, parser) = match version {
            ProtocolVersion::Cas10 => ("/validate", Method::Get, Parser::Cas10),
            ProtocolVersion::Cas20 => ("/serviceValidate", Method::Get, Parser::ServiceResponse),
            ProtocolVersion::Cas30 => ("/p3/serviceValidate", Method::Get, Parser::ServiceResponse),
            ProtocolVersion::Saml11 => ("/samlValidate", Method::Post, Parser::Saml11),
        };
        Self {
            version,
            path,
            method,
            parser,
        }
    }
}
