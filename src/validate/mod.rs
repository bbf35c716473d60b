//! CAS ticket validation response parsers.
//!
//! Every parser is a total function from a response body to a
//! [`ValidationOutcome`]: malformed input is classified, never raised.

pub mod cas1;
pub mod saml;
pub mod service;
mod xml;

use crate::types::{Attributes, Principal};

/// Result of exchanging one service ticket with the CAS server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Success {
        principal: Principal,
        attributes: Attributes,
    },
    Failure(FailureReason),
}

impl ValidationOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub(crate) fn success(principal: impl Into<Principal>, attributes: Attributes) -> Self {
        Self::Success {
            principal: principal.into(),
            attributes,
        }
    }

    pub(crate) fn rejected(code: Option<String>) -> Self {
        Self::Failure(FailureReason::RemoteRejected { code })
    }

    pub(crate) fn malformed() -> Self {
        Self::Failure(FailureReason::MalformedResponse)
    }
}

/// Why a ticket did not yield an identity.
///
/// All variants end as `401 Unauthorized` for the browser; the distinction
/// exists for logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum FailureReason {
    /// The CAS server explicitly denied the ticket.
    #[error("CAS authentication failed ({})", .code.as_deref().unwrap_or("no code"))]
    RemoteRejected { code: Option<String> },
    /// The CAS server's reply did not have the expected shape.
    #[error("invalid response from CAS server")]
    MalformedResponse,
    /// The CAS server could not be reached or the response stream broke.
    #[error("CAS server unreachable: {0}")]
    Transport(String),
}

/// Response grammar selected by the protocol profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parser {
    /// CAS 1.0 `yes\n<user>` / `no` text.
    Cas10,
    /// CAS 2.0 and 3.0 `<cas:serviceResponse>` XML.
    ServiceResponse,
    /// SAML 1.1 SOAP envelope.
    Saml11,
}

impl Parser {
    #[must_use]
    pub fn parse(self, body: &str) -> ValidationOutcome {
        match self {
            Self::Cas10 => cas1::parse(body),
            Self::ServiceResponse => service::parse(body),
            Self::Saml11 => saml::parse(body),
        }
    }
}
