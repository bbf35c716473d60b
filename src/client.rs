use std::future::Future;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use url::Url;

use crate::config::CasConfig;
use crate::error::Error;
use crate::ids;
use crate::protocol::{Method, Profile};
use crate::validate::{FailureReason, ValidationOutcome, saml};

/// Outbound ticket validation call, fully assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ValidationRequest {
    pub method: Method,
    pub url: Url,
    /// SOAP envelope for SAML 1.1; `None` for GET profiles.
    pub body: Option<String>,
}

/// Status and complete body of the CAS server's reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP transport used for ticket validation.
///
/// Implemented for [`reqwest::Client`]; timeouts and TLS settings come from
/// however that client was built.
pub trait Transport: Send + Sync + 'static {
    fn execute(
        &self,
        request: &ValidationRequest,
    ) -> impl Future<Output = Result<TransportResponse, Error>> + Send;
}

impl Transport for reqwest::Client {
    async fn execute(&self, request: &ValidationRequest) -> Result<TransportResponse, Error> {
        let builder = match request.method {
            Method::Get => self.get(request.url.clone()),
            Method::Post => self.post(request.url.clone()),
        };

        let builder = match &request.body {
            Some(body) => builder
                .header(CONTENT_TYPE, "text/xml")
                .header(CONTENT_LENGTH, body.len())
                .body(body.clone()),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

/// CAS client: builds login/logout redirects and validates service tickets.
///
/// The protocol profile is resolved once at construction. The client holds
/// no mutable state; share it behind an `Arc`.
pub struct CasClient<T = reqwest::Client> {
    pub(crate) config: CasConfig,
    profile: Profile,
    pub(crate) transport: T,
}

impl CasClient {
    /// Create a client using a default `reqwest` transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration fails [`CasConfig::check`].
    pub fn new(config: CasConfig) -> Result<Self, Error> {
        config.check()?;
        Ok(Self {
            profile: Profile::resolve(config.version),
            config,
            transport: reqwest::Client::new(),
        })
    }
}

impl<T> CasClient<T> {
    /// Use a custom transport (a configured `reqwest::Client` for connection
    /// pool reuse or timeouts, or a stub in tests).
    #[must_use]
    pub fn with_transport<U: Transport>(self, transport: U) -> CasClient<U> {
        CasClient {
            config: self.config,
            profile: self.profile,
            transport,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CasConfig {
        &self.config
    }

    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// CAS login redirect for a request to `path`.
    ///
    /// `{cas}/login?service={service}{path}&renew={renew}`
    #[must_use]
    pub fn login_url(&self, path: &str) -> Url {
        let mut url = self.endpoint("/login");
        url.query_pairs_mut()
            .append_pair("service", &self.service_for(path))
            .append_pair("renew", if self.config.renew { "true" } else { "false" });
        url
    }

    /// CAS logout redirect.
    #[must_use]
    pub fn logout_url(&self) -> Url {
        self.endpoint("/logout")
    }

    /// Assemble the validation call for `ticket`, received on `path`.
    #[must_use]
    pub fn validation_request(&self, ticket: &str, path: &str) -> ValidationRequest {
        let mut url = self.endpoint(self.profile.path);
        let service = self.service_for(path);

        match self.profile.method {
            Method::Get => {
                url.query_pairs_mut()
                    .append_pair("service", &service)
                    .append_pair("ticket", ticket);
                ValidationRequest {
                    method: Method::Get,
                    url,
                    body: None,
                }
            }
            Method::Post => {
                url.query_pairs_mut()
                    .append_pair("TARGET", &service)
                    .append_pair("ticket", "");
                let issue_instant = OffsetDateTime::now_utc()
                    .format(&Rfc3339)
                    .unwrap_or_default();
                let body =
                    saml::request_envelope(ticket, &ids::generate_request_id(), &issue_instant);
                ValidationRequest {
                    method: Method::Post,
                    url,
                    body: Some(body),
                }
            }
        }
    }

    /// `cas_server_url` with `suffix` appended to its path.
    fn endpoint(&self, suffix: &str) -> Url {
        let mut url = self.config.cas_server_url.clone();
        let path = format!("{}{suffix}", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);
        url
    }

    fn service_for(&self, path: &str) -> String {
        format!(
            "{}{path}",
            self.config.service.as_str().trim_end_matches('/')
        )
    }
}

impl<T: Transport> CasClient<T> {
    /// Exchange a service ticket for an identity.
    ///
    /// Never retries. Transport failures come back as
    /// [`FailureReason::Transport`] without consulting the parser.
    pub async fn validate(&self, ticket: &str, path: &str) -> ValidationOutcome {
        let request = self.validation_request(ticket, path);

        let response = match self.transport.execute(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    endpoint = self.profile.path,
                    "CAS validation request failed"
                );
                return ValidationOutcome::Failure(FailureReason::Transport(e.to_string()));
            }
        };

        if !(200..300).contains(&response.status) {
            tracing::warn!(
                status = response.status,
                endpoint = self.profile.path,
                "CAS validation endpoint returned a non-success status"
            );
        }

        self.profile.parser.parse(&response.body)
    }
}
