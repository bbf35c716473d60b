//! Per-request authentication decisions.
//!
//! [`CasClient::handle`] looks at the session and the request and decides
//! whether to let the request through, send the browser to CAS, or reject
//! it. Checks run in a fixed order:
//!
//! 1. session already holds a principal
//! 2. dev mode
//! 3. [`AuthType::Block`]
//! 4. a `ticket` query parameter (login completion)
//! 5. anything else (login initiation)

use serde_json::Value;

use crate::client::{CasClient, Transport};
use crate::session::{RETURN_TO_SLOT, SessionSlots};
use crate::types::{AttributeValue, Attributes, Principal};
use crate::validate::ValidationOutcome;

/// How to treat a request that has no authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    /// Redirect to CAS login, then back to the requested page.
    Bounce,
    /// Like `Bounce`, but an already authenticated user is redirected to the
    /// stored return target instead of passing through.
    BounceRedirect,
    /// Reply `401 Unauthorized`.
    Block,
}

/// What the host should do with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Continue normal request handling.
    Allow,
    /// Reply with a redirect to this location.
    Redirect(String),
    /// Reply `401 Unauthorized`.
    Reject,
}

/// The parts of an inbound request the state machine looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CasRequest {
    /// Request path without query string, e.g. `/private`.
    pub path: String,
    /// `ticket` query parameter.
    pub ticket: Option<String>,
    /// `returnTo` query parameter.
    pub return_to: Option<String>,
}

impl CasRequest {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Split a request target such as `/private?ticket=ST-1&returnTo=%2Fhome`.
    ///
    /// Empty `ticket` / `returnTo` values count as absent.
    #[must_use]
    pub fn from_path_and_query(target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let mut request = Self::new(if path.is_empty() { "/" } else { path });

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "ticket" => request.ticket = Some(value.into_owned()),
                "returnTo" => request.return_to = Some(value.into_owned()),
                _ => {}
            }
        }
        request
    }

    #[must_use]
    pub fn with_ticket(mut self, ticket: impl Into<String>) -> Self {
        self.ticket = Some(ticket.into());
        self
    }

    #[must_use]
    pub fn with_return_to(mut self, return_to: impl Into<String>) -> Self {
        self.return_to = Some(return_to.into());
        self
    }
}

impl<T> CasClient<T> {
    /// Principal stored in `session`, if authenticated.
    pub fn principal<S: SessionSlots + ?Sized>(&self, session: &S) -> Option<Principal> {
        session
            .get_str(&self.config.session_name)
            .filter(|p| !p.is_empty())
            .map(Principal::from)
    }

    /// Attributes stored in `session`; empty when none are stored.
    pub fn attributes<S: SessionSlots + ?Sized>(&self, session: &S) -> Attributes {
        self.config
            .session_info()
            .and_then(|slot| session.get(slot))
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }

    /// End the CAS session and redirect to CAS logout.
    ///
    /// With `destroy_session` the whole host session is destroyed; a session
    /// that cannot be destroyed gets its principal slot cleared instead.
    pub fn logout<S: SessionSlots + ?Sized>(&self, session: &mut S) -> Action {
        let config = &self.config;

        if config.destroy_session {
            if let Err(e) = session.destroy() {
                tracing::debug!(error = %e, "Clearing CAS principal instead");
                session.remove(&config.session_name);
            }
        } else {
            session.remove(&config.session_name);
            if let Some(info) = config.session_info() {
                session.remove(info);
            }
        }

        Action::Redirect(self.logout_url().into())
    }

    fn start_login<S: SessionSlots + ?Sized>(&self, session: &mut S, request: &CasRequest) -> Action {
        let requested = request.return_to.as_deref().filter(|target| {
            let local = is_local_path(target);
            if !local {
                tracing::warn!(return_to = %target, "Ignoring non-local returnTo");
            }
            local
        });

        let return_to = requested
            .or(self.config.return_to.as_deref())
            .unwrap_or(&request.path);
        session.insert(RETURN_TO_SLOT, Value::from(return_to));

        Action::Redirect(self.login_url(&request.path).into())
    }

    fn redirect_target<S: SessionSlots + ?Sized>(
        &self,
        session: &S,
        request: &CasRequest,
    ) -> String {
        session
            .get_str(RETURN_TO_SLOT)
            .or(request.return_to.as_deref().filter(|t| is_local_path(t)))
            .or(self.config.return_to.as_deref())
            .unwrap_or("/")
            .to_owned()
    }

    fn store_identity<S: SessionSlots + ?Sized>(
        &self,
        session: &mut S,
        principal: &Principal,
        attributes: &Attributes,
    ) {
        session.insert(&self.config.session_name, Value::from(principal.as_str()));
        if let Some(info) = self.config.session_info() {
            session.insert(info, attributes_value(attributes));
        }
    }
}

impl<T: Transport> CasClient<T> {
    /// Decide what to do with one inbound request.
    ///
    /// Only the ticket branch suspends (on the validation round trip).
    pub async fn handle<S: SessionSlots + ?Sized>(
        &self,
        session: &mut S,
        request: &CasRequest,
        auth_type: AuthType,
    ) -> Action {
        if self.principal(session).is_some() {
            return match auth_type {
                AuthType::BounceRedirect => {
                    Action::Redirect(self.redirect_target(session, request))
                }
                AuthType::Bounce | AuthType::Block => Action::Allow,
            };
        }

        if self.config.dev_mode_active {
            let config = &self.config;
            self.store_identity(session, &config.dev_mode_user, &config.dev_mode_info);
            tracing::debug!(principal = %config.dev_mode_user, "CAS dev mode login");
            return Action::Allow;
        }

        if auth_type == AuthType::Block {
            return Action::Reject;
        }

        match &request.ticket {
            Some(ticket) => self.complete_login(session, request, ticket).await,
            None => self.start_login(session, request),
        }
    }

    async fn complete_login<S: SessionSlots + ?Sized>(
        &self,
        session: &mut S,
        request: &CasRequest,
        ticket: &str,
    ) -> Action {
        match self.validate(ticket, &request.path).await {
            ValidationOutcome::Success {
                principal,
                attributes,
            } => {
                self.store_identity(session, &principal, &attributes);
                let target = self.redirect_target(session, request);
                session.remove(RETURN_TO_SLOT);
                tracing::info!(principal = %principal, "CAS login successful");
                Action::Redirect(target)
            }
            ValidationOutcome::Failure(reason) => {
                tracing::warn!(reason = %reason, path = %request.path, "CAS ticket validation failed");
                Action::Reject
            }
        }
    }
}

/// Same-origin absolute path: `/x`, but not `//host/x` or `/\host`.
fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\")
}

fn attributes_value(attributes: &Attributes) -> Value {
    Value::Object(
        attributes
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    AttributeValue::Single(v) => Value::from(v.as_str()),
                    AttributeValue::Multiple(vs) => Value::from(vs.clone()),
                };
                (name.clone(), value)
            })
            .collect(),
    )
}
