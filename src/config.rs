use url::Url;

use crate::error::Error;
use crate::protocol::ProtocolVersion;
use crate::types::{Attributes, Principal};

/// CAS client configuration.
///
/// Required fields are constructor parameters, so there are no runtime "missing field" errors.
///
/// ```rust,ignore
/// use cas_client::{CasConfig, ProtocolVersion};
///
/// let config = CasConfig::new(
///     "https://login.example.com/cas".parse()?,
///     "https://app.example.com".parse()?,
/// )
/// .with_version(ProtocolVersion::Saml11)
/// .with_session_info("cas_attributes");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct CasConfig {
    pub(crate) cas_server_url: Url,
    pub(crate) service: Url,
    pub(crate) version: ProtocolVersion,
    pub(crate) renew: bool,
    pub(crate) return_to: Option<String>,
    pub(crate) session_name: String,
    pub(crate) session_info: Option<String>,
    pub(crate) destroy_session: bool,
    pub(crate) dev_mode_active: bool,
    pub(crate) dev_mode_user: Principal,
    pub(crate) dev_mode_info: Attributes,
}

impl CasConfig {
    /// Create a configuration for the CAS server at `cas_server_url`
    /// (e.g. `https://login.example.com/cas`) protecting `service`
    /// (this application's externally visible base URL).
    #[must_use]
    pub fn new(cas_server_url: Url, service: Url) -> Self {
        Self {
            cas_server_url,
            service,
            version: ProtocolVersion::default(),
            renew: false,
            return_to: None,
            session_name: "cas_user".into(),
            session_info: None,
            destroy_session: false,
            dev_mode_active: false,
            dev_mode_user: Principal(String::new()),
            dev_mode_info: Attributes::new(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `CAS_SERVER_URL`: CAS server base URL, e.g. `https://login.example.com/cas`
    /// - `CAS_SERVICE_URL`: this application's base URL
    ///
    /// # Optional env vars
    /// - `CAS_VERSION`: `1.0`, `2.0`, `3.0` (default) or `saml1.1`
    /// - `CAS_RENEW`: `"1"` or `"true"` to send `renew=true` on login
    /// - `CAS_RETURN_TO`: fixed post-login return path
    /// - `CAS_SESSION_NAME`: principal session slot (default `cas_user`)
    /// - `CAS_SESSION_INFO`: attributes session slot (unset = don't store attributes)
    /// - `CAS_DESTROY_SESSION`: `"1"` or `"true"` to destroy the whole session on logout
    /// - `CAS_DEV_MODE`: `"1"` or `"true"` to bypass CAS entirely
    /// - `CAS_DEV_USER`: principal used in dev mode
    /// - `CAS_DEV_INFO`: JSON object of attributes used in dev mode
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required env vars are missing or values are
    /// invalid, and [`Error::UnsupportedVersion`] for an unknown `CAS_VERSION`.
    pub fn from_env() -> Result<Self, Error> {
        let cas_server_url = required_url("CAS_SERVER_URL")?;
        let service = required_url("CAS_SERVICE_URL")?;

        let mut config = Self::new(cas_server_url, service)
            .with_renew(env_flag("CAS_RENEW"))
            .with_destroy_session(env_flag("CAS_DESTROY_SESSION"))
            .with_dev_mode_active(env_flag("CAS_DEV_MODE"));

        if let Ok(version) = std::env::var("CAS_VERSION") {
            config = config.with_version(version.parse()?);
        }
        if let Ok(path) = std::env::var("CAS_RETURN_TO") {
            config = config.with_return_to(path);
        }
        if let Ok(name) = std::env::var("CAS_SESSION_NAME") {
            config = config.with_session_name(name);
        }
        if let Ok(name) = std::env::var("CAS_SESSION_INFO") {
            config = config.with_session_info(name);
        }
        if let Ok(user) = std::env::var("CAS_DEV_USER") {
            config = config.with_dev_mode_user(user);
        }
        if let Ok(info) = std::env::var("CAS_DEV_INFO") {
            let info: Attributes = serde_json::from_str(&info)
                .map_err(|e| Error::Config(format!("CAS_DEV_INFO: {e}")))?;
            config = config.with_dev_mode_info(info);
        }

        config.check()?;
        Ok(config)
    }

    /// Reject configurations that cannot work against a CAS server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either URL is not `http`/`https`, or the
    /// principal session slot name is empty.
    pub fn check(&self) -> Result<(), Error> {
        for (name, url) in [("cas_server_url", &self.cas_server_url), ("service", &self.service)] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::Config(format!(
                    "{name} must be an http(s) URL, got '{url}'"
                )));
            }
            if url.cannot_be_a_base() || url.host().is_none() {
                return Err(Error::Config(format!("{name} must be an absolute URL")));
            }
        }
        if self.session_name.is_empty() {
            return Err(Error::Config("session_name must not be empty".into()));
        }
        Ok(())
    }

    /// CAS protocol version (default: 3.0).
    #[must_use]
    pub fn with_version(mut self, version: ProtocolVersion) -> Self {
        self.version = version;
        self
    }

    /// Send `renew=true` so CAS re-prompts for credentials.
    #[must_use]
    pub fn with_renew(mut self, renew: bool) -> Self {
        self.renew = renew;
        self
    }

    /// Fixed path to return to after login, used when the request carries
    /// no `returnTo` query parameter.
    #[must_use]
    pub fn with_return_to(mut self, path: impl Into<String>) -> Self {
        self.return_to = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = name.into();
        self
    }

    /// Store released attributes under this session slot.
    ///
    /// Ignored for CAS 1.0, which releases no attributes.
    #[must_use]
    pub fn with_session_info(mut self, name: impl Into<String>) -> Self {
        self.session_info = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_destroy_session(mut self, destroy: bool) -> Self {
        self.destroy_session = destroy;
        self
    }

    /// Skip CAS and log every request in as the dev user.
    #[must_use]
    pub fn with_dev_mode_active(mut self, active: bool) -> Self {
        self.dev_mode_active = active;
        self
    }

    #[must_use]
    pub fn with_dev_mode_user(mut self, user: impl Into<String>) -> Self {
        self.dev_mode_user = Principal(user.into());
        self
    }

    #[must_use]
    pub fn with_dev_mode_info(mut self, info: Attributes) -> Self {
        self.dev_mode_info = info;
        self
    }

    /// CAS server base URL.
    #[must_use]
    pub fn cas_server_url(&self) -> &Url {
        &self.cas_server_url
    }

    /// This application's service URL.
    #[must_use]
    pub fn service(&self) -> &Url {
        &self.service
    }

    #[must_use]
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    #[must_use]
    pub fn renew(&self) -> bool {
        self.renew
    }

    #[must_use]
    pub fn return_to(&self) -> Option<&str> {
        self.return_to.as_deref()
    }

    /// Principal session slot name.
    #[must_use]
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Attributes session slot name, if attributes are stored for this
    /// protocol version.
    #[must_use]
    pub fn session_info(&self) -> Option<&str> {
        self.session_info
            .as_deref()
            .filter(|_| self.version.releases_attributes())
    }

    #[must_use]
    pub fn destroy_session(&self) -> bool {
        self.destroy_session
    }

    #[must_use]
    pub fn dev_mode_active(&self) -> bool {
        self.dev_mode_active
    }
}

fn required_url(var: &str) -> Result<Url, Error> {
    let raw = std::env::var(var).map_err(|_| Error::Config(format!("{var} is required")))?;
    raw.parse()
        .map_err(|e| Error::Config(format!("{var}: {e}")))
}

fn env_flag(var: &str) -> bool {
    matches!(std::env::var(var).as_deref(), Ok("1") | Ok("true"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> CasConfig {
        CasConfig::new(
            "https://login.example.com/cas".parse().unwrap(),
            "https://app.example.com".parse().unwrap(),
        )
    }

    #[test]
    fn test_defaults() {
        let config = test_config();
        assert_eq!(config.version(), ProtocolVersion::Cas30);
        assert!(!config.renew());
        assert_eq!(config.return_to(), None);
        assert_eq!(config.session_name(), "cas_user");
        assert_eq!(config.session_info(), None);
        assert!(!config.destroy_session());
        assert!(!config.dev_mode_active());
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = test_config()
            .with_version(ProtocolVersion::Saml11)
            .with_renew(true)
            .with_return_to("/home")
            .with_session_name("user")
            .with_session_info("attrs")
            .with_destroy_session(true);

        assert_eq!(config.version(), ProtocolVersion::Saml11);
        assert!(config.renew());
        assert_eq!(config.return_to(), Some("/home"));
        assert_eq!(config.session_name(), "user");
        assert_eq!(config.session_info(), Some("attrs"));
        assert!(config.destroy_session());
    }

    #[test]
    fn test_session_info_ignored_for_cas10() {
        let config = test_config()
            .with_version(ProtocolVersion::Cas10)
            .with_session_info("attrs");
        assert_eq!(config.session_info(), None);

        let config = config.with_version(ProtocolVersion::Cas20);
        assert_eq!(config.session_info(), Some("attrs"));
    }

    #[test]
    fn test_check_rejects_non_http_urls() {
        let config = CasConfig::new(
            "ftp://login.example.com/cas".parse().unwrap(),
            "https://app.example.com".parse().unwrap(),
        );
        assert!(matches!(config.check(), Err(Error::Config(_))));

        let config = CasConfig::new(
            "https://login.example.com/cas".parse().unwrap(),
            "mailto:someone@example.com".parse().unwrap(),
        );
        assert!(matches!(config.check(), Err(Error::Config(_))));
    }

    #[test]
    fn test_check_rejects_empty_session_name() {
        let config = test_config().with_session_name("");
        assert!(matches!(config.check(), Err(Error::Config(_))));
    }
}
