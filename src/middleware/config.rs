use axum_extra::extract::cookie::Key;

use super::error::AuthError;
use crate::client::CasClient;
use crate::config::CasConfig;

/// Shared cookie settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct CookieSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) session_ttl_days: i64,
    pub(crate) secure_cookies: bool,
}

impl CookieSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: "__cas_session".into(),
            session_ttl_days: 30,
            secure_cookies: true,
        }
    }
}

/// CAS middleware configuration.
///
/// Required field (`client`) is a constructor parameter, so there are no runtime "missing field" errors.
///
/// Use [`from_env()`](CasAuthConfig::from_env) for convention-based setup,
/// or [`new()`](CasAuthConfig::new) with `with_*` methods for full control.
pub struct CasAuthConfig {
    pub(super) client: CasClient,
    pub(super) settings: CookieSettings,
}

impl CasAuthConfig {
    /// Create config with the required `CasClient`.
    ///
    /// All optional fields use sensible defaults. Override with `with_*` methods.
    #[must_use]
    pub fn new(client: CasClient) -> Self {
        Self {
            client,
            settings: CookieSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// Reads every variable documented on [`CasConfig::from_env`], plus:
    ///
    /// - `COOKIE_KEY`: Cookie encryption key bytes (at least 64); an
    ///   ephemeral key is generated when unset
    ///
    /// Dev mode (`CAS_DEV_MODE`) also disables secure cookies so the
    /// middleware works over plain `http://localhost`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if required env vars are missing or
    /// values are invalid.
    pub fn from_env() -> Result<Self, AuthError> {
        let config = CasConfig::from_env()?;
        let dev_mode = config.dev_mode_active();

        let cookie_key = match std::env::var("COOKIE_KEY") {
            Ok(k) => Key::try_from(k.as_bytes()).map_err(|_| {
                AuthError::Config(
                    "COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?,
            Err(_) => Key::generate(),
        };

        let client = CasClient::new(config)?;

        Ok(Self::new(client)
            .with_cookie_key(cookie_key)
            .with_secure_cookies(!dev_mode))
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_ttl_days(mut self, days: i64) -> Self {
        self.settings.session_ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }
}
