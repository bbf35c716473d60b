use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::{CasAuthConfig, CookieSettings};
use super::traits::SessionStore;
use crate::client::CasClient;

/// Shared state for the CAS middleware and logout handler.
///
/// Build once with [`CasAuth::new`] and pass clones to
/// `axum::middleware::from_fn_with_state` and `Router::with_state`.
pub struct CasAuth<S> {
    pub(super) client: Arc<CasClient>,
    pub(super) store: Arc<S>,
    pub(super) settings: CookieSettings,
}

impl<S: SessionStore> CasAuth<S> {
    #[must_use]
    pub fn new(config: CasAuthConfig, store: S) -> Self {
        Self {
            client: Arc::new(config.client),
            store: Arc::new(store),
            settings: config.settings,
        }
    }

    #[must_use]
    pub fn client(&self) -> &CasClient {
        &self.client
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }
}

// Manual Clone: avoid derive adding an `S: Clone` bound.
impl<S> Clone for CasAuth<S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            store: self.store.clone(),
            settings: self.settings.clone(),
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl<S: SessionStore> FromRef<CasAuth<S>> for Key {
    fn from_ref(state: &CasAuth<S>) -> Self {
        state.settings.cookie_key.clone()
    }
}
