//! Plug-and-play CAS authentication middleware for Axum.
//!
//! Sessions live in a consumer-provided [`SessionStore`], keyed by an opaque
//! ID carried in a private (encrypted) cookie.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use axum::{Router, middleware::from_fn_with_state, routing::get};
//! use cas_client::middleware::{CasAuth, CasAuthConfig, CasUser, MemoryStore, bounce, logout_routes};
//!
//! // 1. Configure from environment (CAS_SERVER_URL, CAS_SERVICE_URL, ...)
//! let auth = CasAuth::new(CasAuthConfig::from_env()?, MemoryStore::new());
//!
//! // 2. Guard routes
//! let app = Router::new()
//!     .route("/", get(|user: CasUser| async move { user.principal.to_string() }))
//!     .route_layer(from_fn_with_state(auth.clone(), bounce::<MemoryStore>))
//!     // 3. Mount logout
//!     .merge(logout_routes(auth, "/logout"));
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod routes;
mod state;
mod traits;

pub use config::CasAuthConfig;
pub use error::AuthError;
pub use extractor::CasUser;
pub use routes::{block, bounce, bounce_redirect, logout, logout_routes};
pub use state::CasAuth;
pub use traits::{MemoryStore, SessionStore, StoreError};

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
