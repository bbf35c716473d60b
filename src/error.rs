#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("CAS protocol version '{0}' is not supported (expected 1.0, 2.0, 3.0 or saml1.1)")]
    UnsupportedVersion(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Failure reported by a custom [`Transport`](crate::client::Transport).
    #[error("Transport error: {0}")]
    Transport(String),
}
