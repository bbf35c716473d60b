#![doc = include_str!("../README.md")]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod ids;
#[cfg(feature = "middleware")]
pub mod middleware;
pub mod protocol;
pub mod session;
pub mod types;
pub mod validate;

// Re-exports for convenient access
pub use auth::{Action, AuthType, CasRequest};
pub use client::{CasClient, Transport, TransportResponse, ValidationRequest};
pub use config::CasConfig;
pub use error::Error;
pub use protocol::{Method, Profile, ProtocolVersion};
pub use session::{DestroyUnsupported, MemorySession, RETURN_TO_SLOT, SessionSlots};
pub use types::{AttributeValue, Attributes, Principal};
pub use validate::{FailureReason, ValidationOutcome};
