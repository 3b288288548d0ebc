//! Canvaschat core — shared types, configuration, and credential lookup.
//!
//! - [`types`] — conversation turns, the response envelope, provider wire formats
//! - [`config`] — `~/.canvaschat/config.json` schema and loader
//! - [`credentials`] — the `CredentialProvider` seam the orchestrator reads keys through

pub mod config;
pub mod credentials;
pub mod types;
pub mod utils;

pub use credentials::{CredentialProvider, EnvCredentials, LayeredCredentials, StaticCredentials};
pub use types::{ConversationTurn, ResponseEnvelope, ResponseType, Role};
