//! Bunny Stream Core Library
//!
//! This crate provides the configuration, error types, response envelope and
//! remote models shared by the Bunny Stream client and CLI.

pub mod config;
pub mod envelope;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{resolve_library_id, ClientConfig, ClientOptions, StreamSettings};
pub use envelope::{ErrorDetails, ErrorOrigin, ErrorPayload, ResponseEnvelope};
pub use error::{ConfigError, RequestFailed};
