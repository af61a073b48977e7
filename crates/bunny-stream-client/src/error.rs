use bunny_stream_core::ConfigError;

/// Errors raised while constructing a client. Per-request failures are
/// returned as envelopes instead.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
