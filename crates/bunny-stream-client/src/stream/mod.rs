//! Resource facades for collections and videos.
//!
//! Each facade method strips routing fields from its parameters, fills them
//! into the endpoint path, passes the rest as request data and returns the
//! envelope unchanged.

pub mod collections;
pub mod videos;

use std::sync::Arc;

use bunny_stream_core::envelope::ENCODE_FAILURE_MESSAGE;
use bunny_stream_core::{
    resolve_library_id, ClientOptions, ConfigError, ErrorPayload, ResponseEnvelope,
};
use serde::Serialize;
use serde_json::Value;

use crate::{ApiClient, ClientError, LibraryIdClient};

pub use collections::{
    CollectionListParams, CollectionParams, Collections, CreateCollectionParams,
    UpdateCollectionParams,
};
pub use videos::{
    AddCaptionParams, CaptionFile, CreateVideoParams, DeleteCaptionParams, FetchVideoParams,
    SetThumbnailParams, UpdateVideoParams, VideoListParams, VideoParams, VideoStatisticsParams,
    Videos,
};

/// Entry point bundling one dispatcher with its resource facades.
#[derive(Debug, Clone)]
pub struct BunnyStreamClient {
    client: Arc<ApiClient>,
}

impl BunnyStreamClient {
    /// Build from explicit options, falling back to the environment.
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let settings = options.resolve()?;
        Ok(Self::from_client(ApiClient::from_settings(settings)?))
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientOptions::new())
    }

    pub fn from_client(client: ApiClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn videos(&self) -> Videos<ApiClient> {
        Videos::new(self.client.clone())
    }

    pub fn collections(&self) -> Collections<ApiClient> {
        Collections::new(self.client.clone())
    }

    pub fn library_id(&self) -> Option<u64> {
        self.client.default_library_id()
    }

    pub fn api(&self) -> &ApiClient {
        &self.client
    }
}

const ENCODE_FAILURE_STATUS: u16 = 400;

/// Serialize the non-routing parameter fields into request data. Parameters
/// with no data fields produce `None`.
fn to_data<P: Serialize, T>(params: &P) -> Result<Option<Value>, ResponseEnvelope<T>> {
    match serde_json::to_value(params) {
        Ok(data) if is_empty(&data) => Ok(None),
        Ok(data) => Ok(Some(data)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode request parameters");
            Err(ResponseEnvelope::failure(
                ENCODE_FAILURE_STATUS,
                ErrorPayload::local(ENCODE_FAILURE_MESSAGE),
            ))
        }
    }
}

/// Per-call library id, else the client-wide default.
fn library_id<C: LibraryIdClient + ?Sized>(
    client: &C,
    call: Option<u64>,
) -> Result<u64, ConfigError> {
    resolve_library_id(call, client.default_library_id())
}

fn is_empty(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
