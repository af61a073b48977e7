use serde::{Deserialize, Serialize};

use super::null_as_default;

/// A collection groups videos inside a library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Collection {
    #[serde(deserialize_with = "null_as_default")]
    pub video_library_id: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub guid: String,
    pub name: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub video_count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_size: u64,
    pub preview_video_ids: Option<String>,
}

/// Paginated collection listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectionList {
    #[serde(deserialize_with = "null_as_default")]
    pub total_items: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub current_page: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub items_per_page: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<Collection>,
}
