//! Remote resource models
//!
//! Field names follow the remote JSON (camelCase) through serde renames.

pub mod collection;
pub mod common;
pub mod video;

pub use collection::{Collection, CollectionList};
pub use common::{DefaultResponse, RemoteMessage, ValidationProblem};
pub use video::{
    Caption, Chapter, Heatmap, MetaTag, Moment, PaginatedVideoLibraryResponse,
    TranscodingMessage, VideoLibraryItem, VideoStatistics,
};

use serde::{Deserialize, Deserializer};

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
