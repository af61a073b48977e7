use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::null_as_default;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Caption {
    #[serde(deserialize_with = "null_as_default")]
    pub srclang: String,
    #[serde(deserialize_with = "null_as_default")]
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Chapter {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub start: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub end: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Moment {
    #[serde(deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(deserialize_with = "null_as_default")]
    pub timestamp: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaTag {
    #[serde(deserialize_with = "null_as_default")]
    pub property: String,
    #[serde(deserialize_with = "null_as_default")]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscodingMessage {
    pub time_stamp: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub level: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub issue_code: i32,
    pub message: Option<String>,
    pub value: Option<String>,
}

/// A video as stored in a library.
///
/// `status` follows the remote encoding: 0 created, 1 uploaded, 2 processing,
/// 3 transcoding, 4 finished, 5 error, 6 upload failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoLibraryItem {
    #[serde(deserialize_with = "null_as_default")]
    pub video_library_id: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub guid: String,
    pub title: Option<String>,
    pub date_uploaded: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub views: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub is_public: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub length: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub status: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub framerate: f64,
    pub rotation: Option<i32>,
    #[serde(deserialize_with = "null_as_default")]
    pub width: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub height: u32,
    pub available_resolutions: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub thumbnail_count: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub encode_progress: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub storage_size: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub captions: Vec<Caption>,
    #[serde(rename = "hasMP4Fallback")]
    #[serde(deserialize_with = "null_as_default")]
    pub has_mp4_fallback: bool,
    pub collection_id: Option<String>,
    pub thumbnail_file_name: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub average_watch_time: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_watch_time: u64,
    pub category: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub chapters: Vec<Chapter>,
    #[serde(deserialize_with = "null_as_default")]
    pub moments: Vec<Moment>,
    #[serde(deserialize_with = "null_as_default")]
    pub meta_tags: Vec<MetaTag>,
    #[serde(deserialize_with = "null_as_default")]
    pub transcoding_messages: Vec<TranscodingMessage>,
}

/// Paginated video listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginatedVideoLibraryResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub total_items: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub current_page: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub items_per_page: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<VideoLibraryItem>,
}

/// Watch-time heatmap: second offset to relative audience retention.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Heatmap {
    #[serde(deserialize_with = "null_as_default")]
    pub heatmap: BTreeMap<String, f64>,
}

/// Library or per-video statistics, keyed by date or country code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoStatistics {
    #[serde(deserialize_with = "null_as_default")]
    pub views_chart: BTreeMap<String, u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub watch_time_chart: BTreeMap<String, u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub country_view_counts: BTreeMap<String, u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub country_watch_time: BTreeMap<String, u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub engagement_score: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn video_item_tolerates_nulls_and_missing_fields() {
        let item: VideoLibraryItem = serde_json::from_value(json!({
            "videoLibraryId": 123,
            "guid": "456",
            "title": "Example",
            "collectionId": null,
            "hasMP4Fallback": true,
            "captions": [{ "srclang": "en", "label": "English" }]
        }))
        .unwrap();

        assert_eq!(item.video_library_id, 123);
        assert_eq!(item.title.as_deref(), Some("Example"));
        assert_eq!(item.collection_id, None);
        assert!(item.has_mp4_fallback);
        assert_eq!(item.captions[0].srclang, "en");
        assert!(item.chapters.is_empty());
    }

    #[test]
    fn video_item_treats_null_collections_and_numbers_as_empty() {
        let item: VideoLibraryItem = serde_json::from_value(json!({
            "guid": "v",
            "views": null,
            "isPublic": null,
            "framerate": null,
            "captions": null,
            "chapters": null,
            "moments": null,
            "metaTags": null,
            "transcodingMessages": [{ "level": null, "issueCode": 2, "message": "ok" }],
            "hasMP4Fallback": null
        }))
        .unwrap();

        assert_eq!(item.guid, "v");
        assert_eq!(item.views, 0);
        assert!(!item.is_public);
        assert_eq!(item.framerate, 0.0);
        assert!(item.captions.is_empty());
        assert!(item.chapters.is_empty());
        assert!(item.moments.is_empty());
        assert!(item.meta_tags.is_empty());
        assert!(!item.has_mp4_fallback);
        assert_eq!(item.transcoding_messages[0].level, 0);
        assert_eq!(item.transcoding_messages[0].issue_code, 2);
    }

    #[test]
    fn nested_models_accept_nulls() {
        let page: PaginatedVideoLibraryResponse = serde_json::from_value(json!({
            "totalItems": null,
            "items": [{ "guid": "a", "chapters": [{ "title": null, "start": 1, "end": null }] }]
        }))
        .unwrap();
        assert_eq!(page.total_items, 0);
        assert_eq!(page.items[0].chapters[0], Chapter { title: String::new(), start: 1, end: 0 });

        let heatmap: Heatmap = serde_json::from_value(json!({ "heatmap": null })).unwrap();
        assert!(heatmap.heatmap.is_empty());

        let stats: VideoStatistics =
            serde_json::from_value(json!({ "viewsChart": null, "engagementScore": null })).unwrap();
        assert!(stats.views_chart.is_empty());
        assert_eq!(stats.engagement_score, 0);
    }

    #[test]
    fn statistics_parse_date_keyed_charts() {
        let stats: VideoStatistics = serde_json::from_value(json!({
            "viewsChart": { "2024-01-01T00:00:00Z": 10 },
            "engagementScore": 42
        }))
        .unwrap();

        assert_eq!(stats.views_chart.get("2024-01-01T00:00:00Z"), Some(&10));
        assert_eq!(stats.engagement_score, 42);
        assert!(stats.country_view_counts.is_empty());
    }
}
