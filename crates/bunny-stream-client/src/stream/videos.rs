use std::collections::BTreeMap;
use std::sync::Arc;

use bunny_stream_core::models::{
    Chapter, DefaultResponse, Heatmap, MetaTag, Moment, PaginatedVideoLibraryResponse,
    VideoLibraryItem, VideoStatistics,
};
use bunny_stream_core::{ConfigError, ResponseEnvelope};
use serde::Serialize;

use super::{library_id, to_data};
use crate::capability::{
    DeleteClient, GetClient, LibraryIdClient, PostClient, RequestOptions, UploadClient,
};
use crate::upload::{UploadError, UploadHandle, UploadJob};

/// Addresses one video.
#[derive(Debug, Clone, Default)]
pub struct VideoParams {
    pub library_id: Option<u64>,
    pub video_id: String,
}

impl VideoParams {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            library_id: None,
            video_id: video_id.into(),
        }
    }

    pub fn library_id(mut self, library_id: u64) -> Self {
        self.library_id = Some(library_id);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatisticsParams {
    #[serde(skip_serializing)]
    pub library_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListParams {
    #[serde(skip_serializing)]
    pub library_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVideoParams {
    #[serde(skip_serializing)]
    pub library_id: Option<u64>,
    #[serde(skip_serializing)]
    pub video_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapters: Option<Vec<Chapter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moments: Option<Vec<Moment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_tags: Option<Vec<MetaTag>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVideoParams {
    #[serde(skip_serializing)]
    pub library_id: Option<u64>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_time: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetThumbnailParams {
    #[serde(skip_serializing)]
    pub library_id: Option<u64>,
    #[serde(skip_serializing)]
    pub video_id: String,
    pub thumbnail_url: String,
}

/// Server-side fetch of a video from a remote URL.
///
/// `collection_id` and `thumbnail_time` travel in the query string; the rest
/// is the body.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchVideoParams {
    #[serde(skip_serializing)]
    pub library_id: Option<u64>,
    #[serde(skip_serializing)]
    pub collection_id: Option<String>,
    #[serde(skip_serializing)]
    pub thumbnail_time: Option<u64>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Caption track; `caption_file` is the base64-encoded file content.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionFile {
    pub srclang: String,
    pub label: String,
    pub caption_file: String,
}

#[derive(Debug, Clone, Default)]
pub struct AddCaptionParams {
    pub library_id: Option<u64>,
    pub video_id: String,
    pub caption: CaptionFile,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteCaptionParams {
    pub library_id: Option<u64>,
    pub video_id: String,
    pub srclang: String,
}

/// Video endpoints under `/library/{id}/videos`, plus uploads.
pub struct Videos<C> {
    client: Arc<C>,
}

impl<C> Clone for Videos<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

impl<C: LibraryIdClient> Videos<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    pub async fn get(
        &self,
        params: VideoParams,
    ) -> Result<ResponseEnvelope<VideoLibraryItem>, ConfigError>
    where
        C: GetClient,
    {
        let library_id = library_id(&*self.client, params.library_id)?;
        Ok(self
            .client
            .get(
                &format!("/library/{library_id}/videos/{}", params.video_id),
                RequestOptions::read(),
            )
            .await)
    }

    pub async fn get_heatmap(
        &self,
        params: VideoParams,
    ) -> Result<ResponseEnvelope<Heatmap>, ConfigError>
    where
        C: GetClient,
    {
        let library_id = library_id(&*self.client, params.library_id)?;
        Ok(self
            .client
            .get(
                &format!("/library/{library_id}/videos/{}/heatmap", params.video_id),
                RequestOptions::read(),
            )
            .await)
    }

    /// Library-wide statistics, narrowed to one video by `video_guid`.
    pub async fn get_statistics(
        &self,
        params: VideoStatisticsParams,
    ) -> Result<ResponseEnvelope<VideoStatistics>, ConfigError>
    where
        C: GetClient,
    {
        let library_id = library_id(&*self.client, params.library_id)?;
        let mut options = RequestOptions::read();
        options.data = match to_data(&params) {
            Ok(data) => data,
            Err(failure) => return Ok(failure),
        };

        Ok(self
            .client
            .get(&format!("/library/{library_id}/statistics"), options)
            .await)
    }

    pub async fn get_list(
        &self,
        params: VideoListParams,
    ) -> Result<ResponseEnvelope<PaginatedVideoLibraryResponse>, ConfigError>
    where
        C: GetClient,
    {
        let library_id = library_id(&*self.client, params.library_id)?;
        let mut options = RequestOptions::read();
        options.data = match to_data(&params) {
            Ok(data) => data,
            Err(failure) => return Ok(failure),
        };

        Ok(self
            .client
            .get(&format!("/library/{library_id}/videos"), options)
            .await)
    }

    pub async fn update(
        &self,
        params: UpdateVideoParams,
    ) -> Result<ResponseEnvelope<DefaultResponse>, ConfigError>
    where
        C: PostClient,
    {
        let library_id = library_id(&*self.client, params.library_id)?;
        let mut options = RequestOptions::write();
        options.data = match to_data(&params) {
            Ok(data) => data,
            Err(failure) => return Ok(failure),
        };

        Ok(self
            .client
            .post(
                &format!("/library/{library_id}/videos/{}", params.video_id),
                options,
            )
            .await)
    }

    pub async fn reencode(
        &self,
        params: VideoParams,
    ) -> Result<ResponseEnvelope<VideoLibraryItem>, ConfigError>
    where
        C: PostClient,
    {
        let library_id = library_id(&*self.client, params.library_id)?;
        Ok(self
            .client
            .post(
                &format!("/library/{library_id}/videos/{}/reencode", params.video_id),
                RequestOptions::read(),
            )
            .await)
    }

    /// Create the video object. Content is sent separately with [`Videos::upload`].
    pub async fn create(
        &self,
        params: CreateVideoParams,
    ) -> Result<ResponseEnvelope<VideoLibraryItem>, ConfigError>
    where
        C: PostClient,
    {
        let library_id = library_id(&*self.client, params.library_id)?;
        let mut options = RequestOptions::write();
        options.data = match to_data(&params) {
            Ok(data) => data,
            Err(failure) => return Ok(failure),
        };

        Ok(self
            .client
            .post(&format!("/library/{library_id}/videos"), options)
            .await)
    }

    pub async fn set_thumbnail(
        &self,
        params: SetThumbnailParams,
    ) -> Result<ResponseEnvelope<DefaultResponse>, ConfigError>
    where
        C: PostClient,
    {
        let library_id = library_id(&*self.client, params.library_id)?;
        let mut options = RequestOptions::read();
        options.data = match to_data(&params) {
            Ok(data) => data,
            Err(failure) => return Ok(failure),
        };

        Ok(self
            .client
            .post(
                &format!("/library/{library_id}/videos/{}/thumbnail", params.video_id),
                options,
            )
            .await)
    }

    pub async fn fetch(
        &self,
        params: FetchVideoParams,
    ) -> Result<ResponseEnvelope<DefaultResponse>, ConfigError>
    where
        C: PostClient,
    {
        let library_id = library_id(&*self.client, params.library_id)?;
        let collection_id = params.collection_id.as_deref().unwrap_or_default();
        let thumbnail_time = params
            .thumbnail_time
            .map(|t| t.to_string())
            .unwrap_or_default();
        let endpoint = format!(
            "/library/{library_id}/videos/fetch?collectionId={}&thumbnailTime={}",
            urlencoding::encode(collection_id),
            urlencoding::encode(&thumbnail_time),
        );

        let mut options = RequestOptions::write();
        options.data = match to_data(&params) {
            Ok(data) => data,
            Err(failure) => return Ok(failure),
        };

        Ok(self.client.post(&endpoint, options).await)
    }

    pub async fn add_caption(
        &self,
        params: AddCaptionParams,
    ) -> Result<ResponseEnvelope<DefaultResponse>, ConfigError>
    where
        C: PostClient,
    {
        let library_id = library_id(&*self.client, params.library_id)?;
        let endpoint = format!(
            "/library/{library_id}/videos/{}/captions/{}",
            params.video_id, params.caption.srclang
        );
        let mut options = RequestOptions::write();
        options.data = match to_data(&params.caption) {
            Ok(data) => data,
            Err(failure) => return Ok(failure),
        };

        Ok(self.client.post(&endpoint, options).await)
    }

    pub async fn delete(
        &self,
        params: VideoParams,
    ) -> Result<ResponseEnvelope<DefaultResponse>, ConfigError>
    where
        C: DeleteClient,
    {
        let library_id = library_id(&*self.client, params.library_id)?;
        Ok(self
            .client
            .delete(
                &format!("/library/{library_id}/videos/{}", params.video_id),
                RequestOptions::read(),
            )
            .await)
    }

    pub async fn delete_caption(
        &self,
        params: DeleteCaptionParams,
    ) -> Result<ResponseEnvelope<DefaultResponse>, ConfigError>
    where
        C: DeleteClient,
    {
        let library_id = library_id(&*self.client, params.library_id)?;
        Ok(self
            .client
            .delete(
                &format!(
                    "/library/{library_id}/videos/{}/captions/{}",
                    params.video_id, params.srclang
                ),
                RequestOptions::read(),
            )
            .await)
    }

    /// Upload content for an existing video. The job's library id falls back
    /// to the client default.
    pub async fn upload(&self, mut job: UploadJob) -> Result<UploadHandle, UploadError>
    where
        C: UploadClient,
    {
        job.library_id = Some(library_id(&*self.client, job.library_id)?);
        self.client.upload(job).await
    }
}
