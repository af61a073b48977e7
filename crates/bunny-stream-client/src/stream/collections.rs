use std::sync::Arc;

use bunny_stream_core::models::{Collection, CollectionList, DefaultResponse};
use bunny_stream_core::{ConfigError, ResponseEnvelope};
use serde::Serialize;

use super::{library_id, to_data};
use crate::capability::{DeleteClient, GetClient, LibraryIdClient, PostClient, RequestOptions};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionListParams {
    #[serde(skip_serializing)]
    pub library_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_thumbnails: Option<bool>,
}

/// Addresses one collection.
#[derive(Debug, Clone, Default)]
pub struct CollectionParams {
    pub library_id: Option<u64>,
    pub collection_id: String,
}

impl CollectionParams {
    pub fn new(collection_id: impl Into<String>) -> Self {
        Self {
            library_id: None,
            collection_id: collection_id.into(),
        }
    }

    pub fn library_id(mut self, library_id: u64) -> Self {
        self.library_id = Some(library_id);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateCollectionParams {
    #[serde(skip_serializing)]
    pub library_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateCollectionParams {
    #[serde(skip_serializing)]
    pub library_id: Option<u64>,
    #[serde(skip_serializing)]
    pub collection_id: String,
    pub name: String,
}

/// Collection endpoints under `/library/{id}/collections`.
pub struct Collections<C> {
    client: Arc<C>,
}

impl<C> Clone for Collections<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

impl<C: LibraryIdClient> Collections<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    pub async fn get_list(
        &self,
        params: CollectionListParams,
    ) -> Result<ResponseEnvelope<CollectionList>, ConfigError>
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
            .get(&format!("/library/{library_id}/collections"), options)
            .await)
    }

    pub async fn get(
        &self,
        params: CollectionParams,
    ) -> Result<ResponseEnvelope<Collection>, ConfigError>
    where
        C: GetClient,
    {
        let library_id = library_id(&*self.client, params.library_id)?;
        Ok(self
            .client
            .get(
                &format!("/library/{library_id}/collections/{}", params.collection_id),
                RequestOptions::read(),
            )
            .await)
    }

    pub async fn delete(
        &self,
        params: CollectionParams,
    ) -> Result<ResponseEnvelope<DefaultResponse>, ConfigError>
    where
        C: DeleteClient,
    {
        let library_id = library_id(&*self.client, params.library_id)?;
        Ok(self
            .client
            .delete(
                &format!("/library/{library_id}/collections/{}", params.collection_id),
                RequestOptions::read(),
            )
            .await)
    }

    pub async fn create(
        &self,
        params: CreateCollectionParams,
    ) -> Result<ResponseEnvelope<Collection>, ConfigError>
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
            .post(&format!("/library/{library_id}/collections"), options)
            .await)
    }

    /// The remote API updates collections with POST.
    pub async fn update(
        &self,
        params: UpdateCollectionParams,
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
                &format!("/library/{library_id}/collections/{}", params.collection_id),
                options,
            )
            .await)
    }
}
