use tracing::{debug, warn};

use gallery_types::models::Media;

use crate::cache::MediaCache;
use crate::client::{GalleryClient, UploadFile};
use crate::error::ClientError;

/// Media list that applies edits locally first and reconciles with the
/// server afterwards. A failed call restores the exact pre-edit list.
pub struct OptimisticGallery {
    client: GalleryClient,
    cache: MediaCache,
}

impl OptimisticGallery {
    pub fn new(client: GalleryClient) -> Self {
        Self::with_cache(client, MediaCache::default())
    }

    pub fn with_cache(client: GalleryClient, cache: MediaCache) -> Self {
        Self { client, cache }
    }

    pub fn client(&self) -> &GalleryClient {
        &self.client
    }

    pub fn items(&self) -> &[Media] {
        self.cache.items()
    }

    pub fn cache(&self) -> &MediaCache {
        &self.cache
    }

    /// Replace the local list with the server's.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let items = self.client.list_media().await?;
        self.cache.replace(items);
        Ok(())
    }

    pub async fn upload(&mut self, files: Vec<UploadFile>) -> Result<Vec<Media>, ClientError> {
        let created = self.client.upload(files).await?;
        for media in &created {
            self.cache.upsert(media.clone());
        }
        Ok(created)
    }

    /// Show the new order immediately, then persist it. On success the list
    /// is refetched so it matches the server; on failure it is rolled back.
    pub async fn reorder(&mut self, ordered_ids: &[i64]) -> Result<(), ClientError> {
        let snapshot = self.cache.snapshot();
        self.cache.apply_reorder(ordered_ids);

        if let Err(e) = self.client.reorder(ordered_ids).await {
            warn!("Reorder failed, rolling back: {}", e);
            self.cache.restore(snapshot);
            return Err(e);
        }

        // The write already landed; a failed refetch leaves the optimistic list.
        if let Err(e) = self.refresh().await {
            warn!("Refetch after reorder failed: {}", e);
        }
        Ok(())
    }

    pub async fn set_liked(&mut self, id: i64, liked: bool) -> Result<Media, ClientError> {
        let snapshot = self.cache.snapshot();
        if !self.cache.apply_like(id, liked) {
            debug!("Liking media {} that is not cached", id);
        }

        match self.client.set_liked(id, liked).await {
            Ok(media) => {
                self.cache.upsert(media.clone());
                Ok(media)
            }
            Err(e) => {
                warn!("Like failed, rolling back: {}", e);
                self.cache.restore(snapshot);
                Err(e)
            }
        }
    }

    pub async fn delete(&mut self, id: i64) -> Result<(), ClientError> {
        let snapshot = self.cache.snapshot();
        self.cache.remove(id);

        if let Err(e) = self.client.delete_media(id).await {
            warn!("Delete failed, rolling back: {}", e);
            self.cache.restore(snapshot);
            return Err(e);
        }
        Ok(())
    }
}
