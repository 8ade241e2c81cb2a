//! The consumed catalog interface.
//!
//! The relational store itself lives outside this crate; the controller
//! only needs lookup/create/update/delete keyed by media identifier. The
//! trait keeps that seam mockable — production wires in the real store,
//! tests use [`MemoryCatalog`].

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use station_proto::model::{NewSong, Song};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("no catalog row for {0}")]
    NotFound(String),
    #[error("catalog row already exists for {0}")]
    Duplicate(String),
    #[error("storage failure: {0}")]
    Storage(String),
}

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Insert a new row. Fails with [`CatalogError::Duplicate`] when a row
    /// with the same media id exists; the unique constraint is the final
    /// arbiter under concurrent ingestion.
    async fn create(&self, song: NewSong) -> Result<Song, CatalogError>;

    async fn find_by_media_id(&self, media_id: &str) -> Result<Song, CatalogError>;

    /// Case-insensitive title substring search, insertion order.
    async fn search_title(&self, needle: &str) -> Result<Vec<Song>, CatalogError>;

    /// Case-insensitive submitter substring search, insertion order.
    async fn search_submitter(&self, needle: &str) -> Result<Vec<Song>, CatalogError>;

    async fn set_title(&self, media_id: &str, title: &str) -> Result<(), CatalogError>;

    async fn set_karma(&self, media_id: &str, karma: u8) -> Result<(), CatalogError>;

    async fn delete(&self, media_id: &str) -> Result<(), CatalogError>;
}

/// In-memory catalog: reference implementation for embedding tests.
///
/// Preserves insertion order so search results are deterministic.
#[derive(Default, Clone)]
pub struct MemoryCatalog {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    rows: HashMap<String, Song>,
    order: Vec<String>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn create(&self, song: NewSong) -> Result<Song, CatalogError> {
        let mut inner = self.inner.lock().await;
        if inner.rows.contains_key(&song.media_id) {
            return Err(CatalogError::Duplicate(song.media_id));
        }
        let row = Song {
            media_id: song.media_id.clone(),
            title: song.title,
            added_by: song.added_by,
            duration_secs: song.duration_secs,
            karma: song.karma,
            date_added: Utc::now(),
            banned: false,
        };
        inner.order.push(song.media_id.clone());
        inner.rows.insert(song.media_id, row.clone());
        Ok(row)
    }

    async fn find_by_media_id(&self, media_id: &str) -> Result<Song, CatalogError> {
        let inner = self.inner.lock().await;
        inner
            .rows
            .get(media_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(media_id.to_string()))
    }

    async fn search_title(&self, needle: &str) -> Result<Vec<Song>, CatalogError> {
        let needle = needle.to_ascii_lowercase();
        let inner = self.inner.lock().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.rows.get(id))
            .filter(|s| s.title.to_ascii_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn search_submitter(&self, needle: &str) -> Result<Vec<Song>, CatalogError> {
        let needle = needle.to_ascii_lowercase();
        let inner = self.inner.lock().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.rows.get(id))
            .filter(|s| s.added_by.to_ascii_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn set_title(&self, media_id: &str, title: &str) -> Result<(), CatalogError> {
        let mut inner = self.inner.lock().await;
        let row = inner
            .rows
            .get_mut(media_id)
            .ok_or_else(|| CatalogError::NotFound(media_id.to_string()))?;
        row.title = title.to_string();
        Ok(())
    }

    async fn set_karma(&self, media_id: &str, karma: u8) -> Result<(), CatalogError> {
        let mut inner = self.inner.lock().await;
        let row = inner
            .rows
            .get_mut(media_id)
            .ok_or_else(|| CatalogError::NotFound(media_id.to_string()))?;
        row.karma = karma;
        Ok(())
    }

    async fn delete(&self, media_id: &str) -> Result<(), CatalogError> {
        let mut inner = self.inner.lock().await;
        if inner.rows.remove(media_id).is_none() {
            return Err(CatalogError::NotFound(media_id.to_string()));
        }
        inner.order.retain(|id| id != media_id);
        Ok(())
    }
}
