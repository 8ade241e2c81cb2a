//! The caller-facing facade.
//!
//! Everything the chat dispatcher may do to the station goes through
//! [`StationController`]. No raw protocol text crosses this boundary:
//! operations return typed results or a specific [`StationError`] kind
//! that the dispatcher renders to the end user.

use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::announce::MessageSink;
use crate::catalog::{Catalog, CatalogError};
use crate::error::{Result, StationError};
use crate::ingest::IngestionPipeline;
use crate::reconcile::{StationReconciler, DEFAULT_HISTORY_LIMIT};
use station_proto::config::Config;
use station_proto::model::{self, Song, KARMA_MAX, KARMA_MIN};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Vote {
    Up,
    Down,
}

/// Result of a lookup-then-enqueue request.
#[derive(Debug, Clone)]
pub enum EnqueueOutcome {
    Queued(Song),
    /// The song's path was already in the current queue view; nothing was
    /// pushed.
    AlreadyQueued(Song),
    /// The query matched several songs; a bounded shortlist is returned
    /// instead of guessing.
    Candidates(Vec<Song>),
}

pub struct StationController {
    reconciler: StationReconciler,
    ingest: IngestionPipeline,
    catalog: Arc<dyn Catalog>,
    sink: Arc<dyn MessageSink>,
    admins: Vec<String>,
    media_dir: PathBuf,
    extension: String,
    candidate_cap: usize,
    min_query_chars: usize,
    random_queue_retries: usize,
    history_cache: Mutex<HistoryCache>,
}

impl StationController {
    pub fn new(config: &Config, catalog: Arc<dyn Catalog>, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            reconciler: StationReconciler::new(config, catalog.clone()),
            ingest: IngestionPipeline::new(config, catalog.clone()),
            catalog,
            sink,
            admins: config.station.admins.clone(),
            media_dir: config.media.dir.clone(),
            extension: config.media.extension.clone(),
            candidate_cap: config.station.candidate_cap,
            min_query_chars: config.station.min_query_chars,
            random_queue_retries: config.station.random_queue_retries,
            history_cache: Mutex::new(HistoryCache::new(Duration::from_millis(
                config.station.history_cache_ms,
            ))),
        }
    }

    pub fn reconciler(&self) -> &StationReconciler {
        &self.reconciler
    }

    pub async fn now_playing(&self) -> Option<Song> {
        self.reconciler.now_playing().await
    }

    /// Play history, most recent first. Snapshots are cached briefly so a
    /// chatty channel does not hammer the engine; any mutating operation
    /// invalidates the snapshot.
    pub async fn history(&self, limit: usize) -> Result<Vec<Song>> {
        {
            let cache = self.history_cache.lock().await;
            if let Some(songs) = cache.get(limit) {
                return Ok(songs);
            }
        }

        let songs = self.reconciler.history(limit).await?;
        self.history_cache.lock().await.put(limit, songs.clone());
        Ok(songs)
    }

    pub async fn queue(&self) -> Result<Vec<Song>> {
        self.reconciler.queue().await
    }

    /// Find a song by media id or title substring and enqueue it. A query
    /// matching several songs returns candidates instead of picking one.
    pub async fn enqueue_by_lookup(&self, query: &str) -> Result<EnqueueOutcome> {
        let query = query.trim();
        if query.len() < self.min_query_chars {
            return Err(StationError::QueryTooShort {
                min: self.min_query_chars,
            });
        }

        if model::is_valid_media_id(query) {
            match self.catalog.find_by_media_id(query).await {
                Ok(song) => return self.enqueue_song(song).await,
                Err(CatalogError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let mut matches = self.catalog.search_title(query).await?;
        match matches.len() {
            0 => Err(StationError::NotFound(query.to_string())),
            1 => {
                let song = matches.remove(0);
                self.enqueue_song(song).await
            }
            _ => {
                // Shuffle so the shortlist rotates between repeat queries.
                shuffle(&mut matches);
                matches.truncate(self.candidate_cap);
                Ok(EnqueueOutcome::Candidates(matches))
            }
        }
    }

    async fn enqueue_song(&self, song: Song) -> Result<EnqueueOutcome> {
        if self.reconciler.enqueue(&song).await? {
            info!("queued \"{}\" ({})", song.title, song.media_id);
            Ok(EnqueueOutcome::Queued(song))
        } else {
            Ok(EnqueueOutcome::AlreadyQueued(song))
        }
    }

    /// Adjust the karma of the song on air, clamped to
    /// `KARMA_MIN..=KARMA_MAX`.
    pub async fn vote(&self, vote: Vote) -> Result<Song> {
        let mut song = self
            .now_playing()
            .await
            .ok_or(StationError::NothingPlaying)?;

        let karma = match vote {
            Vote::Up => song.karma.saturating_add(1).min(KARMA_MAX),
            Vote::Down => song.karma.saturating_sub(1).max(KARMA_MIN),
        };
        if karma != song.karma {
            self.catalog.set_karma(&song.media_id, karma).await?;
            song.karma = karma;
            self.invalidate_history().await;
        }
        Ok(song)
    }

    /// Ingest new media and announce progress on the message port.
    pub async fn ingest_and_announce(&self, media_id: &str, requested_by: &str) -> Result<Song> {
        self.sink
            .send(&format!("Scheduled download for '{}'", media_id))
            .await;

        let song = self.ingest.ingest(media_id, requested_by).await?;
        self.sink.send(&format!("'{}' added", song.title)).await;
        Ok(song)
    }

    /// Delete both the catalog row and the media file. Partial deletion
    /// is surfaced, never swallowed: leaving one half behind recreates
    /// exactly the row/file inconsistency ingestion guards against.
    pub async fn remove(&self, media_id: &str) -> Result<()> {
        if !model::is_valid_media_id(media_id) {
            return Err(StationError::InvalidMediaId(media_id.to_string()));
        }

        let path = model::media_path(&self.media_dir, media_id, &self.extension);
        let had_row = match self.catalog.delete(media_id).await {
            Ok(()) => true,
            Err(CatalogError::NotFound(_)) => false,
            Err(e) => return Err(e.into()),
        };

        let had_file = match tokio::fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            // Row may already be gone at this point; report it rather
            // than pretending the removal finished.
            Err(e) => {
                warn!("removed row but not file for {}: {}", media_id, e);
                return Err(e.into());
            }
        };

        if !had_row && !had_file {
            return Err(StationError::NotFound(media_id.to_string()));
        }

        self.invalidate_history().await;
        info!("removed {} (row: {}, file: {})", media_id, had_row, had_file);
        Ok(())
    }

    /// Retitle a song. Only the original submitter (case-insensitive) or
    /// a configured administrator may rename.
    pub async fn rename(
        &self,
        media_id: &str,
        new_title: &str,
        requested_by: &str,
    ) -> Result<Song> {
        if !model::is_valid_media_id(media_id) {
            return Err(StationError::InvalidMediaId(media_id.to_string()));
        }
        let new_title = new_title.trim();
        if new_title.is_empty() {
            return Err(StationError::QueryTooShort { min: 1 });
        }

        let mut song = self.catalog.find_by_media_id(media_id).await?;
        if !song.submitted_by(requested_by) && !self.is_admin(requested_by) {
            return Err(StationError::Forbidden);
        }

        self.catalog.set_title(media_id, new_title).await?;
        song.title = new_title.to_string();
        self.invalidate_history().await;
        Ok(song)
    }

    /// Queue a random song submitted by `nick`, retrying past songs that
    /// are already queued. The retry bound is policy, not a guarantee.
    pub async fn queue_random_by_submitter(&self, nick: &str) -> Result<Song> {
        let songs = self.catalog.search_submitter(nick).await?;
        if songs.is_empty() {
            return Err(StationError::NotFound(nick.to_string()));
        }

        for _ in 0..self.random_queue_retries {
            let pick = songs[pick_index(songs.len())].clone();
            if self.reconciler.enqueue(&pick).await? {
                return Ok(pick);
            }
        }
        Err(StationError::RandomQueueExhausted {
            attempts: self.random_queue_retries,
        })
    }

    pub async fn skip(&self) -> Result<()> {
        self.reconciler.skip().await?;
        self.invalidate_history().await;
        Ok(())
    }

    pub async fn listeners(&self) -> u64 {
        self.reconciler.listeners().await
    }

    pub async fn engine_reachable(&self) -> bool {
        self.reconciler.client().is_reachable().await
    }

    /// Default-limit history, the shape most callers want.
    pub async fn recent(&self) -> Result<Vec<Song>> {
        self.history(DEFAULT_HISTORY_LIMIT).await
    }

    fn is_admin(&self, nick: &str) -> bool {
        self.admins.iter().any(|a| a.eq_ignore_ascii_case(nick))
    }

    async fn invalidate_history(&self) {
        self.history_cache.lock().await.invalidate();
    }
}

// Scoped so no RNG handle is held across an await point.
fn pick_index(len: usize) -> usize {
    rand::thread_rng().gen_range(0..len)
}

fn shuffle(songs: &mut [Song]) {
    use rand::seq::SliceRandom;
    songs.shuffle(&mut rand::thread_rng());
}

/// Last fetched history snapshot with monotonic-clock expiry. Replaces an
/// ambient module-level cache with explicit, invalidatable state.
struct HistoryCache {
    ttl: Duration,
    entry: Option<CacheEntry>,
}

struct CacheEntry {
    at: Instant,
    limit: usize,
    songs: Vec<Song>,
}

impl HistoryCache {
    fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    fn get(&self, limit: usize) -> Option<Vec<Song>> {
        let entry = self.entry.as_ref()?;
        if entry.limit != limit || entry.at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.songs.clone())
    }

    fn put(&mut self, limit: usize, songs: Vec<Song>) {
        self.entry = Some(CacheEntry {
            at: Instant::now(),
            limit,
            songs,
        });
    }

    fn invalidate(&mut self) {
        self.entry = None;
    }
}
