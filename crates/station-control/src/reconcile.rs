//! Reconciliation of the engine's raw text output into canonical song
//! lists.
//!
//! The engine reports play history and pending requests as loosely
//! structured text referencing absolute file paths. This module combines
//! the control client, the pure parsers, and the catalog into ordered,
//! deduplicated [`Song`] sequences. A single bad entry never blanks a
//! listing: per-item lookup failures are logged and the item is skipped.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::catalog::{Catalog, CatalogError};
use crate::engine::{commands, ControlClient};
use crate::error::{Result, StationError};
use crate::media;
use crate::status::StatusClient;
use station_proto::config::Config;
use station_proto::model::{self, NewSong, Song, KARMA_DEFAULT};
use station_proto::parse;

pub const DEFAULT_HISTORY_LIMIT: usize = 5;

pub struct StationReconciler {
    client: ControlClient,
    status: StatusClient,
    catalog: Arc<dyn Catalog>,
    iface: String,
    media_dir: PathBuf,
    extension: String,
    system_user: String,
}

impl StationReconciler {
    pub fn new(config: &Config, catalog: Arc<dyn Catalog>) -> Self {
        Self {
            client: ControlClient::new(&config.engine),
            status: StatusClient::new(&config.status),
            catalog,
            iface: config.engine.iface.clone(),
            media_dir: config.media.dir.clone(),
            extension: config.media.extension.clone(),
            system_user: config.station.system_user.clone(),
        }
    }

    pub fn client(&self) -> &ControlClient {
        &self.client
    }

    /// Recently played songs, most recent first, capped to `limit`,
    /// deduplicated by path. Index 0 is the track on air right now.
    pub async fn history(&self, limit: usize) -> Result<Vec<Song>> {
        let raw = self
            .client
            .send(&commands::on_air_metadata(&self.iface))
            .await?;
        if raw.is_empty() {
            error!("empty metadata response from engine");
            return Err(StationError::protocol(raw));
        }

        let text = String::from_utf8_lossy(&raw);
        let mut paths = parse::existing_paths(&text, |p| p.exists());
        paths.reverse();
        paths.truncate(limit);

        Ok(self.resolve_paths(dedup_paths(paths)).await)
    }

    /// The track on air right now, if any. Engine errors are swallowed:
    /// "nothing playing" and "engine gone" render the same to voters.
    pub async fn now_playing(&self) -> Option<Song> {
        match self.history(1).await {
            Ok(songs) => songs.into_iter().next(),
            Err(e) => {
                warn!("now-playing lookup failed: {}", e);
                None
            }
        }
    }

    /// Pending queue as the engine reports it, deduplicated, with the
    /// in-flight track removed (the engine keeps reporting it as queued).
    pub async fn queue(&self) -> Result<Vec<Song>> {
        let raw = self.client.send(commands::QUEUE).await?;
        if raw.is_empty() {
            error!("empty queue response from engine");
            return Err(StationError::protocol(raw));
        }

        let ids = parse::queue_request_ids(&String::from_utf8_lossy(&raw));
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for id in &ids {
            let meta = self.client.send(&commands::request_metadata(id)).await?;
            if meta.is_empty() {
                error!("empty metadata response for request {}", id);
                return Err(StationError::protocol(meta));
            }
            let text = String::from_utf8_lossy(&meta);
            if let Some(path) = parse::existing_paths(&text, |p| p.exists()).into_iter().next() {
                paths.push(path);
            }
        }

        let mut songs = self.resolve_paths(dedup_paths(paths)).await;

        // The engine reports the in-flight track as still queued.
        if let Some(now_playing) = self.now_playing().await {
            let playing_path = now_playing.file_path(&self.media_dir, &self.extension);
            if songs
                .first()
                .map(|s| s.file_path(&self.media_dir, &self.extension) == playing_path)
                .unwrap_or(false)
            {
                songs.remove(0);
            }
        }
        Ok(songs)
    }

    /// Push a song onto the engine's request queue unless its path is
    /// already in the current queue view. Returns whether a push was
    /// issued.
    ///
    /// Check-then-push is not atomic: a concurrent enqueue between the
    /// queue read and the push can still double-queue. Accepted trade-off;
    /// the engine offers no transactional push.
    pub async fn enqueue(&self, song: &Song) -> Result<bool> {
        let path = song.file_path(&self.media_dir, &self.extension);
        let queued: HashSet<PathBuf> = self
            .queue()
            .await?
            .iter()
            .map(|s| s.file_path(&self.media_dir, &self.extension))
            .collect();
        if queued.contains(&path) {
            info!("already queued: {}", path.display());
            return Ok(false);
        }

        self.client
            .send(&commands::push(&path.display().to_string()))
            .await?;
        Ok(true)
    }

    /// Skip the track on air.
    pub async fn skip(&self) -> Result<()> {
        self.client.send(&commands::skip(&self.iface)).await?;
        Ok(())
    }

    /// Advisory listener count; unknown degrades to 0.
    pub async fn listeners(&self) -> u64 {
        self.status.listener_count().await.unwrap_or(0)
    }

    /// Resolve a file path to its catalog row, adopting the file when no
    /// row exists yet.
    ///
    /// Returns `Ok(None)` when the file yields nothing usable — the
    /// caller skips it rather than failing a whole listing.
    pub async fn lookup_or_adopt(&self, path: &Path) -> Result<Option<Song>> {
        let media_id = model::media_id_from_path(path)
            .ok_or_else(|| StationError::InvalidMediaId(path.display().to_string()))?;

        match self.catalog.find_by_media_id(&media_id).await {
            Ok(song) => return Ok(Some(song)),
            Err(CatalogError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let Some(meta) = media::extract(path).await else {
            warn!("unresolvable media file, skipping: {}", path.display());
            return Ok(None);
        };

        info!("adopting orphan file {} as {}", path.display(), media_id);
        match self
            .catalog
            .create(NewSong {
                media_id: media_id.clone(),
                title: meta.title,
                added_by: self.system_user.clone(),
                duration_secs: meta.duration_secs,
                karma: KARMA_DEFAULT,
            })
            .await
        {
            Ok(song) => Ok(Some(song)),
            // Lost an adoption race; the winner's row is just as good.
            Err(CatalogError::Duplicate(_)) => {
                Ok(Some(self.catalog.find_by_media_id(&media_id).await?))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn resolve_paths(&self, paths: Vec<PathBuf>) -> Vec<Song> {
        let mut songs = Vec::with_capacity(paths.len());
        for path in paths {
            match self.lookup_or_adopt(&path).await {
                Ok(Some(song)) => songs.push(song),
                Ok(None) => {}
                Err(e) => {
                    warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
        songs
    }
}

/// Order-preserving dedup on first occurrence.
fn dedup_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths.into_iter().filter(|p| seen.insert(p.clone())).collect()
}
