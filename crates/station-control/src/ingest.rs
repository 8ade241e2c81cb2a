//! Media ingestion: fetch, validate, catalog.
//!
//! `ingest` is the only way new media enters the station (aside from
//! orphan adoption during reconciliation). The guarantee that matters:
//! whatever fails, the media directory and the catalog stay consistent —
//! no row without a file, and no freshly written file left orphaned on an
//! error path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogError};
use crate::error::{Result, StationError};
use crate::media::{self, TrackMeta};
use station_proto::config::Config;
use station_proto::model::{self, NewSong, Song, KARMA_DEFAULT};
use station_proto::platform;

/// Marker the fetch tool prints on a fully completed transfer. Exit code
/// zero alone is not trusted: the remote source may truncate silently.
const COMPLETION_MARKER: &str = "100%";

pub struct IngestionPipeline {
    catalog: Arc<dyn Catalog>,
    media_dir: PathBuf,
    extension: String,
    max_duration_secs: u64,
    max_filesize_mb: u64,
    fetch_binary: Option<PathBuf>,
    source_url_template: String,
    system_user: String,
    /// Media ids with an ingest in flight; the second concurrent attempt
    /// for the same id observes `AlreadyExists`.
    in_flight: Mutex<HashSet<String>>,
}

impl IngestionPipeline {
    pub fn new(config: &Config, catalog: Arc<dyn Catalog>) -> Self {
        Self {
            catalog,
            media_dir: config.media.dir.clone(),
            extension: config.media.extension.clone(),
            max_duration_secs: config.media.max_duration_secs,
            max_filesize_mb: config.media.max_filesize_mb,
            fetch_binary: config.media.fetch_binary.clone(),
            source_url_template: config.media.source_url_template.clone(),
            system_user: config.station.system_user.clone(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Fetch `media_id`, extract metadata, enforce the duration cap, and
    /// persist the catalog row attributed to `requested_by`.
    pub async fn ingest(&self, media_id: &str, requested_by: &str) -> Result<Song> {
        if !model::is_valid_media_id(media_id) {
            return Err(StationError::InvalidMediaId(media_id.to_string()));
        }

        let _slot = self.claim(media_id)?;
        let path = model::media_path(&self.media_dir, media_id, &self.extension);

        // Row and file are checked independently; each of the four
        // combinations has its own policy.
        let row = match self.catalog.find_by_media_id(media_id).await {
            Ok(song) => Some(song),
            Err(CatalogError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };
        let file_exists = path.exists();

        match (row, file_exists) {
            (Some(_), true) => {
                return Err(StationError::AlreadyExists(media_id.to_string()));
            }
            (Some(_), false) => {
                // Stale row pointing at a deleted file: self-heal.
                warn!("catalog row without file, removing stale row for {}", media_id);
                self.catalog.delete(media_id).await?;
            }
            (None, true) => {
                info!("file already on disk, adopting {}", path.display());
                return self.persist(media_id, &self.system_user, &path).await;
            }
            (None, false) => {}
        }

        self.fetch(media_id, &path).await?;

        match self.persist(media_id, requested_by, &path).await {
            Ok(song) => Ok(song),
            // A concurrent ingest won the row; row and file now agree, so
            // the file stays.
            Err(e @ StationError::AlreadyExists(_)) => Err(e),
            Err(e) => {
                cleanup_media(&path).await;
                Err(e)
            }
        }
    }

    /// Run the external fetch tool and require its completion marker. On
    /// any failure, partial output is removed before returning.
    async fn fetch(&self, media_id: &str, path: &Path) -> Result<()> {
        let binary = match &self.fetch_binary {
            Some(p) => p.clone(),
            None => platform::find_fetch_binary()
                .ok_or_else(|| StationError::Fetch("fetch tool not found".to_string()))?,
        };
        let url = self.source_url_template.replace("{id}", media_id);
        let template = format!("{}/%(id)s.{}", self.media_dir.display(), self.extension);

        tokio::fs::create_dir_all(&self.media_dir).await?;

        info!("fetching {} via {}", media_id, binary.display());
        let output = Command::new(&binary)
            .arg("--add-metadata")
            .arg("--write-info-json")
            .arg("-f")
            .arg("bestaudio")
            .arg("--max-filesize")
            .arg(format!("{}M", self.max_filesize_mb))
            .arg("--extract-audio")
            .arg("--audio-format")
            .arg(audio_format(&self.extension))
            .arg("-o")
            .arg(&template)
            .arg(&url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| StationError::Fetch(format!("failed to spawn fetch tool: {}", e)))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        for line in combined.lines() {
            debug!("fetch: {}", line);
        }

        if !output.status.success() {
            cleanup_media(path).await;
            return Err(StationError::Fetch(format!(
                "fetch tool exited with {:?}",
                output.status.code()
            )));
        }
        if !combined.contains(COMPLETION_MARKER) {
            // The tool exited zero but never reported a full transfer.
            cleanup_media(path).await;
            return Err(StationError::Fetch("transfer did not complete".to_string()));
        }
        if !path.exists() {
            return Err(StationError::Fetch(format!(
                "fetch tool reported completion but {} is missing",
                path.display()
            )));
        }
        Ok(())
    }

    /// Extract metadata, enforce the duration cap, create the row.
    async fn persist(&self, media_id: &str, added_by: &str, path: &Path) -> Result<Song> {
        let meta = match media::extract(path).await {
            Some(meta) => meta,
            None => {
                // Missing metadata never blocks ingestion, only missing
                // or oversized audio does.
                warn!("no usable metadata for {}, using placeholder", path.display());
                TrackMeta::placeholder()
            }
        };

        if meta.duration_secs > self.max_duration_secs {
            cleanup_media(path).await;
            return Err(StationError::DurationExceeded {
                secs: meta.duration_secs,
                max: self.max_duration_secs,
            });
        }

        match self
            .catalog
            .create(NewSong {
                media_id: media_id.to_string(),
                title: meta.title,
                added_by: added_by.to_string(),
                duration_secs: meta.duration_secs,
                karma: KARMA_DEFAULT,
            })
            .await
        {
            Ok(song) => {
                info!("ingested {} as \"{}\"", media_id, song.title);
                Ok(song)
            }
            Err(CatalogError::Duplicate(id)) => Err(StationError::AlreadyExists(id)),
            Err(e) => Err(e.into()),
        }
    }

    fn claim(&self, media_id: &str) -> Result<InFlightSlot> {
        let mut set = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !set.insert(media_id.to_string()) {
            return Err(StationError::AlreadyExists(media_id.to_string()));
        }
        Ok(InFlightSlot {
            set: &self.in_flight,
            media_id: media_id.to_string(),
        })
    }
}

/// Releases the in-flight claim on drop, including on cancellation.
struct InFlightSlot<'a> {
    set: &'a Mutex<HashSet<String>>,
    media_id: String,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        let mut set = self
            .set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        set.remove(&self.media_id);
    }
}

/// Remove the media file and its sidecar descriptor, ignoring files that
/// were never written.
async fn cleanup_media(path: &Path) {
    for target in [path.to_path_buf(), media::sidecar_path(path)] {
        match tokio::fs::remove_file(&target).await {
            Ok(()) => info!("removed {}", target.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove {}: {}", target.display(), e),
        }
    }
}

fn audio_format(extension: &str) -> &str {
    match extension {
        "ogg" => "vorbis",
        other => other,
    }
}
