//! Metadata extraction from downloaded media files.
//!
//! Primary source is the file's embedded tags (lofty). The fetch tool
//! also writes a `<file>.info.json` sidecar descriptor; that is the
//! fallback when tags are missing or incomplete. When neither yields
//! anything usable the caller decides: ingestion falls back to a
//! placeholder title, orphan adoption skips the file.

use lofty::prelude::*;
use lofty::probe::Probe;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PLACEHOLDER: &str = "Unknown";

/// Title/duration pair extracted from a media file.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMeta {
    /// Display title, `Artist - Title` form.
    pub title: String,
    pub duration_secs: u64,
}

impl TrackMeta {
    /// Last-resort metadata when neither tags nor sidecar are usable.
    pub fn placeholder() -> Self {
        Self {
            title: format!("{} - {}", PLACEHOLDER, PLACEHOLDER),
            duration_secs: 0,
        }
    }
}

/// Sidecar descriptor written by the fetch tool next to the media file.
#[derive(Debug, Deserialize)]
struct SidecarInfo {
    artist: Option<String>,
    title: Option<String>,
    #[serde(default)]
    duration: Option<u64>,
}

/// `<file>.info.json` — the sidecar keeps the full media filename.
pub fn sidecar_path(media_path: &Path) -> PathBuf {
    let mut name = media_path.as_os_str().to_owned();
    name.push(".info.json");
    PathBuf::from(name)
}

/// Extract title and duration for `path`, embedded tags first, sidecar
/// second. Returns `None` when nothing usable was found at all.
pub async fn extract(path: &Path) -> Option<TrackMeta> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_blocking(&path))
        .await
        .ok()
        .flatten()
}

fn extract_blocking(path: &Path) -> Option<TrackMeta> {
    let tagged = match Probe::open(path).and_then(|p| p.read()) {
        Ok(t) => Some(t),
        Err(e) => {
            debug!("tag probe failed for {}: {}", path.display(), e);
            None
        }
    };

    let mut duration = tagged
        .as_ref()
        .map(|t| t.properties().duration().as_secs())
        .unwrap_or(0);

    let (mut artist, mut title) = match tagged.as_ref().and_then(|t| t.primary_tag()) {
        Some(tag) => (
            tag.get_string(&ItemKey::TrackArtist).map(|s| s.to_string()),
            tag.get_string(&ItemKey::TrackTitle).map(|s| s.to_string()),
        ),
        None => (None, None),
    };

    if artist.is_none() || title.is_none() {
        match read_sidecar(&sidecar_path(path)) {
            Some(info) => {
                artist = artist.or(info.artist);
                title = title.or(info.title);
                if let Some(d) = info.duration {
                    duration = d;
                }
            }
            None if tagged.is_none() => {
                // Neither tags nor sidecar: nothing usable.
                return None;
            }
            None => {
                warn!(
                    "no artist/title in tags and no sidecar for {}",
                    path.display()
                );
            }
        }
    }

    let artist = artist.unwrap_or_else(|| PLACEHOLDER.to_string());
    let title = title.unwrap_or_else(|| PLACEHOLDER.to_string());
    Some(TrackMeta {
        title: format!("{} - {}", artist, title),
        duration_secs: duration,
    })
}

fn read_sidecar(path: &Path) -> Option<SidecarInfo> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(info) => Some(info),
        Err(e) => {
            warn!("unusable sidecar {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sidecar_path_keeps_full_name() {
        let p = sidecar_path(Path::new("/music/AbCdEfGhIjK.ogg"));
        assert_eq!(p, PathBuf::from("/music/AbCdEfGhIjK.ogg.info.json"));
    }

    #[tokio::test]
    async fn test_sidecar_fallback_for_untagged_file() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("AbCdEfGhIjK.ogg");
        std::fs::write(&media, b"not really audio").unwrap();

        let mut sidecar = std::fs::File::create(sidecar_path(&media)).unwrap();
        sidecar
            .write_all(br#"{"artist": "The Band", "title": "Song A", "duration": 200}"#)
            .unwrap();

        let meta = extract(&media).await.unwrap();
        assert_eq!(meta.title, "The Band - Song A");
        assert_eq!(meta.duration_secs, 200);
    }

    #[tokio::test]
    async fn test_sidecar_partial_fields() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("AbCdEfGhIjK.ogg");
        std::fs::write(&media, b"junk").unwrap();
        std::fs::write(
            sidecar_path(&media),
            br#"{"title": "Song A", "duration": 90}"#,
        )
        .unwrap();

        let meta = extract(&media).await.unwrap();
        assert_eq!(meta.title, "Unknown - Song A");
        assert_eq!(meta.duration_secs, 90);
    }

    #[tokio::test]
    async fn test_nothing_usable() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("AbCdEfGhIjK.ogg");
        std::fs::write(&media, b"junk").unwrap();

        assert!(extract(&media).await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_sidecar_is_unusable() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("AbCdEfGhIjK.ogg");
        std::fs::write(&media, b"junk").unwrap();
        std::fs::write(sidecar_path(&media), b"{ not json").unwrap();

        assert!(extract(&media).await.is_none());
    }
}
