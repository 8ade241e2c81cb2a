//! Persistent catalog entities and the media-identifier format.
//!
//! A media identifier is the stable external token naming one piece of
//! audio: exactly 11 characters of `[A-Za-z0-9_-]`. It doubles as the
//! on-disk basename, so `media_id` uniquely identifies at most one catalog
//! row and at most one file under the media directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MEDIA_ID_LEN: usize = 11;

pub const KARMA_MIN: u8 = 0;
pub const KARMA_MAX: u8 = 10;
pub const KARMA_DEFAULT: u8 = 5;

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub media_id: String,
    pub title: String,
    /// Submitter nickname; compared case-insensitively everywhere.
    pub added_by: String,
    pub duration_secs: u64,
    /// Listener rating, clamped to `KARMA_MIN..=KARMA_MAX`.
    pub karma: u8,
    pub date_added: DateTime<Utc>,
    pub banned: bool,
}

impl Song {
    /// Absolute path of the media file backing this row.
    pub fn file_path(&self, media_dir: &Path, extension: &str) -> PathBuf {
        media_path(media_dir, &self.media_id, extension)
    }

    /// Whether `nick` is the submitter of this song (case-insensitive).
    pub fn submitted_by(&self, nick: &str) -> bool {
        self.added_by.eq_ignore_ascii_case(nick)
    }
}

/// Fields for a row about to be created; the catalog fills in
/// `date_added` and defaults `banned` to false.
#[derive(Debug, Clone)]
pub struct NewSong {
    pub media_id: String,
    pub title: String,
    pub added_by: String,
    pub duration_secs: u64,
    pub karma: u8,
}

/// A ban entry: matches either a media identifier or a submitter
/// nickname. Enforced by the authorization layer, not by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ban {
    pub media_id_or_nick: String,
}

/// `{dir}/{media_id}.{ext}` — the deterministic file location for an id.
pub fn media_path(media_dir: &Path, media_id: &str, extension: &str) -> PathBuf {
    media_dir.join(format!("{}.{}", media_id, extension))
}

/// Validate the fixed media-identifier format.
pub fn is_valid_media_id(id: &str) -> bool {
    id.len() == MEDIA_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Derive the media identifier from a file path reported by the engine.
/// Returns `None` when the basename does not carry a valid id.
pub fn media_id_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let id = name.split('.').next()?;
    if is_valid_media_id(id) {
        Some(id.to_string())
    } else {
        None
    }
}
