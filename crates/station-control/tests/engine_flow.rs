//! Reconciler + controller behavior against a scripted fake engine.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::{metadata_dump, test_config, FakeEngine};
use station_control::announce::NullSink;
use station_control::catalog::{Catalog, MemoryCatalog};
use station_control::controller::{EnqueueOutcome, StationController, Vote};
use station_control::StationError;
use station_proto::model::{NewSong, Song, KARMA_DEFAULT};

struct Fixture {
    engine: FakeEngine,
    catalog: MemoryCatalog,
    controller: StationController,
    media_dir: tempfile::TempDir,
}

async fn fixture() -> Fixture {
    let engine = FakeEngine::start().await;
    let media_dir = tempfile::tempdir().unwrap();
    let config = test_config(engine.port, media_dir.path());
    let catalog = MemoryCatalog::new();
    let controller =
        StationController::new(&config, Arc::new(catalog.clone()), Arc::new(NullSink));
    Fixture {
        engine,
        catalog,
        controller,
        media_dir,
    }
}

impl Fixture {
    /// Create a catalog row with a matching file on disk.
    async fn add_song(&self, media_id: &str, title: &str, added_by: &str) -> Song {
        std::fs::write(self.path_of(media_id), b"audio").unwrap();
        self.catalog
            .create(NewSong {
                media_id: media_id.to_string(),
                title: title.to_string(),
                added_by: added_by.to_string(),
                duration_secs: 180,
                karma: KARMA_DEFAULT,
            })
            .await
            .unwrap()
    }

    fn path_of(&self, media_id: &str) -> PathBuf {
        self.media_dir.path().join(format!("{}.ogg", media_id))
    }

    fn path_str(&self, media_id: &str) -> String {
        self.path_of(media_id).display().to_string()
    }
}

const A: &str = "AAAAAAAAAAA";
const B: &str = "BBBBBBBBBBB";
const C: &str = "CCCCCCCCCCC";
const D: &str = "DDDDDDDDDDD";
const E: &str = "EEEEEEEEEEE";

#[tokio::test]
async fn history_is_recent_first_capped_and_deduplicated() {
    let fx = fixture().await;
    for id in [A, B, C, D, E] {
        fx.add_song(id, &format!("Song {}", id), "alice").await;
    }

    // Engine reports oldest first: a b c d c e. Most-recent-first with a
    // cap of 5 gives e c d c b; dedup keeps first occurrences: e c d b.
    let dump = metadata_dump(&[
        &fx.path_str(A),
        &fx.path_str(B),
        &fx.path_str(C),
        &fx.path_str(D),
        &fx.path_str(C),
        &fx.path_str(E),
    ]);
    fx.engine.respond("radio.metadata", &dump).await;

    let history = fx.controller.history(5).await.unwrap();
    let ids: Vec<&str> = history.iter().map(|s| s.media_id.as_str()).collect();
    assert_eq!(ids, vec![E, C, D, B]);
    assert!(history.len() <= 5);
}

#[tokio::test]
async fn history_drops_paths_missing_from_disk() {
    let fx = fixture().await;
    fx.add_song(A, "Song A", "alice").await;

    let ghost = fx.path_str(B); // no file written for B
    let dump = metadata_dump(&[&ghost, &fx.path_str(A)]);
    fx.engine.respond("radio.metadata", &dump).await;

    let history = fx.controller.history(5).await.unwrap();
    let ids: Vec<&str> = history.iter().map(|s| s.media_id.as_str()).collect();
    assert_eq!(ids, vec![A]);
}

#[tokio::test]
async fn history_fails_protocol_on_empty_response() {
    let fx = fixture().await;
    fx.engine.respond("radio.metadata", "").await;

    let err = fx.controller.history(5).await.unwrap_err();
    assert!(matches!(err, StationError::Protocol { .. }));
}

#[tokio::test]
async fn queue_resolves_and_excludes_now_playing() {
    let fx = fixture().await;
    fx.add_song(A, "Song A", "alice").await;
    fx.add_song(B, "Song B", "bob").await;

    fx.engine.respond("requests.queue", "42\r\nEND\r\n").await;
    fx.engine
        .respond("request.metadata 42", &metadata_dump(&[&fx.path_str(A)]))
        .await;

    // Case 1: something else is on air — the queued song shows up.
    fx.engine
        .respond("radio.metadata", &metadata_dump(&[&fx.path_str(B)]))
        .await;
    let queue = fx.controller.queue().await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].title, "Song A");

    // Case 2: the queued song is the one on air — the engine still
    // reports it as queued, but the view drops it.
    fx.engine
        .respond("radio.metadata", &metadata_dump(&[&fx.path_str(A)]))
        .await;
    let queue = fx.controller.queue().await.unwrap();
    assert!(queue.is_empty());
}

#[tokio::test]
async fn queue_is_empty_when_engine_reports_none() {
    let fx = fixture().await;
    fx.engine.respond("requests.queue", "END\r\n").await;
    assert!(fx.controller.queue().await.unwrap().is_empty());
}

#[tokio::test]
async fn enqueue_is_idempotent_for_queued_path() {
    let fx = fixture().await;
    let song_a = fx.add_song(A, "Song A", "alice").await;
    let song_c = fx.add_song(C, "Song C", "carol").await;
    fx.add_song(B, "Song B", "bob").await;

    fx.engine.respond("requests.queue", "7\r\nEND\r\n").await;
    fx.engine
        .respond("request.metadata 7", &metadata_dump(&[&fx.path_str(A)]))
        .await;
    fx.engine
        .respond("radio.metadata", &metadata_dump(&[&fx.path_str(B)]))
        .await;

    // Already in the queue view: no push goes out.
    let pushed = fx.controller.reconciler().enqueue(&song_a).await.unwrap();
    assert!(!pushed);
    assert!(!fx
        .engine
        .received()
        .await
        .iter()
        .any(|c| c.starts_with("requests.push")));

    // Not queued yet: push goes out.
    let pushed = fx.controller.reconciler().enqueue(&song_c).await.unwrap();
    assert!(pushed);
    let expected = format!("requests.push {}", fx.path_str(C));
    assert!(fx.engine.received().await.contains(&expected));
}

#[tokio::test]
async fn vote_clamps_karma_at_both_ends() {
    let fx = fixture().await;
    fx.add_song(B, "Song B", "bob").await;
    fx.engine
        .respond("radio.metadata", &metadata_dump(&[&fx.path_str(B)]))
        .await;

    fx.catalog.set_karma(B, 10).await.unwrap();
    let song = fx.controller.vote(Vote::Up).await.unwrap();
    assert_eq!(song.karma, 10);
    assert_eq!(fx.catalog.find_by_media_id(B).await.unwrap().karma, 10);

    fx.catalog.set_karma(B, 0).await.unwrap();
    let song = fx.controller.vote(Vote::Down).await.unwrap();
    assert_eq!(song.karma, 0);
    assert_eq!(fx.catalog.find_by_media_id(B).await.unwrap().karma, 0);

    fx.catalog.set_karma(B, 5).await.unwrap();
    let song = fx.controller.vote(Vote::Up).await.unwrap();
    assert_eq!(song.karma, 6);
}

#[tokio::test]
async fn vote_with_nothing_playing() {
    let fx = fixture().await;
    fx.engine.respond("radio.metadata", &metadata_dump(&[])).await;

    let err = fx.controller.vote(Vote::Up).await.unwrap_err();
    assert!(matches!(err, StationError::NothingPlaying));
}

#[tokio::test]
async fn rename_requires_owner_or_admin() {
    let fx = fixture().await;
    fx.add_song(A, "Song A", "Alice").await;

    // Stranger: refused, title untouched.
    let err = fx.controller.rename(A, "Hijacked", "mallory").await.unwrap_err();
    assert!(matches!(err, StationError::Forbidden));
    assert_eq!(fx.catalog.find_by_media_id(A).await.unwrap().title, "Song A");

    // Owner, case-insensitive nick match.
    let song = fx.controller.rename(A, "Better Title", "alice").await.unwrap();
    assert_eq!(song.title, "Better Title");

    // Admin ("op" in the test config).
    let song = fx.controller.rename(A, "Op Title", "op").await.unwrap();
    assert_eq!(song.title, "Op Title");

    let err = fx.controller.rename("nonsense-id", "X", "alice").await.unwrap_err();
    assert!(matches!(err, StationError::InvalidMediaId(_)));
}

#[tokio::test]
async fn enqueue_by_lookup_disambiguates() {
    let fx = fixture().await;

    let err = fx.controller.enqueue_by_lookup("ab").await.unwrap_err();
    assert!(matches!(err, StationError::QueryTooShort { min: 3 }));

    let err = fx.controller.enqueue_by_lookup("missing").await.unwrap_err();
    assert!(matches!(err, StationError::NotFound(_)));

    fx.add_song(A, "Midnight Drive", "alice").await;
    fx.add_song(B, "Drive Slow", "bob").await;
    fx.add_song(C, "Drive It Home", "carol").await;

    // Several matches: shortlist, nothing queued.
    let outcome = fx.controller.enqueue_by_lookup("drive").await.unwrap();
    match outcome {
        EnqueueOutcome::Candidates(candidates) => {
            assert!(candidates.len() == 3);
            assert!(!fx
                .engine
                .received()
                .await
                .iter()
                .any(|c| c.starts_with("requests.push")));
        }
        other => panic!("expected candidates, got {:?}", other),
    }

    // Unique match: queued (empty engine queue by default).
    let outcome = fx.controller.enqueue_by_lookup("midnight").await.unwrap();
    assert!(matches!(outcome, EnqueueOutcome::Queued(ref s) if s.media_id == A));
}

#[tokio::test]
async fn remove_deletes_row_and_file() {
    let fx = fixture().await;
    fx.add_song(A, "Song A", "alice").await;
    assert!(fx.path_of(A).exists());

    fx.controller.remove(A).await.unwrap();
    assert!(!fx.path_of(A).exists());
    assert!(fx.catalog.find_by_media_id(A).await.is_err());

    let err = fx.controller.remove(A).await.unwrap_err();
    assert!(matches!(err, StationError::NotFound(_)));
}

#[tokio::test]
async fn skip_issues_engine_command() {
    let fx = fixture().await;
    fx.controller.skip().await.unwrap();
    assert!(fx.engine.received().await.contains(&"radio.skip".to_string()));
}

#[tokio::test]
async fn listeners_degrade_to_zero_when_status_is_down() {
    let fx = fixture().await;
    assert_eq!(fx.controller.listeners().await, 0);
}

#[tokio::test]
async fn engine_probe_reports_liveness() {
    let fx = fixture().await;
    assert!(fx.controller.engine_reachable().await);
}
