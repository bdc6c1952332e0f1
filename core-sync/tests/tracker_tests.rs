//! Library scans, membership and pruning

mod common;

use bridge_traits::tags::{TagCodec, TagMap, TagValue};
use bridge_traits::time::ManualClock;
use common::{test_config, Harness, MemoryLibrary};
use core_library::db::create_test_pool;
use core_runtime::config::ChangeDetection;
use core_sync::{FileStateTracker, SyncError};
use mockall::mock;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mock! {
    pub Codec {}

    #[async_trait::async_trait]
    impl TagCodec for Codec {
        async fn read_fields(&self, path: &Path, fields: &[String]) -> bridge_traits::error::Result<TagMap>;
        async fn write_fields(&self, path: &Path, values: &TagMap) -> bridge_traits::error::Result<()>;
    }
}

const MEMBER_TAG: &str = "TXXX:DJBIBLIOTHEK";

async fn scanned_harness() -> Harness {
    let h = Harness::new(ChangeDetection::Ledger).await;
    h.library.add("/a/1.mp3", 100, &[(MEMBER_TAG, "ja")]);
    h.library.add("/a/sub/2.MP3", 100, &[(MEMBER_TAG, "NEIN")]);
    h.library.add("/a/3.mp3", 100, &[("TIT2", "No flag")]);
    h.library.add("/a/4.mp3", 100, &[(MEMBER_TAG, "")]);
    h.library.add("/a/notes.txt", 100, &[]);
    h.library.add("/b/1.mp3", 100, &[(MEMBER_TAG, "ja")]);
    h
}

fn member_paths(members: &[core_sync::LibraryMember]) -> Vec<&str> {
    members.iter().map(|m| m.path.as_str()).collect()
}

#[tokio::test]
async fn test_scan_flags_members() {
    let h = scanned_harness().await;

    let summary = h.tracker.scan_and_update().await.unwrap();
    assert_eq!(summary.total, 4);
    assert_eq!(summary.updated, 4);
    assert!(!summary.cancelled);

    let members = h.tracker.list_in_library().await.unwrap();
    assert_eq!(member_paths(&members), vec!["/a/1.mp3"]);
    assert_eq!(members[0].last_modified_at, Some(100));
}

#[tokio::test]
async fn test_rescan_of_unchanged_tree_reads_nothing() {
    let h = scanned_harness().await;
    h.tracker.scan_and_update().await.unwrap();
    let reads = h.library.read_count();

    let summary = h.tracker.scan_and_update().await.unwrap();
    assert_eq!(summary.updated, 0);
    assert_eq!(h.library.read_count(), reads);

    // Touching one file re-reads only that file
    h.library.edit("/a/3.mp3", 200, MEMBER_TAG, "ja");
    let summary = h.tracker.scan_and_update().await.unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(h.library.read_count(), reads + 1);

    let members = h.tracker.list_in_library().await.unwrap();
    assert_eq!(member_paths(&members), vec!["/a/1.mp3", "/a/3.mp3"]);
}

#[tokio::test]
async fn test_scan_reads_each_file_once_across_scans() {
    let library = MemoryLibrary::new();
    library.add("/a/1.mp3", 100, &[]);

    let mut codec = MockCodec::new();
    codec
        .expect_read_fields()
        .withf(|path, fields| path == Path::new("/a/1.mp3") && fields.len() == 1)
        .times(1)
        .returning(|_, fields| {
            let mut tags = TagMap::new();
            tags.insert(fields[0].clone(), TagValue::text("ja"));
            Ok(tags)
        });
    codec.expect_write_fields().never();

    let tracker = FileStateTracker::new(
        &test_config(ChangeDetection::Ledger),
        create_test_pool().await.unwrap(),
        library.clone(),
        Arc::new(codec),
        Arc::new(ManualClock::new(0)),
    );

    assert_eq!(tracker.scan_and_update().await.unwrap().updated, 1);
    assert_eq!(tracker.scan_and_update().await.unwrap().updated, 0);
    assert_eq!(tracker.list_in_library().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unreadable_file_is_skipped_and_retried() {
    let h = scanned_harness().await;
    h.library.set_unreadable("/a/1.mp3");

    let summary = h.tracker.scan_and_update().await.unwrap();
    assert_eq!(summary.total, 4);
    assert_eq!(summary.updated, 3);
    assert!(h.tracker.list_in_library().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_scan_stops_before_next_file() {
    let h = scanned_harness().await;
    let token = CancellationToken::new();
    token.cancel();

    let summary = h.tracker.scan_and_update_with_cancel(&token).await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.updated, 0);
    assert_eq!(h.library.read_count(), 0);
}

#[tokio::test]
async fn test_missing_root_is_precondition_error() {
    let h = Harness::with_config(test_config(ChangeDetection::Ledger).with_source_a("/nowhere"))
        .await;
    let err = h.tracker.scan_and_update().await.unwrap_err();
    assert!(matches!(err, SyncError::Precondition(_)));

    let mut config = test_config(ChangeDetection::Ledger);
    config.source_a_path = None;
    let h = Harness::with_config(config).await;
    let err = h.tracker.scan_and_update().await.unwrap_err();
    assert!(matches!(err, SyncError::Precondition(_)));
}

#[tokio::test]
async fn test_prune_removes_only_missing_files() {
    let h = scanned_harness().await;
    h.tracker.scan_and_update().await.unwrap();

    // Stale rows survive a scan until pruned
    h.library.remove("/a/1.mp3");
    h.tracker.scan_and_update().await.unwrap();
    assert_eq!(h.tracker.list_in_library().await.unwrap().len(), 1);

    assert_eq!(h.tracker.prune_missing().await.unwrap(), 1);
    assert!(h.tracker.list_in_library().await.unwrap().is_empty());
    assert_eq!(h.tracker.prune_missing().await.unwrap(), 0);
}

#[tokio::test]
async fn test_custom_membership_rule() {
    let config = test_config(ChangeDetection::Ledger)
        .with_membership_tag("TXXX:Library")
        .with_membership_excluded_value("no");
    let h = Harness::with_config(config).await;
    h.library.add("/a/1.mp3", 1, &[("TXXX:library", "No")]);
    h.library.add("/a/2.mp3", 1, &[("TXXX:library", "nein")]);

    h.tracker.scan_and_update().await.unwrap();
    let members = h.tracker.list_in_library().await.unwrap();
    assert_eq!(member_paths(&members), vec!["/a/2.mp3"]);
}
