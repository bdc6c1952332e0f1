//! Mapping persistence and repointing

mod common;

use common::Harness;
use core_runtime::config::ChangeDetection;
use core_sync::{MappingEntry, SyncError};

const A: &str = "/a/01_Artist_Song.mp3";
const B: &str = "/b/Artist_01_Song.mp3";

async fn ledger_rows(h: &Harness) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM sync_state_tags")
        .fetch_one(&h.pool)
        .await
        .unwrap()
}

async fn synced_pair() -> Harness {
    let h = Harness::new(ChangeDetection::Ledger).await;
    h.library.add(A, 1, &[("TKEY", "8A")]);
    h.library.add(B, 1, &[("TKEY", "8A"), ("COMM", "[ typI ]")]);
    h.library.add("/b/other.mp3", 1, &[("TKEY", "5B")]);
    h.pair(A, B).await;
    h.engine.run_sync().await.unwrap();
    assert!(ledger_rows(&h).await > 0);
    h
}

#[tokio::test]
async fn test_upsert_is_idempotent() {
    let h = synced_pair().await;
    let rows = ledger_rows(&h).await;

    let count = h
        .registry
        .upsert_mappings(&[MappingEntry::new(A, B)])
        .await
        .unwrap();
    assert_eq!(count, 1);

    let mappings = h.registry.get_mappings().await.unwrap();
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].last_sync_timestamp, Some(1_000));
    assert_eq!(ledger_rows(&h).await, rows);
}

#[tokio::test]
async fn test_repoint_discards_baseline() {
    let h = synced_pair().await;

    h.registry
        .upsert_mappings(&[MappingEntry::new(A, "/b/other.mp3")])
        .await
        .unwrap();

    let mappings = h.registry.get_mappings().await.unwrap();
    assert_eq!(mappings[0].source_b_path, "/b/other.mp3");
    assert_eq!(mappings[0].last_sync_timestamp, None);
    assert_eq!(ledger_rows(&h).await, 0);

    // Back to first-sync rules against the new counterpart
    let preview = h.engine.preview_sync().await.unwrap();
    assert_eq!(preview.len(), 1);
    assert_eq!(preview[0].dest_path, "/b/other.mp3");
    assert_eq!(preview[0].conflicts.len(), 1);
}

#[tokio::test]
async fn test_invalid_entry_rejects_whole_batch() {
    let h = Harness::new(ChangeDetection::Ledger).await;

    let err = h
        .registry
        .upsert_mappings(&[
            MappingEntry::new("/a/1.mp3", "/b/1.mp3"),
            MappingEntry::new("/a/2.mp3", ""),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Precondition(_)));
    assert!(h.registry.get_mappings().await.unwrap().is_empty());

    let err = h
        .registry
        .upsert_mappings(&[MappingEntry::new("/x.mp3", "/x.mp3")])
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Precondition(_)));
}

#[tokio::test]
async fn test_remove_mapping_drops_ledger() {
    let h = synced_pair().await;

    assert!(h.registry.remove_mapping(A).await.unwrap());
    assert!(!h.registry.remove_mapping(A).await.unwrap());
    assert!(h.registry.get_mappings().await.unwrap().is_empty());
    assert_eq!(ledger_rows(&h).await, 0);
}

#[tokio::test]
async fn test_mappings_are_listed_by_source_path() {
    let h = Harness::new(ChangeDetection::Ledger).await;
    h.registry
        .upsert_mappings(&[
            MappingEntry::new("/a/2.mp3", "/b/2.mp3"),
            MappingEntry::new("/a/1.mp3", "/b/1.mp3"),
        ])
        .await
        .unwrap();

    let paths: Vec<_> = h
        .registry
        .get_mappings()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.source_a_path)
        .collect();
    assert_eq!(paths, vec!["/a/1.mp3", "/a/2.mp3"]);
}
