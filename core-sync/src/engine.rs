//! # Sync Decision Engine
//!
//! Decides, per tag of every eligible pair, whether to push Source A to
//! Source B, push Source B back to Source A, leave the tag alone or report a
//! conflict, and applies the non-conflicting decisions.
//!
//! ## Overview
//!
//! A pair is eligible when its Source-A file is a library member and it has a
//! mapping. For each eligible pair the engine:
//!
//! 1. Reads the candidate tags from both files and transforms the Source-A
//!    reading with [`TagTransformer`].
//! 2. Compares every transformed Source-A tag with the Source-B value.
//!    One-way tags that differ are always pushed from A to B. Bidirectional
//!    tags that differ are conflicts on the first sync of a pair; afterwards
//!    the configured [`ChangeDetector`] picks the direction.
//! 3. On [`run_sync`](SyncEngine::run_sync), writes each conflict-free pair
//!    with one codec call per target file and records the pre-write values
//!    of the bidirectional tags as the new baseline.
//!
//! Conflicted pairs are never written and keep their baseline, so the same
//! conflict shows up again until it is resolved on disk.
//!
//! A bidirectional tag whose values differ although the detector sees no
//! change on either side is also a conflict. The baseline holds pre-write
//! values, so a pushed value that was later reverted on the target looks
//! exactly like the state before the push; there is no safe direction.
//!
//! ## Failure handling
//!
//! A pair whose files cannot be read is skipped and logged. A failed write
//! leaves the pair's baseline untouched and is counted in
//! [`RunReport::failed`]. Store errors abort the operation.

use crate::detection::{detector_for, ChangeDetector, ChangeInput, LedgerDetector};
use crate::error::{Result, SyncError};
use crate::types::{
    ConflictReport, PendingUpdate, PreviewEntry, ReconcileReport, RunReport, SyncDirection,
    TagConflict,
};
use bridge_traits::storage::FileSystemAccess;
use bridge_traits::tags::{get_ignore_case, values_equal, TagCodec, TagMap, TagValue};
use bridge_traits::time::Clock;
use core_library::models::{FileMapping, SyncStateTag};
use core_library::repositories::{
    FileMappingRepository, SourceFileStateRepository, SqliteFileMappingRepository,
    SqliteSourceFileStateRepository, SqliteSyncStateTagRepository, SyncStateTagRepository,
};
use core_metadata::transformer::TagTransformer;
use core_runtime::config::AppConfig;
use core_runtime::logging::strip_path;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Decision for one pair together with everything needed to apply it
struct PairPlan {
    mapping: FileMapping,
    entry: PreviewEntry,
    a_values: TagMap,
    b_values: TagMap,
}

pub struct SyncEngine {
    transformer: TagTransformer,
    detector: Box<dyn ChangeDetector>,
    codec: Arc<dyn TagCodec>,
    file_system: Arc<dyn FileSystemAccess>,
    clock: Arc<dyn Clock>,
    states: Arc<dyn SourceFileStateRepository>,
    mappings: Arc<dyn FileMappingRepository>,
    ledger: Arc<dyn SyncStateTagRepository>,
}

impl SyncEngine {
    pub fn new(
        config: &AppConfig,
        pool: SqlitePool,
        codec: Arc<dyn TagCodec>,
        file_system: Arc<dyn FileSystemAccess>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transformer: TagTransformer::from_config(config),
            detector: detector_for(config.change_detection),
            codec,
            file_system,
            clock,
            states: Arc::new(SqliteSourceFileStateRepository::new(pool.clone())),
            mappings: Arc::new(SqliteFileMappingRepository::new(pool.clone())),
            ledger: Arc::new(SqliteSyncStateTagRepository::new(pool)),
        }
    }

    // =========================================================================
    // Preview
    // =========================================================================

    /// Compute pending updates and conflicts for every eligible pair
    ///
    /// Pairs without updates or conflicts are left out.
    #[instrument(skip(self))]
    pub async fn preview_sync(&self) -> Result<Vec<PreviewEntry>> {
        let entries: Vec<PreviewEntry> = self
            .plan_all()
            .await?
            .into_iter()
            .map(|plan| plan.entry)
            .filter(|entry| !entry.is_empty())
            .collect();

        info!(entries = entries.len(), "Computed sync preview");
        Ok(entries)
    }

    async fn plan_all(&self) -> Result<Vec<PairPlan>> {
        let members: HashSet<String> = self
            .states
            .list_in_library()
            .await?
            .into_iter()
            .map(|state| state.path)
            .collect();

        let mut plans = Vec::new();
        for mapping in self.mappings.list_all().await? {
            if !members.contains(&mapping.source_a_path) {
                continue;
            }
            if let Some(plan) = self.plan_pair(mapping).await? {
                plans.push(plan);
            }
        }
        Ok(plans)
    }

    /// Decide every tag of one pair; `None` when a side cannot be read
    async fn plan_pair(&self, mapping: FileMapping) -> Result<Option<PairPlan>> {
        let source = Path::new(&mapping.source_a_path);
        let dest = Path::new(&mapping.source_b_path);
        let candidates = self.transformer.candidate_tags();

        let (a_raw, b_values) = match (
            self.codec.read_fields(source, &candidates).await,
            self.codec.read_fields(dest, &candidates).await,
        ) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(e), _) | (_, Err(e)) => {
                warn!(
                    file = %strip_path(&mapping.source_a_path),
                    error = %e,
                    "Cannot read pair, skipping"
                );
                return Ok(None);
            }
        };
        let a_values = self.transformer.transform(a_raw);

        let mtime_a = self.mtime_or_epoch(source).await;
        let mtime_b = self.mtime_or_epoch(dest).await;
        let last_sync = mapping.last_sync_timestamp.unwrap_or(0);
        let first_sync = mapping.is_first_sync();
        let baseline = self.ledger.find_for_mapping(mapping.id).await?;

        let mut entry = PreviewEntry::new(&mapping.source_a_path, &mapping.source_b_path);

        for (tag, to) in &a_values {
            let from = get_ignore_case(&b_values, tag);
            if values_equal(tag, Some(to), from) {
                continue;
            }

            if !self.transformer.is_bidirectional(tag) {
                entry.pending_updates.push(a_to_b(tag, to, from));
                continue;
            }

            if first_sync {
                entry.conflicts.push(conflict(tag, Some(to), from));
                continue;
            }

            let changes = self.detector.detect(&ChangeInput {
                tag,
                a: Some(to),
                b: from,
                baseline: baseline
                    .iter()
                    .find(|row| row.tag_name.eq_ignore_ascii_case(tag)),
                mtime_a,
                mtime_b,
                last_sync,
            });

            match (changes.a_changed, changes.b_changed) {
                (true, true) => entry.conflicts.push(conflict(tag, Some(to), from)),
                (true, false) => entry.pending_updates.push(a_to_b(tag, to, from)),
                (false, true) => entry.pending_updates.push(PendingUpdate {
                    tag: tag.clone(),
                    from: Some(to.clone()),
                    to: from.cloned(),
                    direction: SyncDirection::BToA,
                }),
                (false, false) => entry.conflicts.push(conflict(tag, Some(to), from)),
            }
        }

        debug!(
            file = %strip_path(&mapping.source_a_path),
            updates = entry.pending_updates.len(),
            conflicts = entry.conflicts.len(),
            first_sync,
            "Planned pair"
        );

        Ok(Some(PairPlan {
            mapping,
            entry,
            a_values,
            b_values,
        }))
    }

    async fn mtime_or_epoch(&self, path: &Path) -> i64 {
        match self.file_system.modified_at(path).await {
            Ok(Some(mtime)) => mtime,
            Ok(None) => 0,
            Err(e) => {
                debug!(file = %path.display(), error = %e, "No modification time");
                0
            }
        }
    }

    // =========================================================================
    // Run
    // =========================================================================

    /// Recompute the preview and apply every conflict-free pair
    ///
    /// Clean pairs, including pairs already in agreement, get a new baseline
    /// and last sync time. Conflicted and failed pairs keep theirs.
    #[instrument(skip(self))]
    pub async fn run_sync(&self) -> Result<RunReport> {
        let mut report = RunReport::default();

        for plan in self.plan_all().await? {
            if plan.entry.has_conflicts() {
                report
                    .conflicts
                    .extend(plan.entry.conflicts.iter().map(|c| ConflictReport {
                        source: plan.entry.source_path.clone(),
                        tag: c.tag.clone(),
                        a: c.a.clone(),
                        b: c.b.clone(),
                    }));
                continue;
            }

            if !plan.entry.pending_updates.is_empty() {
                if let Err(e) = self.apply(&plan.entry).await {
                    warn!(
                        file = %strip_path(&plan.entry.source_path),
                        error = %e,
                        "Write failed, pair not applied"
                    );
                    report.failed += 1;
                    continue;
                }
                report.applied += 1;
            }

            let rows = self.baseline_rows(&plan.mapping, &plan.a_values, &plan.b_values);
            let committed = self
                .ledger
                .commit_baseline(
                    plan.mapping.id,
                    &plan.mapping.source_b_path,
                    &rows,
                    self.clock.unix_timestamp_millis(),
                )
                .await?;
            if !committed {
                warn!(
                    file = %strip_path(&plan.entry.source_path),
                    "Pairing changed during the run, baseline not recorded"
                );
            }
        }

        info!(
            applied = report.applied,
            conflicts = report.conflicts.len(),
            failed = report.failed,
            "Sync run finished"
        );
        Ok(report)
    }

    /// Write an entry's updates, one codec call per target file
    async fn apply(&self, entry: &PreviewEntry) -> bridge_traits::error::Result<()> {
        let mut dest_values = TagMap::new();
        let mut source_values = TagMap::new();

        for update in &entry.pending_updates {
            let Some(value) = &update.to else {
                debug!(tag = %update.tag, "Tag removal is not propagated");
                continue;
            };
            let target = match update.direction {
                SyncDirection::AToB => &mut dest_values,
                SyncDirection::BToA => &mut source_values,
            };
            target.insert(update.tag.clone(), value.clone());
        }

        if !dest_values.is_empty() {
            self.codec
                .write_fields(Path::new(&entry.dest_path), &dest_values)
                .await?;
        }
        if !source_values.is_empty() {
            self.codec
                .write_fields(Path::new(&entry.source_path), &source_values)
                .await?;
        }
        Ok(())
    }

    /// Ledger rows for every configured bidirectional tag of a pair
    fn baseline_rows(&self, mapping: &FileMapping, a: &TagMap, b: &TagMap) -> Vec<SyncStateTag> {
        let now = self.clock.unix_timestamp_millis();
        self.transformer
            .bidirectional_tags()
            .iter()
            .map(|tag| {
                SyncStateTag::new(
                    mapping.id,
                    tag.clone(),
                    get_ignore_case(a, tag).map(TagValue::to_ledger_string),
                    get_ignore_case(b, tag).map(TagValue::to_ledger_string),
                    now,
                )
            })
            .collect()
    }

    // =========================================================================
    // Single pair reconciliation
    // =========================================================================

    /// Reconcile the bidirectional tags of one pair against the ledger
    ///
    /// Values are compared as read, without transformation. The baseline is
    /// replaced by the pre-write values and the last sync time advanced even
    /// when conflicts are reported.
    ///
    /// # Errors
    ///
    /// Returns `MappingNotFound` when `source_a_path` has no mapping, and a
    /// bridge error when either file cannot be read or written. Nothing is
    /// recorded after a failed write.
    #[instrument(skip(self, source_a_path), fields(file = %strip_path(source_a_path)))]
    pub async fn reconcile_bidirectional(&self, source_a_path: &str) -> Result<ReconcileReport> {
        let mapping = self
            .mappings
            .find_by_source_a(source_a_path)
            .await?
            .ok_or_else(|| SyncError::MappingNotFound {
                source_a_path: source_a_path.to_string(),
            })?;

        let source = Path::new(&mapping.source_a_path);
        let dest = Path::new(&mapping.source_b_path);
        let tags = self.transformer.bidirectional_tags().to_vec();

        let a_values = self.codec.read_fields(source, &tags).await?;
        let b_values = self.codec.read_fields(dest, &tags).await?;
        let baseline = self.ledger.find_for_mapping(mapping.id).await?;

        let mut report = ReconcileReport::default();
        let mut dest_values = TagMap::new();
        let mut source_values = TagMap::new();

        for tag in &tags {
            let a = get_ignore_case(&a_values, tag);
            let b = get_ignore_case(&b_values, tag);
            if values_equal(tag, a, b) {
                continue;
            }

            let changes = LedgerDetector.detect(&ChangeInput {
                tag,
                a,
                b,
                baseline: baseline
                    .iter()
                    .find(|row| row.tag_name.eq_ignore_ascii_case(tag)),
                mtime_a: 0,
                mtime_b: 0,
                last_sync: 0,
            });

            match (changes.a_changed, changes.b_changed, a, b) {
                (true, true, _, _) => report.conflicts.push(conflict(tag, a, b)),
                (true, false, Some(value), _) => {
                    dest_values.insert(tag.clone(), value.clone());
                    report.updated_a_to_b.push(tag.clone());
                }
                (false, true, _, Some(value)) => {
                    source_values.insert(tag.clone(), value.clone());
                    report.updated_b_to_a.push(tag.clone());
                }
                (false, false, _, _) => report.conflicts.push(conflict(tag, a, b)),
                _ => {}
            }
        }

        if !dest_values.is_empty() {
            self.codec.write_fields(dest, &dest_values).await?;
        }
        if !source_values.is_empty() {
            self.codec.write_fields(source, &source_values).await?;
        }

        let rows = self.baseline_rows(&mapping, &a_values, &b_values);
        let committed = self
            .ledger
            .commit_baseline(
                mapping.id,
                &mapping.source_b_path,
                &rows,
                self.clock.unix_timestamp_millis(),
            )
            .await?;
        if !committed {
            warn!("Pairing changed during reconciliation, baseline not recorded");
        }

        info!(
            a_to_b = report.updated_a_to_b.len(),
            b_to_a = report.updated_b_to_a.len(),
            conflicts = report.conflicts.len(),
            "Reconciled pair"
        );
        Ok(report)
    }
}

fn a_to_b(tag: &str, to: &TagValue, from: Option<&TagValue>) -> PendingUpdate {
    PendingUpdate {
        tag: tag.to_string(),
        from: from.cloned(),
        to: Some(to.clone()),
        direction: SyncDirection::AToB,
    }
}

fn conflict(tag: &str, a: Option<&TagValue>, b: Option<&TagValue>) -> TagConflict {
    TagConflict {
        tag: tag.to_string(),
        a: a.cloned(),
        b: b.cloned(),
    }
}
