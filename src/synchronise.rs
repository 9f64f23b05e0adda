//! High-level pipeline: orchestrates query → assemble → persist → commit → acknowledge.
//!
//! [`Synchroniser::run_once`] performs one publish cycle against the injected
//! collaborators:
//!   - Queries the source store for entries that are ready to publish
//!   - Fetches each entry's blocks and assembles its Markdown document
//!   - Writes each document to the output directory
//!   - Stages and commits each written file (one commit per entry), then pushes once
//!   - Marks each committed entry as published in the source store
//!
//! # Failure isolation
//! Entries move through each stage together, but failures are tracked per
//! entry: a failed entry is recorded on the [`SyncReport`] and drops out of the
//! remaining stages while the rest of the batch continues. Only a failed
//! initial query aborts the cycle.
//!
//! # Re-runs
//! The cycle holds no state of its own. An entry whose commit or acknowledge
//! failed is still `ReadyToPublish` in the store and is picked up again by the
//! next cycle. When the re-rendered file is identical to what is already
//! committed, the commit is skipped and the entry goes straight to acknowledge.
//!
//! # Navigation
//! - Main entrypoint: [`Synchroniser::run_once`]
//! - Drift detection: [`Synchroniser::reconcile`]

use std::collections::BTreeSet;
use std::path::PathBuf;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::assemble::{assemble, RenderedDocument};
use crate::contract::{BoxError, DocumentStore, Entry, SourceStore, Status, VersionControl};
use crate::error::SyncError;

/// Outcome of one publish cycle, in the order the source returned the entries.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub entries: Vec<EntryReport>,
    pub push: PushOutcome,
}

impl SyncReport {
    fn empty() -> Self {
        Self {
            entries: Vec::new(),
            push: PushOutcome::NotNeeded,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries.iter().filter(|e| e.outcome.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries.iter().filter(|e| !e.outcome.is_success())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryReport {
    pub entry_id: String,
    /// `None` when the entry has no slug to name a file after.
    pub file_name: Option<String>,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Written, committed (or already identical in the repository) and acknowledged.
    /// `committed` is false when the commit was skipped as a no-op.
    Success { committed: bool },
    Failed(SyncError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    /// No commit ran this cycle.
    NotNeeded,
    Pushed,
    Failed(SyncError),
}

/// Divergence between the files on disk and the entries marked published.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriftReport {
    /// Files on disk whose entry is not `Published` in the source store.
    pub unacknowledged: Vec<String>,
    /// `Published` entries with no file on disk.
    pub missing_files: Vec<String>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.unacknowledged.is_empty() && self.missing_files.is_empty()
    }
}

/// An entry that has survived every stage so far.
struct Candidate<'a> {
    index: usize,
    entry: &'a Entry,
    document: RenderedDocument,
    path: Option<PathBuf>,
    committed: bool,
}

/// Drives publish cycles against a source store, a repository and an output directory.
pub struct Synchroniser<S, V, D> {
    source: S,
    vcs: V,
    documents: D,
    cycle: Mutex<()>,
}

impl<S, V, D> Synchroniser<S, V, D>
where
    S: SourceStore,
    V: VersionControl,
    D: DocumentStore,
{
    pub fn new(source: S, vcs: V, documents: D) -> Self {
        Self {
            source,
            vcs,
            documents,
            cycle: Mutex::new(()),
        }
    }

    /// Run one complete cycle. Concurrent callers are serialised.
    pub async fn run_once(&self) -> Result<SyncReport, SyncError> {
        let _cycle = self.cycle.lock().await;
        info!("[SYNC] Starting publish cycle");

        let entries = self
            .source
            .query(Status::ReadyToPublish)
            .await
            .map_err(|e| {
                error!(error = ?e, "[SYNC][ERROR] Querying ready entries failed, aborting cycle");
                SyncError::SourceQueryFailed(e.to_string())
            })?;

        if entries.is_empty() {
            info!("[SYNC] No entries ready to publish");
            return Ok(SyncReport::empty());
        }
        info!(count = entries.len(), "[SYNC] Entries ready to publish");

        let mut settled: Vec<(usize, Outcome)> = Vec::with_capacity(entries.len());

        let candidates = self.assemble_all(&entries, &mut settled).await;
        let candidates = self.persist_all(candidates, &mut settled).await;
        let candidates = self.commit_all(candidates, &mut settled).await;

        let push = if candidates.iter().any(|c| c.committed) {
            self.push().await
        } else {
            debug!("[SYNC] Nothing committed, skipping push");
            PushOutcome::NotNeeded
        };

        self.acknowledge_all(candidates, &mut settled).await;

        settled.sort_by_key(|(index, _)| *index);
        let reports: Vec<EntryReport> = settled
            .into_iter()
            .map(|(index, outcome)| EntryReport {
                entry_id: entries[index].id.clone(),
                file_name: entries[index].file_name(),
                outcome,
            })
            .collect();

        let report = SyncReport {
            entries: reports,
            push,
        };
        info!(
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            "[SYNC] Publish cycle complete"
        );
        Ok(report)
    }

    async fn assemble_all<'a>(
        &self,
        entries: &'a [Entry],
        settled: &mut Vec<(usize, Outcome)>,
    ) -> Vec<Candidate<'a>> {
        let mut candidates = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let blocks = match self.source.fetch_blocks(&entry.id).await {
                Ok(blocks) => blocks,
                Err(e) => {
                    fail(
                        settled,
                        index,
                        SyncError::FetchBlocksFailed {
                            entry_id: entry.id.clone(),
                            reason: e.to_string(),
                        },
                    );
                    continue;
                }
            };

            match assemble(entry, &blocks) {
                Ok(document) => {
                    debug!(entry_id = %entry.id, file = %document.file_name, blocks = blocks.len(), "[SYNC] Assembled document");
                    candidates.push(Candidate {
                        index,
                        entry,
                        document,
                        path: None,
                        committed: false,
                    });
                }
                Err(e) => fail(settled, index, e),
            }
        }
        candidates
    }

    async fn persist_all<'a>(
        &self,
        candidates: Vec<Candidate<'a>>,
        settled: &mut Vec<(usize, Outcome)>,
    ) -> Vec<Candidate<'a>> {
        let mut persisted = Vec::with_capacity(candidates.len());
        for mut candidate in candidates {
            let doc = &candidate.document;
            match self.documents.write(&doc.file_name, &doc.content).await {
                Ok(path) => {
                    info!(entry_id = %candidate.entry.id, path = %path.display(), "[SYNC] Wrote document");
                    candidate.path = Some(path);
                    persisted.push(candidate);
                }
                Err(e) => fail(
                    settled,
                    candidate.index,
                    SyncError::PersistFailed {
                        entry_id: candidate.entry.id.clone(),
                        reason: e.to_string(),
                    },
                ),
            }
        }
        persisted
    }

    async fn commit_all<'a>(
        &self,
        candidates: Vec<Candidate<'a>>,
        settled: &mut Vec<(usize, Outcome)>,
    ) -> Vec<Candidate<'a>> {
        let mut committed = Vec::with_capacity(candidates.len());
        for mut candidate in candidates {
            match self.commit_one(&candidate).await {
                Ok(did_commit) => {
                    candidate.committed = did_commit;
                    committed.push(candidate);
                }
                Err(e) => fail(
                    settled,
                    candidate.index,
                    SyncError::CommitFailed {
                        entry_id: candidate.entry.id.clone(),
                        reason: e.to_string(),
                    },
                ),
            }
        }
        committed
    }

    /// Stage and commit one file. Returns whether a commit was created.
    async fn commit_one(&self, candidate: &Candidate<'_>) -> Result<bool, BoxError> {
        let path = candidate
            .path
            .as_deref()
            .ok_or("document has no written path")?;
        let file_name = &candidate.document.file_name;

        self.vcs.stage(path).await?;
        if !self.vcs.has_staged_changes(path).await? {
            info!(entry_id = %candidate.entry.id, file = %file_name, "[SYNC] Document unchanged in repository, skipping commit");
            return Ok(false);
        }
        self.vcs.commit(path, &format!("Posted {file_name}")).await?;
        info!(entry_id = %candidate.entry.id, file = %file_name, "[SYNC] Committed document");
        Ok(true)
    }

    async fn push(&self) -> PushOutcome {
        match self.vcs.push().await {
            Ok(()) => {
                info!("[SYNC] Pushed commits");
                PushOutcome::Pushed
            }
            Err(e) => {
                let err = SyncError::PushFailed(e.to_string());
                error!(error = %err, "[SYNC][ERROR] Push failed, commits remain local until the next cycle");
                PushOutcome::Failed(err)
            }
        }
    }

    async fn acknowledge_all(
        &self,
        candidates: Vec<Candidate<'_>>,
        settled: &mut Vec<(usize, Outcome)>,
    ) {
        for candidate in candidates {
            match self
                .source
                .set_status(&candidate.entry.id, Status::Published)
                .await
            {
                Ok(()) => {
                    info!(entry_id = %candidate.entry.id, file = %candidate.document.file_name, "[SYNC] Marked entry as published");
                    settled.push((
                        candidate.index,
                        Outcome::Success {
                            committed: candidate.committed,
                        },
                    ));
                }
                Err(e) => {
                    if candidate.committed {
                        warn!(entry_id = %candidate.entry.id, "[SYNC] Entry stays ready to publish after a successful commit");
                    }
                    fail(
                        settled,
                        candidate.index,
                        SyncError::AcknowledgeFailed {
                            entry_id: candidate.entry.id.clone(),
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }
    }

    /// Compare the Markdown files on disk against the entries marked published.
    pub async fn reconcile(&self) -> Result<DriftReport, SyncError> {
        let _cycle = self.cycle.lock().await;

        let published = self.source.query(Status::Published).await.map_err(|e| {
            error!(error = ?e, "[RECONCILE][ERROR] Querying published entries failed");
            SyncError::SourceQueryFailed(e.to_string())
        })?;
        let on_disk: BTreeSet<String> = self
            .documents
            .list()
            .await
            .map_err(|e| {
                error!(error = ?e, "[RECONCILE][ERROR] Listing documents failed");
                SyncError::ListDocumentsFailed(e.to_string())
            })?
            .into_iter()
            .collect();
        let expected: BTreeSet<String> = published.iter().filter_map(Entry::file_name).collect();

        let report = DriftReport {
            unacknowledged: on_disk.difference(&expected).cloned().collect(),
            missing_files: expected.difference(&on_disk).cloned().collect(),
        };
        if report.is_clean() {
            info!(documents = on_disk.len(), "[RECONCILE] Output directory matches published entries");
        } else {
            warn!(
                unacknowledged = ?report.unacknowledged,
                missing_files = ?report.missing_files,
                "[RECONCILE] Output directory and source store have drifted"
            );
        }
        Ok(report)
    }
}

fn fail(settled: &mut Vec<(usize, Outcome)>, index: usize, err: SyncError) {
    error!(entry_id = err.entry_id().unwrap_or_default(), error = %err, "[SYNC][ERROR] Entry failed");
    settled.push((index, Outcome::Failed(err)));
}
