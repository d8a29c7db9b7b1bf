/// The ingestion pipeline.
///
/// Processes configured repositories sequentially: ensure a local checkout,
/// discover source files, embed each one, and collect the successes. The
/// snapshot is written once at the end of the full pass, and only when at
/// least one file was embedded — a failing or empty run leaves any prior
/// snapshot untouched.
use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::embedder::Embedder;
use crate::ingest::{files, repos};
use crate::store::{EmbeddingRecord, VectorStore};

/// Counters for one full ingestion pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Files successfully embedded and included in the snapshot.
    pub embedded: usize,
    /// Files whose embedding failed (logged and excluded).
    pub failed: usize,
    /// Repositories that could not be cloned (run continued without them).
    pub repos_failed: usize,
    /// Whether a snapshot was written.
    pub saved: bool,
}

/// Ingestion pipeline over a shared embedder instance.
pub struct Ingestor<'a, E: Embedder + ?Sized> {
    embedder: &'a E,
    config: &'a Config,
}

impl<'a, E: Embedder + ?Sized> Ingestor<'a, E> {
    pub fn new(embedder: &'a E, config: &'a Config) -> Self {
        Self { embedder, config }
    }

    /// Run a full ingestion pass over all configured repositories.
    ///
    /// Per-repository and per-file failures are isolated: they are counted
    /// and logged but never abort the run or corrupt the pending record set.
    pub fn run(&self, github_token: &str) -> Result<IngestReport> {
        let repos_dir = Path::new(&self.config.repos_dir);
        let mut report = IngestReport::default();
        let mut pending: Vec<EmbeddingRecord> = Vec::new();

        for repo in &self.config.repositories {
            let local_path = match repos::ensure_local_copy(repo, repos_dir, github_token) {
                Ok(p) => p,
                Err(e) => {
                    warn!("Skipping repository {repo}: {e}");
                    report.repos_failed += 1;
                    continue;
                }
            };

            let source_files = match files::collect_source_files(&local_path) {
                Ok(f) => f,
                Err(e) => {
                    warn!("Skipping repository {repo}: {e}");
                    report.repos_failed += 1;
                    continue;
                }
            };
            info!("{repo}: {} candidate files", source_files.len());

            for file in source_files {
                match self.embedder.embed(&file.content) {
                    Ok(embedding) => {
                        pending.push(EmbeddingRecord {
                            repository: repo.clone(),
                            file_path: file.rel_path,
                            content: file.content,
                            embedding,
                        });
                        report.embedded += 1;
                    }
                    Err(e) => {
                        warn!("Failed to embed {}: {e}", file.rel_path);
                        report.failed += 1;
                    }
                }
            }
        }

        if pending.is_empty() {
            warn!("No embeddings generated; keeping existing snapshot");
            return Ok(report);
        }

        VectorStore::save(&pending, Path::new(&self.config.snapshot_path))?;
        report.saved = true;

        Ok(report)
    }
}
