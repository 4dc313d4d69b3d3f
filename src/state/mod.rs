mod types;

pub use types::*;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use webpify_common::paths::output_file_name;
use webpify_common::JobId;

use crate::quality::Quality;

/// Registry change notification for whatever renders the job list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A job was created and is converting.
    JobAdded { id: JobId, file_name: String },
    /// A job finished converting.
    JobConverted { id: JobId, size: u64 },
    /// A job failed.
    JobFailed { id: JobId, reason: String },
    /// A job was removed by the user.
    JobRemoved { id: JobId },
    /// Every job was removed.
    Cleared { count: usize },
    /// Files were dropped before job creation because they are not images.
    FilesRejected { names: Vec<String> },
}

#[derive(Default)]
struct Arena {
    jobs: HashMap<JobId, ConversionJob>,
    order: Vec<JobId>,
}

/// Ordered collection of conversion jobs.
///
/// The only way to change a job is through the id-keyed operations below;
/// each runs as one critical section. Dropping the registry drops every job
/// and with it every output handle.
pub struct FileRegistry {
    arena: RwLock<Arena>,
    event_tx: broadcast::Sender<RegistryEvent>,
}

impl FileRegistry {
    pub fn new() -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(256);

        Arc::new(Self {
            arena: RwLock::new(Arena::default()),
            event_tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.event_tx.subscribe()
    }

    fn broadcast(&self, event: RegistryEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::debug!("No subscribers for registry event");
        }
    }

    /// Create one converting job per file, appended in input order.
    pub fn append(&self, files: Vec<SourceFile>, quality: Quality) -> Vec<JobId> {
        let jobs: Vec<ConversionJob> = files
            .into_iter()
            .map(|source| ConversionJob::new(source, quality))
            .collect();
        let added: Vec<(JobId, String)> = jobs
            .iter()
            .map(|job| (job.id(), job.source().name.clone()))
            .collect();

        {
            let mut arena = self.arena.write();
            for job in jobs {
                arena.order.push(job.id());
                arena.jobs.insert(job.id(), job);
            }
        }

        for (id, file_name) in &added {
            self.broadcast(RegistryEvent::JobAdded {
                id: *id,
                file_name: file_name.clone(),
            });
        }

        added.into_iter().map(|(id, _)| id).collect()
    }

    /// Apply a terminal outcome to a job.
    ///
    /// Returns `false` without touching anything when the job is gone or has
    /// already finished. The discarded outcome is dropped, releasing any
    /// handle it carried.
    pub fn update(&self, id: JobId, outcome: JobOutcome) -> bool {
        let event = match &outcome {
            JobOutcome::Converted(handle) => RegistryEvent::JobConverted {
                id,
                size: handle.size(),
            },
            JobOutcome::Failed(reason) => RegistryEvent::JobFailed {
                id,
                reason: reason.clone(),
            },
        };

        let discarded = {
            let mut arena = self.arena.write();
            match arena.jobs.get_mut(&id) {
                Some(job) => job.finish(outcome).err(),
                None => Some(outcome),
            }
        };

        if let Some(outcome) = discarded {
            tracing::warn!(job = %id, "Dropping update for missing or finished job");
            drop(outcome);
            return false;
        }

        match &event {
            RegistryEvent::JobConverted { size, .. } => {
                tracing::info!(job = %id, size, "Job converted");
            }
            RegistryEvent::JobFailed { reason, .. } => {
                tracing::info!(job = %id, reason = %reason, "Job failed");
            }
            _ => {}
        }
        self.broadcast(event);
        true
    }

    /// Remove a job, releasing its output if it has one.
    pub fn remove(&self, id: JobId) -> bool {
        let removed = {
            let mut arena = self.arena.write();
            let job = arena.jobs.remove(&id);
            if job.is_some() {
                arena.order.retain(|existing| *existing != id);
            }
            job
        };

        match removed {
            Some(job) => {
                drop(job);
                self.broadcast(RegistryEvent::JobRemoved { id });
                true
            }
            None => false,
        }
    }

    /// Remove every job, releasing every held output. Returns the number of
    /// jobs removed.
    pub fn clear(&self) -> usize {
        let jobs = {
            let mut arena = self.arena.write();
            arena.order.clear();
            std::mem::take(&mut arena.jobs)
        };

        let count = jobs.len();
        drop(jobs);

        tracing::debug!(count, "Registry cleared");
        self.broadcast(RegistryEvent::Cleared { count });
        count
    }

    /// Announce files that were filtered out before job creation.
    pub fn report_rejected(&self, names: Vec<String>) {
        if names.is_empty() {
            return;
        }
        self.broadcast(RegistryEvent::FilesRejected { names });
    }

    pub fn get(&self, id: JobId) -> Option<JobView> {
        self.arena.read().jobs.get(&id).map(ConversionJob::view)
    }

    /// All jobs in insertion order.
    pub fn snapshot(&self) -> Vec<JobView> {
        let arena = self.arena.read();
        arena
            .order
            .iter()
            .filter_map(|id| arena.jobs.get(id))
            .map(ConversionJob::view)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.arena.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> RegistryStats {
        let arena = self.arena.read();
        let mut stats = RegistryStats::default();
        for job in arena.jobs.values() {
            match job.status() {
                JobStatus::Converting => stats.converting += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Converted => {
                    stats.converted += 1;
                    stats.input_bytes += job.source().size();
                    stats.output_bytes += job.output().map(|h| h.size()).unwrap_or(0);
                }
            }
        }
        stats
    }

    /// The downloadable artifact of a converted job.
    pub fn download(&self, id: JobId) -> Option<Download> {
        let arena = self.arena.read();
        let job = arena.jobs.get(&id)?;
        let bytes = job.output()?.bytes()?;
        Some(Download {
            file_name: output_file_name(&job.source().name),
            bytes,
        })
    }
}
