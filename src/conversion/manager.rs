//! Batch acceptance and job scheduling.

use super::executor::Converter;
use crate::quality::QualitySetting;
use crate::state::{FileRegistry, JobOutcome, SourceFile};
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use webpify_common::JobId;

/// Result of handing a batch of files to the pipeline.
#[derive(Debug)]
pub struct AcceptedBatch {
    /// Jobs created, in input order.
    pub ids: Vec<JobId>,
    /// Names of files dropped because they are not images.
    pub rejected: Vec<String>,
    tasks: Vec<JoinHandle<()>>,
}

impl AcceptedBatch {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Wait until every job of this batch has written its outcome.
    ///
    /// The registry itself never waits on a batch; this is for drivers that
    /// need to know when the work is done.
    pub async fn wait(self) {
        for result in join_all(self.tasks).await {
            if let Err(e) = result {
                warn!("Conversion task ended abnormally: {}", e);
            }
        }
    }
}

/// Turns selected files into registry jobs and converts them concurrently.
pub struct ConversionPipeline {
    registry: Arc<FileRegistry>,
    quality: Arc<QualitySetting>,
    converter: Converter,
}

impl ConversionPipeline {
    pub fn new(
        registry: Arc<FileRegistry>,
        quality: Arc<QualitySetting>,
        converter: Converter,
    ) -> Self {
        Self {
            registry,
            quality,
            converter,
        }
    }

    pub fn registry(&self) -> &Arc<FileRegistry> {
        &self.registry
    }

    /// Accept a file selection.
    ///
    /// Non-image files are filtered out and reported. The remaining files
    /// become converting jobs before this returns; each is then converted on
    /// its own task at the quality current right now. Must be called within a
    /// tokio runtime.
    pub fn accept(&self, files: Vec<SourceFile>) -> AcceptedBatch {
        let (images, others): (Vec<SourceFile>, Vec<SourceFile>) =
            files.into_iter().partition(SourceFile::is_image);

        let rejected: Vec<String> = others.into_iter().map(|f| f.name).collect();
        if !rejected.is_empty() {
            warn!(files = ?rejected, "Skipping files that are not images");
            self.registry.report_rejected(rejected.clone());
        }

        if images.is_empty() {
            return AcceptedBatch {
                ids: Vec::new(),
                rejected,
                tasks: Vec::new(),
            };
        }

        let quality = self.quality.get();
        let ids = self.registry.append(images.clone(), quality);
        info!(
            count = ids.len(),
            quality = quality.value(),
            "Accepted files for conversion"
        );

        let tasks = ids
            .iter()
            .copied()
            .zip(images)
            .map(|(id, source)| {
                let registry = self.registry.clone();
                let converter = self.converter.clone();
                tokio::spawn(async move {
                    let outcome: JobOutcome = converter.convert(&source, quality).await.into();
                    registry.update(id, outcome);
                })
            })
            .collect();

        AcceptedBatch {
            ids,
            rejected,
            tasks,
        }
    }
}
