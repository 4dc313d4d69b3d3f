use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use webpify_common::paths::{self, is_image_media_type};
use webpify_common::JobId;

use crate::output::OutputHandle;
use crate::quality::Quality;

/// An input file as supplied by the user.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Bytes,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, declaring its media type from the extension.
    pub fn from_path(path: &Path) -> webpify_common::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| webpify_common::Error::invalid_input(format!("not a file: {:?}", path)))?;

        Ok(Self::new(name, paths::media_type_for_path(path), bytes))
    }

    /// Original size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_image(&self) -> bool {
        is_image_media_type(&self.media_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Converting,
    Converted,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Converting)
    }
}

/// Terminal result of one conversion.
#[derive(Debug)]
pub enum JobOutcome {
    Converted(OutputHandle),
    Failed(String),
}

/// One file's conversion task.
///
/// Everything but the outcome fields is fixed at creation. The outcome is
/// written once, by [`finish`](Self::finish).
#[derive(Debug)]
pub struct ConversionJob {
    id: JobId,
    source: SourceFile,
    quality: Quality,
    status: JobStatus,
    output: Option<OutputHandle>,
    failure: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl ConversionJob {
    pub fn new(source: SourceFile, quality: Quality) -> Self {
        Self {
            id: JobId::new(),
            source,
            quality,
            status: JobStatus::Converting,
            output: None,
            failure: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    /// Quality captured when the job started.
    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn output(&self) -> Option<&OutputHandle> {
        self.output.as_ref()
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Apply a terminal outcome. A job that already finished hands the
    /// outcome back untouched.
    pub fn finish(&mut self, outcome: JobOutcome) -> Result<(), JobOutcome> {
        if self.status.is_terminal() {
            return Err(outcome);
        }

        match outcome {
            JobOutcome::Converted(handle) => {
                self.status = JobStatus::Converted;
                self.output = Some(handle);
            }
            JobOutcome::Failed(reason) => {
                self.status = JobStatus::Failed;
                self.failure = Some(reason);
            }
        }
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn view(&self) -> JobView {
        JobView {
            id: self.id,
            file_name: self.source.name.clone(),
            media_type: self.source.media_type.clone(),
            original_size: self.source.size(),
            quality: self.quality,
            status: self.status,
            output_size: self.output.as_ref().map(OutputHandle::size),
            failure: self.failure.clone(),
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }
}

/// Read-only copy of a job for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobView {
    pub id: JobId,
    pub file_name: String,
    pub media_type: String,
    pub original_size: u64,
    pub quality: Quality,
    pub status: JobStatus,
    pub output_size: Option<u64>,
    pub failure: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobView {
    pub fn output_file_name(&self) -> String {
        paths::output_file_name(&self.file_name)
    }
}

/// A converted artifact ready to be saved.
#[derive(Debug, Clone)]
pub struct Download {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub converting: usize,
    pub converted: usize,
    pub failed: usize,
    /// Source bytes of converted jobs.
    pub input_bytes: u64,
    /// Output bytes of converted jobs.
    pub output_bytes: u64,
}

impl RegistryStats {
    pub fn total(&self) -> usize {
        self.converting + self.converted + self.failed
    }

    /// Fraction of input bytes saved by conversion. Negative when outputs grew.
    pub fn savings_ratio(&self) -> f64 {
        if self.input_bytes == 0 {
            return 0.0;
        }
        1.0 - self.output_bytes as f64 / self.input_bytes as f64
    }
}

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Human-readable byte count using 1024-based units.
///
/// At most two decimals, trailing zeros dropped.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut unit = 0;
    let mut divisor: u64 = 1;
    while unit < SIZE_UNITS.len() - 1 && bytes / divisor >= 1024 {
        divisor *= 1024;
        unit += 1;
    }

    let value = format!("{:.2}", bytes as f64 / divisor as f64);
    let value = value.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", value, SIZE_UNITS[unit])
}
