use crate::state::JobOutcome;
use crate::output::OutputHandle;

/// Job-scoped conversion failure.
///
/// The display text is what the user sees next to the failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// The declared media type is not an image type.
    #[error("unsupported format")]
    UnsupportedFormat,

    /// The source bytes could not be decoded.
    #[error("failed to load image")]
    DecodeFailure,

    /// No drawing surface could be obtained for the decoded image.
    #[error("failed to get drawing context")]
    SurfaceAcquisitionFailure,

    /// The encoder produced no output.
    #[error("failed to convert image to WebP")]
    EncodeFailure,
}

impl From<Result<OutputHandle, ConversionError>> for JobOutcome {
    fn from(result: Result<OutputHandle, ConversionError>) -> Self {
        match result {
            Ok(handle) => JobOutcome::Converted(handle),
            Err(err) => JobOutcome::Failed(err.to_string()),
        }
    }
}
