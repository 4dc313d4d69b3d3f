//! Image to WebP conversion.
//!
//! This module turns accepted files into registry jobs and drives each one
//! through its stages independently:
//!
//! - Format check against the declared media type
//! - Decode to a pixel image
//! - Rasterize onto an RGBA surface at natural size
//! - Encode the surface as lossy WebP
//! - Park the result in the blob store
//!
//! Each stage fails with its own [`ConversionError`] variant. Failures end at
//! the job: they mark it failed and never reach sibling jobs or the registry.

mod codec;
mod error;
mod executor;
mod manager;

pub use codec::{ImageCodec, NativeCodec, Surface};
pub use error::ConversionError;
pub use executor::{Converter, DEFAULT_MAX_INPUT_BYTES};
pub use manager::{AcceptedBatch, ConversionPipeline};
