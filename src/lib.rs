//! Webpify - Image to WebP conversion
//!
//! Accepts batches of raster images, converts each to lossy WebP on its own
//! task, and tracks every job in a [`state::FileRegistry`] until the user
//! downloads or discards the result.
//!
//! ```no_run
//! use std::sync::Arc;
//! use webpify::conversion::{ConversionPipeline, Converter, NativeCodec};
//! use webpify::output::MemoryBlobStore;
//! use webpify::quality::{Quality, QualitySetting};
//! use webpify::state::{FileRegistry, SourceFile};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let converter = Converter::new(Arc::new(NativeCodec), Arc::new(MemoryBlobStore::new()));
//! let quality = Arc::new(QualitySetting::new(Quality::new(85)));
//! let pipeline = ConversionPipeline::new(FileRegistry::new(), quality, converter);
//!
//! let file = SourceFile::from_path(std::path::Path::new("photo.jpg"))?;
//! let batch = pipeline.accept(vec![file]);
//! batch.wait().await;
//!
//! for job in pipeline.registry().snapshot() {
//!     println!("{} {:?}", job.file_name, job.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod conversion;
pub mod output;
pub mod quality;
pub mod state;
