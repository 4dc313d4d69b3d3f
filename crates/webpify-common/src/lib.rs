//! Webpify-Common: Shared types and utilities.
//!
//! This crate provides common functionality used across webpify:
//!
//! - **Typed IDs**: Type-safe UUID wrappers for conversion jobs and output blobs
//! - **Path Utilities**: Media type detection and output file naming
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use webpify_common::{JobId, Error, Result};
//! use webpify_common::paths::{is_image_media_type, output_file_name};
//!
//! let job_id = JobId::new();
//!
//! assert!(is_image_media_type("image/jpeg"));
//! assert_eq!(output_file_name("holiday.jpg"), "holiday.webp");
//!
//! fn example() -> Result<()> {
//!     Err(Error::invalid_input("empty selection"))
//! }
//! ```

pub mod error;
pub mod ids;
pub mod paths;

pub use error::{Error, Result};
pub use ids::*;
