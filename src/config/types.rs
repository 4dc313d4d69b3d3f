use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::conversion::DEFAULT_MAX_INPUT_BYTES;
use crate::quality::{Quality, DEFAULT_QUALITY};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub conversion: ConversionConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversionConfig {
    /// Initial quality percentage (0-100)
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// Sources larger than this many bytes fail without being decoded
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: u64,
}

impl ConversionConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }
}

fn default_quality() -> u8 {
    DEFAULT_QUALITY
}

fn default_max_input_bytes() -> u64 {
    DEFAULT_MAX_INPUT_BYTES
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            max_input_bytes: default_max_input_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Directory converted files are written to
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Replace existing files with the same name
    #[serde(default)]
    pub overwrite: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            overwrite: false,
        }
    }
}
