//! Single-job conversion stages.

use super::codec::{ImageCodec, Surface};
use super::error::ConversionError;
use crate::output::{BlobStore, OutputHandle};
use crate::quality::Quality;
use crate::state::SourceFile;
use bytes::Bytes;
use image::DynamicImage;
use std::sync::Arc;
use tracing::debug;

/// Sources larger than this fail before decoding (256 MiB).
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 256 * 1024 * 1024;

/// Runs one source file through the conversion stages.
///
/// Cheap to clone; every spawned job gets its own copy.
#[derive(Clone)]
pub struct Converter {
    codec: Arc<dyn ImageCodec>,
    store: Arc<dyn BlobStore>,
    max_input_bytes: u64,
}

impl Converter {
    pub fn new(codec: Arc<dyn ImageCodec>, store: Arc<dyn BlobStore>) -> Self {
        Self {
            codec,
            store,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }

    pub fn with_max_input_bytes(mut self, max_input_bytes: u64) -> Self {
        self.max_input_bytes = max_input_bytes;
        self
    }

    /// Convert `source` at `quality`, returning the owned output on success.
    pub async fn convert(
        &self,
        source: &SourceFile,
        quality: Quality,
    ) -> Result<OutputHandle, ConversionError> {
        self.check_format(source)?;
        let image = self.decode(source).await?;
        let surface = self.rasterize(&image)?;
        drop(image);
        let encoded = self.encode(surface, quality).await?;

        debug!(
            file = %source.name,
            original = source.size(),
            encoded = encoded.len(),
            "Encoded WebP"
        );
        Ok(OutputHandle::create(self.store.clone(), encoded))
    }

    fn check_format(&self, source: &SourceFile) -> Result<(), ConversionError> {
        if source.is_image() {
            Ok(())
        } else {
            debug!(file = %source.name, media_type = %source.media_type, "Not an image type");
            Err(ConversionError::UnsupportedFormat)
        }
    }

    async fn decode(&self, source: &SourceFile) -> Result<DynamicImage, ConversionError> {
        if source.size() > self.max_input_bytes {
            debug!(
                file = %source.name,
                size = source.size(),
                limit = self.max_input_bytes,
                "Source exceeds input limit"
            );
            return Err(ConversionError::DecodeFailure);
        }

        let image = self.codec.decode(source.bytes.clone()).await.map_err(|e| {
            debug!(file = %source.name, error = %format!("{e:#}"), "Decode failed");
            ConversionError::DecodeFailure
        })?;
        debug!(file = %source.name, width = image.width(), height = image.height(), "Decoded");
        Ok(image)
    }

    fn rasterize(&self, image: &DynamicImage) -> Result<Surface, ConversionError> {
        let surface = self.codec.rasterize(image).map_err(|e| {
            debug!(error = %format!("{e:#}"), "Surface acquisition failed");
            ConversionError::SurfaceAcquisitionFailure
        })?;

        if surface.dimensions() != (image.width(), image.height()) {
            debug!(
                expected = ?(image.width(), image.height()),
                got = ?surface.dimensions(),
                "Surface does not match natural size"
            );
            return Err(ConversionError::SurfaceAcquisitionFailure);
        }
        Ok(surface)
    }

    async fn encode(&self, surface: Surface, quality: Quality) -> Result<Bytes, ConversionError> {
        let encoded = self
            .codec
            .encode_webp(surface, quality.encoder_quality())
            .await
            .map_err(|e| {
                debug!(error = %format!("{e:#}"), "Encode failed");
                ConversionError::EncodeFailure
            })?;

        if encoded.is_empty() {
            debug!("Encoder returned no data");
            return Err(ConversionError::EncodeFailure);
        }
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemoryBlobStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Codec whose stages can be made to fail, recording the quality it saw.
    #[derive(Default)]
    struct ScriptedCodec {
        fail_decode: bool,
        fail_surface: bool,
        empty_output: bool,
        seen_quality: Mutex<Option<f32>>,
    }

    #[async_trait]
    impl ImageCodec for ScriptedCodec {
        async fn decode(&self, _bytes: Bytes) -> anyhow::Result<DynamicImage> {
            if self.fail_decode {
                anyhow::bail!("corrupt");
            }
            Ok(DynamicImage::new_rgba8(8, 6))
        }

        fn rasterize(&self, image: &DynamicImage) -> anyhow::Result<Surface> {
            if self.fail_surface {
                anyhow::bail!("no surface");
            }
            Ok(image.to_rgba8())
        }

        async fn encode_webp(&self, _surface: Surface, quality: f32) -> anyhow::Result<Bytes> {
            *self.seen_quality.lock() = Some(quality);
            if self.empty_output {
                return Ok(Bytes::new());
            }
            Ok(Bytes::from_static(b"RIFF\0\0\0\0WEBP"))
        }
    }

    fn converter(codec: ScriptedCodec) -> (Converter, Arc<MemoryBlobStore>, Arc<ScriptedCodec>) {
        let store = Arc::new(MemoryBlobStore::new());
        let codec = Arc::new(codec);
        (Converter::new(codec.clone(), store.clone()), store, codec)
    }

    fn jpeg() -> SourceFile {
        SourceFile::new("photo.jpg", "image/jpeg", vec![0u8; 32])
    }

    #[tokio::test]
    async fn test_success() {
        let (converter, store, codec) = converter(ScriptedCodec::default());
        let handle = converter.convert(&jpeg(), Quality::new(85)).await.unwrap();

        assert_eq!(handle.size(), 12);
        assert_eq!(store.live_count(), 1);
        let quality = codec.seen_quality.lock().unwrap();
        assert!((quality - 84.9).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_full_quality_stays_below_lossless() {
        let (converter, _store, codec) = converter(ScriptedCodec::default());
        converter.convert(&jpeg(), Quality::new(100)).await.unwrap();
        assert!(codec.seen_quality.lock().unwrap() < 100.0);
    }

    #[tokio::test]
    async fn test_unsupported_format() {
        let (converter, store, _) = converter(ScriptedCodec::default());
        let source = SourceFile::new("notes.txt", "text/plain", vec![1u8; 4]);
        let err = converter.convert(&source, Quality::default()).await.unwrap_err();
        assert_eq!(err, ConversionError::UnsupportedFormat);
        assert_eq!(store.created_count(), 0);
    }

    #[tokio::test]
    async fn test_decode_failure() {
        let (converter, _, _) = converter(ScriptedCodec {
            fail_decode: true,
            ..Default::default()
        });
        let err = converter.convert(&jpeg(), Quality::default()).await.unwrap_err();
        assert_eq!(err, ConversionError::DecodeFailure);
    }

    #[tokio::test]
    async fn test_oversized_input_fails_decode() {
        let (converter, _, codec) = converter(ScriptedCodec::default());
        let converter = converter.with_max_input_bytes(8);
        let err = converter.convert(&jpeg(), Quality::default()).await.unwrap_err();
        assert_eq!(err, ConversionError::DecodeFailure);
        assert!(codec.seen_quality.lock().is_none());
    }

    #[tokio::test]
    async fn test_surface_failure() {
        let (converter, _, _) = converter(ScriptedCodec {
            fail_surface: true,
            ..Default::default()
        });
        let err = converter.convert(&jpeg(), Quality::default()).await.unwrap_err();
        assert_eq!(err, ConversionError::SurfaceAcquisitionFailure);
    }

    #[tokio::test]
    async fn test_empty_output_is_encode_failure() {
        let (converter, store, _) = converter(ScriptedCodec {
            empty_output: true,
            ..Default::default()
        });
        let err = converter.convert(&jpeg(), Quality::default()).await.unwrap_err();
        assert_eq!(err, ConversionError::EncodeFailure);
        assert_eq!(store.created_count(), 0);
    }
}
