//! Decode, rasterize and encode primitives.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, RgbaImage};

/// Working RGBA surface at the source's natural pixel dimensions.
pub type Surface = RgbaImage;

/// Image primitives the conversion stages are built on.
#[async_trait]
pub trait ImageCodec: Send + Sync {
    /// Decode encoded image bytes. Animated input yields its first frame.
    async fn decode(&self, bytes: Bytes) -> Result<DynamicImage>;

    /// Draw a decoded image onto a surface of the same size.
    fn rasterize(&self, image: &DynamicImage) -> Result<Surface>;

    /// Encode a surface as lossy WebP. `quality` is on libwebp's 0-100 scale.
    async fn encode_webp(&self, surface: Surface, quality: f32) -> Result<Bytes>;
}

/// Codec backed by the `image` crate and libwebp.
///
/// Decode and encode run on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCodec;

#[async_trait]
impl ImageCodec for NativeCodec {
    async fn decode(&self, bytes: Bytes) -> Result<DynamicImage> {
        tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .context("Decode task panicked")?
            .context("Failed to decode image data")
    }

    fn rasterize(&self, image: &DynamicImage) -> Result<Surface> {
        if image.width() == 0 || image.height() == 0 {
            anyhow::bail!(
                "Cannot allocate a {}x{} surface",
                image.width(),
                image.height()
            );
        }
        Ok(image.to_rgba8())
    }

    async fn encode_webp(&self, surface: Surface, quality: f32) -> Result<Bytes> {
        tokio::task::spawn_blocking(move || {
            let encoder = webp::Encoder::from_rgba(surface.as_raw(), surface.width(), surface.height());
            encoder
                .encode_simple(false, quality)
                .map(|memory| Bytes::copy_from_slice(&memory))
                .map_err(|e| anyhow::anyhow!("libwebp rejected the surface: {:?}", e))
        })
        .await
        .context("Encode task panicked")?
    }
}
