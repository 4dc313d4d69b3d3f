//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which wires a [`ConversionPipeline`] to a fresh
//! registry and a counting [`MemoryBlobStore`], plus image fixtures built in
//! memory with the `image` crate.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tokio::sync::Semaphore;

use webpify::conversion::{ConversionPipeline, Converter, ImageCodec, NativeCodec, Surface};
use webpify::output::MemoryBlobStore;
use webpify::quality::{Quality, QualitySetting};
use webpify::state::{FileRegistry, SourceFile};

/// Pipeline plus handles on its collaborators.
pub struct TestHarness {
    pub store: Arc<MemoryBlobStore>,
    pub quality: Arc<QualitySetting>,
    pub pipeline: ConversionPipeline,
}

impl TestHarness {
    /// Harness using the native codec at quality 85.
    pub fn new() -> Self {
        Self::with_codec(Arc::new(NativeCodec))
    }

    pub fn with_codec(codec: Arc<dyn ImageCodec>) -> Self {
        let store = Arc::new(MemoryBlobStore::new());
        let quality = Arc::new(QualitySetting::new(Quality::new(85)));
        let converter = Converter::new(codec, store.clone());
        let pipeline = ConversionPipeline::new(FileRegistry::new(), quality.clone(), converter);

        Self {
            store,
            quality,
            pipeline,
        }
    }

    pub fn registry(&self) -> &Arc<FileRegistry> {
        self.pipeline.registry()
    }
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 96])
    })
}

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, format)
        .expect("failed to encode fixture");
    buf.into_inner()
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(DynamicImage::ImageRgb8(gradient(width, height)), ImageFormat::Jpeg)
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(DynamicImage::ImageRgb8(gradient(width, height)), ImageFormat::Png)
}

/// Two-frame animated GIF.
pub fn animated_gif_bytes(width: u32, height: u32) -> Vec<u8> {
    use image::codecs::gif::GifEncoder;
    use image::Frame;

    let first = DynamicImage::ImageRgb8(gradient(width, height)).to_rgba8();
    let second = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));

    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        encoder
            .encode_frames(vec![Frame::new(first), Frame::new(second)])
            .expect("failed to encode gif fixture");
    }
    buf
}

pub fn jpeg_file(name: &str) -> SourceFile {
    SourceFile::new(name, "image/jpeg", jpeg_bytes(64, 48))
}

pub fn png_file(name: &str) -> SourceFile {
    SourceFile::new(name, "image/png", png_bytes(32, 32))
}

/// Native codec whose decode step waits for a permit.
pub struct GatedCodec {
    pub gate: Semaphore,
    inner: NativeCodec,
}

impl GatedCodec {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            inner: NativeCodec,
        }
    }

    /// Let `n` decodes proceed.
    pub fn open(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

#[async_trait]
impl ImageCodec for GatedCodec {
    async fn decode(&self, bytes: Bytes) -> anyhow::Result<DynamicImage> {
        self.gate.acquire().await?.forget();
        self.inner.decode(bytes).await
    }

    fn rasterize(&self, image: &DynamicImage) -> anyhow::Result<Surface> {
        self.inner.rasterize(image)
    }

    async fn encode_webp(&self, surface: Surface, quality: f32) -> anyhow::Result<Bytes> {
        self.inner.encode_webp(surface, quality).await
    }
}

/// Native decode, but the encoder never produces anything.
pub struct BrokenEncoder;

#[async_trait]
impl ImageCodec for BrokenEncoder {
    async fn decode(&self, bytes: Bytes) -> anyhow::Result<DynamicImage> {
        NativeCodec.decode(bytes).await
    }

    fn rasterize(&self, image: &DynamicImage) -> anyhow::Result<Surface> {
        NativeCodec.rasterize(image)
    }

    async fn encode_webp(&self, _surface: Surface, _quality: f32) -> anyhow::Result<Bytes> {
        Ok(Bytes::new())
    }
}
