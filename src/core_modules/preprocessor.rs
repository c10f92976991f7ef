// THEORY:
// The `ImagePreprocessor` is the first stage of the diagnostic pipeline. It
// turns an uploaded photograph into the two artifacts the rest of the system
// consumes:
//
// 1.  **Encoded transport form**: a self-describing base64 data URL of the
//     original bytes, handed to the external inference collaborator. This is a
//     pure function of the bytes. It never decodes, so it is available even when
//     the image cannot be rasterized.
// 2.  **Raster surface**: the decoded image resampled to the working resolution.
//     The scale is a single uniform `ratio = min(max / width, max / height)`.
//
// Note on the ratio: it is applied unconditionally. An image smaller than the
// working resolution in both dimensions gets `ratio > 1` and is *upscaled*
// (100x100 becomes 400x400). Ordinary cap-at-max logic would clamp
// `ratio <= 1`. The upscale is possibly an unintended quirk, but the literal
// behavior is reproduced on purpose. Do not clamp it.
//
// Resource discipline: decoding goes through a `ScopedHandle` onto the source
// bytes. The handle lives in the async frame of `rasterize`, so it is released
// on success, on decode failure, and when the caller drops the future. The
// decode itself runs on the blocking pool; callers await it and never observe
// a partially drawn surface.

use crate::config::{PipelineConfig, ResizeFilter};
use crate::core_modules::handle::{HandleRegistry, ScopedHandle, TrackingRegistry};
use crate::core_modules::surface::surface::RasterSurface;
use crate::error::{AnalysisError, Result};
use base64::Engine as _;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Raw uploaded bytes plus their declared media type.
#[derive(Debug, Clone)]
pub struct SourceImage {
    bytes: Arc<[u8]>,
    media_type: String,
}

impl SourceImage {
    /// Accepts bytes declared as any `image/*` media type.
    pub fn new(bytes: impl Into<Vec<u8>>, media_type: impl Into<String>) -> Result<Self> {
        let media_type = media_type.into();
        if !media_type.starts_with("image/") {
            return Err(AnalysisError::UnsupportedMediaType(media_type));
        }
        Ok(Self {
            bytes: Arc::from(bytes.into()),
            media_type,
        })
    }

    /// Reads a file, taking the media type from its extension or, failing that, its content.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AnalysisError::ImageLoad {
                reason: format!("cannot read {}", path.display()),
                source: Some(image::ImageError::IoError(e)),
            })?;
        let format = ImageFormat::from_path(path)
            .ok()
            .or_else(|| image::guess_format(&bytes).ok())
            .ok_or_else(|| AnalysisError::UnsupportedMediaType(path.display().to_string()))?;
        Self::new(bytes, format.to_mime_type())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Base64 transport form of a source image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    pub media_type: String,
    pub base64: String,
}

impl EncodedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.base64)
    }
}

impl fmt::Display for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.media_type, self.base64)
    }
}

/// Encodes the source bytes for the inference collaborator. Never decodes.
pub fn encode_for_transport(source: &SourceImage) -> EncodedImage {
    EncodedImage {
        media_type: source.media_type().to_string(),
        base64: base64::engine::general_purpose::STANDARD.encode(source.bytes()),
    }
}

/// Natural and working dimensions of one preprocessing run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledDimensions {
    pub natural_width: u32,
    pub natural_height: u32,
    pub ratio: f64,
    pub width: u32,
    pub height: u32,
}

pub fn scaled_dimensions(natural_width: u32, natural_height: u32, max_size: u32) -> ScaledDimensions {
    let max = max_size as f64;
    let ratio = (max / natural_width as f64).min(max / natural_height as f64);
    ScaledDimensions {
        natural_width,
        natural_height,
        ratio,
        width: (natural_width as f64 * ratio).round() as u32,
        height: (natural_height as f64 * ratio).round() as u32,
    }
}

/// Turns encoded bytes into pixels.
pub trait RasterDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage>;
}

/// Default decoder backed by the `image` crate's format detection.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateDecoder;

impl RasterDecoder for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        Ok(image::load_from_memory(bytes)?)
    }
}

/// Both preprocessing artifacts of a single upload.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub surface: RasterSurface,
    pub encoded: EncodedImage,
}

pub struct ImagePreprocessor {
    max_size: u32,
    filter: ResizeFilter,
    decoder: Arc<dyn RasterDecoder>,
    registry: Arc<dyn HandleRegistry>,
}

impl ImagePreprocessor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            max_size: config.max_size,
            filter: config.resize_filter,
            decoder: Arc::new(ImageCrateDecoder),
            registry: Arc::new(TrackingRegistry::new()),
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn RasterDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn HandleRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    pub fn encode(&self, source: &SourceImage) -> EncodedImage {
        encode_for_transport(source)
    }

    /// Decodes and resamples the source onto a working surface.
    pub async fn rasterize(&self, source: &SourceImage) -> Result<RasterSurface> {
        let handle = ScopedHandle::acquire(self.registry.clone(), source.media_type(), source.len());

        let bytes = source.bytes.clone();
        let decoder = self.decoder.clone();
        let (max_size, filter) = (self.max_size, self.filter);
        let outcome = tokio::task::spawn_blocking(move || {
            decode_and_resize(decoder.as_ref(), &bytes, max_size, filter)
        })
        .await
        .map_err(|e| AnalysisError::image_load(format!("decode task aborted: {e}")))
        .and_then(|decoded| decoded);

        if let Err(err) = &outcome {
            warn!(handle = handle.id(), error = %err, "rasterization failed");
        }
        drop(handle);
        outcome
    }

    /// Runs both derivations. The encoded form is computed before decoding starts.
    pub async fn preprocess(&self, source: &SourceImage) -> Result<Preprocessed> {
        let encoded = self.encode(source);
        let surface = self.rasterize(source).await?;
        Ok(Preprocessed { surface, encoded })
    }
}

fn decode_and_resize(
    decoder: &dyn RasterDecoder,
    bytes: &[u8],
    max_size: u32,
    filter: ResizeFilter,
) -> Result<RasterSurface> {
    let decoded = decoder.decode(bytes)?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(AnalysisError::image_load("decoded image has no pixels"));
    }

    let dims = scaled_dimensions(decoded.width(), decoded.height(), max_size);
    if dims.width == 0 || dims.height == 0 {
        return Err(AnalysisError::InvalidSurface {
            width: dims.width,
            height: dims.height,
            len: 0,
        });
    }
    debug!(
        natural_width = dims.natural_width,
        natural_height = dims.natural_height,
        ratio = dims.ratio,
        width = dims.width,
        height = dims.height,
        "resampling to working surface"
    );

    let resized = decoded.resize_exact(dims.width, dims.height, filter.into());
    Ok(RasterSurface::from(resized.to_rgba8()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;
    use std::time::Duration;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([((x + y) % 256) as u8, 128, 64, 255])
        });
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode png");
        bytes
    }

    fn png_source(width: u32, height: u32) -> SourceImage {
        SourceImage::new(png_bytes(width, height), "image/png").expect("png source")
    }

    fn tracked(decoder: Option<Arc<dyn RasterDecoder>>) -> (ImagePreprocessor, Arc<TrackingRegistry>) {
        let registry = Arc::new(TrackingRegistry::new());
        let mut preprocessor =
            ImagePreprocessor::new(&PipelineConfig::default()).with_registry(registry.clone());
        if let Some(decoder) = decoder {
            preprocessor = preprocessor.with_decoder(decoder);
        }
        (preprocessor, registry)
    }

    struct FailingDecoder;

    impl RasterDecoder for FailingDecoder {
        fn decode(&self, _bytes: &[u8]) -> Result<DynamicImage> {
            Err(AnalysisError::image_load("simulated decode failure"))
        }
    }

    struct SlowDecoder;

    impl RasterDecoder for SlowDecoder {
        fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
            std::thread::sleep(Duration::from_millis(200));
            ImageCrateDecoder.decode(bytes)
        }
    }

    #[test]
    fn wide_image_is_halved() {
        let dims = scaled_dimensions(800, 400, 400);
        assert_eq!(dims.ratio, 0.5);
        assert_eq!((dims.width, dims.height), (400, 200));
    }

    // Reproduces the unconditional ratio as-is, even though a cap would
    // normally clamp it to 1. Possibly unintended, kept on purpose.
    #[test]
    fn small_images_are_upscaled_not_capped() {
        let dims = scaled_dimensions(100, 100, 400);
        assert_eq!(dims.ratio, 4.0);
        assert_eq!((dims.width, dims.height), (400, 400));
    }

    #[test]
    fn dimensions_are_rounded() {
        let dims = scaled_dimensions(1000, 333, 400);
        assert_eq!((dims.width, dims.height), (400, 133));
        let dims = scaled_dimensions(3, 2, 400);
        assert_eq!((dims.width, dims.height), (400, 267));
    }

    #[test]
    fn rejects_non_image_media_types() {
        let err = SourceImage::new(vec![1, 2, 3], "text/plain").unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedMediaType(m) if m == "text/plain"));
    }

    #[test]
    fn encoding_is_a_data_url_of_the_original_bytes() {
        let source = SourceImage::new(vec![0xde, 0xad, 0xbe, 0xef], "image/jpeg").expect("source");
        let encoded = encode_for_transport(&source);
        assert_eq!(encoded.base64, "3q2+7w==");
        assert_eq!(encoded.data_url(), "data:image/jpeg;base64,3q2+7w==");
        assert_eq!(encoded.to_string(), encoded.data_url());
    }

    #[tokio::test]
    async fn preprocess_produces_working_surface() {
        let (preprocessor, registry) = tracked(None);
        let result = preprocessor.preprocess(&png_source(800, 400)).await.expect("preprocess");
        assert_eq!((result.surface.width(), result.surface.height()), (400, 200));
        assert_eq!(result.surface.as_bytes().len(), 400 * 200 * 4);
        assert!(result.encoded.data_url().starts_with("data:image/png;base64,"));
        assert_eq!(registry.acquired_count(), 1);
        assert_eq!(registry.released_count(), 1);
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn small_source_is_upscaled_on_the_surface() {
        let (preprocessor, _) = tracked(None);
        let surface = preprocessor.rasterize(&png_source(100, 100)).await.expect("rasterize");
        assert_eq!((surface.width(), surface.height()), (400, 400));
    }

    #[tokio::test]
    async fn decode_failure_releases_handle_exactly_once() {
        let (preprocessor, registry) = tracked(Some(Arc::new(FailingDecoder)));
        let err = preprocessor.preprocess(&png_source(10, 10)).await.unwrap_err();
        assert!(matches!(err, AnalysisError::ImageLoad { .. }));
        assert_eq!(registry.acquired_count(), 1);
        assert_eq!(registry.released_count(), 1);
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn corrupt_bytes_fail_to_load_but_still_encode() {
        let (preprocessor, registry) = tracked(None);
        let source = SourceImage::new(b"not really a png".to_vec(), "image/png").expect("source");
        let encoded = preprocessor.encode(&source);
        assert!(!encoded.base64.is_empty());
        let err = preprocessor.rasterize(&source).await.unwrap_err();
        assert!(matches!(err, AnalysisError::ImageLoad { source: Some(_), .. }));
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.released_count(), 1);
    }

    #[tokio::test]
    async fn cancelled_rasterize_releases_handle() {
        let (preprocessor, registry) = tracked(Some(Arc::new(SlowDecoder)));
        let source = png_source(20, 20);
        let outcome =
            tokio::time::timeout(Duration::from_millis(10), preprocessor.rasterize(&source)).await;
        assert!(outcome.is_err(), "decode should still be running");
        assert_eq!(registry.acquired_count(), 1);
        assert_eq!(registry.released_count(), 1);
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn degenerate_aspect_ratio_is_an_invalid_surface() {
        let (preprocessor, registry) = tracked(None);
        let err = preprocessor.rasterize(&png_source(1, 2000)).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidSurface { width: 0, height: 400, .. }));
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn loads_media_type_from_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("valve.png");
        std::fs::write(&path, png_bytes(4, 4)).expect("write png");
        let source = SourceImage::from_path(&path).await.expect("source from path");
        assert_eq!(source.media_type(), "image/png");

        let unnamed = dir.path().join("upload");
        std::fs::write(&unnamed, png_bytes(4, 4)).expect("write png");
        let source = SourceImage::from_path(&unnamed).await.expect("sniffed source");
        assert_eq!(source.media_type(), "image/png");

        let err = SourceImage::from_path(dir.path().join("missing.png")).await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::ImageLoad { source: Some(image::ImageError::IoError(_)), .. }
        ));
    }
}
