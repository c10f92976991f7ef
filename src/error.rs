// THEORY:
// Every failure the diagnostic pipeline can surface lives in this one enum.
// Only two conditions are fatal to an analysis: the image could not be loaded
// (unreadable or undecodable) and a raster surface with no area reached the
// scorer. Missing text, unknown risk labels and malformed analysis content are
// *not* errors; they are normalized by the modules that receive them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The file could not be read or its bytes could not be decoded.
    #[error("image load failed: {reason}")]
    ImageLoad {
        reason: String,
        #[source]
        source: Option<image::ImageError>,
    },

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// A surface with zero area, or whose buffer does not hold `width * height` RGBA pixels.
    #[error("invalid raster surface {width}x{height} with {len} bytes")]
    InvalidSurface { width: u32, height: u32, len: usize },

    #[error("confidence score {0} is outside [0.10, 0.95]")]
    ScoreOutOfRange(f64),

    #[error("inference collaborator failed: {0}")]
    Inference(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("analysis worker pool is unavailable")]
    WorkerUnavailable,
}

impl AnalysisError {
    /// An image load failure with no underlying codec or I/O error.
    pub fn image_load(reason: impl Into<String>) -> Self {
        AnalysisError::ImageLoad {
            reason: reason.into(),
            source: None,
        }
    }
}

impl From<image::ImageError> for AnalysisError {
    fn from(err: image::ImageError) -> Self {
        AnalysisError::ImageLoad {
            reason: "undecodable image data".into(),
            source: Some(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
