// THEORY:
// This file is the main entry point for the `equipment_vision` library crate.
// It defines the public API exposed to the inspection application: the
// `DiagnosticPipeline` for one upload, the `ParallelPipeline` for many, and the
// data structures that flow between them (`SourceImage`, `RasterSurface`,
// `ConfidenceScore`, `RiskLevel`, `Report`).
//
// The stages themselves live in `core_modules` and can be used on their own:
// the risk classifier, for example, is consumed anywhere a stored risk label
// needs display treatment, with no image involved.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::{PipelineConfig, ResizeFilter};
pub use core_modules::confidence::{ConfidenceScore, ConfidenceScorer, PixelStatistics};
pub use core_modules::handle::{HandleRegistry, ScopedHandle, TrackingRegistry};
pub use core_modules::inference::{Inference, InferenceService, StaticInference};
pub use core_modules::pixel::pixel::Pixel;
pub use core_modules::preprocessor::{
    EncodedImage, ImageCrateDecoder, ImagePreprocessor, Preprocessed, RasterDecoder, SourceImage,
};
pub use core_modules::report::{
    AnalysisResult, BrightnessAnalysis, ColorAnalysis, ComparisonRecord, Report, ReportAssembler,
};
pub use core_modules::risk::{DisplayBucket, RiskLevel, classify};
pub use core_modules::surface::surface::RasterSurface;
pub use error::{AnalysisError, Result};
pub use parallel_pipeline::ParallelPipeline;
pub use pipeline::{AnalysisRequest, DiagnosticPipeline};
