// THEORY:
// The `pipeline` module is the top-level API for a single diagnostic analysis.
// It wires the core modules together in their one legal order:
//
//   SourceImage ─┬─> encode ──> InferenceService ──> (text, analysis, risk)
//                └─> rasterize ──> RasterSurface
//                                      │
//              ConfidenceScorer <──────┘ (needs the surface and the text)
//                     │
//              ReportAssembler <── RiskLevel, ComparisonRecord, analysis
//
// Encoding and rasterizing are independent derivations of the same bytes, so
// the decode runs concurrently with the inference call. Scoring waits for both;
// assembly waits for scoring. Nothing is shared between analyses, so a
// `DiagnosticPipeline` can serve any number of concurrent `analyze` calls.

use crate::config::PipelineConfig;
use crate::core_modules::confidence::ConfidenceScorer;
use crate::core_modules::inference::InferenceService;
use crate::core_modules::preprocessor::{ImagePreprocessor, SourceImage};
use crate::core_modules::report::{
    BrightnessAnalysis, ColorAnalysis, ComparisonRecord, Report, ReportAssembler,
};
use crate::core_modules::risk::RiskLevel;
use crate::core_modules::surface::surface::RasterSurface;
use crate::error::Result;
use tracing::{Instrument, info, info_span};

/// Everything the caller knows about one upload.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: SourceImage,
    pub comparison: ComparisonRecord,
    /// Overrides the collaborator's extracted text when present.
    pub extracted_text: Option<String>,
    /// Overrides the collaborator's risk label when present.
    pub risk_label: Option<String>,
    pub color_analysis: Option<ColorAnalysis>,
    pub brightness_analysis: Option<BrightnessAnalysis>,
}

impl AnalysisRequest {
    pub fn new(image: SourceImage, comparison: ComparisonRecord) -> Self {
        Self {
            image,
            comparison,
            extracted_text: None,
            risk_label: None,
            color_analysis: None,
            brightness_analysis: None,
        }
    }

    pub fn with_extracted_text(mut self, text: impl Into<String>) -> Self {
        self.extracted_text = Some(text.into());
        self
    }

    pub fn with_risk_label(mut self, label: impl Into<String>) -> Self {
        self.risk_label = Some(label.into());
        self
    }
}

/// The main, top-level struct for the diagnostic engine.
pub struct DiagnosticPipeline {
    preprocessor: ImagePreprocessor,
    scorer: ConfidenceScorer,
}

impl DiagnosticPipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            preprocessor: ImagePreprocessor::new(config),
            scorer: ConfidenceScorer::new(config.no_text_sentinel.clone()),
        }
    }

    pub fn with_preprocessor(mut self, preprocessor: ImagePreprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn preprocessor(&self) -> &ImagePreprocessor {
        &self.preprocessor
    }

    pub fn scorer(&self) -> &ConfidenceScorer {
        &self.scorer
    }

    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
        inference: &dyn InferenceService,
    ) -> Result<Report> {
        let span = info_span!(
            "analysis",
            media_type = request.image.media_type(),
            bytes = request.image.len(),
        );
        let (report, _surface) = self.run(request, inference).instrument(span).await?;
        Ok(report)
    }

    /// Like `analyze`, but hands back the working surface the score was computed on.
    /// The image is decoded once for both.
    pub async fn analyze_with_surface(
        &self,
        request: &AnalysisRequest,
        inference: &dyn InferenceService,
    ) -> Result<(Report, RasterSurface)> {
        let span = info_span!(
            "analysis",
            media_type = request.image.media_type(),
            bytes = request.image.len(),
        );
        self.run(request, inference).instrument(span).await
    }

    async fn run(
        &self,
        request: &AnalysisRequest,
        inference: &dyn InferenceService,
    ) -> Result<(Report, RasterSurface)> {
        // Stage 1: Independent derivations of the uploaded bytes
        let encoded = self.preprocessor.encode(&request.image);
        let (surface, inferred) = futures::join!(
            self.preprocessor.rasterize(&request.image),
            inference.infer(&encoded)
        );
        let surface = surface?;
        let inferred = inferred?;

        // Stage 2: Scoring consumes the surface
        let text = request
            .extracted_text
            .as_deref()
            .unwrap_or(&inferred.extracted_text);
        let score = self.scorer.score(text, &surface)?;

        // Stage 3: Risk and report
        let risk = RiskLevel::from_label(
            request
                .risk_label
                .as_deref()
                .or(inferred.risk_label.as_deref()),
        );
        let report = ReportAssembler::new()
            .with_color_analysis(request.color_analysis.or(inferred.color_analysis))
            .with_brightness_analysis(request.brightness_analysis.or(inferred.brightness_analysis))
            .assemble(&request.comparison, score, risk, &inferred.analysis);

        info!(
            confidence = score.value(),
            risk = ?risk,
            causes = report.analysis().causes.len(),
            "analysis complete"
        );
        Ok((report, surface))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::handle::TrackingRegistry;
    use crate::core_modules::inference::{Inference, StaticInference};
    use crate::core_modules::preprocessor::EncodedImage;
    use crate::core_modules::preprocessor::tests::png_bytes;
    use crate::core_modules::report::AnalysisResult;
    use crate::core_modules::risk::DisplayBucket;
    use crate::error::AnalysisError;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct UnreachableInference;

    #[async_trait]
    impl InferenceService for UnreachableInference {
        async fn infer(&self, _image: &EncodedImage) -> Result<Inference> {
            Err(AnalysisError::Inference("collaborator offline".into()))
        }
    }

    fn inference() -> StaticInference {
        StaticInference::new(Inference {
            extracted_text: "PUMP P-101 MAX 16 BAR".into(),
            analysis: AnalysisResult {
                causes: vec!["Cavitation".into()],
                symptoms: vec!["Pitting on impeller".into()],
                improvements: vec!["Raise suction head".into()],
            },
            risk_label: Some("high".into()),
            ..Default::default()
        })
    }

    fn request() -> AnalysisRequest {
        let image = SourceImage::new(png_bytes(800, 400), "image/png").expect("source");
        AnalysisRequest::new(image, ComparisonRecord::new("16 bar rated", "14.8 bar measured"))
    }

    #[tokio::test]
    async fn analyzes_end_to_end() {
        let pipeline = DiagnosticPipeline::new(&PipelineConfig::default());
        let report = pipeline.analyze(&request(), &inference()).await.expect("report");
        assert_eq!(report.risk_bucket(), DisplayBucket::Severe);
        assert_eq!(report.reference_length(), 12);
        assert_eq!(report.measurement_length(), 17);
        assert_eq!(report.analysis().causes, vec!["Cavitation".to_string()]);
        let confidence = report.confidence().value();
        assert!((0.10..=0.95).contains(&confidence));
        // 21 characters of text saturate the length term.
        assert!(confidence >= 0.60 - 1e-9);
    }

    #[tokio::test]
    async fn caller_overrides_take_precedence() {
        let pipeline = DiagnosticPipeline::new(&PipelineConfig::default());
        let request = request().with_extracted_text("").with_risk_label("low");
        let report = pipeline.analyze(&request, &inference()).await.expect("report");
        assert_eq!(report.confidence().value(), 0.10);
        assert_eq!(report.risk_bucket(), DisplayBucket::Calm);
    }

    #[tokio::test]
    async fn repeated_analysis_is_structurally_identical() {
        let pipeline = DiagnosticPipeline::new(&PipelineConfig::default());
        let request = request();
        let first = pipeline.analyze(&request, &inference()).await.expect("first");
        let second = pipeline.analyze(&request, &inference()).await.expect("second");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn load_failure_is_surfaced_and_releases_handle() {
        let registry = Arc::new(TrackingRegistry::new());
        let config = PipelineConfig::default();
        let pipeline = DiagnosticPipeline::new(&config)
            .with_preprocessor(ImagePreprocessor::new(&config).with_registry(registry.clone()));
        let image = SourceImage::new(b"garbage".to_vec(), "image/jpeg").expect("source");
        let request = AnalysisRequest::new(image, ComparisonRecord::default());
        let err = pipeline.analyze(&request, &inference()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::ImageLoad { .. }));
        assert_eq!(registry.released_count(), 1);
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn surface_comes_from_the_same_decode() {
        let registry = Arc::new(TrackingRegistry::new());
        let config = PipelineConfig::default();
        let pipeline = DiagnosticPipeline::new(&config)
            .with_preprocessor(ImagePreprocessor::new(&config).with_registry(registry.clone()));
        let (report, surface) = pipeline
            .analyze_with_surface(&request(), &inference())
            .await
            .expect("report and surface");
        assert_eq!((surface.width(), surface.height()), (400, 200));
        assert_eq!(registry.acquired_count(), 1);
        assert_eq!(report, pipeline.analyze(&request(), &inference()).await.expect("report"));
        assert_eq!(registry.acquired_count(), 2);
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn collaborator_failure_is_surfaced() {
        let pipeline = DiagnosticPipeline::new(&PipelineConfig::default());
        let err = pipeline.analyze(&request(), &UnreachableInference).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Inference(_)));
    }
}
