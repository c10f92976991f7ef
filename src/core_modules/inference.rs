// THEORY:
// Text extraction and narrative generation happen outside this crate, in an
// inference collaborator that receives the encoded image. The pipeline only
// depends on the *shape* of what comes back, expressed as `Inference`, and on
// the `InferenceService` seam. Anything that can answer
// `infer(encoded) -> Inference` (a vision-model HTTP client, a cache, a canned
// fixture) plugs in here.
//
// Collaborator output is parsed leniently: either `extracted_text` or `text`,
// either a nested `analysis` object or top-level lists, any of `risk_level`,
// `riskLevel` or `risk_label`. Missing pieces default to empty rather than failing.

use crate::core_modules::preprocessor::EncodedImage;
use crate::core_modules::report::{AnalysisResult, BrightnessAnalysis, ColorAnalysis};
use crate::error::{AnalysisError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// What the inference collaborator returns for one image.
///
/// `Deserialize` goes through [`Inference::from_value`], so it is as lenient as
/// the hand-written parser.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Inference {
    pub extracted_text: String,
    pub analysis: AnalysisResult,
    pub risk_label: Option<String>,
    pub color_analysis: Option<ColorAnalysis>,
    pub brightness_analysis: Option<BrightnessAnalysis>,
}

impl Inference {
    pub fn from_value(value: &Value) -> Self {
        let text = value
            .get("extracted_text")
            .or_else(|| value.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let analysis = match value.get("analysis") {
            Some(nested) if nested.is_object() => AnalysisResult::from_value(nested),
            _ => AnalysisResult::from_value(value),
        };
        let risk_label = value
            .get("risk_level")
            .or_else(|| value.get("riskLevel"))
            .or_else(|| value.get("risk_label"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let color_analysis = value
            .get("color_analysis")
            .and_then(|v| serde_json::from_value(v.clone()).ok());
        let brightness_analysis = value
            .get("brightness_analysis")
            .and_then(|v| serde_json::from_value(v.clone()).ok());

        Self {
            extracted_text: text,
            analysis,
            risk_label,
            color_analysis,
            brightness_analysis,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| AnalysisError::Inference(format!("malformed inference payload: {e}")))?;
        Ok(Self::from_value(&value))
    }
}

impl From<Value> for Inference {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

#[async_trait]
pub trait InferenceService: Send + Sync {
    async fn infer(&self, image: &EncodedImage) -> Result<Inference>;
}

/// Replays one fixed inference for every image.
#[derive(Debug, Clone, Default)]
pub struct StaticInference {
    inference: Inference,
}

impl StaticInference {
    pub fn new(inference: Inference) -> Self {
        Self { inference }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AnalysisError::Inference(format!("{}: {e}", path.display())))?;
        Ok(Self::new(Inference::from_json(&raw)?))
    }
}

#[async_trait]
impl InferenceService for StaticInference {
    async fn infer(&self, _image: &EncodedImage) -> Result<Inference> {
        Ok(self.inference.clone())
    }
}
