// THEORY:
// The `ReportAssembler` is the last stage of an analysis. It does no analysis
// of its own: it takes inputs that are already complete (the comparison
// texts, the confidence score, the risk level and the collaborator's
// causes/symptoms/improvements) and freezes them into one `Report`.
//
// Key principles:
// 1.  **Pass-through content**: The analysis triple is carried unchanged. Shape
//     problems (missing or non-list fields, non-string entries) normalize to
//     empty lists or are dropped; nothing is invented.
// 2.  **Presentation metadata**: Character counts of both texts ride along with
//     the texts. They are never used for scoring.
// 3.  **Immutability and determinism**: A `Report` exposes no mutators and holds
//     no timestamps or ids, so the same inputs always assemble to an equal value.

use crate::core_modules::confidence::ConfidenceScore;
use crate::core_modules::risk::{DisplayBucket, RiskLevel};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Externally generated cause/symptom/improvement narrative lists.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResult {
    pub causes: Vec<String>,
    pub symptoms: Vec<String>,
    pub improvements: Vec<String>,
}

impl AnalysisResult {
    /// Lenient shape validation of collaborator output.
    pub fn from_value(value: &Value) -> Self {
        let list = |key: &str| -> Vec<String> {
            value
                .get(key)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default()
        };
        Self {
            causes: list("causes"),
            symptoms: list("symptoms"),
            improvements: list("improvements"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.causes.is_empty() && self.symptoms.is_empty() && self.improvements.is_empty()
    }
}

/// Channel-intensity measures supplied by the caller; carried, never computed here.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ColorAnalysis {
    pub rust: f64,
    pub metal: f64,
    pub corrosion: f64,
    pub paint: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BrightnessAnalysis {
    pub brightness: f64,
    pub contrast: f64,
}

/// Reference (specification) text paired with the measured (field) text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub reference_text: String,
    pub measurement_text: String,
}

impl ComparisonRecord {
    pub fn new(reference_text: impl Into<String>, measurement_text: impl Into<String>) -> Self {
        Self {
            reference_text: reference_text.into(),
            measurement_text: measurement_text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    reference_text: String,
    measurement_text: String,
    reference_length: usize,
    measurement_length: usize,
    confidence: ConfidenceScore,
    risk_level: RiskLevel,
    risk_bucket: DisplayBucket,
    risk_label: &'static str,
    analysis: AnalysisResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    color_analysis: Option<ColorAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    brightness_analysis: Option<BrightnessAnalysis>,
}

impl Report {
    pub fn reference_text(&self) -> &str {
        &self.reference_text
    }

    pub fn measurement_text(&self) -> &str {
        &self.measurement_text
    }

    pub fn reference_length(&self) -> usize {
        self.reference_length
    }

    pub fn measurement_length(&self) -> usize {
        self.measurement_length
    }

    pub fn confidence(&self) -> ConfidenceScore {
        self.confidence
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    pub fn risk_bucket(&self) -> DisplayBucket {
        self.risk_bucket
    }

    pub fn analysis(&self) -> &AnalysisResult {
        &self.analysis
    }

    pub fn color_analysis(&self) -> Option<&ColorAnalysis> {
        self.color_analysis.as_ref()
    }

    pub fn brightness_analysis(&self) -> Option<&BrightnessAnalysis> {
        self.brightness_analysis.as_ref()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Assembles reports; optional carry-only measurements are attached with the builder methods.
#[derive(Debug, Clone, Default)]
pub struct ReportAssembler {
    color_analysis: Option<ColorAnalysis>,
    brightness_analysis: Option<BrightnessAnalysis>,
}

impl ReportAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_color_analysis(mut self, color: Option<ColorAnalysis>) -> Self {
        self.color_analysis = color;
        self
    }

    pub fn with_brightness_analysis(mut self, brightness: Option<BrightnessAnalysis>) -> Self {
        self.brightness_analysis = brightness;
        self
    }

    pub fn assemble(
        &self,
        comparison: &ComparisonRecord,
        score: ConfidenceScore,
        risk: RiskLevel,
        analysis: &AnalysisResult,
    ) -> Report {
        let bucket = risk.bucket();
        Report {
            reference_length: comparison.reference_text.chars().count(),
            measurement_length: comparison.measurement_text.chars().count(),
            reference_text: comparison.reference_text.clone(),
            measurement_text: comparison.measurement_text.clone(),
            confidence: score,
            risk_level: risk,
            risk_bucket: bucket,
            risk_label: bucket.label(),
            analysis: analysis.clone(),
            color_analysis: self.color_analysis,
            brightness_analysis: self.brightness_analysis,
        }
    }
}
