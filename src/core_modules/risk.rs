// THEORY:
// Risk labels arrive as free strings from the inference collaborator or from a
// stored record. `classify` is a total function from any such string (or its
// absence) onto a display bucket. Unrecognized input is never an error; it
// lands in the neutral bucket.

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl RiskLevel {
    /// Exact, case-sensitive match on `"low"`, `"medium"` and `"high"`.
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("low") => RiskLevel::Low,
            Some("medium") => RiskLevel::Medium,
            Some("high") => RiskLevel::High,
            Some(other) => {
                warn!(label = other, "unrecognized risk label");
                RiskLevel::Unknown
            }
            None => RiskLevel::Unknown,
        }
    }

    pub fn bucket(&self) -> DisplayBucket {
        match self {
            RiskLevel::Low => DisplayBucket::Calm,
            RiskLevel::Medium => DisplayBucket::Caution,
            RiskLevel::High => DisplayBucket::Severe,
            RiskLevel::Unknown => DisplayBucket::Neutral,
        }
    }
}

/// Presentation bucket for a risk label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayBucket {
    Calm,
    Caution,
    Severe,
    Neutral,
}

impl DisplayBucket {
    pub fn label(&self) -> &'static str {
        match self {
            DisplayBucket::Calm => "Low Risk",
            DisplayBucket::Caution => "Medium Risk",
            DisplayBucket::Severe => "High Risk",
            DisplayBucket::Neutral => "Unknown Risk",
        }
    }

    /// Color family used when rendering the bucket.
    pub fn tone(&self) -> &'static str {
        match self {
            DisplayBucket::Calm => "green",
            DisplayBucket::Caution => "yellow",
            DisplayBucket::Severe => "red",
            DisplayBucket::Neutral => "gray",
        }
    }
}

pub fn classify(label: Option<&str>) -> DisplayBucket {
    RiskLevel::from_label(label).bucket()
}
