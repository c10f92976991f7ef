// THEORY:
// The `ConfidenceScorer` turns extracted text and a working surface into a
// single heuristic trust value. It is deliberately simple and fully
// deterministic: no model, no randomness, one linear pass over the pixels.
//
// Score composition:
//   base                              0.30
//   + min(0.30, text_length / 50)     text length, saturates at 50 characters
//   + min(0.20, ink_density * 100)    share of pixels whose red channel is 0
//   + min(0.20, edge_density * 1000)  share of pixels that differ from their
//                                     successor's red channel by more than 100
//   clamped to a 0.95 ceiling
//
// With all three terms saturated the sum is exactly 1.00, which the ceiling
// brings down to 0.95. Empty text, or the "no extractable text" sentinel,
// short-circuits to the 0.10 floor before the surface is read at all.

use crate::config::DEFAULT_NO_TEXT_SENTINEL;
use crate::core_modules::smart_pixel::smart_pixel::SmartPixel;
use crate::core_modules::surface::surface::RasterSurface;
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod weights {
    /// Score for missing or sentinel text.
    pub const FLOOR: f64 = 0.10;
    pub const CEILING: f64 = 0.95;
    pub const BASE: f64 = 0.30;

    pub const TEXT_LENGTH_CAP: f64 = 0.30;
    /// Characters at which the text-length term saturates.
    pub const TEXT_LENGTH_SCALE: f64 = 50.0;

    pub const INK_DENSITY_CAP: f64 = 0.20;
    pub const INK_DENSITY_GAIN: f64 = 100.0;

    pub const EDGE_DENSITY_CAP: f64 = 0.20;
    pub const EDGE_DENSITY_GAIN: f64 = 1000.0;
}

/// A heuristic trust value in `[0.10, 0.95]`.
///
/// Deserialization goes through the same range check as `TryFrom<f64>`, so a
/// stored score can never come back outside the band.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub struct ConfidenceScore(f64);

impl ConfidenceScore {
    pub const FLOOR: ConfidenceScore = ConfidenceScore(weights::FLOOR);

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for ConfidenceScore {
    type Error = AnalysisError;

    fn try_from(value: f64) -> Result<Self> {
        if (weights::FLOOR..=weights::CEILING).contains(&value) {
            Ok(ConfidenceScore(value))
        } else {
            Err(AnalysisError::ScoreOutOfRange(value))
        }
    }
}

impl From<ConfidenceScore> for f64 {
    fn from(score: ConfidenceScore) -> Self {
        score.0
    }
}

/// Counts gathered in the single pass over a surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelStatistics {
    pub ink_pixels: usize,
    pub edge_count: usize,
    pub area: usize,
    pub width: u32,
    pub height: u32,
}

impl PixelStatistics {
    /// One pass: ink is counted per pixel, edges per (pixel, successor) pair.
    pub fn gather(surface: &RasterSurface) -> Self {
        let mut stats = PixelStatistics {
            area: surface.area(),
            width: surface.width(),
            height: surface.height(),
            ..Default::default()
        };
        let mut previous: Option<SmartPixel> = None;
        for pixel in surface.pixels() {
            let current = SmartPixel::new(pixel);
            if current.pixel.is_ink() {
                stats.ink_pixels += 1;
            }
            if let Some(prev) = previous {
                if prev.is_edge_against(&current) {
                    stats.edge_count += 1;
                }
            }
            previous = Some(current);
        }
        stats
    }

    pub fn ink_density(&self) -> Result<f64> {
        Ok(self.ink_pixels as f64 / self.nonzero_area()? as f64)
    }

    pub fn edge_density(&self) -> Result<f64> {
        Ok(self.edge_count as f64 / self.nonzero_area()? as f64)
    }

    fn nonzero_area(&self) -> Result<usize> {
        match self.area {
            0 => Err(AnalysisError::InvalidSurface {
                width: self.width,
                height: self.height,
                len: 0,
            }),
            area => Ok(area),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    no_text_sentinel: String,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(DEFAULT_NO_TEXT_SENTINEL)
    }
}

impl ConfidenceScorer {
    pub fn new(no_text_sentinel: impl Into<String>) -> Self {
        Self {
            no_text_sentinel: no_text_sentinel.into(),
        }
    }

    pub fn is_no_text(&self, extracted_text: &str) -> bool {
        extracted_text.is_empty() || extracted_text == self.no_text_sentinel
    }

    pub fn score(&self, extracted_text: &str, surface: &RasterSurface) -> Result<ConfidenceScore> {
        if self.is_no_text(extracted_text) {
            return Ok(ConfidenceScore::FLOOR);
        }
        if surface.area() == 0 {
            return Err(AnalysisError::InvalidSurface {
                width: surface.width(),
                height: surface.height(),
                len: surface.as_bytes().len(),
            });
        }

        let stats = PixelStatistics::gather(surface);
        let text_length = extracted_text.chars().count();
        let length_term = weights::TEXT_LENGTH_CAP.min(text_length as f64 / weights::TEXT_LENGTH_SCALE);
        let ink_term = weights::INK_DENSITY_CAP.min(stats.ink_density()? * weights::INK_DENSITY_GAIN);
        let edge_term = weights::EDGE_DENSITY_CAP.min(stats.edge_density()? * weights::EDGE_DENSITY_GAIN);
        let total = (weights::BASE + length_term + ink_term + edge_term).min(weights::CEILING);

        debug!(
            text_length,
            ink_pixels = stats.ink_pixels,
            edge_count = stats.edge_count,
            area = stats.area,
            length_term,
            ink_term,
            edge_term,
            total,
            "confidence scored"
        );
        Ok(ConfidenceScore(total))
    }
}
