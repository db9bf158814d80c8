//! Report, verification and score models
//!
//! Verification and score values originate from a language model and are
//! treated as untrusted text: every enum, percentage and sub-score is checked
//! while deserializing so a value that escapes its documented range never
//! reaches persistence.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

// ============================================================================
// Report
// ============================================================================

/// Photo attached to a report
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    /// MIME type declared by the client (or sniffed from the bytes)
    pub content_type: String,
    /// Client-side file name, kept on the report record
    pub file_name: Option<String>,
}

impl ImageUpload {
    /// File extension used when storing the image
    pub fn extension(&self) -> &'static str {
        extension_for_content_type(&self.content_type)
    }
}

/// Map a MIME type to the extension used for stored images
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    match content_type.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/heic" => "heic",
        "image/heif" => "heif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        _ => "bin",
    }
}

/// Inverse of [`extension_for_content_type`] for serving stored images
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "bmp" => "image/bmp",
        "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// One citizen-submitted observation
///
/// Built once per upload and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Submitter identifier
    pub uid: String,
    pub category: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub image: ImageUpload,
}

// ============================================================================
// Verification
// ============================================================================

/// Percentage in 0..=100, written as `"85%"`
///
/// Accepts `"85%"`, `"85"` or a bare number when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "PercentageRepr", into = "String")]
pub struct Percentage(u8);

impl Percentage {
    pub fn new(value: u8) -> Option<Self> {
        (value <= 100).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    fn from_f64(value: f64) -> Result<Self, String> {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(format!("percentage {} is outside 0..=100", value));
        }
        Ok(Self(value.round() as u8))
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl FromStr for Percentage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
        let value = number
            .parse::<f64>()
            .map_err(|_| format!("invalid percentage: {:?}", s))?;
        Self::from_f64(value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PercentageRepr {
    Number(f64),
    Text(String),
}

impl TryFrom<PercentageRepr> for Percentage {
    type Error = String;

    fn try_from(repr: PercentageRepr) -> Result<Self, Self::Error> {
        match repr {
            PercentageRepr::Number(n) => Self::from_f64(n),
            PercentageRepr::Text(s) => s.parse(),
        }
    }
}

impl From<Percentage> for String {
    fn from(p: Percentage) -> Self {
        p.to_string()
    }
}

/// Whether the coordinates sit in or near a known mangrove region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LocationVerification {
    Verified,
    NotInMangroveRegion,
    Unclear,
}

impl LocationVerification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "Verified",
            Self::NotInMangroveRegion => "Not in Mangrove Region",
            Self::Unclear => "Unclear",
        }
    }
}

impl FromStr for LocationVerification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "verified" | "location verified" => Ok(Self::Verified),
            "not in mangrove region" => Ok(Self::NotInMangroveRegion),
            "unclear" => Ok(Self::Unclear),
            _ => Err(format!("unknown location_verification value: {:?}", s)),
        }
    }
}

/// Whether the photo matches the stated category and description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ImageCategoryVerification {
    Consistent,
    Inconsistent,
    Unclear,
}

impl ImageCategoryVerification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consistent => "Consistent",
            Self::Inconsistent => "Inconsistent",
            Self::Unclear => "Unclear",
        }
    }
}

impl FromStr for ImageCategoryVerification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "consistent" => Ok(Self::Consistent),
            "inconsistent" => Ok(Self::Inconsistent),
            "unclear" => Ok(Self::Unclear),
            _ => Err(format!("unknown image_category_verification value: {:?}", s)),
        }
    }
}

macro_rules! string_enum_conversions {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl TryFrom<String> for $ty {
            type Error = String;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$ty> for String {
            fn from(v: $ty) -> Self {
                v.as_str().to_string()
            }
        }
    };
}

string_enum_conversions!(LocationVerification);
string_enum_conversions!(ImageCategoryVerification);

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Model judgment of location plausibility and photo/category consistency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub location_verification: LocationVerification,
    pub location_confidence: Percentage,
    pub image_category_verification: ImageCategoryVerification,
    pub category_confidence: Percentage,
    #[serde(default)]
    pub location_remarks: String,
    #[serde(default)]
    pub category_remarks: String,
}

// ============================================================================
// Scoring
// ============================================================================

pub const IMAGE_SCORE_RANGE: RangeInclusive<i64> = 0..=50;
pub const DESCRIPTION_SCORE_RANGE: RangeInclusive<i64> = 0..=20;
pub const CATEGORY_SCORE_RANGE: RangeInclusive<i64> = 0..=10;
pub const GEO_SCORE_RANGE: RangeInclusive<i64> = 0..=10;
pub const BONUS_RANGE: RangeInclusive<i64> = -10..=10;

/// A sub-score outside its rubric range
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} = {value} is outside the rubric range {min}..={max}")]
pub struct RubricViolation {
    pub field: &'static str,
    pub value: i64,
    pub min: i64,
    pub max: i64,
}

/// Score object as returned by the model, before rubric checks
#[derive(Debug, Clone, Deserialize)]
pub struct ModelScore {
    #[serde(alias = "image_match_score", deserialize_with = "whole_number")]
    pub image_score: i64,
    #[serde(alias = "description_quality_score", deserialize_with = "whole_number")]
    pub description_score: i64,
    #[serde(alias = "category_correctness_score", deserialize_with = "whole_number")]
    pub category_score: i64,
    #[serde(alias = "geo_tag_confidence_score", alias = "geo_tag_score", deserialize_with = "whole_number")]
    pub geo_score: i64,
    #[serde(alias = "bonus_adjustment", alias = "bonus_score", deserialize_with = "whole_number")]
    pub bonus: i64,
    #[serde(default, deserialize_with = "optional_whole_number")]
    pub total_score: Option<i64>,
    #[serde(default)]
    pub remarks: String,
}

impl ModelScore {
    /// Check every sub-score against the rubric and derive the total
    ///
    /// The total is always the sum of the sub-scores; a disagreeing model
    /// total is logged and discarded.
    pub fn into_score(self) -> Result<ScoreResult, RubricViolation> {
        check_range("image_score", self.image_score, &IMAGE_SCORE_RANGE)?;
        check_range("description_score", self.description_score, &DESCRIPTION_SCORE_RANGE)?;
        check_range("category_score", self.category_score, &CATEGORY_SCORE_RANGE)?;
        check_range("geo_score", self.geo_score, &GEO_SCORE_RANGE)?;
        check_range("bonus", self.bonus, &BONUS_RANGE)?;

        let total_score = self.image_score
            + self.description_score
            + self.category_score
            + self.geo_score
            + self.bonus;

        if let Some(reported) = self.total_score {
            if reported != total_score {
                warn!(
                    reported,
                    computed = total_score,
                    "Model total_score disagrees with sub-scores; using the sum"
                );
            }
        }

        Ok(ScoreResult {
            image_score: self.image_score,
            description_score: self.description_score,
            category_score: self.category_score,
            geo_score: self.geo_score,
            bonus: self.bonus,
            total_score,
            remarks: self.remarks,
        })
    }
}

fn check_range(
    field: &'static str,
    value: i64,
    range: &RangeInclusive<i64>,
) -> Result<(), RubricViolation> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(RubricViolation {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

/// Gamification score for a verified report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub image_score: i64,
    pub description_score: i64,
    pub category_score: i64,
    pub geo_score: i64,
    pub bonus: i64,
    /// Sum of the five sub-scores, in -10..=100
    pub total_score: i64,
    pub remarks: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberRepr {
    Int(i64),
    Float(f64),
    Text(String),
}

impl NumberRepr {
    fn into_whole<E: serde::de::Error>(self) -> Result<i64, E> {
        match self {
            NumberRepr::Int(n) => Ok(n),
            NumberRepr::Float(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i64),
            NumberRepr::Float(f) => Err(E::custom(format!("expected a whole number, got {}", f))),
            NumberRepr::Text(s) => s
                .trim()
                .trim_start_matches('+')
                .parse::<i64>()
                .map_err(|_| E::custom(format!("expected a whole number, got {:?}", s))),
        }
    }
}

fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    NumberRepr::deserialize(deserializer)?.into_whole()
}

fn optional_whole_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    match Option::<NumberRepr>::deserialize(deserializer)? {
        Some(repr) => repr.into_whole().map(Some),
        None => Ok(None),
    }
}

// ============================================================================
// Failures
// ============================================================================

/// Analysis fault surfaced as data: `{"error": ..., "details": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{error}: {details}")]
pub struct AnalysisFailure {
    /// Generic, client-facing message
    pub error: String,
    /// Description of the underlying fault
    pub details: String,
}

impl AnalysisFailure {
    pub fn new(error: impl Into<String>, details: impl ToString) -> Self {
        Self {
            error: error.into(),
            details: details.to_string(),
        }
    }
}
