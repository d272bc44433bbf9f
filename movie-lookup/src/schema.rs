use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Only the first entries of `cast` are ever surfaced.
pub const MAX_TOP_BILLED: usize = 3;

/// Validated outcome of a movie lookup.
///
/// Field names mirror the external service's camelCase response contract.
/// When `found` is false no other field is meaningful and callers must treat
/// the result as a definitive miss, not a partial match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieResult {
    pub found: bool,
    pub title: String,
    pub year: String,
    pub tomatometer: u8,
    pub audience_score: u8,
    pub fresh_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critics_consensus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_description: Option<String>,
    #[serde(default)]
    pub cast: Vec<String>,
}

impl MovieResult {
    /// A definitive miss. Every other field is a default and untrusted.
    pub fn no_match() -> Self {
        Self::default()
    }

    /// Top-billed cast, capped at [`MAX_TOP_BILLED`].
    pub fn top_billed(&self) -> &[String] {
        &self.cast[..self.cast.len().min(MAX_TOP_BILLED)]
    }

    pub fn fresh_tier(&self) -> FreshTier {
        FreshTier::classify(&self.fresh_status)
    }
}

/// Three-tier freshness classification derived from the service's free-text
/// label. The label is trusted as-is and not cross-checked against the
/// numeric tomatometer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FreshTier {
    CertifiedFresh,
    Fresh,
    Rotten,
}

impl FreshTier {
    /// Case-insensitive substring rule: "certified" wins over "fresh",
    /// anything else is rotten.
    pub fn classify(label: &str) -> Self {
        let label = label.to_lowercase();
        if label.contains("certified") {
            FreshTier::CertifiedFresh
        } else if label.contains("fresh") {
            FreshTier::Fresh
        } else {
            FreshTier::Rotten
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FreshTier::CertifiedFresh => "Certified Fresh",
            FreshTier::Fresh => "Fresh",
            FreshTier::Rotten => "Rotten",
        }
    }
}

/// Validate an untrusted service response into a typed [`MovieResult`].
///
/// `found` must be present and boolean. A `found` result must carry a
/// non-blank title. Scores outside 0..=100 are clamped rather than rejected;
/// absent or ill-typed scores degrade to 0. Pure, no I/O.
pub fn validate(raw: &Value) -> Result<MovieResult, ValidationError> {
    let found = raw
        .get("found")
        .and_then(Value::as_bool)
        .ok_or(ValidationError::MissingField("found"))?;

    if !found {
        return Ok(MovieResult::no_match());
    }

    let title = required_string(raw, "title")?;

    Ok(MovieResult {
        found: true,
        title,
        year: string_or_empty(raw, "year"),
        tomatometer: score(raw, "tomatometer"),
        audience_score: score(raw, "audienceScore"),
        fresh_status: string_or_empty(raw, "freshStatus"),
        critics_consensus: optional_string(raw, "criticsConsensus"),
        synopsis: optional_string(raw, "synopsis"),
        director: optional_string(raw, "director"),
        genre: optional_string(raw, "genre"),
        runtime: optional_string(raw, "runtime"),
        poster_description: optional_string(raw, "posterDescription"),
        cast: cast(raw),
    })
}

fn required_string(raw: &Value, key: &'static str) -> Result<String, ValidationError> {
    raw.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(ValidationError::MissingField(key))
}

fn optional_string(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_or_empty(raw: &Value, key: &str) -> String {
    optional_string(raw, key).unwrap_or_default()
}

fn score(raw: &Value, key: &str) -> u8 {
    raw.get(key)
        .and_then(Value::as_f64)
        .map(|v| v.clamp(0.0, 100.0).round() as u8)
        .unwrap_or(0)
}

fn cast(raw: &Value) -> Vec<String> {
    raw.get("cast")
        .and_then(Value::as_array)
        .map(|members| {
            members
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
