//! Tolerant extraction of the JSON envelope that models wrap in prose.
//!
//! The parser finds the outermost `{ ... }` span in the raw completion, decodes
//! it strictly, tags every element of `recommendations` with its provenance and
//! silently drops elements that lack a required field. Decoding failures are
//! terminal for the call; the parser never retries.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::models::{BookRecommendation, MealRecommendation};
use crate::services::providers::ProviderKind;

/// Generic provenance tag added to every parsed item
pub const AI_GENERATED_TAG: &str = "AI-Generated";

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("no JSON found in provider response")]
    NoJson,

    #[error("malformed JSON in provider response: {0}")]
    Malformed(String),

    #[error("`recommendations` is not a list")]
    NotAList,
}

/// An item shape the parser can validate and materialize
pub trait RecommendationSchema: DeserializeOwned {
    /// Fields every surviving item must carry (present and non-null)
    const REQUIRED_FIELDS: &'static [&'static str];
}

impl RecommendationSchema for MealRecommendation {
    const REQUIRED_FIELDS: &'static [&'static str] =
        &["name", "description", "prep_time", "difficulty", "servings"];
}

impl RecommendationSchema for BookRecommendation {
    const REQUIRED_FIELDS: &'static [&'static str] = &["title", "author", "genre", "reasoning"];
}

/// Slice from the first `{` to the last `}` and decode it strictly
pub fn extract_json_object(raw: &str) -> Result<Value, ParseError> {
    let start = raw.find('{').ok_or(ParseError::NoJson)?;
    let end = raw.rfind('}').ok_or(ParseError::NoJson)?;
    if end < start {
        return Err(ParseError::NoJson);
    }

    serde_json::from_str(&raw[start..=end]).map_err(|e| ParseError::Malformed(e.to_string()))
}

/// Parse a provider completion into validated, provenance-tagged items.
///
/// An empty result is not an error.
pub fn parse_recommendations<T: RecommendationSchema>(
    raw: &str,
    provider: ProviderKind,
) -> Result<Vec<T>, ParseError> {
    let envelope = extract_json_object(raw)?;

    let elements = match envelope.get("recommendations") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => return Err(ParseError::NotAList),
    };

    let total = elements.len();
    let items: Vec<T> = elements
        .into_iter()
        .enumerate()
        .filter_map(|(index, element)| {
            let Value::Object(mut fields) = element else {
                tracing::debug!(index, "Dropping non-object recommendation");
                return None;
            };

            tag_provenance(&mut fields, provider);

            if let Some(missing) = first_missing_field(&fields, T::REQUIRED_FIELDS) {
                tracing::debug!(index, field = missing, "Dropping recommendation missing required field");
                return None;
            }

            match serde_json::from_value::<T>(Value::Object(fields)) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::debug!(index, error = %e, "Dropping recommendation with invalid field types");
                    None
                }
            }
        })
        .collect();

    if items.len() < total {
        tracing::warn!(
            provider = %provider,
            received = total,
            kept = items.len(),
            "Dropped invalid recommendations"
        );
    }

    Ok(items)
}

fn tag_provenance(fields: &mut Map<String, Value>, provider: ProviderKind) {
    fields.insert("ai_generated".to_string(), Value::Bool(true));
    fields.insert(
        "ai_provider".to_string(),
        Value::String(provider.as_str().to_string()),
    );

    let tags = fields
        .entry("tags")
        .or_insert_with(|| Value::Array(Vec::new()));
    if !tags.is_array() {
        *tags = Value::Array(Vec::new());
    }
    if let Value::Array(tags) = tags {
        tags.push(Value::String(AI_GENERATED_TAG.to_string()));
        tags.push(Value::String(provider.generated_tag().to_string()));
    }
}

fn first_missing_field(fields: &Map<String, Value>, required: &[&'static str]) -> Option<&'static str> {
    required
        .iter()
        .copied()
        .find(|name| matches!(fields.get(*name), None | Some(Value::Null)))
}
