use serde::{Deserialize, Deserializer, Serialize};

use super::lenient;
use crate::services::providers::ProviderKind;

fn default_count() -> usize {
    3
}

/// Request for AI meal suggestions
#[derive(Debug, Clone, Deserialize)]
pub struct MealRecommendationRequest {
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default)]
    pub meal_type: Option<String>,
    /// Free-form wishes that override the stored family preferences
    #[serde(default)]
    pub preferences: Option<String>,
    pub provider: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Difficulty {
    #[serde(alias = "easy", alias = "EASY")]
    Easy,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "hard", alias = "HARD")]
    Hard,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngredientNeeded {
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub quantity: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub have_in_pantry: bool,
}

/// One validated meal suggestion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealRecommendation {
    pub name: String,
    pub description: String,
    #[serde(deserialize_with = "lenient::count")]
    pub prep_time: u32,
    pub difficulty: Difficulty,
    #[serde(deserialize_with = "lenient::count")]
    pub servings: u32,
    #[serde(default)]
    pub ingredients_needed: Vec<IngredientNeeded>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub nutrition_notes: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_count")]
    pub pantry_usage_score: Option<u32>,
    pub ai_generated: bool,
    pub ai_provider: ProviderKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealRecommendationResponse {
    pub recommendations: Vec<MealRecommendation>,
    pub total_recommendations: usize,
    /// Which household signals shaped the request
    pub summary: String,
    pub provider: ProviderKind,
}

/// Models write quantities as `2`, `"2"` or `"1/2"`; keep them as display text
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
