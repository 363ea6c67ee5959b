//! Meal recommendation flow.
//!
//! Every failure is surfaced to the caller. Fallback recipes are disabled: when
//! the provider or the parser fails, no locally invented content is returned.

use std::sync::Arc;

use uuid::Uuid;

use crate::db::HouseholdStore;
use crate::error::{AppError, AppResult};
use crate::models::{
    FamilyMemberProfile, MealRecommendation, MealRecommendationRequest, MealRecommendationResponse,
    PantryItem,
};
use crate::services::parser::parse_recommendations;
use crate::services::prompts::{build_meal_prompt, MealPreferences};
use crate::services::providers::{ProviderRegistry, SendOptions};

pub const MAX_MEAL_COUNT: usize = 10;

/// One to three sentences on the members, restrictions and pantry behind a request
pub fn summarize_household(members: &[FamilyMemberProfile], pantry: &[PantryItem]) -> String {
    let mut sentences = Vec::new();

    match members {
        [] => sentences.push("No family profiles on file, so these are general suggestions.".to_string()),
        [one] => sentences.push(format!("Planned for {}.", one.name)),
        [first, second] => sentences.push(format!("Planned for {} and {}.", first.name, second.name)),
        _ => sentences.push(format!("Planned for {} family members.", members.len())),
    }

    let mut restrictions: Vec<&str> = Vec::new();
    for restriction in members.iter().flat_map(|m| m.dietary_restrictions.iter()) {
        let restriction = restriction.trim();
        if !restriction.is_empty()
            && !restrictions.iter().any(|r| r.eq_ignore_ascii_case(restriction))
        {
            restrictions.push(restriction);
        }
    }
    if !restrictions.is_empty() {
        sentences.push(format!("Respects {} diets.", restrictions.join(", ")));
    }

    match pantry.len() {
        0 => sentences.push("Your pantry is empty, so every ingredient will need buying.".to_string()),
        1 => sentences.push("Draws on the 1 item in your pantry.".to_string()),
        n => sentences.push(format!("Draws on the {} items in your pantry.", n)),
    }

    sentences.join(" ")
}

#[derive(Clone)]
pub struct MealRecommender {
    household: Arc<dyn HouseholdStore>,
    providers: ProviderRegistry,
}

impl MealRecommender {
    pub fn new(household: Arc<dyn HouseholdStore>, providers: ProviderRegistry) -> Self {
        Self {
            household,
            providers,
        }
    }

    pub async fn get_recommendations(
        &self,
        user_id: Uuid,
        request: &MealRecommendationRequest,
    ) -> AppResult<MealRecommendationResponse> {
        if request.count == 0 || request.count > MAX_MEAL_COUNT {
            return Err(AppError::InvalidInput(format!(
                "count must be between 1 and {}",
                MAX_MEAL_COUNT
            )));
        }

        let provider = self.providers.resolve(&request.provider)?;
        let kind = provider.kind();

        let members = self.household.family_members(user_id).await?;
        let pantry = self.household.pantry(user_id).await?;

        let prompt = build_meal_prompt(
            &members,
            &pantry,
            &MealPreferences {
                meal_type: request.meal_type.clone(),
                notes: request.preferences.clone(),
            },
            request.count,
        );

        tracing::info!(
            user_id = %user_id,
            provider = %kind,
            members = members.len(),
            pantry_items = pantry.len(),
            count = request.count,
            "Requesting meal recommendations"
        );

        let raw = provider
            .send(&prompt, SendOptions::default())
            .await
            .map_err(|e| AppError::provider_call(kind, e))?;

        tracing::debug!(provider = %kind, response = %raw, "Raw provider response");

        let mut recommendations: Vec<MealRecommendation> = parse_recommendations(&raw, kind)?;
        recommendations.truncate(request.count);

        tracing::info!(
            user_id = %user_id,
            provider = %kind,
            count = recommendations.len(),
            "Meal recommendations ready"
        );

        Ok(MealRecommendationResponse {
            total_recommendations: recommendations.len(),
            recommendations,
            summary: summarize_household(&members, &pantry),
            provider: kind,
        })
    }
}
