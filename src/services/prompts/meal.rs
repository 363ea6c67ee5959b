use std::fmt::Write;

use super::format_quantity;
use crate::models::{FamilyMemberProfile, PantryItem};

/// Response shape embedded verbatim in every meal prompt
pub const MEAL_RESPONSE_SCHEMA: &str = r#"{
  "recommendations": [
    {
      "name": "string", "description": "string",
      "prep_time": int, "difficulty": "Easy|Medium|Hard", "servings": int,
      "ingredients_needed": [{"name": str, "quantity": str, "unit": str, "have_in_pantry": bool}],
      "instructions": [str, ...], "tags": [str, ...],
      "nutrition_notes": str, "pantry_usage_score": int
    }
  ]
}"#;

/// Per-request overrides on top of stored family preferences
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MealPreferences {
    pub meal_type: Option<String>,
    pub notes: Option<String>,
}

fn render_member(member: &FamilyMemberProfile) -> String {
    let mut parts = vec![match member.age {
        Some(age) => format!("{} ({})", member.name, age),
        None => member.name.clone(),
    }];

    let lists = [
        ("dietary restrictions", &member.dietary_restrictions),
        ("likes", &member.preferences.likes),
        ("dislikes", &member.preferences.dislikes),
        ("preferred cuisines", &member.preferences.preferred_cuisines),
    ];
    for (label, values) in lists {
        if !values.is_empty() {
            parts.push(format!("{}: {}", label, values.join(", ")));
        }
    }

    parts.join(", ")
}

/// Groups pantry lines by category, categories in first-seen order
fn render_inventory(pantry: &[PantryItem]) -> Vec<String> {
    let mut groups: Vec<(&str, Vec<String>)> = Vec::new();

    for item in pantry {
        let entry = format!(
            "{} ({} {})",
            item.ingredient.name,
            format_quantity(item.quantity),
            item.ingredient.unit
        );
        let category = item.ingredient.category.as_str();
        match groups.iter_mut().find(|(c, _)| *c == category) {
            Some((_, items)) => items.push(entry),
            None => groups.push((category, vec![entry])),
        }
    }

    groups
        .into_iter()
        .map(|(category, items)| format!("{}: {}", category, items.join(", ")))
        .collect()
}

/// Renders the meal recommendation prompt.
///
/// Sections always appear in the same order, and the family section is kept
/// even when there are no members.
pub fn build_meal_prompt(
    members: &[FamilyMemberProfile],
    pantry: &[PantryItem],
    preferences: &MealPreferences,
    count: usize,
) -> String {
    let mut prompt = String::new();

    let meal_type = preferences.meal_type.as_deref().unwrap_or("meal");
    let _ = writeln!(
        prompt,
        "You are a helpful family meal planning assistant. Suggest {} {} recipes for the family described below.",
        count, meal_type
    );
    prompt.push('\n');

    prompt.push_str("Family members:\n");
    for (i, member) in members.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}", i + 1, render_member(member));
    }
    prompt.push('\n');

    prompt.push_str("Available pantry inventory:\n");
    for line in render_inventory(pantry) {
        let _ = writeln!(prompt, "{}", line);
    }
    prompt.push('\n');

    if let Some(notes) = preferences.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        let _ = writeln!(prompt, "Additional preferences for this request: {}", notes.trim());
        prompt.push('\n');
    }

    prompt.push_str("Instructions:\n");
    prompt.push_str("- Prioritize dishes that match family members' likes and preferred cuisines.\n");
    prompt.push_str("- Avoid ingredients and dishes that any family member dislikes.\n");
    prompt.push_str("- Strictly respect every dietary restriction listed above.\n");
    prompt.push_str("- Use the available pantry inventory as much as possible and mark which ingredients are already in the pantry.\n");
    prompt.push_str("- Score pantry_usage_score from 0 to 10 by how much of the pantry each recipe uses.\n");
    prompt.push('\n');

    prompt.push_str("Return ONLY valid JSON in exactly this format, with no other text:\n");
    prompt.push_str(MEAL_RESPONSE_SCHEMA);
    prompt.push('\n');

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemberPreferences;

    fn alice() -> FamilyMemberProfile {
        FamilyMemberProfile {
            name: "Alice".to_string(),
            age: Some(34),
            dietary_restrictions: vec!["vegetarian".to_string()],
            preferences: MemberPreferences {
                likes: vec!["pasta".to_string(), "curry".to_string()],
                dislikes: vec!["mushrooms".to_string()],
                preferred_cuisines: vec!["Italian".to_string()],
            },
        }
    }

    #[test]
    fn test_member_line_includes_all_fields() {
        assert_eq!(
            render_member(&alice()),
            "Alice (34), dietary restrictions: vegetarian, likes: pasta, curry, dislikes: mushrooms, preferred cuisines: Italian"
        );
    }

    #[test]
    fn test_member_line_omits_empty_fields() {
        let mut bob = FamilyMemberProfile::new("Bob");
        bob.preferences.dislikes = vec!["olives".to_string()];
        assert_eq!(render_member(&bob), "Bob, dislikes: olives");
    }

    #[test]
    fn test_inventory_grouped_by_category_in_first_seen_order() {
        let pantry = vec![
            PantryItem::new("Rice", "Grain", 2.0, "cup"),
            PantryItem::new("Carrot", "Produce", 3.0, "piece"),
            PantryItem::new("Pasta", "Grain", 0.5, "lb"),
        ];
        assert_eq!(
            render_inventory(&pantry),
            vec![
                "Grain: Rice (2 cup), Pasta (0.5 lb)".to_string(),
                "Produce: Carrot (3 piece)".to_string(),
            ]
        );
    }

    #[test]
    fn test_sections_render_in_order() {
        let prompt = build_meal_prompt(
            &[alice()],
            &[PantryItem::new("Rice", "Grain", 2.0, "cup")],
            &MealPreferences {
                meal_type: Some("dinner".to_string()),
                notes: None,
            },
            3,
        );

        let preamble = prompt.find("Suggest 3 dinner recipes").unwrap();
        let family = prompt.find("Family members:\n1. Alice (34)").unwrap();
        let pantry = prompt.find("Grain: Rice (2 cup)").unwrap();
        let instructions = prompt.find("Strictly respect every dietary restriction").unwrap();
        let closing = prompt.find("Return ONLY valid JSON").unwrap();

        assert!(preamble < family);
        assert!(family < pantry);
        assert!(pantry < instructions);
        assert!(instructions < closing);
        assert!(prompt.contains(MEAL_RESPONSE_SCHEMA));
    }

    #[test]
    fn test_empty_family_keeps_section() {
        let prompt = build_meal_prompt(&[], &[], &MealPreferences::default(), 2);
        assert!(prompt.contains("Family members:\n\nAvailable pantry inventory:\n\n"));
        assert!(prompt.contains("Suggest 2 meal recipes"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let members = vec![alice(), FamilyMemberProfile::new("Sam")];
        let pantry = vec![PantryItem::new("Beans", "Canned", 4.0, "can")];
        let preferences = MealPreferences {
            meal_type: Some("lunch".to_string()),
            notes: Some("something warm".to_string()),
        };

        let first = build_meal_prompt(&members, &pantry, &preferences, 4);
        let second = build_meal_prompt(&members, &pantry, &preferences, 4);
        assert_eq!(first, second);
        assert!(first.contains("Additional preferences for this request: something warm"));
    }
}
