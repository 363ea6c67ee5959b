use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Likes, dislikes and cuisines for one family member
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MemberPreferences {
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
    #[serde(default)]
    pub preferred_cuisines: Vec<String>,
}

/// A family member as seen by the recommendation pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FamilyMemberProfile {
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub preferences: MemberPreferences,
}

impl FamilyMemberProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age: None,
            dietary_restrictions: Vec::new(),
            preferences: MemberPreferences::default(),
        }
    }
}

/// Ingredient definition referenced by a pantry entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub name: String,
    pub category: String,
    pub unit: String,
}

/// One line of the pantry snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PantryItem {
    pub ingredient: Ingredient,
    pub quantity: f64,
}

impl PantryItem {
    pub fn new(name: &str, category: &str, quantity: f64, unit: &str) -> Self {
        Self {
            ingredient: Ingredient {
                name: name.to_string(),
                category: category.to_string(),
                unit: unit.to_string(),
            },
            quantity,
        }
    }
}

/// Authenticated caller, supplied by the upstream auth gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
    pub is_admin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_deserializes_with_partial_preferences() {
        let json = r#"{
            "name": "Alice",
            "dietary_restrictions": ["vegetarian"],
            "preferences": {"dislikes": ["mushrooms"]}
        }"#;

        let member: FamilyMemberProfile = serde_json::from_str(json).unwrap();
        assert_eq!(member.name, "Alice");
        assert_eq!(member.age, None);
        assert_eq!(member.preferences.dislikes, vec!["mushrooms"]);
        assert!(member.preferences.likes.is_empty());
    }

    #[test]
    fn test_pantry_item_shape() {
        let json = r#"{"ingredient": {"name": "Rice", "category": "Grain", "unit": "cup"}, "quantity": 2}"#;
        let item: PantryItem = serde_json::from_str(json).unwrap();
        assert_eq!(item, PantryItem::new("Rice", "Grain", 2.0, "cup"));
    }
}
