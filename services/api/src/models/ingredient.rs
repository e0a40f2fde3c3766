use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ingredient with its measurement unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

/// Create (all fields) or patch (any subset) an ingredient
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IngredientRequest {
    pub name: Option<String>,
    pub measurement_unit: Option<String>,
}

/// Ingredient search
#[derive(Debug, Default, Deserialize)]
pub struct IngredientQuery {
    /// Case-insensitive name prefix
    pub name: Option<String>,
}
