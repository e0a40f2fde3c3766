use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recipe tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

/// Create (all fields) or patch (any subset) a tag
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TagRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
}
