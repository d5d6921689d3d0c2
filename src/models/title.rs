use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::category::Category;
use super::genre::Genre;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Title {
    pub id: Uuid,
    #[schema(example = "Dune")]
    pub name: String,
    #[schema(example = 1965)]
    pub year: i64,
    /// Rounded average review score, absent until the first review lands.
    pub rating: Option<i64>,
    pub description: Option<String>,
    pub genre: Vec<Genre>,
    pub category: Option<Category>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTitle {
    pub id: Uuid,
    pub name: String,
    pub year: i64,
    pub description: Option<String>,
    pub category_slug: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TitleCreateRequest {
    #[schema(example = "Dune")]
    pub name: String,
    #[schema(example = 1965)]
    pub year: i64,
    pub description: Option<String>,
    /// Genre slugs; every slug must already exist.
    #[serde(default)]
    pub genre: Vec<String>,
    /// Category slug; must already exist when given.
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TitleUpdateRequest {
    pub name: Option<String>,
    pub year: Option<i64>,
    pub description: Option<String>,
    pub genre: Option<Vec<String>>,
    pub category: Option<String>,
}
