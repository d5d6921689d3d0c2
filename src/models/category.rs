use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Category {
    #[schema(example = "Movies")]
    pub name: String,
    #[schema(example = "movies")]
    pub slug: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbCategory {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl From<DbCategory> for Category {
    fn from(value: DbCategory) -> Self {
        Category {
            name: value.name,
            slug: value.slug,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryCreateRequest {
    #[schema(example = "Movies")]
    pub name: String,
    #[schema(example = "movies")]
    pub slug: String,
}
