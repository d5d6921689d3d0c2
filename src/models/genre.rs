use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Genre {
    #[schema(example = "Rock")]
    pub name: String,
    #[schema(example = "rock")]
    pub slug: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbGenre {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl From<DbGenre> for Genre {
    fn from(value: DbGenre) -> Self {
        Genre {
            name: value.name,
            slug: value.slug,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenreCreateRequest {
    #[schema(example = "Rock")]
    pub name: String,
    #[schema(example = "rock")]
    pub slug: String,
}
