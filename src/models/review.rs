use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Review {
    pub id: Uuid,
    /// Author username.
    pub author: String,
    pub text: String,
    #[schema(example = 8)]
    pub score: i64,
    pub pub_date: DateTime<Utc>,
}

/// Review row joined with the author's username.
#[derive(Debug, Clone, FromRow)]
pub struct DbReview {
    pub id: Uuid,
    pub title_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub text: String,
    pub score: i64,
    pub pub_date: DateTime<Utc>,
}

impl From<DbReview> for Review {
    fn from(value: DbReview) -> Self {
        Review {
            id: value.id,
            author: value.author_username,
            text: value.text,
            score: value.score,
            pub_date: value.pub_date,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewCreateRequest {
    #[schema(example = "A slow burn that pays off.")]
    pub text: String,
    #[schema(example = 8)]
    pub score: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewUpdateRequest {
    pub text: Option<String>,
    pub score: Option<i64>,
}
