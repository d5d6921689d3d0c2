use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Comment {
    pub id: Uuid,
    /// Author username.
    pub author: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
}

/// Comment row joined with the author's username.
#[derive(Debug, Clone, FromRow)]
pub struct DbComment {
    pub id: Uuid,
    pub review_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
}

impl From<DbComment> for Comment {
    fn from(value: DbComment) -> Self {
        Comment {
            id: value.id,
            author: value.author_username,
            text: value.text,
            pub_date: value.pub_date,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentCreateRequest {
    #[schema(example = "Agreed, the ending lands.")]
    pub text: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentUpdateRequest {
    pub text: Option<String>,
}
