use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{can_access_collection, can_access_object, Action, ResourceKind, Subject};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::review::{DbReview, Review, ReviewCreateRequest, ReviewUpdateRequest};
use crate::routes::titles::fetch_title;
use crate::utils::utc_now;
use crate::validation::validate_score;

const REVIEW_COLUMNS: &str = "r.id, r.title_id, r.author_id, u.username AS author_username, r.text, r.score, r.pub_date";

#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews",
    tag = "Reviews",
    params(("title_id" = Uuid, Path, description = "Title id")),
    responses(
        (status = 200, description = "List reviews for a title", body = [Review]),
        (status = 404, description = "Unknown title")
    )
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    subject: Subject,
    Path(title_id): Path<Uuid>,
) -> AppResult<Json<Vec<Review>>> {
    let _ = fetch_title(&state.pool, title_id).await?;

    if !can_access_collection(&subject, Action::Read, ResourceKind::Review) {
        return Err(AppError::forbidden("cannot list reviews"));
    }

    let reviews = sqlx::query_as::<_, DbReview>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews r INNER JOIN users u ON u.id = r.author_id \
         WHERE r.title_id = ? ORDER BY r.pub_date DESC"
    ))
    .bind(title_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(reviews.into_iter().map(Review::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/titles/{title_id}/reviews",
    tag = "Reviews",
    params(("title_id" = Uuid, Path, description = "Title id")),
    request_body = ReviewCreateRequest,
    responses(
        (status = 201, description = "Review created", body = Review),
        (status = 400, description = "Score out of range or a review already exists"),
        (status = 403, description = "Authentication required"),
        (status = 404, description = "Unknown title")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_review(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(title_id): Path<Uuid>,
    Json(payload): Json<ReviewCreateRequest>,
) -> AppResult<(StatusCode, Json<Review>)> {
    if !can_access_collection(&auth.subject(), Action::Create, ResourceKind::Review) {
        return Err(AppError::forbidden("cannot create reviews"));
    }

    let _ = fetch_title(&state.pool, title_id).await?;
    validate_score(payload.score)?;

    // Fast path for a friendly error; the UNIQUE constraint on
    // (title_id, author_id) is what actually closes the race.
    ensure_single_review(&state.pool, title_id, auth.id).await?;

    let review_id = Uuid::new_v4();
    sqlx::query("INSERT INTO reviews (id, title_id, author_id, text, score, pub_date) VALUES (?, ?, ?, ?, ?, ?)")
        .bind(review_id)
        .bind(title_id)
        .bind(auth.id)
        .bind(&payload.text)
        .bind(payload.score)
        .bind(utc_now())
        .execute(&state.pool)
        .await
        .map_err(AppError::review_insert)?;

    let review = fetch_review(&state.pool, title_id, review_id).await?;

    Ok((StatusCode::CREATED, Json(review.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}",
    tag = "Reviews",
    params(
        ("title_id" = Uuid, Path, description = "Title id"),
        ("review_id" = Uuid, Path, description = "Review id")
    ),
    responses(
        (status = 200, description = "Review detail", body = Review),
        (status = 404, description = "Unknown title or review")
    )
)]
pub async fn get_review(
    State(state): State<AppState>,
    subject: Subject,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Review>> {
    let review = fetch_review(&state.pool, title_id, review_id).await?;

    if !can_access_object(&subject, Action::Read, Some(review.author_id)) {
        return Err(AppError::forbidden("cannot read this review"));
    }

    Ok(Json(review.into()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}",
    tag = "Reviews",
    params(
        ("title_id" = Uuid, Path, description = "Title id"),
        ("review_id" = Uuid, Path, description = "Review id")
    ),
    request_body = ReviewUpdateRequest,
    responses(
        (status = 200, description = "Review updated", body = Review),
        (status = 403, description = "Not the author, a moderator, or an administrator"),
        (status = 404, description = "Unknown title or review")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_review(
    State(state): State<AppState>,
    subject: Subject,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ReviewUpdateRequest>,
) -> AppResult<Json<Review>> {
    let mut review = fetch_review(&state.pool, title_id, review_id).await?;

    if !can_access_object(&subject, Action::Update, Some(review.author_id)) {
        return Err(AppError::forbidden("cannot modify this review"));
    }

    if let Some(text) = payload.text {
        review.text = text;
    }
    if let Some(score) = payload.score {
        validate_score(score)?;
        review.score = score;
    }

    sqlx::query("UPDATE reviews SET text = ?, score = ? WHERE id = ?")
        .bind(&review.text)
        .bind(review.score)
        .bind(review_id)
        .execute(&state.pool)
        .await?;

    Ok(Json(review.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}",
    tag = "Reviews",
    params(
        ("title_id" = Uuid, Path, description = "Title id"),
        ("review_id" = Uuid, Path, description = "Review id")
    ),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 403, description = "Not the author, a moderator, or an administrator"),
        (status = 404, description = "Unknown title or review")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_review(
    State(state): State<AppState>,
    subject: Subject,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let review = fetch_review(&state.pool, title_id, review_id).await?;

    if !can_access_object(&subject, Action::Delete, Some(review.author_id)) {
        return Err(AppError::forbidden("cannot delete this review"));
    }

    sqlx::query("DELETE FROM reviews WHERE id = ?")
        .bind(review_id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// One review per user per title.
async fn ensure_single_review(pool: &SqlitePool, title_id: Uuid, author_id: Uuid) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM reviews WHERE title_id = ? AND author_id = ?")
        .bind(title_id)
        .bind(author_id)
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Err(AppError::DuplicateReview);
    }

    Ok(())
}

pub(crate) async fn fetch_review(pool: &SqlitePool, title_id: Uuid, review_id: Uuid) -> AppResult<DbReview> {
    sqlx::query_as::<_, DbReview>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews r INNER JOIN users u ON u.id = r.author_id \
         WHERE r.id = ? AND r.title_id = ?"
    ))
    .bind(review_id)
    .bind(title_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("review not found"))
}
