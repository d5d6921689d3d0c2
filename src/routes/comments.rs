use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{can_access_collection, can_access_object, Action, ResourceKind, Subject};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::comment::{Comment, CommentCreateRequest, CommentUpdateRequest, DbComment};
use crate::routes::reviews::fetch_review;
use crate::utils::utc_now;

const COMMENT_COLUMNS: &str = "c.id, c.review_id, c.author_id, u.username AS author_username, c.text, c.pub_date";

#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments",
    tag = "Comments",
    params(
        ("title_id" = Uuid, Path, description = "Title id"),
        ("review_id" = Uuid, Path, description = "Review id")
    ),
    responses(
        (status = 200, description = "List comments for a review", body = [Comment]),
        (status = 404, description = "Unknown title or review")
    )
)]
pub async fn list_comments(
    State(state): State<AppState>,
    subject: Subject,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Vec<Comment>>> {
    let _ = fetch_review(&state.pool, title_id, review_id).await?;

    if !can_access_collection(&subject, Action::Read, ResourceKind::Comment) {
        return Err(AppError::forbidden("cannot list comments"));
    }

    let comments = sqlx::query_as::<_, DbComment>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments c INNER JOIN users u ON u.id = c.author_id \
         WHERE c.review_id = ? ORDER BY c.pub_date DESC"
    ))
    .bind(review_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(comments.into_iter().map(Comment::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments",
    tag = "Comments",
    params(
        ("title_id" = Uuid, Path, description = "Title id"),
        ("review_id" = Uuid, Path, description = "Review id")
    ),
    request_body = CommentCreateRequest,
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 403, description = "Authentication required"),
        (status = 404, description = "Unknown title or review")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CommentCreateRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    if !can_access_collection(&auth.subject(), Action::Create, ResourceKind::Comment) {
        return Err(AppError::forbidden("cannot create comments"));
    }

    let _ = fetch_review(&state.pool, title_id, review_id).await?;

    let comment_id = Uuid::new_v4();
    sqlx::query("INSERT INTO comments (id, review_id, author_id, text, pub_date) VALUES (?, ?, ?, ?, ?)")
        .bind(comment_id)
        .bind(review_id)
        .bind(auth.id)
        .bind(&payload.text)
        .bind(utc_now())
        .execute(&state.pool)
        .await?;

    let comment = fetch_comment(&state.pool, review_id, comment_id).await?;

    Ok((StatusCode::CREATED, Json(comment.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
    tag = "Comments",
    params(
        ("title_id" = Uuid, Path, description = "Title id"),
        ("review_id" = Uuid, Path, description = "Review id"),
        ("comment_id" = Uuid, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Comment detail", body = Comment),
        (status = 404, description = "Unknown title, review, or comment")
    )
)]
pub async fn get_comment(
    State(state): State<AppState>,
    subject: Subject,
    Path((title_id, review_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
) -> AppResult<Json<Comment>> {
    let _ = fetch_review(&state.pool, title_id, review_id).await?;
    let comment = fetch_comment(&state.pool, review_id, comment_id).await?;

    if !can_access_object(&subject, Action::Read, Some(comment.author_id)) {
        return Err(AppError::forbidden("cannot read this comment"));
    }

    Ok(Json(comment.into()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
    tag = "Comments",
    params(
        ("title_id" = Uuid, Path, description = "Title id"),
        ("review_id" = Uuid, Path, description = "Review id"),
        ("comment_id" = Uuid, Path, description = "Comment id")
    ),
    request_body = CommentUpdateRequest,
    responses(
        (status = 200, description = "Comment updated", body = Comment),
        (status = 403, description = "Not the author, a moderator, or an administrator"),
        (status = 404, description = "Unknown title, review, or comment")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_comment(
    State(state): State<AppState>,
    subject: Subject,
    Path((title_id, review_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(payload): Json<CommentUpdateRequest>,
) -> AppResult<Json<Comment>> {
    let _ = fetch_review(&state.pool, title_id, review_id).await?;
    let mut comment = fetch_comment(&state.pool, review_id, comment_id).await?;

    if !can_access_object(&subject, Action::Update, Some(comment.author_id)) {
        return Err(AppError::forbidden("cannot modify this comment"));
    }

    if let Some(text) = payload.text {
        comment.text = text;
    }

    sqlx::query("UPDATE comments SET text = ? WHERE id = ?")
        .bind(&comment.text)
        .bind(comment_id)
        .execute(&state.pool)
        .await?;

    Ok(Json(comment.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
    tag = "Comments",
    params(
        ("title_id" = Uuid, Path, description = "Title id"),
        ("review_id" = Uuid, Path, description = "Review id"),
        ("comment_id" = Uuid, Path, description = "Comment id")
    ),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Not the author, a moderator, or an administrator"),
        (status = 404, description = "Unknown title, review, or comment")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    subject: Subject,
    Path((title_id, review_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let _ = fetch_review(&state.pool, title_id, review_id).await?;
    let comment = fetch_comment(&state.pool, review_id, comment_id).await?;

    if !can_access_object(&subject, Action::Delete, Some(comment.author_id)) {
        return Err(AppError::forbidden("cannot delete this comment"));
    }

    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(comment_id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_comment(pool: &SqlitePool, review_id: Uuid, comment_id: Uuid) -> AppResult<DbComment> {
    sqlx::query_as::<_, DbComment>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments c INNER JOIN users u ON u.id = c.author_id \
         WHERE c.id = ? AND c.review_id = ?"
    ))
    .bind(comment_id)
    .bind(review_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("comment not found"))
}
