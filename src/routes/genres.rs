use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{can_access_collection, Action, ResourceKind, Subject};
use crate::errors::{AppError, AppResult};
use crate::models::genre::{DbGenre, Genre, GenreCreateRequest};
use crate::utils::utc_now;
use crate::validation::{validate_name, validate_slug};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GenreSearchQuery {
    /// Name substring filter.
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/genres",
    tag = "Genres",
    params(GenreSearchQuery),
    responses((status = 200, description = "List genres", body = [Genre]))
)]
pub async fn list_genres(
    State(state): State<AppState>,
    subject: Subject,
    Query(query): Query<GenreSearchQuery>,
) -> AppResult<Json<Vec<Genre>>> {
    if !can_access_collection(&subject, Action::Read, ResourceKind::Genre) {
        return Err(AppError::forbidden("cannot list genres"));
    }

    let genres = match query.search {
        Some(term) => {
            sqlx::query_as::<_, DbGenre>(
                "SELECT id, name, slug, created_at FROM genres WHERE name LIKE ? ORDER BY slug",
            )
            .bind(format!("%{}%", term))
            .fetch_all(&state.pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, DbGenre>("SELECT id, name, slug, created_at FROM genres ORDER BY slug")
                .fetch_all(&state.pool)
                .await?
        }
    };

    Ok(Json(genres.into_iter().map(Genre::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/genres",
    tag = "Genres",
    request_body = GenreCreateRequest,
    responses(
        (status = 201, description = "Genre created", body = Genre),
        (status = 400, description = "Invalid or duplicate slug"),
        (status = 403, description = "Not an administrator")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_genre(
    State(state): State<AppState>,
    subject: Subject,
    Json(payload): Json<GenreCreateRequest>,
) -> AppResult<(StatusCode, Json<Genre>)> {
    if !can_access_collection(&subject, Action::Create, ResourceKind::Genre) {
        return Err(AppError::forbidden("administrator role required"));
    }
    validate_name(&payload.name)?;
    validate_slug(&payload.slug)?;
    ensure_genre_slug_available(&state.pool, &payload.slug).await?;

    sqlx::query("INSERT INTO genres (id, name, slug, created_at) VALUES (?, ?, ?, ?)")
        .bind(Uuid::new_v4())
        .bind(&payload.name)
        .bind(&payload.slug)
        .bind(utc_now())
        .execute(&state.pool)
        .await?;

    let genre = Genre {
        name: payload.name,
        slug: payload.slug,
    };

    Ok((StatusCode::CREATED, Json(genre)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/genres/{slug}",
    tag = "Genres",
    params(("slug" = String, Path, description = "Genre slug")),
    responses(
        (status = 204, description = "Genre deleted"),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "Unknown slug")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_genre(
    State(state): State<AppState>,
    subject: Subject,
    Path(slug): Path<String>,
) -> AppResult<StatusCode> {
    if !can_access_collection(&subject, Action::Delete, ResourceKind::Genre) {
        return Err(AppError::forbidden("administrator role required"));
    }

    let affected = sqlx::query("DELETE FROM genres WHERE slug = ?")
        .bind(&slug)
        .execute(&state.pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("genre not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_genre_slug_available(pool: &SqlitePool, slug: &str) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM genres WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Err(AppError::validation("slug already in use"));
    }

    Ok(())
}
