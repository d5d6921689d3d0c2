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
use crate::models::category::{Category, CategoryCreateRequest, DbCategory};
use crate::utils::utc_now;
use crate::validation::{validate_name, validate_slug};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CategorySearchQuery {
    /// Name substring filter.
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "Categories",
    params(CategorySearchQuery),
    responses((status = 200, description = "List categories", body = [Category]))
)]
pub async fn list_categories(
    State(state): State<AppState>,
    subject: Subject,
    Query(query): Query<CategorySearchQuery>,
) -> AppResult<Json<Vec<Category>>> {
    if !can_access_collection(&subject, Action::Read, ResourceKind::Category) {
        return Err(AppError::forbidden("cannot list categories"));
    }

    let categories = match query.search {
        Some(term) => {
            sqlx::query_as::<_, DbCategory>(
                "SELECT id, name, slug, created_at FROM categories WHERE name LIKE ? ORDER BY slug",
            )
            .bind(format!("%{}%", term))
            .fetch_all(&state.pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, DbCategory>("SELECT id, name, slug, created_at FROM categories ORDER BY slug")
                .fetch_all(&state.pool)
                .await?
        }
    };

    Ok(Json(categories.into_iter().map(Category::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    tag = "Categories",
    request_body = CategoryCreateRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Invalid or duplicate slug"),
        (status = 403, description = "Not an administrator")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_category(
    State(state): State<AppState>,
    subject: Subject,
    Json(payload): Json<CategoryCreateRequest>,
) -> AppResult<(StatusCode, Json<Category>)> {
    if !can_access_collection(&subject, Action::Create, ResourceKind::Category) {
        return Err(AppError::forbidden("administrator role required"));
    }
    validate_name(&payload.name)?;
    validate_slug(&payload.slug)?;
    ensure_category_slug_available(&state.pool, &payload.slug).await?;

    sqlx::query("INSERT INTO categories (id, name, slug, created_at) VALUES (?, ?, ?, ?)")
        .bind(Uuid::new_v4())
        .bind(&payload.name)
        .bind(&payload.slug)
        .bind(utc_now())
        .execute(&state.pool)
        .await?;

    let category = Category {
        name: payload.name,
        slug: payload.slug,
    };

    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/categories/{slug}",
    tag = "Categories",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "Unknown slug")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_category(
    State(state): State<AppState>,
    subject: Subject,
    Path(slug): Path<String>,
) -> AppResult<StatusCode> {
    if !can_access_collection(&subject, Action::Delete, ResourceKind::Category) {
        return Err(AppError::forbidden("administrator role required"));
    }

    let affected = sqlx::query("DELETE FROM categories WHERE slug = ?")
        .bind(&slug)
        .execute(&state.pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("category not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_category_slug_available(pool: &SqlitePool, slug: &str) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM categories WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Err(AppError::validation("slug already in use"));
    }

    Ok(())
}
