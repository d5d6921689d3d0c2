use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{can_access_collection, can_access_object, Action, ResourceKind, Subject};
use crate::errors::{AppError, AppResult};
use crate::models::category::{Category, DbCategory};
use crate::models::genre::{DbGenre, Genre};
use crate::models::title::{DbTitle, Title, TitleCreateRequest, TitleUpdateRequest};
use crate::utils::utc_now;
use crate::validation::{validate_name, validate_year};

const TITLE_COLUMNS: &str = "id, name, year, description, category_slug, created_at, updated_at";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TitleFilterQuery {
    /// Name substring filter.
    pub name: Option<String>,
    /// Category slug filter.
    pub category: Option<String>,
    /// Genre slug filter.
    pub genre: Option<String>,
    /// Exact release year filter.
    pub year: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/titles",
    tag = "Titles",
    params(TitleFilterQuery),
    responses((status = 200, description = "List titles", body = [Title]))
)]
pub async fn list_titles(
    State(state): State<AppState>,
    subject: Subject,
    Query(query): Query<TitleFilterQuery>,
) -> AppResult<Json<Vec<Title>>> {
    if !can_access_collection(&subject, Action::Read, ResourceKind::Title) {
        return Err(AppError::forbidden("cannot list titles"));
    }

    let rows = sqlx::query_as::<_, DbTitle>(
        "SELECT id, name, year, description, category_slug, created_at, updated_at FROM titles \
         WHERE (?1 IS NULL OR name LIKE '%' || ?1 || '%') \
           AND (?2 IS NULL OR category_slug = ?2) \
           AND (?3 IS NULL OR year = ?3) \
           AND (?4 IS NULL OR id IN (SELECT title_id FROM title_genres WHERE genre_slug = ?4)) \
         ORDER BY created_at DESC",
    )
    .bind(query.name)
    .bind(query.category)
    .bind(query.year)
    .bind(query.genre)
    .fetch_all(&state.pool)
    .await?;

    let mut titles = Vec::with_capacity(rows.len());
    for row in rows {
        titles.push(load_title(&state.pool, row).await?);
    }

    Ok(Json(titles))
}

#[utoipa::path(
    post,
    path = "/api/v1/titles",
    tag = "Titles",
    request_body = TitleCreateRequest,
    responses(
        (status = 201, description = "Title created", body = Title),
        (status = 400, description = "Invalid name/year or unknown category/genre slug"),
        (status = 403, description = "Not an administrator")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_title(
    State(state): State<AppState>,
    subject: Subject,
    Json(payload): Json<TitleCreateRequest>,
) -> AppResult<(StatusCode, Json<Title>)> {
    if !can_access_collection(&subject, Action::Create, ResourceKind::Title) {
        return Err(AppError::forbidden("administrator role required"));
    }
    validate_name(&payload.name)?;
    validate_year(payload.year)?;
    if let Some(slug) = payload.category.as_deref() {
        ensure_category_exists(&state.pool, slug).await?;
    }
    ensure_genres_exist(&state.pool, &payload.genre).await?;

    let now = utc_now();
    let title_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO titles (id, name, year, description, category_slug, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(title_id)
    .bind(&payload.name)
    .bind(payload.year)
    .bind(&payload.description)
    .bind(&payload.category)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    replace_title_genres(&state.pool, title_id, &payload.genre).await?;

    let title = fetch_title(&state.pool, title_id).await?;
    let title = load_title(&state.pool, title).await?;

    Ok((StatusCode::CREATED, Json(title)))
}

#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}",
    tag = "Titles",
    params(("title_id" = Uuid, Path, description = "Title id")),
    responses(
        (status = 200, description = "Title detail", body = Title),
        (status = 404, description = "Unknown title")
    )
)]
pub async fn get_title(
    State(state): State<AppState>,
    subject: Subject,
    Path(title_id): Path<Uuid>,
) -> AppResult<Json<Title>> {
    let row = fetch_title(&state.pool, title_id).await?;

    if !can_access_object(&subject, Action::Read, None) {
        return Err(AppError::forbidden("cannot read this title"));
    }

    let title = load_title(&state.pool, row).await?;
    Ok(Json(title))
}

#[utoipa::path(
    patch,
    path = "/api/v1/titles/{title_id}",
    tag = "Titles",
    params(("title_id" = Uuid, Path, description = "Title id")),
    request_body = TitleUpdateRequest,
    responses(
        (status = 200, description = "Title updated", body = Title),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "Unknown title")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_title(
    State(state): State<AppState>,
    subject: Subject,
    Path(title_id): Path<Uuid>,
    Json(payload): Json<TitleUpdateRequest>,
) -> AppResult<Json<Title>> {
    let mut row = fetch_title(&state.pool, title_id).await?;

    // Titles carry no author; only an admin may modify one.
    if !can_access_object(&subject, Action::Update, None) {
        return Err(AppError::forbidden("administrator role required"));
    }

    if let Some(name) = payload.name {
        validate_name(&name)?;
        row.name = name;
    }
    if let Some(year) = payload.year {
        validate_year(year)?;
        row.year = year;
    }
    if payload.description.is_some() {
        row.description = payload.description;
    }
    if let Some(slug) = payload.category {
        ensure_category_exists(&state.pool, &slug).await?;
        row.category_slug = Some(slug);
    }
    if let Some(genres) = payload.genre.as_deref() {
        ensure_genres_exist(&state.pool, genres).await?;
        replace_title_genres(&state.pool, title_id, genres).await?;
    }

    let now = utc_now();
    sqlx::query("UPDATE titles SET name = ?, year = ?, description = ?, category_slug = ?, updated_at = ? WHERE id = ?")
        .bind(&row.name)
        .bind(row.year)
        .bind(&row.description)
        .bind(&row.category_slug)
        .bind(now)
        .bind(title_id)
        .execute(&state.pool)
        .await?;

    row.updated_at = now;
    let title = load_title(&state.pool, row).await?;

    Ok(Json(title))
}

#[utoipa::path(
    delete,
    path = "/api/v1/titles/{title_id}",
    tag = "Titles",
    params(("title_id" = Uuid, Path, description = "Title id")),
    responses(
        (status = 204, description = "Title deleted"),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "Unknown title")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_title(
    State(state): State<AppState>,
    subject: Subject,
    Path(title_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let _ = fetch_title(&state.pool, title_id).await?;

    if !can_access_object(&subject, Action::Delete, None) {
        return Err(AppError::forbidden("administrator role required"));
    }

    sqlx::query("DELETE FROM titles WHERE id = ?")
        .bind(title_id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn fetch_title(pool: &SqlitePool, title_id: Uuid) -> AppResult<DbTitle> {
    sqlx::query_as::<_, DbTitle>(&format!("SELECT {TITLE_COLUMNS} FROM titles WHERE id = ?"))
        .bind(title_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("title not found"))
}

/// Assemble the API shape: rating aggregate, category, genre list.
async fn load_title(pool: &SqlitePool, row: DbTitle) -> AppResult<Title> {
    let rating: Option<i64> =
        sqlx::query_scalar("SELECT CAST(ROUND(AVG(score)) AS INTEGER) FROM reviews WHERE title_id = ?")
            .bind(row.id)
            .fetch_one(pool)
            .await?;

    let category = match row.category_slug.as_deref() {
        Some(slug) => sqlx::query_as::<_, DbCategory>(
            "SELECT id, name, slug, created_at FROM categories WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(pool)
        .await?
        .map(Category::from),
        None => None,
    };

    let genres = sqlx::query_as::<_, DbGenre>(
        "SELECT g.id, g.name, g.slug, g.created_at FROM genres g \
         INNER JOIN title_genres tg ON tg.genre_slug = g.slug \
         WHERE tg.title_id = ? ORDER BY g.slug",
    )
    .bind(row.id)
    .fetch_all(pool)
    .await?;

    Ok(Title {
        id: row.id,
        name: row.name,
        year: row.year,
        rating,
        description: row.description,
        genre: genres.into_iter().map(Genre::from).collect(),
        category,
    })
}

async fn ensure_category_exists(pool: &SqlitePool, slug: &str) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM categories WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await?;

    if count == 0 {
        return Err(AppError::validation(format!("unknown category slug: {slug}")));
    }

    Ok(())
}

async fn ensure_genres_exist(pool: &SqlitePool, slugs: &[String]) -> AppResult<()> {
    for slug in slugs {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM genres WHERE slug = ?")
            .bind(slug)
            .fetch_one(pool)
            .await?;

        if count == 0 {
            return Err(AppError::validation(format!("unknown genre slug: {slug}")));
        }
    }

    Ok(())
}

async fn replace_title_genres(pool: &SqlitePool, title_id: Uuid, slugs: &[String]) -> AppResult<()> {
    sqlx::query("DELETE FROM title_genres WHERE title_id = ?")
        .bind(title_id)
        .execute(pool)
        .await?;

    for slug in slugs {
        sqlx::query("INSERT OR IGNORE INTO title_genres (title_id, genre_slug) VALUES (?, ?)")
            .bind(title_id)
            .bind(slug)
            .execute(pool)
            .await?;
    }

    Ok(())
}
