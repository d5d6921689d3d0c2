use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::IntoParams;

use crate::app::AppState;
use crate::authz::can_manage_users;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::user::{AdminUserCreateRequest, AdminUserUpdateRequest, DbUser, ProfileUpdateRequest, User};
use crate::utils::utc_now;
use crate::validation::{validate_email, validate_username};

const USER_COLUMNS: &str = "id, username, email, bio, role, confirmation_hash, created_at, updated_at";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserSearchQuery {
    /// Username substring filter.
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    params(UserSearchQuery),
    responses(
        (status = 200, description = "List users", body = [User]),
        (status = 403, description = "Not an administrator")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<UserSearchQuery>,
) -> AppResult<Json<Vec<User>>> {
    ensure_admin(&auth)?;

    let users = match query.search {
        Some(term) => {
            sqlx::query_as::<_, DbUser>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE username LIKE ? ORDER BY username"
            ))
            .bind(format!("%{}%", term))
            .fetch_all(&state.pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, DbUser>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY username"))
                .fetch_all(&state.pool)
                .await?
        }
    };

    Ok(Json(users.into_iter().map(User::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "Users",
    request_body = AdminUserCreateRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid or already taken username/email"),
        (status = 403, description = "Not an administrator")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<AdminUserCreateRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    ensure_admin(&auth)?;
    validate_username(&payload.username)?;
    validate_email(&payload.email)?;
    ensure_identity_available(&state.pool, &payload.username, &payload.email).await?;

    let now = utc_now();
    let user_id = uuid::Uuid::new_v4();
    let role = payload.role.unwrap_or_default();

    sqlx::query(
        "INSERT INTO users (id, username, email, bio, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&payload.bio)
    .bind(role)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let user = fetch_user_by_username(&state.pool, &payload.username).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{username}",
    tag = "Users",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "User detail", body = User),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "Unknown username")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
) -> AppResult<Json<User>> {
    ensure_admin(&auth)?;
    let user = fetch_user_by_username(&state.pool, &username).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/{username}",
    tag = "Users",
    params(("username" = String, Path, description = "Username")),
    request_body = AdminUserUpdateRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "Unknown username")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
    Json(payload): Json<AdminUserUpdateRequest>,
) -> AppResult<Json<User>> {
    ensure_admin(&auth)?;
    let mut user = fetch_user_by_username(&state.pool, &username).await?;

    if let Some(email) = payload.email {
        validate_email(&email)?;
        user.email = email;
    }
    if payload.bio.is_some() {
        user.bio = payload.bio;
    }
    // Role changes ride the admin path only; serde already rejected
    // anything outside the closed enumerator.
    if let Some(role) = payload.role {
        user.role = role;
    }

    let now = utc_now();
    sqlx::query("UPDATE users SET email = ?, bio = ?, role = ?, updated_at = ? WHERE id = ?")
        .bind(&user.email)
        .bind(&user.bio)
        .bind(user.role)
        .bind(now)
        .bind(user.id)
        .execute(&state.pool)
        .await?;

    Ok(Json(user.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{username}",
    tag = "Users",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "Unknown username")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
) -> AppResult<StatusCode> {
    ensure_admin(&auth)?;

    let affected = sqlx::query("DELETE FROM users WHERE username = ?")
        .bind(&username)
        .execute(&state.pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("user not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "Users",
    responses((status = 200, description = "Own profile", body = User)),
    security(("bearerAuth" = []))
)]
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<User>> {
    let user = fetch_user_by_username(&state.pool, &auth.username).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/me",
    tag = "Users",
    request_body = ProfileUpdateRequest,
    responses((status = 200, description = "Own profile updated", body = User)),
    security(("bearerAuth" = []))
)]
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ProfileUpdateRequest>,
) -> AppResult<Json<User>> {
    let mut user = fetch_user_by_username(&state.pool, &auth.username).await?;

    if let Some(email) = payload.email {
        validate_email(&email)?;
        user.email = email;
    }
    if payload.bio.is_some() {
        user.bio = payload.bio;
    }

    // `role` never changes here, whatever the request carried.
    let now = utc_now();
    sqlx::query("UPDATE users SET email = ?, bio = ?, updated_at = ? WHERE id = ?")
        .bind(&user.email)
        .bind(&user.bio)
        .bind(now)
        .bind(user.id)
        .execute(&state.pool)
        .await?;

    Ok(Json(user.into()))
}

fn ensure_admin(auth: &AuthUser) -> AppResult<()> {
    if !can_manage_users(&auth.subject()) {
        return Err(AppError::forbidden("administrator role required"));
    }
    Ok(())
}

async fn ensure_identity_available(pool: &SqlitePool, username: &str, email: &str) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE username = ? OR email = ?")
        .bind(username)
        .bind(email)
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Err(AppError::validation("username or email already in use"));
    }

    Ok(())
}

pub(crate) async fn fetch_user_by_username(pool: &SqlitePool, username: &str) -> AppResult<DbUser> {
    sqlx::query_as::<_, DbUser>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
        .bind(username)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))
}
