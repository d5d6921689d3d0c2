use axum::extract::State;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::models::user::{DbUser, SignupRequest, SignupResponse, TokenRequest, TokenResponse};
use crate::utils::{generate_confirmation_code, hash_confirmation_code, utc_now, verify_confirmation_code};
use crate::validation::{validate_email, validate_username};

#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    tag = "Auth",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Confirmation code issued", body = SignupResponse),
        (status = 400, description = "Invalid or already taken username/email")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> AppResult<Json<SignupResponse>> {
    validate_username(&payload.username)?;
    validate_email(&payload.email)?;

    let code = generate_confirmation_code();
    let hash = hash_confirmation_code(&code);
    let now = utc_now();

    match find_signup_match(&state.pool, &payload.username, &payload.email).await? {
        SignupMatch::Existing(user_id) => {
            // Re-signup with the same (username, email) pair re-issues the code.
            sqlx::query("UPDATE users SET confirmation_hash = ?, updated_at = ? WHERE id = ?")
                .bind(&hash)
                .bind(now)
                .bind(user_id)
                .execute(&state.pool)
                .await?;
        }
        SignupMatch::Conflict => {
            return Err(AppError::validation("username or email already in use"));
        }
        SignupMatch::Fresh => {
            sqlx::query(
                "INSERT INTO users (id, username, email, role, confirmation_hash, created_at, updated_at) VALUES (?, ?, ?, 'user', ?, ?, ?)",
            )
            .bind(Uuid::new_v4())
            .bind(&payload.username)
            .bind(&payload.email)
            .bind(&hash)
            .bind(now)
            .bind(now)
            .execute(&state.pool)
            .await?;
        }
    }

    deliver_confirmation_code(&payload.email, &payload.username, &code);

    Ok(Json(SignupResponse {
        username: payload.username,
        email: payload.email,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/token",
    tag = "Auth",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Access token", body = TokenResponse),
        (status = 400, description = "Wrong confirmation code"),
        (status = 404, description = "Unknown username")
    )
)]
pub async fn token(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    let user = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, email, bio, role, confirmation_hash, created_at, updated_at FROM users WHERE username = ?",
    )
    .bind(&payload.username)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("user not found"))?;

    let stored = user
        .confirmation_hash
        .as_deref()
        .ok_or_else(|| AppError::validation("no confirmation code issued for this user"))?;

    if !verify_confirmation_code(&payload.confirmation_code, stored) {
        return Err(AppError::validation("invalid confirmation code"));
    }

    let token = state.jwt.encode(user.id)?;

    Ok(Json(TokenResponse { token }))
}

enum SignupMatch {
    /// The exact (username, email) pair is already registered.
    Existing(Uuid),
    /// Username or email is held by a different account.
    Conflict,
    Fresh,
}

async fn find_signup_match(pool: &SqlitePool, username: &str, email: &str) -> AppResult<SignupMatch> {
    let rows = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, email, bio, role, confirmation_hash, created_at, updated_at FROM users WHERE username = ? OR email = ?",
    )
    .bind(username)
    .bind(email)
    .fetch_all(pool)
    .await?;

    if let Some(user) = rows.iter().find(|u| u.username == username && u.email == email) {
        return Ok(SignupMatch::Existing(user.id));
    }
    if rows.is_empty() {
        Ok(SignupMatch::Fresh)
    } else {
        Ok(SignupMatch::Conflict)
    }
}

/// Hand the code to the outbound-mail log. Actual delivery is an external
/// collaborator; this service only records the handoff.
fn deliver_confirmation_code(email: &str, username: &str, code: &str) {
    tracing::info!(email, username, code, "confirmation code issued");
}
