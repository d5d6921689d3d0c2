use anyhow::Context;
use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::json;
use sqlx::SqlitePool;
use tempfile::tempdir;
use tower::util::ServiceExt;

use revue::create_app;
use revue::utils::hash_confirmation_code;

const BODY_LIMIT: usize = 10_485_760;

async fn setup() -> Result<(Router, SqlitePool, tempfile::TempDir)> {
    let dir = tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test_perms.db");
    use sqlx::sqlite::SqliteConnectOptions;
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
        .await?;
    migrator.run(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let app = create_app(pool.clone()).await?;

    Ok((app, pool, dir))
}

async fn register(app: &Router, pool: &SqlitePool, username: &str, email: &str) -> Result<String> {
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/signup")
        .header("content-type", "application/json")
        .body(Body::from(json!({"username": username, "email": email}).to_string()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK, "signup failed for {username}");

    let code = format!("code-for-{username}");
    sqlx::query("UPDATE users SET confirmation_hash = ? WHERE username = ?")
        .bind(hash_confirmation_code(&code))
        .bind(username)
        .execute(pool)
        .await?;

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/token")
        .header("content-type", "application/json")
        .body(Body::from(json!({"username": username, "confirmation_code": code}).to_string()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body_bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await?;
    let token_res: serde_json::Value = serde_json::from_slice(&body_bytes)?;
    Ok(token_res.get("token").and_then(|v| v.as_str()).context("missing token")?.to_string())
}

async fn promote(pool: &SqlitePool, username: &str, role: &str) -> Result<()> {
    sqlx::query("UPDATE users SET role = ? WHERE username = ?")
        .bind(role)
        .bind(username)
        .execute(pool)
        .await?;
    Ok(())
}

async fn stored_role(pool: &SqlitePool, username: &str) -> Result<String> {
    let role: String = sqlx::query_scalar("SELECT role FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(pool)
        .await?;
    Ok(role)
}

#[tokio::test]
async fn catalog_writes_are_admin_only() -> Result<()> {
    let (app, pool, _dir) = setup().await?;

    let user_token = register(&app, &pool, "plain", "plain@example.com").await?;
    let mod_token = register(&app, &pool, "mod", "mod@example.com").await?;
    promote(&pool, "mod", "moderator").await?;
    let admin_token = register(&app, &pool, "root", "root@example.com").await?;
    promote(&pool, "root", "admin").await?;

    let payload = json!({"name": "Films", "slug": "films"}).to_string();

    // Anonymous -> denied
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/categories")
        .header("content-type", "application/json")
        .body(Body::from(payload.clone()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Plain user -> denied
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/categories")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", user_token))
        .body(Body::from(payload.clone()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Moderator -> denied (catalog is admin territory)
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/categories")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", mod_token))
        .body(Body::from(payload.clone()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Admin -> allowed
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/categories")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", admin_token))
        .body(Body::from(payload))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Non-admin delete -> denied; admin delete -> 204
    let req = Request::builder()
        .method("DELETE")
        .uri("/api/v1/categories/films")
        .header("authorization", format!("Bearer {}", user_token))
        .body(Body::empty())?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = Request::builder()
        .method("DELETE")
        .uri("/api/v1/categories/films")
        .header("authorization", format!("Bearer {}", admin_token))
        .body(Body::empty())?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    Ok(())
}

#[tokio::test]
async fn moderator_can_remove_other_peoples_content() -> Result<()> {
    let (app, pool, _dir) = setup().await?;

    let admin_token = register(&app, &pool, "root", "root@example.com").await?;
    promote(&pool, "root", "admin").await?;
    let author_token = register(&app, &pool, "author", "author@example.com").await?;
    let other_token = register(&app, &pool, "other", "other@example.com").await?;
    let mod_token = register(&app, &pool, "mod", "mod@example.com").await?;
    promote(&pool, "mod", "moderator").await?;

    // Admin seeds a title
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/titles")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", admin_token))
        .body(Body::from(json!({"name": "Solaris", "year": 1961}).to_string()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body_bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await?;
    let title_id = serde_json::from_slice::<serde_json::Value>(&body_bytes)?
        .get("id")
        .and_then(|v| v.as_str())
        .context("missing title id")?
        .to_string();

    // Author reviews it and comments on the review
    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/titles/{}/reviews", title_id))
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", author_token))
        .body(Body::from(json!({"text": "Haunting.", "score": 10}).to_string()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body_bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await?;
    let review_id = serde_json::from_slice::<serde_json::Value>(&body_bytes)?
        .get("id")
        .and_then(|v| v.as_str())
        .context("missing review id")?
        .to_string();

    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/titles/{}/reviews/{}/comments", title_id, review_id))
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", author_token))
        .body(Body::from(json!({"text": "Forgot to add: the ocean."}).to_string()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body_bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await?;
    let comment_id = serde_json::from_slice::<serde_json::Value>(&body_bytes)?
        .get("id")
        .and_then(|v| v.as_str())
        .context("missing comment id")?
        .to_string();

    // A stranger may not touch the author's comment
    let req = Request::builder()
        .method("DELETE")
        .uri(format!(
            "/api/v1/titles/{}/reviews/{}/comments/{}",
            title_id, review_id, comment_id
        ))
        .header("authorization", format!("Bearer {}", other_token))
        .body(Body::empty())?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // A moderator may
    let req = Request::builder()
        .method("DELETE")
        .uri(format!(
            "/api/v1/titles/{}/reviews/{}/comments/{}",
            title_id, review_id, comment_id
        ))
        .header("authorization", format!("Bearer {}", mod_token))
        .body(Body::empty())?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // A stranger may not edit the author's review either
    let req = Request::builder()
        .method("PATCH")
        .uri(format!("/api/v1/titles/{}/reviews/{}", title_id, review_id))
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", other_token))
        .body(Body::from(json!({"score": 1}).to_string()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // A moderator may delete the review itself
    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/api/v1/titles/{}/reviews/{}", title_id, review_id))
        .header("authorization", format!("Bearer {}", mod_token))
        .body(Body::empty())?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    Ok(())
}

#[tokio::test]
async fn self_promotion_is_ignored_but_admin_promotion_works() -> Result<()> {
    let (app, pool, _dir) = setup().await?;

    let user_token = register(&app, &pool, "climber", "climber@example.com").await?;
    let admin_token = register(&app, &pool, "root", "root@example.com").await?;
    promote(&pool, "root", "admin").await?;

    // Self-profile update smuggling a role change: accepted, role untouched
    let req = Request::builder()
        .method("PATCH")
        .uri("/api/v1/users/me")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", user_token))
        .body(Body::from(json!({"bio": "just a reader", "role": "admin"}).to_string()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(stored_role(&pool, "climber").await?, "user");

    // The user administration collection is closed to non-admins
    let req = Request::builder()
        .method("GET")
        .uri("/api/v1/users")
        .header("authorization", format!("Bearer {}", user_token))
        .body(Body::empty())?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = Request::builder()
        .method("PATCH")
        .uri("/api/v1/users/root")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", user_token))
        .body(Body::from(json!({"role": "user"}).to_string()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Admin promotes through the administration path
    let req = Request::builder()
        .method("PATCH")
        .uri("/api/v1/users/climber")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", admin_token))
        .body(Body::from(json!({"role": "moderator"}).to_string()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(stored_role(&pool, "climber").await?, "moderator");

    // Unknown role values never reach storage
    let req = Request::builder()
        .method("PATCH")
        .uri("/api/v1/users/climber")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", admin_token))
        .body(Body::from(json!({"role": "overlord"}).to_string()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_ne!(resp.status(), StatusCode::OK);
    assert_eq!(stored_role(&pool, "climber").await?, "moderator");

    Ok(())
}

#[tokio::test]
async fn anonymous_reads_are_public() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;

    for uri in ["/api/v1/titles", "/api/v1/categories", "/api/v1/genres"] {
        let req = Request::builder().method("GET").uri(uri).body(Body::empty())?;
        let resp: Response = app.clone().oneshot(req).await?;
        assert_eq!(resp.status(), StatusCode::OK, "{uri} should be public");
    }

    Ok(())
}

#[tokio::test]
async fn missing_object_reports_not_found_before_authorization() -> Result<()> {
    let (app, pool, _dir) = setup().await?;

    let user_token = register(&app, &pool, "plain", "plain@example.com").await?;

    // Nonexistent title: 404 even though the subject could not modify it anyway
    let req = Request::builder()
        .method("PATCH")
        .uri("/api/v1/titles/00000000-0000-0000-0000-000000000000")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", user_token))
        .body(Body::from(json!({"name": "Renamed"}).to_string()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    Ok(())
}
