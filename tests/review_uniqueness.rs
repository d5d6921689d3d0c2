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
    let db_path = dir.path().join("test_reviews.db");
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
    assert_eq!(resp.status(), StatusCode::OK);

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

async fn create_title(app: &Router, admin_token: &str, name: &str, year: i64) -> Result<String> {
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/titles")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", admin_token))
        .body(Body::from(json!({"name": name, "year": year}).to_string()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body_bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await?;
    Ok(serde_json::from_slice::<serde_json::Value>(&body_bytes)?
        .get("id")
        .and_then(|v| v.as_str())
        .context("missing title id")?
        .to_string())
}

fn review_request(title_id: &str, token: &str, text: &str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri(format!("/api/v1/titles/{}/reviews", title_id))
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(json!({"text": text, "score": 5}).to_string()))?)
}

#[tokio::test]
async fn second_review_for_the_same_title_is_rejected() -> Result<()> {
    let (app, pool, _dir) = setup().await?;

    let admin_token = register(&app, &pool, "root", "root@example.com").await?;
    sqlx::query("UPDATE users SET role = 'admin' WHERE username = 'root'")
        .execute(&pool)
        .await?;
    let token = register(&app, &pool, "reader", "reader@example.com").await?;
    let title_id = create_title(&app, &admin_token, "Dune", 1965).await?;

    let resp: Response = app.clone().oneshot(review_request(&title_id, &token, "First take")?).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp: Response = app.clone().oneshot(review_request(&title_id, &token, "Second take")?).await?;
    let status = resp.status();
    let body_bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: serde_json::Value = serde_json::from_slice(&body_bytes)?;
    assert_eq!(err.get("error").and_then(|v| v.as_str()), Some("duplicate_review"));

    Ok(())
}

#[tokio::test]
async fn uniqueness_is_scoped_to_the_pair() -> Result<()> {
    let (app, pool, _dir) = setup().await?;

    let admin_token = register(&app, &pool, "root", "root@example.com").await?;
    sqlx::query("UPDATE users SET role = 'admin' WHERE username = 'root'")
        .execute(&pool)
        .await?;
    let alice = register(&app, &pool, "alice", "alice@example.com").await?;
    let bob = register(&app, &pool, "bob", "bob@example.com").await?;
    let dune = create_title(&app, &admin_token, "Dune", 1965).await?;
    let solaris = create_title(&app, &admin_token, "Solaris", 1961).await?;

    // Different authors on the same title
    let resp: Response = app.clone().oneshot(review_request(&dune, &alice, "Alice on Dune")?).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp: Response = app.clone().oneshot(review_request(&dune, &bob, "Bob on Dune")?).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Same author on a different title
    let resp: Response = app.clone().oneshot(review_request(&solaris, &alice, "Alice on Solaris")?).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    Ok(())
}

#[tokio::test]
async fn concurrent_double_create_yields_exactly_one_review() -> Result<()> {
    let (app, pool, _dir) = setup().await?;

    let admin_token = register(&app, &pool, "root", "root@example.com").await?;
    sqlx::query("UPDATE users SET role = 'admin' WHERE username = 'root'")
        .execute(&pool)
        .await?;
    let token = register(&app, &pool, "racer", "racer@example.com").await?;
    let title_id = create_title(&app, &admin_token, "Dune", 1965).await?;

    let first = app.clone().oneshot(review_request(&title_id, &token, "copy one")?);
    let second = app.clone().oneshot(review_request(&title_id, &token, "copy two")?);
    let (first, second) = tokio::join!(first, second);
    let statuses = [first?.status(), second?.status()];

    let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    let rejected = statuses.iter().filter(|s| **s == StatusCode::BAD_REQUEST).count();
    assert_eq!(created, 1, "exactly one create must win, got {statuses:?}");
    assert_eq!(rejected, 1, "the loser must see the duplicate error, got {statuses:?}");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM reviews")
        .fetch_one(&pool)
        .await?;
    assert_eq!(count, 1);

    Ok(())
}
