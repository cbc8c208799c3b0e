use std::sync::Arc;

use axum::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use lifegrass::ai::client::AiClient;
use lifegrass::app::build_app;
use lifegrass::config::AppConfig;
use lifegrass::state::AppState;
use lifegrass::storage::StorageClient;

fn app() -> Router {
    build_app(AppState::fake())
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["ok"], true);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn register_save_and_load_round_trip() {
    let app = app();
    let t1 = register(&app, "alice", "pass1234").await;

    let (status, body) = call(&app, Method::GET, "/api/data/alice", Some(&t1), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "birthYear": null, "filledWeeks": [], "journal": {} }));

    let doc = json!({
        "birthYear": 1995,
        "filledWeeks": ["2024-10"],
        "journal": { "2024-10": { "keywords": "work", "text": "busy week" } }
    });
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/data/alice",
        Some(&t1),
        Some(doc.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    let (status, body) = call(&app, Method::GET, "/api/data/alice", Some(&t1), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, doc);

    // the credential survives the state write
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "pass1234" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_user_does_not_exist_and_is_unauthorized() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/auth/check/ghost", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "exists": false }));

    let (status, _) = call(&app, Method::GET, "/api/data/ghost", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, Method::GET, "/api/data/ghost", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_only_opens_its_own_user() {
    let app = app();
    let alice = register(&app, "alice", "pass1234").await;
    register(&app, "bob", "hunter22").await;

    let (status, body) = call(&app, Method::GET, "/api/data/bob", Some(&alice), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/data/bob",
        Some(&alice),
        Some(json!({ "filledWeeks": [], "journal": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn last_save_wins() {
    let app = app();
    let token = register(&app, "carol", "secret").await;

    let first = json!({
        "birthYear": 1990,
        "filledWeeks": ["2024-1"],
        "journal": { "2024-1": { "keywords": "a", "text": "first" } }
    });
    let second = json!({
        "birthYear": 1990,
        "filledWeeks": ["2024-2"],
        "journal": { "2024-2": { "keywords": "b", "text": "second" } }
    });
    call(&app, Method::POST, "/api/data/carol", Some(&token), Some(first)).await;
    call(&app, Method::POST, "/api/data/carol", Some(&token), Some(second.clone())).await;

    let (_, body) = call(&app, Method::GET, "/api/data/carol", Some(&token), None).await;
    assert_eq!(body, second);
}

#[tokio::test]
async fn registration_and_login_errors() {
    let app = app();
    register(&app, "dave", "pass1234").await;

    let register_uri = "/api/auth/register";
    let login_uri = "/api/auth/login";
    let cases = [
        (
            register_uri,
            json!({ "username": "DAVE", "password": "pass1234" }),
            StatusCode::CONFLICT,
        ),
        (
            register_uri,
            json!({ "username": "d", "password": "pass1234" }),
            StatusCode::BAD_REQUEST,
        ),
        (
            register_uri,
            json!({ "username": "erin", "password": "abc" }),
            StatusCode::BAD_REQUEST,
        ),
        (
            register_uri,
            json!({ "username": "erin", "password": "pass1234", "birthYear": 1900 }),
            StatusCode::BAD_REQUEST,
        ),
        (
            login_uri,
            json!({ "username": "dave", "password": "" }),
            StatusCode::BAD_REQUEST,
        ),
        (
            login_uri,
            json!({ "username": "", "password": "x" }),
            StatusCode::BAD_REQUEST,
        ),
        (
            login_uri,
            json!({ "username": "dave", "password": "nope" }),
            StatusCode::UNAUTHORIZED,
        ),
        (
            login_uri,
            json!({ "username": "ghost", "password": "nope" }),
            StatusCode::UNAUTHORIZED,
        ),
    ];
    for (uri, body, expected) in cases {
        let (status, res) = call(&app, Method::POST, uri, None, Some(body.clone())).await;
        assert_eq!(status, expected, "{uri} {body} -> {res}");
        assert!(res["error"].is_string());
    }
}

#[tokio::test]
async fn register_stores_birth_year() {
    let app = app();
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "username": "Frank", "password": "pass1234", "birthYear": 1988 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();

    let (_, body) = call(&app, Method::GET, "/api/data/frank", Some(token), None).await;
    assert_eq!(body["birthYear"], 1988);
}

#[tokio::test]
async fn admin_listing_hides_credentials_and_delete_is_idempotent() {
    let app = app();
    let token = register(&app, "zed", "pass1234").await;
    register(&app, "amy", "pass1234").await;

    let (_, body) = call(&app, Method::GET, "/api/users", None, None).await;
    assert_eq!(body, json!({ "users": ["amy", "zed"] }));

    let (status, body) = call(&app, Method::GET, "/api/admin/data/zed", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("passwordHash").is_none());
    assert!(body.get("updatedAt").is_some());

    let (status, _) = call(&app, Method::GET, "/api/admin/data/nobody", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for _ in 0..2 {
        let (status, body) = call(&app, Method::DELETE, "/api/data/zed", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
    }
    let (status, _) = call(&app, Method::DELETE, "/api/data/never-existed", None, None).await;
    assert_eq!(status, StatusCode::OK);

    // the old token still verifies, but the account is gone
    let (status, _) = call(&app, Method::GET, "/api/data/zed", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/data/zed",
        Some(&token),
        Some(json!({ "filledWeeks": [], "journal": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = call(&app, Method::GET, "/api/auth/check/zed", None, None).await;
    assert_eq!(body, json!({ "exists": false }));
}

#[tokio::test]
async fn disabled_storage_answers_503() {
    let state = AppState::from_parts(Arc::new(AppConfig::for_tests()), None, None);
    let app = build_app(state);
    let (status, body) = call(&app, Method::GET, "/api/auth/check/alice", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());
    let (status, _) = call(&app, Method::GET, "/api/users", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

struct EchoAi;

#[async_trait]
impl AiClient for EchoAi {
    async fn complete(&self, prompt: &str, _max_tokens: u32) -> anyhow::Result<String> {
        if prompt.contains("explode") {
            anyhow::bail!("upstream returned 500");
        }
        Ok("A week well spent.\nignored second line".into())
    }
}

#[tokio::test]
async fn ai_endpoints() {
    let app = app();
    let busy = json!({ "keywords": "work", "text": "busy" });
    let (status, _) = call(&app, Method::POST, "/api/comment", None, Some(busy.clone())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let empty = json!({ "keywords": "", "text": "" });
    let (status, body) = call(&app, Method::POST, "/api/comment", None, Some(empty)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["comment"], "No journal entry for this week.");

    let storage: Arc<dyn StorageClient> = Arc::new(lifegrass::storage::MemoryStorage::new());
    let state = AppState::from_parts(
        Arc::new(AppConfig::for_tests()),
        Some(storage),
        Some(Arc::new(EchoAi)),
    );
    let app = build_app(state);

    let dated = json!({ "keywords": "work", "text": "busy", "year": 2024, "week": 9 });
    let (status, body) = call(&app, Method::POST, "/api/comment", None, Some(dated)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "comment": "A week well spent." }));

    let (status, body) = call(&app, Method::POST, "/api/recommend", None, Some(busy)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "recommendation": "A week well spent." }));

    let failing = json!({ "keywords": "", "text": "explode" });
    let (status, _) = call(&app, Method::POST, "/api/recommend", None, Some(failing)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn health() {
    let (status, body) = call(&app(), Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
}
