use std::{str::FromStr, sync::Arc};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use models::user::UserRole;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use server::{routes, ServerAuthConfig, ServerState};
use service::{
    auth::{domain::AuthUser, token::issue_token},
    notification::LogNotifier,
    repo::InMemoryRepository,
    storage::{LocalFileStorage, StorageService},
};

const SECRET: &str = "integration-test-secret";

struct TestApp {
    router: Router,
    repo: Arc<InMemoryRepository>,
    tenant_id: Uuid,
}

fn build_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let root = std::env::temp_dir().join(format!("gigboard_api_{}", Uuid::new_v4()));
    let storage = Arc::new(StorageService::new(Arc::new(LocalFileStorage::new(root, "/files")), 1024 * 1024));
    let state = ServerState::new(
        repo.clone(),
        storage,
        Arc::new(LogNotifier),
        ServerAuthConfig { jwt_secret: SECRET.into(), token_ttl_hours: 1 },
        1024 * 1024,
    );
    let cors = tower_http::cors::CorsLayer::very_permissive();
    TestApp { router: routes::build_router(state, cors), repo, tenant_id: Uuid::new_v4() }
}

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> anyhow::Result<(StatusCode, Value)> {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
        Some(b) => req.header(header::CONTENT_TYPE, "application/json").body(Body::from(serde_json::to_vec(&b)?))?,
        None => req.body(Body::empty())?,
    };
    let resp = app.clone().oneshot(req).await?;
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok((status, value))
}

fn dec(v: &Value) -> Decimal {
    match v {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap(),
        other => panic!("not a decimal: {other}"),
    }
}

/// Register through the API and return `(user_id, token)`.
async fn signup(app: &TestApp, email: &str, role: &str) -> anyhow::Result<(Uuid, String)> {
    let password = "S3curePass!";
    let (status, body) = send(
        &app.router,
        "POST",
        "/auth/register",
        None,
        Some(json!({"tenant_id": app.tenant_id, "email": email, "name": "Tester", "password": password, "role": role})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let (status, body) = send(
        &app.router,
        "POST",
        "/auth/login",
        None,
        Some(json!({"tenant_id": app.tenant_id, "email": email, "password": password})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    let user_id = Uuid::parse_str(body["user_id"].as_str().unwrap())?;
    Ok((user_id, body["token"].as_str().unwrap().to_string()))
}

async fn admin_token(app: &TestApp) -> anyhow::Result<String> {
    let admin = app.repo.seed_user(app.tenant_id, "admin@example.com", "Admin", UserRole::Admin).await;
    let user = AuthUser::try_from(admin)?;
    Ok(issue_token(SECRET, &user, 1)?)
}

/// Client with a job assigned to a developer.
async fn job_fixture(app: &TestApp) -> anyhow::Result<(String, String, Uuid)> {
    let (_, client) = signup(app, "client@example.com", "client").await?;
    let (dev_id, dev) = signup(app, "dev@example.com", "developer").await?;
    let (status, job) = send(&app.router, "POST", "/jobs", Some(&client), Some(json!({"title": "Build API"}))).await?;
    assert_eq!(status, StatusCode::CREATED, "{job}");
    let job_id = Uuid::parse_str(job["id"].as_str().unwrap())?;
    let (status, _) = send(
        &app.router,
        "PUT",
        &format!("/jobs/{job_id}/developer"),
        Some(&client),
        Some(json!({"developer_id": dev_id})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    Ok((client, dev, job_id))
}

fn fixed_budget(job_id: Uuid) -> Value {
    json!({
        "job_id": job_id,
        "budget_type": "FIXED",
        "amount": "5000",
        "currency": "USD",
        "milestones": [
            {"title": "Design", "amount": "2500", "percentage": "50"},
            {"title": "Delivery", "amount": "2500", "percentage": "50"}
        ]
    })
}

#[tokio::test]
async fn health_is_public_and_api_requires_token() -> anyhow::Result<()> {
    let app = build_app();
    let (status, body) = send(&app.router, "GET", "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app.router, "GET", "/budgets", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = send(&app.router, "GET", "/budgets", Some("not-a-jwt"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, doc) = send(&app.router, "GET", "/api-docs/openapi.json", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/budgets"].is_object());
    Ok(())
}

#[tokio::test]
async fn registration_rules() -> anyhow::Result<()> {
    let app = build_app();
    signup(&app, "a@example.com", "client").await?;

    let dup = json!({"tenant_id": app.tenant_id, "email": "A@example.com", "name": "Again", "password": "S3curePass!", "role": "client"});
    let (status, _) = send(&app.router, "POST", "/auth/register", None, Some(dup)).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let admin = json!({"tenant_id": app.tenant_id, "email": "boss@example.com", "name": "Boss", "password": "S3curePass!", "role": "admin"});
    let (status, _) = send(&app.router, "POST", "/auth/register", None, Some(admin)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bad_login = json!({"tenant_id": app.tenant_id, "email": "a@example.com", "password": "wrong-password"});
    let (status, _) = send(&app.router, "POST", "/auth/login", None, Some(bad_login)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn login_sets_cookie_that_authenticates() -> anyhow::Result<()> {
    let app = build_app();
    signup(&app, "cookie@example.com", "developer").await?;
    let req = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(
            &json!({"tenant_id": app.tenant_id, "email": "cookie@example.com", "password": "S3curePass!"}),
        )?))?;
    let resp = app.router.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str()?.to_string();
    let pair = set_cookie.split(';').next().unwrap().to_string();
    assert!(pair.starts_with("auth_token="));

    let req = Request::builder().uri("/auth/me").header(header::COOKIE, pair).body(Body::empty())?;
    let resp = app.router.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn budget_milestone_payment_flow() -> anyhow::Result<()> {
    let app = build_app();
    let (client, dev, job_id) = job_fixture(&app).await?;

    let (status, created) = send(&app.router, "POST", "/budgets", Some(&client), Some(fixed_budget(job_id))).await?;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["milestones"].as_array().unwrap().len(), 2);
    assert_eq!(dec(&created["metrics"]["utilization_percentage"]), Decimal::ZERO);
    let budget_id = created["budget"]["id"].as_str().unwrap().to_string();
    let milestone_id = created["milestones"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app.router, "POST", "/budgets", Some(&client), Some(fixed_budget(job_id))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("Budget already exists"));

    let pay = json!({"milestone_id": milestone_id, "amount": "1500"});
    let (status, body) = send(&app.router, "POST", "/payments", Some(&client), Some(pay.clone())).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Payment can only be processed for completed milestones");

    let status_uri = format!("/milestones/{milestone_id}/status");
    for next in ["IN_PROGRESS", "UNDER_REVIEW"] {
        let (status, _) = send(&app.router, "PUT", &status_uri, Some(&dev), Some(json!({"status": next}))).await?;
        assert_eq!(status, StatusCode::OK, "developer moves milestone to {next}");
    }
    let (status, _) = send(&app.router, "PUT", &status_uri, Some(&dev), Some(json!({"status": "COMPLETED"}))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app.router, "PUT", &status_uri, Some(&client), Some(json!({"status": "PENDING"}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, done) = send(
        &app.router,
        "PUT",
        &status_uri,
        Some(&client),
        Some(json!({"status": "COMPLETED", "notes": "looks good"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "COMPLETED");

    let (status, body) = send(&app.router, "POST", "/payments", Some(&client), Some(pay.clone())).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "draft budget accepts no payments");
    assert!(body["detail"].as_str().unwrap().starts_with("Payments require an active budget"));
    let (status, _) = send(&app.router, "PUT", &format!("/budgets/{budget_id}/status"), Some(&client), Some(json!({"status": "ACTIVE"}))).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, receipt) = send(&app.router, "POST", "/payments", Some(&client), Some(pay)).await?;
    assert_eq!(status, StatusCode::CREATED, "{receipt}");
    assert_eq!(dec(&receipt["metrics"]["total_paid"]), Decimal::from(1500));
    assert_eq!(dec(&receipt["metrics"]["utilization_percentage"]), Decimal::from(30));
    assert_eq!(receipt["budget_status"], "ACTIVE");

    let payment_status_uri = format!("/payments/{}/status", receipt["payment"]["id"].as_str().unwrap());
    let (status, _) = send(&app.router, "PUT", &payment_status_uri, Some(&client), Some(json!({"status": "PENDING"}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app.router, "PUT", &payment_status_uri, Some(&dev), Some(json!({"status": "REFUNDED"}))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, refunded) = send(&app.router, "PUT", &payment_status_uri, Some(&client), Some(json!({"status": "REFUNDED"}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refunded["status"], "REFUNDED");
    let (status, metrics) = send(&app.router, "GET", &format!("/budgets/{budget_id}/metrics"), Some(&client), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dec(&metrics["total_paid"]), Decimal::ZERO);

    let (status, payments) = send(&app.router, "GET", &format!("/budgets/{budget_id}/payments"), Some(&dev), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payments.as_array().unwrap().len(), 1);

    let (status, page) = send(&app.router, "GET", "/budgets", Some(&dev), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);

    let (status, by_job) = send(&app.router, "GET", &format!("/jobs/{job_id}/budget"), Some(&client), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_job["budget"]["id"], budget_id.as_str());
    Ok(())
}

#[tokio::test]
async fn role_guards_on_budgets_and_jobs() -> anyhow::Result<()> {
    let app = build_app();
    let (_client, dev, job_id) = job_fixture(&app).await?;
    let (status, _) = send(&app.router, "POST", "/budgets", Some(&dev), Some(fixed_budget(job_id))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, outsider) = signup(&app, "outsider@example.com", "developer").await?;
    let (status, _) = send(
        &app.router,
        "PUT",
        &format!("/jobs/{job_id}/developer"),
        Some(&outsider),
        Some(json!({"developer_id": Uuid::new_v4()})),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app.router, "GET", &format!("/budgets/{}", Uuid::new_v4()), Some(&outsider), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn currency_endpoints() -> anyhow::Result<()> {
    let app = build_app();
    let (_, client) = signup(&app, "fx@example.com", "client").await?;

    let (status, list) = send(&app.router, "GET", "/currencies", Some(&client), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 10);

    let (_, ok) = send(&app.router, "GET", "/currencies/usd/validate", Some(&client), None).await?;
    assert_eq!(ok["is_valid"], true);
    assert_eq!(ok["currency"]["code"], "USD");
    let (_, bad) = send(&app.router, "GET", "/currencies/XYZ/validate", Some(&client), None).await?;
    assert_eq!(bad["is_valid"], false);

    let (status, same) = send(&app.router, "GET", "/currencies/convert?amount=100&from=USD&to=USD", Some(&client), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dec(&same["converted_amount"]), Decimal::from(100));
    assert_eq!(dec(&same["rate"]), Decimal::ONE);

    let (status, _) = send(&app.router, "GET", "/currencies/convert?amount=100&from=USD&to=EUR", Some(&client), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    for amount in ["-50", "0"] {
        let (status, body) = send(&app.router, "GET", &format!("/currencies/convert?amount={amount}&from=USD&to=USD"), Some(&client), None).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Amount must be greater than zero");
    }
    let (status, _) = send(&app.router, "GET", "/currencies/convert?amount=79228162514264337593543950335&from=USD&to=USD", Some(&client), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let rate = json!({"from_currency": "USD", "to_currency": "EUR", "rate": "0.9"});
    let (status, _) = send(&app.router, "POST", "/exchange-rates", Some(&client), Some(rate.clone())).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let admin = admin_token(&app).await?;
    let (status, _) = send(&app.router, "POST", "/exchange-rates", Some(&admin), Some(rate)).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (_, converted) = send(&app.router, "GET", "/currencies/convert?amount=100&from=USD&to=EUR", Some(&client), None).await?;
    assert_eq!(dec(&converted["converted_amount"]), Decimal::from(90));
    let (_, back) = send(&app.router, "GET", "/currencies/convert?amount=90&from=EUR&to=USD", Some(&client), None).await?;
    assert_eq!(back["inverse"], true);
    assert_eq!(dec(&back["converted_amount"]), Decimal::from(100));

    let (_, negative) = send(&app.router, "GET", "/currencies/convert?amount=-50&from=EUR&to=USD", Some(&client), None).await?;
    assert_eq!(negative["detail"], "Amount must be greater than zero");
    let tiny = json!({"from_currency": "GBP", "to_currency": "USD", "rate": "0.0000000000000000000000000001"});
    let (status, _) = send(&app.router, "POST", "/exchange-rates", Some(&admin), Some(tiny)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn profile_search_and_avatar() -> anyhow::Result<()> {
    let app = build_app();
    let (_, client) = signup(&app, "hirer@example.com", "client").await?;
    let (dev_id, dev) = signup(&app, "rustacean@example.com", "developer").await?;

    let profile = json!({
        "display_name": "Ferris",
        "bio": "Systems programmer",
        "is_public": true,
        "details": {"role": "developer", "title": "Rust engineer", "skills": ["Rust", "Tokio"], "hourly_rate": "95", "years_experience": 6}
    });
    let (status, body) = send(&app.router, "POST", "/profiles", Some(&dev), Some(profile)).await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, found) = send(&app.router, "GET", "/search/profiles?skills=rust", Some(&client), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["total"], 1);
    assert_eq!(found["items"][0]["profile"]["user_id"], dev_id.to_string());

    let (status, recs) = send(&app.router, "GET", "/search/recommendations?skills=tokio,go", Some(&client), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recs.as_array().unwrap().len(), 1);

    let (status, other) = send(&app.router, "GET", &format!("/profiles/{dev_id}"), Some(&client), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(other["display_name"], "Ferris");

    let (status, report) = send(&app.router, "GET", "/profiles/me/completion", Some(&dev), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(report["percentage"].as_u64().unwrap() > 0);

    let req = Request::builder()
        .method("POST")
        .uri("/profiles/me/avatar")
        .header(header::AUTHORIZATION, format!("Bearer {dev}"))
        .header(header::CONTENT_TYPE, "image/png")
        .body(Body::from(vec![0x89, b'P', b'N', b'G']))?;
    let resp = app.router.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    let uploaded: Value = serde_json::from_slice(&bytes)?;
    let url = uploaded["file"]["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/files/avatars/"));

    let resp = app.router.clone().oneshot(Request::builder().uri(&url).body(Body::empty())?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");

    let (status, _) = send(&app.router, "DELETE", &format!("/profiles/{dev_id}"), Some(&client), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}
