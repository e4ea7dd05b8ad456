use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use models::{AuthResult, Credential, FailureReason, Role, RouteTable};
use serde_json::{json, Value};
use service::auth::domain::LoginRequest;
use service::auth::{AuthCollaborator, HttpAuthCollaborator, Resolution, ResolverConfig, SessionResolver};
use service::storage::SessionStore;
use tower::ServiceExt;

use server::accounts::AccountDirectory;
use server::routes::{self, auth};
use server::tokens::TokenIssuer;

const PASSWORD: &str = "S3curePass!";

fn cors() -> tower_http::cors::CorsLayer {
    tower_http::cors::CorsLayer::very_permissive()
}

async fn build_state() -> anyhow::Result<auth::ServerState> {
    let path = std::env::temp_dir().join(format!("auth_flow_accounts_{}.json", uuid::Uuid::new_v4()));
    let accounts = AccountDirectory::open(&path).await?;
    accounts.seed_account("pat@h.com", PASSWORD, Role::Patient, "Pat Patient").await?;
    accounts.seed_account("dr@h.com", PASSWORD, Role::Doctor, "Dr. Dee").await?;
    Ok(auth::ServerState { accounts, tokens: TokenIssuer::new("test-secret") })
}

async fn build_app() -> anyhow::Result<Router> {
    Ok(routes::build_router(build_state().await?, cors()))
}

fn login_request(identifier: &str, secret: &str) -> anyhow::Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&json!({"identifier": identifier, "secret": secret}))?))?)
}

async fn body_json(resp: axum::response::Response) -> anyhow::Result<Value> {
    let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Serve the demo router on an ephemeral port; returns its base URL.
async fn spawn_server() -> anyhow::Result<(String, tokio::task::JoinHandle<()>)> {
    let app = build_app().await?;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), handle))
}

async fn resolver_for(base_url: &str) -> anyhow::Result<SessionResolver<HttpAuthCollaborator>> {
    let path = std::env::temp_dir().join(format!("auth_flow_session_{}.json", uuid::Uuid::new_v4()));
    let store = SessionStore::init(&path).await?;
    let http = Arc::new(HttpAuthCollaborator::new(base_url, Duration::from_secs(5))?);
    Ok(SessionResolver::new(http, store, Arc::new(RouteTable::default()), ResolverConfig::default()))
}

#[tokio::test]
async fn login_then_session_lookup() -> anyhow::Result<()> {
    let app = build_app().await?;

    let resp = app.clone().oneshot(login_request("Dr@H.com", PASSWORD)?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await?;
    assert_eq!(body["user"]["role"], "doctor");
    assert_eq!(body["user"]["display_name"], "Dr. Dee");
    let token = body["token"].as_str().expect("token").to_string();

    let req = Request::builder()
        .uri("/auth/session")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await?["role"], "doctor");
    Ok(())
}

#[tokio::test]
async fn login_failures_map_to_status_codes() -> anyhow::Result<()> {
    let app = build_app().await?;

    let resp = app.clone().oneshot(login_request("dr@h.com", "wrong-password")?).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await?["error"], "invalid credentials");

    let resp = app.clone().oneshot(login_request("", "x")?).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = Request::builder().uri("/auth/session").body(Body::empty())?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder().uri("/auth/session").header("authorization", "Bearer not-a-jwt").body(Body::empty())?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn health_endpoint() -> anyhow::Result<()> {
    let app = build_app().await?;
    let resp = app.oneshot(Request::builder().uri("/health").body(Body::empty())?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await?["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn http_collaborator_against_live_server() -> anyhow::Result<()> {
    let (base, handle) = spawn_server().await?;
    let http = HttpAuthCollaborator::new(base.as_str(), Duration::from_secs(5))?;

    let resp = http.verify(&LoginRequest { identifier: "pat@h.com".into(), secret: PASSWORD.into() }).await?;
    assert_eq!(resp.user.role, "patient");
    let user = http.validate_token(&resp.token).await?;
    assert_eq!(user, resp.user);

    let err = http.verify(&LoginRequest { identifier: "pat@h.com".into(), secret: "nope".into() }).await.unwrap_err();
    assert!(!err.is_transient());
    let err = http.validate_token("garbage").await.unwrap_err();
    assert!(!err.is_transient());

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn resolver_end_to_end() -> anyhow::Result<()> {
    let (base, handle) = spawn_server().await?;
    let resolver = resolver_for(&base).await?;

    let res = resolver.resolve(Credential::new(Role::Doctor, "pat@h.com", PASSWORD)).await;
    assert_eq!(res, Resolution::Settled(AuthResult::failure(FailureReason::RoleMismatch)));
    assert!(resolver.store().current().is_none());

    let res = resolver.resolve(Credential::new(Role::Doctor, "dr@h.com", "wrong")).await;
    assert_eq!(res.into_result().and_then(|r| r.failure_reason()), Some(FailureReason::InvalidCredentials));

    let res = resolver.resolve(Credential::new(Role::Doctor, "dr@h.com", PASSWORD)).await;
    let Some(AuthResult::Success { session, landing_route }) = res.into_result() else { panic!("doctor login failed") };
    assert_eq!(session.role, Role::Doctor);
    assert_eq!(landing_route, "/doctor/dashboard");

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn resolver_reports_unreachable_service() -> anyhow::Result<()> {
    // grab a free port, then close it again
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let base = format!("http://{}", listener.local_addr()?);
    drop(listener);

    let resolver = resolver_for(&base).await?;
    let res = resolver.resolve(Credential::new(Role::Patient, "pat@h.com", PASSWORD)).await;
    assert_eq!(res.into_result().and_then(|r| r.failure_reason()), Some(FailureReason::ServiceUnavailable));
    assert!(resolver.store().current().is_none());
    Ok(())
}
