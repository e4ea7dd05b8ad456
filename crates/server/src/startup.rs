use std::net::SocketAddr;

use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::accounts::{seed_demo_accounts, AccountDirectory};
use crate::errors::StartupError;
use crate::routes::{self, auth};
use crate::tokens::TokenIssuer;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &configs::ServerConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("server address: {e}")))
}

/// Open the account directory, seeding demo accounts into an empty one.
pub async fn build_state(cfg: &configs::AppConfig) -> anyhow::Result<auth::ServerState> {
    common::env::ensure_parent_dir(&cfg.server.accounts_path).await?;
    let accounts = AccountDirectory::open(cfg.server.accounts_path.clone()).await?;
    if accounts.is_empty().await {
        let password = std::env::var("DEMO_PASSWORD").unwrap_or_else(|_| "portal-demo".to_string());
        warn!(path = %cfg.server.accounts_path, "account directory empty; seeding demo accounts");
        seed_demo_accounts(&accounts, &password).await?;
    }
    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".to_string());
    Ok(auth::ServerState { accounts, tokens: TokenIssuer::new(jwt_secret) })
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = configs::AppConfig::load_and_validate()?;
    let state = build_state(&cfg).await?;

    if let Some(admin_addr) = &cfg.server.admin_addr {
        common::admin_http::spawn_admin_server(admin_addr, service::observability::encode_metrics).await?;
    }

    let app = routes::build_router(state, build_cors());
    let addr = bind_addr(&cfg.server)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "demo auth server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
