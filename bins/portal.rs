use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use models::{AuthResult, Credential, Role, RouteTable};
use serde_json::json;
use service::auth::{HttpAuthCollaborator, NavigationGuard, Resolution, ResolverConfig, RestoreOutcome, SessionResolver};
use service::storage::SessionStore;
use tracing::{error, info};

/// Command-line stand-in for the portal login views.
#[derive(Parser)]
#[command(name = "portal", version, about = "Health portal session client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in through the login form of one role
    Login {
        #[arg(long)]
        role: Role,
        /// Email, or staff ID for staff
        #[arg(long)]
        identifier: String,
        #[arg(long, env = "PORTAL_SECRET", hide_env_values = true)]
        secret: String,
        /// Keep the session after this process exits
        #[arg(long)]
        remember: bool,
    },
    /// Re-validate the stored session and show it
    Whoami,
    /// Clear the stored session
    Logout,
    /// Check whether the stored session may open a route
    Guard { path: String },
}

struct Portal {
    resolver: SessionResolver<HttpAuthCollaborator>,
    routes: Arc<RouteTable>,
}

async fn open_store(cfg: &configs::AppConfig) -> anyhow::Result<Arc<SessionStore>> {
    common::env::ensure_parent_dir(&cfg.storage.session_path).await?;
    Ok(SessionStore::init(cfg.storage.session_path.clone()).await?)
}

async fn build_portal(cfg: &configs::AppConfig) -> anyhow::Result<Portal> {
    let store = open_store(cfg).await?;
    let routes = Arc::new(RouteTable::from_config(cfg)?);
    let http = Arc::new(HttpAuthCollaborator::from_config(&cfg.auth)?);
    let resolver = SessionResolver::new(http, store, Arc::clone(&routes), ResolverConfig::from_app_config(cfg));
    Ok(Portal { resolver, routes })
}

fn print(value: serde_json::Value) {
    println!("{value}");
}

async fn login(portal: &Portal, credential: Credential) -> anyhow::Result<ExitCode> {
    let remember = credential.remember_me;
    match portal.resolver.resolve(credential).await {
        Resolution::Settled(AuthResult::Success { session, landing_route }) => {
            print(json!({
                "status": "ok",
                "role": session.role,
                "display_name": session.display_name,
                "landing_route": landing_route,
                "remembered": remember,
            }));
            Ok(ExitCode::SUCCESS)
        }
        Resolution::Settled(AuthResult::Failure { reason }) => {
            print(json!({"status": "failed", "reason": reason, "message": reason.user_message()}));
            Ok(ExitCode::FAILURE)
        }
        other => anyhow::bail!("login did not settle: {other:?}"),
    }
}

async fn whoami(portal: &Portal) -> anyhow::Result<ExitCode> {
    match portal.resolver.restore().await? {
        RestoreOutcome::Restored { session, landing_route } => {
            print(json!({
                "status": "signed_in",
                "user_id": session.user_id,
                "role": session.role,
                "display_name": session.display_name,
                "issued_at": session.issued_at,
                "landing_route": landing_route,
            }));
            Ok(ExitCode::SUCCESS)
        }
        RestoreOutcome::Empty => {
            print(json!({"status": "signed_out"}));
            Ok(ExitCode::FAILURE)
        }
        RestoreOutcome::Invalidated => {
            print(json!({"status": "expired"}));
            Ok(ExitCode::FAILURE)
        }
        RestoreOutcome::Unavailable => {
            print(json!({"status": "unknown", "message": "the sign-in service is unavailable"}));
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn guard(portal: &Portal, path: &str) -> anyhow::Result<ExitCode> {
    // only a re-validated session may authorize navigation
    portal.resolver.restore().await?;
    let current = portal.resolver.store().current();
    let guard = NavigationGuard::new(Arc::clone(&portal.routes));
    match guard.authorize(current.as_deref(), path) {
        Ok(()) => {
            print(json!({"allowed": true, "path": path}));
            Ok(ExitCode::SUCCESS)
        }
        Err(denial) => {
            print(json!({"allowed": false, "path": path, "reason": denial.to_string(), "redirect": denial.redirect()}));
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let cfg = configs::AppConfig::load_and_validate()?;
    match cli.command {
        Command::Logout => {
            open_store(&cfg).await?.clear().await?;
            print(json!({"status": "signed_out"}));
            Ok(ExitCode::SUCCESS)
        }
        Command::Login { role, identifier, secret, remember } => {
            let portal = build_portal(&cfg).await?;
            login(&portal, Credential::new(role, identifier, secret).remember(remember)).await
        }
        Command::Whoami => whoami(&build_portal(&cfg).await?).await,
        Command::Guard { path } => guard(&build_portal(&cfg).await?, &path).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    common::utils::logging::init_logging_default();
    let cli = Cli::parse();
    info!(service = "portal", event = "start", "portal client starting");
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(service = "portal", event = "failed", error = %e, "portal command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
