use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use rand_core::RngCore;
use sea_orm::Database;
use std::sync::Arc;
use tenantbase::api::{AppState, api_router, jwt::JwtConfig};
use tenantbase::auth::Auth;
use tenantbase::notify::LogNotifier;
use tenantbase::reset::PasswordReset;
use tenantbase::tenants::Tenants;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "tenantbase", about = "TenantBase multi-tenant SaaS backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server (default)
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Init structured logging (respects RUST_LOG; defaults to info)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Load .env if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url = std::env::var("TB_DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://tenantbase.db?mode=rwc".to_string());

    let db = Database::connect(&database_url).await?;
    Migrator::up(&db, None).await?;

    tracing::info!("database initialized");

    match cli.command {
        None | Some(Commands::Serve) => serve(db).await?,
    }

    Ok(())
}

async fn serve(db: sea_orm::DatabaseConnection) -> Result<(), Box<dyn std::error::Error>> {
    let jwt_secret = std::env::var("TB_JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!(
            "TB_JWT_SECRET not set; using a random secret. \
             Tokens will be invalidated on every restart."
        );
        let mut bytes = [0u8; 32];
        rand_core::OsRng.fill_bytes(&mut bytes);
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    });

    let jwt = JwtConfig {
        secret: jwt_secret,
        issuer: std::env::var("TB_JWT_ISSUER").unwrap_or_else(|_| "tenantbase".to_string()),
        audience: std::env::var("TB_JWT_AUDIENCE").unwrap_or_else(|_| "tenantbase".to_string()),
        access_ttl_minutes: std::env::var("TB_JWT_EXPIRY_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60),
    };

    let state = AppState {
        auth: Arc::new(Auth::new(db.clone())),
        tenants: Arc::new(Tenants::new(db.clone())),
        reset: Arc::new(PasswordReset::new(db.clone(), Arc::new(LogNotifier))),
        db,
        jwt,
    };

    let bind_addr = std::env::var("TB_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "API online");

    axum::serve(listener, api_router(state)).await?;

    Ok(())
}
