use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use rabbit_api::auth::{AppState, AppStateInner};
use rabbit_api::mailer::LogMailer;
use rabbit_api::otp::{self, OtpStore};
use rabbit_store::{FieldTrim, Store, StoreConfig};

const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your-secret-key",
];

const OTP_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rabbit=debug,rabbit_api=debug,rabbit_store=debug,tower_http=debug".into()
            }),
        )
        .init();

    // Config
    let jwt_secret = std::env::var("RABBIT_JWT_SECRET").unwrap_or_default();
    if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
        eprintln!("FATAL: RABBIT_JWT_SECRET is unset or still a placeholder.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    let storage_dir: PathBuf = std::env::var("RABBIT_STORAGE_DIR")
        .unwrap_or_else(|_| "./user-storage".into())
        .into();
    let host = std::env::var("RABBIT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("RABBIT_PORT")
        .unwrap_or_else(|_| "5000".into())
        .parse()?;
    let otp_ttl_secs: u64 = std::env::var("RABBIT_OTP_TTL_SECS")
        .unwrap_or_else(|_| "600".into())
        .parse()?;
    let trim_fields: bool = std::env::var("RABBIT_TRIM_FIELDS")
        .unwrap_or_else(|_| "false".into())
        .parse()?;

    // Init storage
    let mut store_config = StoreConfig::new(storage_dir);
    if trim_fields {
        store_config.field_trim = FieldTrim::Trim;
    }
    let store = Store::open(store_config)?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        store,
        jwt_secret,
        otps: OtpStore::new(Duration::from_secs(otp_ttl_secs)),
        mailer: Box::new(LogMailer),
    });

    tokio::spawn(otp::run_sweep_loop(state.clone(), OTP_SWEEP_INTERVAL));

    let app = rabbit_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Rabbit server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
