use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{
    HeaderValue, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use parley_api::auth::{AppState, AppStateInner};
use parley_api::llm::LlmProxy;
use parley_store::messages::MessageLog;
use parley_store::users::UserStore;

const DEFAULT_SESSION_SECRET: &str = "dev-secret-change-me";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let host = std::env::var("PARLEY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PARLEY_PORT")
        .unwrap_or_else(|_| "5000".into())
        .parse()?;
    let data_dir: PathBuf = std::env::var("PARLEY_DATA_DIR")
        .unwrap_or_else(|_| "./data".into())
        .into();
    let session_secret =
        std::env::var("PARLEY_SESSION_SECRET").unwrap_or_else(|_| DEFAULT_SESSION_SECRET.into());
    if session_secret == DEFAULT_SESSION_SECRET {
        warn!("PARLEY_SESSION_SECRET is unset; sessions are signed with the development default");
    }
    let llm_url =
        std::env::var("PARLEY_LLM_URL").unwrap_or_else(|_| "http://localhost:11434".into());
    let chat_timeout = env_secs("PARLEY_LLM_CHAT_TIMEOUT_SECS", 120);
    let models_timeout = env_secs("PARLEY_LLM_MODELS_TIMEOUT_SECS", 10);
    let allowed_origins = std::env::var("PARLEY_ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:5000,http://127.0.0.1:5000".into());

    // Both stores live under one data directory
    tokio::fs::create_dir_all(&data_dir).await?;
    info!("Data directory: {}", data_dir.display());

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        users: UserStore::new(data_dir.join("users.json")),
        messages: MessageLog::new(data_dir.join("messages.json")),
        session_secret,
        llm: LlmProxy::new(
            llm_url,
            Duration::from_secs(chat_timeout),
            Duration::from_secs(models_timeout),
        ),
    });

    // CORS: credentialed requests from the configured browser origins only
    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let app = parley_api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Parley server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn env_secs(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
