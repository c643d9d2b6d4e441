// Bank Ledger - API Server

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use bank_ledger::{api, store};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db_path = std::env::var("LEDGER_DB").unwrap_or_else(|_| "ledger.db".to_string());
    let conn = Connection::open(&db_path)
        .with_context(|| format!("Failed to open database at {db_path}"))?;
    store::setup_database(&conn).context("Failed to set up database schema")?;
    tracing::info!(db = %db_path, "database ready");

    let state = api::AppState::new(conn);
    let app = api::router(state);

    let addr = std::env::var("LEDGER_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    tracing::info!(version = bank_ledger::VERSION, %addr, "ledger server listening");

    axum::serve(listener, app)
        .await
        .context("Server terminated")?;

    Ok(())
}
