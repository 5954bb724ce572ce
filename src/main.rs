use anyhow::Result;
use package_tracker::{
    config::{AppConfig, StartupAction},
    routes::routes::app,
    services::AppState,
    store::sqlite::SqliteStore,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{io::ErrorKind, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + startup action ---
    let (cfg, action) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting package-tracker with config: {:?}", cfg);

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    let connect_opts = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);

    let db_path = connect_opts.get_filename();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }
    tracing::debug!("Interpreted SQLite path => {}", db_path.display());

    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_opts)
            .await?,
    );
    let store = SqliteStore::new(db);

    match action {
        StartupAction::Migrate => {
            let applied = store.migrate().await?;
            tracing::info!("Database migration complete ({} statements).", applied);
            return Ok(());
        }
        StartupAction::IssueKey { operator, country } => {
            let state = AppState::new(Arc::new(store));
            let key = state.auth.issue_key(&operator, &country).await?;
            println!("{key}");
            return Ok(());
        }
        StartupAction::Serve => {}
    }

    // --- Initialize services ---
    let state = AppState::new(Arc::new(store));

    // --- Build router ---
    let app = app(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
