use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use baranki_catalog::api::{create_api_router, AppState};
use baranki_catalog::config::Config;
use baranki_catalog::connect_database;
use baranki_catalog::entities::{seed_admin, setup_schema};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("baranki_catalog=info,tower_http=info")),
        )
        .init();

    if let Err(err) = run().await {
        error!(error = %err, "Server stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let db = connect_database(&config.database_url, config.max_connections).await?;
    setup_schema(&db).await?;
    if let Some(admin) = &config.admin {
        seed_admin(&db, &admin.username, &admin.password).await?;
    }

    let state = AppState::new(Arc::new(db), &config.secret);
    let app = create_api_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %listener.local_addr()?, "Running");
    axum::serve(listener, app).await?;

    Ok(())
}
