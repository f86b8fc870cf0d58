//! # ProjectDesk API Server
//!
//! Loads configuration, connects to PostgreSQL, applies migrations, ensures
//! the bootstrap superuser and serves the REST API until Ctrl-C.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p projectdesk-api
//! ```

use anyhow::Context;
use projectdesk_api::{
    app::{build_router, AppState},
    config::Config,
};
use projectdesk_shared::{
    auth::password::hash_password,
    db::{
        migrations::{get_migration_status, run_migrations},
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    models::{token_blacklist::TokenBlacklist, user::User},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    init_tracing(config.json_logs);

    tracing::info!(
        "ProjectDesk API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(DatabaseConfig::for_url(
        config.database.url.clone(),
        config.database.max_connections,
    ))
    .await
    .context("Failed to connect to database")?;

    if config.run_migrations {
        run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        let status = get_migration_status(&pool).await?;
        tracing::info!(
            applied = status.applied_migrations,
            latest = ?status.latest_version,
            "Database schema up to date"
        );
    }

    let purged = TokenBlacklist::purge_expired(&pool).await?;
    if purged > 0 {
        tracing::info!(purged, "Removed expired blacklist entries");
    }

    if let Some(superuser) = &config.superuser {
        let password_hash = hash_password(&superuser.password)?;
        let created =
            User::ensure_superuser(&pool, &superuser.username, &superuser.email, password_hash)
                .await
                .context("Failed to ensure superuser")?;
        if created {
            tracing::info!(username = %superuser.username, "Superuser created");
        }
    }

    let bind_address = config.bind_address();
    let state = AppState::new(pool.clone(), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "projectdesk_api=debug,projectdesk_shared=debug,tower_http=debug".into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
