use chat_desk::config::CONFIG;
use chat_desk::service::{accounts, cleanup};
use chat_desk::{DeskState, DeskStorage, desk_router};
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &*CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        listen_addr = %cfg.listen_addr,
        database_url = %cfg.database_url,
        loglevel = %cfg.loglevel,
        insecure_cookie = cfg.insecure_cookie,
        cleanup_enabled = cfg.cleanup_enabled,
        retention_hours = cfg.retention_hours,
    );

    let storage = DeskStorage::connect(&cfg.database_url).await?;

    match accounts::seed_admin(
        &storage,
        cfg.admin_username.as_deref(),
        cfg.admin_password.as_deref(),
    )
    .await
    {
        Ok(Some(admin)) => info!(username = %admin.username, "seeded admin from configuration"),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "failed to seed admin from configuration"),
    }

    let retention = cleanup::RetentionPolicy::new(cfg.retention());
    if cfg.cleanup_enabled {
        cleanup::spawn_schedule(storage.clone(), retention, cfg.cleanup_interval());
    }

    let state = DeskState::new(
        storage,
        cfg.cookie_key(),
        !cfg.insecure_cookie,
        retention,
        cfg.cleanup_enabled,
    );
    let app = desk_router(state);

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
