use std::sync::Arc;

use anyhow::Context;
use fitlink::api::{AppServices, router, spawn_expiry_task};
use fitlink::config::AppConfig;
use fitlink::store::LibSqlBackend;
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    eprintln!("🏋️ FitLink v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://{}", config.bind_addr);
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Handoff delay: {} ms", config.handoff_delay.as_millis());
    eprintln!("   Session TTL: {} s", config.session_ttl.as_secs());

    // ── Database ─────────────────────────────────────────────────────────
    let backend = LibSqlBackend::new_local(&config.db_path)
        .await
        .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?
        .with_bcrypt_cost(config.bcrypt_cost);

    // ── Services ─────────────────────────────────────────────────────────
    let services = AppServices::new(Arc::new(backend), &config);

    // Log auth changes as they happen
    let mut auth_events = services.sessions.subscribe();
    tokio::spawn(async move {
        loop {
            match auth_events.recv().await {
                Ok(event) => tracing::debug!(?event, "Auth event"),
                Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "Auth event log lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let _expiry_handle = spawn_expiry_task(&services, config.session_ttl);

    let app = router(&services);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "FitLink server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}
