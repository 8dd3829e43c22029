//! `kitforge-bridge` -- runs production jobs through the local design tool.
//!
//! Configuration is read from the environment; see
//! [`BridgeConfig::from_env`](kitforge_bridge::config::BridgeConfig::from_env).

use anyhow::Context;
use kitforge_bridge::client::ApiClient;
use kitforge_bridge::config::BridgeConfig;
use kitforge_bridge::processor::{JobProcessor, ProcessorSettings};
use kitforge_bridge::scheduler::BridgeScheduler;
use kitforge_core::scripting::DesignerExecutor;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kitforge_bridge=info,kitforge_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BridgeConfig::from_env().context("Failed to load bridge configuration")?;
    tracing::info!(
        api_url = %config.api_url,
        designer = %config.designer_path.display(),
        work_dir = %config.work_dir.display(),
        output_dir = %config.output_dir.display(),
        "Starting kitforge-bridge",
    );

    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.work_dir.display()))?;
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;

    let executor = DesignerExecutor::new(&config.designer_path);
    if let Err(e) = executor.check_tool().await {
        tracing::warn!(error = %e, "Design tool is not usable yet; jobs will fail until it is");
    }

    let client = ApiClient::new(config.api_url.clone(), config.http_timeout)
        .context("Failed to build HTTP client")?;
    let processor = JobProcessor::new(
        client,
        executor,
        ProcessorSettings {
            work_dir: config.work_dir.clone(),
            output_dir: config.output_dir.clone(),
            timeout: config.designer_timeout,
        },
    );
    let scheduler = BridgeScheduler::new(processor, config.claim_batch_size, config.poll_interval);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    scheduler.run(cancel).await;
    tracing::info!("Bridge stopped");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
