use anyhow::Result;
use pracht_alpha::config::Config;
use pracht_alpha::entities::EntitySet;
use pracht_alpha::logging::init_logging;
use pracht_alpha::setup::{Bridge, SetupFailure};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Delay between setup attempts while the wallbox is unreachable
const SETUP_RETRY_DELAY: Duration = Duration::from_secs(30);

async fn connect(config: &Config) -> Result<Option<Bridge>> {
    loop {
        let attempt = tokio::select! {
            result = Bridge::setup(config) => result,
            _ = tokio::signal::ctrl_c() => return Ok(None),
        };
        match attempt {
            Ok(bridge) => return Ok(Some(bridge)),
            Err(SetupFailure::AuthFailed { message }) => {
                return Err(anyhow::anyhow!(
                    "{}; update the password in the configuration",
                    message
                ));
            }
            Err(failure @ SetupFailure::NotReady { .. }) => {
                warn!(
                    "{}; retrying in {}s",
                    failure,
                    SETUP_RETRY_DELAY.as_secs()
                );
                tokio::select! {
                    _ = tokio::time::sleep(SETUP_RETRY_DELAY) => {}
                    _ = tokio::signal::ctrl_c() => return Ok(None),
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config =
        Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Pracht Alpha bridge {} starting, wallbox at {}",
        env!("APP_VERSION"),
        config.device.host
    );

    let Some(bridge) = connect(&config).await? else {
        info!("Interrupted before the wallbox was ready");
        return Ok(());
    };

    let coordinator = bridge.coordinator();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let poll_task = {
        let coordinator = coordinator.clone();
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { coordinator.run(shutdown).await })
    };

    let entities = match coordinator.data() {
        Some(data) => EntitySet::load(&data, bridge.host(), bridge.api().as_ref()).await,
        None => return Err(anyhow::anyhow!("Setup finished without a snapshot")),
    };
    info!("Exposing {} entities", entities.keys().len());

    #[cfg(feature = "web")]
    let web_task = if config.web.enabled {
        let state = pracht_alpha::web::AppState::new(coordinator.clone(), entities);
        let host = config.web.host.clone();
        let port = config.web.port;
        let shutdown = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = pracht_alpha::web::serve(state, &host, port, shutdown).await {
                error!("Web server error: {}", e);
            }
        }))
    } else {
        None
    };
    #[cfg(not(feature = "web"))]
    drop(entities);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    let _ = shutdown_tx.send(true);

    match poll_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Poll loop failed: {}", e),
        Err(e) => error!("Poll task panicked: {}", e),
    }
    #[cfg(feature = "web")]
    if let Some(task) = web_task {
        let _ = task.await;
    }

    info!("Shutdown complete");
    Ok(())
}
