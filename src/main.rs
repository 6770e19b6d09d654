//! xlined - runs the ban line service against a configuration file.
//!
//! The transport layer is not part of this binary: disconnects and link
//! announcements produced by the service are logged.

use slircd_xline::XLineService;
use slircd_xline::config::{self, Config};
use slircd_xline::xline::LinkObserver;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "xlined.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "configuration has {} error(s); see above",
            errors.len()
        ));
    }

    info!(
        server = %config.server.name,
        network = %config.server.network,
        "Starting xlined"
    );

    let (disconnect_tx, mut disconnect_rx) = mpsc::unbounded_channel();
    let (link_tx, mut link_rx) = mpsc::unbounded_channel();

    let mut service = XLineService::from_config(&config, disconnect_tx);
    service
        .manager_mut()
        .add_observer(Arc::new(LinkObserver::new(link_tx)));
    let _handle = service.spawn();

    loop {
        tokio::select! {
            Some(d) = disconnect_rx.recv() => {
                info!(uid = %d.uid, nick = %d.nick, reason = %d.quit_reason, "disconnect");
            }
            Some(msg) = link_rx.recv() => {
                info!(%msg, "link");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
