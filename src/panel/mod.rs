//! Browser panel: a small axum server in front of the session operations.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

use std::error::Error;
use std::time::Duration;

use tracing::{info, warn};

use crate::core::config::Config;

pub use error::PanelError;
pub use router::build_router;
pub use state::PanelState;

/// Sessions untouched this long are dropped without saving.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Serve the panel on `bind` until Ctrl-C or SIGTERM.
pub async fn serve(config: Config, bind: &str) -> Result<(), Box<dyn Error>> {
    let state = PanelState::from_config(&config)?;
    let listener = tokio::net::TcpListener::bind(bind).await?;
    let addr = listener.local_addr()?;

    info!(%addr, "panel listening");
    println!("🧌 Goblin panel listening on http://{addr}");
    println!("   Press Ctrl+C to stop");

    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticks.tick().await;
            sweeper.sweep_idle(SESSION_IDLE_TIMEOUT);
        }
    });

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!("\n   Panel stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl+C");
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
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
