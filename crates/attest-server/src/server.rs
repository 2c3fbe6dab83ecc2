use std::time::Duration;

use attest_sdk::Attest;
use chrono::Utc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// Attest HTTP server.
pub struct AttestServer {
    config: ServerConfig,
    attest: Attest,
}

impl AttestServer {
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let attest = Attest::open(config.attest.clone())?;
        Ok(Self { config, attest })
    }

    pub fn with_attest(config: ServerConfig, attest: Attest) -> Self {
        Self { config, attest }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn attest(&self) -> &Attest {
        &self.attest
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState::new(self.attest.clone()), self.config.max_body_bytes)
    }

    /// Start serving requests. The expiry sweep runs alongside the listener
    /// and stops with it.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let sweeper = self
            .config
            .sweep_interval()
            .map(|period| spawn_sweeper(self.attest.clone(), period));

        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("Attest server listening on {}", self.config.bind_addr);
        let served = axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));

        if let Some(task) = sweeper {
            task.abort();
        }
        served
    }
}

/// Run [`Attest::sweep`] every `period` until the task is aborted.
pub fn spawn_sweeper(attest: Attest, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = attest.sweep(Utc::now()).await {
                tracing::warn!(error = %e, "expiry sweep failed");
            }
        }
    })
}
