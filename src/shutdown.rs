use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::scheduler::AnalysisScheduler;

const DEFAULT_GRACE: Duration = Duration::from_secs(10);

/// Graceful shutdown coordinator for ProteogenomiX
pub struct ShutdownCoordinator {
    scheduler: Arc<AnalysisScheduler>,
    grace: Duration,
}

impl ShutdownCoordinator {
    pub fn new(scheduler: Arc<AnalysisScheduler>) -> Self {
        Self {
            scheduler,
            grace: DEFAULT_GRACE,
        }
    }

    /// How long in-flight runs get to record their cancellation.
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Wait for Ctrl-C
    pub async fn wait_for_signal() -> Result<()> {
        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received");
        Ok(())
    }

    /// Cancel in-flight analyses and wait for them to record it.
    ///
    /// Returns the number of runs that were cancelled.
    pub async fn shutdown(&self) -> Result<usize> {
        info!("Initiating graceful shutdown of analysis runs...");

        let cancelled = self.scheduler.cancel_all().await;
        if cancelled > 0 {
            info!(runs = cancelled, "Cancelling in-flight analyses");
        }

        let finished = timeout(self.grace, self.scheduler.wait_all())
            .await
            .map_err(|_| anyhow::anyhow!("Timeout waiting for analysis runs to stop"))?;

        for (id, result) in finished {
            if let Err(e) = result {
                warn!(analysis.id = %id, error = %e, "Analysis run ended with an error");
            }
        }

        info!("Graceful shutdown completed successfully");
        Ok(cancelled)
    }
}
