use std::{sync::Arc, time::Duration};

use anyhow::Result;
use billing_core::{
    domain::value_objects::sweeps::SweepKind, usecases::billing_scheduler::BillingScheduler,
};
use tracing::{error, info};

/// Runs one sweep kind forever: sweep, then sleep for `interval`.
pub async fn run_sweep_loop(
    scheduler: Arc<BillingScheduler>,
    kind: SweepKind,
    interval: Duration,
) -> Result<()> {
    info!(sweep = %kind, interval_secs = interval.as_secs(), "sweep_loop: started");

    loop {
        let result = match kind {
            SweepKind::Overdue => scheduler.run_overdue_sweep().await,
            SweepKind::Renewal => scheduler.run_renewal_sweep().await,
        };

        if let Err(err) = result {
            error!(sweep = %kind, error = ?err, "sweep_loop: sweep aborted");
        }

        tokio::time::sleep(interval).await;
    }
}
