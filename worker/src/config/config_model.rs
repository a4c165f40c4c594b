use std::time::Duration;

use super::stage::Stage;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub stage: Stage,
    pub database: Database,
    pub sweeps: Sweeps,
    pub billing: Billing,
    pub gateways: Gateways,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

/// Trigger cadence and pool size; the sweep algorithm never reads these.
#[derive(Debug, Clone)]
pub struct Sweeps {
    pub overdue_interval: Duration,
    pub renewal_interval: Duration,
    pub concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct Billing {
    pub overdue_grace_days: i64,
    pub renewal_lead_days: i64,
}

#[derive(Debug, Clone)]
pub struct Gateways {
    pub charge_timeout: Duration,
}
