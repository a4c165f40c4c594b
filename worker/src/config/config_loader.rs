use std::time::Duration;

use anyhow::{Context, Result, bail};

use super::{
    config_model::{Billing, Database, DotEnvyConfig, Gateways, Sweeps},
    stage::Stage,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Builds the config from an arbitrary key lookup; `load` passes the process env.
pub fn from_lookup<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let stage = match lookup("STAGE").filter(|v| !v.trim().is_empty()) {
        Some(raw) => Stage::try_from(raw.as_str()).context("STAGE is invalid")?,
        None => Stage::default(),
    };

    let database = Database {
        url: lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .context("DATABASE_URL is invalid")?,
        max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
    };

    let overdue_secs: u64 = parse_or(&lookup, "OVERDUE_SWEEP_INTERVAL_SECS", 3600)?;
    let renewal_secs: u64 = parse_or(&lookup, "RENEWAL_SWEEP_INTERVAL_SECS", 86400)?;
    if overdue_secs == 0 || renewal_secs == 0 {
        bail!("sweep intervals must be greater than zero");
    }

    let concurrency: usize = parse_or(&lookup, "SWEEP_CONCURRENCY", 4)?;
    let sweeps = Sweeps {
        overdue_interval: Duration::from_secs(overdue_secs),
        renewal_interval: Duration::from_secs(renewal_secs),
        concurrency: concurrency.max(1),
    };

    let billing = Billing {
        overdue_grace_days: parse_or(&lookup, "OVERDUE_GRACE_DAYS", 7)?,
        renewal_lead_days: parse_or(&lookup, "RENEWAL_LEAD_DAYS", 3)?,
    };
    if billing.overdue_grace_days < 0 || billing.renewal_lead_days < 0 {
        bail!("OVERDUE_GRACE_DAYS and RENEWAL_LEAD_DAYS must not be negative");
    }

    let gateways = Gateways {
        charge_timeout: Duration::from_secs(parse_or(&lookup, "GATEWAY_CHARGE_TIMEOUT_SECS", 15)?),
    };

    Ok(DotEnvyConfig {
        stage,
        database,
        sweeps,
        billing,
        gateways,
    })
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} is invalid")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config =
            from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost:5432/billing")]))
                .unwrap();

        assert_eq!(config.stage, Stage::Local);
        assert_eq!(config.sweeps.overdue_interval, Duration::from_secs(3600));
        assert_eq!(config.sweeps.renewal_interval, Duration::from_secs(86400));
        assert_eq!(config.sweeps.concurrency, 4);
        assert_eq!(config.billing.overdue_grace_days, 7);
        assert_eq!(config.billing.renewal_lead_days, 3);
        assert_eq!(config.gateways.charge_timeout, Duration::from_secs(15));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/billing"),
            ("STAGE", "production"),
            ("OVERDUE_SWEEP_INTERVAL_SECS", "600"),
            ("SWEEP_CONCURRENCY", "0"),
            ("OVERDUE_GRACE_DAYS", "10"),
        ]))
        .unwrap();

        assert_eq!(config.stage, Stage::Production);
        assert_eq!(config.sweeps.overdue_interval, Duration::from_secs(600));
        assert_eq!(config.sweeps.concurrency, 1);
        assert_eq!(config.billing.overdue_grace_days, 10);
    }

    #[test]
    fn missing_database_url_fails() {
        let err = from_lookup(lookup_from(&[])).unwrap_err();

        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn invalid_number_names_the_variable() {
        let err = from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/billing"),
            ("RENEWAL_LEAD_DAYS", "three"),
        ]))
        .unwrap_err();

        assert!(err.to_string().contains("RENEWAL_LEAD_DAYS"));
    }
}
