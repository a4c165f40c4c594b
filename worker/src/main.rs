use anyhow::{Context, Result};
use billing_core::{
    domain::{
        clock::{Clock, SystemClock},
        repositories::{
            gateway_settings::GatewaySettingsRepository, payments::PaymentRepository,
            resources::ResourceRepository, subscriptions::SubscriptionRepository,
        },
        value_objects::sweeps::SweepKind,
    },
    infra::db::{
        postgres::postgres_connection,
        repositories::{
            gateway_settings::GatewaySettingsPostgres, payments::PaymentPostgres,
            resources::ResourcePostgres, subscriptions::SubscriptionPostgres,
        },
    },
    payments::{mercado_pago_client::MercadoPagoClient, stripe_client::StripeClient},
    usecases::{
        billing_scheduler::{BillingScheduler, SchedulerSettings},
        payment_orchestrator::PaymentOrchestrator,
        resource_catalog::ResourceCatalog,
    },
};
use std::sync::Arc;
use tracing::{error, info};
use worker::{config, services::sweep_loop};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(error) = run().await {
        error!("Worker exited with error: {:#}", error);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    billing_core::observability::init_observability("worker")?;

    let dotenvy_env = config::config_loader::load()?;
    info!(stage = %dotenvy_env.stage, "ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        dotenvy_env.database.max_connections,
    )?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);

    let resource_repository: Arc<dyn ResourceRepository + Send + Sync> =
        Arc::new(ResourcePostgres::new(Arc::clone(&db_pool_arc)));
    let catalog = ResourceCatalog::load(resource_repository)
        .await
        .context("resource catalog does not match the known resource keys")?;
    info!(resource_count = catalog.len(), "Resource catalog validated");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let subscription_repository: Arc<dyn SubscriptionRepository + Send + Sync> =
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool_arc)));
    let payment_repository: Arc<dyn PaymentRepository + Send + Sync> =
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool_arc)));
    let gateway_settings_repository: Arc<dyn GatewaySettingsRepository + Send + Sync> =
        Arc::new(GatewaySettingsPostgres::new(Arc::clone(&db_pool_arc)));

    let orchestrator = PaymentOrchestrator::new(
        Arc::clone(&payment_repository),
        gateway_settings_repository,
        Arc::clone(&clock),
        dotenvy_env.gateways.charge_timeout,
    )
    .with_gateway(Arc::new(StripeClient::new()))
    .with_gateway(Arc::new(MercadoPagoClient::new()));

    let settings = SchedulerSettings {
        grace_period: chrono::Duration::days(dotenvy_env.billing.overdue_grace_days),
        renewal_lead: chrono::Duration::days(dotenvy_env.billing.renewal_lead_days),
        concurrency: dotenvy_env.sweeps.concurrency,
    };

    let scheduler = Arc::new(BillingScheduler::new(
        clock,
        subscription_repository,
        payment_repository,
        Arc::new(orchestrator),
        settings,
    ));

    let settings = scheduler.settings();
    info!(
        grace_days = settings.grace_period.num_days(),
        renewal_lead_days = settings.renewal_lead.num_days(),
        concurrency = settings.concurrency,
        "Worker started"
    );

    let overdue_loop = tokio::spawn(sweep_loop::run_sweep_loop(
        Arc::clone(&scheduler),
        SweepKind::Overdue,
        dotenvy_env.sweeps.overdue_interval,
    ));
    let renewal_loop = tokio::spawn(sweep_loop::run_sweep_loop(
        Arc::clone(&scheduler),
        SweepKind::Renewal,
        dotenvy_env.sweeps.renewal_interval,
    ));

    tokio::select! {
        result = overdue_loop => result??,
        result = renewal_loop => result??,
    };
    Ok(())
}
