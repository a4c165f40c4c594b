use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use futures_util::{StreamExt, stream};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::{
    clock::Clock,
    repositories::{payments::PaymentRepository, subscriptions::SubscriptionRepository},
    value_objects::{
        enums::{
            payment_statuses::PaymentStatus,
            subscription_payment_statuses::SubscriptionPaymentStatus,
            subscription_statuses::SubscriptionStatus,
        },
        subscriptions::{InvalidTransition, SubscriptionModel},
        sweeps::{ItemOutcome, SweepKind, SweepReport},
    },
};
use crate::usecases::payment_orchestrator::PaymentOrchestrator;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("subscription {0} not found")]
    SubscriptionNotFound(Uuid),
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error("subscription {0} was modified concurrently")]
    StaleSubscription(Uuid),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BillingError {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            BillingError::SubscriptionNotFound(_) => StatusCode::NOT_FOUND,
            BillingError::InvalidTransition(_) | BillingError::StaleSubscription(_) => {
                StatusCode::CONFLICT
            }
            BillingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type BillingResult<T> = std::result::Result<T, BillingError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// How long a payment may stay unsettled before the subscription expires.
    pub grace_period: Duration,
    /// How long before the next due date the renewal payment is opened.
    pub renewal_lead: Duration,
    /// Subscriptions processed at the same time within one sweep.
    pub concurrency: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            grace_period: Duration::days(7),
            renewal_lead: Duration::days(3),
            concurrency: 4,
        }
    }
}

pub struct BillingScheduler {
    clock: Arc<dyn Clock>,
    subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
    payment_repo: Arc<dyn PaymentRepository + Send + Sync>,
    orchestrator: Arc<PaymentOrchestrator>,
    settings: SchedulerSettings,
}

impl BillingScheduler {
    pub fn new(
        clock: Arc<dyn Clock>,
        subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
        payment_repo: Arc<dyn PaymentRepository + Send + Sync>,
        orchestrator: Arc<PaymentOrchestrator>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            clock,
            subscription_repo,
            payment_repo,
            orchestrator,
            settings,
        }
    }

    pub fn settings(&self) -> SchedulerSettings {
        self.settings
    }

    /// Ages unsettled subscriptions: expires the ones past the grace period and
    /// opens (or retries) a payment for the others.
    pub async fn run_overdue_sweep(&self) -> BillingResult<SweepReport> {
        info!("billing_scheduler: starting overdue sweep");
        let candidates = self
            .subscription_repo
            .list_overdue_candidates()
            .await
            .map_err(|err| {
                error!(db_error = ?err, "billing_scheduler: failed to list overdue candidates");
                BillingError::Internal(err)
            })?;

        let results = stream::iter(candidates)
            .map(|subscription| async move {
                let subscription_id = subscription.id;
                (subscription_id, self.process_overdue(subscription).await)
            })
            .buffer_unordered(self.concurrency())
            .collect::<Vec<_>>()
            .await;

        Ok(self.summarize(SweepKind::Overdue, results))
    }

    /// Opens the next billing period for settled subscriptions whose next due
    /// date falls inside the renewal lead window.
    pub async fn run_renewal_sweep(&self) -> BillingResult<SweepReport> {
        info!("billing_scheduler: starting renewal sweep");
        let candidates = self
            .subscription_repo
            .list_renewal_candidates()
            .await
            .map_err(|err| {
                error!(db_error = ?err, "billing_scheduler: failed to list renewal candidates");
                BillingError::Internal(err)
            })?;

        let results = stream::iter(candidates)
            .map(|subscription| async move {
                let subscription_id = subscription.id;
                (subscription_id, self.process_renewal(subscription).await)
            })
            .buffer_unordered(self.concurrency())
            .collect::<Vec<_>>()
            .await;

        Ok(self.summarize(SweepKind::Renewal, results))
    }

    /// Overdue processing for one subscription, on operator request.
    pub async fn force_process_overdue(&self, subscription_id: Uuid) -> BillingResult<ItemOutcome> {
        info!(%subscription_id, "billing_scheduler: forced overdue processing");
        let subscription = self.load(subscription_id).await?;
        let outcome = self.process_overdue(subscription).await?;
        info!(
            %subscription_id,
            outcome = ?outcome,
            "billing_scheduler: forced overdue processing finished"
        );
        Ok(outcome)
    }

    /// Operator override back to active and paid, whatever the current status.
    /// A payment still pending from before the override is superseded as failed.
    pub async fn reactivate(&self, subscription_id: Uuid) -> BillingResult<SubscriptionModel> {
        let mut subscription = self.load(subscription_id).await?;
        let previous_status = subscription.status;

        let pending = self
            .payment_repo
            .find_latest_by_status(subscription_id, PaymentStatus::Pending)
            .await?;
        if let Some(payment) = pending {
            if self
                .payment_repo
                .settle_pending(payment.id, PaymentStatus::Failed)
                .await?
            {
                warn!(
                    %subscription_id,
                    payment_id = %payment.id,
                    "billing_scheduler: pending payment superseded by reactivation"
                );
            }
        }

        subscription.force_reactivate(self.clock.now());
        let subscription = self.persist(subscription).await?;

        warn!(
            %subscription_id,
            %previous_status,
            "billing_scheduler: subscription reactivated by operator"
        );
        Ok(subscription)
    }

    pub async fn cancel(&self, subscription_id: Uuid) -> BillingResult<SubscriptionModel> {
        let mut subscription = self.load(subscription_id).await?;

        subscription.cancel(self.clock.now()).inspect_err(|err| {
            warn!(%subscription_id, error = %err, "billing_scheduler: cancel rejected");
        })?;
        let subscription = self.persist(subscription).await?;

        info!(%subscription_id, "billing_scheduler: subscription cancelled");
        Ok(subscription)
    }

    async fn process_overdue(&self, subscription: SubscriptionModel) -> BillingResult<ItemOutcome> {
        if !is_overdue_candidate(&subscription) {
            debug!(
                subscription_id = %subscription.id,
                status = %subscription.status,
                payment_status = %subscription.payment_status,
                "billing_scheduler: not an overdue candidate, skipping"
            );
            return Ok(ItemOutcome::Skipped);
        }

        let now = self.clock.now();
        let first_unsettled = self
            .payment_repo
            .find_first_unsettled_since(subscription.id, subscription.unsettled_since())
            .await?;

        if let Some(payment) = first_unsettled.filter(|p| p.age(now) > self.settings.grace_period) {
            info!(
                subscription_id = %subscription.id,
                payment_id = %payment.id,
                payment_status = %payment.status,
                payment_created_at = %payment.created_at,
                "billing_scheduler: period unsettled past grace period, expiring subscription"
            );
            return self.expire(subscription, now).await;
        }

        let pending = self
            .payment_repo
            .find_latest_by_status(subscription.id, PaymentStatus::Pending)
            .await?;

        if let Some(payment) = pending {
            if payment.awaiting_submission() {
                debug!(
                    subscription_id = %subscription.id,
                    payment_id = %payment.id,
                    "billing_scheduler: pending payment never reached a gateway, retrying charge"
                );
                self.orchestrator
                    .attempt_auto_charge(&payment, &subscription)
                    .await;
                return Ok(ItemOutcome::ChargeRetried);
            }

            return Ok(ItemOutcome::AwaitingSettlement);
        }

        match self.orchestrator.create_pending_payment(&subscription).await? {
            Some(payment) => {
                self.orchestrator
                    .attempt_auto_charge(&payment, &subscription)
                    .await;
                Ok(ItemOutcome::PaymentOpened {
                    payment_id: payment.id,
                })
            }
            None => Ok(ItemOutcome::AwaitingSettlement),
        }
    }

    async fn process_renewal(&self, subscription: SubscriptionModel) -> BillingResult<ItemOutcome> {
        if !is_renewal_candidate(&subscription) {
            return Ok(ItemOutcome::Skipped);
        }

        let now = self.clock.now();
        let next_due = subscription.upcoming_due_date().ok_or_else(|| {
            anyhow!(
                "next due date after {} overflows for subscription {}",
                subscription.current_due_date(),
                subscription.id
            )
        })?;
        let window_opens = next_due - self.settings.renewal_lead;

        if window_opens > now {
            debug!(
                subscription_id = %subscription.id,
                %next_due,
                "billing_scheduler: next period not due yet"
            );
            return Ok(ItemOutcome::NotDue);
        }

        let payment = match self.orchestrator.create_pending_payment(&subscription).await? {
            Some(payment) => payment,
            None => {
                // Only a payment opened inside this window belongs to the new period.
                let pending = self
                    .payment_repo
                    .find_latest_by_status(subscription.id, PaymentStatus::Pending)
                    .await?;
                match pending.filter(|p| p.created_at >= window_opens) {
                    Some(payment) => payment,
                    None => {
                        warn!(
                            subscription_id = %subscription.id,
                            %next_due,
                            "billing_scheduler: a pending payment from an earlier period blocks renewal"
                        );
                        return Ok(ItemOutcome::Skipped);
                    }
                }
            }
        };

        let mut renewed = subscription;
        renewed.payment_status = SubscriptionPaymentStatus::Pending;
        renewed.next_due_date = Some(next_due);
        renewed.period_started_at = Some(payment.created_at);
        let renewed = self.persist(renewed).await?;

        info!(
            subscription_id = %renewed.id,
            cycle = %renewed.cycle,
            %next_due,
            payment_id = %payment.id,
            "billing_scheduler: billing period renewed"
        );

        Ok(ItemOutcome::Renewed {
            payment_id: payment.id,
        })
    }

    async fn expire(
        &self,
        mut subscription: SubscriptionModel,
        now: DateTime<Utc>,
    ) -> BillingResult<ItemOutcome> {
        if subscription.status == SubscriptionStatus::Expired {
            return Ok(ItemOutcome::Skipped);
        }

        subscription.expire(now)?;
        self.persist(subscription).await?;
        Ok(ItemOutcome::Expired)
    }

    async fn load(&self, subscription_id: Uuid) -> BillingResult<SubscriptionModel> {
        self.subscription_repo
            .find_by_id(subscription_id)
            .await
            .map_err(|err| {
                error!(
                    %subscription_id,
                    db_error = ?err,
                    "billing_scheduler: failed to load subscription"
                );
                BillingError::Internal(err)
            })?
            .ok_or(BillingError::SubscriptionNotFound(subscription_id))
    }

    /// Writes the billing columns, guarded by the `updated_at` that was read.
    async fn persist(&self, mut subscription: SubscriptionModel) -> BillingResult<SubscriptionModel> {
        let now = self.clock.now();
        let applied = self
            .subscription_repo
            .update_billing_state(subscription.billing_update(now))
            .await?;

        if !applied {
            return Err(BillingError::StaleSubscription(subscription.id));
        }

        subscription.updated_at = now;
        Ok(subscription)
    }

    fn concurrency(&self) -> usize {
        self.settings.concurrency.max(1)
    }

    fn summarize(
        &self,
        kind: SweepKind,
        results: Vec<(Uuid, BillingResult<ItemOutcome>)>,
    ) -> SweepReport {
        let mut report = SweepReport::new(kind);
        report.scanned = results.len();

        for (subscription_id, result) in results {
            match result {
                Ok(outcome) => report.record(&outcome),
                Err(err) => {
                    error!(
                        sweep = %kind,
                        %subscription_id,
                        error = ?err,
                        "billing_scheduler: sweep item failed"
                    );
                    report.record_failure(subscription_id, err.to_string());
                }
            }
        }

        info!(
            sweep = %kind,
            scanned = report.scanned,
            expired = report.expired,
            awaiting_settlement = report.awaiting_settlement,
            charges_retried = report.charges_retried,
            payments_opened = report.payments_opened,
            renewed = report.renewed,
            not_due = report.not_due,
            skipped = report.skipped,
            failed = report.failures.len(),
            "billing_scheduler: sweep finished"
        );

        report
    }
}

fn is_overdue_candidate(subscription: &SubscriptionModel) -> bool {
    subscription.status == SubscriptionStatus::Active
        && subscription.auto_renew
        && matches!(
            subscription.payment_status,
            SubscriptionPaymentStatus::Pending | SubscriptionPaymentStatus::Failed
        )
}

fn is_renewal_candidate(subscription: &SubscriptionModel) -> bool {
    subscription.status == SubscriptionStatus::Active
        && subscription.auto_renew
        && subscription.payment_status == SubscriptionPaymentStatus::Paid
}
