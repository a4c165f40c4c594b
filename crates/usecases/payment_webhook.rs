use std::sync::Arc;

use anyhow::anyhow;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    clock::Clock,
    repositories::{
        gateway_settings::GatewaySettingsRepository, payments::PaymentRepository,
        subscriptions::SubscriptionRepository,
    },
    value_objects::{
        enums::{
            gateways::GatewayName, payment_statuses::PaymentStatus,
            subscription_payment_statuses::SubscriptionPaymentStatus,
        },
        payments::PaymentModel,
    },
};
use crate::payments::{
    mercado_pago_client::MercadoPagoPayment,
    stripe_client::{self, WEBHOOK_SECRET},
};

const SUBSCRIPTION_UPDATE_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid webhook: {0}")]
    InvalidWebhook(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl WebhookError {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            WebhookError::InvalidWebhook(_) => StatusCode::BAD_REQUEST,
            WebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied {
        payment_id: Uuid,
        status: PaymentStatus,
    },
    /// Status that does not settle a payment (in-flight or unrecognized).
    IgnoredStatus,
    /// No payment of this gateway matches the reported reference.
    UnknownReference,
    /// The payment was already settled; redeliveries land here.
    AlreadySettled,
    /// Event type this boundary does not handle.
    IgnoredEvent,
}

/// Applies gateway confirmations onto payments and their subscription's payment status.
pub struct PaymentWebhookUseCase {
    payment_repo: Arc<dyn PaymentRepository + Send + Sync>,
    subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
    gateway_settings_repo: Arc<dyn GatewaySettingsRepository + Send + Sync>,
    clock: Arc<dyn Clock>,
}

impl PaymentWebhookUseCase {
    pub fn new(
        payment_repo: Arc<dyn PaymentRepository + Send + Sync>,
        subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
        gateway_settings_repo: Arc<dyn GatewaySettingsRepository + Send + Sync>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            payment_repo,
            subscription_repo,
            gateway_settings_repo,
            clock,
        }
    }

    pub async fn handle_stripe_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookOutcome, WebhookError> {
        let webhook_secret = self
            .gateway_settings_repo
            .find_credential(GatewayName::Stripe, WEBHOOK_SECRET.to_string())
            .await?
            .ok_or_else(|| anyhow!("stripe webhook secret is not configured"))?;

        let event = stripe_client::verify_webhook_signature(&webhook_secret, payload, signature)
            .map_err(|err| {
                warn!(error = %err, "payment_webhook: rejected stripe webhook");
                WebhookError::InvalidWebhook(err.to_string())
            })?;

        let Some((external_ref, status)) = event.payment_intent_update() else {
            info!(
                event_type = %event.type_,
                event_id = ?event.id,
                "payment_webhook: ignoring unhandled stripe event"
            );
            return Ok(WebhookOutcome::IgnoredEvent);
        };

        self.apply_gateway_status(GatewayName::Stripe, &external_ref, &status)
            .await
    }

    /// Applies a payment fetched from Mercado Pago after a notification named it.
    pub async fn handle_mercado_pago_payment(
        &self,
        payment: &MercadoPagoPayment,
    ) -> Result<WebhookOutcome, WebhookError> {
        let Some(reference) = payment.external_reference.as_deref() else {
            warn!(
                mp_payment_id = payment.id,
                "payment_webhook: mercado pago payment carries no external reference"
            );
            return Ok(WebhookOutcome::UnknownReference);
        };

        self.apply_gateway_status(GatewayName::MercadoPago, reference, &payment.status)
            .await
    }

    /// `reference` is the Stripe payment intent id, or for Mercado Pago the
    /// `external_reference` it echoes back, which is our payment id.
    pub async fn apply_gateway_status(
        &self,
        gateway: GatewayName,
        reference: &str,
        external_status: &str,
    ) -> Result<WebhookOutcome, WebhookError> {
        let Some(status) = gateway.map_external_status(external_status) else {
            info!(
                %gateway,
                %reference,
                %external_status,
                "payment_webhook: status does not settle the payment, ignoring"
            );
            return Ok(WebhookOutcome::IgnoredStatus);
        };

        let found = self.find_payment(gateway, reference).await.map_err(|err| {
            error!(%reference, db_error = ?err, "payment_webhook: failed to look up payment");
            WebhookError::Internal(err)
        })?;
        let Some(payment) = found.filter(|p| p.gateway.is_none_or(|g| g == gateway)) else {
            warn!(%gateway, %reference, "payment_webhook: no payment for reference");
            return Ok(WebhookOutcome::UnknownReference);
        };

        if payment.status != PaymentStatus::Pending {
            info!(
                payment_id = %payment.id,
                current_status = %payment.status,
                reported_status = %status,
                "payment_webhook: payment already settled"
            );
            return Ok(WebhookOutcome::AlreadySettled);
        }

        if !self.payment_repo.settle_pending(payment.id, status).await? {
            info!(
                payment_id = %payment.id,
                reported_status = %status,
                "payment_webhook: payment settled concurrently"
            );
            return Ok(WebhookOutcome::AlreadySettled);
        }
        self.settle_subscription(payment.subscription_id, status)
            .await?;

        info!(
            payment_id = %payment.id,
            subscription_id = %payment.subscription_id,
            %status,
            "payment_webhook: payment settled"
        );

        Ok(WebhookOutcome::Applied {
            payment_id: payment.id,
            status,
        })
    }

    async fn find_payment(
        &self,
        gateway: GatewayName,
        reference: &str,
    ) -> anyhow::Result<Option<PaymentModel>> {
        match gateway {
            GatewayName::Stripe => {
                self.payment_repo
                    .find_by_external_ref(reference.to_string())
                    .await
            }
            GatewayName::MercadoPago => match Uuid::parse_str(reference) {
                Ok(payment_id) => self.payment_repo.find_by_id(payment_id).await,
                Err(_) => Ok(None),
            },
        }
    }

    async fn settle_subscription(
        &self,
        subscription_id: Uuid,
        status: PaymentStatus,
    ) -> Result<(), WebhookError> {
        let payment_status = match status {
            PaymentStatus::Approved => SubscriptionPaymentStatus::Paid,
            _ => SubscriptionPaymentStatus::Failed,
        };

        for _ in 0..SUBSCRIPTION_UPDATE_ATTEMPTS {
            let Some(mut subscription) = self.subscription_repo.find_by_id(subscription_id).await?
            else {
                warn!(%subscription_id, "payment_webhook: payment belongs to a missing subscription");
                return Ok(());
            };

            subscription.payment_status = payment_status;
            let update = subscription.billing_update(self.clock.now());
            if self.subscription_repo.update_billing_state(update).await? {
                return Ok(());
            }
        }

        Err(WebhookError::Internal(anyhow!(
            "subscription {subscription_id} kept changing while applying payment status"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        clock::ManualClock,
        repositories::{
            gateway_settings::MockGatewaySettingsRepository, payments::MockPaymentRepository,
            subscriptions::MockSubscriptionRepository,
        },
        value_objects::{
            enums::{billing_cycles::BillingCycle, subscription_statuses::SubscriptionStatus},
            subscriptions::SubscriptionModel,
        },
    };
    use crate::payments::stripe_client::tests::sign;
    use chrono::{TimeZone, Utc};
    use mockall::predicate::{always, eq};

    fn subscription() -> SubscriptionModel {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        SubscriptionModel {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            cycle: BillingCycle::Quarterly,
            price_cents: 29900,
            currency: "BRL".to_string(),
            status: SubscriptionStatus::Active,
            payment_status: SubscriptionPaymentStatus::Pending,
            start_date: at,
            end_date: None,
            next_due_date: None,
            period_started_at: None,
            auto_renew: true,
            created_at: at,
            updated_at: at,
        }
    }

    fn submitted_payment(subscription: &SubscriptionModel, external_ref: &str) -> PaymentModel {
        PaymentModel {
            id: Uuid::new_v4(),
            subscription_id: subscription.id,
            amount_cents: subscription.price_cents,
            currency: subscription.currency.clone(),
            status: PaymentStatus::Pending,
            external_ref: Some(external_ref.to_string()),
            gateway: Some(GatewayName::Stripe),
            created_at: subscription.updated_at,
            updated_at: subscription.updated_at,
        }
    }

    fn use_case(
        payment_repo: MockPaymentRepository,
        subscription_repo: MockSubscriptionRepository,
        settings: MockGatewaySettingsRepository,
    ) -> PaymentWebhookUseCase {
        PaymentWebhookUseCase::new(
            Arc::new(payment_repo),
            Arc::new(subscription_repo),
            Arc::new(settings),
            Arc::new(ManualClock::new(Utc::now())),
        )
    }

    #[tokio::test]
    async fn approved_status_marks_subscription_paid() {
        let subscription = subscription();
        let subscription_id = subscription.id;
        let payment = submitted_payment(&subscription, "pi_1");
        let payment_id = payment.id;

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_by_external_ref()
            .with(eq("pi_1".to_string()))
            .returning(move |_| Ok(Some(payment.clone())));
        payment_repo
            .expect_settle_pending()
            .with(eq(payment_id), eq(PaymentStatus::Approved))
            .times(1)
            .returning(|_, _| Ok(true));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_id()
            .with(eq(subscription_id))
            .returning(move |_| Ok(Some(subscription.clone())));
        subscription_repo
            .expect_update_billing_state()
            .withf(|update| {
                update.payment_status == SubscriptionPaymentStatus::Paid
                    && update.status == SubscriptionStatus::Active
            })
            .times(1)
            .returning(|_| Ok(true));

        let use_case = use_case(
            payment_repo,
            subscription_repo,
            MockGatewaySettingsRepository::new(),
        );

        let outcome = use_case
            .apply_gateway_status(GatewayName::Stripe, "pi_1", "succeeded")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Applied {
                payment_id,
                status: PaymentStatus::Approved,
            }
        );
    }

    #[tokio::test]
    async fn rejected_status_marks_subscription_failed_without_expiring() {
        let subscription = subscription();
        let mut payment = submitted_payment(&subscription, "pref_7");
        payment.gateway = Some(GatewayName::MercadoPago);
        let payment_id = payment.id;

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_find_by_external_ref().never();
        payment_repo
            .expect_find_by_id()
            .with(eq(payment_id))
            .returning(move |_| Ok(Some(payment.clone())));
        payment_repo
            .expect_settle_pending()
            .with(always(), eq(PaymentStatus::Failed))
            .times(1)
            .returning(|_, _| Ok(true));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(subscription.clone())));
        subscription_repo
            .expect_update_billing_state()
            .withf(|update| {
                update.payment_status == SubscriptionPaymentStatus::Failed
                    && update.status == SubscriptionStatus::Active
                    && update.end_date.is_none()
            })
            .times(1)
            .returning(|_| Ok(true));

        let use_case = use_case(
            payment_repo,
            subscription_repo,
            MockGatewaySettingsRepository::new(),
        );

        let outcome = use_case
            .apply_gateway_status(GatewayName::MercadoPago, &payment_id.to_string(), "rejected")
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            WebhookOutcome::Applied {
                status: PaymentStatus::Failed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unknown_status_is_ignored() {
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_find_by_external_ref().never();

        let use_case = use_case(
            payment_repo,
            MockSubscriptionRepository::new(),
            MockGatewaySettingsRepository::new(),
        );

        let outcome = use_case
            .apply_gateway_status(GatewayName::Stripe, "pi_1", "chargeback_magic")
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::IgnoredStatus);
    }

    #[tokio::test]
    async fn unknown_reference_is_ignored() {
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_find_by_id().never();
        payment_repo.expect_find_by_external_ref().never();
        payment_repo.expect_settle_pending().never();

        let use_case = use_case(
            payment_repo,
            MockSubscriptionRepository::new(),
            MockGatewaySettingsRepository::new(),
        );

        let outcome = use_case
            .apply_gateway_status(GatewayName::MercadoPago, "missing", "approved")
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::UnknownReference);
    }

    #[tokio::test]
    async fn redelivery_after_settlement_is_a_no_op() {
        let subscription = subscription();
        let mut payment = submitted_payment(&subscription, "pi_2");
        payment.status = PaymentStatus::Approved;

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_by_external_ref()
            .returning(move |_| Ok(Some(payment.clone())));
        payment_repo.expect_settle_pending().never();
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo.expect_update_billing_state().never();

        let use_case = use_case(
            payment_repo,
            subscription_repo,
            MockGatewaySettingsRepository::new(),
        );

        let outcome = use_case
            .apply_gateway_status(GatewayName::Stripe, "pi_2", "succeeded")
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::AlreadySettled);
    }

    #[tokio::test]
    async fn concurrent_settlement_leaves_subscription_alone() {
        let subscription = subscription();
        let payment = submitted_payment(&subscription, "pi_3");

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_by_external_ref()
            .returning(move |_| Ok(Some(payment.clone())));
        payment_repo
            .expect_settle_pending()
            .times(1)
            .returning(|_, _| Ok(false));
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo.expect_find_by_id().never();
        subscription_repo.expect_update_billing_state().never();

        let use_case = use_case(
            payment_repo,
            subscription_repo,
            MockGatewaySettingsRepository::new(),
        );

        let outcome = use_case
            .apply_gateway_status(GatewayName::Stripe, "pi_3", "payment_failed")
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::AlreadySettled);
    }

    #[tokio::test]
    async fn mercado_pago_payment_settles_by_external_reference() {
        let subscription = subscription();
        let mut payment = submitted_payment(&subscription, "1234567-pref");
        payment.gateway = Some(GatewayName::MercadoPago);
        let payment_id = payment.id;

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_find_by_external_ref().never();
        payment_repo
            .expect_find_by_id()
            .with(eq(payment_id))
            .returning(move |_| Ok(Some(payment.clone())));
        payment_repo
            .expect_settle_pending()
            .with(eq(payment_id), eq(PaymentStatus::Approved))
            .times(1)
            .returning(|_, _| Ok(true));
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(subscription.clone())));
        subscription_repo
            .expect_update_billing_state()
            .withf(|update| update.payment_status == SubscriptionPaymentStatus::Paid)
            .times(1)
            .returning(|_| Ok(true));

        let use_case = use_case(
            payment_repo,
            subscription_repo,
            MockGatewaySettingsRepository::new(),
        );
        let mp_payment = MercadoPagoPayment {
            id: 982141,
            status: "approved".to_string(),
            external_reference: Some(payment_id.to_string()),
        };

        let outcome = use_case
            .handle_mercado_pago_payment(&mp_payment)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Applied {
                payment_id,
                status: PaymentStatus::Approved,
            }
        );
    }

    #[tokio::test]
    async fn mercado_pago_reference_cannot_settle_stripe_payment() {
        let subscription = subscription();
        let payment = submitted_payment(&subscription, "pi_9");
        let payment_id = payment.id;

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(payment.clone())));
        payment_repo.expect_settle_pending().never();

        let use_case = use_case(
            payment_repo,
            MockSubscriptionRepository::new(),
            MockGatewaySettingsRepository::new(),
        );

        let outcome = use_case
            .apply_gateway_status(GatewayName::MercadoPago, &payment_id.to_string(), "approved")
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::UnknownReference);
    }

    #[tokio::test]
    async fn stripe_webhook_with_bad_signature_is_rejected() {
        let mut settings = MockGatewaySettingsRepository::new();
        settings
            .expect_find_credential()
            .withf(|gateway, key| *gateway == GatewayName::Stripe && key == "webhook_secret")
            .returning(|_, _| Ok(Some("whsec_test".to_string())));
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_find_by_external_ref().never();

        let use_case = use_case(payment_repo, MockSubscriptionRepository::new(), settings);
        let payload = br#"{"type":"payment_intent.succeeded","data":{"object":{"id":"pi_1"}}}"#;
        let header = sign("whsec_wrong", "1700000000", payload);

        let err = use_case
            .handle_stripe_webhook(payload, &header)
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::InvalidWebhook(_)));
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn signed_stripe_webhook_settles_payment() {
        let subscription = subscription();
        let payment = submitted_payment(&subscription, "pi_77");

        let mut settings = MockGatewaySettingsRepository::new();
        settings
            .expect_find_credential()
            .returning(|_, _| Ok(Some("whsec_test".to_string())));
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_by_external_ref()
            .with(eq("pi_77".to_string()))
            .returning(move |_| Ok(Some(payment.clone())));
        payment_repo
            .expect_settle_pending()
            .returning(|_, _| Ok(true));
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(subscription.clone())));
        subscription_repo
            .expect_update_billing_state()
            .times(1)
            .returning(|_| Ok(true));

        let use_case = use_case(payment_repo, subscription_repo, settings);
        let payload = br#"{"type":"payment_intent.succeeded","data":{"object":{"id":"pi_77","status":"succeeded"}}}"#;
        let header = sign("whsec_test", "1700000000", payload);

        let outcome = use_case
            .handle_stripe_webhook(payload, &header)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            WebhookOutcome::Applied {
                status: PaymentStatus::Approved,
                ..
            }
        ));
    }
}
