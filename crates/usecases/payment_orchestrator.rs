use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::Result;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    clock::Clock,
    repositories::{
        gateway_settings::GatewaySettingsRepository,
        payment_gateway::{ChargeReceipt, ChargeRequest, GatewayCredentials, PaymentGateway},
        payments::PaymentRepository,
    },
    value_objects::{
        enums::{gateways::GatewayName, payment_statuses::PaymentStatus},
        payments::{NewPendingPayment, PaymentModel},
        subscriptions::SubscriptionModel,
    },
};

/// Why a charge attempt did not reach a gateway or was not accepted by it.
/// Never leaves the orchestrator: the payment simply stays pending.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("tenant {0} has no active online gateway")]
    NotConfigured(Uuid),
    #[error("no client registered for gateway {0}")]
    UnsupportedGateway(GatewayName),
    #[error("gateway {gateway} is missing credential {credential_key}")]
    MissingCredential {
        gateway: GatewayName,
        credential_key: &'static str,
    },
    #[error("gateway {gateway} did not answer within {timeout:?}")]
    Timeout {
        gateway: GatewayName,
        timeout: Duration,
    },
    #[error("gateway {gateway} rejected the charge with status {status}")]
    Rejected { gateway: GatewayName, status: String },
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    Submitted {
        gateway: GatewayName,
        external_ref: String,
    },
    /// The tenant pays offline; nothing to charge.
    Skipped,
    Failed { reason: String },
}

impl ChargeOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, ChargeOutcome::Submitted { .. })
    }
}

pub struct PaymentOrchestrator {
    payment_repo: Arc<dyn PaymentRepository + Send + Sync>,
    gateway_settings_repo: Arc<dyn GatewaySettingsRepository + Send + Sync>,
    gateways: HashMap<GatewayName, Arc<dyn PaymentGateway + Send + Sync>>,
    clock: Arc<dyn Clock>,
    charge_timeout: Duration,
}

impl PaymentOrchestrator {
    pub fn new(
        payment_repo: Arc<dyn PaymentRepository + Send + Sync>,
        gateway_settings_repo: Arc<dyn GatewaySettingsRepository + Send + Sync>,
        clock: Arc<dyn Clock>,
        charge_timeout: Duration,
    ) -> Self {
        Self {
            payment_repo,
            gateway_settings_repo,
            gateways: HashMap::new(),
            clock,
            charge_timeout,
        }
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway + Send + Sync>) -> Self {
        self.gateways.insert(gateway.name(), gateway);
        self
    }

    /// Opens a pending payment for the subscription's current price.
    /// `None` means the subscription already had a pending payment.
    pub async fn create_pending_payment(
        &self,
        subscription: &SubscriptionModel,
    ) -> Result<Option<PaymentModel>> {
        let payment = NewPendingPayment::for_subscription(subscription, self.clock.now());
        let inserted = self.payment_repo.insert_pending_payment(payment).await?;

        match &inserted {
            Some(payment) => info!(
                subscription_id = %subscription.id,
                payment_id = %payment.id,
                amount_cents = payment.amount_cents,
                currency = %payment.currency,
                "payment_orchestrator: pending payment created"
            ),
            None => info!(
                subscription_id = %subscription.id,
                "payment_orchestrator: subscription already has a pending payment"
            ),
        }

        Ok(inserted)
    }

    /// Best-effort charge. Every failure is logged and folded into the
    /// returned outcome; the payment stays pending either way.
    pub async fn attempt_auto_charge(
        &self,
        payment: &PaymentModel,
        subscription: &SubscriptionModel,
    ) -> ChargeOutcome {
        match self.charge(payment, subscription).await {
            Ok((gateway, receipt)) => {
                info!(
                    payment_id = %payment.id,
                    subscription_id = %subscription.id,
                    %gateway,
                    external_ref = %receipt.external_ref,
                    external_status = ?receipt.external_status,
                    "payment_orchestrator: charge submitted"
                );
                ChargeOutcome::Submitted {
                    gateway,
                    external_ref: receipt.external_ref,
                }
            }
            Err(GatewayError::NotConfigured(tenant_id)) => {
                info!(
                    payment_id = %payment.id,
                    %tenant_id,
                    "payment_orchestrator: no online gateway configured, skipping auto charge"
                );
                ChargeOutcome::Skipped
            }
            Err(err) => {
                warn!(
                    payment_id = %payment.id,
                    subscription_id = %subscription.id,
                    error = %err,
                    "payment_orchestrator: auto charge failed, payment stays pending"
                );
                ChargeOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    async fn charge(
        &self,
        payment: &PaymentModel,
        subscription: &SubscriptionModel,
    ) -> Result<(GatewayName, ChargeReceipt), GatewayError> {
        let tenant_gateway = self
            .gateway_settings_repo
            .find_active_gateway(subscription.tenant_id)
            .await?
            .ok_or(GatewayError::NotConfigured(subscription.tenant_id))?;
        let gateway_name = tenant_gateway.gateway;

        let gateway = self
            .gateways
            .get(&gateway_name)
            .ok_or(GatewayError::UnsupportedGateway(gateway_name))?;

        let credentials = self.load_credentials(gateway_name).await?;
        let request = ChargeRequest {
            payment_id: payment.id,
            subscription_id: subscription.id,
            tenant_id: subscription.tenant_id,
            amount_cents: payment.amount_cents,
            currency: payment.currency.clone(),
            customer_ref: tenant_gateway.customer_ref,
        };

        let receipt = tokio::time::timeout(
            self.charge_timeout,
            gateway.charge(&credentials, &request),
        )
        .await
        .map_err(|_| GatewayError::Timeout {
            gateway: gateway_name,
            timeout: self.charge_timeout,
        })??;

        if let Some(status) = receipt.external_status.as_deref() {
            if gateway_name.map_external_status(status) == Some(PaymentStatus::Failed) {
                return Err(GatewayError::Rejected {
                    gateway: gateway_name,
                    status: status.to_string(),
                });
            }
        }

        self.payment_repo
            .attach_external_ref(payment.id, gateway_name, receipt.external_ref.clone())
            .await?;

        Ok((gateway_name, receipt))
    }

    async fn load_credentials(
        &self,
        gateway: GatewayName,
    ) -> Result<GatewayCredentials, GatewayError> {
        let mut credentials = GatewayCredentials::default();
        for &credential_key in gateway.required_credentials() {
            let value = self
                .gateway_settings_repo
                .find_credential(gateway, credential_key.to_string())
                .await?
                .ok_or(GatewayError::MissingCredential {
                    gateway,
                    credential_key,
                })?;
            credentials.insert(credential_key, value);
        }
        Ok(credentials)
    }
}
