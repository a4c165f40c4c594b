use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::payments::{InsertPaymentEntity, PaymentEntity};
use crate::domain::value_objects::enums::{
    gateways::GatewayName, payment_statuses::PaymentStatus,
};
use crate::domain::value_objects::subscriptions::SubscriptionModel;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentModel {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub external_ref: Option<String>,
    pub gateway: Option<GatewayName>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentModel {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// A pending payment that no gateway has accepted yet.
    pub fn awaiting_submission(&self) -> bool {
        self.status == PaymentStatus::Pending && self.external_ref.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPendingPayment {
    pub subscription_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl NewPendingPayment {
    pub fn for_subscription(subscription: &SubscriptionModel, now: DateTime<Utc>) -> Self {
        Self {
            subscription_id: subscription.id,
            amount_cents: subscription.price_cents,
            currency: subscription.currency.clone(),
            created_at: now,
        }
    }
}

impl From<NewPendingPayment> for InsertPaymentEntity {
    fn from(value: NewPendingPayment) -> Self {
        Self {
            subscription_id: value.subscription_id,
            amount_cents: value.amount_cents,
            currency: value.currency,
            status: PaymentStatus::Pending.to_string(),
            external_ref: None,
            gateway: None,
            created_at: value.created_at,
            updated_at: value.created_at,
        }
    }
}

impl TryFrom<PaymentEntity> for PaymentModel {
    type Error = anyhow::Error;

    fn try_from(value: PaymentEntity) -> Result<Self, Self::Error> {
        let status = PaymentStatus::from_str(&value.status)
            .ok_or_else(|| anyhow!("payment {} has unknown status {}", value.id, value.status))?;
        let gateway = match value.gateway.as_deref() {
            Some(raw) => Some(
                GatewayName::from_str(raw)
                    .ok_or_else(|| anyhow!("payment {} has unknown gateway {}", value.id, raw))?,
            ),
            None => None,
        };

        Ok(Self {
            id: value.id,
            subscription_id: value.subscription_id,
            amount_cents: value.amount_cents,
            currency: value.currency,
            status,
            external_ref: value.external_ref,
            gateway,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}
