use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::{
    enums::{gateways::GatewayName, payment_statuses::PaymentStatus},
    payments::{NewPendingPayment, PaymentModel},
};

#[automock]
#[async_trait]
pub trait PaymentRepository {
    /// Most recent payment of the subscription in the given status.
    async fn find_latest_by_status(
        &self,
        subscription_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Option<PaymentModel>>;

    /// Oldest pending or failed payment created at or after `since`.
    async fn find_first_unsettled_since(
        &self,
        subscription_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Option<PaymentModel>>;

    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentModel>>;

    /// Inserts a pending payment unless the subscription already has one; `None`
    /// means another pending payment won.
    async fn insert_pending_payment(&self, payment: NewPendingPayment)
    -> Result<Option<PaymentModel>>;

    async fn attach_external_ref(
        &self,
        payment_id: Uuid,
        gateway: GatewayName,
        external_ref: String,
    ) -> Result<()>;

    async fn find_by_external_ref(&self, external_ref: String) -> Result<Option<PaymentModel>>;

    /// Moves a pending payment to `status`. `false` when the payment was no longer pending.
    async fn settle_pending(&self, payment_id: Uuid, status: PaymentStatus) -> Result<bool>;
}
