use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::subscriptions::{SubscriptionBillingUpdate, SubscriptionModel};

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionModel>>;

    async fn find_active_by_tenant(&self, tenant_id: Uuid) -> Result<Option<SubscriptionModel>>;

    /// status=active, auto_renew=true, payment_status in (pending, failed).
    async fn list_overdue_candidates(&self) -> Result<Vec<SubscriptionModel>>;

    /// status=active, auto_renew=true, payment_status=paid.
    async fn list_renewal_candidates(&self) -> Result<Vec<SubscriptionModel>>;

    /// Returns `false` when the row changed since it was read (optimistic check on
    /// `updated_at`), in which case nothing was written.
    async fn update_billing_state(&self, update: SubscriptionBillingUpdate) -> Result<bool>;
}
