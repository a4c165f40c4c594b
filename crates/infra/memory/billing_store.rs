use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    repositories::{
        gateway_settings::{GatewaySettingsRepository, TenantGateway},
        payments::PaymentRepository,
        plan_resources::PlanResourceRepository,
        plans::PlanRepository,
        resources::ResourceRepository,
        subscriptions::SubscriptionRepository,
    },
    value_objects::{
        enums::{
            gateways::GatewayName, payment_statuses::PaymentStatus,
            subscription_payment_statuses::SubscriptionPaymentStatus,
            subscription_statuses::SubscriptionStatus,
        },
        payments::{NewPendingPayment, PaymentModel},
        plans::{PlanModel, PlanResourceModel, ResourceModel},
        subscriptions::{SubscriptionBillingUpdate, SubscriptionModel},
    },
};

/// Process-local store implementing every repository trait, with the same
/// single-pending-payment and `updated_at` guards as the Postgres schema.
#[derive(Clone, Default)]
pub struct InMemoryBillingStore {
    inner: Arc<InMemoryBillingStoreInner>,
}

#[derive(Default)]
struct InMemoryBillingStoreInner {
    subscriptions: RwLock<HashMap<Uuid, SubscriptionModel>>,
    payments: RwLock<HashMap<Uuid, PaymentModel>>,
    plans: RwLock<HashMap<Uuid, PlanModel>>,
    resources: RwLock<HashMap<Uuid, ResourceModel>>,
    plan_resources: RwLock<HashMap<(Uuid, Uuid), PlanResourceModel>>,
    tenant_gateways: RwLock<HashMap<Uuid, TenantGateway>>,
    credentials: RwLock<HashMap<(GatewayName, String), String>>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_subscription(&self, subscription: SubscriptionModel) {
        self.inner
            .subscriptions
            .write()
            .await
            .insert(subscription.id, subscription);
    }

    pub async fn seed_payment(&self, payment: PaymentModel) {
        self.inner.payments.write().await.insert(payment.id, payment);
    }

    pub async fn seed_plan(&self, plan: PlanModel) {
        self.inner.plans.write().await.insert(plan.id, plan);
    }

    pub async fn seed_resource(&self, resource: ResourceModel) {
        self.inner
            .resources
            .write()
            .await
            .insert(resource.id, resource);
    }

    pub async fn seed_plan_resource(&self, row: PlanResourceModel) {
        self.inner
            .plan_resources
            .write()
            .await
            .insert((row.plan_id, row.resource_id), row);
    }

    pub async fn seed_tenant_gateway(&self, tenant_id: Uuid, gateway: TenantGateway) {
        self.inner
            .tenant_gateways
            .write()
            .await
            .insert(tenant_id, gateway);
    }

    pub async fn seed_credential(&self, gateway: GatewayName, key: &str, value: &str) {
        self.inner
            .credentials
            .write()
            .await
            .insert((gateway, key.to_string()), value.to_string());
    }

    pub async fn subscription(&self, subscription_id: Uuid) -> Option<SubscriptionModel> {
        self.inner
            .subscriptions
            .read()
            .await
            .get(&subscription_id)
            .cloned()
    }

    /// Payments of one subscription, oldest first.
    pub async fn payments_for(&self, subscription_id: Uuid) -> Vec<PaymentModel> {
        let payments = self.inner.payments.read().await;
        let mut matching: Vec<PaymentModel> = payments
            .values()
            .filter(|p| p.subscription_id == subscription_id)
            .cloned()
            .collect();
        matching.sort_by_key(|p| p.created_at);
        matching
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryBillingStore {
    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionModel>> {
        Ok(self.subscription(subscription_id).await)
    }

    async fn find_active_by_tenant(&self, tenant_id: Uuid) -> Result<Option<SubscriptionModel>> {
        let subscriptions = self.inner.subscriptions.read().await;
        Ok(subscriptions
            .values()
            .filter(|s| s.tenant_id == tenant_id && s.status == SubscriptionStatus::Active)
            .max_by_key(|s| s.start_date)
            .cloned())
    }

    async fn list_overdue_candidates(&self) -> Result<Vec<SubscriptionModel>> {
        let subscriptions = self.inner.subscriptions.read().await;
        let mut candidates: Vec<SubscriptionModel> = subscriptions
            .values()
            .filter(|s| {
                s.status == SubscriptionStatus::Active
                    && s.auto_renew
                    && matches!(
                        s.payment_status,
                        SubscriptionPaymentStatus::Pending | SubscriptionPaymentStatus::Failed
                    )
            })
            .cloned()
            .collect();
        candidates.sort_by_key(|s| s.created_at);
        Ok(candidates)
    }

    async fn list_renewal_candidates(&self) -> Result<Vec<SubscriptionModel>> {
        let subscriptions = self.inner.subscriptions.read().await;
        let mut candidates: Vec<SubscriptionModel> = subscriptions
            .values()
            .filter(|s| {
                s.status == SubscriptionStatus::Active
                    && s.auto_renew
                    && s.payment_status == SubscriptionPaymentStatus::Paid
            })
            .cloned()
            .collect();
        candidates.sort_by_key(|s| s.created_at);
        Ok(candidates)
    }

    async fn update_billing_state(&self, update: SubscriptionBillingUpdate) -> Result<bool> {
        let mut subscriptions = self.inner.subscriptions.write().await;
        let Some(stored) = subscriptions.get_mut(&update.subscription_id) else {
            return Ok(false);
        };
        if stored.updated_at != update.expected_updated_at {
            return Ok(false);
        }

        stored.status = update.status;
        stored.payment_status = update.payment_status;
        stored.end_date = update.end_date;
        stored.next_due_date = update.next_due_date;
        stored.period_started_at = update.period_started_at;
        stored.updated_at = update.updated_at;
        Ok(true)
    }
}

#[async_trait]
impl PaymentRepository for InMemoryBillingStore {
    async fn find_latest_by_status(
        &self,
        subscription_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Option<PaymentModel>> {
        let payments = self.inner.payments.read().await;
        Ok(payments
            .values()
            .filter(|p| p.subscription_id == subscription_id && p.status == status)
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn find_first_unsettled_since(
        &self,
        subscription_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Option<PaymentModel>> {
        let payments = self.inner.payments.read().await;
        Ok(payments
            .values()
            .filter(|p| {
                p.subscription_id == subscription_id
                    && matches!(p.status, PaymentStatus::Pending | PaymentStatus::Failed)
                    && p.created_at >= since
            })
            .min_by_key(|p| p.created_at)
            .cloned())
    }

    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentModel>> {
        Ok(self.inner.payments.read().await.get(&payment_id).cloned())
    }

    async fn insert_pending_payment(
        &self,
        payment: NewPendingPayment,
    ) -> Result<Option<PaymentModel>> {
        let mut payments = self.inner.payments.write().await;
        let already_pending = payments.values().any(|p| {
            p.subscription_id == payment.subscription_id && p.status == PaymentStatus::Pending
        });
        if already_pending {
            return Ok(None);
        }

        let created = PaymentModel {
            id: Uuid::new_v4(),
            subscription_id: payment.subscription_id,
            amount_cents: payment.amount_cents,
            currency: payment.currency,
            status: PaymentStatus::Pending,
            external_ref: None,
            gateway: None,
            created_at: payment.created_at,
            updated_at: payment.created_at,
        };
        payments.insert(created.id, created.clone());
        Ok(Some(created))
    }

    async fn attach_external_ref(
        &self,
        payment_id: Uuid,
        gateway: GatewayName,
        external_ref: String,
    ) -> Result<()> {
        let mut payments = self.inner.payments.write().await;
        if let Some(payment) = payments.get_mut(&payment_id) {
            payment.external_ref = Some(external_ref);
            payment.gateway = Some(gateway);
            payment.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn find_by_external_ref(&self, external_ref: String) -> Result<Option<PaymentModel>> {
        let payments = self.inner.payments.read().await;
        Ok(payments
            .values()
            .find(|p| p.external_ref.as_deref() == Some(external_ref.as_str()))
            .cloned())
    }

    async fn settle_pending(&self, payment_id: Uuid, status: PaymentStatus) -> Result<bool> {
        let mut payments = self.inner.payments.write().await;
        match payments.get_mut(&payment_id) {
            Some(payment) if payment.status == PaymentStatus::Pending => {
                payment.status = status;
                payment.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl PlanRepository for InMemoryBillingStore {
    async fn find_by_id(&self, plan_id: Uuid) -> Result<Option<PlanModel>> {
        Ok(self.inner.plans.read().await.get(&plan_id).cloned())
    }
}

#[async_trait]
impl PlanResourceRepository for InMemoryBillingStore {
    async fn list_by_plan(&self, plan_id: Uuid) -> Result<Vec<PlanResourceModel>> {
        let rows = self.inner.plan_resources.read().await;
        Ok(rows
            .values()
            .filter(|row| row.plan_id == plan_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ResourceRepository for InMemoryBillingStore {
    async fn list_all(&self) -> Result<Vec<ResourceModel>> {
        let resources = self.inner.resources.read().await;
        let mut all: Vec<ResourceModel> = resources.values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(all)
    }
}

#[async_trait]
impl GatewaySettingsRepository for InMemoryBillingStore {
    async fn find_active_gateway(&self, tenant_id: Uuid) -> Result<Option<TenantGateway>> {
        Ok(self
            .inner
            .tenant_gateways
            .read()
            .await
            .get(&tenant_id)
            .cloned())
    }

    async fn find_credential(
        &self,
        gateway: GatewayName,
        credential_key: String,
    ) -> Result<Option<String>> {
        Ok(self
            .inner
            .credentials
            .read()
            .await
            .get(&(gateway, credential_key))
            .cloned())
    }
}
