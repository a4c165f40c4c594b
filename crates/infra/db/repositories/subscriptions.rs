use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::subscriptions},
};
use domain::{
    entities::subscriptions::{SubscriptionEntity, UpdateSubscriptionBillingEntity},
    repositories::subscriptions::SubscriptionRepository,
    value_objects::{
        enums::{
            subscription_payment_statuses::SubscriptionPaymentStatus,
            subscription_statuses::SubscriptionStatus,
        },
        subscriptions::{SubscriptionBillingUpdate, SubscriptionModel},
    },
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn into_models(entities: Vec<SubscriptionEntity>) -> Result<Vec<SubscriptionModel>> {
    entities.into_iter().map(SubscriptionModel::try_from).collect()
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionModel>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscriptions::table
            .find(subscription_id)
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        result.map(SubscriptionModel::try_from).transpose()
    }

    async fn find_active_by_tenant(&self, tenant_id: Uuid) -> Result<Option<SubscriptionModel>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscriptions::table
            .filter(subscriptions::tenant_id.eq(tenant_id))
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
            .order(subscriptions::start_date.desc())
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        result.map(SubscriptionModel::try_from).transpose()
    }

    async fn list_overdue_candidates(&self) -> Result<Vec<SubscriptionModel>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = subscriptions::table
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
            .filter(subscriptions::auto_renew.eq(true))
            .filter(subscriptions::payment_status.eq_any(vec![
                SubscriptionPaymentStatus::Pending.to_string(),
                SubscriptionPaymentStatus::Failed.to_string(),
            ]))
            .order(subscriptions::created_at.asc())
            .select(SubscriptionEntity::as_select())
            .load::<SubscriptionEntity>(&mut conn)?;

        into_models(results)
    }

    async fn list_renewal_candidates(&self) -> Result<Vec<SubscriptionModel>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = subscriptions::table
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
            .filter(subscriptions::auto_renew.eq(true))
            .filter(subscriptions::payment_status.eq(SubscriptionPaymentStatus::Paid.to_string()))
            .order(subscriptions::created_at.asc())
            .select(SubscriptionEntity::as_select())
            .load::<SubscriptionEntity>(&mut conn)?;

        into_models(results)
    }

    async fn update_billing_state(&self, billing_update: SubscriptionBillingUpdate) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let changeset = UpdateSubscriptionBillingEntity::from(&billing_update);

        let affected = update(subscriptions::table)
            .filter(subscriptions::id.eq(billing_update.subscription_id))
            .filter(subscriptions::updated_at.eq(billing_update.expected_updated_at))
            .set(&changeset)
            .execute(&mut conn)?;

        Ok(affected == 1)
    }
}
