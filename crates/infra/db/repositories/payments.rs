use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::payments},
};
use domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity},
    repositories::payments::PaymentRepository,
    value_objects::{
        enums::{gateways::GatewayName, payment_statuses::PaymentStatus},
        payments::{NewPendingPayment, PaymentModel},
    },
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn find_latest_by_status(
        &self,
        subscription_id: Uuid,
        status: PaymentStatus,
    ) -> Result<Option<PaymentModel>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .filter(payments::subscription_id.eq(subscription_id))
            .filter(payments::status.eq(status.to_string()))
            .order(payments::created_at.desc())
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        result.map(PaymentModel::try_from).transpose()
    }

    async fn find_first_unsettled_since(
        &self,
        subscription_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Option<PaymentModel>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .filter(payments::subscription_id.eq(subscription_id))
            .filter(payments::status.eq_any(vec![
                PaymentStatus::Pending.to_string(),
                PaymentStatus::Failed.to_string(),
            ]))
            .filter(payments::created_at.ge(since))
            .order(payments::created_at.asc())
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        result.map(PaymentModel::try_from).transpose()
    }

    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentModel>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .filter(payments::id.eq(payment_id))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        result.map(PaymentModel::try_from).transpose()
    }

    async fn insert_pending_payment(
        &self,
        payment: NewPendingPayment,
    ) -> Result<Option<PaymentModel>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let insert_entity = InsertPaymentEntity::from(payment);

        // payments_one_pending_per_subscription turns a second pending row into a no-op.
        let result = insert_into(payments::table)
            .values(&insert_entity)
            .on_conflict_do_nothing()
            .returning(PaymentEntity::as_returning())
            .get_result::<PaymentEntity>(&mut conn)
            .optional()?;

        result.map(PaymentModel::try_from).transpose()
    }

    async fn attach_external_ref(
        &self,
        payment_id: Uuid,
        gateway: GatewayName,
        external_ref: String,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(payments::table)
            .filter(payments::id.eq(payment_id))
            .set((
                payments::external_ref.eq(Some(external_ref)),
                payments::gateway.eq(Some(gateway.to_string())),
                payments::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn find_by_external_ref(&self, external_ref: String) -> Result<Option<PaymentModel>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .filter(payments::external_ref.eq(external_ref))
            .order(payments::created_at.desc())
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        result.map(PaymentModel::try_from).transpose()
    }

    async fn settle_pending(&self, payment_id: Uuid, status: PaymentStatus) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(payments::table)
            .filter(payments::id.eq(payment_id))
            .filter(payments::status.eq(PaymentStatus::Pending.to_string()))
            .set((
                payments::status.eq(status.to_string()),
                payments::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(affected == 1)
    }
}
