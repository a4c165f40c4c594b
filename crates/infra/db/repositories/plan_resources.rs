use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::plan_resources},
};
use domain::{
    entities::plan_resources::PlanResourceEntity,
    repositories::plan_resources::PlanResourceRepository, value_objects::plans::PlanResourceModel,
};

pub struct PlanResourcePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PlanResourcePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PlanResourceRepository for PlanResourcePostgres {
    async fn list_by_plan(&self, plan_id: Uuid) -> Result<Vec<PlanResourceModel>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = plan_resources::table
            .filter(plan_resources::plan_id.eq(plan_id))
            .select(PlanResourceEntity::as_select())
            .load::<PlanResourceEntity>(&mut conn)?;

        Ok(results.into_iter().map(PlanResourceModel::from).collect())
    }
}
