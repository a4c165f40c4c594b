use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, prelude::*};
use std::sync::Arc;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::resources},
};
use domain::{
    entities::resources::ResourceEntity, repositories::resources::ResourceRepository,
    value_objects::plans::ResourceModel,
};

pub struct ResourcePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ResourcePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ResourceRepository for ResourcePostgres {
    async fn list_all(&self) -> Result<Vec<ResourceModel>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = resources::table
            .order(resources::key.asc())
            .select(ResourceEntity::as_select())
            .load::<ResourceEntity>(&mut conn)?;

        results.into_iter().map(ResourceModel::try_from).collect()
    }
}
