use anyhow::{Result, anyhow};
use async_trait::async_trait;
use diesel::{RunQueryDsl, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{gateway_credentials, tenant_gateways},
    },
};
use domain::{
    entities::gateway_settings::TenantGatewayEntity,
    repositories::gateway_settings::{GatewaySettingsRepository, TenantGateway},
    value_objects::enums::gateways::GatewayName,
};

pub struct GatewaySettingsPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl GatewaySettingsPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl GatewaySettingsRepository for GatewaySettingsPostgres {
    async fn find_active_gateway(&self, tenant_id: Uuid) -> Result<Option<TenantGateway>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = tenant_gateways::table
            .filter(tenant_gateways::tenant_id.eq(tenant_id))
            .filter(tenant_gateways::is_active.eq(true))
            .order(tenant_gateways::updated_at.desc())
            .select(TenantGatewayEntity::as_select())
            .first::<TenantGatewayEntity>(&mut conn)
            .optional()?;

        let Some(entity) = result else {
            return Ok(None);
        };

        let gateway = GatewayName::from_str(&entity.gateway).ok_or_else(|| {
            anyhow!(
                "tenant {} has unknown gateway {}",
                entity.tenant_id,
                entity.gateway
            )
        })?;

        Ok(Some(TenantGateway {
            gateway,
            customer_ref: entity.customer_ref,
        }))
    }

    async fn find_credential(
        &self,
        gateway: GatewayName,
        credential_key: String,
    ) -> Result<Option<String>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let value = gateway_credentials::table
            .filter(gateway_credentials::gateway.eq(gateway.as_str()))
            .filter(gateway_credentials::credential_key.eq(credential_key))
            .select(gateway_credentials::credential_value)
            .first::<String>(&mut conn)
            .optional()?;

        Ok(value)
    }
}
