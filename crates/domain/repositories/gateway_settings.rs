use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::enums::gateways::GatewayName;

/// Online gateway a tenant pays through, with the tenant's customer id on that gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantGateway {
    pub gateway: GatewayName,
    pub customer_ref: Option<String>,
}

/// Tenant gateway selection plus the credential store keyed by `(gateway, credential_key)`.
#[automock]
#[async_trait]
pub trait GatewaySettingsRepository {
    async fn find_active_gateway(&self, tenant_id: Uuid) -> Result<Option<TenantGateway>>;

    async fn find_credential(
        &self,
        gateway: GatewayName,
        credential_key: String,
    ) -> Result<Option<String>>;
}
