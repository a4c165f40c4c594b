use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::tenant_gateways;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = tenant_gateways, primary_key(tenant_id, gateway))]
pub struct TenantGatewayEntity {
    pub tenant_id: Uuid,
    pub gateway: String,
    pub customer_ref: Option<String>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

