use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::plan_resources;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plan_resources, primary_key(plan_id, resource_id))]
pub struct PlanResourceEntity {
    pub plan_id: Uuid,
    pub resource_id: Uuid,
    pub text_value: String,
}
