use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::resources;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = resources)]
pub struct ResourceEntity {
    pub id: Uuid,
    pub key: String,
    pub description: String,
    pub type_: String,
}
