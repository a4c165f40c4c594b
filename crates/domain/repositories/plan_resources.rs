use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::plans::PlanResourceModel;

#[automock]
#[async_trait]
pub trait PlanResourceRepository {
    async fn list_by_plan(&self, plan_id: Uuid) -> Result<Vec<PlanResourceModel>>;
}
