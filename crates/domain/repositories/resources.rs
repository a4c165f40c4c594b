use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::plans::ResourceModel;

#[automock]
#[async_trait]
pub trait ResourceRepository {
    async fn list_all(&self) -> Result<Vec<ResourceModel>>;
}
