use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{
    plan_resources::PlanResourceEntity, plans::PlanEntity, resources::ResourceEntity,
};
use crate::domain::value_objects::enums::{
    plan_statuses::PlanStatus, resource_types::ResourceType,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanModel {
    pub id: Uuid,
    pub name: String,
    pub status: PlanStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceModel {
    pub id: Uuid,
    pub key: String,
    pub description: String,
    pub resource_type: ResourceType,
}

/// Tenant-plan override of one base-tier property, still as raw text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanResourceModel {
    pub plan_id: Uuid,
    pub resource_id: Uuid,
    pub text_value: String,
}

impl TryFrom<PlanEntity> for PlanModel {
    type Error = anyhow::Error;

    fn try_from(value: PlanEntity) -> Result<Self, Self::Error> {
        let status = PlanStatus::from_str(&value.status)
            .ok_or_else(|| anyhow!("plan {} has unknown status {}", value.id, value.status))?;
        Ok(Self {
            id: value.id,
            name: value.name,
            status,
        })
    }
}

impl TryFrom<ResourceEntity> for ResourceModel {
    type Error = anyhow::Error;

    fn try_from(value: ResourceEntity) -> Result<Self, Self::Error> {
        let resource_type = ResourceType::from_str(&value.type_)
            .ok_or_else(|| anyhow!("resource {} has unknown type {}", value.key, value.type_))?;
        Ok(Self {
            id: value.id,
            key: value.key,
            description: value.description,
            resource_type,
        })
    }
}

impl From<PlanResourceEntity> for PlanResourceModel {
    fn from(value: PlanResourceEntity) -> Self {
        Self {
            plan_id: value.plan_id,
            resource_id: value.resource_id,
            text_value: value.text_value,
        }
    }
}
