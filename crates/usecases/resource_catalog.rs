use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{
    repositories::resources::ResourceRepository,
    value_objects::{
        enums::resource_types::ResourceType, plans::ResourceModel, resource_keys::ResourceKey,
    },
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("resource {resource_id} has unrecognized key {key}")]
    UnknownResourceKey { resource_id: Uuid, key: String },
    #[error("resource key {0} is defined more than once")]
    DuplicateResourceKey(ResourceKey),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub key: ResourceKey,
    pub resource_type: ResourceType,
}

/// Resource ids mapped onto typed keys, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    entries: HashMap<Uuid, CatalogEntry>,
}

impl ResourceCatalog {
    pub async fn load(
        repository: Arc<dyn ResourceRepository + Send + Sync>,
    ) -> Result<Self, CatalogError> {
        let resources = repository.list_all().await.map_err(|err| {
            error!(db_error = ?err, "resource_catalog: failed to list resources");
            CatalogError::Internal(err)
        })?;

        let catalog = Self::from_resources(resources)?;
        info!(
            resource_count = catalog.entries.len(),
            "resource_catalog: resource keys validated"
        );
        Ok(catalog)
    }

    pub fn from_resources(resources: Vec<ResourceModel>) -> Result<Self, CatalogError> {
        let mut entries = HashMap::with_capacity(resources.len());
        let mut seen = HashSet::with_capacity(resources.len());

        for resource in resources {
            let key = resource.key.parse::<ResourceKey>().map_err(|_| {
                error!(
                    resource_id = %resource.id,
                    key = %resource.key,
                    "resource_catalog: unrecognized resource key"
                );
                CatalogError::UnknownResourceKey {
                    resource_id: resource.id,
                    key: resource.key.clone(),
                }
            })?;

            if !seen.insert(key) {
                return Err(CatalogError::DuplicateResourceKey(key));
            }

            entries.insert(
                resource.id,
                CatalogEntry {
                    key,
                    resource_type: resource.resource_type,
                },
            );
        }

        Ok(Self { entries })
    }

    pub fn get(&self, resource_id: Uuid) -> Option<CatalogEntry> {
        self.entries.get(&resource_id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::resources::MockResourceRepository;

    fn resource(key: &str, resource_type: ResourceType) -> ResourceModel {
        ResourceModel {
            id: Uuid::new_v4(),
            key: key.to_string(),
            description: format!("{key} resource"),
            resource_type,
        }
    }

    #[tokio::test]
    async fn loads_known_keys() {
        let limit = resource("transacoes.limite", ResourceType::Int);
        let limit_id = limit.id;

        let mut repository = MockResourceRepository::new();
        repository
            .expect_list_all()
            .times(1)
            .returning(move || Ok(vec![limit.clone()]));

        let catalog = ResourceCatalog::load(Arc::new(repository)).await.unwrap();

        assert_eq!(
            catalog.get(limit_id),
            Some(CatalogEntry {
                key: ResourceKey::TransacoesLimite,
                resource_type: ResourceType::Int,
            })
        );
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn unknown_key_fails_fast() {
        let result = ResourceCatalog::from_resources(vec![
            resource("transacoes.limite", ResourceType::Int),
            resource("estoque.limite", ResourceType::Int),
        ]);

        assert!(matches!(
            result,
            Err(CatalogError::UnknownResourceKey { key, .. }) if key == "estoque.limite"
        ));
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let result = ResourceCatalog::from_resources(vec![
            resource("suporte.nivel", ResourceType::Text),
            resource("suporte.nivel", ResourceType::Text),
        ]);

        assert!(matches!(
            result,
            Err(CatalogError::DuplicateResourceKey(ResourceKey::SuporteNivel))
        ));
    }
}
