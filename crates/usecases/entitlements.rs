use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::domain::{
    repositories::{
        plan_resources::PlanResourceRepository, plans::PlanRepository,
        subscriptions::SubscriptionRepository,
    },
    value_objects::{
        capabilities::{CapabilityMatrix, CapabilityValue},
        enums::roles::Role,
        plans::{PlanModel, PlanResourceModel},
        tiers::Tier,
    },
};
use crate::usecases::resource_catalog::ResourceCatalog;

#[derive(Debug, Error)]
pub enum EntitlementError {
    #[error("tenant {0} has no active subscription")]
    NoActiveSubscription(Uuid),
    #[error("plan {0} not found")]
    PlanNotFound(Uuid),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Computes a tenant's effective capability matrix from its active subscription's plan.
pub struct EntitlementResolver {
    subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
    plan_repo: Arc<dyn PlanRepository + Send + Sync>,
    plan_resource_repo: Arc<dyn PlanResourceRepository + Send + Sync>,
    catalog: Arc<ResourceCatalog>,
}

impl EntitlementResolver {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
        plan_repo: Arc<dyn PlanRepository + Send + Sync>,
        plan_resource_repo: Arc<dyn PlanResourceRepository + Send + Sync>,
        catalog: Arc<ResourceCatalog>,
    ) -> Self {
        Self {
            subscription_repo,
            plan_repo,
            plan_resource_repo,
            catalog,
        }
    }

    pub async fn resolve(
        &self,
        tenant_id: Uuid,
        role: Role,
    ) -> Result<CapabilityMatrix, EntitlementError> {
        if role.is_super_admin() {
            debug!(%tenant_id, "entitlements: super admin bypass, using highest tier");
            return Ok(Tier::highest().base_template().clone());
        }

        let subscription = self
            .subscription_repo
            .find_active_by_tenant(tenant_id)
            .await
            .map_err(|err| {
                error!(
                    %tenant_id,
                    db_error = ?err,
                    "entitlements: failed to load active subscription"
                );
                EntitlementError::Internal(err)
            })?
            .ok_or(EntitlementError::NoActiveSubscription(tenant_id))?;

        let plan = self
            .plan_repo
            .find_by_id(subscription.plan_id)
            .await
            .map_err(|err| {
                error!(
                    %tenant_id,
                    plan_id = %subscription.plan_id,
                    db_error = ?err,
                    "entitlements: failed to load plan"
                );
                EntitlementError::Internal(err)
            })?
            .ok_or(EntitlementError::PlanNotFound(subscription.plan_id))?;

        let overrides = self
            .plan_resource_repo
            .list_by_plan(plan.id)
            .await
            .map_err(|err| {
                error!(
                    %tenant_id,
                    plan_id = %plan.id,
                    db_error = ?err,
                    "entitlements: failed to load plan overrides"
                );
                EntitlementError::Internal(err)
            })?;

        debug!(
            %tenant_id,
            plan_id = %plan.id,
            override_count = overrides.len(),
            "entitlements: resolving capability matrix"
        );

        Ok(resolve_matrix(&plan, &overrides, &self.catalog))
    }
}

/// Pure part of resolution: clone the plan's tier template and overlay its overrides.
pub fn resolve_matrix(
    plan: &PlanModel,
    overrides: &[PlanResourceModel],
    catalog: &ResourceCatalog,
) -> CapabilityMatrix {
    let tier = Tier::classify(&plan.name);
    let mut matrix = tier.base_template().clone();

    for row in overrides {
        let Some(entry) = catalog.get(row.resource_id) else {
            warn!(
                plan_id = %plan.id,
                resource_id = %row.resource_id,
                "entitlements: override references a resource outside the catalog; ignoring"
            );
            continue;
        };

        let value = CapabilityValue::from_text(&row.text_value);
        if !entry.resource_type.accepts(&value) {
            warn!(
                plan_id = %plan.id,
                key = %entry.key,
                declared_type = %entry.resource_type,
                text_value = %row.text_value,
                "entitlements: override value does not match declared resource type; keeping tier value"
            );
            continue;
        }
        matrix.set(entry.key, value);
    }

    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        repositories::{
            plan_resources::MockPlanResourceRepository, plans::MockPlanRepository,
            subscriptions::MockSubscriptionRepository,
        },
        value_objects::{
            enums::{
                billing_cycles::BillingCycle, plan_statuses::PlanStatus,
                resource_types::ResourceType,
                subscription_payment_statuses::SubscriptionPaymentStatus,
                subscription_statuses::SubscriptionStatus,
            },
            plans::ResourceModel,
            resource_keys::ResourceKey,
            subscriptions::SubscriptionModel,
        },
    };
    use chrono::Utc;
    use mockall::predicate::eq;

    struct Fixture {
        catalog: ResourceCatalog,
        limit_id: Uuid,
        export_id: Uuid,
        support_id: Uuid,
    }

    fn fixture() -> Fixture {
        let limit_id = Uuid::new_v4();
        let export_id = Uuid::new_v4();
        let support_id = Uuid::new_v4();
        let catalog = ResourceCatalog::from_resources(vec![
            ResourceModel {
                id: limit_id,
                key: "transacoes.limite".to_string(),
                description: "Transacoes por mes".to_string(),
                resource_type: ResourceType::Int,
            },
            ResourceModel {
                id: export_id,
                key: "relatorios.exportacao".to_string(),
                description: "Exportar relatorios".to_string(),
                resource_type: ResourceType::Boolean,
            },
            ResourceModel {
                id: support_id,
                key: "suporte.nivel".to_string(),
                description: "Nivel de suporte".to_string(),
                resource_type: ResourceType::Text,
            },
        ])
        .unwrap();

        Fixture {
            catalog,
            limit_id,
            export_id,
            support_id,
        }
    }

    fn plan(name: &str) -> PlanModel {
        PlanModel {
            id: Uuid::new_v4(),
            name: name.to_string(),
            status: PlanStatus::Active,
        }
    }

    fn row(plan: &PlanModel, resource_id: Uuid, text_value: &str) -> PlanResourceModel {
        PlanResourceModel {
            plan_id: plan.id,
            resource_id,
            text_value: text_value.to_string(),
        }
    }

    fn active_subscription(tenant_id: Uuid, plan_id: Uuid) -> SubscriptionModel {
        let now = Utc::now();
        SubscriptionModel {
            id: Uuid::new_v4(),
            tenant_id,
            plan_id,
            cycle: BillingCycle::Monthly,
            price_cents: 4900,
            currency: "BRL".to_string(),
            status: SubscriptionStatus::Active,
            payment_status: SubscriptionPaymentStatus::Paid,
            start_date: now,
            end_date: None,
            next_due_date: None,
            period_started_at: None,
            auto_renew: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn numeric_override_replaces_unlimited_base_value() {
        let fixture = fixture();
        let premium = plan("Premium");
        assert_eq!(
            Tier::Premium
                .base_template()
                .value_of(ResourceKey::TransacoesLimite),
            Some(&CapabilityValue::Unlimited)
        );

        let matrix = resolve_matrix(
            &premium,
            &[row(&premium, fixture.limit_id, "5")],
            &fixture.catalog,
        );

        assert_eq!(
            matrix.value_of(ResourceKey::TransacoesLimite),
            Some(&CapabilityValue::Limit(5))
        );
        assert!(!matrix.can_create_more(ResourceKey::TransacoesLimite, 5));
        assert!(matrix.can_create_more(ResourceKey::TransacoesLimite, 4));
    }

    #[test]
    fn overrides_infer_flags_and_text() {
        let fixture = fixture();
        let basic = plan("Basic");

        let matrix = resolve_matrix(
            &basic,
            &[
                row(&basic, fixture.export_id, "true"),
                row(&basic, fixture.support_id, "prioritario"),
                row(&basic, fixture.limit_id, "unlimited"),
            ],
            &fixture.catalog,
        );

        assert!(matrix.has_resource_access(ResourceKey::RelatoriosExportacao));
        assert_eq!(
            matrix.value_of(ResourceKey::SuporteNivel),
            Some(&CapabilityValue::Text("prioritario".to_string()))
        );
        assert!(matrix.can_create_more(ResourceKey::TransacoesLimite, 1_000_000));
        assert_eq!(
            matrix.value_of(ResourceKey::ClientesLimite),
            Tier::Basic.base_template().value_of(ResourceKey::ClientesLimite)
        );
    }

    #[test]
    fn decimal_limit_override_keeps_tier_value() {
        let fixture = fixture();
        let basic = plan("Basic");
        let base = Tier::Basic
            .base_template()
            .value_of(ResourceKey::TransacoesLimite)
            .cloned();

        let matrix = resolve_matrix(
            &basic,
            &[
                row(&basic, fixture.limit_id, "2.5"),
                row(&basic, fixture.export_id, "sim"),
            ],
            &fixture.catalog,
        );

        assert_eq!(
            matrix.value_of(ResourceKey::TransacoesLimite).cloned(),
            base
        );
        assert_ne!(
            matrix.value_of(ResourceKey::TransacoesLimite),
            Some(&CapabilityValue::Text("2.5".to_string()))
        );
        assert_eq!(
            matrix.value_of(ResourceKey::RelatoriosExportacao),
            Tier::Basic
                .base_template()
                .value_of(ResourceKey::RelatoriosExportacao)
        );
    }

    #[test]
    fn resolution_never_mutates_templates() {
        let fixture = fixture();
        let premium = plan("Premium");
        let overrides = vec![row(&premium, fixture.limit_id, "5")];
        let template_before = Tier::Premium.base_template().clone();

        let mut first = resolve_matrix(&premium, &overrides, &fixture.catalog);
        let second = resolve_matrix(&premium, &overrides, &fixture.catalog);

        assert_eq!(first, second);

        first.set(ResourceKey::TransacoesLimite, CapabilityValue::Limit(999));
        assert_eq!(
            second.value_of(ResourceKey::TransacoesLimite),
            Some(&CapabilityValue::Limit(5))
        );
        assert_eq!(Tier::Premium.base_template(), &template_before);
    }

    #[test]
    fn unrecognized_plan_name_uses_free_template() {
        let fixture = fixture();
        let enterprise = plan("Enterprise Custom");

        let matrix = resolve_matrix(&enterprise, &[], &fixture.catalog);

        assert_eq!(&matrix, Tier::Free.base_template());
    }

    #[tokio::test]
    async fn resolve_fails_without_active_subscription() {
        let tenant_id = Uuid::new_v4();
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_active_by_tenant()
            .with(eq(tenant_id))
            .times(1)
            .returning(|_| Ok(None));

        let mut plan_repo = MockPlanRepository::new();
        plan_repo.expect_find_by_id().never();
        let plan_resource_repo = MockPlanResourceRepository::new();

        let resolver = EntitlementResolver::new(
            Arc::new(subscription_repo),
            Arc::new(plan_repo),
            Arc::new(plan_resource_repo),
            Arc::new(fixture().catalog),
        );

        let result = resolver.resolve(tenant_id, Role::Admin).await;

        assert!(matches!(result, Err(EntitlementError::NoActiveSubscription(id)) if id == tenant_id));
    }

    #[tokio::test]
    async fn super_admin_bypasses_lookup() {
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo.expect_find_active_by_tenant().never();

        let resolver = EntitlementResolver::new(
            Arc::new(subscription_repo),
            Arc::new(MockPlanRepository::new()),
            Arc::new(MockPlanResourceRepository::new()),
            Arc::new(fixture().catalog),
        );

        let matrix = resolver
            .resolve(Uuid::new_v4(), Role::SuperAdmin)
            .await
            .unwrap();

        assert_eq!(&matrix, Tier::highest().base_template());
    }

    #[tokio::test]
    async fn resolve_overlays_plan_overrides() {
        let fixture = fixture();
        let tenant_id = Uuid::new_v4();
        let professional = plan("Professional Anual");
        let plan_id = professional.id;
        let overrides = vec![row(&professional, fixture.limit_id, "12")];
        let subscription = active_subscription(tenant_id, plan_id);

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_active_by_tenant()
            .with(eq(tenant_id))
            .returning(move |_| Ok(Some(subscription.clone())));

        let mut plan_repo = MockPlanRepository::new();
        plan_repo
            .expect_find_by_id()
            .with(eq(plan_id))
            .returning(move |_| Ok(Some(professional.clone())));

        let mut plan_resource_repo = MockPlanResourceRepository::new();
        plan_resource_repo
            .expect_list_by_plan()
            .with(eq(plan_id))
            .returning(move |_| Ok(overrides.clone()));

        let resolver = EntitlementResolver::new(
            Arc::new(subscription_repo),
            Arc::new(plan_repo),
            Arc::new(plan_resource_repo),
            Arc::new(fixture.catalog),
        );

        let matrix = resolver.resolve(tenant_id, Role::Member).await.unwrap();

        assert_eq!(
            matrix.value_of(ResourceKey::TransacoesLimite),
            Some(&CapabilityValue::Limit(12))
        );
        assert!(matrix.has_resource_access(ResourceKey::IntegracoesGatewaysOnline));
    }

    #[tokio::test]
    async fn missing_plan_is_reported() {
        let tenant_id = Uuid::new_v4();
        let plan_id = Uuid::new_v4();
        let subscription = active_subscription(tenant_id, plan_id);

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_active_by_tenant()
            .returning(move |_| Ok(Some(subscription.clone())));
        let mut plan_repo = MockPlanRepository::new();
        plan_repo.expect_find_by_id().returning(|_| Ok(None));

        let resolver = EntitlementResolver::new(
            Arc::new(subscription_repo),
            Arc::new(plan_repo),
            Arc::new(MockPlanResourceRepository::new()),
            Arc::new(fixture().catalog),
        );

        let result = resolver.resolve(tenant_id, Role::Admin).await;

        assert!(matches!(result, Err(EntitlementError::PlanNotFound(id)) if id == plan_id));
    }
}
