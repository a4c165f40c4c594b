use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::domain::value_objects::{
    capabilities::CapabilityMatrix,
    enums::roles::Role,
    resource_keys::{Module, ResourceKey},
};
use crate::usecases::entitlements::{EntitlementError, EntitlementResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub tenant_id: Uuid,
    pub role: Role,
}

/// One capability a request needs before it may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Module(Module),
    Resource(ResourceKey),
    /// Room for one more item under a numeric limit.
    Capacity {
        key: ResourceKey,
        current_count: i64,
    },
}

impl Requirement {
    pub fn is_met_by(&self, matrix: &CapabilityMatrix) -> bool {
        match *self {
            Requirement::Module(module) => matrix.has_module_access(module),
            Requirement::Resource(key) => matrix.has_resource_access(key),
            Requirement::Capacity { key, current_count } => {
                matrix.can_create_more(key, current_count)
            }
        }
    }

    /// The module or `module.property` tag reported back on denial.
    pub fn tag(&self) -> String {
        match self {
            Requirement::Module(module) => module.as_str().to_string(),
            Requirement::Resource(key) | Requirement::Capacity { key, .. } => key.to_string(),
        }
    }
}

pub fn require_module(module: Module) -> Requirement {
    Requirement::Module(module)
}

pub fn require_resource(key: ResourceKey) -> Requirement {
    Requirement::Resource(key)
}

pub fn require_capacity(key: ResourceKey, current_count: i64) -> Requirement {
    Requirement::Capacity { key, current_count }
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("access denied: {required} is not enabled for this tenant")]
    Forbidden { required: String },
    #[error("tenant {0} has no active subscription")]
    NoActiveSubscription(Uuid),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AccessError {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            AccessError::Forbidden { .. } | AccessError::NoActiveSubscription(_) => {
                StatusCode::FORBIDDEN
            }
            AccessError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EntitlementError> for AccessError {
    fn from(value: EntitlementError) -> Self {
        match value {
            EntitlementError::NoActiveSubscription(tenant_id) => {
                AccessError::NoActiveSubscription(tenant_id)
            }
            EntitlementError::PlanNotFound(plan_id) => {
                AccessError::Internal(anyhow::anyhow!("plan {plan_id} not found"))
            }
            EntitlementError::Internal(err) => AccessError::Internal(err),
        }
    }
}

/// Request-time gate in front of operations that need an entitlement.
pub struct AccessGuard {
    resolver: Arc<EntitlementResolver>,
}

impl AccessGuard {
    pub fn new(resolver: Arc<EntitlementResolver>) -> Self {
        Self { resolver }
    }

    pub async fn check(
        &self,
        identity: Identity,
        requirement: Requirement,
    ) -> Result<(), AccessError> {
        self.check_all(identity, &[requirement]).await
    }

    /// Passes only if every requirement holds; the first unmet one is reported.
    pub async fn check_all(
        &self,
        identity: Identity,
        requirements: &[Requirement],
    ) -> Result<(), AccessError> {
        if identity.role.is_super_admin() {
            debug!(tenant_id = %identity.tenant_id, "access_guard: super admin bypass");
            return Ok(());
        }

        let matrix = self
            .resolver
            .resolve(identity.tenant_id, identity.role)
            .await
            .map_err(|err| {
                match &err {
                    EntitlementError::NoActiveSubscription(_) => warn!(
                        tenant_id = %identity.tenant_id,
                        "access_guard: denying request without active subscription"
                    ),
                    other => error!(
                        tenant_id = %identity.tenant_id,
                        error = ?other,
                        "access_guard: entitlement resolution failed"
                    ),
                }
                AccessError::from(err)
            })?;

        ensure_all(&matrix, requirements).inspect_err(|err| {
            warn!(
                tenant_id = %identity.tenant_id,
                error = %err,
                "access_guard: requirement not met"
            );
        })
    }
}

/// Evaluates requirements against an already resolved matrix.
pub fn ensure_all(
    matrix: &CapabilityMatrix,
    requirements: &[Requirement],
) -> Result<(), AccessError> {
    match requirements.iter().find(|req| !req.is_met_by(matrix)) {
        Some(unmet) => Err(AccessError::Forbidden {
            required: unmet.tag(),
        }),
        None => Ok(()),
    }
}
