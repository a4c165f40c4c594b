use std::collections::BTreeMap;

use serde::Serialize;

use super::resource_keys::{Module, ResourceKey};

pub const UNLIMITED_SENTINEL: &str = "unlimited";

/// Effective value of one resource for a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityValue {
    Flag(bool),
    Limit(i64),
    Unlimited,
    Text(String),
}

impl CapabilityValue {
    /// Infers a typed value from an override's raw text: `true`/`false` become
    /// flags, integers become limits, `unlimited` becomes the unlimited marker and
    /// everything else is kept verbatim.
    pub fn from_text(raw: &str) -> Self {
        let value = raw.trim();

        if value.eq_ignore_ascii_case("true") {
            return CapabilityValue::Flag(true);
        }
        if value.eq_ignore_ascii_case("false") {
            return CapabilityValue::Flag(false);
        }
        if value.eq_ignore_ascii_case(UNLIMITED_SENTINEL) {
            return CapabilityValue::Unlimited;
        }
        if let Ok(limit) = value.parse::<i64>() {
            return CapabilityValue::Limit(limit);
        }

        CapabilityValue::Text(raw.to_string())
    }

    pub fn grants_access(&self) -> bool {
        matches!(
            self,
            CapabilityValue::Flag(true) | CapabilityValue::Unlimited
        )
    }

    pub fn allows_another(&self, current_count: i64) -> bool {
        match self {
            CapabilityValue::Unlimited => true,
            CapabilityValue::Limit(limit) => current_count < *limit,
            _ => false,
        }
    }
}

/// Resolved module → resource → value table for one tenant.
///
/// Always an owned value: resolution clones a tier template and overlays it, so
/// callers are free to mutate their copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilityMatrix {
    values: BTreeMap<ResourceKey, CapabilityValue>,
}

impl CapabilityMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: ResourceKey, value: CapabilityValue) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: ResourceKey, value: CapabilityValue) {
        self.values.insert(key, value);
    }

    pub fn value_of(&self, key: ResourceKey) -> Option<&CapabilityValue> {
        self.values.get(&key)
    }

    pub fn module(&self, module: Module) -> impl Iterator<Item = (ResourceKey, &CapabilityValue)> {
        self.values
            .iter()
            .filter(move |(key, _)| key.module() == module)
            .map(|(key, value)| (*key, value))
    }

    pub fn keys(&self) -> impl Iterator<Item = ResourceKey> + '_ {
        self.values.keys().copied()
    }

    pub fn has_module_access(&self, module: Module) -> bool {
        self.has_resource_access(module.access_key())
    }

    pub fn has_resource_access(&self, key: ResourceKey) -> bool {
        self.value_of(key)
            .is_some_and(CapabilityValue::grants_access)
    }

    pub fn can_create_more(&self, key: ResourceKey, current_count: i64) -> bool {
        self.value_of(key)
            .is_some_and(|value| value.allows_another(current_count))
    }
}
