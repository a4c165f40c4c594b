use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::capabilities::CapabilityValue;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Boolean,
    Int,
    Text,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Boolean => "boolean",
            ResourceType::Int => "int",
            ResourceType::Text => "text",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "boolean" => Some(ResourceType::Boolean),
            "int" => Some(ResourceType::Int),
            "text" => Some(ResourceType::Text),
            _ => None,
        }
    }

    /// Whether an inferred override value fits the declared type. `unlimited` is a valid `int`.
    pub fn accepts(&self, value: &CapabilityValue) -> bool {
        match (self, value) {
            (ResourceType::Boolean, CapabilityValue::Flag(_)) => true,
            (ResourceType::Int, CapabilityValue::Limit(_) | CapabilityValue::Unlimited) => true,
            (ResourceType::Text, _) => true,
            _ => false,
        }
    }
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
