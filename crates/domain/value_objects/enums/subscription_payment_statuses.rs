use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Settlement state of the subscription's current billing period.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl SubscriptionPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPaymentStatus::Pending => "pending",
            SubscriptionPaymentStatus::Paid => "paid",
            SubscriptionPaymentStatus::Failed => "failed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(SubscriptionPaymentStatus::Pending),
            "paid" => Some(SubscriptionPaymentStatus::Paid),
            "failed" => Some(SubscriptionPaymentStatus::Failed),
            _ => None,
        }
    }
}

impl Display for SubscriptionPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
