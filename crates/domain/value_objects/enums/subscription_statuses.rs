use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Pending,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "active" => Some(SubscriptionStatus::Active),
            "pending" => Some(SubscriptionStatus::Pending),
            "expired" => Some(SubscriptionStatus::Expired),
            "cancelled" => Some(SubscriptionStatus::Cancelled),
            _ => None,
        }
    }

    /// Expired and cancelled subscriptions carry an end date; every other status must not.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Expired | SubscriptionStatus::Cancelled
        )
    }

    /// Regular transitions only. Leaving a terminal status goes through the
    /// operator reactivation path, which does not consult this table.
    ///
    /// | From   | To        |
    /// |--------|-----------|
    /// | active | expired   |
    /// | active | cancelled |
    pub fn can_transition_to(&self, target: SubscriptionStatus) -> bool {
        matches!(
            (self, target),
            (SubscriptionStatus::Active, SubscriptionStatus::Expired)
                | (SubscriptionStatus::Active, SubscriptionStatus::Cancelled)
        )
    }
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_subscriptions_can_end() {
        assert!(SubscriptionStatus::Active.can_transition_to(SubscriptionStatus::Expired));
        assert!(SubscriptionStatus::Active.can_transition_to(SubscriptionStatus::Cancelled));

        assert!(!SubscriptionStatus::Expired.can_transition_to(SubscriptionStatus::Active));
        assert!(!SubscriptionStatus::Cancelled.can_transition_to(SubscriptionStatus::Active));
        assert!(!SubscriptionStatus::Expired.can_transition_to(SubscriptionStatus::Expired));
        assert!(!SubscriptionStatus::Pending.can_transition_to(SubscriptionStatus::Expired));
        assert!(!SubscriptionStatus::Cancelled.can_transition_to(SubscriptionStatus::Expired));
    }

    #[test]
    fn parses_database_values() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::Pending,
            SubscriptionStatus::Expired,
            SubscriptionStatus::Cancelled,
        ] {
            assert_eq!(SubscriptionStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(SubscriptionStatus::from_str("past_due"), None);
    }
}
