use anyhow::anyhow;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::subscriptions::{
    SubscriptionEntity, UpdateSubscriptionBillingEntity,
};
use crate::domain::value_objects::enums::{
    billing_cycles::BillingCycle, subscription_payment_statuses::SubscriptionPaymentStatus,
    subscription_statuses::SubscriptionStatus,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid subscription transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: SubscriptionStatus,
    pub to: SubscriptionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionModel {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub plan_id: Uuid,
    pub cycle: BillingCycle,
    pub price_cents: i64,
    pub currency: String,
    pub status: SubscriptionStatus,
    pub payment_status: SubscriptionPaymentStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub next_due_date: Option<DateTime<Utc>>,
    /// When billing of the current period began; the grace period runs from here.
    pub period_started_at: Option<DateTime<Utc>>,
    pub auto_renew: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionModel {
    /// Due date of the period currently being billed.
    pub fn current_due_date(&self) -> DateTime<Utc> {
        self.next_due_date.unwrap_or(self.start_date)
    }

    /// Due date of the period after the current one, counted from `start_date`
    /// so month-end anchors survive short months.
    pub fn upcoming_due_date(&self) -> Option<DateTime<Utc>> {
        let current = self.current_due_date();
        let elapsed_months = (current.year() - self.start_date.year()) * 12
            + current.month() as i32
            - self.start_date.month() as i32;
        let periods = u32::try_from(elapsed_months.max(0)).ok()? / self.cycle.months() + 1;
        self.cycle.due_date(self.start_date, periods)
    }

    /// Start of unsettled billing for the current period.
    pub fn unsettled_since(&self) -> DateTime<Utc> {
        self.period_started_at.unwrap_or(self.start_date)
    }

    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<(), InvalidTransition> {
        self.transition_to(SubscriptionStatus::Expired, now)
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), InvalidTransition> {
        self.transition_to(SubscriptionStatus::Cancelled, now)
    }

    /// Operator override: back to active and settled regardless of the current status.
    /// Unsettled payments from before `now` no longer count against the subscription.
    pub fn force_reactivate(&mut self, now: DateTime<Utc>) {
        self.status = SubscriptionStatus::Active;
        self.payment_status = SubscriptionPaymentStatus::Paid;
        self.end_date = None;
        self.period_started_at = Some(now);
    }

    fn transition_to(
        &mut self,
        target: SubscriptionStatus,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(target) {
            return Err(InvalidTransition {
                from: self.status,
                to: target,
            });
        }

        self.status = target;
        self.end_date = target.is_terminal().then_some(now);
        Ok(())
    }

    /// Conditional write of the billing columns; applies only while the stored
    /// row still carries this model's `updated_at`.
    pub fn billing_update(&self, now: DateTime<Utc>) -> SubscriptionBillingUpdate {
        SubscriptionBillingUpdate {
            subscription_id: self.id,
            expected_updated_at: self.updated_at,
            status: self.status,
            payment_status: self.payment_status,
            end_date: self.end_date,
            next_due_date: self.next_due_date,
            period_started_at: self.period_started_at,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionBillingUpdate {
    pub subscription_id: Uuid,
    pub expected_updated_at: DateTime<Utc>,
    pub status: SubscriptionStatus,
    pub payment_status: SubscriptionPaymentStatus,
    pub end_date: Option<DateTime<Utc>>,
    pub next_due_date: Option<DateTime<Utc>>,
    pub period_started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<&SubscriptionBillingUpdate> for UpdateSubscriptionBillingEntity {
    fn from(value: &SubscriptionBillingUpdate) -> Self {
        Self {
            status: value.status.to_string(),
            payment_status: value.payment_status.to_string(),
            end_date: value.end_date,
            next_due_date: value.next_due_date,
            period_started_at: value.period_started_at,
            updated_at: value.updated_at,
        }
    }
}

impl TryFrom<SubscriptionEntity> for SubscriptionModel {
    type Error = anyhow::Error;

    fn try_from(value: SubscriptionEntity) -> Result<Self, Self::Error> {
        let cycle = BillingCycle::from_str(&value.cycle)
            .ok_or_else(|| anyhow!("subscription {} has unknown cycle {}", value.id, value.cycle))?;
        let status = SubscriptionStatus::from_str(&value.status).ok_or_else(|| {
            anyhow!("subscription {} has unknown status {}", value.id, value.status)
        })?;
        let payment_status = SubscriptionPaymentStatus::from_str(&value.payment_status)
            .ok_or_else(|| {
                anyhow!(
                    "subscription {} has unknown payment status {}",
                    value.id,
                    value.payment_status
                )
            })?;

        Ok(Self {
            id: value.id,
            tenant_id: value.tenant_id,
            plan_id: value.plan_id,
            cycle,
            price_cents: value.price_cents,
            currency: value.currency,
            status,
            payment_status,
            start_date: value.start_date,
            end_date: value.end_date,
            next_due_date: value.next_due_date,
            period_started_at: value.period_started_at,
            auto_renew: value.auto_renew,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn active_subscription() -> SubscriptionModel {
        let now = Utc::now();
        SubscriptionModel {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            cycle: BillingCycle::Monthly,
            price_cents: 9900,
            currency: "BRL".to_string(),
            status: SubscriptionStatus::Active,
            payment_status: SubscriptionPaymentStatus::Pending,
            start_date: now - Duration::days(40),
            end_date: None,
            next_due_date: None,
            period_started_at: None,
            auto_renew: true,
            created_at: now - Duration::days(40),
            updated_at: now - Duration::days(1),
        }
    }

    #[test]
    fn expiring_sets_end_date_and_keeps_payment_status() {
        let now = Utc::now();
        let mut subscription = active_subscription();

        subscription.expire(now).unwrap();

        assert_eq!(subscription.status, SubscriptionStatus::Expired);
        assert_eq!(subscription.end_date, Some(now));
        assert_eq!(subscription.payment_status, SubscriptionPaymentStatus::Pending);
    }

    #[test]
    fn expired_subscription_cannot_expire_again() {
        let now = Utc::now();
        let mut subscription = active_subscription();
        subscription.expire(now).unwrap();

        let err = subscription.expire(now + Duration::days(1)).unwrap_err();

        assert_eq!(err.from, SubscriptionStatus::Expired);
        assert_eq!(subscription.end_date, Some(now));
    }

    #[test]
    fn cancelled_subscription_cannot_be_expired() {
        let now = Utc::now();
        let mut subscription = active_subscription();
        subscription.cancel(now).unwrap();

        assert!(subscription.expire(now).is_err());
        assert_eq!(subscription.status, SubscriptionStatus::Cancelled);
    }

    #[test]
    fn reactivation_clears_end_date() {
        let now = Utc::now();
        let mut subscription = active_subscription();
        subscription.cancel(now).unwrap();

        subscription.force_reactivate(now);

        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert_eq!(subscription.payment_status, SubscriptionPaymentStatus::Paid);
        assert_eq!(subscription.end_date, None);
        assert_eq!(subscription.unsettled_since(), now);
    }

    #[test]
    fn billing_update_carries_read_version() {
        let now = Utc::now();
        let subscription = active_subscription();

        let update = subscription.billing_update(now);

        assert_eq!(update.expected_updated_at, subscription.updated_at);
        assert_eq!(update.updated_at, now);
    }

    #[test]
    fn current_due_date_falls_back_to_start_date() {
        let mut subscription = active_subscription();
        assert_eq!(subscription.current_due_date(), subscription.start_date);

        let next = subscription.start_date + Duration::days(30);
        subscription.next_due_date = Some(next);
        assert_eq!(subscription.current_due_date(), next);
    }

    #[test]
    fn month_end_anchor_survives_short_months() {
        let jan_31 = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        let mut subscription = active_subscription();
        subscription.start_date = jan_31;

        let mut due_dates = Vec::new();
        for _ in 0..3 {
            let next = subscription.upcoming_due_date().unwrap();
            due_dates.push(next.date_naive());
            subscription.next_due_date = Some(next);
        }

        assert_eq!(
            due_dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
                NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
            ]
        );
    }

    #[test]
    fn quarterly_anchor_counts_whole_periods() {
        let nov_30 = Utc.with_ymd_and_hms(2023, 11, 30, 0, 0, 0).unwrap();
        let mut subscription = active_subscription();
        subscription.cycle = BillingCycle::Quarterly;
        subscription.start_date = nov_30;
        subscription.next_due_date = Some(Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());

        assert_eq!(
            subscription.upcoming_due_date(),
            Some(Utc.with_ymd_and_hms(2024, 5, 30, 0, 0, 0).unwrap())
        );
    }
}
