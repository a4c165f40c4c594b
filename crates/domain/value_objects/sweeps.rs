use std::fmt::Display;

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    Overdue,
    Renewal,
}

impl Display for SweepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SweepKind::Overdue => f.write_str("overdue"),
            SweepKind::Renewal => f.write_str("renewal"),
        }
    }
}

/// What processing one subscription did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Overdue timeout reached; subscription moved to expired.
    Expired,
    /// A pending payment inside the grace period was already submitted to a gateway.
    AwaitingSettlement,
    /// A pending payment inside the grace period had never reached a gateway; charging again.
    ChargeRetried,
    /// No pending payment existed; one was opened and a charge attempted.
    PaymentOpened { payment_id: Uuid },
    /// Next billing period opened by the renewal sweep.
    Renewed { payment_id: Uuid },
    /// Renewal candidate whose next period is not due yet.
    NotDue,
    /// Subscription no longer matches the sweep's selection (e.g. changed since it was listed).
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepItemFailure {
    pub subscription_id: Uuid,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub kind: SweepKind,
    pub scanned: usize,
    pub expired: usize,
    pub awaiting_settlement: usize,
    pub charges_retried: usize,
    pub payments_opened: usize,
    pub renewed: usize,
    pub not_due: usize,
    pub skipped: usize,
    pub failures: Vec<SweepItemFailure>,
}

impl SweepReport {
    pub fn new(kind: SweepKind) -> Self {
        Self {
            kind,
            scanned: 0,
            expired: 0,
            awaiting_settlement: 0,
            charges_retried: 0,
            payments_opened: 0,
            renewed: 0,
            not_due: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Expired => self.expired += 1,
            ItemOutcome::AwaitingSettlement => self.awaiting_settlement += 1,
            ItemOutcome::ChargeRetried => self.charges_retried += 1,
            ItemOutcome::PaymentOpened { .. } => self.payments_opened += 1,
            ItemOutcome::Renewed { .. } => self.renewed += 1,
            ItemOutcome::NotDue => self.not_due += 1,
            ItemOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn record_failure(&mut self, subscription_id: Uuid, error: String) {
        self.failures.push(SweepItemFailure {
            subscription_id,
            error,
        });
    }
}
