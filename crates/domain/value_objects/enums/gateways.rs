use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::payment_statuses::PaymentStatus;

/// Online payment processors a tenant can enable for automatic charges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GatewayName {
    Stripe,
    MercadoPago,
}

impl GatewayName {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayName::Stripe => "stripe",
            GatewayName::MercadoPago => "mercado_pago",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "stripe" => Some(GatewayName::Stripe),
            "mercado_pago" | "mercadopago" => Some(GatewayName::MercadoPago),
            _ => None,
        }
    }

    /// Credential store keys that must be present before a charge is attempted.
    pub fn required_credentials(&self) -> &'static [&'static str] {
        match self {
            GatewayName::Stripe => &["secret_key"],
            GatewayName::MercadoPago => &["access_token"],
        }
    }

    /// Maps a processor-reported status onto the two settled payment states.
    /// Anything else (in-flight states, unknown strings) yields `None` and must be ignored.
    pub fn map_external_status(&self, external_status: &str) -> Option<PaymentStatus> {
        let status = external_status.trim().to_ascii_lowercase();
        match self {
            GatewayName::Stripe => match status.as_str() {
                "succeeded" => Some(PaymentStatus::Approved),
                "payment_failed" | "canceled" | "requires_payment_method" => {
                    Some(PaymentStatus::Failed)
                }
                _ => None,
            },
            GatewayName::MercadoPago => match status.as_str() {
                "approved" => Some(PaymentStatus::Approved),
                "rejected" | "cancelled" => Some(PaymentStatus::Failed),
                _ => None,
            },
        }
    }
}

impl Display for GatewayName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
