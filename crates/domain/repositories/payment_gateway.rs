use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::enums::gateways::GatewayName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    pub payment_id: Uuid,
    pub subscription_id: Uuid,
    pub tenant_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub customer_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeReceipt {
    /// Gateway correlation id, stored as `Payment.external_ref`.
    pub external_ref: String,
    pub external_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayCredentials {
    values: HashMap<String, String>,
}

impl GatewayCredentials {
    pub fn insert(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Outbound charge contract of an online payment processor.
#[automock]
#[async_trait]
pub trait PaymentGateway {
    fn name(&self) -> GatewayName;

    async fn charge(
        &self,
        credentials: &GatewayCredentials,
        request: &ChargeRequest,
    ) -> Result<ChargeReceipt>;
}
