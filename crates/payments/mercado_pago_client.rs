use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domain::{
    repositories::payment_gateway::{
        ChargeReceipt, ChargeRequest, GatewayCredentials, PaymentGateway,
    },
    value_objects::enums::gateways::GatewayName,
};

pub const MERCADO_PAGO_API_BASE: &str = "https://api.mercadopago.com";
pub const ACCESS_TOKEN: &str = "access_token";

pub struct MercadoPagoClient {
    http: reqwest::Client,
    api_base: String,
}

#[derive(Debug, Serialize)]
struct PreferenceItem {
    id: String,
    title: String,
    quantity: u32,
    currency_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    unit_price: Decimal,
}

#[derive(Debug, Serialize)]
struct PreferenceRequest {
    items: Vec<PreferenceItem>,
    external_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    payer: Option<PreferencePayer>,
}

#[derive(Debug, Serialize)]
struct PreferencePayer {
    email: String,
}

#[derive(Debug, Deserialize)]
pub struct MercadoPagoPreference {
    pub id: String,
    pub init_point: Option<String>,
}

/// Payment as reported by `GET /v1/payments/{id}`. `external_reference` is
/// the payment id we sent on the preference.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MercadoPagoPayment {
    pub id: i64,
    pub status: String,
    pub external_reference: Option<String>,
}

/// Body of a Mercado Pago webhook notification. Only payment topics are acted on.
#[derive(Debug, Deserialize)]
pub struct MercadoPagoNotification {
    #[serde(rename = "type", alias = "topic")]
    pub type_: String,
    pub data: Option<MercadoPagoNotificationData>,
}

#[derive(Debug, Deserialize)]
pub struct MercadoPagoNotificationData {
    pub id: String,
}

impl MercadoPagoNotification {
    pub fn payment_id(&self) -> Option<&str> {
        if self.type_ != "payment" {
            return None;
        }
        self.data.as_ref().map(|data| data.id.as_str())
    }
}

impl Default for MercadoPagoClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MercadoPagoClient {
    pub fn new() -> Self {
        Self::with_api_base(MERCADO_PAGO_API_BASE)
    }

    pub fn with_api_base(api_base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Checkout preference for one payment; the payment id travels as `external_reference`.
    pub async fn create_preference(
        &self,
        access_token: &str,
        request: &ChargeRequest,
    ) -> Result<MercadoPagoPreference> {
        // https://www.mercadopago.com.br/developers/en/reference/preferences/_checkout_preferences/post
        let body = PreferenceRequest {
            items: vec![PreferenceItem {
                id: request.subscription_id.to_string(),
                title: format!("Assinatura {}", request.subscription_id),
                quantity: 1,
                currency_id: request.currency.to_uppercase(),
                unit_price: Decimal::new(request.amount_cents, 2),
            }],
            external_reference: request.payment_id.to_string(),
            payer: request
                .customer_ref
                .clone()
                .map(|email| PreferencePayer { email }),
        };

        let resp = self
            .http
            .post(format!("{}/checkout/preferences", self.api_base))
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .header("X-Idempotency-Key", request.payment_id.to_string())
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(
                status = %status,
                response_body = %body,
                payment_id = %request.payment_id,
                "mercado_pago_client: create preference failed"
            );
            return Err(anyhow!(
                "Mercado Pago API request failed: create preference (status {status})"
            ));
        }

        let preference: MercadoPagoPreference = resp.json().await?;
        Ok(preference)
    }

    pub async fn get_payment(
        &self,
        access_token: &str,
        mp_payment_id: &str,
    ) -> Result<MercadoPagoPayment> {
        // https://www.mercadopago.com.br/developers/en/reference/payments/_payments_id/get
        let resp = self
            .http
            .get(format!("{}/v1/payments/{mp_payment_id}", self.api_base))
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(
                status = %status,
                response_body = %body,
                %mp_payment_id,
                "mercado_pago_client: get payment failed"
            );
            return Err(anyhow!(
                "Mercado Pago API request failed: get payment (status {status})"
            ));
        }

        let payment: MercadoPagoPayment = resp.json().await?;
        Ok(payment)
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    fn name(&self) -> GatewayName {
        GatewayName::MercadoPago
    }

    async fn charge(
        &self,
        credentials: &GatewayCredentials,
        request: &ChargeRequest,
    ) -> Result<ChargeReceipt> {
        let access_token = credentials
            .get(ACCESS_TOKEN)
            .ok_or_else(|| anyhow!("mercado pago access token is not configured"))?;

        let preference = self.create_preference(access_token, request).await?;
        Ok(ChargeReceipt {
            external_ref: preference.id,
            external_status: None,
        })
    }
}
