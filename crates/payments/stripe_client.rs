use anyhow::Result;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use sha2::Sha256;
use tracing::error;

use crate::domain::{
    repositories::payment_gateway::{
        ChargeReceipt, ChargeRequest, GatewayCredentials, PaymentGateway,
    },
    value_objects::enums::gateways::GatewayName,
};

type HmacSha256 = Hmac<Sha256>;

pub const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
pub const SECRET_KEY: &str = "secret_key";
pub const WEBHOOK_SECRET: &str = "webhook_secret";

/// Minimal Stripe client built on reqwest. Secrets come per call from the credential store.
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub livemode: Option<bool>,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
    pub status: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    decline_code: Option<String>,
}

impl StripeEvent {
    /// `(payment intent id, status)` for payment intent events; `None` for anything else.
    /// Event types take precedence over the embedded status, which can lag behind.
    pub fn payment_intent_update(&self) -> Option<(String, String)> {
        if !self.type_.starts_with("payment_intent.") {
            return None;
        }

        let intent: StripePaymentIntent = serde_json::from_value(self.data.object.clone()).ok()?;
        let status = match self.type_.as_str() {
            "payment_intent.succeeded" => "succeeded".to_string(),
            "payment_intent.payment_failed" => "payment_failed".to_string(),
            "payment_intent.canceled" => "canceled".to_string(),
            _ => intent.status?,
        };

        Some((intent.id, status))
    }
}

impl Default for StripeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl StripeClient {
    pub fn new() -> Self {
        Self::with_api_base(STRIPE_API_BASE)
    }

    pub fn with_api_base(api_base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let details = serde_json::from_str::<StripeErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?details.as_ref().and_then(|d| d.type_.as_deref()),
            stripe_error_code = ?details.as_ref().and_then(|d| d.code.as_deref()),
            stripe_error_message = ?details.as_ref().and_then(|d| d.message.as_deref()),
            stripe_decline_code = ?details.as_ref().and_then(|d| d.decline_code.as_deref()),
            context = %context,
            "stripe_client: api request failed"
        );

        anyhow::bail!(
            "Stripe API request failed: {} (status {}, request_id={:?})",
            context,
            status,
            request_id
        );
    }

    /// Confirms an off-session PaymentIntent for the tenant's Stripe customer.
    /// The payment id doubles as idempotency key, so a retried attempt never charges twice.
    pub async fn create_payment_intent(
        &self,
        secret_key: &str,
        request: &ChargeRequest,
    ) -> Result<StripePaymentIntent> {
        // https://stripe.com/docs/api/payment_intents/create
        let mut body: Vec<(String, String)> = vec![
            ("amount".to_string(), request.amount_cents.to_string()),
            ("currency".to_string(), request.currency.to_lowercase()),
            ("confirm".to_string(), "true".to_string()),
            ("off_session".to_string(), "true".to_string()),
            (
                "metadata[payment_id]".to_string(),
                request.payment_id.to_string(),
            ),
            (
                "metadata[subscription_id]".to_string(),
                request.subscription_id.to_string(),
            ),
            (
                "metadata[tenant_id]".to_string(),
                request.tenant_id.to_string(),
            ),
        ];

        if let Some(customer) = &request.customer_ref {
            body.push(("customer".to_string(), customer.clone()));
        }

        let resp = self
            .http
            .post(format!("{}/payment_intents", self.api_base))
            .header(AUTHORIZATION, format!("Bearer {secret_key}"))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("Idempotency-Key", request.payment_id.to_string())
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create payment intent").await?;

        let intent: StripePaymentIntent = resp.json().await?;
        Ok(intent)
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    fn name(&self) -> GatewayName {
        GatewayName::Stripe
    }

    async fn charge(
        &self,
        credentials: &GatewayCredentials,
        request: &ChargeRequest,
    ) -> Result<ChargeReceipt> {
        let secret_key = credentials
            .get(SECRET_KEY)
            .ok_or_else(|| anyhow::anyhow!("stripe secret key is not configured"))?;

        let intent = self.create_payment_intent(secret_key, request).await?;
        Ok(ChargeReceipt {
            external_ref: intent.id,
            external_status: intent.status,
        })
    }
}

/// Verifies the webhook signature. https://stripe.com/docs/webhooks/signatures
pub fn verify_webhook_signature(
    webhook_secret: &str,
    payload: &[u8],
    signature_header: &str,
) -> Result<StripeEvent> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("t=") {
            timestamp = Some(rest);
        } else if let Some(rest) = part.strip_prefix("v1=") {
            signatures.push(rest);
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| anyhow::anyhow!("missing timestamp in stripe-signature"))?;
    if signatures.is_empty() {
        anyhow::bail!("missing v1 in stripe-signature");
    }

    let mut signed_payload = Vec::with_capacity(timestamp.len() + 1 + payload.len());
    signed_payload.extend_from_slice(timestamp.as_bytes());
    signed_payload.push(b'.');
    signed_payload.extend_from_slice(payload);

    let matched = signatures.iter().any(|signature| {
        let Ok(provided) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(webhook_secret.as_bytes()) else {
            return false;
        };
        mac.update(&signed_payload);
        mac.verify_slice(&provided).is_ok()
    });

    if !matched {
        anyhow::bail!("invalid webhook signature");
    }

    let event: StripeEvent = serde_json::from_slice(payload)?;
    Ok(event)
}
