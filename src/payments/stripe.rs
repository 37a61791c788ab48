//! Stripe REST client and webhook event verification.
//!
//! Requests are form-encoded with the secret key as basic-auth username,
//! per the Stripe API. The base URL is configurable so tests can point at
//! a local mock server.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::BTreeMap;
use tracing::{instrument, warn};

use super::{
    BillingDetails, CardDetails, CreateIntentRequest, Customer, PaymentGateway, PaymentIntent,
    PaymentMethod, Subscription,
};
use crate::errors::ServiceError;

type HmacSha256 = Hmac<Sha256>;

pub struct StripeGateway {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionBody {
    id: String,
    status: String,
    currency: Option<String>,
    current_period_end: Option<i64>,
    #[serde(default)]
    items: SubscriptionItems,
}

#[derive(Debug, Default, Deserialize)]
struct SubscriptionItems {
    #[serde(default)]
    data: Vec<SubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItem {
    id: String,
    price: Option<SubscriptionPrice>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionPrice {
    unit_amount: Option<i64>,
}

impl From<SubscriptionBody> for Subscription {
    fn from(body: SubscriptionBody) -> Self {
        let unit_amount = body
            .items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .and_then(|price| price.unit_amount);
        Subscription {
            id: body.id,
            status: body.status,
            currency: body.currency,
            current_period_end: body.current_period_end,
            unit_amount,
        }
    }
}

impl StripeGateway {
    pub fn new(api_base: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, ServiceError> {
        let url = format!("{}{path}", self.api_base);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("stripe request: {e}")))?;

        Self::parse(response).await
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let url = format!("{}{path}", self.api_base);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("stripe request: {e}")))?;

        Self::parse(response).await
    }

    async fn delete<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let url = format!("{}{path}", self.api_base);
        let response = self
            .http
            .delete(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("stripe request: {e}")))?;

        Self::parse(response).await
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ServiceError> {
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("stripe body: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<StripeErrorBody>(&bytes)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| format!("stripe returned {status}"));
            warn!(%status, %message, "stripe call failed");
            return Err(ServiceError::PaymentFailed(message));
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::ExternalServiceError(format!("stripe decode: {e}")))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self))]
    async fn create_customer(&self, name: &str, email: &str) -> Result<Customer, ServiceError> {
        let form = vec![
            ("name".to_string(), name.to_string()),
            ("email".to_string(), email.to_string()),
        ];
        self.post_form("/v1/customers", &form).await
    }

    #[instrument(skip(self, request), fields(amount = request.amount, currency = %request.currency))]
    async fn create_payment_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<PaymentIntent, ServiceError> {
        let mut form = vec![
            ("amount".to_string(), request.amount.to_string()),
            ("currency".to_string(), request.currency),
            ("customer".to_string(), request.customer_id),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
            (
                "automatic_payment_methods[allow_redirects]".to_string(),
                "never".to_string(),
            ),
        ];
        for (key, value) in request.metadata {
            form.push((format!("metadata[{key}]"), value));
        }
        self.post_form("/v1/payment_intents", &form).await
    }

    #[instrument(skip(self))]
    async fn confirm_payment_intent(
        &self,
        intent_id: &str,
        payment_method_id: &str,
    ) -> Result<PaymentIntent, ServiceError> {
        let form = vec![(
            "payment_method".to_string(),
            payment_method_id.to_string(),
        )];
        self.post_form(&format!("/v1/payment_intents/{intent_id}/confirm"), &form)
            .await
    }

    #[instrument(skip(self, card, billing))]
    async fn create_payment_method(
        &self,
        card: CardDetails,
        billing: BillingDetails,
    ) -> Result<PaymentMethod, ServiceError> {
        let mut form = vec![
            ("type".to_string(), "card".to_string()),
            ("card[number]".to_string(), card.number),
            ("card[exp_month]".to_string(), card.exp_month.to_string()),
            ("card[exp_year]".to_string(), card.exp_year.to_string()),
            ("card[cvc]".to_string(), card.cvc),
        ];
        let address = [
            ("city", billing.city),
            ("country", billing.country),
            ("line1", billing.line1),
            ("line2", billing.line2),
            ("postal_code", billing.postal_code),
            ("state", billing.state),
        ];
        if let Some(name) = billing.name {
            form.push(("billing_details[name]".to_string(), name));
        }
        for (field, value) in address {
            if let Some(value) = value {
                form.push((format!("billing_details[address][{field}]"), value));
            }
        }
        self.post_form("/v1/payment_methods", &form).await
    }

    #[instrument(skip(self))]
    async fn attach_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), ServiceError> {
        let form = vec![("customer".to_string(), customer_id.to_string())];
        let _: PaymentMethod = self
            .post_form(&format!("/v1/payment_methods/{payment_method_id}/attach"), &form)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), ServiceError> {
        let form = vec![(
            "invoice_settings[default_payment_method]".to_string(),
            payment_method_id.to_string(),
        )];
        let _: Customer = self
            .post_form(&format!("/v1/customers/{customer_id}"), &form)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, metadata))]
    async fn create_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<Subscription, ServiceError> {
        let mut form = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("items[0][price]".to_string(), price_id.to_string()),
        ];
        for (key, value) in metadata {
            form.push((format!("metadata[{key}]"), value));
        }
        let body: SubscriptionBody = self.post_form("/v1/subscriptions", &form).await?;
        Ok(body.into())
    }

    #[instrument(skip(self))]
    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, ServiceError> {
        let body: SubscriptionBody = self
            .delete(&format!("/v1/subscriptions/{subscription_id}"))
            .await?;
        Ok(body.into())
    }

    #[instrument(skip(self))]
    async fn update_subscription(
        &self,
        subscription_id: &str,
        price_id: &str,
    ) -> Result<Subscription, ServiceError> {
        // The price change targets the first subscription item.
        let current: SubscriptionBody = self
            .get(&format!("/v1/subscriptions/{subscription_id}"))
            .await?;
        let item_id = current
            .items
            .data
            .first()
            .map(|item| item.id.clone())
            .ok_or_else(|| {
                ServiceError::PaymentFailed("subscription has no items to update".to_string())
            })?;

        let form = vec![
            ("items[0][id]".to_string(), item_id),
            ("items[0][price]".to_string(), price_id.to_string()),
        ];
        let body: SubscriptionBody = self
            .post_form(&format!("/v1/subscriptions/{subscription_id}"), &form)
            .await?;
        Ok(body.into())
    }
}

/// Verified webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// `data.object.id` — the payment-intent id for payment events.
    pub fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(|v| v.as_str())
    }

    pub fn object_status(&self) -> Option<&str> {
        self.data.object.get("status").and_then(|v| v.as_str())
    }

    /// `data.object.amount` in minor units.
    pub fn object_amount(&self) -> Option<i64> {
        self.data.object.get("amount").and_then(|v| v.as_i64())
    }

    pub fn object_currency(&self) -> Option<&str> {
        self.data.object.get("currency").and_then(|v| v.as_str())
    }
}

/// Verifies a `stripe-signature` header (`t=<ts>,v1=<hmac>` scheme) against
/// the raw payload and parses the event. Nothing is parsed before the
/// signature checks out.
pub fn construct_event(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance_secs: u64,
    now_unix: i64,
) -> Result<WebhookEvent, ServiceError> {
    let (timestamp, signature) = parse_signature_header(signature_header)
        .ok_or_else(|| ServiceError::BadRequest("malformed stripe-signature header".into()))?;

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| ServiceError::BadRequest("malformed webhook timestamp".into()))?;
    if (now_unix - ts).unsigned_abs() > tolerance_secs {
        return Err(ServiceError::Unauthorized(
            "webhook timestamp outside tolerance".into(),
        ));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ServiceError::InternalError(format!("webhook secret: {e}")))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        return Err(ServiceError::Unauthorized(
            "webhook signature verification failed".into(),
        ));
    }

    serde_json::from_slice(payload)
        .map_err(|e| ServiceError::BadRequest(format!("invalid webhook payload: {e}")))
}

fn parse_signature_header(header: &str) -> Option<(&str, &str)> {
    let mut timestamp = None;
    let mut signature = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }
    Some((timestamp?, signature?))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Test helper: signs a payload the way the provider does.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key len");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn event_json() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": {
                "object": {
                    "id": "pi_123",
                    "status": "succeeded",
                    "amount": 2500,
                    "currency": "usd"
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn valid_signature_parses_event() {
        let payload = event_json();
        let now = 1_700_000_000;
        let header = sign_payload(&payload, SECRET, now);

        let event = construct_event(&payload, &header, SECRET, 300, now).unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.object_id(), Some("pi_123"));
        assert_eq!(event.object_amount(), Some(2500));
        assert_eq!(event.object_currency(), Some("usd"));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let payload = event_json();
        let now = 1_700_000_000;
        let header = sign_payload(&payload, SECRET, now);

        let mut tampered = payload.clone();
        let pos = tampered.iter().position(|&b| b == b'2').unwrap();
        tampered[pos] = b'9';

        assert!(construct_event(&tampered, &header, SECRET, 300, now).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let payload = event_json();
        let now = 1_700_000_000;
        let header = sign_payload(&payload, "whsec_other", now);
        assert!(construct_event(&payload, &header, SECRET, 300, now).is_err());
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let payload = event_json();
        let signed_at = 1_700_000_000;
        let header = sign_payload(&payload, SECRET, signed_at);
        assert!(construct_event(&payload, &header, SECRET, 300, signed_at + 301).is_err());
    }

    #[test]
    fn header_without_v1_is_rejected() {
        let payload = event_json();
        let err = construct_event(&payload, "t=123", SECRET, 300, 123).unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }
}
