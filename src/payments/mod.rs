//! External payment provider seam.
//!
//! Services depend on the [`PaymentGateway`] trait; the Stripe
//! implementation lives in [`stripe`]. Amounts cross this boundary in the
//! provider's minor units (cents).

pub mod stripe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    /// Provider status string: requires_payment_method, requires_action,
    /// processing, succeeded, canceled, ...
    pub status: String,
    /// Minor units
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: String,
    pub status: String,
    pub currency: Option<String>,
    pub current_period_end: Option<i64>,
    /// Unit amount of the first subscription item, in minor units
    pub unit_amount: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateIntentRequest {
    /// Minor units
    pub amount: i64,
    pub currency: String,
    pub customer_id: String,
    /// Free-form metadata forwarded to the provider. Ordered so request
    /// encoding is deterministic.
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardDetails {
    pub number: String,
    pub exp_month: u32,
    pub exp_year: u32,
    pub cvc: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BillingDetails {
    pub name: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub postal_code: Option<String>,
    pub state: Option<String>,
}

/// Card-payment provider operations used by the checkout and payment
/// workflows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_customer(&self, name: &str, email: &str) -> Result<Customer, ServiceError>;

    async fn create_payment_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<PaymentIntent, ServiceError>;

    async fn confirm_payment_intent(
        &self,
        intent_id: &str,
        payment_method_id: &str,
    ) -> Result<PaymentIntent, ServiceError>;

    async fn create_payment_method(
        &self,
        card: CardDetails,
        billing: BillingDetails,
    ) -> Result<PaymentMethod, ServiceError>;

    async fn attach_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), ServiceError>;

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), ServiceError>;

    async fn create_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<Subscription, ServiceError>;

    async fn cancel_subscription(&self, subscription_id: &str)
        -> Result<Subscription, ServiceError>;

    async fn update_subscription(
        &self,
        subscription_id: &str,
        price_id: &str,
    ) -> Result<Subscription, ServiceError>;
}
