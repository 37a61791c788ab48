use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::entities::order::{self, OrderStatus};
use crate::entities::payment_transaction::TransactionStatus;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::payments::stripe::WebhookEvent;
use crate::payments::{CreateIntentRequest, PaymentGateway};
use crate::repositories::invoices;
use crate::repositories::transactions::{NewTransaction, TransactionLedger, TransactionPatch};

const PROVIDER: &str = "stripe";
const CURRENCY: &str = "usd";

/// One-off plan purchase initiated from checkout.
#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct PlanPaymentRequest {
    /// Minor units (cents)
    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    pub occasion: String,
    pub description: String,
    pub recipient_name: Option<String>,
    pub delivery_deadline: String,
    pub phone_number: String,
    pub country: String,
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method_id: String,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlanPaymentResponse {
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    pub status: String,
    pub order_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct SubscriptionRequest {
    #[validate(length(min = 1))]
    pub price_id: String,
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    pub occasion: String,
    pub description: String,
    pub recipient_name: Option<String>,
    pub delivery_deadline: String,
    pub phone_number: String,
    pub country: String,
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method_id: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub subscription_id: String,
    pub status: String,
    pub current_period_end: Option<i64>,
}

/// Plan-payment and subscription workflows against the payment provider,
/// with the local order and ledger kept in step.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    gateway: Arc<dyn PaymentGateway>,
    ledger: TransactionLedger,
    events: EventSender,
}

impl PaymentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn PaymentGateway>,
        events: EventSender,
    ) -> Self {
        let ledger = TransactionLedger::new(db.clone());
        Self {
            db,
            gateway,
            ledger,
            events,
        }
    }

    /// Drives pending → completed for the synchronous confirmation path:
    /// customer → intent → order(pending) → ledger(pending) → confirm.
    /// A provider failure after the order insert leaves a pending order
    /// behind; webhook redelivery is the recovery path (there is no
    /// compensating rollback).
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create_plan_payment(
        &self,
        user_id: Uuid,
        request: PlanPaymentRequest,
    ) -> Result<PlanPaymentResponse, ServiceError> {
        request.validate()?;

        let customer = self
            .gateway
            .create_customer(
                &format!("{} {}", request.first_name, request.last_name),
                &request.email,
            )
            .await?;

        let mut metadata = BTreeMap::new();
        metadata.insert("occasion".to_string(), request.occasion.clone());
        metadata.insert("description".to_string(), request.description.clone());
        metadata.insert(
            "recipient_name".to_string(),
            request.recipient_name.clone().unwrap_or_default(),
        );
        metadata.insert(
            "delivery_deadline".to_string(),
            request.delivery_deadline.clone(),
        );
        metadata.insert("phone_number".to_string(), request.phone_number.clone());
        metadata.insert("country".to_string(), request.country.clone());
        metadata.insert("user_id".to_string(), user_id.to_string());

        let intent = self
            .gateway
            .create_payment_intent(CreateIntentRequest {
                amount: request.amount,
                currency: CURRENCY.to_string(),
                customer_id: customer.id,
                metadata,
            })
            .await?;

        let invoice_number = invoices::next_invoice_number(&self.db).await?;
        let order_id = Uuid::new_v4();
        let created = order::ActiveModel {
            id: Set(order_id),
            invoice_number: Set(invoice_number),
            user_id: Set(user_id),
            vendor_id: Set(None),
            status: Set(OrderStatus::Pending.to_string()),
            working_status: Set(None),
            total_amount: Set(Decimal::from(request.amount)),
            category: Set(request.category.clone()),
            payment_status: Set(TransactionStatus::Pending.to_string()),
            payment_provider: Set(Some(PROVIDER.to_string())),
            payment_reference_number: Set(Some(intent.id.clone())),
            payment_raw_status: Set(None),
            paid_amount: Set(None),
            paid_currency: Set(None),
            first_name: Set(Some(request.first_name.clone())),
            last_name: Set(Some(request.last_name.clone())),
            email: Set(Some(request.email.clone())),
            phone_number: Set(Some(request.phone_number.clone())),
            country: Set(Some(request.country.clone())),
            city: Set(None),
            occasion: Set(Some(request.occasion.clone())),
            recipient: Set(Some(
                request
                    .recipient_name
                    .clone()
                    .unwrap_or_else(|| "N/A".to_string()),
            )),
            delivery_deadline: Set(Some(request.delivery_deadline.clone())),
            comments: Set(Some(request.description.clone())),
            video_id: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await?;

        self.ledger
            .create(NewTransaction {
                order_id: Some(created.id),
                user_id: Some(user_id),
                amount: Some(Decimal::from(request.amount)),
                currency: Some(CURRENCY.to_string()),
                reference_number: Some(intent.id.clone()),
                status: Some(TransactionStatus::Pending.to_string()),
                tx_type: Some("order".to_string()),
                provider: Some(PROVIDER.to_string()),
                ..Default::default()
            })
            .await?;

        self.events.send(Event::OrderCreated(created.id)).await;

        let confirmed = self
            .gateway
            .confirm_payment_intent(&intent.id, &request.payment_method_id)
            .await?;

        if confirmed.status == TransactionStatus::Succeeded.as_ref() {
            // Provider amounts are minor units; paid_amount is stored in
            // major units.
            let paid_amount = Decimal::from(confirmed.amount) / Decimal::from(100);

            let mut completed: order::ActiveModel = created.into();
            completed.status = Set(OrderStatus::Completed.to_string());
            completed.payment_status = Set("paid".to_string());
            completed.payment_raw_status = Set(Some(confirmed.status.clone()));
            completed.paid_amount = Set(Some(paid_amount));
            completed.paid_currency = Set(Some(confirmed.currency.clone()));
            completed.updated_at = Set(Some(Utc::now()));
            completed.update(&*self.db).await?;

            self.ledger
                .update_by_reference(
                    &intent.id,
                    TransactionPatch {
                        status: Some(TransactionStatus::Succeeded.to_string()),
                        paid_amount: Some(paid_amount),
                        paid_currency: Some(confirmed.currency.clone()),
                        raw_status: Some(confirmed.status.clone()),
                    },
                )
                .await?;

            self.events
                .send(Event::PaymentSucceeded {
                    reference_number: intent.id.clone(),
                })
                .await;
            info!(order_id = %order_id, "plan payment confirmed synchronously");
        }

        Ok(PlanPaymentResponse {
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
            status: confirmed.status,
            order_id,
        })
    }

    /// Applies a verified webhook event to the ledger. Events that do not
    /// correspond to a known reference number are no-ops; unrecognized
    /// event types are acknowledged without action.
    #[instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub async fn apply_webhook_event(&self, event: &WebhookEvent) -> Result<(), ServiceError> {
        let Some(reference) = event.object_id() else {
            warn!("webhook event without object id ignored");
            return Ok(());
        };
        let raw_status = event.object_status().map(str::to_string);

        match event.event_type.as_str() {
            "payment_intent.succeeded" => {
                let paid_amount = event
                    .object_amount()
                    .map(|minor| Decimal::from(minor) / Decimal::from(100));
                self.ledger
                    .update_by_reference(
                        reference,
                        TransactionPatch {
                            status: Some(TransactionStatus::Succeeded.to_string()),
                            paid_amount,
                            paid_currency: event.object_currency().map(str::to_string),
                            raw_status,
                        },
                    )
                    .await?;
                self.events
                    .send(Event::PaymentSucceeded {
                        reference_number: reference.to_string(),
                    })
                    .await;
            }
            "payment_intent.payment_failed" => {
                self.ledger
                    .update_by_reference(
                        reference,
                        TransactionPatch {
                            status: Some(TransactionStatus::Failed.to_string()),
                            raw_status,
                            ..Default::default()
                        },
                    )
                    .await?;
                self.events
                    .send(Event::PaymentFailed {
                        reference_number: reference.to_string(),
                    })
                    .await;
            }
            "payment_intent.canceled" => {
                self.ledger
                    .update_by_reference(
                        reference,
                        TransactionPatch {
                            status: Some(TransactionStatus::Canceled.to_string()),
                            raw_status,
                            ..Default::default()
                        },
                    )
                    .await?;
            }
            "payment_intent.requires_action" => {
                self.ledger
                    .update_by_reference(
                        reference,
                        TransactionPatch {
                            status: Some(TransactionStatus::RequiresAction.to_string()),
                            raw_status,
                            ..Default::default()
                        },
                    )
                    .await?;
            }
            "payout.paid" | "payout.failed" => {
                info!(event_type = %event.event_type, "payout event acknowledged");
            }
            other => {
                info!(event_type = %other, "unhandled webhook event type");
            }
        }
        Ok(())
    }

    /// Creates a provider subscription with the supplied card as the
    /// customer default, and records it in the ledger.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create_subscription(
        &self,
        request: SubscriptionRequest,
    ) -> Result<SubscriptionResponse, ServiceError> {
        request.validate()?;

        let customer = self
            .gateway
            .create_customer(
                &format!("{} {}", request.first_name, request.last_name),
                &request.email,
            )
            .await?;

        self.gateway
            .attach_payment_method(&customer.id, &request.payment_method_id)
            .await?;
        self.gateway
            .set_default_payment_method(&customer.id, &request.payment_method_id)
            .await?;

        let mut metadata = BTreeMap::new();
        metadata.insert("occasion".to_string(), request.occasion.clone());
        metadata.insert("description".to_string(), request.description.clone());
        metadata.insert(
            "recipient_name".to_string(),
            request.recipient_name.clone().unwrap_or_default(),
        );
        metadata.insert(
            "delivery_deadline".to_string(),
            request.delivery_deadline.clone(),
        );
        metadata.insert("phone_number".to_string(), request.phone_number.clone());
        metadata.insert("country".to_string(), request.country.clone());

        let subscription = self
            .gateway
            .create_subscription(&customer.id, &request.price_id, metadata)
            .await?;

        self.ledger
            .create(NewTransaction {
                amount: subscription
                    .unit_amount
                    .map(|minor| Decimal::from(minor) / Decimal::from(100)),
                currency: subscription.currency.clone(),
                reference_number: Some(subscription.id.clone()),
                status: Some(subscription.status.clone()),
                tx_type: Some("subscription".to_string()),
                provider: Some(PROVIDER.to_string()),
                ..Default::default()
            })
            .await?;

        Ok(SubscriptionResponse {
            subscription_id: subscription.id,
            status: subscription.status,
            current_period_end: subscription.current_period_end,
        })
    }

    #[instrument(skip(self))]
    pub async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionResponse, ServiceError> {
        let subscription = self.gateway.cancel_subscription(subscription_id).await?;
        Ok(SubscriptionResponse {
            subscription_id: subscription.id,
            status: subscription.status,
            current_period_end: subscription.current_period_end,
        })
    }

    #[instrument(skip(self))]
    pub async fn update_subscription(
        &self,
        subscription_id: &str,
        price_id: &str,
    ) -> Result<SubscriptionResponse, ServiceError> {
        let subscription = self
            .gateway
            .update_subscription(subscription_id, price_id)
            .await?;
        Ok(SubscriptionResponse {
            subscription_id: subscription.id,
            status: subscription.status,
            current_period_end: subscription.current_period_end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::{MockPaymentGateway, Subscription};
    use sea_orm::DatabaseConnection;

    fn service_with(gateway: MockPaymentGateway) -> PaymentService {
        let (events, _rx) = crate::events::channel(4);
        PaymentService::new(
            Arc::new(DatabaseConnection::Disconnected),
            Arc::new(gateway),
            events,
        )
    }

    #[tokio::test]
    async fn cancel_subscription_maps_provider_state() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_cancel_subscription()
            .withf(|id| id == "sub_42")
            .returning(|id| {
                Ok(Subscription {
                    id: id.to_string(),
                    status: "canceled".to_string(),
                    currency: Some("usd".to_string()),
                    current_period_end: None,
                    unit_amount: Some(999),
                })
            });

        let response = service_with(gateway)
            .cancel_subscription("sub_42")
            .await
            .unwrap();
        assert_eq!(response.subscription_id, "sub_42");
        assert_eq!(response.status, "canceled");
    }

    #[tokio::test]
    async fn update_subscription_propagates_provider_failures() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_update_subscription().returning(|_, _| {
            Err(ServiceError::PaymentFailed(
                "subscription has no items to update".to_string(),
            ))
        });

        let err = service_with(gateway)
            .update_subscription("sub_42", "price_x")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PaymentFailed(_)));
    }
}
