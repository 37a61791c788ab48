use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{cart, checkout, checkout_item, coupon, product, review, temp_redeem, user};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::payments::{BillingDetails, CardDetails, PaymentGateway};
use crate::services::pricing::{CouponEffect, PricingService};

/// Flat service fee added at the payment step, surfaced on checkout detail.
const CHECKOUT_FEES: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PaymentMethodInput {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 12, max = 19))]
    pub number: String,
    /// `MM/YY`
    #[validate(length(min = 4, max = 5))]
    pub expiry_date: String,
    #[validate(length(min = 3, max = 4))]
    pub cvc: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCheckoutRequest {
    pub phone_number: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    #[validate]
    pub payment_methods: Option<PaymentMethodInput>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutItemView {
    pub product_id: Uuid,
    pub product_name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct RedeemedCouponView {
    pub redeem_id: Uuid,
    pub coupon_id: Uuid,
    pub code: String,
    pub name: Option<String>,
    pub amount: Decimal,
    pub amount_type: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutDetail {
    pub currency: String,
    pub checkout: checkout::Model,
    pub items: Vec<CheckoutItemView>,
    pub coupons: Vec<RedeemedCouponView>,
    pub average_rating: Option<f64>,
    pub fees: Decimal,
}

/// Checkout lifecycle: cart snapshot, contact updates, payment-method
/// registration and coupon application.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    gateway: Arc<dyn PaymentGateway>,
    pricing: PricingService,
    events: EventSender,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn PaymentGateway>,
        events: EventSender,
    ) -> Self {
        let pricing = PricingService::new(db.clone());
        Self {
            db,
            gateway,
            pricing,
            events,
        }
    }

    /// Creates a checkout for the user and copies their cart into
    /// checkout items, capturing each product's price at copy time. The
    /// snapshot is transactional: either the checkout and all its lines
    /// exist, or nothing does.
    #[instrument(skip(self))]
    pub async fn create(&self, user_id: Uuid) -> Result<checkout::Model, ServiceError> {
        let owner = user::Entity::find_by_id(user_id).one(&*self.db).await?;
        if owner.is_none() {
            return Err(ServiceError::NotFound("User not found".to_string()));
        }

        let txn = self.db.begin().await?;
        let now = Utc::now();

        let created = checkout::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(Some(user_id)),
            email: Set(None),
            phone_number: Set(None),
            address1: Set(None),
            address2: Set(None),
            city: Set(None),
            state: Set(None),
            zip_code: Set(None),
            country: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let cart_lines = cart::Entity::find()
            .filter(cart::Column::UserId.eq(user_id))
            .find_also_related(product::Entity)
            .all(&txn)
            .await?;

        for (line, product) in cart_lines {
            let product = product.ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", line.product_id))
            })?;
            checkout_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                checkout_id: Set(created.id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                price: Set(product.price),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        self.events.send(Event::CheckoutCreated(created.id)).await;
        info!(checkout_id = %created.id, "checkout created");
        Ok(created)
    }

    /// Patches checkout contact fields and, when card details are
    /// supplied, registers the card with the payment provider as the
    /// user's default payment method.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        checkout_id: Uuid,
        user_id: Uuid,
        request: UpdateCheckoutRequest,
    ) -> Result<(), ServiceError> {
        request.validate()?;

        let existing = checkout::Entity::find_by_id(checkout_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Checkout not found".to_string()))?;

        let mut update: checkout::ActiveModel = existing.into();
        if let Some(phone_number) = request.phone_number {
            update.phone_number = Set(Some(phone_number));
        }
        if let Some(address1) = request.address1 {
            update.address1 = Set(Some(address1));
        }
        if let Some(address2) = request.address2 {
            update.address2 = Set(Some(address2));
        }
        if let Some(city) = &request.city {
            update.city = Set(Some(city.clone()));
        }
        if let Some(state) = &request.state {
            update.state = Set(Some(state.clone()));
        }
        if let Some(zip_code) = &request.zip_code {
            update.zip_code = Set(Some(zip_code.clone()));
        }
        if let Some(country) = &request.country {
            update.country = Set(Some(country.clone()));
        }
        update.updated_at = Set(Some(Utc::now()));
        let updated = update.update(&*self.db).await?;

        if let Some(card) = request.payment_methods {
            let (exp_month, exp_year) = parse_expiry(&card.expiry_date)?;

            let method = self
                .gateway
                .create_payment_method(
                    CardDetails {
                        number: card.number,
                        exp_month,
                        exp_year,
                        cvc: card.cvc,
                    },
                    BillingDetails {
                        name: Some(card.name),
                        city: updated.city.clone(),
                        country: updated.country.clone(),
                        line1: updated.address1.clone(),
                        line2: updated.address2.clone(),
                        postal_code: updated.zip_code.clone(),
                        state: updated.state.clone(),
                    },
                )
                .await?;

            let owner = user::Entity::find_by_id(user_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;
            let billing_id = owner.billing_id.ok_or_else(|| {
                ServiceError::InvalidOperation("User has no billing profile".to_string())
            })?;

            self.gateway
                .attach_payment_method(&billing_id, &method.id)
                .await?;
            self.gateway
                .set_default_payment_method(&billing_id, &method.id)
                .await?;
        }

        Ok(())
    }

    /// Checkout detail: snapshot lines with product info, redeemed
    /// coupons, and the average rating over the first product's reviews.
    #[instrument(skip(self))]
    pub async fn find_one(&self, checkout_id: Uuid) -> Result<CheckoutDetail, ServiceError> {
        let checkout_row = checkout::Entity::find_by_id(checkout_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Checkout not found".to_string()))?;

        let lines = checkout_row
            .find_related(checkout_item::Entity)
            .find_also_related(product::Entity)
            .all(&*self.db)
            .await?;

        let items: Vec<CheckoutItemView> = lines
            .iter()
            .filter_map(|(line, product)| {
                product.as_ref().map(|p| CheckoutItemView {
                    product_id: p.id,
                    product_name: p.name.clone(),
                    description: p.description.clone(),
                    price: line.price,
                    quantity: line.quantity,
                })
            })
            .collect();

        let redeems = temp_redeem::Entity::find()
            .filter(temp_redeem::Column::CheckoutId.eq(checkout_id))
            .find_also_related(coupon::Entity)
            .all(&*self.db)
            .await?;
        let coupons = redeems
            .into_iter()
            .filter_map(|(redeem, coupon)| {
                coupon.map(|c| RedeemedCouponView {
                    redeem_id: redeem.id,
                    coupon_id: c.id,
                    code: c.code,
                    name: c.name,
                    amount: c.amount,
                    amount_type: c.amount_type,
                })
            })
            .collect();

        let average_rating = match items.first() {
            Some(first) => {
                let ratings = review::Entity::find()
                    .filter(review::Column::ProductId.eq(first.product_id))
                    .all(&*self.db)
                    .await?;
                if ratings.is_empty() {
                    None
                } else {
                    let total: i64 = ratings.iter().map(|r| i64::from(r.rating_value)).sum();
                    Some(total as f64 / ratings.len() as f64)
                }
            }
            None => None,
        };

        Ok(CheckoutDetail {
            currency: "USD".to_string(),
            checkout: checkout_row,
            items,
            coupons,
            average_rating,
            fees: CHECKOUT_FEES,
        })
    }

    /// Redeems a coupon code against the checkout and returns the updated
    /// coupon effects.
    #[instrument(skip(self))]
    pub async fn apply_coupon(
        &self,
        user_id: Uuid,
        checkout_id: Uuid,
        code: &str,
    ) -> Result<Vec<CouponEffect>, ServiceError> {
        self.require_checkout_with_items(checkout_id).await?;

        let coupon_row = coupon::Entity::find()
            .filter(coupon::Column::Code.eq(code))
            .filter(coupon::Column::Method.eq("code"))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Coupon not found".to_string()))?;

        let already = temp_redeem::Entity::find()
            .filter(temp_redeem::Column::CheckoutId.eq(checkout_id))
            .filter(temp_redeem::Column::CouponId.eq(coupon_row.id))
            .one(&*self.db)
            .await?;
        if already.is_some() {
            return Err(ServiceError::InvalidOperation(
                "Coupon already applied".to_string(),
            ));
        }

        temp_redeem::ActiveModel {
            id: Set(Uuid::new_v4()),
            checkout_id: Set(checkout_id),
            user_id: Set(user_id),
            coupon_id: Set(coupon_row.id),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        self.events
            .send(Event::CouponApplied {
                checkout_id,
                coupon_code: coupon_row.code.clone(),
            })
            .await;

        self.pricing.coupons(checkout_id).await
    }

    /// Removes an applied coupon and returns the remaining effects.
    #[instrument(skip(self))]
    pub async fn remove_coupon(
        &self,
        user_id: Uuid,
        checkout_id: Uuid,
        coupon_id: Uuid,
    ) -> Result<Vec<CouponEffect>, ServiceError> {
        self.require_checkout_with_items(checkout_id).await?;

        let redeem = temp_redeem::Entity::find()
            .filter(temp_redeem::Column::CheckoutId.eq(checkout_id))
            .filter(temp_redeem::Column::CouponId.eq(coupon_id))
            .filter(temp_redeem::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Coupon not applied".to_string()))?;

        redeem.delete(&*self.db).await?;
        self.pricing.coupons(checkout_id).await
    }

    async fn require_checkout_with_items(&self, checkout_id: Uuid) -> Result<(), ServiceError> {
        let checkout_row = checkout::Entity::find_by_id(checkout_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Checkout not found".to_string()))?;

        let has_items = checkout_row
            .find_related(checkout_item::Entity)
            .one(&*self.db)
            .await?
            .is_some();
        if !has_items {
            return Err(ServiceError::InvalidOperation(
                "Checkout items not found".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_expiry(expiry: &str) -> Result<(u32, u32), ServiceError> {
    let (month, year) = expiry
        .split_once('/')
        .ok_or_else(|| ServiceError::ValidationError("Expiry must be MM/YY".to_string()))?;
    let month: u32 = month
        .trim()
        .parse()
        .map_err(|_| ServiceError::ValidationError("Invalid expiry month".to_string()))?;
    let year: u32 = year
        .trim()
        .parse()
        .map_err(|_| ServiceError::ValidationError("Invalid expiry year".to_string()))?;
    if !(1..=12).contains(&month) {
        return Err(ServiceError::ValidationError(
            "Invalid expiry month".to_string(),
        ));
    }
    Ok((month, year))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_parses_month_and_year() {
        assert_eq!(parse_expiry("09/27").unwrap(), (9, 27));
        assert_eq!(parse_expiry("12/30").unwrap(), (12, 30));
    }

    #[test]
    fn expiry_rejects_bad_input() {
        assert!(parse_expiry("0927").is_err());
        assert!(parse_expiry("13/27").is_err());
        assert!(parse_expiry("ab/cd").is_err());
    }
}
