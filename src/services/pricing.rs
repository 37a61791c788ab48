//! Checkout pricing: subtotal, redeemed coupons and payable total.

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::entities::{checkout, checkout_item, coupon, temp_redeem};
use crate::errors::ServiceError;

pub const PERCENTAGE: &str = "percentage";
pub const FLAT: &str = "flat";

/// A coupon's contribution as surfaced to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CouponEffect {
    pub amount: Decimal,
    pub amount_type: String,
}

/// Sum of line price × quantity. An empty cart prices to zero rather than
/// failing.
pub fn subtotal_of(lines: &[(Decimal, i32)]) -> Decimal {
    lines
        .iter()
        .map(|(price, quantity)| *price * Decimal::from(*quantity))
        .sum()
}

/// Payable total for a subtotal and the coupons redeemed against it.
///
/// With no coupons this is the subtotal. With coupons, each percentage
/// coupon contributes `subtotal × amount / 100` and each flat coupon
/// contributes `amount`, and the result is the SUM OF THE CONTRIBUTIONS —
/// not subtotal minus contributions. Callers and tests rely on this exact
/// behavior; do not "fix" it here without migrating them.
pub fn total_of(subtotal: Decimal, coupons: &[CouponEffect]) -> Decimal {
    if coupons.is_empty() {
        return subtotal;
    }
    coupons
        .iter()
        .map(|c| {
            if c.amount_type == PERCENTAGE {
                subtotal * c.amount / Decimal::from(100)
            } else {
                c.amount
            }
        })
        .sum()
}

#[derive(Clone)]
pub struct PricingService {
    db: Arc<DatabaseConnection>,
}

impl PricingService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn subtotal(&self, checkout_id: uuid::Uuid) -> Result<Decimal, ServiceError> {
        let checkout = self.load_checkout(checkout_id).await?;
        let lines = checkout
            .find_related(checkout_item::Entity)
            .all(&*self.db)
            .await?;
        Ok(subtotal_of(
            &lines
                .iter()
                .map(|line| (line.price, line.quantity))
                .collect::<Vec<_>>(),
        ))
    }

    /// Coupons redeemed by the checkout's owning user through the `code`
    /// method. A checkout without a user has no coupons.
    #[instrument(skip(self))]
    pub async fn coupons(&self, checkout_id: uuid::Uuid) -> Result<Vec<CouponEffect>, ServiceError> {
        let checkout = self.load_checkout(checkout_id).await?;
        if checkout.user_id.is_none() {
            return Ok(Vec::new());
        }

        let redeems = temp_redeem::Entity::find()
            .filter(temp_redeem::Column::CheckoutId.eq(checkout_id))
            .find_also_related(coupon::Entity)
            .all(&*self.db)
            .await?;

        Ok(redeems
            .into_iter()
            .filter_map(|(_, coupon)| coupon)
            .filter(|coupon| coupon.method == "code")
            .map(|coupon| CouponEffect {
                amount: coupon.amount,
                amount_type: coupon.amount_type,
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn total(&self, checkout_id: uuid::Uuid) -> Result<Decimal, ServiceError> {
        let coupons = self.coupons(checkout_id).await?;
        let subtotal = self.subtotal(checkout_id).await?;
        Ok(total_of(subtotal, &coupons))
    }

    async fn load_checkout(
        &self,
        checkout_id: uuid::Uuid,
    ) -> Result<checkout::Model, ServiceError> {
        checkout::Entity::find_by_id(checkout_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Checkout not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn flat(amount: Decimal) -> CouponEffect {
        CouponEffect {
            amount,
            amount_type: FLAT.to_string(),
        }
    }

    fn percentage(amount: Decimal) -> CouponEffect {
        CouponEffect {
            amount,
            amount_type: PERCENTAGE.to_string(),
        }
    }

    #[test]
    fn empty_cart_prices_to_zero() {
        assert_eq!(subtotal_of(&[]), Decimal::ZERO);
    }

    #[test]
    fn subtotal_sums_price_times_quantity() {
        // $10 × 2 + $5 × 1 = $25
        let lines = [(dec!(10), 2), (dec!(5), 1)];
        assert_eq!(subtotal_of(&lines), dec!(25));
    }

    #[test]
    fn no_coupons_total_is_subtotal() {
        assert_eq!(total_of(dec!(25), &[]), dec!(25));
    }

    #[test]
    fn flat_coupon_total_is_the_discount_amount() {
        // Documented literal behavior: the total is the coupon sum, not
        // subtotal minus the coupon.
        assert_eq!(total_of(dec!(25), &[flat(dec!(5))]), dec!(5));
    }

    #[test]
    fn percentage_coupon_total_is_the_discount_amount() {
        assert_eq!(total_of(dec!(200), &[percentage(dec!(10))]), dec!(20));
    }

    #[test]
    fn mixed_coupons_are_additive_contributions() {
        let coupons = [percentage(dec!(10)), flat(dec!(3))];
        assert_eq!(total_of(dec!(100), &coupons), dec!(13));
    }

    proptest! {
        #[test]
        fn total_equals_subtotal_without_coupons(cents in 0u64..10_000_000) {
            let subtotal = Decimal::from(cents) / Decimal::from(100);
            prop_assert_eq!(total_of(subtotal, &[]), subtotal);
        }

        #[test]
        fn single_percentage_coupon_matches_formula(
            cents in 0u64..10_000_000,
            pct in 0u32..=100,
        ) {
            let subtotal = Decimal::from(cents) / Decimal::from(100);
            let coupons = [percentage(Decimal::from(pct))];
            prop_assert_eq!(
                total_of(subtotal, &coupons),
                subtotal * Decimal::from(pct) / Decimal::from(100)
            );
        }
    }
}
