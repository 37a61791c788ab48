//! Checkout pricing against a seeded database: the cart snapshot, coupon
//! effects and the documented literal total.

mod common;

use common::TestApp;
use rust_decimal_macros::dec;

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn two_line_cart_subtotals_to_twenty_five() {
    let app = TestApp::new().await;
    let customer = app.seed_user("user").await;
    let gadget = app.seed_product("gadget", dec!(10)).await;
    let widget = app.seed_product("widget", dec!(5)).await;
    app.seed_cart_line(customer.id, gadget.id, 2).await;
    app.seed_cart_line(customer.id, widget.id, 1).await;

    let checkout = app.checkout_for(customer.id).await;
    let subtotal = app
        .state
        .services
        .pricing
        .subtotal(checkout.id)
        .await
        .unwrap();
    assert_eq!(subtotal, dec!(25));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn flat_coupon_reports_its_effect_and_the_literal_total() {
    let app = TestApp::new().await;
    let customer = app.seed_user("user").await;
    let gadget = app.seed_product("gadget", dec!(10)).await;
    let widget = app.seed_product("widget", dec!(5)).await;
    app.seed_cart_line(customer.id, gadget.id, 2).await;
    app.seed_cart_line(customer.id, widget.id, 1).await;
    app.seed_coupon("FIVEOFF", dec!(5), "flat").await;

    let checkout = app.checkout_for(customer.id).await;
    let effects = app
        .state
        .services
        .checkout
        .apply_coupon(customer.id, checkout.id, "FIVEOFF")
        .await
        .unwrap();

    assert_eq!(effects.len(), 1);
    assert_eq!(effects[0].amount, dec!(5));
    assert_eq!(effects[0].amount_type, "flat");

    // The payable total is the coupon sum, not subtotal minus coupons.
    let total = app
        .state
        .services
        .pricing
        .total(checkout.id)
        .await
        .unwrap();
    assert_eq!(total, dec!(5));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn total_without_coupons_equals_subtotal() {
    let app = TestApp::new().await;
    let customer = app.seed_user("user").await;
    let gadget = app.seed_product("gadget", dec!(19.99)).await;
    app.seed_cart_line(customer.id, gadget.id, 3).await;

    let checkout = app.checkout_for(customer.id).await;
    let pricing = &app.state.services.pricing;
    assert_eq!(
        pricing.total(checkout.id).await.unwrap(),
        pricing.subtotal(checkout.id).await.unwrap()
    );
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn removing_a_coupon_restores_the_subtotal_total() {
    let app = TestApp::new().await;
    let customer = app.seed_user("user").await;
    let gadget = app.seed_product("gadget", dec!(10)).await;
    app.seed_cart_line(customer.id, gadget.id, 1).await;
    let coupon = app.seed_coupon("TENPCT", dec!(10), "percentage").await;

    let checkout = app.checkout_for(customer.id).await;
    app.state
        .services
        .checkout
        .apply_coupon(customer.id, checkout.id, "TENPCT")
        .await
        .unwrap();

    let effects = app
        .state
        .services
        .checkout
        .remove_coupon(customer.id, checkout.id, coupon.id)
        .await
        .unwrap();
    assert!(effects.is_empty());

    let pricing = &app.state.services.pricing;
    assert_eq!(pricing.total(checkout.id).await.unwrap(), dec!(10));
}
