use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Marketplace Administration API",
        description = "Checkout and Stripe payment processing, order and payroll management, logistics verification, dashboards and reporting"
    ),
    paths(
        handlers::categories::create_category,
        handlers::categories::list_categories,
        handlers::categories::get_category,
        handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::payroll::list_payroll,
        handlers::payroll::get_payroll_transaction,
        handlers::verification::list_verifications,
        handlers::verification::get_verification,
        handlers::verification::upload_documents,
        handlers::verification::approve_document,
        handlers::verification::reject_document,
        handlers::verification::verify_user,
        handlers::returns::list_new_returns,
        handlers::returns::list_return_history,
        handlers::returns::decide_return,
        handlers::clients::list_clients,
        handlers::clients::list_payment_history,
        handlers::staff::list_staff,
        handlers::staff::add_staff,
        handlers::staff::set_role,
        handlers::analytics::user_signups,
        handlers::analytics::order_categories,
        handlers::media::upload_video,
        handlers::media::list_videos,
        handlers::media::delete_video,
        handlers::reports::create_report,
        handlers::reports::list_reports,
        handlers::reports::get_report,
        handlers::dashboard::admin_overview,
        handlers::dashboard::user_overview,
        handlers::payments::create_plan_payment,
        handlers::payments::create_subscription,
        handlers::payments::cancel_subscription,
        handlers::payments::update_subscription,
        handlers::payments::stripe_webhook,
        handlers::checkout::create_checkout,
        handlers::checkout::update_checkout,
        handlers::checkout::get_checkout,
        handlers::checkout::get_checkout_total,
        handlers::checkout::apply_coupon,
        handlers::checkout::remove_coupon,
        handlers::settings::get_notification_settings,
        handlers::settings::update_notification_settings,
        handlers::traffic::record_visit,
        handlers::traffic::list_sources,
        handlers::health::health,
    ),
    components(schemas(crate::errors::ErrorResponse)),
    modifiers(&BearerAuth),
    tags(
        (name = "Categories"),
        (name = "Orders"),
        (name = "Payroll"),
        (name = "Logistics"),
        (name = "Returns"),
        (name = "Clients"),
        (name = "Staff"),
        (name = "Analytics"),
        (name = "Media"),
        (name = "Reports"),
        (name = "Dashboard"),
        (name = "Payments"),
        (name = "Checkout"),
        (name = "Settings"),
        (name = "Traffic"),
        (name = "Health"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_builds() {
        let doc = ApiDoc::openapi();
        assert!(!doc.paths.paths.is_empty());
    }
}
