pub mod analytics;
pub mod categories;
pub mod checkout;
pub mod clients;
pub mod common;
pub mod dashboard;
pub mod health;
pub mod media;
pub mod orders;
pub mod payments;
pub mod payroll;
pub mod reports;
pub mod returns;
pub mod settings;
pub mod staff;
pub mod traffic;
pub mod verification;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::events::EventSender;
use crate::payments::PaymentGateway;
use crate::services::{
    analytics::AnalyticsService, categories::CategoryService, checkout::CheckoutService,
    clients::ClientListService, dashboard::DashboardService, media::MediaService,
    orders::OrderListService, payment_history::PaymentHistoryService, payments::PaymentService,
    payroll::PayrollService, pricing::PricingService, reports::ReportService,
    returns::ReturnService, settings::SettingsService, staff::StaffService,
    traffic::TrafficSourceService, verification::VerificationService,
};
use crate::storage::ObjectStorage;
use crate::AppState;

/// Service container handed to every handler through `AppState`.
#[derive(Clone)]
pub struct AppServices {
    pub analytics: AnalyticsService,
    pub categories: CategoryService,
    pub checkout: CheckoutService,
    pub clients: ClientListService,
    pub dashboard: DashboardService,
    pub media: MediaService,
    pub orders: OrderListService,
    pub payment_history: PaymentHistoryService,
    pub payments: PaymentService,
    pub payroll: PayrollService,
    pub pricing: PricingService,
    pub reports: ReportService,
    pub returns: ReturnService,
    pub settings: SettingsService,
    pub staff: StaffService,
    pub traffic: TrafficSourceService,
    pub verification: VerificationService,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn PaymentGateway>,
        storage: Arc<dyn ObjectStorage>,
        events: EventSender,
    ) -> Self {
        Self {
            analytics: AnalyticsService::new(db.clone()),
            categories: CategoryService::new(db.clone()),
            checkout: CheckoutService::new(db.clone(), gateway.clone(), events.clone()),
            clients: ClientListService::new(db.clone()),
            dashboard: DashboardService::new(db.clone(), storage.clone()),
            media: MediaService::new(db.clone(), storage.clone()),
            orders: OrderListService::new(db.clone()),
            payment_history: PaymentHistoryService::new(db.clone()),
            payments: PaymentService::new(db.clone(), gateway, events.clone()),
            payroll: PayrollService::new(db.clone()),
            pricing: PricingService::new(db.clone()),
            reports: ReportService::new(db.clone(), events.clone()),
            returns: ReturnService::new(db.clone(), events.clone()),
            settings: SettingsService::new(db.clone()),
            staff: StaffService::new(db.clone()),
            traffic: TrafficSourceService::new(db.clone()),
            verification: VerificationService::new(db, storage, events),
        }
    }
}

/// Full application router. Middleware layers are applied in `main`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/admin/categories", categories::routes())
        .nest("/admin/orders", orders::routes())
        .nest("/admin/payroll", payroll::routes())
        .nest("/admin/logistics-verification", verification::routes())
        .nest("/admin/returns", returns::routes())
        .nest("/admin/clients", clients::routes())
        .nest("/admin/staff", staff::routes())
        .nest("/admin/payment-history", clients::payment_history_routes())
        .nest("/admin/analytics", analytics::routes())
        .nest("/admin/videos", media::routes())
        .nest("/admin/reports", reports::routes())
        .nest("/dashboard", dashboard::routes())
        .nest("/home", dashboard::home_routes())
        .nest("/payment/stripe", payments::routes())
        .nest("/checkout", checkout::routes())
        .nest("/settings", settings::routes())
        .nest("/traffic-sources", traffic::routes())
        .merge(health::routes())
        .with_state(state)
}
