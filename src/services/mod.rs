pub mod analytics;
pub mod categories;
pub mod checkout;
pub mod clients;
pub mod dashboard;
pub mod media;
pub mod orders;
pub mod payment_history;
pub mod payments;
pub mod payroll;
pub mod pricing;
pub mod reports;
pub mod returns;
pub mod settings;
pub mod staff;
pub mod traffic;
pub mod verification;
