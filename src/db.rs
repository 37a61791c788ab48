pub mod filter;

use crate::config::AppConfig;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema,
};
use std::time::Duration;
use tracing::info;

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Establishes a connection pool using pool sizing from the app config.
pub async fn establish_connection(cfg: &AppConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(cfg.database_url.clone());
    options
        .max_connections(cfg.db_max_connections)
        .min_connections(cfg.db_min_connections)
        .connect_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    info!("database connection established");
    Ok(db)
}

/// Verifies the connection is alive.
pub async fn ping(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.ping().await
}

/// Creates any missing tables from the entity definitions. Used when
/// `auto_migrate` is enabled (development and test databases).
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    use crate::entities::*;

    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    macro_rules! create {
        ($($entity:expr),+ $(,)?) => {
            $(
                let mut stmt = schema.create_table_from_entity($entity);
                db.execute(backend.build(stmt.if_not_exists())).await?;
            )+
        };
    }

    create!(
        user::Entity,
        user_document::Entity,
        category::Entity,
        product::Entity,
        review::Entity,
        cart::Entity,
        checkout::Entity,
        checkout_item::Entity,
        coupon::Entity,
        temp_redeem::Entity,
        order::Entity,
        order_return::Entity,
        order_return_item::Entity,
        payment_transaction::Entity,
        traffic_source::Entity,
        video::Entity,
        setting::Entity,
        report::Entity,
    );

    info!("schema ensured");
    Ok(())
}
