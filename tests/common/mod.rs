//! Test harness: application state backed by an in-memory SQLite
//! database and a fake payment gateway.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use marketplace_api::{
    auth::Claims,
    config::AppConfig,
    db,
    entities::{cart, checkout, coupon, product, user},
    errors::ServiceError,
    events,
    handlers::{self, AppServices},
    payments::{
        BillingDetails, CardDetails, CreateIntentRequest, Customer, PaymentGateway, PaymentIntent,
        PaymentMethod, Subscription,
    },
    storage::FsObjectStorage,
    AppState,
};

/// Payment gateway double: deterministic ids, always-succeeding
/// confirmation.
pub struct FakeGateway {
    counter: AtomicUsize,
    pub confirm_status: String,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
            confirm_status: "succeeded".to_string(),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{prefix}_{n:04}")
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_customer(&self, _name: &str, email: &str) -> Result<Customer, ServiceError> {
        Ok(Customer {
            id: self.next_id("cus"),
            email: Some(email.to_string()),
        })
    }

    async fn create_payment_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<PaymentIntent, ServiceError> {
        Ok(PaymentIntent {
            id: self.next_id("pi"),
            client_secret: Some("cs_test".to_string()),
            status: "requires_confirmation".to_string(),
            amount: request.amount,
            currency: request.currency,
        })
    }

    async fn confirm_payment_intent(
        &self,
        intent_id: &str,
        _payment_method_id: &str,
    ) -> Result<PaymentIntent, ServiceError> {
        Ok(PaymentIntent {
            id: intent_id.to_string(),
            client_secret: Some("cs_test".to_string()),
            status: self.confirm_status.clone(),
            amount: 2500,
            currency: "usd".to_string(),
        })
    }

    async fn create_payment_method(
        &self,
        _card: CardDetails,
        _billing: BillingDetails,
    ) -> Result<PaymentMethod, ServiceError> {
        Ok(PaymentMethod {
            id: self.next_id("pm"),
        })
    }

    async fn attach_payment_method(
        &self,
        _customer_id: &str,
        _payment_method_id: &str,
    ) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn set_default_payment_method(
        &self,
        _customer_id: &str,
        _payment_method_id: &str,
    ) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn create_subscription(
        &self,
        _customer_id: &str,
        _price_id: &str,
        _metadata: BTreeMap<String, String>,
    ) -> Result<Subscription, ServiceError> {
        Ok(Subscription {
            id: self.next_id("sub"),
            status: "active".to_string(),
            currency: Some("usd".to_string()),
            current_period_end: Some(Utc::now().timestamp() + 30 * 24 * 3600),
            unit_amount: Some(999),
        })
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, ServiceError> {
        Ok(Subscription {
            id: subscription_id.to_string(),
            status: "canceled".to_string(),
            currency: Some("usd".to_string()),
            current_period_end: None,
            unit_amount: Some(999),
        })
    }

    async fn update_subscription(
        &self,
        subscription_id: &str,
        _price_id: &str,
    ) -> Result<Subscription, ServiceError> {
        Ok(Subscription {
            id: subscription_id.to_string(),
            status: "active".to_string(),
            currency: Some("usd".to_string()),
            current_period_end: None,
            unit_amount: Some(1999),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "test_secret_key_for_testing_purposes_only".to_string(),
            "sk_test_key".to_string(),
        );
        // In-memory SQLite is per connection; keep the pool at one.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection(&cfg)
            .await
            .expect("failed to create test database");
        db::ensure_schema(&pool).await.expect("schema");
        let pool = Arc::new(pool);

        let (event_sender, event_rx) = events::channel(64);
        tokio::spawn(events::process_events(event_rx));

        let gateway: Arc<dyn PaymentGateway> = Arc::new(FakeGateway::new());
        let storage_dir = std::env::temp_dir().join(format!("mp-test-{}", Uuid::new_v4()));
        let mut storage_cfg = cfg.storage.clone();
        storage_cfg.root_dir = storage_dir.to_string_lossy().to_string();
        let storage: Arc<dyn marketplace_api::storage::ObjectStorage> =
            Arc::new(FsObjectStorage::new(&storage_cfg));

        let services = AppServices::new(
            pool.clone(),
            gateway,
            storage.clone(),
            event_sender.clone(),
        );

        let state = AppState {
            db: pool,
            config: cfg,
            event_sender,
            services,
            storage,
        };

        Self {
            router: handlers::router(state.clone()),
            state,
        }
    }

    pub fn token_for(&self, user_id: Uuid, role: &str) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            email: format!("{role}@test.local"),
            role: role.to_string(),
            exp: now + 3600,
            iat: now,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.state.config.jwt_secret.as_bytes()),
        )
        .expect("token")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };
        self.router.clone().oneshot(request).await.expect("response")
    }

    pub async fn seed_user(&self, role: &str) -> user::Model {
        let id = Uuid::new_v4();
        user::ActiveModel {
            id: Set(id),
            name: Set(format!("Test {role}")),
            first_name: Set(Some("Test".to_string())),
            last_name: Set(Some(role.to_string())),
            username: Set(None),
            email: Set(format!("{id}@test.local")),
            phone_number: Set(Some("+15550100".to_string())),
            password_hash: Set("x".to_string()),
            user_type: Set(role.to_string()),
            status: Set(1),
            approved_at: Set(None),
            billing_id: Set(Some("cus_seeded".to_string())),
            avatar: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed user")
    }

    pub async fn seed_product(&self, name: &str, price: Decimal) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(None),
            name: Set(name.to_string()),
            description: Set(None),
            price: Set(price),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product")
    }

    pub async fn seed_cart_line(&self, user_id: Uuid, product_id: Uuid, quantity: i32) {
        cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed cart line");
    }

    pub async fn seed_coupon(&self, code: &str, amount: Decimal, amount_type: &str) -> coupon::Model {
        coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            name: Set(Some(code.to_string())),
            method: Set("code".to_string()),
            amount: Set(amount),
            amount_type: Set(amount_type.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed coupon")
    }

    pub async fn checkout_for(&self, user_id: Uuid) -> checkout::Model {
        self.state
            .services
            .checkout
            .create(user_id)
            .await
            .expect("checkout")
    }
}

pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}
