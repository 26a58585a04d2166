//! HTTP surface of a worker.
//!
//! - `GET /health` fixed `OK`, used by the registry's health check
//! - `GET /` welcome message
//! - `GET /status` worker identity, pool state and startup task outcomes
//! - `POST /api/<service>/transactions` creates a payment transaction

pub mod error;
pub mod handlers;

use crate::application::worker::SharedContext;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub fn build_router(ctx: SharedContext) -> Router {
    let api_routes = Router::new().route("/transactions", post(handlers::create_transaction));
    let api_prefix = format!("/api/{}", ctx.spec.service_name);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::welcome))
        .route("/status", get(handlers::status))
        .nest(&api_prefix, api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pool::ConnectionPoolManager;
    use crate::application::status::{TaskOutcome, WorkerStatus};
    use crate::application::worker::WorkerContext;
    use crate::domain::config::PoolConfig;
    use crate::domain::worker::{WorkerIdentity, WorkerSpec};
    use crate::infrastructure::in_memory::{InMemoryConnector, InMemoryDatabase};
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn context(database: InMemoryDatabase) -> SharedContext {
        let spec = WorkerSpec::new(WorkerIdentity::new(1).unwrap(), 3033, "Payment").unwrap();
        let config = PoolConfig {
            user: "p".into(),
            host: "db".into(),
            database: "pay".into(),
            password: "x".into(),
            port: 5432,
        };
        Arc::new(WorkerContext {
            spec,
            pool: ConnectionPoolManager::initialize(
                config,
                Arc::new(InMemoryConnector::new(database)),
            ),
            status: WorkerStatus::new(),
        })
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn transaction_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/Payment/transactions")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn valid_body() -> serde_json::Value {
        serde_json::json!({
            "order_id": 42,
            "payment_status": "paid",
            "payment_gateway": "stripe",
            "amount": "19.99",
            "payment_date": "2026-01-02T03:04:05Z",
            "transfer_id": "tr_1"
        })
    }

    #[tokio::test]
    async fn test_health_is_fixed_ok() {
        let database = InMemoryDatabase::new();
        database.set_failing(true);
        let app = build_router(context(database));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_welcome() {
        let app = build_router(context(InMemoryDatabase::new()));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Welcome to the Payment API!");
    }

    #[tokio::test]
    async fn test_status_reports_worker() {
        let ctx = context(InMemoryDatabase::new());
        ctx.pool.ready().await.unwrap();
        ctx.status
            .set_registration(TaskOutcome::Failed("registry is offline".into()))
            .await;
        let app = build_router(ctx);

        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let json = body_json(response).await;
        assert_eq!(json["worker_id"], 1);
        assert_eq!(json["service_id"], "Payment-1");
        assert_eq!(json["port"], 3034);
        assert_eq!(json["pool"], "ready");
        assert_eq!(json["registration"]["state"], "failed");
        assert_eq!(json["connectivity"]["state"], "pending");
    }

    #[tokio::test]
    async fn test_create_transaction() {
        let database = InMemoryDatabase::new();
        let app = build_router(context(database.clone()));

        let response = app.oneshot(transaction_request(valid_body())).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["order_id"], 42);
        assert_eq!(json["transfer_id"], "tr_1");
        assert_eq!(database.transactions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_create_transaction_rejects_invalid_amount() {
        let database = InMemoryDatabase::new();
        let app = build_router(context(database.clone()));
        let mut body = valid_body();
        body["amount"] = serde_json::json!("-5");

        let response = app.oneshot(transaction_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(database.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_transaction_query_failure_is_generic() {
        let database = InMemoryDatabase::new();
        database.set_failing(true);
        let app = build_router(context(database));

        let response = app.oneshot(transaction_request(valid_body())).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Error creating new transaction");
    }
}
