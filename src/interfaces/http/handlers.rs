use super::error::ApiError;
use crate::application::status::TaskOutcome;
use crate::application::worker::SharedContext;
use crate::domain::transaction::PaymentTransaction;
use crate::domain::worker::WorkerIdentity;
use crate::error::ServiceError;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub worker_id: WorkerIdentity,
    pub service_id: String,
    pub port: u16,
    pub pool: &'static str,
    pub registration: TaskOutcome,
    pub discovery: TaskOutcome,
    pub connectivity: TaskOutcome,
}

/// Liveness only: answers `OK` whatever the state of the pool or registry.
pub async fn health() -> &'static str {
    "OK"
}

pub async fn welcome(State(ctx): State<SharedContext>) -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: format!("Welcome to the {} API!", ctx.spec.service_name),
    })
}

pub async fn status(State(ctx): State<SharedContext>) -> Json<StatusResponse> {
    let report = ctx.status.snapshot().await;
    Json(StatusResponse {
        worker_id: ctx.spec.identity,
        service_id: ctx.spec.service_id(),
        port: ctx.spec.port(),
        pool: ctx.pool.state().label(),
        registration: report.registration,
        discovery: report.discovery,
        connectivity: report.connectivity,
    })
}

/// Inserts one transaction; waits for the pool if it is still being built.
pub async fn create_transaction(
    State(ctx): State<SharedContext>,
    Json(tx): Json<PaymentTransaction>,
) -> Result<(StatusCode, Json<PaymentTransaction>), ApiError> {
    tx.validate()?;
    let pool = ctx.pool.ready().await?;
    match pool.insert_transaction(&tx).await {
        Ok(created) => Ok((StatusCode::CREATED, Json(created))),
        Err(ServiceError::QueryExecution(reason)) => {
            error!(order_id = tx.order_id, %reason, "transaction insert failed");
            Err(ApiError::internal("Error creating new transaction"))
        }
        Err(other) => Err(other.into()),
    }
}
