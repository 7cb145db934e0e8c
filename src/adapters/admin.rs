//! Operator endpoints for modifications that start on our side.

use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::{id::MethodCode, money::MoneyAmount},
        services::handlers::CommandOutcome,
    },
    axum::{
        Json,
        extract::{Path, State},
    },
    serde::Deserialize,
    serde_json::Value,
    uuid::Uuid,
};

fn outcome_body(outcome: CommandOutcome) -> Json<Value> {
    Json(serde_json::json!({
        "status": if outcome.is_applied() { "applied" } else { "skipped" },
        "outcome": outcome.label(),
    }))
}

pub async fn capture(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state.reconciler.request_capture(payment_id).await?;
    Ok(outcome_body(outcome))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state.reconciler.request_cancellation(payment_id).await?;
    Ok(outcome_body(outcome))
}

pub async fn reverse(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state.reconciler.reverse(payment_id).await?;
    Ok(outcome_body(outcome))
}

#[derive(Debug, Default, Deserialize)]
pub struct RefundBody {
    /// Minor units; the whole unrefunded remainder when absent.
    #[serde(default)]
    pub amount: Option<i64>,
}

pub async fn refund(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
    Json(body): Json<RefundBody>,
) -> Result<Json<Value>, ApiError> {
    let amount = body.amount.map(MoneyAmount::new).transpose()?;
    let outcome = state.reconciler.request_refund(payment_id, amount).await?;
    Ok(outcome_body(outcome))
}

#[derive(Debug, Deserialize)]
pub struct TakeOverBody {
    pub method_code: String,
}

pub async fn take_over(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<TakeOverBody>,
) -> Result<Json<Value>, ApiError> {
    let method_code = MethodCode::new(body.method_code)?;
    let outcome = state.reconciler.take_over(order_id, method_code).await?;
    Ok(outcome_body(outcome))
}
