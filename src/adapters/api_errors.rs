use {
    crate::domain::error::ReconcileError,
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
};

/// HTTP face of [`ReconcileError`].
#[derive(Debug)]
pub struct ApiError(pub ReconcileError);

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self.0 {
            ReconcileError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                msg.clone(),
            ),
            ReconcileError::WebhookSignature(_) => (
                StatusCode::BAD_REQUEST,
                "webhook_error",
                "invalid webhook signature".to_string(),
            ),
            ReconcileError::NotFound(what) => {
                (StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
            }
            ReconcileError::Transition { .. } => {
                (StatusCode::CONFLICT, "transition_refused", self.0.to_string())
            }
            ReconcileError::UnmappedAction { event } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unmapped_action",
                format!("unsupported action: {event}"),
            ),
            ReconcileError::Gateway(msg) => {
                tracing::warn!("processor gateway error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "gateway_error",
                    "payment processor request failed".to_string(),
                )
            }
            ReconcileError::Database(_)
            | ReconcileError::Serialization(_)
            | ReconcileError::Configuration(_)
            | ReconcileError::InvariantViolation(_) => {
                tracing::error!(error = %self.0, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error_code": error_code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
