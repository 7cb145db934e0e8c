use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("webhook signature: {0}")]
    WebhookSignature(String),

    #[error("configuration: {0}")]
    Configuration(String),

    /// The processor sent something this engine does not react to.
    #[error("unmapped action: {event}")]
    UnmappedAction { event: String },

    #[error("transition `{transition}` not allowed on graph `{graph}` from state `{state}`")]
    Transition {
        graph: &'static str,
        transition: String,
        state: String,
    },

    #[error("processor gateway: {0}")]
    Gateway(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl ReconcileError {
    /// Conditions that are logged and skipped instead of aborting a batch.
    pub fn is_non_fatal(&self) -> bool {
        matches!(self, Self::UnmappedAction { .. })
    }
}
