use {
    super::error::ReconcileError,
    super::id::PspReference,
    super::money::Money,
    std::{future::Future, pin::Pin},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What the processor needs to alter an existing payment.
#[derive(Debug, Clone)]
pub struct ModificationRequest {
    pub merchant_account: String,
    /// Reference of the payment being modified.
    pub payment_psp_reference: PspReference,
    pub amount: Money,
    /// Our own reference for the modification (order number, refund id).
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModificationStatus {
    /// The processor queued the request; the outcome arrives by webhook.
    Received,
    Other(String),
}

impl ModificationStatus {
    pub fn parse(status: &str) -> Self {
        if status.eq_ignore_ascii_case("received") {
            Self::Received
        } else {
            Self::Other(status.to_string())
        }
    }
}

/// What the service layer gets back after sending a modification.
#[derive(Debug, Clone)]
pub struct ModificationResponse {
    pub psp_reference: PspReference,
    pub status: ModificationStatus,
}

/// Outbound half of the processor integration. Errors are `Gateway`.
pub trait ProcessorGateway: Send + Sync {
    fn request_capture<'a>(
        &'a self,
        request: &'a ModificationRequest,
    ) -> BoxFuture<'a, Result<ModificationResponse, ReconcileError>>;

    fn request_cancellation<'a>(
        &'a self,
        request: &'a ModificationRequest,
    ) -> BoxFuture<'a, Result<ModificationResponse, ReconcileError>>;

    fn request_refund<'a>(
        &'a self,
        request: &'a ModificationRequest,
    ) -> BoxFuture<'a, Result<ModificationResponse, ReconcileError>>;

    fn request_reversal<'a>(
        &'a self,
        request: &'a ModificationRequest,
    ) -> BoxFuture<'a, Result<ModificationResponse, ReconcileError>>;
}
