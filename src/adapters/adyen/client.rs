use {
    crate::domain::{
        error::ReconcileError,
        id::PspReference,
        money::Currency,
        provider::{
            BoxFuture, ModificationRequest, ModificationResponse, ModificationStatus,
            ProcessorGateway,
        },
    },
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

pub const DEFAULT_BASE_URL: &str = "https://checkout-test.adyen.com/v71";

/// Checkout API client for payment modifications.
pub struct AdyenClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModificationBody<'a> {
    merchant_account: &'a str,
    reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<AmountBody>,
}

#[derive(Debug, Serialize)]
struct AmountBody {
    value: i64,
    currency: Currency,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModificationReply {
    psp_reference: String,
    status: String,
}

#[derive(Debug, Clone, Copy)]
enum Modification {
    Capture,
    Cancel,
    Refund,
    Reversal,
}

impl Modification {
    fn path(self) -> &'static str {
        match self {
            Self::Capture => "captures",
            Self::Cancel => "cancels",
            Self::Refund => "refunds",
            Self::Reversal => "reversals",
        }
    }

    fn carries_amount(self) -> bool {
        matches!(self, Self::Capture | Self::Refund)
    }
}

impl AdyenClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ReconcileError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ReconcileError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    async fn modify(
        &self,
        kind: Modification,
        request: &ModificationRequest,
    ) -> Result<ModificationResponse, ReconcileError> {
        let url = format!(
            "{}/payments/{}/{}",
            self.base_url,
            request.payment_psp_reference,
            kind.path()
        );
        let body = ModificationBody {
            merchant_account: &request.merchant_account,
            reference: &request.reference,
            amount: kind.carries_amount().then(|| AmountBody {
                value: request.amount.amount().minor(),
                currency: request.amount.currency(),
            }),
        };

        let response = self
            .http
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .header(
                "Idempotency-Key",
                format!("{}-{}-{}", kind.path(), request.payment_psp_reference, request.reference),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| ReconcileError::Gateway(format!("{} request failed: {e}", kind.path())))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ReconcileError::Gateway(format!(
                "{} rejected with HTTP {status}: {text}",
                kind.path()
            )));
        }
        let reply: ModificationReply = response
            .json()
            .await
            .map_err(|e| ReconcileError::Gateway(format!("invalid {} response: {e}", kind.path())))?;

        tracing::info!(
            modification = kind.path(),
            payment_psp_reference = %request.payment_psp_reference,
            psp_reference = %reply.psp_reference,
            status = %reply.status,
            "modification sent"
        );
        Ok(ModificationResponse {
            psp_reference: PspReference::new(reply.psp_reference)
                .map_err(|e| ReconcileError::Gateway(e.to_string()))?,
            status: ModificationStatus::parse(&reply.status),
        })
    }
}

impl ProcessorGateway for AdyenClient {
    fn request_capture<'a>(
        &'a self,
        request: &'a ModificationRequest,
    ) -> BoxFuture<'a, Result<ModificationResponse, ReconcileError>> {
        Box::pin(self.modify(Modification::Capture, request))
    }

    fn request_cancellation<'a>(
        &'a self,
        request: &'a ModificationRequest,
    ) -> BoxFuture<'a, Result<ModificationResponse, ReconcileError>> {
        Box::pin(self.modify(Modification::Cancel, request))
    }

    fn request_refund<'a>(
        &'a self,
        request: &'a ModificationRequest,
    ) -> BoxFuture<'a, Result<ModificationResponse, ReconcileError>> {
        Box::pin(self.modify(Modification::Refund, request))
    }

    fn request_reversal<'a>(
        &'a self,
        request: &'a ModificationRequest,
    ) -> BoxFuture<'a, Result<ModificationResponse, ReconcileError>> {
        Box::pin(self.modify(Modification::Reversal, request))
    }
}
