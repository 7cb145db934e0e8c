use {
    super::error::ReconcileError,
    super::id::PspReference,
    super::money::Money,
    serde::Serialize,
    std::collections::BTreeMap,
};

pub const ADDITIONAL_MODIFICATION_ACTION: &str = "modification.action";
pub const ADDITIONAL_PAYMENT_LINK_ID: &str = "paymentLinkId";
pub const ADDITIONAL_HMAC_SIGNATURE: &str = "hmacSignature";

/// One parsed processor event. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationItem {
    /// Lower-cased: the processor is not consistent about case.
    pub event_code: String,
    pub success: bool,
    pub psp_reference: PspReference,
    pub original_reference: Option<PspReference>,
    pub merchant_reference: String,
    pub amount: Option<Money>,
    pub reason: Option<String>,
    pub additional_data: BTreeMap<String, String>,
}

impl NotificationItem {
    pub fn new(event_code: &str, success: bool, psp_reference: PspReference) -> Self {
        Self {
            event_code: event_code.trim().to_ascii_lowercase(),
            success,
            psp_reference,
            original_reference: None,
            merchant_reference: String::new(),
            amount: None,
            reason: None,
            additional_data: BTreeMap::new(),
        }
    }

    pub fn modification_action(&self) -> Option<&str> {
        self.additional(ADDITIONAL_MODIFICATION_ACTION)
    }

    pub fn payment_link_id(&self) -> Option<&str> {
        self.additional(ADDITIONAL_PAYMENT_LINK_ID)
    }

    fn additional(&self, key: &str) -> Option<&str> {
        self.additional_data
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Reference of the payment this event is about: the original one for
    /// modifications, the item's own otherwise.
    pub fn payment_reference(&self) -> &PspReference {
        self.original_reference.as_ref().unwrap_or(&self.psp_reference)
    }

    /// Snapshot stored in the payment's detail map.
    pub fn to_detail(&self) -> Result<serde_json::Value, ReconcileError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// The processor's immediate answer to a checkout payment submission.
#[derive(Debug, Clone)]
pub struct CheckoutResult {
    pub result_code: String,
    pub psp_reference: PspReference,
    pub refusal_reason: Option<String>,
    pub amount: Option<Money>,
    pub additional_data: BTreeMap<String, String>,
}

impl CheckoutResult {
    /// Re-expresses the synchronous answer as the notification the webhook
    /// would carry, so both paths share one pipeline.
    pub fn to_notification(&self, merchant_reference: &str) -> Result<NotificationItem, ReconcileError> {
        let (event_code, success) = match self.result_code.to_ascii_lowercase().as_str() {
            "authorised" => ("authorisation", true),
            "received" | "pending" => ("received", true),
            "refused" | "error" | "cancelled" => ("authorisation", false),
            other => {
                return Err(ReconcileError::UnmappedAction {
                    event: format!("checkout result {other}"),
                });
            }
        };

        let mut item = NotificationItem::new(event_code, success, self.psp_reference.clone());
        item.merchant_reference = merchant_reference.to_string();
        item.amount = self.amount;
        item.reason = self.refusal_reason.clone();
        item.additional_data = self.additional_data.clone();
        Ok(item)
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self.result_code.to_ascii_lowercase().as_str(),
            "refused" | "error" | "cancelled"
        )
    }
}
