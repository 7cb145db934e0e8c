use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::{
            error::ReconcileError,
            id::{MethodCode, PspReference},
            money::{Currency, Money, MoneyAmount},
            notification::{ADDITIONAL_HMAC_SIGNATURE, NotificationItem},
        },
        services::signature,
    },
    axum::{
        body::Bytes,
        extract::{Path, State},
    },
    serde::{Deserialize, Deserializer},
    std::collections::BTreeMap,
};

/// Body the processor expects back, or it retries the whole batch.
pub const ACKNOWLEDGEMENT: &str = "[accepted]";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    #[serde(default, deserialize_with = "flag")]
    pub live: bool,
    pub notification_items: Vec<NotificationRequestItemWrapper>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationRequestItemWrapper {
    #[serde(rename = "NotificationRequestItem")]
    pub item: NotificationRequestItem,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequestItem {
    pub event_code: String,
    #[serde(deserialize_with = "flag")]
    pub success: bool,
    pub psp_reference: String,
    #[serde(default)]
    pub original_reference: Option<String>,
    #[serde(default)]
    pub merchant_account_code: Option<String>,
    #[serde(default)]
    pub merchant_reference: Option<String>,
    #[serde(default)]
    pub amount: Option<WireAmount>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub additional_data: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct WireAmount {
    pub value: i64,
    pub currency: String,
}

/// The processor sends booleans as `"true"`/`"false"` strings.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!("invalid flag: {other}"))),
        },
    }
}

fn scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl NotificationRequestItem {
    /// Dotted key/value view used for signature verification.
    pub fn flatten(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("eventCode".to_string(), self.event_code.clone());
        params.insert("success".to_string(), self.success.to_string());
        params.insert("pspReference".to_string(), self.psp_reference.clone());
        let optional = [
            ("originalReference", &self.original_reference),
            ("merchantAccountCode", &self.merchant_account_code),
            ("merchantReference", &self.merchant_reference),
            ("reason", &self.reason),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                params.insert(key.to_string(), value.clone());
            }
        }
        if let Some(amount) = &self.amount {
            params.insert("amount.value".to_string(), amount.value.to_string());
            params.insert("amount.currency".to_string(), amount.currency.clone());
        }
        for (key, value) in &self.additional_data {
            params.insert(format!("additionalData.{key}"), scalar_text(value));
        }
        params
    }

    pub fn into_domain(self) -> Result<NotificationItem, ReconcileError> {
        let mut item = NotificationItem::new(
            &self.event_code,
            self.success,
            PspReference::new(self.psp_reference)?,
        );
        item.original_reference = self
            .original_reference
            .filter(|r| !r.trim().is_empty())
            .map(PspReference::new)
            .transpose()?;
        item.merchant_reference = self.merchant_reference.unwrap_or_default();
        item.amount = self
            .amount
            .map(|a| -> Result<Money, ReconcileError> {
                Ok(Money::new(
                    MoneyAmount::new(a.value)?,
                    Currency::try_from(a.currency.as_str())?,
                ))
            })
            .transpose()?;
        item.reason = self.reason.filter(|r| !r.is_empty());
        item.additional_data = self
            .additional_data
            .iter()
            .filter(|(key, _)| key.as_str() != ADDITIONAL_HMAC_SIGNATURE)
            .map(|(key, value)| (key.clone(), scalar_text(value)))
            .collect();
        Ok(item)
    }
}

/// Verifies every item of the batch before any of them is processed, then
/// runs them one by one. Per-item failures never change the response.
#[tracing::instrument(name = "adyen_notify", skip_all, fields(method_code = %method_code))]
pub async fn notify_handler(
    State(state): State<AppState>,
    Path(method_code): Path<String>,
    body: Bytes,
) -> Result<&'static str, ApiError> {
    let method_code = MethodCode::new(method_code)
        .map_err(|_| ReconcileError::NotFound("payment method".into()))?;
    let method = state.reconciler.methods().require(&method_code)?;
    if !method.is_adyen() {
        return Err(ReconcileError::NotFound(format!("adyen payment method {method_code}")).into());
    }
    let hmac_key = method.hmac_key.clone();

    let request: NotificationRequest = serde_json::from_slice(&body)
        .map_err(|e| ReconcileError::Validation(format!("malformed notification: {e}")))?;

    for wrapper in &request.notification_items {
        if !signature::verify(&wrapper.item.flatten(), hmac_key.as_deref())? {
            tracing::warn!(
                psp_reference = %wrapper.item.psp_reference,
                event_code = %wrapper.item.event_code,
                "notification signature mismatch, rejecting batch"
            );
            return Err(ReconcileError::WebhookSignature(format!(
                "bad signature on item {}",
                wrapper.item.psp_reference
            ))
            .into());
        }
    }

    let items: Vec<NotificationItem> = request
        .notification_items
        .into_iter()
        .filter_map(|w| {
            let psp_reference = w.item.psp_reference.clone();
            w.item
                .into_domain()
                .inspect_err(|e| {
                    tracing::warn!(%psp_reference, error = %e, "unusable notification item, skipping")
                })
                .ok()
        })
        .collect();

    tracing::info!(live = request.live, items = items.len(), "notification batch verified");
    state.reconciler.process_batch(&method_code, &items).await;
    Ok(ACKNOWLEDGEMENT)
}
