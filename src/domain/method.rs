use {
    super::error::ReconcileError,
    super::id::MethodCode,
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    Adyen,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// The processor captures on authorisation; an authorised payment is paid.
    Automatic,
    /// An operator has to request the capture after authorisation.
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub code: MethodCode,
    pub gateway: GatewayKind,
    pub capture_mode: CaptureMode,
    #[serde(default)]
    pub merchant_account: String,
    /// Hex-encoded webhook HMAC key.
    #[serde(default, skip_serializing)]
    pub hmac_key: Option<String>,
}

impl PaymentMethod {
    pub fn is_adyen(&self) -> bool {
        self.gateway == GatewayKind::Adyen
    }

    pub fn is_auto_capture(&self) -> bool {
        self.is_adyen() && self.capture_mode == CaptureMode::Automatic
    }

    pub fn is_manual_capture(&self) -> bool {
        self.is_adyen() && self.capture_mode == CaptureMode::Manual
    }
}

/// Configured payment methods, keyed by code.
#[derive(Debug, Clone, Default)]
pub struct PaymentMethods {
    by_code: HashMap<MethodCode, PaymentMethod>,
}

impl PaymentMethods {
    pub fn new(methods: impl IntoIterator<Item = PaymentMethod>) -> Self {
        Self {
            by_code: methods.into_iter().map(|m| (m.code.clone(), m)).collect(),
        }
    }

    pub fn get(&self, code: &MethodCode) -> Option<&PaymentMethod> {
        self.by_code.get(code)
    }

    pub fn require(&self, code: &MethodCode) -> Result<&PaymentMethod, ReconcileError> {
        self.get(code)
            .ok_or_else(|| ReconcileError::NotFound(format!("payment method {code}")))
    }

    pub fn is_adyen(&self, code: &MethodCode) -> bool {
        self.get(code).is_some_and(PaymentMethod::is_adyen)
    }

    pub fn is_auto_capture(&self, code: &MethodCode) -> bool {
        self.get(code).is_some_and(PaymentMethod::is_auto_capture)
    }

    pub fn is_manual_capture(&self, code: &MethodCode) -> bool {
        self.get(code).is_some_and(PaymentMethod::is_manual_capture)
    }
}
