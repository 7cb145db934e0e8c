use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::error::ReconcileError;

/// Identifier the processor assigns to one transaction or modification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PspReference(String);

impl PspReference {
    pub fn new(id: impl Into<String>) -> Result<Self, ReconcileError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(ReconcileError::Validation(
                "psp reference must not be empty".into(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Code of a configured payment method (`adyen`, `adyen_manual`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodCode(String);

impl MethodCode {
    pub fn new(code: impl Into<String>) -> Result<Self, ReconcileError> {
        let code = code.into();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(ReconcileError::Validation(format!(
                "invalid payment method code: {code:?}"
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
