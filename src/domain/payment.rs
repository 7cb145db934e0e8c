use {
    super::error::ReconcileError,
    super::id::{MethodCode, PspReference},
    super::money::Money,
    crate::workflow::Stateful,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
    std::fmt,
    uuid::Uuid,
};

pub const DETAIL_PSP_REFERENCE: &str = "pspReference";
pub const DETAIL_PAYMENT_LINK_ID: &str = "paymentLinkId";
pub const DETAIL_LAST_NOTIFICATION: &str = "last_notification";
pub const DETAIL_REFUSAL_REASON: &str = "refusal_reason";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    New,
    Authorized,
    Processing,
    ProcessingReversal,
    Completed,
    Failed,
    Cancelled,
    Refunded,
}

impl PaymentState {
    pub const ALL: [PaymentState; 8] = [
        Self::New,
        Self::Authorized,
        Self::Processing,
        Self::ProcessingReversal,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
        Self::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Authorized => "authorized",
            Self::Processing => "processing",
            Self::ProcessingReversal => "processing_reversal",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentState {
    type Error = ReconcileError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ReconcileError::Validation(format!("unknown payment state: {s}")))
    }
}

/// An attempt to move money for an order.
#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    id: Uuid,
    order_id: Uuid,
    method_code: MethodCode,
    money: Money,
    state: PaymentState,
    details: Map<String, Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Every column of a stored payment, for rehydration by a store.
pub struct PaymentParams {
    pub id: Uuid,
    pub order_id: Uuid,
    pub method_code: MethodCode,
    pub money: Money,
    pub state: PaymentState,
    pub details: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// A fresh, payable payment.
    pub fn new(order_id: Uuid, method_code: MethodCode, money: Money) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            order_id,
            method_code,
            money,
            state: PaymentState::New,
            details: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn restore(params: PaymentParams) -> Self {
        Self {
            id: params.id,
            order_id: params.order_id,
            method_code: params.method_code,
            money: params.money,
            state: params.state,
            details: params.details,
            created_at: params.created_at,
            updated_at: params.updated_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn order_id(&self) -> Uuid {
        self.order_id
    }

    pub fn method_code(&self) -> &MethodCode {
        &self.method_code
    }

    pub fn money(&self) -> &Money {
        &self.money
    }

    pub fn state(&self) -> PaymentState {
        self.state
    }

    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn psp_reference(&self) -> Option<PspReference> {
        self.details
            .get(DETAIL_PSP_REFERENCE)
            .and_then(Value::as_str)
            .and_then(|s| PspReference::new(s).ok())
    }

    pub fn payment_link_id(&self) -> Option<&str> {
        self.details
            .get(DETAIL_PAYMENT_LINK_ID)
            .and_then(Value::as_str)
    }

    pub fn set_detail(&mut self, key: &str, value: impl Into<Value>) {
        self.details.insert(key.to_string(), value.into());
        self.updated_at = Utc::now();
    }

    /// Points the payment at another method. No state change.
    pub fn rebind_method(&mut self, method_code: MethodCode) {
        self.method_code = method_code;
        self.updated_at = Utc::now();
    }

    /// A payment with the same amount, currency and method, in state `new`.
    pub fn replacement(&self) -> Payment {
        Payment::new(self.order_id, self.method_code.clone(), self.money)
    }
}

impl Stateful for Payment {
    type State = PaymentState;

    fn graph_state(&self) -> PaymentState {
        self.state
    }

    fn set_graph_state(&mut self, state: PaymentState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}
