use {
    super::error::ReconcileError,
    super::id::MethodCode,
    super::money::Money,
    crate::workflow::Stateful,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RefundState {
    New,
    Completed,
    /// The processor turned the request down.
    Failed,
}

impl RefundState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RefundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for RefundState {
    type Error = ReconcileError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "new" => Ok(Self::New),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(ReconcileError::Validation(format!(
                "unknown refund state: {other}"
            ))),
        }
    }
}

/// Money returned against a payment. A payment may carry many.
#[derive(Debug, Clone, Serialize)]
pub struct Refund {
    id: Uuid,
    order_id: Uuid,
    payment_id: Uuid,
    method_code: MethodCode,
    money: Money,
    state: RefundState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

pub struct RefundParams {
    pub id: Uuid,
    pub order_id: Uuid,
    pub payment_id: Uuid,
    pub method_code: MethodCode,
    pub money: Money,
    pub state: RefundState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Refund {
    pub fn new(order_id: Uuid, payment_id: Uuid, method_code: MethodCode, money: Money) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            order_id,
            payment_id,
            method_code,
            money,
            state: RefundState::New,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn restore(params: RefundParams) -> Self {
        Self {
            id: params.id,
            order_id: params.order_id,
            payment_id: params.payment_id,
            method_code: params.method_code,
            money: params.money,
            state: params.state,
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

    pub fn payment_id(&self) -> Uuid {
        self.payment_id
    }

    pub fn method_code(&self) -> &MethodCode {
        &self.method_code
    }

    pub fn money(&self) -> &Money {
        &self.money
    }

    pub fn state(&self) -> RefundState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Stateful for Refund {
    type State = RefundState;

    fn graph_state(&self) -> RefundState {
        self.state
    }

    fn set_graph_state(&mut self, state: RefundState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}
