use {
    super::error::ReconcileError,
    super::money::MoneyAmount,
    super::payment::Payment,
    super::refund::{Refund, RefundState},
    crate::workflow::Stateful,
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

macro_rules! string_enum {
    ($name:ident, $what:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ReconcileError;

            fn try_from(s: &str) -> Result<Self, Self::Error> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ReconcileError::Validation(format!(
                        concat!("unknown ", $what, ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

string_enum!(OrderState, "order state" {
    Cart => "cart",
    New => "new",
    Cancelled => "cancelled",
    Fulfilled => "fulfilled",
});

string_enum!(CheckoutState, "checkout state" {
    Cart => "cart",
    Addressed => "addressed",
    PaymentSelected => "payment_selected",
    Completed => "completed",
});

string_enum!(OrderPaymentState, "order payment state" {
    Cart => "cart",
    AwaitingPayment => "awaiting_payment",
    Authorized => "authorized",
    Paid => "paid",
    Cancelled => "cancelled",
    PartiallyRefunded => "partially_refunded",
    Refunded => "refunded",
});

/// An order together with its payments and refunds.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    id: Uuid,
    number: String,
    state: OrderState,
    checkout_state: CheckoutState,
    payment_state: OrderPaymentState,
    payments: Vec<Payment>,
    refunds: Vec<Refund>,
}

pub struct OrderParams {
    pub id: Uuid,
    pub number: String,
    pub state: OrderState,
    pub checkout_state: CheckoutState,
    pub payment_state: OrderPaymentState,
    pub payments: Vec<Payment>,
    pub refunds: Vec<Refund>,
}

impl Order {
    /// An order still in checkout, without payments.
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            number: number.into(),
            state: OrderState::Cart,
            checkout_state: CheckoutState::Cart,
            payment_state: OrderPaymentState::Cart,
            payments: Vec::new(),
            refunds: Vec::new(),
        }
    }

    pub fn restore(params: OrderParams) -> Self {
        Self {
            id: params.id,
            number: params.number,
            state: params.state,
            checkout_state: params.checkout_state,
            payment_state: params.payment_state,
            payments: params.payments,
            refunds: params.refunds,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn checkout_state(&self) -> CheckoutState {
        self.checkout_state
    }

    pub fn payment_state(&self) -> OrderPaymentState {
        self.payment_state
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn refunds(&self) -> &[Refund] {
        &self.refunds
    }

    /// The most recently created payment; the one checkout works on.
    pub fn last_payment(&self) -> Option<&Payment> {
        self.payments.last()
    }

    pub fn payment(&self, id: Uuid) -> Option<&Payment> {
        self.payments.iter().find(|p| p.id() == id)
    }

    pub fn payment_mut(&mut self, id: Uuid) -> Option<&mut Payment> {
        self.payments.iter_mut().find(|p| p.id() == id)
    }

    pub fn add_payment(&mut self, payment: Payment) -> Result<Uuid, ReconcileError> {
        if payment.order_id() != self.id {
            return Err(ReconcileError::InvariantViolation(format!(
                "payment {} belongs to order {}, not {}",
                payment.id(),
                payment.order_id(),
                self.id
            )));
        }
        let id = payment.id();
        self.payments.push(payment);
        Ok(id)
    }

    pub fn refund(&self, id: Uuid) -> Option<&Refund> {
        self.refunds.iter().find(|r| r.id() == id)
    }

    pub fn refund_mut(&mut self, id: Uuid) -> Option<&mut Refund> {
        self.refunds.iter_mut().find(|r| r.id() == id)
    }

    pub fn add_refund(&mut self, refund: Refund) -> Result<Uuid, ReconcileError> {
        if self.payment(refund.payment_id()).is_none() {
            return Err(ReconcileError::InvariantViolation(format!(
                "refund {} points at payment {} outside order {}",
                refund.id(),
                refund.payment_id(),
                self.id
            )));
        }
        let id = refund.id();
        self.refunds.push(refund);
        Ok(id)
    }

    pub fn refunds_for(&self, payment_id: Uuid) -> impl Iterator<Item = &Refund> {
        self.refunds
            .iter()
            .filter(move |r| r.payment_id() == payment_id)
    }

    /// Sum of completed refunds against one payment.
    pub fn completed_refund_total(&self, payment_id: Uuid) -> MoneyAmount {
        self.refunds_for(payment_id)
            .filter(|r| r.state() == RefundState::Completed)
            .fold(MoneyAmount::ZERO, |acc, r| {
                acc.checked_add(r.money().amount()).unwrap_or(acc)
            })
    }

    /// Sum of refunds that are completed or still awaiting confirmation.
    pub fn committed_refund_total(&self, payment_id: Uuid) -> MoneyAmount {
        self.refunds_for(payment_id)
            .filter(|r| r.state() != RefundState::Failed)
            .fold(MoneyAmount::ZERO, |acc, r| {
                acc.checked_add(r.money().amount()).unwrap_or(acc)
            })
    }

    pub fn is_checkout_completed(&self) -> bool {
        self.checkout_state == CheckoutState::Completed
    }

    /// Marks checkout done and places the order. Returns false if it already was.
    pub fn complete_checkout(&mut self) -> bool {
        if self.is_checkout_completed() {
            return false;
        }
        self.checkout_state = CheckoutState::Completed;
        if self.state == OrderState::Cart {
            self.state = OrderState::New;
        }
        true
    }
}

impl Stateful for Order {
    type State = OrderPaymentState;

    fn graph_state(&self) -> OrderPaymentState {
        self.payment_state
    }

    fn set_graph_state(&mut self, state: OrderPaymentState) {
        self.payment_state = state;
    }
}
