use {
    super::{Graph, Stateful, TransitionDef, Workflow},
    crate::domain::{
        error::ReconcileError,
        method::PaymentMethods,
        order::{Order, OrderPaymentState},
        payment::{Payment, PaymentState},
        refund::{Refund, RefundState},
    },
    std::{fmt, sync::Arc},
};

macro_rules! transition_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
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
    };
}

transition_enum!(PaymentTransition {
    Process => "process",
    Authorize => "authorize",
    Capture => "capture",
    Complete => "complete",
    Fail => "fail",
    Cancel => "cancel",
    Refund => "refund",
});

transition_enum!(ReversalTransition {
    Reverse => "reverse",
    ResolveCancelled => "resolve_cancelled",
    ResolveRefunded => "resolve_refunded",
});

transition_enum!(OrderPaymentTransition {
    RequestPayment => "request_payment",
    Authorize => "authorize",
    Pay => "pay",
    Cancel => "cancel",
    PartiallyRefund => "partially_refund",
    Refund => "refund",
});

transition_enum!(RefundTransition {
    Complete => "complete",
    Fail => "fail",
});

use PaymentState as P;

/// `Capture` is the processor's way to completion; `Complete` is the host's.
#[rustfmt::skip]
static PAYMENT: &[TransitionDef<PaymentState, PaymentTransition>] = &[
    TransitionDef { transition: PaymentTransition::Process, from: &[P::New], to: P::Processing },
    TransitionDef { transition: PaymentTransition::Authorize, from: &[P::New, P::Processing], to: P::Authorized },
    TransitionDef { transition: PaymentTransition::Capture, from: &[P::New, P::Processing, P::Authorized], to: P::Completed },
    TransitionDef { transition: PaymentTransition::Complete, from: &[P::New, P::Processing, P::Authorized], to: P::Completed },
    TransitionDef { transition: PaymentTransition::Fail, from: &[P::New, P::Processing, P::Authorized], to: P::Failed },
    TransitionDef { transition: PaymentTransition::Cancel, from: &[P::New, P::Processing, P::Authorized], to: P::Cancelled },
    TransitionDef { transition: PaymentTransition::Refund, from: &[P::Completed], to: P::Refunded },
];

#[rustfmt::skip]
static REVERSAL: &[TransitionDef<PaymentState, ReversalTransition>] = &[
    TransitionDef { transition: ReversalTransition::Reverse, from: &[P::New, P::Authorized, P::Completed], to: P::ProcessingReversal },
    TransitionDef { transition: ReversalTransition::ResolveCancelled, from: &[P::ProcessingReversal], to: P::Cancelled },
    TransitionDef { transition: ReversalTransition::ResolveRefunded, from: &[P::ProcessingReversal], to: P::Refunded },
];

use OrderPaymentState as O;

#[rustfmt::skip]
static ORDER_PAYMENT: &[TransitionDef<OrderPaymentState, OrderPaymentTransition>] = &[
    TransitionDef { transition: OrderPaymentTransition::RequestPayment, from: &[O::Cart, O::Authorized], to: O::AwaitingPayment },
    TransitionDef { transition: OrderPaymentTransition::Authorize, from: &[O::AwaitingPayment], to: O::Authorized },
    TransitionDef { transition: OrderPaymentTransition::Pay, from: &[O::AwaitingPayment, O::Authorized], to: O::Paid },
    TransitionDef { transition: OrderPaymentTransition::Cancel, from: &[O::AwaitingPayment, O::Authorized, O::Paid], to: O::Cancelled },
    TransitionDef { transition: OrderPaymentTransition::PartiallyRefund, from: &[O::Paid, O::PartiallyRefunded], to: O::PartiallyRefunded },
    TransitionDef { transition: OrderPaymentTransition::Refund, from: &[O::Paid, O::PartiallyRefunded], to: O::Refunded },
];

#[rustfmt::skip]
static REFUND_PAYMENT: &[TransitionDef<RefundState, RefundTransition>] = &[
    TransitionDef { transition: RefundTransition::Complete, from: &[RefundState::New], to: RefundState::Completed },
    TransitionDef { transition: RefundTransition::Fail, from: &[RefundState::New], to: RefundState::Failed },
];

/// A transition type knows which graph of the machine it belongs to.
pub trait Transition: Copy + Eq + fmt::Display + 'static {
    type Subject: Stateful + 'static;

    fn workflow(machine: &StateMachine) -> &Workflow<Self::Subject, Self>;
}

impl Transition for PaymentTransition {
    type Subject = Payment;

    fn workflow(machine: &StateMachine) -> &Workflow<Payment, Self> {
        &machine.payment
    }
}

impl Transition for ReversalTransition {
    type Subject = Payment;

    fn workflow(machine: &StateMachine) -> &Workflow<Payment, Self> {
        &machine.reversal
    }
}

impl Transition for OrderPaymentTransition {
    type Subject = Order;

    fn workflow(machine: &StateMachine) -> &Workflow<Order, Self> {
        &machine.order_payment
    }
}

impl Transition for RefundTransition {
    type Subject = Refund;

    fn workflow(machine: &StateMachine) -> &Workflow<Refund, Self> {
        &machine.refund
    }
}

/// The graphs the engine drives, as the host wires them.
pub struct StateMachine {
    payment: Workflow<Payment, PaymentTransition>,
    reversal: Workflow<Payment, ReversalTransition>,
    order_payment: Workflow<Order, OrderPaymentTransition>,
    refund: Workflow<Refund, RefundTransition>,
}

impl StateMachine {
    /// Bare graphs with no guards.
    pub fn standard() -> Self {
        Self {
            payment: Workflow::new(Graph::Payment, PAYMENT),
            reversal: Workflow::new(Graph::PaymentReversal, REVERSAL),
            order_payment: Workflow::new(Graph::OrderPayment, ORDER_PAYMENT),
            refund: Workflow::new(Graph::RefundPayment, REFUND_PAYMENT),
        }
    }

    /// Standard graphs plus the processor's guards.
    pub fn with_processor_guards(methods: Arc<PaymentMethods>) -> Self {
        let mut machine = Self::standard();
        machine.install_processor_guards(methods);
        machine
    }

    /// Registers the vetoes this engine needs on the host's graphs.
    pub fn install_processor_guards(&mut self, methods: Arc<PaymentMethods>) {
        let m = Arc::clone(&methods);
        self.payment.register_guard(
            "processor_owns_completion",
            PaymentTransition::Complete,
            move |payment: &Payment| !m.is_auto_capture(payment.method_code()),
        );

        for transition in [
            OrderPaymentTransition::Cancel,
            OrderPaymentTransition::PartiallyRefund,
            OrderPaymentTransition::Refund,
        ] {
            let m = Arc::clone(&methods);
            self.order_payment.register_guard(
                "capture_in_flight",
                transition,
                move |order: &Order| {
                    !order.last_payment().is_some_and(|p| {
                        m.is_manual_capture(p.method_code()) && p.state() == PaymentState::Processing
                    })
                },
            );
        }
    }

    pub fn register_payment_guard(
        &mut self,
        tag: &'static str,
        transition: PaymentTransition,
        predicate: impl Fn(&Payment) -> bool + Send + Sync + 'static,
    ) {
        self.payment.register_guard(tag, transition, predicate);
    }

    pub fn register_order_payment_guard(
        &mut self,
        tag: &'static str,
        transition: OrderPaymentTransition,
        predicate: impl Fn(&Order) -> bool + Send + Sync + 'static,
    ) {
        self.order_payment.register_guard(tag, transition, predicate);
    }

    pub fn can<T: Transition>(&self, subject: &T::Subject, transition: T) -> bool {
        T::workflow(self).can(subject, transition)
    }

    pub fn apply<T: Transition>(
        &self,
        subject: &mut T::Subject,
        transition: T,
    ) -> Result<<T::Subject as Stateful>::State, ReconcileError> {
        T::workflow(self).apply(subject, transition)
    }

    /// Guard-then-apply. `Ok(false)` means the transition did not apply.
    pub fn apply_if_allowed<T: Transition>(
        &self,
        subject: &mut T::Subject,
        transition: T,
    ) -> Result<bool, ReconcileError> {
        T::workflow(self).apply_if_allowed(subject, transition)
    }

    pub fn graph_of<T: Transition>(&self) -> Graph {
        T::workflow(self).graph()
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::standard()
    }
}
