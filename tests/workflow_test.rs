mod common;

use adyen_reconcile::domain::error::ReconcileError;
use adyen_reconcile::domain::order::{
    CheckoutState, Order, OrderParams, OrderPaymentState, OrderState,
};
use adyen_reconcile::domain::payment::{Payment, PaymentParams, PaymentState};
use adyen_reconcile::domain::refund::{Refund, RefundState};
use adyen_reconcile::workflow::{
    OrderPaymentTransition, PaymentTransition, RefundTransition, ReversalTransition, StateMachine,
};
use chrono::Utc;
use common::*;
use proptest::prelude::*;
use serde_json::Map;
use uuid::Uuid;

fn payment_in(method: &str, state: PaymentState) -> Payment {
    let now = Utc::now();
    Payment::restore(PaymentParams {
        id: Uuid::now_v7(),
        order_id: Uuid::now_v7(),
        method_code: code(method),
        money: eur(1000),
        state,
        details: Map::new(),
        created_at: now,
        updated_at: now,
    })
}

fn order_in(state: OrderPaymentState, last_payment: Option<(&str, PaymentState)>) -> Order {
    let id = Uuid::now_v7();
    let payments = last_payment
        .map(|(method, state)| {
            let now = Utc::now();
            vec![Payment::restore(PaymentParams {
                id: Uuid::now_v7(),
                order_id: id,
                method_code: code(method),
                money: eur(1000),
                state,
                details: Map::new(),
                created_at: now,
                updated_at: now,
            })]
        })
        .unwrap_or_default();
    Order::restore(OrderParams {
        id,
        number: "R1".into(),
        state: OrderState::New,
        checkout_state: CheckoutState::Completed,
        payment_state: state,
        payments,
        refunds: Vec::new(),
    })
}

// ── payment graph ──────────────────────────────────────────────────────────

#[test]
fn payment_happy_paths() {
    let machine = StateMachine::standard();

    let mut payment = payment_in(AUTO, PaymentState::New);
    assert_eq!(
        machine.apply(&mut payment, PaymentTransition::Process).unwrap(),
        PaymentState::Processing
    );
    assert_eq!(
        machine.apply(&mut payment, PaymentTransition::Authorize).unwrap(),
        PaymentState::Authorized
    );
    assert_eq!(
        machine.apply(&mut payment, PaymentTransition::Capture).unwrap(),
        PaymentState::Completed
    );
    assert_eq!(
        machine.apply(&mut payment, PaymentTransition::Refund).unwrap(),
        PaymentState::Refunded
    );
}

#[test]
fn terminal_payment_states_refuse_forward_transitions() {
    let machine = StateMachine::standard();
    for state in [PaymentState::Failed, PaymentState::Cancelled, PaymentState::Refunded] {
        let payment = payment_in(AUTO, state);
        for transition in [
            PaymentTransition::Process,
            PaymentTransition::Authorize,
            PaymentTransition::Capture,
            PaymentTransition::Complete,
            PaymentTransition::Fail,
            PaymentTransition::Cancel,
            PaymentTransition::Refund,
        ] {
            assert!(!machine.can(&payment, transition), "{state} --{transition}");
        }
    }
}

#[test]
fn apply_on_refused_transition_is_error_and_keeps_state() {
    let machine = StateMachine::standard();
    let mut payment = payment_in(AUTO, PaymentState::Failed);

    let err = machine
        .apply(&mut payment, PaymentTransition::Authorize)
        .unwrap_err();
    match err {
        ReconcileError::Transition {
            graph,
            transition,
            state,
        } => {
            assert_eq!(graph, "payment");
            assert_eq!(transition, "authorize");
            assert_eq!(state, "failed");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(payment.state(), PaymentState::Failed);
}

#[test]
fn apply_if_allowed_is_a_quiet_no_op() {
    let machine = StateMachine::standard();
    let mut payment = payment_in(AUTO, PaymentState::Completed);
    assert!(!machine
        .apply_if_allowed(&mut payment, PaymentTransition::Authorize)
        .unwrap());
    assert_eq!(payment.state(), PaymentState::Completed);
}

// ── reversal graph ─────────────────────────────────────────────────────────

#[test]
fn reversal_resolves_exactly_once() {
    let machine = StateMachine::standard();
    let mut payment = payment_in(AUTO, PaymentState::Completed);

    machine.apply(&mut payment, ReversalTransition::Reverse).unwrap();
    assert_eq!(payment.state(), PaymentState::ProcessingReversal);
    assert!(!machine.can(&payment, ReversalTransition::Reverse));

    machine
        .apply(&mut payment, ReversalTransition::ResolveRefunded)
        .unwrap();
    assert_eq!(payment.state(), PaymentState::Refunded);
    assert!(!machine.can(&payment, ReversalTransition::ResolveCancelled));
}

#[test]
fn reversal_graph_reports_its_own_name() {
    let machine = StateMachine::standard();
    let mut payment = payment_in(AUTO, PaymentState::Failed);
    let err = machine
        .apply(&mut payment, ReversalTransition::Reverse)
        .unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Transition { graph: "payment_reversal", .. }
    ));
}

// ── order-payment and refund graphs ────────────────────────────────────────

#[test]
fn order_payment_partial_refund_loops_until_refunded() {
    let machine = StateMachine::standard();
    let mut order = order_in(OrderPaymentState::Paid, None);

    machine
        .apply(&mut order, OrderPaymentTransition::PartiallyRefund)
        .unwrap();
    machine
        .apply(&mut order, OrderPaymentTransition::PartiallyRefund)
        .unwrap();
    assert_eq!(order.payment_state(), OrderPaymentState::PartiallyRefunded);

    machine.apply(&mut order, OrderPaymentTransition::Refund).unwrap();
    assert_eq!(order.payment_state(), OrderPaymentState::Refunded);
    assert!(!machine.can(&order, OrderPaymentTransition::PartiallyRefund));
}

#[test]
fn refund_completes_once() {
    let machine = StateMachine::standard();
    let order = Order::new("R1");
    let payment = Payment::new(order.id(), code(AUTO), eur(500));
    let mut refund = Refund::new(order.id(), payment.id(), code(AUTO), eur(200));

    machine.apply(&mut refund, RefundTransition::Complete).unwrap();
    assert_eq!(refund.state(), RefundState::Completed);
    assert!(!machine.can(&refund, RefundTransition::Complete));
}

// ── processor guards ───────────────────────────────────────────────────────

#[test]
fn host_completion_is_vetoed_for_automatic_capture() {
    let machine = StateMachine::with_processor_guards(methods());

    let auto = payment_in(AUTO, PaymentState::Authorized);
    assert!(!machine.can(&auto, PaymentTransition::Complete));
    assert!(machine.can(&auto, PaymentTransition::Capture));

    let manual = payment_in(MANUAL, PaymentState::Authorized);
    assert!(machine.can(&manual, PaymentTransition::Complete));

    let offline = payment_in(OFFLINE, PaymentState::Authorized);
    assert!(machine.can(&offline, PaymentTransition::Complete));
}

#[test]
fn order_cancel_is_vetoed_while_manual_capture_is_in_flight() {
    let machine = StateMachine::with_processor_guards(methods());

    let in_flight = order_in(
        OrderPaymentState::Authorized,
        Some((MANUAL, PaymentState::Processing)),
    );
    assert!(!machine.can(&in_flight, OrderPaymentTransition::Cancel));

    let settled = order_in(
        OrderPaymentState::Authorized,
        Some((MANUAL, PaymentState::Authorized)),
    );
    assert!(machine.can(&settled, OrderPaymentTransition::Cancel));

    let auto = order_in(
        OrderPaymentState::Authorized,
        Some((AUTO, PaymentState::Processing)),
    );
    assert!(machine.can(&auto, OrderPaymentTransition::Cancel));
}

#[test]
fn host_can_register_extra_guards() {
    let mut machine = StateMachine::standard();
    machine.register_payment_guard("no_small_refunds", PaymentTransition::Refund, |p: &Payment| {
        p.money().amount().minor() >= 5000
    });

    let mut payment = payment_in(AUTO, PaymentState::Completed);
    assert!(!machine.can(&payment, PaymentTransition::Refund));
    assert!(machine.apply(&mut payment, PaymentTransition::Refund).is_err());
}

// ── random walks ───────────────────────────────────────────────────────────

fn arb_transition() -> impl Strategy<Value = PaymentTransition> {
    prop_oneof![
        Just(PaymentTransition::Process),
        Just(PaymentTransition::Authorize),
        Just(PaymentTransition::Capture),
        Just(PaymentTransition::Complete),
        Just(PaymentTransition::Fail),
        Just(PaymentTransition::Cancel),
        Just(PaymentTransition::Refund),
    ]
}

proptest! {
    /// `can` and `apply` agree on every step; a refused step never moves the state.
    #[test]
    fn can_and_apply_agree(steps in prop::collection::vec(arb_transition(), 1..25)) {
        let machine = StateMachine::with_processor_guards(methods());
        let mut payment = payment_in(AUTO, PaymentState::New);
        for transition in steps {
            let before = payment.state();
            let allowed = machine.can(&payment, transition);
            let result = machine.apply(&mut payment, transition);
            prop_assert_eq!(allowed, result.is_ok());
            if !allowed {
                prop_assert_eq!(payment.state(), before);
            }
        }
    }

    /// Once failed, cancelled or refunded, no payment transition moves it again.
    #[test]
    fn terminal_states_are_absorbing(steps in prop::collection::vec(arb_transition(), 1..25)) {
        let machine = StateMachine::standard();
        let mut payment = payment_in(MANUAL, PaymentState::New);
        let mut terminal = None;
        for transition in steps {
            let _ = machine.apply_if_allowed(&mut payment, transition);
            if let Some(state) = terminal {
                prop_assert_eq!(payment.state(), state);
            } else if matches!(
                payment.state(),
                PaymentState::Failed | PaymentState::Cancelled | PaymentState::Refunded
            ) {
                terminal = Some(payment.state());
            }
        }
    }
}
