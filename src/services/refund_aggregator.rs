//! Partial versus full refund settlement.
//!
//! Runs whenever a refund completes: the completed refunds of the payment
//! are summed and the order's payment state moves to `refunded` once the
//! sum reaches the payment amount, `partially_refunded` before that.

use {
    crate::{
        domain::{
            error::ReconcileError,
            money::MoneyAmount,
            order::{Order, OrderPaymentState},
        },
        workflow::{OrderPaymentTransition, PaymentTransition, StateMachine},
    },
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Partial { refunded: MoneyAmount, remaining: MoneyAmount },
    Full { refunded: MoneyAmount },
}

pub fn settlement(order: &Order, payment_id: Uuid) -> Result<Settlement, ReconcileError> {
    let payment = order
        .payment(payment_id)
        .ok_or_else(|| ReconcileError::NotFound(format!("payment {payment_id}")))?;
    let captured = payment.money().amount();
    let refunded = order.completed_refund_total(payment_id);

    if refunded >= captured {
        Ok(Settlement::Full { refunded })
    } else {
        Ok(Settlement::Partial {
            refunded,
            remaining: captured.remaining_after(refunded),
        })
    }
}

/// Drives the payment and order-payment graphs from the refund totals.
pub fn settle(
    machine: &StateMachine,
    order: &mut Order,
    payment_id: Uuid,
) -> Result<OrderPaymentState, ReconcileError> {
    let outcome = settlement(order, payment_id)?;

    match outcome {
        Settlement::Full { refunded } => {
            if let Some(payment) = order.payment_mut(payment_id) {
                machine.apply_if_allowed(payment, PaymentTransition::Refund)?;
            }
            machine.apply_if_allowed(&mut *order, OrderPaymentTransition::Refund)?;
            tracing::info!(%payment_id, %refunded, "payment fully refunded");
        }
        Settlement::Partial { refunded, remaining } => {
            if refunded > MoneyAmount::ZERO {
                machine.apply_if_allowed(&mut *order, OrderPaymentTransition::PartiallyRefund)?;
            }
            tracing::info!(%payment_id, %refunded, %remaining, "payment partially refunded");
        }
    }

    Ok(order.payment_state())
}
