//! One handler per [`Command`]. Handlers always guard before applying and
//! treat a refused guard as a silent no-op.

mod alteration;
mod capture_failure;
mod checkout;
mod payment;
mod reference;
mod refund;
mod reversal;

use {
    super::commands::Command,
    crate::{
        domain::{
            error::ReconcileError,
            method::PaymentMethods,
            notification::NotificationItem,
            order::Order,
            payment::{
                DETAIL_LAST_NOTIFICATION, DETAIL_PSP_REFERENCE, DETAIL_REFUSAL_REASON, Payment,
                PaymentState,
            },
            provider::ProcessorGateway,
            store::UnitOfWork,
        },
        workflow::{OrderPaymentTransition, StateMachine},
    },
    std::sync::Arc,
    uuid::Uuid,
};

pub use reference::create_reference;

/// Collaborators every handler may use.
#[derive(Clone)]
pub struct HandlerContext {
    pub machine: Arc<StateMachine>,
    pub methods: Arc<PaymentMethods>,
    pub gateway: Arc<dyn ProcessorGateway>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// State or ledger changed; the label says how.
    Applied(&'static str),
    /// Nothing to do: already satisfied or not applicable.
    Skipped(&'static str),
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Applied(label) | Self::Skipped(label) => label,
        }
    }
}

pub async fn handle(
    ctx: &HandlerContext,
    uow: &mut dyn UnitOfWork,
    command: Command,
) -> Result<CommandOutcome, ReconcileError> {
    let name = command.name();
    let outcome = match command {
        Command::CreateReference(reference) => reference::handle(uow, reference).await,
        Command::Authorize {
            payment_id,
            notification,
        } => payment::authorize(ctx, uow, payment_id, notification.as_ref()).await,
        Command::PayByLinkAuthorize {
            payment_id,
            notification,
        } => payment::authorize_pay_by_link(ctx, uow, payment_id, &notification).await,
        Command::Capture {
            payment_id,
            notification,
        } => payment::capture(ctx, uow, payment_id, notification.as_ref()).await,
        Command::RecoverCaptureFailure {
            payment_id,
            notification,
        } => capture_failure::recover(ctx, uow, payment_id, notification.as_ref()).await,
        Command::Fail {
            payment_id,
            notification,
        } => payment::fail(ctx, uow, payment_id, notification.as_ref()).await,
        Command::Cancel {
            payment_id,
            notification,
        } => payment::cancel(ctx, uow, payment_id, notification.as_ref()).await,
        Command::Process {
            payment_id,
            notification,
        } => payment::process(ctx, uow, payment_id, notification.as_ref()).await,
        Command::Refund {
            payment_id,
            notification,
        } => refund::refund(ctx, uow, payment_id, notification.as_ref()).await,
        Command::ResolveReversal {
            payment_id,
            outcome,
            notification,
        } => reversal::resolve(ctx, uow, payment_id, outcome, notification.as_ref()).await,
        Command::Finalize { order_id } => checkout::finalize(ctx, uow, order_id).await,
        Command::TakeOver {
            order_id,
            method_code,
        } => checkout::take_over(ctx, uow, order_id, method_code).await,
        Command::RequestCapture { payment_id } => {
            alteration::request_capture(ctx, uow, payment_id).await
        }
        Command::RequestCancellation { payment_id } => {
            alteration::request_cancellation(ctx, uow, payment_id).await
        }
        Command::RequestRefund { payment_id, amount } => {
            alteration::request_refund(ctx, uow, payment_id, amount).await
        }
        Command::Reverse { payment_id } => reversal::reverse(ctx, uow, payment_id).await,
    }?;

    match &outcome {
        CommandOutcome::Applied(label) => tracing::info!(command = name, outcome = label, "command applied"),
        CommandOutcome::Skipped(label) => tracing::debug!(command = name, outcome = label, "command skipped"),
    }
    Ok(outcome)
}

async fn load_order_for_payment(
    uow: &mut dyn UnitOfWork,
    payment_id: Uuid,
) -> Result<Order, ReconcileError> {
    uow.load_order_for_payment(payment_id)
        .await?
        .ok_or_else(|| ReconcileError::NotFound(format!("order for payment {payment_id}")))
}

fn payment_of(order: &Order, payment_id: Uuid) -> Result<&Payment, ReconcileError> {
    order
        .payment(payment_id)
        .ok_or_else(|| ReconcileError::NotFound(format!("payment {payment_id}")))
}

fn payment_mut(order: &mut Order, payment_id: Uuid) -> Result<&mut Payment, ReconcileError> {
    order
        .payment_mut(payment_id)
        .ok_or_else(|| ReconcileError::NotFound(format!("payment {payment_id}")))
}

/// Keeps the event that moved the payment in its detail map.
fn record_notification(
    payment: &mut Payment,
    notification: Option<&NotificationItem>,
) -> Result<(), ReconcileError> {
    let Some(notification) = notification else {
        return Ok(());
    };
    if payment.psp_reference().is_none() && notification.original_reference.is_none() {
        payment.set_detail(DETAIL_PSP_REFERENCE, notification.psp_reference.as_str());
    }
    if let Some(reason) = notification.reason.as_deref().filter(|r| !r.is_empty()) {
        payment.set_detail(DETAIL_REFUSAL_REASON, reason);
    }
    payment.set_detail(DETAIL_LAST_NOTIFICATION, notification.to_detail()?);
    Ok(())
}

/// Follows a payment transition on the order's settlement status, but only
/// while the payment is the order's current one and belongs to the processor.
fn sync_order_payment_state(
    ctx: &HandlerContext,
    order: &mut Order,
    payment_id: Uuid,
) -> Result<(), ReconcileError> {
    let Some(last) = order.last_payment() else {
        return Ok(());
    };
    if last.id() != payment_id || !ctx.methods.is_adyen(last.method_code()) {
        return Ok(());
    }

    let transition = match last.state() {
        PaymentState::Authorized => OrderPaymentTransition::Authorize,
        PaymentState::Completed => OrderPaymentTransition::Pay,
        PaymentState::Cancelled => OrderPaymentTransition::Cancel,
        _ => return Ok(()),
    };
    if !ctx.machine.apply_if_allowed(&mut *order, transition)? {
        tracing::debug!(order_id = %order.id(), %transition, "order payment state left as is");
    }
    Ok(())
}
