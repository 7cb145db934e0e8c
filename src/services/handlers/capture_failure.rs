use {
    super::{CommandOutcome, HandlerContext, load_order_for_payment, payment_mut, record_notification},
    crate::{
        domain::{
            error::ReconcileError, notification::NotificationItem, payment::DETAIL_REFUSAL_REASON,
            store::UnitOfWork,
        },
        workflow::{OrderPaymentTransition, PaymentTransition},
    },
    uuid::Uuid,
};

/// A failed capture fails the payment and opens a fresh one of the same
/// amount so the customer can pay again. The replacement is only created
/// when the fail transition applies, so a redelivered event adds nothing.
pub(super) async fn recover(
    ctx: &HandlerContext,
    uow: &mut dyn UnitOfWork,
    payment_id: Uuid,
    notification: Option<&NotificationItem>,
) -> Result<CommandOutcome, ReconcileError> {
    let mut order = load_order_for_payment(uow, payment_id).await?;
    let payment = payment_mut(&mut order, payment_id)?;

    if !ctx.machine.can(&*payment, PaymentTransition::Fail) {
        tracing::debug!(%payment_id, state = %payment.state(), "capture failure already handled");
        return Ok(CommandOutcome::Skipped("payment cannot fail"));
    }
    ctx.machine.apply(&mut *payment, PaymentTransition::Fail)?;
    record_notification(payment, notification)?;
    if notification.and_then(|n| n.reason.as_ref()).is_none() {
        payment.set_detail(DETAIL_REFUSAL_REASON, "capture_failed");
    }

    let replacement = payment.replacement();
    let replacement_id = order.add_payment(replacement)?;
    ctx.machine
        .apply_if_allowed(&mut order, OrderPaymentTransition::RequestPayment)?;

    uow.save_order(&order).await?;
    tracing::warn!(
        %payment_id,
        %replacement_id,
        order_id = %order.id(),
        "capture failed, replacement payment created"
    );
    Ok(CommandOutcome::Applied("capture_failure_recovered"))
}
