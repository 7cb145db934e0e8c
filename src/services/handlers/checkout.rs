use {
    super::{CommandOutcome, HandlerContext},
    crate::{
        domain::{
            error::ReconcileError, id::MethodCode, order::Order, payment::PaymentState,
            store::UnitOfWork,
        },
        workflow::OrderPaymentTransition,
    },
    uuid::Uuid,
};

async fn load_order(uow: &mut dyn UnitOfWork, order_id: Uuid) -> Result<Order, ReconcileError> {
    uow.load_order(order_id)
        .await?
        .ok_or_else(|| ReconcileError::NotFound(format!("order {order_id}")))
}

/// Places the order once the shopper is back from the processor, and opens
/// its settlement.
pub(super) async fn finalize(
    ctx: &HandlerContext,
    uow: &mut dyn UnitOfWork,
    order_id: Uuid,
) -> Result<CommandOutcome, ReconcileError> {
    let mut order = load_order(uow, order_id).await?;
    if !order.complete_checkout() {
        return Ok(CommandOutcome::Skipped("checkout already completed"));
    }
    ctx.machine
        .apply_if_allowed(&mut order, OrderPaymentTransition::RequestPayment)?;
    uow.save_order(&order).await?;
    tracing::info!(%order_id, number = order.number(), "checkout completed");
    Ok(CommandOutcome::Applied("checkout_finalized"))
}

/// Hands the order's pending payment to `method_code`, e.g. when the shopper
/// switched method on the processor's hosted page.
pub(super) async fn take_over(
    ctx: &HandlerContext,
    uow: &mut dyn UnitOfWork,
    order_id: Uuid,
    method_code: MethodCode,
) -> Result<CommandOutcome, ReconcileError> {
    ctx.methods.require(&method_code)?;
    let mut order = load_order(uow, order_id).await?;

    let Some(last_id) = order
        .last_payment()
        .filter(|p| p.state() == PaymentState::New && p.method_code() != &method_code)
        .map(|p| p.id())
    else {
        return Ok(CommandOutcome::Skipped("no pending payment to take over"));
    };
    if let Some(payment) = order.payment_mut(last_id) {
        payment.rebind_method(method_code.clone());
    }
    uow.save_order(&order).await?;
    tracing::info!(%order_id, payment_id = %last_id, %method_code, "payment taken over");
    Ok(CommandOutcome::Applied("payment_taken_over"))
}
