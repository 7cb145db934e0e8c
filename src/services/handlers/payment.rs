use {
    super::{
        CommandOutcome, HandlerContext, load_order_for_payment, payment_mut, record_notification,
        reference::create_reference, refund, sync_order_payment_state,
    },
    crate::{
        domain::{
            error::ReconcileError, notification::NotificationItem, reference::NewReference,
            store::UnitOfWork,
        },
        workflow::PaymentTransition,
    },
    uuid::Uuid,
};

/// Guard-then-apply one payment transition, record the event, follow up on
/// the order. Shared by every webhook-driven payment handler.
async fn transition_payment(
    ctx: &HandlerContext,
    uow: &mut dyn UnitOfWork,
    payment_id: Uuid,
    transition: PaymentTransition,
    notification: Option<&NotificationItem>,
) -> Result<CommandOutcome, ReconcileError> {
    let mut order = load_order_for_payment(uow, payment_id).await?;
    let payment = payment_mut(&mut order, payment_id)?;

    if !ctx.machine.can(&*payment, transition) {
        tracing::debug!(
            %payment_id,
            %transition,
            state = %payment.state(),
            "transition not applicable, ignoring"
        );
        return Ok(CommandOutcome::Skipped("transition not applicable"));
    }
    ctx.machine.apply(&mut *payment, transition)?;
    record_notification(payment, notification)?;

    sync_order_payment_state(ctx, &mut order, payment_id)?;
    uow.save_order(&order).await?;
    Ok(CommandOutcome::Applied(transition.as_str()))
}

/// Authorisation success. Automatic-capture payments complete right away.
pub(super) async fn authorize(
    ctx: &HandlerContext,
    uow: &mut dyn UnitOfWork,
    payment_id: Uuid,
    notification: Option<&NotificationItem>,
) -> Result<CommandOutcome, ReconcileError> {
    let order = load_order_for_payment(uow, payment_id).await?;
    let method_code = super::payment_of(&order, payment_id)?.method_code().clone();

    let transition = if ctx.methods.is_auto_capture(&method_code) {
        PaymentTransition::Capture
    } else {
        PaymentTransition::Authorize
    };
    transition_payment(ctx, uow, payment_id, transition, notification).await
}

/// Payment-link flows have no reference before the authorisation; record
/// one for the item, then authorise as usual.
pub(super) async fn authorize_pay_by_link(
    ctx: &HandlerContext,
    uow: &mut dyn UnitOfWork,
    payment_id: Uuid,
    notification: &NotificationItem,
) -> Result<CommandOutcome, ReconcileError> {
    let order = load_order_for_payment(uow, payment_id).await?;
    let method_code = super::payment_of(&order, payment_id)?.method_code().clone();

    create_reference(
        uow,
        NewReference::for_payment(method_code, notification.psp_reference.clone(), payment_id),
    )
    .await?;

    authorize(ctx, uow, payment_id, Some(notification)).await
}

pub(super) async fn capture(
    ctx: &HandlerContext,
    uow: &mut dyn UnitOfWork,
    payment_id: Uuid,
    notification: Option<&NotificationItem>,
) -> Result<CommandOutcome, ReconcileError> {
    transition_payment(ctx, uow, payment_id, PaymentTransition::Capture, notification).await
}

/// Any unsuccessful event. The reason stays in the detail map. A refused
/// refund fails the refund instead of the payment.
pub(super) async fn fail(
    ctx: &HandlerContext,
    uow: &mut dyn UnitOfWork,
    payment_id: Uuid,
    notification: Option<&NotificationItem>,
) -> Result<CommandOutcome, ReconcileError> {
    if let Some(n) = notification {
        if let Some(outcome) = refund::fail_pending(ctx, uow, payment_id, n).await? {
            return Ok(outcome);
        }
    }
    transition_payment(ctx, uow, payment_id, PaymentTransition::Fail, notification).await
}

pub(super) async fn cancel(
    ctx: &HandlerContext,
    uow: &mut dyn UnitOfWork,
    payment_id: Uuid,
    notification: Option<&NotificationItem>,
) -> Result<CommandOutcome, ReconcileError> {
    transition_payment(ctx, uow, payment_id, PaymentTransition::Cancel, notification).await
}

/// The processor accepted the payment but has no outcome yet.
pub(super) async fn process(
    ctx: &HandlerContext,
    uow: &mut dyn UnitOfWork,
    payment_id: Uuid,
    notification: Option<&NotificationItem>,
) -> Result<CommandOutcome, ReconcileError> {
    transition_payment(ctx, uow, payment_id, PaymentTransition::Process, notification).await
}
