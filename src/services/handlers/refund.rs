use {
    super::{CommandOutcome, HandlerContext, load_order_for_payment, payment_of, reference::create_reference},
    crate::{
        domain::{
            error::ReconcileError,
            notification::NotificationItem,
            order::Order,
            reference::NewReference,
            refund::Refund,
            store::UnitOfWork,
        },
        services::refund_aggregator,
        workflow::RefundTransition,
    },
    uuid::Uuid,
};

/// Refund webhook. Completes the refund an operator requested earlier, or
/// creates and completes one sized from the notification.
pub(super) async fn refund(
    ctx: &HandlerContext,
    uow: &mut dyn UnitOfWork,
    payment_id: Uuid,
    notification: Option<&NotificationItem>,
) -> Result<CommandOutcome, ReconcileError> {
    let mut order = load_order_for_payment(uow, payment_id).await?;
    let method_code = payment_of(&order, payment_id)?.method_code().clone();

    let known = match notification {
        Some(n) => uow.find_reference(&method_code, &n.psp_reference).await?,
        None => None,
    };

    let refund_id = match known {
        Some(reference) => match reference.refund_id {
            Some(refund_id) => refund_id,
            None => {
                tracing::warn!(
                    psp_reference = %reference.psp_reference,
                    %payment_id,
                    "refund reference already bound to the payment alone, ignoring"
                );
                return Ok(CommandOutcome::Skipped("reference has no refund"));
            }
        },
        None => {
            let refund_id = open_refund(&mut order, payment_id, notification)?;
            if !complete_and_settle(ctx, &mut order, payment_id, refund_id)? {
                return Ok(CommandOutcome::Skipped("refund already completed"));
            }
            uow.save_order(&order).await?;
            if let Some(n) = notification {
                create_reference(
                    uow,
                    NewReference::for_refund(method_code, n.psp_reference.clone(), payment_id, refund_id),
                )
                .await?;
            }
            return Ok(CommandOutcome::Applied("refund_completed"));
        }
    };

    if !complete_and_settle(ctx, &mut order, payment_id, refund_id)? {
        return Ok(CommandOutcome::Skipped("refund already completed"));
    }
    uow.save_order(&order).await?;
    Ok(CommandOutcome::Applied("refund_completed"))
}

/// A failed notification for a refund psp the ledger knows. Marks the
/// pending refund failed so its amount can be requested again. `None` when
/// the psp belongs to no pending refund.
pub(super) async fn fail_pending(
    ctx: &HandlerContext,
    uow: &mut dyn UnitOfWork,
    payment_id: Uuid,
    notification: &NotificationItem,
) -> Result<Option<CommandOutcome>, ReconcileError> {
    let mut order = load_order_for_payment(uow, payment_id).await?;
    let method_code = payment_of(&order, payment_id)?.method_code().clone();
    let Some(refund_id) = uow
        .find_reference(&method_code, &notification.psp_reference)
        .await?
        .and_then(|r| r.refund_id)
    else {
        return Ok(None);
    };

    let refund = order
        .refund_mut(refund_id)
        .ok_or_else(|| ReconcileError::NotFound(format!("refund {refund_id}")))?;
    if !ctx.machine.apply_if_allowed(&mut *refund, RefundTransition::Fail)? {
        return Ok(Some(CommandOutcome::Skipped("refund not pending")));
    }
    uow.save_order(&order).await?;
    tracing::warn!(
        %payment_id,
        %refund_id,
        reason = notification.reason.as_deref().unwrap_or_default(),
        "refund refused by processor"
    );
    Ok(Some(CommandOutcome::Applied("refund_failed")))
}

/// Adds a `new` refund for the notification amount, or the whole payment
/// when the notification carries none. Refuses to exceed what is left.
pub(super) fn open_refund(
    order: &mut Order,
    payment_id: Uuid,
    notification: Option<&NotificationItem>,
) -> Result<Uuid, ReconcileError> {
    let payment = payment_of(order, payment_id)?;
    let money = notification
        .and_then(|n| n.amount)
        .unwrap_or(*payment.money());

    if money.currency() != payment.money().currency() {
        return Err(ReconcileError::InvariantViolation(format!(
            "refund in {} against payment {payment_id} in {}",
            money.currency(),
            payment.money().currency()
        )));
    }
    let remaining = payment
        .money()
        .amount()
        .remaining_after(order.completed_refund_total(payment_id));
    if money.amount() > remaining {
        return Err(ReconcileError::InvariantViolation(format!(
            "refund of {} exceeds the {remaining} left on payment {payment_id}",
            money.amount()
        )));
    }

    let refund = Refund::new(order.id(), payment_id, payment.method_code().clone(), money);
    order.add_refund(refund)
}

/// Completes the refund and re-derives the settlement status. `false` when
/// the refund was already completed.
pub(super) fn complete_and_settle(
    ctx: &HandlerContext,
    order: &mut Order,
    payment_id: Uuid,
    refund_id: Uuid,
) -> Result<bool, ReconcileError> {
    let refund = order
        .refund_mut(refund_id)
        .ok_or_else(|| ReconcileError::NotFound(format!("refund {refund_id}")))?;
    if !ctx.machine.apply_if_allowed(&mut *refund, RefundTransition::Complete)? {
        return Ok(false);
    }

    let settled = refund_aggregator::settle(&ctx.machine, order, payment_id)?;
    tracing::info!(%payment_id, %refund_id, order_payment_state = %settled, "refund completed");
    Ok(true)
}
