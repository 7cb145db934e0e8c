use {
    super::{
        CommandOutcome, HandlerContext, alteration::modification_request, load_order_for_payment,
        payment_mut, payment_of, record_notification, reference::create_reference,
        refund::{complete_and_settle, open_refund},
    },
    crate::{
        domain::{
            error::ReconcileError,
            notification::NotificationItem,
            payment::PaymentState,
            provider::ModificationStatus,
            reference::NewReference,
            store::UnitOfWork,
        },
        services::classifier::ReversalOutcome,
        workflow::{OrderPaymentTransition, ReversalTransition},
    },
    uuid::Uuid,
};

/// Operator asks the processor to undo a completed automatic-capture
/// payment. Whether that ends as a cancel or a refund is only known when the
/// webhook arrives.
pub(super) async fn reverse(
    ctx: &HandlerContext,
    uow: &mut dyn UnitOfWork,
    payment_id: Uuid,
) -> Result<CommandOutcome, ReconcileError> {
    let mut order = load_order_for_payment(uow, payment_id).await?;
    let payment = payment_of(&order, payment_id)?;

    if !ctx.methods.is_auto_capture(payment.method_code()) || payment.state() != PaymentState::Completed {
        return Err(ReconcileError::Validation(format!(
            "payment {payment_id} must be a completed automatic-capture payment to be reversed, is {}",
            payment.state()
        )));
    }
    if !ctx.machine.can(payment, ReversalTransition::Reverse) {
        return Err(ReconcileError::Transition {
            graph: ctx.machine.graph_of::<ReversalTransition>().as_str(),
            transition: ReversalTransition::Reverse.to_string(),
            state: payment.state().to_string(),
        });
    }

    let request = modification_request(ctx, &order, payment, None)?;
    let response = ctx.gateway.request_reversal(&request).await?;

    if response.status != ModificationStatus::Received {
        tracing::warn!(%payment_id, status = ?response.status, "reversal not acknowledged");
        return Ok(CommandOutcome::Skipped("reversal not acknowledged"));
    }

    let payment = payment_mut(&mut order, payment_id)?;
    ctx.machine.apply(&mut *payment, ReversalTransition::Reverse)?;
    uow.save_order(&order).await?;
    // The resolving webhook carries this psp and links it once the outcome,
    // and any refund, is known.
    tracing::info!(%payment_id, psp_reference = %response.psp_reference, "reversal requested");
    Ok(CommandOutcome::Applied("reversal_requested"))
}

/// Settles a payment left in `processing_reversal` by the processor's
/// cancel-or-refund outcome.
pub(super) async fn resolve(
    ctx: &HandlerContext,
    uow: &mut dyn UnitOfWork,
    payment_id: Uuid,
    outcome: ReversalOutcome,
    notification: Option<&NotificationItem>,
) -> Result<CommandOutcome, ReconcileError> {
    let mut order = load_order_for_payment(uow, payment_id).await?;
    let method_code = payment_of(&order, payment_id)?.method_code().clone();
    let payment = payment_mut(&mut order, payment_id)?;

    let transition = match outcome {
        ReversalOutcome::Cancelled => ReversalTransition::ResolveCancelled,
        ReversalOutcome::Refunded => ReversalTransition::ResolveRefunded,
    };
    if !ctx.machine.can(&*payment, transition) {
        tracing::debug!(%payment_id, state = %payment.state(), %transition, "no reversal pending");
        return Ok(CommandOutcome::Skipped("no reversal pending"));
    }
    ctx.machine.apply(&mut *payment, transition)?;
    record_notification(payment, notification)?;

    match outcome {
        ReversalOutcome::Cancelled => {
            ctx.machine
                .apply_if_allowed(&mut order, OrderPaymentTransition::Cancel)?;
            uow.save_order(&order).await?;
            if let Some(n) = notification {
                create_reference(
                    uow,
                    NewReference::for_payment(method_code, n.psp_reference.clone(), payment_id),
                )
                .await?;
            }
        }
        ReversalOutcome::Refunded => {
            let refund_id = open_refund(&mut order, payment_id, notification)?;
            complete_and_settle(ctx, &mut order, payment_id, refund_id)?;
            uow.save_order(&order).await?;
            if let Some(n) = notification {
                create_reference(
                    uow,
                    NewReference::for_refund(method_code, n.psp_reference.clone(), payment_id, refund_id),
                )
                .await?;
            }
        }
    }
    Ok(CommandOutcome::Applied(transition.as_str()))
}
