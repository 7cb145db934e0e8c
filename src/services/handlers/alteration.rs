//! Operator-initiated modifications sent to the processor. None of these
//! move a payment; the webhook that follows does.

use {
    super::{CommandOutcome, HandlerContext, load_order_for_payment, payment_of, reference::create_reference},
    crate::{
        domain::{
            error::ReconcileError,
            id::PspReference,
            money::{Money, MoneyAmount},
            order::{Order, OrderState},
            payment::{Payment, PaymentState},
            provider::{ModificationRequest, ModificationStatus},
            reference::NewReference,
            refund::Refund,
            store::UnitOfWork,
        },
    },
    uuid::Uuid,
};

/// Builds the processor request for a modification of `payment`.
pub(super) fn modification_request(
    ctx: &HandlerContext,
    order: &Order,
    payment: &Payment,
    amount: Option<Money>,
) -> Result<ModificationRequest, ReconcileError> {
    let method = ctx.methods.require(payment.method_code())?;
    let psp_reference = payment.psp_reference().ok_or_else(|| {
        ReconcileError::InvariantViolation(format!(
            "payment {} has no processor reference to modify",
            payment.id()
        ))
    })?;
    Ok(ModificationRequest {
        merchant_account: method.merchant_account.clone(),
        payment_psp_reference: psp_reference,
        amount: amount.unwrap_or(*payment.money()),
        reference: order.number().to_string(),
    })
}

/// Shared preconditions of capture and cancellation requests.
fn require_authorized_on_open_order<'o>(
    ctx: &HandlerContext,
    order: &'o Order,
    payment_id: Uuid,
    action: &str,
) -> Result<&'o Payment, ReconcileError> {
    let payment = payment_of(order, payment_id)?;
    if order.state() != OrderState::New {
        return Err(ReconcileError::Validation(format!(
            "cannot {action} payment {payment_id}: order {} is {}",
            order.number(),
            order.state()
        )));
    }
    if !ctx.methods.is_adyen(payment.method_code()) {
        return Err(ReconcileError::Validation(format!(
            "cannot {action} payment {payment_id}: method {} is not processed by Adyen",
            payment.method_code()
        )));
    }
    if payment.state() != PaymentState::Authorized {
        return Err(ReconcileError::Validation(format!(
            "cannot {action} payment {payment_id} in state {}",
            payment.state()
        )));
    }
    Ok(payment)
}

pub(super) async fn request_capture(
    ctx: &HandlerContext,
    uow: &mut dyn UnitOfWork,
    payment_id: Uuid,
) -> Result<CommandOutcome, ReconcileError> {
    let order = load_order_for_payment(uow, payment_id).await?;
    let payment = require_authorized_on_open_order(ctx, &order, payment_id, "capture")?;
    let request = modification_request(ctx, &order, payment, None)?;

    let response = ctx.gateway.request_capture(&request).await?;
    acknowledge(uow, payment, response.psp_reference, response.status, "capture_requested").await
}

pub(super) async fn request_cancellation(
    ctx: &HandlerContext,
    uow: &mut dyn UnitOfWork,
    payment_id: Uuid,
) -> Result<CommandOutcome, ReconcileError> {
    let order = load_order_for_payment(uow, payment_id).await?;
    let payment = require_authorized_on_open_order(ctx, &order, payment_id, "cancel")?;
    let request = modification_request(ctx, &order, payment, None)?;

    let response = ctx.gateway.request_cancellation(&request).await?;
    acknowledge(
        uow,
        payment,
        response.psp_reference,
        response.status,
        "cancellation_requested",
    )
    .await
}

/// Records the modification reference so its webhook finds the payment.
async fn acknowledge(
    uow: &mut dyn UnitOfWork,
    payment: &Payment,
    psp_reference: PspReference,
    status: ModificationStatus,
    label: &'static str,
) -> Result<CommandOutcome, ReconcileError> {
    if status != ModificationStatus::Received {
        tracing::warn!(payment_id = %payment.id(), ?status, label, "modification not acknowledged");
        return Ok(CommandOutcome::Skipped("modification not acknowledged"));
    }
    create_reference(
        uow,
        NewReference::for_payment(payment.method_code().clone(), psp_reference, payment.id()),
    )
    .await?;
    Ok(CommandOutcome::Applied(label))
}

/// Opens a `new` refund and asks the processor for it. The amount defaults
/// to whatever has not been refunded or requested yet.
pub(super) async fn request_refund(
    ctx: &HandlerContext,
    uow: &mut dyn UnitOfWork,
    payment_id: Uuid,
    amount: Option<MoneyAmount>,
) -> Result<CommandOutcome, ReconcileError> {
    let mut order = load_order_for_payment(uow, payment_id).await?;
    let payment = payment_of(&order, payment_id)?;

    if !ctx.methods.is_adyen(payment.method_code()) || payment.state() != PaymentState::Completed {
        return Err(ReconcileError::Validation(format!(
            "payment {payment_id} must be a completed Adyen payment to refund, is {}",
            payment.state()
        )));
    }

    let remaining = payment
        .money()
        .amount()
        .remaining_after(order.committed_refund_total(payment_id));
    let amount = amount.unwrap_or(remaining);
    if amount == MoneyAmount::ZERO || amount > remaining {
        return Err(ReconcileError::Validation(format!(
            "refund of {amount} on payment {payment_id} must be positive and at most {remaining}"
        )));
    }

    let money = Money::new(amount, payment.money().currency());
    let method_code = payment.method_code().clone();
    let mut request = modification_request(ctx, &order, payment, Some(money))?;
    let refund = Refund::new(order.id(), payment_id, method_code.clone(), money);
    request.reference = refund.id().to_string();
    let refund_id = order.add_refund(refund)?;
    uow.save_order(&order).await?;

    let response = ctx.gateway.request_refund(&request).await?;
    if response.status != ModificationStatus::Received {
        return Err(ReconcileError::Gateway(format!(
            "refund of payment {payment_id} not acknowledged: {:?}",
            response.status
        )));
    }
    create_reference(
        uow,
        NewReference::for_refund(method_code, response.psp_reference, payment_id, refund_id),
    )
    .await?;
    tracing::info!(%payment_id, %refund_id, %amount, "refund requested");
    Ok(CommandOutcome::Applied("refund_requested"))
}
