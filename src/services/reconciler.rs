//! Entry points for both the webhook path and the synchronous checkout path.
//!
//! Each notification item runs in its own unit of work: classify, resolve
//! the payment, build one command, run its handler, commit. Anything that
//! goes wrong for one item is logged and the rest of the batch carries on.

use {
    super::{
        classifier::{EventKey, EventOutcome, classify},
        commands::{Command, CommandFactory},
        handlers::{self, CommandOutcome, HandlerContext},
    },
    crate::{
        domain::{
            error::ReconcileError,
            id::MethodCode,
            method::PaymentMethods,
            money::MoneyAmount,
            notification::{CheckoutResult, NotificationItem},
            payment::DETAIL_PSP_REFERENCE,
            provider::ProcessorGateway,
            reference::NewReference,
            store::{LedgerStore, UnitOfWork},
        },
        workflow::StateMachine,
    },
    std::sync::Arc,
    uuid::Uuid,
};

/// What happened to one notification item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Handled {
        command: &'static str,
        outcome: CommandOutcome,
    },
    /// No local payment for the item's references.
    Unresolved { psp_reference: String },
    Unmapped { event_code: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub applied: usize,
    pub skipped: usize,
    pub unresolved: usize,
    pub unmapped: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn record(&mut self, result: &Result<ItemOutcome, ReconcileError>) {
        match result {
            Ok(ItemOutcome::Handled { outcome, .. }) if outcome.is_applied() => self.applied += 1,
            Ok(ItemOutcome::Handled { .. }) => self.skipped += 1,
            Ok(ItemOutcome::Unresolved { .. }) => self.unresolved += 1,
            Ok(ItemOutcome::Unmapped { .. }) => self.unmapped += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.applied + self.skipped + self.unresolved + self.unmapped + self.failed
    }
}

pub struct Reconciler {
    store: Arc<dyn LedgerStore>,
    ctx: HandlerContext,
    factory: CommandFactory,
}

impl Reconciler {
    /// Standard graphs with the processor guards installed, default factory.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        methods: Arc<PaymentMethods>,
        gateway: Arc<dyn ProcessorGateway>,
    ) -> Self {
        let machine = StateMachine::with_processor_guards(Arc::clone(&methods));
        Self {
            store,
            ctx: HandlerContext {
                machine: Arc::new(machine),
                methods,
                gateway,
            },
            factory: CommandFactory::default(),
        }
    }

    pub fn with_factory(mut self, factory: CommandFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Swaps in a host-owned machine, e.g. one carrying extra guards.
    pub fn with_state_machine(mut self, machine: Arc<StateMachine>) -> Self {
        self.ctx.machine = machine;
        self
    }

    pub fn methods(&self) -> &PaymentMethods {
        &self.ctx.methods
    }

    pub fn state_machine(&self) -> &StateMachine {
        &self.ctx.machine
    }

    /// Runs one verified notification item to completion.
    #[tracing::instrument(
        name = "notification_item",
        skip_all,
        fields(
            method_code = %method_code,
            event_code = %item.event_code,
            psp_reference = %item.psp_reference,
            success = item.success,
        )
    )]
    pub async fn process_item(
        &self,
        method_code: &MethodCode,
        item: &NotificationItem,
    ) -> Result<ItemOutcome, ReconcileError> {
        let key = match classify(item) {
            EventOutcome::Mapped(key) => key,
            EventOutcome::Unmapped { event_code } => {
                tracing::info!(%event_code, "unmapped event, skipping");
                return Ok(ItemOutcome::Unmapped { event_code });
            }
        };

        let mut uow = self.store.begin().await?;
        let Some(payment_id) = resolve_payment(&mut *uow, method_code, key, item).await? else {
            tracing::warn!(event = %key, "no payment for notification, skipping");
            return Ok(ItemOutcome::Unresolved {
                psp_reference: item.payment_reference().to_string(),
            });
        };

        let outcome = self.dispatch(&mut *uow, key, payment_id, item).await?;
        uow.commit().await?;
        Ok(outcome)
    }

    /// Processes every item independently. Never fails: per-item errors are
    /// logged and counted.
    pub async fn process_batch(
        &self,
        method_code: &MethodCode,
        items: &[NotificationItem],
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for item in items {
            let result = self.process_item(method_code, item).await;
            if let Err(e) = &result {
                tracing::error!(
                    error = %e,
                    event_code = %item.event_code,
                    psp_reference = %item.psp_reference,
                    "notification item failed"
                );
            }
            summary.record(&result);
        }
        tracing::info!(
            applied = summary.applied,
            skipped = summary.skipped,
            unresolved = summary.unresolved,
            unmapped = summary.unmapped,
            failed = summary.failed,
            "notification batch processed"
        );
        summary
    }

    /// Applies the processor's immediate answer to a payment submission.
    /// Shares the webhook pipeline so a later webhook for the same event is
    /// a guarded no-op.
    #[tracing::instrument(
        name = "checkout_result",
        skip_all,
        fields(%payment_id, result_code = %result.result_code, psp_reference = %result.psp_reference)
    )]
    pub async fn process_checkout_result(
        &self,
        payment_id: Uuid,
        result: &CheckoutResult,
    ) -> Result<ItemOutcome, ReconcileError> {
        let mut uow = self.store.begin().await?;
        let mut order = uow
            .load_order_for_payment(payment_id)
            .await?
            .ok_or_else(|| ReconcileError::NotFound(format!("order for payment {payment_id}")))?;
        // Unmapped result codes still leave their psp in the ledger.
        let item = match result.to_notification(order.number()) {
            Ok(item) => Some(item),
            Err(e) if e.is_non_fatal() => None,
            Err(e) => return Err(e),
        };

        let payment = order
            .payment_mut(payment_id)
            .ok_or_else(|| ReconcileError::NotFound(format!("payment {payment_id}")))?;
        let method_code = payment.method_code().clone();
        if payment.psp_reference().is_none() {
            payment.set_detail(DETAIL_PSP_REFERENCE, result.psp_reference.as_str());
        }
        let order_id = order.id();
        uow.save_order(&order).await?;

        handlers::create_reference(
            &mut *uow,
            NewReference::for_payment(method_code, result.psp_reference.clone(), payment_id),
        )
        .await?;

        let Some(item) = item else {
            uow.commit().await?;
            tracing::info!("checkout result not mapped, psp recorded");
            return Ok(ItemOutcome::Unmapped {
                event_code: result.result_code.to_ascii_lowercase(),
            });
        };

        if !result.is_failure() {
            handlers::handle(&self.ctx, &mut *uow, Command::Finalize { order_id }).await?;
        }

        let outcome = match classify(&item) {
            EventOutcome::Mapped(key) => self.dispatch(&mut *uow, key, payment_id, &item).await?,
            EventOutcome::Unmapped { event_code } => ItemOutcome::Unmapped { event_code },
        };
        uow.commit().await?;
        Ok(outcome)
    }

    /// Runs one command in its own unit of work. Used by the admin surface.
    pub async fn execute(&self, command: Command) -> Result<CommandOutcome, ReconcileError> {
        let mut uow = self.store.begin().await?;
        let outcome = handlers::handle(&self.ctx, &mut *uow, command).await?;
        uow.commit().await?;
        Ok(outcome)
    }

    pub async fn request_capture(&self, payment_id: Uuid) -> Result<CommandOutcome, ReconcileError> {
        self.execute(Command::RequestCapture { payment_id }).await
    }

    pub async fn request_cancellation(
        &self,
        payment_id: Uuid,
    ) -> Result<CommandOutcome, ReconcileError> {
        self.execute(Command::RequestCancellation { payment_id }).await
    }

    pub async fn request_refund(
        &self,
        payment_id: Uuid,
        amount: Option<MoneyAmount>,
    ) -> Result<CommandOutcome, ReconcileError> {
        self.execute(Command::RequestRefund { payment_id, amount }).await
    }

    pub async fn reverse(&self, payment_id: Uuid) -> Result<CommandOutcome, ReconcileError> {
        self.execute(Command::Reverse { payment_id }).await
    }

    pub async fn take_over(
        &self,
        order_id: Uuid,
        method_code: MethodCode,
    ) -> Result<CommandOutcome, ReconcileError> {
        self.methods().require(&method_code)?;
        self.execute(Command::TakeOver {
            order_id,
            method_code,
        })
        .await
    }

    async fn dispatch(
        &self,
        uow: &mut dyn UnitOfWork,
        key: EventKey,
        payment_id: Uuid,
        item: &NotificationItem,
    ) -> Result<ItemOutcome, ReconcileError> {
        let order = uow
            .load_order_for_payment(payment_id)
            .await?
            .ok_or_else(|| ReconcileError::NotFound(format!("order for payment {payment_id}")))?;
        let payment = order
            .payment(payment_id)
            .ok_or_else(|| ReconcileError::NotFound(format!("payment {payment_id}")))?;

        let command = match self.factory.create_for_event(key, payment, Some(item)) {
            Ok(command) => command,
            Err(e) if e.is_non_fatal() => {
                tracing::info!(event = %key, "no command registered, skipping");
                return Ok(ItemOutcome::Unmapped {
                    event_code: key.to_string(),
                });
            }
            Err(e) => return Err(e),
        };
        let name = command.name();
        let outcome = handlers::handle(&self.ctx, uow, command).await?;
        Ok(ItemOutcome::Handled {
            command: name,
            outcome,
        })
    }
}

/// Finds the local payment a notification is about. Pay-by-link payments are
/// found through their link id, everything else through the ledger.
async fn resolve_payment(
    uow: &mut dyn UnitOfWork,
    method_code: &MethodCode,
    key: EventKey,
    item: &NotificationItem,
) -> Result<Option<Uuid>, ReconcileError> {
    if key == EventKey::PayByLinkAuthorised {
        if let Some(link_id) = item.payment_link_id() {
            return uow.find_payment_by_link_id(link_id).await;
        }
    }

    if let Some(reference) = uow.find_reference(method_code, item.payment_reference()).await? {
        return Ok(Some(reference.payment_id));
    }
    if item.original_reference.is_some() {
        if let Some(reference) = uow.find_reference(method_code, &item.psp_reference).await? {
            return Ok(Some(reference.payment_id));
        }
    }
    Ok(None)
}
