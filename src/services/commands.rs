use {
    super::classifier::{EventKey, ReversalOutcome},
    crate::domain::{
        error::ReconcileError,
        id::MethodCode,
        money::MoneyAmount,
        notification::NotificationItem,
        payment::Payment,
        reference::NewReference,
    },
    std::collections::HashMap,
    uuid::Uuid,
};

/// One unit of intent against the ledger. Each variant has one handler.
#[derive(Debug, Clone)]
pub enum Command {
    CreateReference(NewReference),
    Authorize {
        payment_id: Uuid,
        notification: Option<NotificationItem>,
    },
    PayByLinkAuthorize {
        payment_id: Uuid,
        notification: NotificationItem,
    },
    Capture {
        payment_id: Uuid,
        notification: Option<NotificationItem>,
    },
    RecoverCaptureFailure {
        payment_id: Uuid,
        notification: Option<NotificationItem>,
    },
    Fail {
        payment_id: Uuid,
        notification: Option<NotificationItem>,
    },
    Cancel {
        payment_id: Uuid,
        notification: Option<NotificationItem>,
    },
    Process {
        payment_id: Uuid,
        notification: Option<NotificationItem>,
    },
    Refund {
        payment_id: Uuid,
        notification: Option<NotificationItem>,
    },
    ResolveReversal {
        payment_id: Uuid,
        outcome: ReversalOutcome,
        notification: Option<NotificationItem>,
    },
    Finalize {
        order_id: Uuid,
    },
    TakeOver {
        order_id: Uuid,
        method_code: MethodCode,
    },
    RequestCapture {
        payment_id: Uuid,
    },
    RequestCancellation {
        payment_id: Uuid,
    },
    RequestRefund {
        payment_id: Uuid,
        amount: Option<MoneyAmount>,
    },
    Reverse {
        payment_id: Uuid,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateReference(_) => "create_reference",
            Self::Authorize { .. } => "authorize",
            Self::PayByLinkAuthorize { .. } => "pay_by_link_authorize",
            Self::Capture { .. } => "capture",
            Self::RecoverCaptureFailure { .. } => "recover_capture_failure",
            Self::Fail { .. } => "fail",
            Self::Cancel { .. } => "cancel",
            Self::Process { .. } => "process",
            Self::Refund { .. } => "refund",
            Self::ResolveReversal { .. } => "resolve_reversal",
            Self::Finalize { .. } => "finalize",
            Self::TakeOver { .. } => "take_over",
            Self::RequestCapture { .. } => "request_capture",
            Self::RequestCancellation { .. } => "request_cancellation",
            Self::RequestRefund { .. } => "request_refund",
            Self::Reverse { .. } => "reverse",
        }
    }
}

pub type CommandConstructor = fn(&Payment, Option<&NotificationItem>) -> Option<Command>;

/// Event key → command constructor. Entries can be replaced or removed.
#[derive(Clone)]
pub struct CommandFactory {
    table: HashMap<EventKey, CommandConstructor>,
}

impl Default for CommandFactory {
    fn default() -> Self {
        let mut table: HashMap<EventKey, CommandConstructor> = HashMap::new();
        table.insert(EventKey::Authorised, |p, n| {
            Some(Command::Authorize {
                payment_id: p.id(),
                notification: n.cloned(),
            })
        });
        table.insert(EventKey::PayByLinkAuthorised, |p, n| {
            n.map(|n| Command::PayByLinkAuthorize {
                payment_id: p.id(),
                notification: n.clone(),
            })
        });
        table.insert(EventKey::Captured, |p, n| {
            Some(Command::Capture {
                payment_id: p.id(),
                notification: n.cloned(),
            })
        });
        table.insert(EventKey::CaptureFailed, |p, n| {
            Some(Command::RecoverCaptureFailure {
                payment_id: p.id(),
                notification: n.cloned(),
            })
        });
        table.insert(EventKey::Cancelled, |p, n| {
            Some(Command::Cancel {
                payment_id: p.id(),
                notification: n.cloned(),
            })
        });
        table.insert(EventKey::Refunded, |p, n| {
            Some(Command::Refund {
                payment_id: p.id(),
                notification: n.cloned(),
            })
        });
        table.insert(EventKey::Received, |p, n| {
            Some(Command::Process {
                payment_id: p.id(),
                notification: n.cloned(),
            })
        });
        table.insert(EventKey::Reversed(ReversalOutcome::Cancelled), |p, n| {
            Some(Command::ResolveReversal {
                payment_id: p.id(),
                outcome: ReversalOutcome::Cancelled,
                notification: n.cloned(),
            })
        });
        table.insert(EventKey::Reversed(ReversalOutcome::Refunded), |p, n| {
            Some(Command::ResolveReversal {
                payment_id: p.id(),
                outcome: ReversalOutcome::Refunded,
                notification: n.cloned(),
            })
        });
        table.insert(EventKey::PaymentFailed, |p, n| {
            Some(Command::Fail {
                payment_id: p.id(),
                notification: n.cloned(),
            })
        });
        Self { table }
    }
}

impl CommandFactory {
    pub fn with_mapping(mut self, key: EventKey, constructor: CommandConstructor) -> Self {
        self.table.insert(key, constructor);
        self
    }

    pub fn without_mapping(mut self, key: EventKey) -> Self {
        self.table.remove(&key);
        self
    }

    /// `UnmappedAction` when no entry exists or the entry declines the input.
    pub fn create_for_event(
        &self,
        key: EventKey,
        payment: &Payment,
        notification: Option<&NotificationItem>,
    ) -> Result<Command, ReconcileError> {
        self.table
            .get(&key)
            .and_then(|constructor| constructor(payment, notification))
            .ok_or_else(|| ReconcileError::UnmappedAction {
                event: key.to_string(),
            })
    }
}
