use {
    crate::domain::{error::ReconcileError, notification::NotificationItem},
    std::fmt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReversalOutcome {
    Cancelled,
    Refunded,
}

/// Canonical events the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKey {
    Authorised,
    PayByLinkAuthorised,
    Captured,
    CaptureFailed,
    Cancelled,
    Refunded,
    Received,
    Reversed(ReversalOutcome),
    PaymentFailed,
}

impl EventKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorised => "authorised",
            Self::PayByLinkAuthorised => "pay_by_link_authorised",
            Self::Captured => "captured",
            Self::CaptureFailed => "capture_failed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::Received => "received",
            Self::Reversed(ReversalOutcome::Cancelled) => "reversal_cancelled",
            Self::Reversed(ReversalOutcome::Refunded) => "reversal_refunded",
            Self::PaymentFailed => "payment_failed",
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Mapped(EventKey),
    /// The processor's vocabulary is larger than ours.
    Unmapped { event_code: String },
}

impl EventOutcome {
    pub fn key(&self) -> Option<EventKey> {
        match self {
            Self::Mapped(key) => Some(*key),
            Self::Unmapped { .. } => None,
        }
    }

    pub fn into_key(self) -> Result<EventKey, ReconcileError> {
        match self {
            Self::Mapped(key) => Ok(key),
            Self::Unmapped { event_code } => Err(ReconcileError::UnmappedAction { event: event_code }),
        }
    }
}

/// Resolves a verified notification to one canonical event.
pub fn classify(item: &NotificationItem) -> EventOutcome {
    if !item.success {
        return EventOutcome::Mapped(EventKey::PaymentFailed);
    }

    let key = match item.event_code.as_str() {
        "authorisation" if item.payment_link_id().is_some() => EventKey::PayByLinkAuthorised,
        "authorisation" => EventKey::Authorised,
        "capture" => EventKey::Captured,
        "capture_failed" => EventKey::CaptureFailed,
        "cancellation" => EventKey::Cancelled,
        "refund" => EventKey::Refunded,
        "received" => EventKey::Received,
        "cancel_or_refund" => match classify_modification(item) {
            Some(outcome) => EventKey::Reversed(outcome),
            None => {
                return EventOutcome::Unmapped {
                    event_code: format!(
                        "{}/{}",
                        item.event_code,
                        item.modification_action().unwrap_or("<missing action>")
                    ),
                };
            }
        },
        other => {
            return EventOutcome::Unmapped {
                event_code: other.to_string(),
            };
        }
    };

    EventOutcome::Mapped(key)
}

/// Second stage for the combined cancel-or-refund result.
fn classify_modification(item: &NotificationItem) -> Option<ReversalOutcome> {
    match item.modification_action()?.to_ascii_lowercase().as_str() {
        "cancel" => Some(ReversalOutcome::Cancelled),
        "refund" => Some(ReversalOutcome::Refunded),
        _ => None,
    }
}
