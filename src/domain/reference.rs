use {
    super::id::{MethodCode, PspReference},
    chrono::{DateTime, Utc},
    serde::Serialize,
    uuid::Uuid,
};

/// Correlates a processor reference with a local payment (and, for refund
/// modifications, with the refund it created). At most one per
/// `(method_code, psp_reference)`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Reference {
    pub id: Uuid,
    pub method_code: MethodCode,
    pub psp_reference: PspReference,
    pub payment_id: Uuid,
    pub refund_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReference {
    pub method_code: MethodCode,
    pub psp_reference: PspReference,
    pub payment_id: Uuid,
    pub refund_id: Option<Uuid>,
}

impl NewReference {
    pub fn for_payment(method_code: MethodCode, psp_reference: PspReference, payment_id: Uuid) -> Self {
        Self {
            method_code,
            psp_reference,
            payment_id,
            refund_id: None,
        }
    }

    pub fn for_refund(
        method_code: MethodCode,
        psp_reference: PspReference,
        payment_id: Uuid,
        refund_id: Uuid,
    ) -> Self {
        Self {
            method_code,
            psp_reference,
            payment_id,
            refund_id: Some(refund_id),
        }
    }

    pub fn into_reference(self, now: DateTime<Utc>) -> Reference {
        Reference {
            id: Uuid::now_v7(),
            method_code: self.method_code,
            psp_reference: self.psp_reference,
            payment_id: self.payment_id,
            refund_id: self.refund_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// What `add` did with a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceWrite {
    Created(Reference),
    /// A row already existed for the pair; only its timestamp moved.
    Touched(Reference),
}

impl ReferenceWrite {
    pub fn reference(&self) -> &Reference {
        match self {
            Self::Created(r) | Self::Touched(r) => r,
        }
    }

    pub fn into_reference(self) -> Reference {
        match self {
            Self::Created(r) | Self::Touched(r) => r,
        }
    }
}
