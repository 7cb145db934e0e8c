use {
    super::CommandOutcome,
    crate::domain::{
        error::ReconcileError,
        reference::{NewReference, Reference, ReferenceWrite},
        store::UnitOfWork,
    },
};

/// Create-or-touch in the reference ledger. Returns whichever row now owns
/// the pair.
pub async fn create_reference(
    uow: &mut dyn UnitOfWork,
    reference: NewReference,
) -> Result<Reference, ReconcileError> {
    let write = uow.add_reference(reference).await?;
    match &write {
        ReferenceWrite::Created(r) => tracing::debug!(
            method_code = %r.method_code,
            psp_reference = %r.psp_reference,
            payment_id = %r.payment_id,
            "reference created"
        ),
        ReferenceWrite::Touched(r) => tracing::debug!(
            method_code = %r.method_code,
            psp_reference = %r.psp_reference,
            payment_id = %r.payment_id,
            "reference already known, touched"
        ),
    }
    Ok(write.into_reference())
}

pub(super) async fn handle(
    uow: &mut dyn UnitOfWork,
    reference: NewReference,
) -> Result<CommandOutcome, ReconcileError> {
    match uow.add_reference(reference).await? {
        ReferenceWrite::Created(_) => Ok(CommandOutcome::Applied("reference_created")),
        ReferenceWrite::Touched(_) => Ok(CommandOutcome::Skipped("reference touched")),
    }
}
