use {
    super::error::ReconcileError,
    super::id::{MethodCode, PspReference},
    super::order::Order,
    super::provider::BoxFuture,
    super::reference::{NewReference, Reference, ReferenceWrite},
    uuid::Uuid,
};

/// Opens transactions against the ledger.
pub trait LedgerStore: Send + Sync {
    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn UnitOfWork>, ReconcileError>>;
}

/// One transaction. Dropping it without `commit` discards every write.
pub trait UnitOfWork: Send {
    fn find_reference<'a>(
        &'a mut self,
        method_code: &'a MethodCode,
        psp_reference: &'a PspReference,
    ) -> BoxFuture<'a, Result<Option<Reference>, ReconcileError>>;

    /// Create-or-touch. When the pair already exists, its timestamp is
    /// refreshed and the stored links win over `reference`.
    fn add_reference(
        &mut self,
        reference: NewReference,
    ) -> BoxFuture<'_, Result<ReferenceWrite, ReconcileError>>;

    fn references_for_payment(
        &mut self,
        payment_id: Uuid,
    ) -> BoxFuture<'_, Result<Vec<Reference>, ReconcileError>>;

    /// Loads an order with its payments and refunds, locked for this unit
    /// of work.
    fn load_order(&mut self, order_id: Uuid) -> BoxFuture<'_, Result<Option<Order>, ReconcileError>>;

    fn load_order_for_payment(
        &mut self,
        payment_id: Uuid,
    ) -> BoxFuture<'_, Result<Option<Order>, ReconcileError>>;

    fn find_payment_by_link_id<'a>(
        &'a mut self,
        link_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Uuid>, ReconcileError>>;

    /// Writes the order's states and upserts its payments and refunds.
    fn save_order<'a>(&'a mut self, order: &'a Order) -> BoxFuture<'a, Result<(), ReconcileError>>;

    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), ReconcileError>>;
}
