//! Process-local ledger. One unit of work at a time holds the whole store,
//! works on a copy, and swaps it in on commit.

use {
    crate::domain::{
        error::ReconcileError,
        id::{MethodCode, PspReference},
        order::Order,
        provider::BoxFuture,
        reference::{NewReference, Reference, ReferenceWrite},
        store::{LedgerStore, UnitOfWork},
    },
    chrono::Utc,
    std::{collections::HashMap, sync::Arc},
    tokio::sync::{Mutex, OwnedMutexGuard},
    uuid::Uuid,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    orders: HashMap<Uuid, Order>,
    references: HashMap<(MethodCode, PspReference), Reference>,
}

impl Tables {
    fn order_id_for_payment(&self, payment_id: Uuid) -> Option<Uuid> {
        self.orders
            .values()
            .find(|o| o.payment(payment_id).is_some())
            .map(|o| o.id())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryLedger {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or replaces an order outside any unit of work.
    pub async fn insert_order(&self, order: Order) {
        self.tables.lock().await.orders.insert(order.id(), order);
    }

    pub async fn order(&self, order_id: Uuid) -> Option<Order> {
        self.tables.lock().await.orders.get(&order_id).cloned()
    }

    pub async fn order_for_payment(&self, payment_id: Uuid) -> Option<Order> {
        let tables = self.tables.lock().await;
        let order_id = tables.order_id_for_payment(payment_id)?;
        tables.orders.get(&order_id).cloned()
    }

    /// Every reference, oldest first.
    pub async fn references(&self) -> Vec<Reference> {
        let mut refs: Vec<_> = self.tables.lock().await.references.values().cloned().collect();
        refs.sort_by_key(|r| (r.created_at, r.id));
        refs
    }
}

impl LedgerStore for InMemoryLedger {
    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn UnitOfWork>, ReconcileError>> {
        Box::pin(async move {
            let guard = Arc::clone(&self.tables).lock_owned().await;
            let working = guard.clone();
            Ok(Box::new(InMemoryUnitOfWork { guard, working }) as Box<dyn UnitOfWork>)
        })
    }
}

struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

impl UnitOfWork for InMemoryUnitOfWork {
    fn find_reference<'a>(
        &'a mut self,
        method_code: &'a MethodCode,
        psp_reference: &'a PspReference,
    ) -> BoxFuture<'a, Result<Option<Reference>, ReconcileError>> {
        let found = self
            .working
            .references
            .get(&(method_code.clone(), psp_reference.clone()))
            .cloned();
        Box::pin(async move { Ok(found) })
    }

    fn add_reference(
        &mut self,
        reference: NewReference,
    ) -> BoxFuture<'_, Result<ReferenceWrite, ReconcileError>> {
        Box::pin(async move {
            let now = Utc::now();
            let key = (reference.method_code.clone(), reference.psp_reference.clone());
            if let Some(existing) = self.working.references.get_mut(&key) {
                existing.updated_at = now;
                return Ok(ReferenceWrite::Touched(existing.clone()));
            }
            if self.working.order_id_for_payment(reference.payment_id).is_none() {
                return Err(ReconcileError::InvariantViolation(format!(
                    "reference {} points at unknown payment {}",
                    reference.psp_reference, reference.payment_id
                )));
            }
            let created = reference.into_reference(now);
            self.working.references.insert(key, created.clone());
            Ok(ReferenceWrite::Created(created))
        })
    }

    fn references_for_payment(
        &mut self,
        payment_id: Uuid,
    ) -> BoxFuture<'_, Result<Vec<Reference>, ReconcileError>> {
        let mut refs: Vec<_> = self
            .working
            .references
            .values()
            .filter(|r| r.payment_id == payment_id)
            .cloned()
            .collect();
        refs.sort_by_key(|r| (r.created_at, r.id));
        Box::pin(async move { Ok(refs) })
    }

    fn load_order(&mut self, order_id: Uuid) -> BoxFuture<'_, Result<Option<Order>, ReconcileError>> {
        let order = self.working.orders.get(&order_id).cloned();
        Box::pin(async move { Ok(order) })
    }

    fn load_order_for_payment(
        &mut self,
        payment_id: Uuid,
    ) -> BoxFuture<'_, Result<Option<Order>, ReconcileError>> {
        let order = self
            .working
            .order_id_for_payment(payment_id)
            .and_then(|id| self.working.orders.get(&id))
            .cloned();
        Box::pin(async move { Ok(order) })
    }

    fn find_payment_by_link_id<'a>(
        &'a mut self,
        link_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Uuid>, ReconcileError>> {
        let found = self
            .working
            .orders
            .values()
            .flat_map(|o| o.payments())
            .find(|p| p.payment_link_id() == Some(link_id))
            .map(|p| p.id());
        Box::pin(async move { Ok(found) })
    }

    fn save_order<'a>(&'a mut self, order: &'a Order) -> BoxFuture<'a, Result<(), ReconcileError>> {
        self.working.orders.insert(order.id(), order.clone());
        Box::pin(async move { Ok(()) })
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), ReconcileError>> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Box::pin(async move { Ok(()) })
    }
}
