use {
    crate::domain::{
        error::ReconcileError,
        id::{MethodCode, PspReference},
        money::{Currency, Money, MoneyAmount},
        order::{CheckoutState, Order, OrderParams, OrderPaymentState, OrderState},
        payment::{Payment, PaymentParams, PaymentState},
        provider::BoxFuture,
        reference::{NewReference, Reference, ReferenceWrite},
        refund::{Refund, RefundParams, RefundState},
        store::{LedgerStore, UnitOfWork},
    },
    chrono::{DateTime, Utc},
    sqlx::{PgConnection, PgPool, Postgres, Transaction},
    uuid::Uuid,
};

type ReferenceRow = (Uuid, String, String, Uuid, Option<Uuid>, DateTime<Utc>, DateTime<Utc>);
type PaymentRow = (
    Uuid,
    Uuid,
    String,
    i64,
    String,
    String,
    serde_json::Value,
    DateTime<Utc>,
    DateTime<Utc>,
);
type RefundRow = (Uuid, Uuid, Uuid, String, i64, String, String, DateTime<Utc>, DateTime<Utc>);

const REFERENCE_COLUMNS: &str =
    "id, method_code, psp_reference, payment_id, refund_id, created_at, updated_at";

#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl LedgerStore for PgLedger {
    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn UnitOfWork>, ReconcileError>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;
            // Row locks taken by load_order wait at most this long.
            sqlx::query("SET LOCAL lock_timeout = '5s'")
                .execute(&mut *tx)
                .await?;
            Ok(Box::new(PgUnitOfWork { tx }) as Box<dyn UnitOfWork>)
        })
    }
}

struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

fn reference_from_row(row: ReferenceRow) -> Result<Reference, ReconcileError> {
    let (id, method_code, psp_reference, payment_id, refund_id, created_at, updated_at) = row;
    Ok(Reference {
        id,
        method_code: MethodCode::new(method_code)?,
        psp_reference: PspReference::new(psp_reference)?,
        payment_id,
        refund_id,
        created_at,
        updated_at,
    })
}

fn money_from_columns(amount: i64, currency: &str) -> Result<Money, ReconcileError> {
    Ok(Money::new(MoneyAmount::new(amount)?, Currency::try_from(currency)?))
}

fn payment_from_row(row: PaymentRow) -> Result<Payment, ReconcileError> {
    let (id, order_id, method_code, amount, currency, state, details, created_at, updated_at) = row;
    let details = match details {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    Ok(Payment::restore(PaymentParams {
        id,
        order_id,
        method_code: MethodCode::new(method_code)?,
        money: money_from_columns(amount, &currency)?,
        state: PaymentState::try_from(state.as_str())?,
        details,
        created_at,
        updated_at,
    }))
}

fn refund_from_row(row: RefundRow) -> Result<Refund, ReconcileError> {
    let (id, order_id, payment_id, method_code, amount, currency, state, created_at, updated_at) = row;
    Ok(Refund::restore(RefundParams {
        id,
        order_id,
        payment_id,
        method_code: MethodCode::new(method_code)?,
        money: money_from_columns(amount, &currency)?,
        state: RefundState::try_from(state.as_str())?,
        created_at,
        updated_at,
    }))
}

/// Locks the order row, then reads its payments and refunds.
async fn fetch_order(conn: &mut PgConnection, order_id: Uuid) -> Result<Option<Order>, ReconcileError> {
    let row = sqlx::query_as::<_, (Uuid, String, String, String, String)>(
        "SELECT id, number, state, checkout_state, payment_state FROM orders WHERE id = $1 FOR UPDATE",
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some((id, number, state, checkout_state, payment_state)) = row else {
        return Ok(None);
    };

    let payments = sqlx::query_as::<_, PaymentRow>(
        "SELECT id, order_id, method_code, amount, currency, state, details, created_at, updated_at \
         FROM payments WHERE order_id = $1 ORDER BY created_at, id",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(payment_from_row)
    .collect::<Result<Vec<_>, _>>()?;

    let refunds = sqlx::query_as::<_, RefundRow>(
        "SELECT id, order_id, payment_id, method_code, amount, currency, state, created_at, updated_at \
         FROM refunds WHERE order_id = $1 ORDER BY created_at, id",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(refund_from_row)
    .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(Order::restore(OrderParams {
        id,
        number,
        state: OrderState::try_from(state.as_str())?,
        checkout_state: CheckoutState::try_from(checkout_state.as_str())?,
        payment_state: OrderPaymentState::try_from(payment_state.as_str())?,
        payments,
        refunds,
    })))
}

impl UnitOfWork for PgUnitOfWork {
    fn find_reference<'a>(
        &'a mut self,
        method_code: &'a MethodCode,
        psp_reference: &'a PspReference,
    ) -> BoxFuture<'a, Result<Option<Reference>, ReconcileError>> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, ReferenceRow>(&format!(
                "SELECT {REFERENCE_COLUMNS} FROM payment_references \
                 WHERE method_code = $1 AND psp_reference = $2"
            ))
            .bind(method_code.as_str())
            .bind(psp_reference.as_str())
            .fetch_optional(&mut *self.tx)
            .await?;
            row.map(reference_from_row).transpose()
        })
    }

    fn add_reference(
        &mut self,
        reference: NewReference,
    ) -> BoxFuture<'_, Result<ReferenceWrite, ReconcileError>> {
        Box::pin(async move {
            // xmax is 0 only for a row this statement inserted.
            let (id, method_code, psp_reference, payment_id, refund_id, created_at, updated_at, inserted) =
                sqlx::query_as::<
                    _,
                    (Uuid, String, String, Uuid, Option<Uuid>, DateTime<Utc>, DateTime<Utc>, bool),
                >(&format!(
                    "INSERT INTO payment_references \
                         (id, method_code, psp_reference, payment_id, refund_id, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, now(), now()) \
                     ON CONFLICT (method_code, psp_reference) DO UPDATE SET updated_at = now() \
                     RETURNING {REFERENCE_COLUMNS}, (xmax = 0) AS inserted"
                ))
                .bind(Uuid::now_v7())
                .bind(reference.method_code.as_str())
                .bind(reference.psp_reference.as_str())
                .bind(reference.payment_id)
                .bind(reference.refund_id)
                .fetch_one(&mut *self.tx)
                .await?;

            let stored = reference_from_row((
                id,
                method_code,
                psp_reference,
                payment_id,
                refund_id,
                created_at,
                updated_at,
            ))?;
            Ok(if inserted {
                ReferenceWrite::Created(stored)
            } else {
                ReferenceWrite::Touched(stored)
            })
        })
    }

    fn references_for_payment(
        &mut self,
        payment_id: Uuid,
    ) -> BoxFuture<'_, Result<Vec<Reference>, ReconcileError>> {
        Box::pin(async move {
            sqlx::query_as::<_, ReferenceRow>(&format!(
                "SELECT {REFERENCE_COLUMNS} FROM payment_references \
                 WHERE payment_id = $1 ORDER BY created_at, id"
            ))
            .bind(payment_id)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(reference_from_row)
            .collect()
        })
    }

    fn load_order(&mut self, order_id: Uuid) -> BoxFuture<'_, Result<Option<Order>, ReconcileError>> {
        Box::pin(async move { fetch_order(&mut self.tx, order_id).await })
    }

    fn load_order_for_payment(
        &mut self,
        payment_id: Uuid,
    ) -> BoxFuture<'_, Result<Option<Order>, ReconcileError>> {
        Box::pin(async move {
            let order_id =
                sqlx::query_scalar::<_, Uuid>("SELECT order_id FROM payments WHERE id = $1")
                    .bind(payment_id)
                    .fetch_optional(&mut *self.tx)
                    .await?;
            match order_id {
                Some(order_id) => fetch_order(&mut self.tx, order_id).await,
                None => Ok(None),
            }
        })
    }

    fn find_payment_by_link_id<'a>(
        &'a mut self,
        link_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Uuid>, ReconcileError>> {
        Box::pin(async move {
            let id = sqlx::query_scalar::<_, Uuid>(
                "SELECT id FROM payments WHERE details ->> 'paymentLinkId' = $1 \
                 ORDER BY created_at DESC LIMIT 1",
            )
            .bind(link_id)
            .fetch_optional(&mut *self.tx)
            .await?;
            Ok(id)
        })
    }

    fn save_order<'a>(&'a mut self, order: &'a Order) -> BoxFuture<'a, Result<(), ReconcileError>> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO orders (id, number, state, checkout_state, payment_state) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (id) DO UPDATE SET \
                     state = EXCLUDED.state, \
                     checkout_state = EXCLUDED.checkout_state, \
                     payment_state = EXCLUDED.payment_state, \
                     updated_at = now()",
            )
            .bind(order.id())
            .bind(order.number())
            .bind(order.state().as_str())
            .bind(order.checkout_state().as_str())
            .bind(order.payment_state().as_str())
            .execute(&mut *self.tx)
            .await?;

            for payment in order.payments() {
                sqlx::query(
                    "INSERT INTO payments \
                         (id, order_id, method_code, amount, currency, state, details, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                     ON CONFLICT (id) DO UPDATE SET \
                         method_code = EXCLUDED.method_code, \
                         state = EXCLUDED.state, \
                         details = EXCLUDED.details, \
                         updated_at = now()",
                )
                .bind(payment.id())
                .bind(payment.order_id())
                .bind(payment.method_code().as_str())
                .bind(payment.money().amount().minor())
                .bind(payment.money().currency().as_str())
                .bind(payment.state().as_str())
                .bind(serde_json::Value::Object(payment.details().clone()))
                .bind(payment.created_at())
                .bind(payment.updated_at())
                .execute(&mut *self.tx)
                .await?;
            }

            for refund in order.refunds() {
                sqlx::query(
                    "INSERT INTO refunds \
                         (id, order_id, payment_id, method_code, amount, currency, state, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                     ON CONFLICT (id) DO UPDATE SET state = EXCLUDED.state, updated_at = now()",
                )
                .bind(refund.id())
                .bind(refund.order_id())
                .bind(refund.payment_id())
                .bind(refund.method_code().as_str())
                .bind(refund.money().amount().minor())
                .bind(refund.money().currency().as_str())
                .bind(refund.state().as_str())
                .bind(refund.created_at())
                .bind(refund.updated_at())
                .execute(&mut *self.tx)
                .await?;
            }
            Ok(())
        })
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), ReconcileError>> {
        Box::pin(async move {
            self.tx.commit().await?;
            Ok(())
        })
    }
}
