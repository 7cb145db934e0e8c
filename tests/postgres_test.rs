//! Ledger behaviour against a real database. Needs Postgres on
//! localhost:5432; run with `cargo test -- --ignored`.

mod common;

use adyen_reconcile::domain::order::{Order, OrderPaymentState};
use adyen_reconcile::domain::payment::{Payment, PaymentState};
use adyen_reconcile::domain::reference::{NewReference, ReferenceWrite};
use adyen_reconcile::domain::refund::RefundState;
use adyen_reconcile::domain::store::{LedgerStore, UnitOfWork};
use adyen_reconcile::infra::postgres::PgLedger;
use adyen_reconcile::services::reconciler::Reconciler;
use common::*;
use std::sync::Arc;
use uuid::Uuid;

const DB: &str = "adyen_reconcile_test_ledger";

async fn ledger() -> PgLedger {
    PgLedger::new(setup_pool(DB).await)
}

async fn seed(ledger: &PgLedger, method: &str, minor: i64) -> (Uuid, Uuid) {
    let mut order = Order::new(format!("R{}", Uuid::now_v7().simple()));
    let payment_id = order
        .add_payment(Payment::new(order.id(), code(method), eur(minor)))
        .unwrap();
    let mut uow = ledger.begin().await.unwrap();
    uow.save_order(&order).await.unwrap();
    uow.commit().await.unwrap();
    (order.id(), payment_id)
}

async fn load(ledger: &PgLedger, order_id: Uuid) -> Order {
    let mut uow = ledger.begin().await.unwrap();
    uow.load_order(order_id).await.unwrap().expect("order not found")
}

// ── 1. order_roundtrip ─────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "needs postgres"]
async fn order_roundtrip() {
    let ledger = ledger().await;
    let (order_id, payment_id) = seed(&ledger, AUTO, 1130).await;

    let order = load(&ledger, order_id).await;
    let payment = order.payment(payment_id).unwrap();
    assert_eq!(payment.state(), PaymentState::New);
    assert_eq!(*payment.money(), eur(1130));
    assert_eq!(payment.method_code(), &code(AUTO));
    assert_eq!(order.payment_state(), OrderPaymentState::Cart);

    let mut uow = ledger.begin().await.unwrap();
    let same = uow.load_order_for_payment(payment_id).await.unwrap().unwrap();
    assert_eq!(same.id(), order_id);
}

// ── 2. reference_create_or_touch ───────────────────────────────────────────

#[tokio::test]
#[ignore = "needs postgres"]
async fn reference_create_or_touch() {
    let ledger = ledger().await;
    let (_, payment_id) = seed(&ledger, AUTO, 500).await;
    let (_, other_payment) = seed(&ledger, AUTO, 500).await;
    let psp_reference = format!("PG-{}", Uuid::now_v7().simple());

    let mut uow = ledger.begin().await.unwrap();
    let first = uow
        .add_reference(NewReference::for_payment(code(AUTO), psp(&psp_reference), payment_id))
        .await
        .unwrap();
    assert!(matches!(first, ReferenceWrite::Created(_)));

    let second = uow
        .add_reference(NewReference::for_payment(code(AUTO), psp(&psp_reference), other_payment))
        .await
        .unwrap();
    let ReferenceWrite::Touched(touched) = second else {
        panic!("expected touch");
    };
    assert_eq!(touched.payment_id, payment_id, "first link wins");
    uow.commit().await.unwrap();

    let mut uow = ledger.begin().await.unwrap();
    let found = uow
        .find_reference(&code(AUTO), &psp(&psp_reference))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.payment_id, payment_id);
    assert!(uow
        .find_reference(&code(MANUAL), &psp(&psp_reference))
        .await
        .unwrap()
        .is_none());
    assert_eq!(uow.references_for_payment(payment_id).await.unwrap().len(), 1);
}

// ── 3. uncommitted_unit_of_work_rolls_back ─────────────────────────────────

#[tokio::test]
#[ignore = "needs postgres"]
async fn uncommitted_unit_of_work_rolls_back() {
    let ledger = ledger().await;
    let (_, payment_id) = seed(&ledger, AUTO, 500).await;
    let psp_reference = format!("PG-{}", Uuid::now_v7().simple());

    {
        let mut uow = ledger.begin().await.unwrap();
        uow.add_reference(NewReference::for_payment(code(AUTO), psp(&psp_reference), payment_id))
            .await
            .unwrap();
    }

    let mut uow = ledger.begin().await.unwrap();
    assert!(uow
        .find_reference(&code(AUTO), &psp(&psp_reference))
        .await
        .unwrap()
        .is_none());
}

// ── 4. lifecycle_through_reconciler ────────────────────────────────────────

#[tokio::test]
#[ignore = "needs postgres"]
async fn lifecycle_through_reconciler() {
    let ledger = ledger().await;
    let gateway = Arc::new(FakeGateway::new());
    let reconciler = Reconciler::new(Arc::new(ledger.clone()), methods(), gateway);
    let (order_id, payment_id) = seed(&ledger, AUTO, 1000).await;
    let psp_reference = format!("PG-{}", Uuid::now_v7().simple());

    reconciler
        .process_checkout_result(payment_id, &checkout_result("Authorised", &psp_reference))
        .await
        .unwrap();
    let order = load(&ledger, order_id).await;
    assert_eq!(order.payment(payment_id).unwrap().state(), PaymentState::Completed);
    assert_eq!(order.payment_state(), OrderPaymentState::Paid);

    for (i, part) in [400, 600].into_iter().enumerate() {
        let webhook = modification("REFUND", &format!("{psp_reference}-RF{i}"), &psp_reference, Some(part));
        reconciler.process_item(&code(AUTO), &webhook).await.unwrap();
    }

    let order = load(&ledger, order_id).await;
    assert_eq!(order.refunds().len(), 2);
    assert!(order.refunds().iter().all(|r| r.state() == RefundState::Completed));
    assert_eq!(order.payment_state(), OrderPaymentState::Refunded);
    assert_eq!(order.payment(payment_id).unwrap().state(), PaymentState::Refunded);
}

// ── 5. pay_by_link_lookup ──────────────────────────────────────────────────

#[tokio::test]
#[ignore = "needs postgres"]
async fn pay_by_link_lookup() {
    let ledger = ledger().await;
    let link_id = format!("PL-{}", Uuid::now_v7().simple());
    let mut order = Order::new(format!("R{}", Uuid::now_v7().simple()));
    let mut payment = Payment::new(order.id(), code(AUTO), eur(900));
    payment.set_detail("paymentLinkId", link_id.as_str());
    let payment_id = order.add_payment(payment).unwrap();

    let mut uow = ledger.begin().await.unwrap();
    uow.save_order(&order).await.unwrap();
    uow.commit().await.unwrap();

    let mut uow = ledger.begin().await.unwrap();
    assert_eq!(uow.find_payment_by_link_id(&link_id).await.unwrap(), Some(payment_id));
    assert_eq!(uow.find_payment_by_link_id("PL-missing").await.unwrap(), None);
}
