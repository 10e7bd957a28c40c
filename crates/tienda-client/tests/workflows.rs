//! Sale and purchase-order submission against the stub API.

mod common;

use tienda_client::{AdminConsole, ClientError, Credentials, SaleComposer};
use tienda_core::{DraftRejection, Money, OrderStatus, Product, Quantity, SubmissionPhase};

use common::{product_json, Stub, PASSWORD, USERNAME};

const BRANCH: i64 = 1;

async fn logged_in(stub: &Stub) -> AdminConsole {
    let console = stub.console();
    console
        .services()
        .auth
        .login(&Credentials::new(USERNAME, PASSWORD))
        .await
        .unwrap();
    console
}

fn product(id: i64, name: &str, price: &str) -> Product {
    serde_json::from_value(product_json(id, name, price)).unwrap()
}

/// Three lines of 10, 5 and 2 units of products 1, 2 and 3.
fn compose(sale: &SaleComposer) {
    sale.with_draft_mut(|d| {
        d.set_branch(Some(BRANCH));
        d.set_payment_method(Some(1));
        d.set_client(Some(4));
        for (id, name, price, qty) in [
            (1, "Arroz 1kg", "8.50", 10),
            (2, "Aceite 900ml", "15.00", 5),
            (3, "Azúcar 1kg", "7.20", 2),
        ] {
            let line = d.add_line().unwrap();
            d.set_line_product(line, &product(id, name, price)).unwrap();
            d.set_line_quantity(line, Quantity::from_units(qty)).unwrap();
        }
    })
    .unwrap();
}

#[tokio::test]
async fn test_shortages_reject_without_posting() {
    let stub = Stub::start().await;
    stub.set_stock(BRANCH, 1, 4); // short
    stub.set_stock(BRANCH, 2, 50);
    // Product 3 has no row at this branch: short as well.
    stub.set_stock(2, 3, 100);
    let console = logged_in(&stub).await;

    let sale = console.new_sale();
    compose(&sale);

    let err = sale.submit().await.unwrap_err();
    let ClientError::Draft(DraftRejection::InsufficientStock(shortages)) = &err else {
        panic!("expected a stock rejection, got {:?}", err);
    };
    assert_eq!(shortages.len(), 2);
    assert_eq!(
        err.user_message(),
        "Stock insuficiente para Arroz 1kg. Disponible: 4, Solicitado: 10\n\
         Stock insuficiente para Azúcar 1kg. Disponible: 0, Solicitado: 2"
    );

    assert_eq!(sale.phase(), SubmissionPhase::Rejected);
    assert_eq!(sale.with_draft(|d| d.items.len()), 3);
    assert_eq!(stub.calls_to("GET", "/inventory/").len(), 1);
    assert!(stub.calls_to("POST", "/sales").is_empty());
}

#[tokio::test]
async fn test_sufficient_stock_submits_once() {
    let stub = Stub::start().await;
    stub.set_stock(BRANCH, 1, 10);
    stub.set_stock(BRANCH, 2, 5);
    stub.set_stock(BRANCH, 3, 8);
    let console = logged_in(&stub).await;

    let sale = console.new_sale();
    compose(&sale);
    sale.with_draft_mut(|d| d.set_discount(Money::from_cents(1000)))
        .unwrap();

    let submitted = sale.submit().await.unwrap();
    assert_eq!(submitted.message, "Venta creada exitosamente");
    assert_eq!(
        submitted.detail_path,
        format!("/ventas/{}", submitted.sale.sale_id)
    );
    assert_eq!(submitted.sale.status, "COMPLETADA");
    assert_eq!(submitted.sale.discount, Money::from_cents(1000));

    let posts = stub.calls_to("POST", "/sales");
    assert_eq!(posts.len(), 1);
    let body = &posts[0].body;
    assert_eq!(body["branch_id"], BRANCH);
    assert_eq!(body["payment_method_id"], 1);
    assert_eq!(body["client_id"], 4);
    assert_eq!(body["discount"], "10.00");
    assert_eq!(body["items"].as_array().unwrap().len(), 3);
    // Prices are the ones seen when the product was picked.
    assert_eq!(body["items"][1]["product_id"], 2);
    assert_eq!(body["items"][1]["unit_price"], "15.00");
    assert_eq!(body["items"][1]["quantity"], "5");

    // The draft is discarded after success.
    assert_eq!(sale.phase(), SubmissionPhase::Submitted);
    assert!(sale.with_draft(|d| d.items.is_empty()));
}

#[tokio::test]
async fn test_paginated_stock_reply_does_not_reject_sale() {
    let stub = Stub::start().await;
    stub.set_stock(BRANCH, 1, 10);
    stub.set_stock(BRANCH, 2, 5);
    stub.set_stock(BRANCH, 3, 8);
    stub.paginate_inventory(1);
    let console = logged_in(&stub).await;

    let sale = console.new_sale();
    compose(&sale);

    sale.submit().await.unwrap();
    assert_eq!(sale.phase(), SubmissionPhase::Submitted);
    assert_eq!(stub.calls_to("POST", "/sales").len(), 1);
}

#[tokio::test]
async fn test_sale_without_login_is_refused_locally() {
    let stub = Stub::start().await;
    stub.set_stock(BRANCH, 1, 10);
    let console = stub.console();

    let sale = console.new_sale();
    compose(&sale);

    let err = sale.submit().await.unwrap_err();
    assert!(matches!(err, ClientError::NotAuthenticated));
    assert!(stub.calls().is_empty());
    assert_eq!(sale.with_draft(|d| d.items.len()), 3);
}

#[tokio::test]
async fn test_edit_during_submission_is_refused() {
    let stub = Stub::start().await;
    stub.set_stock(BRANCH, 1, 10);
    stub.set_stock(BRANCH, 2, 5);
    stub.set_stock(BRANCH, 3, 2);
    let console = logged_in(&stub).await;

    let sale = console.new_sale();
    compose(&sale);

    let submit = sale.submit();
    tokio::pin!(submit);
    // First poll runs up to the stock request.
    assert!(futures_util::poll!(&mut submit).is_pending());
    assert!(sale.is_submitting());

    let edit = sale.with_draft_mut(|d| d.set_client(None));
    assert!(matches!(edit, Err(ClientError::Busy)));

    submit.await.unwrap();
    assert_eq!(stub.calls_to("POST", "/sales")[0].body["client_id"], 4);
    assert!(sale.with_draft(|d| d.items.is_empty()));
    sale.with_draft_mut(|d| d.set_client(Some(9))).unwrap();
}

#[tokio::test]
async fn test_concurrent_submit_is_refused() {
    let stub = Stub::start().await;
    stub.set_stock(BRANCH, 1, 10);
    stub.set_stock(BRANCH, 2, 5);
    stub.set_stock(BRANCH, 3, 2);
    let console = logged_in(&stub).await;

    let sale = console.new_sale();
    compose(&sale);

    let (first, second) = tokio::join!(sale.submit(), sale.submit());
    let outcomes = [first.is_ok(), second.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    let busy = [first, second]
        .into_iter()
        .filter_map(Result::err)
        .collect::<Vec<_>>();
    assert!(matches!(busy.as_slice(), [ClientError::Busy]));
    assert_eq!(stub.calls_to("POST", "/sales").len(), 1);
}

#[tokio::test]
async fn test_purchase_order_created_and_approved() {
    let stub = Stub::start().await;
    let console = logged_in(&stub).await;

    let order = console.new_purchase_order(Some(7));
    order.with_draft_mut(|d| {
        d.set_branch(Some(BRANCH));
        d.add_line(1, "Arroz 1kg".into(), Quantity::from_units(3), Money::from_cents(600))
            .unwrap();
        d.add_line(1, "Arroz 1kg".into(), Quantity::from_units(4), Money::from_cents(600))
            .unwrap();
    })
    .unwrap();

    let submitted = order.submit().await.unwrap();
    let order_id = submitted.order.order_id;
    assert!(submitted.approved);
    assert!(submitted.approval_error.is_none());
    assert_eq!(
        submitted.message,
        format!("Pedido #{} creado y aprobado exitosamente!", order_id)
    );

    let posts = stub.calls_to("POST", "/suppliers/orders/");
    assert_eq!(posts.len(), 1);
    let body = &posts[0].body;
    assert_eq!(body["supplier_id"], 7);
    assert!(body.get("status").is_none());
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], "7");

    let approvals = stub.calls_to("POST", &format!("/suppliers/orders/{}/approve", order_id));
    assert_eq!(approvals.len(), 1);

    // Fresh draft, still bound to the supplier.
    let draft = order.draft();
    assert!(draft.items.is_empty());
    assert_eq!(draft.supplier_id, Some(7));
}

#[tokio::test]
async fn test_failed_approval_keeps_created_order() {
    let stub = Stub::start().await;
    stub.fail_approval();
    let console = logged_in(&stub).await;

    let order = console.new_purchase_order(Some(7));
    order.with_draft_mut(|d| {
        d.set_branch(Some(BRANCH));
        d.add_line(2, "Aceite 900ml".into(), Quantity::from_units(12), Money::from_cents(1100))
            .unwrap();
    })
    .unwrap();

    let submitted = order.submit().await.unwrap();
    assert!(!submitted.approved);
    assert_eq!(submitted.order.status, OrderStatus::Pending);
    assert_eq!(
        submitted.approval_error.as_deref(),
        Some("Aprobación no disponible")
    );
    assert!(submitted.message.contains("no se pudo aprobar"));
    assert!(order.draft().items.is_empty());
    assert_eq!(stub.calls_to("POST", "/suppliers/orders/").len(), 1);
}
