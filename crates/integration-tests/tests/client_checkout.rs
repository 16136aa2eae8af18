//! Payment hand-off, verification and order recording against the fake backend.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use rust_decimal::Decimal;

use kickforge_client::api::PaymentCompletion;
use kickforge_client::services::{AuthService, CheckoutService, DesignService};
use kickforge_client::{AppState, ClientConfig, ClientError, ClientStore, ErrorKind};
use kickforge_core::{ColorMap, Design, LineItem, PaymentStatus, ShippingAddress};
use kickforge_integration_tests::FakeBackend;

const EMAIL: &str = "asha@kickforge.in";
const PASSWORD: &str = "hunter22!";

fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Asha Rao".to_owned(),
        phone: "+91 98765 43210".to_owned(),
        address_line1: "12 MG Road".to_owned(),
        address_line2: None,
        city: "Bengaluru".to_owned(),
        state: "Karnataka".to_owned(),
        postal_code: "560001".to_owned(),
        country: "India".to_owned(),
    }
}

/// A signed-in client with two pairs of one design in the cart.
async fn ready_to_pay(backend: &FakeBackend) -> AppState {
    backend.add_account("Asha", EMAIL, PASSWORD);
    let state = backend.client();
    AuthService::new(&state).login(EMAIL, PASSWORD).await.unwrap();

    let (design, _) = DesignService::new(&state)
        .save(Design::new("Night Court", ColorMap::new(), None))
        .await;
    state
        .add_to_cart(LineItem::for_design(&design, Decimal::new(2499, 0)).with_quantity(2))
        .await
        .unwrap();
    state
}

fn paid(order_id: &str) -> PaymentCompletion {
    PaymentCompletion {
        order_id: order_id.to_owned(),
        payment_id: "pay_kf001".to_owned(),
        signature: FakeBackend::signature(order_id, "pay_kf001"),
    }
}

#[tokio::test]
async fn test_checkout_places_order_and_empties_cart() {
    let backend = FakeBackend::start().await;
    let state = ready_to_pay(&backend).await;
    let checkout = CheckoutService::new(&state);
    let quote = checkout.quote().await;
    assert_eq!(quote.subtotal, Decimal::new(4998, 0));
    assert!(quote.ships_free());

    let launch = checkout.begin(&address()).await.unwrap();
    assert_eq!(launch.amount, quote.total_minor_units().unwrap());
    assert_eq!(launch.key, "rzp_test_kickforge");
    assert_eq!(launch.currency, "INR");
    assert_eq!(launch.description, "2 custom sneakers");
    assert_eq!(launch.prefill.email, EMAIL);
    assert!(launch.order_id.starts_with("order_"));

    let receipt = checkout
        .complete(&launch, &paid(&launch.order_id), &address())
        .await
        .unwrap();
    assert_eq!(receipt.status, PaymentStatus::Paid);
    assert_eq!(receipt.item_count, 2);
    assert_eq!(receipt.summary, quote);
    assert!(state.cart().await.is_empty());

    let orders = backend.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["gatewayOrderId"], launch.order_id.as_str());
    assert_eq!(orders[0]["paymentId"], "pay_kf001");
    assert_eq!(orders[0]["items"][0]["quantity"], 2);
    assert_eq!(orders[0]["shippingAddress"]["postalCode"], "560001");
    assert_eq!(orders[0]["subtotal"], 4998.0);
}

#[tokio::test]
async fn test_rejected_signature_keeps_cart() {
    let backend = FakeBackend::start().await;
    let state = ready_to_pay(&backend).await;
    let checkout = CheckoutService::new(&state);
    let launch = checkout.begin(&address()).await.unwrap();

    let mut forged = paid(&launch.order_id);
    forged.signature = "forged".to_owned();
    let err = checkout
        .complete(&launch, &forged, &address())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Payment);
    assert_eq!(state.cart_item_count().await, 2);
    assert!(backend.orders().is_empty());
}

#[tokio::test]
async fn test_completion_for_another_order_is_refused() {
    let backend = FakeBackend::start().await;
    let state = ready_to_pay(&backend).await;
    let checkout = CheckoutService::new(&state);
    let launch = checkout.begin(&address()).await.unwrap();

    let err = checkout
        .complete(&launch, &paid("order_someone_else"), &address())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::PaymentFailed(_)));
    assert!(backend.orders().is_empty());
}

#[tokio::test]
async fn test_cart_edits_after_begin_are_not_charged() {
    let backend = FakeBackend::start().await;
    let state = ready_to_pay(&backend).await;
    let checkout = CheckoutService::new(&state);
    let launch = checkout.begin(&address()).await.unwrap();

    // Another pair and a second design are added while the sheet is open.
    let id = state.cart().await.items()[0].design_id.clone();
    state.update_quantity(&id, 3).await.unwrap();
    let extra = Design::new("Late Addition", ColorMap::new(), None);
    state
        .add_to_cart(LineItem::for_design(&extra, Decimal::new(1999, 0)))
        .await
        .unwrap();

    let receipt = checkout
        .complete(&launch, &paid(&launch.order_id), &address())
        .await
        .unwrap();
    assert_eq!(receipt.item_count, 2);
    assert_eq!(receipt.summary, launch.summary);

    let orders = backend.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["items"].as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["items"][0]["quantity"], 2);
    assert_eq!(orders[0]["subtotal"], 4998.0);

    // Only what was paid for leaves the cart.
    let cart = state.cart().await;
    assert_eq!(cart.get(&id).unwrap().quantity, 1);
    assert_eq!(cart.get(&extra.id).unwrap().quantity, 1);
    assert_eq!(cart.item_count(), 2);
}

#[tokio::test]
async fn test_begin_validates_before_calling_gateway() {
    let backend = FakeBackend::start().await;
    let state = backend.client();
    let checkout = CheckoutService::new(&state);

    let err = checkout.begin(&address()).await.unwrap_err();
    assert!(matches!(err, ClientError::EmptyCart));

    let mut bad = address();
    bad.postal_code = "5600".to_owned();
    bad.city = String::new();
    let err = checkout.begin(&bad).await.unwrap_err();
    let fields = err.field_errors().unwrap();
    assert!(fields.contains_key("postal_code"));
    assert!(fields.contains_key("city"));
}

#[tokio::test]
async fn test_checkout_unavailable_without_gateway_key() {
    let backend = FakeBackend::start().await;
    let config = ClientConfig::for_api(backend.url().clone());
    let state = AppState::with_store(config, ClientStore::in_memory()).unwrap();
    let design = Design::new("Keyless", ColorMap::new(), None);
    state
        .add_to_cart(LineItem::for_design(&design, Decimal::new(2499, 0)))
        .await
        .unwrap();

    let err = CheckoutService::new(&state)
        .begin(&address())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::CheckoutUnavailable));
    assert_eq!(err.toast().message, "Checkout is not available right now.");
}
