//! `kf checkout` commands.

use std::path::Path;

use kickforge_client::AppState;
use kickforge_client::api::PaymentCompletion;
use kickforge_client::services::CheckoutService;
use kickforge_core::ShippingAddress;

use super::cart::print_summary;
use super::{CommandError, money, read_file, read_line};

pub async fn quote(state: &AppState) {
    if state.cart().await.is_empty() {
        println!("Your cart is empty.");
        return;
    }
    print_summary(state).await;
}

/// Start a payment, hand the launch details to the gateway, and finish the
/// order with the gateway's response.
pub async fn pay(state: &AppState, address: &Path) -> Result<(), CommandError> {
    let shipping: ShippingAddress = serde_json::from_slice(&read_file(address).await?)
        .map_err(|source| CommandError::Json {
            what: "shipping address",
            source,
        })?;

    let checkout = CheckoutService::new(state);
    let launch = checkout.begin(&shipping).await?;
    let launch_json = serde_json::to_string_pretty(&launch).map_err(|source| CommandError::Json {
        what: "checkout details",
        source,
    })?;

    println!("Open the payment sheet with:");
    println!("{launch_json}");
    println!();
    println!("Once paid, paste the gateway response (one line of JSON):");

    let response = read_line().await?;
    let completion: PaymentCompletion =
        serde_json::from_str(&response).map_err(|source| CommandError::Json {
            what: "payment response",
            source,
        })?;

    let receipt = checkout.complete(&launch, &completion, &shipping).await?;
    println!(
        "Order {} placed: {} item(s), {} paid (payment {}).",
        receipt.order_id,
        receipt.item_count,
        money(receipt.summary.total, receipt.summary.currency),
        receipt.payment_id
    );
    println!("Shipping to {}", shipping.one_line());
    Ok(())
}
