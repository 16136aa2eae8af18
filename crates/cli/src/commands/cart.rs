//! `kf cart` commands.

use rust_decimal::Decimal;

use kickforge_client::AppState;
use kickforge_client::services::DesignService;
use kickforge_core::{DesignId, LineItem};

use super::{CommandError, money};

pub async fn show(state: &AppState) {
    let cart = state.cart().await;
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    let currency = state.pricing().currency;
    for item in cart.items() {
        println!(
            "{}  {}  {} x {} = {}",
            item.design_id,
            item.name,
            item.quantity,
            money(item.unit_price, currency),
            money(item.line_total(), currency),
        );
    }
    println!();
    print_summary(state).await;
}

pub async fn add(
    state: &AppState,
    design_id: &str,
    quantity: u32,
    price: Decimal,
) -> Result<(), CommandError> {
    if price <= Decimal::ZERO {
        return Err(CommandError::Usage("Price must be positive.".to_owned()));
    }

    let id = DesignId::new(design_id);
    let design = DesignService::new(state)
        .list()
        .await?
        .into_iter()
        .find(|design| design.id == id)
        .ok_or_else(|| CommandError::Usage(format!("No saved design with id {design_id}.")))?;

    let cart = state
        .add_to_cart(LineItem::for_design(&design, price).with_quantity(quantity))
        .await?;
    println!(
        "Added {} to your cart ({} item(s)).",
        design.name,
        cart.item_count()
    );
    Ok(())
}

pub async fn remove(state: &AppState, design_id: &str) -> Result<(), CommandError> {
    if state.remove_from_cart(&DesignId::new(design_id)).await? {
        println!("Removed.");
    } else {
        println!("That design is not in your cart.");
    }
    Ok(())
}

pub async fn set(state: &AppState, design_id: &str, quantity: i64) -> Result<(), CommandError> {
    if state
        .update_quantity(&DesignId::new(design_id), quantity)
        .await?
    {
        println!("Cart updated ({} item(s)).", state.cart_item_count().await);
    } else {
        println!("That design is not in your cart.");
    }
    Ok(())
}

pub async fn clear(state: &AppState) -> Result<(), CommandError> {
    state.clear_cart().await?;
    println!("Cart cleared.");
    Ok(())
}

/// Print subtotal, shipping, tax and total for the current cart.
pub async fn print_summary(state: &AppState) {
    let summary = state.order_summary().await;
    let currency = summary.currency;
    println!("Subtotal  {}", money(summary.subtotal, currency));
    if summary.ships_free() {
        println!("Shipping  free");
    } else {
        println!(
            "Shipping  {}  (free above {})",
            money(summary.shipping, currency),
            money(state.pricing().free_shipping_threshold, currency)
        );
    }
    println!("Tax       {}", money(summary.tax, currency));
    println!("Total     {}", money(summary.total, currency));
}
