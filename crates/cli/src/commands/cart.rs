//! Cart commands.

use souq_client::MarketplaceStore;
use souq_core::CartItemId;
use tracing::info;

use super::{CommandError, parse_id};

/// List the signed-in user's cart.
pub async fn list(store: &MarketplaceStore) -> Result<(), CommandError> {
    let items = store.start().await?;

    if items.is_empty() {
        info!("Your cart is empty");
        return Ok(());
    }

    for item in &items {
        info!(
            "{}  {}  {}  (added {})",
            item.id,
            item.product.short_name(4),
            item.product.price,
            item.added_at.format("%Y-%m-%d %H:%M"),
        );
    }
    info!("{} item(s)", items.len());
    Ok(())
}

/// Remove an entry from the signed-in user's cart.
pub async fn remove(store: &MarketplaceStore, item_id: &str) -> Result<(), CommandError> {
    let item_id: CartItemId = parse_id("cart item", item_id)?;

    store.start().await?;
    store.remove_cart_item(item_id).await?;

    if let Some(notification) = store.notifications().current() {
        info!("{}", notification.message);
    }
    Ok(())
}
