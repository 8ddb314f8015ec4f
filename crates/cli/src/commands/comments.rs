//! Comment thread commands.

use souq_client::MarketplaceStore;
use souq_core::{CommentId, ProductId};
use tracing::{info, warn};

use super::{CommandError, parse_id};

/// Show the comment thread of a product, newest first.
pub async fn show(store: &MarketplaceStore, product_id: &str) -> Result<(), CommandError> {
    let product_id: ProductId = parse_id("product", product_id)?;

    let Some(thread) = store.open_comments(product_id).await? else {
        return Ok(());
    };

    if thread.is_empty() {
        info!("No comments yet");
        return Ok(());
    }

    for comment in &thread {
        let author = comment.author.display_name.as_deref().unwrap_or("unknown");
        info!(
            "[{}] {} ({}): {}",
            comment.id,
            author,
            comment.created_at.format("%Y-%m-%d %H:%M"),
            comment.content,
        );
    }
    Ok(())
}

/// Post a comment as the signed-in user.
pub async fn post(store: &MarketplaceStore, product_id: &str, text: &str) -> Result<(), CommandError> {
    let product_id: ProductId = parse_id("product", product_id)?;

    store.open_comments(product_id).await?;
    store.set_draft(product_id, text).await;
    if !store.can_post(product_id).await {
        warn!("Nothing to post");
        return Ok(());
    }
    store.submit_draft(product_id).await?;

    report(store);
    Ok(())
}

/// Delete one of the signed-in user's comments.
pub async fn delete(
    store: &MarketplaceStore,
    product_id: &str,
    comment_id: &str,
) -> Result<(), CommandError> {
    let product_id: ProductId = parse_id("product", product_id)?;
    let comment_id: CommentId = parse_id("comment", comment_id)?;

    store.identity().await?;
    store.open_comments(product_id).await?;
    store.delete_comment(comment_id, product_id).await?;

    report(store);
    Ok(())
}

fn report(store: &MarketplaceStore) {
    if let Some(notification) = store.notifications().current() {
        info!("{}", notification.message);
    }
}
