//! Souq CLI - inspect and edit your cart and product comment threads.
//!
//! # Usage
//!
//! ```bash
//! # List the signed-in user's cart, newest first
//! souq cart list
//!
//! # Remove an entry from the cart
//! souq cart remove 6f1c...
//!
//! # Show the comment thread of a product
//! souq comments show 0b9e...
//!
//! # Post or delete a comment
//! souq comments post 0b9e... "Is this still available?"
//! souq comments delete 0b9e... 51aa...
//! ```
//!
//! # Environment Variables
//!
//! - `SOUQ_SUPABASE_URL` - Base URL of the Supabase project
//! - `SOUQ_SUPABASE_ANON_KEY` - Public anon key
//! - `SOUQ_ACCESS_TOKEN` - Session token of the signed-in user
//! - `RUST_LOG` - Log filter (default `souq_client=info,souq_cli=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "souq")]
#[command(author, version, about = "Souq marketplace cart and comments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the shopping cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Read and write product comments
    Comments {
        #[command(subcommand)]
        action: CommentsAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// List cart entries, newest first
    List,
    /// Remove a cart entry
    Remove {
        /// Cart entry ID
        item_id: String,
    },
}

#[derive(Subcommand)]
enum CommentsAction {
    /// Show a product's comment thread
    Show {
        /// Product ID
        product_id: String,
    },
    /// Post a comment on a product
    Post {
        /// Product ID
        product_id: String,

        /// Comment text
        text: String,
    },
    /// Delete one of your comments
    Delete {
        /// Product ID
        product_id: String,

        /// Comment ID
        comment_id: String,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("souq_client=info,souq_cli=info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let store = commands::connect()?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::List => commands::cart::list(&store).await?,
            CartAction::Remove { item_id } => commands::cart::remove(&store, &item_id).await?,
        },
        Commands::Comments { action } => match action {
            CommentsAction::Show { product_id } => {
                commands::comments::show(&store, &product_id).await?;
            }
            CommentsAction::Post { product_id, text } => {
                commands::comments::post(&store, &product_id, &text).await?;
            }
            CommentsAction::Delete {
                product_id,
                comment_id,
            } => commands::comments::delete(&store, &product_id, &comment_id).await?,
        },
    }
    Ok(())
}
