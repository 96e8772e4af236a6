//! Command-line driver: price a post and mint it with a local keypair.
//!
//! Usage: tweet-minter <post-url>
//! The keypair is read from TWEET_MINTER_KEYPAIR (default ~/.config/solana/id.json).

use anyhow::{anyhow, Result};
use solana_sdk::signature::read_keypair_file;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn, Level};
use tweet_minter::mint::{
    Eligibility, MintConfigBuilder, MintOutcome, MintSession, SharedSession, WalletSession,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let source_url = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow!("Usage: tweet-minter <post-url>"))?;

    let keypair_path = std::env::var("TWEET_MINTER_KEYPAIR").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_default();
        format!("{}/.config/solana/id.json", home)
    });
    let keypair = read_keypair_file(&keypair_path)
        .map_err(|e| anyhow!("Failed to read keypair {}: {}", keypair_path, e))?;
    let wallet = WalletSession::connected(Arc::new(keypair));

    let orchestrator = MintConfigBuilder::from_env()?.build()?;
    info!(
        "Starting tweet-minter against {} (backend {})",
        orchestrator.config().rpc_url,
        orchestrator.config().backend_url
    );
    info!("Wallet {}", wallet.abbreviated_address());

    let session: SharedSession = Arc::new(Mutex::new(MintSession::new()));

    let quote = orchestrator.fetch_price(&session, &source_url).await?;
    match quote.price {
        Some(price) => info!("Price to mint: {}", price.display()),
        None => warn!("No price available for this post"),
    }

    match orchestrator.refresh_balance(&session, &wallet).await {
        Eligibility::Eligible { balance } => info!("Balance {:.4} SOL", balance),
        Eligibility::Ineligible { balance } => warn!("Balance {:.4} SOL is below the minimum", balance),
        Eligibility::Unknown => warn!("Balance unknown, minting at your own risk"),
    }

    let outcome = orchestrator.mint(&session, &wallet).await?;
    orchestrator.flush_persistence().await;

    match outcome {
        MintOutcome::ConfirmedNew {
            mint_address,
            signature,
            explorer_url,
            recovered,
        } => {
            info!("NFT minted successfully: {}", mint_address);
            info!("Transaction: {}", signature);
            info!("View on Solana Explorer: {}", explorer_url);
            if recovered {
                info!("Outcome recovered after an ambiguous confirmation");
            }
        }
        MintOutcome::ConfirmedExisting { mint_address } => match mint_address {
            Some(address) => info!("This tweet has already been minted as NFT: {}", address),
            None => info!("This tweet has already been minted as NFT"),
        },
        MintOutcome::Failed(reason) => {
            error!("{}", reason);
            return Err(anyhow!(reason));
        }
        MintOutcome::Pending => warn!("Mint did not reach a terminal state"),
    }

    Ok(())
}
