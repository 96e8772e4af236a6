//! Input errors that block a mint before any network call is made.

use crate::mint::types::FAUCET_URL;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MintError {
    #[error("Connect your wallet first.")]
    WalletNotConnected,
    #[error("Please fetch tweet data first.")]
    MetricsMissing,
    #[error("No mint price available for this tweet.")]
    PriceMissing,
    #[error("Insufficient devnet SOL balance. You have {balance:.4} SOL. Get devnet SOL from {}", FAUCET_URL)]
    InsufficientBalance { balance: f64 },
    #[error("Balance unknown. Refresh the wallet balance before minting.")]
    BalanceUnknown,
    #[error("A mint is already in progress for this session.")]
    MintInProgress,
}
