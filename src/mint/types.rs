//! Core types for the mint state machine and its collaborators.

use crate::types::{AssetMetadata, MetadataLocation, MetricsSnapshot, Pubkey};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Minimum balance required to cover mint fees, in native units.
pub const MIN_BALANCE_SOL: f64 = 0.1;

/// Secondary-sale royalty attached to every mint (5%).
pub const SELLER_FEE_BASIS_POINTS: u16 = 500;

/// Grace period before looking up an ambiguous transaction.
pub const CONFIRMATION_GRACE_MS: u64 = 3_000;

pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3001";
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/500x500.png?text=Tweet+NFT";
pub const FAUCET_URL: &str = "https://faucet.solana.com";

/// Orchestrator state for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MintState {
    Idle,
    PricingFetched,
    Minting,
    Succeeded,
    AlreadyExists,
    Failed,
}

impl MintState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MintState::Succeeded | MintState::AlreadyExists | MintState::Failed
        )
    }
}

/// Session-local outcome of a mint attempt. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum MintOutcome {
    Pending,
    /// A new asset was minted (or recovered through reconciliation).
    ConfirmedNew {
        mint_address: Pubkey,
        signature: String,
        explorer_url: String,
        recovered: bool,
    },
    /// The post was already minted; the existing address is surfaced as-is.
    ConfirmedExisting { mint_address: Option<Pubkey> },
    Failed(FailureReason),
}

impl MintOutcome {
    /// State this outcome drives the session into.
    pub fn state(&self) -> MintState {
        match self {
            MintOutcome::Pending => MintState::Minting,
            MintOutcome::ConfirmedNew { .. } => MintState::Succeeded,
            MintOutcome::ConfirmedExisting { .. } => MintState::AlreadyExists,
            MintOutcome::Failed(_) => MintState::Failed,
        }
    }

    pub fn mint_address(&self) -> Option<&str> {
        match self {
            MintOutcome::ConfirmedNew { mint_address, .. } => Some(mint_address),
            MintOutcome::ConfirmedExisting { mint_address } => mint_address.as_deref(),
            _ => None,
        }
    }
}

/// Reason a mint attempt ended in `Failed`, rendered as the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("metadata upload failed: {0}")]
    MetadataUpload(String),
    #[error("Transaction was rejected in your wallet.")]
    UserRejected,
    #[error("Transaction expired. Please try again.")]
    Expired,
    #[error("Insufficient SOL balance. Get devnet SOL from {}", FAUCET_URL)]
    InsufficientFunds,
    #[error("Transaction was submitted but confirmation timed out. Check your wallet or Solana Explorer for the NFT.")]
    ConfirmationTimedOut,
    #[error("{0}")]
    Unknown(String),
}

/// Mint eligibility derived from the owner's balance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Eligibility {
    /// Balance not read yet, or the read failed.
    Unknown,
    Eligible { balance: f64 },
    Ineligible { balance: f64 },
}

/// What to do when the balance is unknown at mint time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownBalancePolicy {
    Block,
    AllowAtOwnRisk,
}

/// How the reconciler picks a candidate mint address from a found transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryStrategy {
    /// First account key referenced by the transaction.
    FirstAccountKey,
    /// The mint key generated for the attempt, only if the transaction references it.
    ExpectedMintKey,
}

/// Mint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintConfig {
    /// Blockchain RPC endpoint
    pub rpc_url: String,
    /// Pricing, upload and persistence backend
    pub backend_url: String,
    /// Commitment level for submissions and lookups
    pub commitment: String,
    /// Minimum balance required to mint
    pub min_balance_sol: f64,
    /// Secondary-sale royalty in basis points
    pub seller_fee_basis_points: u16,
    /// Wait before looking up an ambiguous transaction
    pub confirmation_grace_ms: u64,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
    pub pricing_retry_attempts: usize,
    pub persist_retry_attempts: usize,
    pub unknown_balance_policy: UnknownBalancePolicy,
    pub recovery_strategy: RecoveryStrategy,
    /// Cluster name used in explorer links
    pub explorer_cluster: String,
    pub placeholder_image: String,
}

impl MintConfig {
    /// Defaults overridden by `TWEET_MINTER_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        use anyhow::Context;

        let mut config = Self::default();
        if let Ok(v) = std::env::var("TWEET_MINTER_RPC_URL") {
            config.rpc_url = v;
        }
        if let Ok(v) = std::env::var("TWEET_MINTER_BACKEND_URL") {
            config.backend_url = v;
        }
        if let Ok(v) = std::env::var("TWEET_MINTER_COMMITMENT") {
            config.commitment = v;
        }
        if let Ok(v) = std::env::var("TWEET_MINTER_MIN_BALANCE_SOL") {
            config.min_balance_sol = v
                .parse()
                .context("Invalid TWEET_MINTER_MIN_BALANCE_SOL")?;
        }
        if let Ok(v) = std::env::var("TWEET_MINTER_CONFIRMATION_GRACE_MS") {
            config.confirmation_grace_ms = v
                .parse()
                .context("Invalid TWEET_MINTER_CONFIRMATION_GRACE_MS")?;
        }
        if let Ok(v) = std::env::var("TWEET_MINTER_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = v
                .parse()
                .context("Invalid TWEET_MINTER_REQUEST_TIMEOUT_SECS")?;
        }
        if let Ok(v) = std::env::var("TWEET_MINTER_EXPLORER_CLUSTER") {
            config.explorer_cluster = v;
        }
        if let Ok(v) = std::env::var("TWEET_MINTER_UNKNOWN_BALANCE_POLICY") {
            config.unknown_balance_policy = match v.to_ascii_lowercase().as_str() {
                "block" => UnknownBalancePolicy::Block,
                "allow" => UnknownBalancePolicy::AllowAtOwnRisk,
                other => anyhow::bail!("Invalid TWEET_MINTER_UNKNOWN_BALANCE_POLICY: {}", other),
            };
        }
        if let Ok(v) = std::env::var("TWEET_MINTER_RECOVERY_STRATEGY") {
            config.recovery_strategy = match v.to_ascii_lowercase().as_str() {
                "first-account-key" => RecoveryStrategy::FirstAccountKey,
                "expected-mint-key" => RecoveryStrategy::ExpectedMintKey,
                other => anyhow::bail!("Invalid TWEET_MINTER_RECOVERY_STRATEGY: {}", other),
            };
        }
        Ok(config)
    }

    pub fn confirmation_grace(&self) -> Duration {
        Duration::from_millis(self.confirmation_grace_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEVNET_RPC_URL.to_string(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            commitment: "confirmed".to_string(),
            min_balance_sol: MIN_BALANCE_SOL,
            seller_fee_basis_points: SELLER_FEE_BASIS_POINTS,
            confirmation_grace_ms: CONFIRMATION_GRACE_MS,
            request_timeout_secs: 10,
            pricing_retry_attempts: 3,
            persist_retry_attempts: 2,
            unknown_balance_policy: UnknownBalancePolicy::AllowAtOwnRisk,
            recovery_strategy: RecoveryStrategy::FirstAccountKey,
            explorer_cluster: "devnet".to_string(),
            placeholder_image: PLACEHOLDER_IMAGE.to_string(),
        }
    }
}

/// Request to the dedup/upload collaborator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub metadata: AssetMetadata,
    pub tweet_id: String,
    pub wallet_address: Pubkey,
    pub tweet_data: MetricsSnapshot,
}

/// Successful response of the dedup/upload collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Uploaded(MetadataLocation),
    /// Uniqueness violation: the post already has a mint record.
    AlreadyMinted { mint_address: Option<Pubkey> },
}

/// Everything the chain needs to create the asset.
#[derive(Debug, Clone, PartialEq)]
pub struct MintRequest {
    pub name: String,
    pub uri: MetadataLocation,
    pub seller_fee_basis_points: u16,
}

/// A confirmed mint transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedMint {
    pub mint_address: Pubkey,
    pub signature: String,
}

/// Structured kind of a submission failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitErrorKind {
    /// The transaction may or may not have landed (already processed,
    /// duplicate simulation, lost confirmation).
    Ambiguous,
    UserRejected,
    /// Reference blockhash expired.
    Expired,
    InsufficientFunds,
    Unknown,
}

/// A failed mint submission.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct SubmitError {
    pub kind: SubmitErrorKind,
    pub message: String,
    /// Signature of the signed transaction, when signing got that far.
    pub signature: Option<String>,
    /// Mint key generated for the attempt, when known.
    pub mint_address: Option<Pubkey>,
}

impl SubmitError {
    pub fn new(kind: SubmitErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            signature: None,
            mint_address: None,
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_mint_address(mut self, mint_address: impl Into<String>) -> Self {
        self.mint_address = Some(mint_address.into());
        self
    }
}

/// A transaction found on the network by signature.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainTransaction {
    pub signature: String,
    pub slot: u64,
    pub account_keys: Vec<Pubkey>,
    /// Execution error recorded on-chain, if any.
    pub err: Option<String>,
}
