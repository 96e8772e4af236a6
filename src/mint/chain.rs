//! Blockchain network client: mint submission, transaction lookup and balance reads.
//!
//! The network client is injected into the orchestrator through the
//! `MintChain` and `BalanceReader` traits; `SolanaMintChain` is the RPC-backed
//! implementation.

use crate::mint::balance_guard::BalanceReader;
use crate::mint::classify::{classify_client_error, classify_signer_error};
use crate::mint::session::SharedSigner;
use crate::mint::types::{ChainTransaction, MintRequest, SubmitError, SubmittedMint};
use anyhow::{Context, Result};
use async_trait::async_trait;
use mpl_token_metadata::accounts::{MasterEdition, Metadata};
use mpl_token_metadata::instructions::{CreateV1Builder, MintV1Builder};
use mpl_token_metadata::types::{PrintSupply, TokenStandard};
use solana_client::client_error::ClientErrorKind;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;
use solana_transaction_status::UiTransactionEncoding;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, instrument};

pub const SPL_TOKEN_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const SPL_ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

#[async_trait]
pub trait MintChain: Send + Sync {
    /// Sign (one signature request) and submit a mint transaction, waiting
    /// for confirmation.
    async fn submit_mint(
        &self,
        signer: SharedSigner,
        request: &MintRequest,
    ) -> Result<SubmittedMint, SubmitError>;

    /// Look up a transaction by signature. `Ok(None)` when the network has
    /// no record of it.
    async fn get_transaction(&self, signature: &str) -> Result<Option<ChainTransaction>>;
}

/// RPC-backed network client.
pub struct SolanaMintChain {
    rpc: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl SolanaMintChain {
    pub fn new(rpc: Arc<RpcClient>, commitment: CommitmentConfig) -> Self {
        Self { rpc, commitment }
    }

    /// Client for `rpc_url` with the given commitment ("processed",
    /// "confirmed", "finalized").
    pub fn connect(rpc_url: &str, commitment: &str, timeout: Duration) -> Result<Self> {
        let commitment = CommitmentConfig::from_str(commitment)
            .map_err(|e| anyhow::anyhow!("Invalid commitment {:?}: {:?}", commitment, e))?;
        let rpc = RpcClient::new_with_timeout_and_commitment(rpc_url.to_string(), timeout, commitment);
        info!("Connected network client to {}", rpc_url);
        Ok(Self::new(Arc::new(rpc), commitment))
    }
}

#[async_trait]
impl MintChain for SolanaMintChain {
    #[instrument(skip(self, signer, request), fields(owner = %signer.pubkey(), uri = %request.uri))]
    async fn submit_mint(
        &self,
        signer: SharedSigner,
        request: &MintRequest,
    ) -> Result<SubmittedMint, SubmitError> {
        let owner = signer.pubkey();
        let mint = Keypair::new();
        let mint_address = mint.pubkey().to_string();
        let instructions = build_mint_instructions(&owner, &mint.pubkey(), request);

        let blockhash = self.rpc.get_latest_blockhash().await.map_err(|e| {
            SubmitError::new(classify_client_error(&e), e.to_string())
                .with_mint_address(mint_address.clone())
        })?;

        let mut transaction = Transaction::new_with_payer(&instructions, Some(&owner));
        // Signer refs are not Send; they must be gone before the next await.
        {
            let signers: Vec<&dyn Signer> = vec![signer.as_ref(), &mint];
            transaction.try_sign(&signers, blockhash).map_err(|e| {
                SubmitError::new(classify_signer_error(&e), e.to_string())
                    .with_mint_address(mint_address.clone())
            })?;
        }

        let signature = transaction.signatures[0].to_string();
        debug!("Submitting mint {} with signature {}", mint_address, signature);

        match self.rpc.send_and_confirm_transaction(&transaction).await {
            Ok(confirmed) => {
                info!("Mint {} confirmed: {}", mint_address, confirmed);
                Ok(SubmittedMint {
                    mint_address,
                    signature: confirmed.to_string(),
                })
            }
            Err(e) => {
                warn!("Mint submission {} failed: {}", signature, e);
                Err(SubmitError::new(classify_client_error(&e), e.to_string())
                    .with_signature(signature)
                    .with_mint_address(mint_address))
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_transaction(&self, signature: &str) -> Result<Option<ChainTransaction>> {
        let sig = Signature::from_str(signature).context("Invalid transaction signature")?;
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(self.commitment),
            max_supported_transaction_version: Some(0),
        };

        let confirmed = match self.rpc.get_transaction_with_config(&sig, config).await {
            Ok(tx) => tx,
            // A null result (unknown signature) surfaces as a deserialization error.
            Err(e) if matches!(e.kind, ClientErrorKind::SerdeJson(_)) => {
                debug!("Transaction {} not found", signature);
                return Ok(None);
            }
            Err(e) => return Err(e).context("Failed to fetch transaction"),
        };

        let decoded = confirmed
            .transaction
            .transaction
            .decode()
            .context("Failed to decode transaction")?;
        let account_keys = decoded
            .message
            .static_account_keys()
            .iter()
            .map(|k| k.to_string())
            .collect();
        let err = confirmed
            .transaction
            .meta
            .as_ref()
            .and_then(|meta| meta.err.as_ref())
            .map(|e| format!("{:?}", e));

        Ok(Some(ChainTransaction {
            signature: signature.to_string(),
            slot: confirmed.slot,
            account_keys,
            err,
        }))
    }
}

#[async_trait]
impl BalanceReader for SolanaMintChain {
    async fn get_balance(&self, address: &str) -> Result<f64> {
        let pubkey = Pubkey::from_str(address).context("Invalid wallet address")?;
        let lamports = self
            .rpc
            .get_balance(&pubkey)
            .await
            .context("Failed to fetch balance")?;
        Ok(lamports as f64 / LAMPORTS_PER_SOL as f64)
    }
}

/// Create-metadata + mint-one instructions for a non-fungible asset owned by `owner`.
pub fn build_mint_instructions(owner: &Pubkey, mint: &Pubkey, request: &MintRequest) -> Vec<Instruction> {
    let (metadata, _) = Metadata::find_pda(mint);
    let (master_edition, _) = MasterEdition::find_pda(mint);
    let token = associated_token_address(owner, mint);

    let create = CreateV1Builder::new()
        .metadata(metadata)
        .master_edition(Some(master_edition))
        .mint(*mint, true)
        .authority(*owner)
        .payer(*owner)
        .update_authority(*owner, true)
        .spl_token_program(Some(SPL_TOKEN_PROGRAM_ID))
        .name(request.name.clone())
        .uri(request.uri.as_str().to_string())
        .seller_fee_basis_points(request.seller_fee_basis_points)
        .primary_sale_happened(false)
        .is_mutable(true)
        .token_standard(TokenStandard::NonFungible)
        .print_supply(PrintSupply::Zero)
        .instruction();

    let mint_one = MintV1Builder::new()
        .token(token)
        .token_owner(Some(*owner))
        .metadata(metadata)
        .master_edition(Some(master_edition))
        .mint(*mint)
        .authority(*owner)
        .payer(*owner)
        .spl_token_program(SPL_TOKEN_PROGRAM_ID)
        .spl_ata_program(SPL_ASSOCIATED_TOKEN_PROGRAM_ID)
        .amount(1)
        .instruction();

    vec![create, mint_one]
}

pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[owner.as_ref(), SPL_TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &SPL_ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .0
}
