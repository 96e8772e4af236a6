//! Mint orchestrator - drives one session from priced metrics to a terminal outcome.
//!
//! Flow per attempt: snapshot -> build metadata -> dedup/upload -> submit
//! -> classify -> (reconcile) -> persist in the background. Every network
//! collaborator is injected, so the whole flow runs against test doubles.

use crate::mint::backend::{HttpMintBackend, MetadataUploader, MintPersistence};
use crate::mint::balance_guard::{BalanceGuard, BalanceReader};
use crate::mint::chain::{MintChain, SolanaMintChain};
use crate::mint::error::MintError;
use crate::mint::metadata::{build_asset_metadata, explorer_address_url, onchain_name};
use crate::mint::pricing::{HttpPricingClient, PricingLookup};
use crate::mint::reconciler::{Reconciliation, TransactionReconciler};
use crate::mint::session::{MintAttempt, MintSession, SharedSigner, WalletSession};
use crate::mint::types::{
    Eligibility, FailureReason, MintConfig, MintOutcome, MintRequest, MintState, SubmitError,
    SubmitErrorKind, UnknownBalancePolicy, UploadOutcome, UploadRequest,
};
use crate::types::{MetadataLocation, MintRecord, PricingQuote};
use anyhow::{Context, Result};
use reqwest::Client;
use solana_sdk::signer::Signer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::{error, info, instrument, warn};

/// Session shared between the caller and in-flight orchestrator calls.
pub type SharedSession = Arc<Mutex<MintSession>>;

pub struct MintOrchestrator {
    config: MintConfig,
    pricing: Arc<dyn PricingLookup>,
    uploader: Arc<dyn MetadataUploader>,
    persistence: Arc<dyn MintPersistence>,
    chain: Arc<dyn MintChain>,
    balance_guard: BalanceGuard,
    reconciler: TransactionReconciler,
    persistence_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl MintOrchestrator {
    pub fn new(
        config: MintConfig,
        pricing: Arc<dyn PricingLookup>,
        uploader: Arc<dyn MetadataUploader>,
        persistence: Arc<dyn MintPersistence>,
        chain: Arc<dyn MintChain>,
        balance_reader: Arc<dyn BalanceReader>,
    ) -> Self {
        let balance_guard = BalanceGuard::new(balance_reader, config.min_balance_sol);
        let reconciler = TransactionReconciler::new(
            Arc::clone(&chain),
            config.confirmation_grace(),
            config.recovery_strategy,
        );

        Self {
            config,
            pricing,
            uploader,
            persistence,
            chain,
            balance_guard,
            reconciler,
            persistence_tasks: Mutex::new(Vec::new()),
        }
    }

    /// Wire the HTTP backend and RPC network client described by `config`.
    pub fn from_config(config: MintConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        let pricing = Arc::new(HttpPricingClient::new(
            http_client.clone(),
            config.backend_url.clone(),
            config.request_timeout(),
            config.pricing_retry_attempts,
        ));
        let backend = Arc::new(HttpMintBackend::new(
            http_client,
            config.backend_url.clone(),
            config.request_timeout(),
        ));
        let chain = Arc::new(SolanaMintChain::connect(
            &config.rpc_url,
            &config.commitment,
            config.request_timeout(),
        )?);

        Ok(Self::new(
            config,
            pricing,
            backend.clone(),
            backend,
            chain.clone(),
            chain,
        ))
    }

    pub fn config(&self) -> &MintConfig {
        &self.config
    }

    pub fn balance_guard(&self) -> &BalanceGuard {
        &self.balance_guard
    }

    /// Enter `source_url` and price it. A failed lookup leaves the session
    /// without metrics; a lookup superseded by a newer URL is discarded.
    #[instrument(skip(self, session))]
    pub async fn fetch_price(&self, session: &SharedSession, source_url: &str) -> Result<PricingQuote> {
        session.lock().await.set_source_url(source_url);

        let quote = self.pricing.fetch_price(source_url).await?;

        let mut guard = session.lock().await;
        if guard.source_url() == Some(source_url) {
            if let Some(price) = quote.price {
                info!("Price to mint tweet {:?}: {}", quote.metrics.tweet_id, price.display());
            }
            guard.apply_quote(quote.clone());
        } else {
            info!("Discarding pricing for superseded URL {}", source_url);
        }
        Ok(quote)
    }

    /// Re-read the connected owner's balance into the session.
    pub async fn refresh_balance(&self, session: &SharedSession, wallet: &WalletSession) -> Eligibility {
        let Some(owner) = wallet.owner_address() else {
            session.lock().await.clear_eligibility();
            return Eligibility::Unknown;
        };
        let eligibility = self.balance_guard.check(&owner).await;
        session.lock().await.set_eligibility(owner, eligibility);
        eligibility
    }

    /// Run one mint attempt to a terminal outcome.
    ///
    /// Input errors return `Err` before any network call. Every other
    /// result, including collaborator and network failures, is an outcome.
    pub async fn mint(&self, session: &SharedSession, wallet: &WalletSession) -> Result<MintOutcome, MintError> {
        let policy = self.config.unknown_balance_policy;
        let (signer, owner, balance_read) = {
            let guard = session.lock().await;
            if guard.state() == MintState::Minting {
                return Err(MintError::MintInProgress);
            }
            let signer = wallet.signer().ok_or(MintError::WalletNotConnected)?;
            let owner = signer.pubkey().to_string();
            let balance_read = guard.has_eligibility_for(&owner);
            if !balance_read {
                // Input errors first; the balance is checked below.
                guard.check_mint(Some(&owner), UnknownBalancePolicy::AllowAtOwnRisk)?;
            }
            (signer, owner, balance_read)
        };

        // The wallet changed since the last balance read.
        if !balance_read {
            info!("No balance read for {}, checking before mint", owner);
            let eligibility = self.balance_guard.check(&owner).await;
            session.lock().await.set_eligibility(owner.clone(), eligibility);
        }

        let attempt = session.lock().await.begin_mint(Some(&owner), policy)?;

        let outcome = self.run_attempt(&attempt, signer).await;

        if !session.lock().await.finish(attempt.attempt_id, outcome.clone()) {
            warn!("Attempt {} finished after the session moved on", attempt.attempt_id);
        }
        Ok(outcome)
    }

    #[instrument(skip(self, attempt, signer), fields(tweet_id = %attempt.tweet_id, owner = %attempt.owner_address))]
    async fn run_attempt(&self, attempt: &MintAttempt, signer: SharedSigner) -> MintOutcome {
        let metadata = build_asset_metadata(
            &attempt.metrics,
            &attempt.source_url,
            &self.config.placeholder_image,
        );

        info!("Checking if tweet {} was already minted", attempt.tweet_id);
        let upload = UploadRequest {
            metadata: metadata.clone(),
            tweet_id: attempt.tweet_id.clone(),
            wallet_address: attempt.owner_address.clone(),
            tweet_data: attempt.metrics.snapshot(),
        };
        let location = match self.uploader.upload(&upload).await {
            Ok(UploadOutcome::Uploaded(location)) => location,
            Ok(UploadOutcome::AlreadyMinted { mint_address }) => {
                info!("Tweet {} already minted: {:?}", attempt.tweet_id, mint_address);
                return MintOutcome::ConfirmedExisting { mint_address };
            }
            Err(e) => {
                error!("Metadata upload failed: {:#}", e);
                return MintOutcome::Failed(FailureReason::MetadataUpload(e.to_string()));
            }
        };
        info!("Metadata uploaded to {}", location);

        let request = MintRequest {
            name: onchain_name(&metadata.name),
            uri: location.clone(),
            seller_fee_basis_points: self.config.seller_fee_basis_points,
        };

        match self.chain.submit_mint(signer, &request).await {
            Ok(submitted) => {
                info!("NFT minted at {} ({})", submitted.mint_address, submitted.signature);
                self.persist_in_background(self.record(attempt, &submitted.mint_address, &location, &submitted.signature))
                    .await;
                self.confirmed(submitted.mint_address, submitted.signature, false)
            }
            Err(e) => self.handle_submit_error(attempt, &location, e).await,
        }
    }

    async fn handle_submit_error(
        &self,
        attempt: &MintAttempt,
        location: &MetadataLocation,
        err: SubmitError,
    ) -> MintOutcome {
        warn!("Mint submission failed ({:?}): {}", err.kind, err.message);

        match err.kind {
            SubmitErrorKind::Ambiguous => match self.reconciler.reconcile(&err, Some(location)).await {
                Reconciliation::Recovered { mint_address, signature } => {
                    self.persist_in_background(self.record(attempt, &mint_address, location, &signature))
                        .await;
                    self.confirmed(mint_address, signature, true)
                }
                Reconciliation::Unresolved { .. } => {
                    MintOutcome::Failed(FailureReason::ConfirmationTimedOut)
                }
            },
            SubmitErrorKind::UserRejected => MintOutcome::Failed(FailureReason::UserRejected),
            SubmitErrorKind::Expired => MintOutcome::Failed(FailureReason::Expired),
            SubmitErrorKind::InsufficientFunds => MintOutcome::Failed(FailureReason::InsufficientFunds),
            SubmitErrorKind::Unknown => MintOutcome::Failed(FailureReason::Unknown(err.message)),
        }
    }

    fn confirmed(&self, mint_address: String, signature: String, recovered: bool) -> MintOutcome {
        let explorer_url = explorer_address_url(&mint_address, &self.config.explorer_cluster);
        info!("View on Solana Explorer: {}", explorer_url);
        MintOutcome::ConfirmedNew {
            mint_address,
            signature,
            explorer_url,
            recovered,
        }
    }

    fn record(
        &self,
        attempt: &MintAttempt,
        mint_address: &str,
        location: &MetadataLocation,
        signature: &str,
    ) -> MintRecord {
        MintRecord {
            tweet_id: attempt.tweet_id.clone(),
            mint_address: mint_address.to_string(),
            owner_address: attempt.owner_address.clone(),
            metadata_location: location.clone(),
            price: Some(attempt.price.value()),
            signature: signature.to_string(),
            metrics: attempt.metrics.snapshot(),
            minted_at: chrono::Utc::now().timestamp_millis() as u64,
        }
    }

    /// Fire-and-forget save. Failures are logged and never reach the outcome.
    async fn persist_in_background(&self, record: MintRecord) {
        let persistence = Arc::clone(&self.persistence);
        let retry_attempts = self.config.persist_retry_attempts;

        let handle = tokio::spawn(async move {
            let retry_strategy = ExponentialBackoff::from_millis(200)
                .max_delay(Duration::from_secs(2))
                .take(retry_attempts);

            match Retry::spawn(retry_strategy, || persistence.save_mint(&record)).await {
                Ok(()) => info!("Mint data saved for tweet {}", record.tweet_id),
                Err(e) => error!(
                    "Failed to save mint {} for tweet {}: {:#}",
                    record.mint_address, record.tweet_id, e
                ),
            }
        });

        let mut tasks = self.persistence_tasks.lock().await;
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle);
    }

    /// Wait for background saves to finish.
    pub async fn flush_persistence(&self) {
        let tasks: Vec<_> = self.persistence_tasks.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                error!("Persistence task aborted: {}", e);
            }
        }
    }
}
