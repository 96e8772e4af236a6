//! Test doubles for the mint collaborators.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use solana_sdk::signature::Keypair;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tweet_minter::mint::types::{
    ChainTransaction, MintRequest, SubmittedMint, UploadOutcome, UploadRequest,
};
use tweet_minter::mint::{
    BalanceReader, MetadataUploader, MintChain, MintConfig, MintOrchestrator, MintPersistence,
    PricingLookup, SharedSession, SharedSigner, SubmitError, WalletSession,
};
use tweet_minter::types::{MetadataLocation, MintPrice, MintRecord, PostAuthor, PostMetrics, PricingQuote};
use tweet_minter::MintSession;

pub const METADATA_URI: &str = "https://arweave.net/metadata-42";
pub const SOURCE_URL: &str = "https://x.com/alice/status/42";

pub fn create_test_metrics(tweet_id: &str) -> PostMetrics {
    PostMetrics {
        tweet_id: Some(tweet_id.to_string()),
        user: Some(PostAuthor {
            name: Some("Alice".to_string()),
            handle: Some("alice".to_string()),
        }),
        text: Some("gm".to_string()),
        likes: Some(100),
        retweets: Some(10),
        replies: Some(3),
        view_count: Some(900),
    }
}

pub fn create_test_quote(tweet_id: &str, price: f64) -> PricingQuote {
    PricingQuote {
        metrics: create_test_metrics(tweet_id),
        price: MintPrice::new(price),
    }
}

pub fn create_test_session() -> SharedSession {
    Arc::new(Mutex::new(MintSession::new()))
}

pub fn create_test_wallet() -> WalletSession {
    let signer: SharedSigner = Arc::new(Keypair::new());
    WalletSession::connected(signer)
}

/// Config with the default grace period and no real endpoints.
pub fn create_test_config() -> MintConfig {
    MintConfig {
        rpc_url: "http://localhost:8899".to_string(),
        backend_url: "http://localhost:3001".to_string(),
        ..MintConfig::default()
    }
}

pub struct FixedPricing {
    pub quote: Option<PricingQuote>,
    pub calls: AtomicUsize,
}

impl FixedPricing {
    pub fn new(quote: Option<PricingQuote>) -> Self {
        Self {
            quote,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PricingLookup for FixedPricing {
    async fn fetch_price(&self, _source_url: &str) -> Result<PricingQuote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.quote
            .clone()
            .ok_or_else(|| anyhow!("Could not fetch tweet data or tweetId."))
    }
}

pub enum UploadScript {
    Uploaded,
    Conflict(Option<String>),
    Fail(String),
}

pub struct RecordingUploader {
    pub script: UploadScript,
    pub calls: AtomicUsize,
    pub requests: StdMutex<Vec<UploadRequest>>,
}

impl RecordingUploader {
    pub fn new(script: UploadScript) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            requests: StdMutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MetadataUploader for RecordingUploader {
    async fn upload(&self, request: &UploadRequest) -> Result<UploadOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        match &self.script {
            UploadScript::Uploaded => Ok(UploadOutcome::Uploaded(MetadataLocation(
                METADATA_URI.to_string(),
            ))),
            UploadScript::Conflict(mint_address) => Ok(UploadOutcome::AlreadyMinted {
                mint_address: mint_address.clone(),
            }),
            UploadScript::Fail(message) => Err(anyhow!(message.clone())),
        }
    }
}

pub struct RecordingPersistence {
    pub fail: bool,
    pub calls: AtomicUsize,
    pub saved: StdMutex<Vec<MintRecord>>,
}

impl RecordingPersistence {
    pub fn new(fail: bool) -> Self {
        Self {
            fail,
            calls: AtomicUsize::new(0),
            saved: StdMutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MintPersistence for RecordingPersistence {
    async fn save_mint(&self, record: &MintRecord) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("Failed to save mint: database unavailable"));
        }
        self.saved.lock().unwrap().push(record.clone());
        Ok(())
    }
}

pub enum LookupScript {
    Found(ChainTransaction),
    NotFound,
    Fail,
}

pub struct ScriptedChain {
    pub submit: Result<SubmittedMint, SubmitError>,
    pub lookup: LookupScript,
    pub submit_delay: Duration,
    pub submit_calls: AtomicUsize,
    pub lookup_calls: AtomicUsize,
    pub lookup_at: StdMutex<Option<Instant>>,
    pub requests: StdMutex<Vec<MintRequest>>,
}

impl ScriptedChain {
    pub fn new(submit: Result<SubmittedMint, SubmitError>, lookup: LookupScript) -> Self {
        Self {
            submit,
            lookup,
            submit_delay: Duration::ZERO,
            submit_calls: AtomicUsize::new(0),
            lookup_calls: AtomicUsize::new(0),
            lookup_at: StdMutex::new(None),
            requests: StdMutex::new(Vec::new()),
        }
    }

    pub fn confirming(mint_address: &str, signature: &str) -> Self {
        Self::new(
            Ok(SubmittedMint {
                mint_address: mint_address.to_string(),
                signature: signature.to_string(),
            }),
            LookupScript::NotFound,
        )
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }
}

#[async_trait]
impl MintChain for ScriptedChain {
    async fn submit_mint(
        &self,
        _signer: SharedSigner,
        request: &MintRequest,
    ) -> Result<SubmittedMint, SubmitError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }
        self.submit.clone()
    }

    async fn get_transaction(&self, _signature: &str) -> Result<Option<ChainTransaction>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        *self.lookup_at.lock().unwrap() = Some(Instant::now());
        match &self.lookup {
            LookupScript::Found(tx) => Ok(Some(tx.clone())),
            LookupScript::NotFound => Ok(None),
            LookupScript::Fail => Err(anyhow!("RPC unavailable")),
        }
    }
}

/// Balance per address; unlisted addresses fail to read.
pub struct PerAddressBalance(pub HashMap<String, f64>);

#[async_trait]
impl BalanceReader for PerAddressBalance {
    async fn get_balance(&self, address: &str) -> Result<f64> {
        self.0
            .get(address)
            .copied()
            .ok_or_else(|| anyhow!("RPC unavailable"))
    }
}

pub struct FixedBalance(pub Option<f64>);

#[async_trait]
impl BalanceReader for FixedBalance {
    async fn get_balance(&self, _address: &str) -> Result<f64> {
        self.0.ok_or_else(|| anyhow!("RPC unavailable"))
    }
}

/// Orchestrator plus handles on every double it was built with.
pub struct Harness {
    pub orchestrator: MintOrchestrator,
    pub pricing: Arc<FixedPricing>,
    pub uploader: Arc<RecordingUploader>,
    pub persistence: Arc<RecordingPersistence>,
    pub chain: Arc<ScriptedChain>,
}

impl Harness {
    pub fn new(
        config: MintConfig,
        quote: Option<PricingQuote>,
        upload: UploadScript,
        persist_fails: bool,
        chain: ScriptedChain,
        balance: Option<f64>,
    ) -> Self {
        Self::with_balance_reader(
            config,
            quote,
            upload,
            persist_fails,
            chain,
            Arc::new(FixedBalance(balance)),
        )
    }

    pub fn with_balance_reader(
        config: MintConfig,
        quote: Option<PricingQuote>,
        upload: UploadScript,
        persist_fails: bool,
        chain: ScriptedChain,
        balance_reader: Arc<dyn BalanceReader>,
    ) -> Self {
        let pricing = Arc::new(FixedPricing::new(quote));
        let uploader = Arc::new(RecordingUploader::new(upload));
        let persistence = Arc::new(RecordingPersistence::new(persist_fails));
        let chain = Arc::new(chain);

        let orchestrator = MintOrchestrator::new(
            config,
            pricing.clone(),
            uploader.clone(),
            persistence.clone(),
            chain.clone(),
            balance_reader,
        );

        Self {
            orchestrator,
            pricing,
            uploader,
            persistence,
            chain,
        }
    }

    /// Price the default post and read the balance into `session`.
    pub async fn prepare(&self, session: &SharedSession, wallet: &WalletSession) {
        self.orchestrator
            .fetch_price(session, SOURCE_URL)
            .await
            .expect("pricing should succeed");
        self.orchestrator.refresh_balance(session, wallet).await;
    }

    pub fn submit_calls(&self) -> usize {
        self.chain.submit_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_calls(&self) -> usize {
        self.chain.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.uploader.calls.load(Ordering::SeqCst)
    }

    pub fn persist_calls(&self) -> usize {
        self.persistence.calls.load(Ordering::SeqCst)
    }
}
