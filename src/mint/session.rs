//! Session state: the connected wallet and the mint state machine.
//!
//! `MintSession` holds only pure transitions. Network work lives in the
//! orchestrator, which moves the session through `begin_mint` and `finish`.

use crate::mint::error::MintError;
use crate::mint::types::{Eligibility, MintOutcome, MintState, UnknownBalancePolicy};
use crate::types::{MintPrice, PostMetrics, PricingQuote, Pubkey};
use solana_sdk::signer::Signer;
use std::sync::Arc;
use tracing::debug;

/// Signing capability shared between the session and submissions.
pub type SharedSigner = Arc<dyn Signer + Send + Sync>;

/// Connected wallet, if any.
#[derive(Clone, Default)]
pub struct WalletSession {
    signer: Option<SharedSigner>,
}

impl WalletSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected(signer: SharedSigner) -> Self {
        Self {
            signer: Some(signer),
        }
    }

    pub fn connect(&mut self, signer: SharedSigner) {
        debug!("Wallet connected: {}", signer.pubkey());
        self.signer = Some(signer);
    }

    pub fn disconnect(&mut self) {
        self.signer = None;
    }

    pub fn is_connected(&self) -> bool {
        self.signer.is_some()
    }

    pub fn signer(&self) -> Option<SharedSigner> {
        self.signer.clone()
    }

    pub fn owner_address(&self) -> Option<Pubkey> {
        self.signer.as_ref().map(|s| s.pubkey().to_string())
    }

    /// "ABCD...WXYZ" form of the owner address, empty when disconnected.
    pub fn abbreviated_address(&self) -> String {
        self.owner_address()
            .map(|key| abbreviate(&key))
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSession")
            .field("owner", &self.owner_address())
            .finish()
    }
}

fn abbreviate(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return key.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Snapshot taken when `Minting` begins. Later pricing refreshes never touch it.
#[derive(Debug, Clone, PartialEq)]
pub struct MintAttempt {
    pub attempt_id: u64,
    pub source_url: String,
    pub tweet_id: String,
    pub metrics: PostMetrics,
    pub price: MintPrice,
    pub owner_address: Pubkey,
}

/// Per-session mint state machine.
#[derive(Debug, Clone)]
pub struct MintSession {
    source_url: Option<String>,
    metrics: Option<PostMetrics>,
    price: Option<MintPrice>,
    /// Eligibility and the owner address it was read for.
    eligibility: Option<(Pubkey, Eligibility)>,
    state: MintState,
    outcome: Option<MintOutcome>,
    next_attempt_id: u64,
}

impl Default for MintSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MintSession {
    pub fn new() -> Self {
        Self {
            source_url: None,
            metrics: None,
            price: None,
            eligibility: None,
            state: MintState::Idle,
            outcome: None,
            next_attempt_id: 1,
        }
    }

    pub fn state(&self) -> MintState {
        self.state
    }

    pub fn outcome(&self) -> Option<&MintOutcome> {
        self.outcome.as_ref()
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    pub fn metrics(&self) -> Option<&PostMetrics> {
        self.metrics.as_ref()
    }

    pub fn price(&self) -> Option<MintPrice> {
        self.price
    }

    /// Last eligibility read, whichever owner it was for.
    pub fn eligibility(&self) -> Eligibility {
        self.eligibility.as_ref().map(|(_, e)| *e).unwrap_or(Eligibility::Unknown)
    }

    /// Eligibility of `owner`. A read taken for another address counts as `Unknown`.
    pub fn eligibility_for(&self, owner: &str) -> Eligibility {
        match &self.eligibility {
            Some((read_for, eligibility)) if read_for == owner => *eligibility,
            _ => Eligibility::Unknown,
        }
    }

    /// Whether the stored eligibility was read for `owner`.
    pub fn has_eligibility_for(&self, owner: &str) -> bool {
        matches!(&self.eligibility, Some((read_for, _)) if read_for == owner)
    }

    /// Enter a new source post. Resets pricing, and the mint state unless an
    /// attempt is in flight.
    pub fn set_source_url(&mut self, url: impl Into<String>) {
        self.source_url = Some(url.into());
        self.clear_pricing();
    }

    /// Drop metrics and price, e.g. when a pricing request starts or fails.
    pub fn clear_pricing(&mut self) {
        self.metrics = None;
        self.price = None;
        if self.state != MintState::Minting {
            self.state = MintState::Idle;
            self.outcome = None;
        }
    }

    /// Install freshly fetched metrics and their price.
    pub fn apply_quote(&mut self, quote: PricingQuote) {
        self.metrics = Some(quote.metrics);
        self.price = quote.price;
        if self.state != MintState::Minting {
            self.state = MintState::PricingFetched;
            self.outcome = None;
        }
    }

    pub fn set_eligibility(&mut self, owner: impl Into<Pubkey>, eligibility: Eligibility) {
        self.eligibility = Some((owner.into(), eligibility));
    }

    /// Forget the balance read, e.g. when the wallet disconnects.
    pub fn clear_eligibility(&mut self) {
        self.eligibility = None;
    }

    /// Whether the mint action is enabled for the given owner.
    pub fn can_mint(&self, owner: Option<&str>, policy: UnknownBalancePolicy) -> bool {
        self.check_mint(owner, policy).is_ok()
    }

    /// The error `begin_mint` would return right now, if any.
    pub fn check_mint(&self, owner: Option<&str>, policy: UnknownBalancePolicy) -> Result<(), MintError> {
        self.check_preconditions(owner, policy).map(|_| ())
    }

    fn check_preconditions(
        &self,
        owner: Option<&str>,
        policy: UnknownBalancePolicy,
    ) -> Result<(Pubkey, String, PostMetrics, MintPrice), MintError> {
        if self.state == MintState::Minting {
            return Err(MintError::MintInProgress);
        }
        let owner = owner.ok_or(MintError::WalletNotConnected)?;
        let metrics = self.metrics.as_ref().ok_or(MintError::MetricsMissing)?;
        let tweet_id = metrics.post_id().ok_or(MintError::MetricsMissing)?;
        let price = self.price.ok_or(MintError::PriceMissing)?;

        match self.eligibility_for(owner) {
            Eligibility::Ineligible { balance } => {
                return Err(MintError::InsufficientBalance { balance })
            }
            Eligibility::Unknown if policy == UnknownBalancePolicy::Block => {
                return Err(MintError::BalanceUnknown)
            }
            _ => {}
        }

        Ok((owner.to_string(), tweet_id.to_string(), metrics.clone(), price))
    }

    /// Enter `Minting`, snapshotting the current metrics and price.
    pub fn begin_mint(
        &mut self,
        owner: Option<&str>,
        policy: UnknownBalancePolicy,
    ) -> Result<MintAttempt, MintError> {
        let (owner_address, tweet_id, metrics, price) = self.check_preconditions(owner, policy)?;

        let attempt = MintAttempt {
            attempt_id: self.next_attempt_id,
            source_url: self.source_url.clone().unwrap_or_default(),
            tweet_id,
            metrics,
            price,
            owner_address,
        };
        self.next_attempt_id += 1;
        self.state = MintState::Minting;
        self.outcome = Some(MintOutcome::Pending);
        Ok(attempt)
    }

    /// Record the terminal outcome of the in-flight attempt.
    /// Returns false if `attempt_id` is not the attempt in flight.
    pub fn finish(&mut self, attempt_id: u64, outcome: MintOutcome) -> bool {
        if self.state != MintState::Minting || attempt_id + 1 != self.next_attempt_id {
            return false;
        }
        self.state = outcome.state();
        self.outcome = Some(outcome);
        true
    }
}
