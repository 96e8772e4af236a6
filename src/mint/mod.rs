//! Mint module - turns a priced social post into a non-fungible asset.
//!
//! The session state machine is pure; pricing, upload, submission, lookup
//! and persistence are collaborators behind traits so the orchestrator can
//! be driven against real endpoints or test doubles.

pub mod types;
pub mod error;
pub mod session;
pub mod metadata;
pub mod classify;
pub mod balance_guard;
pub mod pricing;
pub mod backend;
pub mod chain;
pub mod reconciler;
pub mod orchestrator;

// Re-export main public types and the orchestrator
pub use orchestrator::{MintOrchestrator, SharedSession};
pub use error::MintError;
pub use session::{MintAttempt, MintSession, SharedSigner, WalletSession};
pub use types::{
    Eligibility, FailureReason, MintConfig, MintOutcome, MintState, RecoveryStrategy,
    SubmitError, SubmitErrorKind, UnknownBalancePolicy,
};

// Re-export collaborator seams for callers wiring their own clients
pub use backend::{HttpMintBackend, MetadataUploader, MintPersistence};
pub use balance_guard::{BalanceGuard, BalanceReader};
pub use chain::{MintChain, SolanaMintChain};
pub use pricing::{HttpPricingClient, PricingLookup};
pub use reconciler::{Reconciliation, TransactionReconciler};

/// Mint configuration builder with devnet defaults.
pub struct MintConfigBuilder {
    config: MintConfig,
}

impl MintConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: MintConfig::default(),
        }
    }

    /// Start from defaults overridden by the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            config: MintConfig::from_env()?,
        })
    }

    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.config.rpc_url = rpc_url.into();
        self
    }

    pub fn with_backend_url(mut self, backend_url: impl Into<String>) -> Self {
        self.config.backend_url = backend_url.into();
        self
    }

    /// Set the commitment level ("processed", "confirmed", "finalized").
    pub fn with_commitment(mut self, commitment: impl Into<String>) -> Self {
        self.config.commitment = commitment.into();
        self
    }

    pub fn with_min_balance(mut self, min_balance_sol: f64) -> Self {
        self.config.min_balance_sol = min_balance_sol;
        self
    }

    pub fn with_seller_fee(mut self, basis_points: u16) -> Self {
        self.config.seller_fee_basis_points = basis_points;
        self
    }

    /// Set the wait before an ambiguous transaction is looked up.
    pub fn with_confirmation_grace_ms(mut self, grace_ms: u64) -> Self {
        self.config.confirmation_grace_ms = grace_ms;
        self
    }

    pub fn with_request_timeout(mut self, timeout_secs: u64) -> Self {
        self.config.request_timeout_secs = timeout_secs;
        self
    }

    pub fn with_retries(mut self, pricing_attempts: usize, persist_attempts: usize) -> Self {
        self.config.pricing_retry_attempts = pricing_attempts;
        self.config.persist_retry_attempts = persist_attempts;
        self
    }

    pub fn with_unknown_balance_policy(mut self, policy: UnknownBalancePolicy) -> Self {
        self.config.unknown_balance_policy = policy;
        self
    }

    pub fn with_recovery_strategy(mut self, strategy: RecoveryStrategy) -> Self {
        self.config.recovery_strategy = strategy;
        self
    }

    pub fn with_explorer_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.config.explorer_cluster = cluster.into();
        self
    }

    pub fn with_placeholder_image(mut self, image: impl Into<String>) -> Self {
        self.config.placeholder_image = image.into();
        self
    }

    pub fn build_config(self) -> MintConfig {
        self.config
    }

    /// Build an orchestrator wired to the configured HTTP backend and RPC endpoint.
    pub fn build(self) -> anyhow::Result<MintOrchestrator> {
        MintOrchestrator::from_config(self.config)
    }
}

impl Default for MintConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
