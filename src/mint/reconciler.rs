//! Transaction reconciler - recovers the outcome of an ambiguous submission.
//!
//! Runs only for `SubmitErrorKind::Ambiguous`. After a grace period it looks
//! the signed transaction up on the network and, when it landed, derives a
//! candidate mint address from it. Anything short of a confirmed, error-free
//! transaction with a candidate address is reported as unresolved.

use crate::mint::chain::MintChain;
use crate::mint::types::{ChainTransaction, RecoveryStrategy, SubmitError};
use crate::types::{MetadataLocation, Pubkey};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, instrument};

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    Recovered {
        mint_address: Pubkey,
        signature: String,
    },
    Unresolved {
        reason: String,
    },
}

pub struct TransactionReconciler {
    chain: Arc<dyn MintChain>,
    grace_period: Duration,
    strategy: RecoveryStrategy,
}

impl TransactionReconciler {
    pub fn new(chain: Arc<dyn MintChain>, grace_period: Duration, strategy: RecoveryStrategy) -> Self {
        Self {
            chain,
            grace_period,
            strategy,
        }
    }

    #[instrument(skip(self, error, metadata_location), fields(signature = ?error.signature))]
    pub async fn reconcile(
        &self,
        error: &SubmitError,
        metadata_location: Option<&MetadataLocation>,
    ) -> Reconciliation {
        let Some(signature) = error.signature.as_deref() else {
            return unresolved("no transaction signature to look up");
        };

        info!(
            "Transaction may have been processed. Checking {} in {:?}",
            signature, self.grace_period
        );
        tokio::time::sleep(self.grace_period).await;

        let transaction = match self.chain.get_transaction(signature).await {
            Ok(Some(tx)) => tx,
            Ok(None) => return unresolved("transaction not found"),
            Err(e) => {
                warn!("Error looking up transaction {}: {:#}", signature, e);
                return unresolved("transaction lookup failed");
            }
        };

        if let Some(err) = &transaction.err {
            return unresolved(&format!("transaction failed on-chain: {}", err));
        }

        let Some(mint_address) =
            candidate_mint_address(&transaction, self.strategy, error.mint_address.as_deref())
        else {
            return unresolved("no candidate mint address in transaction");
        };

        if metadata_location.is_none() {
            return unresolved("no metadata location captured");
        }

        info!("Recovered mint {} from transaction {}", mint_address, signature);
        Reconciliation::Recovered {
            mint_address,
            signature: signature.to_string(),
        }
    }
}

/// Candidate mint address of a found transaction.
///
/// `FirstAccountKey` is an approximation: the first key of a transaction is
/// usually its fee payer. `ExpectedMintKey` only accepts the key generated
/// for the attempt, and only when the transaction references it.
pub fn candidate_mint_address(
    transaction: &ChainTransaction,
    strategy: RecoveryStrategy,
    expected_mint: Option<&str>,
) -> Option<Pubkey> {
    match strategy {
        RecoveryStrategy::FirstAccountKey => transaction.account_keys.first().cloned(),
        RecoveryStrategy::ExpectedMintKey => {
            let expected = expected_mint?;
            transaction
                .account_keys
                .iter()
                .find(|k| k.as_str() == expected)
                .cloned()
        }
    }
}

fn unresolved(reason: &str) -> Reconciliation {
    warn!("Reconciliation unresolved: {}", reason);
    Reconciliation::Unresolved {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mint::session::SharedSigner;
    use crate::mint::types::{MintRequest, SubmitErrorKind, SubmittedMint};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct LandedChain {
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl MintChain for LandedChain {
        async fn submit_mint(
            &self,
            _signer: SharedSigner,
            _request: &MintRequest,
        ) -> Result<SubmittedMint, SubmitError> {
            Err(SubmitError::new(SubmitErrorKind::Unknown, "not used"))
        }

        async fn get_transaction(&self, _signature: &str) -> Result<Option<ChainTransaction>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(Some(transaction(&["Payer", "Mint"])))
        }
    }

    fn reconciler(chain: Arc<LandedChain>) -> TransactionReconciler {
        TransactionReconciler::new(chain, Duration::from_secs(3), RecoveryStrategy::FirstAccountKey)
    }

    fn ambiguous() -> SubmitError {
        SubmitError::new(SubmitErrorKind::Ambiguous, "already been processed").with_signature("Sig")
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_metadata_location_is_unresolved() {
        let chain = Arc::new(LandedChain {
            lookups: AtomicUsize::new(0),
        });

        let result = reconciler(chain.clone()).reconcile(&ambiguous(), None).await;

        assert!(matches!(result, Reconciliation::Unresolved { .. }));
        assert_eq!(chain.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_landed_transaction_with_location_is_recovered() {
        let chain = Arc::new(LandedChain {
            lookups: AtomicUsize::new(0),
        });
        let location = MetadataLocation("https://arweave.net/abc".to_string());

        let result = reconciler(chain).reconcile(&ambiguous(), Some(&location)).await;

        assert_eq!(
            result,
            Reconciliation::Recovered {
                mint_address: "Payer".to_string(),
                signature: "Sig".to_string(),
            }
        );
    }

    fn transaction(keys: &[&str]) -> ChainTransaction {
        ChainTransaction {
            signature: "Sig".to_string(),
            slot: 1,
            account_keys: keys.iter().map(|k| k.to_string()).collect(),
            err: None,
        }
    }

    #[test]
    fn test_first_account_key_heuristic() {
        let tx = transaction(&["Payer", "Mint", "Metadata"]);
        assert_eq!(
            candidate_mint_address(&tx, RecoveryStrategy::FirstAccountKey, None),
            Some("Payer".to_string())
        );
        assert_eq!(
            candidate_mint_address(&transaction(&[]), RecoveryStrategy::FirstAccountKey, None),
            None
        );
    }

    #[test]
    fn test_expected_mint_key_requires_reference() {
        let tx = transaction(&["Payer", "Mint", "Metadata"]);
        assert_eq!(
            candidate_mint_address(&tx, RecoveryStrategy::ExpectedMintKey, Some("Mint")),
            Some("Mint".to_string())
        );
        assert_eq!(
            candidate_mint_address(&tx, RecoveryStrategy::ExpectedMintKey, Some("Other")),
            None
        );
        assert_eq!(
            candidate_mint_address(&tx, RecoveryStrategy::ExpectedMintKey, None),
            None
        );
    }
}
