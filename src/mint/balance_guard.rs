//! Balance guard - gates mint eligibility on the owner's spendable balance.

use crate::mint::types::Eligibility;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn, instrument};

/// Reads an address's spendable balance in native units.
#[async_trait]
pub trait BalanceReader: Send + Sync {
    async fn get_balance(&self, address: &str) -> Result<f64>;
}

pub struct BalanceGuard {
    reader: Arc<dyn BalanceReader>,
    threshold: f64,
}

impl BalanceGuard {
    pub fn new(reader: Arc<dyn BalanceReader>, threshold: f64) -> Self {
        Self { reader, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// True when the balance covers the threshold (inclusive).
    pub fn is_eligible(balance: f64, threshold: f64) -> bool {
        balance >= threshold
    }

    /// Eligibility for a balance that may not be known yet.
    pub fn evaluate(&self, balance: Option<f64>) -> Eligibility {
        match balance {
            Some(balance) if Self::is_eligible(balance, self.threshold) => {
                Eligibility::Eligible { balance }
            }
            Some(balance) => Eligibility::Ineligible { balance },
            None => Eligibility::Unknown,
        }
    }

    /// Read the balance; a failed read yields `Unknown`, never `Ineligible`.
    #[instrument(skip(self))]
    pub async fn check(&self, address: &str) -> Eligibility {
        match self.reader.get_balance(address).await {
            Ok(balance) => {
                info!("Balance for {}: {:.4} SOL", address, balance);
                self.evaluate(Some(balance))
            }
            Err(e) => {
                warn!("Failed to read balance for {}: {:#}", address, e);
                Eligibility::Unknown
            }
        }
    }
}
