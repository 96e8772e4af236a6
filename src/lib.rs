//! tweet-minter - mint a social post as a non-fungible asset on Solana
//!
//! This crate prices a post through a backend, guards the owner's balance,
//! uploads metadata with a duplicate check, submits the mint and recovers
//! the outcome of submissions whose confirmation was ambiguous.

pub mod types;
pub mod mint;

// Re-export main types for convenience
pub use types::{MetadataLocation, MintPrice, MintRecord, PostMetrics, PricingQuote};
pub use mint::{MintConfig, MintConfigBuilder, MintError, MintOrchestrator, MintOutcome, MintSession};
