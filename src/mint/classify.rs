//! Classification of mint submission failures.
//!
//! Typed sources (transaction errors, signer errors, RPC client errors) map
//! directly to a `SubmitErrorKind`. `classify_message` is the fallback for
//! sources that only expose free text.

use crate::mint::types::SubmitErrorKind;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_sdk::signer::SignerError;
use solana_sdk::transaction::TransactionError;

/// Lowercased markers, checked in order. Ambiguous markers come first: the
/// confirmation-timeout text also mentions expiration and insufficient funds.
const AMBIGUOUS_MARKERS: &[&str] = &[
    "already been processed",
    "alreadyprocessed",
    "unable to confirm transaction",
];
const DUPLICATE_SIMULATION_MARKERS: &[&str] = &["already", "duplicate"];
const INSUFFICIENT_MARKERS: &[&str] = &["insufficient"];
const EXPIRED_MARKERS: &[&str] = &["blockhash", "block height exceeded"];
const REJECTED_MARKERS: &[&str] = &["user rejected", "user cancel", "rejected the request"];

/// Classify an untyped error message.
pub fn classify_message(message: &str) -> SubmitErrorKind {
    let msg = message.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| msg.contains(m));

    if has(AMBIGUOUS_MARKERS) {
        return SubmitErrorKind::Ambiguous;
    }
    if msg.contains("simulation failed") && has(DUPLICATE_SIMULATION_MARKERS) {
        return SubmitErrorKind::Ambiguous;
    }
    if has(REJECTED_MARKERS) {
        return SubmitErrorKind::UserRejected;
    }
    if has(INSUFFICIENT_MARKERS) {
        return SubmitErrorKind::InsufficientFunds;
    }
    if has(EXPIRED_MARKERS) {
        return SubmitErrorKind::Expired;
    }
    SubmitErrorKind::Unknown
}

pub fn classify_transaction_error(err: &TransactionError) -> SubmitErrorKind {
    match err {
        TransactionError::AlreadyProcessed => SubmitErrorKind::Ambiguous,
        TransactionError::BlockhashNotFound => SubmitErrorKind::Expired,
        TransactionError::InsufficientFundsForFee
        | TransactionError::InsufficientFundsForRent { .. }
        | TransactionError::AccountNotFound => SubmitErrorKind::InsufficientFunds,
        _ => SubmitErrorKind::Unknown,
    }
}

pub fn classify_signer_error(err: &SignerError) -> SubmitErrorKind {
    match err {
        SignerError::UserCancel(_) => SubmitErrorKind::UserRejected,
        other => classify_message(&other.to_string()),
    }
}

pub fn classify_client_error(err: &ClientError) -> SubmitErrorKind {
    if let Some(tx_err) = err.get_transaction_error() {
        let kind = classify_transaction_error(&tx_err);
        if kind != SubmitErrorKind::Unknown {
            return kind;
        }
    }
    match &err.kind {
        ClientErrorKind::SigningError(signer_err) => classify_signer_error(signer_err),
        _ => classify_message(&err.to_string()),
    }
}
