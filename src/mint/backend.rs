//! Backend collaborators: dedup + metadata upload, and mint persistence.

use crate::mint::types::{UploadOutcome, UploadRequest};
use crate::types::{MetadataLocation, MintRecord};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Dedup check plus metadata upload.
#[async_trait]
pub trait MetadataUploader: Send + Sync {
    /// `Ok(AlreadyMinted)` on a uniqueness violation; `Err` for any other
    /// non-success (status, malformed body, missing URI).
    async fn upload(&self, request: &UploadRequest) -> Result<UploadOutcome>;
}

/// Durable record of a successful mint.
#[async_trait]
pub trait MintPersistence: Send + Sync {
    async fn save_mint(&self, record: &MintRecord) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<ConflictData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConflictData {
    #[serde(default)]
    mint_address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveMintBody<'a> {
    tweet_id: &'a str,
    mint_address: &'a str,
    owner_wallet: &'a str,
    metadata_uri: &'a str,
    price_sol: Option<f64>,
    tx_signature: &'a str,
    tweet_data: TweetStats,
}

#[derive(Debug, Serialize)]
struct TweetStats {
    likes: Option<u64>,
    retweets: Option<u64>,
    replies: Option<u64>,
    view_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SaveMintResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the upload and save-mint endpoints.
pub struct HttpMintBackend {
    http_client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpMintBackend {
    pub fn new(http_client: Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            timeout,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl MetadataUploader for HttpMintBackend {
    #[instrument(skip(self, request), fields(tweet_id = %request.tweet_id))]
    async fn upload(&self, request: &UploadRequest) -> Result<UploadOutcome> {
        let response = self
            .http_client
            .post(self.endpoint("/v1/upload"))
            .json(request)
            .timeout(self.timeout)
            .send()
            .await
            .context("Failed to reach upload service")?;

        let status = response.status();
        let text = response.text().await.context("Failed to read upload response")?;
        debug!("Upload response {}: {}", status, text);

        interpret_upload_response(status, &text)
    }
}

#[async_trait]
impl MintPersistence for HttpMintBackend {
    #[instrument(skip(self, record), fields(tweet_id = %record.tweet_id, mint = %record.mint_address))]
    async fn save_mint(&self, record: &MintRecord) -> Result<()> {
        let body = SaveMintBody {
            tweet_id: &record.tweet_id,
            mint_address: &record.mint_address,
            owner_wallet: &record.owner_address,
            metadata_uri: record.metadata_location.as_str(),
            price_sol: record.price,
            tx_signature: &record.signature,
            tweet_data: TweetStats {
                likes: record.metrics.likes,
                retweets: record.metrics.retweets,
                replies: record.metrics.replies,
                view_count: record.metrics.view_count,
            },
        };

        let response: SaveMintResponse = self
            .http_client
            .post(self.endpoint("/v1/save-mint"))
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .context("Failed to reach persistence service")?
            .json()
            .await
            .context("Failed to parse save-mint response")?;

        if !response.success {
            return Err(anyhow!(
                "Failed to save mint: {}",
                response.error.unwrap_or_else(|| "unknown error".to_string())
            ));
        }

        info!("Mint data saved for tweet {}", record.tweet_id);
        Ok(())
    }
}

/// Map an upload HTTP response to an outcome.
pub fn interpret_upload_response(status: StatusCode, body: &str) -> Result<UploadOutcome> {
    let parsed: Option<UploadResponse> = serde_json::from_str(body).ok();

    if status == StatusCode::CONFLICT {
        let mint_address = parsed
            .and_then(|r| r.data)
            .and_then(|d| d.mint_address);
        return Ok(UploadOutcome::AlreadyMinted { mint_address });
    }

    let response = parsed.ok_or_else(|| anyhow!("Malformed upload response (status {})", status))?;

    if !status.is_success() {
        return Err(anyhow!(response
            .error
            .unwrap_or_else(|| "Failed to upload metadata".to_string())));
    }

    match response.uri.filter(|u| !u.is_empty()) {
        Some(uri) if response.success => Ok(UploadOutcome::Uploaded(MetadataLocation(uri))),
        _ => Err(anyhow!(response
            .error
            .unwrap_or_else(|| "No URI returned from upload".to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_surfaces_existing_address() {
        let body = r#"{"success": false, "data": {"mintAddress": "ExistingMint111"}}"#;
        let outcome = interpret_upload_response(StatusCode::CONFLICT, body).unwrap();
        assert_eq!(
            outcome,
            UploadOutcome::AlreadyMinted {
                mint_address: Some("ExistingMint111".to_string())
            }
        );
    }

    #[test]
    fn test_conflict_with_unreadable_body_is_still_conflict() {
        let outcome = interpret_upload_response(StatusCode::CONFLICT, "not json").unwrap();
        assert_eq!(outcome, UploadOutcome::AlreadyMinted { mint_address: None });
    }

    #[test]
    fn test_success_returns_location() {
        let body = r#"{"success": true, "uri": "https://arweave.net/abc"}"#;
        let outcome = interpret_upload_response(StatusCode::OK, body).unwrap();
        assert_eq!(
            outcome,
            UploadOutcome::Uploaded(MetadataLocation("https://arweave.net/abc".to_string()))
        );
    }

    #[test]
    fn test_upload_failures() {
        let err = interpret_upload_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error": "pinning failed"}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "pinning failed");

        assert!(interpret_upload_response(StatusCode::OK, "<html>").is_err());
        assert!(interpret_upload_response(StatusCode::OK, r#"{"success": true}"#).is_err());
        assert!(interpret_upload_response(StatusCode::OK, r#"{"success": false, "uri": "x"}"#).is_err());
    }

    #[test]
    fn test_save_body_shape() {
        let body = SaveMintBody {
            tweet_id: "42",
            mint_address: "Mint",
            owner_wallet: "Owner",
            metadata_uri: "uri",
            price_sol: Some(0.25),
            tx_signature: "Sig",
            tweet_data: TweetStats {
                likes: Some(1),
                retweets: None,
                replies: None,
                view_count: Some(2),
            },
        };
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["tweetId"], "42");
        assert_eq!(value["ownerWallet"], "Owner");
        assert_eq!(value["priceSol"], 0.25);
        assert_eq!(value["txSignature"], "Sig");
        assert_eq!(value["tweetData"]["view_count"], 2);
    }
}
