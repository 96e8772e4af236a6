//! Pricing client - resolves a source post URL to metrics and a mint price.

use crate::types::{MintPrice, PostMetrics, PricingQuote};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::{debug, warn, instrument};

#[async_trait]
pub trait PricingLookup: Send + Sync {
    async fn fetch_price(&self, source_url: &str) -> Result<PricingQuote>;
}

/// HTTP pricing client against the backend's `/v1/fetchprice` endpoint.
pub struct HttpPricingClient {
    http_client: Client,
    base_url: String,
    timeout: Duration,
    retry_attempts: usize,
}

impl HttpPricingClient {
    pub fn new(http_client: Client, base_url: impl Into<String>, timeout: Duration, retry_attempts: usize) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            timeout,
            retry_attempts,
        }
    }

    async fn fetch_body(&self, source_url: &str) -> Result<serde_json::Value> {
        let url = format!("{}/v1/fetchprice", self.base_url.trim_end_matches('/'));
        let response = self
            .http_client
            .get(&url)
            .query(&[("url", source_url)])
            .timeout(self.timeout)
            .send()
            .await
            .context("Failed to reach pricing service")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!(pricing_error_message(status, &text)));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse pricing response")?;

        debug!("Pricing response: {}", body);
        Ok(body)
    }
}

#[async_trait]
impl PricingLookup for HttpPricingClient {
    #[instrument(skip(self))]
    async fn fetch_price(&self, source_url: &str) -> Result<PricingQuote> {
        let retry_strategy = ExponentialBackoff::from_millis(100)
            .max_delay(Duration::from_secs(5))
            .take(self.retry_attempts);

        let body = Retry::spawn(retry_strategy, || self.fetch_body(source_url)).await?;
        parse_pricing_response(&body)
    }
}

/// Backend `error` text of a failed pricing response, or the status line.
fn pricing_error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| format!("Pricing service returned {}", status))
}

/// Parse `{metrics: {...}, price}`. Missing `metrics.tweet_id` is a hard
/// failure; a missing or unparseable price leaves the quote without a price.
pub fn parse_pricing_response(body: &serde_json::Value) -> Result<PricingQuote> {
    let metrics: PostMetrics = match body.get("metrics") {
        Some(m) if !m.is_null() => {
            serde_json::from_value(m.clone()).context("Malformed metrics in pricing response")?
        }
        _ => return Err(anyhow!("Could not fetch tweet data or tweetId.")),
    };
    if metrics.post_id().is_none() {
        return Err(anyhow!("Could not fetch tweet data or tweetId."));
    }

    let price = match body.get("price") {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .and_then(MintPrice::new);

    if price.is_none() {
        warn!("Pricing response for tweet {:?} carried no usable price", metrics.tweet_id);
    }

    Ok(PricingQuote { metrics, price })
}
