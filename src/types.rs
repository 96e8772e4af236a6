//! Core types and data structures for the tweet minting workflow.

use serde::{Deserialize, Deserializer, Serialize};

/// Base58 address representation used across collaborator boundaries.
pub type Pubkey = String;

/// Symbol of the network's native unit.
pub const NATIVE_UNIT: &str = "SOL";

/// Author of the source post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostAuthor {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Handle without the leading "@"
    #[serde(default, rename = "screen_name", alias = "handle")]
    pub handle: Option<String>,
}

/// Priceable metrics of a source post, as returned by the pricing backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostMetrics {
    /// Identifier unique to the source post
    #[serde(default, deserialize_with = "lenient_id")]
    pub tweet_id: Option<String>,
    #[serde(default)]
    pub user: Option<PostAuthor>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub likes: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub retweets: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub replies: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub view_count: Option<u64>,
}

impl PostMetrics {
    /// Returns the post identifier if present and non-empty.
    pub fn post_id(&self) -> Option<&str> {
        self.tweet_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn author_name(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|u| u.name.as_deref())
            .unwrap_or("")
    }

    pub fn author_handle(&self) -> Option<&str> {
        self.user
            .as_ref()
            .and_then(|u| u.handle.as_deref())
            .filter(|h| !h.is_empty())
    }

    /// Trimmed snapshot sent along with uploads and mint records.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tweet_id: self.tweet_id.clone(),
            likes: self.likes,
            retweets: self.retweets,
            replies: self.replies,
            view_count: self.view_count,
        }
    }
}

/// Trimmed metrics carried to the dedup/upload and persistence collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweet_id: Option<String>,
    pub likes: Option<u64>,
    pub retweets: Option<u64>,
    pub replies: Option<u64>,
    pub view_count: Option<u64>,
}

/// Non-negative mint price quote in native units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MintPrice(f64);

impl MintPrice {
    /// Returns `None` for negative or non-finite values.
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && value >= 0.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Price as shown to the user, e.g. "0.2500 SOL".
    pub fn display(&self) -> String {
        format!("{:.4} {}", self.0, NATIVE_UNIT)
    }
}

/// Result of a pricing lookup: metrics plus the price quoted for them.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingQuote {
    pub metrics: PostMetrics,
    pub price: Option<MintPrice>,
}

/// Value of a metadata attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(u64),
    Text(String),
}

/// Metadata attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetProperties {
    pub category: String,
    pub external_url: String,
}

/// Descriptive document hosted off-chain and referenced by the mint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    pub attributes: Vec<Attribute>,
    pub properties: AssetProperties,
}

/// URI returned by the upload step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataLocation(pub String);

impl MetadataLocation {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MetadataLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable outcome of a mint, one per source post identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MintRecord {
    pub tweet_id: String,
    pub mint_address: Pubkey,
    pub owner_address: Pubkey,
    pub metadata_location: MetadataLocation,
    pub price: Option<f64>,
    pub signature: String,
    pub metrics: MetricsSnapshot,
    /// Unix timestamp (ms) when the record was created
    pub minted_at: u64,
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(serde_json::Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_parse_lenient_fields() {
        let json = r#"{
            "tweet_id": 42,
            "user": {"name": "Alice", "screen_name": "alice"},
            "likes": "100",
            "retweets": 10,
            "view_count": null
        }"#;
        let metrics: PostMetrics = serde_json::from_str(json).unwrap();

        assert_eq!(metrics.post_id(), Some("42"));
        assert_eq!(metrics.author_handle(), Some("alice"));
        assert_eq!(metrics.likes, Some(100));
        assert_eq!(metrics.retweets, Some(10));
        assert_eq!(metrics.view_count, None);
        assert_eq!(metrics.replies, None);
    }

    #[test]
    fn test_empty_tweet_id_is_absent() {
        let metrics = PostMetrics {
            tweet_id: Some(String::new()),
            ..PostMetrics::default()
        };
        assert_eq!(metrics.post_id(), None);
    }

    #[test]
    fn test_price_display() {
        let price = MintPrice::new(0.25).unwrap();
        assert_eq!(price.display(), "0.2500 SOL");
    }

    #[test]
    fn test_price_rejects_negative_and_nan() {
        assert!(MintPrice::new(-0.1).is_none());
        assert!(MintPrice::new(f64::NAN).is_none());
        assert!(MintPrice::new(0.0).is_some());
    }

    #[test]
    fn test_snapshot_serializes_snake_case() {
        let metrics = PostMetrics {
            tweet_id: Some("7".to_string()),
            likes: Some(3),
            ..PostMetrics::default()
        };
        let value = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(value["tweet_id"], "7");
        assert_eq!(value["likes"], 3);
        assert!(value["view_count"].is_null());
    }
}
