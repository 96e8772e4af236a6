//! Asset metadata construction from a post metrics snapshot.

use crate::types::{AssetMetadata, AssetProperties, Attribute, AttributeValue, PostMetrics};

/// Longest name the token metadata program accepts.
pub const MAX_ONCHAIN_NAME_LEN: usize = 32;

const DEFAULT_DESCRIPTION: &str = "NFT representing a tweet on X";

/// Build the metadata document for one mint attempt.
///
/// Deterministic for a given snapshot. Absent counts render as 0 and absent
/// strings as empty, so a partially populated snapshot never fails here.
pub fn build_asset_metadata(metrics: &PostMetrics, source_url: &str, image: &str) -> AssetMetadata {
    let handle = metrics.author_handle().unwrap_or("");

    let name = format!(
        "Tweet by @{}",
        if handle.is_empty() { "unknown" } else { handle }
    );
    let description = metrics
        .text
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_DESCRIPTION)
        .to_string();

    let attributes = vec![
        text_attribute("Tweet ID", metrics.tweet_id.as_deref().unwrap_or("")),
        text_attribute("Author", metrics.author_name()),
        text_attribute("Username", &format!("@{}", handle)),
        count_attribute("Likes", metrics.likes),
        count_attribute("Retweets", metrics.retweets),
        count_attribute("Views", metrics.view_count),
    ];

    AssetMetadata {
        name,
        description,
        image: image.to_string(),
        attributes,
        properties: AssetProperties {
            category: "tweet".to_string(),
            external_url: source_url.to_string(),
        },
    }
}

/// Name as written on-chain, truncated on a char boundary.
pub fn onchain_name(name: &str) -> String {
    if name.len() <= MAX_ONCHAIN_NAME_LEN {
        return name.to_string();
    }
    let mut out = String::with_capacity(MAX_ONCHAIN_NAME_LEN);
    for c in name.chars() {
        if out.len() + c.len_utf8() > MAX_ONCHAIN_NAME_LEN {
            break;
        }
        out.push(c);
    }
    out
}

/// Explorer page for an address on the given cluster.
pub fn explorer_address_url(address: &str, cluster: &str) -> String {
    format!("https://explorer.solana.com/address/{}?cluster={}", address, cluster)
}

fn text_attribute(trait_type: &str, value: &str) -> Attribute {
    Attribute {
        trait_type: trait_type.to_string(),
        value: AttributeValue::Text(value.to_string()),
    }
}

fn count_attribute(trait_type: &str, value: Option<u64>) -> Attribute {
    Attribute {
        trait_type: trait_type.to_string(),
        value: AttributeValue::Number(value.unwrap_or(0)),
    }
}
