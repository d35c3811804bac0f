//! Head asset capability.
//!
//! Produces an optional image reference placed under the document title.
//! Asset failures never fail a session.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::OutputConfig;
use crate::types::Result;

#[async_trait]
pub trait AssetProvider: Send + Sync {
    /// Reference (path or URL) for the document's head asset, if any
    async fn head_asset(&self, title: &str, topic: &str) -> Result<Option<String>>;
}

pub type SharedAssetProvider = Arc<dyn AssetProvider>;

/// Default: documents have no head asset
#[derive(Debug, Default)]
pub struct NoAsset;

#[async_trait]
impl AssetProvider for NoAsset {
    async fn head_asset(&self, _title: &str, _topic: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// A fixed, pre-existing asset
#[derive(Debug, Clone)]
pub struct StaticAsset(pub String);

#[async_trait]
impl AssetProvider for StaticAsset {
    async fn head_asset(&self, _title: &str, _topic: &str) -> Result<Option<String>> {
        Ok(Some(self.0.clone()))
    }
}

pub fn from_config(config: &OutputConfig) -> SharedAssetProvider {
    match &config.head_asset {
        Some(reference) if !reference.trim().is_empty() => {
            Arc::new(StaticAsset(reference.trim().to_string()))
        }
        _ => Arc::new(NoAsset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config() {
        let none = from_config(&OutputConfig::default());
        assert_eq!(none.head_asset("T", "t").await.unwrap(), None);

        let fixed = from_config(&OutputConfig {
            head_asset: Some(" images/head.png ".to_string()),
            ..Default::default()
        });
        assert_eq!(
            fixed.head_asset("T", "t").await.unwrap().as_deref(),
            Some("images/head.png")
        );
    }
}
