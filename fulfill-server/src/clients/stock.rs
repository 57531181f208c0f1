//! Stock snapshot query client
//!
//! For one SKU, returns total on-hand quantity per depot. Structured SKUs
//! are sent as their article/color/size components; prefix-style literals
//! as a single collapsed key. Deny-listed depot codes (control/staging
//! depots) are removed before the snapshot reaches the ranker.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shared::models::DepotCode;
use shared::sku::Sku;

use super::{ClientError, ClientResult};

/// Source of per-depot on-hand totals for one SKU
#[async_trait]
pub trait StockSnapshotSource: Send + Sync {
    /// Fetch on-hand totals per depot. The result is already filtered
    /// through the deny-list.
    async fn fetch_totals(&self, sku: &Sku) -> ClientResult<BTreeMap<DepotCode, i64>>;
}

/// HTTP-backed stock source
pub struct HttpStockSource {
    client: Client,
    base_url: String,
    denied: HashSet<DepotCode>,
}

impl HttpStockSource {
    pub fn new(
        base_url: impl Into<String>,
        denied: impl IntoIterator<Item = DepotCode>,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            denied: denied.into_iter().collect(),
        }
    }

    fn filter_denied(&self, totals: BTreeMap<String, i64>) -> BTreeMap<DepotCode, i64> {
        totals
            .into_iter()
            .map(|(code, qty)| (DepotCode::new(code), qty))
            .filter(|(code, _)| !self.denied.contains(code))
            .collect()
    }
}

#[async_trait]
impl StockSnapshotSource for HttpStockSource {
    async fn fetch_totals(&self, sku: &Sku) -> ClientResult<BTreeMap<DepotCode, i64>> {
        let url = format!("{}/stock", self.base_url);

        let request = match sku {
            Sku::Structured {
                article,
                color,
                size,
            } => self.client.get(&url).query(&[
                ("article", article.as_str()),
                ("color", color.as_str()),
                ("size", size.as_str()),
            ]),
            Sku::Literal(key) => self.client.get(&url).query(&[("key", key.as_str())]),
        };

        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::Status {
                status: resp.status().as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let totals: BTreeMap<String, i64> = resp
            .json()
            .await
            .map_err(|e| ClientError::Malformed(e.to_string()))?;

        Ok(self.filter_denied(totals))
    }
}
