//! Barcode⇄SKU resolution
//!
//! Resolution priority for a scanned code:
//!
//! 1. manual override table (small fixed set of known-special codes)
//! 2. database-backed lookup
//! 3. deterministic derivation for the six-digit numeric SKU family
//! 4. unresolved
//!
//! All inputs are normalized before any comparison.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::sku::{derive_barcode, normalize};

use super::{ClientError, ClientResult};

/// A resolved (SKU, canonical barcode) pair, both normalized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCode {
    pub sku: String,
    pub barcode: String,
}

/// Database-backed counterpart lookup
#[async_trait]
pub trait BarcodeLookup: Send + Sync {
    /// Resolve a normalized code (scanned literal or SKU) to its
    /// counterpart pair, or `None` when the database has no entry.
    async fn lookup(&self, normalized: &str) -> ClientResult<Option<ResolvedCode>>;
}

/// HTTP-backed lookup client
pub struct HttpBarcodeLookup {
    client: Client,
    base_url: String,
}

impl HttpBarcodeLookup {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl BarcodeLookup for HttpBarcodeLookup {
    async fn lookup(&self, normalized: &str) -> ClientResult<Option<ResolvedCode>> {
        let url = format!("{}/resolve/{}", self.base_url, normalized);
        let resp = self.client.get(&url).send().await?;

        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(ClientError::Status {
                status: resp.status().as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let resolved: ResolvedCode = resp
            .json()
            .await
            .map_err(|e| ClientError::Malformed(e.to_string()))?;

        Ok(Some(ResolvedCode {
            sku: normalize(&resolved.sku),
            barcode: normalize(&resolved.barcode),
        }))
    }
}

/// Full resolution chain: overrides → database → derivation
pub struct CodeResolver {
    overrides: HashMap<String, ResolvedCode>,
    db: Arc<dyn BarcodeLookup>,
}

impl CodeResolver {
    pub fn new(overrides: HashMap<String, ResolvedCode>, db: Arc<dyn BarcodeLookup>) -> Self {
        // Override keys are matched post-normalization as well
        let overrides = overrides
            .into_iter()
            .map(|(k, v)| {
                (
                    normalize(&k),
                    ResolvedCode {
                        sku: normalize(&v.sku),
                        barcode: normalize(&v.barcode),
                    },
                )
            })
            .collect();

        Self { overrides, db }
    }

    /// Resolve a raw scanned code. `None` means unresolved: the scan is
    /// reported as "not found" without touching session state.
    pub async fn resolve(&self, raw_code: &str) -> ClientResult<Option<ResolvedCode>> {
        let code = normalize(raw_code);
        if code.is_empty() {
            return Ok(None);
        }

        if let Some(hit) = self.overrides.get(&code) {
            return Ok(Some(hit.clone()));
        }

        if let Some(hit) = self.db.lookup(&code).await? {
            return Ok(Some(hit));
        }

        if let Some(derived) = derive_barcode(&code) {
            return Ok(Some(ResolvedCode {
                sku: code,
                barcode: derived,
            }));
        }

        Ok(None)
    }
}
