//! Shipping label client
//!
//! The label payload must be fetched fresh on every print attempt; a
//! stale downloaded payload is never reused across retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{ClientError, ClientResult};

#[async_trait]
pub trait LabelApi: Send + Sync {
    /// Download the printable payload for a shipment
    async fn fetch_label(&self, shipping_ref: &str) -> ClientResult<Vec<u8>>;

    /// Send a payload to the label printer
    async fn print_label(&self, shipping_ref: &str, payload: &[u8]) -> ClientResult<()>;
}

/// HTTP-backed label service client
pub struct HttpLabelApi {
    client: Client,
    base_url: String,
}

impl HttpLabelApi {
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
impl LabelApi for HttpLabelApi {
    async fn fetch_label(&self, shipping_ref: &str) -> ClientResult<Vec<u8>> {
        let url = format!("{}/labels/{}", self.base_url, shipping_ref);
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(ClientError::Status {
                status: resp.status().as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        Ok(resp.bytes().await?.to_vec())
    }

    async fn print_label(&self, shipping_ref: &str, payload: &[u8]) -> ClientResult<()> {
        let url = format!("{}/print/{}", self.base_url, shipping_ref);
        let resp = self
            .client
            .post(&url)
            .body(payload.to_vec())
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ClientError::Status {
                status: resp.status().as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}
