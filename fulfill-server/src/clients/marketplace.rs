//! Marketplace order / note API client
//!
//! Orders and their free-text note field live on the marketplace side.
//! A rejected note write is a hard failure: no local state is assumed
//! durable after it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use shared::models::Order;

use super::{ClientError, ClientResult};

#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// Fetch a single order by id or pack reference
    async fn get_order(&self, order_ref: &str) -> ClientResult<Order>;

    /// All currently-open (not yet fulfilled) orders; feeds the
    /// reservation ledger
    async fn open_orders(&self) -> ClientResult<Vec<Order>>;

    /// Overwrite the order's note text
    async fn write_note(&self, order_id: &str, note: &str) -> ClientResult<()>;
}

/// HTTP-backed marketplace client
pub struct HttpMarketplaceApi {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct NotePayload<'a> {
    note: &'a str,
}

impl HttpMarketplaceApi {
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
impl MarketplaceApi for HttpMarketplaceApi {
    async fn get_order(&self, order_ref: &str) -> ClientResult<Order> {
        let url = format!("{}/orders/{}", self.base_url, order_ref);
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(ClientError::Status {
                status: resp.status().as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        resp.json()
            .await
            .map_err(|e| ClientError::Malformed(e.to_string()))
    }

    async fn open_orders(&self) -> ClientResult<Vec<Order>> {
        let url = format!("{}/orders", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("status", "open")])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ClientError::Status {
                status: resp.status().as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        resp.json()
            .await
            .map_err(|e| ClientError::Malformed(e.to_string()))
    }

    async fn write_note(&self, order_id: &str, note: &str) -> ClientResult<()> {
        let url = format!("{}/orders/{}/note", self.base_url, order_id);
        let resp = self
            .client
            .put(&url)
            .json(&NotePayload { note })
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 403 {
            return Err(ClientError::Rejected(
                resp.text().await.unwrap_or_default(),
            ));
        }
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}
