//! ERP stock debit client
//!
//! The debit endpoint has no compare-and-swap semantics: a duplicate call
//! physically double-subtracts stock. The call is therefore a single
//! bounded attempt, and a timeout is reported as [`DebitOutcome::Timeout`]
//! so the executor can apply the timeout-as-success policy instead of
//! retrying.
//!
//! Which body field names the origin depot and which the destination
//! depends on the physical source depot; the mapping is configuration
//! data, never hard-coded per deployment.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::models::{DepotCode, PackRef};

/// Per-depot debit direction: field names and the counterparty code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebitDirection {
    /// JSON field carrying the source depot code
    pub origin_field: String,
    /// JSON field carrying the destination code
    pub destination_field: String,
    /// Destination code written into `destination_field`
    pub destination_code: String,
}

/// One unit debit request (quantity is always 1 at this layer)
#[derive(Debug, Clone)]
pub struct DebitRequest {
    pub pack: PackRef,
    /// Resolved barcode/SKU code for the unit
    pub code: String,
    pub depot: DepotCode,
    /// Descriptive metadata shown in the ERP movement log
    pub description: String,
}

/// Outcome of one debit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebitOutcome {
    /// 2xx reply
    Confirmed,
    /// The reply never arrived; the server may or may not have debited
    Timeout,
    /// Confirmed failure (non-2xx or transport error before send)
    Failed(String),
}

#[async_trait]
pub trait ErpApi: Send + Sync {
    /// Single bounded attempt. Never retried by any caller.
    async fn debit_stock(&self, request: &DebitRequest) -> DebitOutcome;
}

/// HTTP-backed ERP client
pub struct HttpErpApi {
    client: Client,
    base_url: String,
    directions: HashMap<DepotCode, DebitDirection>,
}

impl HttpErpApi {
    pub fn new(
        base_url: impl Into<String>,
        directions: HashMap<DepotCode, DebitDirection>,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            directions,
        }
    }

    fn build_body(&self, request: &DebitRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "pack": request.pack.as_str(),
            "code": request.code,
            "qty": 1,
            "description": request.description,
        });

        if let Some(direction) = self.directions.get(&request.depot) {
            body[direction.origin_field.as_str()] =
                serde_json::Value::String(request.depot.to_string());
            body[direction.destination_field.as_str()] =
                serde_json::Value::String(direction.destination_code.clone());
        } else {
            body["depot"] = serde_json::Value::String(request.depot.to_string());
        }

        body
    }
}

#[async_trait]
impl ErpApi for HttpErpApi {
    async fn debit_stock(&self, request: &DebitRequest) -> DebitOutcome {
        let url = format!("{}/movements", self.base_url);
        let body = self.build_body(request);

        match self.client.post(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => DebitOutcome::Confirmed,
            Ok(resp) => {
                let status = resp.status().as_u16();
                let text = resp.text().await.unwrap_or_default();
                DebitOutcome::Failed(format!("status {status}: {text}"))
            }
            Err(e) if e.is_timeout() => DebitOutcome::Timeout,
            Err(e) => DebitOutcome::Failed(e.to_string()),
        }
    }
}
