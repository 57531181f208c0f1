//! 外部接口客户端
//!
//! Every external collaborator is specified at its interface boundary only:
//!
//! - [`stock`] - per-SKU depot stock snapshot query
//! - [`marketplace`] - order / note API
//! - [`erp`] - stock debit call
//! - [`label`] - shipping label fetch + print
//! - [`lookup`] - barcode⇄SKU resolution
//! - [`memory`] - in-memory backends for tests and offline development
//!
//! Each client is an `async_trait` seam with a reqwest-backed production
//! implementation; the engine only ever sees the trait.

pub mod erp;
pub mod label;
pub mod lookup;
pub mod marketplace;
pub mod memory;
pub mod stock;

pub use erp::{DebitOutcome, DebitRequest, ErpApi, HttpErpApi};
pub use label::{HttpLabelApi, LabelApi};
pub use lookup::{BarcodeLookup, CodeResolver, HttpBarcodeLookup, ResolvedCode};
pub use marketplace::{HttpMarketplaceApi, MarketplaceApi};
pub use stock::{HttpStockSource, StockSnapshotSource};

use thiserror::Error;

/// Transport/protocol level client error
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The remote rejected the operation (permissions, validation)
    #[error("Rejected by remote: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
