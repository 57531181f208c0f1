//! Reservation ledger
//!
//! Reserved-but-unfulfilled quantity per depot for one SKU, derived from
//! currently-open order records. The depot association comes from the
//! live assignment records; the quantity from the order item itself.
//! Fulfilled, cancelled and exhausted items contribute nothing.

use std::collections::BTreeMap;
use std::sync::Arc;

use shared::models::{DepotCode, ItemStatus};
use shared::sku::normalize;

use crate::clients::{ClientError, MarketplaceApi};
use crate::store::{FulfillStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Computes already-reserved quantities per depot for a SKU
pub struct ReservationLedger {
    marketplace: Arc<dyn MarketplaceApi>,
    store: FulfillStore,
}

impl ReservationLedger {
    pub fn new(marketplace: Arc<dyn MarketplaceApi>, store: FulfillStore) -> Self {
        Self { marketplace, store }
    }

    /// Reserved quantity per depot for `sku` (normalized text form)
    pub async fn reserved_for(
        &self,
        sku_normalized: &str,
    ) -> Result<BTreeMap<DepotCode, i64>, LedgerError> {
        let open_orders = self.marketplace.open_orders().await?;
        let records = self.store.live_assignments()?;

        let mut reserved: BTreeMap<DepotCode, i64> = BTreeMap::new();

        for record in records {
            if record.sku != sku_normalized {
                continue;
            }
            let Some(depot) = record.depot.clone() else {
                continue;
            };

            let Some(order) = open_orders.iter().find(|o| o.id == record.order_id) else {
                continue;
            };
            let Some(item) = order.items.get(record.item_index as usize) else {
                continue;
            };

            // Only promised-but-unfulfilled items hold a reservation
            if !matches!(item.status, ItemStatus::Unassigned | ItemStatus::Assigned) {
                continue;
            }
            if normalize(&item.sku) != sku_normalized {
                continue;
            }

            *reserved.entry(depot).or_insert(0) += item.quantity;
        }

        Ok(reserved)
    }
}
