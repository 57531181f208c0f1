//! Depot assigner
//!
//! Orchestrates snapshot fetch + ledger merge + ranking into one winning
//! depot, persists the `AssignmentRecord`, and exposes the exclusion-set
//! variant the reassigner reuses.
//!
//! Idempotence: a second `assign` for the same still-unassigned item
//! returns the existing live record unchanged — reserved never increases
//! twice for one item. Callers mark items `assigned` before they become
//! eligible for re-assignment.

use std::collections::HashSet;
use std::sync::Arc;

use shared::models::{AssignmentRecord, DepotCode, StockSnapshot};
use shared::sku::Sku;
use thiserror::Error;
use tracing::{info, warn};

use crate::clients::{ClientError, StockSnapshotSource};
use crate::core::DepotCatalog;
use crate::store::{FulfillStore, StoreError};

use super::ledger::{LedgerError, ReservationLedger};
use super::ranker::{DepotRanker, RankError};

#[derive(Debug, Error)]
pub enum AssignError {
    #[error(transparent)]
    Rank(#[from] RankError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Outcome of one assignment decision
#[derive(Debug, Clone)]
pub enum Assignment {
    Assigned {
        depot: DepotCode,
        /// Reserved quantity at the depot after this reservation
        new_reserved: i64,
        /// Remaining quantity at the depot after this reservation.
        /// `None` when the decision was answered from an existing live
        /// record: remaining stock would need a snapshot that path
        /// never fetches.
        resultant: Option<i64>,
        record: AssignmentRecord,
    },
    /// No depot can cover the item. Terminal for this attempt; the
    /// operator intervenes once stock changes.
    Exhausted { record: AssignmentRecord },
}

impl Assignment {
    pub fn depot(&self) -> Option<&DepotCode> {
        match self {
            Self::Assigned { depot, .. } => Some(depot),
            Self::Exhausted { .. } => None,
        }
    }
}

/// Owns `AssignmentRecord` creation for the whole process
pub struct DepotAssigner {
    stock: Arc<dyn StockSnapshotSource>,
    ledger: ReservationLedger,
    catalog: Arc<DepotCatalog>,
    store: FulfillStore,
}

impl DepotAssigner {
    pub fn new(
        stock: Arc<dyn StockSnapshotSource>,
        ledger: ReservationLedger,
        catalog: Arc<DepotCatalog>,
        store: FulfillStore,
    ) -> Self {
        Self {
            stock,
            ledger,
            catalog,
            store,
        }
    }

    /// Assign `required` units of `sku` for one order item.
    ///
    /// `exclude` removes depots already tried (the reassigner's path);
    /// an empty set is the normal first assignment.
    pub async fn assign(
        &self,
        sku: &Sku,
        required: i64,
        order_id: &str,
        item_index: u32,
        exclude: &HashSet<DepotCode>,
    ) -> Result<Assignment, AssignError> {
        // Idempotence guard: a live record for this item wins over a
        // fresh decision
        if let Some(existing) = self.store.get_assignment(order_id, item_index)?
            && existing.live
        {
            info!(
                order_id = %order_id,
                item_index,
                depot = ?existing.depot,
                "Assignment already exists, returning unchanged"
            );
            return Ok(self.from_record(existing));
        }

        let snapshot = self.fresh_snapshot(sku).await?;
        let ranked = DepotRanker::rank(&self.catalog.depots, &snapshot, required)?;

        let winner = ranked.into_iter().find(|r| !exclude.contains(&r.code));

        let Some(winner) = winner else {
            warn!(sku = %sku, order_id = %order_id, "No depot can cover item, marking exhausted");
            let record = AssignmentRecord::new(sku.normalized(), None, 0, order_id, item_index);
            self.store.put_assignment(&record)?;
            return Ok(Assignment::Exhausted { record });
        };

        let stock = snapshot
            .get(&winner.code)
            .copied()
            .unwrap_or_default();
        let new_reserved = stock.reserved + required;
        let resultant = (stock.total - new_reserved).max(0);

        let record = AssignmentRecord::new(
            sku.normalized(),
            Some(winner.code.clone()),
            new_reserved,
            order_id,
            item_index,
        );
        self.store.put_assignment(&record)?;

        info!(
            sku = %sku,
            order_id = %order_id,
            item_index,
            depot = %winner.code,
            new_reserved,
            resultant,
            "Depot assigned"
        );

        Ok(Assignment::Assigned {
            depot: winner.code,
            new_reserved,
            resultant: Some(resultant),
            record,
        })
    }

    /// Ranked candidates for a SKU without persisting anything.
    /// The reassigner walks this list against the tried-depot set.
    pub async fn rank_candidates(
        &self,
        sku: &Sku,
        required: i64,
    ) -> Result<Vec<super::ranker::RankedDepot>, AssignError> {
        let snapshot = self.fresh_snapshot(sku).await?;
        Ok(DepotRanker::rank(&self.catalog.depots, &snapshot, required)?)
    }

    /// Fresh per-decision snapshot: totals from the stock API merged with
    /// ledger reservations. Never cached.
    pub async fn fresh_snapshot(&self, sku: &Sku) -> Result<StockSnapshot, AssignError> {
        let totals = self.stock.fetch_totals(sku).await?;
        let reserved = self.ledger.reserved_for(&sku.normalized()).await?;
        Ok(StockSnapshot::merge(&totals, &reserved))
    }

    pub fn catalog(&self) -> &DepotCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &FulfillStore {
        &self.store
    }

    fn from_record(&self, record: AssignmentRecord) -> Assignment {
        match record.depot.clone() {
            Some(depot) => Assignment::Assigned {
                depot,
                new_reserved: record.reserved_qty,
                resultant: None,
                record,
            },
            None => Assignment::Exhausted { record },
        }
    }
}
