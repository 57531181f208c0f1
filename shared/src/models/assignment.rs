//! Assignment record model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::depot::DepotCode;

/// Persisted outcome of one depot-assignment decision.
///
/// Created exclusively by the assigner, consumed by reservation-ledger
/// computations for subsequent SKUs and superseded by the reassigner.
/// `depot = None` marks the SKU exhausted for this attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub id: Uuid,
    /// Normalized SKU text
    pub sku: String,
    pub depot: Option<DepotCode>,
    /// Reserved quantity at the depot after this assignment
    pub reserved_qty: i64,
    pub order_id: String,
    pub item_index: u32,
    pub created_at: DateTime<Utc>,
    /// Cleared when the item is fulfilled or the record is superseded
    pub live: bool,
}

impl AssignmentRecord {
    pub fn new(
        sku: impl Into<String>,
        depot: Option<DepotCode>,
        reserved_qty: i64,
        order_id: impl Into<String>,
        item_index: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sku: sku.into(),
            depot,
            reserved_qty,
            order_id: order_id.into(),
            item_index,
            created_at: Utc::now(),
            live: true,
        }
    }

    /// Whether this record marks exhaustion rather than a winner
    pub fn is_exhausted(&self) -> bool {
        self.depot.is_none()
    }
}
