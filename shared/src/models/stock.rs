//! Stock snapshot model
//!
//! A snapshot is valid for one SKU at one instant. It is never persisted
//! beyond the assignment decision; every decision fetches a fresh one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::depot::DepotCode;

/// On-hand and reserved quantities at one depot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepotStock {
    pub total: i64,
    pub reserved: i64,
}

impl DepotStock {
    /// Sellable quantity, clamped at zero
    pub fn available(&self) -> i64 {
        (self.total - self.reserved).max(0)
    }
}

/// Per-depot stock for one SKU at one point in time.
///
/// Backed by a BTreeMap so iteration order is deterministic, which keeps
/// ranking tie-breaks stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub depots: BTreeMap<DepotCode, DepotStock>,
}

impl StockSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: DepotCode, stock: DepotStock) {
        self.depots.insert(code, stock);
    }

    pub fn get(&self, code: &DepotCode) -> Option<&DepotStock> {
        self.depots.get(code)
    }

    /// Merge on-hand totals with already-reserved quantities
    pub fn merge(totals: &BTreeMap<DepotCode, i64>, reserved: &BTreeMap<DepotCode, i64>) -> Self {
        let mut snapshot = Self::new();
        for (code, total) in totals {
            let stock = DepotStock {
                total: *total,
                reserved: reserved.get(code).copied().unwrap_or(0),
            };
            snapshot.insert(code.clone(), stock);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_clamps_at_zero() {
        let stock = DepotStock {
            total: 2,
            reserved: 5,
        };
        assert_eq!(stock.available(), 0);

        let stock = DepotStock {
            total: 5,
            reserved: 3,
        };
        assert_eq!(stock.available(), 2);
    }

    #[test]
    fn test_merge_pairs_totals_with_reserved() {
        let mut totals = BTreeMap::new();
        totals.insert(DepotCode::new("DEP"), 5);
        totals.insert(DepotCode::new("MUNDOCAB"), 1);

        let mut reserved = BTreeMap::new();
        reserved.insert(DepotCode::new("DEP"), 2);

        let snapshot = StockSnapshot::merge(&totals, &reserved);
        assert_eq!(snapshot.get(&DepotCode::new("DEP")).unwrap().available(), 3);
        assert_eq!(
            snapshot.get(&DepotCode::new("MUNDOCAB")).unwrap().available(),
            1
        );
    }
}
