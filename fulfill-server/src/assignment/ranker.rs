//! Depot ranking
//!
//! Pure scoring over one stock snapshot. Each depot is scored alone
//! against the full required quantity:
//!
//! ```text
//! score = priority_points + min(available, required) * unit_multiplier
//! ```
//!
//! Depots with no availability are excluded outright, so the output never
//! contains a depot that cannot contribute at least one unit. An empty
//! result is exhaustion, a normal value the caller must handle; it is not
//! an error. Ties keep catalog order (the sort is stable and depots are
//! scored in catalog order).
//!
//! Depots present in the snapshot but absent from the catalog have no
//! priority configuration and are not ranked.

use shared::models::{Depot, DepotCode, StockSnapshot};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RankError {
    #[error("Required quantity must be positive, got {0}")]
    InvalidRequired(i64),
}

/// One ranked candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedDepot {
    pub code: DepotCode,
    pub available: i64,
    pub score: i64,
}

/// Depot ranking primitive, shared by the assigner and the reassigner
pub struct DepotRanker;

impl DepotRanker {
    /// Rank every catalog depot that can cover at least one unit,
    /// descending by score.
    pub fn rank(
        catalog_depots: &[Depot],
        snapshot: &StockSnapshot,
        required: i64,
    ) -> Result<Vec<RankedDepot>, RankError> {
        if required <= 0 {
            return Err(RankError::InvalidRequired(required));
        }

        let mut ranked: Vec<RankedDepot> = catalog_depots
            .iter()
            .filter_map(|depot| {
                let stock = snapshot.get(&depot.code)?;
                let available = stock.available();
                if available <= 0 {
                    return None;
                }

                let covered = available.min(required);
                let score = depot.priority_points + covered * depot.unit_multiplier;
                Some(RankedDepot {
                    code: depot.code.clone(),
                    available,
                    score,
                })
            })
            .collect();

        // Stable sort keeps catalog order on ties
        ranked.sort_by(|a, b| b.score.cmp(&a.score));

        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::DepotStock;

    fn depot(code: &str, points: i64, multiplier: i64) -> Depot {
        Depot {
            code: DepotCode::new(code),
            priority_points: points,
            unit_multiplier: multiplier,
            alias: code.to_string(),
        }
    }

    fn snapshot(entries: &[(&str, i64, i64)]) -> StockSnapshot {
        let mut s = StockSnapshot::new();
        for (code, total, reserved) in entries {
            s.insert(
                DepotCode::new(*code),
                DepotStock {
                    total: *total,
                    reserved: *reserved,
                },
            );
        }
        s
    }

    #[test]
    fn test_never_ranks_unavailable_depot() {
        let depots = vec![depot("DEP", 100, 10), depot("MUNDOCAB", 50, 10)];
        let snap = snapshot(&[("DEP", 5, 0), ("MUNDOCAB", 2, 5)]);

        let ranked = DepotRanker::rank(&depots, &snap, 3).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].code, DepotCode::new("DEP"));
        assert!(ranked.iter().all(|r| r.available > 0));
    }

    #[test]
    fn test_score_formula() {
        let depots = vec![depot("DEP", 100, 10)];
        let snap = snapshot(&[("DEP", 5, 0)]);

        // covered = min(5, 3) = 3 → 100 + 3*10
        let ranked = DepotRanker::rank(&depots, &snap, 3).unwrap();
        assert_eq!(ranked[0].score, 130);

        // Partial coverage: covered = min(2, 3)
        let snap = snapshot(&[("DEP", 2, 0)]);
        let ranked = DepotRanker::rank(&depots, &snap, 3).unwrap();
        assert_eq!(ranked[0].score, 120);
    }

    #[test]
    fn test_descending_with_stable_tie_break() {
        let depots = vec![
            depot("DEP", 100, 10),
            depot("MUNDOCAB", 100, 10),
            depot("MTGROCA", 200, 10),
        ];
        let snap = snapshot(&[("DEP", 5, 0), ("MUNDOCAB", 5, 0), ("MTGROCA", 5, 0)]);

        let ranked = DepotRanker::rank(&depots, &snap, 2).unwrap();
        assert_eq!(ranked[0].code, DepotCode::new("MTGROCA"));
        // DEP and MUNDOCAB tie; catalog order decides
        assert_eq!(ranked[1].code, DepotCode::new("DEP"));
        assert_eq!(ranked[2].code, DepotCode::new("MUNDOCAB"));
    }

    #[test]
    fn test_empty_result_is_exhaustion_not_error() {
        let depots = vec![depot("DEP", 100, 10), depot("MUNDOCAB", 50, 10)];
        let snap = snapshot(&[("DEP", 0, 0), ("MUNDOCAB", 0, 0)]);

        let ranked = DepotRanker::rank(&depots, &snap, 1).unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_invalid_required_is_error() {
        let depots = vec![depot("DEP", 100, 10)];
        let snap = snapshot(&[("DEP", 5, 0)]);

        assert!(DepotRanker::rank(&depots, &snap, 0).is_err());
        assert!(DepotRanker::rank(&depots, &snap, -2).is_err());
    }

    #[test]
    fn test_reserved_reduces_availability() {
        let depots = vec![depot("DEP", 100, 10)];
        let snap = snapshot(&[("DEP", 5, 4)]);

        let ranked = DepotRanker::rank(&depots, &snap, 3).unwrap();
        assert_eq!(ranked[0].available, 1);
        assert_eq!(ranked[0].score, 110);
    }
}
