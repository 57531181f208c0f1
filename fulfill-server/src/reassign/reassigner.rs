//! Cancellation + reassignment
//!
//! When a depot cancels an item (breakage, phantom stock, refusal), the
//! item moves to the next-best depot that has not been tried yet. The
//! tried set lives in the order note itself as the encoded ledger block,
//! so it survives process restarts and is visible to operators.
//!
//! The note write is the commit point: the superseding assignment record
//! is only persisted after the marketplace accepted the new note. A
//! rejected write leaves both the note and the assignment untouched.

use std::collections::HashSet;

use shared::models::{AssignmentRecord, DepotCode};
use shared::note::{strip_blocks, NoteHistory, NoteWinner, NO_STOCK_NOTE};
use shared::sku::{Sku, SkuError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::assignment::{AssignError, DepotAssigner, DepotRanker};
use crate::clients::{ClientError, MarketplaceApi};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CancelError {
    /// Multi-item packs need a human decision; splitting one item out
    /// of a pack automatically would silently change what ships together
    #[error("El paquete {0} tiene varios artículos; cancelación manual requerida")]
    MultiItemPack(String),

    #[error("La orden {0} no tiene artículos")]
    EmptyOrder(String),

    #[error(transparent)]
    Sku(#[from] SkuError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Assign(#[from] AssignError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one cancellation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReassignOutcome {
    /// Item moved to the next untried depot
    Reassigned {
        from: Option<DepotCode>,
        to: DepotCode,
        /// Remaining quantity at the new depot after the reservation
        resultant: i64,
    },
    /// Every rankable depot was tried; terminal note written
    NoStock,
}

pub struct CancellationReassigner {
    marketplace: Arc<dyn MarketplaceApi>,
    assigner: Arc<DepotAssigner>,
}

impl CancellationReassigner {
    pub fn new(marketplace: Arc<dyn MarketplaceApi>, assigner: Arc<DepotAssigner>) -> Self {
        Self {
            marketplace,
            assigner,
        }
    }

    /// Cancel the current depot for a single-item order and move the
    /// item to the next untried depot.
    ///
    /// `reason` is free text written into the note step verbatim.
    pub async fn cancel(
        &self,
        order_ref: &str,
        reason: &str,
    ) -> Result<ReassignOutcome, CancelError> {
        let order = self.marketplace.get_order(order_ref).await?;

        if order.items.len() > 1 {
            return Err(CancelError::MultiItemPack(order.pack.to_string()));
        }
        let Some(item) = order.items.first() else {
            return Err(CancelError::EmptyOrder(order.id.clone()));
        };

        let sku = Sku::parse(&item.sku)?;
        let required = item.quantity.max(1);
        let catalog = self.assigner.catalog();

        // Tried set = note history aliases + the depot being cancelled
        let mut history = NoteHistory::decode(&order.note);
        let mut tried: HashSet<DepotCode> = history
            .tried_aliases()
            .iter()
            .filter_map(|alias| catalog.code_for_alias(alias))
            .cloned()
            .collect();

        // The depot being cancelled: the live local record, or after a
        // restart the note's own winner trailer
        let previous = self
            .assigner
            .store()
            .get_assignment(&order.id, 0)?
            .filter(|r| r.live)
            .and_then(|r| r.depot)
            .or_else(|| {
                history
                    .winner
                    .as_ref()
                    .and_then(|w| catalog.code_for_alias(&w.depot_code))
                    .cloned()
            });
        if let Some(depot) = &previous {
            tried.insert(depot.clone());
        }
        if let Some(winner) = &history.winner
            && let Some(code) = catalog.code_for_alias(&winner.depot_code)
        {
            tried.insert(code.clone());
        }

        let snapshot = self.assigner.fresh_snapshot(&sku).await?;
        let ranked = DepotRanker::rank(&catalog.depots, &snapshot, required)
            .map_err(AssignError::from)?;
        let next = ranked.into_iter().find(|r| !tried.contains(&r.code));

        let Some(next) = next else {
            return self.mark_out_of_stock(&order.id, &order.note, &sku).await;
        };

        let stock = snapshot.get(&next.code).copied().unwrap_or_default();
        let new_reserved = stock.reserved + required;
        let resultant = (stock.total - new_reserved).max(0);

        // Record the cancelled depot as a step (by alias) and crown the
        // new winner (by raw code)
        if let Some(depot) = &previous {
            history.push_step(catalog.alias_of(depot), reason);
        }
        history.winner = Some(NoteWinner {
            depot_code: next.code.to_string(),
            remaining_qty: resultant,
        });

        let note = append_block(&order.note, &history.encode());
        self.marketplace.write_note(&order.id, &note).await?;

        // Note accepted; now supersede the assignment
        self.assigner.store().retire_assignment(&order.id, 0)?;
        let record = AssignmentRecord::new(
            sku.normalized(),
            Some(next.code.clone()),
            new_reserved,
            &order.id,
            0,
        );
        self.assigner.store().put_assignment(&record)?;

        info!(
            order_id = %order.id,
            from = ?previous,
            to = %next.code,
            resultant,
            "Item reassigned after cancellation"
        );

        Ok(ReassignOutcome::Reassigned {
            from: previous,
            to: next.code,
            resultant,
        })
    }

    /// Terminal path: no untried depot remains. Writing the terminal
    /// note is a successful outcome, not an error.
    async fn mark_out_of_stock(
        &self,
        order_id: &str,
        note: &str,
        sku: &Sku,
    ) -> Result<ReassignOutcome, CancelError> {
        warn!(order_id = %order_id, sku = %sku, "No untried depot left, marking out of stock");

        let note = append_block(note, NO_STOCK_NOTE);
        self.marketplace.write_note(order_id, &note).await?;

        self.assigner.store().retire_assignment(order_id, 0)?;
        let record = AssignmentRecord::new(sku.normalized(), None, 0, order_id, 0);
        self.assigner.store().put_assignment(&record)?;

        Ok(ReassignOutcome::NoStock)
    }
}

/// Replace any existing ledger block, keeping the operator's free text
fn append_block(note: &str, block: &str) -> String {
    let stripped = strip_blocks(note);
    if stripped.is_empty() {
        block.to_string()
    } else {
        format!("{stripped} {block}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::ReservationLedger;
    use crate::clients::memory::{MemoryMarketplaceApi, MemoryStockSource};
    use crate::core::DepotCatalog;
    use crate::store::FulfillStore;
    use shared::models::{Depot, ItemStatus, Order, OrderItem, PackRef, PickSubstate};
    use std::collections::BTreeMap;

    fn catalog() -> Arc<DepotCatalog> {
        Arc::new(DepotCatalog {
            depots: vec![
                Depot {
                    code: DepotCode::new("DEP"),
                    priority_points: 100,
                    unit_multiplier: 10,
                    alias: "Local Centro".to_string(),
                },
                Depot {
                    code: DepotCode::new("MUNDOCAB"),
                    priority_points: 50,
                    unit_multiplier: 10,
                    alias: "Mundo CABA".to_string(),
                },
            ],
            denied_codes: vec![],
            note_keywords: vec![],
            barcode_overrides: Default::default(),
            debit_direction: Default::default(),
        })
    }

    fn order(id: &str, sku: &str, qty: i64, note: &str) -> Order {
        Order {
            id: id.to_string(),
            pack: PackRef::new(format!("pack-{id}")),
            items: vec![OrderItem {
                sku: sku.to_string(),
                barcode: None,
                real_sku: None,
                product_name: "Remera lisa".to_string(),
                color: None,
                size: None,
                quantity: qty,
                status: ItemStatus::Assigned,
            }],
            note: note.to_string(),
            shipping_ref: None,
            substate: PickSubstate::Other,
        }
    }

    struct Fixture {
        marketplace: Arc<MemoryMarketplaceApi>,
        store: FulfillStore,
        reassigner: CancellationReassigner,
    }

    fn fixture(totals: &[(&str, i64)]) -> Fixture {
        let stock = Arc::new(MemoryStockSource::new());
        stock.set_totals(
            "011602",
            totals
                .iter()
                .map(|(code, qty)| (DepotCode::new(*code), *qty))
                .collect::<BTreeMap<_, _>>(),
        );

        let marketplace = Arc::new(MemoryMarketplaceApi::new());
        let store = FulfillStore::in_memory().unwrap();
        let ledger = ReservationLedger::new(marketplace.clone(), store.clone());
        let assigner = Arc::new(DepotAssigner::new(
            stock,
            ledger,
            catalog(),
            store.clone(),
        ));

        Fixture {
            marketplace: marketplace.clone(),
            store,
            reassigner: CancellationReassigner::new(marketplace, assigner),
        }
    }

    #[tokio::test]
    async fn test_cancel_moves_to_next_untried_depot() {
        let f = fixture(&[("DEP", 5), ("MUNDOCAB", 4)]);
        f.marketplace.insert_order(order("o1", "011602", 2, ""));
        f.store
            .put_assignment(&AssignmentRecord::new(
                "011602",
                Some(DepotCode::new("DEP")),
                2,
                "o1",
                0,
            ))
            .unwrap();

        let outcome = f.reassigner.cancel("o1", "ROTO").await.unwrap();
        assert_eq!(
            outcome,
            ReassignOutcome::Reassigned {
                from: Some(DepotCode::new("DEP")),
                to: DepotCode::new("MUNDOCAB"),
                resultant: 2,
            }
        );

        // Note carries the step by alias and the new winner by code
        let note = f.marketplace.note_of("o1").unwrap();
        assert_eq!(
            note,
            "[API: Cancelado 1)Local Centro:ROTO. Nuevo: MUNDOCAB 2]"
        );

        // Old record superseded, new one live
        let record = f.store.get_assignment("o1", 0).unwrap().unwrap();
        assert_eq!(record.depot, Some(DepotCode::new("MUNDOCAB")));
        assert!(record.live);
    }

    #[tokio::test]
    async fn test_note_history_excludes_already_tried_depots() {
        let f = fixture(&[("DEP", 5), ("MUNDOCAB", 4)]);
        // DEP appears in the note history; MUNDOCAB is the current winner
        f.marketplace.insert_order(order(
            "o1",
            "011602",
            1,
            "[API: Cancelado 1)Local Centro:ROTO. Nuevo: Mundo CABA 3]",
        ));
        f.store
            .put_assignment(&AssignmentRecord::new(
                "011602",
                Some(DepotCode::new("MUNDOCAB")),
                1,
                "o1",
                0,
            ))
            .unwrap();

        // Both depots are now tried, so the outcome is terminal
        let outcome = f.reassigner.cancel("o1", "SIN STOCK").await.unwrap();
        assert_eq!(outcome, ReassignOutcome::NoStock);

        let note = f.marketplace.note_of("o1").unwrap();
        assert_eq!(note, NO_STOCK_NOTE);

        let record = f.store.get_assignment("o1", 0).unwrap().unwrap();
        assert!(record.is_exhausted());
    }

    #[tokio::test]
    async fn test_rejected_note_write_leaves_assignment_untouched() {
        let f = fixture(&[("DEP", 5), ("MUNDOCAB", 4)]);
        f.marketplace.insert_order(order("o1", "011602", 1, ""));
        f.store
            .put_assignment(&AssignmentRecord::new(
                "011602",
                Some(DepotCode::new("DEP")),
                1,
                "o1",
                0,
            ))
            .unwrap();
        f.marketplace.reject_note_writes(true);

        let result = f.reassigner.cancel("o1", "ROTO").await;
        assert!(matches!(result, Err(CancelError::Client(_))));

        let record = f.store.get_assignment("o1", 0).unwrap().unwrap();
        assert_eq!(record.depot, Some(DepotCode::new("DEP")));
        assert!(record.live);
    }

    #[tokio::test]
    async fn test_multi_item_pack_is_refused() {
        let f = fixture(&[("DEP", 5)]);
        let mut multi = order("o1", "011602", 1, "");
        multi.items.push(multi.items[0].clone());
        f.marketplace.insert_order(multi);

        let result = f.reassigner.cancel("o1", "ROTO").await;
        assert!(matches!(result, Err(CancelError::MultiItemPack(_))));
    }

    #[tokio::test]
    async fn test_free_text_note_survives_reassignment() {
        let f = fixture(&[("DEP", 5), ("MUNDOCAB", 4)]);
        f.marketplace
            .insert_order(order("o1", "011602", 1, "entregar después de las 14hs"));
        f.store
            .put_assignment(&AssignmentRecord::new(
                "011602",
                Some(DepotCode::new("DEP")),
                1,
                "o1",
                0,
            ))
            .unwrap();

        f.reassigner.cancel("o1", "ROTO").await.unwrap();

        let note = f.marketplace.note_of("o1").unwrap();
        assert!(note.starts_with("entregar después de las 14hs "));
        assert!(note.contains("Nuevo: MUNDOCAB"));
    }

    #[tokio::test]
    async fn test_cancel_without_prior_assignment_writes_winner_only() {
        let f = fixture(&[("DEP", 5)]);
        f.marketplace.insert_order(order("o1", "011602", 1, ""));

        let outcome = f.reassigner.cancel("o1", "ROTO").await.unwrap();
        assert!(matches!(outcome, ReassignOutcome::Reassigned { from: None, .. }));

        // No previous depot means no step to record
        let note = f.marketplace.note_of("o1").unwrap();
        assert_eq!(note, "[API: Cancelado Nuevo: DEP 4]");
    }

    #[tokio::test]
    async fn test_winner_written_as_code_is_counted_as_tried() {
        let f = fixture(&[("DEP", 5), ("MUNDOCAB", 4)]);
        // The note names DEP as the current winner by raw code and no
        // local record exists (fresh process); a cancel must not hand
        // the item right back to DEP
        f.marketplace
            .insert_order(order("o1", "011602", 1, "[API: Cancelado Nuevo: DEP 2]"));

        let outcome = f.reassigner.cancel("o1", "ROTO").await.unwrap();
        match outcome {
            ReassignOutcome::Reassigned { from, to, .. } => {
                assert_eq!(from, Some(DepotCode::new("DEP")));
                assert_eq!(to, DepotCode::new("MUNDOCAB"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        // The cancelled winner becomes a step; the trailer names the new code
        let note = f.marketplace.note_of("o1").unwrap();
        assert_eq!(note, "[API: Cancelado 1)Local Centro:ROTO. Nuevo: MUNDOCAB 3]");
    }
}
