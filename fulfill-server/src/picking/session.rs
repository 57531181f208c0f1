//! Pick session state machine
//!
//! Holds the set of outstanding physical units for a loaded batch and
//! consumes scan events. The session is the exclusive owner of the
//! pending/picked partition for its lifetime (created when the operator
//! starts picking, destroyed when the batch is abandoned or fully
//! picked). A unit moves from pending to picked exactly once and is
//! never duplicated or lost: for every item, |pending| + |picked| always
//! equals the required quantity.
//!
//! Scan handling is synchronous and single-threaded by construction
//! (`&mut self`); the registry serializes callers. Debit/print work is
//! returned as a [`SideEffect`] and dispatched outside the session.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use shared::models::{Order, PackRef, PickSubstate};
use shared::sku::normalize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clients::lookup::{CodeResolver, ResolvedCode};
use crate::clients::ClientError;
use crate::core::DepotCatalog;

use super::types::{
    PendingUnit, PickedUnit, ScanOutcome, ScanResult, SessionPhase, SideEffect,
};

/// Per-order context kept for the whole loaded set (picked units
/// included), needed by reprint detection and the mismatch fallback
#[derive(Debug, Clone)]
struct LoadedOrder {
    order_id: String,
    pack: PackRef,
    shipping_ref: Option<String>,
    substate: PickSubstate,
    /// Normalized identifier pairs of every item
    item_codes: Vec<(String, String)>,
    /// Normalized alternate identifiers
    real_skus: Vec<String>,
}

pub struct PickSession {
    id: String,
    phase: SessionPhase,
    pending: Vec<PendingUnit>,
    picked: Vec<PickedUnit>,
    orders: Vec<LoadedOrder>,
    last_print: HashMap<PackRef, DateTime<Utc>>,
    reprint_cooldown: Duration,
}

impl PickSession {
    /// Seed a session from a loaded batch.
    ///
    /// One `PendingUnit` is created per unit of required quantity across
    /// all items. Missing barcodes are back-filled from the SKU (and a
    /// missing SKU from the barcode) through the resolution chain, which
    /// ends in the deterministic derivation rule when the external
    /// lookup has no entry.
    pub async fn seed(
        batch: &[Order],
        resolver: &CodeResolver,
        catalog: &DepotCatalog,
        reprint_cooldown_secs: u64,
    ) -> Result<Self, ClientError> {
        let mut pending = Vec::new();
        let mut orders = Vec::new();

        for order in batch {
            let keyword_ok = catalog.note_matches_keywords(&order.note);
            let mut item_codes = Vec::new();
            let mut real_skus = Vec::new();

            for (item_index, item) in order.items.iter().enumerate() {
                let (sku, barcode) = backfill_codes(item.sku.as_str(), item.barcode.as_deref(), resolver).await?;
                let real_sku = item.real_sku.as_deref().map(normalize).filter(|s| !s.is_empty());

                item_codes.push((sku.clone(), barcode.clone()));
                if let Some(rs) = &real_sku {
                    real_skus.push(rs.clone());
                }

                for unit_index in 0..item.quantity.max(0) as u32 {
                    pending.push(PendingUnit {
                        pack: order.pack.clone(),
                        order_id: order.id.clone(),
                        item_index: item_index as u32,
                        unit_index,
                        sku: sku.clone(),
                        barcode: barcode.clone(),
                        real_sku: real_sku.clone(),
                        product_name: item.product_name.clone(),
                        color: item.color.clone(),
                        size: item.size.clone(),
                        substate: order.substate,
                        keyword_ok,
                    });
                }
            }

            orders.push(LoadedOrder {
                order_id: order.id.clone(),
                pack: order.pack.clone(),
                shipping_ref: order.shipping_ref.clone(),
                substate: order.substate,
                item_codes,
                real_skus,
            });
        }

        info!(units = pending.len(), orders = orders.len(), "Pick session seeded");

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            phase: SessionPhase::Idle,
            pending,
            picked: Vec::new(),
            orders,
            last_print: HashMap::new(),
            reprint_cooldown: Duration::seconds(reprint_cooldown_secs as i64),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn picked_count(&self) -> usize {
        self.picked.len()
    }

    /// Abandon the session; remaining units stay unpicked
    pub fn abandon(&mut self) {
        self.phase = SessionPhase::Abandoned;
    }

    /// Pending/picked partition sizes for one item (test support)
    pub fn partition_sizes(&self, order_id: &str, item_index: u32) -> (usize, usize) {
        let p = self
            .pending
            .iter()
            .filter(|u| u.order_id == order_id && u.item_index == item_index)
            .count();
        let k = self
            .picked
            .iter()
            .filter(|u| u.unit.order_id == order_id && u.unit.item_index == item_index)
            .count();
        (p, k)
    }

    /// Consume one scan event.
    ///
    /// `resolved` is the output of the resolution chain for `raw_code`
    /// (`None` = unresolved). Resolution happens outside the session so
    /// the state machine itself stays synchronous.
    pub fn scan(
        &mut self,
        raw_code: &str,
        resolved: Option<&ResolvedCode>,
        now: DateTime<Utc>,
    ) -> ScanResult {
        if matches!(self.phase, SessionPhase::Completed | SessionPhase::Abandoned) {
            return ScanResult::plain(ScanOutcome::SessionClosed);
        }
        self.phase = SessionPhase::Active;

        let code = normalize(raw_code);
        let Some(res) = resolved else {
            debug!(code = %code, "Scan did not resolve");
            return ScanResult::plain(ScanOutcome::NotFound { code });
        };

        match self.find_best_match(res) {
            Some(index) => self.take_unit(index, now),
            None => {
                // No pending unit wants this code; a fully-picked printed
                // order carrying it means the operator wants the label again
                if let Some(reprint) = self.try_reprint(res, now) {
                    return reprint;
                }
                self.mismatch_fallback(&code, res)
            }
        }
    }

    /// Reprint path: no pending unit matched and the scanned SKU belongs
    /// to an order that is fully picked and already printed. Gated by the
    /// per-pack cooldown so scan-bounce cannot re-trigger the printer.
    fn try_reprint(&mut self, res: &ResolvedCode, now: DateTime<Utc>) -> Option<ScanResult> {
        let order = self.orders.iter().find(|o| {
            o.substate == PickSubstate::Printed
                && o.shipping_ref.is_some()
                && self.is_fully_picked(&o.order_id)
                && o.item_codes
                    .iter()
                    .any(|(sku, barcode)| *sku == res.sku || *barcode == res.barcode)
        })?;

        let pack = order.pack.clone();
        let shipping_ref = order.shipping_ref.clone()?;

        if let Some(last) = self.last_print.get(&pack) {
            let elapsed = now - *last;
            if elapsed < self.reprint_cooldown {
                let wait_secs = (self.reprint_cooldown - elapsed).num_seconds().max(1);
                return Some(ScanResult::plain(ScanOutcome::ReprintTooSoon {
                    pack,
                    wait_secs,
                }));
            }
        }

        info!(pack = %pack, "Reprint requested");
        self.last_print.insert(pack.clone(), now);

        Some(ScanResult {
            outcome: ScanOutcome::Reprint { pack: pack.clone() },
            side_effect: SideEffect::ReprintLabel { pack, shipping_ref },
        })
    }

    fn is_fully_picked(&self, order_id: &str) -> bool {
        !self.pending.iter().any(|u| u.order_id == order_id)
            && self.picked.iter().any(|u| u.unit.order_id == order_id)
    }

    /// Best pending match for a resolved code.
    ///
    /// Priority: exact SKU > exact barcode > cross-match, then order
    /// substate (`ready_to_print` > `printed` > other), then seed order.
    /// Orders whose notes lack an allow-listed keyword never match.
    fn find_best_match(&self, res: &ResolvedCode) -> Option<usize> {
        self.pending
            .iter()
            .enumerate()
            .filter(|(_, unit)| unit.keyword_ok)
            .filter_map(|(index, unit)| {
                let tier = match_tier(unit, res)?;
                Some((tier, substate_rank(unit.substate), index))
            })
            .min()
            .map(|(_, _, index)| index)
    }

    fn take_unit(&mut self, index: usize, now: DateTime<Utc>) -> ScanResult {
        let unit = self.pending.remove(index);

        let pack_complete = !self.pending.iter().any(|u| u.pack == unit.pack);
        let remaining = self.remaining_in_pack(&unit.pack);

        let shipping_ref = if pack_complete {
            self.orders
                .iter()
                .find(|o| o.order_id == unit.order_id)
                .and_then(|o| o.shipping_ref.clone())
        } else {
            None
        };

        let outcome = ScanOutcome::Matched {
            order_id: unit.order_id.clone(),
            pack: unit.pack.clone(),
            description: unit.describe(),
            pack_complete,
            remaining,
        };

        let side_effect = SideEffect::Fulfill {
            pack: unit.pack.clone(),
            order_id: unit.order_id.clone(),
            item_index: unit.item_index,
            sku: unit.sku.clone(),
            barcode: unit.barcode.clone(),
            unit_index: unit.unit_index,
            description: unit.describe(),
            shipping_ref: shipping_ref.clone(),
        };

        // A dispatched print flips the pack to printed; the reprint path
        // and its cooldown take over from here
        if shipping_ref.is_some() {
            self.last_print.insert(unit.pack.clone(), now);
            for order in self.orders.iter_mut().filter(|o| o.pack == unit.pack) {
                order.substate = PickSubstate::Printed;
            }
        }

        info!(
            order_id = %unit.order_id,
            pack = %unit.pack,
            unit_index = unit.unit_index,
            pack_complete,
            "Unit picked"
        );

        self.picked.push(PickedUnit {
            unit,
            picked_at: now,
        });

        if self.pending.is_empty() {
            self.phase = SessionPhase::Completed;
        }

        ScanResult {
            outcome,
            side_effect,
        }
    }

    /// Distinct descriptions of units still pending in a pack
    fn remaining_in_pack(&self, pack: &PackRef) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for unit in self.pending.iter().filter(|u| &u.pack == pack) {
            let description = unit.describe();
            if !names.contains(&description) {
                names.push(description);
            }
        }
        names
    }

    /// Secondary search over the whole loaded set against the alternate
    /// `real_sku` identifier. A hit means the scanned code matches an
    /// order the operator's current filter excluded, so it surfaces as
    /// a confirmation request, never a hard failure.
    fn mismatch_fallback(&self, code: &str, res: &ResolvedCode) -> ScanResult {
        let hit = self.orders.iter().find(|o| {
            o.real_skus
                .iter()
                .any(|rs| rs == &res.sku || rs == code)
        });

        match hit {
            Some(order) => ScanResult::plain(ScanOutcome::PossibleMismatch {
                order_id: order.order_id.clone(),
                code: code.to_string(),
            }),
            None => ScanResult::plain(ScanOutcome::NotFound {
                code: code.to_string(),
            }),
        }
    }
}

/// Match quality, lower is better; `None` = no match
fn match_tier(unit: &PendingUnit, res: &ResolvedCode) -> Option<u8> {
    if !unit.sku.is_empty() && unit.sku == res.sku {
        return Some(0);
    }
    if !unit.barcode.is_empty() && unit.barcode == res.barcode {
        return Some(1);
    }
    if (!unit.barcode.is_empty() && unit.barcode == res.sku)
        || (!unit.sku.is_empty() && unit.sku == res.barcode)
    {
        return Some(2);
    }
    None
}

fn substate_rank(substate: PickSubstate) -> u8 {
    match substate {
        PickSubstate::ReadyToPrint => 0,
        PickSubstate::Printed => 1,
        PickSubstate::Other => 2,
    }
}

/// Fill the missing half of a (SKU, barcode) pair through the resolver
async fn backfill_codes(
    raw_sku: &str,
    raw_barcode: Option<&str>,
    resolver: &CodeResolver,
) -> Result<(String, String), ClientError> {
    let sku = normalize(raw_sku);
    let barcode = raw_barcode.map(normalize).unwrap_or_default();

    if !sku.is_empty() && !barcode.is_empty() {
        return Ok((sku, barcode));
    }

    if barcode.is_empty() && !sku.is_empty() {
        let derived = resolver
            .resolve(&sku)
            .await?
            .map(|r| r.barcode)
            .unwrap_or_default();
        return Ok((sku, derived));
    }

    if sku.is_empty() && !barcode.is_empty() {
        let derived = resolver
            .resolve(&barcode)
            .await?
            .map(|r| r.sku)
            .unwrap_or_default();
        return Ok((derived, barcode));
    }

    Ok((sku, barcode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use shared::models::{Depot, DepotCode, ItemStatus, OrderItem};

    use crate::clients::memory::MemoryBarcodeLookup;

    fn catalog() -> DepotCatalog {
        DepotCatalog {
            depots: vec![Depot {
                code: DepotCode::new("DEP"),
                priority_points: 100,
                unit_multiplier: 10,
                alias: "Local Centro".to_string(),
            }],
            denied_codes: vec![],
            note_keywords: vec![],
            barcode_overrides: HashMap::new(),
            debit_direction: HashMap::new(),
        }
    }

    fn resolver() -> CodeResolver {
        CodeResolver::new(
            HashMap::new(),
            Arc::new(MemoryBarcodeLookup::with_entries(&[(
                "CAM01AZULM",
                "CAM01AZULM",
                "7791234567890",
            )])),
        )
    }

    fn item(sku: &str, barcode: Option<&str>, qty: i64) -> OrderItem {
        OrderItem {
            sku: sku.to_string(),
            barcode: barcode.map(str::to_string),
            real_sku: None,
            product_name: "Remera lisa".to_string(),
            color: Some("AZUL".to_string()),
            size: Some("M".to_string()),
            quantity: qty,
            status: ItemStatus::Assigned,
        }
    }

    fn order(id: &str, pack: &str, items: Vec<OrderItem>) -> Order {
        Order {
            id: id.to_string(),
            pack: PackRef::new(pack),
            items,
            note: String::new(),
            shipping_ref: Some(format!("ship-{id}")),
            substate: PickSubstate::ReadyToPrint,
        }
    }

    async fn seed(batch: &[Order]) -> PickSession {
        PickSession::seed(batch, &resolver(), &catalog(), 30)
            .await
            .unwrap()
    }

    fn resolved(sku: &str, barcode: &str) -> ResolvedCode {
        ResolvedCode {
            sku: sku.to_string(),
            barcode: barcode.to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[tokio::test]
    async fn test_seed_backfills_codes() {
        // Database entry covers the first item; the six-digit SKU of the
        // second is resolved through derivation
        let batch = vec![order(
            "o1",
            "p1",
            vec![item("CAM01-AZUL-M", None, 1), item("01/1602", None, 1)],
        )];
        let session = seed(&batch).await;

        assert_eq!(session.pending_count(), 2);
        assert_eq!(session.pending[0].barcode, "7791234567890");
        assert_eq!(session.pending[1].sku, "011602");
        assert_eq!(session.pending[1].barcode, "0011602100200");
    }

    #[tokio::test]
    async fn test_scan_matches_and_completes_pack() {
        let batch = vec![order("o1", "p1", vec![item("CAM01-AZUL-M", None, 1)])];
        let mut session = seed(&batch).await;

        let result = session.scan(
            "cam01-azul-m",
            Some(&resolved("CAM01AZULM", "7791234567890")),
            now(),
        );

        match result.outcome {
            ScanOutcome::Matched {
                pack_complete,
                ref remaining,
                ..
            } => {
                assert!(pack_complete);
                assert!(remaining.is_empty());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        // Complete pack carries the fulfillment target
        match result.side_effect {
            SideEffect::Fulfill { shipping_ref, .. } => {
                assert_eq!(shipping_ref.as_deref(), Some("ship-o1"));
            }
            other => panic!("unexpected side effect: {other:?}"),
        }
        assert_eq!(session.phase(), SessionPhase::Completed);
        assert_eq!(session.partition_sizes("o1", 0), (0, 1));
    }

    #[tokio::test]
    async fn test_partial_pack_lists_remaining_and_skips_print() {
        let batch = vec![order(
            "o1",
            "p1",
            vec![item("CAM01-AZUL-M", None, 1), {
                let mut other = item("PANT02-NEGRO-L", Some("7790000000001"), 1);
                other.product_name = "Pantalón cargo".to_string();
                other.color = Some("NEGRO".to_string());
                other.size = Some("L".to_string());
                other
            }],
        )];
        let mut session = seed(&batch).await;

        let result = session.scan(
            "CAM01AZULM",
            Some(&resolved("CAM01AZULM", "7791234567890")),
            now(),
        );

        match result.outcome {
            ScanOutcome::Matched {
                pack_complete,
                ref remaining,
                ..
            } => {
                assert!(!pack_complete);
                assert_eq!(remaining, &["Pantalón cargo (NEGRO L)".to_string()]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        match result.side_effect {
            SideEffect::Fulfill { shipping_ref, .. } => assert!(shipping_ref.is_none()),
            other => panic!("unexpected side effect: {other:?}"),
        }
        assert_eq!(session.phase(), SessionPhase::Active);
    }

    #[tokio::test]
    async fn test_exact_sku_beats_barcode_and_cross_match() {
        // Three orders where the scanned pair matches each by a
        // different rule
        let cross = order("o-cross", "p-cross", vec![item("7791234567890", None, 1)]);
        let by_barcode = order(
            "o-bar",
            "p-bar",
            vec![item("OTRA-ROJA-L", Some("7791234567890"), 1)],
        );
        let by_sku = order("o-sku", "p-sku", vec![item("CAM01-AZUL-M", None, 1)]);
        let mut session = seed(&[cross, by_barcode, by_sku]).await;

        let res = resolved("CAM01AZULM", "7791234567890");

        let first = session.scan("x", Some(&res), now());
        match first.outcome {
            ScanOutcome::Matched { ref order_id, .. } => assert_eq!(order_id, "o-sku"),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let second = session.scan("x", Some(&res), now());
        match second.outcome {
            ScanOutcome::Matched { ref order_id, .. } => assert_eq!(order_id, "o-bar"),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let third = session.scan("x", Some(&res), now());
        match third.outcome {
            ScanOutcome::Matched { ref order_id, .. } => assert_eq!(order_id, "o-cross"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ready_to_print_preferred_over_printed() {
        let mut printed = order("o-printed", "p1", vec![item("CAM01-AZUL-M", None, 1)]);
        printed.substate = PickSubstate::Printed;
        let ready = order("o-ready", "p2", vec![item("CAM01-AZUL-M", None, 1)]);

        let mut session = seed(&[printed, ready]).await;
        let result = session.scan(
            "x",
            Some(&resolved("CAM01AZULM", "7791234567890")),
            now(),
        );
        match result.outcome {
            ScanOutcome::Matched { ref order_id, .. } => assert_eq!(order_id, "o-ready"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_keyword_filter_excludes_order() {
        let mut cat = catalog();
        cat.note_keywords = vec!["centro".to_string()];

        let mut filtered = order("o1", "p1", vec![item("CAM01-AZUL-M", None, 1)]);
        filtered.note = "retiro sucursal norte".to_string();
        let mut matchable = order("o2", "p2", vec![item("CAM01-AZUL-M", None, 1)]);
        matchable.note = "retiro por el centro".to_string();

        let mut session = PickSession::seed(&[filtered, matchable], &resolver(), &cat, 30)
            .await
            .unwrap();

        let res = resolved("CAM01AZULM", "7791234567890");
        let first = session.scan("x", Some(&res), now());
        match first.outcome {
            ScanOutcome::Matched { ref order_id, .. } => assert_eq!(order_id, "o2"),
            other => panic!("unexpected outcome: {other:?}"),
        }

        // The filtered order's unit stays pending and never matches
        let second = session.scan("x", Some(&res), now());
        assert!(matches!(second.outcome, ScanOutcome::NotFound { .. }));
        assert_eq!(session.partition_sizes("o1", 0), (1, 0));
    }

    #[tokio::test]
    async fn test_unresolved_scan_reports_not_found() {
        let batch = vec![order("o1", "p1", vec![item("CAM01-AZUL-M", None, 1)])];
        let mut session = seed(&batch).await;

        let result = session.scan("zz-99", None, now());
        match result.outcome {
            ScanOutcome::NotFound { ref code } => assert_eq!(code, "ZZ99"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(session.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_mismatch_fallback_on_real_sku() {
        let mut o = order("o1", "p1", vec![item("CAM01-AZUL-M", None, 1)]);
        o.items[0].real_sku = Some("PROV-778/22".to_string());
        let mut session = seed(&[o]).await;

        let result = session.scan("prov-778/22", Some(&resolved("PROV77822", "")), now());
        match result.outcome {
            ScanOutcome::PossibleMismatch { ref order_id, .. } => assert_eq!(order_id, "o1"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(result.side_effect, SideEffect::None);
        assert_eq!(session.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_reprint_after_full_pick_with_cooldown() {
        let batch = vec![order("o1", "p1", vec![item("CAM01-AZUL-M", None, 1)])];
        let mut batch_2 = batch.clone();
        batch_2.push(order("o2", "p2", vec![item("OTRA-ROJA-L", None, 1)]));
        let mut session = seed(&batch_2).await;

        let res = resolved("CAM01AZULM", "7791234567890");
        let t0 = now();
        let first = session.scan("x", Some(&res), t0);
        assert!(matches!(first.outcome, ScanOutcome::Matched { .. }));

        // Same SKU scanned again while the cooldown holds
        let bounced = session.scan("x", Some(&res), t0 + Duration::seconds(5));
        match bounced.outcome {
            ScanOutcome::ReprintTooSoon { wait_secs, .. } => assert!(wait_secs > 0),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(bounced.side_effect, SideEffect::None);

        // After the window the reprint goes through
        let reprint = session.scan("x", Some(&res), t0 + Duration::seconds(31));
        assert!(matches!(reprint.outcome, ScanOutcome::Reprint { .. }));
        match reprint.side_effect {
            SideEffect::ReprintLabel {
                ref shipping_ref, ..
            } => assert_eq!(shipping_ref, "ship-o1"),
            other => panic!("unexpected side effect: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pending_unit_in_other_order_wins_over_reprint() {
        // Two orders carry the same SKU. Picking the first to completion
        // must not let the reprint path swallow scans meant for the second.
        let batch = vec![
            order("o1", "p1", vec![item("CAM01-AZUL-M", None, 1)]),
            order("o2", "p2", vec![item("CAM01-AZUL-M", None, 1)]),
        ];
        let mut session = seed(&batch).await;

        let res = resolved("CAM01AZULM", "7791234567890");
        let t0 = now();
        let first = session.scan("x", Some(&res), t0);
        match first.outcome {
            ScanOutcome::Matched { ref order_id, .. } => assert_eq!(order_id, "o1"),
            other => panic!("unexpected outcome: {other:?}"),
        }

        // o1 is fully picked and printed, but o2 still has a pending unit
        let second = session.scan("x", Some(&res), t0 + Duration::seconds(5));
        match second.outcome {
            ScanOutcome::Matched { ref order_id, .. } => assert_eq!(order_id, "o2"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(session.phase(), SessionPhase::Completed);
    }

    #[tokio::test]
    async fn test_closed_session_rejects_scans() {
        let batch = vec![order("o1", "p1", vec![item("CAM01-AZUL-M", None, 1)])];
        let mut session = seed(&batch).await;
        session.abandon();

        let result = session.scan(
            "x",
            Some(&resolved("CAM01AZULM", "7791234567890")),
            now(),
        );
        assert!(matches!(result.outcome, ScanOutcome::SessionClosed));
    }

    #[tokio::test]
    async fn test_quantity_expands_to_units() {
        let batch = vec![order("o1", "p1", vec![item("CAM01-AZUL-M", None, 3)])];
        let mut session = seed(&batch).await;
        assert_eq!(session.partition_sizes("o1", 0), (3, 0));

        let res = resolved("CAM01AZULM", "7791234567890");
        session.scan("x", Some(&res), now());
        session.scan("x", Some(&res), now());
        assert_eq!(session.partition_sizes("o1", 0), (1, 2));
        assert_eq!(session.phase(), SessionPhase::Active);

        session.scan("x", Some(&res), now());
        assert_eq!(session.partition_sizes("o1", 0), (0, 3));
        assert_eq!(session.phase(), SessionPhase::Completed);
    }
}
