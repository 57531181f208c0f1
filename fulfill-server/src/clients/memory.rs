//! In-memory client backends
//!
//! Used by the test suites and for offline development runs where the
//! external services are unreachable. Behavior knobs (scripted outcomes,
//! failure injection, call counters) exist so tests can observe the
//! engine's policies.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use shared::models::{DepotCode, Order};
use shared::sku::{Sku, normalize};

use super::erp::{DebitOutcome, DebitRequest, ErpApi};
use super::label::LabelApi;
use super::lookup::{BarcodeLookup, ResolvedCode};
use super::marketplace::MarketplaceApi;
use super::stock::StockSnapshotSource;
use super::{ClientError, ClientResult};

// ========== Stock ==========

/// Fixed per-SKU totals
#[derive(Default)]
pub struct MemoryStockSource {
    totals: Mutex<HashMap<String, BTreeMap<DepotCode, i64>>>,
}

impl MemoryStockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_totals(&self, sku: &str, totals: BTreeMap<DepotCode, i64>) {
        self.totals
            .lock()
            .unwrap()
            .insert(normalize(sku), totals);
    }
}

#[async_trait]
impl StockSnapshotSource for MemoryStockSource {
    async fn fetch_totals(&self, sku: &Sku) -> ClientResult<BTreeMap<DepotCode, i64>> {
        Ok(self
            .totals
            .lock()
            .unwrap()
            .get(&sku.normalized())
            .cloned()
            .unwrap_or_default())
    }
}

// ========== Marketplace ==========

/// Orders held in memory; note writes mutate the stored order
#[derive(Default)]
pub struct MemoryMarketplaceApi {
    orders: Mutex<HashMap<String, Order>>,
    fail_note_writes: Mutex<bool>,
}

impl MemoryMarketplaceApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_order(&self, order: Order) {
        self.orders.lock().unwrap().insert(order.id.clone(), order);
    }

    pub fn note_of(&self, order_id: &str) -> Option<String> {
        self.orders
            .lock()
            .unwrap()
            .get(order_id)
            .map(|o| o.note.clone())
    }

    /// Make subsequent note writes fail with a rejection
    pub fn reject_note_writes(&self, reject: bool) {
        *self.fail_note_writes.lock().unwrap() = reject;
    }
}

#[async_trait]
impl MarketplaceApi for MemoryMarketplaceApi {
    async fn get_order(&self, order_ref: &str) -> ClientResult<Order> {
        self.orders
            .lock()
            .unwrap()
            .get(order_ref)
            .cloned()
            .ok_or_else(|| ClientError::Status {
                status: 404,
                body: format!("order {order_ref} not found"),
            })
    }

    async fn open_orders(&self) -> ClientResult<Vec<Order>> {
        Ok(self.orders.lock().unwrap().values().cloned().collect())
    }

    async fn write_note(&self, order_id: &str, note: &str) -> ClientResult<()> {
        if *self.fail_note_writes.lock().unwrap() {
            return Err(ClientError::Rejected("note write denied".to_string()));
        }

        let mut orders = self.orders.lock().unwrap();
        let order = orders.get_mut(order_id).ok_or_else(|| ClientError::Status {
            status: 404,
            body: format!("order {order_id} not found"),
        })?;
        order.note = note.to_string();
        Ok(())
    }
}

// ========== ERP ==========

/// Scripted debit outcomes plus in-flight tracking.
///
/// `max_in_flight` lets tests assert the at-most-one-in-flight-debit
/// invariant: with the executor lock in place it must never exceed 1.
pub struct MemoryErpApi {
    outcomes: Mutex<VecDeque<DebitOutcome>>,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    delay: Duration,
}

impl MemoryErpApi {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Widen the race window so overlap would be observable without the lock
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    /// Queue an outcome; defaults to `Confirmed` when the queue is empty
    pub fn push_outcome(&self, outcome: DebitOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }
}

impl Default for MemoryErpApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ErpApi for MemoryErpApi {
    async fn debit_stock(&self, _request: &DebitRequest) -> DebitOutcome {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.calls.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(DebitOutcome::Confirmed)
    }
}

// ========== Label ==========

/// Counts fetches and prints; can fail the first N print attempts
#[derive(Default)]
pub struct MemoryLabelApi {
    pub fetches: AtomicUsize,
    pub prints: AtomicUsize,
    fail_prints_remaining: AtomicUsize,
}

impl MemoryLabelApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_prints(&self, n: usize) {
        self.fail_prints_remaining.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl LabelApi for MemoryLabelApi {
    async fn fetch_label(&self, shipping_ref: &str) -> ClientResult<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(format!("LABEL:{shipping_ref}").into_bytes())
    }

    async fn print_label(&self, _shipping_ref: &str, _payload: &[u8]) -> ClientResult<()> {
        let remaining = self.fail_prints_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_prints_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(ClientError::Http("printer unreachable".to_string()));
        }

        self.prints.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ========== Barcode lookup ==========

/// Fixed lookup table keyed by normalized code
#[derive(Default)]
pub struct MemoryBarcodeLookup {
    entries: HashMap<String, ResolvedCode>,
}

impl MemoryBarcodeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(key, sku, barcode)` triples; everything is normalized on insert
    pub fn with_entries(entries: &[(&str, &str, &str)]) -> Self {
        let entries = entries
            .iter()
            .map(|(key, sku, barcode)| {
                (
                    normalize(key),
                    ResolvedCode {
                        sku: normalize(sku),
                        barcode: normalize(barcode),
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

#[async_trait]
impl BarcodeLookup for MemoryBarcodeLookup {
    async fn lookup(&self, normalized: &str) -> ClientResult<Option<ResolvedCode>> {
        Ok(self.entries.get(normalized).cloned())
    }
}
