//! Debit + print executor
//!
//! Runs the two irreversible side effects of a picked unit: the ERP
//! stock debit and the label print. The two run concurrently; they are
//! independent systems and neither waits for the other.
//!
//! # Debit policy
//!
//! The debit endpoint double-subtracts on duplicate calls, so the debit
//! is one bounded attempt, serialized process-wide, and recorded in a
//! daily idempotency marker before the lock is released:
//!
//! - `Confirmed` → marker written, reported as debited
//! - `Timeout` → marker written, reported as assumed-debited. A lost
//!   reply usually means the ERP did subtract; re-sending would risk a
//!   physical double debit, while skipping risks at worst an on-paper
//!   surplus that the nightly reconciliation catches. Timeout counts as
//!   success and is never retried.
//! - `Failed` → no marker; the unit stays debitable
//!
//! # Print policy
//!
//! Printing is safely repeatable, so it retries up to a bounded count
//! with a fresh payload fetch on every attempt (a stale payload may
//! reference an expired shipment document).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use shared::models::{DepotCode, PackRef};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::clients::erp::{DebitOutcome, DebitRequest, ErpApi};
use crate::clients::label::LabelApi;
use crate::store::FulfillStore;

/// One picked unit to fulfill
#[derive(Debug, Clone)]
pub struct FulfillJob {
    pub pack: PackRef,
    pub order_id: String,
    /// Normalized SKU, also the idempotency-marker key component
    pub sku: String,
    /// Resolved code sent to the ERP
    pub code: String,
    pub unit_index: u32,
    /// Depot to debit from; `None` = print-only (reprint path)
    pub depot: Option<DepotCode>,
    /// Movement-log description shown in the ERP
    pub description: String,
    /// Print target; `None` = debit only
    pub shipping_ref: Option<String>,
}

/// How the debit half ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebitStatus {
    /// ERP confirmed the movement
    Debited,
    /// Reply lost; treated as debited, marker written
    AssumedDebited,
    /// Today's marker already existed; no call was made
    AlreadyDebited,
    /// Job carried no depot (print-only)
    Skipped,
    Failed(String),
}

/// How the print half ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintStatus {
    Printed { attempts: u32 },
    /// Job carried no shipping reference
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct FulfillReport {
    pub debit: DebitStatus,
    pub print: PrintStatus,
}

impl FulfillReport {
    /// A report is OK when stock moved (or is assumed moved) and the
    /// print either succeeded or was not requested
    pub fn is_ok(&self) -> bool {
        !matches!(self.debit, DebitStatus::Failed(_))
            && !matches!(self.print, PrintStatus::Failed(_))
    }
}

pub struct FulfillmentExecutor {
    erp: Arc<dyn ErpApi>,
    labels: Arc<dyn LabelApi>,
    store: FulfillStore,
    /// Serializes every debit in the process; at most one in flight
    debit_lock: Mutex<()>,
    print_retry_max: u32,
    print_retry_backoff: Duration,
}

impl FulfillmentExecutor {
    pub fn new(
        erp: Arc<dyn ErpApi>,
        labels: Arc<dyn LabelApi>,
        store: FulfillStore,
        print_retry_max: u32,
        print_retry_backoff: Duration,
    ) -> Self {
        Self {
            erp,
            labels,
            store,
            debit_lock: Mutex::new(()),
            print_retry_max: print_retry_max.max(1),
            print_retry_backoff,
        }
    }

    /// Run debit and print for one unit
    pub async fn execute(&self, job: &FulfillJob) -> FulfillReport {
        let (debit, print) = tokio::join!(self.debit_unit(job), self.print_label(job));
        let report = FulfillReport { debit, print };

        info!(
            pack = %job.pack,
            unit_index = job.unit_index,
            debit = ?report.debit,
            print = ?report.print,
            "Fulfillment executed"
        );
        report
    }

    /// Single-attempt debit inside the process-wide critical section.
    /// The marker check, the ERP call and the marker write all happen
    /// under the lock so a concurrent scan of the same unit cannot
    /// double-debit.
    async fn debit_unit(&self, job: &FulfillJob) -> DebitStatus {
        let Some(depot) = job.depot.clone() else {
            return DebitStatus::Skipped;
        };

        let _guard = self.debit_lock.lock().await;
        let date = Utc::now().format("%Y-%m-%d").to_string();

        match self
            .store
            .has_debit_marker(&date, job.pack.as_str(), &job.sku, job.unit_index)
        {
            Ok(true) => {
                info!(pack = %job.pack, unit_index = job.unit_index, "Debit marker present, skipping");
                return DebitStatus::AlreadyDebited;
            }
            Ok(false) => {}
            Err(e) => return DebitStatus::Failed(e.to_string()),
        }

        let request = DebitRequest {
            pack: job.pack.clone(),
            code: job.code.clone(),
            depot,
            description: job.description.clone(),
        };

        let status = match self.erp.debit_stock(&request).await {
            DebitOutcome::Confirmed => DebitStatus::Debited,
            DebitOutcome::Timeout => {
                warn!(pack = %job.pack, unit_index = job.unit_index, "Debit timed out, assuming success");
                DebitStatus::AssumedDebited
            }
            DebitOutcome::Failed(msg) => {
                error!(pack = %job.pack, unit_index = job.unit_index, error = %msg, "Debit failed");
                return DebitStatus::Failed(msg);
            }
        };

        if let Err(e) =
            self.store
                .record_debit_marker(&date, job.pack.as_str(), &job.sku, job.unit_index)
        {
            // The debit went through; surface the bookkeeping failure
            error!(pack = %job.pack, error = %e, "Failed to record debit marker");
            return DebitStatus::Failed(e.to_string());
        }

        status
    }

    async fn print_label(&self, job: &FulfillJob) -> PrintStatus {
        let Some(shipping_ref) = job.shipping_ref.as_deref() else {
            return PrintStatus::Skipped;
        };

        let mut last_error = String::new();
        for attempt in 1..=self.print_retry_max {
            match self.print_once(shipping_ref).await {
                Ok(()) => return PrintStatus::Printed { attempts: attempt },
                Err(msg) => {
                    warn!(
                        shipping_ref,
                        attempt,
                        max = self.print_retry_max,
                        error = %msg,
                        "Print attempt failed"
                    );
                    last_error = msg;
                    if attempt < self.print_retry_max {
                        tokio::time::sleep(self.print_retry_backoff).await;
                    }
                }
            }
        }

        error!(shipping_ref, error = %last_error, "Print exhausted retries");
        PrintStatus::Failed(last_error)
    }

    async fn print_once(&self, shipping_ref: &str) -> Result<(), String> {
        let payload = self
            .labels
            .fetch_label(shipping_ref)
            .await
            .map_err(|e| e.to_string())?;
        self.labels
            .print_label(shipping_ref, &payload)
            .await
            .map_err(|e| e.to_string())
    }
}
