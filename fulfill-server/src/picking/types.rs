//! Pick session types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::models::{PackRef, PickSubstate};

/// One physical unit of one order item, not yet picked.
///
/// Codes are stored normalized; `barcode` is back-filled from the SKU
/// (and vice versa) at seed time when the external lookup has no entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUnit {
    pub pack: PackRef,
    pub order_id: String,
    pub item_index: u32,
    /// Unit position within the item's required quantity
    pub unit_index: u32,
    pub sku: String,
    pub barcode: String,
    /// Alternate resolved identifier used only by the mismatch fallback
    pub real_sku: Option<String>,
    pub product_name: String,
    pub color: Option<String>,
    pub size: Option<String>,
    /// Order substate at seed time; drives match preference
    pub substate: PickSubstate,
    /// Whether the owning order's note carries an allow-listed depot
    /// keyword; units of filtered-out orders never match
    pub keyword_ok: bool,
}

impl PendingUnit {
    /// Short human description ("Remera lisa (AZUL M)")
    pub fn describe(&self) -> String {
        match (&self.color, &self.size) {
            (Some(c), Some(s)) => format!("{} ({c} {s})", self.product_name),
            (Some(c), None) => format!("{} ({c})", self.product_name),
            (None, Some(s)) => format!("{} ({s})", self.product_name),
            (None, None) => self.product_name.clone(),
        }
    }
}

/// A unit that has been picked exactly once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickedUnit {
    pub unit: PendingUnit,
    pub picked_at: DateTime<Utc>,
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Active,
    Completed,
    Abandoned,
}

/// Downstream work a scan produced; dispatched outside the session lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    None,
    /// Debit one unit; print only when `shipping_ref` is set (pack
    /// complete with a fulfillment target)
    Fulfill {
        pack: PackRef,
        order_id: String,
        item_index: u32,
        sku: String,
        barcode: String,
        unit_index: u32,
        /// Movement-log description for the ERP
        description: String,
        shipping_ref: Option<String>,
    },
    /// Re-print the label only; no stock movement
    ReprintLabel {
        pack: PackRef,
        shipping_ref: String,
    },
}

/// Outcome of one scan. Every variant renders one human-readable line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Matched {
        order_id: String,
        pack: PackRef,
        description: String,
        pack_complete: bool,
        /// Distinct product descriptions still pending in the pack
        remaining: Vec<String>,
    },
    Reprint {
        pack: PackRef,
    },
    ReprintTooSoon {
        pack: PackRef,
        wait_secs: i64,
    },
    NotFound {
        code: String,
    },
    PossibleMismatch {
        order_id: String,
        code: String,
    },
    SessionClosed,
}

impl ScanOutcome {
    /// One-line operator message
    pub fn message(&self) -> String {
        match self {
            Self::Matched {
                description,
                pack_complete: true,
                ..
            } => format!("OK: {description} — paquete completo"),
            Self::Matched {
                description,
                remaining,
                ..
            } => {
                if remaining.is_empty() {
                    format!("OK: {description}")
                } else {
                    format!("OK: {description} — falta: {}", remaining.join(", "))
                }
            }
            Self::Reprint { pack } => format!("Reimprimiendo etiqueta del paquete {pack}"),
            Self::ReprintTooSoon { wait_secs, .. } => {
                format!("Demasiado pronto para reimprimir (esperar {wait_secs}s)")
            }
            Self::NotFound { code } => format!("No encontrado: {code}"),
            Self::PossibleMismatch { order_id, code } => {
                format!("¿Posible confusión? {code} coincide con la orden {order_id} — confirmar")
            }
            Self::SessionClosed => "Sesión cerrada".to_string(),
        }
    }
}

/// Scan result: the outcome plus the work to dispatch
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub outcome: ScanOutcome,
    pub side_effect: SideEffect,
}

impl ScanResult {
    pub fn plain(outcome: ScanOutcome) -> Self {
        Self {
            outcome,
            side_effect: SideEffect::None,
        }
    }
}
