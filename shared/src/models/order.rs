//! Order and pack models

use serde::{Deserialize, Serialize};

/// Identifier of a pack: a group of order line items sold as one
/// fulfillment unit. All physical units of a pack must be picked together
/// before the pack is eligible for fulfillment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackRef(pub String);

impl PackRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Line item lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Unassigned,
    Assigned,
    Fulfilled,
    /// No depot could satisfy the item; terminal until stock changes
    Exhausted,
    Cancelled,
}

/// Pick-workflow substate of an order, used for match priority and
/// reprint detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickSubstate {
    ReadyToPrint,
    Printed,
    Other,
}

/// One order line item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    /// Primary SKU text (`Article-Color-Size` or literal)
    pub sku: String,
    /// Canonical barcode; back-filled from the SKU when missing
    pub barcode: Option<String>,
    /// Alternate resolved identifier, distinct from the primary SKU.
    /// Used for the secondary mismatch search only.
    pub real_sku: Option<String>,
    pub product_name: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub quantity: i64,
    pub status: ItemStatus,
}

impl OrderItem {
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

/// A marketplace order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Pack this order's items belong to
    pub pack: PackRef,
    pub items: Vec<OrderItem>,
    /// Free-text note field; carries the note mini-ledger and the
    /// depot keyword
    pub note: String,
    /// Shipment id used as the fulfillment target; packs without one run
    /// the debit half only
    pub shipping_ref: Option<String>,
    pub substate: PickSubstate,
}

impl Order {
    /// Total physical units across all items
    pub fn unit_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}
