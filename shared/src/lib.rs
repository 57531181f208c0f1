//! Shared types for the depot fulfillment system
//!
//! Domain types used across the workspace: SKU/barcode primitives,
//! depot and stock models, order models, assignment records and the
//! note mini-ledger codec. This crate performs no I/O.

pub mod models;
pub mod note;
pub mod sku;

// Re-exports
pub use models::{
    AssignmentRecord, Depot, DepotCode, DepotStock, ItemStatus, Order, OrderItem, PackRef,
    PickSubstate, StockSnapshot,
};
pub use note::{NoteHistory, NoteStep, NoteWinner};
pub use sku::Sku;
