//! Data models
//!
//! Shared between the fulfillment engine and its API surface.
//! Serialized with serde; redb stores the JSON form.

pub mod assignment;
pub mod depot;
pub mod order;
pub mod stock;

// Re-exports
pub use assignment::*;
pub use depot::*;
pub use order::*;
pub use stock::*;
