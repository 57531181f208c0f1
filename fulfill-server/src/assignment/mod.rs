//! 仓库分配
//!
//! - [`ranker`] - 纯排序原语 (assigner 与 reassigner 共用)
//! - [`ledger`] - 预留台账
//! - [`assigner`] - 分配编排与持久化

pub mod assigner;
pub mod ledger;
pub mod ranker;

pub use assigner::{AssignError, Assignment, DepotAssigner};
pub use ledger::ReservationLedger;
pub use ranker::{DepotRanker, RankError, RankedDepot};
