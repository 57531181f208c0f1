//! 取消与重新分配
//!
//! - [`reassigner`] - 取消编排: 备注台账 + 重新分配

pub mod reassigner;

pub use reassigner::{CancelError, CancellationReassigner, ReassignOutcome};
