//! 拣货
//!
//! - [`types`] - 拣货单元与扫码结果
//! - [`session`] - 拣货会话状态机
//! - [`registry`] - 活动会话注册表

pub mod registry;
pub mod session;
pub mod types;

pub use registry::SessionRegistry;
pub use session::PickSession;
pub use types::{PendingUnit, PickedUnit, ScanOutcome, ScanResult, SessionPhase, SideEffect};
