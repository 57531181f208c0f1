//! 履约执行
//!
//! - [`executor`] - 扣库存 + 打印执行器 (超时视为成功策略)
//! - [`worker`] - 任务通道消费者

pub mod executor;
pub mod worker;

pub use executor::{DebitStatus, FulfillJob, FulfillReport, FulfillmentExecutor, PrintStatus};
pub use worker::FulfillWorker;
