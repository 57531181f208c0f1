//! Depot Fulfillment Server
//!
//! Assigns e-commerce order items to physical depots with overlapping
//! stock, drives the operator barcode-scan pick workflow, and executes the
//! stock-debit + label-print pair without ever double-debiting stock or
//! double-printing a label.
//!
//! # Module structure
//!
//! ```text
//! fulfill-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── clients/       # 外部接口 (stock, ERP, marketplace, label, lookup)
//! ├── assignment/    # 仓库排序与分配 (ranker, ledger, assigner)
//! ├── picking/       # 拣货会话状态机
//! ├── fulfillment/   # 扣库存 + 打印执行器
//! ├── reassign/      # 取消/重新分配
//! ├── store.rs       # redb 持久层
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 错误、日志
//! ```

pub mod api;
pub mod assignment;
pub mod clients;
pub mod core;
pub mod fulfillment;
pub mod picking;
pub mod reassign;
pub mod store;
pub mod utils;

// Re-export 公共类型
pub use assignment::{DepotAssigner, DepotRanker};
pub use core::{Config, DepotCatalog, Server, ServerState};
pub use fulfillment::FulfillmentExecutor;
pub use picking::PickSession;
pub use reassign::CancellationReassigner;
pub use utils::{AppError, AppResponse, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

pub fn print_banner() {
    println!(
        r#"
   ____                  __
  / __ \___  ____  ____ / /_
 / / / / _ \/ __ \/ __ \ __/
/ /_/ /  __/ /_/ / /_/ / /_
\____/\___/ .___/\____/\__/
         /_/   fulfillment edge
"#
    );
}

/// 设置环境 (dotenv, 日志)
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenv::dotenv();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_json = std::env::var("LOG_JSON").ok().map(|v| v == "1" || v == "true");
    let log_dir = std::env::var("LOG_DIR").ok();
    utils::logger::init_logger_with_file(log_level.as_deref(), log_json, log_dir.as_deref());

    Ok(())
}
