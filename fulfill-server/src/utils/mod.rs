//! 工具模块
//!
//! - [`error`] - 统一错误处理 (AppError / AppResponse)
//! - [`logger`] - 日志初始化

pub mod error;
pub mod logger;

pub use error::{AppError, AppResponse, ok, ok_with_message};

/// Result type for API operations
pub type AppResult<T> = Result<T, AppError>;
