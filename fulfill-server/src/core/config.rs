//! 服务器配置
//!
//! Scalar settings come from the environment; the per-deployment depot
//! catalog (priorities, aliases, deny-list, note keywords, barcode
//! overrides, debit directions) is a JSON file loaded once at startup.
//!
//! # 环境变量
//!
//! | 环境变量 | 默认值 | 说明 |
//! |----------|--------|------|
//! | WORK_DIR | /var/lib/fulfill | 工作目录 (redb 数据库、日志) |
//! | HTTP_PORT | 3000 | HTTP 服务端口 |
//! | STOCK_API_URL | http://localhost:8001 | 库存快照接口 |
//! | ERP_API_URL | http://localhost:8002 | ERP 扣库存接口 |
//! | MARKETPLACE_API_URL | http://localhost:8003 | 订单/备注接口 |
//! | LABEL_API_URL | http://localhost:8004 | 面单接口 |
//! | DEPOT_CATALOG | ./depots.json | 仓库目录文件 |
//! | DEBIT_TIMEOUT_MS | 8000 | 扣库存调用超时 |
//! | PRINT_RETRY_MAX | 3 | 打印重试上限 |
//! | REPRINT_COOLDOWN_SECS | 30 | 重打冷却窗口 |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shared::models::{Depot, DepotCode};
use thiserror::Error;

use crate::clients::erp::DebitDirection;
use crate::clients::lookup::ResolvedCode;

/// 服务器配置
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,

    // === 外部接口 ===
    pub stock_api_url: String,
    pub erp_api_url: String,
    pub marketplace_api_url: String,
    pub label_api_url: String,
    /// 普通客户端超时 (毫秒)
    pub client_timeout_ms: u64,
    /// 扣库存调用超时 (毫秒); 超时按成功处理，绝不重试
    pub debit_timeout_ms: u64,

    // === 执行策略 ===
    /// 打印重试上限 (打印可安全重复)
    pub print_retry_max: u32,
    /// 打印重试退避 (毫秒)
    pub print_retry_backoff_ms: u64,
    /// 每个 pack 的重打冷却窗口 (秒)
    pub reprint_cooldown_secs: u64,

    /// 仓库目录文件路径
    pub depot_catalog_path: String,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/fulfill".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            stock_api_url: std::env::var("STOCK_API_URL")
                .unwrap_or_else(|_| "http://localhost:8001".into()),
            erp_api_url: std::env::var("ERP_API_URL")
                .unwrap_or_else(|_| "http://localhost:8002".into()),
            marketplace_api_url: std::env::var("MARKETPLACE_API_URL")
                .unwrap_or_else(|_| "http://localhost:8003".into()),
            label_api_url: std::env::var("LABEL_API_URL")
                .unwrap_or_else(|_| "http://localhost:8004".into()),
            client_timeout_ms: std::env::var("CLIENT_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30_000),
            debit_timeout_ms: std::env::var("DEBIT_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8_000),
            print_retry_max: std::env::var("PRINT_RETRY_MAX")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3),
            print_retry_backoff_ms: std::env::var("PRINT_RETRY_BACKOFF_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(500),
            reprint_cooldown_secs: std::env::var("REPRINT_COOLDOWN_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30),
            depot_catalog_path: std::env::var("DEPOT_CATALOG")
                .unwrap_or_else(|_| "./depots.json".into()),
        }
    }

    /// 使用自定义值覆盖部分配置 (常用于测试场景)
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// redb 数据库路径
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("fulfill.redb")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Catalog has no depots")]
    Empty,
}

/// 仓库目录 - enumerated per-deployment data, static per process run.
///
/// Depot order in the file is the ranking tie-break order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepotCatalog {
    pub depots: Vec<Depot>,
    /// Control/staging depot codes excluded from ranking even when the
    /// stock API reports them
    #[serde(default)]
    pub denied_codes: Vec<DepotCode>,
    /// Allow-listed depot keywords an order note must carry to be
    /// matchable during picking (one canonical parameterization; no
    /// per-deployment engine fork)
    #[serde(default)]
    pub note_keywords: Vec<String>,
    /// Manual barcode override table, keyed by scanned code
    #[serde(default)]
    pub barcode_overrides: HashMap<String, ResolvedCode>,
    /// Per-depot debit direction field naming
    #[serde(default)]
    pub debit_direction: HashMap<DepotCode, DebitDirection>,
}

impl DepotCatalog {
    /// Load the catalog from a JSON file, once at startup
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        let catalog: Self = serde_json::from_str(&text)?;
        if catalog.depots.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(catalog)
    }

    pub fn depot(&self, code: &DepotCode) -> Option<&Depot> {
        self.depots.iter().find(|d| &d.code == code)
    }

    /// Human alias for a depot code; falls back to the raw code
    pub fn alias_of(&self, code: &DepotCode) -> String {
        self.depot(code)
            .map(|d| d.alias.clone())
            .unwrap_or_else(|| code.to_string())
    }

    /// Reverse lookup from a note location: alias first (the `N)LOC:`
    /// steps), then raw code (the `Nuevo:` trailer). Aliases are unique
    /// per deployment.
    pub fn code_for_alias(&self, name: &str) -> Option<&DepotCode> {
        self.depots
            .iter()
            .find(|d| d.alias.eq_ignore_ascii_case(name))
            .or_else(|| {
                self.depots
                    .iter()
                    .find(|d| d.code.as_str().eq_ignore_ascii_case(name))
            })
            .map(|d| &d.code)
    }

    /// Whether an order note carries any allow-listed depot keyword.
    /// An empty keyword list disables the filter.
    pub fn note_matches_keywords(&self, note: &str) -> bool {
        if self.note_keywords.is_empty() {
            return true;
        }
        let lowered = note.to_lowercase();
        self.note_keywords
            .iter()
            .any(|kw| lowered.contains(&kw.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> DepotCatalog {
        DepotCatalog {
            depots: vec![
                Depot {
                    code: DepotCode::new("DEP"),
                    priority_points: 100,
                    unit_multiplier: 10,
                    alias: "Local Centro".to_string(),
                },
                Depot {
                    code: DepotCode::new("MUNDOCAB"),
                    priority_points: 50,
                    unit_multiplier: 10,
                    alias: "Mundo CABA".to_string(),
                },
            ],
            denied_codes: vec![DepotCode::new("CTRL")],
            note_keywords: vec!["centro".to_string(), "caba".to_string()],
            barcode_overrides: HashMap::new(),
            debit_direction: HashMap::new(),
        }
    }

    #[test]
    fn test_alias_round_trip() {
        let cat = catalog();
        assert_eq!(cat.alias_of(&DepotCode::new("DEP")), "Local Centro");
        assert_eq!(
            cat.code_for_alias("local centro"),
            Some(&DepotCode::new("DEP"))
        );
        // Raw codes resolve too: the note's winner trailer carries them
        assert_eq!(
            cat.code_for_alias("DEP"),
            Some(&DepotCode::new("DEP"))
        );
        // Unknown code falls back to the raw code
        assert_eq!(cat.alias_of(&DepotCode::new("XX")), "XX");
    }

    #[test]
    fn test_note_keyword_filter() {
        let cat = catalog();
        assert!(cat.note_matches_keywords("Retira por CABA mañana"));
        assert!(!cat.note_matches_keywords("sin palabra clave"));

        let mut open = cat.clone();
        open.note_keywords.clear();
        assert!(open.note_matches_keywords("cualquier cosa"));
    }

    #[test]
    fn test_catalog_load_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depots.json");
        std::fs::write(&path, r#"{"depots": []}"#).unwrap();
        assert!(matches!(
            DepotCatalog::load(&path),
            Err(CatalogError::Empty)
        ));
    }
}
