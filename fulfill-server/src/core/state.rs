//! 服务器状态

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::assignment::{DepotAssigner, ReservationLedger};
use crate::clients::{
    BarcodeLookup, CodeResolver, ErpApi, HttpBarcodeLookup, HttpErpApi, HttpLabelApi,
    HttpMarketplaceApi, HttpStockSource, LabelApi, MarketplaceApi, StockSnapshotSource,
};
use crate::core::{Config, DepotCatalog, Result};
use crate::fulfillment::{FulfillJob, FulfillWorker, FulfillmentExecutor};
use crate::picking::SessionRegistry;
use crate::reassign::CancellationReassigner;
use crate::store::FulfillStore;

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// # 服务组件
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | catalog | 仓库目录 (启动时加载一次) |
/// | store | redb 持久层 |
/// | assigner | 仓库分配器 |
/// | reassigner | 取消/重新分配 |
/// | resolver | barcode⇄SKU 解析链 |
/// | sessions | 活动拣货会话注册表 |
/// | executor | 扣库存 + 打印执行器 |
/// | job_tx | 履约任务通道 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub catalog: Arc<DepotCatalog>,
    pub store: FulfillStore,
    pub marketplace: Arc<dyn MarketplaceApi>,
    pub assigner: Arc<DepotAssigner>,
    pub reassigner: Arc<CancellationReassigner>,
    pub resolver: Arc<CodeResolver>,
    pub sessions: SessionRegistry,
    pub executor: Arc<FulfillmentExecutor>,
    pub job_tx: mpsc::Sender<FulfillJob>,
    /// Consumed once by `start_background_tasks`
    job_rx: Arc<Mutex<Option<mpsc::Receiver<FulfillJob>>>>,
    pub shutdown: CancellationToken,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录
    /// 2. 仓库目录 (depots.json)
    /// 3. redb 数据库
    /// 4. HTTP 客户端与各服务
    pub async fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;

        let catalog = Arc::new(DepotCatalog::load(&config.depot_catalog_path)?);
        let store = FulfillStore::open(config.database_path())?;

        let timeout = Duration::from_millis(config.client_timeout_ms);
        let stock: Arc<dyn StockSnapshotSource> = Arc::new(HttpStockSource::new(
            &config.stock_api_url,
            catalog.denied_codes.clone(),
            timeout,
        ));
        let marketplace: Arc<dyn MarketplaceApi> =
            Arc::new(HttpMarketplaceApi::new(&config.marketplace_api_url, timeout));
        let erp: Arc<dyn ErpApi> = Arc::new(HttpErpApi::new(
            &config.erp_api_url,
            catalog.debit_direction.clone(),
            Duration::from_millis(config.debit_timeout_ms),
        ));
        let labels: Arc<dyn LabelApi> =
            Arc::new(HttpLabelApi::new(&config.label_api_url, timeout));
        // The counterpart database rides the stock service
        let lookup: Arc<dyn BarcodeLookup> =
            Arc::new(HttpBarcodeLookup::new(&config.stock_api_url, timeout));

        Ok(Self::assemble(
            config.clone(),
            catalog,
            store,
            stock,
            marketplace,
            erp,
            labels,
            lookup,
        ))
    }

    /// 手动注入后端 (测试与离线开发用)
    #[allow(clippy::too_many_arguments)]
    pub fn with_backends(
        config: Config,
        catalog: Arc<DepotCatalog>,
        store: FulfillStore,
        stock: Arc<dyn StockSnapshotSource>,
        marketplace: Arc<dyn MarketplaceApi>,
        erp: Arc<dyn ErpApi>,
        labels: Arc<dyn LabelApi>,
        lookup: Arc<dyn BarcodeLookup>,
    ) -> Self {
        Self::assemble(
            config,
            catalog,
            store,
            stock,
            marketplace,
            erp,
            labels,
            lookup,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        config: Config,
        catalog: Arc<DepotCatalog>,
        store: FulfillStore,
        stock: Arc<dyn StockSnapshotSource>,
        marketplace: Arc<dyn MarketplaceApi>,
        erp: Arc<dyn ErpApi>,
        labels: Arc<dyn LabelApi>,
        lookup: Arc<dyn BarcodeLookup>,
    ) -> Self {
        let ledger = ReservationLedger::new(marketplace.clone(), store.clone());
        let assigner = Arc::new(DepotAssigner::new(
            stock,
            ledger,
            catalog.clone(),
            store.clone(),
        ));
        let reassigner = Arc::new(CancellationReassigner::new(
            marketplace.clone(),
            assigner.clone(),
        ));
        let resolver = Arc::new(CodeResolver::new(catalog.barcode_overrides.clone(), lookup));
        let executor = Arc::new(FulfillmentExecutor::new(
            erp,
            labels,
            store.clone(),
            config.print_retry_max,
            Duration::from_millis(config.print_retry_backoff_ms),
        ));

        let (job_tx, job_rx) = mpsc::channel(256);

        Self {
            config,
            catalog,
            store,
            marketplace,
            assigner,
            reassigner,
            resolver,
            sessions: SessionRegistry::new(),
            executor,
            job_tx,
            job_rx: Arc::new(Mutex::new(Some(job_rx))),
            shutdown: CancellationToken::new(),
        }
    }

    /// 启动后台任务 (履约 worker)
    ///
    /// 只能调用一次；重复调用是 no-op。
    pub async fn start_background_tasks(&self) {
        let Some(job_rx) = self.job_rx.lock().await.take() else {
            tracing::warn!("Background tasks already started");
            return;
        };

        let worker = FulfillWorker::new(self.executor.clone());
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            worker.run(job_rx, shutdown).await;
        });
    }

    /// 入队一个履约任务 (队列满时丢弃并记录)
    pub async fn enqueue_fulfill(&self, job: FulfillJob) {
        if let Err(e) = self.job_tx.send(job).await {
            tracing::error!(error = %e, "Failed to enqueue fulfillment job");
        }
    }
}
