//! Fulfillment worker
//!
//! 监听履约任务通道，执行扣库存与打印。
//! Scans enqueue jobs and return immediately; the worker drains the
//! channel so the scan endpoint never blocks on the ERP or the printer.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::executor::{FulfillJob, FulfillmentExecutor};

/// 履约工作者
///
/// 串行消费任务通道。任务之间的顺序无关紧要 (扣库存由执行器的
/// 进程级锁串行化)，但单 worker 保证打印机不会被并发任务淹没。
pub struct FulfillWorker {
    executor: Arc<FulfillmentExecutor>,
}

impl FulfillWorker {
    pub fn new(executor: Arc<FulfillmentExecutor>) -> Self {
        Self { executor }
    }

    /// 运行工作者（阻塞直到通道关闭或收到停机信号）
    pub async fn run(self, mut job_rx: mpsc::Receiver<FulfillJob>, shutdown: CancellationToken) {
        tracing::info!("Fulfillment worker started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Fulfillment worker received shutdown signal");
                    break;
                }
                job = job_rx.recv() => {
                    let Some(job) = job else {
                        tracing::info!("Job channel closed, fulfillment worker stopping");
                        break;
                    };
                    let report = self.executor.execute(&job).await;
                    if !report.is_ok() {
                        tracing::error!(
                            pack = %job.pack,
                            unit_index = job.unit_index,
                            debit = ?report.debit,
                            print = ?report.print,
                            "Fulfillment job ended with failures"
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::memory::{MemoryErpApi, MemoryLabelApi};
    use crate::store::FulfillStore;
    use shared::models::{DepotCode, PackRef};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn test_job(unit_index: u32) -> FulfillJob {
        FulfillJob {
            pack: PackRef::new("pack-1"),
            order_id: "o1".to_string(),
            sku: "CAM01AZULM".to_string(),
            code: "7791234567890".to_string(),
            unit_index,
            depot: Some(DepotCode::new("DEP")),
            description: "Remera lisa".to_string(),
            shipping_ref: None,
        }
    }

    #[tokio::test]
    async fn test_worker_drains_channel_and_stops_on_shutdown() {
        let erp = Arc::new(MemoryErpApi::new());
        let executor = Arc::new(FulfillmentExecutor::new(
            erp.clone(),
            Arc::new(MemoryLabelApi::new()),
            FulfillStore::in_memory().unwrap(),
            1,
            Duration::ZERO,
        ));

        let (tx, rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(FulfillWorker::new(executor).run(rx, shutdown.clone()));

        for unit_index in 0..3 {
            tx.send(test_job(unit_index)).await.unwrap();
        }

        // Give the worker a chance to drain before signalling shutdown
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(erp.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_worker_stops_when_channel_closes() {
        let executor = Arc::new(FulfillmentExecutor::new(
            Arc::new(MemoryErpApi::new()),
            Arc::new(MemoryLabelApi::new()),
            FulfillStore::in_memory().unwrap(),
            1,
            Duration::ZERO,
        ));

        let (tx, rx) = mpsc::channel::<FulfillJob>(1);
        let handle = tokio::spawn(FulfillWorker::new(executor).run(rx, CancellationToken::new()));
        drop(tx);
        handle.await.unwrap();
    }
}
