// ==========================================
// 试算平衡表导入系统 - 批量导入协调器
// ==========================================
// 职责: 有界并发执行导入任务 + 单任务指数退避重试 + 协作式取消 + 结果汇总
// 约束: 结果只由协调任务收集（单消费者），worker 之间不共享可变状态
// 取消: 只停止启动新任务，已在执行的任务自然结束；标志在批次结束时清除
// ==========================================

use crate::config::IngestionConfig;
use crate::domain::{BatchResult, IngestionJob, IngestionResult, IngestionStatus};
use crate::importer::error::IngestError;
use crate::importer::ingest_traits::FileIngestor;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::{self, JoinSet};
use tracing::{debug, error, info, warn};

// ==========================================
// CancelHandle - 取消句柄
// ==========================================
// 可克隆，可在任意线程/任务中调用
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

// ==========================================
// BatchCoordinator
// ==========================================
pub struct BatchCoordinator {
    ingestor: Arc<dyn FileIngestor>,
    config: Arc<IngestionConfig>,
    cancel: CancelHandle,
}

impl BatchCoordinator {
    pub fn new(ingestor: Arc<dyn FileIngestor>, config: &IngestionConfig) -> Self {
        Self {
            ingestor,
            config: Arc::new(config.clone()),
            cancel: CancelHandle::default(),
        }
    }

    /// 取消句柄
    ///
    /// 批次开始前发出的取消作用于下一个批次；同一协调器上并发运行的批次共享该标志
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// 请求取消当前批次
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// 批量导入
    ///
    /// # 参数
    /// - jobs: 导入任务（各任务独立，无顺序保证）
    /// - max_workers: 并发上限（0 视为 1）
    /// - max_retries: 单任务最大尝试次数（0 视为 1）
    ///
    /// # 返回
    /// - BatchResult: results 按完成顺序排列
    pub async fn ingest_batch(
        &self,
        jobs: Vec<IngestionJob>,
        max_workers: usize,
        max_retries: usize,
    ) -> BatchResult {
        let total = jobs.len();
        let max_workers = max_workers.max(1);
        let max_retries = max_retries.max(1);

        info!(total, max_workers, max_retries, "开始批量导入");

        let mut pending: VecDeque<IngestionJob> = jobs.into();
        let mut in_flight: JoinSet<IngestionResult> = JoinSet::new();
        // 任务 id → job，任务异常退出时据此补记结果
        let mut running: HashMap<task::Id, IngestionJob> = HashMap::new();
        let mut results = Vec::with_capacity(total);
        let mut cancelled = false;

        loop {
            if !cancelled && self.cancel.is_cancelled() {
                cancelled = true;
                warn!(
                    not_started = pending.len(),
                    running = in_flight.len(),
                    "批量导入已取消，不再启动新任务"
                );
                pending.clear();
            }

            // 补足空闲 worker
            while !cancelled && in_flight.len() < max_workers {
                let Some(job) = pending.pop_front() else {
                    break;
                };
                let ingestor = Arc::clone(&self.ingestor);
                let config = Arc::clone(&self.config);
                let handle =
                    in_flight.spawn(run_with_retry(ingestor, job.clone(), max_retries, config));
                running.insert(handle.id(), job);
            }

            let Some(joined) = in_flight.join_next_with_id().await else {
                break;
            };

            match joined {
                Ok((id, result)) => {
                    running.remove(&id);
                    debug!(
                        file = %result.file_path.display(),
                        status = %result.status,
                        "任务完成"
                    );
                    results.push(result);
                }
                Err(e) => {
                    error!(error = %e, "导入任务异常退出");
                    if let Some(job) = running.remove(&e.id()) {
                        results.push(IngestionResult::failed(&job, e.to_string()));
                    }
                }
            }
        }

        self.cancel.reset();

        let batch = BatchResult::from_results(total, results, cancelled);
        info!(
            total = batch.total,
            successful = batch.successful,
            failed = batch.failed,
            skipped = batch.skipped,
            cancelled = batch.cancelled,
            "批量导入结束"
        );
        batch
    }
}

/// 单任务重试循环
///
/// success / skipped 立即结束；其余状态或错误在退避后重试，
/// 最后一次仍失败时记为 failed + "Max retries exceeded"
async fn run_with_retry(
    ingestor: Arc<dyn FileIngestor>,
    job: IngestionJob,
    max_retries: usize,
    config: Arc<IngestionConfig>,
) -> IngestionResult {
    let job = Arc::new(job);
    let mut last_result: Option<IngestionResult> = None;

    for attempt in 0..max_retries {
        let worker = Arc::clone(&ingestor);
        let attempt_job = Arc::clone(&job);
        let outcome = tokio::task::spawn_blocking(move || worker.ingest(&attempt_job)).await;

        match outcome {
            Ok(Ok(result)) if result.status.is_terminal() => return result,
            Ok(Ok(result)) => {
                warn!(
                    entity = %job.entity,
                    period = %job.period,
                    attempt = attempt + 1,
                    status = %result.status,
                    error = result.error.as_deref().unwrap_or(""),
                    "导入未成功"
                );
                last_result = Some(result);
            }
            Ok(Err(e)) => {
                warn!(
                    entity = %job.entity,
                    period = %job.period,
                    attempt = attempt + 1,
                    error = %e,
                    "导入出错"
                );
            }
            Err(e) => {
                error!(entity = %job.entity, attempt = attempt + 1, error = %e, "导入线程异常退出");
            }
        }

        if attempt + 1 < max_retries {
            let delay = config.backoff_delay(attempt);
            debug!(attempt = attempt + 1, delay_secs = delay.as_secs_f64(), "退避后重试");
            tokio::time::sleep(delay).await;
        }
    }

    // 保留最后一次尝试的计数与画像，状态统一为 failed
    let mut result = last_result.unwrap_or_else(|| IngestionResult::failed(&job, ""));
    result.status = IngestionStatus::Failed;
    result.error = Some(IngestError::MaxRetriesExceeded.to_string());
    error!(
        entity = %job.entity,
        period = %job.period,
        attempts = max_retries,
        "重试次数耗尽"
    );
    result
}
