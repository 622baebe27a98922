// ==========================================
// 试算平衡表导入系统 - 导入API
// ==========================================
// 职责: 组装仓储、导入器与批量协调器，封装调用面
// 调用方: CLI / 批处理调度
// ==========================================

use crate::api::error::ApiResult;
use crate::config::{ConfigManager, IngestionConfig};
use crate::db::{self, SharedConnection};
use crate::domain::{AuditEvent, BatchResult, IngestionJob, IngestionMetadata, IngestionResult};
use crate::importer::{
    BatchCoordinator, CancelHandle, FileIngestor, SingleFileIngestor, TrialBalanceValidator,
};
use crate::repository::{AuditLogRepository, TrialBalanceRepository};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// 导入API
pub struct IngestionApi {
    config: IngestionConfig,
    trial_balance_repo: Arc<TrialBalanceRepository>,
    audit_repo: Arc<AuditLogRepository>,
    ingestor: Arc<SingleFileIngestor>,
    coordinator: BatchCoordinator,
}

impl IngestionApi {
    /// 打开（必要时创建）数据库，读取 config_kv 覆写后组装
    pub fn new(db_path: &str) -> ApiResult<Self> {
        info!(db_path = %db_path, "打开数据库");
        let conn = db::open_shared(db_path)?;
        let config = ConfigManager::new(conn.clone()).load_ingestion_config(IngestionConfig::default())?;
        Ok(Self::from_connection(conn, config))
    }

    /// 基于已有连接与显式配置组装
    pub fn from_connection(conn: SharedConnection, config: IngestionConfig) -> Self {
        let trial_balance_repo = Arc::new(TrialBalanceRepository::new(conn.clone()));
        let audit_repo = Arc::new(AuditLogRepository::new(conn));

        let ingestor = Arc::new(SingleFileIngestor::new(
            trial_balance_repo.clone(),
            audit_repo.clone(),
            Some(Arc::new(TrialBalanceValidator::new())),
            config.clone(),
        ));
        let coordinator = BatchCoordinator::new(ingestor.clone(), &config);

        Self {
            config,
            trial_balance_repo,
            audit_repo,
            ingestor,
            coordinator,
        }
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    /// 单文件导入（阻塞，不重试）
    ///
    /// 文件级错误也折叠为 status=failed 的结果返回
    pub fn ingest_file(
        &self,
        file_path: &Path,
        entity: &str,
        period: &str,
        skip_duplicates: bool,
        validate_before_insert: bool,
    ) -> IngestionResult {
        let job = IngestionJob::new(file_path, entity, period)
            .with_skip_duplicates(skip_duplicates)
            .with_validation(validate_before_insert);

        let start_time = Instant::now();
        match self.ingestor.ingest(&job) {
            Ok(result) => result,
            Err(e) => {
                let mut result = IngestionResult::failed(&job, e.to_string());
                result.duration_seconds = start_time.elapsed().as_secs_f64();
                result
            }
        }
    }

    /// 批量导入（有界并发 + 重试）
    pub async fn ingest_batch(
        &self,
        jobs: Vec<IngestionJob>,
        max_workers: usize,
        max_retries: usize,
    ) -> BatchResult {
        self.coordinator
            .ingest_batch(jobs, max_workers, max_retries)
            .await
    }

    /// 取消当前批次（不中断已在执行的任务）
    pub fn cancel_handle(&self) -> CancelHandle {
        self.coordinator.cancel_handle()
    }

    pub fn persisted_row_count(&self, entity: &str, period: &str) -> ApiResult<usize> {
        Ok(self.trial_balance_repo.persisted_row_count(entity, period)?)
    }

    pub fn list_ingestions(&self, entity: &str, period: &str) -> ApiResult<Vec<IngestionMetadata>> {
        Ok(self.audit_repo.list_ingestions(entity, period)?)
    }

    pub fn events_by_fingerprint(&self, fingerprint: &str) -> ApiResult<Vec<AuditEvent>> {
        Ok(self.audit_repo.events_by_fingerprint(fingerprint)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IngestionStatus;

    #[test]
    fn test_missing_file_folds_into_failed_result() {
        let api = IngestionApi::from_connection(
            db::open_shared_in_memory().unwrap(),
            IngestionConfig::default(),
        );

        let result = api.ingest_file(Path::new("/nonexistent/tb.csv"), "ABEX", "2022-06", false, false);

        assert_eq!(result.status, IngestionStatus::Failed);
        assert!(result.error.is_some());
        assert_eq!(api.persisted_row_count("ABEX", "2022-06").unwrap(), 0);
    }

    #[test]
    fn test_new_reads_config_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("tb.db");
        let db_path = db_path.to_str().unwrap();

        {
            let conn = db::open_shared(db_path).unwrap();
            ConfigManager::new(conn)
                .set_config_value(crate::config::config_keys::MAX_WORKERS, "5")
                .unwrap();
        }

        let api = IngestionApi::new(db_path).unwrap();
        assert_eq!(api.config().max_workers, 5);
    }
}
