// ==========================================
// 试算平衡表导入系统 - 导入任务与结果模型
// ==========================================
// 职责: 导入任务、单文件结果、批量结果
// 约束: IngestionResult 返回后不再修改
// ==========================================

use crate::domain::trial_balance::DataProfile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ==========================================
// IngestionJob - 导入任务
// ==========================================
// 用途: 调用方创建，批量协调器消费一次
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionJob {
    pub file_path: PathBuf,
    pub entity: String,
    pub period: String,
    /// true 时不做指纹查重（强制重新导入）
    pub skip_duplicates: bool,
    /// true 时在落库前执行校验器
    pub validate_before_insert: bool,
}

impl IngestionJob {
    pub fn new(
        file_path: impl Into<PathBuf>,
        entity: impl Into<String>,
        period: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            entity: entity.into(),
            period: period.into(),
            skip_duplicates: false,
            validate_before_insert: false,
        }
    }

    pub fn with_skip_duplicates(mut self, skip_duplicates: bool) -> Self {
        self.skip_duplicates = skip_duplicates;
        self
    }

    pub fn with_validation(mut self, validate_before_insert: bool) -> Self {
        self.validate_before_insert = validate_before_insert;
        self
    }
}

// ==========================================
// IngestionStatus - 导入终态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStatus {
    Success,
    ValidationFailed,
    Failed,
    Skipped,
}

impl IngestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestionStatus::Success => "success",
            IngestionStatus::ValidationFailed => "validation_failed",
            IngestionStatus::Failed => "failed",
            IngestionStatus::Skipped => "skipped",
        }
    }

    /// success / skipped 为终态，不再重试
    pub fn is_terminal(&self) -> bool {
        matches!(self, IngestionStatus::Success | IngestionStatus::Skipped)
    }
}

impl std::fmt::Display for IngestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// UpsertSummary - 落库计数
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
}

// ==========================================
// ValidationSummary - 校验器输出
// ==========================================
// 说明: 导入核心只读取计数与 passed 标记
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_checks: usize,
    pub failed_checks: usize,
    pub critical_failures: usize,
    pub passed: bool,
}

// ==========================================
// IngestionResult - 单文件导入结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionResult {
    pub file_path: PathBuf,
    pub entity: String,
    pub period: String,
    pub status: IngestionStatus,
    pub fingerprint: Option<String>,
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
    pub duration_seconds: f64,
    pub profile: Option<DataProfile>,
    pub validation: Option<ValidationSummary>,
    pub error: Option<String>,
}

impl IngestionResult {
    /// 以空计数构造结果（用于短路分支）
    pub fn empty(job: &IngestionJob, status: IngestionStatus) -> Self {
        Self {
            file_path: job.file_path.clone(),
            entity: job.entity.clone(),
            period: job.period.clone(),
            status,
            fingerprint: None,
            inserted: 0,
            updated: 0,
            failed: 0,
            duration_seconds: 0.0,
            profile: None,
            validation: None,
            error: None,
        }
    }

    pub fn failed(job: &IngestionJob, error: impl Into<String>) -> Self {
        let mut result = Self::empty(job, IngestionStatus::Failed);
        result.error = Some(error.into());
        result
    }
}

// ==========================================
// BatchResult - 批量导入结果
// ==========================================
// 不变式: 未取消时 total == successful + failed + skipped 且 results.len() == total
//         取消时 results.len() <= total
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<IngestionResult>,
    pub cancelled: bool,
}

impl BatchResult {
    /// 按收集到的结果状态汇总计数
    ///
    /// validation_failed 计入 failed
    pub fn from_results(total: usize, results: Vec<IngestionResult>, cancelled: bool) -> Self {
        let mut batch = BatchResult {
            total,
            cancelled,
            ..Default::default()
        };
        for result in &results {
            match result.status {
                IngestionStatus::Success => batch.successful += 1,
                IngestionStatus::Skipped => batch.skipped += 1,
                IngestionStatus::Failed | IngestionStatus::ValidationFailed => batch.failed += 1,
            }
        }
        batch.results = results;
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal() {
        assert!(IngestionStatus::Success.is_terminal());
        assert!(IngestionStatus::Skipped.is_terminal());
        assert!(!IngestionStatus::Failed.is_terminal());
        assert!(!IngestionStatus::ValidationFailed.is_terminal());
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&IngestionStatus::ValidationFailed).unwrap();
        assert_eq!(json, "\"validation_failed\"");
    }

    #[test]
    fn test_batch_result_tally() {
        let job = IngestionJob::new("a.csv", "ABEX", "2022-06");
        let results = vec![
            IngestionResult::empty(&job, IngestionStatus::Success),
            IngestionResult::empty(&job, IngestionStatus::Skipped),
            IngestionResult::empty(&job, IngestionStatus::ValidationFailed),
            IngestionResult::failed(&job, "boom"),
        ];

        let batch = BatchResult::from_results(4, results, false);

        assert_eq!(batch.successful, 1);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.failed, 2);
        assert_eq!(batch.total, batch.successful + batch.failed + batch.skipped);
        assert_eq!(batch.results.len(), batch.total);
    }
}
