// ==========================================
// 试算平衡表导入系统 - 导入配置
// ==========================================
// 职责: 显式传入各组件构造函数的导入参数，不使用进程级全局状态
// ==========================================

use crate::importer::fingerprint::DEFAULT_CHUNK_SIZE;
use crate::importer::profiler::DEFAULT_ZERO_BALANCE_EPSILON;
use crate::importer::schema_mapper::{default_optional_columns, REQUIRED_COLUMNS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// 默认并发 worker 数
pub const DEFAULT_MAX_WORKERS: usize = 3;

/// 默认最大尝试次数
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// 单次退避上限（秒）
pub const MAX_BACKOFF_SECS: f64 = 600.0;

// ==========================================
// IngestionConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// 批量导入并发数
    pub max_workers: usize,
    /// 单任务最大尝试次数（含首次）
    pub max_retries: usize,
    /// 退避基数（秒），第 n 次失败后等待 2^n * base
    pub backoff_base_secs: f64,
    /// 指纹分块大小（字节）
    pub fingerprint_chunk_size: usize,
    /// 必需列
    pub required_columns: Vec<String>,
    /// 可选列默认值
    pub optional_column_defaults: BTreeMap<String, Option<String>>,
    /// 校验出现严重失败时是否拦截导入
    pub fail_on_validation_error: bool,
    /// 零余额容差
    pub zero_balance_epsilon: f64,
    /// 审计事件操作人
    pub actor: String,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_secs: 1.0,
            fingerprint_chunk_size: DEFAULT_CHUNK_SIZE,
            required_columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            optional_column_defaults: default_optional_columns(),
            fail_on_validation_error: true,
            zero_balance_epsilon: DEFAULT_ZERO_BALANCE_EPSILON,
            actor: "system".to_string(),
        }
    }
}

impl IngestionConfig {
    /// 第 attempt 次（从 0 开始）失败后的退避时长：2^attempt * base
    ///
    /// 上限 MAX_BACKOFF_SECS；负数或无法表示的值按 0 处理
    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        let exponent = attempt.min(30) as i32;
        let secs = (2f64.powi(exponent) * self.backoff_base_secs).min(MAX_BACKOFF_SECS);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }

    pub fn with_fail_on_validation_error(mut self, fail: bool) -> Self {
        self.fail_on_validation_error = fail;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IngestionConfig::default();
        assert_eq!(config.max_workers, 3);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.fingerprint_chunk_size, 4096);
        assert_eq!(config.required_columns.len(), 8);
        assert_eq!(
            config.optional_column_defaults.get("criticality"),
            Some(&Some("medium".to_string()))
        );
    }

    #[test]
    fn test_backoff_is_exponential() {
        let config = IngestionConfig::default();
        assert_eq!(config.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(config.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(config.backoff_delay(2), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_is_capped() {
        let mut config = IngestionConfig::default();
        assert_eq!(config.backoff_delay(20), Duration::from_secs_f64(MAX_BACKOFF_SECS));

        config.backoff_base_secs = f64::INFINITY;
        assert_eq!(config.backoff_delay(0), Duration::from_secs_f64(MAX_BACKOFF_SECS));

        config.backoff_base_secs = 1e300;
        assert_eq!(config.backoff_delay(2), Duration::from_secs_f64(MAX_BACKOFF_SECS));

        config.backoff_base_secs = -1.0;
        assert_eq!(config.backoff_delay(1), Duration::ZERO);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: IngestionConfig = serde_json::from_str(r#"{"max_workers": 8}"#).unwrap();
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }
}
