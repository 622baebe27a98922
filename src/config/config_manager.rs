// ==========================================
// 试算平衡表导入系统 - 配置管理器
// ==========================================
// 职责: 从 config_kv 表读取导入参数覆写，缺省回退代码默认值
// 存储: config_kv 表 (key-value + scope，仅使用 global scope)
// ==========================================

use crate::config::ingestion_config::IngestionConfig;
use crate::db::SharedConnection;
use crate::importer::error::{IngestError, IngestResult};
use rusqlite::params;
use std::str::FromStr;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: SharedConnection,
}

impl ConfigManager {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> IngestResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| IngestError::Internal(format!("锁获取失败: {}", e)))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入 global scope 配置值
    pub fn set_config_value(&self, key: &str, value: &str) -> IngestResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| IngestError::Internal(format!("锁获取失败: {}", e)))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;

        Ok(())
    }

    /// 读取并解析配置值；值存在但无法解析时报错
    fn get_parsed<T: FromStr>(&self, key: &str) -> IngestResult<Option<T>>
    where
        T::Err: std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| IngestError::Config {
                    key: key.to_string(),
                    value: raw.clone(),
                    message: e.to_string(),
                }),
        }
    }

    /// 以 base 为底，叠加 config_kv 中的覆写
    pub fn load_ingestion_config(&self, base: IngestionConfig) -> IngestResult<IngestionConfig> {
        let mut config = base;

        if let Some(v) = self.get_parsed::<usize>(config_keys::MAX_WORKERS)? {
            config.max_workers = v;
        }
        if let Some(v) = self.get_parsed::<usize>(config_keys::MAX_RETRIES)? {
            config.max_retries = v;
        }
        if let Some(v) = self.get_parsed::<f64>(config_keys::BACKOFF_BASE_SECS)? {
            if !v.is_finite() || v < 0.0 {
                return Err(IngestError::Config {
                    key: config_keys::BACKOFF_BASE_SECS.to_string(),
                    value: v.to_string(),
                    message: "退避基数必须是非负有限数".to_string(),
                });
            }
            config.backoff_base_secs = v;
        }
        if let Some(v) = self.get_parsed::<bool>(config_keys::FAIL_ON_VALIDATION_ERROR)? {
            config.fail_on_validation_error = v;
        }
        if let Some(v) = self.get_config_value(config_keys::ACTOR)? {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                config.actor = trimmed.to_string();
            }
        }

        Ok(config)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const MAX_WORKERS: &str = "ingest.max_workers";
    pub const MAX_RETRIES: &str = "ingest.max_retries";
    pub const BACKOFF_BASE_SECS: &str = "ingest.backoff_base_secs";
    pub const FAIL_ON_VALIDATION_ERROR: &str = "ingest.fail_on_validation_error";
    pub const ACTOR: &str = "ingest.actor";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_shared_in_memory;

    #[test]
    fn test_defaults_without_overrides() {
        let manager = ConfigManager::new(open_shared_in_memory().unwrap());

        let config = manager.load_ingestion_config(IngestionConfig::default()).unwrap();

        assert_eq!(config, IngestionConfig::default());
    }

    #[test]
    fn test_overrides_applied() {
        let manager = ConfigManager::new(open_shared_in_memory().unwrap());
        manager.set_config_value(config_keys::MAX_WORKERS, "6").unwrap();
        manager.set_config_value(config_keys::FAIL_ON_VALIDATION_ERROR, "false").unwrap();
        manager.set_config_value(config_keys::ACTOR, " batch-runner ").unwrap();

        let config = manager.load_ingestion_config(IngestionConfig::default()).unwrap();

        assert_eq!(config.max_workers, 6);
        assert!(!config.fail_on_validation_error);
        assert_eq!(config.actor, "batch-runner");
    }

    #[test]
    fn test_invalid_override_is_config_error() {
        let manager = ConfigManager::new(open_shared_in_memory().unwrap());
        manager.set_config_value(config_keys::MAX_RETRIES, "many").unwrap();

        let result = manager.load_ingestion_config(IngestionConfig::default());

        assert!(matches!(result, Err(IngestError::Config { .. })));
    }

    #[test]
    fn test_non_finite_backoff_is_config_error() {
        let manager = ConfigManager::new(open_shared_in_memory().unwrap());

        for raw in ["inf", "NaN", "-0.5"] {
            manager.set_config_value(config_keys::BACKOFF_BASE_SECS, raw).unwrap();
            let result = manager.load_ingestion_config(IngestionConfig::default());
            assert!(
                matches!(result, Err(IngestError::Config { ref key, .. }) if key == config_keys::BACKOFF_BASE_SECS),
                "value {raw} should be rejected"
            );
        }

        manager.set_config_value(config_keys::BACKOFF_BASE_SECS, "0.25").unwrap();
        let config = manager.load_ingestion_config(IngestionConfig::default()).unwrap();
        assert_eq!(config.backoff_base_secs, 0.25);
    }
}
