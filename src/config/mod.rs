// ==========================================
// 试算平衡表导入系统 - 配置层
// ==========================================
// 职责: 导入参数（并发数、重试次数、必需列等）
// 存储: 代码默认值，可被 config_kv 表覆写
// ==========================================

pub mod config_manager;
pub mod ingestion_config;

// 重导出核心配置
pub use config_manager::{config_keys, ConfigManager};
pub use ingestion_config::IngestionConfig;
