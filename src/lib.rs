// ==========================================
// 试算平衡表导入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + tokio
// 系统定位: 期末试算平衡表批量导入（指纹查重 / 画像 / 映射 / 落库 / 审计）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 导入参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 调用面
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

pub use api::IngestionApi;
pub use config::IngestionConfig;
pub use domain::{
    BatchResult, DataProfile, IngestionJob, IngestionResult, IngestionStatus,
    SchemaValidationResult,
};
pub use importer::{BatchCoordinator, CancelHandle, IngestError, SingleFileIngestor};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "试算平衡表导入系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
