// ==========================================
// 试算平衡表导入系统 - API 层
// ==========================================
// 职责: 对外调用面（单文件导入 / 批量导入 / 查询 / 取消）
// ==========================================

pub mod error;
pub mod ingest_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use ingest_api::IngestionApi;
