// ==========================================
// 试算平衡表导入系统 - 领域模型层
// ==========================================
// 职责: 定义导入任务、数据画像、结果汇总、审计事件
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod audit;
pub mod ingestion;
pub mod trial_balance;

// 重导出核心类型
pub use audit::{AuditEvent, AuditEventType, IngestionMetadata};
pub use ingestion::{
    BatchResult, IngestionJob, IngestionResult, IngestionStatus, UpsertSummary, ValidationSummary,
};
pub use trial_balance::{
    BalanceStats, DataProfile, RawDataset, SchemaValidationResult, TrialBalanceRow,
};
