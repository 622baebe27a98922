// ==========================================
// 试算平衡表导入系统 - 导入层
// ==========================================
// 职责: 外部试算平衡表文件 → 内部落库行
// 流程: 指纹 → 查重 → 解析 → 画像 → (校验) → 映射 → 落库 → 审计
// 支持: CSV
// ==========================================

// 模块声明
pub mod batch_coordinator;
pub mod data_cleaner;
pub mod dq_validator;
pub mod error;
pub mod file_ingestor;
pub mod file_parser;
pub mod fingerprint;
pub mod ingest_traits;
pub mod profiler;
pub mod schema_mapper;

// 重导出核心类型
pub use batch_coordinator::{BatchCoordinator, CancelHandle};
pub use data_cleaner::DataCleaner;
pub use dq_validator::TrialBalanceValidator;
pub use error::{IngestError, IngestResult};
pub use file_ingestor::SingleFileIngestor;
pub use file_parser::CsvParser;
pub use fingerprint::Fingerprinter;
pub use profiler::DataProfiler;
pub use schema_mapper::SchemaMapper;

// 重导出 Trait 接口
pub use ingest_traits::{AuditSink, FileIngestor, FileParser, PersistenceSink, Validator};
