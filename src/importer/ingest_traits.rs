// ==========================================
// 试算平衡表导入系统 - 导入协作方 Trait
// ==========================================
// 职责: 定义导入核心依赖的外部协作方接口（不包含实现）
// 约束: 所有实现必须可被多个 worker 并发调用（Send + Sync）
// ==========================================

use crate::domain::{
    AuditEvent, IngestionJob, IngestionMetadata, IngestionResult, RawDataset, TrialBalanceRow,
    UpsertSummary, ValidationSummary,
};
use crate::importer::error::IngestResult;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件加载（状态机 LOADED 阶段）
// 实现者: CsvParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始数据集
    ///
    /// # 返回
    /// - Ok(RawDataset): 表头 + 行记录
    /// - Err(FileNotFound / ParseError): 文件级错误，终止当前任务
    fn parse(&self, file_path: &Path) -> IngestResult<RawDataset>;
}

// ==========================================
// PersistenceSink Trait
// ==========================================
// 用途: 试算平衡表落库
// 实现者: TrialBalanceRepository（使用 rusqlite）
pub trait PersistenceSink: Send + Sync {
    /// 按 (entity, period, account_code) 批量 upsert
    ///
    /// # 说明
    /// - 同一批行重复导入必须幂等
    /// - 单行失败计入 failed，不中断其余行
    fn upsert_rows(
        &self,
        rows: &[TrialBalanceRow],
        entity: &str,
        period: &str,
    ) -> IngestResult<UpsertSummary>;
}

// ==========================================
// AuditSink Trait
// ==========================================
// 用途: 审计追加 + 指纹查重
// 实现者: AuditLogRepository（使用 rusqlite）
pub trait AuditSink: Send + Sync {
    /// 追加审计事件
    fn log_event(&self, event: &AuditEvent) -> IngestResult<()>;

    /// 是否存在携带该指纹的 file_ingested 事件
    fn find_duplicate_fingerprint(&self, fingerprint: &str) -> IngestResult<bool>;

    /// 写入导入元数据
    fn record_ingestion_metadata(&self, metadata: &IngestionMetadata) -> IngestResult<()>;
}

// ==========================================
// Validator Trait
// ==========================================
// 用途: 落库前校验（可选）
// 说明: 导入核心只读取计数字段与 passed 标记
pub trait Validator: Send + Sync {
    fn validate(&self, dataset: &RawDataset) -> ValidationSummary;
}

// ==========================================
// FileIngestor Trait
// ==========================================
// 用途: 单文件导入（批量协调器按任务调用）
// 实现者: SingleFileIngestor
pub trait FileIngestor: Send + Sync {
    /// 导入单个文件
    ///
    /// # 返回
    /// - Ok(IngestionResult): 任意终态（success / skipped / validation_failed / failed）
    /// - Err: 文件级错误（由批量协调器决定是否重试）
    fn ingest(&self, job: &IngestionJob) -> IngestResult<IngestionResult>;
}
