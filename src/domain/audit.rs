// ==========================================
// 试算平衡表导入系统 - 审计领域模型
// ==========================================
// 红线: 审计事件只追加，不修改
// 用途: 审计追踪 + 文件指纹查重
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// AuditEventType - 审计事件类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    FileIngested,       // 文件导入成功（查重依据）
    DuplicateSkipped,   // 重复文件跳过
    ValidationFailed,   // 校验闸门拦截
    IngestionFailed,    // 导入失败
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::FileIngested => "file_ingested",
            AuditEventType::DuplicateSkipped => "duplicate_skipped",
            AuditEventType::ValidationFailed => "validation_failed",
            AuditEventType::IngestionFailed => "ingestion_failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "file_ingested" => Some(AuditEventType::FileIngested),
            "duplicate_skipped" => Some(AuditEventType::DuplicateSkipped),
            "validation_failed" => Some(AuditEventType::ValidationFailed),
            "ingestion_failed" => Some(AuditEventType::IngestionFailed),
            _ => None,
        }
    }
}

// ==========================================
// AuditEvent - 审计事件
// ==========================================
// 对齐: audit_log 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub event_type: AuditEventType,
    pub entity: String,
    pub period: String,
    pub gl_code: Option<String>,        // 文件级事件为空
    pub fingerprint: Option<String>,
    pub actor: String,
    pub details: Option<JsonValue>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        event_type: AuditEventType,
        entity: &str,
        period: &str,
        fingerprint: Option<&str>,
        actor: &str,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            event_type,
            entity: entity.to_string(),
            period: period.to_string(),
            gl_code: None,
            fingerprint: fingerprint.map(|f| f.to_string()),
            actor: actor.to_string(),
            details,
            timestamp: Utc::now(),
        }
    }
}

// ==========================================
// IngestionMetadata - 导入元数据
// ==========================================
// 对齐: ingestion_metadata 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionMetadata {
    pub ingestion_id: String,
    pub entity: String,
    pub period: String,
    pub row_count: usize,
    pub column_count: usize,
    pub fingerprint: String,
    pub file_path: String,
    pub status: String,
    pub ingested_at: DateTime<Utc>,
}
