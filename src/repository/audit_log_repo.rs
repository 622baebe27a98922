// ==========================================
// 试算平衡表导入系统 - 审计日志数据仓储
// ==========================================
// 依据: audit_log 表 + ingestion_metadata 表
// 红线: 审计事件只追加，不提供更新/删除
// ==========================================

use crate::db::SharedConnection;
use crate::domain::{AuditEvent, AuditEventType, IngestionMetadata};
use crate::importer::error::IngestResult;
use crate::importer::ingest_traits::AuditSink;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};

// ==========================================
// AuditLogRepository
// ==========================================
pub struct AuditLogRepository {
    conn: SharedConnection,
}

impl AuditLogRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    pub fn insert_event(&self, event: &AuditEvent) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO audit_log (
                event_id, event_type, entity, period, gl_code,
                fingerprint, actor, details, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                event.event_id,
                event.event_type.as_str(),
                event.entity,
                event.period,
                event.gl_code,
                event.fingerprint,
                event.actor,
                event.details.as_ref().map(|v| v.to_string()),
                event.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;

        Ok(())
    }

    pub fn insert_metadata(&self, metadata: &IngestionMetadata) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO ingestion_metadata (
                ingestion_id, entity, period, row_count, column_count,
                fingerprint, file_path, status, ingested_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                metadata.ingestion_id,
                metadata.entity,
                metadata.period,
                metadata.row_count as i64,
                metadata.column_count as i64,
                metadata.fingerprint,
                metadata.file_path,
                metadata.status,
                metadata.ingested_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;

        Ok(())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 是否存在该指纹的成功导入事件
    pub fn has_ingested_fingerprint(&self, fingerprint: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM audit_log WHERE event_type = ?1 AND fingerprint = ?2",
            params![AuditEventType::FileIngested.as_str(), fingerprint],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// 按指纹查询全部审计事件（按时间升序）
    pub fn events_by_fingerprint(&self, fingerprint: &str) -> RepositoryResult<Vec<AuditEvent>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT event_id, event_type, entity, period, gl_code,
                   fingerprint, actor, details, created_at
            FROM audit_log
            WHERE fingerprint = ?1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )?;

        let raw = stmt
            .query_map(params![fingerprint], map_event_row)?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter().map(RawEvent::into_event).collect()
    }

    /// 指定 (entity, period) 的导入元数据（最新在前）
    pub fn list_ingestions(
        &self,
        entity: &str,
        period: &str,
    ) -> RepositoryResult<Vec<IngestionMetadata>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT ingestion_id, entity, period, row_count, column_count,
                   fingerprint, file_path, status, ingested_at
            FROM ingestion_metadata
            WHERE entity = ?1 AND period = ?2
            ORDER BY ingested_at DESC, rowid DESC
            "#,
        )?;

        let rows = stmt
            .query_map(params![entity, period], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(ingestion_id, entity, period, row_count, column_count, fingerprint, file_path, status, ts)|
                 -> RepositoryResult<IngestionMetadata> {
                    Ok(IngestionMetadata {
                        ingestion_id,
                        entity,
                        period,
                        row_count: row_count.max(0) as usize,
                        column_count: column_count.max(0) as usize,
                        fingerprint,
                        file_path,
                        status,
                        ingested_at: parse_timestamp("ingested_at", &ts)?,
                    })
                },
            )
            .collect()
    }
}

// ==========================================
// 行映射
// ==========================================

struct RawEvent {
    event_id: String,
    event_type: String,
    entity: String,
    period: String,
    gl_code: Option<String>,
    fingerprint: Option<String>,
    actor: String,
    details: Option<String>,
    created_at: String,
}

fn map_event_row(row: &Row<'_>) -> rusqlite::Result<RawEvent> {
    Ok(RawEvent {
        event_id: row.get(0)?,
        event_type: row.get(1)?,
        entity: row.get(2)?,
        period: row.get(3)?,
        gl_code: row.get(4)?,
        fingerprint: row.get(5)?,
        actor: row.get(6)?,
        details: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl RawEvent {
    fn into_event(self) -> RepositoryResult<AuditEvent> {
        let event_type =
            AuditEventType::parse(&self.event_type).ok_or_else(|| RepositoryError::FieldValueError {
                field: "event_type".to_string(),
                message: format!("未知事件类型: {}", self.event_type),
            })?;

        let details = match self.details {
            Some(text) => Some(serde_json::from_str(&text)?),
            None => None,
        };

        Ok(AuditEvent {
            event_id: self.event_id,
            event_type,
            entity: self.entity,
            period: self.period,
            gl_code: self.gl_code,
            fingerprint: self.fingerprint,
            actor: self.actor,
            details,
            timestamp: parse_timestamp("created_at", &self.created_at)?,
        })
    }
}

fn parse_timestamp(field: &str, raw: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::FieldValueError {
            field: field.to_string(),
            message: e.to_string(),
        })
}

impl AuditSink for AuditLogRepository {
    fn log_event(&self, event: &AuditEvent) -> IngestResult<()> {
        Ok(self.insert_event(event)?)
    }

    fn find_duplicate_fingerprint(&self, fingerprint: &str) -> IngestResult<bool> {
        Ok(self.has_ingested_fingerprint(fingerprint)?)
    }

    fn record_ingestion_metadata(&self, metadata: &IngestionMetadata) -> IngestResult<()> {
        Ok(self.insert_metadata(metadata)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_shared_in_memory;
    use serde_json::json;

    fn event(event_type: AuditEventType, fingerprint: &str) -> AuditEvent {
        AuditEvent::new(
            event_type,
            "ABEX",
            "2022-06",
            Some(fingerprint),
            "tester",
            Some(json!({"rows": 3})),
        )
    }

    #[test]
    fn test_duplicate_only_counts_file_ingested() {
        let repo = AuditLogRepository::new(open_shared_in_memory().unwrap());

        repo.log_event(&event(AuditEventType::IngestionFailed, "abc")).unwrap();
        assert!(!repo.find_duplicate_fingerprint("abc").unwrap());

        repo.log_event(&event(AuditEventType::FileIngested, "abc")).unwrap();
        assert!(repo.find_duplicate_fingerprint("abc").unwrap());
        assert!(!repo.find_duplicate_fingerprint("other").unwrap());
    }

    #[test]
    fn test_events_by_fingerprint_round_trip() {
        let repo = AuditLogRepository::new(open_shared_in_memory().unwrap());
        let original = event(AuditEventType::DuplicateSkipped, "fp1");
        repo.log_event(&original).unwrap();

        let events = repo.events_by_fingerprint("fp1").unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, original.event_id);
        assert_eq!(events[0].event_type, AuditEventType::DuplicateSkipped);
        assert_eq!(events[0].actor, "tester");
        assert_eq!(events[0].details, Some(json!({"rows": 3})));
    }

    #[test]
    fn test_list_ingestions() {
        let repo = AuditLogRepository::new(open_shared_in_memory().unwrap());
        let metadata = IngestionMetadata {
            ingestion_id: "ing-1".to_string(),
            entity: "ABEX".to_string(),
            period: "2022-06".to_string(),
            row_count: 501,
            column_count: 8,
            fingerprint: "fp".to_string(),
            file_path: "/tmp/tb.csv".to_string(),
            status: "success".to_string(),
            ingested_at: Utc::now(),
        };
        repo.record_ingestion_metadata(&metadata).unwrap();

        let listed = repo.list_ingestions("ABEX", "2022-06").unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].row_count, 501);
        assert!(repo.list_ingestions("ABEX", "2022-07").unwrap().is_empty());
    }
}
