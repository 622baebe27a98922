// ==========================================
// 试算平衡表导入系统 - 试算平衡表数据仓储
// ==========================================
// 依据: trial_balance 表，主键 (entity, period, account_code)
// 红线: Repository 不含业务逻辑，只做数据映射
// ==========================================

use crate::db::SharedConnection;
use crate::domain::{TrialBalanceRow, UpsertSummary};
use crate::importer::error::IngestResult;
use crate::importer::ingest_traits::PersistenceSink;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

// ==========================================
// TrialBalanceRepository
// ==========================================
pub struct TrialBalanceRepository {
    conn: SharedConnection,
}

impl TrialBalanceRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 事务内逐行 upsert
    ///
    /// # 说明
    /// - 先查存在性区分 inserted / updated
    /// - 单行失败计入 failed 并继续
    /// - 整个批次一次提交
    pub fn upsert_batch(
        &self,
        rows: &[TrialBalanceRow],
        entity: &str,
        period: &str,
    ) -> RepositoryResult<UpsertSummary> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut summary = UpsertSummary::default();
        let updated_at = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

        {
            let mut exists_stmt = tx.prepare(
                "SELECT 1 FROM trial_balance WHERE entity = ?1 AND period = ?2 AND account_code = ?3",
            )?;
            let mut upsert_stmt = tx.prepare(
                r#"
                INSERT INTO trial_balance (
                    entity, period, account_code, account_name, balance,
                    company_code, bs_pl, status, department, criticality,
                    review_status, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ON CONFLICT(entity, period, account_code) DO UPDATE SET
                    account_name = excluded.account_name,
                    balance = excluded.balance,
                    company_code = excluded.company_code,
                    bs_pl = excluded.bs_pl,
                    status = excluded.status,
                    department = excluded.department,
                    criticality = excluded.criticality,
                    review_status = excluded.review_status,
                    updated_at = excluded.updated_at
                "#,
            )?;

            for row in rows {
                let existed = match exists_stmt
                    .query_row(params![entity, period, row.account_code], |_| Ok(()))
                    .optional()
                {
                    Ok(found) => found.is_some(),
                    Err(e) => {
                        warn!(row = row.row_number, error = %e, "存在性查询失败");
                        summary.failed += 1;
                        continue;
                    }
                };

                let result = upsert_stmt.execute(params![
                    entity,
                    period,
                    row.account_code,
                    row.account_name,
                    row.balance,
                    row.company_code,
                    row.bs_pl,
                    row.status,
                    row.department,
                    row.criticality,
                    row.review_status,
                    updated_at,
                ]);

                match result {
                    Ok(_) if existed => summary.updated += 1,
                    Ok(_) => summary.inserted += 1,
                    Err(e) => {
                        warn!(row = row.row_number, account_code = %row.account_code, error = %e, "行写入失败");
                        summary.failed += 1;
                    }
                }
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(summary)
    }

    /// 指定 (entity, period) 的落库行数
    pub fn persisted_row_count(&self, entity: &str, period: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM trial_balance WHERE entity = ?1 AND period = ?2",
            params![entity, period],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 按科目代码查询余额
    pub fn find_balance(
        &self,
        entity: &str,
        period: &str,
        account_code: &str,
    ) -> RepositoryResult<Option<f64>> {
        let conn = self.get_conn()?;
        let balance = conn
            .query_row(
                "SELECT balance FROM trial_balance WHERE entity = ?1 AND period = ?2 AND account_code = ?3",
                params![entity, period, account_code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(balance)
    }
}

impl PersistenceSink for TrialBalanceRepository {
    fn upsert_rows(
        &self,
        rows: &[TrialBalanceRow],
        entity: &str,
        period: &str,
    ) -> IngestResult<UpsertSummary> {
        Ok(self.upsert_batch(rows, entity, period)?)
    }
}
