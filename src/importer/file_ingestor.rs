// ==========================================
// 试算平衡表导入系统 - 单文件导入器实现
// ==========================================
// 职责: 整合单个文件的导入流程，从文件到数据库
// 流程: 指纹 → 查重 → 解析 → 画像 → (校验) → 映射 → 落库 → 审计
// 约束: 本组件不做重试；文件级错误以 Err 返回，由批量协调器决定是否重试
// ==========================================

use crate::config::IngestionConfig;
use crate::domain::{
    AuditEvent, AuditEventType, IngestionJob, IngestionMetadata, IngestionResult,
    IngestionStatus,
};
use crate::importer::error::{IngestError, IngestResult};
use crate::importer::file_parser::CsvParser;
use crate::importer::fingerprint::Fingerprinter;
use crate::importer::ingest_traits::{
    AuditSink, FileIngestor, FileParser, PersistenceSink, Validator,
};
use crate::importer::profiler::DataProfiler;
use crate::importer::schema_mapper::SchemaMapper;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// SingleFileIngestor - 单文件导入器
// ==========================================
pub struct SingleFileIngestor {
    // 外部协作方
    persistence: Arc<dyn PersistenceSink>,
    audit: Arc<dyn AuditSink>,
    validator: Option<Arc<dyn Validator>>,

    // 导入参数
    config: IngestionConfig,

    // 导入组件
    file_parser: Box<dyn FileParser>,
    fingerprinter: Fingerprinter,
    profiler: DataProfiler,
    schema_mapper: SchemaMapper,
}

impl SingleFileIngestor {
    /// 创建新的单文件导入器（默认使用 CsvParser）
    ///
    /// # 参数
    /// - persistence: 落库协作方
    /// - audit: 审计协作方（同时用于指纹查重）
    /// - validator: 可选校验器，仅在任务要求校验时调用
    /// - config: 导入参数
    pub fn new(
        persistence: Arc<dyn PersistenceSink>,
        audit: Arc<dyn AuditSink>,
        validator: Option<Arc<dyn Validator>>,
        config: IngestionConfig,
    ) -> Self {
        let fingerprinter = Fingerprinter::new(audit.clone(), config.fingerprint_chunk_size);
        let profiler = DataProfiler::new(config.zero_balance_epsilon);
        let schema_mapper = SchemaMapper::new(
            config.required_columns.clone(),
            config.optional_column_defaults.clone(),
        );

        Self {
            persistence,
            audit,
            validator,
            config,
            file_parser: Box::new(CsvParser),
            fingerprinter,
            profiler,
            schema_mapper,
        }
    }

    /// 替换文件解析器
    pub fn with_parser(mut self, file_parser: Box<dyn FileParser>) -> Self {
        self.file_parser = file_parser;
        self
    }

    /// 写审计事件
    fn audit_event(
        &self,
        job: &IngestionJob,
        event_type: AuditEventType,
        fingerprint: Option<&str>,
        details: serde_json::Value,
    ) -> IngestResult<()> {
        let event = AuditEvent::new(
            event_type,
            &job.entity,
            &job.period,
            fingerprint,
            &self.config.actor,
            Some(details),
        );
        self.audit.log_event(&event)
    }

    /// 失败路径上的审计写入，写入失败只记日志
    fn audit_failure(
        &self,
        job: &IngestionJob,
        event_type: AuditEventType,
        fingerprint: Option<&str>,
        details: serde_json::Value,
    ) {
        if let Err(e) = self.audit_event(job, event_type, fingerprint, details) {
            warn!(entity = %job.entity, period = %job.period, error = %e, "审计事件写入失败");
        }
    }

    /// 文件级错误：记录 ingestion_failed 后原样返回
    fn abort(&self, job: &IngestionJob, fingerprint: Option<&str>, err: IngestError) -> IngestError {
        error!(
            entity = %job.entity,
            period = %job.period,
            file = %job.file_path.display(),
            error = %err,
            "文件导入失败"
        );
        self.audit_failure(
            job,
            AuditEventType::IngestionFailed,
            fingerprint,
            json!({
                "file_path": job.file_path.display().to_string(),
                "error": err.to_string(),
            }),
        );
        err
    }

    fn run(&self, job: &IngestionJob) -> IngestResult<IngestionResult> {
        let start_time = Instant::now();
        let file_path_str = job.file_path.display().to_string();

        // 步骤 1: 指纹
        debug!("步骤 1: 计算文件指纹");
        let fingerprint = self
            .fingerprinter
            .generate_fingerprint(&job.file_path)
            .map_err(|e| self.abort(job, None, e))?;

        // 步骤 2: 查重（skip_duplicates 为 true 时强制重新导入）
        if !job.skip_duplicates {
            let duplicate = self
                .fingerprinter
                .check_duplicate(&fingerprint)
                .map_err(|e| self.abort(job, Some(fingerprint.as_str()), e))?;

            if duplicate {
                info!(fingerprint = %fingerprint, "文件内容已导入过，跳过");
                self.audit_failure(
                    job,
                    AuditEventType::DuplicateSkipped,
                    Some(fingerprint.as_str()),
                    json!({ "file_path": file_path_str }),
                );

                let mut result = IngestionResult::empty(job, IngestionStatus::Skipped);
                result.fingerprint = Some(fingerprint.clone());
                result.error = Some(IngestError::DuplicateFile(fingerprint).to_string());
                result.duration_seconds = start_time.elapsed().as_secs_f64();
                return Ok(result);
            }
        } else {
            debug!(fingerprint = %fingerprint, "强制重新导入，跳过查重");
        }

        // 步骤 3: 解析
        debug!("步骤 3: 解析文件");
        let dataset = self
            .file_parser
            .parse(&job.file_path)
            .map_err(|e| self.abort(job, Some(fingerprint.as_str()), e))?;
        info!(
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            "文件解析完成"
        );

        // 步骤 4: 画像
        debug!("步骤 4: 数据画像");
        let profile = self.profiler.profile(&dataset);

        let mut result = IngestionResult::empty(job, IngestionStatus::Failed);
        result.fingerprint = Some(fingerprint.clone());

        // 步骤 5: 校验（可选）
        if job.validate_before_insert {
            match &self.validator {
                Some(validator) => {
                    debug!("步骤 5: 落库前校验");
                    let summary = validator.validate(&dataset);
                    info!(
                        total_checks = summary.total_checks,
                        failed_checks = summary.failed_checks,
                        critical_failures = summary.critical_failures,
                        passed = summary.passed,
                        "校验完成"
                    );
                    result.validation = Some(summary);

                    if self.config.fail_on_validation_error && summary.critical_failures > 0 {
                        let err = IngestError::ValidationGateFailure {
                            critical_failures: summary.critical_failures,
                        };
                        warn!(error = %err, "校验闸门拦截，不落库");
                        self.audit_failure(
                            job,
                            AuditEventType::ValidationFailed,
                            Some(fingerprint.as_str()),
                            json!({
                                "total_checks": summary.total_checks,
                                "failed_checks": summary.failed_checks,
                                "critical_failures": summary.critical_failures,
                            }),
                        );

                        result.status = IngestionStatus::ValidationFailed;
                        result.error = Some(err.to_string());
                        result.profile = Some(profile);
                        result.duration_seconds = start_time.elapsed().as_secs_f64();
                        return Ok(result);
                    }
                }
                None => warn!("任务要求校验但未配置校验器，跳过校验"),
            }
        }

        // 步骤 6: 表头校验 + 映射
        debug!("步骤 6: 映射为落库结构");
        let schema = self.schema_mapper.validate_schema(&dataset);
        if !schema.extra_columns.is_empty() {
            debug!(extra = ?schema.extra_columns, "存在未知列，忽略");
        }
        let mapping = self.schema_mapper.map_to_storage_schema(&dataset);
        for row_error in &mapping.row_errors {
            warn!(error = %row_error, "行映射失败");
        }

        if !schema.is_valid {
            // 缺少必需列时不落库，所有行计入 failed
            let err = IngestError::SchemaValidation {
                missing: schema.missing_required_columns.clone(),
            };
            warn!(error = %err, mapped = mapping.rows.len(), "表头缺少必需列，不落库");
            self.audit_failure(
                job,
                AuditEventType::IngestionFailed,
                Some(fingerprint.as_str()),
                json!({
                    "file_path": file_path_str,
                    "missing_required_columns": schema.missing_required_columns,
                }),
            );

            result.failed = dataset.row_count();
            result.error = Some(err.to_string());
            result.profile = Some(profile);
            result.duration_seconds = start_time.elapsed().as_secs_f64();
            return Ok(result);
        }

        // 步骤 7: 落库
        debug!("步骤 7: 批量 upsert");
        let upsert = self
            .persistence
            .upsert_rows(&mapping.rows, &job.entity, &job.period)
            .map_err(|e| self.abort(job, Some(fingerprint.as_str()), e))?;

        result.inserted = upsert.inserted;
        result.updated = upsert.updated;
        result.failed = upsert.failed + mapping.failed_rows();
        info!(
            inserted = result.inserted,
            updated = result.updated,
            failed = result.failed,
            "落库完成"
        );

        // 步骤 8: 审计 + 元数据
        debug!("步骤 8: 写审计与元数据");
        let details = json!({
            "file_path": file_path_str,
            "row_count": dataset.row_count(),
            "inserted": result.inserted,
            "updated": result.updated,
            "failed": result.failed,
        });

        if result.failed == 0 {
            result.status = IngestionStatus::Success;
            self.audit_event(job, AuditEventType::FileIngested, Some(fingerprint.as_str()), details)?;
        } else {
            result.error = Some(format!("{} 行导入失败", result.failed));
            self.audit_failure(job, AuditEventType::IngestionFailed, Some(fingerprint.as_str()), details);
        }

        self.audit.record_ingestion_metadata(&IngestionMetadata {
            ingestion_id: Uuid::new_v4().to_string(),
            entity: job.entity.clone(),
            period: job.period.clone(),
            row_count: dataset.row_count(),
            column_count: dataset.column_count(),
            fingerprint,
            file_path: file_path_str,
            status: result.status.as_str().to_string(),
            ingested_at: Utc::now(),
        })?;

        result.profile = Some(profile);
        result.duration_seconds = start_time.elapsed().as_secs_f64();

        info!(
            status = %result.status,
            duration_seconds = result.duration_seconds,
            "文件导入结束"
        );

        Ok(result)
    }
}

impl FileIngestor for SingleFileIngestor {
    #[instrument(skip(self, job), fields(entity = %job.entity, period = %job.period, file = %job.file_path.display()))]
    fn ingest(&self, job: &IngestionJob) -> IngestResult<IngestionResult> {
        info!("开始导入文件");
        self.run(job)
    }
}
