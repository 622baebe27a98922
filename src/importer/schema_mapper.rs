// ==========================================
// 试算平衡表导入系统 - 字段映射器实现
// ==========================================
// 职责: 必需列校验 + 原始行 → 落库行（可选列补默认值、类型统一）
// 约束: 不修改调用方数据；单行转换失败只记录，不阻断其余行
// ==========================================

use crate::domain::{RawDataset, SchemaValidationResult, TrialBalanceRow};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::IngestError;
use std::collections::{BTreeMap, HashMap};

/// 必需列
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "account_code",
    "account_name",
    "balance",
    "entity",
    "company_code",
    "period",
    "bs_pl",
    "status",
];

/// 可选列及其默认值（None 表示空值）
pub fn default_optional_columns() -> BTreeMap<String, Option<String>> {
    let mut defaults = BTreeMap::new();
    defaults.insert("department".to_string(), None);
    defaults.insert("criticality".to_string(), Some("medium".to_string()));
    defaults.insert("review_status".to_string(), Some("pending".to_string()));
    defaults
}

// ==========================================
// MappingOutcome - 映射结果
// ==========================================
#[derive(Debug, Default)]
pub struct MappingOutcome {
    pub rows: Vec<TrialBalanceRow>,     // 映射成功的行
    pub row_errors: Vec<IngestError>,   // 行级 TypeCoercion 错误
}

impl MappingOutcome {
    pub fn failed_rows(&self) -> usize {
        self.row_errors.len()
    }
}

// ==========================================
// SchemaMapper
// ==========================================
pub struct SchemaMapper {
    required_columns: Vec<String>,
    optional_defaults: BTreeMap<String, Option<String>>,
    cleaner: DataCleaner,
}

impl Default for SchemaMapper {
    fn default() -> Self {
        Self::new(
            REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            default_optional_columns(),
        )
    }
}

impl SchemaMapper {
    pub fn new(
        required_columns: Vec<String>,
        optional_defaults: BTreeMap<String, Option<String>>,
    ) -> Self {
        Self {
            required_columns,
            optional_defaults,
            cleaner: DataCleaner,
        }
    }

    /// 表头校验
    ///
    /// 缺少必需列 → is_valid = false；未知列只报告，不阻断
    pub fn validate_schema(&self, dataset: &RawDataset) -> SchemaValidationResult {
        let missing_required_columns: Vec<String> = self
            .required_columns
            .iter()
            .filter(|c| !dataset.has_column(c))
            .cloned()
            .collect();

        let extra_columns: Vec<String> = dataset
            .columns
            .iter()
            .filter(|c| {
                !self.required_columns.contains(c) && !self.optional_defaults.contains_key(*c)
            })
            .cloned()
            .collect();

        let present_optional_columns: Vec<String> = self
            .optional_defaults
            .keys()
            .filter(|c| dataset.has_column(c))
            .cloned()
            .collect();

        SchemaValidationResult {
            is_valid: missing_required_columns.is_empty(),
            missing_required_columns,
            extra_columns,
            present_optional_columns,
        }
    }

    /// 映射为落库行
    ///
    /// # 返回
    /// - rows: 转换成功的行（新分配，不引用输入）
    /// - row_errors: 每个失败行一条 TypeCoercion 错误
    pub fn map_to_storage_schema(&self, dataset: &RawDataset) -> MappingOutcome {
        let mut outcome = MappingOutcome::default();

        for (idx, record) in dataset.records.iter().enumerate() {
            match self.map_row(record, idx + 1) {
                Ok(row) => outcome.rows.push(row),
                Err(e) => outcome.row_errors.push(e),
            }
        }

        outcome
    }

    fn map_row(
        &self,
        record: &HashMap<String, String>,
        row_number: usize,
    ) -> Result<TrialBalanceRow, IngestError> {
        let account_code = self
            .get_string(record, "account_code")
            .map(|v| self.cleaner.normalize_account_code(&v))
            .ok_or_else(|| IngestError::TypeCoercion {
                row: row_number,
                field: "account_code".to_string(),
                message: "科目代码为空".to_string(),
            })?;

        let balance = self.parse_balance(record, row_number)?;

        Ok(TrialBalanceRow {
            row_number,
            account_code,
            account_name: self.get_string(record, "account_name"),
            balance,
            entity: self.get_string(record, "entity"),
            company_code: self.get_string(record, "company_code"),
            period: self.get_string(record, "period"),
            bs_pl: self.get_string(record, "bs_pl"),
            status: self.get_string(record, "status"),
            department: self.get_or_default(record, "department"),
            criticality: self
                .get_or_default(record, "criticality")
                .unwrap_or_else(|| "medium".to_string()),
            review_status: self
                .get_or_default(record, "review_status")
                .unwrap_or_else(|| "pending".to_string()),
        })
    }

    /// 提取字符串字段（缺列/空值 → None）
    fn get_string(&self, record: &HashMap<String, String>, key: &str) -> Option<String> {
        self.cleaner.normalize_null(record.get(key).map(|v| v.as_str()))
    }

    /// 提取可选列，缺列或空值时取默认值
    fn get_or_default(&self, record: &HashMap<String, String>, key: &str) -> Option<String> {
        self.get_string(record, key)
            .or_else(|| self.optional_defaults.get(key).cloned().flatten())
    }

    /// 余额统一为 f64
    fn parse_balance(
        &self,
        record: &HashMap<String, String>,
        row_number: usize,
    ) -> Result<f64, IngestError> {
        let raw = self
            .get_string(record, "balance")
            .ok_or_else(|| IngestError::TypeCoercion {
                row: row_number,
                field: "balance".to_string(),
                message: "余额为空".to_string(),
            })?;

        self.cleaner
            .parse_f64(&raw)
            .ok_or_else(|| IngestError::TypeCoercion {
                row: row_number,
                field: "balance".to_string(),
                message: format!("无法解析为浮点数: {}", raw),
            })
    }
}
