// ==========================================
// 试算平衡表导入系统 - 数据质量校验器实现
// ==========================================
// 职责: 内置的试算平衡表校验规则（可被其他 Validator 实现替换）
// 级别: Critical 阻断（配合 fail_on_validation_error），Warning 仅记录
// ==========================================

use crate::domain::{RawDataset, ValidationSummary};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::ingest_traits::Validator;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 合法的报表归属标记
pub const BS_PL_VALUES: [&str; 2] = ["BS", "PL"];

// ==========================================
// IssueLevel - 违规级别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueLevel {
    Critical, // 严重（可阻断导入）
    Warning,  // 警告（允许导入）
}

// ==========================================
// ValidationIssue - 违规记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub row_number: usize,
    pub account_code: Option<String>,
    pub level: IssueLevel,
    pub field: String,
    pub message: String,
}

// ==========================================
// ValidationReport - 明细 + 计数
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total_checks: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn summary(&self) -> ValidationSummary {
        let critical_failures = self
            .issues
            .iter()
            .filter(|i| i.level == IssueLevel::Critical)
            .count();
        ValidationSummary {
            total_checks: self.total_checks,
            failed_checks: self.issues.len(),
            critical_failures,
            passed: self.issues.is_empty(),
        }
    }
}

pub struct TrialBalanceValidator {
    cleaner: DataCleaner,
}

impl Default for TrialBalanceValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl TrialBalanceValidator {
    pub fn new() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }

    /// 逐行执行全部规则
    pub fn validate_detailed(&self, dataset: &RawDataset) -> ValidationReport {
        let mut report = ValidationReport::default();
        let check_bs_pl = dataset.has_column("bs_pl");
        let mut first_occurrence: HashMap<String, usize> = HashMap::new();

        for (idx, record) in dataset.records.iter().enumerate() {
            let row_number = idx + 1;
            let account_code = self
                .cleaner
                .normalize_null(record.get("account_code").map(|v| v.as_str()))
                .map(|v| self.cleaner.normalize_account_code(&v));

            // 规则 1: 科目代码非空
            report.total_checks += 1;
            match &account_code {
                None => report.issues.push(ValidationIssue {
                    row_number,
                    account_code: None,
                    level: IssueLevel::Critical,
                    field: "account_code".to_string(),
                    message: "科目代码为空".to_string(),
                }),
                Some(code) => {
                    // 规则 2: 同一文件内科目代码唯一
                    report.total_checks += 1;
                    if let Some(first_row) = first_occurrence.get(code) {
                        report.issues.push(ValidationIssue {
                            row_number,
                            account_code: Some(code.clone()),
                            level: IssueLevel::Critical,
                            field: "account_code".to_string(),
                            message: format!("科目代码重复，首次出现于第 {} 行", first_row),
                        });
                    } else {
                        first_occurrence.insert(code.clone(), row_number);
                    }
                }
            }

            // 规则 3: 余额为数值
            report.total_checks += 1;
            let balance = self
                .cleaner
                .normalize_null(record.get("balance").map(|v| v.as_str()));
            let balance_ok = balance
                .as_deref()
                .and_then(|b| self.cleaner.parse_f64(b))
                .is_some();
            if !balance_ok {
                report.issues.push(ValidationIssue {
                    row_number,
                    account_code: account_code.clone(),
                    level: IssueLevel::Critical,
                    field: "balance".to_string(),
                    message: format!("余额不是数值: {}", balance.unwrap_or_default()),
                });
            }

            // 规则 4: 科目名称非空
            report.total_checks += 1;
            if self
                .cleaner
                .normalize_null(record.get("account_name").map(|v| v.as_str()))
                .is_none()
            {
                report.issues.push(ValidationIssue {
                    row_number,
                    account_code: account_code.clone(),
                    level: IssueLevel::Warning,
                    field: "account_name".to_string(),
                    message: "科目名称为空".to_string(),
                });
            }

            // 规则 5: bs_pl ∈ {BS, PL}
            if check_bs_pl {
                report.total_checks += 1;
                let bs_pl = self
                    .cleaner
                    .normalize_null(record.get("bs_pl").map(|v| v.as_str()))
                    .map(|v| v.to_uppercase());
                let known = bs_pl
                    .as_deref()
                    .map(|v| BS_PL_VALUES.contains(&v))
                    .unwrap_or(false);
                if !known {
                    report.issues.push(ValidationIssue {
                        row_number,
                        account_code: account_code.clone(),
                        level: IssueLevel::Warning,
                        field: "bs_pl".to_string(),
                        message: format!("未知的报表归属: {}", bs_pl.unwrap_or_default()),
                    });
                }
            }
        }

        report
    }
}

impl Validator for TrialBalanceValidator {
    fn validate(&self, dataset: &RawDataset) -> ValidationSummary {
        self.validate_detailed(dataset).summary()
    }
}
