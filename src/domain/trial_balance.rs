// ==========================================
// 试算平衡表导入系统 - 试算平衡表领域模型
// ==========================================
// 职责: 原始数据集、落库行、数据画像、表头校验结果
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ==========================================
// RawDataset - 解析后的原始数据集
// ==========================================
// 用途: CSV 解析产物，列顺序与文件表头一致
// 约束: records 中每一行的 key 均来自 columns
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDataset {
    pub columns: Vec<String>,                      // 表头（保持文件顺序）
    pub records: Vec<HashMap<String, String>>,     // 行记录（列名 -> 已 TRIM 的原始值）
}

impl RawDataset {
    pub fn new(columns: Vec<String>, records: Vec<HashMap<String, String>>) -> Self {
        Self { columns, records }
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// 按列取值（缺列或单元格缺失时返回 None）
    pub fn value<'a>(&'a self, row: usize, column: &str) -> Option<&'a str> {
        self.records
            .get(row)
            .and_then(|r| r.get(column))
            .map(|v| v.as_str())
    }
}

// ==========================================
// TrialBalanceRow - 落库行
// ==========================================
// 对齐: trial_balance 表
// 业务主键: (entity, period, account_code)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    pub row_number: usize,              // 原始文件行号（从 1 开始，不含表头）
    pub account_code: String,           // 科目代码（统一为字符串）
    pub account_name: Option<String>,   // 科目名称
    pub balance: f64,                   // 余额（统一为 f64）
    pub entity: Option<String>,         // 文件内主体
    pub company_code: Option<String>,   // 公司代码
    pub period: Option<String>,         // 文件内期间
    pub bs_pl: Option<String>,          // 资产负债表/损益表标记
    pub status: Option<String>,         // 科目状态
    pub department: Option<String>,     // 部门（可选列，缺省为空）
    pub criticality: String,            // 重要性（可选列，缺省 medium）
    pub review_status: String,          // 复核状态（可选列，缺省 pending）
}

// ==========================================
// BalanceStats - 余额统计
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceStats {
    pub sum: f64,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

// ==========================================
// DataProfile - 数据画像
// ==========================================
// 用途: 每次导入尝试计算一次，纯派生，不可变
// 说明: 使用 BTreeMap 保证序列化输出顺序稳定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataProfile {
    pub row_count: usize,
    pub column_count: usize,
    pub column_names: Vec<String>,
    pub data_types: BTreeMap<String, String>,
    pub null_percentage_by_column: BTreeMap<String, f64>,
    pub balance_stats: Option<BalanceStats>,           // 无 balance 列时为 None
    pub zero_balance_count: usize,
    pub zero_balance_percentage: f64,
    pub unique_counts_by_categorical_column: BTreeMap<String, usize>,
}

// ==========================================
// SchemaValidationResult - 表头校验结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaValidationResult {
    pub is_valid: bool,
    pub missing_required_columns: Vec<String>,
    pub extra_columns: Vec<String>,
    pub present_optional_columns: Vec<String>,
}
