// ==========================================
// 试算平衡表导入系统 - 数据清洗器实现
// ==========================================
// 职责: NULL 标准化 / 单元格类型推断 / 数值与科目代码规整
// ==========================================

use serde::{Deserialize, Serialize};

/// 视为缺失值的单元格内容（TRIM 之后比较）
pub const NULL_TOKENS: [&str; 8] = ["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

// ==========================================
// CellType - 单元格推断类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CellType {
    Boolean,
    Integer,
    Float,
    String,
}

impl CellType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellType::Boolean => "boolean",
            CellType::Integer => "integer",
            CellType::Float => "float",
            CellType::String => "string",
        }
    }

    /// 合并同一列中两个单元格的类型
    ///
    /// integer + float → float，其余不同类型 → string
    pub fn merge(self, other: CellType) -> CellType {
        match (self, other) {
            (a, b) if a == b => a,
            (CellType::Integer, CellType::Float) | (CellType::Float, CellType::Integer) => {
                CellType::Float
            }
            _ => CellType::String,
        }
    }
}

pub struct DataCleaner;

impl DataCleaner {
    /// 是否为缺失值
    pub fn is_null(&self, value: &str) -> bool {
        let trimmed = value.trim();
        NULL_TOKENS.iter().any(|t| *t == trimmed)
    }

    /// 标准化 NULL 值（空白/缺失标记 → None）
    pub fn normalize_null(&self, value: Option<&str>) -> Option<String> {
        value.and_then(|v| {
            if self.is_null(v) {
                None
            } else {
                Some(v.trim().to_string())
            }
        })
    }

    /// 推断单个非空单元格的类型
    pub fn infer_cell_type(&self, value: &str) -> CellType {
        let trimmed = value.trim();
        if trimmed.parse::<i64>().is_ok() {
            return CellType::Integer;
        }
        if self.parse_f64(trimmed).is_some() {
            return CellType::Float;
        }
        match trimmed.to_lowercase().as_str() {
            "true" | "false" => CellType::Boolean,
            _ => CellType::String,
        }
    }

    /// 解析有限浮点数（inf / NaN 视为无法解析）
    pub fn parse_f64(&self, value: &str) -> Option<f64> {
        value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }

    /// 规整科目代码
    ///
    /// 形如 "1000.0" 的整数值还原为 "1000"，其余原样 TRIM
    pub fn normalize_account_code(&self, value: &str) -> String {
        let trimmed = value.trim();
        if let Some(integer_part) = trimmed.strip_suffix(".0") {
            if !integer_part.is_empty() && integer_part.chars().all(|c| c.is_ascii_digit()) {
                return integer_part.to_string();
            }
        }
        trimmed.to_string()
    }
}
