// ==========================================
// 试算平衡表导入系统 - 数据画像
// ==========================================
// 职责: 行列统计 / 空值占比 / 类型推断 / 余额统计 / 分类列去重计数
// 约束: 纯函数，无外部调用；同一输入得到同一输出
// ==========================================

use crate::domain::{BalanceStats, DataProfile, RawDataset};
use crate::importer::data_cleaner::{CellType, DataCleaner};
use std::collections::{BTreeMap, HashSet};

/// 统计去重数量的分类列（存在时才统计）
pub const CATEGORICAL_COLUMNS: [&str; 6] =
    ["entity", "company_code", "period", "bs_pl", "status", "department"];

/// 余额列名
pub const BALANCE_COLUMN: &str = "balance";

/// 默认零余额容差
pub const DEFAULT_ZERO_BALANCE_EPSILON: f64 = 0.01;

/// 整列为空时的类型标记
pub const EMPTY_TYPE: &str = "empty";

// ==========================================
// DataProfiler
// ==========================================
pub struct DataProfiler {
    zero_balance_epsilon: f64,
    cleaner: DataCleaner,
}

impl Default for DataProfiler {
    fn default() -> Self {
        Self::new(DEFAULT_ZERO_BALANCE_EPSILON)
    }
}

impl DataProfiler {
    pub fn new(zero_balance_epsilon: f64) -> Self {
        Self {
            zero_balance_epsilon,
            cleaner: DataCleaner,
        }
    }

    /// 计算数据画像
    pub fn profile(&self, dataset: &RawDataset) -> DataProfile {
        let row_count = dataset.row_count();

        let mut data_types = BTreeMap::new();
        let mut null_percentage_by_column = BTreeMap::new();

        for column in &dataset.columns {
            let mut null_count = 0usize;
            let mut column_type: Option<CellType> = None;

            for record in &dataset.records {
                match record.get(column) {
                    Some(value) if !self.cleaner.is_null(value) => {
                        let cell_type = self.cleaner.infer_cell_type(value);
                        column_type = Some(match column_type {
                            Some(existing) => existing.merge(cell_type),
                            None => cell_type,
                        });
                    }
                    _ => null_count += 1,
                }
            }

            null_percentage_by_column.insert(column.clone(), percentage(null_count, row_count));
            data_types.insert(
                column.clone(),
                column_type
                    .map(|t| t.as_str().to_string())
                    .unwrap_or_else(|| EMPTY_TYPE.to_string()),
            );
        }

        let (balance_stats, zero_balance_count) = if dataset.has_column(BALANCE_COLUMN) {
            let balances = self.numeric_balances(dataset);
            let zero_count = balances
                .iter()
                .filter(|b| b.abs() < self.zero_balance_epsilon)
                .count();
            (balance_stats(&balances), zero_count)
        } else {
            (None, 0)
        };

        let mut unique_counts_by_categorical_column = BTreeMap::new();
        for column in CATEGORICAL_COLUMNS {
            if !dataset.has_column(column) {
                continue;
            }
            let distinct: HashSet<&str> = dataset
                .records
                .iter()
                .filter_map(|r| r.get(column))
                .filter(|v| !self.cleaner.is_null(v))
                .map(|v| v.as_str())
                .collect();
            unique_counts_by_categorical_column.insert(column.to_string(), distinct.len());
        }

        DataProfile {
            row_count,
            column_count: dataset.column_count(),
            column_names: dataset.columns.clone(),
            data_types,
            null_percentage_by_column,
            balance_stats,
            zero_balance_count,
            zero_balance_percentage: percentage(zero_balance_count, row_count),
            unique_counts_by_categorical_column,
        }
    }

    /// 可解析为数值的余额（跳过空值与非数值）
    fn numeric_balances(&self, dataset: &RawDataset) -> Vec<f64> {
        dataset
            .records
            .iter()
            .filter_map(|r| r.get(BALANCE_COLUMN))
            .filter(|v| !self.cleaner.is_null(v))
            .filter_map(|v| self.cleaner.parse_f64(v))
            .collect()
    }
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// 余额统计（样本标准差，n < 2 时为 0）
fn balance_stats(values: &[f64]) -> Option<BalanceStats> {
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let sum: f64 = values.iter().sum();
    let mean = sum / n;

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    let stddev = if values.len() < 2 {
        0.0
    } else {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    };

    Some(BalanceStats {
        sum,
        mean,
        median,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        stddev,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn dataset(columns: &[&str], rows: &[&[&str]]) -> RawDataset {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let records = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .zip(row.iter())
                    .map(|(c, v)| (c.clone(), v.to_string()))
                    .collect::<HashMap<_, _>>()
            })
            .collect();
        RawDataset::new(columns, records)
    }

    #[test]
    fn test_profile_basic_counts() {
        let ds = dataset(
            &["account_code", "balance", "entity"],
            &[&["1000", "10", "ABEX"], &["2000", "", "ABEX"], &["3000", "0.004", "ZED"]],
        );

        let profile = DataProfiler::default().profile(&ds);

        assert_eq!(profile.row_count, 3);
        assert_eq!(profile.column_count, 3);
        assert_eq!(profile.column_names, vec!["account_code", "balance", "entity"]);
        assert!((profile.null_percentage_by_column["balance"] - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(profile.null_percentage_by_column["account_code"], 0.0);
        assert_eq!(profile.unique_counts_by_categorical_column["entity"], 2);
        assert!(!profile.unique_counts_by_categorical_column.contains_key("period"));
    }

    #[test]
    fn test_profile_balance_stats() {
        let ds = dataset(&["balance"], &[&["1"], &["2"], &["3"], &["4"]]);

        let stats = DataProfiler::default().profile(&ds).balance_stats.unwrap();

        assert_eq!(stats.sum, 10.0);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.stddev - 1.2909944487358056).abs() < 1e-12);
    }

    #[test]
    fn test_zero_balance_uses_epsilon() {
        let ds = dataset(&["balance"], &[&["0"], &["0.009"], &["-0.005"], &["0.01"], &["5"]]);

        let profile = DataProfiler::default().profile(&ds);

        assert_eq!(profile.zero_balance_count, 3);
        assert_eq!(profile.zero_balance_percentage, 60.0);
    }

    #[test]
    fn test_profile_without_balance_column() {
        let ds = dataset(&["account_code"], &[&["1000"]]);

        let profile = DataProfiler::default().profile(&ds);

        assert!(profile.balance_stats.is_none());
        assert_eq!(profile.zero_balance_count, 0);
        assert_eq!(profile.zero_balance_percentage, 0.0);
    }

    #[test]
    fn test_profile_empty_dataset_percentages_in_range() {
        let ds = dataset(&["account_code", "balance"], &[]);

        let profile = DataProfiler::default().profile(&ds);

        assert_eq!(profile.row_count, 0);
        for pct in profile.null_percentage_by_column.values() {
            assert!((0.0..=100.0).contains(pct));
        }
        assert_eq!(profile.data_types["balance"], EMPTY_TYPE);
        assert!(profile.balance_stats.is_none());
    }

    #[test]
    fn test_profile_data_types() {
        let ds = dataset(
            &["account_code", "balance", "account_name", "active"],
            &[&["1000", "1", "Cash", "true"], &["2000", "2.5", "AP", "false"]],
        );

        let profile = DataProfiler::default().profile(&ds);

        assert_eq!(profile.data_types["account_code"], "integer");
        assert_eq!(profile.data_types["balance"], "float");
        assert_eq!(profile.data_types["account_name"], "string");
        assert_eq!(profile.data_types["active"], "boolean");
    }

    #[test]
    fn test_profile_is_deterministic() {
        let ds = dataset(
            &["balance", "status"],
            &[&["1.5", "active"], &["-3", "inactive"], &["0", "active"]],
        );
        let profiler = DataProfiler::default();
        assert_eq!(profiler.profile(&ds), profiler.profile(&ds));
    }
}
