// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、临时 CSV 文件、固定样例路径
// ==========================================

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use tb_ingest::{IngestionApi, IngestionConfig};
use tempfile::{Builder, NamedTempFile, TempDir};

/// 必需列表头
pub const HEADER: &str = "account_code,account_name,balance,entity,company_code,period,bs_pl,status";

/// 501 行的 ABEX / 2022-06 样例
pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("trial_balance_cleaned.csv")
}

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - TempDir: 临时目录（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> (TempDir, String) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("tb_ingest_test.db");
    let db_path = db_path.to_str().expect("non-utf8 temp path").to_string();
    tb_ingest::db::open_shared(&db_path).expect("Failed to init schema");
    (dir, db_path)
}

/// 基于临时文件数据库创建 API（测试用快速退避）
pub fn create_test_api(db_path: &str) -> IngestionApi {
    let conn = tb_ingest::db::open_shared(db_path).expect("Failed to open db");
    let config = IngestionConfig {
        backoff_base_secs: 0.01,
        ..IngestionConfig::default()
    };
    IngestionApi::from_connection(conn, config)
}

/// 写入临时 CSV 文件
pub fn write_csv(lines: &[String]) -> NamedTempFile {
    let mut file = Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("Failed to create temp csv");
    for line in lines {
        writeln!(file, "{}", line).expect("Failed to write csv");
    }
    file
}

/// 生成 n 行合法数据（科目代码以 code_base 起始）
pub fn trial_balance_lines(entity: &str, period: &str, code_base: usize, n: usize) -> Vec<String> {
    let mut lines = vec![HEADER.to_string()];
    for i in 0..n {
        lines.push(format!(
            "{},Account {},{}.25,{},AB01,{},BS,active",
            code_base + i,
            i,
            i * 10,
            entity,
            period
        ));
    }
    lines
}
