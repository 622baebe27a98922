// ==========================================
// 单文件导入端到端测试
// ==========================================
// 测试目标: 样例文件完整导入、重复文件跳过、校验闸门、缺列
// ==========================================

mod test_helpers;

use tb_ingest::domain::AuditEventType;
use tb_ingest::logging;
use tb_ingest::IngestionStatus;
use test_helpers::*;

#[test]
fn test_ingest_cleaned_trial_balance() {
    logging::init_test();
    let (_dir, db_path) = create_test_db();
    let api = create_test_api(&db_path);

    let result = api.ingest_file(&fixture_path(), "ABEX", "2022-06", false, false);

    assert_eq!(result.status, IngestionStatus::Success, "error: {:?}", result.error);
    assert_eq!(result.inserted, 501);
    assert_eq!(result.updated, 0);
    assert_eq!(result.failed, 0);
    assert_eq!(api.persisted_row_count("ABEX", "2022-06").unwrap(), 501);

    let profile = result.profile.expect("profile missing");
    assert_eq!(profile.row_count, 501);
    assert_eq!(profile.column_count, 9);
    assert!(profile.balance_stats.is_some());
    assert!(profile.zero_balance_count > 0);
    assert!((0.0..=100.0).contains(&profile.zero_balance_percentage));
    for pct in profile.null_percentage_by_column.values() {
        assert!((0.0..=100.0).contains(pct));
    }
    assert_eq!(profile.unique_counts_by_categorical_column["entity"], 1);

    let ingestions = api.list_ingestions("ABEX", "2022-06").unwrap();
    assert_eq!(ingestions.len(), 1);
    assert_eq!(ingestions[0].row_count, 501);
    assert_eq!(Some(ingestions[0].fingerprint.clone()), result.fingerprint);
}

#[test]
fn test_duplicate_file_is_skipped_on_second_run() {
    let (_dir, db_path) = create_test_db();
    let api = create_test_api(&db_path);

    let first = api.ingest_file(&fixture_path(), "ABEX", "2022-06", false, false);
    let second = api.ingest_file(&fixture_path(), "ABEX", "2022-06", false, false);

    assert_eq!(first.status, IngestionStatus::Success);
    assert_eq!(second.status, IngestionStatus::Skipped);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 0);
    assert_eq!(api.persisted_row_count("ABEX", "2022-06").unwrap(), 501);

    let events = api
        .events_by_fingerprint(first.fingerprint.as_deref().unwrap())
        .unwrap();
    assert!(events
        .iter()
        .any(|e| e.event_type == AuditEventType::DuplicateSkipped));
}

#[test]
fn test_fingerprint_is_stable_across_runs() {
    let (_dir_a, db_a) = create_test_db();
    let (_dir_b, db_b) = create_test_db();

    let a = create_test_api(&db_a).ingest_file(&fixture_path(), "ABEX", "2022-06", false, false);
    let b = create_test_api(&db_b).ingest_file(&fixture_path(), "ABEX", "2022-06", false, false);

    assert!(a.fingerprint.is_some());
    assert_eq!(a.fingerprint, b.fingerprint);
}

#[test]
fn test_dedup_survives_reopen() {
    let (_dir, db_path) = create_test_db();

    let first = create_test_api(&db_path).ingest_file(&fixture_path(), "ABEX", "2022-06", false, false);
    let second = create_test_api(&db_path).ingest_file(&fixture_path(), "ABEX", "2022-06", false, false);

    assert_eq!(first.status, IngestionStatus::Success);
    assert_eq!(second.status, IngestionStatus::Skipped);
}

#[test]
fn test_fixture_passes_validation() {
    let (_dir, db_path) = create_test_db();
    let api = create_test_api(&db_path);

    let result = api.ingest_file(&fixture_path(), "ABEX", "2022-06", false, true);

    assert_eq!(result.status, IngestionStatus::Success);
    let validation = result.validation.expect("validation summary missing");
    assert_eq!(validation.critical_failures, 0);
}

#[test]
fn test_missing_account_code_column_fails() {
    let (_dir, db_path) = create_test_db();
    let api = create_test_api(&db_path);
    let file = write_csv(&[
        "account_name,balance,entity,company_code,period,bs_pl,status".to_string(),
        "Cash,1.00,ABEX,AB01,2022-06,BS,active".to_string(),
        "Payables,-1.00,ABEX,AB01,2022-06,BS,active".to_string(),
    ]);

    let result = api.ingest_file(file.path(), "ABEX", "2022-06", false, false);

    assert_eq!(result.status, IngestionStatus::Failed);
    assert_eq!(result.failed, 2);
    assert!(result.error.unwrap_or_default().contains("account_code"));
    assert_eq!(api.persisted_row_count("ABEX", "2022-06").unwrap(), 0);
}

#[test]
fn test_partial_success_reports_counts() {
    let (_dir, db_path) = create_test_db();
    let api = create_test_api(&db_path);
    let mut lines = trial_balance_lines("ABEX", "2022-06", 1000, 4);
    lines.push("9999,Broken,not-a-number,ABEX,AB01,2022-06,BS,active".to_string());
    let file = write_csv(&lines);

    let result = api.ingest_file(file.path(), "ABEX", "2022-06", false, false);

    assert_eq!(result.status, IngestionStatus::Failed);
    assert_eq!(result.inserted, 4);
    assert_eq!(result.failed, 1);
    assert_eq!(api.persisted_row_count("ABEX", "2022-06").unwrap(), 4);
}

#[test]
fn test_validation_gate_blocks_duplicate_codes() {
    let (_dir, db_path) = create_test_db();
    let api = create_test_api(&db_path);
    let mut lines = trial_balance_lines("ABEX", "2022-06", 1000, 3);
    lines.push("1000,Duplicate,5.00,ABEX,AB01,2022-06,BS,active".to_string());
    let file = write_csv(&lines);

    let result = api.ingest_file(file.path(), "ABEX", "2022-06", false, true);

    assert_eq!(result.status, IngestionStatus::ValidationFailed);
    assert_eq!(result.inserted, 0);
    assert_eq!(api.persisted_row_count("ABEX", "2022-06").unwrap(), 0);
}
