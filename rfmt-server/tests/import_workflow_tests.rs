//! End-to-end tests for the CSV import pipeline
//!
//! Each test admits a real background job against a temporary SQLite
//! database and polls the tracker until the job settles.

mod helpers;

use std::sync::Arc;

use helpers::*;
use rfmt_server::db::{rfmts, units};
use rfmt_server::import::{ImportService, ImportStatus, ImportTracker, StartOutcome};
use rfmt_server::store::SqliteStore;

fn sqlite_service(pool: &sqlx::SqlitePool, batch_size: usize) -> ImportService {
    ImportService::new(
        Arc::new(SqliteStore::new(pool.clone())),
        ImportTracker::new(),
        batch_size,
    )
}

#[tokio::test]
async fn test_single_row_import() {
    let (temp_dir, pool) = create_test_db().await;
    let service = sqlite_service(&pool, 100);
    let path = write_csv(
        temp_dir.path(),
        "one.csv",
        &["001;Jane Doe;JG1;desc;BranchA;;;;".to_string()],
    );

    assert_eq!(service.start_import(path.clone()).await, StartOutcome::Accepted);
    let progress = wait_for_terminal(service.tracker()).await;

    assert_eq!(progress.status, ImportStatus::Completed);
    assert_eq!(progress.progress, 1);
    assert_eq!(progress.total, 1);
    assert_eq!(progress.percentage, 100);
    assert_eq!(progress.message, "Successfully imported 1 records");

    let records = rfmts::list_by_personnel_number(&pool, "001").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].full_name, "Jane Doe");
    assert_eq!(records[0].job_grade, "JG1");
    assert_eq!(records[0].branch_name, "BranchA");
    assert_eq!(records[0].unit_id, None);

    assert!(!path.exists(), "import file should be removed");
}

#[tokio::test]
async fn test_short_row_counted_but_not_persisted() {
    let (temp_dir, pool) = create_test_db().await;
    let service = sqlite_service(&pool, 100);
    let path = write_csv(temp_dir.path(), "short.csv", &["001;Jane;JG1;desc;BranchA".to_string()]);

    service.start_import(path).await;
    let progress = wait_for_terminal(service.tracker()).await;

    assert_eq!(progress.status, ImportStatus::Completed);
    assert_eq!(progress.progress, 1);
    assert_eq!(progress.total, 1);
    assert_eq!(count_rfmts(&pool).await, 0);
}

#[tokio::test]
async fn test_blank_personnel_number_skipped_without_error() {
    let (temp_dir, pool) = create_test_db().await;
    let service = sqlite_service(&pool, 100);
    let path = write_csv(
        temp_dir.path(),
        "blank.csv",
        &[
            " ;X;;;;;;;".to_string(),
            "002;Kept;;;;;;;".to_string(),
        ],
    );

    service.start_import(path).await;
    let progress = wait_for_terminal(service.tracker()).await;

    assert_eq!(progress.status, ImportStatus::Completed);
    assert_eq!(progress.progress, 2);
    assert_eq!(count_rfmts(&pool).await, 1);
}

#[tokio::test]
async fn test_trailing_partial_batch_flushed_after_skipped_last_row() {
    let (temp_dir, pool) = create_test_db().await;
    let store = Arc::new(CountingStore::new(pool.clone()));
    let service = ImportService::new(store.clone(), ImportTracker::new(), 100);

    let mut rows = valid_rows(3);
    rows.push("bad;row".to_string());
    let path = write_csv(temp_dir.path(), "tail.csv", &rows);

    service.start_import(path).await;
    let progress = wait_for_terminal(service.tracker()).await;

    assert_eq!(progress.status, ImportStatus::Completed);
    assert_eq!(progress.progress, 4);
    assert_eq!(store.batch_sizes(), vec![3]);
    assert_eq!(count_rfmts(&pool).await, 3);
}

#[tokio::test]
async fn test_missing_file_ends_in_error() {
    let (temp_dir, pool) = create_test_db().await;
    let service = sqlite_service(&pool, 100);
    let path = temp_dir.path().join("never-uploaded.csv");

    assert_eq!(service.start_import(path.clone()).await, StartOutcome::Accepted);
    let progress = wait_for_terminal(service.tracker()).await;

    assert_eq!(progress.status, ImportStatus::Error);
    assert_eq!(progress.progress, 0);
    assert_eq!(progress.total, 0);
    assert_eq!(progress.percentage, 0);
    assert!(progress.message.starts_with("Failed to open file:"), "{}", progress.message);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_narrow_header_ends_in_error_and_removes_file() {
    let (temp_dir, pool) = create_test_db().await;
    let service = sqlite_service(&pool, 100);
    let path = temp_dir.path().join("narrow.csv");
    std::fs::write(&path, "PN;Nama;JG\n001;A;B\n").unwrap();

    service.start_import(path.clone()).await;
    let progress = wait_for_terminal(service.tracker()).await;

    assert_eq!(progress.status, ImportStatus::Error);
    assert_eq!(progress.message, "Invalid CSV format: insufficient columns");
    assert_eq!(progress.total, 0);
    assert_eq!(count_rfmts(&pool).await, 0);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_batches_of_100_100_50() {
    let (temp_dir, pool) = create_test_db().await;
    let store = Arc::new(CountingStore::new(pool.clone()));
    let service = ImportService::new(store.clone(), ImportTracker::new(), 100);
    let path = write_csv(temp_dir.path(), "bulk.csv", &valid_rows(250));

    service.start_import(path).await;
    let progress = wait_for_terminal(service.tracker()).await;

    assert_eq!(progress.status, ImportStatus::Completed);
    assert_eq!(progress.progress, 250);
    assert_eq!(progress.total, 250);
    assert_eq!(store.batch_sizes(), vec![100, 100, 50]);
    assert_eq!(count_rfmts(&pool).await, 250);
}

#[tokio::test]
async fn test_failed_third_batch_keeps_first_two() {
    let (temp_dir, pool) = create_test_db().await;
    let store = Arc::new(CountingStore::failing_on(pool.clone(), 3));
    let service = ImportService::new(store.clone(), ImportTracker::new(), 100);
    let path = write_csv(temp_dir.path(), "bulk.csv", &valid_rows(250));

    service.start_import(path.clone()).await;
    let progress = wait_for_terminal(service.tracker()).await;

    assert_eq!(progress.status, ImportStatus::Error);
    assert!(progress.message.starts_with("Failed to insert batch:"), "{}", progress.message);
    assert_eq!(store.batch_sizes(), vec![100, 100, 50]);
    assert_eq!(count_rfmts(&pool).await, 200);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_failed_batch_stops_processing_rows() {
    let (temp_dir, pool) = create_test_db().await;
    let store = Arc::new(CountingStore::failing_on(pool.clone(), 1));
    let service = ImportService::new(store.clone(), ImportTracker::new(), 10);
    let path = write_csv(temp_dir.path(), "bulk.csv", &valid_rows(50));

    service.start_import(path).await;
    let progress = wait_for_terminal(service.tracker()).await;

    assert_eq!(progress.status, ImportStatus::Error);
    assert_eq!(progress.total, 50);
    assert_eq!(progress.progress, 9);
    assert_eq!(store.batch_sizes(), vec![10]);
    assert_eq!(count_rfmts(&pool).await, 0);
}

#[tokio::test]
async fn test_units_resolved_from_branch_name() {
    let (temp_dir, pool) = create_test_db().await;
    units::insert_unit(&pool, "U0", "KC Jakarta Sudirman Lama", false).await.unwrap();
    let sudirman = units::insert_unit(&pool, "U1", "KC Jakarta Sudirman", true).await.unwrap();
    units::insert_unit(&pool, "U2", "KC Jakarta Sudirman Baru", true).await.unwrap();

    let service = sqlite_service(&pool, 100);
    let path = write_csv(
        temp_dir.path(),
        "units.csv",
        &[
            "001;A;;;Sudirman;;;;".to_string(),
            "002;B;;;Surabaya;;;;".to_string(),
            "003;C;;;sudirman;;;;".to_string(),
            "004;D;;;;;;;".to_string(),
        ],
    );

    service.start_import(path).await;
    assert_eq!(wait_for_terminal(service.tracker()).await.status, ImportStatus::Completed);

    let unit_of = |pn: &'static str| {
        let pool = pool.clone();
        async move { rfmts::list_by_personnel_number(&pool, pn).await.unwrap()[0].unit_id }
    };
    assert_eq!(unit_of("001").await, Some(sudirman));
    assert_eq!(unit_of("002").await, None);
    assert_eq!(unit_of("003").await, None);
    assert_eq!(unit_of("004").await, None);

    let loaded = rfmts::list_by_personnel_number(&pool, "001").await.unwrap();
    assert_eq!(loaded[0].unit.as_ref().map(|u| u.unit_code.as_str()), Some("U1"));
}

#[tokio::test]
async fn test_second_import_conflicts_while_first_runs() {
    let (temp_dir, pool) = create_test_db().await;
    let store = Arc::new(GatedStore::new(pool.clone()));
    let service = ImportService::new(store.clone(), ImportTracker::new(), 1);

    let first = write_csv(temp_dir.path(), "first.csv", &valid_rows(5));
    let second = write_csv(temp_dir.path(), "second.csv", &valid_rows(2));

    assert_eq!(service.start_import(first).await, StartOutcome::Accepted);
    let before = service.progress().await;
    assert_eq!(before.status, ImportStatus::Processing);

    assert_eq!(service.start_import(second.clone()).await, StartOutcome::Conflict);
    assert_eq!(service.progress().await.status, ImportStatus::Processing);
    assert!(second.exists(), "rejected file stays with the caller");

    store.open();
    let progress = wait_for_terminal(service.tracker()).await;
    assert_eq!(progress.status, ImportStatus::Completed);
    assert_eq!(progress.total, 5);
    assert_eq!(count_rfmts(&pool).await, 5);

    // A finished job lets the next one in
    assert_eq!(service.start_import(second).await, StartOutcome::Accepted);
    let progress = wait_for_terminal(service.tracker()).await;
    assert_eq!(progress.total, 2);
    assert_eq!(count_rfmts(&pool).await, 7);
}

#[tokio::test]
async fn test_percentage_consistent_while_polling() {
    let (temp_dir, pool) = create_test_db().await;
    let service = sqlite_service(&pool, 7);
    let path = write_csv(temp_dir.path(), "poll.csv", &valid_rows(120));

    service.start_import(path).await;
    loop {
        let snapshot = service.progress().await;
        let expected = if snapshot.total == 0 {
            0
        } else {
            snapshot.progress * 100 / snapshot.total
        };
        assert_eq!(snapshot.percentage, expected);
        assert!(snapshot.progress <= snapshot.total);
        if snapshot.status.is_terminal() {
            assert_eq!(snapshot.status, ImportStatus::Completed);
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(count_rfmts(&pool).await, 120);
}

#[tokio::test]
async fn test_latin1_names_are_imported() {
    let (temp_dir, pool) = create_test_db().await;
    let service = sqlite_service(&pool, 100);
    let path = temp_dir.path().join("latin1.csv");
    let mut contents = format!("{}\n", HEADER).into_bytes();
    contents.extend_from_slice(b"001;Jos\xe9 Santos;JG1;desc;BranchA;;;;\n002;Ana;JG2;desc;BranchB;;;;\n");
    std::fs::write(&path, contents).unwrap();

    service.start_import(path).await;
    let progress = wait_for_terminal(service.tracker()).await;

    assert_eq!(progress.status, ImportStatus::Completed);
    assert_eq!(progress.total, 2);
    assert_eq!(progress.progress, 2);
    assert_eq!(count_rfmts(&pool).await, 2);

    let jose = rfmts::list_by_personnel_number(&pool, "001").await.unwrap();
    assert_eq!(jose[0].full_name, "Jos\u{FFFD} Santos");
}

#[tokio::test]
async fn test_panicking_job_ends_in_error_and_releases_admission() {
    let (temp_dir, pool) = create_test_db().await;
    let tracker = ImportTracker::new();
    let broken = ImportService::new(Arc::new(PanickingStore::new(pool.clone())), tracker.clone(), 1);
    let path = write_csv(temp_dir.path(), "doomed.csv", &valid_rows(3));

    assert_eq!(broken.start_import(path.clone()).await, StartOutcome::Accepted);
    let progress = wait_for_terminal(&tracker).await;

    assert_eq!(progress.status, ImportStatus::Error);
    assert!(progress.message.starts_with("Import worker failed:"), "{}", progress.message);
    assert!(progress.message.contains("insert_batch blew up"));
    assert!(!path.exists());

    // The same tracker admits the next job
    let healthy = ImportService::new(Arc::new(SqliteStore::new(pool.clone())), tracker.clone(), 10);
    let retry = write_csv(temp_dir.path(), "retry.csv", &valid_rows(3));
    assert_eq!(healthy.start_import(retry).await, StartOutcome::Accepted);
    assert_eq!(wait_for_terminal(&tracker).await.status, ImportStatus::Completed);
    assert_eq!(count_rfmts(&pool).await, 3);
}
