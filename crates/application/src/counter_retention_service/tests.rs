use std::sync::Arc;

use chrono::{TimeDelta, TimeZone, Utc};
use vaultgate_domain::LoginAttemptRecord;

use super::{CompactionReport, CounterRetentionService};
use crate::test_support::{TestClock, TestCounterStore, identifier};

const NOW_EPOCH: i64 = 1_700_100_000;

fn at(epoch: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(epoch, 0).single().unwrap_or_default()
}

#[tokio::test]
async fn compaction_removes_only_rows_past_retention() {
    let store = Arc::new(TestCounterStore::default());
    let clock = Arc::new(TestClock::at_epoch(NOW_EPOCH));
    let service = CounterRetentionService::new(store.clone(), store.clone(), clock);

    store.insert_login_record(LoginAttemptRecord {
        identifier: identifier("old-unlocked"),
        attempts: 2,
        locked_until: None,
        updated_at: at(NOW_EPOCH - 2 * 86_400),
    });
    store.insert_login_record(LoginAttemptRecord {
        identifier: identifier("old-expired-lock"),
        attempts: 5,
        locked_until: Some(at(NOW_EPOCH - 2 * 86_400 + 120)),
        updated_at: at(NOW_EPOCH - 2 * 86_400),
    });
    store.insert_login_record(LoginAttemptRecord {
        identifier: identifier("recent"),
        attempts: 1,
        locked_until: None,
        updated_at: at(NOW_EPOCH - 60),
    });
    store.insert_window("old", at(NOW_EPOCH - 2 * 86_400), 40);
    store.insert_window("recent", at(NOW_EPOCH - 60), 3);

    let report = service.compact(TimeDelta::hours(24)).await;
    assert!(matches!(
        report,
        Ok(CompactionReport {
            login_attempts_removed: 2,
            write_windows_removed: 1,
        })
    ));
    assert!(store.login_record("recent").is_some());
    assert_eq!(store.window_count(), 1);
}

#[tokio::test]
async fn compaction_keeps_active_locks() {
    let store = Arc::new(TestCounterStore::default());
    let clock = Arc::new(TestClock::at_epoch(NOW_EPOCH));
    let service = CounterRetentionService::new(store.clone(), store.clone(), clock);

    store.insert_login_record(LoginAttemptRecord {
        identifier: identifier("long-lock"),
        attempts: 5,
        locked_until: Some(at(NOW_EPOCH + 60)),
        updated_at: at(NOW_EPOCH - 3 * 86_400),
    });

    let report = service.compact(TimeDelta::hours(1)).await;
    assert!(matches!(report, Ok(report) if report.login_attempts_removed == 0));
    assert!(store.login_record("long-lock").is_some());
}

#[tokio::test]
async fn compaction_rejects_non_positive_retention() {
    let store = Arc::new(TestCounterStore::default());
    let service = CounterRetentionService::new(
        store.clone(),
        store,
        Arc::new(TestClock::at_epoch(NOW_EPOCH)),
    );

    assert!(service.compact(TimeDelta::zero()).await.is_err());
}
