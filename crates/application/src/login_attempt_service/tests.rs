use std::sync::Arc;

use chrono::TimeDelta;
use vaultgate_domain::{LockoutPolicy, LoginAttemptRecord, LoginFailureOutcome};

use super::LoginAttemptService;
use crate::test_support::{TestClock, TestCounterStore, UnavailableStore, identifier};

const START_EPOCH: i64 = 1_700_000_000;

fn service_with(store: Arc<TestCounterStore>, clock: Arc<TestClock>) -> LoginAttemptService {
    LoginAttemptService::new(store, clock, LockoutPolicy::default())
}

#[tokio::test]
async fn unknown_identifier_has_full_budget() {
    let store = Arc::new(TestCounterStore::default());
    let service = service_with(store, Arc::new(TestClock::at_epoch(START_EPOCH)));

    let status = service.check_attempt(&identifier("1.2.3.4")).await;
    let Ok(status) = status else {
        panic!("check_attempt failed");
    };

    assert!(status.allowed);
    assert_eq!(status.remaining_attempts, 5);
    assert_eq!(status.retry_after_seconds, None);
}

#[tokio::test]
async fn remaining_attempts_shrink_with_each_failure() {
    let store = Arc::new(TestCounterStore::default());
    let service = service_with(store, Arc::new(TestClock::at_epoch(START_EPOCH)));
    let caller = identifier("10.0.0.7");

    for failures in 1..5_u32 {
        let outcome = service.record_failure(&caller).await;
        assert!(matches!(outcome, Ok(LoginFailureOutcome { locked: false, .. })));

        let Ok(status) = service.check_attempt(&caller).await else {
            panic!("check_attempt failed");
        };
        assert!(status.allowed);
        assert_eq!(status.remaining_attempts, 5 - failures);
    }
}

#[tokio::test]
async fn fifth_failure_locks_for_two_minutes() {
    let store = Arc::new(TestCounterStore::default());
    let service = service_with(store, Arc::new(TestClock::at_epoch(START_EPOCH)));
    let caller = identifier("1.2.3.4");

    let mut outcomes = Vec::new();
    for _ in 0..5 {
        match service.record_failure(&caller).await {
            Ok(outcome) => outcomes.push(outcome),
            Err(error) => panic!("record_failure failed: {error}"),
        }
    }

    for outcome in &outcomes[..4] {
        assert_eq!(*outcome, LoginFailureOutcome::counted());
    }
    assert_eq!(outcomes[4], LoginFailureOutcome::locked(120));
}

#[tokio::test]
async fn locked_identifier_is_denied_with_shrinking_retry_after() {
    let store = Arc::new(TestCounterStore::default());
    let clock = Arc::new(TestClock::at_epoch(START_EPOCH));
    let service = service_with(store, clock.clone());
    let caller = identifier("1.2.3.4");

    for _ in 0..5 {
        assert!(service.record_failure(&caller).await.is_ok());
    }

    let Ok(status) = service.check_attempt(&caller).await else {
        panic!("check_attempt failed");
    };
    assert!(!status.allowed);
    assert_eq!(status.remaining_attempts, 0);
    let retry_after = status.retry_after_seconds.unwrap_or_default();
    assert!(retry_after > 0 && retry_after <= 120);

    clock.advance(TimeDelta::milliseconds(30_500));
    let Ok(status) = service.check_attempt(&caller).await else {
        panic!("check_attempt failed");
    };
    assert!(!status.allowed);
    assert_eq!(status.retry_after_seconds, Some(90));
}

#[tokio::test]
async fn elapsed_lock_resets_state_on_next_check() {
    let store = Arc::new(TestCounterStore::default());
    let clock = Arc::new(TestClock::at_epoch(START_EPOCH));
    let service = service_with(store.clone(), clock.clone());
    let caller = identifier("1.2.3.4");

    for _ in 0..5 {
        assert!(service.record_failure(&caller).await.is_ok());
    }

    clock.advance(TimeDelta::seconds(120));
    let Ok(status) = service.check_attempt(&caller).await else {
        panic!("check_attempt failed");
    };

    assert!(status.allowed);
    assert_eq!(status.remaining_attempts, 5);
    assert!(store.login_record("1.2.3.4").is_none());
}

#[tokio::test]
async fn failure_after_elapsed_lock_starts_a_new_count() {
    let store = Arc::new(TestCounterStore::default());
    let clock = Arc::new(TestClock::at_epoch(START_EPOCH));
    let service = service_with(store.clone(), clock.clone());
    let caller = identifier("1.2.3.4");

    for _ in 0..5 {
        assert!(service.record_failure(&caller).await.is_ok());
    }

    clock.advance(TimeDelta::seconds(121));
    let outcome = service.record_failure(&caller).await;
    assert!(matches!(outcome, Ok(LoginFailureOutcome { locked: false, .. })));

    let record = store.login_record("1.2.3.4");
    assert_eq!(record.as_ref().map(|record| record.attempts), Some(1));
    assert_eq!(record.and_then(|record| record.locked_until), None);
}

#[tokio::test]
async fn unlocked_record_over_threshold_reports_zero_remaining() {
    let store = Arc::new(TestCounterStore::default());
    let clock = Arc::new(TestClock::at_epoch(START_EPOCH));
    let service = service_with(store.clone(), clock.clone());
    store.insert_login_record(LoginAttemptRecord {
        identifier: identifier("5.5.5.5"),
        attempts: 7,
        locked_until: None,
        updated_at: crate::Clock::now(clock.as_ref()),
    });

    let Ok(status) = service.check_attempt(&identifier("5.5.5.5")).await else {
        panic!("check_attempt failed");
    };
    assert!(status.allowed);
    assert_eq!(status.remaining_attempts, 0);
}

#[tokio::test]
async fn clear_restores_full_budget() {
    let store = Arc::new(TestCounterStore::default());
    let service = service_with(store.clone(), Arc::new(TestClock::at_epoch(START_EPOCH)));
    let caller = identifier("1.2.3.4");

    for _ in 0..5 {
        assert!(service.record_failure(&caller).await.is_ok());
    }

    assert!(service.clear(&caller).await.is_ok());
    let Ok(status) = service.check_attempt(&caller).await else {
        panic!("check_attempt failed");
    };

    assert!(status.allowed);
    assert_eq!(status.remaining_attempts, 5);
    assert!(store.login_record("1.2.3.4").is_none());
}

#[tokio::test]
async fn identifiers_are_counted_independently() {
    let store = Arc::new(TestCounterStore::default());
    let service = service_with(store, Arc::new(TestClock::at_epoch(START_EPOCH)));

    for _ in 0..5 {
        assert!(service.record_failure(&identifier("1.2.3.4")).await.is_ok());
    }

    let Ok(status) = service.check_attempt(&identifier("4.3.2.1")).await else {
        panic!("check_attempt failed");
    };
    assert!(status.allowed);
    assert_eq!(status.remaining_attempts, 5);
}

#[tokio::test]
async fn store_failures_propagate() {
    let service = LoginAttemptService::new(
        Arc::new(UnavailableStore),
        Arc::new(TestClock::at_epoch(START_EPOCH)),
        LockoutPolicy::default(),
    );
    let caller = identifier("1.2.3.4");

    let check = service.check_attempt(&caller).await;
    assert!(check.is_err_and(|error| error.is_store_unavailable()));

    let record = service.record_failure(&caller).await;
    assert!(record.is_err_and(|error| error.is_store_unavailable()));

    let clear = service.clear(&caller).await;
    assert!(clear.is_err_and(|error| error.is_store_unavailable()));
}

#[tokio::test]
async fn custom_threshold_is_honoured() {
    let store = Arc::new(TestCounterStore::default());
    let policy = LockoutPolicy::new(2, 30).unwrap_or_default();
    let service = LoginAttemptService::new(
        store,
        Arc::new(TestClock::at_epoch(START_EPOCH)),
        policy,
    );
    let caller = identifier("8.8.4.4");

    assert!(matches!(
        service.record_failure(&caller).await,
        Ok(LoginFailureOutcome { locked: false, .. })
    ));
    assert!(matches!(
        service.record_failure(&caller).await,
        Ok(outcome) if outcome == LoginFailureOutcome::locked(30)
    ));
}

#[tokio::test]
async fn clear_racing_the_lock_reports_a_counted_failure() {
    let store = Arc::new(TestCounterStore::default());
    let service = service_with(store.clone(), Arc::new(TestClock::at_epoch(START_EPOCH)));
    let caller = identifier("9.9.9.9");

    for _ in 0..4 {
        assert!(service.record_failure(&caller).await.is_ok());
    }

    store.clear_before_next_lock();
    let outcome = service.record_failure(&caller).await;

    assert!(matches!(outcome, Ok(LoginFailureOutcome { locked: false, .. })));
    assert!(store.login_record("9.9.9.9").is_none());
}
