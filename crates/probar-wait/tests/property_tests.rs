//! Property tests for the wait engine laws.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use probar_wait::{
    condition, retry, Browser, Condition, FailureKind, MockDriver, MockNode, RetryPolicy,
    WaitError, WaitOptions,
};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn error_of(kind: u8) -> WaitError {
    match kind % 4 {
        0 => WaitError::stale("detached"),
        1 => WaitError::not_found("#gone"),
        2 => WaitError::operation("obstructed"),
        _ => WaitError::validation("error dialog"),
    }
}

mod z_order_properties {
    use super::*;

    fn styled(z: Option<i64>) -> String {
        z.map_or_else(|| "color: red".to_string(), |z| format!("z-index: {z};"))
    }

    proptest! {
        #[test]
        fn prop_below_is_above_reversed(za in proptest::option::of(-50i64..50), zb in proptest::option::of(-50i64..50)) {
            let rt = runtime();
            let (above, below, reverse) = rt.block_on(async {
                let driver = MockDriver::new();
                let _ = driver.add_node(MockNode::new("#a").with_attribute("style", styled(za)));
                let _ = driver.add_node(MockNode::new("#b").with_attribute("style", styled(zb)));
                let browser = Browser::new(driver);

                let a = || browser.locator("#a");
                let b = || browser.locator("#b");
                (
                    condition::above(a(), b()).check(&browser).await.unwrap(),
                    condition::below(b(), a()).check(&browser).await.unwrap(),
                    condition::above(b(), a()).check(&browser).await.unwrap(),
                )
            });

            prop_assert_eq!(above, below);
            prop_assert!(!(above && reverse));
            prop_assert_eq!(above, za.unwrap_or(0) > zb.unwrap_or(0));
        }
    }
}

mod retry_properties {
    use super::*;

    proptest! {
        #[test]
        fn prop_matching_error_runs_one_plus_budget(max in 0usize..8, kind in 0u8..4) {
            let rt = runtime();
            let calls = AtomicUsize::new(0);
            let policy = RetryPolicy::new().with_max_attempts(max);
            let err = rt
                .block_on(retry(&policy, || async {
                    let _ = calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(error_of(kind))
                }))
                .unwrap_err();

            prop_assert_eq!(calls.load(Ordering::SeqCst), 1 + max);
            prop_assert_eq!(err.kind(), error_of(kind).kind());
        }

        #[test]
        fn prop_non_matching_error_runs_once(max in 0usize..8, kind in 1u8..4) {
            let rt = runtime();
            let calls = AtomicUsize::new(0);
            let policy = RetryPolicy::on_stale().with_max_attempts(max);
            let err = rt
                .block_on(retry(&policy, || async {
                    let _ = calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(error_of(kind))
                }))
                .unwrap_err();

            prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
            prop_assert_ne!(err.kind(), FailureKind::StaleReference);
        }

        #[test]
        fn prop_success_after_k_failures(max in 0usize..8, failures in 0usize..8) {
            let rt = runtime();
            let calls = AtomicUsize::new(0);
            let policy = RetryPolicy::on_stale().with_max_attempts(max);
            let result = rt.block_on(retry(&policy, || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < failures {
                    Err(WaitError::stale("detached"))
                } else {
                    Ok(n)
                }
            }));

            if failures <= max {
                prop_assert_eq!(result.unwrap(), failures);
                prop_assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
            } else {
                prop_assert!(result.unwrap_err().is_stale());
                prop_assert_eq!(calls.load(Ordering::SeqCst), max + 1);
            }
        }
    }
}

mod validator_properties {
    use super::*;

    fn ready_on(attempt: usize) -> (Condition, Arc<AtomicUsize>) {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&polls);
        let condition = Condition::from_fn("ready on attempt", move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok(n >= attempt) }
        });
        (condition, polls)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_validators_run_once_per_attempt(attempt in 1usize..6, validators in 1usize..4) {
            let rt = runtime();
            let (stats, polls, runs) = rt.block_on(async {
                let browser = Browser::new(MockDriver::new())
                    .with_wait_options(WaitOptions::new().with_timeout(5_000).with_poll_interval(1));
                let runs = Arc::new(AtomicUsize::new(0));
                for i in 0..validators {
                    let counter = Arc::clone(&runs);
                    browser.register_check(format!("v{i}"), move |_, _| {
                        let _ = counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    });
                }

                let (ready, polls) = ready_on(attempt);
                let stats = browser.wait_for_stats(vec![ready]).await.unwrap();
                (stats, polls.load(Ordering::SeqCst), runs.load(Ordering::SeqCst))
            });

            prop_assert_eq!(stats.attempts, attempt);
            prop_assert_eq!(polls, attempt);
            prop_assert_eq!(runs, attempt * validators);
        }

        #[test]
        fn prop_validator_failure_stops_on_first_attempt(attempt in 1usize..6) {
            let rt = runtime();
            let (err, polls) = rt.block_on(async {
                let browser = Browser::new(MockDriver::new())
                    .with_wait_options(WaitOptions::new().with_timeout(5_000).with_poll_interval(1));
                browser.register_check("dialog", |_, _| Err(WaitError::validation("error dialog")));

                let (ready, polls) = ready_on(attempt);
                let err = browser.wait_for(ready).await.unwrap_err();
                (err, polls.load(Ordering::SeqCst))
            });

            let is_validation = matches!(err, WaitError::Validation { .. });
            prop_assert!(is_validation);
            prop_assert_eq!(polls, 1);
        }
    }
}
