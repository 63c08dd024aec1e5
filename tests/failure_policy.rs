mod common;

use common::fixture;
use ratelimit::{Algorithm, LimiterConfig, RateLimitResult};
use std::error::Error;
use std::time::Duration;

const ALGORITHMS: [Algorithm; 3] = [
    Algorithm::FixedWindow,
    Algorithm::SlidingWindow,
    Algorithm::TokenBucket,
];

fn config(algorithm: Algorithm, fail_open: bool) -> LimiterConfig {
    LimiterConfig::new(algorithm, 5, Duration::from_secs(60)).with_fail_open(fail_open)
}

#[tokio::test]
async fn fail_open_admits_with_a_degraded_result() {
    for algorithm in ALGORITHMS {
        let f = fixture(config(algorithm, true));
        f.store.set_offline(true);

        let result = f.limiter.allow("u").await.unwrap();
        assert_eq!(result, RateLimitResult::fail_open(), "{:?}", algorithm);
        assert!(result.allowed);
        assert_eq!(result.limit, 0);
        assert_eq!(result.remaining, 0);
        assert_eq!(result.retry_after, Duration::ZERO);
        assert_eq!(result.reset_at, None);
    }
}

#[tokio::test]
async fn fail_closed_surfaces_the_outage() {
    for algorithm in ALGORITHMS {
        let f = fixture(config(algorithm, false));
        f.store.set_offline(true);

        let err = f.limiter.allow("u").await.unwrap_err();
        assert!(err.is_storage_unavailable(), "{:?}", algorithm);
        // The cause is preserved for inspection.
        let source = err.source().expect("wrapped cause");
        assert!(source.to_string().contains("offline"));
    }
}

#[tokio::test]
async fn outage_mid_run_switches_behavior_and_back() {
    let f = fixture(config(Algorithm::FixedWindow, true));

    let before = f.limiter.allow("u").await.unwrap();
    assert!(before.allowed);
    assert_eq!(before.limit, 5);

    f.store.set_offline(true);
    let degraded = f.limiter.allow("u").await.unwrap();
    assert!(degraded.is_degraded());

    // Degraded admissions were never recorded: accounting resumes where
    // it left off.
    f.store.set_offline(false);
    let after = f.limiter.allow("u").await.unwrap();
    assert!(after.allowed);
    assert_eq!(after.remaining, 3);
}

#[tokio::test]
async fn reset_never_fails_open() {
    for algorithm in ALGORITHMS {
        let f = fixture(config(algorithm, true));
        f.store.set_offline(true);

        let err = f.limiter.reset("u").await.unwrap_err();
        assert!(err.is_storage_unavailable(), "{:?}", algorithm);
    }
}

#[tokio::test]
async fn invalid_inputs_bypass_the_failure_policy() {
    // Validation errors come back as themselves even when the store is
    // down and the limiter would otherwise fail open.
    let f = fixture(config(Algorithm::TokenBucket, true));
    f.store.set_offline(true);

    assert!(f.limiter.allow("").await.unwrap_err().is_invalid_input());
    assert!(f.limiter.allow_n("u", 0).await.unwrap_err().is_invalid_input());
}
