mod common;

use common::fixture;
use ratelimit::{Algorithm, LimiterConfig};
use std::time::Duration;

/// limit=10 over 10 s: refill rate of one token per second.
fn config() -> LimiterConfig {
    LimiterConfig::new(Algorithm::TokenBucket, 10, Duration::from_secs(10)).with_prefix("test")
}

#[tokio::test]
async fn burst_then_refill() {
    let f = fixture(config());

    // A fresh bucket admits the full capacity at once.
    let burst = f.limiter.allow_n("u", 10).await.unwrap();
    assert!(burst.allowed);
    assert_eq!(burst.remaining, 0);

    // Drained: the next unit is about one second away.
    let denied = f.limiter.allow("u").await.unwrap();
    assert!(!denied.allowed);
    assert!(denied.retry_after >= Duration::from_millis(900));
    assert!(denied.retry_after <= Duration::from_secs(2));

    // Five seconds of refill brings back five tokens.
    f.clock.advance(Duration::from_secs(5));
    let result = f.limiter.allow_n("u", 4).await.unwrap();
    assert!(result.allowed);
    assert_eq!(result.remaining, 1);
}

#[tokio::test]
async fn sustained_throughput_matches_the_refill_rate() {
    let f = fixture(config());

    // Start from an empty bucket.
    assert!(f.limiter.allow_n("u", 10).await.unwrap().allowed);

    // Over the next 30 seconds, one token per second accrues and is taken.
    let mut admitted = 0;
    for _ in 0..30 {
        f.clock.advance(Duration::from_secs(1));
        if f.limiter.allow("u").await.unwrap().allowed {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 30);

    // No extra credit beyond the rate.
    assert!(!f.limiter.allow("u").await.unwrap().allowed);
}

#[tokio::test]
async fn idle_bucket_caps_at_capacity() {
    let f = fixture(config());

    f.limiter.allow_n("u", 10).await.unwrap();
    f.clock.advance(Duration::from_secs(3_600));

    // An hour idle refills to capacity, not beyond it.
    let result = f.limiter.allow_n("u", 10).await.unwrap();
    assert!(result.allowed);
    assert_eq!(result.remaining, 0);
    assert!(!f.limiter.allow("u").await.unwrap().allowed);
}

#[tokio::test]
async fn denied_calls_never_award_credit_twice() {
    let f = fixture(config());

    f.limiter.allow_n("u", 10).await.unwrap();

    // Hammer the drained bucket every 250 ms for 750 ms; every call is
    // denied, and each one captures the elapsed credit as it goes.
    for _ in 0..3 {
        f.clock.advance(Duration::from_millis(250));
        assert!(!f.limiter.allow("u").await.unwrap().allowed);
    }

    // 250 ms later a full second has accrued in total.
    f.clock.advance(Duration::from_millis(250));
    let result = f.limiter.allow("u").await.unwrap();
    assert!(result.allowed);
    assert_eq!(result.remaining, 0);
}

#[tokio::test]
async fn cost_above_capacity_reports_a_long_wait() {
    let f = fixture(config());

    let result = f.limiter.allow_n("u", 12).await.unwrap();
    assert!(!result.allowed);
    // 12 needed, 10 on hand: at least the two missing tokens' worth.
    assert!(result.retry_after >= Duration::from_secs(2));
}

#[tokio::test]
async fn distinct_keys_have_independent_buckets() {
    let f = fixture(config());

    f.limiter.allow_n("a", 10).await.unwrap();
    assert!(!f.limiter.allow("a").await.unwrap().allowed);

    let other = f.limiter.allow("b").await.unwrap();
    assert!(other.allowed);
    assert_eq!(other.remaining, 9);
}

#[tokio::test]
async fn reset_restores_a_full_bucket() {
    let f = fixture(config());

    // Resetting a bucket that never existed succeeds.
    f.limiter.reset("u").await.unwrap();

    f.limiter.allow_n("u", 10).await.unwrap();
    assert!(!f.limiter.allow("u").await.unwrap().allowed);

    f.limiter.reset("u").await.unwrap();
    let fresh = f.limiter.allow_n("u", 3).await.unwrap();
    assert!(fresh.allowed);
    assert_eq!(fresh.remaining, 7);
}
