//! Integration tests for the round alarm.
//!
//! Uses `tokio::test(start_paused = true)` to control time deterministically:
//! with the clock paused, `timeout` and `sleep_until` auto-advance, so a
//! "30-second" test completes instantly and never flakes.

use std::time::Duration;

use sipforge_alarm::RoundAlarm;
use tokio::time::timeout;

const ROUND: Duration = Duration::from_secs(30);

#[test]
fn test_new_alarm_is_disarmed() {
    let alarm = RoundAlarm::new();
    assert!(!alarm.is_armed());
    assert_eq!(alarm.remaining(), None);
    assert_eq!(alarm.armed_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_disarmed_alarm_pends_forever() {
    let mut alarm = RoundAlarm::new();

    let result = timeout(Duration::from_secs(3600), alarm.fired()).await;
    assert!(result.is_err(), "disarmed alarm must never fire");
}

#[tokio::test(start_paused = true)]
async fn test_armed_alarm_fires_after_duration() {
    let mut alarm = RoundAlarm::new();
    alarm.arm(ROUND);
    assert!(alarm.is_armed());

    let result = timeout(ROUND + Duration::from_secs(1), alarm.fired()).await;
    assert!(result.is_ok(), "alarm should fire at its deadline");
    assert!(!alarm.is_armed(), "alarm disarms after firing");
}

#[tokio::test(start_paused = true)]
async fn test_alarm_does_not_fire_early() {
    let mut alarm = RoundAlarm::new();
    alarm.arm(ROUND);

    let result = timeout(Duration::from_secs(10), alarm.fired()).await;
    assert!(result.is_err(), "alarm must not fire before its deadline");
    assert!(alarm.is_armed(), "interrupted wait leaves the alarm pending");
}

#[tokio::test(start_paused = true)]
async fn test_cancel_disarms() {
    let mut alarm = RoundAlarm::new();
    alarm.arm(ROUND);
    alarm.cancel();
    assert!(!alarm.is_armed());

    let result = timeout(Duration::from_secs(3600), alarm.fired()).await;
    assert!(result.is_err(), "cancelled alarm must never fire");
}

#[tokio::test(start_paused = true)]
async fn test_rearm_replaces_pending_deadline() {
    let mut alarm = RoundAlarm::new();

    // Arm at t=0 for 10s, then immediately re-arm for 30s. The original
    // 10s deadline must be gone: nothing fires at t=10.
    alarm.arm(Duration::from_secs(10));
    alarm.arm(ROUND);
    assert_eq!(alarm.armed_count(), 2);

    let early = timeout(Duration::from_secs(15), alarm.fired()).await;
    assert!(early.is_err(), "replaced deadline must not fire");

    // The replacement deadline (t=30) still fires.
    let late = timeout(Duration::from_secs(20), alarm.fired()).await;
    assert!(late.is_ok(), "replacement deadline should fire");
}

#[tokio::test(start_paused = true)]
async fn test_fired_alarm_stays_quiet_until_rearmed() {
    let mut alarm = RoundAlarm::new();
    alarm.arm(ROUND);
    timeout(ROUND + Duration::from_secs(1), alarm.fired())
        .await
        .expect("first fire");

    let again = timeout(Duration::from_secs(3600), alarm.fired()).await;
    assert!(again.is_err(), "a one-shot alarm fires once per arm");

    alarm.arm(ROUND);
    let rearmed = timeout(ROUND + Duration::from_secs(1), alarm.fired()).await;
    assert!(rearmed.is_ok(), "re-arming restores the alarm");
}

#[tokio::test(start_paused = true)]
async fn test_remaining_counts_down() {
    let mut alarm = RoundAlarm::new();
    alarm.arm(ROUND);

    let before = alarm.remaining().expect("armed");
    tokio::time::advance(Duration::from_secs(10)).await;
    let after = alarm.remaining().expect("still armed");

    assert!(after < before, "remaining should shrink as time passes");
    assert_eq!(after, Duration::from_secs(20));
}
