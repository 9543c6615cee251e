//! Blink scheduler tests
//!
//! Timing runs on tokio's paused clock, so intervals are exact.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{off_body, on_body, FakeBridge};
use hue_blink::{
    BlinkScheduler, BridgeTransport, Credential, Error, Hue, LightStateApplier,
};
use tokio::time::{sleep, Instant};

fn scheduler(bridge: &Arc<FakeBridge>) -> BlinkScheduler {
    let transport: Arc<dyn BridgeTransport> = bridge.clone();
    BlinkScheduler::new(Arc::new(LightStateApplier::new(transport)))
}

fn credential() -> Credential {
    Credential::new("abc123").unwrap()
}

#[tokio::test(start_paused = true)]
async fn toggles_every_half_period_starting_off() {
    let bridge = FakeBridge::new();
    let blinker = scheduler(&bridge);

    blinker
        .start_blink(credential(), 1, Hue::from(300), Duration::from_millis(500))
        .unwrap();
    sleep(Duration::from_millis(1100)).await;
    blinker.shutdown().await;

    let requests = bridge.state_requests(1);
    let bodies: Vec<_> = requests.iter().map(|r| r.body.clone()).collect();
    assert_eq!(
        bodies,
        vec![off_body(), on_body(300), off_body(), on_body(300), off_body()]
    );
    for pair in requests.windows(2) {
        assert_eq!(pair[1].at - pair[0].at, Duration::from_millis(250));
    }
    assert_eq!(requests[0].path, "/api/abc123/lights/1/state");
}

#[tokio::test(start_paused = true)]
async fn stop_without_job_is_a_noop() {
    let bridge = FakeBridge::new();
    let blinker = scheduler(&bridge);

    assert!(!blinker.stop_blink(42));
    assert!(blinker.blinking_lamps().is_empty());
    assert!(bridge.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_ends_the_loop() {
    let bridge = FakeBridge::new();
    let blinker = scheduler(&bridge);

    blinker
        .start_blink(credential(), 1, Hue::from(300), Duration::from_millis(500))
        .unwrap();
    sleep(Duration::from_millis(600)).await;
    assert!(blinker.is_blinking(1));

    assert!(blinker.stop_blink(1));
    assert!(!blinker.is_blinking(1));
    let sent = bridge.state_requests(1).len();

    sleep(Duration::from_secs(5)).await;
    assert_eq!(bridge.state_requests(1).len(), sent);
}

#[tokio::test(start_paused = true)]
async fn cancelling_during_sleep_exits_promptly() {
    let bridge = FakeBridge::new();
    let blinker = scheduler(&bridge);

    // Each half period lasts five seconds
    blinker
        .start_blink(credential(), 1, Hue::from(300), Duration::from_secs(10))
        .unwrap();
    sleep(Duration::from_millis(100)).await;
    assert_eq!(bridge.state_requests(1).len(), 1);

    let started = Instant::now();
    blinker.shutdown().await;
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(bridge.state_requests(1).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn restart_replaces_the_running_loop() {
    let bridge = FakeBridge::new();
    let blinker = scheduler(&bridge);

    blinker
        .start_blink(credential(), 1, Hue::from(100), Duration::from_millis(1000))
        .unwrap();
    sleep(Duration::from_millis(100)).await;

    blinker
        .start_blink(credential(), 1, Hue::from(200), Duration::from_millis(1000))
        .unwrap();
    assert_eq!(blinker.blinking_lamps(), vec![1]);
    assert_eq!(
        blinker.blink_settings(1),
        Some((Hue::from(200), Duration::from_millis(1000)))
    );

    sleep(Duration::from_millis(1900)).await;
    blinker.shutdown().await;

    let requests = bridge.state_requests(1);
    let bodies: Vec<_> = requests.iter().map(|r| r.body.clone()).collect();
    // Old loop's first cycle, then only the new loop from t=100ms
    assert_eq!(
        bodies,
        vec![off_body(), off_body(), on_body(200), off_body(), on_body(200)]
    );
    assert!(!bodies.contains(&on_body(100)));
    assert_eq!(requests[1].at - requests[0].at, Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn restart_after_stop_runs_first_cycle_immediately() {
    let bridge = FakeBridge::new();
    let blinker = scheduler(&bridge);

    blinker
        .start_blink(credential(), 1, Hue::from(100), Duration::from_secs(10))
        .unwrap();
    sleep(Duration::from_millis(100)).await;
    blinker.stop_blink(1);

    let restarted = Instant::now();
    blinker
        .start_blink(credential(), 1, Hue::from(100), Duration::from_secs(10))
        .unwrap();
    sleep(Duration::from_millis(100)).await;

    let requests = bridge.state_requests(1);
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].at, restarted);
    blinker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn lamps_blink_independently() {
    let bridge = FakeBridge::new();
    let blinker = scheduler(&bridge);

    blinker
        .start_blink(credential(), 1, Hue::from(100), Duration::from_millis(500))
        .unwrap();
    blinker
        .start_blink(credential(), 2, Hue::from(200), Duration::from_millis(1000))
        .unwrap();
    assert_eq!(blinker.blinking_lamps(), vec![1, 2]);

    sleep(Duration::from_millis(100)).await;
    blinker.stop_blink(1);
    let lamp_one = bridge.state_requests(1).len();
    let lamp_two = bridge.state_requests(2).len();

    sleep(Duration::from_millis(2000)).await;
    assert_eq!(bridge.state_requests(1).len(), lamp_one);
    assert!(bridge.state_requests(2).len() > lamp_two);
    assert!(blinker.is_blinking(2));

    blinker.shutdown().await;
    assert!(blinker.blinking_lamps().is_empty());
}

#[tokio::test(start_paused = true)]
async fn bridge_failures_do_not_stop_blinking() {
    let bridge = FakeBridge::new();
    bridge.set_fail_states(true);
    let blinker = scheduler(&bridge);

    blinker
        .start_blink(credential(), 3, Hue::from(500), Duration::from_millis(500))
        .unwrap();
    sleep(Duration::from_millis(600)).await;
    assert_eq!(bridge.state_requests(3).len(), 3);

    bridge.set_fail_states(false);
    sleep(Duration::from_millis(500)).await;
    assert_eq!(bridge.state_requests(3).len(), 5);
    assert!(blinker.is_blinking(3));

    blinker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn zero_period_is_rejected() {
    let bridge = FakeBridge::new();
    let blinker = scheduler(&bridge);

    let result = blinker.start_blink(credential(), 1, Hue::from(1), Duration::ZERO);
    assert!(matches!(result, Err(Error::InvalidPeriod(_))));
    assert!(!blinker.is_blinking(1));
}

#[tokio::test(start_paused = true)]
async fn dropping_the_scheduler_ends_all_loops() {
    let bridge = FakeBridge::new();
    let blinker = scheduler(&bridge);

    blinker
        .start_blink(credential(), 1, Hue::from(1), Duration::from_millis(500))
        .unwrap();
    sleep(Duration::from_millis(10)).await;
    drop(blinker);

    let sent = bridge.requests().len();
    sleep(Duration::from_secs(3)).await;
    assert_eq!(bridge.requests().len(), sent);
}

#[tokio::test(start_paused = true)]
async fn start_after_shutdown_is_refused() {
    let bridge = FakeBridge::new();
    let blinker = scheduler(&bridge);

    blinker.shutdown().await;
    let result = blinker.start_blink(credential(), 1, Hue::from(1), Duration::from_millis(500));
    assert!(matches!(result, Err(Error::Shutdown)));
    assert!(!blinker.is_blinking(1));
    assert!(!blinker.stop_blink(1));

    sleep(Duration::from_secs(2)).await;
    assert!(bridge.requests().is_empty());
}
