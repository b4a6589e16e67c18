//! Screen-polling waits against a scripted emulator.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tn3270wright::prelude::*;
use tokio::time::Instant;

use common::{commands, fake_emulator, screen_sequence, screen_sequence_with};

#[tokio::test(start_paused = true)]
async fn returns_first_matching_snapshot() {
    let (tn, log, _server) = screen_sequence(&["LOADING", "LOADING", "SIMBANK MAIN MENU"]);

    let screen = tn
        .wait_for_text_and_return("MAIN MENU", Some(Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(screen, "SIMBANK MAIN MENU");
    assert_eq!(commands(&log), vec!["Ascii()"; 3]);
}

#[tokio::test(start_paused = true)]
async fn already_satisfied_condition_fetches_once() {
    let (tn, log, _server) = screen_sequence(&["READY"]);
    tn.wait_for_text("READY", None).await.unwrap();
    assert_eq!(commands(&log).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn times_out_near_the_deadline() {
    let (tn, _log, _server) = screen_sequence(&["LOADING"]);
    let start = Instant::now();

    let err = tn
        .wait_for_text("NEVER", Some(Duration::from_secs(2)))
        .await
        .unwrap_err();

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(2), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(2200), "{elapsed:?}");
    match err {
        Tn3270Error::Timeout { condition, timeout } => {
            assert!(condition.contains("NEVER"));
            assert_eq!(timeout, Duration::from_secs(2));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn zero_timeout_uses_client_default() {
    let builder = Client::builder()
        .timeout(Duration::from_secs(7))
        .poll_interval(Duration::from_millis(500));
    let (tn, _log, _server) = screen_sequence_with(builder, &["LOADING"]);
    let start = Instant::now();

    let err = tn
        .wait_for_text("NEVER", Some(Duration::ZERO))
        .await
        .unwrap_err();

    assert!(start.elapsed() >= Duration::from_secs(7));
    match err {
        Tn3270Error::Timeout { timeout, .. } => assert_eq!(timeout, Duration::from_secs(7)),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn text_gone_waits_for_disappearance() {
    let (tn, log, _server) = screen_sequence(&["PLEASE WAIT", "PLEASE WAIT", "DONE"]);
    tn.wait_for_text_gone("PLEASE WAIT", None).await.unwrap();
    assert_eq!(commands(&log).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn pattern_wait_returns_screen() {
    let (tn, _log, _server) = screen_sequence(&["ACCOUNT", "ACCOUNT 00012345 BALANCE 100"]);
    let screen = tn
        .wait_for_pattern(r"ACCOUNT \d{8}", None)
        .await
        .unwrap();
    assert!(screen.contains("00012345"));
}

#[tokio::test]
async fn invalid_pattern_fails_without_io() {
    let tn = common::silent_client();
    let err = tn.wait_for_pattern("(unclosed", None).await.unwrap_err();
    assert!(matches!(err, Tn3270Error::Regex(_)));
}

#[tokio::test(start_paused = true)]
async fn fetch_error_ends_wait_immediately() {
    let (tn, log, _server) = fake_emulator(|_| "error keyboard locked\n".to_string());
    let start = Instant::now();

    let err = tn.wait_for_text("MENU", None).await.unwrap_err();

    assert!(matches!(err, Tn3270Error::Protocol { .. }), "{err}");
    assert_eq!(commands(&log).len(), 1);
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_wait() {
    let (tn, log, _server) = screen_sequence(&["LOADING"]);
    let tn = Arc::new(tn);

    let waiter = {
        let tn = tn.clone();
        tokio::spawn(async move { tn.wait_for_text("NEVER", Some(Duration::from_secs(60))).await })
    };
    tokio::time::sleep(Duration::from_millis(350)).await;
    let start = Instant::now();
    tn.cancellation_token().cancel();

    let err = waiter.await.unwrap().unwrap_err();
    assert!(matches!(err, Tn3270Error::Cancelled), "{err}");
    assert!(start.elapsed() < Duration::from_millis(100));
    assert!(commands(&log).len() <= 5);
}

#[tokio::test(start_paused = true)]
async fn caller_token_cancels_before_first_fetch() {
    let token = CancellationToken::new();
    token.cancel();
    let (tn, log, _server) = screen_sequence(&["READY"]);

    let wait = WaitBuilder::new(WaitCondition::TextAppears("READY".into())).cancel_on(token);
    let err = tn.wait_until(&wait).await.unwrap_err();

    assert!(matches!(err, Tn3270Error::Cancelled));
    assert!(commands(&log).is_empty());
}
