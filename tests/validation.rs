//! Argument validation happens before any emulator I/O.

mod common;

use tn3270wright::prelude::*;

use common::silent_client;

fn assert_validation(result: Result<()>, expected: &str) {
    match result {
        Err(err @ Tn3270Error::Validation(_)) => {
            assert!(
                err.to_string().contains(expected),
                "expected {expected:?} in {err}"
            );
        }
        Err(other) => panic!("expected validation error, got {other}"),
        Ok(()) => panic!("expected validation error containing {expected:?}"),
    }
}

#[tokio::test]
async fn connect_rejects_bad_host_without_starting_emulator() {
    let tn = Client::builder()
        .program("/nonexistent/s3270-should-not-run")
        .build();

    assert_validation(tn.connect("", 23, None).await, "host cannot be empty");
    assert_validation(
        tn.connect(&"h".repeat(254), 23, None).await,
        "host exceeds maximum length of 253 characters",
    );
    assert_validation(
        tn.connect(&"h".repeat(1000), 23, None).await,
        "host exceeds maximum length of 253 characters",
    );

    assert_eq!(tn.state().await, SessionState::Disconnected);
    assert_eq!(tn.pid().await, None);
}

#[tokio::test]
async fn connect_rejects_ports_out_of_range() {
    let tn = Client::builder()
        .program("/nonexistent/s3270-should-not-run")
        .build();

    for port in [0, 65536, -1, 100_000] {
        assert_validation(
            tn.connect("localhost", port, None).await,
            "port must be between 1 and 65535",
        );
    }
    assert_eq!(tn.state().await, SessionState::Disconnected);
}

#[tokio::test]
async fn connect_rejects_timeout_over_limit() {
    let tn = Client::builder()
        .program("/nonexistent/s3270-should-not-run")
        .build();
    assert_validation(
        tn.connect("localhost", 23, Some(301)).await,
        "timeout must be between 1 and 300 seconds",
    );
}

#[tokio::test]
async fn key_presses_reject_out_of_range() {
    let tn = silent_client();

    for key in [0, 25, -1] {
        assert_validation(tn.pf(key).await, "PF key must be between 1 and 24");
        assert_validation(tn.send_pf(key, true).await, "PF key must be between 1 and 24");
    }
    for key in [0, 4, -1] {
        assert_validation(tn.pa(key).await, "PA key must be between 1 and 3");
    }
}

#[tokio::test]
async fn text_longer_than_screen_is_rejected() {
    let tn = silent_client();
    let long = "x".repeat(1921);

    for result in [
        tn.string(&long).await,
        tn.type_text(&long).await,
        tn.send_command(&long, false).await,
    ] {
        assert_validation(result, "text exceeds maximum length of 1920 characters");
    }
}

#[tokio::test]
async fn cursor_moves_reject_off_screen_coordinates() {
    let tn = silent_client();

    assert_validation(tn.move_to(0, 1).await, "row must be between 1 and 24");
    assert_validation(tn.move_to(25, 1).await, "row must be between 1 and 24");
    assert_validation(tn.move_to(1, 0).await, "column must be between 1 and 80");
    assert_validation(tn.move_to(1, 81).await, "column must be between 1 and 80");
    assert_validation(
        tn.string_at("HELLO", 30, 1).await,
        "row must be between 1 and 24",
    );
}

#[tokio::test]
async fn disconnect_without_connect_is_noop() {
    let tn = Client::builder()
        .program("/nonexistent/s3270-should-not-run")
        .build();
    tn.disconnect().await.unwrap();
    assert!(!tn.is_connected().await);
    assert_eq!(tn.state().await, SessionState::Disconnected);

    // Attached but never connected: no Disconnect()/Quit() is written.
    let tn = silent_client();
    tn.disconnect().await.unwrap();
}

#[tokio::test]
async fn commands_before_start_fail_without_io() {
    let tn = Client::new();

    assert!(matches!(
        tn.execute("Test()").await,
        Err(Tn3270Error::NotStarted)
    ));
    let err = tn.screen_text().await.unwrap_err();
    assert!(err.to_string().contains("s3270 not started"));
    assert!(matches!(tn.enter().await, Err(Tn3270Error::NotStarted)));
    assert_eq!(tn.state().await, SessionState::Disconnected);
}
