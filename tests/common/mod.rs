//! Shared helpers: scripted emulators for driving a `Client` without s3270.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tn3270wright::{Client, ClientBuilder};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;

/// Client attached to a `tokio_test` mock that asserts every byte written
/// and scripts every byte read.
pub fn mock_client(builder: &mut tokio_test::io::Builder) -> Client {
    let (reader, writer) = tokio::io::split(builder.build());
    Client::builder().attach(reader, writer).build()
}

/// A client with a transport that panics on any write.
pub fn silent_client() -> Client {
    mock_client(&mut tokio_test::io::Builder::new())
}

/// Commands received by a fake emulator, in arrival order.
pub type CommandLog = Arc<Mutex<Vec<String>>>;

/// Attach a client to an in-process emulator that answers each command line
/// with whatever `respond` returns (raw reply text, newlines included).
pub fn fake_emulator<F>(respond: F) -> (Client, CommandLog, JoinHandle<()>)
where
    F: FnMut(&str) -> String + Send + 'static,
{
    fake_emulator_with(Client::builder(), respond)
}

/// Like [`fake_emulator`], starting from a configured builder.
pub fn fake_emulator_with<F>(
    builder: ClientBuilder,
    mut respond: F,
) -> (Client, CommandLog, JoinHandle<()>)
where
    F: FnMut(&str) -> String + Send + 'static,
{
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (reader, writer) = tokio::io::split(client_io);
    let client = builder.attach(reader, writer).build();

    let log: CommandLog = Arc::new(Mutex::new(Vec::new()));
    let server_log = log.clone();

    let handle = tokio::spawn(async move {
        let (server_read, mut server_write) = tokio::io::split(server_io);
        let mut lines = BufReader::new(server_read).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            server_log.lock().unwrap().push(line.clone());
            let reply = respond(&line);
            if server_write.write_all(reply.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    (client, log, handle)
}

/// Emulator that answers `Ascii()` with successive screens (repeating the
/// last one) and `ok` to everything else.
pub fn screen_sequence(screens: &[&str]) -> (Client, CommandLog, JoinHandle<()>) {
    screen_sequence_with(Client::builder(), screens)
}

/// Like [`screen_sequence`], starting from a configured builder.
pub fn screen_sequence_with(
    builder: ClientBuilder,
    screens: &[&str],
) -> (Client, CommandLog, JoinHandle<()>) {
    let mut screens: Vec<String> = screens.iter().map(|s| s.to_string()).collect();
    screens.reverse();
    fake_emulator_with(builder, move |cmd| {
        if cmd != "Ascii()" {
            return "ok\n".to_string();
        }
        let screen = if screens.len() > 1 {
            screens.pop().unwrap_or_default()
        } else {
            screens.last().cloned().unwrap_or_default()
        };
        let mut reply = String::new();
        for line in screen.split('\n') {
            reply.push_str("data: ");
            reply.push_str(line);
            reply.push('\n');
        }
        reply.push_str("ok\n");
        reply
    })
}

/// Emulator that replies `ok` to every command.
pub fn ok_emulator() -> (Client, CommandLog, JoinHandle<()>) {
    fake_emulator(|_| "ok\n".to_string())
}

pub fn commands(log: &CommandLog) -> Vec<String> {
    log.lock().unwrap().clone()
}
