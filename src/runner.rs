//! Executes step files against a [`Client`].

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};

use crate::client::Client;
use crate::error::{Result, Tn3270Error};
use crate::input::Key;
use crate::output;
use crate::steps::{ArtifactMode, ArtifactsConfig, ExpectTextStep, Step, StepsFile};

/// Options for a step run.
#[derive(Debug, Default, Clone)]
pub struct RunStepsOptions {
    /// Record a `trace.json` with per-step timing and screen hashes.
    pub trace: bool,
}

/// Load `path`, start a client from its `session` block, and run every step.
///
/// The client is disconnected and torn down afterwards, whether or not the
/// steps succeed.
pub async fn run_steps(path: &Path, options: RunStepsOptions) -> Result<()> {
    let steps_file = StepsFile::load(path)?;
    let session = steps_file.session.as_ref().ok_or_else(|| {
        Tn3270Error::Steps("session config is required to run a steps file".to_string())
    })?;
    let client = session.client_builder().build();

    let result = async {
        if let Some(host) = session.host.as_deref() {
            client
                .connect(host, session.port, session.connect_timeout)
                .await?;
        }
        run_steps_with_client(&client, &steps_file, &options).await
    }
    .await;

    let _ = client.disconnect().await;
    client.teardown().await;
    result
}

/// Run the steps of `steps_file` on an existing client.
pub async fn run_steps_with_client(
    client: &Client,
    steps_file: &StepsFile,
    options: &RunStepsOptions,
) -> Result<()> {
    let artifacts_dir = prepare_artifacts_dir(&steps_file.artifacts, options.trace)?;
    let mut trace_entries = Vec::new();

    for (idx, step) in steps_file.steps.iter().enumerate() {
        let step_index = idx + 1;
        let trace_before = if options.trace {
            Some(capture_trace_snapshot(client).await)
        } else {
            None
        };
        let started = Instant::now();

        let result = execute_step(client, step, step_index, artifacts_dir.as_deref()).await;

        if options.trace {
            let trace_after = capture_trace_snapshot(client).await;
            trace_entries.push(TraceEntry::new(
                step_index,
                step,
                started.elapsed(),
                trace_before.flatten(),
                trace_after,
                result.as_ref().err(),
            ));
        }

        if let Err(err) = result {
            warn!(step = step_index, action = step.label(), error = %err, "step failed");
            if steps_file.artifacts.mode != ArtifactMode::Off {
                if let Some(dir) = artifacts_dir.as_ref() {
                    let _ = capture_artifacts(client, dir, step_index, "failure").await;
                }
            }
            if let Some(dir) = artifacts_dir.as_ref().filter(|_| options.trace) {
                let _ = write_trace(dir, &trace_entries);
            }
            return Err(err);
        }
        info!(step = step_index, action = step.label(), "step passed");

        if steps_file.artifacts.mode == ArtifactMode::Always {
            if let Some(dir) = artifacts_dir.as_ref() {
                capture_artifacts(client, dir, step_index, "step").await?;
            }
        }
    }

    if let Some(dir) = artifacts_dir.as_ref().filter(|_| options.trace) {
        write_trace(dir, &trace_entries)?;
    }
    Ok(())
}

async fn execute_step(
    client: &Client,
    step: &Step,
    step_index: usize,
    artifacts_dir: Option<&Path>,
) -> Result<()> {
    match step {
        Step::Connect { connect } => {
            client
                .connect(&connect.host, connect.port, connect.timeout)
                .await
        }
        Step::Disconnect { .. } => client.disconnect().await,
        Step::Type { r#type } => match (r#type.row, r#type.col) {
            (Some(row), Some(col)) => client.string_at(&r#type.text, row, col).await,
            (None, None) => client.type_text(&r#type.text).await,
            _ => Err(Tn3270Error::Steps(
                "type step needs both row and col, or neither".to_string(),
            )),
        },
        Step::Press { press } => client.press(press.key.parse::<Key>()?).await,
        Step::MoveTo { move_to } => client.move_to(move_to.row, move_to.col).await,
        Step::SendCommand { send_command } => {
            client
                .send_command(&send_command.text, send_command.wait)
                .await
        }
        Step::WaitForField { wait_for_field } => {
            client.wait_for_field(wait_for_field.timeout_secs).await
        }
        Step::WaitForText { wait_for_text } => {
            client
                .wait_for_text(&wait_for_text.text, timeout(wait_for_text.timeout_ms))
                .await
        }
        Step::WaitForTextGone { wait_for_text_gone } => {
            client
                .wait_for_text_gone(
                    &wait_for_text_gone.text,
                    timeout(wait_for_text_gone.timeout_ms),
                )
                .await
        }
        Step::WaitForPattern { wait_for_pattern } => {
            client
                .wait_for_pattern(
                    &wait_for_pattern.pattern,
                    timeout(wait_for_pattern.timeout_ms),
                )
                .await?;
            Ok(())
        }
        Step::ExpectText { expect_text } => expect_text_step(client, expect_text, true).await,
        Step::NotExpectText { not_expect_text } => {
            expect_text_step(client, not_expect_text, false).await
        }
        Step::Screenshot { screenshot } => {
            let dir = artifacts_dir.ok_or_else(|| {
                Tn3270Error::Steps("screenshot step requires artifacts mode".to_string())
            })?;
            let name = screenshot
                .name
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("step-{step_index:03}-screenshot"));
            client.screenshot(dir.join(format!("{name}.txt"))).await
        }
        Step::Sleep { sleep } => {
            tokio::time::sleep(Duration::from_millis(sleep.ms)).await;
            Ok(())
        }
    }
}

async fn expect_text_step(client: &Client, step: &ExpectTextStep, present: bool) -> Result<()> {
    let screen = client.screen().await?;
    if screen.contains(&step.text) == present {
        return Ok(());
    }
    let verb = if present { "not found" } else { "unexpectedly present" };
    Err(Tn3270Error::Steps(format!("text {verb}: {}", step.text)))
}

fn timeout(timeout_ms: Option<u64>) -> Option<Duration> {
    timeout_ms.map(Duration::from_millis)
}

fn prepare_artifacts_dir(config: &ArtifactsConfig, trace: bool) -> Result<Option<PathBuf>> {
    if config.mode == ArtifactMode::Off && !trace {
        return Ok(None);
    }

    let base_dir = config.base_dir();
    let run_dir = base_dir.join(Local::now().format("%Y%m%d-%H%M%S").to_string());
    fs::create_dir_all(&run_dir)?;
    Ok(Some(run_dir))
}

async fn capture_artifacts(
    client: &Client,
    dir: &Path,
    step_index: usize,
    label: &str,
) -> Result<()> {
    let screen = client.screen().await?;

    let base = format!("{label}-{step_index:03}");
    output::write_screen(&dir.join(format!("{base}-screen.txt")), &screen.text()).await?;
    output::write_screen(&dir.join(format!("{base}-screen.json")), &screen.to_json()?).await?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct TraceEntry {
    step: usize,
    action: &'static str,
    duration_ms: u128,
    before_hash: Option<u64>,
    after_hash: Option<u64>,
    error: Option<String>,
}

impl TraceEntry {
    fn new(
        step: usize,
        action_step: &Step,
        duration: Duration,
        before: Option<u64>,
        after: Option<u64>,
        error: Option<&Tn3270Error>,
    ) -> Self {
        Self {
            step,
            action: action_step.label(),
            duration_ms: duration.as_millis(),
            before_hash: before,
            after_hash: after,
            error: error.map(|e| e.to_string()),
        }
    }
}

/// Hash of the current screen; `None` when the screen cannot be read
/// (for example before the first connect).
async fn capture_trace_snapshot(client: &Client) -> Option<u64> {
    let text = client.screen_text().await.ok()?;
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    Some(hasher.finish())
}

fn write_trace(dir: &Path, trace: &[TraceEntry]) -> Result<()> {
    let path = dir.join("trace.json");
    let json = serde_json::to_string_pretty(trace)?;
    fs::write(path, json)?;
    Ok(())
}
