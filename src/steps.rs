//! Step files: a YAML or JSON script of client actions.
//!
//! ```yaml
//! session:
//!   host: localhost
//!   port: 2023
//! steps:
//!   - waitForField: {}
//!   - waitForText: { text: "Userid" }
//!   - type: { text: "IBMUSER" }
//!   - press: { key: tab }
//!   - sendCommand: { text: "SYS1" }
//!   - expectText: { text: "MAIN MENU" }
//!   - screenshot: { name: menu }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::client::{Client, ClientBuilder};
use crate::error::{Result, Tn3270Error};

/// A parsed step file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepsFile {
    #[serde(default)]
    pub session: Option<SessionConfig>,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
}

impl StepsFile {
    /// Load from disk; the extension picks the format, falling back to trying both.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Tn3270Error::Steps(format!("failed to read steps file: {e}")))?;

        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        if ext == "json" {
            serde_json::from_str(&contents).map_err(Tn3270Error::Json)
        } else if ext == "yaml" || ext == "yml" {
            Self::from_yaml(&contents)
        } else {
            serde_json::from_str(&contents)
                .or_else(|_| serde_yaml::from_str(&contents))
                .map_err(|e| Tn3270Error::Steps(format!("steps parse error: {e}")))
        }
    }

    /// Parse YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).map_err(|e| Tn3270Error::Steps(format!("yaml error: {e}")))
    }
}

/// Emulator and host settings for a step run.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Emulator executable; defaults to `s3270`.
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Host to connect to before the first step.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "SessionConfig::default_port")]
    pub port: i64,
    /// Connect timeout in seconds.
    #[serde(default)]
    pub connect_timeout: Option<i64>,
    #[serde(default)]
    pub command_timeout_ms: Option<u64>,
}

impl SessionConfig {
    fn default_port() -> i64 {
        23
    }

    /// Builder pre-populated from this configuration.
    pub fn client_builder(&self) -> ClientBuilder {
        let mut builder = Client::builder();
        if let Some(program) = &self.program {
            builder = builder.program(program);
        }
        for arg in &self.args {
            builder = builder.arg(arg);
        }
        for (key, value) in &self.env {
            builder = builder.env(key, value);
        }
        if let Some(ms) = self.command_timeout_ms {
            builder = builder.command_timeout(Duration::from_millis(ms));
        }
        builder
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactsConfig {
    #[serde(default)]
    pub mode: ArtifactMode,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            mode: ArtifactMode::OnFailure,
            dir: None,
        }
    }
}

impl ArtifactsConfig {
    pub fn base_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("tn3270wright-artifacts"))
    }
}

/// When to capture the screen into the artifacts directory.
#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactMode {
    #[default]
    OnFailure,
    Always,
    Off,
}

/// One scripted action. Each variant is a single-key map in the file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Connect {
        connect: ConnectStep,
    },
    Disconnect {
        disconnect: EmptyStep,
    },
    Type {
        #[serde(rename = "type")]
        r#type: TypeStep,
    },
    Press {
        press: PressStep,
    },
    MoveTo {
        #[serde(rename = "moveTo")]
        move_to: MoveToStep,
    },
    SendCommand {
        #[serde(rename = "sendCommand")]
        send_command: SendCommandStep,
    },
    WaitForField {
        #[serde(rename = "waitForField")]
        wait_for_field: WaitForFieldStep,
    },
    WaitForText {
        #[serde(rename = "waitForText")]
        wait_for_text: TextStep,
    },
    WaitForTextGone {
        #[serde(rename = "waitForTextGone")]
        wait_for_text_gone: TextStep,
    },
    WaitForPattern {
        #[serde(rename = "waitForPattern")]
        wait_for_pattern: PatternStep,
    },
    ExpectText {
        #[serde(rename = "expectText")]
        expect_text: ExpectTextStep,
    },
    NotExpectText {
        #[serde(rename = "notExpectText")]
        not_expect_text: ExpectTextStep,
    },
    Screenshot {
        screenshot: ScreenshotStep,
    },
    Sleep {
        sleep: SleepStep,
    },
}

impl Step {
    /// Name of the step as written in the file.
    pub fn label(&self) -> &'static str {
        match self {
            Step::Connect { .. } => "connect",
            Step::Disconnect { .. } => "disconnect",
            Step::Type { .. } => "type",
            Step::Press { .. } => "press",
            Step::MoveTo { .. } => "moveTo",
            Step::SendCommand { .. } => "sendCommand",
            Step::WaitForField { .. } => "waitForField",
            Step::WaitForText { .. } => "waitForText",
            Step::WaitForTextGone { .. } => "waitForTextGone",
            Step::WaitForPattern { .. } => "waitForPattern",
            Step::ExpectText { .. } => "expectText",
            Step::NotExpectText { .. } => "notExpectText",
            Step::Screenshot { .. } => "screenshot",
            Step::Sleep { .. } => "sleep",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EmptyStep {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectStep {
    pub host: String,
    pub port: i64,
    #[serde(default)]
    pub timeout: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeStep {
    pub text: String,
    /// 1-based row; requires `col`.
    #[serde(default)]
    pub row: Option<i64>,
    #[serde(default)]
    pub col: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressStep {
    pub key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveToStep {
    pub row: i64,
    pub col: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCommandStep {
    pub text: String,
    #[serde(default = "default_true")]
    pub wait: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitForFieldStep {
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStep {
    pub text: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternStep {
    pub pattern: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Immediate check against the current screen, no waiting.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectTextStep {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotStep {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepStep {
    pub ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
session:
  host: simbank
  port: 2023
  commandTimeoutMs: 5000
steps:
  - waitForField: {}
  - waitForText: { text: "Userid", timeoutMs: 2000 }
  - type: { text: "IBMUSER" }
  - type: { text: "SYS1", row: 10, col: 20 }
  - press: { key: pf3 }
  - sendCommand: { text: "BANK", wait: false }
  - expectText: { text: "MAIN MENU" }
  - screenshot: {}
  - disconnect: {}
"#;

    #[test]
    fn test_parse_yaml_script() {
        let file = StepsFile::from_yaml(SCRIPT).unwrap();
        let session = file.session.as_ref().unwrap();
        assert_eq!(session.host.as_deref(), Some("simbank"));
        assert_eq!(session.port, 2023);
        assert_eq!(file.artifacts.mode, ArtifactMode::OnFailure);

        let labels: Vec<_> = file.steps.iter().map(Step::label).collect();
        assert_eq!(
            labels,
            vec![
                "waitForField",
                "waitForText",
                "type",
                "type",
                "press",
                "sendCommand",
                "expectText",
                "screenshot",
                "disconnect"
            ]
        );

        match &file.steps[3] {
            Step::Type { r#type } => {
                assert_eq!(r#type.row, Some(10));
                assert_eq!(r#type.col, Some(20));
            }
            other => panic!("unexpected step: {other:?}"),
        }
        match &file.steps[5] {
            Step::SendCommand { send_command } => assert!(!send_command.wait),
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn test_parse_json_with_defaults() {
        let json = r#"{"steps":[{"sendCommand":{"text":"LOGON"}}],"artifacts":{"mode":"off"}}"#;
        let file: StepsFile = serde_json::from_str(json).unwrap();
        assert!(file.session.is_none());
        assert_eq!(file.artifacts.mode, ArtifactMode::Off);
        match &file.steps[0] {
            Step::SendCommand { send_command } => assert!(send_command.wait),
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.yml");
        fs::write(&path, SCRIPT).unwrap();
        let file = StepsFile::load(&path).unwrap();
        assert_eq!(file.steps.len(), 9);

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "steps: [").unwrap();
        assert!(StepsFile::load(&bad).is_err());
    }

    #[test]
    fn test_session_builder() {
        let session = SessionConfig {
            program: Some("/usr/local/bin/s3270".to_string()),
            args: vec!["-trace".to_string()],
            command_timeout_ms: Some(250),
            ..SessionConfig::default()
        };
        let client = session.client_builder().build();
        assert_eq!(client.config().program, "/usr/local/bin/s3270");
        assert_eq!(client.config().args, vec!["-trace"]);
        assert_eq!(
            client.config().command_timeout,
            Some(Duration::from_millis(250))
        );
    }
}
