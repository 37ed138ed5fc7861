//! Configuration management for coursegen.
//!
//! Hierarchical configuration with discovery and precedence:
//! explicit path > `$COURSEGEN_HOME/config.toml` > built-in defaults.
//! The file is TOML with an `[engine]` section and one `[phases.<id>]`
//! table per phase executor command.
//!
//! ```toml
//! [engine]
//! stall_timeout_secs = 300
//!
//! [phases.master_plan]
//! command = "coursegen-synth"
//! args = ["plan", "--plan-id", "{plan_id}"]
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use coursegen_phase_api::PhaseId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Default stall timeout for repair runs, in seconds.
pub const DEFAULT_STALL_TIMEOUT_SECS: u64 = 300;

/// Minimum accepted stall timeout, in seconds.
pub const MIN_STALL_TIMEOUT_SECS: u64 = 1;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Failed to parse config file '{path}': {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("Invalid config: {reason}")]
    Invalid { reason: String },
}

/// Command template for one phase executor.
///
/// `{plan_id}` and `{phase}` placeholders in `args` are substituted at
/// invocation time. The program and arguments are argv elements, never a
/// shell string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PhaseCommand {
    /// Program to execute.
    pub command: String,
    /// Arguments as discrete elements.
    #[serde(default)]
    pub args: Vec<String>,
}

/// `[engine]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSection {
    /// Seconds without run progress before a repair is failed as stalled.
    #[serde(default = "default_stall_timeout")]
    pub stall_timeout_secs: u64,
}

fn default_stall_timeout() -> u64 {
    DEFAULT_STALL_TIMEOUT_SECS
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            stall_timeout_secs: DEFAULT_STALL_TIMEOUT_SECS,
        }
    }
}

/// Top-level configuration model.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Engine tuning.
    #[serde(default)]
    pub engine: EngineSection,
    /// Executor command per phase token. Phases without an entry cannot be
    /// repaired through the process-backed executor.
    #[serde(default)]
    pub phases: HashMap<String, PhaseCommand>,
}

impl Config {
    /// Load configuration with discovery.
    ///
    /// `explicit` wins when given; otherwise `<home>/config.toml` is used if
    /// present; otherwise built-in defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when an existing file cannot be read or
    /// parsed, or when validation fails. A missing discovered file is not an
    /// error.
    pub fn discover(
        explicit: Option<&Utf8Path>,
        home: &Utf8Path,
    ) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let discovered = home.join("config.toml");
                if !discovered.as_std_path().exists() {
                    return Ok(Self::default());
                }
                discovered
            }
        };
        Self::load(&path)
    }

    /// Load configuration from an explicit TOML file.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.stall_timeout_secs < MIN_STALL_TIMEOUT_SECS {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "engine.stall_timeout_secs must be at least {MIN_STALL_TIMEOUT_SECS}"
                ),
            });
        }
        for (token, command) in &self.phases {
            if token.parse::<PhaseId>().is_err() {
                return Err(ConfigError::Invalid {
                    reason: format!("[phases.{token}] does not name a known phase"),
                });
            }
            if command.command.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    reason: format!("[phases.{token}] has an empty command"),
                });
            }
        }
        Ok(())
    }

    /// Stall timeout as a [`Duration`].
    #[must_use]
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_secs(self.engine.stall_timeout_secs)
    }

    /// Executor command for a phase, if configured.
    #[must_use]
    pub fn phase_command(&self, phase: PhaseId) -> Option<&PhaseCommand> {
        self.phases.get(phase.as_str())
    }
}

/// Resolve the coursegen home directory for config discovery.
///
/// Mirrors the store's resolution: `COURSEGEN_HOME` env var, then
/// `.coursegen` in the working directory.
#[must_use]
pub fn coursegen_home() -> Utf8PathBuf {
    if let Ok(home) = std::env::var("COURSEGEN_HOME") {
        return Utf8PathBuf::from(home);
    }
    Utf8PathBuf::from(".coursegen")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("config.toml")).unwrap();
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_defaults_when_no_file_discovered() {
        let dir = tempfile::TempDir::new().unwrap();
        let home = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        let config = Config::discover(None, &home).unwrap();
        assert_eq!(config.engine.stall_timeout_secs, DEFAULT_STALL_TIMEOUT_SECS);
        assert!(config.phases.is_empty());
    }

    #[test]
    fn test_load_full_config() {
        let (_dir, path) = write_config(
            r#"
            [engine]
            stall_timeout_secs = 120

            [phases.master_plan]
            command = "coursegen-synth"
            args = ["plan", "--plan-id", "{plan_id}"]

            [phases.enrichment]
            command = "coursegen-enrich"
            "#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.stall_timeout(), Duration::from_secs(120));

        let master = config.phase_command(PhaseId::MasterPlan).unwrap();
        assert_eq!(master.command, "coursegen-synth");
        assert_eq!(master.args, vec!["plan", "--plan-id", "{plan_id}"]);

        let enrich = config.phase_command(PhaseId::Enrichment).unwrap();
        assert!(enrich.args.is_empty());

        assert!(config.phase_command(PhaseId::LessonGeneration).is_none());
    }

    #[test]
    fn test_explicit_path_wins_over_discovery() {
        let (_dir, path) = write_config("[engine]\nstall_timeout_secs = 42\n");
        let other_home = Utf8PathBuf::from("/nonexistent-home");

        let config = Config::discover(Some(path.as_path()), &other_home).unwrap();
        assert_eq!(config.engine.stall_timeout_secs, 42);
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let result = Config::load(Utf8Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::ReadFailed { .. })));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let (_dir, path) = write_config("[engine\nstall_timeout_secs = ");
        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::ParseFailed { .. })));
    }

    #[test]
    fn test_unknown_phase_table_rejected() {
        let (_dir, path) = write_config(
            "[phases.transcoding]\ncommand = \"ffmpeg\"\n",
        );
        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_zero_stall_timeout_rejected() {
        let (_dir, path) = write_config("[engine]\nstall_timeout_secs = 0\n");
        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_empty_command_rejected() {
        let (_dir, path) = write_config("[phases.enrichment]\ncommand = \"  \"\n");
        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }
}
