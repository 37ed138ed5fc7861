//! Argv-style command specification.

use coursegen_config::PhaseCommand;
use coursegen_model::PlanId;
use coursegen_phase_api::PhaseId;
use std::ffi::OsString;
use tokio::process::Command as TokioCommand;

/// Specification for a phase executor command.
///
/// All process execution goes through this type to ensure argv-style
/// invocation: arguments are discrete `OsString` elements, never a shell
/// string, so plan IDs and phase tokens cross the process boundary without
/// shell interpretation.
///
/// # Example
///
/// ```rust
/// use coursegen_runner::CommandSpec;
///
/// let cmd = CommandSpec::new("coursegen-synth")
///     .arg("plan")
///     .arg("--plan-id")
///     .arg("onboarding-2026");
/// assert_eq!(cmd.args.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// The program to execute.
    pub program: OsString,
    /// Arguments as discrete elements (NOT shell strings).
    pub args: Vec<OsString>,
}

impl CommandSpec {
    /// Create a new `CommandSpec` with the given program.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add a single argument to the command.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Build a spec from a configured phase command template.
    ///
    /// `{plan_id}` and `{phase}` placeholders in each argument are replaced
    /// with the target plan ID and phase token.
    #[must_use]
    pub fn from_template(template: &PhaseCommand, plan_id: &PlanId, phase: PhaseId) -> Self {
        let mut spec = Self::new(&template.command);
        for arg in &template.args {
            let rendered = arg
                .replace("{plan_id}", plan_id.as_str())
                .replace("{phase}", phase.as_str());
            spec = spec.arg(rendered);
        }
        spec
    }

    /// Convert to a tokio command ready for spawning.
    #[must_use]
    pub fn to_tokio_command(&self) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}
