//! External command execution
//!
//! The [`CommandRunner`] trait is the seam between provisioning logic and the
//! outside world. [`SystemRunner`] runs real processes with inherited stdio so
//! the operator sees the tool's output live; [`mock::MockRunner`] records
//! invocations and simulates their filesystem effects for tests.

use crate::errors::{CommandError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, instrument};

/// A fully resolved command line plus the directory it runs in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    /// Build from a configured argv; the first element is the program
    pub fn from_argv(argv: &[String], cwd: &Path, purpose: &str) -> Result<Self> {
        let (program, args) = argv.split_first().ok_or_else(|| CommandError::EmptyCommand {
            purpose: purpose.to_string(),
        })?;
        let mut spec = Self::new(program.clone(), cwd);
        spec.args = args.to_vec();
        Ok(spec)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Shell-quoted rendering used in logs and error messages
    pub fn display_line(&self) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(self.program.as_str());
        words.extend(self.args.iter().map(String::as_str));
        shell_words::join(words)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_line())
    }
}

/// Runs external commands to completion
pub trait CommandRunner {
    /// Run `spec`, returning `Ok(())` only on a zero exit status
    fn run(&self, spec: &CommandSpec) -> Result<()>;
}

/// Runs real processes, streaming their output to the terminal
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    #[instrument(skip(self, spec), fields(command = %spec))]
    fn run(&self, spec: &CommandSpec) -> Result<()> {
        info!("Running: {}", spec);
        debug!("Working directory: {}", spec.cwd.display());

        let status = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .status()
            .map_err(|e| CommandError::Spawn {
                command: spec.display_line(),
                source: e,
            })?;

        if status.success() {
            debug!("Command succeeded: {}", spec);
            Ok(())
        } else {
            Err(CommandError::Failed {
                command: spec.display_line(),
                code: status.code(),
            }
            .into())
        }
    }
}

pub mod mock {
    //! Mock command runner for testing provisioning flows
    //!
    //! Responses are matched by command-line prefix (for example `"git pull"`).
    //! A response can fail the command and/or apply a filesystem effect in the
    //! command's working directory, which is how tests simulate a clone or a
    //! package install without git or npm.

    use super::{CommandRunner, CommandSpec};
    use crate::errors::{CommandError, Result};
    use std::fmt;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tracing::debug;

    type Effect = Arc<dyn Fn(&Path) -> std::io::Result<()> + Send + Sync>;

    /// Configured behavior for commands matching a prefix
    #[derive(Clone)]
    pub struct MockResponse {
        /// Exit code to report; zero means success
        pub exit_code: i32,
        effect: Option<Effect>,
    }

    impl MockResponse {
        pub fn success() -> Self {
            Self {
                exit_code: 0,
                effect: None,
            }
        }

        pub fn failure(exit_code: i32) -> Self {
            Self {
                exit_code,
                effect: None,
            }
        }

        /// Apply `effect` in the command's working directory before reporting
        pub fn with_effect<F>(mut self, effect: F) -> Self
        where
            F: Fn(&Path) -> std::io::Result<()> + Send + Sync + 'static,
        {
            self.effect = Some(Arc::new(effect));
            self
        }
    }

    impl fmt::Debug for MockResponse {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("MockResponse")
                .field("exit_code", &self.exit_code)
                .field("has_effect", &self.effect.is_some())
                .finish()
        }
    }

    /// Records every command it is asked to run
    #[derive(Debug, Clone, Default)]
    pub struct MockRunner {
        responses: Arc<Mutex<Vec<(String, MockResponse)>>>,
        history: Arc<Mutex<Vec<CommandSpec>>>,
    }

    impl MockRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a response for command lines starting with `prefix`.
        /// Later registrations win over earlier ones.
        pub fn respond(self, prefix: &str, response: MockResponse) -> Self {
            if let Ok(mut responses) = self.responses.lock() {
                responses.push((prefix.to_string(), response));
            }
            self
        }

        /// Command lines run so far, in order
        pub fn history(&self) -> Vec<String> {
            self.history
                .lock()
                .map(|h| h.iter().map(CommandSpec::display_line).collect())
                .unwrap_or_default()
        }

        /// Whether any recorded command line starts with `prefix`
        pub fn ran(&self, prefix: &str) -> bool {
            self.history().iter().any(|line| line.starts_with(prefix))
        }

        fn response_for(&self, line: &str) -> MockResponse {
            self.responses
                .lock()
                .ok()
                .and_then(|responses| {
                    responses
                        .iter()
                        .rev()
                        .find(|(prefix, _)| line.starts_with(prefix.as_str()))
                        .map(|(_, response)| response.clone())
                })
                .unwrap_or_else(MockResponse::success)
        }
    }

    impl CommandRunner for MockRunner {
        fn run(&self, spec: &CommandSpec) -> Result<()> {
            let line = spec.display_line();
            debug!("Mock run: {}", line);
            if let Ok(mut history) = self.history.lock() {
                history.push(spec.clone());
            }

            let response = self.response_for(&line);
            if let Some(effect) = &response.effect {
                effect(&spec.cwd).map_err(|e| CommandError::Spawn {
                    command: line.clone(),
                    source: e,
                })?;
            }

            if response.exit_code == 0 {
                Ok(())
            } else {
                Err(CommandError::Failed {
                    command: line,
                    code: Some(response.exit_code),
                }
                .into())
            }
        }
    }
}
