use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::trace;

/// A fully described external process launch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Text piped to the child's standard input, which is closed afterwards.
    pub stdin: Option<String>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn stdin(mut self, text: impl Into<String>) -> Self {
        self.stdin = Some(text.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs external processes to completion.
///
/// Implementations must be shareable across worker threads; the solver invokers hold one
/// by reference while cases run in parallel.
pub trait ProcessRunner: Send + Sync {
    /// Runs `spec` and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns an error only if the process could not be spawned or waited on. A nonzero
    /// exit status is reported through [`ProcessOutput::exit_code`].
    fn run(&self, spec: &ProcessSpec) -> io::Result<ProcessOutput>;
}

/// Runs processes with [`std::process::Command`], capturing both output streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, spec: &ProcessSpec) -> io::Result<ProcessOutput> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        trace!(program = %spec.program, args = ?spec.args, "Spawning process.");
        let mut child = cmd.spawn()?;
        if let (Some(text), Some(mut stdin)) = (&spec.stdin, child.stdin.take()) {
            // A solver that exits before reading all input closes the pipe; its
            // output still decides the outcome.
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                trace!(error = %e, "Child closed stdin early.");
            }
        }
        let output = child.wait_with_output()?;

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
