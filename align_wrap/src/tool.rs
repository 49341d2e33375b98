//! External aligners, run as opaque subprocesses.

use std::io;
use std::path::Path;
use std::process::Command;

pub const CELLRANGER: &str = "cellranger";

/// Exit status and interleaved stdout/stderr of a finished tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub output: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Something that can be run with arguments in a working directory.
pub trait ExternalTool {
    fn name(&self) -> &str;

    /// Run to completion. An `Err` means the tool could not be started at all.
    fn run(&self, args: &[String], cwd: &Path) -> io::Result<ToolOutput>;
}

/// A program on the PATH, or at an explicit path.
#[derive(Debug, Clone)]
pub struct Subprocess {
    program: String,
}

impl Subprocess {
    pub fn new(program: &str) -> Self {
        Subprocess {
            program: program.to_string(),
        }
    }
}

impl ExternalTool for Subprocess {
    fn name(&self) -> &str {
        &self.program
    }

    fn run(&self, args: &[String], cwd: &Path) -> io::Result<ToolOutput> {
        let out = Command::new(&self.program)
            .args(args)
            .current_dir(cwd)
            .output()?;
        Ok(ToolOutput {
            exit_code: out.status.code(),
            output: format!(
                "{}{}",
                String::from_utf8_lossy(&out.stdout),
                String::from_utf8_lossy(&out.stderr)
            ),
        })
    }
}
