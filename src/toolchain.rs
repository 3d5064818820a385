//! Runs the `go` command after go.mod edits

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const DEFAULT_PROGRAM: &str = "go";

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{program} not found in PATH")]
    NotInstalled { program: String },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{command} failed ({status}): {output}")]
    Failed {
        command: String,
        status: ExitStatus,
        output: String,
    },

    #[error("{command} cancelled")]
    Cancelled { command: String },
}

impl ToolError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ToolError::Cancelled { .. })
    }
}

/// The Go toolchain binary
#[derive(Debug, Clone)]
pub struct GoTool {
    program: PathBuf,
}

impl Default for GoTool {
    fn default() -> Self {
        Self::new()
    }
}

impl GoTool {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Runs `go <args>` inside `module_dir`
    pub async fn run(
        &self,
        module_dir: &Path,
        args: &[&str],
        cancel: &CancellationToken,
    ) -> Result<(), ToolError> {
        let program = self.program.display().to_string();
        let command_line = format!("{} {}", program, args.join(" "));
        info!("Running {} in {}", command_line, module_dir.display());

        let mut command = Command::new(&self.program);
        command
            .args(args)
            .current_dir(module_dir)
            .kill_on_drop(true);

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ToolError::Cancelled { command: command_line }),
            output = command.output() => output,
        };
        let output = output.map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ToolError::NotInstalled {
                program: program.clone(),
            },
            _ => ToolError::Spawn {
                program: program.clone(),
                source,
            },
        })?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(ToolError::Failed {
                command: command_line,
                status: output.status,
                output: combined.trim().to_string(),
            });
        }

        debug!("{} finished", command_line);
        Ok(())
    }

    pub async fn mod_tidy(&self, module_dir: &Path, cancel: &CancellationToken) -> Result<(), ToolError> {
        self.run(module_dir, &["mod", "tidy"], cancel).await
    }

    pub async fn mod_vendor(&self, module_dir: &Path, cancel: &CancellationToken) -> Result<(), ToolError> {
        self.run(module_dir, &["mod", "vendor"], cancel).await
    }
}
