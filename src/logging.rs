//! Tracing subscriber setup for the gx binary

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Environment variable holding an `EnvFilter` directive
pub const ENV_LOG: &str = "GX_LOG";

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub verbose: bool,
    /// JSON log file written in addition to stderr
    pub file: Option<PathBuf>,
}

/// Default filter when `GX_LOG` is unset
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "gx=debug" } else { "warn" }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Installs the global subscriber.
///
/// The returned guard flushes the log file on drop and must be held until
/// the process exits.
pub fn init(options: &LogOptions) -> anyhow::Result<Option<WorkerGuard>> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter(options.verbose));

    let (file_layer, guard) = match &options.file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(path)?);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(env_filter(true));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

fn file_appender(path: &Path) -> anyhow::Result<tracing_appender::rolling::RollingFileAppender> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("log file path has no file name: {}", path.display()))?;

    std::fs::create_dir_all(dir)?;
    Ok(tracing_appender::rolling::never(dir, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directive_raises_level_when_verbose() {
        assert_eq!(default_directive(false), "warn");
        assert_eq!(default_directive(true), "gx=debug");
    }

    #[test]
    fn file_appender_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gx.log");

        file_appender(&path).unwrap();

        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn file_appender_rejects_path_without_file_name() {
        assert!(file_appender(Path::new("/")).is_err());
    }
}
