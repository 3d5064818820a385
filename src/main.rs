use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use gx::commands::{self, CommandContext, UpdateOptions};
use gx::config::{self, Config, OutputOptions};
use gx::logging::{self, LogOptions};
use gx::report::{OutdatedOptions, Scanner, TreeOptions};
use gx::toolchain::GoTool;
use gx::version::{ModuleRegistry, RegistryClient};

#[derive(Parser)]
#[command(name = "gx")]
#[command(version, about = "Dependency intelligence for Go modules")]
struct Cli {
    /// Path to the go.mod file
    #[arg(long, global = true, default_value = "go.mod")]
    modfile: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Also write JSON logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List requirements with newer versions
    Outdated {
        /// Only direct requirements
        #[arg(long = "direct-only", visible_alias = "direct")]
        direct_only: bool,
        /// Only major updates
        #[arg(long = "major-only", visible_alias = "major")]
        major_only: bool,
    },
    /// Rewrite go.mod with newer versions, then run go mod tidy
    Update {
        /// Update every outdated requirement
        #[arg(long)]
        all: bool,
        /// Remove a requirement (repeatable)
        #[arg(long, value_name = "MODULE")]
        drop: Vec<String>,
        /// Show what would change without writing
        #[arg(long)]
        dry_run: bool,
        /// Include major version updates
        #[arg(long)]
        major: bool,
        /// Run go mod vendor after tidy
        #[arg(long)]
        vendor: bool,
    },
    /// Print the dependency tree
    Tree {
        /// Expand transitive requirements through the module proxy
        #[arg(long)]
        remote: bool,
        /// Levels shown below the main module
        #[arg(long)]
        depth: Option<usize>,
        /// Show versions
        #[arg(long)]
        versions: bool,
        /// Print repeated subtrees once
        #[arg(long)]
        prune: bool,
        /// Keep only modules whose path contains this
        #[arg(long)]
        filter: Option<String>,
    },
    /// Show why a module is in the dependency graph
    Why {
        module: String,
        /// Expand transitive requirements through the module proxy
        #[arg(long)]
        remote: bool,
    },
    /// Scan for known vulnerabilities with govulncheck
    Audit {
        /// Only report these severities (repeatable)
        #[arg(long)]
        severity: Vec<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the published versions of a module
    Versions { module: String },
    /// Show metadata of module@version
    Info { module: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    let output = OutputOptions::resolve(&config, cli.verbose, cli.quiet);
    let log_file = cli
        .log_file
        .clone()
        .or_else(|| config.log_to_file.then(config::log_path));
    let _guard = logging::init(&LogOptions {
        verbose: output.verbose,
        file: log_file,
    })?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli, config, output))
}

async fn run(cli: Cli, config: Config, output: OutputOptions) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let ctx = CommandContext {
        modfile: cli.modfile,
        output,
        max_depth: config.max_depth,
        cancel: cancel.clone(),
    };

    let task = execute(cli.command, &ctx, &config);
    let out = tokio::select! {
        out = task => out?,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            anyhow::bail!("interrupted");
        }
    };

    print!("{}", out);
    Ok(())
}

async fn execute(command: Command, ctx: &CommandContext, config: &Config) -> anyhow::Result<String> {
    let client = || {
        RegistryClient::with_options(config.client_options()).context("creating proxy client")
    };

    match command {
        Command::Outdated {
            direct_only,
            major_only,
        } => {
            let client = client()?;
            let options = OutdatedOptions {
                direct_only,
                major_only,
            };
            commands::outdated(ctx, &client, options).await
        }
        Command::Update {
            all,
            drop,
            dry_run,
            major,
            vendor,
        } => {
            let options = UpdateOptions {
                all,
                drop,
                dry_run,
                major,
                vendor,
            };
            commands::update(ctx, &client()?, &GoTool::new(), &options).await
        }
        Command::Tree {
            remote,
            depth,
            versions,
            prune,
            filter,
        } => {
            let client = remote.then(client).transpose()?;
            let options = TreeOptions {
                max_depth: depth,
                show_versions: versions,
                prune,
                pattern: filter,
            };
            commands::tree(ctx, client.as_ref().map(|c| c as &dyn ModuleRegistry), &options).await
        }
        Command::Why { module, remote } => {
            let client = remote.then(client).transpose()?;
            commands::why(ctx, client.as_ref().map(|c| c as &dyn ModuleRegistry), &module).await
        }
        Command::Audit { severity, json } => {
            commands::audit(ctx, &Scanner::new(), &severity, json).await
        }
        Command::Versions { module } => commands::versions(ctx, &client()?, &module).await,
        Command::Info { module } => {
            let (module, version) = commands::split_module_version(&module);
            let version = version.context("expected module@version")?;
            commands::info(ctx, &client()?, module, version).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["gx", "outdated", "--direct-only", "--major-only"])]
    #[case(&["gx", "outdated", "--direct", "--major"])]
    fn outdated_accepts_flag_names_and_aliases(#[case] args: &[&str]) {
        let cli = Cli::try_parse_from(args.iter().copied()).unwrap();

        assert!(matches!(
            cli.command,
            Command::Outdated {
                direct_only: true,
                major_only: true
            }
        ));
    }

    #[test]
    fn update_collects_repeated_drop_flags() {
        let cli = Cli::try_parse_from([
            "gx",
            "update",
            "--drop",
            "example.com/a",
            "--drop",
            "example.com/b",
            "--dry-run",
        ])
        .unwrap();

        match cli.command {
            Command::Update {
                all,
                drop,
                dry_run,
                major,
                vendor,
            } => {
                assert!(!all && dry_run && !major && !vendor);
                assert_eq!(drop, vec!["example.com/a", "example.com/b"]);
            }
            _ => panic!("expected update command"),
        }
    }
}
