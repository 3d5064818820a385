//! Command handlers behind the `gx` binary
//!
//! Handlers return the text to print so they can be exercised without a
//! terminal. Registry and scanner are passed in by the caller.

use std::cmp::Ordering;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::OutputOptions;
use crate::graph::DependencyGraph;
use crate::parser::{GoModParser, ModFile, ModWriter, Parser};
use crate::report::audit::{AuditReport, filter_by_severity, render_audit};
use crate::report::outdated::render_outdated;
use crate::report::{
    OutdatedOptions, OutdatedPackage, Scanner, TreeOptions, check_outdated, render_paths,
    render_tree,
};
use crate::toolchain::{GoTool, ToolError};
use crate::version::registry::ModuleRegistry;
use crate::version::semver::{UpdateKind, cmp_go_versions, is_pseudo_version, parse_go_version};

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub modfile: PathBuf,
    pub output: OutputOptions,
    /// Depth limit for registry-backed graph expansion
    pub max_depth: usize,
    pub cancel: CancellationToken,
}

impl CommandContext {
    fn load_manifest(&self) -> anyhow::Result<ModFile> {
        GoModParser::new()
            .parse_file(&self.modfile)
            .with_context(|| format!("parsing {}", self.modfile.display()))
    }

    /// Directory containing the go.mod file
    fn module_dir(&self) -> &Path {
        self.modfile
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    async fn graph(&self, registry: Option<&dyn ModuleRegistry>) -> anyhow::Result<DependencyGraph> {
        let manifest = self.load_manifest()?;
        let graph = match registry {
            Some(registry) => {
                DependencyGraph::build_with_registry_depth(
                    &manifest,
                    registry,
                    self.max_depth,
                    &self.cancel,
                )
                .await
            }
            None => DependencyGraph::build(&manifest),
        };
        if self.cancel.is_cancelled() {
            bail!("cancelled");
        }
        info!("Built dependency graph with {} module(s)", graph.len());
        Ok(graph)
    }
}

/// `gx outdated`
pub async fn outdated(
    ctx: &CommandContext,
    registry: &dyn ModuleRegistry,
    options: OutdatedOptions,
) -> anyhow::Result<String> {
    let manifest = ctx.load_manifest()?;
    if manifest.requires.is_empty() {
        return Ok(if ctx.output.quiet {
            String::new()
        } else {
            "No dependencies found\n".to_string()
        });
    }

    let packages = check_outdated(registry, &manifest.requires, options, &ctx.cancel)
        .await
        .context("fetching latest versions")?;

    if packages.is_empty() && ctx.output.quiet {
        return Ok(String::new());
    }
    let mut out = render_outdated(&packages);
    if ctx.output.verbose {
        out.push_str(&format!(
            "Checked {} requirement(s) of {}\n",
            manifest.requires.len(),
            manifest.module_path
        ));
    }
    Ok(out)
}

/// `gx tree`; expands through the registry when one is given
pub async fn tree(
    ctx: &CommandContext,
    registry: Option<&dyn ModuleRegistry>,
    options: &TreeOptions,
) -> anyhow::Result<String> {
    let graph = ctx.graph(registry).await?;
    let mut out = render_tree(&graph, options);
    if ctx.output.verbose {
        out.push_str(&format!("\n{} module(s) in graph\n", graph.len()));
    }
    Ok(out)
}

/// `gx why <module>`
pub async fn why(
    ctx: &CommandContext,
    registry: Option<&dyn ModuleRegistry>,
    module: &str,
) -> anyhow::Result<String> {
    let graph = ctx.graph(registry).await?;
    let paths = graph.find_paths(module);
    if paths.is_empty() {
        match graph.find_node(module) {
            Some(node) => bail!(
                "{}@{} is required only indirectly; rerun with --remote to trace it",
                node.path,
                node.version
            ),
            None => bail!("{} is not in the dependency graph", module),
        }
    }

    let mut out = String::new();
    if !ctx.output.quiet {
        out.push_str(&format!("{} path(s) to {}:\n", paths.len(), module));
    }
    out.push_str(&render_paths(&paths));
    Ok(out)
}

/// `gx audit`
pub async fn audit(
    ctx: &CommandContext,
    scanner: &Scanner,
    severities: &[String],
    json: bool,
) -> anyhow::Result<String> {
    let result = scanner
        .scan(ctx.module_dir(), &ctx.cancel)
        .await
        .context("scanning module")?;
    let vulns = filter_by_severity(result.vulnerabilities, severities);

    if json {
        let report = AuditReport {
            total_scanned: result.total_scanned,
            total_vulnerabilities: vulns.len(),
            vulnerabilities: &vulns,
        };
        let mut out = serde_json::to_string_pretty(&report).context("encoding report")?;
        out.push('\n');
        return Ok(out);
    }

    if vulns.is_empty() && ctx.output.quiet {
        return Ok(String::new());
    }
    Ok(render_audit(&vulns))
}

/// `gx versions <module>`: known versions, newest first
pub async fn versions(
    ctx: &CommandContext,
    registry: &dyn ModuleRegistry,
    module: &str,
) -> anyhow::Result<String> {
    let mut versions: Vec<String> = registry
        .versions(module, &ctx.cancel)
        .await
        .with_context(|| format!("listing versions of {}", module))?
        .into_iter()
        .filter(|version| !version.is_empty())
        .collect();

    // Modules with only pseudo-versions list nothing; fall back to @latest
    let latest = registry
        .latest(module, &ctx.cancel)
        .await
        .with_context(|| format!("fetching latest version of {}", module))?;
    if versions.is_empty() {
        versions.push(latest.version.clone());
    }

    // Unparsable entries keep their order after the valid ones
    let (mut sorted, invalid): (Vec<String>, Vec<String>) = versions
        .into_iter()
        .partition(|version| parse_go_version(version).is_some());
    sorted.sort_by(|a, b| cmp_go_versions(b, a).unwrap_or(Ordering::Equal));
    sorted.extend(invalid);

    let mut out = String::new();
    for version in &sorted {
        let mut labels = Vec::new();
        if !ctx.output.quiet {
            if *version == latest.version {
                labels.push("latest");
            }
            if is_pseudo_version(version) {
                labels.push("pseudo");
            }
        }
        if labels.is_empty() {
            let _ = writeln!(out, "{}", version);
        } else {
            let _ = writeln!(out, "{} ({})", version, labels.join(", "));
        }
    }
    Ok(out)
}

/// `gx info <module>@<version>`
pub async fn info(
    ctx: &CommandContext,
    registry: &dyn ModuleRegistry,
    module: &str,
    version: &str,
) -> anyhow::Result<String> {
    let info = registry
        .info(module, version, &ctx.cancel)
        .await
        .with_context(|| format!("fetching {}@{}", module, version))?;

    let published = info
        .time
        .map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    Ok(format!("{}@{}\npublished: {}\n", module, info.version, published))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Update every outdated requirement
    pub all: bool,
    /// Requirements to remove
    pub drop: Vec<String>,
    /// Report the changes without touching go.mod
    pub dry_run: bool,
    /// Also apply major version updates
    pub major: bool,
    /// Run `go mod vendor` after `go mod tidy`
    pub vendor: bool,
}

/// `gx update`: rewrites go.mod, then tidies the module with the go tool.
///
/// A failing `go mod tidy` or `go mod vendor` is reported in the output but
/// does not fail the command, since go.mod has already been written.
pub async fn update(
    ctx: &CommandContext,
    registry: &dyn ModuleRegistry,
    go: &GoTool,
    options: &UpdateOptions,
) -> anyhow::Result<String> {
    if !options.all && options.drop.is_empty() {
        bail!("nothing to update; pass --all or --drop <module>");
    }

    let manifest = ctx.load_manifest()?;
    if manifest.requires.is_empty() {
        return Ok("No dependencies found\n".to_string());
    }
    for module in &options.drop {
        if !manifest.has_require(module) {
            bail!("{} is not required by {}", module, ctx.modfile.display());
        }
    }

    let mut selected: Vec<OutdatedPackage> = Vec::new();
    let mut skipped_major = 0;
    if options.all {
        let packages = check_outdated(
            registry,
            &manifest.requires,
            OutdatedOptions::default(),
            &ctx.cancel,
        )
        .await
        .context("fetching latest versions")?;
        for pkg in packages {
            if options.drop.contains(&pkg.name) {
                continue;
            }
            if pkg.update == UpdateKind::Major && !options.major {
                skipped_major += 1;
                continue;
            }
            selected.push(pkg);
        }
    }

    let mut out = String::new();
    if selected.is_empty() && options.drop.is_empty() {
        if skipped_major > 0 {
            let _ = writeln!(
                out,
                "No packages selected for update ({} major update(s) skipped, pass --major)",
                skipped_major
            );
        } else {
            out.push_str("All dependencies are up to date!\n");
        }
        return Ok(out);
    }

    if options.dry_run {
        out.push_str("Would update:\n");
        for pkg in &selected {
            let _ = writeln!(out, "  {}: {} → {}", pkg.name, pkg.current, pkg.latest);
        }
        for module in &options.drop {
            let _ = writeln!(out, "  {}: remove", module);
        }
        return Ok(out);
    }

    let mut writer = ModWriter::open(&ctx.modfile)
        .with_context(|| format!("opening {}", ctx.modfile.display()))?;
    for pkg in &selected {
        writer
            .update_require(&pkg.name, &pkg.latest)
            .with_context(|| format!("updating {}", pkg.name))?;
    }
    for module in &options.drop {
        writer
            .drop_require(module)
            .with_context(|| format!("dropping {}", module))?;
    }
    writer.safe_write().context("writing go.mod")?;
    writer.cleanup_backup().context("removing go.mod backup")?;

    if !selected.is_empty() {
        let _ = writeln!(out, "Updated {} package(s)", selected.len());
    }
    if !options.drop.is_empty() {
        let _ = writeln!(out, "Removed {} requirement(s)", options.drop.len());
    }

    let module_dir = ctx.module_dir();
    if !report_go_step(&mut out, go.mod_tidy(module_dir, &ctx.cancel).await, "go mod tidy")? {
        return Ok(out);
    }
    out.push_str("go.mod and go.sum updated\n");

    if options.vendor
        && report_go_step(&mut out, go.mod_vendor(module_dir, &ctx.cancel).await, "go mod vendor")?
    {
        out.push_str("vendor directory updated\n");
    }
    Ok(out)
}

/// Turns a failed go step into a warning line; cancellation is an error
fn report_go_step(out: &mut String, result: Result<(), ToolError>, step: &str) -> anyhow::Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(err) if err.is_cancelled() => Err(err.into()),
        Err(err) => {
            warn!("{} failed: {}", step, err);
            let _ = writeln!(out, "Warning: {} failed: {}", step, err);
            let _ = writeln!(out, "You may need to run '{}' manually", step);
            Ok(false)
        }
    }
}

/// Splits `module@version`; the version is `None` when absent
pub fn split_module_version(arg: &str) -> (&str, Option<&str>) {
    match arg.rsplit_once('@') {
        Some((module, version)) if !module.is_empty() && !version.is_empty() => {
            (module, Some(version))
        }
        _ => (arg, None),
    }
}
