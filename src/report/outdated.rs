//! Outdated dependency report
//!
//! Queries the latest version of every requirement concurrently and keeps
//! those that can be updated.

use std::fmt::Write;

use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::parser::Requirement;
use crate::version::error::RegistryError;
use crate::version::registry::ModuleRegistry;
use crate::version::semver::{UpdateKind, classify_update};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutdatedOptions {
    /// Skip requirements marked `// indirect`
    pub direct_only: bool,
    /// Keep only major updates
    pub major_only: bool,
}

/// A requirement with a newer version available
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutdatedPackage {
    pub name: String,
    pub current: String,
    pub latest: String,
    pub update: UpdateKind,
    pub direct: bool,
}

/// Number of outdated packages per update kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub major: usize,
    pub minor: usize,
    pub patch: usize,
}

impl Summary {
    pub fn from_packages(packages: &[OutdatedPackage]) -> Self {
        packages.iter().fold(Self::default(), |mut summary, pkg| {
            summary.total += 1;
            match pkg.update {
                UpdateKind::Major => summary.major += 1,
                UpdateKind::Minor => summary.minor += 1,
                UpdateKind::Patch => summary.patch += 1,
                UpdateKind::None => {}
            }
            summary
        })
    }
}

/// Returns the requirements that have a newer version, in input order.
///
/// Lookups run concurrently, bounded by the registry's own limit. A failed
/// lookup drops that requirement from the report; cancellation aborts the
/// whole report.
pub async fn check_outdated(
    registry: &dyn ModuleRegistry,
    requires: &[Requirement],
    options: OutdatedOptions,
    cancel: &CancellationToken,
) -> Result<Vec<OutdatedPackage>, RegistryError> {
    let selected: Vec<&Requirement> = requires
        .iter()
        .filter(|req| !options.direct_only || !req.indirect)
        .collect();

    let lookups = selected
        .iter()
        .map(|req| async move { (*req, registry.latest(&req.path, cancel).await) });
    let results = join_all(lookups).await;

    let mut packages = Vec::new();
    for (req, result) in results {
        let latest = match result {
            Ok(info) => info.version,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!("Failed to fetch latest version of {}: {}", req.path, e);
                continue;
            }
        };

        let update = classify_update(&req.version, &latest);
        if update == UpdateKind::None {
            debug!("{} is up to date at {}", req.path, req.version);
            continue;
        }
        if options.major_only && update != UpdateKind::Major {
            continue;
        }

        packages.push(OutdatedPackage {
            name: req.path.clone(),
            current: req.version.clone(),
            latest,
            update,
            direct: !req.indirect,
        });
    }

    Ok(packages)
}

/// Renders the report as plain-text tables grouped by directness
pub fn render_outdated(packages: &[OutdatedPackage]) -> String {
    let mut out = String::new();
    if packages.is_empty() {
        out.push_str("All packages are up to date!\n");
        return out;
    }

    let (direct, indirect): (Vec<_>, Vec<_>) = packages.iter().partition(|pkg| pkg.direct);
    if !direct.is_empty() {
        out.push_str("Direct dependencies\n\n");
        render_table(&mut out, &direct);
    }
    if !indirect.is_empty() {
        if !direct.is_empty() {
            out.push('\n');
        }
        out.push_str("Indirect dependencies\n\n");
        render_table(&mut out, &indirect);
    }

    let summary = Summary::from_packages(packages);
    let mut parts = Vec::new();
    for (count, label) in [
        (summary.major, "major"),
        (summary.minor, "minor"),
        (summary.patch, "patch"),
    ] {
        if count > 0 {
            parts.push(format!("{} {}", count, label));
        }
    }
    let _ = writeln!(
        out,
        "\nSummary: {} package(s) can be updated ({})",
        summary.total,
        parts.join(", ")
    );
    out
}

fn render_table(out: &mut String, packages: &[&OutdatedPackage]) {
    let name_width = packages
        .iter()
        .map(|pkg| pkg.name.len())
        .chain(["PACKAGE".len()])
        .max()
        .unwrap_or_default();
    let current_width = packages
        .iter()
        .map(|pkg| pkg.current.len())
        .chain(["CURRENT".len()])
        .max()
        .unwrap_or_default();
    let latest_width = packages
        .iter()
        .map(|pkg| pkg.latest.len())
        .chain(["LATEST".len()])
        .max()
        .unwrap_or_default();

    let _ = writeln!(
        out,
        "{:<name_width$}  {:<current_width$}  {:<latest_width$}  TYPE",
        "PACKAGE", "CURRENT", "LATEST"
    );
    for pkg in packages {
        let _ = writeln!(
            out,
            "{:<name_width$}  {:<current_width$}  {:<latest_width$}  {}",
            pkg.name, pkg.current, pkg.latest, pkg.update
        );
    }
}
