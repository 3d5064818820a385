//! Vulnerability audit backed by `govulncheck -json`
//!
//! The scanner only runs the external tool and reads its event stream.
//! Findings are de-duplicated by (advisory id, package) and grouped by
//! severity for display.

use std::fmt::Write;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const DEFAULT_PROGRAM: &str = "govulncheck";
const UNKNOWN_SEVERITY: &str = "UNKNOWN";
const UNKNOWN_FIX: &str = "unknown";

/// Severities in display order; anything else sorts after them
const SEVERITY_ORDER: &[&str] = &["CRITICAL", "HIGH", "MODERATE", "MEDIUM", "LOW"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vulnerability {
    pub id: String,
    pub package: String,
    pub severity: String,
    pub description: String,
    pub fixed: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub vulnerabilities: Vec<Vulnerability>,
    pub total_scanned: usize,
}

/// JSON document printed by `gx audit --json`
#[derive(Debug, Serialize)]
pub struct AuditReport<'a> {
    pub total_scanned: usize,
    pub total_vulnerabilities: usize,
    pub vulnerabilities: &'a [Vulnerability],
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(
        "{program} not found. Install it with: go install golang.org/x/vuln/cmd/govulncheck@latest"
    )]
    NotInstalled { program: String },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("scan cancelled")]
    Cancelled,
}

#[derive(Debug, Deserialize)]
struct Message {
    osv: Option<Osv>,
}

#[derive(Debug, Deserialize)]
struct Osv {
    id: String,
    #[serde(default)]
    summary: String,
    database_specific: Option<DatabaseSpecific>,
    #[serde(default)]
    affected: Vec<Affected>,
}

#[derive(Debug, Deserialize)]
struct DatabaseSpecific {
    #[serde(default)]
    severity: String,
}

#[derive(Debug, Deserialize)]
struct Affected {
    package: AffectedPackage,
    #[serde(default)]
    ranges: Vec<Range>,
}

#[derive(Debug, Deserialize)]
struct AffectedPackage {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Range {
    #[serde(default)]
    events: Vec<RangeEvent>,
}

#[derive(Debug, Deserialize)]
struct RangeEvent {
    fixed: Option<String>,
}

/// Parses the newline-delimited JSON stream of `govulncheck -json`.
///
/// Blank and undecodable lines are skipped. A later advisory for the same
/// (id, package) replaces the earlier one but keeps its position.
pub fn parse_scan_output(output: &[u8]) -> Vec<Vulnerability> {
    let mut found: IndexMap<(String, String), Vulnerability> = IndexMap::new();

    for line in output.split(|&b| b == b'\n') {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let message: Message = match serde_json::from_slice(line) {
            Ok(message) => message,
            Err(e) => {
                debug!("Skipping undecodable scanner line: {}", e);
                continue;
            }
        };
        let Some(osv) = message.osv else {
            continue;
        };

        let severity = osv
            .database_specific
            .as_ref()
            .map(|db| db.severity.trim())
            .filter(|severity| !severity.is_empty())
            .map(str::to_uppercase)
            .unwrap_or_else(|| UNKNOWN_SEVERITY.to_string());

        for affected in &osv.affected {
            let fixed = affected
                .ranges
                .iter()
                .flat_map(|range| &range.events)
                .find_map(|event| event.fixed.as_deref().filter(|f| !f.is_empty()))
                .unwrap_or(UNKNOWN_FIX);

            let vuln = Vulnerability {
                id: osv.id.clone(),
                package: affected.package.name.clone(),
                severity: severity.clone(),
                description: osv.summary.clone(),
                fixed: fixed.to_string(),
                url: format!("https://pkg.go.dev/vuln/{}", osv.id),
            };
            found.insert((osv.id.clone(), affected.package.name.clone()), vuln);
        }
    }

    found.into_values().collect()
}

/// Keeps vulnerabilities whose severity is listed, ignoring case.
/// An empty list keeps everything.
pub fn filter_by_severity(vulns: Vec<Vulnerability>, severities: &[String]) -> Vec<Vulnerability> {
    if severities.is_empty() {
        return vulns;
    }
    vulns
        .into_iter()
        .filter(|vuln| {
            severities
                .iter()
                .any(|severity| severity.eq_ignore_ascii_case(&vuln.severity))
        })
        .collect()
}

fn severity_rank(severity: &str) -> usize {
    SEVERITY_ORDER
        .iter()
        .position(|&known| known == severity)
        .unwrap_or(SEVERITY_ORDER.len())
}

/// Groups vulnerabilities by severity, most severe first
pub fn group_by_severity(vulns: &[Vulnerability]) -> Vec<(&str, Vec<&Vulnerability>)> {
    let mut groups: IndexMap<&str, Vec<&Vulnerability>> = IndexMap::new();
    for vuln in vulns {
        groups.entry(vuln.severity.as_str()).or_default().push(vuln);
    }
    groups.sort_by(|a, _, b, _| {
        severity_rank(a)
            .cmp(&severity_rank(b))
            .then_with(|| a.cmp(b))
    });
    groups.into_iter().collect()
}

/// Renders findings grouped by severity
pub fn render_audit(vulns: &[Vulnerability]) -> String {
    let mut out = String::new();
    if vulns.is_empty() {
        out.push_str("No vulnerabilities found\n");
        return out;
    }

    for (severity, group) in group_by_severity(vulns) {
        let _ = writeln!(out, "{} ({})", severity, group.len());
        for vuln in group {
            let _ = writeln!(out, "  {}  {}", vuln.id, vuln.package);
            if !vuln.description.is_empty() {
                let _ = writeln!(out, "    {}", vuln.description);
            }
            let _ = writeln!(out, "    fixed in: {}", vuln.fixed);
            let _ = writeln!(out, "    {}", vuln.url);
        }
        out.push('\n');
    }
    let _ = writeln!(out, "Found {} vulnerability(ies)", vulns.len());
    out
}

/// Runs `govulncheck` against a module directory
#[derive(Debug, Clone)]
pub struct Scanner {
    program: PathBuf,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    /// Uses another executable speaking the same JSON protocol
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Scans the packages of the module rooted at `module_dir`.
    ///
    /// The tool exits non-zero when it finds vulnerabilities, so only a
    /// non-zero exit without any output counts as a failure.
    pub async fn scan(
        &self,
        module_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<ScanResult, ScanError> {
        let program = self.program.display().to_string();
        info!("Running {} in {}", program, module_dir.display());

        let mut command = Command::new(&self.program);
        command
            .args(["-json", "./..."])
            .current_dir(module_dir)
            .kill_on_drop(true);

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScanError::Cancelled),
            output = command.output() => output,
        };
        let output = output.map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ScanError::NotInstalled {
                program: program.clone(),
            },
            _ => ScanError::Spawn {
                program: program.clone(),
                source,
            },
        })?;

        if !output.status.success() && output.stdout.is_empty() {
            return Err(ScanError::Failed {
                program,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let vulnerabilities = parse_scan_output(&output.stdout);
        debug!("{} reported {} finding(s)", program, vulnerabilities.len());
        Ok(ScanResult {
            vulnerabilities,
            total_scanned: 1,
        })
    }
}
