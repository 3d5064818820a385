//! Go module version ordering
//!
//! Go versions are semver with a mandatory `v` prefix and two extensions:
//! - `+incompatible` suffix: v2.0.0+incompatible (pre-go.mod v2+ modules)
//! - Pseudo-versions: v0.0.0-20210101000000-abcdef123456

use std::cmp::Ordering;
use std::fmt;

use semver::Version;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    Latest,
    Outdated,
    Newer,
    Invalid,
}

/// Size of the step between a current and a newer version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    None,
    Patch,
    Minor,
    Major,
}

impl UpdateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateKind::None => "none",
            UpdateKind::Patch => "patch",
            UpdateKind::Minor => "minor",
            UpdateKind::Major => "major",
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a Go module version for comparison.
///
/// Handles:
/// - v prefix: v1.2.3 -> 1.2.3
/// - +incompatible suffix: v2.0.0+incompatible -> 2.0.0
pub fn normalize_go_version(version: &str) -> &str {
    let version = version.strip_prefix('v').unwrap_or(version);
    version.strip_suffix("+incompatible").unwrap_or(version)
}

/// Check if a version is a pseudo-version.
///
/// Pseudo-version formats:
/// - v0.0.0-YYYYMMDDHHMMSS-commit (no base version)
/// - vX.Y.Z-0.YYYYMMDDHHMMSS-commit (with base version)
/// - vX.Y.Z-pre.0.YYYYMMDDHHMMSS-commit (with pre-release base)
pub fn is_pseudo_version(version: &str) -> bool {
    pseudo_timestamp(normalize_go_version(version)).is_some()
}

/// Extracts the 14-digit timestamp of a pseudo-version
fn pseudo_timestamp(normalized: &str) -> Option<&str> {
    let (_, rest) = normalized.split_once('-')?;
    let mut parts = rest.rsplitn(3, '-');
    let _commit = parts.next()?;
    let stamped = parts.next()?;

    let timestamp = stamped.rsplit('.').next()?;
    let is_timestamp = timestamp.len() == 14 && timestamp.chars().all(|c| c.is_ascii_digit());
    let has_valid_prefix = stamped == timestamp || stamped.ends_with(&format!("0.{}", timestamp));
    (is_timestamp && has_valid_prefix).then_some(timestamp)
}

/// Parse a Go version into semver::Version
///
/// Pseudo-versions are valid semver pre-releases whose identifiers sort by
/// commit time, so plain semver ordering applies to them as well.
pub fn parse_go_version(version: &str) -> Option<Version> {
    Version::parse(normalize_go_version(version)).ok()
}

/// Orders two Go versions; `None` if either is not a valid version
pub fn cmp_go_versions(a: &str, b: &str) -> Option<Ordering> {
    Some(parse_go_version(a)?.cmp(&parse_go_version(b)?))
}

/// Compare two Go module versions
pub fn compare_go_versions(current: &str, latest: &str) -> CompareResult {
    match cmp_go_versions(current, latest) {
        Some(Ordering::Less) => CompareResult::Outdated,
        Some(Ordering::Greater) => CompareResult::Newer,
        Some(Ordering::Equal) => CompareResult::Latest,
        None => {
            warn!("Invalid Go version format: '{}' or '{}'", current, latest);
            CompareResult::Invalid
        }
    }
}

/// Classify the update from `current` to `latest`.
///
/// Returns [`UpdateKind::None`] when `latest` is not newer or either side is
/// not a valid Go version.
pub fn classify_update(current: &str, latest: &str) -> UpdateKind {
    if compare_go_versions(current, latest) != CompareResult::Outdated {
        return UpdateKind::None;
    }

    let (Some(current_ver), Some(latest_ver)) =
        (parse_go_version(current), parse_go_version(latest))
    else {
        return UpdateKind::None;
    };

    if current_ver.major != latest_ver.major {
        UpdateKind::Major
    } else if current_ver.minor != latest_ver.minor {
        UpdateKind::Minor
    } else {
        UpdateKind::Patch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("v1.0.0", "v1.0.0", CompareResult::Latest)]
    #[case("v1.0.0", "v2.0.0", CompareResult::Outdated)]
    #[case("v2.0.0", "v1.0.0", CompareResult::Newer)]
    #[case("v1.0.0", "v1.0.1", CompareResult::Outdated)]
    // With +incompatible suffix
    #[case("v2.0.0+incompatible", "v3.0.0+incompatible", CompareResult::Outdated)]
    #[case("v2.0.0+incompatible", "v2.0.0", CompareResult::Latest)]
    // Pre-release versions
    #[case("v1.0.0-beta.1", "v1.0.0", CompareResult::Outdated)]
    #[case("v1.0.0-alpha", "v1.0.0-beta", CompareResult::Outdated)]
    // Pseudo-versions
    #[case(
        "v0.0.0-20210101000000-abc123",
        "v0.0.0-20210201000000-def456",
        CompareResult::Outdated
    )]
    #[case(
        "v0.0.0-20210101000000-abc123",
        "v0.0.0-20210101000000-abc123",
        CompareResult::Latest
    )]
    // A pseudo-version precedes the release it is based on
    #[case("v1.2.3-0.20240916144458-20a13a1f6b7c", "v1.2.3", CompareResult::Outdated)]
    #[case("v1.2.2", "v1.2.3-0.20240916144458-20a13a1f6b7c", CompareResult::Outdated)]
    #[case("invalid", "v1.0.0", CompareResult::Invalid)]
    fn compare_go_versions_returns_expected(
        #[case] current: &str,
        #[case] latest: &str,
        #[case] expected: CompareResult,
    ) {
        assert_eq!(compare_go_versions(current, latest), expected);
    }

    #[rstest]
    #[case("v1.2.3", "v1.2.3", UpdateKind::None)]
    #[case("v1.2.3", "v1.2.2", UpdateKind::None)]
    #[case("v1.2.3", "v1.2.4", UpdateKind::Patch)]
    #[case("v1.2.3", "v1.3.0", UpdateKind::Minor)]
    #[case("v1.2.3", "v2.0.0", UpdateKind::Major)]
    #[case("v0.14.0", "v0.15.0", UpdateKind::Minor)]
    #[case("v1.0.0-rc.1", "v1.0.0", UpdateKind::Patch)]
    #[case("v0.0.0-20210101000000-abc123", "v0.1.0", UpdateKind::Minor)]
    #[case("v2.0.0+incompatible", "v3.1.0+incompatible", UpdateKind::Major)]
    #[case("garbage", "v1.0.0", UpdateKind::None)]
    fn classify_update_returns_expected(
        #[case] current: &str,
        #[case] latest: &str,
        #[case] expected: UpdateKind,
    ) {
        assert_eq!(classify_update(current, latest), expected);
    }

    #[rstest]
    // Pseudo-versions without base version
    #[case("v0.0.0-20210101000000-abc123", true)]
    #[case("v0.0.0-20240916144458-20a13a1f6b7c", true)]
    // Pseudo-versions with base version
    #[case("v1.1.3-0.20240916144458-20a13a1f6b7c", true)]
    #[case("v1.2.0-rc.1.0.20240916144458-20a13a1f6b7c", true)]
    // Regular versions (not pseudo)
    #[case("v1.0.0", false)]
    #[case("v1.0.0-beta.1", false)]
    #[case("v2.0.0+incompatible", false)]
    fn is_pseudo_version_returns_expected(#[case] version: &str, #[case] expected: bool) {
        assert_eq!(is_pseudo_version(version), expected);
    }

    #[test]
    fn normalize_go_version_strips_prefix_and_suffix() {
        assert_eq!(normalize_go_version("v1.0.0"), "1.0.0");
        assert_eq!(normalize_go_version("v2.0.0+incompatible"), "2.0.0");
        assert_eq!(normalize_go_version("1.0.0"), "1.0.0");
    }
}
