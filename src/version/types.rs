//! Common types shared by the registry client and its cache

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata of one module version as served by `@latest` and `@v/{version}.info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "Version")]
    pub version: String,
    /// Publication time; some proxies omit it for pseudo-versions
    #[serde(rename = "Time", default)]
    pub time: Option<DateTime<Utc>>,
}

impl VersionInfo {
    pub fn new(version: impl Into<String>, time: Option<DateTime<Utc>>) -> Self {
        Self {
            version: version.into(),
            time,
        }
    }
}

/// A cached proxy response, tagged with the kind of endpoint it came from
///
/// Keys of different kinds never collide (`@latest`, `@list`, `@{version}`,
/// `@{version}.mod`), but reads still check the tag and treat a mismatch as a
/// miss instead of reinterpreting the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedResponse {
    Info(VersionInfo),
    VersionList(Vec<String>),
    Manifest(Arc<[u8]>),
}

impl CachedResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            CachedResponse::Info(_) => "info",
            CachedResponse::VersionList(_) => "list",
            CachedResponse::Manifest(_) => "manifest",
        }
    }

    pub fn into_info(self) -> Option<VersionInfo> {
        match self {
            CachedResponse::Info(info) => Some(info),
            _ => None,
        }
    }

    pub fn into_version_list(self) -> Option<Vec<String>> {
        match self {
            CachedResponse::VersionList(versions) => Some(versions),
            _ => None,
        }
    }

    pub fn into_manifest(self) -> Option<Arc<[u8]>> {
        match self {
            CachedResponse::Manifest(data) => Some(data),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn version_info_deserializes_proxy_json() {
        let info: VersionInfo =
            serde_json::from_str(r#"{"Version":"v2.0.0","Time":"2024-01-01T00:00:00Z"}"#).unwrap();

        assert_eq!(
            info,
            VersionInfo::new(
                "v2.0.0",
                Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            )
        );
    }

    #[test]
    fn version_info_tolerates_missing_time() {
        let info: VersionInfo = serde_json::from_str(r#"{"Version":"v0.1.0"}"#).unwrap();

        assert_eq!(info.version, "v0.1.0");
        assert_eq!(info.time, None);
    }

    #[test]
    fn version_info_serializes_with_proxy_field_names() {
        let info = VersionInfo::new(
            "v1.2.3",
            Some(Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap()),
        );

        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["Version"], "v1.2.3");
        assert_eq!(json["Time"], "2023-06-01T12:00:00Z");
    }

    #[test]
    fn cached_response_accessors_reject_other_kinds() {
        let list = CachedResponse::VersionList(vec!["v1.0.0".to_string()]);

        assert_eq!(list.kind(), "list");
        assert_eq!(list.clone().into_info(), None);
        assert_eq!(list.clone().into_manifest(), None);
        assert_eq!(list.into_version_list(), Some(vec!["v1.0.0".to_string()]));
    }
}
