//! Registry trait for fetching module metadata from a module proxy

#[cfg(test)]
use mockall::automock;
use tokio_util::sync::CancellationToken;

use crate::version::error::RegistryError;
use crate::version::types::VersionInfo;

/// Read access to a Go module proxy
///
/// Every call takes the caller's cancellation token. Implementations must not
/// retry on their own.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ModuleRegistry: Send + Sync {
    /// Fetches the version the proxy currently reports as latest
    async fn latest(
        &self,
        module_path: &str,
        cancel: &CancellationToken,
    ) -> Result<VersionInfo, RegistryError>;

    /// Fetches the list of known versions, in the order the proxy returns them
    async fn versions(
        &self,
        module_path: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, RegistryError>;

    /// Fetches metadata for one specific version
    async fn info(
        &self,
        module_path: &str,
        version: &str,
        cancel: &CancellationToken,
    ) -> Result<VersionInfo, RegistryError>;

    /// Fetches the raw go.mod file of one specific version
    async fn manifest(
        &self,
        module_path: &str,
        version: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, RegistryError>;
}
