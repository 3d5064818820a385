//! Module proxy stand-in backed by mockito

use std::time::Duration;

use mockito::{Mock, ServerGuard};

use gx::version::proxy::encode_module_path;
use gx::version::{ClientOptions, RegistryClient};

/// Serves canned proxy responses; unmocked URLs answer 501
pub struct FakeProxy {
    pub server: ServerGuard,
    mocks: Vec<Mock>,
}

impl FakeProxy {
    pub async fn start() -> Self {
        Self {
            server: mockito::Server::new_async().await,
            mocks: Vec::new(),
        }
    }

    /// Serves `content` as the go.mod of `path@version`
    #[allow(dead_code)]
    pub async fn with_mod(mut self, path: &str, version: &str, content: &str) -> Self {
        let url = format!("/{}/@v/{}.mod", encode_module_path(path), version);
        let mock = self
            .server
            .mock("GET", url.as_str())
            .with_status(200)
            .with_body(content)
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    /// Serves `version` as `@latest` of `path`
    #[allow(dead_code)]
    pub async fn with_latest(mut self, path: &str, version: &str) -> Self {
        let url = format!("/{}/@latest", encode_module_path(path));
        let mock = self
            .server
            .mock("GET", url.as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"Version":"{}","Time":"2024-01-01T00:00:00Z"}}"#,
                version
            ))
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    pub fn client(&self) -> RegistryClient {
        RegistryClient::new(&self.server.url()).unwrap()
    }

    /// Client whose `@latest` and list responses expire after `ttl`
    #[allow(dead_code)]
    pub fn client_with_latest_ttl(&self, ttl: Duration) -> RegistryClient {
        RegistryClient::with_options(ClientOptions {
            base_url: self.server.url(),
            latest_ttl: ttl,
            ..ClientOptions::default()
        })
        .unwrap()
    }
}
