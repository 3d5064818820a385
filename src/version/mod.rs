//! Version layer for Go module metadata
//!
//! Fetches module metadata from a Go module proxy, caches responses with a
//! per-kind ttl, and compares Go versions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────┐
//! │  RegistryClient  │────▶│ VersionCache │
//! │ (proxy, limiter) │     │  (ttl, sweep)│
//! └──────────────────┘     └──────────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  semver (Go cmp) │
//! └──────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`]: In-memory ttl cache with a background sweep
//! - [`registry`]: Registry trait for fetching module metadata
//! - [`proxy`]: Go module proxy client implementing the registry trait
//! - [`error`]: Error types for registry operations
//! - [`semver`]: Go version ordering and update classification
//! - [`types`]: Proxy response types

pub mod cache;
pub mod error;
pub mod proxy;
pub mod registry;
pub mod semver;
pub mod types;

pub use cache::{SweepHandle, VersionCache};
pub use error::RegistryError;
pub use proxy::{ClientOptions, RegistryClient};
pub use registry::ModuleRegistry;
pub use types::{CachedResponse, VersionInfo};
