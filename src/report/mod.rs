//! Reports built on top of the registry and the dependency graph
//! - outdated.rs: requirements with newer versions
//! - audit.rs: govulncheck findings
//! - tree.rs: dependency tree and path rendering

pub mod audit;
pub mod outdated;
pub mod tree;

pub use audit::{ScanError, ScanResult, Scanner, Vulnerability};
pub use outdated::{OutdatedOptions, OutdatedPackage, Summary, check_outdated};
pub use tree::{TreeOptions, render_paths, render_tree};
