//! gx: dependency intelligence for Go modules
//!
//! - [`version`]: module proxy client, response cache and Go version ordering
//! - [`parser`]: go.mod parsing
//! - [`graph`]: module dependency graph
//! - [`report`]: outdated, audit and tree reports
//! - [`toolchain`]: the `go` command run after go.mod edits
//! - [`commands`]: handlers behind the `gx` binary

pub mod commands;
pub mod config;
pub mod graph;
pub mod logging;
pub mod parser;
pub mod report;
pub mod toolchain;
pub mod version;
