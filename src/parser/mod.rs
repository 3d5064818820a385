//! Parser layer
//! - traits.rs: Parser trait definition
//! - types.rs: ModFile and Requirement
//! - go_mod.rs: go.mod parser
//! - writer.rs: in-place go.mod edits with backup and rollback

pub mod go_mod;
pub mod traits;
pub mod types;
pub mod writer;

pub use go_mod::GoModParser;
pub use traits::{ParseError, Parser};
pub use types::{ModFile, Requirement};
pub use writer::{ModWriter, WriteError};
