//! Parser trait definition

use std::path::{Path, PathBuf};

use crate::parser::types::ModFile;

/// Trait for parsing module manifests
pub trait Parser {
    /// Parse the content into a manifest
    fn parse(&self, content: &str) -> Result<ModFile, ParseError>;

    /// Parse raw bytes, as served by a module proxy
    fn parse_bytes(&self, content: &[u8]) -> Result<ModFile, ParseError> {
        let content = std::str::from_utf8(content)?;
        self.parse(content)
    }

    /// Read and parse a manifest from disk
    fn parse_file(&self, path: &Path) -> Result<ModFile, ParseError> {
        let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(&content)
    }
}

/// Error type for parsing operations
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Invalid syntax in the file
    #[error("line {line}: {message}")]
    InvalidSyntax { line: usize, message: String },
}

impl ParseError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        ParseError::InvalidSyntax {
            line,
            message: message.into(),
        }
    }
}
