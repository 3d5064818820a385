//! go.mod rewriting
//!
//! Edits are applied to the file text line by line, so comments and the
//! directives the parser skips are left as they are. Every edit is checked by
//! parsing the result again.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::parser::go_mod::GoModParser;
use crate::parser::traits::{ParseError, Parser};
use crate::parser::types::ModFile;

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("invalid requirement: {path} {version}")]
    InvalidRequirement { path: String, version: String },

    #[error("no backup to restore")]
    NoBackup,

    #[error("written go.mod failed validation: {0}")]
    Validation(#[source] ParseError),

    #[error("{cause}; restoring the backup also failed: {source}")]
    RestoreFailed {
        cause: Box<WriteError>,
        #[source]
        source: Box<WriteError>,
    },
}

fn io_error(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> WriteError {
    let path = path.to_path_buf();
    move |source| WriteError::Io {
        action,
        path,
        source,
    }
}

/// Pending edits to one go.mod file
#[derive(Debug)]
pub struct ModWriter {
    path: PathBuf,
    /// File content at open time, or after the last successful write
    original: String,
    lines: Vec<String>,
    parser: GoModParser,
    backup: Option<PathBuf>,
}

impl ModWriter {
    /// Reads `path`; the file must already parse
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, WriteError> {
        let path = path.into();
        let original = fs::read_to_string(&path).map_err(io_error("reading", &path))?;
        let parser = GoModParser::new();
        parser.parse(&original)?;

        Ok(Self {
            lines: original.split('\n').map(str::to_string).collect(),
            original,
            path,
            parser,
            backup: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Content with all edits applied so far
    pub fn content(&self) -> String {
        self.lines.join("\n")
    }

    pub fn backup_path(&self) -> Option<&Path> {
        self.backup.as_deref()
    }

    fn manifest(&self) -> Result<ModFile, WriteError> {
        Ok(self.parser.parse(&self.content())?)
    }

    /// Pins `module_path` to `version`, adding a requirement when the module
    /// is not required yet. Returns the previously required version.
    ///
    /// Trailing comments such as `// indirect` are kept.
    pub fn update_require(
        &mut self,
        module_path: &str,
        version: &str,
    ) -> Result<Option<String>, WriteError> {
        if !is_token(module_path) || !is_token(version) || !version.starts_with('v') {
            return Err(WriteError::InvalidRequirement {
                path: module_path.to_string(),
                version: version.to_string(),
            });
        }

        let manifest = self.manifest()?;
        let existing: Vec<_> = manifest
            .requires
            .iter()
            .filter(|req| req.path == module_path)
            .collect();

        if existing.is_empty() {
            self.insert_require(module_path, version);
            debug!("Added requirement {} {}", module_path, version);
            return Ok(None);
        }

        for req in &existing {
            let line = &mut self.lines[req.line - 1];
            let located = line.find(req.path.as_str()).and_then(|start| {
                let after_path = start + req.path.len();
                line[after_path..]
                    .find(req.version.as_str())
                    .map(|offset| after_path + offset)
            });
            let Some(at) = located else {
                return Err(ParseError::syntax(req.line, "cannot locate requirement version").into());
            };
            line.replace_range(at..at + req.version.len(), version);
        }

        debug!(
            "Updated {} from {} to {}",
            module_path, existing[0].version, version
        );
        Ok(Some(existing[0].version.clone()))
    }

    /// Removes every requirement of `module_path`. Returns whether any was
    /// found. A `require ( )` block left empty is removed as well.
    pub fn drop_require(&mut self, module_path: &str) -> Result<bool, WriteError> {
        let manifest = self.manifest()?;
        let mut lines: Vec<usize> = manifest
            .requires
            .iter()
            .filter(|req| req.path == module_path)
            .map(|req| req.line - 1)
            .collect();
        if lines.is_empty() {
            return Ok(false);
        }

        lines.sort_unstable_by(|a, b| b.cmp(a));
        for index in lines {
            self.remove_line(index);
        }
        self.remove_empty_require_blocks();
        debug!("Dropped requirement {}", module_path);
        Ok(true)
    }

    /// Adds to the last `require ( )` block, or appends a single-line require
    fn insert_require(&mut self, module_path: &str, version: &str) {
        let mut in_block = false;
        let mut block_end = None;
        for (index, line) in self.lines.iter().enumerate() {
            let trimmed = line.trim();
            if is_require_block_start(trimmed) {
                in_block = true;
            } else if in_block && trimmed == ")" {
                in_block = false;
                block_end = Some(index);
            }
        }

        match block_end {
            Some(index) => self
                .lines
                .insert(index, format!("\t{} {}", module_path, version)),
            None => {
                let at = match self.lines.last() {
                    Some(last) if last.is_empty() => self.lines.len() - 1,
                    _ => self.lines.len(),
                };
                self.lines
                    .insert(at, format!("require {} {}", module_path, version));
            }
        }
    }

    /// Removes a line and collapses a blank line pair left behind
    fn remove_line(&mut self, index: usize) {
        self.lines.remove(index);
        if index > 0
            && index < self.lines.len()
            && self.lines[index].trim().is_empty()
            && self.lines[index - 1].trim().is_empty()
        {
            self.lines.remove(index);
        }
    }

    fn remove_empty_require_blocks(&mut self) {
        let mut index = 0;
        while index < self.lines.len() {
            if is_require_block_start(self.lines[index].trim()) {
                let mut end = index + 1;
                while end < self.lines.len() && self.lines[end].trim().is_empty() {
                    end += 1;
                }
                if end < self.lines.len() && self.lines[end].trim() == ")" {
                    self.lines.drain(index + 1..=end);
                    self.remove_line(index);
                    continue;
                }
            }
            index += 1;
        }
    }

    /// Copies the file as read to `<path>.backup.<timestamp>`, once
    pub fn backup(&mut self) -> Result<(), WriteError> {
        if self.backup.is_some() {
            return Ok(());
        }

        let backup = backup_path_for(&self.path, Local::now());
        fs::write(&backup, &self.original).map_err(io_error("creating backup", &backup))?;
        debug!("Backed up {} to {}", self.path.display(), backup.display());
        self.backup = Some(backup);
        Ok(())
    }

    pub fn restore_backup(&self) -> Result<(), WriteError> {
        let backup = self.backup.as_deref().ok_or(WriteError::NoBackup)?;
        let data = fs::read(backup).map_err(io_error("reading backup", backup))?;
        fs::write(&self.path, data).map_err(io_error("restoring backup", &self.path))
    }

    /// Deletes the backup file, if one was made
    pub fn cleanup_backup(&mut self) -> Result<(), WriteError> {
        if let Some(backup) = self.backup.take() {
            fs::remove_file(&backup).map_err(io_error("removing backup", &backup))?;
        }
        Ok(())
    }

    /// Writes the edited content without any safety net
    pub fn write(&self) -> Result<(), WriteError> {
        fs::write(&self.path, self.content()).map_err(io_error("writing", &self.path))
    }

    /// Backs up, writes, then parses the written file. A failed write or a
    /// file that no longer parses is rolled back from the backup.
    pub fn safe_write(&mut self) -> Result<(), WriteError> {
        self.backup()?;

        if let Err(err) = self.write() {
            return Err(self.rolled_back(err));
        }
        if let Err(err) = self.parser.parse_file(&self.path) {
            return Err(self.rolled_back(WriteError::Validation(err)));
        }

        self.original = self.content();
        Ok(())
    }

    fn rolled_back(&self, cause: WriteError) -> WriteError {
        match self.restore_backup() {
            Ok(()) => {
                warn!("Restored {} from backup: {}", self.path.display(), cause);
                cause
            }
            Err(source) => WriteError::RestoreFailed {
                cause: Box::new(cause),
                source: Box::new(source),
            },
        }
    }
}

fn backup_path_for(path: &Path, now: DateTime<Local>) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".backup.{}", now.format("%Y%m%d_%H%M%S")));
    PathBuf::from(name)
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '"'))
}

fn is_require_block_start(trimmed: &str) -> bool {
    trimmed
        .strip_prefix("require")
        .is_some_and(|rest| rest.trim() == "(")
}
