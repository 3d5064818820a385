//! go.mod parser
//!
//! Extracts the module path and requirements of a go.mod file.
//! Supports both single-line require directives and require blocks.
//!
//! Format examples:
//! - Single: `require golang.org/x/text v0.14.0`
//! - Block:
//!   ```text
//!   require (
//!       golang.org/x/text v0.14.0
//!       golang.org/x/net v0.20.0 // indirect
//!   )
//!   ```

use regex::Regex;

use crate::parser::traits::{ParseError, Parser};
use crate::parser::types::{ModFile, Requirement};

/// Directives that may appear in a go.mod file but carry no requirements
const SKIPPED_DIRECTIVES: &[&str] = &[
    "go",
    "toolchain",
    "godebug",
    "replace",
    "exclude",
    "retract",
    "tool",
    "ignore",
];

enum Block {
    None,
    Require { start: usize },
    Skipped { directive: String, start: usize },
}

/// Parser for go.mod files
#[derive(Debug, Clone)]
pub struct GoModParser {
    /// Regex for module directive: `module example.com/app`
    module_re: Regex,
    /// Regex for single-line require: `require module/path v1.2.3`
    single_require_re: Regex,
    /// Regex for block start of any directive: `require (`
    block_start_re: Regex,
    /// Regex for requirement line inside block: `module/path v1.2.3`
    requirement_re: Regex,
}

impl GoModParser {
    pub fn new() -> Self {
        Self {
            module_re: Regex::new(r"^module\s+(\S+)\s*(?://.*)?$").expect("valid module regex"),
            // Match: require module/path v1.2.3 [// comment]
            single_require_re: Regex::new(r"^require\s+(\S+)\s+(v\S+)\s*(//.*)?$")
                .expect("valid require regex"),
            // Match: require (
            block_start_re: Regex::new(r"^(\w+)\s*\(\s*$").expect("valid block regex"),
            // Match: module/path v1.2.3 [// comment]
            requirement_re: Regex::new(r"^(\S+)\s+(v\S+)\s*(//.*)?$")
                .expect("valid requirement regex"),
        }
    }

    fn requirement(
        &self,
        path: &str,
        version: &str,
        comment: Option<&str>,
        line: usize,
    ) -> Requirement {
        Requirement {
            path: unquote(path).to_string(),
            version: version.to_string(),
            indirect: comment.is_some_and(is_indirect_comment),
            line,
        }
    }
}

impl Default for GoModParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for GoModParser {
    fn parse(&self, content: &str) -> Result<ModFile, ParseError> {
        let mut mod_file = ModFile::default();
        let mut block = Block::None;

        for (index, line) in content.lines().enumerate() {
            let line_num = index + 1;
            let trimmed = line.trim();

            // Skip empty lines and comments
            if trimmed.is_empty() || trimmed.starts_with("//") {
                continue;
            }

            match &block {
                Block::Require { .. } => {
                    if trimmed == ")" {
                        block = Block::None;
                    } else if let Some(caps) = self.requirement_re.captures(trimmed) {
                        mod_file.requires.push(self.requirement(
                            &caps[1],
                            &caps[2],
                            caps.get(3).map(|m| m.as_str()),
                            line_num,
                        ));
                    } else {
                        return Err(ParseError::syntax(
                            line_num,
                            format!("malformed requirement: {trimmed}"),
                        ));
                    }
                    continue;
                }
                Block::Skipped { .. } => {
                    if trimmed == ")" {
                        block = Block::None;
                    }
                    continue;
                }
                Block::None => {}
            }

            if let Some(caps) = self.block_start_re.captures(trimmed) {
                let directive = &caps[1];
                block = if directive == "require" {
                    Block::Require { start: line_num }
                } else if SKIPPED_DIRECTIVES.contains(&directive) {
                    Block::Skipped {
                        directive: directive.to_string(),
                        start: line_num,
                    }
                } else {
                    return Err(ParseError::syntax(
                        line_num,
                        format!("unknown directive: {directive}"),
                    ));
                };
                continue;
            }

            if let Some(caps) = self.single_require_re.captures(trimmed) {
                mod_file.requires.push(self.requirement(
                    &caps[1],
                    &caps[2],
                    caps.get(3).map(|m| m.as_str()),
                    line_num,
                ));
                continue;
            }

            if let Some(caps) = self.module_re.captures(trimmed) {
                mod_file.module_path = unquote(&caps[1]).to_string();
                continue;
            }

            let directive = trimmed.split_whitespace().next().unwrap_or(trimmed);
            match directive {
                "require" | "module" => {
                    return Err(ParseError::syntax(
                        line_num,
                        format!("malformed {directive} directive: {trimmed}"),
                    ));
                }
                d if SKIPPED_DIRECTIVES.contains(&d) => {}
                d => {
                    return Err(ParseError::syntax(
                        line_num,
                        format!("unknown directive: {d}"),
                    ));
                }
            }
        }

        match block {
            Block::None => Ok(mod_file),
            Block::Require { start } => Err(ParseError::syntax(start, "unterminated require block")),
            Block::Skipped { directive, start } => Err(ParseError::syntax(
                start,
                format!("unterminated {directive} block"),
            )),
        }
    }
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

/// `// indirect`, optionally followed by `; other comment`
fn is_indirect_comment(comment: &str) -> bool {
    let text = comment.trim_start_matches('/').trim();
    text == "indirect" || text.starts_with("indirect;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn parse_extracts_module_path_and_single_require() {
        let parser = GoModParser::new();
        let content = r#"module example.com/myapp

go 1.21

require golang.org/x/text v0.14.0
"#;
        let result = parser.parse(content).unwrap();
        assert_eq!(result.module_path, "example.com/myapp");
        assert_eq!(result.requires.len(), 1);
        assert_eq!(result.requires[0].path, "golang.org/x/text");
        assert_eq!(result.requires[0].version, "v0.14.0");
        assert_eq!(result.requires[0].line, 5);
        assert!(!result.requires[0].indirect);
    }

    #[test]
    fn parse_extracts_require_block() {
        let parser = GoModParser::new();
        let content = r#"module example.com/myapp

go 1.21

require (
	golang.org/x/text v0.14.0
	golang.org/x/net v0.20.0
)
"#;
        let result = parser.parse(content).unwrap();
        assert_eq!(result.requires.len(), 2);
        assert_eq!(result.requires[0].path, "golang.org/x/text");
        assert_eq!(result.requires[0].version, "v0.14.0");
        assert_eq!(result.requires[1].path, "golang.org/x/net");
        assert_eq!(result.requires[1].version, "v0.20.0");
    }

    #[test]
    fn parse_marks_indirect_dependencies() {
        let parser = GoModParser::new();
        let content = r#"module example.com/myapp

require (
	github.com/stretchr/testify v1.8.4
	golang.org/x/mod v0.14.0
)

require (
	github.com/davecgh/go-spew v1.1.1 // indirect
	gopkg.in/yaml.v3 v3.0.1 // indirect; used by testify
)

require golang.org/x/sys v0.15.0 // indirect
"#;
        let result = parser.parse(content).unwrap();

        let direct: Vec<_> = result.direct_requires().map(|r| r.path.as_str()).collect();
        let indirect: Vec<_> = result.indirect_requires().map(|r| r.path.as_str()).collect();
        assert_eq!(direct, vec!["github.com/stretchr/testify", "golang.org/x/mod"]);
        assert_eq!(
            indirect,
            vec![
                "github.com/davecgh/go-spew",
                "gopkg.in/yaml.v3",
                "golang.org/x/sys"
            ]
        );
    }

    #[test]
    fn parse_treats_other_comments_as_direct() {
        let parser = GoModParser::new();
        let content = "module m\n\nrequire golang.org/x/text v0.14.0 // pinned for go1.20\n";

        let result = parser.parse(content).unwrap();

        assert!(!result.requires[0].indirect);
    }

    #[rstest]
    #[case("v0.14.0-beta.1")]
    #[case("v2.0.0+incompatible")]
    #[case("v0.0.0-20210101000000-abcdef123456")]
    fn parse_keeps_version_verbatim(#[case] version: &str) {
        let parser = GoModParser::new();
        let content = format!("module example.com/myapp\n\nrequire github.com/some/repo {version}\n");

        let result = parser.parse(&content).unwrap();

        assert_eq!(result.requires.len(), 1);
        assert_eq!(result.requires[0].version, version);
    }

    #[test]
    fn parse_returns_empty_for_no_requires() {
        let parser = GoModParser::new();
        let content = r#"module example.com/myapp

go 1.21
"#;
        let result = parser.parse(content).unwrap();
        assert_eq!(result.module_path, "example.com/myapp");
        assert!(result.requires.is_empty());
    }

    #[test]
    fn parse_accepts_missing_module_directive() {
        let parser = GoModParser::new();
        let content = "go 1.24.2\n\nrequire (\n\tgithub.com/some/package v1.0.0\n)\n";

        let result = parser.parse(content).unwrap();

        assert_eq!(result.module_path, "");
        assert_eq!(result.requires.len(), 1);
    }

    #[test]
    fn parse_strips_quotes_from_module_path() {
        let parser = GoModParser::new();

        let result = parser.parse("module \"example.com/quoted\"\n").unwrap();

        assert_eq!(result.module_path, "example.com/quoted");
    }

    #[test]
    fn parse_skips_other_directives() {
        let parser = GoModParser::new();
        let content = r#"module example.com/myapp

go 1.21

toolchain go1.22.0

require golang.org/x/text v0.14.0

replace golang.org/x/text v0.14.0 => ./local/text

replace (
	golang.org/x/net => ../fork/net
	example.com/old => example.com/new v1.0.0
)

exclude golang.org/x/net v1.2.3

exclude (
	golang.org/x/crypto v1.4.5
)

retract v1.0.0

retract (
	v1.0.1
	[v1.0.0, v1.9.9]
)
"#;
        let result = parser.parse(content).unwrap();
        assert_eq!(result.requires.len(), 1);
        assert_eq!(result.requires[0].path, "golang.org/x/text");
    }

    #[test]
    fn parse_rejects_unterminated_require_block() {
        let parser = GoModParser::new();
        let content = "module m\n\nrequire (\n\tgolang.org/x/text v0.14.0\n";

        let err = parser.parse(content).unwrap_err();

        assert!(
            matches!(err, ParseError::InvalidSyntax { line: 3, .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn parse_rejects_malformed_line_in_require_block() {
        let parser = GoModParser::new();
        let content = "module m\n\nrequire (\n\tgolang.org/x/text\n)\n";

        let err = parser.parse(content).unwrap_err();

        assert!(matches!(err, ParseError::InvalidSyntax { line: 4, .. }));
        assert!(err.to_string().contains("golang.org/x/text"));
    }

    #[test]
    fn parse_rejects_unknown_directive() {
        let parser = GoModParser::new();
        let content = "this is not a valid go.mod file\nmodule broken\n";

        let err = parser.parse(content).unwrap_err();

        assert!(matches!(err, ParseError::InvalidSyntax { line: 1, .. }));
    }

    #[test]
    fn parse_bytes_rejects_invalid_utf8() {
        let parser = GoModParser::new();

        let err = parser.parse_bytes(&[0x6d, 0xff, 0xfe]).unwrap_err();

        assert!(matches!(err, ParseError::InvalidUtf8(_)));
    }

    #[test]
    fn parse_bytes_parses_manifest_from_proxy() {
        let parser = GoModParser::new();

        let result = parser
            .parse_bytes(b"module golang.org/x/net\n\nrequire golang.org/x/text v0.14.0\n")
            .unwrap();

        assert_eq!(result.module_path, "golang.org/x/net");
        assert!(result.has_require("golang.org/x/text"));
    }

    #[test]
    fn parse_file_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "module example.com/disk\n\nrequire golang.org/x/mod v0.14.0").unwrap();

        let result = GoModParser::new().parse_file(file.path()).unwrap();

        assert_eq!(result.module_path, "example.com/disk");
        assert_eq!(result.requires[0].path, "golang.org/x/mod");
    }

    #[test]
    fn parse_file_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("go.mod");

        let err = GoModParser::new().parse_file(&path).unwrap_err();

        assert!(matches!(err, ParseError::Io { .. }));
        assert!(err.to_string().contains("go.mod"));
    }
}
