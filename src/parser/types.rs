//! Common types for parsers

/// A single `require` entry of a go.mod file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Requirement {
    /// Module path (e.g., "golang.org/x/text")
    pub path: String,
    /// Required version (e.g., "v0.14.0")
    pub version: String,
    /// Marked with a trailing `// indirect` comment
    pub indirect: bool,
    /// Line number (1-indexed)
    pub line: usize,
}

impl Requirement {
    pub fn new(path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
            indirect: false,
            line: 0,
        }
    }

    pub fn indirect(mut self) -> Self {
        self.indirect = true;
        self
    }
}

/// Parsed content of a go.mod file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModFile {
    /// Path declared by the `module` directive; empty when absent
    pub module_path: String,
    /// Requirements in file order
    pub requires: Vec<Requirement>,
}

impl ModFile {
    pub fn direct_requires(&self) -> impl Iterator<Item = &Requirement> {
        self.requires.iter().filter(|req| !req.indirect)
    }

    pub fn indirect_requires(&self) -> impl Iterator<Item = &Requirement> {
        self.requires.iter().filter(|req| req.indirect)
    }

    /// First requirement whose path equals `module_path`
    pub fn find_require(&self, module_path: &str) -> Option<&Requirement> {
        self.requires.iter().find(|req| req.path == module_path)
    }

    pub fn has_require(&self, module_path: &str) -> bool {
        self.find_require(module_path).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample() -> ModFile {
        ModFile {
            module_path: "example.com/app".to_string(),
            requires: vec![
                Requirement::new("github.com/stretchr/testify", "v1.8.4"),
                Requirement::new("golang.org/x/mod", "v0.14.0"),
                Requirement::new("gopkg.in/yaml.v3", "v3.0.1").indirect(),
            ],
        }
    }

    #[test]
    fn direct_and_indirect_requires_partition_the_list() {
        let mod_file = sample();

        let direct: Vec<_> = mod_file.direct_requires().map(|r| r.path.as_str()).collect();
        let indirect: Vec<_> = mod_file.indirect_requires().map(|r| r.path.as_str()).collect();

        assert_eq!(direct, vec!["github.com/stretchr/testify", "golang.org/x/mod"]);
        assert_eq!(indirect, vec!["gopkg.in/yaml.v3"]);
    }

    #[rstest]
    #[case("github.com/stretchr/testify", Some("v1.8.4"))]
    #[case("gopkg.in/yaml.v3", Some("v3.0.1"))]
    #[case("github.com/nonexistent/package", None)]
    #[case("", None)]
    fn find_require_returns_expected(#[case] path: &str, #[case] expected: Option<&str>) {
        let mod_file = sample();

        assert_eq!(
            mod_file.find_require(path).map(|r| r.version.as_str()),
            expected
        );
        assert_eq!(mod_file.has_require(path), expected.is_some());
    }
}
