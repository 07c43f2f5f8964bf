//! Tree fixture loading.
//!
//! Layout, one directory per case under a fixture root:
//! - `input.html`: parser input, read verbatim.
//! - `tree.txt`: expected snapshot lines, preceded by `# key: value` headers
//!   (`format` is required, `status` and `reason` are optional).
//! - `fixture.toml` (optional): parse options, see [`FixtureOptions`].

use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const TREE_FORMAT_V1: &str = "html-tree-v1";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FixtureStatus {
    Active,
    Xfail,
    Skip,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FixtureDialect {
    #[default]
    Html,
    Xhtml,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FixtureOptions {
    #[serde(default)]
    pub dialect: FixtureDialect,
    /// `[open, close]` interpolation delimiters.
    #[serde(default)]
    pub interpolation: Option<[String; 2]>,
    /// Render byte spans in the snapshot.
    #[serde(default)]
    pub spans: bool,
}

#[derive(Clone, Debug)]
pub struct ExpectedTree {
    pub status: FixtureStatus,
    pub reason: Option<String>,
    pub lines: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct TreeFixture {
    pub name: String,
    pub path: PathBuf,
    pub input: String,
    pub options: FixtureOptions,
    pub expected: ExpectedTree,
}

/// Substring filter on fixture names, read from an environment variable.
pub struct FixtureFilter {
    raw: Option<String>,
}

impl FixtureFilter {
    pub fn from_env(key: &str) -> Self {
        Self {
            raw: env::var(key).ok().filter(|value| !value.is_empty()),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.raw.as_deref().is_none_or(|filter| name.contains(filter))
    }
}

/// Load every fixture directory under `root`, sorted by name.
pub fn load_tree_fixtures(root: &Path) -> Vec<TreeFixture> {
    let mut entries: Vec<_> = fs::read_dir(root)
        .unwrap_or_else(|err| panic!("failed to read fixture root {root:?}: {err}"))
        .filter_map(Result::ok)
        .collect();
    entries.sort_by_key(|entry| entry.file_name());

    let mut fixtures = Vec::new();
    for entry in entries {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name != name.trim() {
            panic!("fixture directory has leading/trailing whitespace: '{name}'");
        }
        if name.starts_with('.') {
            continue;
        }
        let input_path = path.join("input.html");
        let input = fs::read_to_string(&input_path)
            .unwrap_or_else(|err| panic!("failed to read input {input_path:?}: {err}"));
        let options = load_options(&path.join("fixture.toml"));
        let expected = parse_tree_file(&path.join("tree.txt"));
        fixtures.push(TreeFixture {
            name,
            path,
            input,
            options,
            expected,
        });
    }
    fixtures
}

fn load_options(path: &Path) -> FixtureOptions {
    if !path.exists() {
        return FixtureOptions::default();
    }
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read fixture options {path:?}: {err}"));
    toml::from_str(&content)
        .unwrap_or_else(|err| panic!("failed to parse fixture options {path:?}: {err}"))
}

pub fn parse_tree_file(path: &Path) -> ExpectedTree {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read tree file {path:?}: {err}"));
    let mut lines = Vec::new();
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for raw_line in content.lines() {
        let line = raw_line.trim_end();
        if line.is_empty() {
            continue;
        }
        if let Some(stripped) = line.strip_prefix('#') {
            let header = stripped.trim();
            if header.is_empty() {
                continue;
            }
            let (key, value) = header
                .split_once(':')
                .unwrap_or_else(|| panic!("invalid header in {path:?}: '{line}'"));
            let key = key.trim().to_ascii_lowercase();
            if headers.insert(key.clone(), value.trim().to_string()).is_some() {
                panic!("duplicate header '{key}' in {path:?}");
            }
        } else {
            lines.push(line.to_string());
        }
    }

    let format = headers
        .get("format")
        .unwrap_or_else(|| panic!("missing format header in {path:?}"));
    assert_eq!(format, TREE_FORMAT_V1, "unsupported format in {path:?}");

    let status = match headers.get("status").map(String::as_str) {
        Some("active") | None => FixtureStatus::Active,
        Some("xfail") => FixtureStatus::Xfail,
        Some("skip") => FixtureStatus::Skip,
        Some(other) => panic!("unsupported status '{other}' in {path:?}"),
    };
    let reason = headers.get("reason").cloned();
    if status != FixtureStatus::Active && reason.as_deref().unwrap_or("").is_empty() {
        panic!("non-active fixture missing reason in {path:?}");
    }
    if !lines.first().is_some_and(|line| line.starts_with("FILE")) {
        panic!("tree file {path:?} must start with the FILE root");
    }

    ExpectedTree {
        status,
        reason,
        lines,
    }
}
