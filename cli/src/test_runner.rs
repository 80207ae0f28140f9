use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use blocks::{MountOptions, RenderNode, create_default, mount_with};

const FIXTURE_SUFFIXES: &[&str] = &[".test.tsx", ".test.jsx"];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Mount options for this fixture.
    #[serde(default)]
    pub options: MountOptions,

    /// Expected exact lowered code (trimmed comparison).
    #[serde(default)]
    pub expect_lowered: Option<String>,

    /// Expected HTML of the mounted block (trimmed comparison).
    #[serde(default)]
    pub expect_html: Option<String>,

    /// Expected failure: the error message must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// Expected failing stage: "transform", "bind" or "render".
    #[serde(default)]
    pub expect_stage: Option<String>,

    /// If true, the block must mount to nothing.
    #[serde(default)]
    pub expect_empty: bool,
}

/// Split a fixture into its TOML frontmatter and the block source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let source = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let (description, outcome) = match std::fs::read_to_string(path) {
        Err(e) => (None, Err(format!("cannot read file: {}", e))),
        Ok(content) => match parse_test_file(&content) {
            Err(e) => (None, Err(format!("frontmatter error: {}", e))),
            Ok((config, source)) => (config.description.clone(), check_fixture(&config, source)),
        },
    };
    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: match outcome {
            Ok(()) => TestOutcome::Pass,
            Err(reason) => TestOutcome::Fail(reason),
        },
    }
}

fn check_fixture(config: &TestConfig, source: &str) -> Result<(), String> {
    if let Some(expected) = &config.expect_lowered {
        let lowered = jsx::transform(source).map_err(|e| format!("unexpected {}", e))?;
        if lowered.as_str().trim() != expected.trim() {
            return Err(format!(
                "lowered code mismatch\n  expected: {}\n  actual:   {}",
                expected.trim(),
                lowered.as_str().trim()
            ));
        }
    }

    let mut block = create_default();
    block.source = source.to_string();
    let node = mount_with(&block, &config.options);

    let expects_failure = config.expect_error.is_some() || config.expect_stage.is_some();
    match (&node, expects_failure) {
        (RenderNode::Error(error), true) => {
            if let Some(stage) = &config.expect_stage {
                if error.stage.as_str() != stage {
                    return Err(format!(
                        "expected {} failure, got {} failure: {}",
                        stage, error.stage, error.message
                    ));
                }
            }
            if let Some(expected) = &config.expect_error {
                if !error.message.contains(expected.as_str()) {
                    return Err(format!(
                        "expected error containing \"{}\", got: {}",
                        expected, error.message
                    ));
                }
            }
        }
        (RenderNode::Error(error), false) => {
            return Err(format!("unexpected {} failure: {}", error.stage, error.message));
        }
        (_, true) => {
            return Err(format!(
                "expected a failure, but the block mounted to: {}",
                node.to_html()
            ));
        }
        (_, false) => {}
    }

    if config.expect_empty && node != RenderNode::Empty {
        return Err(format!("expected empty output, got: {}", node.to_html()));
    }

    if let Some(expected) = &config.expect_html {
        let actual = node.to_html_with(&config.options.error_class);
        if actual.trim() != expected.trim() {
            return Err(format!(
                "html mismatch\n  expected: {}\n  actual:   {}",
                expected.trim(),
                actual.trim()
            ));
        }
    }

    Ok(())
}

fn is_fixture(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| FIXTURE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)))
}

/// Fixture files grouped by the subfolder they live in, relative to `root`.
/// Files directly in `root` get category "".
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if is_fixture(&path) {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no fixture files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (category, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(category), files.len());
    }
}

fn paint(text: &str, code: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    }
}

/// Keep the categories matching `requested` (a category or any parent of it).
fn filter_categories(
    all: BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<String, Vec<PathBuf>> {
    if requested.is_empty() {
        return all;
    }
    for req in requested {
        let req = req.trim_matches('/');
        if !all.keys().any(|cat| matches_category(cat, req)) {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| category_label(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    all.into_iter()
        .filter(|(cat, _)| {
            requested
                .iter()
                .any(|req| matches_category(cat, req.trim_matches('/')))
        })
        .collect()
}

fn matches_category(category: &str, requested: &str) -> bool {
    category == requested || category.starts_with(&format!("{}/", requested))
}

/// Run every fixture under `path` (or the single file `path`) and print a
/// report. Returns the process exit code.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let run_categories = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all = discover_categorized(path);
        if all.is_empty() {
            eprintln!("no fixture files found in {}", path.display());
            return 1;
        }
        filter_categories(all, categories)
    };

    if run_categories.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (category, files) in &run_categories {
        eprintln!();
        eprintln!("{}", paint(category_label(category), "1", no_color));

        for file in files {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", paint("PASS", "32", no_color), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", paint("FAIL", "31", no_color), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for failure in &failures {
            eprintln!();
            eprintln!("  --- {} ---", failure.path.display());
            if let TestOutcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", paint("ok", "32", no_color), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            paint("FAILED", "31", no_color),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontmatter_and_source_are_split() {
        let content = "---\ndescription = \"hello\"\nexpect_html = \"<p>x</p>\"\n---\n() => <p>x</p>\n";
        let (config, source) = parse_test_file(content).unwrap();
        assert_eq!(config.description.as_deref(), Some("hello"));
        assert_eq!(source, "() => <p>x</p>\n");
        assert!(check_fixture(&config, source).is_ok());
    }

    #[test]
    fn options_table_is_read() {
        let content = "---\nexpect_stage = \"render\"\n[options]\nmax_call_depth = 2\n---\n() => { const f = () => f(); return f() }";
        let (config, source) = parse_test_file(content).unwrap();
        assert_eq!(config.options.max_call_depth, 2);
        assert!(check_fixture(&config, source).is_ok());
    }

    #[test]
    fn mismatches_are_reported() {
        let content = "---\nexpect_stage = \"bind\"\n---\n() => <p>ok</p>";
        let (config, source) = parse_test_file(content).unwrap();
        let reason = check_fixture(&config, source).unwrap_err();
        assert!(reason.starts_with("expected a failure"), "{}", reason);
    }

    #[test]
    fn missing_delimiters_are_errors() {
        assert!(parse_test_file("() => 1").is_err());
        assert!(parse_test_file("---\nexpect_empty = true\n() => 1").is_err());
    }

    #[test]
    fn fixture_names() {
        assert!(is_fixture(Path::new("cases/a.test.tsx")));
        assert!(is_fixture(Path::new("a.test.jsx")));
        assert!(!is_fixture(Path::new("a.tsx")));
    }
}
