//! Production Code Enforcement
//!
//! Library and binary code propagates errors instead of panicking and does
//! not silence dead-code warnings. Everything from the first `#[cfg(test)]`
//! of a file onwards is test code and exempt, as are test fixture modules.

use std::fs;
use std::path::{Path, PathBuf};

/// Crates whose `src/` trees are production code.
const PRODUCTION_CRATES: &[&str] = &["auralis-core", "auralis-web", "auralis-cli"];

const FORBIDDEN: &[(&str, &str)] = &[
    (".unwrap()", "propagate the error with `?` instead of unwrap()"),
    (".expect(", "propagate the error with `?` instead of expect()"),
    ("panic!(", "return an error instead of panicking"),
    ("#[allow(dead_code)]", "remove or use the dead code"),
];

#[derive(Debug)]
struct Violation {
    file_path: PathBuf,
    line_number: usize,
    line: String,
    advice: &'static str,
}

#[derive(Default)]
struct ProductionCodeChecker {
    violations: Vec<Violation>,
    files_checked: usize,
}

impl ProductionCodeChecker {
    fn workspace_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".."))
    }

    fn collect_rust_files(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                Self::collect_rust_files(&path, files)?;
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                files.push(path);
            }
        }
        Ok(())
    }

    fn is_test_fixture(path: &Path) -> bool {
        path.file_stem()
            .is_some_and(|stem| stem.to_string_lossy().starts_with("test_"))
    }

    fn check_source(&mut self, path: &Path, content: &str) {
        self.files_checked += 1;

        for (index, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("#[cfg(test)]") {
                break;
            }
            if trimmed.starts_with("//") {
                continue;
            }

            for &(pattern, advice) in FORBIDDEN {
                if trimmed.contains(pattern) {
                    self.violations.push(Violation {
                        file_path: path.to_path_buf(),
                        line_number: index + 1,
                        line: trimmed.to_string(),
                        advice,
                    });
                }
            }
        }
    }

    fn check_workspace(&mut self) -> std::io::Result<()> {
        let root = Self::workspace_root();
        for krate in PRODUCTION_CRATES {
            let mut files = Vec::new();
            Self::collect_rust_files(&root.join(krate).join("src"), &mut files)?;
            files.sort();

            for file in files.iter().filter(|f| !Self::is_test_fixture(f)) {
                let content = fs::read_to_string(file)?;
                self.check_source(file, &content);
            }
        }
        Ok(())
    }

    fn report(&self) -> bool {
        if self.violations.is_empty() {
            println!(
                "Production code enforcement: {} files checked, no violations found",
                self.files_checked
            );
            return true;
        }

        for violation in &self.violations {
            println!(
                "{}:{}\n  {}\n  -> {}\n",
                violation.file_path.display(),
                violation.line_number,
                violation.line,
                violation.advice
            );
        }
        println!(
            "Found {} violation(s) in {} file(s) checked",
            self.violations.len(),
            self.files_checked
        );
        false
    }
}

#[test]
fn test_detects_violations_before_test_module_only() {
    let mut checker = ProductionCodeChecker::default();
    let source = r#"
fn load() -> u32 {
    // a comment mentioning .unwrap() is fine
    "1".parse().unwrap()
}

#[allow(dead_code)]
fn unused() {}

#[cfg(test)]
mod tests {
    fn helper() { Some(1).expect("fine in tests"); }
}
"#;
    checker.check_source(Path::new("src/lib.rs"), source);

    let lines: Vec<usize> = checker.violations.iter().map(|v| v.line_number).collect();
    assert_eq!(lines, vec![4, 7]);
}

#[test]
fn test_fixture_modules_are_exempt() {
    assert!(ProductionCodeChecker::is_test_fixture(Path::new(
        "auralis-core/src/storage/test_fixtures.rs"
    )));
    assert!(!ProductionCodeChecker::is_test_fixture(Path::new(
        "auralis-core/src/streaming/file_stream.rs"
    )));
}

#[test]
fn production_code_enforcement() {
    let mut checker = ProductionCodeChecker::default();
    checker
        .check_workspace()
        .expect("Failed to scan workspace sources");

    assert!(
        checker.report(),
        "Panicking shortcuts found in production code - see output above"
    );
}
