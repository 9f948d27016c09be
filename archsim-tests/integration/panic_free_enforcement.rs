//! Panic-Free Enforcement
//!
//! Library code must never abort a tick: per-request problems are reported as
//! events, not panics. This scans the library crates for `unwrap()`, `expect(`
//! and `#[allow(dead_code)]` outside of test code.

use std::fs;
use std::path::{Path, PathBuf};

const LIBRARY_CRATES: [&str; 2] = ["archsim-core", "archsim-sim"];

const FORBIDDEN: [&str; 3] = [".unwrap()", ".expect(", "allow(dead_code"];

/// A forbidden construct found in library code
#[derive(Debug)]
struct Violation {
    file_path: String,
    line_number: usize,
    context: String,
}

/// Collects violations across library sources
struct PanicFreeChecker {
    violations: Vec<Violation>,
    files_checked: usize,
}

impl PanicFreeChecker {
    fn new() -> Self {
        Self {
            violations: Vec::new(),
            files_checked: 0,
        }
    }

    fn find_rust_files(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                Self::find_rust_files(&path, files)?;
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                files.push(path);
            }
        }
        Ok(())
    }

    /// Whole-file test modules are exempt
    fn is_test_file(path: &Path) -> bool {
        path.file_name().is_some_and(|name| name == "tests.rs")
    }

    /// Checks lines up to the first inline `#[cfg(test)]` module, skipping comments
    fn check_source(&mut self, file_path: &str, content: &str) {
        self.files_checked += 1;

        let lines: Vec<&str> = content.lines().map(str::trim).collect();
        for (index, trimmed) in lines.iter().enumerate() {
            if trimmed.starts_with("#[cfg(test)]") {
                // `mod tests;` lives in its own exempt file
                let inline = lines.get(index + 1).is_some_and(|next| next.ends_with('{'));
                if inline {
                    break;
                }
                continue;
            }
            if trimmed.starts_with("//") {
                continue;
            }
            if FORBIDDEN.iter().any(|pattern| trimmed.contains(pattern)) {
                self.violations.push(Violation {
                    file_path: file_path.to_string(),
                    line_number: index + 1,
                    context: trimmed.to_string(),
                });
            }
        }
    }

    fn check_workspace(&mut self) -> std::io::Result<()> {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..");
        for krate in LIBRARY_CRATES {
            let mut files = Vec::new();
            Self::find_rust_files(&root.join(krate).join("src"), &mut files)?;
            for file in files.iter().filter(|file| !Self::is_test_file(file)) {
                let content = fs::read_to_string(file)?;
                self.check_source(&file.to_string_lossy(), &content);
            }
        }
        Ok(())
    }

    fn report(&self) -> bool {
        if self.violations.is_empty() {
            println!(
                "Panic-free enforcement: {} files checked, no violations found",
                self.files_checked
            );
            return true;
        }

        for violation in &self.violations {
            println!("{}:{}", violation.file_path, violation.line_number);
            println!("  {}", violation.context);
        }
        println!(
            "Found {} violation(s) in {} file(s) checked",
            self.violations.len(),
            self.files_checked
        );
        println!("Propagate with `?` or report through the event log instead.");
        false
    }
}

#[test]
fn test_checker_flags_only_production_lines() {
    let mut checker = PanicFreeChecker::new();
    let source = "\
fn ok() -> Option<u8> { Some(1) }
// a comment mentioning .unwrap() is fine
fn bad() -> u8 { ok().unwrap() }
#[cfg(test)]
mod tests {
    fn t() { super::ok().expect(\"x\"); }
}
";
    checker.check_source("sample.rs", source);

    assert_eq!(checker.violations.len(), 1);
    assert_eq!(checker.violations[0].line_number, 3);
    assert!(PanicFreeChecker::is_test_file(Path::new("src/engine/tests.rs")));
    assert!(!PanicFreeChecker::is_test_file(Path::new("src/engine/mod.rs")));
}

#[test]
fn test_library_code_is_panic_free() {
    let mut checker = PanicFreeChecker::new();
    checker
        .check_workspace()
        .expect("library sources are readable");

    assert!(checker.files_checked > 0);
    assert!(checker.report(), "library code contains panicking constructs");
}
