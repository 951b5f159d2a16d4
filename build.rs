use std::path::{Path, PathBuf};
use std::process::Command;

const MAX_LINES: usize = 750;

const CHECKED_EXTENSIONS: &[&str] = &["rs", "yaml", "toml"];

const EXCLUDED_DIRS: &[&str] = &["target", ".git", "examples"];

const EXCLUDED_FILES: &[&str] = &["Cargo.lock"];

/// A rule violation: file relative to the manifest dir, line, message.
type Violation = (PathBuf, usize, String);

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/main");
    println!("cargo:rerun-if-changed=.git/packed-refs");

    let sha = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=NETEMU_GIT_SHA={}", sha);

    let root = PathBuf::from(
        std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set"),
    );
    let files = collect_files_to_check(&root);
    for file in &files {
        println!("cargo:rerun-if-changed={}", file.display());
    }
    let sources: Vec<(PathBuf, String)> = files
        .iter()
        .filter(|p| {
            p.extension().and_then(|e| e.to_str()) == Some("rs")
                && p.file_name().and_then(|n| n.to_str()) != Some("build.rs")
        })
        .filter_map(|p| {
            let content = std::fs::read_to_string(p).ok()?;
            Some((p.strip_prefix(&root).unwrap_or(p).to_path_buf(), content))
        })
        .collect();

    enforce_line_limits(&root, &files);
    fail_on(
        "#[allow(dead_code)] IS NOT ALLOWED",
        &dead_code_allows(&sources),
        &[
            "Delete unused code instead of silencing the warning.",
            "Test-only helpers belong behind #[cfg(test)].",
        ],
    );
    fail_on(
        "SILENT TEST SKIPS ARE NOT ALLOWED",
        &silent_test_skips(&sources),
        &[
            "Tests must fail when they cannot run.",
            "Start a real TestServer or assert the precondition.",
        ],
    );
    fail_on(
        "NESTED TOKIO RUNTIMES ARE NOT ALLOWED",
        &nested_runtimes(&sources),
        &[
            "tarpc clients die with the runtime that created them.",
            "Use tokio::spawn on the main runtime instead.",
        ],
    );
    fail_on(
        "ENV MUTATIONS REQUIRE #[serial]",
        &unserialized_env_mutations(&sources),
        &["Add #[serial] from serial_test to tests that call set_var or remove_var."],
    );
}

fn fail_on(title: &str, violations: &[Violation], advice: &[&str]) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n========================================");
    eprintln!("{}", title);
    eprintln!("========================================");
    for (path, line, message) in violations {
        eprintln!("  {}:{}", path.display(), line);
        eprintln!("    {}", message.trim());
    }
    eprintln!("========================================");
    for line in advice {
        eprintln!("{}", line);
    }
    eprintln!();
    panic!("Build failed: {} ({} occurrence(s))", title, violations.len());
}

fn enforce_line_limits(root: &Path, files: &[PathBuf]) {
    let mut violations = Vec::new();
    for file in files {
        let rel_path = file.strip_prefix(root).unwrap_or(file).to_path_buf();
        match std::fs::read_to_string(file) {
            Ok(content) => {
                let lines = content.lines().filter(|line| !line.trim().is_empty()).count();
                if lines > MAX_LINES {
                    violations.push((rel_path, lines, format!("exceeds by {}", lines - MAX_LINES)));
                }
            }
            Err(e) => println!("cargo:warning=Could not read file {}: {}", rel_path.display(), e),
        }
    }
    fail_on(
        &format!("FILE LINE LIMIT EXCEEDED (max {} non-empty lines)", MAX_LINES),
        &violations,
        &["Split these files into smaller modules."],
    );
}

fn collect_files_to_check(root: &Path) -> Vec<PathBuf> {
    if let Ok(output) = Command::new("git").args(["ls-files"]).current_dir(root).output() {
        if output.status.success() {
            if let Ok(stdout) = String::from_utf8(output.stdout) {
                return stdout
                    .lines()
                    .map(|line| root.join(line))
                    .filter(|path| should_check_file(path, root))
                    .collect();
            }
        }
    }

    let mut files = Vec::new();
    walk_directory(root, root, &mut files);
    files
}

fn walk_directory(dir: &Path, root: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|entry| entry.path()) {
        if path.is_dir() {
            let excluded = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| EXCLUDED_DIRS.contains(&name));
            if !excluded {
                walk_directory(&path, root, files);
            }
        } else if should_check_file(&path, root) {
            files.push(path);
        }
    }
}

fn should_check_file(path: &Path, root: &Path) -> bool {
    let checked = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| CHECKED_EXTENSIONS.contains(&ext));
    if !checked {
        return false;
    }
    let Ok(rel_path) = path.strip_prefix(root) else {
        return true;
    };
    if EXCLUDED_FILES.contains(&rel_path.to_string_lossy().as_ref()) {
        return false;
    }
    !rel_path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| EXCLUDED_DIRS.contains(&name))
    })
}

fn dead_code_allows(sources: &[(PathBuf, String)]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (path, content) in sources {
        for (i, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if (trimmed.starts_with("#[allow(") || trimmed.starts_with("#![allow("))
                && trimmed.contains("dead_code")
            {
                violations.push((path.clone(), i + 1, line.to_string()));
            }
        }
    }
    violations
}

/// One test function: its attribute line, name and body lines.
struct TestFn<'a> {
    line: usize,
    name: String,
    serial: bool,
    body: Vec<(&'a str, i32)>,
}

/// Splits a file into its test functions, tracking the brace depth of
/// every body line.
fn test_functions(content: &str) -> Vec<TestFn<'_>> {
    let lines: Vec<&str> = content.lines().collect();
    let mut tests = Vec::new();
    let mut serial = false;
    let mut i = 0;
    while i < lines.len() {
        let trimmed = lines[i].trim();
        if trimmed == "#[serial]" || trimmed == "#[serial_test::serial]" {
            serial = true;
        }
        let is_test = trimmed == "#[test]" || trimmed.starts_with("#[tokio::test");
        let header = (i + 1..lines.len().min(i + 5)).find(|&j| lines[j].contains("fn "));
        let (true, Some(header)) = (is_test, header) else {
            i += 1;
            continue;
        };

        let after_fn = lines[header]
            .split_once("fn ")
            .map(|(_, rest)| rest)
            .unwrap_or("");
        let name = after_fn.split('(').next().unwrap_or("").trim().to_string();
        let mut test = TestFn {
            line: i + 1,
            name,
            serial: serial || lines[i..header].iter().any(|l| l.trim() == "#[serial]"),
            body: Vec::new(),
        };

        let mut depth = 0;
        let mut j = header;
        while j < lines.len() {
            for c in lines[j].chars() {
                match c {
                    '{' => depth += 1,
                    '}' => depth -= 1,
                    _ => {}
                }
            }
            test.body.push((lines[j], depth));
            j += 1;
            if depth == 0 && lines[header..j].iter().any(|l| l.contains('{')) {
                break;
            }
        }
        tests.push(test);
        serial = false;
        i = j;
    }
    tests
}

fn silent_test_skips(sources: &[(PathBuf, String)]) -> Vec<Violation> {
    let skip_patterns = [
        "Skipping test",
        "skipping test",
        "Test skipped",
        "test skipped",
        "daemon not available",
        "not connected, skipping",
    ];
    let mut violations = Vec::new();
    for (path, content) in sources {
        for test in test_functions(content) {
            let skipped = test.body.iter().any(|(line, depth)| {
                skip_patterns.iter().any(|p| line.contains(p))
                    || (line.trim() == "return;" && *depth > 1)
            });
            if skipped {
                violations.push((
                    path.clone(),
                    test.line,
                    format!("test `{}` silently skips", test.name),
                ));
            }
        }
    }
    violations
}

fn nested_runtimes(sources: &[(PathBuf, String)]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (path, content) in sources {
        let lines: Vec<&str> = content.lines().collect();
        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("//") || !trimmed.contains("thread::spawn(") {
                continue;
            }
            let context = lines[i..(i + 20).min(lines.len())].join("\n");
            if context.contains("Runtime::new()") || context.contains("runtime::Builder") {
                violations.push((path.clone(), i + 1, line.to_string()));
            }
        }
    }
    violations
}

fn unserialized_env_mutations(sources: &[(PathBuf, String)]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (path, content) in sources {
        for test in test_functions(content) {
            let mutates = test.body.iter().any(|(line, _)| {
                let trimmed = line.trim();
                !trimmed.starts_with("//")
                    && (trimmed.contains("env::set_var") || trimmed.contains("env::remove_var"))
            });
            if mutates && !test.serial {
                violations.push((
                    path.clone(),
                    test.line,
                    format!("test `{}` mutates env without #[serial]", test.name),
                ));
            }
        }
    }
    violations
}
