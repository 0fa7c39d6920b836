//! File inventory walker with gitignore support and default exclusions.
//!
//! Wraps the `ignore` crate's `WalkBuilder` to provide the single walking
//! policy every component shares:
//! - Respects `.gitignore` rules
//! - Skips dependency/build directories by default
//! - Skips hidden files/directories except `.github`
//! - Never follows symlinks, so link cycles cannot be traversed twice
//! - Applies a file-size ceiling and extra user-configured ignore globs

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;

use crate::types::FileRecord;

/// Directories that are always excluded from walks, regardless of `.gitignore`.
const DEFAULT_EXCLUSIONS: &[&str] = &[
    "node_modules",
    "vendor",
    "target",
    "build",
    "dist",
    "__pycache__",
    ".venv",
    "venv",
    ".pytest_cache",
];

/// Hidden directory names that are NOT excluded (i.e., they are allowed
/// even though hidden directories are otherwise skipped).
const HIDDEN_ALLOWLIST: &[&str] = &[".github"];

/// A file-system walker that respects `.gitignore` and applies default
/// exclusions.
pub struct Walker {
    root: PathBuf,
    max_file_size: Option<u64>,
    extra_ignores: Vec<String>,
}

impl Walker {
    /// Create a new walker rooted at the given path.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            max_file_size: None,
            extra_ignores: Vec::new(),
        }
    }

    /// Skip files larger than `bytes`.
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    /// Add extra exclusion globs (from user configuration).
    pub fn extra_ignores(mut self, patterns: &[String]) -> Self {
        self.extra_ignores = patterns.to_vec();
        self
    }

    /// Build the underlying `WalkBuilder` with all our configuration applied.
    fn make_builder(&self) -> WalkBuilder {
        let mut builder = WalkBuilder::new(&self.root);

        builder.standard_filters(true);
        builder.follow_links(false);
        if let Some(max) = self.max_file_size {
            builder.max_filesize(Some(max));
        }

        // We disable the built-in hidden filter because we need a more
        // nuanced policy (skip hidden except for allowlisted names).
        builder.hidden(false);

        // In the overrides system a glob with a `!` prefix means "exclude".
        let mut overrides = OverrideBuilder::new(&self.root);
        for dir in DEFAULT_EXCLUSIONS {
            let pattern = format!("!{dir}/");
            overrides
                .add(&pattern)
                .expect("default exclusion pattern should be valid");
        }
        for pattern in &self.extra_ignores {
            // User globs are exclusions; ignore ones that fail to compile.
            let _ = overrides.add(&format!("!{pattern}"));
        }
        builder.overrides(overrides.build().expect("override builder should succeed"));

        // Custom filter: skip hidden entries (name starts with `.`) unless
        // they appear in the allowlist.
        builder.filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            if name.starts_with('.') {
                // The root entry itself (depth 0) always passes through.
                if entry.depth() == 0 {
                    return true;
                }
                return HIDDEN_ALLOWLIST.iter().any(|a| *a == &*name);
            }
            true
        });

        builder
    }

    /// Walk the file tree and collect all matching file paths, sorted so
    /// every scan visits files in the same order.
    pub fn collect_paths(&self) -> Vec<PathBuf> {
        let builder = self.make_builder();
        let mut paths = Vec::new();
        for result in builder.build() {
            let entry = match result {
                Ok(e) => e,
                Err(_) => continue,
            };
            if entry.file_type().is_some_and(|ft| ft.is_file()) {
                paths.push(entry.into_path());
            }
        }
        paths.sort();
        paths
    }

    /// Walk the file tree and collect [`FileRecord`]s relative to the walk
    /// root, sorted by path for a deterministic inventory.
    ///
    /// An entry that disappears between enumeration and stat is skipped,
    /// not fatal.
    pub fn collect_records(&self) -> Vec<FileRecord> {
        let mut records: Vec<FileRecord> = self
            .collect_paths()
            .into_iter()
            .filter_map(|abs| {
                let rel = abs.strip_prefix(&self.root).ok()?;
                let meta = std::fs::metadata(&abs).ok()?;
                let modified = meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_secs());
                Some(FileRecord {
                    path: relative_to_string(rel),
                    size: meta.len(),
                    modified,
                })
            })
            .collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records
    }
}

/// Whether an entry name is excluded by the default policy: dependency and
/// build directories, plus hidden names outside the allowlist. Used by the
/// non-recursive listing paths so that every component filters identically.
pub fn is_excluded_name(name: &str) -> bool {
    if DEFAULT_EXCLUSIONS.contains(&name) {
        return true;
    }
    name.starts_with('.') && !HIDDEN_ALLOWLIST.contains(&name)
}

/// Render a relative path with `/` separators regardless of platform.
pub fn relative_to_string(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Helper: create a temporary directory tree for testing.
    struct TestDir {
        dir: tempfile::TempDir,
    }

    impl TestDir {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        /// Create a file (and any necessary parent directories).
        fn create_file(&self, relative: &str) {
            self.create_file_with(relative, "content");
        }

        fn create_file_with(&self, relative: &str, content: &str) {
            let p = self.dir.path().join(relative);
            if let Some(parent) = p.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&p, content).unwrap();
        }
    }

    fn sorted_relative(root: &Path, paths: &[PathBuf]) -> Vec<String> {
        let mut rel: Vec<String> = paths
            .iter()
            .filter_map(|p| {
                p.strip_prefix(root)
                    .ok()
                    .map(|r| r.to_string_lossy().into_owned())
            })
            .collect();
        rel.sort();
        rel
    }

    #[test]
    fn respects_gitignore() {
        let td = TestDir::new();
        // The ignore crate only respects .gitignore inside a git repository.
        fs::create_dir(td.path().join(".git")).unwrap();
        td.create_file("keep.rs");
        td.create_file("ignored.log");
        fs::write(td.path().join(".gitignore"), "*.log\n").unwrap();

        let walker = Walker::new(td.path());
        let rel = sorted_relative(td.path(), &walker.collect_paths());

        assert!(rel.contains(&"keep.rs".to_string()));
        assert!(!rel.contains(&"ignored.log".to_string()));
    }

    #[test]
    fn skips_default_exclusions() {
        let td = TestDir::new();
        td.create_file("src/main.rs");
        td.create_file("node_modules/pkg/index.js");
        td.create_file("vendor/lib.go");
        td.create_file("target/debug/bin");
        td.create_file("build/output.js");
        td.create_file("dist/bundle.js");
        td.create_file("__pycache__/mod.pyc");
        td.create_file(".venv/bin/python");
        td.create_file("venv/bin/python");

        let walker = Walker::new(td.path());
        let rel = sorted_relative(td.path(), &walker.collect_paths());

        assert!(
            rel.contains(&"src/main.rs".to_string()),
            "src/main.rs should be present, got: {rel:?}"
        );
        for dir in DEFAULT_EXCLUSIONS {
            assert!(
                !rel.iter().any(|p| p.starts_with(dir)),
                "{dir} should be excluded"
            );
        }
    }

    #[test]
    fn skips_hidden_except_github() {
        let td = TestDir::new();
        td.create_file("visible.rs");
        td.create_file(".hidden/secret.txt");
        td.create_file(".github/workflows/ci.yml");

        let walker = Walker::new(td.path());
        let rel = sorted_relative(td.path(), &walker.collect_paths());

        assert!(rel.contains(&"visible.rs".to_string()));
        assert!(
            rel.iter().any(|p| p.starts_with(".github")),
            ".github should be allowed, got: {rel:?}"
        );
        assert!(
            !rel.iter().any(|p| p.starts_with(".hidden")),
            ".hidden should be skipped"
        );
    }

    #[test]
    fn extra_ignores_are_applied() {
        let td = TestDir::new();
        td.create_file("src/lib.rs");
        td.create_file("generated/schema.rs");

        let walker =
            Walker::new(td.path()).extra_ignores(&["generated/".to_string()]);
        let rel = sorted_relative(td.path(), &walker.collect_paths());

        assert!(rel.contains(&"src/lib.rs".to_string()));
        assert!(!rel.iter().any(|p| p.starts_with("generated")));
    }

    #[test]
    fn max_file_size_filters_large_files() {
        let td = TestDir::new();
        td.create_file_with("small.txt", "tiny");
        td.create_file_with("large.txt", &"x".repeat(4096));

        let walker = Walker::new(td.path()).max_file_size(1024);
        let rel = sorted_relative(td.path(), &walker.collect_paths());

        assert!(rel.contains(&"small.txt".to_string()));
        assert!(!rel.contains(&"large.txt".to_string()));
    }

    #[test]
    fn records_are_relative_and_sorted() {
        let td = TestDir::new();
        td.create_file("b.rs");
        td.create_file("a/z.py");
        td.create_file("a/a.py");

        let records = Walker::new(td.path()).collect_records();
        let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["a/a.py", "a/z.py", "b.rs"]);
        assert!(records.iter().all(|r| r.size > 0));
    }

    #[test]
    fn inventory_is_deterministic() {
        let td = TestDir::new();
        td.create_file("one.rs");
        td.create_file("sub/two.py");
        td.create_file("sub/three.js");

        let first = Walker::new(td.path()).collect_records();
        let second = Walker::new(td.path()).collect_records();
        assert_eq!(first, second);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let td = TestDir::new();
        td.create_file("real/file.rs");
        std::os::unix::fs::symlink(td.path().join("real"), td.path().join("loop")).unwrap();

        let rel = sorted_relative(td.path(), &Walker::new(td.path()).collect_paths());
        assert!(rel.contains(&"real/file.rs".to_string()));
        assert!(!rel.iter().any(|p| p.starts_with("loop/")));
    }
}
