//! Text pattern search engine wrapping the `grep` crate.
//!
//! The one search path used directly by `search_files` /
//! `search_code_advanced` and as a building block by the reference
//! resolver. Supports literal and regex queries, case sensitivity,
//! whole-word matching, extension filtering, context windows, and a global
//! result cap that short-circuits the scan. Binary files are excluded by a
//! decode probe; unreadable files degrade to per-file warnings so a
//! directory-wide scan never aborts because of one bad file.

use std::path::{Path, PathBuf};

use grep::regex::RegexMatcherBuilder;
use grep::searcher::{BinaryDetection, Searcher, SearcherBuilder, Sink, SinkMatch};

use crate::errors::ScoutError;
use crate::walker::{Walker, relative_to_string};

/// Options for one search request.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Treat the query as a regular expression instead of a literal.
    pub regex: bool,
    /// Match case-sensitively.
    pub case_sensitive: bool,
    /// Match whole words only (identifier boundaries on both sides).
    pub whole_word: bool,
    /// Restrict to files matching an extension pattern, e.g. `"*.py,*.js"`.
    pub file_glob: Option<String>,
    /// Lines of surrounding text captured per match.
    pub context_lines: usize,
    /// Stop scanning once this many matches have been collected.
    pub max_results: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            regex: false,
            case_sensitive: false,
            whole_word: false,
            file_glob: None,
            context_lines: 0,
            max_results: 50,
        }
    }
}

/// One matching line, with its context window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    /// Path relative to the project root.
    pub file: String,
    /// 1-based line number.
    pub line: u64,
    /// 1-based column of the first match on the line.
    pub col: u64,
    /// The matched line, trailing newline stripped.
    pub content: String,
    /// Up to `context_lines` lines preceding the match.
    pub context_before: Vec<String>,
    /// Up to `context_lines` lines following the match.
    pub context_after: Vec<String>,
}

/// A completed scan: matches in walk order, per-file warnings, and whether
/// the result cap cut the scan short.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub matches: Vec<SearchMatch>,
    pub warnings: Vec<String>,
    pub truncated: bool,
}

/// Search `scope` (a directory or single file under `root`) for `query`.
///
/// A malformed regex fails with [`ScoutError::InvalidQuery`]; everything
/// per-file is soft. Paths in results are reported relative to `root`.
pub fn search(
    root: &Path,
    scope: &Path,
    query: &str,
    opts: &SearchOptions,
    extra_ignores: &[String],
) -> Result<SearchOutcome, ScoutError> {
    let mut builder = RegexMatcherBuilder::new();
    builder.case_insensitive(!opts.case_sensitive);
    builder.line_terminator(Some(b'\n'));
    builder.word(opts.whole_word);
    if !opts.regex {
        builder.fixed_strings(true);
    }
    let matcher = builder
        .build(query)
        .map_err(|e| ScoutError::InvalidQuery(e.to_string()))?;

    // A parallel regex used only to locate the column of the first match
    // on each line; grep's sink reports lines, not columns.
    let col_finder = column_finder(query, opts)?;

    let mut searcher = SearcherBuilder::new()
        .binary_detection(BinaryDetection::quit(b'\x00'))
        .line_number(true)
        .build();

    let extensions = opts.file_glob.as_deref().map(parse_file_pattern);

    let files: Vec<PathBuf> = if scope.is_file() {
        vec![scope.to_path_buf()]
    } else {
        Walker::new(scope).extra_ignores(extra_ignores).collect_paths()
    };

    let mut outcome = SearchOutcome::default();
    for abs in files {
        if outcome.matches.len() >= opts.max_results {
            outcome.truncated = true;
            break;
        }
        if let Some(exts) = &extensions
            && !extension_matches(&abs, exts)
        {
            continue;
        }

        let rel = abs
            .strip_prefix(root)
            .map(relative_to_string)
            .unwrap_or_else(|_| abs.to_string_lossy().into_owned());

        let start = outcome.matches.len();
        let mut sink = CollectSink {
            file: rel.clone(),
            col_finder: &col_finder,
            matches: &mut outcome.matches,
            remaining: opts.max_results,
        };
        if let Err(e) = searcher.search_path(&matcher, &abs, &mut sink) {
            // Deleted mid-scan, permission change: skip, keep scanning.
            outcome.warnings.push(format!("{rel}: {e}"));
            continue;
        }
        if outcome.matches.len() > start && opts.context_lines > 0 {
            fill_context(&abs, &mut outcome.matches[start..], opts.context_lines);
        }
    }
    if outcome.matches.len() >= opts.max_results {
        outcome.truncated = true;
        outcome.matches.truncate(opts.max_results);
    }
    Ok(outcome)
}

/// Build the column-locating regex mirroring the grep matcher's options.
fn column_finder(query: &str, opts: &SearchOptions) -> Result<regex::Regex, ScoutError> {
    let mut pattern = if opts.regex {
        query.to_string()
    } else {
        regex::escape(query)
    };
    if opts.whole_word {
        pattern = format!(r"\b(?:{pattern})\b");
    }
    if !opts.case_sensitive {
        pattern = format!("(?i){pattern}");
    }
    regex::Regex::new(&pattern).map_err(|e| ScoutError::InvalidQuery(e.to_string()))
}

/// Parse a file pattern such as `"*.py,*.js"` into extensions
/// (`[".py", ".js"]`). `"*"` means no filtering.
pub(crate) fn parse_file_pattern(pattern: &str) -> Vec<String> {
    if pattern.trim() == "*" {
        return Vec::new();
    }
    pattern
        .split(',')
        .map(|part| {
            let part = part.trim();
            let part = part.strip_prefix('*').unwrap_or(part);
            if part.starts_with('.') {
                part.to_lowercase()
            } else {
                format!(".{}", part.to_lowercase())
            }
        })
        .filter(|p| p.len() > 1)
        .collect()
}

/// Does the path's extension appear in the filter set? An empty set
/// matches everything.
pub(crate) fn extension_matches(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let dotted = format!(".{}", ext.to_lowercase());
    extensions.iter().any(|e| *e == dotted)
}

/// Attach before/after context windows by re-reading the matched file.
/// If the file changed or vanished since the scan, contexts stay empty —
/// the match itself is still reported.
fn fill_context(abs: &Path, matches: &mut [SearchMatch], context_lines: usize) {
    let Ok(text) = std::fs::read_to_string(abs) else {
        return;
    };
    let lines: Vec<&str> = text.lines().collect();
    for m in matches {
        let idx = (m.line as usize).saturating_sub(1);
        if idx >= lines.len() {
            continue;
        }
        let start = idx.saturating_sub(context_lines);
        let end = (idx + context_lines + 1).min(lines.len());
        m.context_before = lines[start..idx].iter().map(|l| l.to_string()).collect();
        m.context_after = lines[idx + 1..end].iter().map(|l| l.to_string()).collect();
    }
}

/// A [`Sink`] that collects matching lines, stopping the file's scan when
/// the global result cap is reached.
struct CollectSink<'a> {
    file: String,
    col_finder: &'a regex::Regex,
    matches: &'a mut Vec<SearchMatch>,
    remaining: usize,
}

impl Sink for CollectSink<'_> {
    type Error = std::io::Error;

    fn matched(&mut self, _searcher: &Searcher, mat: &SinkMatch<'_>) -> Result<bool, Self::Error> {
        if self.matches.len() >= self.remaining {
            return Ok(false); // cap reached: stop this file
        }
        let line_number = mat.line_number().unwrap_or(0);
        let content = String::from_utf8_lossy(mat.bytes())
            .trim_end_matches(['\n', '\r'])
            .to_string();
        let col = self
            .col_finder
            .find(&content)
            .map(|m| m.start() as u64 + 1)
            .unwrap_or(1);

        self.matches.push(SearchMatch {
            file: self.file.clone(),
            line: line_number,
            col,
            content,
            context_before: Vec::new(),
            context_after: Vec::new(),
        });
        Ok(self.matches.len() < self.remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

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

        fn create_file(&self, relative: &str, content: &str) {
            let p = self.dir.path().join(relative);
            if let Some(parent) = p.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&p, content).unwrap();
        }
    }

    fn run(td: &TestDir, query: &str, opts: &SearchOptions) -> SearchOutcome {
        search(td.path(), td.path(), query, opts, &[]).unwrap()
    }

    #[test]
    fn literal_search_finds_exact_match() {
        let td = TestDir::new();
        td.create_file("hello.txt", "Hello World\nfoo bar\nHello Again\n");

        let outcome = run(
            &td,
            "Hello",
            &SearchOptions {
                case_sensitive: true,
                ..Default::default()
            },
        );
        assert_eq!(outcome.matches.len(), 2);
        assert_eq!(outcome.matches[0].line, 1);
        assert_eq!(outcome.matches[0].content, "Hello World");
        assert_eq!(outcome.matches[1].line, 3);
    }

    #[test]
    fn case_insensitive_by_default() {
        let td = TestDir::new();
        td.create_file("t.txt", "Hello\nhello\nHELLO\nworld\n");
        let outcome = run(&td, "hello", &SearchOptions::default());
        assert_eq!(outcome.matches.len(), 3);
    }

    #[test]
    fn whole_word_rejects_substrings() {
        let td = TestDir::new();
        td.create_file("t.txt", "log\nlogin\nlogged out, log in\n");

        let whole = run(
            &td,
            "log",
            &SearchOptions {
                whole_word: true,
                ..Default::default()
            },
        );
        // "log" on line 1, "log" inside "log in" on line 3; never "login"
        assert_eq!(whole.matches.len(), 2);
        assert_eq!(whole.matches[0].line, 1);
        assert_eq!(whole.matches[1].line, 3);

        let loose = run(&td, "log", &SearchOptions::default());
        assert_eq!(loose.matches.len(), 3, "without whole_word, login matches too");
    }

    #[test]
    fn literal_mode_does_not_interpret_metacharacters() {
        let td = TestDir::new();
        td.create_file("meta.txt", "a.b\nacb\na*b\n");
        let outcome = run(&td, "a.b", &SearchOptions::default());
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].content, "a.b");
    }

    #[test]
    fn regex_mode_interprets_patterns() {
        let td = TestDir::new();
        td.create_file("code.rs", "fn main() {}\nfn helper() {}\nlet x = 42;\n");
        let outcome = run(
            &td,
            r"fn \w+\(\)",
            &SearchOptions {
                regex: true,
                ..Default::default()
            },
        );
        assert_eq!(outcome.matches.len(), 2);
    }

    #[test]
    fn malformed_regex_is_invalid_query() {
        let td = TestDir::new();
        td.create_file("t.txt", "content\n");
        let err = search(
            td.path(),
            td.path(),
            "(unclosed",
            &SearchOptions {
                regex: true,
                ..Default::default()
            },
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, ScoutError::InvalidQuery(_)));
    }

    #[test]
    fn max_results_caps_the_scan() {
        let td = TestDir::new();
        let mut content = String::new();
        for i in 0..100 {
            content.push_str(&format!("needle {i}\n"));
        }
        td.create_file("big.txt", &content);

        let outcome = run(
            &td,
            "needle",
            &SearchOptions {
                max_results: 5,
                ..Default::default()
            },
        );
        assert_eq!(outcome.matches.len(), 5);
        assert!(outcome.truncated);
    }

    #[test]
    fn cap_spans_multiple_files() {
        let td = TestDir::new();
        for name in ["a.txt", "b.txt", "c.txt"] {
            td.create_file(name, "needle\nneedle\nneedle\n");
        }
        let outcome = run(
            &td,
            "needle",
            &SearchOptions {
                max_results: 4,
                ..Default::default()
            },
        );
        assert_eq!(outcome.matches.len(), 4);
        assert!(outcome.truncated);
    }

    #[test]
    fn context_lines_surround_match() {
        let td = TestDir::new();
        td.create_file("ctx.txt", "one\ntwo\nthree target\nfour\nfive\n");
        let outcome = run(
            &td,
            "target",
            &SearchOptions {
                context_lines: 2,
                ..Default::default()
            },
        );
        assert_eq!(outcome.matches.len(), 1);
        let m = &outcome.matches[0];
        assert_eq!(m.context_before, vec!["one", "two"]);
        assert_eq!(m.context_after, vec!["four", "five"]);
    }

    #[test]
    fn context_clamps_at_file_edges() {
        let td = TestDir::new();
        td.create_file("edge.txt", "target\nafter\n");
        let outcome = run(
            &td,
            "target",
            &SearchOptions {
                context_lines: 3,
                ..Default::default()
            },
        );
        let m = &outcome.matches[0];
        assert!(m.context_before.is_empty());
        assert_eq!(m.context_after, vec!["after"]);
    }

    #[test]
    fn file_glob_restricts_extensions() {
        let td = TestDir::new();
        td.create_file("a.py", "needle\n");
        td.create_file("b.js", "needle\n");
        td.create_file("c.txt", "needle\n");

        let outcome = run(
            &td,
            "needle",
            &SearchOptions {
                file_glob: Some("*.py,*.js".into()),
                ..Default::default()
            },
        );
        let files: Vec<&str> = outcome.matches.iter().map(|m| m.file.as_str()).collect();
        assert_eq!(files.len(), 2);
        assert!(files.contains(&"a.py"));
        assert!(files.contains(&"b.js"));
    }

    #[test]
    fn parse_file_pattern_variants() {
        assert!(parse_file_pattern("*").is_empty());
        assert_eq!(parse_file_pattern("*.py"), vec![".py"]);
        assert_eq!(parse_file_pattern(".py, *.JS"), vec![".py", ".js"]);
        assert_eq!(parse_file_pattern("py"), vec![".py"]);
    }

    #[test]
    fn binary_files_are_skipped() {
        let td = TestDir::new();
        fs::write(td.path().join("blob.dat"), b"needle\x00binary\n").unwrap();
        td.create_file("text.txt", "needle\n");

        let outcome = run(&td, "needle", &SearchOptions::default());
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].file, "text.txt");
    }

    #[test]
    fn zero_matches_is_success() {
        let td = TestDir::new();
        td.create_file("t.txt", "nothing here\n");
        let outcome = run(&td, "xyzzy", &SearchOptions::default());
        assert!(outcome.matches.is_empty());
        assert!(!outcome.truncated);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn scope_can_be_a_single_file() {
        let td = TestDir::new();
        td.create_file("a.txt", "needle\n");
        td.create_file("b.txt", "needle\n");
        let outcome = search(
            td.path(),
            &td.path().join("a.txt"),
            "needle",
            &SearchOptions::default(),
            &[],
        )
        .unwrap();
        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].file, "a.txt");
    }

    #[test]
    fn column_reports_first_match_position() {
        let td = TestDir::new();
        td.create_file("t.txt", "  needle here\n");
        let outcome = run(&td, "needle", &SearchOptions::default());
        assert_eq!(outcome.matches[0].col, 3);
    }
}
