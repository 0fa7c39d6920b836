//! Per-file metrics and project-level import analysis.
//!
//! Composes the parser's output into the `analyze_file`, `analyze_imports`
//! and `find_code_patterns` operations. The complexity score is a proxy —
//! counted branching/loop keyword occurrences, not a certified cyclomatic
//! computation.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::errors::ScoutError;
use crate::output::{FileImportsOutput, ImportOutput, SearchOutput};
use crate::parser;
use crate::search::{self, SearchOptions};
use crate::session::Session;
use crate::types::SymbolKind;

/// Default file filter for code-oriented pattern scans.
const CODE_GLOB: &str = "*.py,*.js,*.jsx,*.ts,*.tsx,*.rs,*.go,*.java,*.c,*.h,*.cpp,*.hpp,*.rb,*.php";

/// Metrics for one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileMetrics {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub lines_total: usize,
    pub lines_blank: usize,
    pub lines_comment: usize,
    pub functions: Vec<FunctionMetrics>,
    pub classes: Vec<ClassMetrics>,
    pub imports: Vec<ImportOutput>,
    /// Sum of per-function complexity scores.
    pub complexity: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionMetrics {
    pub name: String,
    pub line: usize,
    /// Raw parameter texts from the signature, defaults stripped.
    pub args: Vec<String>,
    pub complexity: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassMetrics {
    pub name: String,
    pub line: usize,
    pub methods: Vec<String>,
}

/// Matches of one pattern from `find_code_patterns`.
#[derive(Debug, Clone, Serialize)]
pub struct PatternMatches {
    pub pattern: String,
    pub matches: Vec<SearchOutput>,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Branching/loop keywords counted by the complexity proxy.
fn branch_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:if|elif|for|while|case|when|switch|catch|except|rescue)\b|&&|\|\|")
            .expect("branch pattern should be valid")
    })
}

fn branch_count(text: &str) -> usize {
    branch_pattern().find_iter(text).count()
}

/// Compute metrics for one file. Re-running on an unmodified file returns
/// identical results.
pub fn analyze_file(session: &Session, rel: &str) -> Result<FileMetrics, ScoutError> {
    let text = session.read_text(rel)?;
    let lang = parser::detect_language(Path::new(rel));
    let lines: Vec<&str> = text.lines().collect();

    let lines_total = lines.len();
    let lines_blank = lines.iter().filter(|l| l.trim().is_empty()).count();
    let comment_prefixes = lang.map(|l| l.comment_prefixes()).unwrap_or(&[]);
    let lines_comment = lines
        .iter()
        .filter(|l| {
            let trimmed = l.trim_start();
            comment_prefixes.iter().any(|p| trimmed.starts_with(p))
        })
        .count();

    let unit = session.parsed_unit(rel)?;

    let mut functions = Vec::new();
    let mut classes = Vec::new();
    for sym in &unit.symbols {
        match sym.kind {
            SymbolKind::Function | SymbolKind::Method => {
                let body = match sym.end_line {
                    Some(end) if sym.line <= end && end <= lines.len() => {
                        lines[sym.line - 1..end].join("\n")
                    }
                    _ => lines.get(sym.line - 1).copied().unwrap_or("").to_string(),
                };
                functions.push(FunctionMetrics {
                    name: sym.name.clone(),
                    line: sym.line,
                    args: signature_args(&sym.signature),
                    complexity: 1 + branch_count(&body),
                });
            }
            SymbolKind::Class => {
                let methods = unit
                    .symbols
                    .iter()
                    .filter(|s| {
                        s.kind == SymbolKind::Method && s.scope.as_deref() == Some(sym.name.as_str())
                    })
                    .map(|s| s.name.clone())
                    .collect();
                classes.push(ClassMetrics {
                    name: sym.name.clone(),
                    line: sym.line,
                    methods,
                });
            }
            SymbolKind::Import => {}
        }
    }

    let complexity = functions.iter().map(|f| f.complexity).sum();
    Ok(FileMetrics {
        file: rel.to_string(),
        language: lang.map(|l| l.name().to_string()),
        lines_total,
        lines_blank,
        lines_comment,
        imports: unit.imports.iter().map(ImportOutput::from).collect(),
        functions,
        classes,
        complexity,
    })
}

/// Pull parameter texts out of a declaration header: everything between
/// the outermost parentheses, split on top-level commas, defaults
/// stripped. Best-effort across languages.
fn signature_args(signature: &str) -> Vec<String> {
    let Some(open) = signature.find('(') else {
        return Vec::new();
    };
    let Some(close) = signature.rfind(')') else {
        return Vec::new();
    };
    if close <= open + 1 {
        return Vec::new();
    }
    let inner = &signature[open + 1..close];

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in inner.chars() {
        match c {
            '(' | '[' | '{' | '<' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' | '>' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                args.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    args.push(current);

    args.iter()
        .map(|a| a.split('=').next().unwrap_or("").trim().to_string())
        .filter(|a| !a.is_empty())
        .collect()
}

/// Aggregate import records across the scope into a per-file listing.
/// Files that cannot be read are reported as warnings, not failures.
pub fn analyze_imports(
    session: &Session,
    scope: Option<&str>,
) -> Result<(Vec<FileImportsOutput>, Vec<String>), ScoutError> {
    let scope_abs = session.resolve_scope(scope)?;
    let prefix = scope_prefix(session, &scope_abs);

    let mut groups = Vec::new();
    let mut warnings = Vec::new();
    for rec in session.files() {
        if !in_scope(&rec.path, prefix.as_deref()) {
            continue;
        }
        if parser::detect_language(Path::new(&rec.path)).is_none() {
            continue;
        }
        match session.parsed_unit(&rec.path) {
            Ok(unit) => {
                if unit.imports.is_empty() {
                    continue;
                }
                let mut dependencies: Vec<String> =
                    unit.imports.iter().map(|i| i.module.clone()).collect();
                dependencies.sort();
                dependencies.dedup();
                groups.push(FileImportsOutput {
                    file: rec.path.clone(),
                    imports: unit.imports.iter().map(ImportOutput::from).collect(),
                    dependencies,
                });
            }
            Err(e) => warnings.push(format!("{}: {e}", rec.path)),
        }
    }
    Ok((groups, warnings))
}

/// Run each regex pattern over the scope with the pattern search engine
/// (regex mode, code-oriented file filter). A malformed pattern aborts
/// with `InvalidQuery` before any scanning happens.
pub fn find_code_patterns(
    session: &Session,
    patterns: &[String],
    scope: Option<&str>,
) -> Result<Vec<PatternMatches>, ScoutError> {
    if patterns.is_empty() {
        return Err(ScoutError::InvalidQuery(
            "at least one pattern is required".to_string(),
        ));
    }
    // Validate all patterns up front so one bad pattern does not produce
    // partial output.
    for p in patterns {
        Regex::new(p).map_err(|e| ScoutError::InvalidQuery(e.to_string()))?;
    }

    let scope_abs = session.resolve_scope(scope)?;
    let opts = SearchOptions {
        regex: true,
        case_sensitive: true,
        whole_word: false,
        file_glob: Some(CODE_GLOB.to_string()),
        context_lines: 0,
        max_results: session.config().search.max_results,
    };

    let mut results = Vec::new();
    for pattern in patterns {
        let outcome = search::search(
            session.root(),
            &scope_abs,
            pattern,
            &opts,
            session.extra_ignores(),
        )?;
        results.push(PatternMatches {
            pattern: pattern.clone(),
            matches: outcome.matches.into_iter().map(SearchOutput::from).collect(),
            truncated: outcome.truncated,
            warnings: outcome.warnings,
        });
    }
    Ok(results)
}

fn scope_prefix(session: &Session, scope_abs: &Path) -> Option<String> {
    let rel = scope_abs.strip_prefix(session.root()).ok()?;
    if rel.as_os_str().is_empty() {
        None
    } else {
        Some(crate::walker::relative_to_string(rel))
    }
}

fn in_scope(path: &str, prefix: Option<&str>) -> bool {
    match prefix {
        None => true,
        Some(p) => path == p || path.starts_with(&format!("{p}/")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn project(files: &[(&str, &str)]) -> (tempfile::TempDir, Session) {
        let td = tempfile::tempdir().unwrap();
        for (rel, content) in files {
            let p = td.path().join(rel);
            if let Some(parent) = p.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&p, content).unwrap();
        }
        let session = Session::explore(td.path()).unwrap();
        (td, session)
    }

    const SAMPLE_PY: &str = "\
import os

# module for greetings
class Greeter:
    def greet(self, name):
        if name:
            return 'hi ' + name
        return 'hi'

def main():
    for i in range(3):
        print(i)
";

    #[test]
    fn analyze_file_counts_lines() {
        let (_td, session) = project(&[("m.py", SAMPLE_PY)]);
        let metrics = analyze_file(&session, "m.py").unwrap();
        assert_eq!(metrics.lines_total, 12);
        assert_eq!(metrics.lines_blank, 2);
        assert_eq!(metrics.lines_comment, 1);
        assert_eq!(metrics.language.as_deref(), Some("Python"));
    }

    #[test]
    fn analyze_file_reports_declarations() {
        let (_td, session) = project(&[("m.py", SAMPLE_PY)]);
        let metrics = analyze_file(&session, "m.py").unwrap();

        assert_eq!(metrics.classes.len(), 1);
        assert_eq!(metrics.classes[0].name, "Greeter");
        assert_eq!(metrics.classes[0].methods, vec!["greet"]);

        let names: Vec<&str> = metrics.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["greet", "main"]);

        assert_eq!(metrics.imports.len(), 1);
        assert_eq!(metrics.imports[0].module, "os");
    }

    #[test]
    fn complexity_counts_branches() {
        let (_td, session) = project(&[("m.py", SAMPLE_PY)]);
        let metrics = analyze_file(&session, "m.py").unwrap();
        let greet = metrics.functions.iter().find(|f| f.name == "greet").unwrap();
        assert_eq!(greet.complexity, 2, "base 1 + one if");
        let main = metrics.functions.iter().find(|f| f.name == "main").unwrap();
        assert_eq!(main.complexity, 2, "base 1 + one for");
        assert_eq!(metrics.complexity, 4);
    }

    #[test]
    fn analyze_file_is_idempotent() {
        let (_td, session) = project(&[("m.py", SAMPLE_PY)]);
        let a = serde_json::to_string(&analyze_file(&session, "m.py").unwrap()).unwrap();
        let b = serde_json::to_string(&analyze_file(&session, "m.py").unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn signature_args_extraction() {
        assert_eq!(
            signature_args("def greet(self, name='x')"),
            vec!["self", "name"]
        );
        assert_eq!(
            signature_args("fn compute(x: u32, pairs: Vec<(u8, u8)>) -> u32"),
            vec!["x: u32", "pairs: Vec<(u8, u8)>"]
        );
        assert!(signature_args("class Greeter:").is_empty());
        assert!(signature_args("def empty()").is_empty());
    }

    #[test]
    fn analyze_imports_groups_by_file() {
        let (_td, session) = project(&[
            ("a.py", "import os\nimport sys\n"),
            ("sub/b.py", "import json\n"),
            ("plain.txt", "import nothing\n"),
        ]);
        let (groups, warnings) = analyze_imports(&session, None).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].file, "a.py");
        assert_eq!(groups[0].dependencies, vec!["os", "sys"]);
        assert_eq!(groups[1].file, "sub/b.py");
    }

    #[test]
    fn analyze_imports_scope_restricts() {
        let (_td, session) = project(&[
            ("a.py", "import os\n"),
            ("sub/b.py", "import json\n"),
        ]);
        let (groups, _) = analyze_imports(&session, Some("sub")).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].file, "sub/b.py");
    }

    #[test]
    fn find_code_patterns_matches_and_groups() {
        let (_td, session) = project(&[(
            "m.py",
            "def alpha(): pass\ndef beta(): pass\nx = 1\n",
        )]);
        let results =
            find_code_patterns(&session, &[r"def \w+".to_string()], None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matches.len(), 2);
    }

    #[test]
    fn find_code_patterns_rejects_bad_regex() {
        let (_td, session) = project(&[("m.py", "x = 1\n")]);
        let err =
            find_code_patterns(&session, &["(unclosed".to_string()], None).unwrap_err();
        assert!(matches!(err, ScoutError::InvalidQuery(_)));
    }

    #[test]
    fn find_code_patterns_skips_non_code_files() {
        let (_td, session) = project(&[
            ("m.py", "TODO here\n"),
            ("notes.txt", "TODO there\n"),
        ]);
        let results = find_code_patterns(&session, &["TODO".to_string()], None).unwrap();
        assert_eq!(results[0].matches.len(), 1);
        assert_eq!(results[0].matches[0].file, "m.py");
    }

    #[test]
    fn metrics_for_unrecognized_language_still_count_lines() {
        let (_td, session) = project(&[("notes.txt", "hello\n\nworld\n")]);
        let metrics = analyze_file(&session, "notes.txt").unwrap();
        assert_eq!(metrics.lines_total, 3);
        assert_eq!(metrics.lines_blank, 1);
        assert!(metrics.functions.is_empty());
        assert!(metrics.language.is_none());
    }
}
