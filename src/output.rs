//! Output formatting: human-readable text (default) and JSON Lines (`--json`).
//!
//! All result data flows through a [`Formatter`] which writes to an
//! arbitrary [`std::io::Write`] destination (typically stdout).
//! Hints and errors always go to stderr via [`print_error`].

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use crate::errors::ScoutError;
use crate::search::SearchMatch;
use crate::types::{ImportRecord, ReferenceMatch, Symbol};

// ---------------------------------------------------------------------------
// Serializable output types
// ---------------------------------------------------------------------------

/// Project overview returned by `explore_project`.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub project_path: String,
    pub project_name: String,
    pub stats: ProjectStats,
    /// First-level entries, directories first, truncated to a preview.
    pub structure: Vec<StructureEntry>,
    pub truncated: bool,
    /// Declarations found by the initial index build.
    pub indexed_symbols: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Whole-inventory statistics.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectStats {
    pub total_files: usize,
    pub code_files: usize,
    pub directories: usize,
    /// Extension → file count, e.g. `".py" -> 12`.
    pub file_types: BTreeMap<String, usize>,
    pub size_total: u64,
}

/// One first-level entry in the structure preview.
#[derive(Debug, Clone, Serialize)]
pub struct StructureEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// One file entry for `list_files` results.
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub path: String,
    pub name: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<u64>,
}

/// A text slice returned by `read_file`.
#[derive(Debug, Clone, Serialize)]
pub struct FileSlice {
    pub file: String,
    pub content: String,
    pub total_lines: usize,
    /// The effective inclusive range, e.g. `"10-42"`.
    pub line_range: String,
    pub size: u64,
}

/// A single search match (corresponds to `SearchMatch` in `search.rs`).
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutput {
    pub file: String,
    pub line: u64,
    pub col: u64,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub context_before: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub context_after: Vec<String>,
}

impl From<SearchMatch> for SearchOutput {
    fn from(m: SearchMatch) -> Self {
        Self {
            file: m.file,
            line: m.line,
            col: m.col,
            content: m.content,
            context_before: m.context_before,
            context_after: m.context_after,
        }
    }
}

/// A symbol declaration result.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolOutput {
    pub name: String,
    pub kind: String,
    pub file: String,
    pub line: usize,
    pub col: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub signature: String,
    pub language: String,
}

impl From<&Symbol> for SymbolOutput {
    fn from(sym: &Symbol) -> Self {
        Self {
            name: sym.name.clone(),
            kind: sym.kind.to_string(),
            file: sym.file.clone(),
            line: sym.line,
            col: sym.col,
            scope: sym.scope.clone(),
            signature: sym.signature.clone(),
            language: sym.language.clone(),
        }
    }
}

/// A classified reference result.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceOutput {
    pub file: String,
    pub line: usize,
    pub col: usize,
    pub content: String,
    #[serde(rename = "type")]
    pub class: String,
}

impl From<&ReferenceMatch> for ReferenceOutput {
    fn from(r: &ReferenceMatch) -> Self {
        Self {
            file: r.file.clone(),
            line: r.line,
            col: r.col,
            content: r.content.clone(),
            class: r.class.to_string(),
        }
    }
}

/// One import statement in an import listing.
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutput {
    pub module: String,
    pub statement: String,
    pub line: usize,
}

impl From<&ImportRecord> for ImportOutput {
    fn from(rec: &ImportRecord) -> Self {
        Self {
            module: rec.module.clone(),
            statement: rec.statement.clone(),
            line: rec.line,
        }
    }
}

/// Imports of one file, as part of the project import graph.
#[derive(Debug, Clone, Serialize)]
pub struct FileImportsOutput {
    pub file: String,
    pub imports: Vec<ImportOutput>,
    /// Unique imported module names, sorted.
    pub dependencies: Vec<String>,
}

// ---------------------------------------------------------------------------
// Formatter
// ---------------------------------------------------------------------------

/// Output formatter that renders results as plain text or JSON Lines
/// (one JSON object per line).
pub struct Formatter<W: Write> {
    writer: W,
    json: bool,
}

impl<W: Write> Formatter<W> {
    /// * `writer` - The destination for output (e.g. `std::io::stdout()`).
    /// * `json`   - When `true`, emit JSON Lines; otherwise, plain text.
    pub fn new(writer: W, json: bool) -> Self {
        Self { writer, json }
    }

    fn emit_json<T: Serialize>(&mut self, item: &T) -> std::io::Result<()> {
        let line = serde_json::to_string(item).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")
    }

    pub fn summary(&mut self, summary: &ProjectSummary) -> std::io::Result<()> {
        if self.json {
            return self.emit_json(summary);
        }
        writeln!(
            self.writer,
            "{} ({} files, {} code files, {} symbols)",
            summary.project_path,
            summary.stats.total_files,
            summary.stats.code_files,
            summary.indexed_symbols
        )?;
        for entry in &summary.structure {
            writeln!(self.writer, "  {} {}", entry.entry_type, entry.name)?;
        }
        if summary.truncated {
            writeln!(self.writer, "  ...")?;
        }
        Ok(())
    }

    pub fn files(&mut self, entries: &[FileEntry]) -> std::io::Result<()> {
        for entry in entries {
            if self.json {
                self.emit_json(entry)?;
            } else {
                writeln!(self.writer, "{} ({} bytes)", entry.path, entry.size)?;
            }
        }
        Ok(())
    }

    pub fn slice(&mut self, slice: &FileSlice) -> std::io::Result<()> {
        if self.json {
            return self.emit_json(slice);
        }
        write!(self.writer, "{}", slice.content)?;
        if !slice.content.ends_with('\n') && !slice.content.is_empty() {
            writeln!(self.writer)?;
        }
        Ok(())
    }

    pub fn matches(&mut self, matches: &[SearchOutput]) -> std::io::Result<()> {
        for m in matches {
            if self.json {
                self.emit_json(m)?;
            } else {
                for line in &m.context_before {
                    writeln!(self.writer, "{}-{}", m.file, line)?;
                }
                writeln!(self.writer, "{}:{}:{}", m.file, m.line, m.content)?;
                for line in &m.context_after {
                    writeln!(self.writer, "{}-{}", m.file, line)?;
                }
            }
        }
        Ok(())
    }

    pub fn symbols(&mut self, symbols: &[SymbolOutput]) -> std::io::Result<()> {
        for sym in symbols {
            if self.json {
                self.emit_json(sym)?;
            } else {
                let scope = sym
                    .scope
                    .as_deref()
                    .map(|s| format!("{s}."))
                    .unwrap_or_default();
                writeln!(
                    self.writer,
                    "{}:{}: {} {}{}",
                    sym.file, sym.line, sym.kind, scope, sym.name
                )?;
            }
        }
        Ok(())
    }

    pub fn references(&mut self, refs: &[ReferenceOutput]) -> std::io::Result<()> {
        for r in refs {
            if self.json {
                self.emit_json(r)?;
            } else {
                writeln!(
                    self.writer,
                    "{}:{}:{} [{}] {}",
                    r.file, r.line, r.col, r.class, r.content
                )?;
            }
        }
        Ok(())
    }

    pub fn imports(&mut self, groups: &[FileImportsOutput]) -> std::io::Result<()> {
        for group in groups {
            if self.json {
                self.emit_json(group)?;
            } else {
                writeln!(self.writer, "{}:", group.file)?;
                for imp in &group.imports {
                    writeln!(self.writer, "  {}: {}", imp.line, imp.statement)?;
                }
            }
        }
        Ok(())
    }

    /// Arbitrary serializable payload (metrics, pattern groups). Text mode
    /// falls back to pretty JSON, which reads well for nested structures.
    pub fn value<T: Serialize>(&mut self, item: &T) -> std::io::Result<()> {
        if self.json {
            self.emit_json(item)
        } else {
            let pretty = serde_json::to_string_pretty(item).map_err(std::io::Error::other)?;
            writeln!(self.writer, "{pretty}")
        }
    }

    /// Warnings accompany partial results; text mode sends them inline
    /// prefixed so they cannot be confused with matches.
    pub fn warnings(&mut self, warnings: &[String]) -> std::io::Result<()> {
        for w in warnings {
            if self.json {
                self.emit_json(&serde_json::json!({ "warning": w }))?;
            } else {
                writeln!(self.writer, "warning: {w}")?;
            }
        }
        Ok(())
    }
}

/// Print an error (and its hint, when available) to stderr.
pub fn print_error(err: &ScoutError) {
    eprintln!("scout: {err}");
    if let Some(hint) = err.hint() {
        eprintln!("hint: {hint}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MatchClass;

    fn text_formatter(buf: &mut Vec<u8>) -> Formatter<&mut Vec<u8>> {
        Formatter::new(buf, false)
    }

    fn json_formatter(buf: &mut Vec<u8>) -> Formatter<&mut Vec<u8>> {
        Formatter::new(buf, true)
    }

    fn sample_symbol() -> SymbolOutput {
        SymbolOutput {
            name: "foo".into(),
            kind: "function".into(),
            file: "a.py".into(),
            line: 3,
            col: 0,
            scope: None,
            signature: "def foo():".into(),
            language: "Python".into(),
        }
    }

    #[test]
    fn text_symbols_are_grep_style() {
        let mut buf = Vec::new();
        text_formatter(&mut buf).symbols(&[sample_symbol()]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "a.py:3: function foo\n");
    }

    #[test]
    fn scoped_symbol_shows_scope() {
        let mut sym = sample_symbol();
        sym.scope = Some("Greeter".into());
        sym.kind = "method".into();
        let mut buf = Vec::new();
        text_formatter(&mut buf).symbols(&[sym]).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("method Greeter.foo"));
    }

    #[test]
    fn json_symbols_are_json_lines() {
        let mut buf = Vec::new();
        json_formatter(&mut buf)
            .symbols(&[sample_symbol(), sample_symbol()])
            .unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let v: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(v["name"], "foo");
            assert!(v.get("scope").is_none(), "None scope is omitted");
        }
    }

    #[test]
    fn text_matches_include_context_markers() {
        let m = SearchOutput {
            file: "a.rs".into(),
            line: 2,
            col: 1,
            content: "middle".into(),
            context_before: vec!["before".into()],
            context_after: vec!["after".into()],
        };
        let mut buf = Vec::new();
        text_formatter(&mut buf).matches(&[m]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "a.rs-before\na.rs:2:middle\na.rs-after\n");
    }

    #[test]
    fn reference_output_carries_classification() {
        let r = ReferenceMatch {
            file: "b.py".into(),
            line: 1,
            col: 1,
            content: "foo()".into(),
            class: MatchClass::Reference,
        };
        let out = ReferenceOutput::from(&r);
        assert_eq!(out.class, "reference");
        let mut buf = Vec::new();
        text_formatter(&mut buf).references(&[out]).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("[reference]"));
    }

    #[test]
    fn warnings_are_prefixed() {
        let mut buf = Vec::new();
        text_formatter(&mut buf)
            .warnings(&["gone.py: not found".into()])
            .unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "warning: gone.py: not found\n"
        );
    }
}
