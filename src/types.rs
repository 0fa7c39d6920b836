//! Shared types and data structures.

use std::fmt;

use serde::Serialize;

/// The kind of a symbol declaration.
///
/// Type-introducing declarations (structs, enums, traits, interfaces) are
/// folded into [`SymbolKind::Class`]; named callables nested inside a
/// class-like scope are [`SymbolKind::Method`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Class,
    Function,
    Method,
    Import,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SymbolKind::Class => "class",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Import => "import",
        };
        write!(f, "{s}")
    }
}

impl SymbolKind {
    /// Parse a kind filter string (as accepted by `search_symbol`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "class" => Some(SymbolKind::Class),
            "function" => Some(SymbolKind::Function),
            "method" => Some(SymbolKind::Method),
            "import" => Some(SymbolKind::Import),
            _ => None,
        }
    }
}

/// A symbol declaration site extracted from one source file.
///
/// Immutable after creation; an index rebuild replaces entries rather than
/// mutating them. `line` always matches the line the declaring construct's
/// keyword/name appears on, exactly as an editor would show it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// The declared name (e.g. function name, class name, imported module).
    pub name: String,
    /// What kind of declaration this is.
    pub kind: SymbolKind,
    /// Path of the source file, relative to the project root.
    pub file: String,
    /// 1-based line number of the declaring construct.
    pub line: usize,
    /// 0-based column offset where the construct starts.
    pub col: usize,
    /// 1-based line number where the construct ends, when known.
    /// The lexical fallback tier cannot determine spans.
    pub end_line: Option<usize>,
    /// Enclosing scope name (e.g. class name for a method).
    pub scope: Option<String>,
    /// Signature text for display (the declaration header).
    pub signature: String,
    /// Language name (e.g. "Rust", "Python").
    pub language: String,
}

/// How a lexical occurrence of a symbol name is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchClass {
    /// The line is a known declaration site of the symbol.
    Declaration,
    /// Any other whole-word occurrence.
    Reference,
}

impl fmt::Display for MatchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchClass::Declaration => write!(f, "declaration"),
            MatchClass::Reference => write!(f, "reference"),
        }
    }
}

/// One line containing a whole-word occurrence of a symbol name; `col`
/// points at the first occurrence on the line.
///
/// Transient: computed per query against the current file text, never
/// cached, because the project may change between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceMatch {
    /// Path relative to the project root.
    pub file: String,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column of the occurrence.
    pub col: usize,
    /// The matched line text, trailing newline stripped.
    pub content: String,
    /// Declaration site or plain reference.
    pub class: MatchClass,
}

/// An import statement found in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    /// Importing file, relative to the project root.
    pub file: String,
    /// The imported module or symbol name.
    pub module: String,
    /// The import statement text, trimmed.
    pub statement: String,
    /// 1-based line number of the statement.
    pub line: usize,
}

/// One file in the project inventory.
///
/// Created on inventory scan, refreshed on demand, never partially
/// updated: a changed file is re-read and re-parsed whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path relative to the project root, `/`-separated.
    pub path: String,
    /// File size in bytes at scan time.
    pub size: u64,
    /// Modification time as seconds since the Unix epoch, when available.
    pub modified: Option<u64>,
}

impl FileRecord {
    /// The lowercased extension, with leading dot (e.g. `".py"`), if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.path.rsplit('/').next()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() {
            return None; // dotfile, not an extension
        }
        Some(format!(".{}", ext.to_lowercase()))
    }

    /// File name component of the path.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_kind_display_round_trips() {
        for kind in [
            SymbolKind::Class,
            SymbolKind::Function,
            SymbolKind::Method,
            SymbolKind::Import,
        ] {
            assert_eq!(SymbolKind::parse(&kind.to_string()), Some(kind));
        }
    }

    #[test]
    fn symbol_kind_parse_rejects_unknown() {
        assert_eq!(SymbolKind::parse("struct"), None);
        assert_eq!(SymbolKind::parse(""), None);
    }

    #[test]
    fn file_record_extension() {
        let rec = FileRecord {
            path: "src/Main.PY".into(),
            size: 0,
            modified: None,
        };
        assert_eq!(rec.extension().as_deref(), Some(".py"));
    }

    #[test]
    fn file_record_dotfile_has_no_extension() {
        let rec = FileRecord {
            path: ".gitignore".into(),
            size: 0,
            modified: None,
        };
        assert_eq!(rec.extension(), None);
    }

    #[test]
    fn file_record_name_is_last_component() {
        let rec = FileRecord {
            path: "a/b/c.rs".into(),
            size: 0,
            modified: None,
        };
        assert_eq!(rec.name(), "c.rs");
    }

    #[test]
    fn match_class_display() {
        assert_eq!(MatchClass::Declaration.to_string(), "declaration");
        assert_eq!(MatchClass::Reference.to_string(), "reference");
    }
}
