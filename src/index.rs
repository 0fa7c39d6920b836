//! The project-wide symbol index.
//!
//! Aggregates parsed declarations across all files into a name → declaration
//! sites mapping. The index is a pure function of the file set's text:
//! building twice on unchanged input yields identical results, and a rebuild
//! constructs an entirely new value so that publication is a single swap —
//! readers never observe a half-built index.

use std::collections::HashMap;
use std::path::Path;

use rayon::prelude::*;

use crate::parser::{self, ParsedUnit};
use crate::types::{FileRecord, Symbol, SymbolKind};

/// Name → declaration sites, plus a per-file view for listings.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    by_name: HashMap<String, Vec<Symbol>>,
    symbol_count: usize,
    file_count: usize,
}

/// The outcome of an index build: the index itself plus per-file warnings
/// for files that could not be read (soft failures, the build continues).
#[derive(Debug)]
pub struct BuildOutcome {
    pub index: SymbolIndex,
    pub units: Vec<(String, u64, ParsedUnit)>,
    pub warnings: Vec<String>,
}

impl SymbolIndex {
    /// Build an index over the given inventory. Files whose extension is
    /// not a recognized source language are skipped; unreadable files
    /// produce a warning, not a failure.
    ///
    /// Parsing runs in parallel; the merge is sequential over inventory
    /// order, and every declaration list is sorted by (file, line) so the
    /// result is deterministic regardless of scheduling.
    pub fn build(root: &Path, records: &[FileRecord]) -> BuildOutcome {
        let parsed: Vec<Result<(String, u64, ParsedUnit), String>> = records
            .par_iter()
            .filter_map(|rec| {
                let lang = parser::detect_language(Path::new(&rec.path))?;
                let abs = root.join(&rec.path);
                Some(match read_source(&abs) {
                    Ok(text) => {
                        let fingerprint = xxhash_rust::xxh3::xxh3_64(text.as_bytes());
                        let unit = parser::parse_source(&rec.path, &text, lang);
                        Ok((rec.path.clone(), fingerprint, unit))
                    }
                    Err(reason) => Err(format!("{}: {reason}", rec.path)),
                })
            })
            .collect();

        let mut index = SymbolIndex::default();
        let mut units = Vec::new();
        let mut warnings = Vec::new();
        for item in parsed {
            match item {
                Ok((path, fingerprint, unit)) => {
                    index.file_count += 1;
                    index.merge(&unit);
                    units.push((path, fingerprint, unit));
                }
                Err(w) => warnings.push(w),
            }
        }
        index.finish();
        BuildOutcome {
            index,
            units,
            warnings,
        }
    }

    /// Merge one file's declarations into the map.
    fn merge(&mut self, unit: &ParsedUnit) {
        for sym in &unit.symbols {
            self.symbol_count += 1;
            self.by_name
                .entry(sym.name.clone())
                .or_default()
                .push(sym.clone());
        }
    }

    /// Sort every declaration list by (file, line) for determinism.
    fn finish(&mut self) {
        for decls in self.by_name.values_mut() {
            decls.sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));
        }
    }

    /// Number of declarations in the index.
    pub fn symbol_count(&self) -> usize {
        self.symbol_count
    }

    /// Number of source files that contributed to the index.
    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// Look up declarations by name.
    ///
    /// `exact` requires the full name; otherwise a case-insensitive
    /// substring match is applied. Results are ordered by file path then
    /// line number.
    pub fn lookup(&self, name: &str, exact: bool, kind: Option<SymbolKind>) -> Vec<Symbol> {
        let mut results: Vec<Symbol> = if exact {
            self.by_name.get(name).cloned().unwrap_or_default()
        } else {
            let needle = name.to_lowercase();
            let mut hits: Vec<Symbol> = self
                .by_name
                .iter()
                .filter(|(key, _)| key.to_lowercase().contains(&needle))
                .flat_map(|(_, decls)| decls.iter().cloned())
                .collect();
            hits.sort_by(|a, b| {
                a.file
                    .cmp(&b.file)
                    .then(a.line.cmp(&b.line))
                    .then(a.name.cmp(&b.name))
            });
            hits
        };
        if let Some(kind) = kind {
            results.retain(|s| s.kind == kind);
        }
        results
    }

    /// Exact-name declaration sites, excluding imports, restricted to the
    /// first match per file. A symbol may legitimately be defined in more
    /// than one file, so this is always a list, never collapsed to a
    /// single entry.
    pub fn find_definition(&self, name: &str) -> Vec<Symbol> {
        let Some(decls) = self.by_name.get(name) else {
            return Vec::new();
        };
        let mut results: Vec<Symbol> = Vec::new();
        for sym in decls {
            if sym.kind == SymbolKind::Import {
                continue;
            }
            // Lists are sorted by (file, line), so the first hit per file
            // is the earliest declaration in that file.
            if results.last().is_none_or(|prev| prev.file != sym.file) {
                results.push(sym.clone());
            }
        }
        results
    }

    /// Whether `name` has a declaration recorded at exactly (file, line).
    /// Drives declaration-vs-reference classification.
    pub fn is_declared_at(&self, name: &str, file: &str, line: usize) -> bool {
        self.by_name
            .get(name)
            .is_some_and(|decls| decls.iter().any(|s| s.file == file && s.line == line))
    }

    /// Declarations within one file, ordered by line.
    pub fn symbols_in_file(&self, file: &str) -> Vec<Symbol> {
        let mut results: Vec<Symbol> = self
            .by_name
            .values()
            .flat_map(|decls| decls.iter().filter(|s| s.file == file).cloned())
            .collect();
        results.sort_by(|a, b| a.line.cmp(&b.line).then(a.name.cmp(&b.name)));
        results
    }
}

/// Read a file as text, rejecting binary content.
///
/// Decoding is a probe: a NUL byte in the first block marks the file as
/// binary. Non-UTF-8 text degrades to a lossy decode rather than an error,
/// matching how the engine treats legacy encodings.
pub fn read_source(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    let probe = &bytes[..bytes.len().min(8192)];
    if probe.contains(&0) {
        return Err("binary content".to_string());
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
