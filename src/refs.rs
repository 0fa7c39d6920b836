//! Reference resolution: whole-word occurrences of a symbol name,
//! classified against the index.
//!
//! This is deliberately lexical, not semantic: it cannot distinguish
//! shadowed names in different scopes and over-reports rather than
//! under-reports, because the consuming use case is exploratory navigation.
//! A line is a `declaration` when the index records a declaration of that
//! name at exactly that (file, line); every other whole-word hit is a
//! `reference`. Zero matches is a valid result, not an error.

use std::path::Path;

use crate::errors::ScoutError;
use crate::index::SymbolIndex;
use crate::search::{self, SearchOptions};
use crate::types::{MatchClass, ReferenceMatch};

/// A completed reference scan.
#[derive(Debug, Default)]
pub struct ReferenceOutcome {
    pub references: Vec<ReferenceMatch>,
    pub warnings: Vec<String>,
    pub truncated: bool,
}

/// Find whole-word occurrences of `name` under `scope` and classify each.
///
/// `scope` is a directory (or single file) beneath `root`; the caller has
/// already validated containment. The identifier must be a plausible symbol
/// name — an empty or whitespace query is refused rather than matching
/// everything.
pub fn find_references(
    root: &Path,
    scope: &Path,
    name: &str,
    index: &SymbolIndex,
    cap: usize,
    extra_ignores: &[String],
) -> Result<ReferenceOutcome, ScoutError> {
    if name.trim().is_empty() {
        return Err(ScoutError::InvalidQuery(
            "symbol name must not be empty".to_string(),
        ));
    }

    let opts = SearchOptions {
        regex: false,
        case_sensitive: true,
        whole_word: true,
        file_glob: None,
        context_lines: 0,
        max_results: cap,
    };
    let outcome = search::search(root, scope, name, &opts, extra_ignores)?;

    let references = outcome
        .matches
        .into_iter()
        .map(|m| {
            let line = m.line as usize;
            let class = if index.is_declared_at(name, &m.file, line) {
                MatchClass::Declaration
            } else {
                MatchClass::Reference
            };
            ReferenceMatch {
                file: m.file,
                line,
                col: m.col as usize,
                content: m.content,
                class,
            }
        })
        .collect();

    Ok(ReferenceOutcome {
        references,
        warnings: outcome.warnings,
        truncated: outcome.truncated,
    })
}
