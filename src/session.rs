//! The project session: explored root, file inventory, symbol index, and
//! a fingerprint-keyed cache of parsed units.
//!
//! A session is an explicit value constructed by the front end (CLI router
//! or MCP server) — there is no module-level singleton. Re-exploring builds
//! a complete new session and the owner swaps it wholesale, so concurrent
//! readers never observe a partially populated index. Every query
//! operation takes paths relative to the established root and refuses
//! paths that escape it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::config::Config;
use crate::errors::ScoutError;
use crate::index::{self, SymbolIndex};
use crate::output::{FileEntry, FileSlice, ProjectStats, ProjectSummary, StructureEntry};
use crate::parser::{self, ParsedUnit};
use crate::types::FileRecord;
use crate::walker::{self, Walker};

/// How many first-level entries the explore summary previews.
const STRUCTURE_PREVIEW: usize = 20;

#[derive(Debug)]
struct CachedUnit {
    fingerprint: u64,
    unit: Arc<ParsedUnit>,
}

/// The active project: root, inventory snapshot, index, parse cache.
#[derive(Debug)]
pub struct Session {
    root: PathBuf,
    config: Config,
    files: Vec<FileRecord>,
    index: SymbolIndex,
    warnings: Vec<String>,
    cache: RwLock<HashMap<String, CachedUnit>>,
}

impl Session {
    /// Establish a session over `path`: scan the tree, build the symbol
    /// index, and seed the parse cache. Replaces nothing by itself — the
    /// caller owns the swap of old session for new.
    pub fn explore(path: &Path) -> Result<Session, ScoutError> {
        let root = path.canonicalize().map_err(ScoutError::Io)?;
        if !root.is_dir() {
            return Err(ScoutError::Usage(format!(
                "not a directory: {}",
                path.display()
            )));
        }
        let config = config_or_default(&root);

        let files = Walker::new(&root)
            .max_file_size(config.index.max_file_size_kb * 1024)
            .extra_ignores(&config.ignore.patterns)
            .collect_records();

        let build = SymbolIndex::build(&root, &files);
        let mut cache = HashMap::new();
        for (path, fingerprint, unit) in build.units {
            cache.insert(
                path,
                CachedUnit {
                    fingerprint,
                    unit: Arc::new(unit),
                },
            );
        }

        Ok(Session {
            root,
            config,
            files,
            index: build.index,
            warnings: build.warnings,
            cache: RwLock::new(cache),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn index(&self) -> &SymbolIndex {
        &self.index
    }

    /// Warnings accumulated by the initial index build.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Extra ignore globs from configuration, shared with scan operations.
    pub fn extra_ignores(&self) -> &[String] {
        &self.config.ignore.patterns
    }

    // -- Path containment ---------------------------------------------------

    /// Resolve a root-relative path, refusing absolute paths and anything
    /// that escapes the project root (through `..` or a symlink).
    pub fn resolve_path(&self, rel: &str) -> Result<PathBuf, ScoutError> {
        let requested = Path::new(rel);
        if requested.is_absolute() {
            return Err(ScoutError::PathOutsideProject(rel.to_string()));
        }
        let joined = self.root.join(requested);
        let resolved = joined.canonicalize().map_err(ScoutError::Io)?;
        if !resolved.starts_with(&self.root) {
            return Err(ScoutError::PathOutsideProject(rel.to_string()));
        }
        Ok(resolved)
    }

    /// Resolve an optional scope argument to a directory or file under the
    /// root; `None`, `""` and `"."` mean the root itself.
    pub fn resolve_scope(&self, scope: Option<&str>) -> Result<PathBuf, ScoutError> {
        match scope {
            None | Some("") | Some(".") => Ok(self.root.clone()),
            Some(rel) => self.resolve_path(rel),
        }
    }

    // -- Explore summary ----------------------------------------------------

    /// The project overview: inventory-wide stats plus a first-level
    /// structure preview in the original explorer's shape.
    pub fn summary(&self) -> ProjectSummary {
        let mut stats = ProjectStats {
            total_files: self.files.len(),
            code_files: 0,
            directories: 0,
            file_types: Default::default(),
            size_total: 0,
        };
        for rec in &self.files {
            stats.size_total += rec.size;
            if parser::detect_language(Path::new(&rec.path)).is_some() {
                stats.code_files += 1;
            }
            if let Some(ext) = rec.extension() {
                *stats.file_types.entry(ext).or_insert(0) += 1;
            }
        }

        let mut structure: Vec<StructureEntry> = Vec::new();
        if let Ok(entries) = std::fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if walker::is_excluded_name(&name) {
                    continue;
                }
                let Ok(file_type) = entry.file_type() else {
                    continue;
                };
                if file_type.is_dir() {
                    stats.directories += 1;
                    structure.push(StructureEntry {
                        name,
                        entry_type: "directory",
                        size: None,
                    });
                } else if file_type.is_file() {
                    let size = entry.metadata().ok().map(|m| m.len());
                    structure.push(StructureEntry {
                        name,
                        entry_type: "file",
                        size,
                    });
                }
            }
        }
        // Directories first, then by name.
        structure.sort_by(|a, b| {
            (a.entry_type == "file", a.name.to_lowercase())
                .cmp(&(b.entry_type == "file", b.name.to_lowercase()))
        });
        let truncated = structure.len() > STRUCTURE_PREVIEW;
        structure.truncate(STRUCTURE_PREVIEW);

        ProjectSummary {
            project_path: self.root.to_string_lossy().into_owned(),
            project_name: self
                .root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            stats,
            structure,
            truncated,
            indexed_symbols: self.index.symbol_count(),
            warnings: self.warnings.clone(),
        }
    }

    // -- File operations ----------------------------------------------------

    /// List files under `directory` (root-relative), sorted by extension
    /// then name. `code_only` keeps files with a recognized source language
    /// or a configured additional extension; `extension` further restricts
    /// to a pattern such as `"*.py"` or `".py,.js"`.
    pub fn list_files(
        &self,
        directory: &str,
        recursive: bool,
        code_only: bool,
        extension: Option<&str>,
    ) -> Result<Vec<FileEntry>, ScoutError> {
        let dir = self.resolve_scope(Some(directory))?;
        if !dir.is_dir() {
            return Err(ScoutError::Usage(format!("not a directory: {directory}")));
        }

        let mut entries: Vec<FileEntry> = Vec::new();
        if recursive {
            for rec in Walker::new(&dir)
                .max_file_size(self.config.index.max_file_size_kb * 1024)
                .extra_ignores(&self.config.ignore.patterns)
                .collect_records()
            {
                let full = prefix_record(&dir, &self.root, &rec.path);
                entries.push(self.record_to_entry(full, rec.size, rec.modified));
            }
        } else {
            for entry in std::fs::read_dir(&dir).map_err(ScoutError::Io)?.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if walker::is_excluded_name(&name) {
                    continue;
                }
                if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                    continue;
                }
                let meta = entry.metadata().ok();
                let rel = entry
                    .path()
                    .strip_prefix(&self.root)
                    .map(walker::relative_to_string)
                    .unwrap_or(name);
                entries.push(self.record_to_entry(
                    rel,
                    meta.as_ref().map(|m| m.len()).unwrap_or(0),
                    meta.and_then(|m| m.modified().ok()).and_then(|t| {
                        t.duration_since(std::time::UNIX_EPOCH)
                            .ok()
                            .map(|d| d.as_secs())
                    }),
                ));
            }
        }

        if code_only {
            entries.retain(|e| self.is_code_file(&e.path));
        }
        if let Some(pattern) = extension {
            let wanted = crate::search::parse_file_pattern(pattern);
            entries.retain(|e| crate::search::extension_matches(Path::new(&e.path), &wanted));
        }
        entries.sort_by(|a, b| {
            (a.extension.as_deref().unwrap_or(""), a.name.to_lowercase())
                .cmp(&(b.extension.as_deref().unwrap_or(""), b.name.to_lowercase()))
        });
        Ok(entries)
    }

    fn record_to_entry(&self, path: String, size: u64, modified: Option<u64>) -> FileEntry {
        let rec = FileRecord {
            path,
            size,
            modified,
        };
        FileEntry {
            name: rec.name().to_string(),
            extension: rec.extension(),
            path: rec.path,
            size: rec.size,
            modified: rec.modified,
        }
    }

    fn is_code_file(&self, rel: &str) -> bool {
        let path = Path::new(rel);
        if parser::detect_language(path).is_some() {
            return true;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.config
            .index
            .additional_extensions
            .iter()
            .any(|extra| extra.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    /// Read a file (or an inclusive 1-indexed line range of it).
    pub fn read_file(
        &self,
        rel: &str,
        start_line: Option<usize>,
        end_line: Option<usize>,
    ) -> Result<FileSlice, ScoutError> {
        let abs = self.resolve_path(rel)?;
        if !abs.is_file() {
            return Err(ScoutError::Usage(format!("not a file: {rel}")));
        }
        let text = self.read_text_at(&abs, rel)?;
        let lines: Vec<&str> = text.lines().collect();
        let total_lines = lines.len();

        let (content, line_range) = if start_line.is_some() || end_line.is_some() {
            let start = start_line.unwrap_or(1).max(1);
            let end = end_line.unwrap_or(total_lines).min(total_lines);
            if start > end || start > total_lines {
                (String::new(), format!("{start}-{end}"))
            } else {
                let mut slice = lines[start - 1..end].join("\n");
                if !slice.is_empty() {
                    slice.push('\n');
                }
                (slice, format!("{start}-{end}"))
            }
        } else {
            (text.clone(), format!("1-{total_lines}"))
        };

        Ok(FileSlice {
            file: rel.to_string(),
            size: std::fs::metadata(&abs).map(|m| m.len()).unwrap_or(0),
            content,
            total_lines,
            line_range,
        })
    }

    /// Read a root-relative file as text, rejecting binary content.
    pub fn read_text(&self, rel: &str) -> Result<String, ScoutError> {
        let abs = self.resolve_path(rel)?;
        self.read_text_at(&abs, rel)
    }

    fn read_text_at(&self, abs: &Path, rel: &str) -> Result<String, ScoutError> {
        index::read_source(abs).map_err(|reason| ScoutError::FileUnreadable {
            path: rel.to_string(),
            reason,
        })
    }

    // -- Parse cache --------------------------------------------------------

    /// The parsed unit for one file, re-parsed only when the content
    /// fingerprint changed since it was cached. Unrecognized languages
    /// yield an empty unit.
    pub fn parsed_unit(&self, rel: &str) -> Result<Arc<ParsedUnit>, ScoutError> {
        let text = self.read_text(rel)?;
        let fingerprint = xxhash_rust::xxh3::xxh3_64(text.as_bytes());

        if let Some(cached) = self.cache.read().expect("cache lock poisoned").get(rel)
            && cached.fingerprint == fingerprint
        {
            return Ok(Arc::clone(&cached.unit));
        }

        let unit = match parser::detect_language(Path::new(rel)) {
            Some(lang) => parser::parse_source(rel, &text, lang),
            None => ParsedUnit::default(),
        };
        let unit = Arc::new(unit);
        self.cache.write().expect("cache lock poisoned").insert(
            rel.to_string(),
            CachedUnit {
                fingerprint,
                unit: Arc::clone(&unit),
            },
        );
        Ok(unit)
    }
}

/// A malformed config file must not block exploration; fall back to
/// defaults (the CLI surfaces config problems separately).
fn config_or_default(root: &Path) -> Config {
    crate::config::load(root).unwrap_or_default()
}

/// For a sub-directory walk, re-prefix record paths so they stay relative
/// to the project root.
fn prefix_record(dir: &Path, root: &Path, rel_to_dir: &str) -> String {
    match dir.strip_prefix(root) {
        Ok(prefix) if prefix.as_os_str().is_empty() => rel_to_dir.to_string(),
        Ok(prefix) => format!("{}/{rel_to_dir}", walker::relative_to_string(prefix)),
        Err(_) => rel_to_dir.to_string(),
    }
}
