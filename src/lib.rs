//! scout: a symbol-level project exploration engine.
//!
//! Indexes a source tree to answer structural questions — where is a
//! symbol defined, where is it referenced, what does a file import, what
//! does its complexity profile look like — over projects that may contain
//! thousands of files. Parsing is two-tier (tree-sitter grammars with a
//! lexical fallback), search is grep-based, and all state lives in an
//! explicit [`session::Session`] rebuilt from the file system on every
//! explore.

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod errors;
pub mod index;
pub mod mcp;
pub mod output;
pub mod parser;
pub mod refs;
pub mod router;
pub mod search;
pub mod session;
pub mod types;
pub mod walker;
