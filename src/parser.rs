//! Source-unit parsing: language registry, structural tier, lexical fallback.
//!
//! Turns one source file's text into an ordered sequence of symbol
//! declarations (classes, functions/methods, imports) with exact source
//! positions. The structural tier parses with the language's tree-sitter
//! grammar; when no tree can be produced, or the tree is broken badly
//! enough that nothing was extracted, a lexical tier applies per-language
//! regex patterns instead. Callers never observe which tier ran, and
//! malformed syntax never surfaces as an error.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tree_sitter::{Language, Node, Parser, Tree};

use crate::types::{ImportRecord, Symbol, SymbolKind};

/// Supported source languages with bundled tree-sitter grammars.
///
/// Adding a language means adding a variant here plus its entries in
/// [`detect_language`], [`grammar_for`] and the extraction matchers —
/// callers only ever go through the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    TypeScript,
    Tsx,
    JavaScript,
    Python,
    Rust,
    Go,
    Java,
    C,
    Cpp,
    Ruby,
    Php,
}

impl Lang {
    /// Returns the human-readable name for this language.
    pub fn name(self) -> &'static str {
        match self {
            Lang::TypeScript => "TypeScript",
            Lang::Tsx => "TSX",
            Lang::JavaScript => "JavaScript",
            Lang::Python => "Python",
            Lang::Rust => "Rust",
            Lang::Go => "Go",
            Lang::Java => "Java",
            Lang::C => "C",
            Lang::Cpp => "C++",
            Lang::Ruby => "Ruby",
            Lang::Php => "PHP",
        }
    }

    /// Single-line comment prefixes, used by the analyzer's line counters.
    pub fn comment_prefixes(self) -> &'static [&'static str] {
        match self {
            Lang::Python | Lang::Ruby => &["#"],
            Lang::Php => &["//", "#"],
            _ => &["//"],
        }
    }
}

/// Detect the language of a file from its extension.
///
/// Returns `None` for unsupported or missing extensions; such files are
/// not parsed (they still participate in text search).
pub fn detect_language(path: &Path) -> Option<Lang> {
    let ext = path.extension()?.to_str()?;
    match ext {
        "ts" => Some(Lang::TypeScript),
        "tsx" => Some(Lang::Tsx),
        "js" | "jsx" | "mjs" => Some(Lang::JavaScript),
        "py" => Some(Lang::Python),
        "rs" => Some(Lang::Rust),
        "go" => Some(Lang::Go),
        "java" => Some(Lang::Java),
        "c" | "h" => Some(Lang::C),
        "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Some(Lang::Cpp),
        "rb" => Some(Lang::Ruby),
        "php" => Some(Lang::Php),
        _ => None,
    }
}

/// Return the tree-sitter [`Language`] grammar for the given language.
fn grammar_for(lang: Lang) -> Language {
    match lang {
        Lang::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Lang::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        Lang::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Lang::Python => tree_sitter_python::LANGUAGE.into(),
        Lang::Rust => tree_sitter_rust::LANGUAGE.into(),
        Lang::Go => tree_sitter_go::LANGUAGE.into(),
        Lang::Java => tree_sitter_java::LANGUAGE.into(),
        Lang::C => tree_sitter_c::LANGUAGE.into(),
        Lang::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        Lang::Ruby => tree_sitter_ruby::LANGUAGE.into(),
        Lang::Php => tree_sitter_php::LANGUAGE_PHP.into(),
    }
}

/// Create a new [`Parser`] configured for the given language.
fn get_parser(lang: Lang) -> Parser {
    let mut parser = Parser::new();
    parser
        .set_language(&grammar_for(lang))
        .expect("grammar ABI version mismatch");
    parser
}

/// Everything extracted from one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedUnit {
    /// Declarations in source order.
    pub symbols: Vec<Symbol>,
    /// Import statements in source order.
    pub imports: Vec<ImportRecord>,
}

/// Parse one source file's text into declarations and imports.
///
/// Never fails on malformed syntax: a broken tree that yields nothing
/// falls through to the lexical tier.
pub fn parse_source(file: &str, text: &str, lang: Lang) -> ParsedUnit {
    match structural_parse(file, text, lang) {
        Some((unit, had_errors)) => {
            if had_errors && unit.symbols.is_empty() && unit.imports.is_empty() {
                lexical_parse(file, text, lang)
            } else {
                unit
            }
        }
        None => lexical_parse(file, text, lang),
    }
}

// ---------------------------------------------------------------------------
// Structural tier
// ---------------------------------------------------------------------------

/// Parse with tree-sitter and extract declarations by walking the tree.
/// Returns the unit plus whether the tree contained syntax errors.
fn structural_parse(file: &str, text: &str, lang: Lang) -> Option<(ParsedUnit, bool)> {
    let tree: Tree = get_parser(lang).parse(text.as_bytes(), None)?;
    let mut unit = ParsedUnit::default();
    walk_node(tree.root_node(), text.as_bytes(), file, lang, None, &mut unit);
    Some((unit, tree.root_node().has_error()))
}

/// Recursively walk a node and its children, collecting declarations and
/// imports. `scope` carries the name of the nearest class-like container.
fn walk_node(
    node: Node,
    src: &[u8],
    file: &str,
    lang: Lang,
    scope: Option<&str>,
    unit: &mut ParsedUnit,
) {
    let kind = node.kind();

    collect_imports(node, kind, src, file, lang, unit);

    if let Some(sym) = match_decl(node, kind, src, file, lang, scope) {
        let is_class = sym.kind == SymbolKind::Class;
        let new_scope = sym.name.clone();
        unit.symbols.push(sym);
        if is_class && is_container(kind, lang) {
            for i in 0..node.child_count() {
                if let Some(child) = node.child(i) {
                    walk_node(child, src, file, lang, Some(&new_scope), unit);
                }
            }
            return;
        }
    } else if let Some(container_scope) = anonymous_container_scope(node, kind, src, lang) {
        // Containers that are not declarations themselves (Rust impl blocks).
        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                walk_node(child, src, file, lang, Some(&container_scope), unit);
            }
        }
        return;
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            walk_node(child, src, file, lang, scope, unit);
        }
    }
}

/// Returns true if a class-like node's children should be scoped under its
/// name.
fn is_container(kind: &str, lang: Lang) -> bool {
    match lang {
        Lang::Python => kind == "class_definition",
        Lang::JavaScript | Lang::TypeScript | Lang::Tsx => {
            matches!(kind, "class_declaration" | "class")
        }
        Lang::Java => matches!(
            kind,
            "class_declaration" | "interface_declaration" | "enum_declaration"
        ),
        Lang::Rust => false, // handled via impl blocks
        Lang::Go => false,   // methods carry their receiver instead
        Lang::C | Lang::Cpp => matches!(kind, "class_specifier" | "struct_specifier"),
        Lang::Ruby => matches!(kind, "class" | "module"),
        Lang::Php => matches!(
            kind,
            "class_declaration" | "interface_declaration" | "trait_declaration"
        ),
    }
}

/// Containers that provide a scope without declaring a symbol themselves.
/// The only case today is the Rust `impl` block, whose functions become
/// methods of the implemented type.
fn anonymous_container_scope(node: Node, kind: &str, src: &[u8], lang: Lang) -> Option<String> {
    if lang == Lang::Rust && kind == "impl_item" {
        return field_text(node, "type", src).map(strip_generics);
    }
    None
}

/// Drop a trailing generic parameter list from a type name.
fn strip_generics(name: &str) -> String {
    match name.split_once('<') {
        Some((base, _)) => base.trim().to_string(),
        None => name.trim().to_string(),
    }
}

/// Try to extract a declaration from a tree-sitter node.
fn match_decl(
    node: Node,
    kind: &str,
    src: &[u8],
    file: &str,
    lang: Lang,
    scope: Option<&str>,
) -> Option<Symbol> {
    match lang {
        Lang::Rust => match_rust(node, kind, src, file, scope),
        Lang::Python => match_python(node, kind, src, file, scope),
        Lang::JavaScript | Lang::TypeScript | Lang::Tsx => {
            match_js_family(node, kind, src, file, lang, scope)
        }
        Lang::Go => match_go(node, kind, src, file, scope),
        Lang::Java => match_java(node, kind, src, file, scope),
        Lang::C | Lang::Cpp => match_c_family(node, kind, src, file, lang, scope),
        Lang::Ruby => match_ruby(node, kind, src, file, scope),
        Lang::Php => match_php(node, kind, src, file, scope),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Get the text content of a node.
fn node_text<'a>(node: Node, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

/// Find a child by its field name and return its text.
fn field_text<'a>(node: Node, field: &str, src: &'a [u8]) -> Option<&'a str> {
    node.child_by_field_name(field).map(|n| node_text(n, src))
}

/// Extract the declaration header of a node as the signature: everything
/// up to the body opener or the first newline, trimmed.
fn header_line(node: Node, src: &[u8]) -> String {
    let text = node_text(node, src);
    let sig = text
        .split_once('{')
        .map(|(before, _)| before.trim())
        .unwrap_or_else(|| text.lines().next().unwrap_or("").trim());
    sig.to_string()
}

/// Build a `Symbol` with common fields pre-filled.
fn make_symbol(
    name: &str,
    kind: SymbolKind,
    node: Node,
    src: &[u8],
    file: &str,
    lang: Lang,
    scope: Option<&str>,
) -> Symbol {
    Symbol {
        name: name.to_string(),
        kind,
        file: file.to_string(),
        line: node.start_position().row + 1,
        col: node.start_position().column,
        end_line: Some(node.end_position().row + 1),
        scope: scope.map(|s| s.to_string()),
        signature: header_line(node, src),
        language: lang.name().to_string(),
    }
}

/// Function or method, depending on whether a class-like scope encloses it.
fn callable_kind(scope: Option<&str>) -> SymbolKind {
    if scope.is_some() {
        SymbolKind::Method
    } else {
        SymbolKind::Function
    }
}

// ---------------------------------------------------------------------------
// Per-language declaration matchers
// ---------------------------------------------------------------------------

fn match_rust(
    node: Node,
    kind: &str,
    src: &[u8],
    file: &str,
    scope: Option<&str>,
) -> Option<Symbol> {
    match kind {
        "function_item" | "function_signature_item" => {
            let name = field_text(node, "name", src)?;
            Some(make_symbol(
                name,
                callable_kind(scope),
                node,
                src,
                file,
                Lang::Rust,
                scope,
            ))
        }
        "struct_item" | "enum_item" | "trait_item" | "union_item" => {
            let name = field_text(node, "name", src)?;
            Some(make_symbol(
                name,
                SymbolKind::Class,
                node,
                src,
                file,
                Lang::Rust,
                scope,
            ))
        }
        _ => None,
    }
}

fn match_python(
    node: Node,
    kind: &str,
    src: &[u8],
    file: &str,
    scope: Option<&str>,
) -> Option<Symbol> {
    match kind {
        "function_definition" => {
            let name = field_text(node, "name", src)?;
            Some(make_symbol(
                name,
                callable_kind(scope),
                node,
                src,
                file,
                Lang::Python,
                scope,
            ))
        }
        "class_definition" => {
            let name = field_text(node, "name", src)?;
            Some(make_symbol(
                name,
                SymbolKind::Class,
                node,
                src,
                file,
                Lang::Python,
                scope,
            ))
        }
        _ => None,
    }
}

fn match_js_family(
    node: Node,
    kind: &str,
    src: &[u8],
    file: &str,
    lang: Lang,
    scope: Option<&str>,
) -> Option<Symbol> {
    match kind {
        "function_declaration" | "generator_function_declaration" => {
            let name = field_text(node, "name", src)?;
            Some(make_symbol(
                name,
                SymbolKind::Function,
                node,
                src,
                file,
                lang,
                scope,
            ))
        }
        "class_declaration" => {
            let name = field_text(node, "name", src)?;
            Some(make_symbol(
                name,
                SymbolKind::Class,
                node,
                src,
                file,
                lang,
                scope,
            ))
        }
        "method_definition" => {
            let name = field_text(node, "name", src)?;
            Some(make_symbol(
                name,
                SymbolKind::Method,
                node,
                src,
                file,
                lang,
                scope,
            ))
        }
        // TypeScript type-introducing declarations fold into `class`.
        "interface_declaration" | "enum_declaration" | "type_alias_declaration"
            if lang != Lang::JavaScript =>
        {
            let name = field_text(node, "name", src)?;
            Some(make_symbol(
                name,
                SymbolKind::Class,
                node,
                src,
                file,
                lang,
                scope,
            ))
        }
        "lexical_declaration" | "variable_declaration" => {
            extract_js_fn_binding(node, src, file, lang, scope)
        }
        _ => None,
    }
}

/// `const foo = () => {}` / `let bar = function() {}` count as function
/// declarations; other bindings are not symbols in this model.
fn extract_js_fn_binding(
    node: Node,
    src: &[u8],
    file: &str,
    lang: Lang,
    scope: Option<&str>,
) -> Option<Symbol> {
    for i in 0..node.named_child_count() {
        let child = node.named_child(i)?;
        if child.kind() != "variable_declarator" {
            continue;
        }
        let name_node = child.child_by_field_name("name")?;
        let value = child.child_by_field_name("value")?;
        if matches!(
            value.kind(),
            "arrow_function" | "function" | "function_expression" | "generator_function"
        ) {
            let name = node_text(name_node, src);
            return Some(make_symbol(
                name,
                callable_kind(scope),
                node,
                src,
                file,
                lang,
                scope,
            ));
        }
    }
    None
}

fn match_go(node: Node, kind: &str, src: &[u8], file: &str, scope: Option<&str>) -> Option<Symbol> {
    match kind {
        "function_declaration" => {
            let name = field_text(node, "name", src)?;
            Some(make_symbol(
                name,
                SymbolKind::Function,
                node,
                src,
                file,
                Lang::Go,
                scope,
            ))
        }
        "method_declaration" => {
            let name = field_text(node, "name", src)?;
            let receiver = go_receiver_type(node, src);
            Some(make_symbol(
                name,
                SymbolKind::Method,
                node,
                src,
                file,
                Lang::Go,
                receiver.as_deref(),
            ))
        }
        "type_spec" => {
            let ty = node.child_by_field_name("type")?;
            if matches!(ty.kind(), "struct_type" | "interface_type") {
                let name = field_text(node, "name", src)?;
                return Some(make_symbol(
                    name,
                    SymbolKind::Class,
                    node,
                    src,
                    file,
                    Lang::Go,
                    scope,
                ));
            }
            None
        }
        _ => None,
    }
}

/// Pull the receiver type name out of a Go method declaration:
/// `func (s *Server) Run()` yields `Server`.
fn go_receiver_type(node: Node, src: &[u8]) -> Option<String> {
    let recv = node.child_by_field_name("receiver")?;
    let text = node_text(recv, src);
    let last = text
        .trim_matches(|c| c == '(' || c == ')')
        .split_whitespace()
        .last()?;
    Some(last.trim_start_matches('*').to_string())
}

fn match_java(
    node: Node,
    kind: &str,
    src: &[u8],
    file: &str,
    scope: Option<&str>,
) -> Option<Symbol> {
    match kind {
        "class_declaration" | "interface_declaration" | "enum_declaration"
        | "record_declaration" => {
            let name = field_text(node, "name", src)?;
            Some(make_symbol(
                name,
                SymbolKind::Class,
                node,
                src,
                file,
                Lang::Java,
                scope,
            ))
        }
        "method_declaration" | "constructor_declaration" => {
            let name = field_text(node, "name", src)?;
            Some(make_symbol(
                name,
                SymbolKind::Method,
                node,
                src,
                file,
                Lang::Java,
                scope,
            ))
        }
        _ => None,
    }
}

fn match_c_family(
    node: Node,
    kind: &str,
    src: &[u8],
    file: &str,
    lang: Lang,
    scope: Option<&str>,
) -> Option<Symbol> {
    match kind {
        "function_definition" => {
            let declarator = node.child_by_field_name("declarator")?;
            let name = declarator_identifier(declarator, src)?;
            Some(make_symbol(
                name,
                callable_kind(scope),
                node,
                src,
                file,
                lang,
                scope,
            ))
        }
        "struct_specifier" | "class_specifier" => {
            // Only named definitions with a body; bare `struct foo x;` uses
            // the same node kind and must not be indexed as a declaration.
            node.child_by_field_name("body")?;
            let name = field_text(node, "name", src)?;
            Some(make_symbol(
                name,
                SymbolKind::Class,
                node,
                src,
                file,
                lang,
                scope,
            ))
        }
        _ => None,
    }
}

/// Descend through pointer/function declarators to the declared identifier.
fn declarator_identifier<'a>(node: Node<'a>, src: &'a [u8]) -> Option<&'a str> {
    match node.kind() {
        "identifier" | "field_identifier" | "qualified_identifier" | "destructor_name" => {
            Some(node_text(node, src))
        }
        _ => {
            if let Some(inner) = node.child_by_field_name("declarator") {
                return declarator_identifier(inner, src);
            }
            for i in 0..node.named_child_count() {
                if let Some(child) = node.named_child(i)
                    && let Some(name) = declarator_identifier(child, src)
                {
                    return Some(name);
                }
            }
            None
        }
    }
}

fn match_ruby(
    node: Node,
    kind: &str,
    src: &[u8],
    file: &str,
    scope: Option<&str>,
) -> Option<Symbol> {
    match kind {
        "class" | "module" => {
            let name = field_text(node, "name", src)?;
            Some(make_symbol(
                name,
                SymbolKind::Class,
                node,
                src,
                file,
                Lang::Ruby,
                scope,
            ))
        }
        "method" | "singleton_method" => {
            let name = field_text(node, "name", src)?;
            Some(make_symbol(
                name,
                callable_kind(scope),
                node,
                src,
                file,
                Lang::Ruby,
                scope,
            ))
        }
        _ => None,
    }
}

fn match_php(
    node: Node,
    kind: &str,
    src: &[u8],
    file: &str,
    scope: Option<&str>,
) -> Option<Symbol> {
    match kind {
        "class_declaration" | "interface_declaration" | "trait_declaration" => {
            let name = field_text(node, "name", src)?;
            Some(make_symbol(
                name,
                SymbolKind::Class,
                node,
                src,
                file,
                Lang::Php,
                scope,
            ))
        }
        "function_definition" => {
            let name = field_text(node, "name", src)?;
            Some(make_symbol(
                name,
                SymbolKind::Function,
                node,
                src,
                file,
                Lang::Php,
                scope,
            ))
        }
        "method_declaration" => {
            let name = field_text(node, "name", src)?;
            Some(make_symbol(
                name,
                SymbolKind::Method,
                node,
                src,
                file,
                Lang::Php,
                scope,
            ))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Import collection
// ---------------------------------------------------------------------------

/// Record an import both as an [`ImportRecord`] and as an import-kind
/// symbol, so imports are findable through symbol search.
fn push_import(node: Node, src: &[u8], file: &str, lang: Lang, module: &str, unit: &mut ParsedUnit) {
    if module.is_empty() {
        return;
    }
    let statement = node_text(node, src).lines().next().unwrap_or("").trim().to_string();
    let line = node.start_position().row + 1;
    unit.imports.push(ImportRecord {
        file: file.to_string(),
        module: module.to_string(),
        statement: statement.clone(),
        line,
    });
    unit.symbols.push(Symbol {
        name: module.to_string(),
        kind: SymbolKind::Import,
        file: file.to_string(),
        line,
        col: node.start_position().column,
        end_line: Some(node.end_position().row + 1),
        scope: None,
        signature: statement,
        language: lang.name().to_string(),
    });
}

/// Match import-introducing nodes for each language.
fn collect_imports(node: Node, kind: &str, src: &[u8], file: &str, lang: Lang, unit: &mut ParsedUnit) {
    match lang {
        Lang::Rust => {
            if kind == "use_declaration"
                && let Some(arg) = field_text(node, "argument", src)
            {
                push_import(node, src, file, lang, arg.trim(), unit);
            }
        }
        Lang::Python => match kind {
            "import_statement" => {
                // `import foo, bar as b`
                for i in 0..node.named_child_count() {
                    if let Some(child) = node.named_child(i) {
                        let name_node = match child.kind() {
                            "dotted_name" => Some(child),
                            "aliased_import" => child.child_by_field_name("name"),
                            _ => None,
                        };
                        if let Some(n) = name_node {
                            push_import(node, src, file, lang, node_text(n, src), unit);
                        }
                    }
                }
            }
            "import_from_statement" => {
                // `from pkg import a, b` records pkg.a and pkg.b
                let module = field_text(node, "module_name", src).unwrap_or("");
                let mut any_name = false;
                for i in 0..node.named_child_count() {
                    if let Some(child) = node.named_child(i) {
                        if node.child_by_field_name("module_name") == Some(child) {
                            continue;
                        }
                        let name_node = match child.kind() {
                            "dotted_name" => Some(child),
                            "aliased_import" => child.child_by_field_name("name"),
                            _ => None,
                        };
                        if let Some(n) = name_node {
                            any_name = true;
                            let name = node_text(n, src);
                            let full = if module.is_empty() {
                                name.to_string()
                            } else {
                                format!("{module}.{name}")
                            };
                            push_import(node, src, file, lang, &full, unit);
                        }
                    }
                }
                // `from pkg import *`
                if !any_name && !module.is_empty() {
                    push_import(node, src, file, lang, module, unit);
                }
            }
            _ => {}
        },
        Lang::JavaScript | Lang::TypeScript | Lang::Tsx => {
            if kind == "import_statement"
                && let Some(source) = field_text(node, "source", src)
            {
                let module = source.trim_matches(|c| c == '\'' || c == '"');
                push_import(node, src, file, lang, module, unit);
            }
        }
        Lang::Go => {
            if kind == "import_spec"
                && let Some(path) = field_text(node, "path", src)
            {
                push_import(node, src, file, lang, path.trim_matches('"'), unit);
            }
        }
        Lang::Java => {
            if kind == "import_declaration" {
                for i in 0..node.named_child_count() {
                    if let Some(child) = node.named_child(i)
                        && child.kind() == "scoped_identifier"
                    {
                        push_import(node, src, file, lang, node_text(child, src), unit);
                    }
                }
            }
        }
        Lang::C | Lang::Cpp => {
            if kind == "preproc_include"
                && let Some(path) = field_text(node, "path", src)
            {
                let module = path.trim_matches(|c| c == '"' || c == '<' || c == '>');
                push_import(node, src, file, lang, module, unit);
            }
        }
        Lang::Ruby => {
            if kind == "call" {
                let method = field_text(node, "method", src).unwrap_or("");
                if matches!(method, "require" | "require_relative")
                    && let Some(args) = node.child_by_field_name("arguments")
                    && let Some(arg) = args.named_child(0)
                {
                    let module = node_text(arg, src).trim_matches(|c| c == '\'' || c == '"');
                    push_import(node, src, file, lang, module, unit);
                }
            }
        }
        Lang::Php => {
            if kind == "namespace_use_declaration" {
                for i in 0..node.named_child_count() {
                    if let Some(child) = node.named_child(i)
                        && child.kind() == "namespace_use_clause"
                    {
                        push_import(node, src, file, lang, node_text(child, src).trim(), unit);
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Lexical tier
// ---------------------------------------------------------------------------

struct LexPattern {
    re: Regex,
    kind: SymbolKind,
    /// Patterns anchored to indentation yield methods rather than functions.
    method_when_indented: bool,
}

fn lex(re: &str, kind: SymbolKind) -> LexPattern {
    LexPattern {
        re: Regex::new(re).expect("lexical pattern should be valid"),
        kind,
        method_when_indented: false,
    }
}

fn lex_indent(re: &str, kind: SymbolKind) -> LexPattern {
    LexPattern {
        method_when_indented: true,
        ..lex(re, kind)
    }
}

/// Keyword patterns for the lexical fallback, per language.
///
/// Each pattern's first capture group is the declared name (or imported
/// module). These are deliberately coarse: the fallback exists so that a
/// file too broken for its grammar still contributes declarations.
fn lexical_patterns(lang: Lang) -> &'static [LexPattern] {
    static PYTHON: OnceLock<Vec<LexPattern>> = OnceLock::new();
    static JS: OnceLock<Vec<LexPattern>> = OnceLock::new();
    static RUST: OnceLock<Vec<LexPattern>> = OnceLock::new();
    static GO: OnceLock<Vec<LexPattern>> = OnceLock::new();
    static JAVA: OnceLock<Vec<LexPattern>> = OnceLock::new();
    static C_FAMILY: OnceLock<Vec<LexPattern>> = OnceLock::new();
    static RUBY: OnceLock<Vec<LexPattern>> = OnceLock::new();
    static PHP: OnceLock<Vec<LexPattern>> = OnceLock::new();

    match lang {
        Lang::Python => PYTHON.get_or_init(|| {
            vec![
                lex(r"^class\s+(\w+)", SymbolKind::Class),
                lex_indent(r"^(?:\s*)(?:async\s+)?def\s+(\w+)", SymbolKind::Function),
                lex(r"^import\s+([\w.]+)", SymbolKind::Import),
                lex(r"^from\s+([\w.]+)\s+import", SymbolKind::Import),
            ]
        }),
        Lang::JavaScript | Lang::TypeScript | Lang::Tsx => JS.get_or_init(|| {
            vec![
                lex(r"^\s*(?:export\s+)?class\s+(\w+)", SymbolKind::Class),
                lex(r"^\s*(?:export\s+)?interface\s+(\w+)", SymbolKind::Class),
                lex(
                    r"^\s*(?:export\s+)?(?:async\s+)?function\s*\*?\s*(\w+)",
                    SymbolKind::Function,
                ),
                lex(
                    r"^\s*(?:export\s+)?(?:const|let|var)\s+(\w+)\s*=\s*(?:async\s+)?(?:function\b|\()",
                    SymbolKind::Function,
                ),
                lex(r#"^\s*import\b.*from\s+['"]([^'"]+)['"]"#, SymbolKind::Import),
            ]
        }),
        Lang::Rust => RUST.get_or_init(|| {
            vec![
                lex(
                    r"^\s*(?:pub(?:\([\w:]+\))?\s+)?(?:struct|enum|trait|union)\s+(\w+)",
                    SymbolKind::Class,
                ),
                lex_indent(
                    r"^(\s*)(?:pub(?:\([\w:]+\))?\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+(\w+)",
                    SymbolKind::Function,
                ),
                lex(r"^\s*use\s+([\w:]+)", SymbolKind::Import),
            ]
        }),
        Lang::Go => GO.get_or_init(|| {
            vec![
                lex(r"^func\s+(\w+)\s*\(", SymbolKind::Function),
                lex(r"^func\s+\([^)]+\)\s+(\w+)\s*\(", SymbolKind::Method),
                lex(
                    r"^type\s+(\w+)\s+(?:struct|interface)\b",
                    SymbolKind::Class,
                ),
                lex(r#"^\s*import\s+"([^"]+)""#, SymbolKind::Import),
            ]
        }),
        Lang::Java => JAVA.get_or_init(|| {
            vec![
                lex(
                    r"^\s*(?:public\s+|private\s+|protected\s+)?(?:abstract\s+|final\s+)?(?:class|interface|enum)\s+(\w+)",
                    SymbolKind::Class,
                ),
                lex(r"^import\s+([\w.]+)", SymbolKind::Import),
            ]
        }),
        Lang::C | Lang::Cpp => C_FAMILY.get_or_init(|| {
            vec![
                lex(r"^\s*(?:struct|class)\s+(\w+)\s*\{", SymbolKind::Class),
                lex(r#"^\s*#\s*include\s*[<"]([^>"]+)[>"]"#, SymbolKind::Import),
            ]
        }),
        Lang::Ruby => RUBY.get_or_init(|| {
            vec![
                lex(r"^\s*(?:class|module)\s+(\w+)", SymbolKind::Class),
                lex_indent(r"^(\s*)def\s+(?:self\.)?(\w+)", SymbolKind::Function),
                lex(
                    r#"^\s*require(?:_relative)?\s+['"]([^'"]+)['"]"#,
                    SymbolKind::Import,
                ),
            ]
        }),
        Lang::Php => PHP.get_or_init(|| {
            vec![
                lex(
                    r"^\s*(?:abstract\s+|final\s+)?(?:class|interface|trait)\s+(\w+)",
                    SymbolKind::Class,
                ),
                lex_indent(
                    r"^(\s*)(?:public\s+|private\s+|protected\s+|static\s+)*function\s+(\w+)",
                    SymbolKind::Function,
                ),
                lex(r"^\s*use\s+([\w\\]+)", SymbolKind::Import),
            ]
        }),
    }
}

/// Best-effort line-by-line extraction for files the structural tier could
/// not handle.
fn lexical_parse(file: &str, text: &str, lang: Lang) -> ParsedUnit {
    let mut unit = ParsedUnit::default();
    let patterns = lexical_patterns(lang);

    for (idx, line) in text.lines().enumerate() {
        for pat in patterns {
            let Some(caps) = pat.re.captures(line) else {
                continue;
            };
            // Name is the last participating capture group: indentation-aware
            // patterns spend group 1 on leading whitespace.
            let name_match = match caps.len() {
                0 | 1 => None,
                2 => caps.get(1),
                _ => caps.get(2).or_else(|| caps.get(1)),
            };
            let Some(name) = name_match else { continue };

            let kind = if pat.kind == SymbolKind::Function {
                let indented = pat.method_when_indented
                    && line.starts_with(|c: char| c == ' ' || c == '\t');
                if indented {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                }
            } else {
                pat.kind
            };

            let statement = line.trim().to_string();
            if kind == SymbolKind::Import {
                unit.imports.push(ImportRecord {
                    file: file.to_string(),
                    module: name.as_str().to_string(),
                    statement: statement.clone(),
                    line: idx + 1,
                });
            }
            unit.symbols.push(Symbol {
                name: name.as_str().to_string(),
                kind,
                file: file.to_string(),
                line: idx + 1,
                col: name.start(),
                end_line: None,
                scope: None,
                signature: statement,
                language: lang.name().to_string(),
            });
            break;
        }
    }
    unit
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
