//! CLI dispatch: establish a session, run the requested operation, format
//! the result.
//!
//! The CLI is stateless across invocations — every command (except the MCP
//! server, which keeps its session for the life of the process) explores
//! the root, runs one query, and exits. That matches the engine contract:
//! the index is rebuilt from the file system, never persisted.

use std::io::Write;
use std::path::Path;

use crate::analyzer;
use crate::cli::{Cli, Command, McpCommand};
use crate::errors::ScoutError;
use crate::mcp;
use crate::output::{Formatter, ReferenceOutput, SearchOutput, SymbolOutput};
use crate::refs;
use crate::search::{self, SearchOptions};
use crate::session::Session;
use crate::types::SymbolKind;

pub fn dispatch(cli: Cli) -> Result<(), ScoutError> {
    // The MCP server owns its own session lifecycle.
    if let Command::Mcp(args) = &cli.command {
        return match args.command {
            McpCommand::Serve => mcp::serve().map_err(ScoutError::Other),
        };
    }

    let root = match &cli.command {
        Command::Explore(args) => args
            .path
            .clone()
            .or_else(|| cli.root.clone())
            .unwrap_or_else(|| ".".to_string()),
        _ => cli.root.clone().unwrap_or_else(|| ".".to_string()),
    };
    let session = Session::explore(Path::new(&root))?;

    let stdout = std::io::stdout().lock();
    let mut fmt = Formatter::new(stdout, cli.json);
    run(&session, cli.command, &mut fmt)
}

fn run<W: Write>(
    session: &Session,
    command: Command,
    fmt: &mut Formatter<W>,
) -> Result<(), ScoutError> {
    match command {
        Command::Explore(_) => {
            fmt.summary(&session.summary())?;
        }
        Command::Ls(args) => {
            let files = session.list_files(&args.directory, args.recursive, !args.all, args.ext.as_deref())?;
            fmt.files(&files)?;
        }
        Command::Read(args) => {
            let slice = session.read_file(&args.file, args.start, args.end)?;
            fmt.slice(&slice)?;
        }
        Command::Search(args) => {
            let opts = SearchOptions {
                regex: args.regex,
                case_sensitive: args.case_sensitive,
                whole_word: args.word,
                file_glob: args.glob,
                context_lines: args
                    .context
                    .unwrap_or(session.config().search.context_lines),
                max_results: args.max.unwrap_or(session.config().search.max_results),
            };
            let outcome = search::search(
                session.root(),
                session.root(),
                &args.query,
                &opts,
                session.extra_ignores(),
            )?;
            let outputs: Vec<SearchOutput> =
                outcome.matches.into_iter().map(SearchOutput::from).collect();
            fmt.matches(&outputs)?;
            fmt.warnings(&outcome.warnings)?;
        }
        Command::Sym(args) => {
            let kind = match &args.kind {
                Some(s) => Some(SymbolKind::parse(s).ok_or_else(|| {
                    ScoutError::InvalidQuery(format!("unknown symbol kind: {s}"))
                })?),
                None => None,
            };
            let results = session.index().lookup(&args.name, args.exact, kind);
            let outputs: Vec<SymbolOutput> = results.iter().map(SymbolOutput::from).collect();
            fmt.symbols(&outputs)?;
        }
        Command::Ref(args) => {
            let scope = session.resolve_scope(args.scope.as_deref())?;
            let outcome = refs::find_references(
                session.root(),
                &scope,
                &args.name,
                session.index(),
                session.config().search.reference_cap,
                session.extra_ignores(),
            )?;
            let outputs: Vec<ReferenceOutput> =
                outcome.references.iter().map(ReferenceOutput::from).collect();
            fmt.references(&outputs)?;
            fmt.warnings(&outcome.warnings)?;
        }
        Command::Def(args) => {
            let defs = session.index().find_definition(&args.name);
            let outputs: Vec<SymbolOutput> = defs.iter().map(SymbolOutput::from).collect();
            fmt.symbols(&outputs)?;
        }
        Command::Imports(args) => {
            let (groups, warnings) = analyzer::analyze_imports(session, args.scope.as_deref())?;
            fmt.imports(&groups)?;
            fmt.warnings(&warnings)?;
        }
        Command::Analyze(args) => {
            let metrics = analyzer::analyze_file(session, &args.file)?;
            fmt.value(&metrics)?;
        }
        Command::Patterns(args) => {
            let results =
                analyzer::find_code_patterns(session, &args.patterns, args.scope.as_deref())?;
            fmt.value(&results)?;
        }
        Command::Mcp(_) => unreachable!("handled in dispatch"),
    }
    Ok(())
}
