use clap::{Parser, Subcommand};

/// scout - symbol-level project exploration for coding agents
#[derive(Parser, Debug)]
#[command(name = "scout", version, about)]
pub struct Cli {
    /// Output results as JSON Lines
    #[arg(long, global = true)]
    pub json: bool,

    /// Project root to explore (defaults to the current directory)
    #[arg(long, global = true)]
    pub root: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Explore a project: scan, index, and print an overview
    Explore(ExploreArgs),

    /// List files in a directory of the project
    Ls(LsArgs),

    /// Print a file, optionally sliced to a line range
    Read(ReadArgs),

    /// Search project text with regex/word/context options
    Search(SearchArgs),

    /// Look up declared symbols by name
    Sym(SymArgs),

    /// Find references to a symbol, classified against the index
    Ref(RefArgs),

    /// Find the declaration sites of a symbol (exact name)
    Def(DefArgs),

    /// Aggregate imports across the project or a scope
    Imports(ImportsArgs),

    /// Compute metrics for one file
    Analyze(AnalyzeArgs),

    /// Search code files for regex patterns
    Patterns(PatternsArgs),

    /// Run the MCP server
    Mcp(McpArgs),
}

#[derive(clap::Args, Debug)]
pub struct ExploreArgs {
    /// Project directory (overrides --root)
    pub path: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct LsArgs {
    /// Directory to list, relative to the project root
    #[arg(default_value = ".")]
    pub directory: String,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Include non-code files
    #[arg(short = 'a', long)]
    pub all: bool,

    /// Restrict to an extension pattern (e.g. "*.py" or ".py,.js")
    #[arg(long)]
    pub ext: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ReadArgs {
    /// File to read, relative to the project root
    pub file: String,

    /// First line to include (1-indexed)
    #[arg(long)]
    pub start: Option<usize>,

    /// Last line to include (inclusive)
    #[arg(long)]
    pub end: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// The search pattern
    pub query: String,

    /// Treat the pattern as a regular expression
    #[arg(long)]
    pub regex: bool,

    /// Match case-sensitively (default is case-insensitive)
    #[arg(short = 's', long)]
    pub case_sensitive: bool,

    /// Match whole words only
    #[arg(short = 'w', long)]
    pub word: bool,

    /// Restrict to files matching this pattern (e.g. "*.py,*.js")
    #[arg(long)]
    pub glob: Option<String>,

    /// Lines of context around each match
    #[arg(short = 'C', long)]
    pub context: Option<usize>,

    /// Stop after this many matches
    #[arg(long)]
    pub max: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct SymArgs {
    /// Symbol name or name fragment
    pub name: String,

    /// Filter by kind (class, function, method, import)
    #[arg(long)]
    pub kind: Option<String>,

    /// Require an exact match on the symbol name
    #[arg(long)]
    pub exact: bool,
}

#[derive(clap::Args, Debug)]
pub struct RefArgs {
    /// Symbol name to find references for
    pub name: String,

    /// Directory (relative) to restrict the scan to
    #[arg(long)]
    pub scope: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct DefArgs {
    /// Exact symbol name
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct ImportsArgs {
    /// File or directory (relative) to restrict to
    pub scope: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct AnalyzeArgs {
    /// File to analyze, relative to the project root
    pub file: String,
}

#[derive(clap::Args, Debug)]
pub struct PatternsArgs {
    /// Regex patterns to search for
    #[arg(required = true)]
    pub patterns: Vec<String>,

    /// File or directory (relative) to restrict to
    #[arg(long)]
    pub scope: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct McpArgs {
    #[command(subcommand)]
    pub command: McpCommand,
}

#[derive(Subcommand, Debug)]
pub enum McpCommand {
    /// Serve MCP over stdio
    Serve,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_from(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn parses_explore_with_path() {
        let cli = parse_from(&["scout", "explore", "/tmp/project"]);
        match cli.command {
            Command::Explore(args) => assert_eq!(args.path.as_deref(), Some("/tmp/project")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_search_flags() {
        let cli = parse_from(&[
            "scout", "search", "needle", "--regex", "-w", "--glob", "*.py", "-C", "3",
        ]);
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.query, "needle");
                assert!(args.regex);
                assert!(args.word);
                assert!(!args.case_sensitive);
                assert_eq!(args.glob.as_deref(), Some("*.py"));
                assert_eq!(args.context, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_json_flag_works_after_subcommand() {
        let cli = parse_from(&["scout", "sym", "foo", "--json"]);
        assert!(cli.json);
    }

    #[test]
    fn patterns_requires_at_least_one() {
        assert!(Cli::try_parse_from(["scout", "patterns"]).is_err());
    }

    #[test]
    fn mcp_serve_parses() {
        let cli = parse_from(&["scout", "mcp", "serve"]);
        assert!(matches!(
            cli.command,
            Command::Mcp(McpArgs {
                command: McpCommand::Serve
            })
        ));
    }
}
