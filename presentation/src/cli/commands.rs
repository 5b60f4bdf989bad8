//! CLI command definitions

use agentic_domain::OutputFormat;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    /// Only the final answer
    Text,
    /// The answer followed by every tool result
    Full,
    /// The whole outcome as JSON
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Text => OutputFormat::Text,
            OutputFormatArg::Full => OutputFormat::Full,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

/// CLI arguments for agentic
#[derive(Parser, Debug)]
#[command(name = "agentic")]
#[command(author, version, about = "Answer questions with a tool-using assistant")]
#[command(long_about = r#"
agentic answers a question by letting a language model call sandboxed tools:
web search, document extraction, table analysis and Python execution.

Configuration files are loaded from (in priority order):
1. AGENTIC_* environment variables (e.g. AGENTIC_AGENT__MAX_STEPS=4)
2. --config <path>     Explicit config file
3. ./agentic.toml      Project-level config
4. ~/.config/agentic/config.toml   Global config

Example:
  agentic "What is the average price in data/sales.csv?"
  agentic --format full --max-steps 4 "Summarise report.pdf"
  agentic --chat
"#)]
pub struct Cli {
    /// The question to answer (not required in chat mode)
    pub query: Option<String>,

    /// Start interactive chat mode
    #[arg(short, long)]
    pub chat: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Maximum tool-execution steps per query
    #[arg(long, value_name = "N")]
    pub max_steps: Option<usize>,

    /// Number of turns each conversation keeps
    #[arg(long, value_name = "N")]
    pub history: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormatArg>,

    /// Continue an existing conversation
    #[arg(long, value_name = "ID")]
    pub conversation: Option<String>,

    /// Directory for a rolling diagnostic log file
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::parse_from([
            "agentic",
            "--max-steps",
            "3",
            "--history",
            "4",
            "--format",
            "json",
            "-vv",
            "what is 2+2?",
        ]);
        assert_eq!(cli.query.as_deref(), Some("what is 2+2?"));
        assert_eq!(cli.max_steps, Some(3));
        assert_eq!(cli.history, Some(4));
        assert_eq!(cli.format.map(OutputFormat::from), Some(OutputFormat::Json));
        assert_eq!(cli.verbose, 2);
        assert!(!cli.chat);
    }
}
