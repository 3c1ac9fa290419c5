use crate::config::BuildMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tailwind CSS build pipeline with template-driven pruning
#[derive(Parser, Debug)]
#[command(name = "tailwind-purge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the CSS pipeline over an input stylesheet
    Build(BuildArgs),
    /// Print the tokens found in text read from stdin
    Tokens(TokensArgs),
}

fn parse_mode(value: &str) -> Result<BuildMode, String> {
    Ok(BuildMode::from_flag(value))
}

/// Arguments for the build command
#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    /// Input stylesheet
    #[arg(
        short = 'i',
        long = "input",
        value_name = "PATH",
        required = true,
        help = "Stylesheet to run through the pipeline (may contain @tailwind directives)"
    )]
    pub input: PathBuf,

    /// Output stylesheet
    #[arg(
        short = 'o',
        long = "output",
        value_name = "PATH",
        required = true,
        help = "Path where the processed CSS will be written"
    )]
    pub output: PathBuf,

    /// Configuration file path (YAML or JSON)
    #[arg(
        short = 'c',
        long = "config",
        value_name = "PATH",
        help = "Path to pipeline configuration file (.yaml, .yml or .json)"
    )]
    pub config: Option<PathBuf>,

    /// Build mode
    #[arg(
        long = "mode",
        value_name = "MODE",
        env = "NODE_ENV",
        default_value = "development",
        value_parser = parse_mode,
        help = "Build mode; only 'production' enables pruning"
    )]
    pub mode: BuildMode,

    /// Content patterns, replacing the configured ones
    #[arg(
        long = "content",
        value_name = "PATTERN",
        num_args = 1..,
        help = "Template file patterns to scan for tokens (overrides config)"
    )]
    pub content: Vec<String>,

    /// Exclude patterns (glob patterns to exclude)
    #[arg(
        short = 'e',
        long = "exclude",
        value_name = "PATTERN",
        num_args = 0..,
        help = "Patterns to exclude from scanning"
    )]
    pub exclude: Vec<String>,

    /// Also write the keep-list manifest here
    #[arg(
        long = "keep-list",
        value_name = "PATH",
        help = "Write the keep-list manifest (JSON) to this path"
    )]
    pub keep_list: Option<PathBuf>,

    /// Number of parallel threads to use
    #[arg(
        short = 'j',
        long = "jobs",
        value_name = "NUM",
        help = "Number of parallel threads to use (defaults to number of CPU cores)"
    )]
    pub jobs: Option<usize>,

    /// Disable preflight CSS generation
    #[arg(
        long = "no-preflight",
        default_value_t = false,
        help = "Disable generation of Tailwind preflight/reset CSS"
    )]
    pub no_preflight: bool,

    /// Dry run (don't write output files)
    #[arg(
        long = "dry-run",
        default_value_t = false,
        help = "Run the pipeline but don't write output files"
    )]
    pub dry_run: bool,

    /// Verbose output
    #[arg(
        short = 'v',
        long = "verbose",
        default_value_t = false,
        help = "Enable verbose output"
    )]
    pub verbose: bool,
}

/// Arguments for the tokens command
#[derive(Parser, Debug, Clone, Default)]
pub struct TokensArgs {
    /// Print each token once, in first-seen order
    #[arg(long = "unique", default_value_t = false)]
    pub unique: bool,

    /// Print a JSON array instead of one token per line
    #[arg(long = "json", default_value_t = false)]
    pub json: bool,

    /// Treat the input as a file with this extension when picking an extractor
    #[arg(long = "extension", value_name = "EXT")]
    pub extension: Option<String>,

    /// Configuration file providing extractor rules
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl BuildArgs {
    /// Validate that the arguments are consistent
    pub fn validate(&self) -> Result<(), String> {
        if self.input == self.output {
            return Err("Input and output stylesheet paths must be different".to_string());
        }

        if let Some(keep_list) = &self.keep_list {
            if keep_list == &self.output || keep_list == &self.input {
                return Err("Keep-list path must differ from the stylesheet paths".to_string());
            }
        }

        if self.content.iter().any(|pattern| pattern.trim().is_empty()) {
            return Err("Content patterns must not be empty".to_string());
        }

        if let Some(jobs) = self.jobs {
            if jobs == 0 {
                return Err("Number of jobs must be at least 1".to_string());
            }
        }

        Ok(())
    }
}
