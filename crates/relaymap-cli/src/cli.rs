//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Relaymap CLI - field mapping between JSON endpoints
///
/// Serves templates over HTTP, runs one-shot executions and checks manifests.
#[derive(Parser, Debug)]
#[command(
    name = "relaymap",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "RELAYMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the execution API over HTTP
    Serve(ServeArgs),

    /// Run a single execution and print the outcome
    Execute(ExecuteArgs),

    /// Validate a manifest without executing anything
    Check(CheckArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides `server.bind`)
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,

    /// Manifest to load (overrides `paths.manifest`)
    #[arg(short, long, value_name = "MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// JSON-lines execution log (overrides `paths.execution_log`)
    #[arg(long, value_name = "FILE")]
    pub execution_log: Option<PathBuf>,
}

/// Arguments for the execute command
#[derive(Parser, Debug)]
pub struct ExecuteArgs {
    /// Template to execute
    #[arg(value_name = "TEMPLATE_ID")]
    pub template_id: String,

    /// Manifest to load (overrides `paths.manifest`)
    #[arg(short, long, value_name = "MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// File holding the request body; `-` reads stdin
    #[arg(long, value_name = "FILE", conflicts_with_all = ["data", "params"])]
    pub body: Option<PathBuf>,

    /// Explicit input record as inline JSON
    #[arg(long, value_name = "JSON")]
    pub data: Option<String>,

    /// URL parameter for active sources, as KEY=VALUE (repeatable)
    #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Mark the execution as a test run in the log
    #[arg(long)]
    pub test: bool,

    /// JSON-lines execution log (overrides `paths.execution_log`)
    #[arg(long, value_name = "FILE")]
    pub execution_log: Option<PathBuf>,
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Manifest to check (defaults to `paths.manifest`)
    #[arg(value_name = "MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Print the parsed manifest after a successful check
    #[arg(long)]
    pub detailed: bool,
}

/// Arguments for generating shell completions
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Pretty-printed JSON output
    JsonPretty,
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{}`", raw)),
    }
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_level() {
        let cli = Cli {
            verbose: 2,
            quiet: false,
            config: None,
            output: OutputFormat::Human,
            no_color: false,
            command: Commands::Check(CheckArgs {
                manifest: None,
                detailed: false,
            }),
        };
        assert_eq!(cli.verbosity_level(), 2);

        let quiet_cli = Cli {
            verbose: 2,
            quiet: true,
            ..cli
        };
        assert_eq!(quiet_cli.verbosity_level(), 0);
    }

    #[test]
    fn test_execute_params() {
        let cli = Cli::parse_from([
            "relaymap",
            "execute",
            "erp-to-crm",
            "-p",
            "cnpj=123",
            "--param",
            "filter=a=b",
            "--test",
        ]);
        match cli.command {
            Commands::Execute(args) => {
                assert_eq!(args.template_id, "erp-to-crm");
                assert_eq!(
                    args.params,
                    vec![
                        ("cnpj".to_string(), "123".to_string()),
                        ("filter".to_string(), "a=b".to_string()),
                    ]
                );
                assert!(args.test);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_param_requires_key() {
        assert!(parse_param("=1").is_err());
        assert!(parse_param("nokey").is_err());
    }

    #[test]
    fn test_body_conflicts_with_data() {
        let result = Cli::try_parse_from([
            "relaymap", "execute", "t", "--body", "b.json", "--data", "{}",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_serve_bind() {
        let cli = Cli::parse_from(["relaymap", "serve", "--bind", "127.0.0.1:9000"]);
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.bind, Some("127.0.0.1:9000".parse().unwrap()));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
