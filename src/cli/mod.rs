//! CLI implementation using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{self, Config};

/// gotestgap - Find Go functions without tests and tests in the wrong file.
#[derive(Parser)]
#[command(name = "gotestgap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the Go project to analyze
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Output format (default: from config, else text)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Number of parallel workers (default: number of CPUs)
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Run every check: untested functions, misplaced tests, low coverage
    #[command(alias = "all")]
    Analyze(AnalyzeArgs),

    /// List functions and methods no test calls
    #[command(alias = "ut")]
    Untested(AnalyzeArgs),

    /// List tests that live in the wrong _test.go file
    #[command(alias = "mp")]
    Misplaced(AnalyzeArgs),

    /// List functions below a coverage threshold (runs go test)
    #[command(alias = "cov")]
    Coverage(AnalyzeArgs),
}

impl Command {
    pub fn args(&self) -> &AnalyzeArgs {
        match self {
            Command::Analyze(args)
            | Command::Untested(args)
            | Command::Misplaced(args)
            | Command::Coverage(args) => args,
        }
    }
}

#[derive(Args, Clone, Debug, Default)]
pub struct AnalyzeArgs {
    /// Only report exported (capitalized) functions
    #[arg(long)]
    pub exclude_private: bool,

    /// Report functions with coverage below this percentage (0 disables)
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Do not run go test to suppress indirectly tested functions
    #[arg(long)]
    pub no_coverage: bool,

    /// Exclude files matching glob pattern (repeatable)
    #[arg(short, long)]
    pub exclude: Vec<String>,
}

impl AnalyzeArgs {
    /// Layer flags over loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if self.exclude_private {
            config.exclude_private = true;
        }
        if let Some(threshold) = self.threshold {
            config.coverage.threshold = threshold;
        }
        if self.no_coverage {
            config.coverage.enabled = false;
        }
        config.exclude_patterns.extend(self.exclude.iter().cloned());
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
    Text,
}

impl From<OutputFormat> for config::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => config::OutputFormat::Json,
            OutputFormat::Markdown => config::OutputFormat::Markdown,
            OutputFormat::Text => config::OutputFormat::Text,
        }
    }
}

impl Cli {
    /// The subcommand to run; `analyze` when none is given.
    pub fn command_or_default(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Analyze(AnalyzeArgs::default()))
    }

    /// Apply global and subcommand flags over loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(format) = self.format {
            config.output.format = format.into();
        }
        self.command_or_default().args().apply(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_default_path() {
        let cli = Cli::try_parse_from(["gotestgap", "untested"]).unwrap();
        assert_eq!(cli.path, PathBuf::from("."));
    }

    #[test]
    fn test_cli_custom_path() {
        let cli = Cli::try_parse_from(["gotestgap", "-p", "/tmp", "untested"]).unwrap();
        assert_eq!(cli.path, PathBuf::from("/tmp"));
    }

    #[test]
    fn test_cli_format_json() {
        let cli = Cli::try_parse_from(["gotestgap", "-f", "json", "untested"]).unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Json));
    }

    #[test]
    fn test_cli_format_markdown() {
        let cli = Cli::try_parse_from(["gotestgap", "-f", "markdown"]).unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Markdown));
    }

    #[test]
    fn test_cli_config_flag() {
        let cli = Cli::try_parse_from(["gotestgap", "-c", "gotestgap.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("gotestgap.toml")));
    }

    #[test]
    fn test_cli_verbose_and_jobs() {
        let cli = Cli::try_parse_from(["gotestgap", "-v", "-j", "4"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.jobs, Some(4));
    }

    #[test]
    fn test_default_command_is_analyze() {
        let cli = Cli::try_parse_from(["gotestgap"]).unwrap();
        assert!(cli.command.is_none());
        assert!(matches!(cli.command_or_default(), Command::Analyze(_)));
    }

    #[test]
    fn test_command_aliases() {
        let cases = [
            ("all", "analyze"),
            ("ut", "untested"),
            ("mp", "misplaced"),
            ("cov", "coverage"),
        ];
        for (alias, name) in cases {
            let cli = Cli::try_parse_from(["gotestgap", alias]).unwrap();
            let parsed = match cli.command_or_default() {
                Command::Analyze(_) => "analyze",
                Command::Untested(_) => "untested",
                Command::Misplaced(_) => "misplaced",
                Command::Coverage(_) => "coverage",
            };
            assert_eq!(parsed, name, "alias {alias}");
        }
    }

    #[test]
    fn test_analyze_args() {
        let cli = Cli::try_parse_from([
            "gotestgap",
            "analyze",
            "--exclude-private",
            "--threshold",
            "75",
            "--no-coverage",
            "-e",
            "gen/**",
            "-e",
            "**/*_mock.go",
        ])
        .unwrap();
        let args = cli.command_or_default().args().clone();
        assert!(args.exclude_private);
        assert_eq!(args.threshold, Some(75.0));
        assert!(args.no_coverage);
        assert_eq!(args.exclude, vec!["gen/**", "**/*_mock.go"]);
    }

    #[test]
    fn test_apply_overrides_config() {
        let mut config = Config::default();
        config.exclude_patterns.push("vendor2/**".to_string());

        let cli = Cli::try_parse_from([
            "gotestgap",
            "-f",
            "json",
            "coverage",
            "-t",
            "60",
            "-e",
            "gen/**",
        ])
        .unwrap();
        cli.apply(&mut config);

        assert_eq!(config.output.format, config::OutputFormat::Json);
        assert_eq!(config.coverage.threshold, 60.0);
        assert!(config.coverage.enabled);
        assert_eq!(config.exclude_patterns, vec!["vendor2/**", "gen/**"]);
    }

    #[test]
    fn test_apply_keeps_config_when_flags_absent() {
        let mut config = Config::default();
        config.exclude_private = true;
        config.coverage.threshold = 40.0;

        let cli = Cli::try_parse_from(["gotestgap", "untested"]).unwrap();
        cli.apply(&mut config);

        assert!(config.exclude_private);
        assert_eq!(config.coverage.threshold, 40.0);
        assert_eq!(config.output.format, config::OutputFormat::Text);
    }
}
