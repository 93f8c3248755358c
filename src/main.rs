//! gotestgap CLI - Test gap analysis for Go projects.

use std::io::{stdout, IsTerminal, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gotestgap::analyzers::{coverage, placement, testgap, untested};
use gotestgap::cli::{Cli, Command};
use gotestgap::config::Config;
use gotestgap::core::{AnalysisContext, Analyzer, Error, FileSet, ProgressTracker};
use gotestgap::output::{Format, Report};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> gotestgap::core::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_default(&cli.path)?,
    };
    cli.apply(&mut config);
    config.validate()?;

    if let Some(jobs) = cli.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .map_err(|e| Error::InvalidArgument(format!("invalid --jobs {jobs}: {e}")))?;
    }

    if !config.output.color || !stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let format = Format::from(config.output.format);

    match cli.command_or_default() {
        Command::Analyze(_) => {
            run_analyzer::<testgap::Analyzer>(&cli.path, &config, format, cli.verbose)?;
        }
        Command::Untested(_) => {
            run_analyzer::<untested::Analyzer>(&cli.path, &config, format, cli.verbose)?;
        }
        Command::Misplaced(_) => {
            run_analyzer::<placement::Analyzer>(&cli.path, &config, format, cli.verbose)?;
        }
        Command::Coverage(_) => {
            run_analyzer::<coverage::Analyzer>(&cli.path, &config, format, cli.verbose)?;
        }
    }

    Ok(())
}

fn run_analyzer<A>(
    path: &Path,
    config: &Config,
    format: Format,
    verbose: bool,
) -> gotestgap::core::Result<()>
where
    A: Analyzer + Default,
    A::Output: Report,
{
    let file_set = FileSet::from_path(path, config)?;
    let mut analyzer = A::default();
    analyzer.configure(config)?;

    tracing::debug!(
        "Running {} on {} Go files in {}",
        analyzer.name(),
        file_set.len(),
        file_set.root().display()
    );
    if analyzer.requires_toolchain() {
        tracing::debug!("Collecting coverage with the Go toolchain");
    }

    let progress = ProgressTracker::for_files(file_set.len(), "Parsing Go files", verbose);
    let ctx = AnalysisContext::new(&file_set, config, None).with_progress(|_, _| progress.inc());
    let result = analyzer.analyze(&ctx);
    progress.finish_and_clear();
    let result = result?;

    let mut out = stdout().lock();
    format.render(&result, &mut out)?;
    out.flush()?;
    Ok(())
}
