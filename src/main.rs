//! CLI entry point: parse a `.hig` graph, fold it into a community
//! hierarchy, and render the result.
//!
//! Arguments are parsed with clap, diagnostics go to `stderr` via
//! `tracing` (level controlled by `RUST_LOG`), payload to `stdout`, and
//! any failure maps to a non-zero exit code with a single-line message.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use netfold::fold::Folding;
use netfold::io::{parse_hig_file, write_output, OutputOptions};

/// Hierarchical overlapping community detection over `.hig` graphs.
#[derive(Debug, Parser)]
#[command(name = "netfold", version, about)]
struct Cli {
    /// Output format: t (text), c (CSV-like), j (JSON); for JSON, append
    /// e to unwrap root clusters into node shares, or d to additionally
    /// include inter-cluster links at every level
    #[arg(short = 'o', default_value = "t", value_name = "FMT")]
    output: String,

    /// Clean links: skip link validation
    #[arg(short = 'c')]
    clean: bool,

    /// Fast quasi-mutual clustering instead of strictly mutual
    #[arg(short = 'f')]
    fast: bool,

    /// Randomly reorder (shuffle) nodes and links on construction
    #[arg(short = 'r')]
    reorder: bool,

    /// Modularity profit margin for early exit, within [-1, 1];
    /// -1 additionally disables per-iteration tracing
    #[arg(
        short = 'm',
        default_value_t = -0.999,
        allow_negative_numbers = true,
        value_name = "MARGIN"
    )]
    margin: f32,

    /// Input graph in .hig format
    input: PathBuf,
}

fn main() -> ExitCode {
    init_logging();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("netfold: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let opts = OutputOptions::parse(&cli.output)?;
    if !(-1.0..=1.0).contains(&cli.margin) {
        bail!("modularity profit margin {} is outside [-1, 1]", cli.margin);
    }

    let builder = parse_hig_file(&cli.input, cli.reorder)
        .with_context(|| format!("failed to parse {}", cli.input.display()))?;
    let symmetric = !builder.is_directed();

    let mut hierarchy = Folding::new()
        .with_symmetric(symmetric)
        .with_validate(!cli.clean)
        .with_fast(cli.fast)
        .with_margin(cli.margin)
        .fold(builder.finalize())
        .context("clustering failed")?;

    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    write_output(&mut hierarchy, &opts, &mut writer).context("failed to render output")?;
    writer.flush().context("failed to flush output")?;
    Ok(())
}

/// Install the global tracing subscriber: stderr, `RUST_LOG`-controlled,
/// warnings and errors by default.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["netfold", "graph.hig"]);
        assert_eq!(cli.output, "t");
        assert!(!cli.clean);
        assert!(!cli.fast);
        assert!(!cli.reorder);
        assert_eq!(cli.margin, -0.999);
        assert_eq!(cli.input, PathBuf::from("graph.hig"));
    }

    #[test]
    fn test_cli_parses_attached_values() {
        let cli = Cli::parse_from(["netfold", "-ojd", "-f", "-r", "-c", "-m0.5", "g.hig"]);
        assert_eq!(cli.output, "jd");
        assert!(cli.clean && cli.fast && cli.reorder);
        assert_eq!(cli.margin, 0.5);
    }

    #[test]
    fn test_cli_parses_negative_margin() {
        let cli = Cli::parse_from(["netfold", "-m", "-1", "g.hig"]);
        assert_eq!(cli.margin, -1.0);
    }

    #[test]
    fn test_missing_input_is_an_error() {
        assert!(Cli::try_parse_from(["netfold"]).is_err());
    }
}
