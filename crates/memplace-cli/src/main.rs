use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use memplace_core::Placement;
use memplace_harness::{Harness, HarnessConfig, RunSummary};
use memplace_kernels::Platform;

/// Vector length used when none is given.
const DEFAULT_LEN: usize = 1024 * 1024;

#[derive(Parser)]
#[command(
    name = "memplace",
    about = "Benchmark shared, host-pinned and device-private memory for a triad kernel",
    long_about = "Runs w[i] = x[i] * y[i] + z[i] once per memory placement strategy,\n\
                  times each run and verifies the output on the host.\n\n\
                  Set RUST_LOG=debug for phase-by-phase tracing.",
    version
)]
struct Cli {
    /// Vector length N (non-numeric input reads as 0)
    #[arg(allow_hyphen_values = true)]
    length: Option<String>,

    /// Print the run summary as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let len = cli.length.as_deref().map_or(DEFAULT_LEN, parse_len);

    let platform = Platform::discover();
    let config = HarnessConfig::default();
    let summary = if cli.json {
        let summary = Harness::new(&platform, config).run_all(len);
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: failed to serialize summary: {}", e);
                return ExitCode::FAILURE;
            }
        }
        summary
    } else {
        run_text(&platform, config, len)
    };

    ExitCode::from(summary.exit_code())
}

fn run_text(platform: &Platform, config: HarnessConfig, len: usize) -> RunSummary {
    println!("Running with vector size: {}", len);

    let mut harness = Harness::new(platform, config);
    let reports = Placement::ALL
        .iter()
        .map(|&placement| {
            println!("{} memory test...", placement.label());
            let report = harness.run(placement, len);
            if let Err(e) = report.write_text(&mut std::io::stdout()) {
                tracing::warn!("failed to write report: {}", e);
            }
            report
        })
        .collect();

    RunSummary {
        len,
        config: harness.config().clone(),
        reports,
    }
}

/// Parse like C `atoi`: optional leading whitespace and sign, then the
/// longest run of digits. Anything unparseable, or negative, is 0.
fn parse_len(s: &str) -> usize {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    match digits[..end].parse::<usize>() {
        Ok(n) if !negative => n,
        _ => 0,
    }
}
