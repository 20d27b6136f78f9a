use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{debug, info};
use oxipack_bundler::Config;
use std::fs;
use std::io::{BufWriter, Write};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "oxipack")]
#[command(about = "Bundle JavaScript modules into a single self-contained script", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Bundle an entry module and everything it imports through relative paths
    Bundle(Config),
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    debug!("Parsed CLI arguments: {:?}", cli.command);

    let start = Instant::now();

    match cli.command {
        Commands::Bundle(cfg) => {
            if cfg.parallel {
                info!("Loading modules on {} threads", rayon::current_num_threads());
            }

            let output = oxipack_bundler::run_bundle(&cfg)?;

            match &cfg.out {
                Some(path) => {
                    fs::write(path, &output.code)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Wrote bundle to {}", path.display());
                }
                None => {
                    // stdio is blocked by LineWriter, use a BufWriter to reduce syscalls.
                    let mut stdout = BufWriter::new(std::io::stdout());
                    stdout.write_all(output.code.as_bytes())?;
                    stdout.flush()?;
                }
            }

            if let Some(path) = &cfg.graph {
                fs::write(path, output.graph_json()?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Wrote module graph to {}", path.display());
            }

            // The bundle may be on stdout, so the summary goes to stderr
            let mut stderr = BufWriter::new(std::io::stderr());
            oxipack_bundler::print_summary(&mut stderr, &output.graph, start.elapsed().as_millis())?;
            if let Some(path) = &cfg.out {
                writeln!(stderr, "{} {}", "→".bright_blue(), path.display())?;
            }
            stderr.flush()?;

            Ok(())
        }
    }
}
