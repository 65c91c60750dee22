use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use flashpull::cli::Cli;
use flashpull::logging::init_logging;
use flashpull::{DeployMode, DeployPipeline, DeployStats};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version also come through here
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            return code;
        }
    };

    init_logging(cli.verbose, cli.quiet);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = cli.to_config()?;
    let url = config.url.clone();

    let stats = DeployPipeline::new(config)
        .show_progress(!cli.quiet)
        .run()
        .await
        .with_context(|| format!("Failed to deploy {}", url))?;

    if !cli.quiet {
        print_summary(url.as_str(), &stats);
    }
    Ok(())
}

fn print_summary(url: &str, stats: &DeployStats) {
    println!("{} {}", "Downloaded".green().bold(), url);

    match stats.mode {
        DeployMode::Fresh => {
            println!("  written {} bytes ({})", stats.written, stats.content_type);
        }
        DeployMode::Differential => {
            let unchanged = if stats.processed > 0 {
                stats.skipped() as f64 * 100.0 / stats.processed as f64
            } else {
                100.0
            };
            println!(
                "  processed {}, written {} ({} unchanged)",
                stats.processed,
                stats.written,
                format!("{:.1}%", unchanged).cyan()
            );
        }
    }
}
