use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use handled::app::{AppConfig, run_demo};
use handled::{build_info, health};

/// Object lifecycle and event dispatch engine
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration profile, overriding APP_PROFILE
    #[arg(long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the health checks and exit with the report's exit code
    Health {
        /// Also print the details each check collected
        #[arg(long)]
        details: bool,
    },
    /// Run the headless demo scene on the tick thread
    Demo {
        /// Simulated seconds to run for
        #[arg(long, default_value_t = 3.0)]
        seconds: f64,
        /// Seed for the scripted pointer
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Print build metadata
    Info,
}

fn load_config(profile: Option<&str>) -> AppConfig {
    let loaded = match profile {
        Some(profile) => AppConfig::load(profile),
        None => AppConfig::load_from_env(),
    };
    loaded.unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {e}");
        AppConfig::default()
    })
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.profile.as_deref());
    init_tracing(&config);
    info!(profile = %config.profile, version = %build_info::version_string(), "Starting");

    match cli.command {
        Command::Health { details } => {
            let report = health::run_all_checks();
            println!("{}", health::format_report(&report));
            if details {
                println!("{}", health::format_details(&report));
            }
            std::process::exit(report.exit_code());
        }
        Command::Demo { seconds, seed } => {
            let summary =
                run_demo(config.tick.clone(), seconds, seed).context("running the demo scene")?;
            info!(
                ticks = summary.stats.ticks,
                sim_time = summary.stats.sim_time,
                clamped = summary.stats.clamped,
                typed = %summary.typed,
                "Demo finished"
            );
            for target in &summary.targets {
                if target.alive {
                    info!(
                        target_name = target.name,
                        clicks = target.clicks,
                        entered = target.entered,
                        "Target survived"
                    );
                } else {
                    warn!(target_name = target.name, clicks = target.clicks, "Target used up");
                }
            }
            info!(drawn = ?summary.drawn, "Final frame");
        }
        Command::Info => println!("{}", build_info::detailed_info()),
    }

    Ok(())
}
