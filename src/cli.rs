use crate::config::types::HarnessConfig;
use crate::harness::Harness;
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Keep ephemeral artifacts for postmortem inspection and log verbosely
    #[arg(long, alias = "keep-artifacts", global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the conformance scenarios (wrapped through FCPATH when set)
    Run {
        /// Only run scenarios whose name contains this substring
        #[arg(long)]
        filter: Option<String>,
        /// Emit the suite report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List registered scenarios
    List,
    /// Check that the tools scenarios invoke are installed
    CheckDeps {
        /// Show version information for every tool
        #[arg(long)]
        verbose: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = HarnessConfig::from_env();
    config.debug |= cli.debug;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_log_filter(&config)),
    )
    .init();

    match &config.wrapper_path {
        Some(path) => log::debug!("FCPATH resolved to {}", path.display()),
        None => log::debug!("FCPATH not set"),
    }

    match cli.command {
        Commands::Run { filter, json } => run_suite(config, filter.as_deref(), json),
        Commands::List => {
            list_scenarios();
            Ok(())
        }
        Commands::CheckDeps { verbose } => check_dependencies(&config, verbose),
    }
}

/// Filter applied when `RUST_LOG` is unset; debug mode logs every command
fn default_log_filter(config: &HarnessConfig) -> &'static str {
    if config.debug {
        "debug"
    } else {
        "warn"
    }
}

/// The only place an unwrapped run is reported to the user
fn unwrapped_notice(config: &HarnessConfig) -> Option<&'static str> {
    (!config.is_wrapped())
        .then_some("FCPATH is not set; scenarios run unwrapped and exercise no interception")
}

fn run_suite(config: HarnessConfig, filter: Option<&str>, json: bool) -> Result<()> {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }

    let scenarios = crate::suite::select(filter);
    if scenarios.is_empty() {
        eprintln!(
            "Error: no scenario matches '{}'",
            filter.unwrap_or_default()
        );
        eprintln!("Use 'fcharness list' to see available scenarios.");
        std::process::exit(2);
    }

    if let Some(notice) = unwrapped_notice(&config) {
        eprintln!("Warning: {}", notice);
    }

    let harness = Harness::new(config);
    let report = crate::suite::run(&harness, &scenarios);

    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render_text());
    }

    if !report.success() {
        std::process::exit(1);
    }
    Ok(())
}

fn list_scenarios() {
    for scenario in crate::suite::all() {
        let requires: Vec<String> = scenario.requires.iter().map(|r| r.to_string()).collect();
        let requires = if requires.is_empty() {
            String::new()
        } else {
            format!(" (requires {})", requires.join(", "))
        };
        println!(
            "{:<22} {:<15} {}{}",
            scenario.name, scenario.group, scenario.description, requires
        );
    }
}

fn check_dependencies(config: &HarnessConfig, verbose: bool) -> Result<()> {
    println!("🔍 Checking scenario dependencies...");
    println!();

    let statuses = crate::utils::deps::probe_all(config);
    let mut missing_required = Vec::new();

    for status in &statuses {
        match &status.version {
            Some(version) => {
                println!("✅ {} ({}) - OK", status.role, status.command);
                if verbose {
                    println!("  {}", version);
                }
            }
            None if status.optional => {
                println!(
                    "⚠️  {} ({}) - MISSING, dependent scenarios will be skipped",
                    status.role, status.command
                );
            }
            None => {
                println!("❌ {} ({}) - MISSING", status.role, status.command);
                missing_required.push(status.role);
            }
        }
    }

    if !config.is_wrapped() {
        println!("⚠️  wrapper - FCPATH not set, scenarios will run unwrapped");
    }

    println!();

    if missing_required.is_empty() {
        println!("🎉 All required tools are installed!");
        Ok(())
    } else {
        println!("❌ Missing required tools: {}", missing_required.join(", "));
        std::process::exit(1);
    }
}
