//! DRAM memory-controller scheduler CLI.
//!
//! This binary replays request traces through the scheduling engines. It performs:
//! 1. **Replay:** Run one trace through one policy and print the issue stream and statistics.
//! 2. **Compare:** Run the same trace through every policy and print a summary table.
//! 3. **Config dump:** Print the effective controller configuration as JSON.

use std::fs;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use memsched_core::config::{ControllerConfig, PolicyKind};
use memsched_core::sim::{ReplayReport, Trace, replay};
use memsched_core::soc::memory::{DramTiming, MemoryScheduler, build};

#[derive(Parser, Debug)]
#[command(
    name = "memsched",
    author,
    version,
    about = "DRAM memory-controller scheduling simulator",
    long_about = "Replay a JSON request trace through a memory-controller scheduling policy.\n\nA trace is a JSON array of {\"cycle\", \"addr\", \"command\"[, \"id\"]} objects.\n\nExamples:\n  memsched replay -t trace.json -p fcfsrw\n  memsched compare -t trace.json\n  memsched config -c controller.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trace through one policy.
    Replay {
        /// Trace file (JSON array of arrivals).
        #[arg(short, long)]
        trace: String,

        /// Scheduling policy (fcfs, rdfcfs, fcfsrw, tm); overrides the config file.
        #[arg(short, long)]
        policy: Option<PolicyKind>,

        /// Controller configuration file (JSON).
        #[arg(short, long)]
        config: Option<String>,

        /// Only print statistics, not the issue stream.
        #[arg(short, long)]
        quiet: bool,

        /// Print the replay report as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Replay a trace through every policy and compare.
    Compare {
        /// Trace file (JSON array of arrivals).
        #[arg(short, long)]
        trace: String,

        /// Controller configuration file (JSON); its policy field is ignored.
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Print the effective configuration.
    Config {
        /// Controller configuration file (JSON).
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Replay {
            trace,
            policy,
            config,
            quiet,
            json,
        } => cmd_replay(&trace, policy, config.as_deref(), quiet, json),
        Commands::Compare { trace, config } => cmd_compare(&trace, config.as_deref()),
        Commands::Config { config } => cmd_config(config.as_deref()),
    }
}

/// Prints `msg` to stderr and exits with status 1.
fn fatal(msg: impl std::fmt::Display) -> ! {
    eprintln!("\n[!] FATAL: {msg}");
    process::exit(1);
}

/// Loads the controller configuration, falling back to defaults when no path is given.
///
/// Exits the process if the file cannot be read or parsed.
fn load_config(path: Option<&str>) -> ControllerConfig {
    let Some(path) = path else {
        return ControllerConfig::default();
    };
    let text = fs::read_to_string(path)
        .unwrap_or_else(|e| fatal(format!("could not read config '{path}': {e}")));
    serde_json::from_str(&text)
        .unwrap_or_else(|e| fatal(format!("malformed config '{path}': {e}")))
}

fn load_trace(path: &str) -> Trace {
    match Trace::load(path) {
        Ok(trace) => trace,
        Err(e) => fatal(e),
    }
}

/// Builds a controller for `config` and replays `trace` through it.
///
/// Exits the process on an invalid configuration or a controller error.
fn run(config: &ControllerConfig, trace: &Trace) -> (Box<dyn MemoryScheduler>, ReplayReport) {
    let mut scheduler =
        build(config).unwrap_or_else(|e| fatal(format!("invalid configuration: {e}")));
    let timing = DramTiming::from(config.timing);
    match replay(scheduler.as_mut(), trace, timing) {
        Ok(report) => (scheduler, report),
        Err(e) => {
            scheduler.stats().print(&format!("{}, partial", scheduler.name()));
            fatal(format!("controller error ({}): {e}", scheduler.name()))
        }
    }
}

fn cmd_replay(
    trace_path: &str,
    policy: Option<PolicyKind>,
    config_path: Option<&str>,
    quiet: bool,
    json: bool,
) {
    let mut config = load_config(config_path);
    if let Some(policy) = policy {
        config.policy = policy;
    }
    let trace = load_trace(trace_path);
    let (scheduler, report) = run(&config, &trace);

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => fatal(e),
        }
        return;
    }

    println!(
        "[*] Policy: {}  Trace: {} ({} requests)",
        config.policy,
        trace_path,
        trace.len()
    );
    if !quiet {
        println!();
        for record in &report.issues {
            println!("{:>10}  {}", record.cycle, record.request);
        }
    }
    println!();
    println!(
        "[*] Finished at cycle {}  ({} ops, {} blocked cycles)",
        report.final_cycle,
        report.issues.len(),
        report.blocked_cycles
    );
    scheduler.stats().print(scheduler.name());
}

fn cmd_compare(trace_path: &str, config_path: Option<&str>) {
    let base = load_config(config_path);
    let trace = load_trace(trace_path);

    println!(
        "{:<8} {:>12} {:>8} {:>10} {:>10} {:>10}",
        "policy", "final cycle", "ops", "activates", "hit rate", "blocked"
    );
    println!("{}", "-".repeat(63));
    for policy in PolicyKind::ALL {
        let config = ControllerConfig { policy, ..base };
        let (scheduler, report) = run(&config, &trace);
        let stats = scheduler.stats();
        println!(
            "{:<8} {:>12} {:>8} {:>10} {:>9.1}% {:>10}",
            policy.name(),
            report.final_cycle,
            report.issues.len(),
            stats.activates,
            stats.page_hit_rate(),
            report.blocked_cycles
        );
    }
}

fn cmd_config(config_path: Option<&str>) {
    let config = load_config(config_path);
    if let Err(e) = config.validate() {
        fatal(format!("invalid configuration: {e}"));
    }
    match serde_json::to_string_pretty(&config) {
        Ok(text) => println!("{text}"),
        Err(e) => fatal(e),
    }
}
