//! # Gantry Control Unit
//!
//! Loads the gantry TOML, wires the control loop to the signal registry,
//! starts the inbound and control threads and reads JSON commands from
//! stdin until interrupted.
//!
//! The hardware bus bridge is an external collaborator. `--simulate`
//! connects the loop to an in-process [`SimulatedGantry`] instead, so the
//! whole pipeline runs without hardware.

use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use clap::Parser;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use gantry_common::bus::LoopbackEndpoint;
use gantry_common::config::ConfigError;
use gantry_control_unit::command::input::spawn_stdin_reader;
use gantry_control_unit::config::{GantryConfig, load_config};
use gantry_control_unit::context::GantryContext;
use gantry_control_unit::report::{
    BackgroundReporter, JsonLinesReporter, StateReporter, TracingReporter,
};
use gantry_control_unit::runtime::GantryRuntime;
use gantry_control_unit::sim::{SimulatedGantry, SimulationParams};

/// Frames each loopback direction may queue.
const LOOPBACK_CAPACITY: usize = 1024;

/// State reports queued for the stdout writer.
const REPORT_QUEUE: usize = 64;

/// Gantry Control Unit - fixed-rate two-axis bus controller
#[derive(Parser, Debug)]
#[command(name = "gantry_control_unit")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Fixed-rate position/velocity control loop for a two-axis gantry bus")]
struct Args {
    /// Path to the gantry configuration TOML.
    #[arg(short, long, default_value = "config/gantry.toml")]
    config: PathBuf,

    /// Run against the in-process simulated gantry.
    #[arg(long)]
    simulate: bool,

    /// Write one JSON state report per tick to stdout.
    #[arg(long)]
    report_json: bool,

    /// Do not read commands from stdin.
    #[arg(long)]
    no_commands: bool,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args.config);
    setup_tracing(&args, config.as_ref().ok());

    info!("Gantry Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args, config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Gantry Control Unit shutdown complete");
}

fn run(
    args: &Args,
    config: Result<GantryConfig, ConfigError>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = config?;
    info!(
        "Config OK ({}): service={}, cycle_time={}ms, axes={}",
        args.config.display(),
        config.shared.service_name,
        config.control.cycle_time_ms,
        config.axes.len(),
    );

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    if !args.simulate {
        return Err("no bus transport is linked into this build; run with --simulate".into());
    }

    let ctx = GantryContext::canonical(&config)?;
    info!("Signal registry loaded: {} signals", ctx.registry.len());

    let (local, remote) = LoopbackEndpoint::pair(LOOPBACK_CAPACITY);
    let (sink, source) = local.split();

    let reporter: Box<dyn StateReporter> = if args.report_json {
        Box::new(BackgroundReporter::spawn(
            JsonLinesReporter::new(io::stdout()),
            REPORT_QUEUE,
        )?)
    } else {
        Box::new(TracingReporter)
    };

    // Simulated side first so startup signals can arrive.
    let sim = SimulatedGantry::new(
        &config,
        Arc::clone(&ctx.registry),
        remote,
        SimulationParams::default(),
    );
    let sim_running = Arc::new(std::sync::atomic::AtomicBool::new(true));
    let sim_handle = sim.spawn(Arc::clone(&sim_running))?;

    let runtime = GantryRuntime::start(
        &config,
        Arc::clone(&ctx),
        Box::new(sink),
        Box::new(source),
        reporter,
    )?;

    let running = runtime.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    if !args.no_commands {
        // Blocks in read; left detached at shutdown.
        let _reader = spawn_stdin_reader(ctx.target.clone())?;
    }

    runtime.wait();
    let summary = runtime.shutdown();
    info!(
        "Stopped: {} cycles ({} overruns), {} frames accepted, {} dropped, {} receive errors",
        summary.cycle.cycle_count,
        summary.cycle.overruns,
        summary.inbound.accepted,
        summary.inbound.dropped,
        summary.inbound.receive_errors
    );

    sim_running.store(false, Ordering::SeqCst);
    if sim_handle.join().is_err() {
        error!("simulation thread panicked");
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the config file.
///
/// Logs go to stderr so `--report-json` output on stdout stays clean.
fn setup_tracing(args: &Args, config: Option<&GantryConfig>) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        config
            .map(|c| c.shared.log_level.as_tracing_level())
            .unwrap_or(Level::INFO)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .compact()
            .init();
    }
}
