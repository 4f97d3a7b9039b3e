//! Integration test: threaded runtime against the simulated gantry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use gantry_common::bus::LoopbackEndpoint;
use gantry_control_unit::command::ControlTarget;
use gantry_control_unit::config::GantryConfig;
use gantry_control_unit::context::GantryContext;
use gantry_control_unit::error::CycleError;
use gantry_control_unit::report::{ChannelReporter, NullReporter};
use gantry_control_unit::runtime::GantryRuntime;
use gantry_control_unit::sim::{SimulatedGantry, SimulationParams};

fn fast_config() -> GantryConfig {
    let mut config = GantryConfig::default();
    config.control.cycle_time_ms = 10;
    config.startup.await_timeout_ms = 2000;
    config
}

#[test]
fn runtime_drives_simulated_gantry() {
    let config = fast_config();
    let ctx = GantryContext::canonical(&config).unwrap();
    let (local, remote) = LoopbackEndpoint::pair(4096);
    let (sink, source) = local.split();

    let sim_running = Arc::new(AtomicBool::new(true));
    let sim = SimulatedGantry::new(
        &config,
        Arc::clone(&ctx.registry),
        remote,
        SimulationParams::default(),
    )
    .spawn(Arc::clone(&sim_running))
    .unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    let runtime = GantryRuntime::start(
        &config,
        Arc::clone(&ctx),
        Box::new(sink),
        Box::new(source),
        Box::new(ChannelReporter::new(tx)),
    )
    .unwrap();
    assert!(runtime.is_running());

    ctx.target.set(ControlTarget::Velocity([0.0, 0.2])).unwrap();
    thread::sleep(Duration::from_millis(600));

    let summary = runtime.shutdown();
    assert!(summary.cycle.cycle_count > 10);
    assert!(summary.inbound.accepted > 0);
    assert_eq!(summary.inbound.dropped, 0);

    let reports: Vec<_> = rx.try_iter().collect();
    assert_eq!(reports.len() as u64, summary.cycle.cycle_count);
    assert!(reports.last().unwrap().axes[1].is_ready());

    sim_running.store(false, Ordering::SeqCst);
    let sim = sim.join().unwrap();
    assert!(sim.position(1).unwrap() > 0.0);
}

#[test]
fn startup_proceeds_after_readiness_timeout() {
    let mut config = fast_config();
    config.startup.await_timeout_ms = 50;
    let ctx = GantryContext::canonical(&config).unwrap();
    let (local, _remote) = LoopbackEndpoint::pair(64);
    let (sink, source) = local.split();

    let start = Instant::now();
    let runtime = GantryRuntime::start(
        &config,
        Arc::clone(&ctx),
        Box::new(sink),
        Box::new(source),
        Box::new(NullReporter),
    )
    .unwrap();
    assert!(start.elapsed() >= Duration::from_millis(50));

    thread::sleep(Duration::from_millis(50));
    let summary = runtime.shutdown();
    assert!(summary.cycle.cycle_count > 0);
}

#[test]
fn external_flag_stops_runtime() {
    let mut config = fast_config();
    config.startup.await_signals.clear();
    let ctx = GantryContext::canonical(&config).unwrap();
    let (local, _remote) = LoopbackEndpoint::pair(64);
    let (sink, source) = local.split();
    let running = Arc::new(AtomicBool::new(true));

    let runtime = GantryRuntime::start_with_flag(
        &config,
        ctx,
        Box::new(sink),
        Box::new(source),
        Box::new(NullReporter),
        Arc::clone(&running),
    )
    .unwrap();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(40));
        running.store(false, Ordering::SeqCst);
    });
    runtime.wait();
    stopper.join().unwrap();
    assert!(!runtime.is_running());
    runtime.shutdown();
}

#[test]
fn unwired_signal_fails_startup() {
    let mut config = fast_config();
    config.axes[1].encoders = vec![9];
    let ctx = GantryContext::canonical(&config).unwrap();
    let (local, _remote) = LoopbackEndpoint::pair(8);
    let (sink, source) = local.split();

    let err = GantryRuntime::start(
        &config,
        ctx,
        Box::new(sink),
        Box::new(source),
        Box::new(NullReporter),
    )
    .err()
    .unwrap();
    assert!(matches!(err, CycleError::MissingSignal { ref signal, .. } if signal == "encoder_abs_9"));
}
