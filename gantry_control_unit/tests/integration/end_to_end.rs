//! Integration test: frames in, speed commands out.

use std::sync::Arc;
use std::time::Duration;

use gantry_common::bus::LoopbackEndpoint;
use gantry_control_unit::command::{ControlTarget, GantryCommand};
use gantry_control_unit::config::GantryConfig;
use gantry_control_unit::context::GantryContext;
use gantry_control_unit::cycle::ControlLoop;
use gantry_control_unit::inbound::InboundHandler;
use gantry_control_unit::report::NullReporter;
use gantry_control_unit::sim::{SimulatedGantry, SimulationParams};

use super::Bench;

const DT: f64 = 0.05;

#[test]
fn encoder_counts_become_meters() {
    let mut config = GantryConfig::default();
    config.axes[0].encoders = vec![0];
    config.axes[0].offset = 0.5;
    let mut bench = Bench::new(&config);

    bench.encoder(0, 55300, 0);
    bench.encoder(2, 0, 0);
    let report = bench.control.tick_with_dt(DT);

    let x = report.axes[0].state.unwrap();
    assert!((x.position_m - 10.5).abs() < 1e-12);
    assert_eq!(x.velocity_mps, 0.0);
}

#[test]
fn x_position_is_mean_of_both_rails() {
    let mut bench = Bench::new(&GantryConfig::default());
    bench.encoder(0, 55300, 553);
    bench.encoder(1, 55300 + 1106, 1659);
    bench.encoder(2, -2765, 0);
    let report = bench.control.tick_with_dt(DT);

    let x = report.axes[0].state.unwrap();
    assert!((x.position_m - 10.1).abs() < 1e-12);
    assert!((x.velocity_mps - 0.2).abs() < 1e-12);
    let y = report.axes[1].state.unwrap();
    assert!((y.position_m + 0.5).abs() < 1e-12);
}

#[test]
fn velocity_target_reaches_the_wire() {
    let mut bench = Bench::new(&GantryConfig::default());
    bench.ctx.target.apply(&GantryCommand {
        position: None,
        velocity: Some([0.2, -0.1]),
    })
    .unwrap();

    let mut last = Vec::new();
    for _ in 0..200 {
        for ch in 0..3 {
            bench.encoder(ch, 0, 0);
        }
        bench.control.tick_with_dt(DT);
        last = bench.commands();
    }

    assert_eq!(last.len(), 2);
    assert_eq!(last[0].0, 0x01);
    assert!((last[0].1 - 0.2 * 37.0).abs() < 1e-6);
    assert_eq!(last[1].0, 0x02);
    assert!((last[1].1 + 0.1 * 37.0).abs() < 1e-6);
}

#[test]
fn position_hold_converges_on_simulated_gantry() {
    let config = GantryConfig::default();
    let ctx = GantryContext::canonical(&config).unwrap();
    let (local, remote) = LoopbackEndpoint::pair(1024);
    let (sink, source) = local.split();
    let mut control = ControlLoop::new(
        &config,
        Arc::clone(&ctx),
        Box::new(sink),
        Box::new(NullReporter),
    )
    .unwrap();
    let mut inbound = InboundHandler::new(Arc::clone(&ctx), Box::new(source));
    let mut sim = SimulatedGantry::new(
        &config,
        Arc::clone(&ctx.registry),
        remote,
        SimulationParams::default(),
    );

    sim.publish().unwrap();
    inbound.drain().unwrap();
    ctx.target.set(ControlTarget::Position([1.0, 0.5])).unwrap();

    for _ in 0..800 {
        control.tick_with_dt(DT);
        sim.step(Duration::from_secs_f64(DT)).unwrap();
        inbound.drain().unwrap();
    }

    assert!((sim.position(0).unwrap() - 1.0).abs() < 0.01, "x = {:?}", sim.position(0));
    assert!((sim.position(1).unwrap() - 0.5).abs() < 0.01, "y = {:?}", sim.position(1));
    assert_eq!(inbound.stats().dropped, 0);
}
