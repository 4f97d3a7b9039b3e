//! Integration test: commands switch the active controller.

use gantry_control_unit::command::{ControlMode, ControlTarget, GantryCommand};
use gantry_control_unit::config::GantryConfig;

use super::Bench;

const DT: f64 = 0.05;

fn fresh(bench: &mut Bench) {
    for ch in 0..3 {
        bench.encoder(ch, 0, 0);
    }
}

#[test]
fn command_selects_mode_for_next_tick() {
    let mut bench = Bench::new(&GantryConfig::default());
    fresh(&mut bench);
    assert_eq!(bench.control.tick_with_dt(DT).mode, ControlMode::VelocityHold);

    bench.ctx.target.apply(&GantryCommand {
        position: Some([1.0, 0.0]),
        velocity: None,
    })
    .unwrap();
    fresh(&mut bench);
    let report = bench.control.tick_with_dt(DT);
    assert_eq!(report.mode, ControlMode::PositionHold);
    assert_eq!(report.target, ControlTarget::Position([1.0, 0.0]));
}

#[test]
fn controllers_keep_memory_across_switches() {
    let mut bench = Bench::new(&GantryConfig::default());
    bench.ctx.target.set(ControlTarget::Velocity([1.0, 1.0])).unwrap();
    for _ in 0..3 {
        fresh(&mut bench);
        bench.control.tick_with_dt(DT);
    }
    let lowpass = bench.control.controllers().velocity.state(0);
    assert!(lowpass.output > 0.0);

    bench.ctx.target.set(ControlTarget::Position([1.0, 0.5])).unwrap();
    for _ in 0..3 {
        fresh(&mut bench);
        bench.control.tick_with_dt(DT);
    }
    assert_eq!(bench.control.controllers().velocity.state(0), lowpass);
    let pid = bench.control.controllers().position.state(0);
    assert!(pid.integral > 0.0);

    // Back to velocity: low-pass resumes from where it stopped, PID frozen.
    bench.ctx.target.set(ControlTarget::Velocity([1.0, 1.0])).unwrap();
    fresh(&mut bench);
    let report = bench.control.tick_with_dt(DT);
    let expected = lowpass.output + 0.1 * (1.0 - lowpass.output);
    assert!((report.axes[0].command_wire.unwrap() - expected * 37.0).abs() < 1e-9);
    assert_eq!(bench.control.controllers().position.state(0), pid);
}

#[test]
fn both_fields_prefer_position() {
    let bench = Bench::new(&GantryConfig::default());
    let stored = bench.ctx.target.apply(&GantryCommand {
        position: Some([0.5, 0.5]),
        velocity: Some([0.3, 0.3]),
    })
    .unwrap();
    assert_eq!(stored, Some(ControlTarget::Position([0.5, 0.5])));
}

#[test]
fn out_of_travel_position_is_clamped() {
    let mut bench = Bench::new(&GantryConfig::default());
    bench.ctx.target.apply(&GantryCommand {
        position: Some([-1.0, 3.0]),
        velocity: None,
    })
    .unwrap();
    fresh(&mut bench);
    let report = bench.control.tick_with_dt(DT);
    assert_eq!(report.target, ControlTarget::Position([0.0, 1.0]));
    // x already at its lower bound: no proportional drive.
    assert!(report.axes[0].command_wire.unwrap().abs() < 1e-9);
}
