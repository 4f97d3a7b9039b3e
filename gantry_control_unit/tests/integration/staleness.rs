//! Integration test: stale or missing encoder data gates the affected axis.

use gantry_common::bus::BusFrame;
use gantry_common::bus::FrameSink;
use gantry_control_unit::command::ControlTarget;
use gantry_control_unit::config::GantryConfig;
use gantry_control_unit::report::AxisFlags;

use super::Bench;

const DT: f64 = 0.05;

fn config(threshold: u64) -> GantryConfig {
    let mut config = GantryConfig::default();
    config.control.stale_threshold = threshold;
    config
}

#[test]
fn stale_axis_sends_nothing_until_refreshed() {
    let mut bench = Bench::new(&config(3));
    bench.ctx.target.set(ControlTarget::Velocity([0.1, 0.1])).unwrap();
    bench.encoder(2, 0, 0);

    for _ in 0..5 {
        bench.encoder(0, 0, 0);
        bench.encoder(1, 0, 0);
        bench.control.tick_with_dt(DT);
    }
    // y last refreshed before tick 1; now at tick 5.
    let ids: Vec<u16> = bench.commands().iter().map(|c| c.0).collect();
    assert_eq!(ids.iter().filter(|&&id| id == 0x02).count(), 3);

    bench.encoder(0, 0, 0);
    bench.encoder(1, 0, 0);
    let report = bench.control.tick_with_dt(DT);
    assert!(report.axes[1].flags().contains(AxisFlags::STALE));
    assert_eq!(bench.commands().iter().map(|c| c.0).collect::<Vec<_>>(), vec![0x01]);

    bench.encoder(0, 0, 0);
    bench.encoder(1, 0, 0);
    bench.encoder(2, 0, 0);
    let report = bench.control.tick_with_dt(DT);
    assert!(report.axes[1].is_ready());
    assert_eq!(bench.commands().len(), 2);
}

#[test]
fn one_missing_rail_blocks_x() {
    let mut bench = Bench::new(&GantryConfig::default());
    bench.encoder(0, 100, 0);
    bench.encoder(2, 0, 0);
    let report = bench.control.tick_with_dt(DT);
    assert!(report.axes[0].flags().contains(AxisFlags::UNKNOWN));
    assert!(report.axes[1].is_ready());
    assert_eq!(bench.commands().iter().map(|c| c.0).collect::<Vec<_>>(), vec![0x02]);
}

#[test]
fn malformed_frames_do_not_touch_the_table() {
    let mut bench = Bench::new(&GantryConfig::default());
    bench.encoder(2, 5530, 0);

    bench.remote_tx.send(&BusFrame::new(0x124, &[0x01]).unwrap()).unwrap();
    bench.remote_tx.send(&BusFrame::new(0x3ff, &[0; 8]).unwrap()).unwrap();
    bench.inbound.drain().unwrap();

    assert_eq!(bench.inbound.stats().dropped, 2);
    let report = bench.control.tick_with_dt(DT);
    let y = report.axes[1].state.unwrap();
    assert!((y.position_m - 1.0).abs() < 1e-12);
}
