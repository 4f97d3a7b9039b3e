mod config_loading;
mod end_to_end;
mod mode_switch;
mod runtime;
mod staleness;

use std::sync::Arc;

use gantry_common::bus::codec::encode;
use gantry_common::bus::{FrameSink, LoopbackEndpoint, LoopbackSink, LoopbackSource, SignalValue};
use gantry_control_unit::config::GantryConfig;
use gantry_control_unit::context::GantryContext;
use gantry_control_unit::cycle::ControlLoop;
use gantry_control_unit::inbound::InboundHandler;
use gantry_control_unit::report::NullReporter;

/// Control loop, inbound handler and the remote end of a loopback bus.
pub struct Bench {
    pub ctx: Arc<GantryContext>,
    pub control: ControlLoop,
    pub inbound: InboundHandler,
    pub remote_tx: LoopbackSink,
    pub remote_rx: LoopbackSource,
}

impl Bench {
    pub fn new(config: &GantryConfig) -> Self {
        let ctx = GantryContext::canonical(config).unwrap();
        let (local, remote) = LoopbackEndpoint::pair(256);
        let (sink, source) = local.split();
        let (remote_tx, remote_rx) = remote.split();
        let control = ControlLoop::new(
            config,
            Arc::clone(&ctx),
            Box::new(sink),
            Box::new(NullReporter),
        )
        .unwrap();
        let inbound = InboundHandler::new(Arc::clone(&ctx), Box::new(source));
        Self {
            ctx,
            control,
            inbound,
            remote_tx,
            remote_rx,
        }
    }

    /// Send an int32 signal from the remote side.
    pub fn send_int(&mut self, name: &str, value: i32) {
        let d = self.ctx.registry.describe(name).unwrap();
        self.remote_tx
            .send(&encode(d, SignalValue::Int32(value)).unwrap())
            .unwrap();
    }

    /// Publish one encoder channel and deliver it to the table.
    pub fn encoder(&mut self, channel: u8, abs: i32, speed: i32) {
        self.send_int(&format!("encoder_abs_{channel}"), abs);
        self.send_int(&format!("encoder_speed_{channel}"), speed);
        self.inbound.drain().unwrap();
    }

    /// Decoded speed commands the remote side received, as (id, wire value).
    pub fn commands(&mut self) -> Vec<(u16, f64)> {
        self.remote_rx
            .drain()
            .into_iter()
            .map(|f| {
                let d = self.ctx.registry.describe_id(f.id).unwrap();
                let v = gantry_common::bus::codec::decode(d, f.payload()).unwrap();
                (f.id, v.as_f64().unwrap())
            })
            .collect()
    }
}
