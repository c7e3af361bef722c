//! power-control: session, command, and telemetry layer for CAN
//! power-supply/load modules
//!
//! Sits on top of the `can-driver` boundary crate: channel configuration
//! with replay snapshots, a recoverable device session, the command encoder
//! for the four structured frame families plus the single-parameter command
//! catalog, and batched telemetry receive with bounded auto-recovery and
//! heartbeat auditing.

mod config;
pub use config::{load_bus_config, BusConfig, ChannelConfig, ChannelMode, FrameFilter};

mod session;
pub use session::DeviceSession;

mod commander;
pub use commander::{
    Calibration, Commander, ControlCommand, Limits, RunState, Setpoint, SpecialFunction,
};

mod telemetry;
pub use telemetry::{HeartbeatGap, RawEntry, RawReading, Receiver, SortedReading, SortedSample};

mod metrics;
pub use metrics::{MetricsHub, SessionMetrics};
