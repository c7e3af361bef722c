use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::warn;

use can_driver::{CanDriver, MockDriver};
use power_control::{
    load_bus_config, Calibration, ChannelConfig, Commander, ControlCommand, DeviceSession, Limits,
    MetricsHub, Receiver, RunState, Setpoint, SpecialFunction,
};

#[derive(Parser, Debug)]
#[command(
    name = "pm",
    version,
    about = "Bench CLI for CAN power/load modules",
    disable_help_subcommand = true
)]
struct Cli {
    /// Adapter device index
    #[arg(long, default_value_t = 0, global = true)]
    device: u32,

    /// Driver backend
    #[arg(long, value_enum, default_value_t = Backend::Mock, global = true)]
    backend: Backend,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Backend {
    Mock,
    #[cfg(feature = "vendor")]
    Vendor,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RunMode {
    Stop,
    Cc,
    Cp,
    Cr,
}

impl From<RunMode> for RunState {
    fn from(mode: RunMode) -> Self {
        match mode {
            RunMode::Stop => RunState::Stop,
            RunMode::Cc => RunState::ConstantCurrentStart,
            RunMode::Cp => RunState::ConstantPowerStart,
            RunMode::Cr => RunState::ConstantResistanceStart,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputMode {
    Cc,
    Cv,
    Cp,
    Cr,
    Sine,
    Triangle,
    Square,
    Custom,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ValueKind {
    /// Unit 0.01 V
    Voltage,
    /// Unit 0.1 A
    Current,
    /// Unit 1 W
    Power,
    /// Unit 0.1 ohm
    Resistance,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LimitKind {
    /// Unit 0.01 V
    Voltage,
    /// Unit 0.1 A
    Current,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum WaveShape {
    Sine,
    Triangle,
    Square,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize channels from a YAML bus config
    Init {
        #[arg(long)]
        config: String,
    },
    /// Open the device, init channel 0, send a stop command, close
    Doctor {
        /// Frame id in hex (e.g., 0x10203010) or decimal
        #[arg(long, default_value = "0x10203010")]
        id: String,
        /// Target module address; 0 broadcasts
        #[arg(long, default_value = "0")]
        address: String,
    },
    /// Send a control-family command
    Control {
        #[arg(long, default_value = "0x10203010")]
        id: String,
        #[arg(long, default_value = "0")]
        address: String,
        #[arg(long, action = ArgAction::SetTrue)]
        reset: bool,
        #[arg(long, value_enum, default_value_t = RunMode::Stop)]
        run: RunMode,
        /// Calibrate voltage against this measured value
        #[arg(long, conflicts_with_all = ["calibrate_current", "set_address"])]
        calibrate_voltage: Option<i32>,
        /// Calibrate current against this measured value
        #[arg(long, conflicts_with = "set_address")]
        calibrate_current: Option<i32>,
        /// Assign a module address (broadcast, single module attached)
        #[arg(long)]
        set_address: Option<u32>,
    },
    /// Send a setpoint triple (0.1 V / 0.1 A / 0.1 kW)
    Setpoint {
        #[arg(long, default_value = "0x10203010")]
        id: String,
        #[arg(long, default_value = "0")]
        address: String,
        #[arg(long)]
        voltage: i32,
        #[arg(long)]
        current: i32,
        #[arg(long)]
        power: i32,
    },
    /// Send a limit triple (all unit 0.1)
    Limits {
        #[arg(long, default_value = "0x10203012")]
        id: String,
        #[arg(long, default_value = "0")]
        address: String,
        #[arg(long)]
        voltage_upper: i32,
        #[arg(long)]
        voltage_lower: i32,
        #[arg(long)]
        current_upper: i32,
    },
    /// Send a calibration triple
    Calibration {
        #[arg(long, default_value = "0x10203010")]
        id: String,
        #[arg(long, default_value = "0")]
        address: String,
        #[arg(long)]
        voltage_gain: i32,
        #[arg(long)]
        current_gain: i32,
        #[arg(long)]
        voltage_offset: i32,
    },
    /// Select an output mode on a module
    SetMode {
        #[arg(long, default_value = "0x10203010")]
        id: String,
        #[arg(long, value_enum)]
        mode: OutputMode,
    },
    /// Set an absolute output value
    SetValue {
        #[arg(long, default_value = "0x10203010")]
        id: String,
        #[arg(long, value_enum)]
        kind: ValueKind,
        #[arg(long)]
        value: i32,
    },
    /// Set an upper limit
    SetLimit {
        #[arg(long, default_value = "0x10203010")]
        id: String,
        #[arg(long, value_enum)]
        kind: LimitKind,
        #[arg(long)]
        value: i32,
    },
    /// Set waveform parameters (frequency unit 1, amplitude 0.1, duty 1)
    SetWave {
        #[arg(long, default_value = "0x10203010")]
        id: String,
        #[arg(long, value_enum)]
        shape: WaveShape,
        #[arg(long)]
        frequency: Option<i32>,
        #[arg(long)]
        amplitude: Option<i32>,
        #[arg(long)]
        duty: Option<i32>,
    },
    /// Poll sorted telemetry batches and flag heartbeat gaps
    Monitor {
        /// Telemetry source device id in hex or decimal
        #[arg(long)]
        target: String,
        #[arg(long, default_value_t = 0)]
        channel: u32,
        /// Number of batches to poll
        #[arg(long, default_value_t = 10)]
        count: u32,
        /// Max samples per batch
        #[arg(long, default_value_t = 2000)]
        size: usize,
        /// Write samples to a JSONL file
        #[arg(long)]
        out: Option<String>,
        /// Disable the session auto-recovery loop
        #[arg(long, action = ArgAction::SetTrue)]
        no_recover: bool,
        /// Print Prometheus metrics on exit
        #[arg(long, action = ArgAction::SetTrue)]
        metrics: bool,
    },
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();
    match cli.backend {
        Backend::Mock => run(MockDriver::new(), cli),
        #[cfg(feature = "vendor")]
        Backend::Vendor => run(can_driver::VendorDriver::new(), cli),
    }
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn run<D: CanDriver>(driver: D, cli: Cli) -> Result<()> {
    let device = cli.device;
    match cli.command {
        Commands::Init { config } => init_channels(driver, device, &config),
        Commands::Doctor { id, address } => doctor(driver, device, &id, &address),
        Commands::Control {
            id,
            address,
            reset,
            run,
            calibrate_voltage,
            calibrate_current,
            set_address,
        } => {
            let special = if let Some(v) = calibrate_voltage {
                SpecialFunction::CalibrateVoltage(v)
            } else if let Some(i) = calibrate_current {
                SpecialFunction::CalibrateCurrent(i)
            } else if let Some(a) = set_address {
                SpecialFunction::SetModuleAddress(a)
            } else {
                SpecialFunction::None
            };
            let command = ControlCommand {
                reset,
                run: run.into(),
                special,
            };
            with_commander(driver, device, &id, &address, |c, id, address| {
                c.control(id, &command, address)
            })
        }
        Commands::Setpoint {
            id,
            address,
            voltage,
            current,
            power,
        } => {
            let sp = Setpoint {
                voltage,
                current,
                power,
            };
            with_commander(driver, device, &id, &address, |c, id, address| {
                c.setpoint(id, &sp, address)
            })
        }
        Commands::Limits {
            id,
            address,
            voltage_upper,
            voltage_lower,
            current_upper,
        } => {
            let lim = Limits {
                voltage_upper,
                voltage_lower,
                current_upper,
            };
            with_commander(driver, device, &id, &address, |c, id, address| {
                c.limits(id, &lim, address)
            })
        }
        Commands::Calibration {
            id,
            address,
            voltage_gain,
            current_gain,
            voltage_offset,
        } => {
            let cal = Calibration {
                voltage_gain,
                current_gain,
                voltage_offset,
            };
            with_commander(driver, device, &id, &address, |c, id, address| {
                c.calibration(id, &cal, address)
            })
        }
        Commands::SetMode { id, mode } => {
            with_commander(driver, device, &id, "0", |c, id, _| match mode {
                OutputMode::Cc => c.constant_current_mode(id),
                OutputMode::Cv => c.constant_voltage_mode(id),
                OutputMode::Cp => c.constant_power_mode(id),
                OutputMode::Cr => c.constant_resistance_mode(id),
                OutputMode::Sine => c.sine_mode(id),
                OutputMode::Triangle => c.triangle_mode(id),
                OutputMode::Square => c.square_mode(id),
                OutputMode::Custom => c.custom_mode(id),
            })
        }
        Commands::SetValue { id, kind, value } => {
            with_commander(driver, device, &id, "0", |c, id, _| match kind {
                ValueKind::Voltage => c.set_voltage(id, value),
                ValueKind::Current => c.set_current(id, value),
                ValueKind::Power => c.set_power(id, value),
                ValueKind::Resistance => c.set_resistance(id, value),
            })
        }
        Commands::SetLimit { id, kind, value } => {
            with_commander(driver, device, &id, "0", |c, id, _| match kind {
                LimitKind::Voltage => c.set_voltage_limit(id, value),
                LimitKind::Current => c.set_current_limit(id, value),
            })
        }
        Commands::SetWave {
            id,
            shape,
            frequency,
            amplitude,
            duty,
        } => {
            if frequency.is_none() && amplitude.is_none() && duty.is_none() {
                anyhow::bail!("set-wave needs at least one of --frequency, --amplitude, --duty");
            }
            with_commander(driver, device, &id, "0", |c, id, _| {
                if let Some(v) = frequency {
                    match shape {
                        WaveShape::Sine => c.set_sine_frequency(id, v)?,
                        WaveShape::Triangle => c.set_triangle_frequency(id, v)?,
                        WaveShape::Square => c.set_square_frequency(id, v)?,
                    }
                }
                if let Some(v) = amplitude {
                    match shape {
                        WaveShape::Sine => c.set_sine_amplitude(id, v)?,
                        WaveShape::Triangle => c.set_triangle_amplitude(id, v)?,
                        WaveShape::Square => c.set_square_amplitude(id, v)?,
                    }
                }
                if let Some(v) = duty {
                    match shape {
                        WaveShape::Sine => c.set_sine_duty(id, v)?,
                        WaveShape::Triangle => c.set_triangle_duty(id, v)?,
                        WaveShape::Square => c.set_square_duty(id, v)?,
                    }
                }
                Ok(())
            })
        }
        Commands::Monitor {
            target,
            channel,
            count,
            size,
            out,
            no_recover,
            metrics,
        } => monitor(
            driver, device, &target, channel, count, size, out.as_deref(), no_recover, metrics,
        ),
    }
}

fn parse_u32(s: &str) -> Result<u32> {
    let t = s.trim();
    let parsed = if let Some(hex) = t.strip_prefix("0x") {
        u32::from_str_radix(hex, 16)
    } else {
        t.parse::<u32>()
    };
    parsed.map_err(|_| anyhow::anyhow!("invalid number: {t}"))
}

fn open_session<D: CanDriver>(driver: D, device: u32) -> Result<DeviceSession<D>> {
    let session = DeviceSession::open(driver, device);
    if !session.healthy() {
        anyhow::bail!(
            "device {device} failed to open (status {})",
            session.last_status()
        );
    }
    Ok(session)
}

fn with_commander<D, F>(driver: D, device: u32, id: &str, address: &str, op: F) -> Result<()>
where
    D: CanDriver,
    F: FnOnce(&mut Commander<'_, D>, u32, u32) -> can_driver::Result<()>,
{
    let id = parse_u32(id)?;
    let address = parse_u32(address)?;
    let mut session = open_session(driver, device)?;
    session.configure(ChannelConfig::default())?;
    let mut commander = Commander::new(&mut session);
    op(&mut commander, id, address)?;
    println!("send: ok");
    session.close();
    Ok(())
}

fn init_channels<D: CanDriver>(driver: D, device_override: u32, path: &str) -> Result<()> {
    let cfg = load_bus_config(path)?;
    let device = if device_override != 0 {
        device_override
    } else {
        cfg.device
    };
    let mut session = open_session(driver, device)?;
    println!("open: ok (device {device})");
    for channel in &cfg.channels {
        match session.configure(*channel) {
            Ok(()) => println!("channel {}: ok", channel.channel),
            Err(e) => println!("channel {}: {e}", channel.channel),
        }
    }
    session.close();
    Ok(())
}

fn doctor<D: CanDriver>(driver: D, device: u32, id: &str, address: &str) -> Result<()> {
    let id = parse_u32(id)?;
    let address = parse_u32(address)?;
    let mut session = open_session(driver, device)?;
    println!("open: ok");
    session.configure(ChannelConfig::default())?;
    println!("init: ok");
    let mut commander = Commander::new(&mut session);
    commander.control(id, &ControlCommand::run(RunState::Stop), address)?;
    println!("control: ok");
    session.close();
    println!("doctor: done");
    Ok(())
}

#[derive(Serialize)]
struct MonitorRecord {
    ts: Option<String>,
    id: u32,
    time: u8,
    current: i16,
    voltage: i16,
    heartbeat: u8,
}

#[allow(clippy::too_many_arguments)]
fn monitor<D: CanDriver>(
    driver: D,
    device: u32,
    target: &str,
    channel: u32,
    count: u32,
    size: usize,
    out: Option<&str>,
    no_recover: bool,
    metrics: bool,
) -> Result<()> {
    let target = parse_u32(target)?;
    let mut session = open_session(driver, device)?;
    session.configure(ChannelConfig {
        channel,
        ..ChannelConfig::default()
    })?;

    let mut writer = match out {
        Some(path) => Some(BufWriter::new(File::create(path)?)),
        None => None,
    };
    let hub = MetricsHub::new().map_err(|e| anyhow::anyhow!(e))?;
    let receiver = Receiver::new();

    for _ in 0..count {
        let reading = match receiver.receive_sorted(&mut session, target, channel, size, !no_recover)
        {
            Ok(r) => r,
            Err(e) => {
                warn!(target, "receive failed: {e}");
                continue;
            }
        };
        hub.session.batches_received.inc();
        hub.session.recoveries.inc_by(u64::from(reading.recoveries()));
        hub.session.samples_last_batch.set(reading.len() as i64);

        let ts = reading
            .received_at()
            .format(&time::format_description::well_known::Rfc3339)
            .ok();
        for sample in reading.iter() {
            println!(
                "id=0x{:08X} time={} current={} voltage={} heartbeat={}",
                sample.id, sample.time, sample.current, sample.voltage, sample.heartbeat
            );
            if let Some(w) = writer.as_mut() {
                let rec = MonitorRecord {
                    ts: ts.clone(),
                    id: sample.id,
                    time: sample.time,
                    current: sample.current,
                    voltage: sample.voltage,
                    heartbeat: sample.heartbeat,
                };
                let json = serde_json::to_string(&rec)?;
                w.write_all(json.as_bytes())?;
                w.write_all(b"\n")?;
            }
        }
        for gap in reading.heartbeat_gaps() {
            warn!(
                id = gap.id,
                index = gap.index,
                expected = gap.expected,
                actual = gap.actual,
                "heartbeat gap: samples lost or duplicated"
            );
        }
    }

    if let Some(w) = writer.as_mut() {
        w.flush()?;
    }
    if metrics {
        print!("{}", hub.encode_text());
    }
    session.close();
    Ok(())
}
