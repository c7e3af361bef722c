use can_driver::{CanDriver, CanFrame, DriverError, Parameter, Result, SendOptions, STATUS_OK};

use crate::session::DeviceSession;

/// Module run-state codes of the control family.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunState {
    Stop = 1,
    ConstantCurrentStart = 3,
    ConstantPowerStart = 4,
    ConstantResistanceStart = 5,
}

impl RunState {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Special-command slot of the control family. The accompanying value's
/// meaning depends on the variant: measured voltage, measured current, or
/// the module address to assign (sent broadcast with exactly one module
/// attached).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SpecialFunction {
    None,
    CalibrateVoltage(i32),
    CalibrateCurrent(i32),
    SetModuleAddress(u32),
}

impl SpecialFunction {
    pub(crate) fn lower(self) -> (u8, i32) {
        match self {
            SpecialFunction::None => (0, 0),
            SpecialFunction::CalibrateVoltage(v) => (1, v),
            SpecialFunction::CalibrateCurrent(i) => (2, i),
            SpecialFunction::SetModuleAddress(a) => (3, a as i32),
        }
    }
}

/// Control family payload: reset flag, run state, special command.
#[derive(Clone, Copy, Debug)]
pub struct ControlCommand {
    pub reset: bool,
    pub run: RunState,
    pub special: SpecialFunction,
}

impl ControlCommand {
    pub fn run(run: RunState) -> Self {
        Self {
            reset: false,
            run,
            special: SpecialFunction::None,
        }
    }
}

/// Setpoint triple, units 0.1 V / 0.1 A / 0.1 kW.
#[derive(Clone, Copy, Debug)]
pub struct Setpoint {
    pub voltage: i32,
    pub current: i32,
    pub power: i32,
}

/// Limit triple, all unit 0.1.
#[derive(Clone, Copy, Debug)]
pub struct Limits {
    pub voltage_upper: i32,
    pub voltage_lower: i32,
    pub current_upper: i32,
}

/// Calibration triple: gains plus voltage zero-offset.
#[derive(Clone, Copy, Debug)]
pub struct Calibration {
    pub voltage_gain: i32,
    pub current_gain: i32,
    pub voltage_offset: i32,
}

/// Command encoder over one session.
///
/// Each operation is one driver call; values pass through verbatim in their
/// documented raw units, and any non-success status surfaces untouched —
/// retry policy belongs to the caller. Address 0 broadcasts.
pub struct Commander<'a, D: CanDriver> {
    session: &'a mut DeviceSession<D>,
    opts: SendOptions,
}

impl<'a, D: CanDriver> Commander<'a, D> {
    pub fn new(session: &'a mut DeviceSession<D>) -> Self {
        Self::with_options(session, SendOptions::default())
    }

    pub fn with_options(session: &'a mut DeviceSession<D>, opts: SendOptions) -> Self {
        Self { session, opts }
    }

    pub fn options(&self) -> &SendOptions {
        &self.opts
    }

    fn check(status: i32) -> Result<()> {
        if status == STATUS_OK {
            Ok(())
        } else {
            Err(DriverError::Send(status))
        }
    }

    /// Send one pre-built frame on the configured channel.
    pub fn send_frame(&mut self, frame: &CanFrame) -> Result<()> {
        let device = self.session.device();
        let channel = self.opts.channel;
        Self::check(self.session.driver_mut().send_frame(frame, device, channel))
    }

    pub fn control(&mut self, id: u32, command: &ControlCommand, address: u32) -> Result<()> {
        let (special_command, special_value) = command.special.lower();
        let device = self.session.device();
        Self::check(self.session.driver_mut().send_control(
            id,
            u8::from(command.reset),
            command.run.code(),
            special_command,
            special_value,
            address,
            device,
            &self.opts,
        ))
    }

    pub fn setpoint(&mut self, id: u32, setpoint: &Setpoint, address: u32) -> Result<()> {
        let device = self.session.device();
        Self::check(self.session.driver_mut().send_setpoint(
            id,
            setpoint.voltage,
            setpoint.current,
            setpoint.power,
            address,
            device,
            &self.opts,
        ))
    }

    pub fn limits(&mut self, id: u32, limits: &Limits, address: u32) -> Result<()> {
        let device = self.session.device();
        Self::check(self.session.driver_mut().send_limits(
            id,
            limits.voltage_upper,
            limits.voltage_lower,
            limits.current_upper,
            address,
            device,
            &self.opts,
        ))
    }

    pub fn calibration(&mut self, id: u32, calibration: &Calibration, address: u32) -> Result<()> {
        let device = self.session.device();
        Self::check(self.session.driver_mut().send_calibration(
            id,
            calibration.voltage_gain,
            calibration.current_gain,
            calibration.voltage_offset,
            address,
            device,
            &self.opts,
        ))
    }

    fn parameter(&mut self, id: u32, param: Parameter) -> Result<()> {
        let device = self.session.device();
        Self::check(self.session.driver_mut().send_parameter(id, param, device, &self.opts))
    }

    pub fn constant_current_mode(&mut self, id: u32) -> Result<()> {
        self.parameter(id, Parameter::ConstantCurrentMode)
    }

    pub fn constant_voltage_mode(&mut self, id: u32) -> Result<()> {
        self.parameter(id, Parameter::ConstantVoltageMode)
    }

    pub fn constant_power_mode(&mut self, id: u32) -> Result<()> {
        self.parameter(id, Parameter::ConstantPowerMode)
    }

    pub fn constant_resistance_mode(&mut self, id: u32) -> Result<()> {
        self.parameter(id, Parameter::ConstantResistanceMode)
    }

    /// Unit 0.1 A.
    pub fn set_constant_current(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::ConstantCurrent(value))
    }

    /// Unit 0.1 V.
    pub fn set_constant_voltage(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::ConstantVoltage(value))
    }

    /// Unit 0.1 kW.
    pub fn set_constant_power(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::ConstantPower(value))
    }

    /// Unit 0.1 ohm.
    pub fn set_constant_resistance(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::ConstantResistance(value))
    }

    pub fn sine_mode(&mut self, id: u32) -> Result<()> {
        self.parameter(id, Parameter::SineMode)
    }

    pub fn triangle_mode(&mut self, id: u32) -> Result<()> {
        self.parameter(id, Parameter::TriangleMode)
    }

    pub fn square_mode(&mut self, id: u32) -> Result<()> {
        self.parameter(id, Parameter::SquareMode)
    }

    pub fn custom_mode(&mut self, id: u32) -> Result<()> {
        self.parameter(id, Parameter::CustomMode)
    }

    /// Unit 1 Hz.
    pub fn set_sine_frequency(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::SineFrequency(value))
    }

    /// Unit 0.1.
    pub fn set_sine_amplitude(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::SineAmplitude(value))
    }

    /// Unit 1 %.
    pub fn set_sine_duty(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::SineDuty(value))
    }

    /// Unit 1 Hz.
    pub fn set_triangle_frequency(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::TriangleFrequency(value))
    }

    /// Unit 0.1.
    pub fn set_triangle_amplitude(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::TriangleAmplitude(value))
    }

    /// Unit 1 %.
    pub fn set_triangle_duty(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::TriangleDuty(value))
    }

    /// Unit 1 Hz.
    pub fn set_square_frequency(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::SquareFrequency(value))
    }

    /// Unit 0.1.
    pub fn set_square_amplitude(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::SquareAmplitude(value))
    }

    /// Unit 1 %.
    pub fn set_square_duty(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::SquareDuty(value))
    }

    /// Unit 0.01 V.
    pub fn set_voltage_limit(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::VoltageLimit(value))
    }

    /// Unit 0.1 A.
    pub fn set_current_limit(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::CurrentLimit(value))
    }

    /// Unit 0.01 V.
    pub fn set_voltage(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::Voltage(value))
    }

    /// Unit 0.1 A.
    pub fn set_current(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::Current(value))
    }

    /// Unit 0.1 ohm.
    pub fn set_resistance(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::Resistance(value))
    }

    /// Unit 1 W.
    pub fn set_power(&mut self, id: u32, value: i32) -> Result<()> {
        self.parameter(id, Parameter::Power(value))
    }

    /// Slot 1..=7, unit 0.1 A.
    pub fn set_custom_current(&mut self, id: u32, slot: u8, value: i32) -> Result<()> {
        Self::check_slot(slot)?;
        self.parameter(id, Parameter::CustomCurrent { slot, value })
    }

    /// Slot 1..=7, unit 0.1 s.
    pub fn set_custom_period(&mut self, id: u32, slot: u8, value: i32) -> Result<()> {
        Self::check_slot(slot)?;
        self.parameter(id, Parameter::CustomPeriod { slot, value })
    }

    /// Request the configured voltage upper limit from the module.
    pub fn read_voltage_limit(&mut self, id: u32) -> Result<()> {
        self.parameter(id, Parameter::ReadVoltageLimit)
    }

    // Slot range is a hardware constraint; refuse before touching the bus.
    // 0 is the vendor's generic failure status.
    fn check_slot(slot: u8) -> Result<()> {
        if (1..=7).contains(&slot) {
            Ok(())
        } else {
            Err(DriverError::Send(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_driver::{MockCall, MockDriver};

    fn session() -> DeviceSession<MockDriver> {
        DeviceSession::open(MockDriver::new(), 0)
    }

    #[test]
    fn control_passes_fields_verbatim() {
        let mut session = session();
        let mut commander = Commander::new(&mut session);
        let command = ControlCommand {
            reset: false,
            run: RunState::ConstantCurrentStart,
            special: SpecialFunction::None,
        };
        assert!(commander.control(0x1020_3010, &command, 0x1020_3010).is_ok());
        assert_eq!(
            session.driver().calls[1],
            MockCall::SendControl {
                id: 0x1020_3010,
                reset: 0,
                run_state: 3,
                special_command: 0,
                special_value: 0,
                address: 0x1020_3010,
                device: 0,
                channel: 0,
                remote_flag: 0,
                extern_flag: 1,
                send_type: 1,
            }
        );
    }

    #[test]
    fn raw_frame_send_targets_the_configured_channel() {
        let mut session = session();
        let opts = SendOptions {
            channel: 1,
            ..SendOptions::default()
        };
        let mut commander = Commander::with_options(&mut session, opts);
        let frame = match CanFrame::new(0x321, &[0x01, 0x02]) {
            Some(f) => f,
            None => panic!("2-byte payload must be accepted"),
        };
        assert!(commander.send_frame(&frame).is_ok());
        assert_eq!(
            session.driver().calls[1],
            MockCall::SendFrame {
                frame,
                device: 0,
                channel: 1,
            }
        );
    }

    #[test]
    fn special_functions_lower_to_code_value_pairs() {
        assert_eq!(SpecialFunction::None.lower(), (0, 0));
        assert_eq!(SpecialFunction::CalibrateVoltage(2205).lower(), (1, 2205));
        assert_eq!(SpecialFunction::CalibrateCurrent(150).lower(), (2, 150));
        assert_eq!(SpecialFunction::SetModuleAddress(7).lower(), (3, 7));
    }

    #[test]
    fn setpoint_is_unscaled() {
        let mut session = session();
        let mut commander = Commander::new(&mut session);
        let sp = Setpoint {
            voltage: 2205,
            current: -35,
            power: 12,
        };
        assert!(commander.setpoint(0x10, &sp, 0).is_ok());
        assert_eq!(
            session.driver().calls[1],
            MockCall::SendSetpoint {
                id: 0x10,
                voltage: 2205,
                current: -35,
                power: 12,
                address: 0,
                device: 0,
                channel: 0,
                remote_flag: 0,
                extern_flag: 1,
                send_type: 1,
            }
        );
    }

    #[test]
    fn limits_and_calibration_pass_through() {
        let mut session = session();
        let mut commander = Commander::new(&mut session);
        let lim = Limits {
            voltage_upper: 3000,
            voltage_lower: 100,
            current_upper: 500,
        };
        let cal = Calibration {
            voltage_gain: 1001,
            current_gain: 999,
            voltage_offset: -4,
        };
        assert!(commander.limits(0x12, &lim, 2).is_ok());
        assert!(commander.calibration(0x10, &cal, 2).is_ok());
        assert_eq!(
            session.driver().calls[1],
            MockCall::SendLimits {
                id: 0x12,
                voltage_upper: 3000,
                voltage_lower: 100,
                current_upper: 500,
                address: 2,
                device: 0,
                channel: 0,
                remote_flag: 0,
                extern_flag: 1,
                send_type: 1,
            }
        );
        assert_eq!(
            session.driver().calls[2],
            MockCall::SendCalibration {
                id: 0x10,
                voltage_gain: 1001,
                current_gain: 999,
                voltage_offset: -4,
                address: 2,
                device: 0,
                channel: 0,
                remote_flag: 0,
                extern_flag: 1,
                send_type: 1,
            }
        );
    }

    #[test]
    fn parameter_operations_carry_identity_and_value() {
        let mut session = session();
        let mut commander = Commander::new(&mut session);
        assert!(commander.constant_current_mode(0x10).is_ok());
        assert!(commander.set_sine_amplitude(0x10, 55).is_ok());
        assert!(commander.set_voltage_limit(0x10, 24_000).is_ok());
        assert!(commander.set_custom_period(0x10, 7, 15).is_ok());
        assert!(commander.read_voltage_limit(0x10).is_ok());

        let params: Vec<Parameter> = session
            .driver()
            .calls
            .iter()
            .filter_map(|c| match c {
                MockCall::SendParameter { param, .. } => Some(*param),
                _ => None,
            })
            .collect();
        assert_eq!(
            params,
            vec![
                Parameter::ConstantCurrentMode,
                Parameter::SineAmplitude(55),
                Parameter::VoltageLimit(24_000),
                Parameter::CustomPeriod { slot: 7, value: 15 },
                Parameter::ReadVoltageLimit,
            ]
        );
    }

    #[test]
    fn custom_slot_range_is_enforced_before_send() {
        let mut session = session();
        let mut commander = Commander::new(&mut session);
        assert_eq!(
            commander.set_custom_current(0x10, 0, 5),
            Err(DriverError::Send(0))
        );
        assert_eq!(
            commander.set_custom_current(0x10, 8, 5),
            Err(DriverError::Send(0))
        );
        // Only the session open call is in the log; nothing hit the bus.
        assert_eq!(session.driver().calls.len(), 1);
    }

    #[test]
    fn failure_status_surfaces_uninterpreted() {
        let mut session = session();
        session.driver_mut().send_results.push_back(-3);
        let mut commander = Commander::new(&mut session);
        assert_eq!(
            commander.set_power(0x10, 800),
            Err(DriverError::Send(-3))
        );
    }
}
