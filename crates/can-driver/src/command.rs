/// Transmit behavior requested from the adapter.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SendType {
    /// Send once, no retransmission on lost arbitration.
    #[default]
    Once = 1,
    /// Let the adapter retry on the bus until the frame goes out.
    AutoRetry = 2,
}

/// Per-call flags shared by every outbound command.
#[derive(Clone, Copy, Debug)]
pub struct SendOptions {
    pub channel: u32,
    pub remote_frame: bool,
    pub extended_frame: bool,
    pub send_type: SendType,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            channel: 0,
            remote_frame: false,
            extended_frame: true,
            send_type: SendType::Once,
        }
    }
}

impl SendOptions {
    pub fn remote_flag(&self) -> u8 {
        u8::from(self.remote_frame)
    }

    pub fn extern_flag(&self) -> u8 {
        u8::from(self.extended_frame)
    }

    pub fn send_type_code(&self) -> u8 {
        self.send_type as u8
    }
}

/// One of the adapter's named single-parameter command entry points.
///
/// Values are raw device units; each variant documents its scale. The
/// receiving hardware expects these exact scales, so nothing is converted on
/// this side of the boundary.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Parameter {
    /// Select constant-current mode.
    ConstantCurrentMode,
    /// Select constant-voltage mode.
    ConstantVoltageMode,
    /// Select constant-power mode.
    ConstantPowerMode,
    /// Select constant-resistance mode.
    ConstantResistanceMode,
    /// Constant-current setpoint, unit 0.1 A.
    ConstantCurrent(i32),
    /// Constant-voltage setpoint, unit 0.1 V.
    ConstantVoltage(i32),
    /// Constant-power setpoint, unit 0.1 kW.
    ConstantPower(i32),
    /// Constant-resistance setpoint, unit 0.1 ohm.
    ConstantResistance(i32),
    /// Select sine waveform mode.
    SineMode,
    /// Select triangle waveform mode.
    TriangleMode,
    /// Select square waveform mode.
    SquareMode,
    /// Select custom (user-programmed square) waveform mode.
    CustomMode,
    /// Sine frequency, unit 1 Hz.
    SineFrequency(i32),
    /// Sine amplitude, unit 0.1.
    SineAmplitude(i32),
    /// Sine duty cycle, unit 1 %.
    SineDuty(i32),
    /// Triangle frequency, unit 1 Hz.
    TriangleFrequency(i32),
    /// Triangle amplitude, unit 0.1.
    TriangleAmplitude(i32),
    /// Triangle duty cycle, unit 1 %.
    TriangleDuty(i32),
    /// Square frequency, unit 1 Hz.
    SquareFrequency(i32),
    /// Square amplitude, unit 0.1.
    SquareAmplitude(i32),
    /// Square duty cycle, unit 1 %.
    SquareDuty(i32),
    /// Voltage upper limit, unit 0.01 V.
    VoltageLimit(i32),
    /// Current upper limit, unit 0.1 A.
    CurrentLimit(i32),
    /// Output voltage, unit 0.01 V.
    Voltage(i32),
    /// Output current, unit 0.1 A.
    Current(i32),
    /// Load resistance, unit 0.1 ohm.
    Resistance(i32),
    /// Output power, unit 1 W.
    Power(i32),
    /// Custom-waveform slot current, slot 1..=7, unit 0.1 A.
    CustomCurrent { slot: u8, value: i32 },
    /// Custom-waveform slot period, slot 1..=7, unit 0.1 s.
    CustomPeriod { slot: u8, value: i32 },
    /// Request the configured voltage upper limit.
    ReadVoltageLimit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_send_options() {
        let opts = SendOptions::default();
        assert_eq!(opts.channel, 0);
        assert_eq!(opts.remote_flag(), 0);
        assert_eq!(opts.extern_flag(), 1);
        assert_eq!(opts.send_type_code(), 1);
    }

    #[test]
    fn send_type_codes() {
        assert_eq!(SendType::Once as u8, 1);
        assert_eq!(SendType::AutoRetry as u8, 2);
    }
}
