use crate::command::{Parameter, SendOptions};
use crate::types::{CanFrame, RawBatch, SortedBatch};

/// The native adapter capability.
///
/// Production binds this to the vendor library ([`crate::VendorDriver`]
/// under the `vendor` feature); tests bind a mock. Status convention:
/// command and init entry points return [`crate::STATUS_OK`] on success and
/// any other value on failure. Receive entry points return the filled count
/// (>= 0) or a negative error code; a negative code from `receive_sorted`
/// specifically means the device/bus is in a state that needs a session
/// recovery.
///
/// The driver's internal thread-safety is unknown and assumed absent:
/// callers must serialize access to one device externally.
pub trait CanDriver {
    fn open_device(&mut self, device: u32) -> i32;

    fn close_device(&mut self, device: u32) -> i32;

    #[allow(clippy::too_many_arguments)]
    fn init_channel(
        &mut self,
        device: u32,
        channel: u32,
        mode: u8,
        acc_code: u32,
        acc_mask: u32,
        filter: u8,
        timing0: u8,
        timing1: u8,
    ) -> i32;

    /// Send one pre-built frame.
    fn send_frame(&mut self, frame: &CanFrame, device: u32, channel: u32) -> i32;

    /// Command family 1: reset flag, run-state code, special command
    /// (0 none, 1 calibrate voltage, 2 calibrate current, 3 set module
    /// address) with its accompanying value. Address 0 broadcasts.
    #[allow(clippy::too_many_arguments)]
    fn send_control(
        &mut self,
        id: u32,
        reset: u8,
        run_state: u8,
        special_command: u8,
        special_value: i32,
        address: u32,
        device: u32,
        opts: &SendOptions,
    ) -> i32;

    /// Command family 2: setpoint triple, units 0.1 V / 0.1 A / 0.1 kW.
    #[allow(clippy::too_many_arguments)]
    fn send_setpoint(
        &mut self,
        id: u32,
        voltage: i32,
        current: i32,
        power: i32,
        address: u32,
        device: u32,
        opts: &SendOptions,
    ) -> i32;

    /// Command family 3: limit triple, all unit 0.1.
    #[allow(clippy::too_many_arguments)]
    fn send_limits(
        &mut self,
        id: u32,
        voltage_upper: i32,
        voltage_lower: i32,
        current_upper: i32,
        address: u32,
        device: u32,
        opts: &SendOptions,
    ) -> i32;

    /// Command family 4: calibration triple (voltage gain, current gain,
    /// voltage zero-offset).
    #[allow(clippy::too_many_arguments)]
    fn send_calibration(
        &mut self,
        id: u32,
        voltage_gain: i32,
        current_gain: i32,
        voltage_offset: i32,
        address: u32,
        device: u32,
        opts: &SendOptions,
    ) -> i32;

    /// One of the 30 named single-parameter vendor entry points; the
    /// variant identifies which.
    fn send_parameter(&mut self, id: u32, param: Parameter, device: u32, opts: &SendOptions)
        -> i32;

    /// Blocking raw batch receive; the driver fills up to `size` entries.
    fn receive_raw(&mut self, out: &mut RawBatch, device: u32, channel: u32, size: usize) -> i32;

    /// Blocking sorted batch receive for one target device id.
    fn receive_sorted(
        &mut self,
        target: u32,
        out: &mut SortedBatch,
        device: u32,
        channel: u32,
        size: usize,
    ) -> i32;
}

// Lets callers lend a driver instead of moving it into a session.
impl<D: CanDriver + ?Sized> CanDriver for &mut D {
    fn open_device(&mut self, device: u32) -> i32 {
        (**self).open_device(device)
    }

    fn close_device(&mut self, device: u32) -> i32 {
        (**self).close_device(device)
    }

    fn init_channel(
        &mut self,
        device: u32,
        channel: u32,
        mode: u8,
        acc_code: u32,
        acc_mask: u32,
        filter: u8,
        timing0: u8,
        timing1: u8,
    ) -> i32 {
        (**self).init_channel(
            device, channel, mode, acc_code, acc_mask, filter, timing0, timing1,
        )
    }

    fn send_frame(&mut self, frame: &CanFrame, device: u32, channel: u32) -> i32 {
        (**self).send_frame(frame, device, channel)
    }

    fn send_control(
        &mut self,
        id: u32,
        reset: u8,
        run_state: u8,
        special_command: u8,
        special_value: i32,
        address: u32,
        device: u32,
        opts: &SendOptions,
    ) -> i32 {
        (**self).send_control(
            id,
            reset,
            run_state,
            special_command,
            special_value,
            address,
            device,
            opts,
        )
    }

    fn send_setpoint(
        &mut self,
        id: u32,
        voltage: i32,
        current: i32,
        power: i32,
        address: u32,
        device: u32,
        opts: &SendOptions,
    ) -> i32 {
        (**self).send_setpoint(id, voltage, current, power, address, device, opts)
    }

    fn send_limits(
        &mut self,
        id: u32,
        voltage_upper: i32,
        voltage_lower: i32,
        current_upper: i32,
        address: u32,
        device: u32,
        opts: &SendOptions,
    ) -> i32 {
        (**self).send_limits(
            id,
            voltage_upper,
            voltage_lower,
            current_upper,
            address,
            device,
            opts,
        )
    }

    fn send_calibration(
        &mut self,
        id: u32,
        voltage_gain: i32,
        current_gain: i32,
        voltage_offset: i32,
        address: u32,
        device: u32,
        opts: &SendOptions,
    ) -> i32 {
        (**self).send_calibration(
            id,
            voltage_gain,
            current_gain,
            voltage_offset,
            address,
            device,
            opts,
        )
    }

    fn send_parameter(
        &mut self,
        id: u32,
        param: Parameter,
        device: u32,
        opts: &SendOptions,
    ) -> i32 {
        (**self).send_parameter(id, param, device, opts)
    }

    fn receive_raw(&mut self, out: &mut RawBatch, device: u32, channel: u32, size: usize) -> i32 {
        (**self).receive_raw(out, device, channel, size)
    }

    fn receive_sorted(
        &mut self,
        target: u32,
        out: &mut SortedBatch,
        device: u32,
        channel: u32,
        size: usize,
    ) -> i32 {
        (**self).receive_sorted(target, out, device, channel, size)
    }
}
