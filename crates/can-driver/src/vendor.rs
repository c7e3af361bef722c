//! Binding of the real vendor adapter library.
//!
//! Compiled only with the `vendor` feature; the native library must be on
//! the linker path. Entry-point names and argument order are the vendor's
//! ABI and must not change.

use crate::command::{Parameter, SendOptions};
use crate::traits::CanDriver;
use crate::types::{CanFrame, RawBatch, SortedBatch};

#[allow(non_snake_case)]
mod ffi {
    use crate::types::{CanFrame, RawBatch, SortedBatch};

    #[link(name = "caniop")]
    extern "C" {
        pub fn initDevice(index: u32) -> i32;
        #[link_name = "close"]
        pub fn closeDevice(index: u32) -> i32;
        pub fn initCANPort(
            index: u32,
            channel: u32,
            mode: i32,
            accCode: u32,
            accMask: u32,
            filter: i32,
            timing0: i32,
            timing1: i32,
        ) -> i32;
        pub fn send(frame: *const CanFrame, index: u32, channel: u32) -> i32;
        pub fn send1(
            id: u32,
            reset: i32,
            runState: i32,
            specialCommand: i32,
            specialValue: i32,
            address: u32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn send2(
            id: u32,
            voltage: i32,
            current: i32,
            power: i32,
            address: u32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn send3(
            id: u32,
            voltageUp: i32,
            voltageDown: i32,
            currentUp: i32,
            address: u32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn send4(
            id: u32,
            voltageGain: i32,
            currentGain: i32,
            voltageOffset: i32,
            address: u32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn receive0(out: *mut RawBatch, index: u32, channel: u32, size: i32) -> i32;
        pub fn receive1(
            target: u32,
            out: *mut SortedBatch,
            index: u32,
            channel: u32,
            size: i32,
        ) -> i32;

        pub fn setCC(id: u32, index: u32, channel: u32, remote: i32, ext: i32, sendType: i32)
            -> i32;
        pub fn setCV(id: u32, index: u32, channel: u32, remote: i32, ext: i32, sendType: i32)
            -> i32;
        pub fn setCP(id: u32, index: u32, channel: u32, remote: i32, ext: i32, sendType: i32)
            -> i32;
        pub fn setCR(id: u32, index: u32, channel: u32, remote: i32, ext: i32, sendType: i32)
            -> i32;
        pub fn setZX(id: u32, index: u32, channel: u32, remote: i32, ext: i32, sendType: i32)
            -> i32;
        pub fn setSJ(id: u32, index: u32, channel: u32, remote: i32, ext: i32, sendType: i32)
            -> i32;
        pub fn setFB(id: u32, index: u32, channel: u32, remote: i32, ext: i32, sendType: i32)
            -> i32;
        pub fn setZDY(id: u32, index: u32, channel: u32, remote: i32, ext: i32, sendType: i32)
            -> i32;
        pub fn readUlimValue(
            id: u32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;

        pub fn setCCValue(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setCVValue(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setCPValue(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setCRValue(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setZXPL(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setZXFD(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setZXZKB(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setSJPL(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setSJFD(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setSJZKB(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setFBPL(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setFBFD(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setFBZKB(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setUlim(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setIlim(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setU(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setI(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setR(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setP(
            id: u32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setZDYFBCurrent(
            id: u32,
            num: i32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
        pub fn setZDYFBT(
            id: u32,
            num: i32,
            value: i32,
            index: u32,
            channel: u32,
            remote: i32,
            ext: i32,
            sendType: i32,
        ) -> i32;
    }
}

/// Driver backed by the native vendor library.
#[derive(Default)]
pub struct VendorDriver;

impl VendorDriver {
    pub fn new() -> Self {
        Self
    }
}

impl CanDriver for VendorDriver {
    fn open_device(&mut self, device: u32) -> i32 {
        unsafe { ffi::initDevice(device) }
    }

    fn close_device(&mut self, device: u32) -> i32 {
        unsafe { ffi::closeDevice(device) }
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
        unsafe {
            ffi::initCANPort(
                device,
                channel,
                i32::from(mode),
                acc_code,
                acc_mask,
                i32::from(filter),
                i32::from(timing0),
                i32::from(timing1),
            )
        }
    }

    fn send_frame(&mut self, frame: &CanFrame, device: u32, channel: u32) -> i32 {
        unsafe { ffi::send(frame, device, channel) }
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
        unsafe {
            ffi::send1(
                id,
                i32::from(reset),
                i32::from(run_state),
                i32::from(special_command),
                special_value,
                address,
                device,
                opts.channel,
                i32::from(opts.remote_flag()),
                i32::from(opts.extern_flag()),
                i32::from(opts.send_type_code()),
            )
        }
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
        unsafe {
            ffi::send2(
                id,
                voltage,
                current,
                power,
                address,
                device,
                opts.channel,
                i32::from(opts.remote_flag()),
                i32::from(opts.extern_flag()),
                i32::from(opts.send_type_code()),
            )
        }
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
        unsafe {
            ffi::send3(
                id,
                voltage_upper,
                voltage_lower,
                current_upper,
                address,
                device,
                opts.channel,
                i32::from(opts.remote_flag()),
                i32::from(opts.extern_flag()),
                i32::from(opts.send_type_code()),
            )
        }
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
        unsafe {
            ffi::send4(
                id,
                voltage_gain,
                current_gain,
                voltage_offset,
                address,
                device,
                opts.channel,
                i32::from(opts.remote_flag()),
                i32::from(opts.extern_flag()),
                i32::from(opts.send_type_code()),
            )
        }
    }

    fn send_parameter(
        &mut self,
        id: u32,
        param: Parameter,
        device: u32,
        opts: &SendOptions,
    ) -> i32 {
        let ch = opts.channel;
        let r = i32::from(opts.remote_flag());
        let e = i32::from(opts.extern_flag());
        let t = i32::from(opts.send_type_code());
        unsafe {
            match param {
                Parameter::ConstantCurrentMode => ffi::setCC(id, device, ch, r, e, t),
                Parameter::ConstantVoltageMode => ffi::setCV(id, device, ch, r, e, t),
                Parameter::ConstantPowerMode => ffi::setCP(id, device, ch, r, e, t),
                Parameter::ConstantResistanceMode => ffi::setCR(id, device, ch, r, e, t),
                Parameter::ConstantCurrent(v) => ffi::setCCValue(id, v, device, ch, r, e, t),
                Parameter::ConstantVoltage(v) => ffi::setCVValue(id, v, device, ch, r, e, t),
                Parameter::ConstantPower(v) => ffi::setCPValue(id, v, device, ch, r, e, t),
                Parameter::ConstantResistance(v) => ffi::setCRValue(id, v, device, ch, r, e, t),
                Parameter::SineMode => ffi::setZX(id, device, ch, r, e, t),
                Parameter::TriangleMode => ffi::setSJ(id, device, ch, r, e, t),
                Parameter::SquareMode => ffi::setFB(id, device, ch, r, e, t),
                Parameter::CustomMode => ffi::setZDY(id, device, ch, r, e, t),
                Parameter::SineFrequency(v) => ffi::setZXPL(id, v, device, ch, r, e, t),
                Parameter::SineAmplitude(v) => ffi::setZXFD(id, v, device, ch, r, e, t),
                Parameter::SineDuty(v) => ffi::setZXZKB(id, v, device, ch, r, e, t),
                Parameter::TriangleFrequency(v) => ffi::setSJPL(id, v, device, ch, r, e, t),
                Parameter::TriangleAmplitude(v) => ffi::setSJFD(id, v, device, ch, r, e, t),
                Parameter::TriangleDuty(v) => ffi::setSJZKB(id, v, device, ch, r, e, t),
                Parameter::SquareFrequency(v) => ffi::setFBPL(id, v, device, ch, r, e, t),
                Parameter::SquareAmplitude(v) => ffi::setFBFD(id, v, device, ch, r, e, t),
                Parameter::SquareDuty(v) => ffi::setFBZKB(id, v, device, ch, r, e, t),
                Parameter::VoltageLimit(v) => ffi::setUlim(id, v, device, ch, r, e, t),
                Parameter::CurrentLimit(v) => ffi::setIlim(id, v, device, ch, r, e, t),
                Parameter::Voltage(v) => ffi::setU(id, v, device, ch, r, e, t),
                Parameter::Current(v) => ffi::setI(id, v, device, ch, r, e, t),
                Parameter::Resistance(v) => ffi::setR(id, v, device, ch, r, e, t),
                Parameter::Power(v) => ffi::setP(id, v, device, ch, r, e, t),
                Parameter::CustomCurrent { slot, value } => {
                    ffi::setZDYFBCurrent(id, i32::from(slot), value, device, ch, r, e, t)
                }
                Parameter::CustomPeriod { slot, value } => {
                    ffi::setZDYFBT(id, i32::from(slot), value, device, ch, r, e, t)
                }
                Parameter::ReadVoltageLimit => ffi::readUlimValue(id, device, ch, r, e, t),
            }
        }
    }

    fn receive_raw(&mut self, out: &mut RawBatch, device: u32, channel: u32, size: usize) -> i32 {
        let size = size.min(crate::types::BATCH_CAPACITY) as i32;
        unsafe { ffi::receive0(out, device, channel, size) }
    }

    fn receive_sorted(
        &mut self,
        target: u32,
        out: &mut SortedBatch,
        device: u32,
        channel: u32,
        size: usize,
    ) -> i32 {
        let size = size.min(crate::types::BATCH_CAPACITY) as i32;
        unsafe { ffi::receive1(target, out, device, channel, size) }
    }
}
