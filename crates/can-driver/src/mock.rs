use std::collections::VecDeque;

use crate::command::{Parameter, SendOptions};
use crate::traits::CanDriver;
use crate::types::{CanFrame, RawBatch, SortedBatch, BATCH_CAPACITY, STATUS_OK};

/// One recorded driver invocation, with flags lowered to their wire values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockCall {
    OpenDevice {
        device: u32,
    },
    CloseDevice {
        device: u32,
    },
    InitChannel {
        device: u32,
        channel: u32,
        mode: u8,
        acc_code: u32,
        acc_mask: u32,
        filter: u8,
        timing0: u8,
        timing1: u8,
    },
    SendFrame {
        frame: CanFrame,
        device: u32,
        channel: u32,
    },
    SendControl {
        id: u32,
        reset: u8,
        run_state: u8,
        special_command: u8,
        special_value: i32,
        address: u32,
        device: u32,
        channel: u32,
        remote_flag: u8,
        extern_flag: u8,
        send_type: u8,
    },
    SendSetpoint {
        id: u32,
        voltage: i32,
        current: i32,
        power: i32,
        address: u32,
        device: u32,
        channel: u32,
        remote_flag: u8,
        extern_flag: u8,
        send_type: u8,
    },
    SendLimits {
        id: u32,
        voltage_upper: i32,
        voltage_lower: i32,
        current_upper: i32,
        address: u32,
        device: u32,
        channel: u32,
        remote_flag: u8,
        extern_flag: u8,
        send_type: u8,
    },
    SendCalibration {
        id: u32,
        voltage_gain: i32,
        current_gain: i32,
        voltage_offset: i32,
        address: u32,
        device: u32,
        channel: u32,
        remote_flag: u8,
        extern_flag: u8,
        send_type: u8,
    },
    SendParameter {
        id: u32,
        param: Parameter,
        device: u32,
        channel: u32,
        remote_flag: u8,
        extern_flag: u8,
        send_type: u8,
    },
    ReceiveRaw {
        device: u32,
        channel: u32,
        size: usize,
    },
    ReceiveSorted {
        target: u32,
        device: u32,
        channel: u32,
        size: usize,
    },
}

/// Scripted telemetry sample copied into sorted receive buffers.
#[derive(Clone, Copy, Debug)]
pub struct MockSample {
    pub id: u32,
    pub time: u8,
    pub current: i16,
    pub voltage: i16,
    pub heartbeat: u8,
}

/// In-process driver double. Records every call in `calls` and plays back
/// scripted statuses; unscripted calls succeed. Receive calls are filled
/// from the scripted sample/frame lists, clamped to the requested size.
#[derive(Default)]
pub struct MockDriver {
    pub calls: Vec<MockCall>,
    pub open_results: VecDeque<i32>,
    pub close_results: VecDeque<i32>,
    pub init_results: VecDeque<i32>,
    pub send_results: VecDeque<i32>,
    pub raw_results: VecDeque<i32>,
    pub sorted_results: VecDeque<i32>,
    pub raw_frames: Vec<(u8, [u8; 8])>,
    pub sorted_samples: Vec<MockSample>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, MockCall::OpenDevice { .. }))
            .count()
    }

    pub fn close_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, MockCall::CloseDevice { .. }))
            .count()
    }

    pub fn init_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, MockCall::InitChannel { .. }))
            .count()
    }

    fn next(queue: &mut VecDeque<i32>) -> i32 {
        queue.pop_front().unwrap_or(STATUS_OK)
    }
}

impl CanDriver for MockDriver {
    fn open_device(&mut self, device: u32) -> i32 {
        self.calls.push(MockCall::OpenDevice { device });
        Self::next(&mut self.open_results)
    }

    fn close_device(&mut self, device: u32) -> i32 {
        self.calls.push(MockCall::CloseDevice { device });
        Self::next(&mut self.close_results)
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
        self.calls.push(MockCall::InitChannel {
            device,
            channel,
            mode,
            acc_code,
            acc_mask,
            filter,
            timing0,
            timing1,
        });
        Self::next(&mut self.init_results)
    }

    fn send_frame(&mut self, frame: &CanFrame, device: u32, channel: u32) -> i32 {
        self.calls.push(MockCall::SendFrame {
            frame: *frame,
            device,
            channel,
        });
        Self::next(&mut self.send_results)
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
        self.calls.push(MockCall::SendControl {
            id,
            reset,
            run_state,
            special_command,
            special_value,
            address,
            device,
            channel: opts.channel,
            remote_flag: opts.remote_flag(),
            extern_flag: opts.extern_flag(),
            send_type: opts.send_type_code(),
        });
        Self::next(&mut self.send_results)
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
        self.calls.push(MockCall::SendSetpoint {
            id,
            voltage,
            current,
            power,
            address,
            device,
            channel: opts.channel,
            remote_flag: opts.remote_flag(),
            extern_flag: opts.extern_flag(),
            send_type: opts.send_type_code(),
        });
        Self::next(&mut self.send_results)
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
        self.calls.push(MockCall::SendLimits {
            id,
            voltage_upper,
            voltage_lower,
            current_upper,
            address,
            device,
            channel: opts.channel,
            remote_flag: opts.remote_flag(),
            extern_flag: opts.extern_flag(),
            send_type: opts.send_type_code(),
        });
        Self::next(&mut self.send_results)
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
        self.calls.push(MockCall::SendCalibration {
            id,
            voltage_gain,
            current_gain,
            voltage_offset,
            address,
            device,
            channel: opts.channel,
            remote_flag: opts.remote_flag(),
            extern_flag: opts.extern_flag(),
            send_type: opts.send_type_code(),
        });
        Self::next(&mut self.send_results)
    }

    fn send_parameter(
        &mut self,
        id: u32,
        param: Parameter,
        device: u32,
        opts: &SendOptions,
    ) -> i32 {
        self.calls.push(MockCall::SendParameter {
            id,
            param,
            device,
            channel: opts.channel,
            remote_flag: opts.remote_flag(),
            extern_flag: opts.extern_flag(),
            send_type: opts.send_type_code(),
        });
        Self::next(&mut self.send_results)
    }

    fn receive_raw(&mut self, out: &mut RawBatch, device: u32, channel: u32, size: usize) -> i32 {
        self.calls.push(MockCall::ReceiveRaw {
            device,
            channel,
            size,
        });
        let fill = self
            .raw_frames
            .len()
            .min(size)
            .min(BATCH_CAPACITY);
        for (i, (id, data)) in self.raw_frames.iter().take(fill).enumerate() {
            out.id[i] = *id;
            out.byte0[i] = data[0];
            out.byte1[i] = data[1];
            out.byte2[i] = data[2];
            out.byte3[i] = data[3];
            out.byte4[i] = data[4];
            out.byte5[i] = data[5];
            out.byte6[i] = data[6];
            out.byte7[i] = data[7];
        }
        self.raw_results.pop_front().unwrap_or(fill as i32)
    }

    fn receive_sorted(
        &mut self,
        target: u32,
        out: &mut SortedBatch,
        device: u32,
        channel: u32,
        size: usize,
    ) -> i32 {
        self.calls.push(MockCall::ReceiveSorted {
            target,
            device,
            channel,
            size,
        });
        let fill = self
            .sorted_samples
            .len()
            .min(size)
            .min(BATCH_CAPACITY);
        for (i, s) in self.sorted_samples.iter().take(fill).enumerate() {
            out.id[i] = s.id;
            out.time[i] = s.time;
            out.current[i] = s.current;
            out.voltage[i] = s.voltage;
            out.heartbeat[i] = s.heartbeat;
        }
        self.sorted_results.pop_front().unwrap_or(fill as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_statuses_then_default_ok() {
        let mut mock = MockDriver::new();
        mock.open_results.push_back(0);
        assert_eq!(mock.open_device(0), 0);
        assert_eq!(mock.open_device(0), STATUS_OK);
        assert_eq!(mock.open_count(), 2);
    }

    #[test]
    fn sorted_fill_clamps_to_size() {
        let mut mock = MockDriver::new();
        for i in 0..5 {
            mock.sorted_samples.push(MockSample {
                id: 0x10,
                time: i,
                current: 0,
                voltage: 0,
                heartbeat: i,
            });
        }
        let mut out = SortedBatch::zeroed();
        let status = mock.receive_sorted(0x10, &mut out, 0, 0, 3);
        assert_eq!(status, 3);
        assert_eq!(out.time[2], 2);
        assert_eq!(out.time[3], 0);
    }
}
