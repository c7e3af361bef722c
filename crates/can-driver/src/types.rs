use crate::command::SendType;

/// Driver success sentinel for command and init entry points.
pub const STATUS_OK: i32 = 1;

/// Fixed capacity of the batched receive buffers.
pub const BATCH_CAPACITY: usize = 2000;

/// One bus frame in the adapter's native layout.
///
/// Field order and widths are the wire contract with the native library and
/// must not be reordered. Bytes of `data` past `data_len` carry no meaning.
#[repr(C)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CanFrame {
    pub id: u32,
    pub timestamp: u32,
    pub time_flag: u8,
    pub send_type: u8,
    pub remote_flag: u8,
    pub extern_flag: u8,
    pub data_len: u8,
    pub data: [u8; 8],
    pub reserved: [u8; 3],
}

impl CanFrame {
    /// Build an outbound data frame with the default flags (data frame,
    /// extended id, send once). Returns `None` when the payload exceeds
    /// 8 bytes.
    pub fn new(id: u32, data: &[u8]) -> Option<Self> {
        if data.len() > 8 {
            return None;
        }
        let mut buf = [0u8; 8];
        buf[..data.len()].copy_from_slice(data);
        Some(Self {
            id,
            timestamp: 0,
            time_flag: 0,
            send_type: SendType::Once as u8,
            remote_flag: 0,
            extern_flag: 1,
            data_len: data.len() as u8,
            data: buf,
            reserved: [0; 3],
        })
    }

    /// The meaningful slice of `data`.
    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.data_len).min(8)]
    }
}

/// Columnar buffer filled by the raw batch-receive entry point.
///
/// Parallel arrays share one logical length: the non-negative status the
/// receive call returns. Slots past that count are not meaningful. The
/// one-byte id column is the layout the native library fills.
#[repr(C)]
#[derive(Clone)]
pub struct RawBatch {
    pub id: [u8; BATCH_CAPACITY],
    pub byte0: [u8; BATCH_CAPACITY],
    pub byte1: [u8; BATCH_CAPACITY],
    pub byte2: [u8; BATCH_CAPACITY],
    pub byte3: [u8; BATCH_CAPACITY],
    pub byte4: [u8; BATCH_CAPACITY],
    pub byte5: [u8; BATCH_CAPACITY],
    pub byte6: [u8; BATCH_CAPACITY],
    pub byte7: [u8; BATCH_CAPACITY],
}

impl RawBatch {
    pub fn zeroed() -> Self {
        Self {
            id: [0; BATCH_CAPACITY],
            byte0: [0; BATCH_CAPACITY],
            byte1: [0; BATCH_CAPACITY],
            byte2: [0; BATCH_CAPACITY],
            byte3: [0; BATCH_CAPACITY],
            byte4: [0; BATCH_CAPACITY],
            byte5: [0; BATCH_CAPACITY],
            byte6: [0; BATCH_CAPACITY],
            byte7: [0; BATCH_CAPACITY],
        }
    }

    /// The eight data bytes of entry `i`, in column order.
    pub fn data(&self, i: usize) -> [u8; 8] {
        [
            self.byte0[i],
            self.byte1[i],
            self.byte2[i],
            self.byte3[i],
            self.byte4[i],
            self.byte5[i],
            self.byte6[i],
            self.byte7[i],
        ]
    }
}

/// Columnar buffer filled by the sorted batch-receive entry point: decoded
/// telemetry samples from one target device.
///
/// Same shared-count convention as [`RawBatch`]. `heartbeat` increments once
/// per originating device transmission and is the only signal for detecting
/// dropped or duplicated samples.
#[repr(C)]
#[derive(Clone)]
pub struct SortedBatch {
    pub id: [u32; BATCH_CAPACITY],
    pub time: [u8; BATCH_CAPACITY],
    /// Unit 0.1 A.
    pub current: [i16; BATCH_CAPACITY],
    /// Unit 0.1 V.
    pub voltage: [i16; BATCH_CAPACITY],
    pub heartbeat: [u8; BATCH_CAPACITY],
}

impl SortedBatch {
    pub fn zeroed() -> Self {
        Self {
            id: [0; BATCH_CAPACITY],
            time: [0; BATCH_CAPACITY],
            current: [0; BATCH_CAPACITY],
            voltage: [0; BATCH_CAPACITY],
            heartbeat: [0; BATCH_CAPACITY],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rejects_oversized_payload() {
        assert!(CanFrame::new(0x10203010, &[0u8; 9]).is_none());
        assert!(CanFrame::new(0x10203010, &[0u8; 8]).is_some());
    }

    #[test]
    fn frame_defaults_and_payload() {
        let frame = match CanFrame::new(0x123, &[0xAA, 0xBB, 0xCC]) {
            Some(f) => f,
            None => panic!("3-byte payload must be accepted"),
        };
        assert_eq!(frame.data_len, 3);
        assert_eq!(frame.payload(), &[0xAA, 0xBB, 0xCC]);
        assert_eq!(frame.remote_flag, 0);
        assert_eq!(frame.extern_flag, 1);
        assert_eq!(frame.send_type, 1);
    }

    #[test]
    fn raw_batch_column_order() {
        let mut batch = RawBatch::zeroed();
        batch.byte0[4] = 1;
        batch.byte7[4] = 8;
        assert_eq!(batch.data(4), [1, 0, 0, 0, 0, 0, 0, 8]);
    }
}
