use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use can_driver::{CanDriver, DriverError, RawBatch, Result, SortedBatch, BATCH_CAPACITY};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::warn;

use crate::session::DeviceSession;

const RECOVERY_PAUSE: Duration = Duration::from_secs(1);
const RECOVERY_ATTEMPTS: u32 = 3;

/// Batched telemetry receive over one session.
///
/// The raw variant is a single blocking call with no retry. The sorted
/// variant drives the session recovery cycle on a negative driver status:
/// pause, close/reopen with channel replay, retry — capped at three
/// attempts, after which the last status is reported to the caller.
#[derive(Clone, Debug)]
pub struct Receiver {
    recovery_pause: Duration,
    recovery_attempts: u32,
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Receiver {
    pub fn new() -> Self {
        Self {
            recovery_pause: RECOVERY_PAUSE,
            recovery_attempts: RECOVERY_ATTEMPTS,
        }
    }

    /// Shorten the pause between recovery attempts (tests).
    pub fn with_recovery_pause(mut self, pause: Duration) -> Self {
        self.recovery_pause = pause;
        self
    }

    /// One blocking raw batch receive. Any negative status surfaces
    /// immediately; there is no recovery on this path.
    pub fn receive_raw<D: CanDriver>(
        &self,
        session: &mut DeviceSession<D>,
        channel: u32,
        size: usize,
    ) -> Result<RawReading> {
        let size = size.min(BATCH_CAPACITY);
        let mut batch = Box::new(RawBatch::zeroed());
        let device = session.device();
        let status = session
            .driver_mut()
            .receive_raw(&mut batch, device, channel, size);
        if status < 0 {
            return Err(DriverError::Receive(status));
        }
        let len = (status as usize).min(size);
        Ok(RawReading {
            batch,
            len,
            status,
            received_at: OffsetDateTime::now_utc(),
        })
    }

    /// Sorted batch receive for one target device, with the bounded
    /// auto-recovery loop when `auto_recover` is set. The reading reports
    /// the final driver status and how many recoveries ran.
    pub fn receive_sorted<D: CanDriver>(
        &self,
        session: &mut DeviceSession<D>,
        target: u32,
        channel: u32,
        size: usize,
        auto_recover: bool,
    ) -> Result<SortedReading> {
        let size = size.min(BATCH_CAPACITY);
        let mut batch = Box::new(SortedBatch::zeroed());
        let device = session.device();
        let mut status = session
            .driver_mut()
            .receive_sorted(target, &mut batch, device, channel, size);
        let mut recoveries = 0;
        if status < 0 && auto_recover {
            for attempt in 1..=self.recovery_attempts {
                warn!(
                    device,
                    channel, status, attempt, "sorted receive failed, recovering session"
                );
                thread::sleep(self.recovery_pause);
                if let Err(err) = session.reopen() {
                    warn!(device, status = err.status(), "recovery reopen rejected");
                }
                recoveries = attempt;
                status = session
                    .driver_mut()
                    .receive_sorted(target, &mut batch, device, channel, size);
                if status >= 0 {
                    break;
                }
            }
        }
        if status < 0 {
            return Err(DriverError::Receive(status));
        }
        let len = (status as usize).min(size);
        Ok(SortedReading {
            batch,
            len,
            status,
            recoveries,
            received_at: OffsetDateTime::now_utc(),
        })
    }
}

/// One raw batch entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct RawEntry {
    pub id: u8,
    pub data: [u8; 8],
}

/// Count-tracked view over a filled raw batch; reads past the filled count
/// are refused.
pub struct RawReading {
    batch: Box<RawBatch>,
    len: usize,
    status: i32,
    received_at: OffsetDateTime,
}

impl RawReading {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn status(&self) -> i32 {
        self.status
    }

    pub fn received_at(&self) -> OffsetDateTime {
        self.received_at
    }

    pub fn get(&self, i: usize) -> Option<RawEntry> {
        (i < self.len).then(|| RawEntry {
            id: self.batch.id[i],
            data: self.batch.data(i),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = RawEntry> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }
}

/// One decoded telemetry sample.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct SortedSample {
    pub id: u32,
    pub time: u8,
    /// Unit 0.1 A.
    pub current: i16,
    /// Unit 0.1 V.
    pub voltage: i16,
    pub heartbeat: u8,
}

/// A non-consecutive heartbeat between two samples of the same device:
/// evidence of dropped or duplicated transmissions.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct HeartbeatGap {
    pub index: usize,
    pub id: u32,
    pub expected: u8,
    pub actual: u8,
}

/// Count-tracked view over a filled sorted batch.
pub struct SortedReading {
    batch: Box<SortedBatch>,
    len: usize,
    status: i32,
    recoveries: u32,
    received_at: OffsetDateTime,
}

impl SortedReading {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Final driver status of the receive (the filled count).
    pub fn status(&self) -> i32 {
        self.status
    }

    /// Recovery attempts spent on this receive.
    pub fn recoveries(&self) -> u32 {
        self.recoveries
    }

    pub fn received_at(&self) -> OffsetDateTime {
        self.received_at
    }

    pub fn get(&self, i: usize) -> Option<SortedSample> {
        (i < self.len).then(|| SortedSample {
            id: self.batch.id[i],
            time: self.batch.time[i],
            current: self.batch.current[i],
            voltage: self.batch.voltage[i],
            heartbeat: self.batch.heartbeat[i],
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = SortedSample> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    /// Audit the heartbeat counters per device id: every consecutive pair
    /// from the same device must increment by one, wrapping at the byte
    /// range. Anything else is a gap worth flagging.
    pub fn heartbeat_gaps(&self) -> Vec<HeartbeatGap> {
        let mut last: HashMap<u32, u8> = HashMap::new();
        let mut gaps = Vec::new();
        for i in 0..self.len {
            let id = self.batch.id[i];
            let actual = self.batch.heartbeat[i];
            if let Some(prev) = last.insert(id, actual) {
                let expected = prev.wrapping_add(1);
                if actual != expected {
                    gaps.push(HeartbeatGap {
                        index: i,
                        id,
                        expected,
                        actual,
                    });
                }
            }
        }
        gaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_driver::{MockDriver, MockSample};
    use crate::config::ChannelConfig;

    fn sample(id: u32, heartbeat: u8) -> MockSample {
        MockSample {
            id,
            time: 0,
            current: 100,
            voltage: 2400,
            heartbeat,
        }
    }

    fn receiver() -> Receiver {
        Receiver::new().with_recovery_pause(Duration::ZERO)
    }

    #[test]
    fn raw_receive_has_no_recovery() {
        let mut session = DeviceSession::open(MockDriver::new(), 0);
        session.driver_mut().raw_results.push_back(-2);
        let result = receiver().receive_raw(&mut session, 0, 2000);
        assert!(matches!(result, Err(DriverError::Receive(-2))));
        assert_eq!(session.driver().open_count(), 1);
    }

    #[test]
    fn raw_view_clamps_to_filled_count() {
        let mut session = DeviceSession::open(MockDriver::new(), 0);
        session.driver_mut().raw_frames.push((0x11, [1, 2, 3, 4, 5, 6, 7, 8]));
        session.driver_mut().raw_frames.push((0x12, [0; 8]));
        let reading = match receiver().receive_raw(&mut session, 0, 2000) {
            Ok(r) => r,
            Err(e) => panic!("raw receive failed: {e}"),
        };
        assert_eq!(reading.status(), 2);
        assert_eq!(reading.len(), 2);
        assert_eq!(
            reading.get(0),
            Some(RawEntry {
                id: 0x11,
                data: [1, 2, 3, 4, 5, 6, 7, 8]
            })
        );
        assert_eq!(reading.get(2), None);
        assert_eq!(reading.iter().count(), 2);
    }

    #[test]
    fn sorted_recovers_then_succeeds() {
        let mut session = DeviceSession::open(MockDriver::new(), 0);
        assert!(session.configure(ChannelConfig::default()).is_ok());
        {
            let driver = session.driver_mut();
            driver.sorted_samples.push(sample(0x10, 1));
            driver.sorted_results.extend([-1, -1, -1]);
        }

        let reading = match receiver().receive_sorted(&mut session, 0x10, 0, 2000, true) {
            Ok(r) => r,
            Err(e) => panic!("receive should succeed on the fourth call: {e}"),
        };
        assert_eq!(reading.status(), 1);
        assert_eq!(reading.len(), 1);
        assert_eq!(reading.recoveries(), 3);
        // Initial open plus one device re-init per recovery.
        assert_eq!(session.driver().open_count(), 4);
        // Channel replayed on every recovery.
        assert_eq!(session.driver().init_count(), 4);
    }

    #[test]
    fn sorted_recovery_is_capped_at_three() {
        let mut session = DeviceSession::open(MockDriver::new(), 0);
        assert!(session.configure(ChannelConfig::default()).is_ok());
        session
            .driver_mut()
            .sorted_results
            .extend([-1, -1, -1, -1]);

        let result = receiver().receive_sorted(&mut session, 0x10, 0, 2000, true);
        assert!(matches!(result, Err(DriverError::Receive(-1))));
        assert_eq!(session.driver().open_count(), 4);
        let receive_calls = session
            .driver()
            .calls
            .iter()
            .filter(|c| matches!(c, can_driver::MockCall::ReceiveSorted { .. }))
            .count();
        // Initial call plus exactly three retries, never a fifth.
        assert_eq!(receive_calls, 4);
    }

    #[test]
    fn sorted_without_auto_recover_fails_fast() {
        let mut session = DeviceSession::open(MockDriver::new(), 0);
        session.driver_mut().sorted_results.push_back(-1);
        let result = receiver().receive_sorted(&mut session, 0x10, 0, 2000, false);
        assert!(matches!(result, Err(DriverError::Receive(-1))));
        assert_eq!(session.driver().open_count(), 1);
    }

    #[test]
    fn sorted_view_respects_requested_size() {
        let mut session = DeviceSession::open(MockDriver::new(), 0);
        for i in 0..5 {
            session.driver_mut().sorted_samples.push(sample(0x10, i));
        }
        let reading = match receiver().receive_sorted(&mut session, 0x10, 0, 3, true) {
            Ok(r) => r,
            Err(e) => panic!("receive failed: {e}"),
        };
        assert_eq!(reading.len(), 3);
        assert_eq!(reading.get(3), None);
    }

    #[test]
    fn heartbeat_audit_flags_gaps_and_accepts_wrap() {
        let mut session = DeviceSession::open(MockDriver::new(), 0);
        {
            let driver = session.driver_mut();
            driver.sorted_samples.push(sample(0x10, 254));
            driver.sorted_samples.push(sample(0x10, 255));
            driver.sorted_samples.push(sample(0x10, 0));
            driver.sorted_samples.push(sample(0x10, 2));
        }
        let reading = match receiver().receive_sorted(&mut session, 0x10, 0, 2000, true) {
            Ok(r) => r,
            Err(e) => panic!("receive failed: {e}"),
        };
        let gaps = reading.heartbeat_gaps();
        assert_eq!(
            gaps,
            vec![HeartbeatGap {
                index: 3,
                id: 0x10,
                expected: 1,
                actual: 2,
            }]
        );
    }

    #[test]
    fn heartbeat_audit_tracks_devices_independently() {
        let mut session = DeviceSession::open(MockDriver::new(), 0);
        {
            let driver = session.driver_mut();
            driver.sorted_samples.push(sample(0x10, 7));
            driver.sorted_samples.push(sample(0x11, 40));
            driver.sorted_samples.push(sample(0x10, 8));
            driver.sorted_samples.push(sample(0x11, 41));
        }
        let reading = match receiver().receive_sorted(&mut session, 0x10, 0, 2000, true) {
            Ok(r) => r,
            Err(e) => panic!("receive failed: {e}"),
        };
        assert!(reading.heartbeat_gaps().is_empty());
    }
}
