use std::collections::BTreeMap;

use can_driver::{CanDriver, DriverError, Result, STATUS_OK};
use tracing::{debug, info, warn};

use crate::config::ChannelConfig;

/// One open adapter handle bound to a device index.
///
/// Construction always yields a session, even when the driver rejects the
/// open, so the caller keeps the resource identity and can retry or inspect
/// the status; `healthy()` reports whether the device actually opened.
/// Successfully applied channel configs are snapshotted per channel and
/// replayed after a recovery reopen. The driver close entry point runs at
/// most once per successful open; dropping the session closes it if the
/// caller has not.
pub struct DeviceSession<D: CanDriver> {
    driver: D,
    device: u32,
    open: bool,
    last_status: i32,
    channels: BTreeMap<u32, ChannelConfig>,
}

impl<D: CanDriver> DeviceSession<D> {
    pub fn open(mut driver: D, device: u32) -> Self {
        let status = driver.open_device(device);
        if status == STATUS_OK {
            info!(device, "device open");
        } else {
            warn!(device, status, "device open rejected");
        }
        Self {
            driver,
            device,
            open: status == STATUS_OK,
            last_status: status,
            channels: BTreeMap::new(),
        }
    }

    pub fn healthy(&self) -> bool {
        self.open
    }

    /// Raw status of the most recent open attempt.
    pub fn last_status(&self) -> i32 {
        self.last_status
    }

    pub fn device(&self) -> u32 {
        self.device
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub(crate) fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Initialize one channel and retain the config snapshot for replay.
    pub fn configure(&mut self, config: ChannelConfig) -> Result<()> {
        let status = self.apply(&config);
        if status != STATUS_OK {
            warn!(
                device = self.device,
                channel = config.channel,
                status,
                "channel init rejected"
            );
            return Err(DriverError::Config(status));
        }
        debug!(device = self.device, channel = config.channel, "channel init");
        self.channels.insert(config.channel, config);
        Ok(())
    }

    /// The active config snapshot for a channel, if one was applied.
    pub fn channel_config(&self, channel: u32) -> Option<&ChannelConfig> {
        self.channels.get(&channel)
    }

    /// Close the device. At most one driver close per successful open.
    pub fn close(&mut self) {
        if self.open {
            self.driver.close_device(self.device);
            self.open = false;
            info!(device = self.device, "device closed");
        }
    }

    /// Close, re-open, and replay every stored channel config in channel
    /// order. Recovery path only. A rejected channel replay is logged and
    /// skipped so the remaining channels still come back.
    pub(crate) fn reopen(&mut self) -> Result<()> {
        self.close();
        let status = self.driver.open_device(self.device);
        self.last_status = status;
        if status != STATUS_OK {
            warn!(device = self.device, status, "device reopen rejected");
            return Err(DriverError::Open(status));
        }
        self.open = true;
        let configs: Vec<ChannelConfig> = self.channels.values().copied().collect();
        for config in configs {
            let status = self.apply(&config);
            if status != STATUS_OK {
                warn!(
                    device = self.device,
                    channel = config.channel,
                    status,
                    "channel replay rejected"
                );
            }
        }
        Ok(())
    }

    fn apply(&mut self, config: &ChannelConfig) -> i32 {
        self.driver.init_channel(
            self.device,
            config.channel,
            config.mode.code(),
            config.acc_code,
            config.acc_mask,
            config.filter.code(),
            config.timing0,
            config.timing1,
        )
    }
}

impl<D: CanDriver> Drop for DeviceSession<D> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_driver::{MockCall, MockDriver};

    #[test]
    fn open_failure_leaves_unhealthy_session() {
        let mut mock = MockDriver::new();
        mock.open_results.push_back(0);
        let session = DeviceSession::open(mock, 0);
        assert!(!session.healthy());
        assert_eq!(session.last_status(), 0);
    }

    #[test]
    fn unhealthy_session_never_closes_driver() {
        let mut mock = MockDriver::new();
        mock.open_results.push_back(0);
        let mut session = DeviceSession::open(mock, 0);
        session.close();
        assert_eq!(session.driver().close_count(), 0);
    }

    #[test]
    fn close_runs_at_most_once() {
        let mut mock = MockDriver::new();
        {
            let mut session = DeviceSession::open(&mut mock, 2);
            session.close();
            session.close();
        }
        // Explicit closes plus the drop path issue exactly one driver close.
        assert_eq!(mock.close_count(), 1);
    }

    #[test]
    fn drop_closes_open_session() {
        let mut mock = MockDriver::new();
        {
            let _session = DeviceSession::open(&mut mock, 1);
        }
        assert_eq!(mock.close_count(), 1);
    }

    #[test]
    fn configure_stores_exact_snapshot() {
        let mut session = DeviceSession::open(MockDriver::new(), 0);
        let cfg = ChannelConfig::default();
        assert!(session.configure(cfg).is_ok());
        assert_eq!(session.channel_config(0), Some(&cfg));
        assert_eq!(
            session.driver().calls[1],
            MockCall::InitChannel {
                device: 0,
                channel: 0,
                mode: 0,
                acc_code: 0x8000_0008,
                acc_mask: 0xFFFF_FFFF,
                filter: 0,
                timing0: 0x01,
                timing1: 0x1C,
            }
        );
    }

    #[test]
    fn rejected_configure_is_not_retained() {
        let mut session = DeviceSession::open(MockDriver::new(), 0);
        session.driver_mut().init_results.push_back(0);
        assert_eq!(
            session.configure(ChannelConfig::default()),
            Err(DriverError::Config(0))
        );
        assert!(session.channel_config(0).is_none());
    }

    #[test]
    fn reopen_replays_stored_channels_verbatim() {
        let mut session = DeviceSession::open(MockDriver::new(), 0);
        let ch0 = ChannelConfig::default();
        let ch1 = ChannelConfig {
            channel: 1,
            mode: crate::config::ChannelMode::ListenOnly,
            timing0: 0x00,
            timing1: 0x14,
            ..ChannelConfig::default()
        };
        assert!(session.configure(ch0).is_ok());
        assert!(session.configure(ch1).is_ok());

        assert!(session.reopen().is_ok());

        let inits: Vec<&MockCall> = session
            .driver()
            .calls
            .iter()
            .filter(|c| matches!(c, MockCall::InitChannel { .. }))
            .collect();
        // Two initial applies plus two replays, replay args identical.
        assert_eq!(inits.len(), 4);
        assert_eq!(inits[0], inits[2]);
        assert_eq!(inits[1], inits[3]);
        assert_eq!(session.driver().close_count(), 1);
        assert_eq!(session.driver().open_count(), 2);
    }
}
