use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Operating mode of one CAN channel.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    /// Ordinary bus node.
    #[default]
    Normal,
    /// Receive only, no influence on the bus.
    ListenOnly,
    /// Self-send/self-receive loopback.
    Loopback,
}

impl ChannelMode {
    pub fn code(self) -> u8 {
        match self {
            ChannelMode::Normal => 0,
            ChannelMode::ListenOnly => 1,
            ChannelMode::Loopback => 2,
        }
    }
}

/// Frame-type acceptance filter of one channel.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameFilter {
    #[default]
    All,
    StandardOnly,
    ExtendedOnly,
}

impl FrameFilter {
    pub fn code(self) -> u8 {
        match self {
            FrameFilter::All => 0,
            FrameFilter::StandardOnly => 2,
            FrameFilter::ExtendedOnly => 3,
        }
    }
}

/// Accepted initialization parameters for one bus channel.
///
/// Defaults select channel 0, normal mode, accept-all filtering, and the
/// 250 kbit nominal bit timing. The session keeps an immutable snapshot of
/// each applied config for replay after recovery.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub channel: u32,
    #[serde(default)]
    pub mode: ChannelMode,
    #[serde(default = "default_acc_code")]
    pub acc_code: u32,
    #[serde(default = "default_acc_mask")]
    pub acc_mask: u32,
    #[serde(default)]
    pub filter: FrameFilter,
    #[serde(default = "default_timing0")]
    pub timing0: u8,
    #[serde(default = "default_timing1")]
    pub timing1: u8,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            mode: ChannelMode::Normal,
            acc_code: default_acc_code(),
            acc_mask: default_acc_mask(),
            filter: FrameFilter::All,
            timing0: default_timing0(),
            timing1: default_timing1(),
        }
    }
}

fn default_acc_code() -> u32 {
    0x8000_0008
}

fn default_acc_mask() -> u32 {
    0xFFFF_FFFF
}

fn default_timing0() -> u8 {
    0x01
}

fn default_timing1() -> u8 {
    0x1C
}

/// Adapter-level configuration: device index plus its channels.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default)]
    pub device: u32,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

pub fn load_bus_config(path: impl AsRef<Path>) -> anyhow::Result<BusConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading bus config: {}", path.display()))?;
    let cfg: BusConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing bus config: {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tuple() {
        let cfg = ChannelConfig::default();
        assert_eq!(cfg.channel, 0);
        assert_eq!(cfg.mode.code(), 0);
        assert_eq!(cfg.acc_code, 0x8000_0008);
        assert_eq!(cfg.acc_mask, 0xFFFF_FFFF);
        assert_eq!(cfg.filter.code(), 0);
        assert_eq!(cfg.timing0, 0x01);
        assert_eq!(cfg.timing1, 0x1C);
    }

    #[test]
    fn filter_codes_skip_one() {
        assert_eq!(FrameFilter::All.code(), 0);
        assert_eq!(FrameFilter::StandardOnly.code(), 2);
        assert_eq!(FrameFilter::ExtendedOnly.code(), 3);
    }

    #[test]
    fn yaml_roundtrip_with_defaults() {
        let yaml = r#"
device: 1
channels:
  - channel: 0
  - channel: 1
    mode: listen_only
    timing0: 0
    timing1: 20
"#;
        let cfg: BusConfig = match serde_yaml::from_str(yaml) {
            Ok(c) => c,
            Err(e) => panic!("yaml parse failed: {e}"),
        };
        assert_eq!(cfg.device, 1);
        assert_eq!(cfg.channels.len(), 2);
        assert_eq!(cfg.channels[0], ChannelConfig::default());
        assert_eq!(cfg.channels[1].mode, ChannelMode::ListenOnly);
        assert_eq!(cfg.channels[1].timing1, 20);
        assert_eq!(cfg.channels[1].acc_mask, 0xFFFF_FFFF);
    }
}
