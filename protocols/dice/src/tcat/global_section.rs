// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2020 Takashi Sakamoto

//! Global section in general protocol defined by TCAT for ASICs of DICE.
//!
//! The module includes structure, enumeration, and trait and its implementation for global section
//! in general protocol defined by TCAT for ASICs of DICE.
use super::*;

/// Nominal sampling rate.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ClockRate {
    /// 32.0 kHz.
    R32000,
    /// 44.1 kHz.
    R44100,
    /// 48.0 kHz.
    R48000,
    /// 88.2 kHz.
    R88200,
    /// 96.0 kHz.
    R96000,
    /// 176.4 kHz.
    R176400,
    /// 192.0 kHz.
    R192000,
    /// Smaller than 48.0 kHz.
    AnyLow,
    /// Between 48.0 and 96.0 kHz.
    AnyMid,
    /// Larger than 96.0 kHz.
    AnyHigh,
    /// Not available.
    None,
}

impl Default for ClockRate {
    fn default() -> Self {
        ClockRate::None
    }
}

const CLOCK_RATES: [ClockRate; 11] = [
    ClockRate::R32000,
    ClockRate::R44100,
    ClockRate::R48000,
    ClockRate::R88200,
    ClockRate::R96000,
    ClockRate::R176400,
    ClockRate::R192000,
    ClockRate::AnyLow,
    ClockRate::AnyMid,
    ClockRate::AnyHigh,
    ClockRate::None,
];

impl ClockRate {
    /// The frequency for nominal rate.
    pub fn frequency(&self) -> Option<u32> {
        match self {
            Self::R32000 => Some(32000),
            Self::R44100 => Some(44100),
            Self::R48000 => Some(48000),
            Self::R88200 => Some(88200),
            Self::R96000 => Some(96000),
            Self::R176400 => Some(176400),
            Self::R192000 => Some(192000),
            _ => None,
        }
    }

    pub fn from_frequency(freq: u32) -> Result<Self, Error> {
        CLOCK_RATES
            .iter()
            .find(|r| r.frequency() == Some(freq))
            .copied()
            .ok_or_else(|| {
                let msg = format!("Invalid sampling rate: {}", freq);
                Error::new(ErrorKind::Argument, &msg)
            })
    }

    fn to_val(&self) -> u8 {
        CLOCK_RATES
            .iter()
            .position(|r| r.eq(self))
            .map(|pos| pos as u8)
            .unwrap_or_default()
    }

    fn from_val(val: u8) -> Result<Self, Error> {
        CLOCK_RATES.get(val as usize).copied().ok_or_else(|| {
            let msg = format!("Unexpected value for clock rate: 0x{:02x}", val);
            Error::new(ErrorKind::Protocol, &msg)
        })
    }
}

impl std::fmt::Display for ClockRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.frequency() {
            Some(freq) => write!(f, "{}", freq),
            None => {
                let label = match self {
                    Self::AnyLow => "Any-low",
                    Self::AnyMid => "Any-mid",
                    Self::AnyHigh => "Any-high",
                    _ => "None",
                };
                write!(f, "{}", label)
            }
        }
    }
}

/// Source of sampling clock.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ClockSource {
    /// IEC 60958 receiver 0.
    Aes1,
    /// IEC 60958 receiver 1.
    Aes2,
    /// IEC 60958 receiver 2.
    Aes3,
    /// IEC 60958 receiver 3.
    Aes4,
    /// Any IEC 60958 receiver.
    AesAny,
    /// ADAT receiver.
    Adat,
    /// TDIF receiver.
    Tdif,
    /// Word clock.
    WordClock,
    /// Audio Video System Receiver 0.
    Arx1,
    /// Audio Video System Receiver 1.
    Arx2,
    /// Audio Video System Receiver 2.
    Arx3,
    /// Audio Video System Receiver 3.
    Arx4,
    /// Internal oscillator.
    Internal,
}

impl Default for ClockSource {
    fn default() -> Self {
        ClockSource::Internal
    }
}

const CLOCK_SOURCES: [ClockSource; 13] = [
    ClockSource::Aes1,
    ClockSource::Aes2,
    ClockSource::Aes3,
    ClockSource::Aes4,
    ClockSource::AesAny,
    ClockSource::Adat,
    ClockSource::Tdif,
    ClockSource::WordClock,
    ClockSource::Arx1,
    ClockSource::Arx2,
    ClockSource::Arx3,
    ClockSource::Arx4,
    ClockSource::Internal,
];

impl ClockSource {
    fn to_val(&self) -> u8 {
        CLOCK_SOURCES
            .iter()
            .position(|s| s.eq(self))
            .map(|pos| pos as u8)
            .unwrap_or_default()
    }

    fn from_val(val: u8) -> Result<Self, Error> {
        CLOCK_SOURCES.get(val as usize).copied().ok_or_else(|| {
            let msg = format!("Unexpected value for clock source: 0x{:02x}", val);
            Error::new(ErrorKind::Protocol, &msg)
        })
    }

    /// Parse the label at command line.
    pub fn from_label(label: &str) -> Result<Self, Error> {
        CLOCK_SOURCES
            .iter()
            .find(|s| s.to_string() == label)
            .copied()
            .ok_or_else(|| {
                let msg = format!("Invalid clock source: {}", label);
                Error::new(ErrorKind::Argument, &msg)
            })
    }
}

impl std::fmt::Display for ClockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Aes1 => "AES1",
            Self::Aes2 => "AES2",
            Self::Aes3 => "AES3",
            Self::Aes4 => "AES4",
            Self::AesAny => "AES-any",
            Self::Adat => "ADAT",
            Self::Tdif => "TDIF",
            Self::WordClock => "Word-clock",
            Self::Arx1 => "Stream-1",
            Self::Arx2 => "Stream-2",
            Self::Arx3 => "Stream-3",
            Self::Arx4 => "Stream-4",
            Self::Internal => "Internal",
        };
        write!(f, "{}", label)
    }
}

/// Configuration of clock.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq)]
pub struct ClockConfig {
    /// For frequency of media clock.
    pub rate: ClockRate,
    /// For source of sampling clock.
    pub src: ClockSource,
}

impl ClockConfig {
    const SRC_MASK: u32 = 0x000000ff;
    const SRC_SHIFT: usize = 0;
    const RATE_MASK: u32 = 0x0000ff00;
    const RATE_SHIFT: usize = 8;

    fn build_quadlet(&self) -> u32 {
        ((self.src.to_val() as u32) << Self::SRC_SHIFT) & Self::SRC_MASK
            | ((self.rate.to_val() as u32) << Self::RATE_SHIFT) & Self::RATE_MASK
    }

    fn parse_quadlet(val: u32) -> Result<Self, Error> {
        let src = ClockSource::from_val(((val & Self::SRC_MASK) >> Self::SRC_SHIFT) as u8)?;
        let rate = ClockRate::from_val(((val & Self::RATE_MASK) >> Self::RATE_SHIFT) as u8)?;
        Ok(Self { rate, src })
    }
}

/// Status of sampling clock.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct ClockStatus {
    /// Whether the current clock source is locked.
    pub src_is_locked: bool,
    /// The detected frequency of media clock.
    pub rate: ClockRate,
}

impl ClockStatus {
    const SRC_LOCKED: u32 = 0x00000001;
    const RATE_MASK: u32 = 0x0000ff00;
    const RATE_SHIFT: usize = 8;

    fn parse_quadlet(val: u32) -> Result<Self, Error> {
        let src_is_locked = (val & Self::SRC_LOCKED) > 0;
        let rate = ClockRate::from_val(((val & Self::RATE_MASK) >> Self::RATE_SHIFT) as u8)?;
        Ok(Self {
            src_is_locked,
            rate,
        })
    }
}

/// Capabilities of clock configurations.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct ClockCaps {
    pub rate_bits: u16,
    pub src_bits: u16,
}

impl ClockCaps {
    const RATE_MASK: u32 = 0x0000007f;
    const RATE_SHIFT: usize = 0;
    const SRC_MASK: u32 = 0x1fff0000;
    const SRC_SHIFT: usize = 16;

    pub fn new(rates: &[ClockRate], srcs: &[ClockSource]) -> Self {
        let rate_bits = rates
            .iter()
            .fold(0, |val, &r| val | (1 << r.to_val() as u16));
        let src_bits = srcs
            .iter()
            .fold(0, |val, &s| val | (1 << s.to_val() as u16));
        ClockCaps {
            rate_bits: rate_bits & (Self::RATE_MASK as u16),
            src_bits,
        }
    }

    /// The list of supported rates.
    pub fn rate_entries(&self) -> Vec<ClockRate> {
        CLOCK_RATES
            .iter()
            .enumerate()
            .filter(|(i, _)| self.rate_bits & (1 << i) > 0)
            .map(|(_, &r)| r)
            .collect()
    }

    /// The list of supported sources.
    pub fn src_entries(&self) -> Vec<ClockSource> {
        CLOCK_SOURCES
            .iter()
            .enumerate()
            .filter(|(i, _)| self.src_bits & (1 << i) > 0)
            .map(|(_, &s)| s)
            .collect()
    }
}

impl From<u32> for ClockCaps {
    fn from(val: u32) -> Self {
        let rate_bits = ((val & Self::RATE_MASK) >> Self::RATE_SHIFT) as u16;
        let src_bits = ((val & Self::SRC_MASK) >> Self::SRC_SHIFT) as u16;
        ClockCaps {
            rate_bits,
            src_bits,
        }
    }
}

impl From<&ClockCaps> for u32 {
    fn from(caps: &ClockCaps) -> Self {
        ((caps.rate_bits as u32) << ClockCaps::RATE_SHIFT) & ClockCaps::RATE_MASK
            | ((caps.src_bits as u32) << ClockCaps::SRC_SHIFT) & ClockCaps::SRC_MASK
    }
}

/// The maximum size of nickname, including zero terminator.
pub const NICKNAME_MAX_SIZE: usize = 64;

/// Protocol implementation for global section.
#[derive(Default, Debug)]
pub struct GlobalSectionProtocol;

impl TcatOperation for GlobalSectionProtocol {}

const LATEST_NOTIFICATION_OFFSET: usize = 0x08;
const NICKNAME_OFFSET: usize = 0x0c;
const CLK_SELECT_OFFSET: usize = 0x4c;
const STATUS_OFFSET: usize = 0x54;
const CLK_CAPS_OFFSET: usize = 0x64;

impl GlobalSectionProtocol {
    /// The minimum size of global section.
    pub const MIN_SIZE: usize = 96;

    /// The minimum size of global section including the capabilities of clock.
    pub const CAPS_MIN_SIZE: usize = CLK_CAPS_OFFSET + 4;

    fn read_quadlet(
        node: &dyn BusTransport,
        section: &Section,
        offset: usize,
        timeout_ms: u32,
    ) -> Result<u32, Error> {
        check_section_cache(section, Self::MIN_SIZE)?;
        let mut raw = [0; 4];
        Self::read(node, section.offset + offset, &mut raw, timeout_ms)?;
        Ok(u32::from_be_bytes(raw))
    }

    /// Read the nickname of node.
    pub fn read_nickname(
        node: &dyn BusTransport,
        section: &Section,
        timeout_ms: u32,
    ) -> Result<String, Error> {
        check_section_cache(section, Self::MIN_SIZE)?;
        let mut raw = [0; NICKNAME_MAX_SIZE];
        Self::read(node, section.offset + NICKNAME_OFFSET, &mut raw, timeout_ms)?;
        let mut nickname = String::new();
        deserialize_label(&mut nickname, &raw).map(|_| nickname)
    }

    /// Write the nickname of node, up to 63 bytes.
    pub fn write_nickname(
        node: &dyn BusTransport,
        section: &Section,
        nickname: &str,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        check_section_cache(section, Self::MIN_SIZE)?;
        let mut raw = [0; NICKNAME_MAX_SIZE];
        serialize_label(nickname, &mut raw)?;
        Self::write(node, section.offset + NICKNAME_OFFSET, &raw, timeout_ms)
    }

    /// Read the latest notification sent to owner node.
    pub fn read_latest_notification(
        node: &dyn BusTransport,
        section: &Section,
        timeout_ms: u32,
    ) -> Result<u32, Error> {
        Self::read_quadlet(node, section, LATEST_NOTIFICATION_OFFSET, timeout_ms)
    }

    /// Read current configuration of clock.
    pub fn read_clock_config(
        node: &dyn BusTransport,
        section: &Section,
        timeout_ms: u32,
    ) -> Result<ClockConfig, Error> {
        Self::read_quadlet(node, section, CLK_SELECT_OFFSET, timeout_ms)
            .and_then(|val| ClockConfig::parse_quadlet(val))
    }

    /// Write configuration of clock, then wait for the notification of acceptance.
    pub fn write_clock_config(
        node: &dyn BusTransport,
        section: &Section,
        config: &ClockConfig,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        check_section_cache(section, Self::MIN_SIZE)?;
        let addr = BASE_ADDR + (section.offset + CLK_SELECT_OFFSET) as u64;
        node.write_quadlet_and_wait(
            addr,
            config.build_quadlet(),
            NOTIFY_CLOCK_ACCEPTED,
            timeout_ms,
        )
        .map(|_| ())
    }

    /// Read current status of clock.
    pub fn read_clock_status(
        node: &dyn BusTransport,
        section: &Section,
        timeout_ms: u32,
    ) -> Result<ClockStatus, Error> {
        Self::read_quadlet(node, section, STATUS_OFFSET, timeout_ms)
            .and_then(|val| ClockStatus::parse_quadlet(val))
    }

    /// Read the capabilities of clock, available in later version of protocol.
    pub fn read_clock_caps(
        node: &dyn BusTransport,
        section: &Section,
        timeout_ms: u32,
    ) -> Result<ClockCaps, Error> {
        if section.size < Self::CAPS_MIN_SIZE {
            let msg = format!(
                "Global section without clock capabilities: {} bytes",
                section.size
            );
            Err(Error::new(ErrorKind::Unsupported, &msg))?;
        }
        Self::read_quadlet(node, section, CLK_CAPS_OFFSET, timeout_ms).map(|val| ClockCaps::from(val))
    }
}

#[cfg(test)]
mod test {
    use {super::*, firewire_protocols_core::mock::MockNode};

    const SECTION: Section = Section {
        offset: 0x28,
        size: 0x17c,
    };

    #[test]
    fn clock_config_quadlet() {
        let config = ClockConfig {
            rate: ClockRate::R96000,
            src: ClockSource::Adat,
        };
        assert_eq!(config.build_quadlet(), 0x00000405);
        assert_eq!(ClockConfig::parse_quadlet(0x00000405).unwrap(), config);

        let err = ClockConfig::parse_quadlet(0x0000000d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        let err = ClockConfig::parse_quadlet(0x00000b0c).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn clock_caps_bits() {
        let caps = ClockCaps::from(0x1081007e);
        assert_eq!(
            caps.rate_entries(),
            vec![
                ClockRate::R44100,
                ClockRate::R48000,
                ClockRate::R88200,
                ClockRate::R96000,
                ClockRate::R176400,
                ClockRate::R192000
            ]
        );
        assert_eq!(
            caps.src_entries(),
            vec![ClockSource::Aes1, ClockSource::WordClock, ClockSource::Internal]
        );

        let built = ClockCaps::new(&caps.rate_entries(), &caps.src_entries());
        assert_eq!(built, caps);
        assert_eq!(u32::from(&built), 0x1081007e);
    }

    #[test]
    fn clock_select_with_notification() {
        let node = MockNode::default();
        let addr = BASE_ADDR + (SECTION.offset + CLK_SELECT_OFFSET) as u64;

        let config = ClockConfig {
            rate: ClockRate::R48000,
            src: ClockSource::Internal,
        };
        node.queue_notification(NOTIFY_LOCK_CHG);
        node.queue_notification(NOTIFY_CLOCK_ACCEPTED | NOTIFY_LOCK_CHG);
        GlobalSectionProtocol::write_clock_config(&node, &SECTION, &config, 100).unwrap();
        assert_eq!(node.quadlet_writes(addr), vec![0x0000020c]);

        let read = GlobalSectionProtocol::read_clock_config(&node, &SECTION, 100).unwrap();
        assert_eq!(read, config);

        let err =
            GlobalSectionProtocol::write_clock_config(&node, &SECTION, &config, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn clock_select_ignores_earlier_acceptance() {
        let node = MockNode::default();
        let addr = BASE_ADDR + (SECTION.offset + CLK_SELECT_OFFSET) as u64;

        let config = ClockConfig {
            rate: ClockRate::R44100,
            src: ClockSource::Internal,
        };

        // The acceptance for former write arrives late.
        node.raise_notification(NOTIFY_CLOCK_ACCEPTED);
        let err =
            GlobalSectionProtocol::write_clock_config(&node, &SECTION, &config, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(node.quadlet_writes(addr), vec![0x0000010c]);

        node.raise_notification(NOTIFY_CLOCK_ACCEPTED | NOTIFY_LOCK_CHG);
        node.queue_notification(NOTIFY_CLOCK_ACCEPTED);
        GlobalSectionProtocol::write_clock_config(&node, &SECTION, &config, 100).unwrap();
        assert_eq!(node.pending_notification(), 0);
    }

    #[test]
    fn nickname_layout() {
        let node = MockNode::default();
        let addr = BASE_ADDR + (SECTION.offset + NICKNAME_OFFSET) as u64;

        GlobalSectionProtocol::write_nickname(&node, &SECTION, "Studio", 100).unwrap();
        let writes = node.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, addr);
        assert_eq!(writes[0].1.len(), NICKNAME_MAX_SIZE);
        assert_eq!(&writes[0].1[..8], &[b'S', b't', b'u', b'd', b'i', b'o', 0x00, 0x00]);

        let nickname = GlobalSectionProtocol::read_nickname(&node, &SECTION, 100).unwrap();
        assert_eq!(nickname, "Studio");

        let long = "a".repeat(64);
        let err = GlobalSectionProtocol::write_nickname(&node, &SECTION, &long, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        GlobalSectionProtocol::write_nickname(&node, &SECTION, &long[..63], 100).unwrap();
    }

    #[test]
    fn clock_status_and_caps() {
        let node = MockNode::default();
        node.set_quadlet(BASE_ADDR + 0x28 + 0x54, 0x00000201);
        let status = GlobalSectionProtocol::read_clock_status(&node, &SECTION, 100).unwrap();
        assert!(status.src_is_locked);
        assert_eq!(status.rate, ClockRate::R48000);

        let small = Section {
            offset: 0x28,
            size: 0x60,
        };
        let err = GlobalSectionProtocol::read_clock_caps(&node, &small, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);

        let tiny = Section {
            offset: 0x28,
            size: 0x40,
        };
        let err = GlobalSectionProtocol::read_clock_status(&node, &tiny, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}
