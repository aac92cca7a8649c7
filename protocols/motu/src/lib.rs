// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2021 Takashi Sakamoto

#![doc = include_str!("../README.md")]

pub mod version_1;
pub mod version_2;
pub mod version_3;

use {
    firewire_protocols_core::*,
    version_1::*,
    version_2::*,
    version_3::*,
};

const BASE_OFFSET: u64 = 0xfffff0000000;

// The register to configure format of isochronous packet, shared by version 1 and 2.
const PACKET_FORMAT_OFFSET: u64 = 0x0b10;
const PACKET_FORMAT_TX_EXCLUDE_OPT_MASK: u32 = 0x00000080;
const PACKET_FORMAT_RX_EXCLUDE_OPT_MASK: u32 = 0x00000040;

fn read_quad(node: &dyn BusTransport, offset: u64, timeout_ms: u32) -> Result<u32, Error> {
    read_quadlet(node, BASE_OFFSET, offset, timeout_ms)
}

fn write_quad(node: &dyn BusTransport, offset: u64, quad: u32, timeout_ms: u32) -> Result<(), Error> {
    write_quadlet(node, BASE_OFFSET, offset, quad, timeout_ms)
}

/// Source of sampling clock, unified for all of protocol versions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MotuClockSource {
    /// Internal oscillator.
    Internal,
    /// Word clock on BNC interface.
    WordOnBnc,
    /// S/PDIF on coaxial interface.
    SpdifOnCoax,
    /// ADAT on D-Sub 9 pin interface.
    AdatOnDsub,
    /// ADAT on optical interface.
    AdatOnOpt,
    /// ADAT on optical interface A.
    AdatOnOptA,
    /// ADAT on optical interface B.
    AdatOnOptB,
    /// S/PDIF on optical interface.
    SpdifOnOpt,
    /// S/PDIF on optical interface A.
    SpdifOnOptA,
    /// S/PDIF on optical interface B.
    SpdifOnOptB,
    /// AES/EBU on XLR interface.
    AesebuOnXlr,
}

impl Default for MotuClockSource {
    fn default() -> Self {
        Self::Internal
    }
}

const CLOCK_SOURCE_LABELS: &[(MotuClockSource, &str)] = &[
    (MotuClockSource::Internal, "Internal"),
    (MotuClockSource::WordOnBnc, "Word-on-BNC"),
    (MotuClockSource::SpdifOnCoax, "S/PDIF-on-coax"),
    (MotuClockSource::AdatOnDsub, "ADAT-on-Dsub"),
    (MotuClockSource::AdatOnOpt, "ADAT-on-opt"),
    (MotuClockSource::AdatOnOptA, "ADAT-on-opt-A"),
    (MotuClockSource::AdatOnOptB, "ADAT-on-opt-B"),
    (MotuClockSource::SpdifOnOpt, "S/PDIF-on-opt"),
    (MotuClockSource::SpdifOnOptA, "S/PDIF-on-opt-A"),
    (MotuClockSource::SpdifOnOptB, "S/PDIF-on-opt-B"),
    (MotuClockSource::AesebuOnXlr, "AES/EBU-on-XLR"),
];

impl MotuClockSource {
    /// The short label used in command line.
    pub fn label(&self) -> &'static str {
        CLOCK_SOURCE_LABELS
            .iter()
            .find(|(src, _)| src.eq(self))
            .map(|(_, label)| *label)
            .unwrap_or("Internal")
    }

    pub fn from_label(label: &str) -> Result<Self, Error> {
        CLOCK_SOURCE_LABELS
            .iter()
            .find(|(_, l)| l.eq(&label))
            .map(|(src, _)| *src)
            .ok_or_else(|| {
                let msg = format!("Invalid label of clock source: {}", label);
                Error::new(ErrorKind::Argument, &msg)
            })
    }
}

impl std::fmt::Display for MotuClockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Internal => "Internal",
            Self::WordOnBnc => "Word clock on BNC interface",
            Self::SpdifOnCoax => "S/PDIF on coaxial interface",
            Self::AdatOnDsub => "ADAT on Dsub-9pin interface",
            Self::AdatOnOpt => "ADAT on optical interface",
            Self::AdatOnOptA => "ADAT on optical interface A",
            Self::AdatOnOptB => "ADAT on optical interface B",
            Self::SpdifOnOpt => "S/PDIF on optical interface",
            Self::SpdifOnOptA => "S/PDIF on optical interface A",
            Self::SpdifOnOptB => "S/PDIF on optical interface B",
            Self::AesebuOnXlr => "AES/EBU on XLR interface",
        };
        write!(f, "{}", label)
    }
}

/// Mode of optical interface.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OptIfaceMode {
    /// Disabled.
    None,
    /// For S/PDIF signal.
    Spdif,
    /// For ADAT signal.
    Adat,
}

impl Default for OptIfaceMode {
    fn default() -> Self {
        Self::None
    }
}

impl OptIfaceMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Spdif => "S/PDIF",
            Self::Adat => "ADAT",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, Error> {
        OPT_IFACE_MODES
            .iter()
            .find(|m| m.label() == label)
            .copied()
            .ok_or_else(|| {
                let msg = format!("Invalid label of optical interface mode: {}", label);
                Error::new(ErrorKind::Argument, &msg)
            })
    }
}

/// Direction of optical interface.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OptIfaceDirection {
    Input,
    Output,
}

impl Default for OptIfaceDirection {
    fn default() -> Self {
        Self::Input
    }
}

impl OptIfaceDirection {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Input => "in",
            Self::Output => "out",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, Error> {
        OPT_IFACE_DIRECTIONS
            .iter()
            .find(|d| d.label() == label)
            .copied()
            .ok_or_else(|| {
                let msg = format!("Invalid label of direction: {}", label);
                Error::new(ErrorKind::Argument, &msg)
            })
    }
}

/// Index of optical interface.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OptIfaceIndex {
    A,
    B,
}

impl Default for OptIfaceIndex {
    fn default() -> Self {
        Self::A
    }
}

impl OptIfaceIndex {
    pub fn label(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, Error> {
        match label {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            _ => {
                let msg = format!("Invalid label of optical interface: {}", label);
                Err(Error::new(ErrorKind::Argument, &msg))
            }
        }
    }
}

/// The modes of optical interface available in all of protocol versions.
pub const OPT_IFACE_MODES: &[OptIfaceMode] =
    &[OptIfaceMode::None, OptIfaceMode::Spdif, OptIfaceMode::Adat];

/// The directions of optical interface available in all of protocol versions.
pub const OPT_IFACE_DIRECTIONS: &[OptIfaceDirection] =
    &[OptIfaceDirection::Input, OptIfaceDirection::Output];

fn check_opt_iface_index(indexes: &[OptIfaceIndex], index: OptIfaceIndex) -> Result<(), Error> {
    if indexes.iter().any(|i| index.eq(i)) {
        Ok(())
    } else {
        let msg = format!("Optical interface {} is not available", index.label());
        Err(Error::new(ErrorKind::Argument, &msg))
    }
}

fn check_clock_source(srcs: &[MotuClockSource], src: MotuClockSource) -> Result<(), Error> {
    if srcs.iter().any(|s| src.eq(s)) {
        Ok(())
    } else {
        let msg = format!("Clock source is not available: {}", src);
        Err(Error::new(ErrorKind::Argument, &msg))
    }
}

fn check_sampling_rate(rates: &[u32], rate: u32) -> Result<(), Error> {
    if rates.iter().any(|&r| r == rate) {
        Ok(())
    } else {
        let msg = format!("Sampling rate is not available: {}", rate);
        Err(Error::new(ErrorKind::Argument, &msg))
    }
}

// Whether the data blocks for optical interface are excluded from isochronous packet.
fn packet_format_mask(direction: OptIfaceDirection) -> u32 {
    match direction {
        OptIfaceDirection::Input => PACKET_FORMAT_TX_EXCLUDE_OPT_MASK,
        OptIfaceDirection::Output => PACKET_FORMAT_RX_EXCLUDE_OPT_MASK,
    }
}

fn update_packet_format(
    node: &dyn BusTransport,
    direction: OptIfaceDirection,
    mode: OptIfaceMode,
    timeout_ms: u32,
) -> Result<(), Error> {
    let mask = packet_format_mask(direction);
    let mut quad = read_quad(node, PACKET_FORMAT_OFFSET, timeout_ms)?;
    quad &= !mask;
    if mode != OptIfaceMode::Adat {
        quad |= mask;
    }
    write_quad(node, PACKET_FORMAT_OFFSET, quad, timeout_ms)
}

/// Version of protocol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MotuVersion {
    V1,
    V2,
    V3,
}

/// The model and its protocol, detected by model identifier in configuration ROM.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MotuModel {
    /// 828 with protocol version 1.
    F828,
    /// 896 with protocol version 1.
    F896,
    /// 828mk2 with protocol version 2.
    F828mk2,
    /// 828mk3 with protocol version 3.
    F828mk3,
}

const CONFIG_ROM_MODEL_QUADLET: usize = 13;
const CONFIG_ROM_UNREADABLE_TAG: u8 = 17;

const MODEL_IDS: &[(u32, MotuModel)] = &[
    (0x102802, MotuModel::F828),
    (0x101800, MotuModel::F828mk2),
    (0x106800, MotuModel::F828mk3),
    (0x100800, MotuModel::F828mk3),
];

impl MotuModel {
    /// Detect the model by the quadlet 13 in content of configuration ROM.
    pub fn from_config_rom(raw: &[u8]) -> Result<Self, Error> {
        let pos = CONFIG_ROM_MODEL_QUADLET * 4;
        if raw.len() < pos + 4 {
            let msg = format!("Configuration ROM is too short: {}", raw.len());
            Err(Error::new(ErrorKind::Protocol, &msg))?;
        }

        let mut quadlet = [0; 4];
        quadlet.copy_from_slice(&raw[pos..(pos + 4)]);
        if quadlet[0] == CONFIG_ROM_UNREADABLE_TAG {
            Err(Error::new(
                ErrorKind::Protocol,
                "Model identifier is unreadable",
            ))?;
        }

        let model_id = u32::from_be_bytes(quadlet) & 0x00ffffff;
        Self::from_model_id(model_id)
    }

    pub fn from_model_id(model_id: u32) -> Result<Self, Error> {
        MODEL_IDS
            .iter()
            .find(|(id, _)| *id == model_id)
            .map(|(_, model)| *model)
            .ok_or_else(|| {
                let msg = format!("Unsupported model: 0x{:06x}", model_id);
                Error::new(ErrorKind::Unsupported, &msg)
            })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::F828 => "828",
            Self::F896 => "896",
            Self::F828mk2 => "828mk2",
            Self::F828mk3 => "828mk3",
        }
    }

    pub fn version(&self) -> MotuVersion {
        match self {
            Self::F828 | Self::F896 => MotuVersion::V1,
            Self::F828mk2 => MotuVersion::V2,
            Self::F828mk3 => MotuVersion::V3,
        }
    }

    pub fn supported_sampling_rates(&self) -> &'static [u32] {
        match self {
            Self::F828 => F828Protocol::SAMPLING_RATES,
            Self::F896 => F896Protocol::SAMPLING_RATES,
            Self::F828mk2 => F828mk2Protocol::SAMPLING_RATES,
            Self::F828mk3 => F828mk3Protocol::SAMPLING_RATES,
        }
    }

    pub fn get_sampling_rate(&self, node: &dyn BusTransport, timeout_ms: u32) -> Result<u32, Error> {
        match self {
            Self::F828 => F828Protocol::get_sampling_rate(node, timeout_ms),
            Self::F896 => F896Protocol::get_sampling_rate(node, timeout_ms),
            Self::F828mk2 => F828mk2Protocol::get_sampling_rate(node, timeout_ms),
            Self::F828mk3 => F828mk3Protocol::get_sampling_rate(node, timeout_ms),
        }
    }

    pub fn set_sampling_rate(
        &self,
        node: &dyn BusTransport,
        rate: u32,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        match self {
            Self::F828 => F828Protocol::set_sampling_rate(node, rate, timeout_ms),
            Self::F896 => F896Protocol::set_sampling_rate(node, rate, timeout_ms),
            Self::F828mk2 => F828mk2Protocol::set_sampling_rate(node, rate, timeout_ms),
            Self::F828mk3 => F828mk3Protocol::set_sampling_rate(node, rate, timeout_ms),
        }
    }

    /// The available sources. In version 3, the list depends on current mode of optical
    /// interfaces.
    pub fn supported_clock_sources(
        &self,
        node: &dyn BusTransport,
        timeout_ms: u32,
    ) -> Result<Vec<MotuClockSource>, Error> {
        match self {
            Self::F828 => Ok(F828Protocol::CLOCK_SOURCES.to_vec()),
            Self::F896 => Ok(F896Protocol::CLOCK_SOURCES.to_vec()),
            Self::F828mk2 => Ok(F828mk2Protocol::CLOCK_SOURCES.to_vec()),
            Self::F828mk3 => F828mk3Protocol::supported_clock_sources(node, timeout_ms),
        }
    }

    pub fn get_clock_source(
        &self,
        node: &dyn BusTransport,
        timeout_ms: u32,
    ) -> Result<MotuClockSource, Error> {
        match self {
            Self::F828 => F828Protocol::get_clock_source(node, timeout_ms),
            Self::F896 => F896Protocol::get_clock_source(node, timeout_ms),
            Self::F828mk2 => F828mk2Protocol::get_clock_source(node, timeout_ms),
            Self::F828mk3 => F828mk3Protocol::get_clock_source(node, timeout_ms),
        }
    }

    pub fn set_clock_source(
        &self,
        node: &dyn BusTransport,
        src: MotuClockSource,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        match self {
            Self::F828 => F828Protocol::set_clock_source(node, src, timeout_ms),
            Self::F896 => F896Protocol::set_clock_source(node, src, timeout_ms),
            Self::F828mk2 => F828mk2Protocol::set_clock_source(node, src, timeout_ms),
            Self::F828mk3 => F828mk3Protocol::set_clock_source(node, src, timeout_ms),
        }
    }

    pub fn supported_opt_iface_modes(&self) -> &'static [OptIfaceMode] {
        OPT_IFACE_MODES
    }

    pub fn supported_opt_iface_directions(&self) -> &'static [OptIfaceDirection] {
        OPT_IFACE_DIRECTIONS
    }

    pub fn supported_opt_iface_indexes(&self) -> &'static [OptIfaceIndex] {
        match self {
            Self::F828 => F828Protocol::OPT_IFACE_INDEXES,
            Self::F896 => F896Protocol::OPT_IFACE_INDEXES,
            Self::F828mk2 => F828mk2Protocol::OPT_IFACE_INDEXES,
            Self::F828mk3 => F828mk3Protocol::OPT_IFACE_INDEXES,
        }
    }

    pub fn get_opt_iface_mode(
        &self,
        node: &dyn BusTransport,
        direction: OptIfaceDirection,
        index: OptIfaceIndex,
        timeout_ms: u32,
    ) -> Result<OptIfaceMode, Error> {
        match self {
            Self::F828 => F828Protocol::get_opt_iface_mode(node, direction, index, timeout_ms),
            Self::F896 => F896Protocol::get_opt_iface_mode(node, direction, index, timeout_ms),
            Self::F828mk2 => {
                F828mk2Protocol::get_opt_iface_mode(node, direction, index, timeout_ms)
            }
            Self::F828mk3 => {
                F828mk3Protocol::get_opt_iface_mode(node, direction, index, timeout_ms)
            }
        }
    }

    pub fn set_opt_iface_mode(
        &self,
        node: &dyn BusTransport,
        direction: OptIfaceDirection,
        index: OptIfaceIndex,
        mode: OptIfaceMode,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        match self {
            Self::F828 => {
                F828Protocol::set_opt_iface_mode(node, direction, index, mode, timeout_ms)
            }
            Self::F896 => {
                F896Protocol::set_opt_iface_mode(node, direction, index, mode, timeout_ms)
            }
            Self::F828mk2 => {
                F828mk2Protocol::set_opt_iface_mode(node, direction, index, mode, timeout_ms)
            }
            Self::F828mk3 => {
                F828mk3Protocol::set_opt_iface_mode(node, direction, index, mode, timeout_ms)
            }
        }
    }
}
