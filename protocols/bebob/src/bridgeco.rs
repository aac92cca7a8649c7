// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2021 Takashi Sakamoto

//! Protocol implementation defined by BridgeCo. AG for its BridgeCo. Enhanced Break Out Box
//! (BeBoB) solution.
//!
//! The module includes structure, enumeration, and functions for the extended plug info command,
//! an AV/C command extension defined by BridgeCo. AG to enumerate topology of plugs.

use super::*;

fn decode_val<T: Copy>(table: &[(T, u8)], val: u8, label: &str) -> Result<T, Error> {
    table
        .iter()
        .find(|(_, v)| *v == val)
        .map(|(entry, _)| *entry)
        .ok_or_else(|| {
            let msg = format!("Unexpected value for {}: 0x{:02x}", label, val);
            Error::new(ErrorKind::Protocol, &msg)
        })
}

fn encode_val<T: Copy + Eq>(table: &[(T, u8)], entry: &T, fallback: u8) -> u8 {
    table
        .iter()
        .find(|(e, _)| e.eq(entry))
        .map(|(_, val)| *val)
        .unwrap_or(fallback)
}

fn check_length(raw: &[u8], length: usize, label: &str) -> Result<(), Error> {
    if raw.len() < length {
        let msg = format!("{} too short: {} but {} expected", label, raw.len(), length);
        Err(Error::new(ErrorKind::Malformed, &msg))
    } else {
        Ok(())
    }
}

/// Parse the string with length prefix. The bytes after declared length are ignored.
fn parse_prefixed_string(raw: &[u8], label: &str) -> Result<String, Error> {
    check_length(raw, 1, label)?;
    let len = raw[0] as usize;
    if 1 + len > raw.len() {
        let msg = format!("Length prefix of {} beyond response: {}", label, len);
        Err(Error::new(ErrorKind::Protocol, &msg))?;
    }
    String::from_utf8(raw[1..(1 + len)].to_vec()).map_err(|e| {
        let msg = format!("Invalid UTF-8 for {}: {}", label, e);
        Error::new(ErrorKind::Protocol, &msg)
    })
}

/// Type of address to plug for unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BcoPlugAddrUnitType {
    /// Address to unit for isochronous input/output.
    Isoc,
    /// Address to unit for external input/output.
    Ext,
    /// Address to unit for asynchronous input/output.
    Async,
}

impl Default for BcoPlugAddrUnitType {
    fn default() -> Self {
        Self::Isoc
    }
}

const UNIT_TYPES: &[(BcoPlugAddrUnitType, u8)] = &[
    (BcoPlugAddrUnitType::Isoc, 0x00),
    (BcoPlugAddrUnitType::Ext, 0x01),
    (BcoPlugAddrUnitType::Async, 0x02),
];

/// Direction of plug.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BcoPlugDirection {
    /// For input plug.
    Input,
    /// For output plug.
    Output,
}

impl Default for BcoPlugDirection {
    fn default() -> Self {
        Self::Input
    }
}

const DIRECTIONS: &[(BcoPlugDirection, u8)] = &[
    (BcoPlugDirection::Input, 0x00),
    (BcoPlugDirection::Output, 0x01),
];

/// Mode of address to plug.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BcoPlugAddrMode {
    /// Address to plug of unit.
    Unit {
        plug_type: BcoPlugAddrUnitType,
        plug_id: u8,
    },
    /// Address to plug of subunit.
    Subunit { subunit_id: u8, plug_id: u8 },
    /// Address to plug of function block.
    FuncBlk {
        func_blk_type: u8,
        func_blk_id: u8,
        plug_id: u8,
    },
}

impl Default for BcoPlugAddrMode {
    fn default() -> Self {
        Self::Unit {
            plug_type: Default::default(),
            plug_id: 0,
        }
    }
}

impl BcoPlugAddrMode {
    const LENGTH: usize = 4;

    const UNIT: u8 = 0x00;
    const SUBUNIT: u8 = 0x01;
    const FUNCBLK: u8 = 0x02;

    const RESERVED: u8 = 0xff;

    fn to_raw(&self) -> [u8; Self::LENGTH] {
        match self {
            Self::Unit { plug_type, plug_id } => [
                Self::UNIT,
                encode_val(UNIT_TYPES, plug_type, Self::RESERVED),
                *plug_id,
                Self::RESERVED,
            ],
            Self::Subunit {
                subunit_id,
                plug_id,
            } => [Self::SUBUNIT, *subunit_id, *plug_id, Self::RESERVED],
            Self::FuncBlk {
                func_blk_type,
                func_blk_id,
                plug_id,
            } => [Self::FUNCBLK, *func_blk_type, *func_blk_id, *plug_id],
        }
    }

    fn from_raw(raw: &[u8]) -> Result<Self, Error> {
        check_length(raw, Self::LENGTH, "plug address mode")?;
        let mode = match raw[0] {
            Self::UNIT => Self::Unit {
                plug_type: decode_val(UNIT_TYPES, raw[1], "unit plug type")?,
                plug_id: raw[2],
            },
            Self::SUBUNIT => Self::Subunit {
                subunit_id: raw[1],
                plug_id: raw[2],
            },
            Self::FUNCBLK => Self::FuncBlk {
                func_blk_type: raw[1],
                func_blk_id: raw[2],
                plug_id: raw[3],
            },
            _ => {
                let msg = format!("Unexpected mode of plug address: 0x{:02x}", raw[0]);
                Err(Error::new(ErrorKind::Protocol, &msg))?
            }
        };
        Ok(mode)
    }
}

/// Address of plug, 5 bytes.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct BcoPlugAddr {
    /// The direction of plug.
    pub direction: BcoPlugDirection,
    /// The mode to address for the plug.
    pub mode: BcoPlugAddrMode,
}

impl BcoPlugAddr {
    const LENGTH: usize = 5;

    /// Instantiate address structure to plug for unit.
    pub fn new_for_unit(
        direction: BcoPlugDirection,
        plug_type: BcoPlugAddrUnitType,
        plug_id: u8,
    ) -> Self {
        Self {
            direction,
            mode: BcoPlugAddrMode::Unit { plug_type, plug_id },
        }
    }

    /// Instantiate address structure to plug for subunit.
    pub fn new_for_subunit(direction: BcoPlugDirection, subunit_id: u8, plug_id: u8) -> Self {
        Self {
            direction,
            mode: BcoPlugAddrMode::Subunit {
                subunit_id,
                plug_id,
            },
        }
    }

    /// Instantiate address structure to plug for function block.
    pub fn new_for_func_blk(
        direction: BcoPlugDirection,
        func_blk_type: u8,
        func_blk_id: u8,
        plug_id: u8,
    ) -> Self {
        Self {
            direction,
            mode: BcoPlugAddrMode::FuncBlk {
                func_blk_type,
                func_blk_id,
                plug_id,
            },
        }
    }

    pub fn to_raw(&self) -> [u8; Self::LENGTH] {
        let mut raw = [0; Self::LENGTH];
        raw[0] = encode_val(DIRECTIONS, &self.direction, 0xff);
        raw[1..].copy_from_slice(&self.mode.to_raw());
        raw
    }

    pub fn from_raw(raw: &[u8]) -> Result<Self, Error> {
        check_length(raw, Self::LENGTH, "plug address")?;
        let direction = decode_val(DIRECTIONS, raw[0], "plug direction")?;
        let mode = BcoPlugAddrMode::from_raw(&raw[1..])?;
        Ok(Self { direction, mode })
    }
}

/// Address to plug connected to the plug, with the address of subunit for modes except for unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BcoIoPlugAddr {
    /// For direction of plug.
    pub direction: BcoPlugDirection,
    /// The address of subunit, not available for unit mode.
    pub subunit: Option<(u8, u8)>,
    /// The mode to address for the plug.
    pub mode: BcoPlugAddrMode,
}

impl BcoIoPlugAddr {
    const LENGTH: usize = 7;

    fn from_raw(raw: &[u8]) -> Result<Self, Error> {
        check_length(raw, Self::LENGTH, "connected plug address")?;
        let direction = decode_val(DIRECTIONS, raw[0], "plug direction")?;
        let (subunit, mode) = match raw[1] {
            BcoPlugAddrMode::UNIT => (None, BcoPlugAddrMode::from_raw(&raw[1..5])?),
            BcoPlugAddrMode::SUBUNIT => {
                let mode = BcoPlugAddrMode::Subunit {
                    subunit_id: raw[3],
                    plug_id: raw[4],
                };
                (Some((raw[2], raw[3])), mode)
            }
            BcoPlugAddrMode::FUNCBLK => {
                let mode = BcoPlugAddrMode::FuncBlk {
                    func_blk_type: raw[4],
                    func_blk_id: raw[5],
                    plug_id: raw[6],
                };
                (Some((raw[2], raw[3])), mode)
            }
            _ => {
                let msg = format!("Unexpected mode of plug address: 0x{:02x}", raw[1]);
                Err(Error::new(ErrorKind::Protocol, &msg))?
            }
        };
        Ok(Self {
            direction,
            subunit,
            mode,
        })
    }
}

/// The type of plug.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BcoPlugType {
    /// Isochronous stream.
    Isoc,
    /// Asynchronous stream.
    Async,
    /// MIDI.
    Midi,
    /// Synchronization signal.
    Sync,
    /// Analog signal.
    Analog,
    /// Digital signal.
    Digital,
}

impl Default for BcoPlugType {
    fn default() -> Self {
        Self::Isoc
    }
}

const PLUG_TYPES: &[(BcoPlugType, u8)] = &[
    (BcoPlugType::Isoc, 0x00),
    (BcoPlugType::Async, 0x01),
    (BcoPlugType::Midi, 0x02),
    (BcoPlugType::Sync, 0x03),
    (BcoPlugType::Analog, 0x04),
    (BcoPlugType::Digital, 0x05),
];

/// The location of channel for playback or capture.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BcoLocation {
    /// Left front.
    L,
    /// Right front.
    R,
    /// Center front.
    C,
    /// Low frequency effect.
    Lfe,
    /// Left surround.
    Ls,
    /// Right surround.
    Rs,
    /// Left of center.
    Lc,
    /// Right of center.
    Rc,
    /// Surround.
    S,
    /// Side left.
    Sl,
    /// Side right.
    Sr,
    /// Top.
    T,
    /// Bottom.
    B,
    /// Front effect left.
    Fel,
    /// Front effect right.
    Fer,
    NoPosition,
}

impl Default for BcoLocation {
    fn default() -> Self {
        Self::NoPosition
    }
}

const LOCATIONS: &[(BcoLocation, u8)] = &[
    (BcoLocation::L, 0x01),
    (BcoLocation::R, 0x02),
    (BcoLocation::C, 0x03),
    (BcoLocation::Lfe, 0x04),
    (BcoLocation::Ls, 0x05),
    (BcoLocation::Rs, 0x06),
    (BcoLocation::Lc, 0x07),
    (BcoLocation::Rc, 0x08),
    (BcoLocation::S, 0x09),
    (BcoLocation::Sl, 0x0a),
    (BcoLocation::Sr, 0x0b),
    (BcoLocation::T, 0x0c),
    (BcoLocation::B, 0x0d),
    (BcoLocation::Fel, 0x0e),
    (BcoLocation::Fer, 0x0f),
    (BcoLocation::NoPosition, 0xff),
];

/// The channel in cluster.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BcoChannelInfo {
    /// The position of channel in data frame.
    pub pos: u8,
    /// The location of channel for playback or capture.
    pub loc: BcoLocation,
}

impl BcoChannelInfo {
    const LENGTH: usize = 2;
}

/// Cluster with single or multiple data channels.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BcoCluster {
    /// The entries of cluster.
    pub entries: Vec<BcoChannelInfo>,
}

/// Decode clusters; the count of clusters, then the count of members and members per cluster.
fn parse_clusters(raw: &[u8]) -> Result<Vec<BcoCluster>, Error> {
    check_length(raw, 1, "channel positions")?;
    let count = raw[0] as usize;

    let mut clusters = Vec::with_capacity(count);
    let mut pos = 1;
    while clusters.len() < count {
        check_length(&raw[pos.min(raw.len())..], 1, "cluster")?;
        let member_count = raw[pos] as usize;
        pos += 1;

        let size = member_count * BcoChannelInfo::LENGTH;
        check_length(&raw[pos.min(raw.len())..], size, "cluster members")?;
        let entries = raw[pos..(pos + size)]
            .chunks_exact(BcoChannelInfo::LENGTH)
            .map(|pair| {
                decode_val(LOCATIONS, pair[1], "channel location")
                    .map(|loc| BcoChannelInfo { pos: pair[0], loc })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        pos += size;

        clusters.push(BcoCluster { entries });
    }

    Ok(clusters)
}

/// Type of physical port.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BcoPortType {
    Speaker,
    Headphone,
    Microphone,
    Line,
    Spdif,
    Adat,
    Tdif,
    Madi,
    Analog,
    Digital,
    Midi,
    NoType,
}

impl Default for BcoPortType {
    fn default() -> Self {
        Self::NoType
    }
}

const PORT_TYPES: &[(BcoPortType, u8)] = &[
    (BcoPortType::Speaker, 0x00),
    (BcoPortType::Headphone, 0x01),
    (BcoPortType::Microphone, 0x02),
    (BcoPortType::Line, 0x03),
    (BcoPortType::Spdif, 0x04),
    (BcoPortType::Adat, 0x05),
    (BcoPortType::Tdif, 0x06),
    (BcoPortType::Madi, 0x07),
    (BcoPortType::Analog, 0x08),
    (BcoPortType::Digital, 0x09),
    (BcoPortType::Midi, 0x0a),
    (BcoPortType::NoType, 0xff),
];

/// Information about cluster of data channels.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BcoClusterInfo {
    /// The index of cluster.
    pub index: u8,
    /// The type of port for the cluster.
    pub port_type: BcoPortType,
    /// The name of cluster.
    pub name: String,
}

/// Type of information about plug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BcoPlugInfo {
    /// The type of plug.
    Type(BcoPlugType),
    /// The name of plug.
    Name(String),
    /// The number of channels in the plug.
    ChCount(u8),
    /// The position of channels in each cluster in the plug.
    ChPositions(Vec<BcoCluster>),
    /// The name of channel at the position in the plug.
    ChName(u8, String),
    /// The plug as signal source to the plug.
    Input(BcoIoPlugAddr),
    /// The plugs as signal destination from the plug.
    Outputs(Vec<BcoIoPlugAddr>),
    /// The data of cluster at the index in the plug.
    ClusterInfo(BcoClusterInfo),
}

impl BcoPlugInfo {
    const TYPE: u8 = 0x00;
    const NAME: u8 = 0x01;
    const CH_COUNT: u8 = 0x02;
    const CH_POSITIONS: u8 = 0x03;
    const CH_NAME: u8 = 0x04;
    const INPUT: u8 = 0x05;
    const OUTPUTS: u8 = 0x06;
    const CLUSTER_INFO: u8 = 0x07;

    const PLACEHOLDER: u8 = 0xff;

    fn info_type(&self) -> u8 {
        match self {
            Self::Type(_) => Self::TYPE,
            Self::Name(_) => Self::NAME,
            Self::ChCount(_) => Self::CH_COUNT,
            Self::ChPositions(_) => Self::CH_POSITIONS,
            Self::ChName(_, _) => Self::CH_NAME,
            Self::Input(_) => Self::INPUT,
            Self::Outputs(_) => Self::OUTPUTS,
            Self::ClusterInfo(_) => Self::CLUSTER_INFO,
        }
    }

    fn build_request(&self) -> Vec<u8> {
        let mut raw = vec![self.info_type()];
        match self {
            Self::ChName(pos, _) => raw.extend_from_slice(&[*pos, Self::PLACEHOLDER]),
            Self::Input(_) => raw.extend_from_slice(&[Self::PLACEHOLDER; BcoIoPlugAddr::LENGTH]),
            Self::ClusterInfo(info) => raw.extend_from_slice(&[
                info.index,
                Self::PLACEHOLDER,
                Self::PLACEHOLDER,
            ]),
            _ => raw.push(Self::PLACEHOLDER),
        }
        raw
    }

    /// Parse the payload following the byte for type of information.
    fn parse_payload(&mut self, raw: &[u8]) -> Result<(), Error> {
        match self {
            Self::Type(plug_type) => {
                check_length(raw, 1, "plug type")?;
                *plug_type = decode_val(PLUG_TYPES, raw[0], "plug type")?;
            }
            Self::Name(name) => *name = parse_prefixed_string(raw, "plug name")?,
            Self::ChCount(count) => {
                check_length(raw, 1, "channel count")?;
                *count = raw[0];
            }
            Self::ChPositions(clusters) => *clusters = parse_clusters(raw)?,
            Self::ChName(pos, name) => {
                check_length(raw, 1, "channel name")?;
                if raw[0] != *pos {
                    let msg = format!("Unexpected channel position: {}", raw[0]);
                    Err(Error::new(ErrorKind::Protocol, &msg))?;
                }
                *name = parse_prefixed_string(&raw[1..], "channel name")?;
            }
            Self::Input(addr) => *addr = BcoIoPlugAddr::from_raw(raw)?,
            Self::Outputs(addrs) => {
                check_length(raw, 1, "output plugs")?;
                let count = raw[0] as usize;
                check_length(&raw[1..], count * BcoIoPlugAddr::LENGTH, "output plugs")?;
                *addrs = raw[1..]
                    .chunks_exact(BcoIoPlugAddr::LENGTH)
                    .take(count)
                    .map(|r| BcoIoPlugAddr::from_raw(r))
                    .collect::<Result<Vec<_>, Error>>()?;
            }
            Self::ClusterInfo(info) => {
                check_length(raw, 2, "cluster info")?;
                if raw[0] != info.index {
                    let msg = format!("Unexpected cluster index: {}", raw[0]);
                    Err(Error::new(ErrorKind::Protocol, &msg))?;
                }
                info.port_type = decode_val(PORT_TYPES, raw[1], "port type")?;
                info.name = parse_prefixed_string(&raw[2..], "cluster name")?;
            }
        }
        Ok(())
    }
}

/// AV/C command for extend plug information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedPlugInfo {
    /// The address of plug.
    pub addr: BcoPlugAddr,
    /// The type of plug information
    pub info: BcoPlugInfo,
}

impl ExtendedPlugInfo {
    const SUBFUNC: u8 = 0xc0;

    /// The offset of type of information in operands.
    const INFO_TYPE_POS: usize = 1 + BcoPlugAddr::LENGTH;

    /// Instantiate extended plug info structure with parameters.
    pub fn new(addr: &BcoPlugAddr, info: BcoPlugInfo) -> Self {
        Self { addr: *addr, info }
    }
}

impl AvcOp for ExtendedPlugInfo {
    const OPCODE: u8 = 0x02;
}

impl AvcStatus for ExtendedPlugInfo {
    fn build_operands(&mut self, _: &AvcAddr, operands: &mut Vec<u8>) -> Result<(), Error> {
        operands.push(Self::SUBFUNC);
        operands.extend_from_slice(&self.addr.to_raw());
        operands.append(&mut self.info.build_request());
        Ok(())
    }

    fn parse_operands(&mut self, _: &AvcAddr, operands: &[u8]) -> Result<(), Error> {
        check_length(operands, Self::INFO_TYPE_POS + 1, "extended plug info")?;

        if operands[0] != Self::SUBFUNC {
            let msg = format!("Unexpected subfunction: 0x{:02x}", operands[0]);
            Err(Error::new(ErrorKind::Protocol, &msg))?;
        }

        if operands[Self::INFO_TYPE_POS] != self.info.info_type() {
            let msg = format!(
                "Unexpected type of plug info: 0x{:02x}",
                operands[Self::INFO_TYPE_POS]
            );
            Err(Error::new(ErrorKind::Protocol, &msg))?;
        }

        self.info
            .parse_payload(&operands[(Self::INFO_TYPE_POS + 1)..])
    }
}

fn query_plug_info<T: Ta1394Avc + ?Sized>(
    avc: &T,
    addr: &BcoPlugAddr,
    info: BcoPlugInfo,
    timeout_ms: u32,
) -> Result<BcoPlugInfo, Error> {
    let mut op = ExtendedPlugInfo::new(addr, info);
    avc.status_op(&AvcAddr::Unit, &mut op, timeout_ms)
        .map(|_| op.info)
}

/// Retrieve the type of plug.
pub fn get_plug_type<T: Ta1394Avc + ?Sized>(
    avc: &T,
    addr: &BcoPlugAddr,
    timeout_ms: u32,
) -> Result<BcoPlugType, Error> {
    match query_plug_info(avc, addr, BcoPlugInfo::Type(Default::default()), timeout_ms)? {
        BcoPlugInfo::Type(plug_type) => Ok(plug_type),
        _ => Err(Error::new(ErrorKind::Protocol, "Unexpected plug info")),
    }
}

/// Retrieve the name of plug.
pub fn get_plug_name<T: Ta1394Avc + ?Sized>(
    avc: &T,
    addr: &BcoPlugAddr,
    timeout_ms: u32,
) -> Result<String, Error> {
    match query_plug_info(avc, addr, BcoPlugInfo::Name(Default::default()), timeout_ms)? {
        BcoPlugInfo::Name(name) => Ok(name),
        _ => Err(Error::new(ErrorKind::Protocol, "Unexpected plug info")),
    }
}

/// Retrieve the number of channels in the plug.
pub fn get_plug_ch_count<T: Ta1394Avc + ?Sized>(
    avc: &T,
    addr: &BcoPlugAddr,
    timeout_ms: u32,
) -> Result<u8, Error> {
    match query_plug_info(avc, addr, BcoPlugInfo::ChCount(0), timeout_ms)? {
        BcoPlugInfo::ChCount(count) => Ok(count),
        _ => Err(Error::new(ErrorKind::Protocol, "Unexpected plug info")),
    }
}

/// Retrieve the clusters of channel positions in the plug.
pub fn get_plug_ch_positions<T: Ta1394Avc + ?Sized>(
    avc: &T,
    addr: &BcoPlugAddr,
    timeout_ms: u32,
) -> Result<Vec<BcoCluster>, Error> {
    match query_plug_info(avc, addr, BcoPlugInfo::ChPositions(Vec::new()), timeout_ms)? {
        BcoPlugInfo::ChPositions(clusters) => Ok(clusters),
        _ => Err(Error::new(ErrorKind::Protocol, "Unexpected plug info")),
    }
}

/// Retrieve the name of channel at the position in the plug.
pub fn get_plug_ch_name<T: Ta1394Avc + ?Sized>(
    avc: &T,
    addr: &BcoPlugAddr,
    pos: u8,
    timeout_ms: u32,
) -> Result<String, Error> {
    match query_plug_info(avc, addr, BcoPlugInfo::ChName(pos, Default::default()), timeout_ms)? {
        BcoPlugInfo::ChName(_, name) => Ok(name),
        _ => Err(Error::new(ErrorKind::Protocol, "Unexpected plug info")),
    }
}

/// Retrieve the plug connected to the plug as signal source.
pub fn get_plug_input<T: Ta1394Avc + ?Sized>(
    avc: &T,
    addr: &BcoPlugAddr,
    timeout_ms: u32,
) -> Result<BcoIoPlugAddr, Error> {
    let placeholder = BcoIoPlugAddr {
        direction: Default::default(),
        subunit: None,
        mode: Default::default(),
    };
    match query_plug_info(avc, addr, BcoPlugInfo::Input(placeholder), timeout_ms)? {
        BcoPlugInfo::Input(input) => Ok(input),
        _ => Err(Error::new(ErrorKind::Protocol, "Unexpected plug info")),
    }
}

/// Retrieve the plugs connected to the plug as signal destination.
pub fn get_plug_outputs<T: Ta1394Avc + ?Sized>(
    avc: &T,
    addr: &BcoPlugAddr,
    timeout_ms: u32,
) -> Result<Vec<BcoIoPlugAddr>, Error> {
    match query_plug_info(avc, addr, BcoPlugInfo::Outputs(Vec::new()), timeout_ms)? {
        BcoPlugInfo::Outputs(outputs) => Ok(outputs),
        _ => Err(Error::new(ErrorKind::Protocol, "Unexpected plug info")),
    }
}

/// Retrieve the information of cluster at the index in the plug.
pub fn get_plug_cluster_info<T: Ta1394Avc + ?Sized>(
    avc: &T,
    addr: &BcoPlugAddr,
    index: u8,
    timeout_ms: u32,
) -> Result<BcoClusterInfo, Error> {
    let info = BcoClusterInfo {
        index,
        ..Default::default()
    };
    match query_plug_info(avc, addr, BcoPlugInfo::ClusterInfo(info), timeout_ms)? {
        BcoPlugInfo::ClusterInfo(info) => Ok(info),
        _ => Err(Error::new(ErrorKind::Protocol, "Unexpected plug info")),
    }
}

#[cfg(test)]
mod test {
    use {super::*, firewire_protocols_core::mock::MockNode};

    fn isoc_input() -> BcoPlugAddr {
        BcoPlugAddr::new_for_unit(BcoPlugDirection::Input, BcoPlugAddrUnitType::Isoc, 0)
    }

    fn response(info: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0x0c, 0xff, 0x02, 0xc0, 0x00, 0x00, 0x00, 0x00, 0xff];
        frame.extend_from_slice(info);
        frame.extend_from_slice(payload);
        frame
    }

    #[test]
    fn plug_addr_layout() {
        assert_eq!(isoc_input().to_raw(), [0x00, 0x00, 0x00, 0x00, 0xff]);

        let addr = BcoPlugAddr::new_for_unit(BcoPlugDirection::Output, BcoPlugAddrUnitType::Ext, 3);
        assert_eq!(addr.to_raw(), [0x01, 0x00, 0x01, 0x03, 0xff]);

        let addr = BcoPlugAddr::new_for_subunit(BcoPlugDirection::Input, 0x01, 0x02);
        assert_eq!(addr.to_raw(), [0x00, 0x01, 0x01, 0x02, 0xff]);

        let addr = BcoPlugAddr::new_for_func_blk(BcoPlugDirection::Output, 0x81, 0x02, 0x03);
        assert_eq!(addr.to_raw(), [0x01, 0x02, 0x81, 0x02, 0x03]);
        assert_eq!(BcoPlugAddr::from_raw(&addr.to_raw()).unwrap(), addr);
    }

    #[test]
    fn plug_type_query() {
        let node = MockNode::default();
        node.queue_fcp_response(&response(&[0x00], &[0x04]));
        let plug_type = get_plug_type(&node, &isoc_input(), 100).unwrap();
        assert_eq!(plug_type, BcoPlugType::Analog);
        assert_eq!(
            node.fcp_commands()[0],
            vec![0x01, 0xff, 0x02, 0xc0, 0x00, 0x00, 0x00, 0x00, 0xff, 0x00, 0xff]
        );

        node.queue_fcp_response(&response(&[0x00], &[0x06]));
        let err = get_plug_type(&node, &isoc_input(), 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn plug_name_with_excess_bytes() {
        let node = MockNode::default();
        node.queue_fcp_response(&response(&[0x01], &[0x03, b'I', b'n', b'1', 0xff, 0xff]));
        let name = get_plug_name(&node, &isoc_input(), 100).unwrap();
        assert_eq!(name, "In1");

        node.queue_fcp_response(&response(&[0x01], &[0x05, b'I', b'n']));
        let err = get_plug_name(&node, &isoc_input(), 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn channel_name() {
        let node = MockNode::default();
        node.queue_fcp_response(&response(&[0x04, 0x02], &[0x04, b'M', b'i', b'c', b'2']));
        let name = get_plug_ch_name(&node, &isoc_input(), 2, 100).unwrap();
        assert_eq!(name, "Mic2");
        assert_eq!(node.fcp_commands()[0][9..], [0x04, 0x02, 0xff]);
    }

    #[test]
    fn cluster_member_counts() {
        let raw = [
            0x03, // 3 clusters.
            0x02, 0x01, 0x01, 0x02, 0x02, // 2 members.
            0x01, 0x03, 0x03, // 1 member.
            0x03, 0x04, 0x0a, 0x05, 0x0b, 0x06, 0xff, // 3 members.
        ];
        let clusters = parse_clusters(&raw).unwrap();
        let counts: Vec<usize> = clusters.iter().map(|c| c.entries.len()).collect();
        assert_eq!(counts, vec![2, 1, 3]);
        assert_eq!(
            clusters[0].entries[1],
            BcoChannelInfo {
                pos: 0x02,
                loc: BcoLocation::R
            }
        );
        assert_eq!(clusters[2].entries[2].loc, BcoLocation::NoPosition);

        assert_eq!(parse_clusters(&[0x00, 0xff, 0xff]).unwrap(), Vec::new());
    }

    #[test]
    fn cluster_truncated_or_invalid() {
        let err = parse_clusters(&[0x02, 0x01, 0x01, 0x01]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);

        let err = parse_clusters(&[0x01, 0x02, 0x01, 0x01, 0x02]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);

        let err = parse_clusters(&[0x01, 0x01, 0x01, 0x20]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn channel_positions_query() {
        let node = MockNode::default();
        node.queue_fcp_response(&response(&[0x03], &[0x01, 0x02, 0x01, 0x01, 0x02, 0x02]));
        let clusters = get_plug_ch_positions(&node, &isoc_input(), 100).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].entries.len(), 2);
    }

    #[test]
    fn cluster_info_query() {
        let node = MockNode::default();
        node.queue_fcp_response(&response(
            &[0x07],
            &[0x01, 0x03, 0x04, b'L', b'i', b'n', b'e', 0xff],
        ));
        let info = get_plug_cluster_info(&node, &isoc_input(), 1, 100).unwrap();
        assert_eq!(info.index, 1);
        assert_eq!(info.port_type, BcoPortType::Line);
        assert_eq!(info.name, "Line");
    }

    #[test]
    fn connected_plugs() {
        let node = MockNode::default();
        node.queue_fcp_response(&response(
            &[0x05],
            &[0x01, 0x02, 0x08, 0x00, 0x81, 0x01, 0x00],
        ));
        let input = get_plug_input(&node, &isoc_input(), 100).unwrap();
        assert_eq!(input.direction, BcoPlugDirection::Output);
        assert_eq!(input.subunit, Some((0x08, 0x00)));
        assert_eq!(
            input.mode,
            BcoPlugAddrMode::FuncBlk {
                func_blk_type: 0x81,
                func_blk_id: 0x01,
                plug_id: 0x00
            }
        );

        node.queue_fcp_response(&response(
            &[0x06],
            &[
                0x02, 0x00, 0x00, 0x00, 0x01, 0xff, 0xff, 0xff, 0x00, 0x01, 0x60, 0x00, 0x01,
                0xff, 0xff,
            ],
        ));
        let outputs = get_plug_outputs(&node, &isoc_input(), 100).unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(
            outputs[0].mode,
            BcoPlugAddrMode::Unit {
                plug_type: BcoPlugAddrUnitType::Isoc,
                plug_id: 1
            }
        );
        assert_eq!(outputs[1].subunit, Some((0x60, 0x00)));

        let cmds = node.fcp_commands();
        assert_eq!(cmds[0][9], 0x05);
        assert_eq!(cmds[1][9], 0x06);
    }

    #[test]
    fn info_type_per_query() {
        let node = MockNode::default();
        let addr = isoc_input();

        // Without response, each query still transmits its command.
        assert!(get_plug_type(&node, &addr, 100).is_err());
        assert!(get_plug_name(&node, &addr, 100).is_err());
        assert!(get_plug_ch_count(&node, &addr, 100).is_err());
        assert!(get_plug_ch_positions(&node, &addr, 100).is_err());
        assert!(get_plug_ch_name(&node, &addr, 1, 100).is_err());
        assert!(get_plug_input(&node, &addr, 100).is_err());
        assert!(get_plug_outputs(&node, &addr, 100).is_err());
        assert!(get_plug_cluster_info(&node, &addr, 1, 100).is_err());

        let info_types: Vec<u8> = node.fcp_commands().iter().map(|cmd| cmd[9]).collect();
        assert_eq!(
            info_types,
            vec![0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]
        );
    }
}
