// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2020 Takashi Sakamoto

//! Specification of TCD2210 and TCD2220 ASICs and firmware.
//!
//! The module includes declarative tables of physical ports and router entries with fixed
//! position for known models, and the computation of available blocks derived from them.

use super::{global_section::ClockRate, *};

/// Identifier of destination block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DstBlkId {
    Aes,
    Adat,
    MixerTx0,
    MixerTx1,
    Ins0,
    Ins1,
    ArmApbAudio,
    Avs0,
    Avs1,
    Reserved(u8),
}

impl Default for DstBlkId {
    fn default() -> Self {
        DstBlkId::Reserved(0xff)
    }
}

/// Destination block in router function.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq)]
pub struct DstBlk {
    pub id: DstBlkId,
    pub ch: u8,
}

/// Identifier of source block.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SrcBlkId {
    Aes,
    Adat,
    Mixer,
    Ins0,
    Ins1,
    ArmAprAudio,
    Avs0,
    Avs1,
    Mute,
    Reserved(u8),
}

impl Default for SrcBlkId {
    fn default() -> Self {
        SrcBlkId::Reserved(0xff)
    }
}

/// Source block in router function.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq)]
pub struct SrcBlk {
    pub id: SrcBlkId,
    pub ch: u8,
}

const BLK_ID_MASK: u8 = 0xf0;
const BLK_ID_SHIFT: usize = 4;
const BLK_CH_MASK: u8 = 0x0f;

const DST_BLK_IDS: &[(DstBlkId, u8)] = &[
    (DstBlkId::Aes, 0),
    (DstBlkId::Adat, 1),
    (DstBlkId::MixerTx0, 2),
    (DstBlkId::MixerTx1, 3),
    (DstBlkId::Ins0, 4),
    (DstBlkId::Ins1, 5),
    (DstBlkId::ArmApbAudio, 10),
    (DstBlkId::Avs0, 11),
    (DstBlkId::Avs1, 12),
];

const SRC_BLK_IDS: &[(SrcBlkId, u8)] = &[
    (SrcBlkId::Aes, 0),
    (SrcBlkId::Adat, 1),
    (SrcBlkId::Mixer, 2),
    (SrcBlkId::Ins0, 4),
    (SrcBlkId::Ins1, 5),
    (SrcBlkId::ArmAprAudio, 10),
    (SrcBlkId::Avs0, 11),
    (SrcBlkId::Avs1, 12),
    (SrcBlkId::Mute, 15),
];

impl From<u8> for DstBlk {
    fn from(val: u8) -> Self {
        let raw_id = (val & BLK_ID_MASK) >> BLK_ID_SHIFT;
        let id = DST_BLK_IDS
            .iter()
            .find(|(_, v)| raw_id.eq(v))
            .map(|&(id, _)| id)
            .unwrap_or(DstBlkId::Reserved(raw_id));
        DstBlk {
            id,
            ch: val & BLK_CH_MASK,
        }
    }
}

impl From<DstBlk> for u8 {
    fn from(blk: DstBlk) -> Self {
        let raw_id = match blk.id {
            DstBlkId::Reserved(id) => id,
            _ => DST_BLK_IDS
                .iter()
                .find(|(id, _)| blk.id.eq(id))
                .map(|&(_, v)| v)
                .unwrap_or_default(),
        };
        ((raw_id << BLK_ID_SHIFT) & BLK_ID_MASK) | (blk.ch & BLK_CH_MASK)
    }
}

impl From<u8> for SrcBlk {
    fn from(val: u8) -> Self {
        let raw_id = (val & BLK_ID_MASK) >> BLK_ID_SHIFT;
        let id = SRC_BLK_IDS
            .iter()
            .find(|(_, v)| raw_id.eq(v))
            .map(|&(id, _)| id)
            .unwrap_or(SrcBlkId::Reserved(raw_id));
        SrcBlk {
            id,
            ch: val & BLK_CH_MASK,
        }
    }
}

impl From<SrcBlk> for u8 {
    fn from(blk: SrcBlk) -> Self {
        let raw_id = match blk.id {
            SrcBlkId::Reserved(id) => id,
            _ => SRC_BLK_IDS
                .iter()
                .find(|(id, _)| blk.id.eq(id))
                .map(|&(_, v)| v)
                .unwrap_or_default(),
        };
        ((raw_id << BLK_ID_SHIFT) & BLK_ID_MASK) | (blk.ch & BLK_CH_MASK)
    }
}

/// Entry of route in router function.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq)]
pub struct RouterEntry {
    pub dst: DstBlk,
    pub src: SrcBlk,
}

/// Mode of sampling transfer frequency.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RateMode {
    /// Up to 48.0 kHz.
    Low,
    /// Up to 96.0 kHz.
    Middle,
    /// Up to 192.0 kHz.
    High,
}

impl Default for RateMode {
    fn default() -> Self {
        RateMode::Low
    }
}

impl RateMode {
    pub fn from_clock_rate(rate: ClockRate) -> Self {
        match rate {
            ClockRate::R32000 | ClockRate::R44100 | ClockRate::R48000 | ClockRate::AnyLow => {
                RateMode::Low
            }
            ClockRate::R88200 | ClockRate::R96000 | ClockRate::AnyMid => RateMode::Middle,
            ClockRate::R176400 | ClockRate::R192000 | ClockRate::AnyHigh => RateMode::High,
            ClockRate::None => RateMode::Low,
        }
    }
}

/// Descriptor for input port.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Input {
    /// Identifier of source block.
    pub id: SrcBlkId,
    /// Offset of channel number.
    pub offset: u8,
    /// Count of channel number.
    pub count: u8,
    /// String expression.
    pub label: Option<&'static str>,
}

/// Descriptor for output port.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Output {
    /// Identifier of destination block.
    pub id: DstBlkId,
    /// Offset of channel number.
    pub offset: u8,
    /// Count of channel number.
    pub count: u8,
    /// String expression.
    pub label: Option<&'static str>,
}

/// Specification of TCD22xx.
pub trait Tcd22xxSpecification {
    /// Physical input ports.
    const INPUTS: &'static [Input];

    /// Physical output ports.
    const OUTPUTS: &'static [Output];

    /// Sources at fixed position in router entries, indexed by the position; e.g. target ports
    /// for meter display.
    const FIXED: &'static [SrcBlk];

    /// The number of ADAT channels at specification of ADAT/SMUX.
    const ADAT_CHANNELS: [u8; 3] = [8, 4, 2];

    /// Compute the number of ADAT channels.
    fn adat_channel_count(rate_mode: RateMode) -> u8 {
        let index = match rate_mode {
            RateMode::Low => 0,
            RateMode::Middle => 1,
            RateMode::High => 2,
        };
        Self::ADAT_CHANNELS[index]
    }

    /// Compute available destination and source blocks for physical ports.
    fn compute_avail_real_blk_pair(rate_mode: RateMode) -> (Vec<SrcBlk>, Vec<DstBlk>) {
        let mut srcs = Vec::<SrcBlk>::new();
        Self::INPUTS.iter().for_each(|entry| {
            let (offset, count) = match entry.id {
                SrcBlkId::Adat => (
                    srcs.iter().filter(|s| s.id.eq(&entry.id)).count() as u8,
                    Self::adat_channel_count(rate_mode),
                ),
                _ => (entry.offset, entry.count),
            };
            (offset..(offset + count)).for_each(|ch| srcs.push(SrcBlk { id: entry.id, ch }));
        });

        let mut dsts = Vec::<DstBlk>::new();
        Self::OUTPUTS.iter().for_each(|entry| {
            let (offset, count) = match entry.id {
                DstBlkId::Adat => (
                    dsts.iter().filter(|d| d.id.eq(&entry.id)).count() as u8,
                    Self::adat_channel_count(rate_mode),
                ),
                _ => (entry.offset, entry.count),
            };
            (offset..(offset + count)).for_each(|ch| dsts.push(DstBlk { id: entry.id, ch }));
        });

        (srcs, dsts)
    }

    /// Refine router entries so that unavailable blocks are dropped and sources at fixed
    /// position are placed in the head.
    fn refine_router_entries(entries: &mut Vec<RouterEntry>, srcs: &[SrcBlk], dsts: &[DstBlk]) {
        entries.retain(|entry| srcs.iter().any(|src| entry.src.eq(src)));
        entries.retain(|entry| dsts.iter().any(|dst| entry.dst.eq(dst)));
        Self::FIXED.iter().enumerate().for_each(|(i, &src)| {
            match entries.iter().position(|entry| entry.src.eq(&src)) {
                Some(pos) => entries.swap(i, pos),
                None => {
                    let dst = DstBlk {
                        id: DstBlkId::Reserved(0xff),
                        ch: 0xff,
                    };
                    entries.insert(i, RouterEntry { dst, src })
                }
            }
        });
    }

    /// The label of source block.
    fn src_blk_label(src: &SrcBlk) -> String {
        Self::INPUTS
            .iter()
            .find(|entry| {
                entry.id == src.id
                    && src.ch >= entry.offset
                    && src.ch < entry.offset + entry.count
                    && entry.label.is_some()
            })
            .and_then(|entry| {
                entry
                    .label
                    .map(|label| format!("{}-{}", label, src.ch - entry.offset))
            })
            .unwrap_or_else(|| {
                let name = match src.id {
                    SrcBlkId::Aes => "S/PDIF",
                    SrcBlkId::Adat => "ADAT",
                    SrcBlkId::Mixer => "Mixer",
                    SrcBlkId::Ins0 => "Analog-A",
                    SrcBlkId::Ins1 => "Analog-B",
                    SrcBlkId::Avs0 => "Stream-A",
                    SrcBlkId::Avs1 => "Stream-B",
                    _ => "Unknown",
                };
                format!("{}-{}", name, src.ch)
            })
    }

    /// The label of destination block.
    fn dst_blk_label(dst: &DstBlk) -> String {
        Self::OUTPUTS
            .iter()
            .find(|entry| {
                entry.id == dst.id
                    && dst.ch >= entry.offset
                    && dst.ch < entry.offset + entry.count
                    && entry.label.is_some()
            })
            .and_then(|entry| {
                entry
                    .label
                    .map(|label| format!("{}-{}", label, dst.ch - entry.offset))
            })
            .unwrap_or_else(|| {
                let name = match dst.id {
                    DstBlkId::Aes => "S/PDIF",
                    DstBlkId::Adat => "ADAT",
                    DstBlkId::MixerTx0 => "Mixer-A",
                    DstBlkId::MixerTx1 => "Mixer-B",
                    DstBlkId::Ins0 => "Analog-A",
                    DstBlkId::Ins1 => "Analog-B",
                    DstBlkId::Avs0 => "Stream-A",
                    DstBlkId::Avs1 => "Stream-B",
                    _ => "Unknown",
                };
                format!("{}-{}", name, dst.ch)
            })
    }
}

/// Protocol implementation for Avid Mbox 3 Pro.
#[derive(Default, Debug)]
pub struct Mbox3Protocol;

impl Tcd22xxSpecification for Mbox3Protocol {
    const INPUTS: &'static [Input] = &[
        Input {
            id: SrcBlkId::Ins0,
            offset: 0,
            count: 6,
            label: None,
        },
        Input {
            id: SrcBlkId::Ins1,
            offset: 0,
            count: 2,
            label: Some("Reverb"),
        },
        Input {
            id: SrcBlkId::Aes,
            offset: 0,
            count: 2,
            label: None,
        },
    ];
    const OUTPUTS: &'static [Output] = &[
        Output {
            id: DstBlkId::Ins0,
            offset: 0,
            count: 6,
            label: None,
        },
        Output {
            id: DstBlkId::Ins1,
            offset: 0,
            count: 4,
            label: Some("Headphone"),
        },
        Output {
            id: DstBlkId::Ins1,
            offset: 4,
            count: 2,
            label: Some("Reverb"),
        },
        Output {
            id: DstBlkId::Aes,
            offset: 0,
            count: 2,
            label: None,
        },
        Output {
            id: DstBlkId::Reserved(0x08),
            offset: 0,
            count: 2,
            label: Some("ControlRoom"),
        },
    ];
    const FIXED: &'static [SrcBlk] = &[
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 0,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 1,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 2,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 3,
        },
    ];
}

/// Protocol implementation for Focusrite Saffire Pro 14.
#[derive(Default, Debug)]
pub struct SPro14Protocol;

impl Tcd22xxSpecification for SPro14Protocol {
    const INPUTS: &'static [Input] = &[
        Input {
            id: SrcBlkId::Ins0,
            offset: 0,
            count: 4,
            label: None,
        },
        Input {
            id: SrcBlkId::Aes,
            offset: 6,
            count: 2,
            label: Some("S/PDIF"),
        },
    ];
    const OUTPUTS: &'static [Output] = &[
        Output {
            id: DstBlkId::Ins0,
            offset: 0,
            count: 4,
            label: None,
        },
        Output {
            id: DstBlkId::Aes,
            offset: 6,
            count: 2,
            label: Some("S/PDIF"),
        },
    ];
    // NOTE: The first 2 entries in router section are used to display signal detection.
    const FIXED: &'static [SrcBlk] = &[
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 0,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 1,
        },
    ];
}

/// Protocol implementation for Focusrite Saffire Pro 24.
#[derive(Default, Debug)]
pub struct SPro24Protocol;

impl Tcd22xxSpecification for SPro24Protocol {
    const INPUTS: &'static [Input] = &[
        Input {
            id: SrcBlkId::Ins0,
            offset: 2,
            count: 2,
            label: Some("Mic"),
        },
        Input {
            id: SrcBlkId::Ins0,
            offset: 0,
            count: 2,
            label: Some("Line"),
        },
        Input {
            id: SrcBlkId::Aes,
            offset: 6,
            count: 2,
            label: Some("S/PDIF-coax"),
        },
        // NOTE: share the same optical interface.
        Input {
            id: SrcBlkId::Adat,
            offset: 0,
            count: 8,
            label: None,
        },
        Input {
            id: SrcBlkId::Aes,
            offset: 4,
            count: 2,
            label: Some("S/PDIF-opt"),
        },
    ];
    const OUTPUTS: &'static [Output] = &[
        Output {
            id: DstBlkId::Ins0,
            offset: 0,
            count: 6,
            label: None,
        },
        Output {
            id: DstBlkId::Aes,
            offset: 6,
            count: 2,
            label: Some("S/PDIF-coax"),
        },
    ];
    // NOTE: The first 4 entries in router section are used to display hardware metering.
    const FIXED: &'static [SrcBlk] = &[
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 2,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 3,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 0,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 1,
        },
    ];
}

/// Protocol implementation for Focusrite Saffire Pro 26.
#[derive(Default, Debug)]
pub struct SPro26Protocol;

impl Tcd22xxSpecification for SPro26Protocol {
    const INPUTS: &'static [Input] = &[
        Input {
            id: SrcBlkId::Ins0,
            offset: 0,
            count: 6,
            label: None,
        },
        Input {
            id: SrcBlkId::Aes,
            offset: 4,
            count: 2,
            label: Some("S/PDIF-coax"),
        },
        // NOTE: share the same optical interface.
        Input {
            id: SrcBlkId::Adat,
            offset: 0,
            count: 8,
            label: None,
        },
        Input {
            id: SrcBlkId::Aes,
            offset: 6,
            count: 2,
            label: Some("S/PDIF-opt"),
        },
    ];
    const OUTPUTS: &'static [Output] = &[
        Output {
            id: DstBlkId::Ins0,
            offset: 0,
            count: 6,
            label: None,
        },
        Output {
            id: DstBlkId::Aes,
            offset: 4,
            count: 2,
            label: Some("S/PDIF-coax"),
        },
        Output {
            id: DstBlkId::Adat,
            offset: 0,
            count: 8,
            label: None,
        },
    ];
    // NOTE: The first 6 entries in router section are used to display hardware metering.
    const FIXED: &'static [SrcBlk] = &[
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 0,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 1,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 2,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 3,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 4,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 5,
        },
    ];
}

/// Protocol implementation for Focusrite Saffire Pro 40.
#[derive(Default, Debug)]
pub struct SPro40Protocol;

impl Tcd22xxSpecification for SPro40Protocol {
    const INPUTS: &'static [Input] = &[
        Input {
            id: SrcBlkId::Ins1,
            offset: 0,
            count: 8,
            label: None,
        },
        Input {
            id: SrcBlkId::Aes,
            offset: 0,
            count: 2,
            label: Some("S/PDIF-coax"),
        },
        // NOTE: share the same optical interface.
        Input {
            id: SrcBlkId::Adat,
            offset: 0,
            count: 8,
            label: None,
        },
        Input {
            id: SrcBlkId::Aes,
            offset: 4,
            count: 2,
            label: Some("S/PDIF-opt"),
        },
    ];
    const OUTPUTS: &'static [Output] = &[
        Output {
            id: DstBlkId::Ins0,
            offset: 0,
            count: 2,
            label: None,
        },
        Output {
            id: DstBlkId::Ins1,
            offset: 0,
            count: 8,
            label: None,
        },
        Output {
            id: DstBlkId::Aes,
            offset: 0,
            count: 2,
            label: Some("S/PDIF-coax"),
        },
        // NOTE: share the same optical interface.
        Output {
            id: DstBlkId::Adat,
            offset: 0,
            count: 8,
            label: None,
        },
        Output {
            id: DstBlkId::Aes,
            offset: 4,
            count: 2,
            label: Some("S/PDIF-opt"),
        },
    ];
    // NOTE: The first 8 entries in router section are used to display hardware metering.
    const FIXED: &'static [SrcBlk] = &[
        SrcBlk {
            id: SrcBlkId::Ins1,
            ch: 0,
        },
        SrcBlk {
            id: SrcBlkId::Ins1,
            ch: 1,
        },
        SrcBlk {
            id: SrcBlkId::Ins1,
            ch: 2,
        },
        SrcBlk {
            id: SrcBlkId::Ins1,
            ch: 3,
        },
        SrcBlk {
            id: SrcBlkId::Ins1,
            ch: 4,
        },
        SrcBlk {
            id: SrcBlkId::Ins1,
            ch: 5,
        },
        SrcBlk {
            id: SrcBlkId::Ins1,
            ch: 6,
        },
        SrcBlk {
            id: SrcBlkId::Ins1,
            ch: 7,
        },
    ];
}

/// Protocol implementation for M-Audio ProFire 2626.
#[derive(Default, Debug)]
pub struct Pfire2626Protocol;

impl Tcd22xxSpecification for Pfire2626Protocol {
    const INPUTS: &'static [Input] = &[
        Input {
            id: SrcBlkId::Ins1,
            offset: 0,
            count: 8,
            label: None,
        },
        Input {
            id: SrcBlkId::Adat,
            offset: 0,
            count: 8,
            label: None,
        },
        Input {
            id: SrcBlkId::Adat,
            offset: 8,
            count: 8,
            label: None,
        },
        Input {
            id: SrcBlkId::Aes,
            offset: 0,
            count: 2,
            label: None,
        },
    ];
    const OUTPUTS: &'static [Output] = &[
        Output {
            id: DstBlkId::Ins1,
            offset: 0,
            count: 8,
            label: None,
        },
        Output {
            id: DstBlkId::Adat,
            offset: 0,
            count: 8,
            label: None,
        },
        Output {
            id: DstBlkId::Adat,
            offset: 8,
            count: 8,
            label: None,
        },
        Output {
            id: DstBlkId::Aes,
            offset: 0,
            count: 2,
            label: None,
        },
    ];
    const FIXED: &'static [SrcBlk] = &[
        SrcBlk {
            id: SrcBlkId::Ins1,
            ch: 0,
        },
        SrcBlk {
            id: SrcBlkId::Ins1,
            ch: 1,
        },
        SrcBlk {
            id: SrcBlkId::Ins1,
            ch: 2,
        },
        SrcBlk {
            id: SrcBlkId::Ins1,
            ch: 3,
        },
        SrcBlk {
            id: SrcBlkId::Ins1,
            ch: 4,
        },
        SrcBlk {
            id: SrcBlkId::Ins1,
            ch: 5,
        },
        SrcBlk {
            id: SrcBlkId::Ins1,
            ch: 6,
        },
        SrcBlk {
            id: SrcBlkId::Ins1,
            ch: 7,
        },
    ];
}

/// Protocol implementation for M-Audio ProFire 610.
#[derive(Default, Debug)]
pub struct Pfire610Protocol;

impl Tcd22xxSpecification for Pfire610Protocol {
    const INPUTS: &'static [Input] = &[
        Input {
            id: SrcBlkId::Ins0,
            offset: 0,
            count: 4,
            label: None,
        },
        Input {
            id: SrcBlkId::Aes,
            offset: 0,
            count: 2,
            label: None,
        },
    ];
    const OUTPUTS: &'static [Output] = &[
        Output {
            id: DstBlkId::Ins0,
            offset: 0,
            count: 8,
            label: None,
        },
        Output {
            id: DstBlkId::Aes,
            offset: 0,
            count: 2,
            label: None,
        },
    ];
    const FIXED: &'static [SrcBlk] = &[
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 0,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 1,
        },
    ];
}

/// Protocol implementation for PreSonus FireStudio Project.
#[derive(Default, Debug)]
pub struct FStudioProjectProtocol;

impl Tcd22xxSpecification for FStudioProjectProtocol {
    const INPUTS: &'static [Input] = &[
        Input {
            id: SrcBlkId::Ins0,
            offset: 0,
            count: 8,
            label: None,
        },
        Input {
            id: SrcBlkId::Aes,
            offset: 2,
            count: 2,
            label: Some("S/PDIF"),
        },
    ];
    const OUTPUTS: &'static [Output] = &[
        Output {
            id: DstBlkId::Ins0,
            offset: 0,
            count: 8,
            label: None,
        },
        Output {
            id: DstBlkId::Aes,
            offset: 2,
            count: 2,
            label: Some("S/PDIF"),
        },
    ];
    const FIXED: &'static [SrcBlk] = &[
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 0,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 1,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 2,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 3,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 4,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 5,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 6,
        },
        SrcBlk {
            id: SrcBlkId::Ins0,
            ch: 7,
        },
    ];
}

/// Known model with TCD22xx.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Tcd22xxModel {
    Mbox3,
    SPro14,
    SPro24,
    SPro26,
    SPro40,
    Pfire2626,
    Pfire610,
    FStudioProject,
}

const MODEL_IDS: &[((u32, u32), Tcd22xxModel)] = &[
    ((0x00a07e, 0x000004), Tcd22xxModel::Mbox3),
    ((0x00130e, 0x000009), Tcd22xxModel::SPro14),
    ((0x00130e, 0x000007), Tcd22xxModel::SPro24),
    ((0x00130e, 0x000012), Tcd22xxModel::SPro26),
    ((0x00130e, 0x000005), Tcd22xxModel::SPro40),
    ((0x000d6c, 0x000010), Tcd22xxModel::Pfire2626),
    ((0x000d6c, 0x000011), Tcd22xxModel::Pfire610),
    ((0x000a92, 0x00000b), Tcd22xxModel::FStudioProject),
];

/// The tables of model and the available blocks derived from them.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Tcd22xxPorts {
    pub inputs: &'static [Input],
    pub outputs: &'static [Output],
    pub fixed: &'static [SrcBlk],
    /// Source blocks for physical inputs at the rate mode.
    pub srcs: Vec<SrcBlk>,
    /// Destination blocks for physical outputs at the rate mode.
    pub dsts: Vec<DstBlk>,
    /// Labels of source blocks.
    pub src_labels: Vec<String>,
    /// Labels of destination blocks.
    pub dst_labels: Vec<String>,
}

fn compute_ports<T: Tcd22xxSpecification>(rate_mode: RateMode) -> Tcd22xxPorts {
    let (srcs, dsts) = T::compute_avail_real_blk_pair(rate_mode);
    let src_labels = srcs.iter().map(|src| T::src_blk_label(src)).collect();
    let dst_labels = dsts.iter().map(|dst| T::dst_blk_label(dst)).collect();
    Tcd22xxPorts {
        inputs: T::INPUTS,
        outputs: T::OUTPUTS,
        fixed: T::FIXED,
        srcs,
        dsts,
        src_labels,
        dst_labels,
    }
}

impl Tcd22xxModel {
    /// Look up the model by vendor and model identifiers in configuration ROM.
    pub fn from_ids(vendor_id: u32, model_id: u32) -> Result<Self, Error> {
        MODEL_IDS
            .iter()
            .find(|(ids, _)| (vendor_id, model_id).eq(ids))
            .map(|&(_, model)| model)
            .ok_or_else(|| {
                let msg = format!(
                    "Unsupported model: vendor 0x{:06x}, model 0x{:06x}",
                    vendor_id, model_id
                );
                Error::new(ErrorKind::Unsupported, &msg)
            })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mbox3 => "Mbox 3 Pro",
            Self::SPro14 => "Saffire Pro 14",
            Self::SPro24 => "Saffire Pro 24",
            Self::SPro26 => "Saffire Pro 26",
            Self::SPro40 => "Saffire Pro 40",
            Self::Pfire2626 => "ProFire 2626",
            Self::Pfire610 => "ProFire 610",
            Self::FStudioProject => "FireStudio Project",
        }
    }

    /// Compute the ports of model at the rate mode.
    pub fn ports(&self, rate_mode: RateMode) -> Tcd22xxPorts {
        match self {
            Self::Mbox3 => compute_ports::<Mbox3Protocol>(rate_mode),
            Self::SPro14 => compute_ports::<SPro14Protocol>(rate_mode),
            Self::SPro24 => compute_ports::<SPro24Protocol>(rate_mode),
            Self::SPro26 => compute_ports::<SPro26Protocol>(rate_mode),
            Self::SPro40 => compute_ports::<SPro40Protocol>(rate_mode),
            Self::Pfire2626 => compute_ports::<Pfire2626Protocol>(rate_mode),
            Self::Pfire610 => compute_ports::<Pfire610Protocol>(rate_mode),
            Self::FStudioProject => compute_ports::<FStudioProjectProtocol>(rate_mode),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn blk_byte() {
        let src = SrcBlk::from(0x43);
        assert_eq!(
            src,
            SrcBlk {
                id: SrcBlkId::Ins0,
                ch: 3
            }
        );
        assert_eq!(u8::from(src), 0x43);

        let dst = DstBlk::from(0x85);
        assert_eq!(
            dst,
            DstBlk {
                id: DstBlkId::Reserved(0x08),
                ch: 5
            }
        );
        assert_eq!(u8::from(dst), 0x85);
        assert_eq!(SrcBlk::from(0xf0).id, SrcBlkId::Mute);
    }

    #[test]
    fn model_lookup() {
        assert_eq!(
            Tcd22xxModel::from_ids(0x00130e, 0x000005).unwrap(),
            Tcd22xxModel::SPro40
        );
        assert_eq!(
            Tcd22xxModel::from_ids(0x000a92, 0x00000b).unwrap(),
            Tcd22xxModel::FStudioProject
        );
        let err = Tcd22xxModel::from_ids(0x000166, 0x000020).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn adat_channels_by_rate_mode() {
        let (srcs, dsts) = SPro26Protocol::compute_avail_real_blk_pair(RateMode::Low);
        assert_eq!(srcs.len(), 6 + 2 + 8 + 2);
        assert_eq!(dsts.len(), 6 + 2 + 8);

        let (srcs, dsts) = SPro26Protocol::compute_avail_real_blk_pair(RateMode::High);
        assert_eq!(srcs.len(), 6 + 2 + 2 + 2);
        assert_eq!(dsts.len(), 6 + 2 + 2);

        // The second ADAT input starts after the first one.
        let (srcs, _) = Pfire2626Protocol::compute_avail_real_blk_pair(RateMode::Middle);
        let adat: Vec<u8> = srcs
            .iter()
            .filter(|s| s.id == SrcBlkId::Adat)
            .map(|s| s.ch)
            .collect();
        assert_eq!(adat, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn port_labels() {
        let ports = Tcd22xxModel::SPro24.ports(RateMode::Low);
        assert_eq!(ports.src_labels[0], "Mic-0");
        assert_eq!(ports.src_labels[2], "Line-0");
        assert_eq!(ports.src_labels[4], "S/PDIF-coax-0");
        assert_eq!(ports.src_labels[6], "ADAT-0");
        assert_eq!(ports.dst_labels[0], "Analog-A-0");
        assert_eq!(ports.fixed.len(), 4);
    }

    #[test]
    fn fixed_entries_in_head() {
        let srcs = vec![
            SrcBlk {
                id: SrcBlkId::Ins0,
                ch: 0,
            },
            SrcBlk {
                id: SrcBlkId::Ins0,
                ch: 1,
            },
            SrcBlk {
                id: SrcBlkId::Aes,
                ch: 6,
            },
        ];
        let dsts = vec![
            DstBlk {
                id: DstBlkId::Ins0,
                ch: 0,
            },
            DstBlk {
                id: DstBlkId::Ins0,
                ch: 1,
            },
        ];
        let mut entries = vec![
            RouterEntry {
                dst: dsts[0],
                src: srcs[2],
            },
            RouterEntry {
                dst: dsts[1],
                src: srcs[1],
            },
            RouterEntry {
                dst: DstBlk {
                    id: DstBlkId::Avs0,
                    ch: 0,
                },
                src: srcs[0],
            },
        ];
        SPro14Protocol::refine_router_entries(&mut entries, &srcs, &dsts);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].src, srcs[0]);
        assert_eq!(entries[0].dst.id, DstBlkId::Reserved(0xff));
        assert_eq!(entries[1].src, srcs[1]);
        assert_eq!(entries[2].src, srcs[2]);
    }
}
