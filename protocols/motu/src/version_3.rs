// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2021 Takashi Sakamoto

//! Protocol used in version 3 devices of MOTU FireWire series.
//!
//! The modules includes structure, enumeration, and trait and its implementation for protocol
//! used in version 3 devices of Mark of the Unicorn FireWire series.

use super::*;

// 0x'ffff'f000'0b14: configuration for sampling clock.
//  0x0000ff00: nominal rate of sampling clock.
//  0x000000ff: source of sampling clock.
//    0x00000000: internal
//    0x00000001: word clock on BNC
//    0x00000010: S/PDIF on coaxial interface
//    0x00000018: any signal on optical interface A
//    0x00000019: any signal on optical interface B
//
// 0x'ffff'f000'0c94: configuration for optical interfaces.
//  0x00400000: output B is not for ADAT.
//  0x00100000: input B is not for ADAT.
//  0x00040000: output A is not for ADAT.
//  0x00010000: input A is not for ADAT.
//  0x00000200: output B is enabled.
//  0x00000100: output A is enabled.
//  0x00000002: input B is enabled.
//  0x00000001: input A is enabled.

const CLK_OFFSET: u64 = 0x0b14;

const CLK_RATE_LABEL: &str = "clock-rate-v3";
const CLK_RATE_MASK: u32 = 0x0000ff00;
const CLK_RATE_SHIFT: usize = 8;

const CLK_SRC_LABEL: &str = "clock-source-v3";
const CLK_SRC_MASK: u32 = 0x000000ff;
const CLK_SRC_SHIFT: usize = 0;

const CLK_SRC_INTERNAL: u8 = 0x00;
const CLK_SRC_WORD_CLK: u8 = 0x01;
const CLK_SRC_SPDIF_COAX: u8 = 0x10;
const CLK_SRC_SIGNAL_OPT_A: u8 = 0x18;
const CLK_SRC_SIGNAL_OPT_B: u8 = 0x19;

const OPT_OFFSET: u64 = 0x0c94;

/// The trait for specification of version 3 devices.
pub trait MotuVersion3Specification {
    const SAMPLING_RATES: &'static [u32];
    const OPT_IFACE_INDEXES: &'static [OptIfaceIndex] = &[OptIfaceIndex::A, OptIfaceIndex::B];
}

/// The protocol implementation for 828mk3.
#[derive(Default, Debug)]
pub struct F828mk3Protocol;

impl MotuVersion3Specification for F828mk3Protocol {
    const SAMPLING_RATES: &'static [u32] = &[44100, 48000, 88200, 96000, 176400, 192000];
}

fn get_opt_iface_masks(direction: OptIfaceDirection, index: OptIfaceIndex) -> (u32, u32) {
    let is_out = direction == OptIfaceDirection::Output;
    let is_b = index == OptIfaceIndex::B;

    let mut enabled_mask = 0x00000001;
    if is_out {
        enabled_mask <<= 8;
    }
    if is_b {
        enabled_mask <<= 1;
    }

    let mut no_adat_mask = 0x00010000;
    if is_out {
        no_adat_mask <<= 2;
    }
    if is_b {
        no_adat_mask <<= 4;
    }

    (enabled_mask, no_adat_mask)
}

fn serialize_opt_iface_mode(
    mode: OptIfaceMode,
    quad: &mut u32,
    direction: OptIfaceDirection,
    index: OptIfaceIndex,
) {
    let (enabled_mask, no_adat_mask) = get_opt_iface_masks(direction, index);
    *quad &= !(enabled_mask | no_adat_mask);
    match mode {
        OptIfaceMode::None => {}
        OptIfaceMode::Adat => *quad |= enabled_mask,
        OptIfaceMode::Spdif => *quad |= enabled_mask | no_adat_mask,
    }
}

fn deserialize_opt_iface_mode(
    quad: u32,
    direction: OptIfaceDirection,
    index: OptIfaceIndex,
) -> OptIfaceMode {
    let (enabled_mask, no_adat_mask) = get_opt_iface_masks(direction, index);
    match (quad & enabled_mask > 0, quad & no_adat_mask > 0) {
        (false, _) => OptIfaceMode::None,
        (true, false) => OptIfaceMode::Adat,
        (true, true) => OptIfaceMode::Spdif,
    }
}

fn opt_signal_source(mode: OptIfaceMode, index: OptIfaceIndex) -> Option<MotuClockSource> {
    match (mode, index) {
        (OptIfaceMode::Adat, OptIfaceIndex::A) => Some(MotuClockSource::AdatOnOptA),
        (OptIfaceMode::Adat, OptIfaceIndex::B) => Some(MotuClockSource::AdatOnOptB),
        (OptIfaceMode::Spdif, OptIfaceIndex::A) => Some(MotuClockSource::SpdifOnOptA),
        (OptIfaceMode::Spdif, OptIfaceIndex::B) => Some(MotuClockSource::SpdifOnOptB),
        (OptIfaceMode::None, _) => None,
    }
}

/// The trait for operations of version 3 devices.
pub trait MotuVersion3Operation: MotuVersion3Specification {
    fn get_sampling_rate(node: &dyn BusTransport, timeout_ms: u32) -> Result<u32, Error> {
        let quad = read_quad(node, CLK_OFFSET, timeout_ms)?;
        let idx = ((quad & CLK_RATE_MASK) >> CLK_RATE_SHIFT) as usize;
        Self::SAMPLING_RATES.iter().nth(idx).copied().ok_or_else(|| {
            let msg = format!("Invalid value for {}: 0x{:08x}", CLK_RATE_LABEL, quad);
            Error::new(ErrorKind::Protocol, &msg)
        })
    }

    fn set_sampling_rate(node: &dyn BusTransport, rate: u32, timeout_ms: u32) -> Result<(), Error> {
        let idx = Self::SAMPLING_RATES
            .iter()
            .position(|&r| r == rate)
            .ok_or_else(|| {
                let msg = format!("Sampling rate is not available: {}", rate);
                Error::new(ErrorKind::Argument, &msg)
            })?;

        let mut quad = read_quad(node, CLK_OFFSET, timeout_ms)?;
        quad &= !CLK_RATE_MASK;
        quad |= ((idx as u32) << CLK_RATE_SHIFT) & CLK_RATE_MASK;
        write_quad(node, CLK_OFFSET, quad, timeout_ms)
    }

    /// The sources available in current mode of optical input interfaces. S/PDIF on coaxial
    /// interface is not available when any optical input interface is for ADAT.
    fn supported_clock_sources(
        node: &dyn BusTransport,
        timeout_ms: u32,
    ) -> Result<Vec<MotuClockSource>, Error> {
        let quad = read_quad(node, OPT_OFFSET, timeout_ms)?;
        let modes: Vec<(OptIfaceIndex, OptIfaceMode)> = Self::OPT_IFACE_INDEXES
            .iter()
            .map(|&index| {
                let mode = deserialize_opt_iface_mode(quad, OptIfaceDirection::Input, index);
                (index, mode)
            })
            .collect();

        let mut srcs = vec![MotuClockSource::Internal, MotuClockSource::WordOnBnc];
        if modes.iter().all(|(_, mode)| *mode != OptIfaceMode::Adat) {
            srcs.push(MotuClockSource::SpdifOnCoax);
        }
        modes
            .iter()
            .filter_map(|&(index, mode)| opt_signal_source(mode, index))
            .for_each(|src| srcs.push(src));

        Ok(srcs)
    }

    fn get_clock_source(node: &dyn BusTransport, timeout_ms: u32) -> Result<MotuClockSource, Error> {
        let quad = read_quad(node, CLK_OFFSET, timeout_ms)?;
        let val = ((quad & CLK_SRC_MASK) >> CLK_SRC_SHIFT) as u8;

        let index = match val {
            CLK_SRC_INTERNAL => return Ok(MotuClockSource::Internal),
            CLK_SRC_WORD_CLK => return Ok(MotuClockSource::WordOnBnc),
            CLK_SRC_SPDIF_COAX => return Ok(MotuClockSource::SpdifOnCoax),
            CLK_SRC_SIGNAL_OPT_A => OptIfaceIndex::A,
            CLK_SRC_SIGNAL_OPT_B => OptIfaceIndex::B,
            _ => {
                let msg = format!("Invalid value for {}: 0x{:08x}", CLK_SRC_LABEL, quad);
                Err(Error::new(ErrorKind::Protocol, &msg))?
            }
        };

        let opt = read_quad(node, OPT_OFFSET, timeout_ms)?;
        let mode = deserialize_opt_iface_mode(opt, OptIfaceDirection::Input, index);
        opt_signal_source(mode, index).ok_or_else(|| {
            let msg = format!(
                "Optical input interface {} is disabled for source of sampling clock",
                index.label()
            );
            Error::new(ErrorKind::Protocol, &msg)
        })
    }

    fn set_clock_source(
        node: &dyn BusTransport,
        src: MotuClockSource,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let srcs = Self::supported_clock_sources(node, timeout_ms)?;
        check_clock_source(&srcs, src)?;

        let val = match src {
            MotuClockSource::WordOnBnc => CLK_SRC_WORD_CLK,
            MotuClockSource::SpdifOnCoax => CLK_SRC_SPDIF_COAX,
            MotuClockSource::AdatOnOptA | MotuClockSource::SpdifOnOptA => CLK_SRC_SIGNAL_OPT_A,
            MotuClockSource::AdatOnOptB | MotuClockSource::SpdifOnOptB => CLK_SRC_SIGNAL_OPT_B,
            _ => CLK_SRC_INTERNAL,
        };

        let mut quad = read_quad(node, CLK_OFFSET, timeout_ms)?;
        quad &= !CLK_SRC_MASK;
        quad |= ((val as u32) << CLK_SRC_SHIFT) & CLK_SRC_MASK;
        write_quad(node, CLK_OFFSET, quad, timeout_ms)
    }

    fn get_opt_iface_mode(
        node: &dyn BusTransport,
        direction: OptIfaceDirection,
        index: OptIfaceIndex,
        timeout_ms: u32,
    ) -> Result<OptIfaceMode, Error> {
        check_opt_iface_index(Self::OPT_IFACE_INDEXES, index)?;
        let quad = read_quad(node, OPT_OFFSET, timeout_ms)?;
        Ok(deserialize_opt_iface_mode(quad, direction, index))
    }

    fn set_opt_iface_mode(
        node: &dyn BusTransport,
        direction: OptIfaceDirection,
        index: OptIfaceIndex,
        mode: OptIfaceMode,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        check_opt_iface_index(Self::OPT_IFACE_INDEXES, index)?;
        let mut quad = read_quad(node, OPT_OFFSET, timeout_ms)?;
        serialize_opt_iface_mode(mode, &mut quad, direction, index);
        write_quad(node, OPT_OFFSET, quad, timeout_ms)
    }
}

impl<O: MotuVersion3Specification> MotuVersion3Operation for O {}
