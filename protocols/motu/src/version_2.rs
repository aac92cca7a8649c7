// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2021 Takashi Sakamoto

//! Protocol used in version 2 devices of MOTU FireWire series.
//!
//! The modules includes structure, enumeration, and trait and its implementation for protocol
//! used in version 2 devices of Mark of the Unicorn FireWire series.

use super::*;

// 0x'ffff'f000'0b14: configuration for sampling clock.
//  0x00000038: nominal rate of sampling clock.
//  0x00000007: source of sampling clock.
//
// 0x'ffff'f000'0c04: configuration for optical interfaces.
//  0x00000c00: mode of optical output interface.
//  0x00000300: mode of optical input interface.
//    0x00000000: disabled.
//    0x00000001: for ADAT signal.
//    0x00000002: for S/PDIF signal.

const CLK_OFFSET: u64 = 0x0b14;

const CLK_RATE_LABEL: &str = "clock-rate-v2";
const CLK_RATE_MASK: u32 = 0x00000038;
const CLK_RATE_SHIFT: usize = 3;

const CLK_SRC_LABEL: &str = "clock-source-v2";
const CLK_SRC_MASK: u32 = 0x00000007;
const CLK_SRC_SHIFT: usize = 0;

const CLK_SRC_INTERNAL: u8 = 0x00;
const CLK_SRC_SIGNAL_OPT: u8 = 0x01;
const CLK_SRC_SPDIF_COAX: u8 = 0x02;
const CLK_SRC_WORD_CLK: u8 = 0x04;
const CLK_SRC_ADAT_DSUB: u8 = 0x05;

const OPT_OFFSET: u64 = 0x0c04;

const OPT_IN_IFACE_LABEL: &str = "optical-input-iface-v2";
const OPT_IN_IFACE_MASK: u32 = 0x00000300;
const OPT_IN_IFACE_SHIFT: usize = 8;

const OPT_OUT_IFACE_LABEL: &str = "optical-output-iface-v2";
const OPT_OUT_IFACE_MASK: u32 = 0x00000c00;
const OPT_OUT_IFACE_SHIFT: usize = 10;

// The raw values for ADAT and S/PDIF are swapped against the order of modes.
const OPT_IFACE_MODE_VALS: &[u8] = &[0x00, 0x02, 0x01];

/// The trait for specification of version 2 devices.
pub trait MotuVersion2Specification {
    const SAMPLING_RATES: &'static [u32];
    const CLOCK_SOURCES: &'static [MotuClockSource];
    const OPT_IFACE_INDEXES: &'static [OptIfaceIndex] = &[OptIfaceIndex::A];
}

/// The protocol implementation for 828mk2.
#[derive(Default, Debug)]
pub struct F828mk2Protocol;

impl MotuVersion2Specification for F828mk2Protocol {
    const SAMPLING_RATES: &'static [u32] = &[44100, 48000, 88200, 96000];
    const CLOCK_SOURCES: &'static [MotuClockSource] = &[
        MotuClockSource::Internal,
        MotuClockSource::AdatOnOpt,
        MotuClockSource::SpdifOnOpt,
        MotuClockSource::SpdifOnCoax,
        MotuClockSource::WordOnBnc,
        MotuClockSource::AdatOnDsub,
    ];
}

fn opt_iface_field(direction: OptIfaceDirection) -> (u32, usize, &'static str) {
    match direction {
        OptIfaceDirection::Input => (OPT_IN_IFACE_MASK, OPT_IN_IFACE_SHIFT, OPT_IN_IFACE_LABEL),
        OptIfaceDirection::Output => {
            (OPT_OUT_IFACE_MASK, OPT_OUT_IFACE_SHIFT, OPT_OUT_IFACE_LABEL)
        }
    }
}

fn deserialize_opt_iface_mode(quad: u32, direction: OptIfaceDirection) -> Result<OptIfaceMode, Error> {
    let (mask, shift, label) = opt_iface_field(direction);
    let mut mode = OptIfaceMode::default();
    deserialize_flag(
        &mut mode,
        &quad,
        mask,
        shift,
        OPT_IFACE_MODES,
        OPT_IFACE_MODE_VALS,
        label,
    )
    .map(|_| mode)
}

/// The trait for operations of version 2 devices.
pub trait MotuVersion2Operation: MotuVersion2Specification {
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

    /// The signal on optical interface is distinguished by current mode of optical input
    /// interface.
    fn get_clock_source(node: &dyn BusTransport, timeout_ms: u32) -> Result<MotuClockSource, Error> {
        let quad = read_quad(node, CLK_OFFSET, timeout_ms)?;
        let val = ((quad & CLK_SRC_MASK) >> CLK_SRC_SHIFT) as u8;

        let src = match val {
            CLK_SRC_INTERNAL => MotuClockSource::Internal,
            CLK_SRC_SPDIF_COAX => MotuClockSource::SpdifOnCoax,
            CLK_SRC_WORD_CLK => MotuClockSource::WordOnBnc,
            CLK_SRC_ADAT_DSUB => MotuClockSource::AdatOnDsub,
            CLK_SRC_SIGNAL_OPT => {
                let opt = read_quad(node, OPT_OFFSET, timeout_ms)?;
                match deserialize_opt_iface_mode(opt, OptIfaceDirection::Input)? {
                    OptIfaceMode::Adat => MotuClockSource::AdatOnOpt,
                    OptIfaceMode::Spdif => MotuClockSource::SpdifOnOpt,
                    OptIfaceMode::None => {
                        let msg = "Optical input interface is disabled for source of sampling clock";
                        Err(Error::new(ErrorKind::Protocol, msg))?
                    }
                }
            }
            _ => {
                let msg = format!("Invalid value for {}: 0x{:08x}", CLK_SRC_LABEL, quad);
                Err(Error::new(ErrorKind::Protocol, &msg))?
            }
        };
        Ok(src)
    }

    fn set_clock_source(
        node: &dyn BusTransport,
        src: MotuClockSource,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        check_clock_source(Self::CLOCK_SOURCES, src)?;

        let val = match src {
            MotuClockSource::SpdifOnCoax => CLK_SRC_SPDIF_COAX,
            MotuClockSource::WordOnBnc => CLK_SRC_WORD_CLK,
            MotuClockSource::AdatOnDsub => CLK_SRC_ADAT_DSUB,
            MotuClockSource::AdatOnOpt | MotuClockSource::SpdifOnOpt => {
                let opt = read_quad(node, OPT_OFFSET, timeout_ms)?;
                let mode = deserialize_opt_iface_mode(opt, OptIfaceDirection::Input)?;
                let expected = if src == MotuClockSource::AdatOnOpt {
                    OptIfaceMode::Adat
                } else {
                    OptIfaceMode::Spdif
                };
                if mode != expected {
                    let msg = format!(
                        "{} is not available in current mode of optical input interface",
                        src
                    );
                    Err(Error::new(ErrorKind::Argument, &msg))?;
                }
                CLK_SRC_SIGNAL_OPT
            }
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
        deserialize_opt_iface_mode(quad, direction)
    }

    fn set_opt_iface_mode(
        node: &dyn BusTransport,
        direction: OptIfaceDirection,
        index: OptIfaceIndex,
        mode: OptIfaceMode,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        check_opt_iface_index(Self::OPT_IFACE_INDEXES, index)?;

        let (mask, shift, label) = opt_iface_field(direction);
        let mut quad = read_quad(node, OPT_OFFSET, timeout_ms)?;
        serialize_flag(
            &mode,
            &mut quad,
            mask,
            shift,
            OPT_IFACE_MODES,
            OPT_IFACE_MODE_VALS,
            label,
        )?;
        write_quad(node, OPT_OFFSET, quad, timeout_ms)?;

        update_packet_format(node, direction, mode, timeout_ms)
    }
}

impl<O: MotuVersion2Specification> MotuVersion2Operation for O {}

#[cfg(test)]
mod test {
    use {super::*, firewire_protocols_core::mock::MockNode};

    const CLK_ADDR: u64 = BASE_OFFSET + CLK_OFFSET;
    const OPT_ADDR: u64 = BASE_OFFSET + OPT_OFFSET;
    const PACKET_FORMAT_ADDR: u64 = BASE_OFFSET + PACKET_FORMAT_OFFSET;

    #[test]
    fn clock_source_adat_on_dsub() {
        let node = MockNode::default();
        node.set_quadlet(CLK_ADDR, 0x00000000);

        F828mk2Protocol::set_clock_source(&node, MotuClockSource::AdatOnDsub, 100).unwrap();
        assert_eq!(node.quadlet_writes(CLK_ADDR), vec![0x00000005]);

        let src = F828mk2Protocol::get_clock_source(&node, 100).unwrap();
        assert_eq!(src, MotuClockSource::AdatOnDsub);
        assert_eq!(src.to_string(), "ADAT on Dsub-9pin interface");
    }

    #[test]
    fn clock_source_on_optical_interface() {
        let node = MockNode::default();

        let err = F828mk2Protocol::set_clock_source(&node, MotuClockSource::AdatOnOpt, 100)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);

        node.set_quadlet(OPT_ADDR, 0x00000100);
        F828mk2Protocol::set_clock_source(&node, MotuClockSource::AdatOnOpt, 100).unwrap();
        assert_eq!(node.quadlet(CLK_ADDR), 0x00000001);
        assert_eq!(
            F828mk2Protocol::get_clock_source(&node, 100).unwrap(),
            MotuClockSource::AdatOnOpt
        );

        node.set_quadlet(OPT_ADDR, 0x00000200);
        assert_eq!(
            F828mk2Protocol::get_clock_source(&node, 100).unwrap(),
            MotuClockSource::SpdifOnOpt
        );

        node.set_quadlet(OPT_ADDR, 0x00000000);
        let err = F828mk2Protocol::get_clock_source(&node, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        node.set_quadlet(CLK_ADDR, 0x00000003);
        let err = F828mk2Protocol::get_clock_source(&node, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn rate_round_trip() {
        let node = MockNode::default();
        node.set_quadlet(CLK_ADDR, 0x00000004);

        F828mk2Protocol::SAMPLING_RATES.iter().for_each(|&rate| {
            F828mk2Protocol::set_sampling_rate(&node, rate, 100).unwrap();
            assert_eq!(F828mk2Protocol::get_sampling_rate(&node, 100).unwrap(), rate);
        });
        assert_eq!(node.quadlet(CLK_ADDR), 0x0000001c);

        let err = F828mk2Protocol::set_sampling_rate(&node, 192000, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);

        node.set_quadlet(CLK_ADDR, 0x00000020);
        let err = F828mk2Protocol::get_sampling_rate(&node, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn opt_iface_mode_round_trip() {
        let node = MockNode::default();
        OPT_IFACE_DIRECTIONS.iter().for_each(|&direction| {
            let mask = packet_format_mask(direction);
            OPT_IFACE_MODES.iter().for_each(|&mode| {
                F828mk2Protocol::set_opt_iface_mode(&node, direction, OptIfaceIndex::A, mode, 100)
                    .unwrap();
                assert_eq!(
                    F828mk2Protocol::get_opt_iface_mode(&node, direction, OptIfaceIndex::A, 100)
                        .unwrap(),
                    mode
                );
                let packet = node.quadlet(PACKET_FORMAT_ADDR);
                assert_eq!(packet & mask > 0, mode != OptIfaceMode::Adat);
            });
        });
        // ADAT on both directions.
        assert_eq!(node.quadlet(OPT_ADDR), 0x00000500);
    }

    #[test]
    fn opt_iface_raw_values_are_swapped() {
        let node = MockNode::default();
        F828mk2Protocol::set_opt_iface_mode(
            &node,
            OptIfaceDirection::Output,
            OptIfaceIndex::A,
            OptIfaceMode::Spdif,
            100,
        )
        .unwrap();
        assert_eq!(node.quadlet(OPT_ADDR), 0x00000800);

        node.set_quadlet(OPT_ADDR, 0x00000300);
        let err = F828mk2Protocol::get_opt_iface_mode(
            &node,
            OptIfaceDirection::Input,
            OptIfaceIndex::A,
            100,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}
