// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2021 Takashi Sakamoto

//! Protocol used in version 1 devices of MOTU FireWire series.
//!
//! The modules includes structure, enumeration, and trait and its implementation for protocol
//! used in version 1 devices of Mark of the Unicorn FireWire series.

use super::*;

// 0x'ffff'f000'0b00: configuration for sampling clock and digital interfaces.
//
//  0xffff0000: communication control. ALSA firewire-motu driver changes it.
//  0x00008000: mode of optical input interface.
//    0x00008000: for S/PDIF signal.
//    0x00000000: disabled or for ADAT signal.
//  0x00004000: mode of optical output interface.
//    0x00004000: for S/PDIF signal.
//    0x00000000: disabled or for ADAT signal.
//  0x00000008: rate of sampling clock is doubled.
//  0x00000004: family of rate of sampling clock.
//    0x00000004: 48.0 kHz
//    0x00000000: 44.1 kHz
//  0x00000023: source of sampling clock.
//    0x00000020: word clock on BNC (896 only)
//    0x00000002: S/PDIF on optical/coaxial interface.
//    0x00000021: ADAT on optical interface
//    0x00000001: ADAT on Dsub 9pin
//    0x00000000: internal
//
// 0x'ffff'f000'0b10: format of isochronous packet.
//  0x00000080: data blocks for optical input interface are excluded.
//  0x00000040: data blocks for optical output interface are excluded.

const CONF_OFFSET: u64 = 0x0b00;

const CONF_OPT_IN_IFACE_SPDIF_MASK: u32 = 0x00008000;
const CONF_OPT_OUT_IFACE_SPDIF_MASK: u32 = 0x00004000;

const CONF_RATE_DOUBLE_MASK: u32 = 0x00000008;
const CONF_RATE_48000_FAMILY_MASK: u32 = 0x00000004;

const CONF_CLK_SRC_ADAT_MASK: u32 = 0x00000001;
const CONF_CLK_SRC_SPDIF_MASK: u32 = 0x00000002;
const CONF_CLK_SRC_OPT_OR_WORD_MASK: u32 = 0x00000020;
const CONF_CLK_SRC_MASK: u32 =
    CONF_CLK_SRC_ADAT_MASK | CONF_CLK_SRC_SPDIF_MASK | CONF_CLK_SRC_OPT_OR_WORD_MASK;

/// The trait for specification of version 1 devices.
pub trait MotuVersion1Specification {
    const SAMPLING_RATES: &'static [u32];
    const CLOCK_SOURCES: &'static [MotuClockSource];
    const OPT_IFACE_INDEXES: &'static [OptIfaceIndex] = &[OptIfaceIndex::A];
}

/// The protocol implementation for 828.
#[derive(Default, Debug)]
pub struct F828Protocol;

impl MotuVersion1Specification for F828Protocol {
    const SAMPLING_RATES: &'static [u32] = &[44100, 48000];
    const CLOCK_SOURCES: &'static [MotuClockSource] = &[
        MotuClockSource::Internal,
        MotuClockSource::SpdifOnCoax,
        MotuClockSource::SpdifOnOpt,
        MotuClockSource::AdatOnDsub,
        MotuClockSource::AdatOnOpt,
    ];
}

/// The protocol implementation for 896.
#[derive(Default, Debug)]
pub struct F896Protocol;

impl MotuVersion1Specification for F896Protocol {
    const SAMPLING_RATES: &'static [u32] = &[44100, 48000, 88200, 96000];
    const CLOCK_SOURCES: &'static [MotuClockSource] = &[
        MotuClockSource::Internal,
        MotuClockSource::WordOnBnc,
        MotuClockSource::SpdifOnCoax,
        MotuClockSource::SpdifOnOpt,
        MotuClockSource::AdatOnDsub,
        MotuClockSource::AdatOnOpt,
    ];
}

fn opt_iface_spdif_mask(direction: OptIfaceDirection) -> u32 {
    match direction {
        OptIfaceDirection::Input => CONF_OPT_IN_IFACE_SPDIF_MASK,
        OptIfaceDirection::Output => CONF_OPT_OUT_IFACE_SPDIF_MASK,
    }
}

/// The trait for operations of version 1 devices.
pub trait MotuVersion1Operation: MotuVersion1Specification {
    fn get_sampling_rate(node: &dyn BusTransport, timeout_ms: u32) -> Result<u32, Error> {
        let quad = read_quad(node, CONF_OFFSET, timeout_ms)?;
        let mut rate = if quad & CONF_RATE_48000_FAMILY_MASK > 0 {
            48000
        } else {
            44100
        };
        if quad & CONF_RATE_DOUBLE_MASK > 0 {
            rate *= 2;
        }
        Ok(rate)
    }

    fn set_sampling_rate(node: &dyn BusTransport, rate: u32, timeout_ms: u32) -> Result<(), Error> {
        check_sampling_rate(Self::SAMPLING_RATES, rate)?;

        let mut quad = read_quad(node, CONF_OFFSET, timeout_ms)?;
        quad &= !(CONF_RATE_48000_FAMILY_MASK | CONF_RATE_DOUBLE_MASK);
        if rate % 48000 == 0 {
            quad |= CONF_RATE_48000_FAMILY_MASK;
        }
        if rate > 48000 {
            quad |= CONF_RATE_DOUBLE_MASK;
        }
        write_quad(node, CONF_OFFSET, quad, timeout_ms)
    }

    /// The source is detected in order of ADAT, S/PDIF, and the others. S/PDIF on optical
    /// interface is distinguished from the one on coaxial interface by mode of optical input
    /// interface.
    fn get_clock_source(node: &dyn BusTransport, timeout_ms: u32) -> Result<MotuClockSource, Error> {
        let quad = read_quad(node, CONF_OFFSET, timeout_ms)?;

        let src = if quad & CONF_CLK_SRC_ADAT_MASK > 0 {
            if quad & CONF_CLK_SRC_OPT_OR_WORD_MASK > 0 {
                MotuClockSource::AdatOnOpt
            } else {
                MotuClockSource::AdatOnDsub
            }
        } else if quad & CONF_CLK_SRC_SPDIF_MASK > 0 {
            if quad & CONF_OPT_IN_IFACE_SPDIF_MASK > 0 {
                MotuClockSource::SpdifOnOpt
            } else {
                MotuClockSource::SpdifOnCoax
            }
        } else if quad & CONF_CLK_SRC_OPT_OR_WORD_MASK > 0 {
            MotuClockSource::WordOnBnc
        } else {
            MotuClockSource::Internal
        };

        if Self::CLOCK_SOURCES.iter().any(|s| src.eq(s)) {
            Ok(src)
        } else {
            let msg = format!("Unexpected value for source of sampling clock: 0x{:08x}", quad);
            Err(Error::new(ErrorKind::Protocol, &msg))
        }
    }

    /// S/PDIF on coaxial interface is not available when optical input interface is for S/PDIF,
    /// and vice versa.
    fn set_clock_source(
        node: &dyn BusTransport,
        src: MotuClockSource,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        check_clock_source(Self::CLOCK_SOURCES, src)?;

        let mut quad = read_quad(node, CONF_OFFSET, timeout_ms)?;
        let opt_is_spdif = quad & CONF_OPT_IN_IFACE_SPDIF_MASK > 0;

        let val = match src {
            MotuClockSource::AdatOnDsub => CONF_CLK_SRC_ADAT_MASK,
            MotuClockSource::AdatOnOpt => CONF_CLK_SRC_ADAT_MASK | CONF_CLK_SRC_OPT_OR_WORD_MASK,
            MotuClockSource::WordOnBnc => CONF_CLK_SRC_OPT_OR_WORD_MASK,
            MotuClockSource::SpdifOnCoax if !opt_is_spdif => CONF_CLK_SRC_SPDIF_MASK,
            MotuClockSource::SpdifOnOpt if opt_is_spdif => CONF_CLK_SRC_SPDIF_MASK,
            MotuClockSource::SpdifOnCoax | MotuClockSource::SpdifOnOpt => {
                let msg = format!(
                    "{} is not available in current mode of optical input interface",
                    src
                );
                Err(Error::new(ErrorKind::Argument, &msg))?
            }
            _ => 0,
        };

        quad &= !CONF_CLK_SRC_MASK;
        quad |= val;
        write_quad(node, CONF_OFFSET, quad, timeout_ms)
    }

    fn get_opt_iface_mode(
        node: &dyn BusTransport,
        direction: OptIfaceDirection,
        index: OptIfaceIndex,
        timeout_ms: u32,
    ) -> Result<OptIfaceMode, Error> {
        check_opt_iface_index(Self::OPT_IFACE_INDEXES, index)?;

        let packet = read_quad(node, PACKET_FORMAT_OFFSET, timeout_ms)?;
        if packet & packet_format_mask(direction) == 0 {
            return Ok(OptIfaceMode::Adat);
        }

        let quad = read_quad(node, CONF_OFFSET, timeout_ms)?;
        let mode = if quad & opt_iface_spdif_mask(direction) > 0 {
            OptIfaceMode::Spdif
        } else {
            OptIfaceMode::None
        };
        Ok(mode)
    }

    fn set_opt_iface_mode(
        node: &dyn BusTransport,
        direction: OptIfaceDirection,
        index: OptIfaceIndex,
        mode: OptIfaceMode,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        check_opt_iface_index(Self::OPT_IFACE_INDEXES, index)?;

        let mask = opt_iface_spdif_mask(direction);
        let mut quad = read_quad(node, CONF_OFFSET, timeout_ms)?;
        quad &= !mask;
        if mode == OptIfaceMode::Spdif {
            quad |= mask;
        }
        write_quad(node, CONF_OFFSET, quad, timeout_ms)?;

        update_packet_format(node, direction, mode, timeout_ms)
    }
}

impl<O: MotuVersion1Specification> MotuVersion1Operation for O {}

#[cfg(test)]
mod test {
    use {super::*, firewire_protocols_core::mock::MockNode};

    const CONF_ADDR: u64 = BASE_OFFSET + CONF_OFFSET;
    const PACKET_FORMAT_ADDR: u64 = BASE_OFFSET + PACKET_FORMAT_OFFSET;

    #[test]
    fn f828_rate_round_trip() {
        let node = MockNode::default();
        node.set_quadlet(CONF_ADDR, 0x00000000);

        F828Protocol::set_sampling_rate(&node, 48000, 100).unwrap();
        assert_eq!(node.quadlet_writes(CONF_ADDR), vec![0x00000004]);
        assert_eq!(F828Protocol::get_sampling_rate(&node, 100).unwrap(), 48000);

        F828Protocol::set_sampling_rate(&node, 44100, 100).unwrap();
        assert_eq!(node.quadlet_writes(CONF_ADDR)[1], 0x00000000);
        assert_eq!(F828Protocol::get_sampling_rate(&node, 100).unwrap(), 44100);

        let err = F828Protocol::set_sampling_rate(&node, 96000, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn f896_doubled_rate() {
        let node = MockNode::default();
        node.set_quadlet(CONF_ADDR, 0xffff0000);

        F896Protocol::SAMPLING_RATES.iter().for_each(|&rate| {
            F896Protocol::set_sampling_rate(&node, rate, 100).unwrap();
            assert_eq!(F896Protocol::get_sampling_rate(&node, 100).unwrap(), rate);
        });
        assert_eq!(node.quadlet(CONF_ADDR), 0xffff000c);
    }

    #[test]
    fn clock_source_round_trip() {
        let node = MockNode::default();
        node.set_quadlet(CONF_ADDR, 0x00000004);

        [
            MotuClockSource::Internal,
            MotuClockSource::SpdifOnCoax,
            MotuClockSource::AdatOnDsub,
            MotuClockSource::AdatOnOpt,
        ]
        .iter()
        .for_each(|&src| {
            F828Protocol::set_clock_source(&node, src, 100).unwrap();
            assert_eq!(F828Protocol::get_clock_source(&node, 100).unwrap(), src);
        });
        assert_eq!(
            node.quadlet_writes(CONF_ADDR),
            vec![0x00000004, 0x00000006, 0x00000005, 0x00000025]
        );

        let err = F828Protocol::set_clock_source(&node, MotuClockSource::SpdifOnOpt, 100)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        let err = F828Protocol::set_clock_source(&node, MotuClockSource::WordOnBnc, 100)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);

        F896Protocol::set_clock_source(&node, MotuClockSource::WordOnBnc, 100).unwrap();
        assert_eq!(
            F896Protocol::get_clock_source(&node, 100).unwrap(),
            MotuClockSource::WordOnBnc
        );
        let err = F828Protocol::get_clock_source(&node, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn spdif_on_optical_interface() {
        let node = MockNode::default();
        F828Protocol::set_opt_iface_mode(
            &node,
            OptIfaceDirection::Input,
            OptIfaceIndex::A,
            OptIfaceMode::Spdif,
            100,
        )
        .unwrap();

        let err = F828Protocol::set_clock_source(&node, MotuClockSource::SpdifOnCoax, 100)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);

        F828Protocol::set_clock_source(&node, MotuClockSource::SpdifOnOpt, 100).unwrap();
        assert_eq!(node.quadlet(CONF_ADDR), 0x00008002);
        assert_eq!(
            F828Protocol::get_clock_source(&node, 100).unwrap(),
            MotuClockSource::SpdifOnOpt
        );
    }

    #[test]
    fn opt_iface_mode_round_trip() {
        let node = MockNode::default();
        OPT_IFACE_DIRECTIONS.iter().for_each(|&direction| {
            let mask = packet_format_mask(direction);
            OPT_IFACE_MODES.iter().for_each(|&mode| {
                F828Protocol::set_opt_iface_mode(&node, direction, OptIfaceIndex::A, mode, 100)
                    .unwrap();
                assert_eq!(
                    F828Protocol::get_opt_iface_mode(&node, direction, OptIfaceIndex::A, 100)
                        .unwrap(),
                    mode
                );
                let packet = node.quadlet(PACKET_FORMAT_ADDR);
                assert_eq!(packet & mask > 0, mode != OptIfaceMode::Adat);
            });
        });

        let err = F828Protocol::get_opt_iface_mode(
            &node,
            OptIfaceDirection::Input,
            OptIfaceIndex::B,
            100,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }
}
