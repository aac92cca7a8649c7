// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2020 Takashi Sakamoto

//! Protocol defined by TCAT for ASICs of DICE.
//!
//! The module includes structure, enumeration, and trait and its implementation for protocol defined
//! by TC Applied Technologies (TCAT) for ASICs of Digital Interface Communication Engine (DICE).
//!
//! In the protocol, all of features are categorized to several parts. Each part is represented in
//! range of registers accessible by IEEE 1394 asynchronous transaction. In the crate, the range
//! is called as `section`, therefore the features are categorized to the section.

pub mod global_section;
pub mod tcd22xx_spec;

use super::*;

pub use global_section::GlobalSectionProtocol;

/// Section in control and status register (CSR) of node.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Section {
    /// The offset of section in specific address space.
    pub offset: usize,
    /// The size of section.
    pub size: usize,
}

impl Section {
    pub(crate) const SIZE: usize = 8;
}

#[cfg(test)]
pub(crate) fn serialize_section(section: &Section, raw: &mut [u8]) {
    assert!(raw.len() >= Section::SIZE);

    let val = (section.offset as u32) / 4;
    serialize_u32(&val, &mut raw[..4]);

    let val = (section.size as u32) / 4;
    serialize_u32(&val, &mut raw[4..8]);
}

pub(crate) fn deserialize_section(section: &mut Section, raw: &[u8]) {
    assert!(raw.len() >= Section::SIZE);

    let mut val = 0u32;
    deserialize_u32(&mut val, &raw[..4]);
    section.offset = 4 * val as usize;

    deserialize_u32(&mut val, &raw[4..8]);
    section.size = 4 * val as usize;
}

/// The sset of sections in CSR of node.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct GeneralSections {
    /// For global settings.
    pub global: Section,
    /// For tx stream format settings.
    pub tx_stream_format: Section,
    /// For rx stream format settings.
    pub rx_stream_format: Section,
    /// For extended status of synchronization for signal sources of sampling clock.
    pub ext_sync: Section,
    pub reserved: Section,
}

impl GeneralSections {
    const SECTION_COUNT: usize = 5;
    const SIZE: usize = Section::SIZE * Self::SECTION_COUNT;

    /// The minimum value of each quadlet in the header, in the unit of quadlet.
    const MIN_QUADLETS: [u32; 10] = [10, 25, 10, 6, 10, 6, 0, 0, 0, 0];
}

#[cfg(test)]
fn serialize_general_sections(sections: &GeneralSections, raw: &mut [u8]) {
    assert!(raw.len() >= GeneralSections::SIZE);

    serialize_section(&sections.global, &mut raw[..8]);
    serialize_section(&sections.tx_stream_format, &mut raw[8..16]);
    serialize_section(&sections.rx_stream_format, &mut raw[16..24]);
    serialize_section(&sections.ext_sync, &mut raw[24..32]);
    serialize_section(&sections.reserved, &mut raw[32..40]);
}

fn deserialize_general_sections(sections: &mut GeneralSections, raw: &[u8]) -> Result<(), Error> {
    assert!(raw.len() >= GeneralSections::SIZE);

    raw.chunks_exact(4)
        .zip(GeneralSections::MIN_QUADLETS.iter())
        .enumerate()
        .try_for_each(|(i, (quadlet, &min))| {
            let mut val = 0u32;
            deserialize_u32(&mut val, quadlet);
            if val < min {
                let msg = format!(
                    "Unexpected value at {} in layout of sections: {} but {} expected at least",
                    i, val, min
                );
                Err(Error::new(ErrorKind::Protocol, &msg))
            } else {
                Ok(())
            }
        })?;

    deserialize_section(&mut sections.global, &raw[..8]);
    deserialize_section(&mut sections.tx_stream_format, &raw[8..16]);
    deserialize_section(&mut sections.rx_stream_format, &raw[16..24]);
    deserialize_section(&mut sections.ext_sync, &raw[24..32]);
    deserialize_section(&mut sections.reserved, &raw[32..40]);

    Ok(())
}

const MAX_FRAME_SIZE: usize = 512;

const BASE_ADDR: u64 = 0xffffe0000000;

/// Operation of TCAT general protocol.
pub trait TcatOperation {
    /// Initiate read transaction to offset in specific address space and finish it.
    fn read(
        node: &dyn BusTransport,
        offset: usize,
        mut frames: &mut [u8],
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let mut addr = BASE_ADDR + offset as u64;

        while frames.len() > 0 {
            let len = std::cmp::min(frames.len(), MAX_FRAME_SIZE);
            if len == 4 {
                let quadlet = node.read_quadlet(addr, timeout_ms)?;
                frames[..4].copy_from_slice(&quadlet.to_be_bytes());
            } else {
                node.read_block(addr, &mut frames[..len], timeout_ms)?;
            }

            addr += len as u64;
            frames = &mut frames[len..];
        }

        Ok(())
    }

    /// Initiate write transaction to offset in specific address space and finish it.
    fn write(
        node: &dyn BusTransport,
        offset: usize,
        mut frames: &[u8],
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let mut addr = BASE_ADDR + (offset as u64);

        while frames.len() > 0 {
            let len = std::cmp::min(frames.len(), MAX_FRAME_SIZE);
            if len == 4 {
                let mut quadlet = 0u32;
                deserialize_u32(&mut quadlet, &frames[..4]);
                node.write_quadlet(addr, quadlet, timeout_ms)?;
            } else {
                node.write_block(addr, &frames[..len], timeout_ms)?;
            }

            addr += len as u64;
            frames = &frames[len..];
        }

        Ok(())
    }

    /// Read section layout.
    fn read_general_sections(
        node: &dyn BusTransport,
        sections: &mut GeneralSections,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let mut raw = [0; GeneralSections::SIZE];
        Self::read(node, 0, &mut raw, timeout_ms)?;
        deserialize_general_sections(sections, &raw)
    }
}

/// Check the size of section against the minimum size expected by the operation.
pub(crate) fn check_section_cache(section: &Section, min_size: usize) -> Result<(), Error> {
    if section.size < min_size {
        let msg = format!(
            "The size of section should be larger than {}, actually {}",
            min_size, section.size
        );
        Err(Error::new(ErrorKind::Protocol, &msg))
    } else {
        Ok(())
    }
}

/// Serialize the label into the sequence of big-endian quadlets, with zero padding.
pub(crate) fn serialize_label<T: AsRef<str>>(name: T, raw: &mut [u8]) -> Result<(), Error> {
    let r = name.as_ref().as_bytes();

    if r.len() >= raw.len() {
        let msg = format!("Label too long: {} but less than {} expected", r.len(), raw.len());
        Err(Error::new(ErrorKind::Argument, &msg))
    } else {
        raw.fill(0x00);
        raw[..r.len()].copy_from_slice(r);

        Ok(())
    }
}

/// Deserialize the label terminated by zero from the sequence of quadlets.
pub(crate) fn deserialize_label(label: &mut String, raw: &[u8]) -> Result<(), Error> {
    let end = raw.iter().position(|&b| b == 0x00).unwrap_or(raw.len());
    std::str::from_utf8(&raw[..end])
        .map(|text| *label = text.to_string())
        .map_err(|err| {
            let msg = format!("Invalid label: {}", err);
            Error::new(ErrorKind::Protocol, &msg)
        })
}

pub const NOTIFY_RX_CFG_CHG: u32 = 0x00000001;
pub const NOTIFY_TX_CFG_CHG: u32 = 0x00000002;
pub const NOTIFY_LOCK_CHG: u32 = 0x00000010;
pub const NOTIFY_CLOCK_ACCEPTED: u32 = 0x00000020;
pub const NOTIFY_EXT_STATUS: u32 = 0x00000040;

#[cfg(test)]
mod test {
    use {super::*, firewire_protocols_core::mock::MockNode};

    struct TestProtocol;

    impl TcatOperation for TestProtocol {}

    const LAYOUT: [u8; 40] = [
        0x00, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x5f, 0x00, 0x00, 0x00, 0x69, 0x00, 0x00, 0x00,
        0x8e, 0x00, 0x00, 0x00, 0xf7, 0x00, 0x00, 0x01, 0x1a, 0x00, 0x00, 0x02, 0x11, 0x00, 0x00,
        0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn label_serdes() {
        let mut raw = vec![0u8; 20];
        serialize_label("label-0", &mut raw).unwrap();
        assert_eq!(&raw[..8], &[b'l', b'a', b'b', b'e', b'l', b'-', b'0', 0x00]);

        let mut l = String::new();
        deserialize_label(&mut l, &raw).unwrap();
        assert_eq!(l, "label-0");

        let err = serialize_label("0123", &mut raw[..4]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn sections_serdes() {
        let mut params = GeneralSections::default();
        deserialize_general_sections(&mut params, &LAYOUT).unwrap();

        assert_eq!(params.global.offset, 0x28);
        assert_eq!(params.global.size, 0x17c);
        assert_eq!(params.tx_stream_format.offset, 0x1a4);
        assert_eq!(params.tx_stream_format.size, 0x238);
        assert_eq!(params.rx_stream_format.offset, 0x3dc);
        assert_eq!(params.rx_stream_format.size, 0x468);
        assert_eq!(params.ext_sync.offset, 0x844);
        assert_eq!(params.ext_sync.size, 0x10);
        assert_eq!(params.reserved.offset, 0);
        assert_eq!(params.reserved.size, 0);

        let mut r = vec![0u8; LAYOUT.len()];
        serialize_general_sections(&params, &mut r);
        assert_eq!(r, LAYOUT);
    }

    #[test]
    fn sections_too_small() {
        let mut raw = LAYOUT;
        // The size of global section is 24 quadlets.
        raw[7] = 0x18;
        let mut params = GeneralSections::default();
        let err = deserialize_general_sections(&mut params, &raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn read_layout_by_block() {
        let node = MockNode::default();
        node.set_block(BASE_ADDR, &LAYOUT);

        let mut sections = GeneralSections::default();
        TestProtocol::read_general_sections(&node, &mut sections, 100).unwrap();
        assert_eq!(sections.global.offset, 0x28);

        TestProtocol::write(&node, 0x28, &[0x00, 0x00, 0x00, 0x01], 100).unwrap();
        assert_eq!(node.quadlet_writes(BASE_ADDR + 0x28), vec![0x00000001]);
    }
}
