// SPDX-License-Identifier: MIT
// Copyright (c) 2022 Takashi Sakamoto

//! AV/C commands defined in AV/C Digital Interface Command Set General Specification.

use super::*;

/// AV/C VENDOR-DEPENDENT command.
///
/// Described in clause "9.6 VENDOR-DEPENDENT commands". The payload is padded with 0xff so that
/// the whole frame is aligned to quadlet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorDependent {
    pub company_id: [u8; 3],
    pub data: Vec<u8>,
}

impl VendorDependent {
    const PADDING: u8 = 0xff;

    pub fn new(company_id: &[u8], data: &[u8]) -> Result<Self, Error> {
        if company_id.len() != 3 {
            let msg = format!("Company ID should be 3 bytes: {}", company_id.len());
            Err(Error::new(ErrorKind::Argument, &msg))?;
        }

        let mut id = [0; 3];
        id.copy_from_slice(company_id);
        Ok(Self {
            company_id: id,
            data: data.to_vec(),
        })
    }

    fn build(&self, operands: &mut Vec<u8>) -> Result<(), Error> {
        if self.data.is_empty() {
            Err(Error::new(ErrorKind::Argument, "Vendor dependent data is empty"))?;
        }
        operands.extend_from_slice(&self.company_id);
        operands.extend_from_slice(&self.data);
        // The operands follow command type, address, and opcode.
        while (operands.len() + 3) % 4 > 0 {
            operands.push(Self::PADDING);
        }
        Ok(())
    }

    fn parse(&mut self, operands: &[u8]) -> Result<(), Error> {
        if operands.len() < 3 {
            let msg = format!("Vendor dependent response too short: {}", operands.len());
            Err(Error::new(ErrorKind::Malformed, &msg))?;
        }
        if operands[..3] != self.company_id {
            let msg = format!("Unexpected company ID: {:02x?}", &operands[..3]);
            Err(Error::new(ErrorKind::Protocol, &msg))?;
        }
        self.data = operands[3..].to_vec();
        Ok(())
    }
}

impl AvcOp for VendorDependent {
    const OPCODE: u8 = 0x00;
}

impl AvcControl for VendorDependent {
    fn build_operands(&mut self, _: &AvcAddr, operands: &mut Vec<u8>) -> Result<(), Error> {
        self.build(operands)
    }

    fn parse_operands(&mut self, _: &AvcAddr, operands: &[u8]) -> Result<(), Error> {
        self.parse(operands)
    }
}

impl AvcStatus for VendorDependent {
    fn build_operands(&mut self, _: &AvcAddr, operands: &mut Vec<u8>) -> Result<(), Error> {
        self.build(operands)
    }

    fn parse_operands(&mut self, _: &AvcAddr, operands: &[u8]) -> Result<(), Error> {
        self.parse(operands)
    }
}

/// The direction of plug for signal format.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlugDirection {
    Output,
    Input,
}

impl Default for PlugDirection {
    fn default() -> Self {
        Self::Output
    }
}

/// The nominal sampling rates in the table of sampling frequency code (SFC) for AM824 format.
pub const SAMPLING_RATES: &[u32] = &[32000, 44100, 48000, 88200, 96000, 176400, 192000];

/// The format of AM824 data in IEC 61883-6.
const FMT_AM824: u8 = 0x90;
const SFC_MASK: u8 = 0x07;
const SIGNAL_FORMAT_OPCODE_BASE: u8 = 0x18;

/// AV/C INPUT/OUTPUT PLUG SIGNAL FORMAT command for the rate of AM824 stream.
///
/// Described in clause "10.10 INPUT PLUG SIGNAL FORMAT command" and "10.11 OUTPUT PLUG SIGNAL
/// FORMAT command".
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PlugSignalFormat {
    pub direction: PlugDirection,
    pub plug_id: u8,
    pub rate: u32,
}

impl PlugSignalFormat {
    pub fn new(direction: PlugDirection, plug_id: u8) -> Self {
        Self {
            direction,
            plug_id,
            rate: 0,
        }
    }

    fn opcode(&self) -> u8 {
        SIGNAL_FORMAT_OPCODE_BASE
            + match self.direction {
                PlugDirection::Output => 0,
                PlugDirection::Input => 1,
            }
    }

    fn build(&self, for_status: bool) -> Result<Vec<u8>, Error> {
        let mut cmd = vec![AvcAddr::UNIT_ADDR, self.opcode(), self.plug_id];
        if for_status {
            cmd.extend_from_slice(&[0xff; 4]);
        } else {
            let sfc = SAMPLING_RATES
                .iter()
                .position(|&r| r == self.rate)
                .ok_or_else(|| {
                    let msg = format!("Invalid sampling rate: {}", self.rate);
                    Error::new(ErrorKind::Argument, &msg)
                })?;
            cmd.extend_from_slice(&[FMT_AM824, sfc as u8, 0xff, 0xff]);
        }
        Ok(cmd)
    }

    /// Configure the plug for the rate.
    pub fn set<T: Ta1394Avc + ?Sized>(&self, avc: &T, timeout_ms: u32) -> Result<(), Error> {
        self.build(false)
            .and_then(|cmd| avc.control(&cmd, timeout_ms))
            .map(|_| ())
    }

    /// Check whether the plug can be configured for the rate, without committing.
    pub fn inquire<T: Ta1394Avc + ?Sized>(&self, avc: &T, timeout_ms: u32) -> Result<(), Error> {
        self.build(false)
            .and_then(|cmd| avc.inquire(&cmd, timeout_ms))
    }

    /// Retrieve current rate of the plug.
    pub fn get<T: Ta1394Avc + ?Sized>(&mut self, avc: &T, timeout_ms: u32) -> Result<(), Error> {
        let cmd = self.build(true)?;
        let resp = avc.status(&cmd, timeout_ms)?;
        if resp.len() < 6 {
            let msg = format!("Signal format response too short: {}", resp.len());
            Err(Error::new(ErrorKind::Malformed, &msg))?;
        }
        let sfc = (resp[5] & SFC_MASK) as usize;
        SAMPLING_RATES
            .iter()
            .nth(sfc)
            .ok_or_else(|| {
                let msg = format!("Unexpected sampling frequency code: {}", sfc);
                Error::new(ErrorKind::Protocol, &msg)
            })
            .map(|&rate| self.rate = rate)
    }
}

#[cfg(test)]
mod test {
    use {super::*, firewire_protocols_core::mock::MockNode};

    #[test]
    fn vendor_dependent_padding() {
        let mut op = VendorDependent::new(&[0x00, 0x01, 0x02], &[0xaa, 0xbb]).unwrap();
        let mut operands = Vec::new();
        AvcControl::build_operands(&mut op, &AvcAddr::Unit, &mut operands).unwrap();
        assert_eq!(operands, vec![0x00, 0x01, 0x02, 0xaa, 0xbb]);

        let mut op = VendorDependent::new(&[0x00, 0x01, 0x02], &[0xaa]).unwrap();
        let mut operands = Vec::new();
        AvcControl::build_operands(&mut op, &AvcAddr::Unit, &mut operands).unwrap();
        assert_eq!(operands, vec![0x00, 0x01, 0x02, 0xaa, 0xff]);

        let err = VendorDependent::new(&[0x00, 0x01], &[0xaa]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn vendor_dependent_control() {
        let node = MockNode::default();
        node.queue_fcp_response(&[0x09, 0xff, 0x00, 0x00, 0x01, 0x02, 0xcc, 0xff, 0xff]);
        let mut op = VendorDependent::new(&[0x00, 0x01, 0x02], &[0xcc]).unwrap();
        node.control_op(&AvcAddr::Unit, &mut op, 100).unwrap();
        assert_eq!(op.data, vec![0xcc, 0xff, 0xff]);
        assert_eq!(
            node.fcp_commands()[0],
            vec![0x00, 0xff, 0x00, 0x00, 0x01, 0x02, 0xcc, 0xff]
        );
    }

    #[test]
    fn signal_format_frames() {
        let node = MockNode::default();

        node.queue_fcp_response(&[0x09, 0xff, 0x19, 0x00, 0x90, 0x02, 0xff, 0xff]);
        let mut op = PlugSignalFormat::new(PlugDirection::Input, 0);
        op.rate = 48000;
        op.set(&node, 100).unwrap();
        assert_eq!(
            node.fcp_commands()[0],
            vec![0x00, 0xff, 0x19, 0x00, 0x90, 0x02, 0xff, 0xff]
        );

        node.queue_fcp_response(&[0x0c, 0xff, 0x18, 0x01, 0x90, 0x04, 0xff, 0xff]);
        let mut op = PlugSignalFormat::new(PlugDirection::Output, 1);
        op.get(&node, 100).unwrap();
        assert_eq!(op.rate, 96000);
        assert_eq!(
            node.fcp_commands()[1],
            vec![0x01, 0xff, 0x18, 0x01, 0xff, 0xff, 0xff, 0xff]
        );

        node.queue_fcp_response(&[0x08, 0xff, 0x18, 0x00, 0x90, 0x06, 0xff, 0xff]);
        let mut op = PlugSignalFormat::new(PlugDirection::Output, 0);
        op.rate = 192000;
        let err = op.inquire(&node, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotImplemented);
        assert_eq!(node.fcp_commands()[2][0], 0x02);

        op.rate = 22050;
        let err = op.set(&node, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn signal_format_unexpected_code() {
        let node = MockNode::default();
        node.queue_fcp_response(&[0x0c, 0xff, 0x18, 0x00, 0x90, 0x07, 0xff, 0xff]);
        let mut op = PlugSignalFormat::new(PlugDirection::Output, 0);
        let err = op.get(&node, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        // Three bits carry the code, the rest are ignored.
        node.queue_fcp_response(&[0x0c, 0xff, 0x18, 0x00, 0x90, 0x0e, 0xff, 0xff]);
        op.get(&node, 100).unwrap();
        assert_eq!(op.rate, 192000);
    }
}
