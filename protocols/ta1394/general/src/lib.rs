// SPDX-License-Identifier: MIT
// Copyright (c) 2022 Takashi Sakamoto

#![doc = include_str!("../README.md")]

pub mod general;

use firewire_protocols_core::{BusTransport, Error, ErrorKind};

/// The type of subunit for AV/C address.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AvcSubunitType {
    Audio,
    Music,
    VendorUnique,
    Extended,
    Reserved(u8),
}

impl AvcSubunitType {
    const AUDIO: u8 = 0x01;
    const MUSIC: u8 = 0x0c;
    const VENDOR_UNIQUE: u8 = 0x1c;
    const EXTENDED: u8 = 0x1e;
}

impl From<u8> for AvcSubunitType {
    fn from(val: u8) -> Self {
        match val {
            Self::AUDIO => Self::Audio,
            Self::MUSIC => Self::Music,
            Self::VENDOR_UNIQUE => Self::VendorUnique,
            Self::EXTENDED => Self::Extended,
            _ => Self::Reserved(val),
        }
    }
}

impl From<AvcSubunitType> for u8 {
    fn from(subunit_type: AvcSubunitType) -> Self {
        match subunit_type {
            AvcSubunitType::Audio => AvcSubunitType::AUDIO,
            AvcSubunitType::Music => AvcSubunitType::MUSIC,
            AvcSubunitType::VendorUnique => AvcSubunitType::VENDOR_UNIQUE,
            AvcSubunitType::Extended => AvcSubunitType::EXTENDED,
            AvcSubunitType::Reserved(val) => val,
        }
    }
}

/// The address of subunit, type in 5 bits and identifier in 3 bits.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AvcAddrSubunit {
    pub subunit_type: AvcSubunitType,
    pub subunit_id: u8,
}

impl AvcAddrSubunit {
    const TYPE_SHIFT: usize = 3;
    const TYPE_MASK: u8 = 0x1f;
    const ID_MASK: u8 = 0x07;

    pub fn new(subunit_type: AvcSubunitType, subunit_id: u8) -> Self {
        Self {
            subunit_type,
            subunit_id: subunit_id & Self::ID_MASK,
        }
    }
}

impl From<u8> for AvcAddrSubunit {
    fn from(val: u8) -> Self {
        Self::new(
            AvcSubunitType::from((val >> Self::TYPE_SHIFT) & Self::TYPE_MASK),
            val & Self::ID_MASK,
        )
    }
}

impl From<AvcAddrSubunit> for u8 {
    fn from(subunit: AvcAddrSubunit) -> Self {
        ((u8::from(subunit.subunit_type) & AvcAddrSubunit::TYPE_MASK)
            << AvcAddrSubunit::TYPE_SHIFT)
            | (subunit.subunit_id & AvcAddrSubunit::ID_MASK)
    }
}

/// The address of AV/C target, the whole unit or one of subunits.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AvcAddr {
    Unit,
    Subunit(AvcAddrSubunit),
}

impl AvcAddr {
    pub const UNIT_ADDR: u8 = 0xff;
}

impl Default for AvcAddr {
    fn default() -> Self {
        Self::Unit
    }
}

impl From<u8> for AvcAddr {
    fn from(val: u8) -> Self {
        match val {
            Self::UNIT_ADDR => Self::Unit,
            _ => Self::Subunit(AvcAddrSubunit::from(val)),
        }
    }
}

impl From<AvcAddr> for u8 {
    fn from(addr: AvcAddr) -> Self {
        match addr {
            AvcAddr::Unit => AvcAddr::UNIT_ADDR,
            AvcAddr::Subunit(subunit) => u8::from(subunit),
        }
    }
}

/// The type of command.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AvcCmdType {
    /// Perform an operation to the addressed target.
    Control,
    /// Check current status of the addressed target.
    Status,
    /// Check whether the addressed target supports a particular Control command including operands.
    SpecificInquiry,
}

impl From<AvcCmdType> for u8 {
    fn from(ctype: AvcCmdType) -> Self {
        match ctype {
            AvcCmdType::Control => 0x00,
            AvcCmdType::Status => 0x01,
            AvcCmdType::SpecificInquiry => 0x02,
        }
    }
}

/// The status of response.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AvcRespCode {
    /// The target does not implement the requested command or the addressed subunit.
    NotImplemented,
    /// The requested CONTROL command has been processed or is scheduled to process.
    Accepted,
    /// The target refused to process the requested command.
    Rejected,
    /// The target is under transition state and can not process the requested STATUS command.
    InTransition,
    /// The target implements the inquired command or returns current status.
    ImplementedStable,
    /// The actual notification scheduled by the NOTIFY command.
    Changed,
    /// The intermediate response during deferred transaction.
    Interim,
    Reserved(u8),
}

impl AvcRespCode {
    const NOT_IMPLEMENTED: u8 = 0x08;
    const ACCEPTED: u8 = 0x09;
    const REJECTED: u8 = 0x0a;
    const IN_TRANSITION: u8 = 0x0b;
    const IMPLEMENTED_STABLE: u8 = 0x0c;
    const CHANGED: u8 = 0x0d;
    const INTERIM: u8 = 0x0f;
}

impl From<u8> for AvcRespCode {
    fn from(val: u8) -> Self {
        match val {
            Self::NOT_IMPLEMENTED => Self::NotImplemented,
            Self::ACCEPTED => Self::Accepted,
            Self::REJECTED => Self::Rejected,
            Self::IN_TRANSITION => Self::InTransition,
            Self::IMPLEMENTED_STABLE => Self::ImplementedStable,
            Self::CHANGED => Self::Changed,
            Self::INTERIM => Self::Interim,
            _ => Self::Reserved(val),
        }
    }
}

impl From<AvcRespCode> for u8 {
    fn from(rcode: AvcRespCode) -> Self {
        match rcode {
            AvcRespCode::NotImplemented => AvcRespCode::NOT_IMPLEMENTED,
            AvcRespCode::Accepted => AvcRespCode::ACCEPTED,
            AvcRespCode::Rejected => AvcRespCode::REJECTED,
            AvcRespCode::InTransition => AvcRespCode::IN_TRANSITION,
            AvcRespCode::ImplementedStable => AvcRespCode::IMPLEMENTED_STABLE,
            AvcRespCode::Changed => AvcRespCode::CHANGED,
            AvcRespCode::Interim => AvcRespCode::INTERIM,
            AvcRespCode::Reserved(val) => val,
        }
    }
}

/// For AV/C operation with opcode.
pub trait AvcOp {
    /// The code to specify operation.
    const OPCODE: u8;
}

/// The AV/C operation supporting control and inquiry command.
pub trait AvcControl {
    fn build_operands(&mut self, addr: &AvcAddr, operands: &mut Vec<u8>) -> Result<(), Error>;
    fn parse_operands(&mut self, addr: &AvcAddr, operands: &[u8]) -> Result<(), Error>;
}

/// The AV/C operation supporting status command.
pub trait AvcStatus {
    fn build_operands(&mut self, addr: &AvcAddr, operands: &mut Vec<u8>) -> Result<(), Error>;
    fn parse_operands(&mut self, addr: &AvcAddr, operands: &[u8]) -> Result<(), Error>;
}

/// The mask for first byte of response frame to detect status code. The rest bits express
/// Command/transaction set (CTS).
const RESP_CODE_MASK: u8 = 0x0f;

/// The minimum length of frame; response code, address, and opcode.
const FRAME_HEADER_SIZE: usize = 3;

fn check_response_code(rcode: AvcRespCode, expected: AvcRespCode) -> Result<(), Error> {
    if rcode == expected {
        return Ok(());
    }

    match rcode {
        AvcRespCode::NotImplemented => Err(Error::new(
            ErrorKind::NotImplemented,
            "The target does not implement the command",
        )),
        AvcRespCode::Rejected => Err(Error::new(
            ErrorKind::Rejected,
            "The target rejected the command",
        )),
        AvcRespCode::InTransition => Err(Error::new(
            ErrorKind::Transient,
            "The target is in transition",
        )),
        _ => {
            let msg = format!(
                "Unexpected response code: 0x{:02x}, expected 0x{:02x}",
                u8::from(rcode),
                u8::from(expected)
            );
            Err(Error::new(ErrorKind::Protocol, &msg))
        }
    }
}

/// Check the header of response frame against the command frame, then return response code.
pub fn detect_response_code(cmd: &[u8], resp: &[u8]) -> Result<AvcRespCode, Error> {
    if resp.len() < FRAME_HEADER_SIZE {
        let msg = format!("Response frame too short: {}", resp.len());
        Err(Error::new(ErrorKind::Malformed, &msg))
    } else if resp[1] != cmd[1] {
        let msg = format!("Unexpected address in response: 0x{:02x}", resp[1]);
        Err(Error::new(ErrorKind::Protocol, &msg))
    } else if resp[2] != cmd[2] {
        let msg = format!("Unexpected opcode in response: 0x{:02x}", resp[2]);
        Err(Error::new(ErrorKind::Protocol, &msg))
    } else {
        Ok(AvcRespCode::from(resp[0] & RESP_CODE_MASK))
    }
}

/// Compose command frame with the type of command, address, opcode, and operands.
pub fn compose_command_frame(
    ctype: AvcCmdType,
    addr: &AvcAddr,
    opcode: u8,
    operands: &[u8],
) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + operands.len());
    frame.push(ctype.into());
    frame.push((*addr).into());
    frame.push(opcode);
    frame.extend_from_slice(operands);
    frame
}

fn compose_operation(addr: &AvcAddr, opcode: u8, operands: &[u8]) -> Vec<u8> {
    let mut cmd = vec![(*addr).into(), opcode];
    cmd.extend_from_slice(operands);
    cmd
}

/// For AV/C transaction over FCP. The command frame given to raw transaction consists of
/// address, opcode, and operands; the type of command is prepended by each transaction. The
/// returned response frame includes response code in its first byte.
pub trait Ta1394Avc {
    /// The maximum size of frame in both command and response.
    const FRAME_SIZE: usize = 0x200;

    /// Transmit given command frame and return received response frame.
    fn transaction(&self, command_frame: &[u8], timeout_ms: u32) -> Result<Vec<u8>, Error>;

    /// Initiate transaction with the type of command and check the response code.
    fn transaction_with_check(
        &self,
        ctype: AvcCmdType,
        cmd: &[u8],
        expected: AvcRespCode,
        timeout_ms: u32,
    ) -> Result<Vec<u8>, Error> {
        if cmd.len() < FRAME_HEADER_SIZE - 1 {
            let msg = format!("Command frame too short: {}", cmd.len());
            return Err(Error::new(ErrorKind::Argument, &msg));
        }
        if cmd.len() + 1 > Self::FRAME_SIZE {
            let msg = format!("Command frame too large: {}", cmd.len());
            return Err(Error::new(ErrorKind::Argument, &msg));
        }

        let mut frame = Vec::with_capacity(cmd.len() + 1);
        frame.push(ctype.into());
        frame.extend_from_slice(cmd);

        let resp = self.transaction(&frame, timeout_ms)?;
        detect_response_code(&frame, &resp)
            .and_then(|rcode| check_response_code(rcode, expected))
            .map(|_| resp)
    }

    /// Send CONTROL command, then return response frame when the target accepts it.
    fn control(&self, cmd: &[u8], timeout_ms: u32) -> Result<Vec<u8>, Error> {
        self.transaction_with_check(AvcCmdType::Control, cmd, AvcRespCode::Accepted, timeout_ms)
    }

    /// Send STATUS command, then return response frame when the target is stable.
    fn status(&self, cmd: &[u8], timeout_ms: u32) -> Result<Vec<u8>, Error> {
        self.transaction_with_check(
            AvcCmdType::Status,
            cmd,
            AvcRespCode::ImplementedStable,
            timeout_ms,
        )
    }

    /// Send SPECIFIC INQUIRY command, then check the target implements the command.
    fn inquire(&self, cmd: &[u8], timeout_ms: u32) -> Result<(), Error> {
        self.transaction_with_check(
            AvcCmdType::SpecificInquiry,
            cmd,
            AvcRespCode::ImplementedStable,
            timeout_ms,
        )
        .map(|_| ())
    }

    /// Perform the operation by CONTROL command.
    fn control_op<O: AvcOp + AvcControl>(
        &self,
        addr: &AvcAddr,
        op: &mut O,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let mut operands = Vec::new();
        AvcControl::build_operands(op, addr, &mut operands)?;
        let cmd = compose_operation(addr, O::OPCODE, &operands);
        let resp = self.control(&cmd, timeout_ms)?;
        AvcControl::parse_operands(op, addr, &resp[FRAME_HEADER_SIZE..])
    }

    /// Perform the operation by STATUS command.
    fn status_op<O: AvcOp + AvcStatus>(
        &self,
        addr: &AvcAddr,
        op: &mut O,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let mut operands = Vec::new();
        AvcStatus::build_operands(op, addr, &mut operands)?;
        let cmd = compose_operation(addr, O::OPCODE, &operands);
        let resp = self.status(&cmd, timeout_ms)?;
        AvcStatus::parse_operands(op, addr, &resp[FRAME_HEADER_SIZE..])
    }

    /// Check the target implements the operation by SPECIFIC INQUIRY command.
    fn inquire_op<O: AvcOp + AvcControl>(
        &self,
        addr: &AvcAddr,
        op: &mut O,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let mut operands = Vec::new();
        AvcControl::build_operands(op, addr, &mut operands)?;
        let cmd = compose_operation(addr, O::OPCODE, &operands);
        self.inquire(&cmd, timeout_ms)
    }
}

impl<T: BusTransport + ?Sized> Ta1394Avc for T {
    fn transaction(&self, command_frame: &[u8], timeout_ms: u32) -> Result<Vec<u8>, Error> {
        self.fcp_transact(command_frame, timeout_ms)
    }
}

#[cfg(test)]
mod test {
    use {super::*, firewire_protocols_core::mock::MockNode};

    #[test]
    fn avcaddr_from() {
        assert_eq!(AvcAddr::from(0xff), AvcAddr::Unit);
        assert_eq!(
            AvcAddr::from(0x09),
            AvcAddr::Subunit(AvcAddrSubunit::new(AvcSubunitType::Audio, 0x01))
        );
        assert_eq!(
            AvcAddr::from(0x63),
            AvcAddr::Subunit(AvcAddrSubunit::new(AvcSubunitType::Music, 0x03))
        );
        assert_eq!(u8::from(AvcAddr::from(0x87)), 0x87);
    }

    #[test]
    fn avcrespcode_from() {
        (0x08..0x10).filter(|&v| v != 0x0e).for_each(|val| {
            assert_eq!(val, u8::from(AvcRespCode::from(val)));
        });
        assert_eq!(AvcRespCode::from(0x0e), AvcRespCode::Reserved(0x0e));
    }

    #[test]
    fn control_accepted() {
        let node = MockNode::default();
        node.queue_fcp_response(&[0x09, 0xff, 0x00, 0x01]);
        let resp = node.control(&[0xff, 0x00, 0x01], 100).unwrap();
        assert_eq!(resp, vec![0x09, 0xff, 0x00, 0x01]);
        assert_eq!(node.fcp_commands()[0], vec![0x00, 0xff, 0x00, 0x01]);
    }

    #[test]
    fn response_classification() {
        let node = MockNode::default();

        node.queue_fcp_response(&[0x08, 0xff, 0x00]);
        let err = node.control(&[0xff, 0x00], 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotImplemented);

        node.queue_fcp_response(&[0x0a, 0xff, 0x00]);
        let err = node.control(&[0xff, 0x00], 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);

        node.queue_fcp_response(&[0x0c, 0xff, 0x00]);
        let err = node.control(&[0xff, 0x00], 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        node.queue_fcp_response(&[0x0b, 0xff, 0x00]);
        let err = node.status(&[0xff, 0x00], 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);

        node.queue_fcp_response(&[0x0c, 0xff, 0x00, 0x12]);
        assert_eq!(node.status(&[0xff, 0x00], 100).unwrap()[3], 0x12);

        node.queue_fcp_response(&[0x0c, 0xff, 0x00]);
        assert!(node.inquire(&[0xff, 0x00], 100).is_ok());

        node.queue_fcp_response(&[0x08, 0xff, 0x00]);
        let err = node.inquire(&[0xff, 0x00], 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotImplemented);

        let commands = node.fcp_commands();
        assert_eq!(commands[3][0], 0x01);
        assert_eq!(commands[5][0], 0x02);
    }

    #[test]
    fn unexpected_response_header() {
        let node = MockNode::default();

        node.queue_fcp_response(&[0x09, 0x60, 0x00]);
        let err = node.control(&[0xff, 0x00], 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        node.queue_fcp_response(&[0x09, 0xff]);
        let err = node.control(&[0xff, 0x00], 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }
}
