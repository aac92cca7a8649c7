// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2021 Takashi Sakamoto

#![doc = include_str!("../README.md")]

pub mod level;
pub mod mock;

/// The default timeout of each transaction.
pub const TIMEOUT_MS: u32 = 100;

/// The kind of error reported by protocol implementations.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The argument is out of the closed set or range.
    Argument,
    /// The unit is busy since packet streaming runs.
    Busy,
    /// The AV/C target does not implement the command.
    NotImplemented,
    /// The AV/C target rejected the command.
    Rejected,
    /// The AV/C target is in transition.
    Transient,
    /// The content of register or response is unexpected.
    Protocol,
    /// The response is shorter than its declared layout.
    Malformed,
    /// The transaction failed.
    Io,
    /// The transaction was not finished in time.
    Timeout,
    /// The transaction was cancelled by release of the unit.
    Cancelled,
    /// The model or the operation is not supported.
    Unsupported,
}

impl ErrorKind {
    /// Whether the kind belongs to failure of transport.
    pub fn is_io(&self) -> bool {
        match self {
            Self::Io | Self::Timeout | Self::Cancelled => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Argument => "invalid argument",
            Self::Busy => "busy",
            Self::NotImplemented => "not implemented",
            Self::Rejected => "rejected",
            Self::Transient => "in transition",
            Self::Protocol => "protocol error",
            Self::Malformed => "malformed response",
            Self::Io => "I/O error",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Unsupported => "unsupported",
        };
        write!(f, "{}", label)
    }
}

/// The error reported by protocol implementations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {msg}")]
pub struct Error {
    kind: ErrorKind,
    msg: String,
}

impl Error {
    pub fn new(kind: ErrorKind, msg: &str) -> Self {
        Self {
            kind,
            msg: msg.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
            std::io::ErrorKind::Interrupted => ErrorKind::Cancelled,
            _ => ErrorKind::Io,
        };
        Self::new(kind, &err.to_string())
    }
}

/// The capability to communicate with one node on IEEE 1394 bus.
///
/// Each primitive blocks the caller till the transaction finishes or the timeout expires. The
/// implementation serializes transactions initiated by several threads.
pub trait BusTransport {
    /// Read quadlet at the address.
    fn read_quadlet(&self, addr: u64, timeout_ms: u32) -> Result<u32, Error>;

    /// Write quadlet to the address.
    fn write_quadlet(&self, addr: u64, quadlet: u32, timeout_ms: u32) -> Result<(), Error>;

    /// Read block from the address as much as the length of frame.
    fn read_block(&self, addr: u64, frame: &mut [u8], timeout_ms: u32) -> Result<(), Error>;

    /// Write the frame as block to the address.
    fn write_block(&self, addr: u64, frame: &[u8], timeout_ms: u32) -> Result<(), Error>;

    /// Transmit AV/C command frame by FCP and return the final response frame.
    fn fcp_transact(&self, cmd: &[u8], timeout_ms: u32) -> Result<Vec<u8>, Error>;

    /// Write quadlet to the address, then wait for notification from the node which includes any
    /// bit of the mask. Notifications delivered before the write are discarded. Return the bits
    /// accumulated after the write.
    fn write_quadlet_and_wait(
        &self,
        addr: u64,
        quadlet: u32,
        mask: u32,
        timeout_ms: u32,
    ) -> Result<u32, Error> {
        let _ = (addr, quadlet, mask, timeout_ms);
        Err(Error::new(
            ErrorKind::Unsupported,
            "Notification is not available",
        ))
    }

    /// The content of configuration ROM in big endian.
    fn config_rom(&self) -> Result<Vec<u8>, Error>;

    /// Whether packet streaming is active.
    fn is_streaming(&self) -> bool;

    /// The numeric tag for type of unit, reported by ALSA firewire stack.
    fn unit_type(&self) -> u32;

    /// The global unique identifier of node.
    fn guid(&self) -> u64;

    /// The name of character device for the node.
    fn node_device(&self) -> String;
}

/// Read quadlet from the offset in register window.
pub fn read_quadlet(
    node: &dyn BusTransport,
    base: u64,
    offset: u64,
    timeout_ms: u32,
) -> Result<u32, Error> {
    node.read_quadlet(base + offset, timeout_ms)
}

/// Write quadlet to the offset in register window.
pub fn write_quadlet(
    node: &dyn BusTransport,
    base: u64,
    offset: u64,
    quadlet: u32,
    timeout_ms: u32,
) -> Result<(), Error> {
    node.write_quadlet(base + offset, quadlet, timeout_ms)
}

/// Serialize the flag into the bit field of quadlet.
pub fn serialize_flag<T: Copy + Eq + std::fmt::Debug>(
    flag: &T,
    quad: &mut u32,
    mask: u32,
    shift: usize,
    flags: &[T],
    vals: &[u8],
    label: &str,
) -> Result<(), Error> {
    flags
        .iter()
        .zip(vals)
        .find(|(f, _)| flag.eq(f))
        .ok_or_else(|| {
            let msg = format!("Invalid argument for {}: {:?}", label, flag);
            Error::new(ErrorKind::Argument, &msg)
        })
        .map(|(_, &val)| {
            *quad &= !mask;
            *quad |= ((val as u32) << shift) & mask;
        })
}

/// Deserialize the flag from the bit field of quadlet.
pub fn deserialize_flag<T: Copy + Eq>(
    flag: &mut T,
    quad: &u32,
    mask: u32,
    shift: usize,
    flags: &[T],
    vals: &[u8],
    label: &str,
) -> Result<(), Error> {
    let val = ((*quad & mask) >> shift) as u8;
    flags
        .iter()
        .zip(vals)
        .find(|(_, v)| val.eq(v))
        .ok_or_else(|| {
            let msg = format!(
                "Invalid value for {}, 0x{:08x}, 0x{:08x}",
                label, quad, mask
            );
            Error::new(ErrorKind::Protocol, &msg)
        })
        .map(|(&f, _)| *flag = f)
}

/// Check that packet streaming is not active, before changing any parameter related to it.
pub fn check_idle(node: &dyn BusTransport) -> Result<(), Error> {
    if node.is_streaming() {
        Err(Error::new(
            ErrorKind::Busy,
            "Packet streaming is running",
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    enum Mode {
        A,
        B,
        C,
    }

    const MODES: &[Mode] = &[Mode::A, Mode::B, Mode::C];
    const VALS: &[u8] = &[0x00, 0x02, 0x01];

    #[test]
    fn flag_in_bit_field() {
        let mut quad = 0xffff00ff;
        serialize_flag(&Mode::B, &mut quad, 0x00000300, 8, MODES, VALS, "mode").unwrap();
        assert_eq!(quad, 0xffff02ff);

        let mut mode = Mode::A;
        deserialize_flag(&mut mode, &quad, 0x00000300, 8, MODES, VALS, "mode").unwrap();
        assert_eq!(mode, Mode::B);

        let quad = 0x00000300;
        let err = deserialize_flag(&mut mode, &quad, 0x00000300, 8, MODES, VALS, "mode")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn error_from_io() {
        let err = Error::from(std::io::Error::new(std::io::ErrorKind::TimedOut, "late"));
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.kind().is_io());
        assert!(!ErrorKind::Protocol.is_io());
    }
}
