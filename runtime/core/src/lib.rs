// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2020 Takashi Sakamoto
pub mod cmdline;
pub mod config_rom;
pub mod dispatcher;
pub mod hwdep;
pub mod node;

use {clap::ValueEnum, firewire_protocols_core::*, hwdep::UnitType};

/// The level to debug runtime.
#[derive(ValueEnum, Debug, Copy, Clone, Eq, PartialEq)]
pub enum LogLevel {
    Debug,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Debug
    }
}

pub trait RuntimeOperation<T>: Sized {
    fn new(arg: T, log_level: Option<LogLevel>) -> Result<Self, Error>;
    fn run(&mut self) -> Result<(), Error>;
}

/// Check whether the type of unit reported by ALSA firewire stack is expected one.
pub fn check_unit_type(node: &dyn BusTransport, unit_type: UnitType) -> Result<(), Error> {
    let actual = UnitType::from(node.unit_type());
    if actual != unit_type {
        let msg = format!("Unit is not for the runtime: {:?} but {:?}", actual, unit_type);
        Err(Error::new(ErrorKind::Unsupported, &msg))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use {super::*, firewire_protocols_core::mock::MockNode};

    #[test]
    fn unit_type_check() {
        let node = MockNode::new(6, 0);
        assert_eq!(check_unit_type(&node, UnitType::Tascam), Ok(()));

        let err = check_unit_type(&node, UnitType::Motu).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }
}
