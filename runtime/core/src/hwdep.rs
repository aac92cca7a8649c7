// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2022 Takashi Sakamoto

//! Operations for ALSA hwdep character device added by drivers in ALSA firewire stack.

use {
    super::*,
    glib::{prelude::Cast, translate::IntoGlib},
    hinawa::{FwFcpError, FwNodeError, FwReqError},
    hitaki::{prelude::*, *},
};

/// The type of unit, reported by ALSA firewire stack.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnitType {
    Dice,
    Fireworks,
    Bebob,
    Oxfw,
    Digi00x,
    Tascam,
    Motu,
    Fireface,
    Unknown(u32),
}

impl From<u32> for UnitType {
    fn from(val: u32) -> Self {
        match val {
            1 => Self::Dice,
            2 => Self::Fireworks,
            3 => Self::Bebob,
            4 => Self::Oxfw,
            5 => Self::Digi00x,
            6 => Self::Tascam,
            7 => Self::Motu,
            8 => Self::Fireface,
            _ => Self::Unknown(val),
        }
    }
}

impl From<UnitType> for u32 {
    fn from(unit_type: UnitType) -> Self {
        match unit_type {
            UnitType::Dice => 1,
            UnitType::Fireworks => 2,
            UnitType::Bebob => 3,
            UnitType::Oxfw => 4,
            UnitType::Digi00x => 5,
            UnitType::Tascam => 6,
            UnitType::Motu => 7,
            UnitType::Fireface => 8,
            UnitType::Unknown(val) => val,
        }
    }
}

impl From<AlsaFirewireType> for UnitType {
    fn from(unit_type: AlsaFirewireType) -> Self {
        Self::from(unit_type.into_glib() as u32)
    }
}

/// Convert the error reported by hinawa and hitaki.
pub fn from_glib_error(err: glib::Error, label: &str) -> Error {
    let kind = if let Some(rcode) = err.kind::<FwReqError>() {
        match rcode {
            FwReqError::Cancelled => ErrorKind::Cancelled,
            FwReqError::Busy => ErrorKind::Busy,
            _ => ErrorKind::Io,
        }
    } else if let Some(cause) = err.kind::<FwFcpError>() {
        match cause {
            FwFcpError::Timeout => ErrorKind::Timeout,
            FwFcpError::Aborted => ErrorKind::Cancelled,
            _ => ErrorKind::Io,
        }
    } else if let Some(cause) = err.kind::<FwNodeError>() {
        match cause {
            FwNodeError::Disconnected => ErrorKind::Cancelled,
            _ => ErrorKind::Io,
        }
    } else if let Some(cause) = err.kind::<AlsaFirewireError>() {
        match cause {
            AlsaFirewireError::WrongClass => ErrorKind::Unsupported,
            AlsaFirewireError::IsLocked | AlsaFirewireError::IsUsed => ErrorKind::Busy,
            AlsaFirewireError::IsDisconnected => ErrorKind::Cancelled,
            _ => ErrorKind::Io,
        }
    } else {
        ErrorKind::Io
    };
    let msg = format!("{}: {}", label, err);
    Error::new(kind, &msg)
}

/// Open the ALSA hwdep character device by the instance for the type of unit. The callback
/// receives bits of notification from unit if the type supports it.
pub fn open_alsa_firewire<F>(
    path: &str,
    unit_type: UnitType,
    notified_cb: F,
) -> Result<AlsaFirewire, Error>
where
    F: Fn(u32) + Send + Sync + 'static,
{
    let unit = match unit_type {
        UnitType::Dice => {
            let unit = SndDice::new();
            unit.connect_notified(move |_, bits| notified_cb(bits));
            unit.upcast::<AlsaFirewire>()
        }
        UnitType::Digi00x => SndDigi00x::new().upcast(),
        UnitType::Tascam => SndTascam::new().upcast(),
        UnitType::Motu => SndMotu::new().upcast(),
        _ => SndUnit::new().upcast(),
    };

    unit.open(path, 0)
        .map_err(|err| from_glib_error(err, path))?;

    Ok(unit)
}
