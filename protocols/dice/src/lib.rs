// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2020 Takashi Sakamoto

#![doc = include_str!("../README.md")]

pub mod tcat;

use firewire_protocols_core::{BusTransport, Error, ErrorKind};

fn serialize_u32(val: &u32, raw: &mut [u8]) {
    assert!(raw.len() >= 4);

    raw[..4].copy_from_slice(&val.to_be_bytes())
}

fn deserialize_u32(val: &mut u32, raw: &[u8]) {
    assert!(raw.len() >= 4);

    let mut quadlet = [0; 4];
    quadlet.copy_from_slice(&raw[..4]);
    *val = u32::from_be_bytes(quadlet);
}
