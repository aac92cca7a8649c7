// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2021 Takashi Sakamoto

#![doc = include_str!("../README.md")]

pub mod bridgeco;

use {
    firewire_protocols_core::{Error, ErrorKind},
    ta1394_avc_general::*,
};
