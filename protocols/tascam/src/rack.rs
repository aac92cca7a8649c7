// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2021 Takashi Sakamoto

//! Protocol implementation for rack model, FW-1804.
//!
//! The rack model has no control surface. Instead, the parameters of input channels to stereo
//! monitor are configured by software. The register for the parameters is write-only, thus the
//! parameters are cached in the side of software.
//!
//! ## Diagram of internal signal flow
//!
//! ```text
//!
//! analog-input-0/1 ------+---------------------+--------> stream-output-0/1
//! analog-input-2/3 ------|--+------------------|--------> stream-output-2/3
//! analog-input-4/5 ------|--|--+---------------|--------> stream-output-4/5
//! analog-input-6/7 ------|--|--|--+------------|--------> stream-output-6/7
//! coaxial-input-0/1 -----|--|--|--|------------|--------> stream-output-8/9
//! optical-input-0/1 -----|--|--|--|------------|--------> stream-output-10/11
//! optical-input-2/3 -----|--|--|--|------------|--------> stream-output-12/13
//! optical-input-4/5 -----|--|--|--|------------|--------> stream-output-14/15
//! optical-input-6/7 -----|--|--|--|------------|--------> stream-output-16/17
//!                        v  v  v  v            |
//!                      ++==========++          |
//!                      || monitor  ||          |
//!                      ++==========++          |
//!                            |                 |
//!                            v                 |
//!                      ++==========++          |
//! stream-input-0/1 --> ||  mixer   || --+------|--------> analog-output-0/1
//!                      ++==========++   |      |
//!                                       v      |
//! stream-input-3/4   -------------> (one of) --|--+-----> coaxial-output-0/1
//!                                              |  |
//!                                              v  v
//! stream-input-5..11 ----------------------> (one of) --> optical-output-0..7
//! ```

use {
    super::*,
    firewire_protocols_core::level::{scale_down, scale_round},
};

/// The protocol implementation of rack model.
#[derive(Default, Debug)]
pub struct TscmRackProtocol;

impl TscmSpecification for TscmRackProtocol {
    const OPTICAL_OUTPUT_SOURCES: &'static [OpticalOutputSource] = &[
        OpticalOutputSource::StreamInputPairs,
        OpticalOutputSource::CoaxialOutputPair0,
        OpticalOutputSource::AnalogInputPair0,
        OpticalOutputSource::AnalogOutputPairs,
    ];
    const HAS_OPTICAL_OUTPUT_EXTRA_FLAG: bool = true;
}

/// The number of input channels.
pub const RACK_CHANNEL_COUNT: usize = 18;

/// The labels of input channels.
pub const RACK_CHANNEL_LABELS: [&str; RACK_CHANNEL_COUNT] = [
    "Analog-1", "Analog-2", "Analog-3", "Analog-4", "Analog-5", "Analog-6", "Analog-7",
    "Analog-8", "ADAT-1", "ADAT-2", "ADAT-3", "ADAT-4", "ADAT-5", "ADAT-6", "ADAT-7", "ADAT-8",
    "S/PDIF-1", "S/PDIF-2",
];

const FRAME_SIZE: usize = 4;
const RACK_STATE_SIZE: usize = RACK_CHANNEL_COUNT * FRAME_SIZE;

const INPUT_OFFSET: u64 = 0x0408;

const MUTE_FLAG: u8 = 0x80;
const INDEX_MASK: u8 = 0x7f;

const GAIN_MAX: u32 = 0x7fff;
const BALANCE_MAX: u32 = 0xff;

/// The maximum value of gain and balance at the interface.
pub const LEVEL_MAX: u32 = 99;

/// The firewire LED turned on by the high bit of the first byte.
const FIREWIRE_LED_FLAG: u32 = 0x80000000;

/// State of input channels, consisting of frames for each channel.
///
/// Each frame consists of 4 bytes; the index of channel with mute flag in the most significant
/// bit, L/R balance, and gain in big endian.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RackInputState(pub [u8; RACK_STATE_SIZE]);

impl Default for RackInputState {
    fn default() -> Self {
        let mut raw = [0; RACK_STATE_SIZE];
        raw.chunks_exact_mut(FRAME_SIZE)
            .enumerate()
            .for_each(|(i, frame)| {
                frame[0] = i as u8;
                frame[1] = if i % 2 > 0 { 0xff } else { 0x00 };
                frame[2..4].copy_from_slice(&(GAIN_MAX as u16).to_be_bytes());
            });
        Self(raw)
    }
}

impl RackInputState {
    fn frame(&self, ch: usize) -> &[u8] {
        let pos = ch * FRAME_SIZE;
        &self.0[pos..(pos + FRAME_SIZE)]
    }
}

/// Find the index of input channel by the label.
pub fn rack_channel_index(label: &str) -> Result<usize, Error> {
    RACK_CHANNEL_LABELS
        .iter()
        .position(|&l| l == label)
        .ok_or_else(|| {
            let msg = format!("Invalid label of input channel: {}", label);
            Error::new(ErrorKind::Argument, &msg)
        })
}

fn check_channel(ch: usize) -> Result<(), Error> {
    if ch >= RACK_CHANNEL_COUNT {
        let msg = format!("Invalid index of input channel: {}", ch);
        Err(Error::new(ErrorKind::Argument, &msg))
    } else {
        Ok(())
    }
}

fn check_level(level: u32, label: &str) -> Result<(), Error> {
    if level > LEVEL_MAX {
        let msg = format!("Invalid value for {}: {} but 0..={}", label, level, LEVEL_MAX);
        Err(Error::new(ErrorKind::Argument, &msg))
    } else {
        Ok(())
    }
}

/// Serialize the state for cache in the form of text; one byte in hexadecimal per line.
pub fn serialize_rack_input_state(state: &RackInputState) -> String {
    state.0.iter().map(|b| format!("{:02x}\n", b)).collect()
}

/// Deserialize the state from the cache in the form of text.
pub fn deserialize_rack_input_state(state: &mut RackInputState, text: &str) -> Result<(), Error> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() != RACK_STATE_SIZE {
        let msg = format!(
            "Unexpected number of lines in cache: {} but {} expected",
            lines.len(),
            RACK_STATE_SIZE
        );
        Err(Error::new(ErrorKind::Protocol, &msg))?;
    }

    let mut raw = [0; RACK_STATE_SIZE];
    raw.iter_mut().zip(lines).try_for_each(|(b, line)| {
        u8::from_str_radix(line.trim(), 16)
            .map(|val| *b = val)
            .map_err(|err| {
                let msg = format!("Invalid line in cache: {}: {}", line, err);
                Error::new(ErrorKind::Protocol, &msg)
            })
    })?;
    state.0 = raw;
    Ok(())
}

impl TscmRackProtocol {
    fn write_frame(
        node: &dyn BusTransport,
        state: &mut RackInputState,
        ch: usize,
        frame: [u8; FRAME_SIZE],
        timeout_ms: u32,
    ) -> Result<(), Error> {
        write_value(node, INPUT_OFFSET, u32::from_be_bytes(frame), timeout_ms).map(|_| {
            let pos = ch * FRAME_SIZE;
            state.0[pos..(pos + FRAME_SIZE)].copy_from_slice(&frame);
        })
    }

    fn update_frame<F>(
        node: &dyn BusTransport,
        state: &mut RackInputState,
        ch: usize,
        timeout_ms: u32,
        cb: F,
    ) -> Result<(), Error>
    where
        F: Fn(&mut [u8; FRAME_SIZE]),
    {
        check_channel(ch)?;
        let mut frame = [0; FRAME_SIZE];
        frame.copy_from_slice(state.frame(ch));
        frame[0] = (frame[0] & MUTE_FLAG) | (ch as u8 & INDEX_MASK);
        cb(&mut frame);
        Self::write_frame(node, state, ch, frame, timeout_ms)
    }

    /// Write all of frames in the state.
    pub fn replay(
        node: &dyn BusTransport,
        state: &mut RackInputState,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        (0..RACK_CHANNEL_COUNT)
            .try_for_each(|ch| Self::update_frame(node, state, ch, timeout_ms, |_| ()))
    }

    /// The gain between 0 and 99.
    pub fn get_input_gain(state: &RackInputState, ch: usize) -> Result<u32, Error> {
        check_channel(ch)?;
        let frame = state.frame(ch);
        let gain = u16::from_be_bytes([frame[2], frame[3]]) as u32;
        Ok(scale_round(gain, GAIN_MAX, LEVEL_MAX))
    }

    pub fn set_input_gain(
        node: &dyn BusTransport,
        state: &mut RackInputState,
        ch: usize,
        gain: u32,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        check_level(gain, "gain")?;
        let val = scale_down(gain, LEVEL_MAX, GAIN_MAX) as u16;
        Self::update_frame(node, state, ch, timeout_ms, |frame| {
            frame[2..4].copy_from_slice(&val.to_be_bytes())
        })
    }

    /// The L/R balance between 0 and 99.
    pub fn get_input_balance(state: &RackInputState, ch: usize) -> Result<u32, Error> {
        check_channel(ch)?;
        let balance = state.frame(ch)[1] as u32;
        Ok(scale_round(balance, BALANCE_MAX, LEVEL_MAX))
    }

    pub fn set_input_balance(
        node: &dyn BusTransport,
        state: &mut RackInputState,
        ch: usize,
        balance: u32,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        check_level(balance, "balance")?;
        let val = scale_down(balance, LEVEL_MAX, BALANCE_MAX) as u8;
        Self::update_frame(node, state, ch, timeout_ms, |frame| frame[1] = val)
    }

    pub fn get_input_mute(state: &RackInputState, ch: usize) -> Result<bool, Error> {
        check_channel(ch)?;
        Ok(state.frame(ch)[0] & MUTE_FLAG > 0)
    }

    pub fn set_input_mute(
        node: &dyn BusTransport,
        state: &mut RackInputState,
        ch: usize,
        mute: bool,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        Self::update_frame(node, state, ch, timeout_ms, |frame| {
            frame[0] &= !MUTE_FLAG;
            if mute {
                frame[0] |= MUTE_FLAG;
            }
        })
    }

    /// Turn on or off the LED for FireWire.
    pub fn operate_firewire_led(
        node: &dyn BusTransport,
        enable: bool,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let val = if enable { FIREWIRE_LED_FLAG } else { 0 };
        write_value(node, LED_OFFSET, val, timeout_ms)
    }
}
