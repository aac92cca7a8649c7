// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2021 Takashi Sakamoto

//! Protocol implementation for console models, FW-1884 and FW-1082.
//!
//! The console models have control surface with LEDs. The state of LED is changed by the
//! position of LED and the state.

use super::*;

/// The protocol implementation of console models.
#[derive(Default, Debug)]
pub struct TscmConsoleProtocol;

impl TscmSpecification for TscmConsoleProtocol {
    const OPTICAL_OUTPUT_SOURCES: &'static [OpticalOutputSource] = &[
        OpticalOutputSource::StreamInputPairs,
        OpticalOutputSource::CoaxialOutputPair0,
        OpticalOutputSource::AnalogInputPair0,
    ];
    const HAS_OPTICAL_OUTPUT_EXTRA_FLAG: bool = false;
}

/// The positions of LEDs turned on.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLedState(pub Vec<u16>);

const MASTER_FADER_ASSIGN_MASK: u8 = 0x40;

impl TscmConsoleProtocol {
    /// Turn on or off the LED at the position.
    pub fn operate_led(
        node: &dyn BusTransport,
        pos: u16,
        enable: bool,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let mut frame = [0; 4];
        frame[0..2].copy_from_slice(&(enable as u16).to_be_bytes());
        frame[2..4].copy_from_slice(&pos.to_be_bytes());
        write_value(node, LED_OFFSET, u32::from_be_bytes(frame), timeout_ms)
    }

    /// Turn on or off the LED at the position, then cache the state.
    pub fn operate_led_cached(
        state: &mut ConsoleLedState,
        node: &dyn BusTransport,
        pos: u16,
        enable: bool,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        Self::operate_led(node, pos, enable, timeout_ms).map(|_| {
            if !enable {
                state.0.retain(|&p| p != pos);
            } else if state.0.iter().find(|&p| *p == pos).is_none() {
                state.0.push(pos);
            }
        })
    }

    /// Turn off all of LEDs in the cache.
    pub fn clear_leds(
        state: &mut ConsoleLedState,
        node: &dyn BusTransport,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let cache = state.0.to_vec();
        cache
            .iter()
            .try_for_each(|&pos| Self::operate_led_cached(state, node, pos, false, timeout_ms))
    }

    /// Whether the master fader is assigned to analog output 1/2.
    pub fn get_master_fader_assign(node: &dyn BusTransport, timeout_ms: u32) -> Result<bool, Error> {
        read_config_flags(node, timeout_ms).map(|val| val & MASTER_FADER_ASSIGN_MASK == 0)
    }

    pub fn set_master_fader_assign(
        node: &dyn BusTransport,
        assign: bool,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let flag = if assign {
            0x00
        } else {
            MASTER_FADER_ASSIGN_MASK
        };
        write_config_flag(node, MASTER_FADER_ASSIGN_MASK, flag, timeout_ms)
    }
}

#[cfg(test)]
mod test {
    use super::{
        super::test::{tscm_node, FLAG_ADDR},
        *,
    };

    #[test]
    fn led_frame() {
        let node = tscm_node();
        let addr = BASE_OFFSET + LED_OFFSET;
        let mut state = ConsoleLedState::default();

        TscmConsoleProtocol::operate_led_cached(&mut state, &node, 0x8e, true, 100).unwrap();
        TscmConsoleProtocol::operate_led_cached(&mut state, &node, 0x16, true, 100).unwrap();
        TscmConsoleProtocol::operate_led_cached(&mut state, &node, 0x16, true, 100).unwrap();
        assert_eq!(state.0, vec![0x8e, 0x16]);

        TscmConsoleProtocol::clear_leds(&mut state, &node, 100).unwrap();
        assert!(state.0.is_empty());
        assert_eq!(
            node.quadlet_writes(addr),
            vec![0x0001008e, 0x00010016, 0x00010016, 0x0000008e, 0x00000016]
        );
    }

    #[test]
    fn master_fader_assign() {
        let node = tscm_node();
        node.set_quadlet(FLAG_ADDR, 0x00000040);
        assert!(!TscmConsoleProtocol::get_master_fader_assign(&node, 100).unwrap());

        TscmConsoleProtocol::set_master_fader_assign(&node, true, 100).unwrap();
        assert_eq!(node.quadlet_writes(FLAG_ADDR), vec![0x00400000]);
        assert!(TscmConsoleProtocol::get_master_fader_assign(&node, 100).unwrap());

        TscmConsoleProtocol::set_master_fader_assign(&node, false, 100).unwrap();
        assert_eq!(node.quadlet_writes(FLAG_ADDR)[1], 0x00004000);
        assert!(!TscmConsoleProtocol::get_master_fader_assign(&node, 100).unwrap());
    }

    #[test]
    fn optical_output_without_extra_flag() {
        let node = tscm_node();
        node.set_quadlet(FLAG_ADDR, 0x0000000c);
        let err = TscmConsoleProtocol::get_opt_output_source(&node, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let err = TscmConsoleProtocol::set_opt_output_source(
            &node,
            OpticalOutputSource::AnalogOutputPairs,
            100,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);

        TscmConsoleProtocol::set_opt_output_source(
            &node,
            OpticalOutputSource::CoaxialOutputPair0,
            100,
        )
        .unwrap();
        assert_eq!(node.quadlet(FLAG_ADDR), 0x00000004);
    }
}
