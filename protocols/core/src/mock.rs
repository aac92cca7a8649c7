// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2021 Takashi Sakamoto

//! In-memory node to stand for actual hardware.
//!
//! The node keeps quadlets by address, records write transactions in order, returns queued
//! response frames for FCP transactions, and raises queued notifications in reply to write
//! transactions which wait for them. Hooks can be registered per address to emulate registers
//! whose content differs from the written value.

use {
    super::*,
    std::{
        collections::{HashMap, VecDeque},
        sync::Mutex,
    },
};

type WriteHook = Box<dyn Fn(u32, u32) -> u32 + Send>;

#[derive(Default)]
struct MockNodeState {
    quadlets: HashMap<u64, u32>,
    hooks: HashMap<u64, WriteHook>,
    writes: Vec<(u64, Vec<u8>)>,
    fcp_commands: Vec<Vec<u8>>,
    fcp_responses: VecDeque<Vec<u8>>,
    notifications: VecDeque<u32>,
    pending_bits: u32,
    failing: Vec<u64>,
    streaming: bool,
    config_rom: Vec<u8>,
}

/// The node on memory.
pub struct MockNode {
    state: Mutex<MockNodeState>,
    unit_type: u32,
    guid: u64,
}

impl Default for MockNode {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl std::fmt::Debug for MockNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockNode")
            .field("unit_type", &self.unit_type)
            .field("guid", &self.guid)
            .finish()
    }
}

impl MockNode {
    pub fn new(unit_type: u32, guid: u64) -> Self {
        Self {
            state: Default::default(),
            unit_type,
            guid,
        }
    }

    fn with_state<F, R>(&self, cb: F) -> R
    where
        F: FnOnce(&mut MockNodeState) -> R,
    {
        // The state is left consistent even if any test thread panics.
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        cb(&mut state)
    }

    /// Put the quadlet to the address without recording it as write transaction.
    pub fn set_quadlet(&self, addr: u64, quadlet: u32) {
        self.with_state(|state| {
            state.quadlets.insert(addr, quadlet);
        });
    }

    /// Get the quadlet at the address.
    pub fn quadlet(&self, addr: u64) -> u32 {
        self.with_state(|state| state.quadlets.get(&addr).copied().unwrap_or_default())
    }

    /// Put the block to the address without recording it as write transaction.
    pub fn set_block(&self, addr: u64, frame: &[u8]) {
        self.with_state(|state| store_block(state, addr, frame));
    }

    /// Register the hook to compute the content of register from the former content and the
    /// written quadlet.
    pub fn set_write_hook<F>(&self, addr: u64, hook: F)
    where
        F: Fn(u32, u32) -> u32 + Send + 'static,
    {
        self.with_state(|state| {
            state.hooks.insert(addr, Box::new(hook));
        });
    }

    /// Let any transaction to the address fail.
    pub fn set_failing(&self, addr: u64) {
        self.with_state(|state| state.failing.push(addr));
    }

    /// The list of write transactions in order.
    pub fn writes(&self) -> Vec<(u64, Vec<u8>)> {
        self.with_state(|state| state.writes.clone())
    }

    /// The list of quadlets written to the address in order.
    pub fn quadlet_writes(&self, addr: u64) -> Vec<u32> {
        self.with_state(|state| {
            state
                .writes
                .iter()
                .filter(|(a, frame)| *a == addr && frame.len() == 4)
                .map(|(_, frame)| {
                    let mut quadlet = [0; 4];
                    quadlet.copy_from_slice(frame);
                    u32::from_be_bytes(quadlet)
                })
                .collect()
        })
    }

    pub fn clear_writes(&self) {
        self.with_state(|state| state.writes.clear());
    }

    /// Queue the response frame for FCP transaction.
    pub fn queue_fcp_response(&self, frame: &[u8]) {
        self.with_state(|state| state.fcp_responses.push_back(frame.to_vec()));
    }

    /// The list of command frames transmitted by FCP.
    pub fn fcp_commands(&self) -> Vec<Vec<u8>> {
        self.with_state(|state| state.fcp_commands.clone())
    }

    /// Queue the notification raised in reply to the write transaction waiting for notification.
    pub fn queue_notification(&self, bits: u32) {
        self.with_state(|state| state.notifications.push_back(bits));
    }

    /// Raise the notification at once, as if it arrived before any following transaction.
    pub fn raise_notification(&self, bits: u32) {
        self.with_state(|state| state.pending_bits |= bits);
    }

    /// The bits of notification raised but not consumed yet.
    pub fn pending_notification(&self) -> u32 {
        self.with_state(|state| state.pending_bits)
    }

    pub fn set_streaming(&self, streaming: bool) {
        self.with_state(|state| state.streaming = streaming);
    }

    pub fn set_config_rom(&self, raw: &[u8]) {
        self.with_state(|state| state.config_rom = raw.to_vec());
    }
}

/// Build configuration ROM with root directory and one unit directory, without any descriptor.
/// The model ID in unit directory is at the 13th quadlet.
pub fn unit_config_rom(vendor_id: u32, specifier_id: u32, version: u32, model_id: u32) -> Vec<u8> {
    let quadlets = [
        // Bus information block.
        0x04040000,
        0x31333934,
        0xf000b223,
        vendor_id << 8,
        0x00000001,
        // Root directory.
        0x00040000,
        0x03000000 | (vendor_id & 0x00ffffff),
        0x0c0083c0,
        0x17000000 | (model_id & 0x00ffffff),
        0xd1000001,
        // Unit directory.
        0x00030000,
        0x12000000 | (specifier_id & 0x00ffffff),
        0x13000000 | (version & 0x00ffffff),
        0x17000000 | (model_id & 0x00ffffff),
    ];
    quadlets.iter().flat_map(|q: &u32| q.to_be_bytes()).collect()
}

fn store_block(state: &mut MockNodeState, addr: u64, frame: &[u8]) {
    frame.chunks(4).enumerate().for_each(|(i, chunk)| {
        let mut quadlet = [0; 4];
        quadlet[..chunk.len()].copy_from_slice(chunk);
        state
            .quadlets
            .insert(addr + 4 * i as u64, u32::from_be_bytes(quadlet));
    });
}

fn check_failing(state: &MockNodeState, addr: u64) -> Result<(), Error> {
    if state.failing.iter().any(|&a| a == addr) {
        let msg = format!("Transaction to 0x{:012x} failed", addr);
        Err(Error::new(ErrorKind::Io, &msg))
    } else {
        Ok(())
    }
}

impl BusTransport for MockNode {
    fn read_quadlet(&self, addr: u64, _: u32) -> Result<u32, Error> {
        self.with_state(|state| {
            check_failing(state, addr)?;
            Ok(state.quadlets.get(&addr).copied().unwrap_or_default())
        })
    }

    fn write_quadlet(&self, addr: u64, quadlet: u32, _: u32) -> Result<(), Error> {
        self.with_state(|state| {
            check_failing(state, addr)?;
            state.writes.push((addr, quadlet.to_be_bytes().to_vec()));
            let old = state.quadlets.get(&addr).copied().unwrap_or_default();
            let new = match state.hooks.get(&addr) {
                Some(hook) => hook(old, quadlet),
                None => quadlet,
            };
            state.quadlets.insert(addr, new);
            Ok(())
        })
    }

    fn read_block(&self, addr: u64, frame: &mut [u8], _: u32) -> Result<(), Error> {
        self.with_state(|state| {
            check_failing(state, addr)?;
            frame.chunks_mut(4).enumerate().for_each(|(i, chunk)| {
                let quadlet = state
                    .quadlets
                    .get(&(addr + 4 * i as u64))
                    .copied()
                    .unwrap_or_default();
                let len = chunk.len();
                chunk.copy_from_slice(&quadlet.to_be_bytes()[..len]);
            });
            Ok(())
        })
    }

    fn write_block(&self, addr: u64, frame: &[u8], _: u32) -> Result<(), Error> {
        self.with_state(|state| {
            check_failing(state, addr)?;
            state.writes.push((addr, frame.to_vec()));
            store_block(state, addr, frame);
            Ok(())
        })
    }

    fn fcp_transact(&self, cmd: &[u8], _: u32) -> Result<Vec<u8>, Error> {
        self.with_state(|state| {
            state.fcp_commands.push(cmd.to_vec());
            state
                .fcp_responses
                .pop_front()
                .ok_or_else(|| Error::new(ErrorKind::Timeout, "No response frame arrived"))
        })
    }

    fn write_quadlet_and_wait(
        &self,
        addr: u64,
        quadlet: u32,
        mask: u32,
        timeout_ms: u32,
    ) -> Result<u32, Error> {
        self.with_state(|state| state.pending_bits = 0);
        self.write_quadlet(addr, quadlet, timeout_ms)?;
        self.with_state(|state| {
            while let Some(bits) = state.notifications.pop_front() {
                state.pending_bits |= bits;
                if state.pending_bits & mask > 0 {
                    let bits = state.pending_bits;
                    state.pending_bits = 0;
                    return Ok(bits);
                }
            }
            Err(Error::new(ErrorKind::Timeout, "No notification arrived"))
        })
    }

    fn config_rom(&self) -> Result<Vec<u8>, Error> {
        self.with_state(|state| Ok(state.config_rom.clone()))
    }

    fn is_streaming(&self) -> bool {
        self.with_state(|state| state.streaming)
    }

    fn unit_type(&self) -> u32 {
        self.unit_type
    }

    fn guid(&self) -> u64 {
        self.guid
    }

    fn node_device(&self) -> String {
        "/dev/fw1".to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn quadlet_and_block() {
        let node = MockNode::default();
        node.write_quadlet(0x100, 0x01020304, TIMEOUT_MS).unwrap();
        let mut frame = [0; 6];
        node.read_block(0x100, &mut frame, TIMEOUT_MS).unwrap();
        assert_eq!(frame, [0x01, 0x02, 0x03, 0x04, 0x00, 0x00]);

        node.write_block(0x200, &[0xaa, 0xbb, 0xcc, 0xdd, 0xee], TIMEOUT_MS)
            .unwrap();
        assert_eq!(node.read_quadlet(0x204, TIMEOUT_MS).unwrap(), 0xee000000);
        assert_eq!(node.quadlet_writes(0x100), vec![0x01020304]);
        assert_eq!(node.writes().len(), 2);
    }

    #[test]
    fn write_hook() {
        let node = MockNode::default();
        node.set_quadlet(0x10, 0x0000000f);
        node.set_write_hook(0x10, |old, written| old ^ written);
        node.write_quadlet(0x10, 0x00000003, TIMEOUT_MS).unwrap();
        assert_eq!(node.quadlet(0x10), 0x0000000c);
    }

    #[test]
    fn notification_by_mask() {
        let node = MockNode::default();
        node.queue_notification(0x00000001);
        node.queue_notification(0x00000020);
        let bits = node
            .write_quadlet_and_wait(0x10, 0x01, 0x20, TIMEOUT_MS)
            .unwrap();
        assert_eq!(bits, 0x21);
        assert_eq!(node.quadlet_writes(0x10), vec![0x01]);

        let err = node
            .write_quadlet_and_wait(0x10, 0x02, 0x20, TIMEOUT_MS)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn notification_before_write_is_discarded() {
        let node = MockNode::default();
        node.raise_notification(0x00000020);
        node.raise_notification(0x00000010);
        assert_eq!(node.pending_notification(), 0x30);

        let err = node
            .write_quadlet_and_wait(0x10, 0x01, 0x20, TIMEOUT_MS)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(node.pending_notification(), 0);
        assert_eq!(node.quadlet_writes(0x10), vec![0x01]);
    }
}
