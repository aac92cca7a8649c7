// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2022 Takashi Sakamoto

//! The node in IEEE 1394 bus, operated by ALSA hwdep character device and FireWire character
//! device in Linux.

use {
    super::{cmdline::UnitTarget, dispatcher::Dispatcher, hwdep::*},
    firewire_protocols_core::*,
    hinawa::{
        prelude::{FwFcpExt, FwFcpExtManual, FwNodeExt, FwNodeExtManual, FwReqExtManual},
        FwFcp, FwNode, FwReq, FwTcode,
    },
    hitaki::{prelude::*, AlsaFirewire},
    std::{
        sync::{Arc, Condvar, Mutex},
        time::Duration,
    },
    tracing::debug,
};

const FCP_FRAME_SIZE: usize = 0x200;

/// The bits of notification delivered by the unit but not consumed yet.
#[derive(Default, Debug)]
struct PendingNotification {
    bits: Mutex<u32>,
    cond: Condvar,
}

impl PendingNotification {
    fn raise(&self, bits: u32) {
        debug!("Notification: 0x{:08x}", bits);
        if let Ok(mut pending) = self.bits.lock() {
            *pending |= bits;
            self.cond.notify_all();
        }
    }

    fn clear(&self) -> Result<(), Error> {
        self.bits
            .lock()
            .map(|mut pending| *pending = 0)
            .map_err(|_| Error::new(ErrorKind::Io, "Notification is poisoned"))
    }

    // Consume the bits accumulated so far when any of them is in the mask.
    fn wait(&self, mask: u32, timeout_ms: u32) -> Result<u32, Error> {
        let pending = self
            .bits
            .lock()
            .map_err(|_| Error::new(ErrorKind::Io, "Notification is poisoned"))?;
        let (mut pending, res) = self
            .cond
            .wait_timeout_while(pending, Duration::from_millis(timeout_ms as u64), |bits| {
                *bits & mask == 0
            })
            .map_err(|_| Error::new(ErrorKind::Io, "Notification is poisoned"))?;

        if res.timed_out() && *pending & mask == 0 {
            let msg = format!("No notification for 0x{:08x}", mask);
            Err(Error::new(ErrorKind::Timeout, &msg))
        } else {
            let bits = *pending;
            *pending = 0;
            Ok(bits)
        }
    }
}

/// The node operated by character devices in Linux.
pub struct LinuxNode {
    unit: AlsaFirewire,
    node: FwNode,
    req: FwReq,
    fcp: FwFcp,
    config_rom: Vec<u8>,
    notification: Arc<PendingNotification>,
    dispatcher: Option<Dispatcher>,
}

impl std::fmt::Debug for LinuxNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinuxNode")
            .field("card_id", &self.unit.card_id())
            .field("guid", &format!("0x{:016x}", self.unit.guid()))
            .finish()
    }
}

impl Drop for LinuxNode {
    fn drop(&mut self) {
        // Quit the event loop and join the thread before releasing the devices.
        if let Some(dispatcher) = self.dispatcher.take() {
            drop(dispatcher);
        }
    }
}

fn hwdep_path(card_id: u32) -> String {
    format!("/dev/snd/hwC{}D0", card_id)
}

fn resolve_unit<F>(
    target: &UnitTarget,
    unit_type: UnitType,
    notified_cb: F,
) -> Result<AlsaFirewire, Error>
where
    F: Fn(u32) + Clone + Send + Sync + 'static,
{
    match target {
        UnitTarget::Card(card_id) => {
            open_alsa_firewire(&hwdep_path(*card_id), unit_type, notified_cb)
        }
        UnitTarget::Guid(guid) => {
            let entries = std::fs::read_dir("/dev/snd")?;
            entries
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| entry.file_name().into_string().ok())
                .filter(|name| name.starts_with("hwC") && name.ends_with("D0"))
                .map(|name| format!("/dev/snd/{}", name))
                .filter_map(|path| open_alsa_firewire(&path, unit_type, notified_cb.clone()).ok())
                .find(|unit| unit.guid() == *guid)
                .ok_or_else(|| {
                    let msg = format!("No unit found for GUID 0x{:016x}", guid);
                    Error::new(ErrorKind::Argument, &msg)
                })
        }
    }
}

impl LinuxNode {
    /// Open ALSA hwdep character device for the type of unit and FireWire character device for
    /// the node, then start the thread to dispatch events from them.
    pub fn open(target: &UnitTarget, unit_type: UnitType) -> Result<Self, Error> {
        let notification = Arc::new(PendingNotification::default());

        let n = notification.clone();
        let unit = resolve_unit(target, unit_type, move |bits| n.raise(bits))?;

        let path = unit
            .node_device()
            .map(|name| format!("/dev/{}", name))
            .ok_or_else(|| Error::new(ErrorKind::Io, "No character device for the node"))?;
        let node = FwNode::new();
        node.open(&path, 0)
            .map_err(|err| from_glib_error(err, &path))?;

        let config_rom = node
            .config_rom()
            .map(|raw| raw.to_vec())
            .map_err(|err| from_glib_error(err, "configuration ROM"))?;

        let name = format!("{}:{}", unit.card_id(), path);
        let mut dispatcher = Dispatcher::run(name)?;

        dispatcher.attach_alsa_firewire(&unit, |unit| {
            debug!(card_id = unit.card_id(), "Unit is disconnected");
        })?;
        unit.connect_is_locked_notify(|unit| {
            debug!(locked = unit.is_locked(), "Stream lock");
        });

        dispatcher.attach_fw_node(&node, |node| {
            debug!(generation = node.generation(), "Node is disconnected");
        })?;
        node.connect_bus_update(|node| {
            debug!(generation = node.generation(), "Bus reset");
        });

        let fcp = FwFcp::new();
        fcp.bind(&node)
            .map_err(|err| from_glib_error(err, "FCP"))?;

        debug!(
            path = path.as_str(),
            ?unit_type,
            guid = %format!("0x{:016x}", unit.guid()),
            streaming = unit.is_locked(),
            "Open"
        );

        Ok(Self {
            unit,
            node,
            req: FwReq::new(),
            fcp,
            config_rom,
            notification,
            dispatcher: Some(dispatcher),
        })
    }

    /// The numeric identifier of sound card in Linux sound subsystem.
    pub fn card_id(&self) -> u32 {
        self.unit.card_id()
    }

    fn transaction(
        &self,
        tcode: FwTcode,
        addr: u64,
        length: usize,
        frame: &mut [u8],
        timeout_ms: u32,
    ) -> Result<(), Error> {
        self.req
            .transaction(&self.node, tcode, addr, length, frame, timeout_ms)
            .map_err(|err| {
                let label = format!("{:?} at 0x{:012x}", tcode, addr);
                from_glib_error(err, &label)
            })
    }
}

impl BusTransport for LinuxNode {
    fn read_quadlet(&self, addr: u64, timeout_ms: u32) -> Result<u32, Error> {
        let mut frame = [0; 4];
        self.transaction(
            FwTcode::ReadQuadletRequest,
            addr,
            frame.len(),
            &mut frame,
            timeout_ms,
        )
        .map(|_| u32::from_be_bytes(frame))
    }

    fn write_quadlet(&self, addr: u64, quadlet: u32, timeout_ms: u32) -> Result<(), Error> {
        let mut frame = quadlet.to_be_bytes();
        self.transaction(
            FwTcode::WriteQuadletRequest,
            addr,
            frame.len(),
            &mut frame,
            timeout_ms,
        )
    }

    fn read_block(&self, addr: u64, frame: &mut [u8], timeout_ms: u32) -> Result<(), Error> {
        let length = frame.len();
        self.transaction(FwTcode::ReadBlockRequest, addr, length, frame, timeout_ms)
    }

    fn write_block(&self, addr: u64, frame: &[u8], timeout_ms: u32) -> Result<(), Error> {
        let mut frame = frame.to_vec();
        let length = frame.len();
        self.transaction(
            FwTcode::WriteBlockRequest,
            addr,
            length,
            &mut frame,
            timeout_ms,
        )
    }

    fn fcp_transact(&self, cmd: &[u8], timeout_ms: u32) -> Result<Vec<u8>, Error> {
        // The interim response is handled by the binding so that the final one is returned.
        let mut resp = vec![0; FCP_FRAME_SIZE];
        // The binding truncates the response to the received length.
        self.fcp
            .avc_transaction(cmd, &mut resp, timeout_ms)
            .map_err(|err| from_glib_error(err, "FCP"))?;
        Ok(resp)
    }

    fn write_quadlet_and_wait(
        &self,
        addr: u64,
        quadlet: u32,
        mask: u32,
        timeout_ms: u32,
    ) -> Result<u32, Error> {
        // The lock is not held during the write since the event thread raises the bits.
        self.notification.clear()?;
        self.write_quadlet(addr, quadlet, timeout_ms)?;
        self.notification.wait(mask, timeout_ms)
    }

    fn config_rom(&self) -> Result<Vec<u8>, Error> {
        Ok(self.config_rom.clone())
    }

    fn is_streaming(&self) -> bool {
        self.unit.is_locked()
    }

    fn unit_type(&self) -> u32 {
        u32::from(UnitType::from(self.unit.unit_type()))
    }

    fn guid(&self) -> u64 {
        self.unit.guid()
    }

    fn node_device(&self) -> String {
        self.unit
            .node_device()
            .map(|name| format!("/dev/{}", name))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use {super::*, std::thread};

    #[test]
    fn notification_after_clear() {
        let notification = PendingNotification::default();
        notification.raise(0x00000020);
        notification.raise(0x00000001);
        notification.clear().unwrap();

        let err = notification.wait(0x20, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);

        notification.raise(0x00000010);
        notification.raise(0x00000020);
        assert_eq!(notification.wait(0x20, 10).unwrap(), 0x30);
        assert_eq!(*notification.bits.lock().unwrap(), 0);
    }

    #[test]
    fn notification_from_thread() {
        let notification = Arc::new(PendingNotification::default());

        let n = notification.clone();
        let th = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            n.raise(0x00000004);
            n.raise(0x00000020);
        });

        assert_eq!(notification.wait(0x20, 1000).unwrap() & 0x20, 0x20);
        th.join().unwrap();
    }
}
