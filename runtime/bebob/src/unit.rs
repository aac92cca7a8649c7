// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2020 Takashi Sakamoto

use {
    firewire_bebob_protocols::bridgeco::*,
    firewire_protocols_core::*,
    runtime_core::{check_unit_type, config_rom::*, hwdep::UnitType},
    ta1394_avc_general::general::*,
    tracing::debug,
};

/// The description of plug gathered by queries of extended plug info.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlugDescriptor {
    pub plug_type: BcoPlugType,
    pub name: String,
    pub ch_count: u8,
    pub clusters: Vec<BcoCluster>,
    pub cluster_infos: Vec<BcoClusterInfo>,
}

/// The unit of ASICs of BeBoB solution.
#[derive(Debug)]
pub struct BebobUnit<T: BusTransport> {
    node: T,
    name: String,
    vendor_id: u32,
    model_id: u32,
    timeout_ms: u32,
}

impl<T: BusTransport> BebobUnit<T> {
    pub fn new(node: T) -> Result<Self, Error> {
        check_unit_type(&node, UnitType::Bebob)?;

        let raw = node.config_rom()?;
        let data = parse_root_data(&raw)?;
        let name = if !data.model_name.is_empty() {
            data.model_name.clone()
        } else {
            format!("0x{:06x}:0x{:06x}", data.vendor_id, data.model_id)
        };
        debug!(
            vendor_id = data.vendor_id,
            model_id = data.model_id,
            name = name.as_str()
        );

        Ok(Self {
            node,
            name,
            vendor_id: data.vendor_id,
            model_id: data.model_id,
            timeout_ms: TIMEOUT_MS,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vendor_id(&self) -> u32 {
        self.vendor_id
    }

    pub fn model_id(&self) -> u32 {
        self.model_id
    }

    pub fn node(&self) -> &T {
        &self.node
    }

    pub fn supported_sampling_rates(&self) -> &'static [u32] {
        SAMPLING_RATES
    }

    /// The rate of the first isochronous output plug of unit.
    pub fn get_sampling_rate(&self) -> Result<u32, Error> {
        let mut op = PlugSignalFormat::new(PlugDirection::Output, 0);
        op.get(&self.node, self.timeout_ms)?;
        debug!(rate = op.rate);
        Ok(op.rate)
    }

    /// Configure the first isochronous output plug, then the first isochronous input plug.
    pub fn set_sampling_rate(&mut self, rate: u32) -> Result<(), Error> {
        check_idle(&self.node)?;
        if !self.supported_sampling_rates().contains(&rate) {
            let msg = format!("Invalid sampling rate: {}", rate);
            Err(Error::new(ErrorKind::Argument, &msg))?;
        }

        [PlugDirection::Output, PlugDirection::Input]
            .iter()
            .try_for_each(|&direction| {
                let mut op = PlugSignalFormat::new(direction, 0);
                op.rate = rate;
                let res = op.set(&self.node, self.timeout_ms);
                debug!(params = ?op, ?res);
                res
            })
    }

    /// Gather type, name, channels, and clusters of the plug.
    pub fn plug_descriptor(&self, addr: &BcoPlugAddr) -> Result<PlugDescriptor, Error> {
        let plug_type = get_plug_type(&self.node, addr, self.timeout_ms)?;
        let name = get_plug_name(&self.node, addr, self.timeout_ms)?;
        let ch_count = get_plug_ch_count(&self.node, addr, self.timeout_ms)?;
        let clusters = get_plug_ch_positions(&self.node, addr, self.timeout_ms)?;

        // The index of cluster is 1-origin.
        let cluster_infos = (1..=clusters.len())
            .map(|i| get_plug_cluster_info(&self.node, addr, i as u8, self.timeout_ms))
            .collect::<Result<Vec<_>, Error>>()?;

        let desc = PlugDescriptor {
            plug_type,
            name,
            ch_count,
            clusters,
            cluster_infos,
        };
        debug!(?addr, ?desc);
        Ok(desc)
    }

    pub fn plug_ch_name(&self, addr: &BcoPlugAddr, pos: u8) -> Result<String, Error> {
        get_plug_ch_name(&self.node, addr, pos, self.timeout_ms)
    }

    /// The plug as signal source to the plug.
    pub fn plug_input(&self, addr: &BcoPlugAddr) -> Result<BcoIoPlugAddr, Error> {
        get_plug_input(&self.node, addr, self.timeout_ms)
    }

    /// The plugs as signal destination from the plug.
    pub fn plug_outputs(&self, addr: &BcoPlugAddr) -> Result<Vec<BcoIoPlugAddr>, Error> {
        get_plug_outputs(&self.node, addr, self.timeout_ms)
    }
}

#[cfg(test)]
mod test {
    use {super::*, firewire_protocols_core::mock::*};

    fn bebob_node() -> MockNode {
        let node = MockNode::new(3, 0x000ff20000000001);
        node.set_config_rom(&unit_config_rom(0x000ff2, 0x00a02d, 0x010001, 0x010062));
        node
    }

    fn plug_info_response(info: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0x0c, 0xff, 0x02, 0xc0, 0x01, 0x00, 0x00, 0x00, 0xff];
        frame.extend_from_slice(info);
        frame.extend_from_slice(payload);
        frame
    }

    #[test]
    fn unit_detection() {
        let unit = BebobUnit::new(bebob_node()).unwrap();
        assert_eq!(unit.vendor_id(), 0x000ff2);
        assert_eq!(unit.model_id(), 0x010062);
        assert_eq!(unit.name(), "0x000ff2:0x010062");

        let node = MockNode::new(1, 0);
        node.set_config_rom(&unit_config_rom(0x000ff2, 0x00a02d, 0x010001, 0x010062));
        let err = BebobUnit::new(node).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn sampling_rate_on_both_plugs() {
        let mut unit = BebobUnit::new(bebob_node()).unwrap();

        unit.node()
            .queue_fcp_response(&[0x09, 0xff, 0x18, 0x00, 0x90, 0x03, 0xff, 0xff]);
        unit.node()
            .queue_fcp_response(&[0x09, 0xff, 0x19, 0x00, 0x90, 0x03, 0xff, 0xff]);
        unit.set_sampling_rate(88200).unwrap();

        unit.node()
            .queue_fcp_response(&[0x0c, 0xff, 0x18, 0x00, 0x90, 0x03, 0xff, 0xff]);
        assert_eq!(unit.get_sampling_rate().unwrap(), 88200);

        let cmds = unit.node().fcp_commands();
        assert_eq!(cmds[0], vec![0x00, 0xff, 0x18, 0x00, 0x90, 0x03, 0xff, 0xff]);
        assert_eq!(cmds[1], vec![0x00, 0xff, 0x19, 0x00, 0x90, 0x03, 0xff, 0xff]);
        assert_eq!(cmds[2], vec![0x01, 0xff, 0x18, 0x00, 0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn sampling_rate_rejected() {
        let mut unit = BebobUnit::new(bebob_node()).unwrap();

        let err = unit.set_sampling_rate(22050).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(unit.node().fcp_commands().len(), 0);

        unit.node()
            .queue_fcp_response(&[0x0a, 0xff, 0x18, 0x00, 0x90, 0x06, 0xff, 0xff]);
        let err = unit.set_sampling_rate(192000).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
        // The input plug is left as is.
        assert_eq!(unit.node().fcp_commands().len(), 1);
    }

    #[test]
    fn mutation_during_streaming() {
        let mut unit = BebobUnit::new(bebob_node()).unwrap();
        unit.node().set_streaming(true);

        let err = unit.set_sampling_rate(48000).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Busy);
        assert_eq!(unit.node().fcp_commands().len(), 0);
    }

    #[test]
    fn plug_descriptor_with_clusters() {
        let unit = BebobUnit::new(bebob_node()).unwrap();
        let addr =
            BcoPlugAddr::new_for_unit(BcoPlugDirection::Output, BcoPlugAddrUnitType::Isoc, 0);

        unit.node()
            .queue_fcp_response(&plug_info_response(&[0x00], &[0x00]));
        unit.node().queue_fcp_response(&plug_info_response(
            &[0x01],
            &[0x07, b'P', b'C', b'M', b'-', b'o', b'u', b't'],
        ));
        unit.node()
            .queue_fcp_response(&plug_info_response(&[0x02], &[0x04]));
        unit.node().queue_fcp_response(&plug_info_response(
            &[0x03],
            &[
                0x02, 0x02, 0x01, 0x01, 0x02, 0x02, 0x02, 0x03, 0x01, 0x04, 0x02,
            ],
        ));
        unit.node().queue_fcp_response(&plug_info_response(
            &[0x07],
            &[0x01, 0x03, 0x04, b'L', b'i', b'n', b'e'],
        ));
        unit.node().queue_fcp_response(&plug_info_response(
            &[0x07],
            &[0x02, 0x04, 0x05, b'S', b'P', b'D', b'I', b'F'],
        ));

        let desc = unit.plug_descriptor(&addr).unwrap();
        assert_eq!(desc.plug_type, BcoPlugType::Isoc);
        assert_eq!(desc.name, "PCM-out");
        assert_eq!(desc.ch_count, 4);
        assert_eq!(desc.clusters.len(), 2);
        assert_eq!(desc.clusters[1].entries[0].pos, 0x03);
        assert_eq!(desc.cluster_infos.len(), 2);
        assert_eq!(desc.cluster_infos[0].port_type, BcoPortType::Line);
        assert_eq!(desc.cluster_infos[1].name, "SPDIF");

        let cmds = unit.node().fcp_commands();
        assert_eq!(cmds.len(), 6);
        assert_eq!(cmds[4][9..], [0x07, 0x01, 0xff, 0xff]);
        assert_eq!(cmds[5][9..], [0x07, 0x02, 0xff, 0xff]);
    }

    #[test]
    fn plug_connections() {
        let unit = BebobUnit::new(bebob_node()).unwrap();
        let addr =
            BcoPlugAddr::new_for_unit(BcoPlugDirection::Output, BcoPlugAddrUnitType::Isoc, 0);

        unit.node().queue_fcp_response(&plug_info_response(
            &[0x05],
            &[0x01, 0x01, 0x08, 0x00, 0x00, 0xff, 0xff],
        ));
        let input = unit.plug_input(&addr).unwrap();
        assert_eq!(input.direction, BcoPlugDirection::Output);
        assert_eq!(input.subunit, Some((0x08, 0x00)));

        unit.node().queue_fcp_response(&plug_info_response(&[0x06], &[0x00]));
        assert_eq!(unit.plug_outputs(&addr).unwrap(), Vec::new());

        unit.node().queue_fcp_response(&plug_info_response(
            &[0x04, 0x01],
            &[0x05, b'A', b'n', b'a', b'-', b'1'],
        ));
        assert_eq!(unit.plug_ch_name(&addr, 1).unwrap(), "Ana-1");
    }
}
