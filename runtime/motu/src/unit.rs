// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2021 Takashi Sakamoto

use {
    firewire_motu_protocols::*,
    firewire_protocols_core::*,
    runtime_core::{check_unit_type, config_rom::*, hwdep::UnitType},
    tracing::debug,
};

// The version of unit directory for 896, which has no model identifier of its own.
const F896_UNIT_VERSION: u32 = 0x000002;

/// The unit of MOTU FireWire series.
#[derive(Debug)]
pub struct MotuUnit<T: BusTransport> {
    node: T,
    model: MotuModel,
    timeout_ms: u32,
}

fn detect_model(raw: &[u8]) -> Result<MotuModel, Error> {
    MotuModel::from_config_rom(raw).or_else(|err| {
        if err.kind() != ErrorKind::Unsupported {
            Err(err)
        } else {
            match parse_unit_data(raw) {
                Ok(data) if data.version == F896_UNIT_VERSION => Ok(MotuModel::F896),
                _ => Err(err),
            }
        }
    })
}

impl<T: BusTransport> MotuUnit<T> {
    pub fn new(node: T) -> Result<Self, Error> {
        check_unit_type(&node, UnitType::Motu)?;

        let raw = node.config_rom()?;
        let model = detect_model(&raw)?;
        debug!(?model, version = ?model.version());

        Ok(Self {
            node,
            model,
            timeout_ms: TIMEOUT_MS,
        })
    }

    pub fn model(&self) -> MotuModel {
        self.model
    }

    pub fn node(&self) -> &T {
        &self.node
    }

    pub fn supported_sampling_rates(&self) -> &'static [u32] {
        self.model.supported_sampling_rates()
    }

    pub fn get_sampling_rate(&self) -> Result<u32, Error> {
        let rate = self.model.get_sampling_rate(&self.node, self.timeout_ms)?;
        if !self.supported_sampling_rates().contains(&rate) {
            let msg = format!("Unexpected sampling rate for {}: {}", self.model.name(), rate);
            Err(Error::new(ErrorKind::Protocol, &msg))?;
        }
        Ok(rate)
    }

    pub fn set_sampling_rate(&mut self, rate: u32) -> Result<(), Error> {
        check_idle(&self.node)?;
        if !self.supported_sampling_rates().contains(&rate) {
            let msg = format!("Invalid sampling rate for {}: {}", self.model.name(), rate);
            Err(Error::new(ErrorKind::Argument, &msg))?;
        }
        self.model
            .set_sampling_rate(&self.node, rate, self.timeout_ms)
    }

    /// The list depends on current mode of optical interfaces in some models.
    pub fn supported_clock_sources(&self) -> Result<Vec<MotuClockSource>, Error> {
        self.model.supported_clock_sources(&self.node, self.timeout_ms)
    }

    pub fn get_clock_source(&self) -> Result<MotuClockSource, Error> {
        let src = self.model.get_clock_source(&self.node, self.timeout_ms)?;
        if !self.supported_clock_sources()?.contains(&src) {
            let msg = format!("Unexpected source of sampling clock: {}", src.label());
            Err(Error::new(ErrorKind::Protocol, &msg))?;
        }
        Ok(src)
    }

    pub fn set_clock_source(&mut self, src: MotuClockSource) -> Result<(), Error> {
        check_idle(&self.node)?;
        if !self.supported_clock_sources()?.contains(&src) {
            let msg = format!("Invalid source of sampling clock: {}", src.label());
            Err(Error::new(ErrorKind::Argument, &msg))?;
        }
        self.model.set_clock_source(&self.node, src, self.timeout_ms)
    }

    pub fn supported_opt_iface_modes(&self) -> &'static [OptIfaceMode] {
        self.model.supported_opt_iface_modes()
    }

    pub fn supported_opt_iface_directions(&self) -> &'static [OptIfaceDirection] {
        self.model.supported_opt_iface_directions()
    }

    pub fn supported_opt_iface_indexes(&self) -> &'static [OptIfaceIndex] {
        self.model.supported_opt_iface_indexes()
    }

    fn check_opt_iface(
        &self,
        direction: OptIfaceDirection,
        index: OptIfaceIndex,
    ) -> Result<(), Error> {
        if !self.supported_opt_iface_directions().contains(&direction) {
            let msg = format!("Invalid direction of optical interface: {}", direction.label());
            Err(Error::new(ErrorKind::Argument, &msg))?;
        }
        if !self.supported_opt_iface_indexes().contains(&index) {
            let msg = format!(
                "Optical interface {} is not available for {}",
                index.label(),
                self.model.name()
            );
            Err(Error::new(ErrorKind::Argument, &msg))?;
        }
        Ok(())
    }

    pub fn get_opt_iface_mode(
        &self,
        direction: OptIfaceDirection,
        index: OptIfaceIndex,
    ) -> Result<OptIfaceMode, Error> {
        self.check_opt_iface(direction, index)?;
        let mode = self
            .model
            .get_opt_iface_mode(&self.node, direction, index, self.timeout_ms)?;
        if !self.supported_opt_iface_modes().contains(&mode) {
            let msg = format!("Unexpected mode of optical interface: {}", mode.label());
            Err(Error::new(ErrorKind::Protocol, &msg))?;
        }
        Ok(mode)
    }

    pub fn set_opt_iface_mode(
        &mut self,
        direction: OptIfaceDirection,
        index: OptIfaceIndex,
        mode: OptIfaceMode,
    ) -> Result<(), Error> {
        check_idle(&self.node)?;
        self.check_opt_iface(direction, index)?;
        if !self.supported_opt_iface_modes().contains(&mode) {
            let msg = format!("Invalid mode of optical interface: {}", mode.label());
            Err(Error::new(ErrorKind::Argument, &msg))?;
        }
        self.model
            .set_opt_iface_mode(&self.node, direction, index, mode, self.timeout_ms)
    }
}

#[cfg(test)]
mod test {
    use {super::*, firewire_protocols_core::mock::*};

    const BASE_OFFSET: u64 = 0xfffff0000000;

    fn motu_node(version: u32, model_id: u32) -> MockNode {
        let node = MockNode::new(7, 0x0001f20000000001);
        node.set_config_rom(&unit_config_rom(0x0001f2, 0x0001f2, version, model_id));
        node
    }

    #[test]
    fn unit_detection() {
        let unit = MotuUnit::new(motu_node(0x000003, 0x101800)).unwrap();
        assert_eq!(unit.model(), MotuModel::F828mk2);

        let unit = MotuUnit::new(motu_node(0x000015, 0x106800)).unwrap();
        assert_eq!(unit.model().version(), MotuVersion::V3);

        let unit = MotuUnit::new(motu_node(0x000002, 0x000002)).unwrap();
        assert_eq!(unit.model(), MotuModel::F896);

        let err = MotuUnit::new(motu_node(0x000009, 0x000009)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);

        let node = MockNode::new(6, 0);
        node.set_config_rom(&unit_config_rom(0x0001f2, 0x0001f2, 0x000003, 0x101800));
        let err = MotuUnit::new(node).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn sampling_rate_round_trip() {
        [(0x000001, 0x102802), (0x000003, 0x101800), (0x000015, 0x106800)]
            .iter()
            .for_each(|&(version, model_id)| {
                let mut unit = MotuUnit::new(motu_node(version, model_id)).unwrap();
                unit.supported_sampling_rates().iter().for_each(|&rate| {
                    unit.set_sampling_rate(rate).unwrap();
                    assert_eq!(unit.get_sampling_rate().unwrap(), rate);
                });
                let err = unit.set_sampling_rate(32000).unwrap_err();
                assert_eq!(err.kind(), ErrorKind::Argument);
            });
    }

    #[test]
    fn unexpected_sampling_rate() {
        let unit = MotuUnit::new(motu_node(0x000001, 0x102802)).unwrap();
        // The doubled rate is not available in 828.
        unit.node().set_quadlet(BASE_OFFSET + 0x0b00, 0x00000008);
        let err = unit.get_sampling_rate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn clock_source_by_optical_mode() {
        let mut unit = MotuUnit::new(motu_node(0x000015, 0x106800)).unwrap();
        unit.set_opt_iface_mode(
            OptIfaceDirection::Input,
            OptIfaceIndex::A,
            OptIfaceMode::Adat,
        )
        .unwrap();
        unit.set_opt_iface_mode(
            OptIfaceDirection::Input,
            OptIfaceIndex::B,
            OptIfaceMode::Spdif,
        )
        .unwrap();

        let srcs = unit.supported_clock_sources().unwrap();
        assert_eq!(
            srcs,
            vec![
                MotuClockSource::Internal,
                MotuClockSource::WordOnBnc,
                MotuClockSource::AdatOnOptA,
                MotuClockSource::SpdifOnOptB,
            ]
        );
        srcs.iter().for_each(|&src| {
            unit.set_clock_source(src).unwrap();
            assert_eq!(unit.get_clock_source().unwrap(), src);
        });

        let err = unit
            .set_clock_source(MotuClockSource::SpdifOnCoax)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn opt_iface_mode_and_packet_format() {
        let mut unit = MotuUnit::new(motu_node(0x000001, 0x102802)).unwrap();
        let packet_addr = BASE_OFFSET + 0x0b10;

        unit.supported_opt_iface_directions()
            .iter()
            .for_each(|&direction| {
                let mask = match direction {
                    OptIfaceDirection::Input => 0x00000080,
                    OptIfaceDirection::Output => 0x00000040,
                };
                unit.supported_opt_iface_modes().iter().for_each(|&mode| {
                    unit.set_opt_iface_mode(direction, OptIfaceIndex::A, mode)
                        .unwrap();
                    assert_eq!(
                        unit.get_opt_iface_mode(direction, OptIfaceIndex::A)
                            .unwrap(),
                        mode
                    );
                    let packet = unit.node().quadlet(packet_addr);
                    assert_eq!(packet & mask > 0, mode != OptIfaceMode::Adat);
                });
            });

        let err = unit
            .get_opt_iface_mode(OptIfaceDirection::Input, OptIfaceIndex::B)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn mutation_during_streaming() {
        let mut unit = MotuUnit::new(motu_node(0x000003, 0x101800)).unwrap();
        unit.node().set_streaming(true);

        let err = unit.set_sampling_rate(96000).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Busy);
        let err = unit
            .set_clock_source(MotuClockSource::WordOnBnc)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Busy);
        let err = unit
            .set_opt_iface_mode(
                OptIfaceDirection::Output,
                OptIfaceIndex::A,
                OptIfaceMode::Spdif,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Busy);
        assert_eq!(unit.node().writes().len(), 0);
    }
}
