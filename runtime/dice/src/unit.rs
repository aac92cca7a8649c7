// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2020 Takashi Sakamoto

use {
    firewire_dice_protocols::tcat::{global_section::*, tcd22xx_spec::*, *},
    firewire_protocols_core::*,
    runtime_core::{check_unit_type, config_rom::*, hwdep::UnitType},
    tracing::debug,
};

/// The unit of ASICs of DICE.
#[derive(Debug)]
pub struct DiceUnit<T: BusTransport> {
    node: T,
    name: String,
    model: Option<Tcd22xxModel>,
    sections: GeneralSections,
    timeout_ms: u32,
}

impl<T: BusTransport> DiceUnit<T> {
    /// Identify the model by configuration ROM, then read the layout of sections.
    pub fn new(node: T) -> Result<Self, Error> {
        check_unit_type(&node, UnitType::Dice)?;

        let raw = node.config_rom()?;
        let data = parse_root_data(&raw)?;
        let model = Tcd22xxModel::from_ids(data.vendor_id, data.model_id).ok();
        let name = match model {
            Some(m) => m.name().to_string(),
            None if !data.model_name.is_empty() => data.model_name.clone(),
            None => format!("0x{:06x}:0x{:06x}", data.vendor_id, data.model_id),
        };
        debug!(?model, name = name.as_str());

        let mut sections = GeneralSections::default();
        GlobalSectionProtocol::read_general_sections(&node, &mut sections, TIMEOUT_MS)?;
        debug!(?sections);

        Ok(Self {
            node,
            name,
            model,
            sections,
            timeout_ms: TIMEOUT_MS,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> Option<Tcd22xxModel> {
        self.model
    }

    pub fn node(&self) -> &T {
        &self.node
    }

    pub fn sections(&self) -> &GeneralSections {
        &self.sections
    }

    /// The nickname can be read without ownership of the unit.
    pub fn get_nickname(&self) -> Result<String, Error> {
        GlobalSectionProtocol::read_nickname(&self.node, &self.sections.global, self.timeout_ms)
    }

    pub fn set_nickname(&mut self, nickname: &str) -> Result<(), Error> {
        GlobalSectionProtocol::write_nickname(
            &self.node,
            &self.sections.global,
            nickname,
            self.timeout_ms,
        )
    }

    /// The capabilities of clock, unavailable in former version of protocol.
    pub fn clock_caps(&self) -> Result<Option<ClockCaps>, Error> {
        match GlobalSectionProtocol::read_clock_caps(
            &self.node,
            &self.sections.global,
            self.timeout_ms,
        ) {
            Ok(caps) => Ok(Some(caps)),
            Err(err) if err.kind() == ErrorKind::Unsupported => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn supported_sampling_rates(&self) -> Result<Vec<ClockRate>, Error> {
        self.clock_caps()?.map(|caps| caps.rate_entries()).ok_or_else(|| {
            Error::new(
                ErrorKind::Unsupported,
                "Capabilities of clock are not available",
            )
        })
    }

    pub fn supported_clock_sources(&self) -> Result<Vec<ClockSource>, Error> {
        self.clock_caps()?.map(|caps| caps.src_entries()).ok_or_else(|| {
            Error::new(
                ErrorKind::Unsupported,
                "Capabilities of clock are not available",
            )
        })
    }

    pub fn get_clock_config(&self) -> Result<ClockConfig, Error> {
        GlobalSectionProtocol::read_clock_config(&self.node, &self.sections.global, self.timeout_ms)
    }

    pub fn get_sampling_rate(&self) -> Result<ClockRate, Error> {
        self.get_clock_config().map(|config| config.rate)
    }

    pub fn get_clock_source(&self) -> Result<ClockSource, Error> {
        self.get_clock_config().map(|config| config.src)
    }

    // Write the configuration, then wait for the unit to accept it.
    fn update_clock_config<F>(&mut self, cb: F) -> Result<(), Error>
    where
        F: FnOnce(&mut ClockConfig, Option<&ClockCaps>) -> Result<(), Error>,
    {
        check_idle(&self.node)?;
        let caps = self.clock_caps()?;
        let mut config = self.get_clock_config()?;
        cb(&mut config, caps.as_ref())?;
        GlobalSectionProtocol::write_clock_config(
            &self.node,
            &self.sections.global,
            &config,
            self.timeout_ms,
        )
    }

    pub fn set_sampling_rate(&mut self, rate: ClockRate) -> Result<(), Error> {
        self.update_clock_config(|config, caps| {
            let unsupported = match caps {
                Some(caps) => !caps.rate_entries().contains(&rate),
                None => rate.frequency().is_none(),
            };
            if unsupported {
                let msg = format!("Invalid sampling rate: {}", rate);
                Err(Error::new(ErrorKind::Argument, &msg))?;
            }
            config.rate = rate;
            Ok(())
        })
    }

    pub fn set_clock_source(&mut self, src: ClockSource) -> Result<(), Error> {
        self.update_clock_config(|config, caps| {
            if let Some(caps) = caps {
                if !caps.src_entries().contains(&src) {
                    let msg = format!("Invalid source of sampling clock: {}", src);
                    Err(Error::new(ErrorKind::Argument, &msg))?;
                }
            }
            config.src = src;
            Ok(())
        })
    }

    pub fn get_clock_status(&self) -> Result<ClockStatus, Error> {
        GlobalSectionProtocol::read_clock_status(&self.node, &self.sections.global, self.timeout_ms)
    }

    pub fn get_latest_notification(&self) -> Result<u32, Error> {
        GlobalSectionProtocol::read_latest_notification(
            &self.node,
            &self.sections.global,
            self.timeout_ms,
        )
    }

    /// The ports of router at current rate mode, available for known models with TCD22xx.
    pub fn router_ports(&self) -> Result<Tcd22xxPorts, Error> {
        let model = self.model.ok_or_else(|| {
            let msg = format!("Tables of ports are not available for {}", self.name);
            Error::new(ErrorKind::Unsupported, &msg)
        })?;
        let rate = self.get_sampling_rate()?;
        Ok(model.ports(RateMode::from_clock_rate(rate)))
    }
}
