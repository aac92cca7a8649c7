// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2020 Takashi Sakamoto

use {
    firewire_digi00x_protocols::*,
    firewire_protocols_core::*,
    runtime_core::{check_unit_type, config_rom::*, hwdep::UnitType},
};

pub(crate) fn clock_rate_to_str(rate: &ClockRate) -> &'static str {
    match rate {
        ClockRate::R44100 => "44100",
        ClockRate::R48000 => "48000",
        ClockRate::R88200 => "88200",
        ClockRate::R96000 => "96000",
    }
}

pub(crate) fn clock_source_to_str(src: &ClockSource) -> &'static str {
    match src {
        ClockSource::Internal => "Internal",
        ClockSource::Spdif => "S/PDIF",
        ClockSource::Adat => "ADAT",
        ClockSource::WordClock => "Word-clock",
    }
}

pub(crate) fn str_to_clock_source(label: &str) -> Result<ClockSource, Error> {
    [
        ClockSource::Internal,
        ClockSource::Spdif,
        ClockSource::Adat,
        ClockSource::WordClock,
    ]
    .iter()
    .find(|src| clock_source_to_str(src) == label)
    .copied()
    .ok_or_else(|| {
        let msg = format!("Invalid clock source: {}", label);
        Error::new(ErrorKind::Argument, &msg)
    })
}

pub(crate) fn optical_interface_mode_to_str(mode: &OpticalInterfaceMode) -> &'static str {
    match mode {
        OpticalInterfaceMode::Adat => "ADAT",
        OpticalInterfaceMode::Spdif => "S/PDIF",
    }
}

pub(crate) fn str_to_optical_interface_mode(label: &str) -> Result<OpticalInterfaceMode, Error> {
    [OpticalInterfaceMode::Adat, OpticalInterfaceMode::Spdif]
        .iter()
        .find(|mode| optical_interface_mode_to_str(mode) == label)
        .copied()
        .ok_or_else(|| {
            let msg = format!("Invalid mode of optical interface: {}", label);
            Error::new(ErrorKind::Argument, &msg)
        })
}

pub(crate) fn mixer_source_to_str(src: &Dg003MixerSource) -> &'static str {
    match src {
        Dg003MixerSource::Analog12 => "Analog-1/2",
        Dg003MixerSource::Analog34 => "Analog-3/4",
        Dg003MixerSource::Analog56 => "Analog-5/6",
        Dg003MixerSource::Analog78 => "Analog-7/8",
        Dg003MixerSource::Spdif12 => "S/PDIF-1/2",
        Dg003MixerSource::Adat12 => "ADAT-1/2",
        Dg003MixerSource::Adat34 => "ADAT-3/4",
        Dg003MixerSource::Adat56 => "ADAT-5/6",
        Dg003MixerSource::Adat78 => "ADAT-7/8",
    }
}

pub(crate) fn str_to_mixer_source(label: &str) -> Result<Dg003MixerSource, Error> {
    Dg003MixerSource::ALL
        .iter()
        .find(|src| mixer_source_to_str(src) == label)
        .copied()
        .ok_or_else(|| {
            let msg = format!("Invalid source of mixer: {}", label);
            Error::new(ErrorKind::Argument, &msg)
        })
}

/// The unit of Digi 00x family.
#[derive(Debug)]
pub struct Dg00xUnit<T: BusTransport> {
    node: T,
    model: Dg00xModel,
    timeout_ms: u32,
}

impl<T: BusTransport> Dg00xUnit<T> {
    pub fn new(node: T) -> Result<Self, Error> {
        check_unit_type(&node, UnitType::Digi00x)?;

        let raw = node.config_rom()?;
        let data = parse_unit_data(&raw)?;
        let model = Dg00xModel::from_specifier_id(data.specifier_id)?;

        Ok(Self {
            node,
            model,
            timeout_ms: TIMEOUT_MS,
        })
    }

    pub fn model(&self) -> Dg00xModel {
        self.model
    }

    pub fn node(&self) -> &T {
        &self.node
    }

    fn check_digi003(&self) -> Result<(), Error> {
        if self.model.is_digi003() {
            Ok(())
        } else {
            let msg = format!("Not available for {}", self.model.name());
            Err(Error::new(ErrorKind::Unsupported, &msg))
        }
    }

    pub fn supported_sampling_rates(&self) -> &'static [ClockRate] {
        if self.model.is_digi003() {
            Digi003Protocol::SAMPLING_CLOCK_RATES
        } else {
            Digi002Protocol::SAMPLING_CLOCK_RATES
        }
    }

    pub fn supported_clock_sources(&self) -> &'static [ClockSource] {
        if self.model.is_digi003() {
            Digi003Protocol::SAMPLING_CLOCK_SOURCES
        } else {
            Digi002Protocol::SAMPLING_CLOCK_SOURCES
        }
    }

    fn cache<U>(&self, states: &mut U) -> Result<(), Error>
    where
        Digi002Protocol: Dg00xWhollyCachableParamsOperation<U>,
        Digi003Protocol: Dg00xWhollyCachableParamsOperation<U>,
    {
        if self.model.is_digi003() {
            Digi003Protocol::cache_wholly(&self.node, states, self.timeout_ms)
        } else {
            Digi002Protocol::cache_wholly(&self.node, states, self.timeout_ms)
        }
    }

    fn update<U>(&self, params: &U) -> Result<(), Error>
    where
        Digi002Protocol: Dg00xWhollyUpdatableParamsOperation<U>,
        Digi003Protocol: Dg00xWhollyUpdatableParamsOperation<U>,
    {
        if self.model.is_digi003() {
            Digi003Protocol::update_wholly(&self.node, params, self.timeout_ms)
        } else {
            Digi002Protocol::update_wholly(&self.node, params, self.timeout_ms)
        }
    }

    pub fn get_sampling_rate(&self) -> Result<ClockRate, Error> {
        let mut params = Dg00xMediaClockParameters::default();
        self.cache(&mut params)?;
        if !self.supported_sampling_rates().contains(&params.rate) {
            let msg = format!("Unexpected sampling rate: {:?}", params.rate);
            Err(Error::new(ErrorKind::Protocol, &msg))?;
        }
        Ok(params.rate)
    }

    pub fn set_sampling_rate(&mut self, rate: ClockRate) -> Result<(), Error> {
        check_idle(&self.node)?;
        if !self.supported_sampling_rates().contains(&rate) {
            let msg = format!("Invalid sampling rate: {:?}", rate);
            Err(Error::new(ErrorKind::Argument, &msg))?;
        }
        self.update(&Dg00xMediaClockParameters { rate })
    }

    /// The rate of signal detected in external input, or None.
    pub fn get_external_sampling_rate(&self) -> Result<Option<ClockRate>, Error> {
        let mut params = Dg00xExternalClockParameters::default();
        self.cache(&mut params)?;
        Ok(params.rate)
    }

    pub fn get_clock_source(&self) -> Result<ClockSource, Error> {
        let mut params = Dg00xSamplingClockParameters::default();
        self.cache(&mut params)?;
        if !self.supported_clock_sources().contains(&params.source) {
            let msg = format!("Unexpected clock source: {:?}", params.source);
            Err(Error::new(ErrorKind::Protocol, &msg))?;
        }
        Ok(params.source)
    }

    pub fn set_clock_source(&mut self, source: ClockSource) -> Result<(), Error> {
        check_idle(&self.node)?;
        if !self.supported_clock_sources().contains(&source) {
            let msg = format!("Invalid clock source: {:?}", source);
            Err(Error::new(ErrorKind::Argument, &msg))?;
        }
        self.update(&Dg00xSamplingClockParameters { source })
    }

    pub fn get_opt_iface_mode(&self) -> Result<OpticalInterfaceMode, Error> {
        self.check_digi003()?;
        let mut mode = OpticalInterfaceMode::default();
        Digi003Protocol::cache_wholly(&self.node, &mut mode, self.timeout_ms)?;
        Ok(mode)
    }

    pub fn set_opt_iface_mode(&mut self, mode: OpticalInterfaceMode) -> Result<(), Error> {
        self.check_digi003()?;
        check_idle(&self.node)?;
        Digi003Protocol::update_wholly(&self.node, &mode, self.timeout_ms)
    }

    pub fn get_mixer_mode(&self) -> Result<bool, Error> {
        let mut mode = Dg00xMixerMode::default();
        self.cache(&mut mode)?;
        Ok(mode.enabled)
    }

    pub fn set_mixer_mode(&mut self, enabled: bool) -> Result<(), Error> {
        self.update(&Dg00xMixerMode { enabled })
    }

    pub fn get_mixer_src_gain(&self, src: Dg003MixerSource, dst: usize) -> Result<f64, Error> {
        self.check_digi003()?;
        Digi003Protocol::get_src_gain(&self.node, src, dst, self.timeout_ms)
    }

    pub fn set_mixer_src_gain(
        &mut self,
        src: Dg003MixerSource,
        dst: usize,
        db: f64,
    ) -> Result<(), Error> {
        self.check_digi003()?;
        Digi003Protocol::set_src_gain(&self.node, src, dst, db, self.timeout_ms)
    }

    pub fn get_mixer_src_balance(&self, src: Dg003MixerSource, dst: usize) -> Result<f64, Error> {
        self.check_digi003()?;
        Digi003Protocol::get_src_balance(&self.node, src, dst, self.timeout_ms)
    }

    pub fn set_mixer_src_balance(
        &mut self,
        src: Dg003MixerSource,
        dst: usize,
        balance: f64,
    ) -> Result<(), Error> {
        self.check_digi003()?;
        Digi003Protocol::set_src_balance(&self.node, src, dst, balance, self.timeout_ms)
    }
}
