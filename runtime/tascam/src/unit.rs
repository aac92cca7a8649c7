// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2021 Takashi Sakamoto

use {
    firewire_protocols_core::*,
    firewire_tascam_protocols::{console::*, rack::*, *},
    runtime_core::{check_unit_type, config_rom::*, hwdep::UnitType},
    std::path::{Path, PathBuf},
    tracing::{debug, debug_span},
};

pub(crate) fn spdif_capture_source_to_str(src: &SpdifCaptureSource) -> &'static str {
    match src {
        SpdifCaptureSource::Coaxial => "coaxial",
        SpdifCaptureSource::Optical => "optical",
    }
}

pub(crate) fn str_to_spdif_capture_source(label: &str) -> Result<SpdifCaptureSource, Error> {
    [SpdifCaptureSource::Coaxial, SpdifCaptureSource::Optical]
        .iter()
        .find(|src| spdif_capture_source_to_str(src) == label)
        .copied()
        .ok_or_else(|| {
            let msg = format!("Invalid source of S/PDIF input: {}", label);
            Error::new(ErrorKind::Argument, &msg)
        })
}

pub(crate) fn coaxial_output_source_to_str(src: &CoaxialOutputSource) -> &'static str {
    match src {
        CoaxialOutputSource::StreamInputPair => "stream-input",
        CoaxialOutputSource::AnalogOutputPair0 => "analog-output-1/2",
    }
}

pub(crate) fn str_to_coaxial_output_source(label: &str) -> Result<CoaxialOutputSource, Error> {
    [
        CoaxialOutputSource::StreamInputPair,
        CoaxialOutputSource::AnalogOutputPair0,
    ]
    .iter()
    .find(|src| coaxial_output_source_to_str(src) == label)
    .copied()
    .ok_or_else(|| {
        let msg = format!("Invalid source of coaxial output: {}", label);
        Error::new(ErrorKind::Argument, &msg)
    })
}

pub(crate) fn optical_output_source_to_str(src: &OpticalOutputSource) -> &'static str {
    match src {
        OpticalOutputSource::StreamInputPairs => "stream-input",
        OpticalOutputSource::CoaxialOutputPair0 => "coaxial-output-1/2",
        OpticalOutputSource::AnalogInputPair0 => "analog-input-1/2",
        OpticalOutputSource::AnalogOutputPairs => "analog-output",
    }
}

pub(crate) fn str_to_optical_output_source(label: &str) -> Result<OpticalOutputSource, Error> {
    [
        OpticalOutputSource::StreamInputPairs,
        OpticalOutputSource::CoaxialOutputPair0,
        OpticalOutputSource::AnalogInputPair0,
        OpticalOutputSource::AnalogOutputPairs,
    ]
    .iter()
    .find(|src| optical_output_source_to_str(src) == label)
    .copied()
    .ok_or_else(|| {
        let msg = format!("Invalid source of optical output: {}", label);
        Error::new(ErrorKind::Argument, &msg)
    })
}

/// The path to cache file for state of rack model.
pub fn rack_cache_path(guid: u64) -> PathBuf {
    PathBuf::from(format!("/tmp/hinawa-{:08x}", guid))
}

#[derive(Debug)]
enum TscmState {
    Console(ConsoleLedState),
    Rack {
        inputs: RackInputState,
        cache_path: PathBuf,
    },
}

/// The unit of Tascam FireWire series.
#[derive(Debug)]
pub struct TscmUnit<T: BusTransport> {
    node: T,
    model: TscmModel,
    state: TscmState,
    timeout_ms: u32,
}

// Restore the state from the cache file, or synthesize the default state.
fn load_rack_cache(path: &Path) -> RackInputState {
    let mut state = RackInputState::default();
    let res = std::fs::read_to_string(path)
        .map_err(Error::from)
        .and_then(|text| deserialize_rack_input_state(&mut state, &text));
    if let Err(err) = &res {
        debug!(?err, "Fail to restore cache, then use default");
        state = RackInputState::default();
    }
    state
}

fn save_rack_cache(path: &Path, state: &RackInputState) {
    if let Err(err) = std::fs::write(path, serialize_rack_input_state(state)) {
        debug!(?err, "Fail to save cache");
    }
}

impl<T: BusTransport> TscmUnit<T> {
    /// Detect the model. The state of rack model is restored from the cache file for the GUID,
    /// then replayed to the unit.
    pub fn new(node: T) -> Result<Self, Error> {
        let path = rack_cache_path(node.guid());
        Self::with_cache_path(node, path)
    }

    pub fn with_cache_path(node: T, cache_path: PathBuf) -> Result<Self, Error> {
        check_unit_type(&node, UnitType::Tascam)?;

        let raw = node.config_rom()?;
        let data = parse_unit_data(&raw)?;
        let model = TscmModel::from_unit_version(data.version)?;

        let state = if model.is_rack() {
            TscmState::Rack {
                inputs: RackInputState::default(),
                cache_path,
            }
        } else {
            TscmState::Console(ConsoleLedState::default())
        };

        let mut unit = Self {
            node,
            model,
            state,
            timeout_ms: TIMEOUT_MS,
        };

        if let TscmState::Rack { inputs, cache_path } = &mut unit.state {
            let _enter = debug_span!("cache").entered();
            *inputs = load_rack_cache(cache_path);
            TscmRackProtocol::replay(&unit.node, inputs, unit.timeout_ms)?;
            save_rack_cache(cache_path, inputs);
        }

        Ok(unit)
    }

    pub fn model(&self) -> TscmModel {
        self.model
    }

    pub fn node(&self) -> &T {
        &self.node
    }

    pub fn hardware_information(&self) -> Result<HardwareInformation, Error> {
        let mut info = HardwareInformation::default();
        HardwareInformationProtocol::read_hardware_information(
            &self.node,
            &mut info,
            self.timeout_ms,
        )?;
        Ok(info)
    }

    pub fn supported_clock_sources(&self) -> &'static [ClkSrc] {
        if self.model.is_rack() {
            TscmRackProtocol::SAMPLING_CLOCK_SOURCES
        } else {
            TscmConsoleProtocol::SAMPLING_CLOCK_SOURCES
        }
    }

    pub fn supported_sampling_rates(&self) -> &'static [u32] {
        if self.model.is_rack() {
            TscmRackProtocol::SAMPLING_CLOCK_RATES
        } else {
            TscmConsoleProtocol::SAMPLING_CLOCK_RATES
        }
    }

    pub fn get_clock_source(&self) -> Result<ClkSrc, Error> {
        let src = if self.model.is_rack() {
            TscmRackProtocol::get_sampling_clock_source(&self.node, self.timeout_ms)
        } else {
            TscmConsoleProtocol::get_sampling_clock_source(&self.node, self.timeout_ms)
        }?;
        if !self.supported_clock_sources().contains(&src) {
            let msg = format!("Unexpected source of sampling clock: {:?}", src);
            Err(Error::new(ErrorKind::Protocol, &msg))?;
        }
        Ok(src)
    }

    pub fn set_clock_source(&mut self, src: ClkSrc) -> Result<(), Error> {
        check_idle(&self.node)?;
        if !self.supported_clock_sources().contains(&src) {
            let msg = format!("Invalid source of sampling clock: {:?}", src);
            Err(Error::new(ErrorKind::Argument, &msg))?;
        }
        if self.model.is_rack() {
            TscmRackProtocol::set_sampling_clock_source(&self.node, src, self.timeout_ms)
        } else {
            TscmConsoleProtocol::set_sampling_clock_source(&self.node, src, self.timeout_ms)
        }
    }

    pub fn get_sampling_rate(&self) -> Result<u32, Error> {
        let rate = if self.model.is_rack() {
            TscmRackProtocol::get_media_clock_rate(&self.node, self.timeout_ms)
        } else {
            TscmConsoleProtocol::get_media_clock_rate(&self.node, self.timeout_ms)
        }?;
        if !self.supported_sampling_rates().contains(&rate) {
            let msg = format!("Unexpected rate of media clock: {}", rate);
            Err(Error::new(ErrorKind::Protocol, &msg))?;
        }
        Ok(rate)
    }

    pub fn set_sampling_rate(&mut self, rate: u32) -> Result<(), Error> {
        check_idle(&self.node)?;
        if !self.supported_sampling_rates().contains(&rate) {
            let msg = format!("Invalid rate of media clock: {}", rate);
            Err(Error::new(ErrorKind::Argument, &msg))?;
        }
        if self.model.is_rack() {
            TscmRackProtocol::set_media_clock_rate(&self.node, rate, self.timeout_ms)
        } else {
            TscmConsoleProtocol::set_media_clock_rate(&self.node, rate, self.timeout_ms)
        }
    }

    pub fn get_input_threshold(&self) -> Result<f64, Error> {
        TscmConsoleProtocol::get_input_threshold(&self.node, self.timeout_ms)
    }

    pub fn set_input_threshold(&mut self, db: f64) -> Result<(), Error> {
        TscmConsoleProtocol::set_input_threshold(&self.node, db, self.timeout_ms)
    }

    pub fn get_spdif_capture_source(&self) -> Result<SpdifCaptureSource, Error> {
        TscmConsoleProtocol::get_spdif_capture_source(&self.node, self.timeout_ms)
    }

    pub fn set_spdif_capture_source(&mut self, src: SpdifCaptureSource) -> Result<(), Error> {
        TscmConsoleProtocol::set_spdif_capture_source(&self.node, src, self.timeout_ms)
    }

    pub fn get_coaxial_output_source(&self) -> Result<CoaxialOutputSource, Error> {
        TscmConsoleProtocol::get_coaxial_output_source(&self.node, self.timeout_ms)
    }

    pub fn set_coaxial_output_source(&mut self, src: CoaxialOutputSource) -> Result<(), Error> {
        TscmConsoleProtocol::set_coaxial_output_source(&self.node, src, self.timeout_ms)
    }

    pub fn supported_opt_output_sources(&self) -> &'static [OpticalOutputSource] {
        if self.model.is_rack() {
            TscmRackProtocol::OPTICAL_OUTPUT_SOURCES
        } else {
            TscmConsoleProtocol::OPTICAL_OUTPUT_SOURCES
        }
    }

    pub fn get_opt_output_source(&self) -> Result<OpticalOutputSource, Error> {
        if self.model.is_rack() {
            TscmRackProtocol::get_opt_output_source(&self.node, self.timeout_ms)
        } else {
            TscmConsoleProtocol::get_opt_output_source(&self.node, self.timeout_ms)
        }
    }

    pub fn set_opt_output_source(&mut self, src: OpticalOutputSource) -> Result<(), Error> {
        if self.model.is_rack() {
            TscmRackProtocol::set_opt_output_source(&self.node, src, self.timeout_ms)
        } else {
            TscmConsoleProtocol::set_opt_output_source(&self.node, src, self.timeout_ms)
        }
    }

    fn console_state(&mut self) -> Result<&mut ConsoleLedState, Error> {
        match &mut self.state {
            TscmState::Console(leds) => Ok(leds),
            TscmState::Rack { .. } => {
                let msg = format!("Not available for {}", self.model.name());
                Err(Error::new(ErrorKind::Unsupported, &msg))
            }
        }
    }

    /// Turn on or off the LED at the position in control surface.
    pub fn operate_led(&mut self, pos: u16, enable: bool) -> Result<(), Error> {
        let timeout_ms = self.timeout_ms;
        let node = &self.node;
        match &mut self.state {
            TscmState::Console(leds) => {
                TscmConsoleProtocol::operate_led_cached(leds, node, pos, enable, timeout_ms)
            }
            TscmState::Rack { .. } => {
                let msg = format!("Not available for {}", self.model.name());
                Err(Error::new(ErrorKind::Unsupported, &msg))
            }
        }
    }

    /// The positions of LEDs turned on by the unit.
    pub fn lit_leds(&mut self) -> Result<Vec<u16>, Error> {
        self.console_state().map(|leds| leds.0.to_vec())
    }

    pub fn get_master_fader_assign(&mut self) -> Result<bool, Error> {
        self.console_state()?;
        TscmConsoleProtocol::get_master_fader_assign(&self.node, self.timeout_ms)
    }

    pub fn set_master_fader_assign(&mut self, assign: bool) -> Result<(), Error> {
        self.console_state()?;
        TscmConsoleProtocol::set_master_fader_assign(&self.node, assign, self.timeout_ms)
    }

    fn rack_state(&self) -> Result<&RackInputState, Error> {
        match &self.state {
            TscmState::Rack { inputs, .. } => Ok(inputs),
            TscmState::Console(_) => {
                let msg = format!("Not available for {}", self.model.name());
                Err(Error::new(ErrorKind::Unsupported, &msg))
            }
        }
    }

    // Commit to the unit, then save the cache.
    fn update_rack_state<F>(&mut self, cb: F) -> Result<(), Error>
    where
        F: FnOnce(&dyn BusTransport, &mut RackInputState, u32) -> Result<(), Error>,
    {
        let timeout_ms = self.timeout_ms;
        let node = &self.node;
        match &mut self.state {
            TscmState::Rack { inputs, cache_path } => {
                cb(node, inputs, timeout_ms)?;
                save_rack_cache(cache_path, inputs);
                Ok(())
            }
            TscmState::Console(_) => {
                let msg = format!("Not available for {}", self.model.name());
                Err(Error::new(ErrorKind::Unsupported, &msg))
            }
        }
    }

    pub fn get_input_gain(&self, label: &str) -> Result<u32, Error> {
        let ch = rack_channel_index(label)?;
        TscmRackProtocol::get_input_gain(self.rack_state()?, ch)
    }

    pub fn set_input_gain(&mut self, label: &str, gain: u32) -> Result<(), Error> {
        let ch = rack_channel_index(label)?;
        self.update_rack_state(|node, inputs, timeout_ms| {
            TscmRackProtocol::set_input_gain(node, inputs, ch, gain, timeout_ms)
        })
    }

    pub fn get_input_balance(&self, label: &str) -> Result<u32, Error> {
        let ch = rack_channel_index(label)?;
        TscmRackProtocol::get_input_balance(self.rack_state()?, ch)
    }

    pub fn set_input_balance(&mut self, label: &str, balance: u32) -> Result<(), Error> {
        let ch = rack_channel_index(label)?;
        self.update_rack_state(|node, inputs, timeout_ms| {
            TscmRackProtocol::set_input_balance(node, inputs, ch, balance, timeout_ms)
        })
    }

    pub fn get_input_mute(&self, label: &str) -> Result<bool, Error> {
        let ch = rack_channel_index(label)?;
        TscmRackProtocol::get_input_mute(self.rack_state()?, ch)
    }

    pub fn set_input_mute(&mut self, label: &str, mute: bool) -> Result<(), Error> {
        let ch = rack_channel_index(label)?;
        self.update_rack_state(|node, inputs, timeout_ms| {
            TscmRackProtocol::set_input_mute(node, inputs, ch, mute, timeout_ms)
        })
    }

    pub fn operate_firewire_led(&mut self, enable: bool) -> Result<(), Error> {
        self.rack_state()?;
        TscmRackProtocol::operate_firewire_led(&self.node, enable, self.timeout_ms)
    }
}
