// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2021 Takashi Sakamoto

#![doc = include_str!("../README.md")]

use firewire_protocols_core::{level::*, *};

/// The protocol implementation for Digi 002.
#[derive(Default, Debug)]
pub struct Digi002Protocol;

impl Dg00xHardwareSpecification for Digi002Protocol {
    const SAMPLING_CLOCK_SOURCES: &'static [ClockSource] =
        &[ClockSource::Internal, ClockSource::Spdif, ClockSource::Adat];
}

/// The protocol implementation for Digi 003.
#[derive(Default, Debug)]
pub struct Digi003Protocol;

impl Dg00xHardwareSpecification for Digi003Protocol {
    const SAMPLING_CLOCK_SOURCES: &'static [ClockSource] = &[
        ClockSource::Internal,
        ClockSource::Spdif,
        ClockSource::Adat,
        ClockSource::WordClock,
    ];
}

/// The model of Digi 00x family, detected by specifier ID in unit directory of configuration ROM.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Dg00xModel {
    Digi002,
    Digi002Rack,
    Digi003,
    Digi003Rack,
}

// NOTE: Additionally, in model ID field:
//   0x000001: the console models
//   0x000002: the rack models
const SPECIFIER_ID_DIGI002: u32 = 0x0000a3;
const SPECIFIER_ID_DIGI002_RACK: u32 = 0x0000a4;
const SPECIFIER_ID_DIGI003: u32 = 0x0000aa;
const SPECIFIER_ID_DIGI003_RACK: u32 = 0x0000ab;

impl Dg00xModel {
    pub fn from_specifier_id(specifier_id: u32) -> Result<Self, Error> {
        match specifier_id {
            SPECIFIER_ID_DIGI002 => Ok(Self::Digi002),
            SPECIFIER_ID_DIGI002_RACK => Ok(Self::Digi002Rack),
            SPECIFIER_ID_DIGI003 => Ok(Self::Digi003),
            SPECIFIER_ID_DIGI003_RACK => Ok(Self::Digi003Rack),
            _ => {
                let msg = format!("Unsupported specifier ID: 0x{:06x}", specifier_id);
                Err(Error::new(ErrorKind::Unsupported, &msg))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Digi002 => "Digi 002",
            Self::Digi002Rack => "Digi 002 Rack",
            Self::Digi003 => "Digi 003",
            Self::Digi003Rack => "Digi 003 Rack",
        }
    }

    /// Whether the model is one of Digi 003 series, with word clock and optical interface mode.
    pub fn is_digi003(&self) -> bool {
        matches!(self, Self::Digi003 | Self::Digi003Rack)
    }
}

const BASE_OFFSET: u64 = 0xffffe0000000;

/// The specification of hardware.
pub trait Dg00xHardwareSpecification {
    const SAMPLING_CLOCK_SOURCES: &'static [ClockSource];
    const SAMPLING_CLOCK_RATES: &'static [ClockRate] = CLOCK_RATE_TABLE;
}

/// Cache whole parameters.
pub trait Dg00xWhollyCachableParamsOperation<T>: Dg00xHardwareSpecification {
    fn cache_wholly(node: &dyn BusTransport, states: &mut T, timeout_ms: u32)
        -> Result<(), Error>;
}

/// Update whole parameters.
pub trait Dg00xWhollyUpdatableParamsOperation<T>: Dg00xHardwareSpecification {
    fn update_wholly(node: &dyn BusTransport, states: &T, timeout_ms: u32) -> Result<(), Error>;
}

/// Nominal frequency of media clock.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ClockRate {
    R44100,
    R48000,
    R88200,
    R96000,
}

impl Default for ClockRate {
    fn default() -> Self {
        Self::R44100
    }
}

impl ClockRate {
    pub fn frequency(&self) -> u32 {
        match self {
            Self::R44100 => 44100,
            Self::R48000 => 48000,
            Self::R88200 => 88200,
            Self::R96000 => 96000,
        }
    }

    pub fn from_frequency(freq: u32) -> Result<Self, Error> {
        CLOCK_RATE_TABLE
            .iter()
            .find(|r| r.frequency() == freq)
            .copied()
            .ok_or_else(|| {
                let msg = format!("Invalid sampling rate: {}", freq);
                Error::new(ErrorKind::Argument, &msg)
            })
    }
}

/// Signal source of sampling clock.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ClockSource {
    Internal,
    Spdif,
    Adat,
    WordClock,
}

impl Default for ClockSource {
    fn default() -> Self {
        Self::Internal
    }
}

const MEDIA_CLOCK_RATE_OFFSET: u64 = 0x0110;
const EXTERNAL_CLOCK_RATE_OFFSET: u64 = 0x0114;
const SAMPLING_CLOCK_SOURCE_OFFSET: u64 = 0x0118;
const OPTICAL_INTERFACE_MODE_OFFSET: u64 = 0x011c;
const MIXER_MODE_OFFSET: u64 = 0x0124;
const EXTERNAL_CLOCK_SOURCE_DETECTION_OFFSET: u64 = 0x012c;

// The value of interest is in the least significant byte.
const VALUE_MASK: u32 = 0x000000ff;

fn read_value(node: &dyn BusTransport, offset: u64, timeout_ms: u32) -> Result<u32, Error> {
    read_quadlet(node, BASE_OFFSET, offset, timeout_ms).map(|quad| quad & VALUE_MASK)
}

fn write_value(node: &dyn BusTransport, offset: u64, val: u32, timeout_ms: u32) -> Result<(), Error> {
    write_quadlet(node, BASE_OFFSET, offset, val & VALUE_MASK, timeout_ms)
}

/// The parameters for sampling clock.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dg00xSamplingClockParameters {
    /// The source.
    pub source: ClockSource,
}

impl<O> Dg00xWhollyCachableParamsOperation<Dg00xSamplingClockParameters> for O
where
    O: Dg00xHardwareSpecification,
{
    fn cache_wholly(
        node: &dyn BusTransport,
        states: &mut Dg00xSamplingClockParameters,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        read_value(node, SAMPLING_CLOCK_SOURCE_OFFSET, timeout_ms).and_then(|val| {
            let pos = val as usize;
            Self::SAMPLING_CLOCK_SOURCES
                .iter()
                .nth(pos)
                .ok_or_else(|| {
                    let msg = format!("Unexpected clock source: {}", pos);
                    Error::new(ErrorKind::Protocol, &msg)
                })
                .map(|&s| states.source = s)
        })
    }
}

impl<O> Dg00xWhollyUpdatableParamsOperation<Dg00xSamplingClockParameters> for O
where
    O: Dg00xHardwareSpecification,
{
    fn update_wholly(
        node: &dyn BusTransport,
        params: &Dg00xSamplingClockParameters,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let pos = Self::SAMPLING_CLOCK_SOURCES
            .iter()
            .position(|&s| s.eq(&params.source))
            .ok_or_else(|| {
                let msg = format!("Invalid argument for clock source: {:?}", params.source);
                Error::new(ErrorKind::Argument, &msg)
            })?;
        write_value(node, SAMPLING_CLOCK_SOURCE_OFFSET, pos as u32, timeout_ms)
    }
}

/// The parameters for media clock.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dg00xMediaClockParameters {
    /// The rate.
    pub rate: ClockRate,
}

const CLOCK_RATE_TABLE: &[ClockRate] = &[
    ClockRate::R44100,
    ClockRate::R48000,
    ClockRate::R88200,
    ClockRate::R96000,
];

fn serialize_clock_rate(rate: &ClockRate) -> u32 {
    match rate {
        ClockRate::R44100 => 0,
        ClockRate::R48000 => 1,
        ClockRate::R88200 => 2,
        ClockRate::R96000 => 3,
    }
}

fn deserialize_clock_rate(rate: &mut ClockRate, val: u32) -> Result<(), Error> {
    *rate = CLOCK_RATE_TABLE
        .iter()
        .nth(val as usize)
        .copied()
        .ok_or_else(|| {
            let msg = format!("Unexpected value for clock rate: {}", val);
            Error::new(ErrorKind::Protocol, &msg)
        })?;
    Ok(())
}

impl<O> Dg00xWhollyCachableParamsOperation<Dg00xMediaClockParameters> for O
where
    O: Dg00xHardwareSpecification,
{
    fn cache_wholly(
        node: &dyn BusTransport,
        states: &mut Dg00xMediaClockParameters,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        read_value(node, MEDIA_CLOCK_RATE_OFFSET, timeout_ms)
            .and_then(|val| deserialize_clock_rate(&mut states.rate, val))
    }
}

impl<O> Dg00xWhollyUpdatableParamsOperation<Dg00xMediaClockParameters> for O
where
    O: Dg00xHardwareSpecification,
{
    fn update_wholly(
        node: &dyn BusTransport,
        params: &Dg00xMediaClockParameters,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        if !Self::SAMPLING_CLOCK_RATES.iter().any(|r| r.eq(&params.rate)) {
            let msg = format!("Invalid argument for clock rate: {:?}", params.rate);
            Err(Error::new(ErrorKind::Argument, &msg))?;
        }
        let val = serialize_clock_rate(&params.rate);
        write_value(node, MEDIA_CLOCK_RATE_OFFSET, val, timeout_ms)
    }
}

/// The parameters for media clock.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dg00xExternalClockParameters {
    /// The rate detected in input of external source. Once the source of sampling clock is
    /// configured to any external source, the function can return detected frequency. Once losing
    /// the input, it returns None.
    pub rate: Option<ClockRate>,
}

impl<O> Dg00xWhollyCachableParamsOperation<Dg00xExternalClockParameters> for O
where
    O: Dg00xHardwareSpecification,
{
    fn cache_wholly(
        node: &dyn BusTransport,
        states: &mut Dg00xExternalClockParameters,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let detected = read_value(node, EXTERNAL_CLOCK_SOURCE_DETECTION_OFFSET, timeout_ms)?;

        if detected > 0 {
            let val = read_value(node, EXTERNAL_CLOCK_RATE_OFFSET, timeout_ms)?;
            let mut rate = ClockRate::default();
            deserialize_clock_rate(&mut rate, val).map(|_| states.rate = Some(rate))
        } else {
            states.rate = None;
            Ok(())
        }
    }
}

/// Mode of optical interface.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpticalInterfaceMode {
    Adat,
    Spdif,
}

impl Default for OpticalInterfaceMode {
    fn default() -> Self {
        Self::Adat
    }
}

impl Dg00xWhollyCachableParamsOperation<OpticalInterfaceMode> for Digi003Protocol {
    fn cache_wholly(
        node: &dyn BusTransport,
        states: &mut OpticalInterfaceMode,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        read_value(node, OPTICAL_INTERFACE_MODE_OFFSET, timeout_ms).and_then(|val| {
            *states = match val {
                0 => OpticalInterfaceMode::Adat,
                1 => OpticalInterfaceMode::Spdif,
                _ => {
                    let msg = format!("Unexpected value for optical interface mode: {}", val);
                    Err(Error::new(ErrorKind::Protocol, &msg))?
                }
            };
            Ok(())
        })
    }
}

impl Dg00xWhollyUpdatableParamsOperation<OpticalInterfaceMode> for Digi003Protocol {
    fn update_wholly(
        node: &dyn BusTransport,
        params: &OpticalInterfaceMode,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let val = match params {
            OpticalInterfaceMode::Adat => 0,
            OpticalInterfaceMode::Spdif => 1,
        };
        write_value(node, OPTICAL_INTERFACE_MODE_OFFSET, val, timeout_ms)
    }
}

/// State of mixer. At offline mode (no packet streaming runs), the mixer function is disabled
/// and is not configurable.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Dg00xMixerMode {
    /// Whether to enable mixer or not.
    pub enabled: bool,
}

impl<O> Dg00xWhollyCachableParamsOperation<Dg00xMixerMode> for O
where
    O: Dg00xHardwareSpecification,
{
    fn cache_wholly(
        node: &dyn BusTransport,
        states: &mut Dg00xMixerMode,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        read_value(node, MIXER_MODE_OFFSET, timeout_ms).map(|val| states.enabled = val > 0)
    }
}

impl<O> Dg00xWhollyUpdatableParamsOperation<Dg00xMixerMode> for O
where
    O: Dg00xHardwareSpecification,
{
    fn update_wholly(
        node: &dyn BusTransport,
        states: &Dg00xMixerMode,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        write_value(node, MIXER_MODE_OFFSET, states.enabled as u32, timeout_ms)
    }
}

/// Stereo pair of sources to the mixer in Digi 003.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Dg003MixerSource {
    Analog12,
    Analog34,
    Analog56,
    Analog78,
    Spdif12,
    Adat12,
    Adat34,
    Adat56,
    Adat78,
}

impl Default for Dg003MixerSource {
    fn default() -> Self {
        Self::Analog12
    }
}

impl Dg003MixerSource {
    /// The pairs in the order of register layout.
    pub const ALL: &'static [Self] = &[
        Self::Analog12,
        Self::Analog34,
        Self::Analog56,
        Self::Analog78,
        Self::Spdif12,
        Self::Adat12,
        Self::Adat34,
        Self::Adat56,
        Self::Adat78,
    ];

    fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s.eq(self)).unwrap_or_default()
    }
}

/// The mixer of Digi 003. Each pair of sources has two coefficients (left and right) per
/// destination channel.
pub trait Dg003MixerOperation {
    /// The full scale of coefficient.
    const MAX_COEFF: u32 = 0x1fffffff;

    /// The number of destination channels.
    const DST_COUNT: usize = 2;

    const MIXER_SRC_OFFSET: u64 = 0x0300;
    const SRC_STEP: u64 = 0x10;
    const DST_STEP: u64 = 0x08;

    /// The offsets of left and right coefficient.
    fn coefficient_offsets(src: Dg003MixerSource, dst: usize) -> Result<(u64, u64), Error> {
        if dst >= Self::DST_COUNT {
            let msg = format!("Invalid destination channel: {}", dst);
            Err(Error::new(ErrorKind::Argument, &msg))?;
        }
        let left =
            Self::MIXER_SRC_OFFSET + src.index() as u64 * Self::SRC_STEP + dst as u64 * Self::DST_STEP;
        Ok((left, left + 4))
    }

    fn read_coefficients(
        node: &dyn BusTransport,
        src: Dg003MixerSource,
        dst: usize,
        timeout_ms: u32,
    ) -> Result<(u32, u32), Error> {
        let (left, right) = Self::coefficient_offsets(src, dst)?;
        let l = read_quadlet(node, BASE_OFFSET, left, timeout_ms)?;
        let r = read_quadlet(node, BASE_OFFSET, right, timeout_ms)?;
        Ok((l.min(Self::MAX_COEFF), r.min(Self::MAX_COEFF)))
    }

    fn write_coefficients(
        node: &dyn BusTransport,
        src: Dg003MixerSource,
        dst: usize,
        coefs: (u32, u32),
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let (left, right) = Self::coefficient_offsets(src, dst)?;
        write_quadlet(node, BASE_OFFSET, left, coefs.0, timeout_ms)?;
        write_quadlet(node, BASE_OFFSET, right, coefs.1, timeout_ms)
    }

    /// Get the gain of source pair in decibel, computed from the sum of both coefficients.
    fn get_src_gain(
        node: &dyn BusTransport,
        src: Dg003MixerSource,
        dst: usize,
        timeout_ms: u32,
    ) -> Result<f64, Error> {
        let (l, r) = Self::read_coefficients(node, src, dst, timeout_ms)?;
        let total = (l as u64 + r as u64).min(Self::MAX_COEFF as u64) as u32;
        Ok(coef_to_db(total, Self::MAX_COEFF))
    }

    /// Set the gain of source pair in decibel. The current ratio between left and right is
    /// preserved. When both are zero, even destination gets right only and odd destination gets
    /// left only.
    fn set_src_gain(
        node: &dyn BusTransport,
        src: Dg003MixerSource,
        dst: usize,
        db: f64,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let total = db_to_coef(db, Self::MAX_COEFF)?;
        let (l, r) = Self::read_coefficients(node, src, dst, timeout_ms)?;
        let coefs = if l == 0 && r == 0 {
            if dst % 2 > 0 {
                (total, 0)
            } else {
                (0, total)
            }
        } else {
            let left = (total as u64 * l as u64 / (l as u64 + r as u64)) as u32;
            (left, total - left)
        };
        Self::write_coefficients(node, src, dst, coefs, timeout_ms)
    }

    /// Get the balance of source pair between 0.0 (left) and 100.0 (right). Negative infinity
    /// means both coefficients are zero.
    fn get_src_balance(
        node: &dyn BusTransport,
        src: Dg003MixerSource,
        dst: usize,
        timeout_ms: u32,
    ) -> Result<f64, Error> {
        let (l, r) = Self::read_coefficients(node, src, dst, timeout_ms)?;
        let total = l as f64 + r as f64;
        if total == 0.0 {
            Ok(f64::NEG_INFINITY)
        } else {
            Ok(100.0 * r as f64 / total)
        }
    }

    /// Set the balance of source pair, preserving the sum of both coefficients. Negative
    /// infinity clears both coefficients.
    fn set_src_balance(
        node: &dyn BusTransport,
        src: Dg003MixerSource,
        dst: usize,
        balance: f64,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let coefs = if balance == f64::NEG_INFINITY {
            (0, 0)
        } else if balance.is_nan() || balance < 0.0 || balance > 100.0 {
            let msg = format!("Invalid balance: {}", balance);
            Err(Error::new(ErrorKind::Argument, &msg))?
        } else {
            let (l, r) = Self::read_coefficients(node, src, dst, timeout_ms)?;
            let total = l as f64 + r as f64;
            let left = (total * (1.0 - balance / 100.0)).round();
            let right = (total * balance / 100.0).round();
            let max = Self::MAX_COEFF as f64;
            (left.min(max) as u32, right.min(max) as u32)
        };
        Self::write_coefficients(node, src, dst, coefs, timeout_ms)
    }
}

impl Dg003MixerOperation for Digi003Protocol {}

#[cfg(test)]
mod test {
    use {super::*, firewire_protocols_core::mock::MockNode};

    const MAX_COEFF: u32 = 0x1fffffff;

    #[test]
    fn clock_source_select() {
        let node = MockNode::default();
        let params = Dg00xSamplingClockParameters {
            source: ClockSource::Spdif,
        };
        Digi002Protocol::update_wholly(&node, &params, 100).unwrap();
        assert_eq!(node.quadlet_writes(BASE_OFFSET + 0x0118), vec![0x00000001]);

        let mut states = Dg00xSamplingClockParameters::default();
        Digi002Protocol::cache_wholly(&node, &mut states, 100).unwrap();
        assert_eq!(states.source, ClockSource::Spdif);

        let params = Dg00xSamplingClockParameters {
            source: ClockSource::WordClock,
        };
        let err = Digi002Protocol::update_wholly(&node, &params, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        Digi003Protocol::update_wholly(&node, &params, 100).unwrap();
        assert_eq!(node.quadlet(BASE_OFFSET + 0x0118), 0x00000003);

        let err = Digi002Protocol::cache_wholly(&node, &mut states, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn media_clock_rate() {
        let node = MockNode::default();
        CLOCK_RATE_TABLE.iter().for_each(|&rate| {
            let params = Dg00xMediaClockParameters { rate };
            Digi003Protocol::update_wholly(&node, &params, 100).unwrap();
            let mut states = Dg00xMediaClockParameters::default();
            Digi003Protocol::cache_wholly(&node, &mut states, 100).unwrap();
            assert_eq!(states, params);
        });
        assert_eq!(
            node.quadlet_writes(BASE_OFFSET + 0x0110),
            vec![0x00, 0x01, 0x02, 0x03]
        );

        node.set_quadlet(BASE_OFFSET + 0x0110, 0x00000004);
        let mut states = Dg00xMediaClockParameters::default();
        let err = Digi003Protocol::cache_wholly(&node, &mut states, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn external_clock_detection() {
        let node = MockNode::default();
        node.set_quadlet(BASE_OFFSET + 0x0114, 0x00000003);

        let mut states = Dg00xExternalClockParameters::default();
        Digi002Protocol::cache_wholly(&node, &mut states, 100).unwrap();
        assert_eq!(states.rate, None);

        node.set_quadlet(BASE_OFFSET + 0x012c, 0x00000001);
        Digi002Protocol::cache_wholly(&node, &mut states, 100).unwrap();
        assert_eq!(states.rate, Some(ClockRate::R96000));
    }

    #[test]
    fn optical_interface_mode() {
        let node = MockNode::default();
        Digi003Protocol::update_wholly(&node, &OpticalInterfaceMode::Spdif, 100).unwrap();
        assert_eq!(node.quadlet(BASE_OFFSET + 0x011c), 1);

        let mut mode = OpticalInterfaceMode::default();
        Digi003Protocol::cache_wholly(&node, &mut mode, 100).unwrap();
        assert_eq!(mode, OpticalInterfaceMode::Spdif);

        node.set_quadlet(BASE_OFFSET + 0x011c, 2);
        let err = Digi003Protocol::cache_wholly(&node, &mut mode, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn mixer_mode() {
        let node = MockNode::default();
        let mut mode = Dg00xMixerMode::default();
        node.set_quadlet(BASE_OFFSET + 0x0124, 0x00000001);
        Digi002Protocol::cache_wholly(&node, &mut mode, 100).unwrap();
        assert!(mode.enabled);

        mode.enabled = false;
        Digi002Protocol::update_wholly(&node, &mode, 100).unwrap();
        assert_eq!(node.quadlet(BASE_OFFSET + 0x0124), 0);
    }

    #[test]
    fn model_by_specifier_id() {
        assert_eq!(Dg00xModel::from_specifier_id(0xab).unwrap(), Dg00xModel::Digi003Rack);
        assert!(!Dg00xModel::from_specifier_id(0xa4).unwrap().is_digi003());
        let err = Dg00xModel::from_specifier_id(0x01).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn mixer_offsets() {
        assert_eq!(
            Digi003Protocol::coefficient_offsets(Dg003MixerSource::Analog12, 0).unwrap(),
            (0x0300, 0x0304)
        );
        assert_eq!(
            Digi003Protocol::coefficient_offsets(Dg003MixerSource::Spdif12, 1).unwrap(),
            (0x0348, 0x034c)
        );
        let err = Digi003Protocol::coefficient_offsets(Dg003MixerSource::Adat78, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn mixer_gain_from_silence() {
        let node = MockNode::default();
        let src = Dg003MixerSource::Analog12;
        Digi003Protocol::set_src_gain(&node, src, 0, -6.0, 100).unwrap();

        let v = db_to_coef(-6.0, MAX_COEFF).unwrap();
        assert_eq!(v, 0x1009b9cf);
        assert_eq!(
            node.writes(),
            vec![
                (BASE_OFFSET + 0x0300, vec![0x00, 0x00, 0x00, 0x00]),
                (BASE_OFFSET + 0x0304, v.to_be_bytes().to_vec()),
            ]
        );

        node.clear_writes();
        Digi003Protocol::set_src_gain(&node, Dg003MixerSource::Adat34, 1, -6.0, 100).unwrap();
        assert_eq!(node.quadlet(BASE_OFFSET + 0x0368), v);
        assert_eq!(node.quadlet(BASE_OFFSET + 0x036c), 0);
    }

    #[test]
    fn mixer_gain_within_quantization() {
        let node = MockNode::default();
        let src = Dg003MixerSource::Adat56;
        node.set_quadlet(BASE_OFFSET + 0x0370, 0x00001000);
        node.set_quadlet(BASE_OFFSET + 0x0374, 0x00003000);

        let mut db = -120.0;
        while db <= 0.0 {
            Digi003Protocol::set_src_gain(&node, src, 0, db, 100).unwrap();
            let gain = Digi003Protocol::get_src_gain(&node, src, 0, 100).unwrap();
            let coef = db_to_coef(db, MAX_COEFF).unwrap();
            let tolerance = 20.0 * (1.0 + 1.0 / coef as f64).log10();
            assert!((gain - db).abs() <= tolerance, "{} {}", db, gain);
            db += 0.5;
        }

        Digi003Protocol::set_src_gain(&node, src, 0, f64::NEG_INFINITY, 100).unwrap();
        let gain = Digi003Protocol::get_src_gain(&node, src, 0, 100).unwrap();
        assert_eq!(gain, f64::NEG_INFINITY);
    }

    #[test]
    fn mixer_balance() {
        let node = MockNode::default();
        let src = Dg003MixerSource::Analog34;
        node.set_quadlet(BASE_OFFSET + 0x0310, 1000);
        node.set_quadlet(BASE_OFFSET + 0x0314, 3000);
        assert_eq!(Digi003Protocol::get_src_balance(&node, src, 0, 100).unwrap(), 75.0);

        Digi003Protocol::set_src_balance(&node, src, 0, 50.0, 100).unwrap();
        assert_eq!(node.quadlet(BASE_OFFSET + 0x0310), 2000);
        assert_eq!(node.quadlet(BASE_OFFSET + 0x0314), 2000);

        Digi003Protocol::set_src_balance(&node, src, 0, f64::NEG_INFINITY, 100).unwrap();
        assert_eq!(node.quadlet(BASE_OFFSET + 0x0310), 0);
        assert_eq!(node.quadlet(BASE_OFFSET + 0x0314), 0);
        assert_eq!(
            Digi003Protocol::get_src_balance(&node, src, 0, 100).unwrap(),
            f64::NEG_INFINITY
        );

        let err = Digi003Protocol::set_src_balance(&node, src, 0, 100.5, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }
}
