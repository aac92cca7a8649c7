// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2021 Takashi Sakamoto

#![doc = include_str!("../README.md")]

//! ## Register to configure flags
//!
//! The register at 0x022c is not written directly. The written quadlet consists of two fields;
//! the second byte for bits to be cleared, and the third byte for bits to be set. The hardware
//! computes the new value by exclusive OR of the former value and both fields, therefore the
//! caller should read the register in advance to write.

pub mod console;
pub mod rack;

use firewire_protocols_core::{
    level::{coef_to_db, db_to_coef},
    *,
};

const BASE_OFFSET: u64 = 0xffff00000000;
const HW_INFO_REGISTER_OFFSET: u64 = 0x00;
const HW_INFO_FPGA_OFFSET: u64 = 0x04;
const HW_INFO_ARM_OFFSET: u64 = 0x08;
const HW_INFO_HW_OFFSET: u64 = 0x0c;
const CLOCK_STATUS_OFFSET: u64 = 0x0228;
const CONFIG_FLAG_OFFSET: u64 = 0x022c;
const INPUT_THRESHOLD_OFFSET: u64 = 0x0230;
const LED_OFFSET: u64 = 0x0404;

fn read_value(node: &dyn BusTransport, offset: u64, timeout_ms: u32) -> Result<u32, Error> {
    read_quadlet(node, BASE_OFFSET, offset, timeout_ms)
}

fn write_value(node: &dyn BusTransport, offset: u64, val: u32, timeout_ms: u32) -> Result<(), Error> {
    write_quadlet(node, BASE_OFFSET, offset, val, timeout_ms)
}

/// The OUI of Tascam.
pub const TASCAM_OUI: u32 = 0x00022e;

/// Model in the series.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TscmModel {
    Fw1884,
    Fw1082,
    Fw1804,
}

impl TscmModel {
    const FW1884_SW_VERSION: u32 = 0x800000;
    const FW1082_SW_VERSION: u32 = 0x800003;
    const FW1804_SW_VERSION: u32 = 0x800004;

    /// Detect the model by the version of unit directory in configuration ROM.
    pub fn from_unit_version(version: u32) -> Result<Self, Error> {
        match version {
            Self::FW1884_SW_VERSION => Ok(Self::Fw1884),
            Self::FW1082_SW_VERSION => Ok(Self::Fw1082),
            Self::FW1804_SW_VERSION => Ok(Self::Fw1804),
            _ => {
                let msg = format!("Unsupported version of unit: 0x{:06x}", version);
                Err(Error::new(ErrorKind::Unsupported, &msg))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Fw1884 => "FW-1884",
            Self::Fw1082 => "FW-1082",
            Self::Fw1804 => "FW-1804",
        }
    }

    /// Whether the model is rack type without control surface.
    pub fn is_rack(&self) -> bool {
        *self == Self::Fw1804
    }
}

/// Information of hardware.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct HardwareInformation {
    pub register: u32,
    pub fpga: u32,
    pub arm: u32,
    pub hardware: u32,
}

/// The protocol implementaion commonly available to Tascam FireWire models.
#[derive(Debug, Default)]
pub struct HardwareInformationProtocol;

impl HardwareInformationProtocol {
    pub fn read_hardware_information(
        node: &dyn BusTransport,
        info: &mut HardwareInformation,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        info.register = read_value(node, HW_INFO_REGISTER_OFFSET, timeout_ms)?;
        info.fpga = read_value(node, HW_INFO_FPGA_OFFSET, timeout_ms)?;
        info.arm = read_value(node, HW_INFO_ARM_OFFSET, timeout_ms)?;
        info.hardware = read_value(node, HW_INFO_HW_OFFSET, timeout_ms)?;
        Ok(())
    }
}

/// Signal source of sampling clock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClkSrc {
    /// Internal oscillator.
    Internal,
    /// Word clock signal from BNC input interface.
    Wordclock,
    /// S/PDIF signal from coaxial input interface.
    Spdif,
    /// ADAT signal from optical input interface.
    Adat,
}

impl Default for ClkSrc {
    fn default() -> Self {
        Self::Internal
    }
}

const CLOCK_SOURCES: [ClkSrc; 4] = [ClkSrc::Internal, ClkSrc::Wordclock, ClkSrc::Spdif, ClkSrc::Adat];

impl ClkSrc {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Internal => "Internal",
            Self::Wordclock => "Word-clock",
            Self::Spdif => "S/PDIF",
            Self::Adat => "ADAT",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, Error> {
        CLOCK_SOURCES
            .iter()
            .find(|s| s.label() == label)
            .copied()
            .ok_or_else(|| {
                let msg = format!("Invalid source of sampling clock: {}", label);
                Error::new(ErrorKind::Argument, &msg)
            })
    }
}

/// The parameters of threshold to detect input signal, at the upper half of register.
///
/// ```text
/// level = 20 * log10(value / 0x7fff)
/// ```
pub const THRESHOLD_MAX: u32 = 0x7fff;

const RATE_FAMILY_MASK: u8 = 0x0f;
const RATE_DOUBLE_FLAG: u8 = 0x80;

/// Source of S/PDIF input.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SpdifCaptureSource {
    /// To coaxial interface.
    Coaxial,
    /// To optical interface.
    Optical,
}

impl Default for SpdifCaptureSource {
    fn default() -> Self {
        Self::Coaxial
    }
}

/// Source of output coaxial interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoaxialOutputSource {
    /// A pair in stream inputs.
    StreamInputPair,
    /// Mirror of analog output 0 and 1.
    AnalogOutputPair0,
}

impl Default for CoaxialOutputSource {
    fn default() -> Self {
        Self::StreamInputPair
    }
}

/// Source of optical output.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpticalOutputSource {
    /// 4 pairs in stream inputs.
    StreamInputPairs,
    /// Mirror of coaxial output 0 and 1.
    CoaxialOutputPair0,
    /// Analog input 0 and 1.
    AnalogInputPair0,
    /// Mirror of analog output 0, 1, 2, 3, 4, 5, 6, 7, and 8.
    AnalogOutputPairs,
}

impl Default for OpticalOutputSource {
    fn default() -> Self {
        Self::StreamInputPairs
    }
}

const SPDIF_CAPTURE_MASK: u8 = 0x01;
const COAXIAL_OUTPUT_MASK: u8 = 0x02;
const OPTICAL_OUTPUT_MASK: u8 = 0x0c;
const OPTICAL_OUTPUT_SHIFT: usize = 2;
const OPTICAL_OUTPUT_EXTRA_FLAG: u8 = 0x80;

/// Read the value of configuration flags.
fn read_config_flags(node: &dyn BusTransport, timeout_ms: u32) -> Result<u8, Error> {
    read_value(node, CONFIG_FLAG_OFFSET, timeout_ms).map(|val| (val & 0xff) as u8)
}

/// Change the bits of configuration flags within the mask, by the fields to clear and set.
fn write_config_flag(
    node: &dyn BusTransport,
    mask: u8,
    flag: u8,
    timeout_ms: u32,
) -> Result<(), Error> {
    let old = read_config_flags(node, timeout_ms)?;
    let clear = old & !flag & mask;
    let set = !old & flag & mask;
    let val = ((clear as u32) << 16) | ((set as u32) << 8);
    write_value(node, CONFIG_FLAG_OFFSET, val, timeout_ms)
}

/// Specification of models in the series.
pub trait TscmSpecification {
    /// The available sources of sampling clock.
    const SAMPLING_CLOCK_SOURCES: &'static [ClkSrc] = &CLOCK_SOURCES;

    /// The available rates of media clock.
    const SAMPLING_CLOCK_RATES: &'static [u32] = &[44100, 48000, 88200, 96000];

    /// The available sources of optical output, indexed by the value of bit field.
    const OPTICAL_OUTPUT_SOURCES: &'static [OpticalOutputSource];

    /// Whether the extra flag is available to select the last source of optical output.
    const HAS_OPTICAL_OUTPUT_EXTRA_FLAG: bool;
}

/// Operations commonly available to models in the series.
pub trait TscmOperation: TscmSpecification {
    fn get_sampling_clock_source(node: &dyn BusTransport, timeout_ms: u32) -> Result<ClkSrc, Error> {
        let frame = read_value(node, CLOCK_STATUS_OFFSET, timeout_ms)?.to_be_bytes();
        let src = (frame[3] as usize)
            .checked_sub(1)
            .and_then(|pos| CLOCK_SOURCES.iter().nth(pos))
            .ok_or_else(|| {
                let msg = format!("Unexpected value for source of clock: {}", frame[3]);
                Error::new(ErrorKind::Protocol, &msg)
            })?;
        Self::SAMPLING_CLOCK_SOURCES
            .iter()
            .find(|s| src.eq(s))
            .copied()
            .ok_or_else(|| {
                let msg = format!("Unsupported source of sampling clock: {:?}", src);
                Error::new(ErrorKind::Protocol, &msg)
            })
    }

    fn set_sampling_clock_source(
        node: &dyn BusTransport,
        src: ClkSrc,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        if Self::SAMPLING_CLOCK_SOURCES.iter().find(|s| src.eq(s)).is_none() {
            let msg = format!("Unsupported source of sampling clock: {:?}", src);
            Err(Error::new(ErrorKind::Argument, &msg))?;
        }
        let pos = CLOCK_SOURCES
            .iter()
            .position(|s| src.eq(s))
            .unwrap_or_default();
        let mut frame = read_value(node, CLOCK_STATUS_OFFSET, timeout_ms)?.to_be_bytes();
        frame[0] = 0x00;
        frame[1] = 0x00;
        frame[3] = 1 + pos as u8;
        write_value(node, CLOCK_STATUS_OFFSET, u32::from_be_bytes(frame), timeout_ms)
    }

    fn get_media_clock_rate(node: &dyn BusTransport, timeout_ms: u32) -> Result<u32, Error> {
        let frame = read_value(node, CLOCK_STATUS_OFFSET, timeout_ms)?.to_be_bytes();
        let base = match frame[1] & RATE_FAMILY_MASK {
            0x01 => 44100,
            0x02 => 48000,
            _ => {
                let msg = format!("Unexpected value for rate of clock: 0x{:02x}", frame[1]);
                Err(Error::new(ErrorKind::Protocol, &msg))?
            }
        };
        if frame[1] & RATE_DOUBLE_FLAG > 0 {
            Ok(base * 2)
        } else {
            Ok(base)
        }
    }

    fn set_media_clock_rate(node: &dyn BusTransport, rate: u32, timeout_ms: u32) -> Result<(), Error> {
        if Self::SAMPLING_CLOCK_RATES.iter().find(|&r| rate.eq(r)).is_none() {
            let msg = format!("Unsupported rate of media clock: {}", rate);
            Err(Error::new(ErrorKind::Argument, &msg))?;
        }
        let mut code = if rate % 44100 == 0 { 0x01 } else { 0x02 };
        if rate > 48000 {
            code |= RATE_DOUBLE_FLAG;
        }
        let mut frame = read_value(node, CLOCK_STATUS_OFFSET, timeout_ms)?.to_be_bytes();
        frame[0] = 0x00;
        frame[1] = code;
        frame[3] = 0x00;
        write_value(node, CLOCK_STATUS_OFFSET, u32::from_be_bytes(frame), timeout_ms)
    }

    /// Get threshold of analog input for signal detection in dB.
    fn get_input_threshold(node: &dyn BusTransport, timeout_ms: u32) -> Result<f64, Error> {
        read_value(node, INPUT_THRESHOLD_OFFSET, timeout_ms).map(|val| {
            let coef = (val >> 16).min(THRESHOLD_MAX);
            coef_to_db(coef, THRESHOLD_MAX)
        })
    }

    /// Set threshold of analog input for signal detection in dB, up to 0 dB.
    fn set_input_threshold(node: &dyn BusTransport, db: f64, timeout_ms: u32) -> Result<(), Error> {
        if db > 0.0 {
            let msg = format!("Threshold should be less than or equal to 0 dB: {}", db);
            Err(Error::new(ErrorKind::Argument, &msg))?;
        }
        let coef = db_to_coef(db, THRESHOLD_MAX)?;
        let val = read_value(node, INPUT_THRESHOLD_OFFSET, timeout_ms)?;
        let val = (val & 0x0000ffff) | (coef << 16);
        write_value(node, INPUT_THRESHOLD_OFFSET, val, timeout_ms)
    }

    fn get_spdif_capture_source(
        node: &dyn BusTransport,
        timeout_ms: u32,
    ) -> Result<SpdifCaptureSource, Error> {
        read_config_flags(node, timeout_ms).map(|val| {
            if val & SPDIF_CAPTURE_MASK > 0 {
                SpdifCaptureSource::Optical
            } else {
                SpdifCaptureSource::Coaxial
            }
        })
    }

    fn set_spdif_capture_source(
        node: &dyn BusTransport,
        src: SpdifCaptureSource,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let flag = match src {
            SpdifCaptureSource::Coaxial => 0x00,
            SpdifCaptureSource::Optical => SPDIF_CAPTURE_MASK,
        };
        write_config_flag(node, SPDIF_CAPTURE_MASK, flag, timeout_ms)
    }

    fn get_coaxial_output_source(
        node: &dyn BusTransport,
        timeout_ms: u32,
    ) -> Result<CoaxialOutputSource, Error> {
        read_config_flags(node, timeout_ms).map(|val| {
            if val & COAXIAL_OUTPUT_MASK > 0 {
                CoaxialOutputSource::StreamInputPair
            } else {
                CoaxialOutputSource::AnalogOutputPair0
            }
        })
    }

    fn set_coaxial_output_source(
        node: &dyn BusTransport,
        src: CoaxialOutputSource,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let flag = match src {
            CoaxialOutputSource::StreamInputPair => COAXIAL_OUTPUT_MASK,
            CoaxialOutputSource::AnalogOutputPair0 => 0x00,
        };
        write_config_flag(node, COAXIAL_OUTPUT_MASK, flag, timeout_ms)
    }

    fn get_opt_output_source(
        node: &dyn BusTransport,
        timeout_ms: u32,
    ) -> Result<OpticalOutputSource, Error> {
        let val = read_config_flags(node, timeout_ms)?;
        let mut pos = ((val & OPTICAL_OUTPUT_MASK) >> OPTICAL_OUTPUT_SHIFT) as usize;
        // The extra flag shifts the index only for analog sources.
        if Self::HAS_OPTICAL_OUTPUT_EXTRA_FLAG && val & OPTICAL_OUTPUT_EXTRA_FLAG > 0 && pos >= 2 {
            pos = 3;
        }
        Self::OPTICAL_OUTPUT_SOURCES
            .iter()
            .nth(pos)
            .copied()
            .ok_or_else(|| {
                let msg = format!("Unexpected value for source of optical output: 0x{:02x}", val);
                Error::new(ErrorKind::Protocol, &msg)
            })
    }

    fn set_opt_output_source(
        node: &dyn BusTransport,
        src: OpticalOutputSource,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let pos = Self::OPTICAL_OUTPUT_SOURCES
            .iter()
            .position(|s| src.eq(s))
            .ok_or_else(|| {
                let msg = format!("Unsupported source of optical output: {:?}", src);
                Error::new(ErrorKind::Argument, &msg)
            })?;
        let (mask, flag) = if Self::HAS_OPTICAL_OUTPUT_EXTRA_FLAG {
            let flag = if pos == 3 {
                OPTICAL_OUTPUT_EXTRA_FLAG | (2 << OPTICAL_OUTPUT_SHIFT)
            } else {
                (pos as u8) << OPTICAL_OUTPUT_SHIFT
            };
            (OPTICAL_OUTPUT_MASK | OPTICAL_OUTPUT_EXTRA_FLAG, flag)
        } else {
            (OPTICAL_OUTPUT_MASK, (pos as u8) << OPTICAL_OUTPUT_SHIFT)
        };
        write_config_flag(node, mask, flag, timeout_ms)
    }
}

impl<O: TscmSpecification> TscmOperation for O {}
