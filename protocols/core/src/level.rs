// SPDX-License-Identifier: LGPL-3.0-or-later
// Copyright (c) 2021 Takashi Sakamoto

//! Conversion between linear coefficient and level.
//!
//! The coefficient is linear to amplitude and saturates at the full scale given by each
//! protocol. Decibel is computed against the full scale, thus the full scale is 0.0 dB and zero
//! is negative infinity.

use super::*;

/// Convert the coefficient into decibel against the full scale.
pub fn coef_to_db(coef: u32, full_scale: u32) -> f64 {
    if coef == 0 {
        f64::NEG_INFINITY
    } else {
        20.0 * (coef as f64 / full_scale as f64).log10()
    }
}

/// Convert decibel into the coefficient against the full scale. The result saturates at the
/// full scale.
pub fn db_to_coef(db: f64, full_scale: u32) -> Result<u32, Error> {
    if db.is_nan() {
        Err(Error::new(ErrorKind::Argument, "Level is not a number"))
    } else if db == f64::NEG_INFINITY {
        Ok(0)
    } else {
        let coef = (full_scale as f64 * 10f64.powf(db / 20.0)).round();
        if coef >= full_scale as f64 {
            Ok(full_scale)
        } else {
            Ok(coef as u32)
        }
    }
}

/// Scale the value in the range between zero and the maximum into the other range, with
/// truncation.
pub fn scale_down(val: u32, from_max: u32, to_max: u32) -> u32 {
    let scaled = val.min(from_max) as u64 * to_max as u64 / from_max as u64;
    scaled as u32
}

/// Scale the value in the range between zero and the maximum into the other range, with
/// rounding to nearest.
pub fn scale_round(val: u32, from_max: u32, to_max: u32) -> u32 {
    let numerator = val.min(from_max) as u64 * to_max as u64;
    let scaled = (numerator + from_max as u64 / 2) / from_max as u64;
    scaled as u32
}

#[cfg(test)]
mod test {
    use super::*;

    const FULL_SCALE: u32 = 0x1fffffff;

    #[test]
    fn zero_is_negative_infinity() {
        assert_eq!(coef_to_db(0, FULL_SCALE), f64::NEG_INFINITY);
        assert_eq!(db_to_coef(f64::NEG_INFINITY, FULL_SCALE).unwrap(), 0);
        assert_eq!(coef_to_db(FULL_SCALE, FULL_SCALE), 0.0);
    }

    #[test]
    fn level_saturation() {
        assert_eq!(db_to_coef(6.0, FULL_SCALE).unwrap(), FULL_SCALE);
        assert_eq!(db_to_coef(0.0, FULL_SCALE).unwrap(), FULL_SCALE);
        assert!(db_to_coef(f64::NAN, FULL_SCALE).is_err());
    }

    #[test]
    fn level_within_quantization() {
        let mut db = -120.0;
        while db <= 0.0 {
            let coef = db_to_coef(db, FULL_SCALE).unwrap();
            let tolerance = 20.0 * (1.0 + 1.0 / coef as f64).log10();
            assert!((coef_to_db(coef, FULL_SCALE) - db).abs() <= tolerance, "{}", db);
            db += 0.25;
        }
    }

    #[test]
    fn percentage() {
        assert_eq!(scale_down(50, 99, 0x7fff), 0x40a4);
        assert_eq!(scale_round(0x40a4, 0x7fff, 99), 50);
        (0..100).for_each(|val| {
            let raw = scale_down(val, 99, 0xff);
            assert_eq!(scale_round(raw, 0xff, 99), val);
        });
    }
}
