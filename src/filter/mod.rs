//! Butterworth filter design and cascaded biquad filtering.
//!
//! Every filter here is recursive: each output sample depends on earlier
//! outputs as well as on the input.  That buys a steep roll-off from very few
//! coefficients, but a pole that strays onto or outside the unit circle makes
//! the output grow without bound, and the phase response is not linear.
//! Design therefore checks pole placement at every stage and reports a
//! `DesignError` rather than hand back an unstable cascade.
//!
//! This module designs Butterworth filters, which have a maximally flat
//! passband.  Design runs through the following stages:
//!
//! * [`prototype`] places the poles of a unit cutoff analog low pass filter.
//! * [`transform`] maps that prototype onto the requested band shape.
//! * [`bilinear`] pre-warps the corner frequencies and moves the filter into
//!   the z-plane.
//! * [`sos`] factors the digital filter into second order sections.
//! * [`iir`] runs the resulting cascade over samples.
//!
//! [`butterworth`] wires all of the above into single calls.
//!
//! High order filters are never evaluated as a single direct form
//! polynomial, since the coefficients lose precision quickly past order 6 or
//! so.  Every filter is run as a cascade of biquads instead.

use num_complex::Complex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod bilinear;
pub mod butterworth;
pub mod iir;
pub mod prototype;
pub mod sos;
pub mod transform;

/// Errors raised while designing or running a filter.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum FilterError {
    /// A caller supplied parameter is out of range.  Raised before any
    /// design work happens.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The design pipeline reached an inconsistent state.  This should never
    /// happen for valid parameters and indicates a bug.
    #[error("Filter design error: {0}")]
    DesignError(String),
}

pub type Result<T> = std::result::Result<T, FilterError>;

/// Smallest distance, as a fraction of the sampling frequency, a corner may
/// keep from DC and from Nyquist.  Closer corners can put digital poles on
/// the unit circle once rounded to `f64`.
pub const MIN_RELATIVE_FREQ: f64 = 1e-9;

/// A filter described by its zeros, poles and gain.
///
/// Used for the analog prototype, the frequency transformed analog filter and
/// the final digital filter alike.
#[derive(Clone, Debug, PartialEq)]
pub struct Zpk {
    pub zeros: Vec<Complex<f64>>,
    pub poles: Vec<Complex<f64>>,
    pub gain: f64,
}

impl Zpk {
    pub fn new(
        zeros: Vec<Complex<f64>>,
        poles: Vec<Complex<f64>>,
        gain: f64,
    ) -> Zpk {
        Zpk { zeros, poles, gain }
    }

    /// Number of poles minus number of zeros.
    pub fn relative_degree(&self) -> usize {
        self.poles.len().saturating_sub(self.zeros.len())
    }
}

/// The band shape of a filter along with its corner frequencies in Hz.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BandShape {
    LowPass { cutoff: f64 },
    HighPass { cutoff: f64 },
    BandPass { low: f64, high: f64 },
    BandStop { low: f64, high: f64 },
}

impl BandShape {
    /// Checks the corner frequencies against the sampling frequency `fs`.
    ///
    /// Every corner must lie strictly inside (0, fs / 2), at least
    /// `fs * MIN_RELATIVE_FREQ` away from either end, and band shapes
    /// require `low < high`.
    pub fn validate(&self, fs: f64) -> Result<()> {
        let nyquist = fs / 2.0;
        let margin = fs * MIN_RELATIVE_FREQ;
        let check = |name: &str, freq: f64| -> Result<()> {
            if !freq.is_finite() || freq <= 0.0 || freq >= nyquist {
                return Err(FilterError::InvalidParameter(format!(
                    "{} frequency {} Hz must lie inside (0, {}) Hz",
                    name, freq, nyquist
                )));
            }
            if freq < margin || freq > nyquist - margin {
                return Err(FilterError::InvalidParameter(format!(
                    "{} frequency {} Hz is within {} Hz of DC or Nyquist",
                    name, freq, margin
                )));
            }
            Ok(())
        };

        match *self {
            BandShape::LowPass { cutoff } | BandShape::HighPass { cutoff } => {
                check("cutoff", cutoff)
            }
            BandShape::BandPass { low, high }
            | BandShape::BandStop { low, high } => {
                if !(low < high) {
                    return Err(FilterError::InvalidParameter(format!(
                        "lower cutoff {} Hz must be below upper cutoff {} Hz",
                        low, high
                    )));
                }
                check("lower cutoff", low)?;
                check("upper cutoff", high)
            }
        }
    }

    /// Number of poles a filter of this shape ends up with for a prototype
    /// of the given order.
    pub fn pole_count(&self, order: usize) -> usize {
        match self {
            BandShape::LowPass { .. } | BandShape::HighPass { .. } => order,
            BandShape::BandPass { .. } | BandShape::BandStop { .. } => {
                2 * order
            }
        }
    }
}

/// Checks a sampling frequency is usable.
pub fn validate_sampling_freq(fs: f64) -> Result<()> {
    if !fs.is_finite() || fs <= 0.0 {
        return Err(FilterError::InvalidParameter(format!(
            "sampling frequency {} Hz must be positive and finite",
            fs
        )));
    }
    Ok(())
}

/// Checks a filter order is usable.
pub fn validate_order(order: usize) -> Result<()> {
    if order == 0 {
        return Err(FilterError::InvalidParameter(
            "filter order must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use crate::filter::*;

    #[test]
    fn test_validate_band_ordering() {
        let shape = BandShape::BandPass {
            low: 30.0,
            high: 20.0,
        };
        match shape.validate(100.0) {
            Err(FilterError::InvalidParameter(_)) => (),
            other => panic!("expected InvalidParameter, got {:?}", other),
        }

        let equal = BandShape::BandStop {
            low: 20.0,
            high: 20.0,
        };
        assert!(equal.validate(100.0).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(BandShape::LowPass { cutoff: 10.0 }.validate(100.0).is_ok());
        assert!(BandShape::LowPass { cutoff: 0.0 }.validate(100.0).is_err());
        assert!(BandShape::HighPass { cutoff: 50.0 }.validate(100.0).is_err());
        assert!(BandShape::HighPass { cutoff: -1.0 }.validate(100.0).is_err());
        assert!(BandShape::LowPass {
            cutoff: std::f64::NAN
        }
        .validate(100.0)
        .is_err());
        assert!(BandShape::BandPass {
            low: 20.0,
            high: 55.0
        }
        .validate(100.0)
        .is_err());
    }

    #[test]
    fn test_validate_resolution_floor() {
        for &cutoff in &[1e-16, 1e-8] {
            match (BandShape::LowPass { cutoff }).validate(100.0) {
                Err(FilterError::InvalidParameter(_)) => (),
                other => panic!("expected InvalidParameter, got {:?}", other),
            }
        }
        let near_nyquist = BandShape::HighPass {
            cutoff: 50.0 - 1e-12,
        };
        assert!(near_nyquist.validate(100.0).is_err());
        assert!(BandShape::LowPass { cutoff: 1e-6 }.validate(100.0).is_ok());
    }

    #[test]
    fn test_validate_order_and_fs() {
        assert!(validate_order(0).is_err());
        assert!(validate_order(1).is_ok());
        assert!(validate_sampling_freq(0.0).is_err());
        assert!(validate_sampling_freq(std::f64::INFINITY).is_err());
        assert!(validate_sampling_freq(44100.0).is_ok());
    }

    #[test]
    fn test_shape_serde() {
        let json = r#"{"type": "band_pass", "low": 20.0, "high": 30.0}"#;
        let shape: BandShape = serde_json::from_str(json).unwrap();
        assert_eq!(
            shape,
            BandShape::BandPass {
                low: 20.0,
                high: 30.0
            }
        );
    }
}
