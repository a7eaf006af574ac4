//! Bilinear transform with frequency pre-warping.
//!
//! The bilinear transform maps the s-plane to the z-plane via
//!
//! ```text
//! s = 2 * fs * (1 - z^-1) / (1 + z^-1)
//! ```
//!
//! which takes every analog root `p` to `(2 * fs + p) / (2 * fs - p)`.  The
//! left half plane lands inside the unit circle, so a stable analog filter
//! stays stable.  The mapping compresses frequencies nonlinearly, which is why
//! the analog corners are pre-warped first: a corner at `f` Hz becomes
//! `2 * fs * tan(pi * f / fs)` rad/s and lands back on `f` after the
//! transform.

use crate::filter::transform::AnalogBand;
use crate::filter::{BandShape, FilterError, Result, Zpk};
use num_complex::Complex;
use num_traits::One;
use std::f64::consts::PI;

/// Pre-warps a digital frequency in Hz to an analog frequency in rad/s.
///
/// # Arguments
///
/// * `freq` - Frequency in Hz, inside (0, fs / 2).
/// * `fs` - Sampling frequency in Hz.
///
/// # Examples
///
/// ```
/// use butter_rs::filter::bilinear::prewarp;
///
/// // A quarter of the sampling rate warps to exactly 2 * fs.
/// let warped = prewarp(25.0, 100.0);
/// assert!((warped - 200.0).abs() < 1e-9);
/// ```
pub fn prewarp(freq: f64, fs: f64) -> f64 {
    2.0 * fs * (PI * freq / fs).tan()
}

/// Pre-warps every corner of `shape`.
pub fn prewarp_band(shape: &BandShape, fs: f64) -> AnalogBand {
    match *shape {
        BandShape::LowPass { cutoff } => {
            AnalogBand::LowPass(prewarp(cutoff, fs))
        }
        BandShape::HighPass { cutoff } => {
            AnalogBand::HighPass(prewarp(cutoff, fs))
        }
        BandShape::BandPass { low, high } => AnalogBand::BandPass {
            low: prewarp(low, fs),
            high: prewarp(high, fs),
        },
        BandShape::BandStop { low, high } => AnalogBand::BandStop {
            low: prewarp(low, fs),
            high: prewarp(high, fs),
        },
    }
}

/// Maps one analog root into the z-plane.
fn bilinear_root(root: Complex<f64>, fs2: f64) -> Result<Complex<f64>> {
    let denom = fs2 - root;
    if denom.norm() == 0.0 {
        return Err(FilterError::DesignError(format!(
            "analog root {} has no image under the bilinear transform",
            root
        )));
    }
    Ok((fs2 + root) / denom)
}

/// Converts an analog filter to a digital filter.
///
/// Zeros at infinity become zeros at `z = -1`.  Every digital pole must lie
/// strictly inside the unit circle, otherwise a `DesignError` is raised.
///
/// # Arguments
///
/// * `analog` - Analog filter, corners already pre-warped.
/// * `fs` - Sampling frequency in Hz.
pub fn bilinear_zpk(analog: &Zpk, fs: f64) -> Result<Zpk> {
    let fs2 = 2.0 * fs;
    let degree = analog.relative_degree();

    let mut zeros = Vec::with_capacity(analog.zeros.len() + degree);
    for z in &analog.zeros {
        zeros.push(bilinear_root(*z, fs2)?);
    }
    zeros.extend(std::iter::repeat(Complex::new(-1.0, 0.0)).take(degree));

    let mut poles = Vec::with_capacity(analog.poles.len());
    for p in &analog.poles {
        let pole = bilinear_root(*p, fs2)?;
        if pole.norm() >= 1.0 {
            return Err(FilterError::DesignError(format!(
                "analog pole {} maps to {}, outside the open unit circle",
                p, pole
            )));
        }
        poles.push(pole);
    }

    let ratio = analog
        .zeros
        .iter()
        .zip(&analog.poles)
        .fold(Complex::one(), |acc: Complex<f64>, (z, p)| {
            acc * (fs2 - *z) / (fs2 - *p)
        });
    let ratio = analog
        .poles
        .iter()
        .skip(analog.zeros.len())
        .fold(ratio, |acc, p| acc / (fs2 - *p));
    let gain = analog.gain * ratio.re;

    Ok(Zpk::new(zeros, poles, gain))
}

/// The point on the unit circle where a filter of the given band should
/// have unity gain.
///
/// DC for low pass and band stop, Nyquist for high pass and the digital image
/// of the center frequency for band pass.
pub fn reference_point(band: &AnalogBand, fs: f64) -> Complex<f64> {
    match band {
        AnalogBand::LowPass(_) | AnalogBand::BandStop { .. } => {
            Complex::one()
        }
        AnalogBand::HighPass(_) => Complex::new(-1.0, 0.0),
        AnalogBand::BandPass { .. } => {
            let omega = 2.0 * (band.center() / (2.0 * fs)).atan();
            Complex::from_polar(1.0, omega)
        }
    }
}

/// Evaluates a digital transfer function at the point `z`.
///
/// Zeros and poles are taken in pairs, so the running product stays near the
/// magnitude of the response instead of growing with the filter order.
pub fn evaluate(digital: &Zpk, z: Complex<f64>) -> Complex<f64> {
    let paired = digital
        .zeros
        .iter()
        .zip(&digital.poles)
        .fold(Complex::one(), |acc: Complex<f64>, (zero, pole)| {
            acc * (z - *zero) / (z - *pole)
        });
    let paired = digital
        .zeros
        .iter()
        .skip(digital.poles.len())
        .fold(paired, |acc, zero| acc * (z - *zero));
    let response = digital
        .poles
        .iter()
        .skip(digital.zeros.len())
        .fold(paired, |acc, pole| acc / (z - *pole));
    response * digital.gain
}

#[cfg(test)]
mod test {
    use crate::filter::bilinear::*;
    use crate::filter::prototype::butterworth_prototype;
    use crate::filter::transform::transform;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_prewarp() {
        assert_approx_eq!(prewarp(25.0, 100.0), 200.0);
        // Low frequencies barely move.
        let f = 1.0;
        assert_approx_eq!(prewarp(f, 48000.0), 2.0 * PI * f, 1e-6);
    }

    #[test]
    fn test_bilinear_lowpass() {
        let fs = 100.0;
        let band = prewarp_band(&BandShape::LowPass { cutoff: 10.0 }, fs);
        let analog =
            transform(&butterworth_prototype(3).unwrap(), &band).unwrap();
        let digital = bilinear_zpk(&analog, fs).unwrap();

        assert_eq!(digital.poles.len(), 3);
        assert_eq!(digital.zeros, vec![Complex::new(-1.0, 0.0); 3]);
        assert!(digital.poles.iter().all(|p| p.norm() < 1.0));

        // The analog gain carries over, so DC stays at unity.
        assert_approx_eq!(evaluate(&digital, Complex::one()).norm(), 1.0);
        assert_eq!(reference_point(&band, fs), Complex::one());

        // -3 dB lands on the requested cutoff.
        let cutoff = Complex::from_polar(1.0, 2.0 * PI * 10.0 / fs);
        assert_approx_eq!(
            evaluate(&digital, cutoff).norm(),
            std::f64::consts::FRAC_1_SQRT_2
        );
    }

    #[test]
    fn test_bandpass_reference() {
        let fs = 1000.0;
        let shape = BandShape::BandPass {
            low: 100.0,
            high: 200.0,
        };
        let band = prewarp_band(&shape, fs);
        let analog =
            transform(&butterworth_prototype(2).unwrap(), &band).unwrap();
        let digital = bilinear_zpk(&analog, fs).unwrap();
        let reference = reference_point(&band, fs);
        assert_approx_eq!(evaluate(&digital, reference).norm(), 1.0);
        for edge in &[100.0, 200.0] {
            let z = Complex::from_polar(1.0, 2.0 * PI * edge / fs);
            assert_approx_eq!(
                evaluate(&digital, z).norm(),
                std::f64::consts::FRAC_1_SQRT_2
            );
        }
    }

    #[test]
    fn test_evaluate_unequal_counts() {
        let zpk = Zpk::new(
            vec![Complex::new(-1.0, 0.0)],
            vec![Complex::new(0.5, 0.0), Complex::new(-0.5, 0.0)],
            3.0,
        );
        // 3 * (1 + 1) / ((1 - 0.5) * (1 + 0.5))
        assert_approx_eq!(evaluate(&zpk, Complex::one()).re, 8.0);

        let zeros_only = Zpk::new(vec![Complex::new(0.5, 0.0); 2], vec![], 2.0);
        assert_approx_eq!(evaluate(&zeros_only, Complex::one()).re, 0.5);
    }

    #[test]
    fn test_pole_on_unit_circle() {
        let analog = Zpk::new(vec![], vec![Complex::new(0.0, 0.0)], 1.0);
        match bilinear_zpk(&analog, 100.0) {
            Err(FilterError::DesignError(_)) => (),
            other => panic!("expected DesignError, got {:?}", other),
        }
    }

    #[test]
    fn test_pole_without_image() {
        let analog = Zpk::new(vec![], vec![Complex::new(200.0, 0.0)], 1.0);
        assert!(bilinear_zpk(&analog, 100.0).is_err());
    }
}
