//! Analog frequency transformations.
//!
//! These map the unit cutoff low pass prototype onto a low pass, high pass,
//! band pass or band stop filter with corners given in rad/s.  Every function
//! works directly on zeros, poles and gain.

use crate::filter::{FilterError, Result, Zpk};
use log::debug;
use num_complex::Complex;
use num_traits::{One, Zero};

/// Corner frequencies of an analog filter in rad/s.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnalogBand {
    LowPass(f64),
    HighPass(f64),
    BandPass { low: f64, high: f64 },
    BandStop { low: f64, high: f64 },
}

impl AnalogBand {
    /// Geometric center of a band, or the cutoff for low and high pass.
    pub fn center(&self) -> f64 {
        match *self {
            AnalogBand::LowPass(wc) | AnalogBand::HighPass(wc) => wc,
            AnalogBand::BandPass { low, high }
            | AnalogBand::BandStop { low, high } => (low * high).sqrt(),
        }
    }

    /// Width of a band.  Zero for low and high pass.
    pub fn bandwidth(&self) -> f64 {
        match *self {
            AnalogBand::LowPass(_) | AnalogBand::HighPass(_) => 0.0,
            AnalogBand::BandPass { low, high }
            | AnalogBand::BandStop { low, high } => high - low,
        }
    }
}

/// Applies the substitution for `band` to the low pass prototype `proto`.
///
/// # Arguments
///
/// * `proto` - Unit cutoff analog low pass filter.
/// * `band` - Target band shape with corners in rad/s.
///
/// # Examples
///
/// ```
/// use butter_rs::filter::prototype::butterworth_prototype;
/// use butter_rs::filter::transform::{transform, AnalogBand};
///
/// let proto = butterworth_prototype(2).unwrap();
/// let band = AnalogBand::BandPass { low: 100.0, high: 400.0 };
/// let analog = transform(&proto, &band).unwrap();
/// assert_eq!(analog.poles.len(), 4);
/// assert_eq!(analog.zeros.len(), 2);
/// ```
pub fn transform(proto: &Zpk, band: &AnalogBand) -> Result<Zpk> {
    let analog = match *band {
        AnalogBand::LowPass(wc) => {
            check_corner(wc)?;
            lp_to_lp(proto, wc)
        }
        AnalogBand::HighPass(wc) => {
            check_corner(wc)?;
            lp_to_hp(proto, wc)
        }
        AnalogBand::BandPass { low, high } => {
            check_band(low, high)?;
            lp_to_bp(proto, band.center(), band.bandwidth())
        }
        AnalogBand::BandStop { low, high } => {
            check_band(low, high)?;
            lp_to_bs(proto, band.center(), band.bandwidth())
        }
    };
    debug!(
        "analog {:?}: {} poles, {} zeros, gain {}",
        band,
        analog.poles.len(),
        analog.zeros.len(),
        analog.gain
    );
    Ok(analog)
}

fn check_corner(w: f64) -> Result<()> {
    if !w.is_finite() || w <= 0.0 {
        return Err(FilterError::InvalidParameter(format!(
            "analog corner {} rad/s must be positive and finite",
            w
        )));
    }
    Ok(())
}

fn check_band(low: f64, high: f64) -> Result<()> {
    check_corner(low)?;
    check_corner(high)?;
    if low >= high {
        return Err(FilterError::InvalidParameter(format!(
            "lower corner {} rad/s must be below the upper corner {} rad/s",
            low, high
        )));
    }
    Ok(())
}

/// Product of `-r` over all roots.
fn neg_product(roots: &[Complex<f64>]) -> Complex<f64> {
    roots.iter().fold(Complex::one(), |acc, r| acc * -*r)
}

/// Low pass to low pass, `s -> s / wc`.
pub fn lp_to_lp(proto: &Zpk, wc: f64) -> Zpk {
    let degree = proto.relative_degree() as i32;
    Zpk::new(
        proto.zeros.iter().map(|z| *z * wc).collect(),
        proto.poles.iter().map(|p| *p * wc).collect(),
        proto.gain * wc.powi(degree),
    )
}

/// Low pass to high pass, `s -> wc / s`.
///
/// Zeros at infinity move to the origin.
pub fn lp_to_hp(proto: &Zpk, wc: f64) -> Zpk {
    let degree = proto.relative_degree();
    let mut zeros: Vec<Complex<f64>> =
        proto.zeros.iter().map(|z| wc / *z).collect();
    zeros.extend(std::iter::repeat(Complex::zero()).take(degree));
    let poles = proto.poles.iter().map(|p| wc / *p).collect();
    let gain =
        proto.gain * (neg_product(&proto.zeros) / neg_product(&proto.poles)).re;
    Zpk::new(zeros, poles, gain)
}

/// Low pass to band pass, `s -> (s^2 + w0^2) / (bw * s)`.
///
/// Every root splits into two, so the pole count doubles.  Zeros at infinity
/// are split between the origin and infinity.
pub fn lp_to_bp(proto: &Zpk, w0: f64, bw: f64) -> Zpk {
    let degree = proto.relative_degree();
    let split = |r: &Complex<f64>| -> [Complex<f64>; 2] {
        let half = *r * bw / 2.0;
        let root = (half * half - w0 * w0).sqrt();
        [half + root, half - root]
    };

    let mut zeros: Vec<Complex<f64>> =
        proto.zeros.iter().flat_map(|z| split(z).to_vec()).collect();
    zeros.extend(std::iter::repeat(Complex::zero()).take(degree));
    let poles = proto.poles.iter().flat_map(|p| split(p).to_vec()).collect();
    Zpk::new(zeros, poles, proto.gain * bw.powi(degree as i32))
}

/// Low pass to band stop, `s -> (bw * s) / (s^2 + w0^2)`.
///
/// Zeros at infinity move onto `+/- j * w0`.
pub fn lp_to_bs(proto: &Zpk, w0: f64, bw: f64) -> Zpk {
    let degree = proto.relative_degree();
    let split = |r: &Complex<f64>| -> [Complex<f64>; 2] {
        let half = bw / (*r * 2.0);
        let root = (half * half - w0 * w0).sqrt();
        [half + root, half - root]
    };

    let mut zeros: Vec<Complex<f64>> =
        proto.zeros.iter().flat_map(|z| split(z).to_vec()).collect();
    for _ in 0..degree {
        zeros.push(Complex::new(0.0, w0));
        zeros.push(Complex::new(0.0, -w0));
    }
    let poles = proto.poles.iter().flat_map(|p| split(p).to_vec()).collect();
    let gain =
        proto.gain * (neg_product(&proto.zeros) / neg_product(&proto.poles)).re;
    Zpk::new(zeros, poles, gain)
}
