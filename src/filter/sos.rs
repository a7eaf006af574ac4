//! Second order sections.
//!
//! A digital filter with many poles is split into a cascade of biquads, each
//! holding one conjugate pole pair (or a pair of real poles) and the zeros
//! that best match it.  Running the cascade gives the same result as the full
//! transfer function while keeping each section's coefficients well
//! conditioned.

use crate::filter::{FilterError, Result, Zpk};
use num_complex::Complex;
use num_traits::One;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Relative tolerance for treating a root as real.
const REAL_TOLERANCE: f64 = 1e-10;

/// Coefficients of one second order section.
///
/// The transfer function of a section is
///
/// ```text
///        b0 + b1 * z^-1 + b2 * z^-2
/// H(z) = --------------------------
///        a0 + a1 * z^-1 + a2 * z^-2
/// ```
///
/// with `a0` normalized to 1.  A first order section has `b2 = a2 = 0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Biquad {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a0: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Biquad {
    /// Creates a section from raw coefficients, dividing through by `a[0]`.
    ///
    /// # Arguments
    ///
    /// * `b` - Numerator coefficients `[b0, b1, b2]`.
    /// * `a` - Denominator coefficients `[a0, a1, a2]`, `a0` must be nonzero.
    ///
    /// # Examples
    ///
    /// ```
    /// use butter_rs::filter::sos::Biquad;
    ///
    /// let section = Biquad::new([2.0, 0.0, 0.0], [2.0, -1.0, 0.0]);
    /// assert_eq!(section.b0, 1.0);
    /// assert_eq!(section.a1, -0.5);
    /// ```
    pub fn new(b: [f64; 3], a: [f64; 3]) -> Biquad {
        let a0 = a[0];
        Biquad {
            b0: b[0] / a0,
            b1: b[1] / a0,
            b2: b[2] / a0,
            a0: 1.0,
            a1: a[1] / a0,
            a2: a[2] / a0,
        }
    }

    /// A section that passes its input through untouched.
    pub fn identity() -> Biquad {
        Biquad::new([1.0, 0.0, 0.0], [1.0, 0.0, 0.0])
    }

    /// Builds a section from up to two zeros, up to two poles and a gain.
    ///
    /// Complex roots must come as a conjugate pair so that the coefficients
    /// are real.
    pub fn from_roots(
        zeros: &[Complex<f64>],
        poles: &[Complex<f64>],
        gain: f64,
    ) -> Biquad {
        let b = poly(zeros);
        let a = poly(poles);
        Biquad::new([gain * b[0], gain * b[1], gain * b[2]], a)
    }

    /// 1 for a first order section, 2 otherwise.
    pub fn order(&self) -> usize {
        if self.a2 == 0.0 && self.b2 == 0.0 {
            1
        } else {
            2
        }
    }

    /// Whether both poles of the section lie strictly inside the unit
    /// circle.
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }

    /// Evaluates the section at the point `z`.
    pub fn response(&self, z: Complex<f64>) -> Complex<f64> {
        let zi = z.inv();
        let zi2 = zi * zi;
        let num = zi * self.b1 + zi2 * self.b2 + self.b0;
        let den = zi * self.a1 + zi2 * self.a2 + self.a0;
        num / den
    }
}

/// Real polynomial `[1, c1, c2]` with the given roots (at most two).
fn poly(roots: &[Complex<f64>]) -> [f64; 3] {
    match roots {
        [] => [1.0, 0.0, 0.0],
        [r] => [1.0, -r.re, 0.0],
        [r1, r2] => [1.0, -(r1 + r2).re, (r1 * r2).re],
        _ => unreachable!("a section holds at most two roots"),
    }
}

/// An ordered cascade of second order sections.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cascade {
    sections: Vec<Biquad>,
}

impl Cascade {
    pub fn new(sections: Vec<Biquad>) -> Cascade {
        Cascade { sections }
    }

    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Total number of poles across all sections.
    pub fn order(&self) -> usize {
        self.sections.iter().map(Biquad::order).sum()
    }

    pub fn is_stable(&self) -> bool {
        self.sections.iter().all(Biquad::is_stable)
    }

    /// Complex frequency response at a normalized frequency.
    ///
    /// # Arguments
    ///
    /// * `normalized_freq` - Frequency divided by the sampling frequency, in
    ///   [0, 0.5].
    ///
    /// # Examples
    ///
    /// ```
    /// use butter_rs::filter::sos::{Biquad, Cascade};
    ///
    /// let cascade = Cascade::new(vec![Biquad::identity()]);
    /// assert_eq!(cascade.magnitude(0.25), 1.0);
    /// ```
    pub fn response(&self, normalized_freq: f64) -> Complex<f64> {
        let z = Complex::from_polar(1.0, 2.0 * PI * normalized_freq);
        self.sections
            .iter()
            .fold(Complex::one(), |acc, s| acc * s.response(z))
    }

    /// Magnitude of the frequency response at a normalized frequency.
    pub fn magnitude(&self, normalized_freq: f64) -> f64 {
        self.response(normalized_freq).norm()
    }

    /// Scales the numerator of every section so that each one has unit
    /// magnitude at the point `z`.  The whole cascade then has unit magnitude
    /// there too.
    ///
    /// No product over more than one section's roots is formed, so the
    /// result holds at any order.
    ///
    /// # Examples
    ///
    /// ```
    /// use butter_rs::filter::sos::{Biquad, Cascade};
    /// use num_complex::Complex;
    ///
    /// let mut cascade = Cascade::new(vec![
    ///     Biquad::new([1.0, 1.0, 0.0], [1.0, -0.5, 0.0]),
    ///     Biquad::new([1.0, 2.0, 1.0], [1.0, -0.2, 0.1]),
    /// ]);
    /// cascade.normalize_gain(Complex::new(1.0, 0.0)).unwrap();
    /// assert!((cascade.magnitude(0.0) - 1.0).abs() < 1e-12);
    /// ```
    pub fn normalize_gain(&mut self, z: Complex<f64>) -> Result<()> {
        for section in &mut self.sections {
            let magnitude = section.response(z).norm();
            if !magnitude.is_finite() || magnitude == 0.0 {
                return Err(FilterError::DesignError(format!(
                    "section response at {} is {}, can't normalize the gain",
                    z, magnitude
                )));
            }
            section.b0 /= magnitude;
            section.b1 /= magnitude;
            section.b2 /= magnitude;
        }
        Ok(())
    }
}

fn is_real(root: &Complex<f64>) -> bool {
    root.im.abs() <= REAL_TOLERANCE * (1.0 + root.norm())
}

/// Groups roots into conjugate pairs, pairs of reals and at most one single
/// real root.
fn group_roots(
    roots: &[Complex<f64>],
    kind: &str,
) -> Result<Vec<Vec<Complex<f64>>>> {
    let upper: Vec<Complex<f64>> = roots
        .iter()
        .filter(|r| !is_real(r) && r.im > 0.0)
        .cloned()
        .collect();
    let lower = roots.iter().filter(|r| !is_real(r) && r.im < 0.0).count();
    if upper.len() != lower {
        return Err(FilterError::DesignError(format!(
            "{} {} with positive imaginary part but {} with negative",
            upper.len(),
            kind,
            lower
        )));
    }

    let mut reals: Vec<f64> =
        roots.iter().filter(|r| is_real(r)).map(|r| r.re).collect();
    reals.sort_by(|a, b| {
        b.abs()
            .partial_cmp(&a.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut groups: Vec<Vec<Complex<f64>>> =
        upper.iter().map(|r| vec![*r, r.conj()]).collect();
    for chunk in reals.chunks(2) {
        groups.push(chunk.iter().map(|r| Complex::new(*r, 0.0)).collect());
    }
    Ok(groups)
}

fn distance_to_circle(group: &[Complex<f64>]) -> f64 {
    group
        .iter()
        .map(|r| 1.0 - r.norm())
        .fold(std::f64::INFINITY, f64::min)
}

fn distance_between(a: &[Complex<f64>], b: &[Complex<f64>]) -> f64 {
    a.iter()
        .flat_map(|x| b.iter().map(move |y| (x - y).norm()))
        .fold(std::f64::INFINITY, f64::min)
}

/// Factors a digital filter into a cascade of second order sections.
///
/// Pole groups are matched to zero groups starting from the poles closest
/// to the unit circle, each taking the nearest remaining zeros of the same
/// count.  Sections are ordered from the poles farthest from the unit circle
/// to the closest, and the overall gain is folded into the first section.
///
/// # Arguments
///
/// * `digital` - Digital filter with as many zeros as poles.
pub fn zpk_to_sos(digital: &Zpk) -> Result<Cascade> {
    if digital.zeros.len() != digital.poles.len() {
        return Err(FilterError::DesignError(format!(
            "{} zeros and {} poles can't be split into sections",
            digital.zeros.len(),
            digital.poles.len()
        )));
    }
    if digital.poles.is_empty() {
        let mut section = Biquad::identity();
        section.b0 = digital.gain;
        return Ok(Cascade::new(vec![section]));
    }

    let mut pole_groups = group_roots(&digital.poles, "poles")?;
    let mut zero_groups = group_roots(&digital.zeros, "zeros")?;

    pole_groups.sort_by(|a, b| {
        distance_to_circle(a)
            .partial_cmp(&distance_to_circle(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut sections = Vec::with_capacity(pole_groups.len());
    for poles in &pole_groups {
        let nearest = zero_groups
            .iter()
            .enumerate()
            .filter(|(_, zeros)| zeros.len() == poles.len())
            .map(|(i, zeros)| (i, distance_between(zeros, poles)))
            .min_by(|a, b| {
                a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i);
        let zeros = match nearest {
            Some(i) => zero_groups.swap_remove(i),
            None => {
                return Err(FilterError::DesignError(format!(
                    "no zeros left to pair with poles {:?}",
                    poles
                )))
            }
        };
        sections.push(Biquad::from_roots(&zeros, poles, 1.0));
    }

    sections.reverse();
    let first = &mut sections[0];
    first.b0 *= digital.gain;
    first.b1 *= digital.gain;
    first.b2 *= digital.gain;

    Ok(Cascade::new(sections))
}

#[cfg(test)]
mod test {
    use crate::filter::bilinear::*;
    use crate::filter::prototype::butterworth_prototype;
    use crate::filter::sos::*;
    use crate::filter::transform::transform;
    use crate::filter::BandShape;
    use assert_approx_eq::assert_approx_eq;

    fn digital(order: usize, shape: BandShape, fs: f64) -> Zpk {
        let band = prewarp_band(&shape, fs);
        let proto = butterworth_prototype(order).unwrap();
        bilinear_zpk(&transform(&proto, &band).unwrap(), fs).unwrap()
    }

    #[test]
    fn test_biquad_response() {
        // Two point moving average.
        let section = Biquad::new([0.5, 0.5, 0.0], [1.0, 0.0, 0.0]);
        assert_eq!(section.order(), 1);
        assert_approx_eq!(section.response(Complex::one()).norm(), 1.0);
        let nyquist = section.response(Complex::new(-1.0, 0.0));
        assert_approx_eq!(nyquist.norm(), 0.0);
    }

    #[test]
    fn test_biquad_stability() {
        assert!(Biquad::new([1.0, 0.0, 0.0], [1.0, -1.8, 0.81]).is_stable());
        assert!(!Biquad::new([1.0, 0.0, 0.0], [1.0, -2.0, 1.0]).is_stable());
        assert!(!Biquad::new([1.0, 0.0, 0.0], [1.0, 0.0, 1.2]).is_stable());
    }

    #[test]
    fn test_group_roots_odd() {
        let roots = vec![
            Complex::new(0.5, 0.3),
            Complex::new(-0.2, 0.0),
            Complex::new(0.5, -0.3),
        ];
        let groups = group_roots(&roots, "poles").unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], vec![roots[0], roots[2]]);
        assert_eq!(groups[1], vec![roots[1]]);
    }

    #[test]
    fn test_group_roots_unpaired() {
        let roots = vec![Complex::new(0.5, 0.3), Complex::new(0.1, 0.0)];
        match group_roots(&roots, "poles") {
            Err(FilterError::DesignError(_)) => (),
            other => panic!("expected DesignError, got {:?}", other),
        }
    }

    #[test]
    fn test_section_counts() {
        let fs = 1000.0;
        let lp_shape = BandShape::LowPass { cutoff: 100.0 };
        let lp = zpk_to_sos(&digital(5, lp_shape, fs)).unwrap();
        assert_eq!(lp.len(), 3);
        assert_eq!(lp.order(), 5);
        assert_eq!(lp.sections().iter().filter(|s| s.order() == 1).count(), 1);

        let hp_shape = BandShape::HighPass { cutoff: 100.0 };
        let hp = zpk_to_sos(&digital(4, hp_shape, fs)).unwrap();
        assert_eq!(hp.len(), 2);

        let shape = BandShape::BandPass {
            low: 100.0,
            high: 200.0,
        };
        let bp = zpk_to_sos(&digital(3, shape, fs)).unwrap();
        assert_eq!(bp.len(), 3);
        assert_eq!(bp.order(), 6);
    }

    #[test]
    fn test_cascade_matches_zpk() {
        let fs = 1000.0;
        let shape = BandShape::BandStop {
            low: 100.0,
            high: 150.0,
        };
        let zpk = digital(4, shape, fs);
        let cascade = zpk_to_sos(&zpk).unwrap();
        assert!(cascade.is_stable());
        for &f in &[0.0, 50.0, 100.0, 125.0, 150.0, 300.0, 499.0] {
            let z = Complex::from_polar(1.0, 2.0 * PI * f / fs);
            let expected = evaluate(&zpk, z);
            let actual = cascade.response(f / fs);
            assert_approx_eq!(actual.re, expected.re, 1e-9);
            assert_approx_eq!(actual.im, expected.im, 1e-9);
        }
    }

    #[test]
    fn test_sections_ordered_toward_unit_circle() {
        let fs = 1000.0;
        let shape = BandShape::LowPass { cutoff: 50.0 };
        let cascade = zpk_to_sos(&digital(8, shape, fs)).unwrap();
        // a2 is the squared pole radius of a conjugate pair.
        let radii: Vec<f64> =
            cascade.sections().iter().map(|s| s.a2).collect();
        for pair in radii.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_normalize_each_section() {
        let fs = 1000.0;
        let shape = BandShape::BandPass {
            low: 100.0,
            high: 200.0,
        };
        let band = prewarp_band(&shape, fs);
        let reference = reference_point(&band, fs);
        let zpk = digital(3, shape, fs);
        let mut cascade = zpk_to_sos(&zpk).unwrap();
        cascade.normalize_gain(reference).unwrap();
        for section in cascade.sections() {
            assert_approx_eq!(section.response(reference).norm(), 1.0, 1e-12);
        }
        // Same filter as the analog gain gave, up to rounding.
        for &f in &[50.0, 150.0, 300.0] {
            let z = Complex::from_polar(1.0, 2.0 * PI * f / fs);
            assert_approx_eq!(
                cascade.magnitude(f / fs),
                evaluate(&zpk, z).norm(),
                1e-9
            );
        }
    }

    #[test]
    fn test_normalize_high_order() {
        // A single product over all 120 poles leaves the range of f64.
        let fs = 48000.0;
        let shape = BandShape::LowPass { cutoff: 100.0 };
        let band = prewarp_band(&shape, fs);
        let proto = butterworth_prototype(120).unwrap();
        let analog = transform(&proto, &band).unwrap();
        let digital = bilinear_zpk(&analog, fs).unwrap();
        let unscaled = Zpk::new(digital.zeros, digital.poles, 1.0);
        let mut cascade = zpk_to_sos(&unscaled).unwrap();
        cascade.normalize_gain(reference_point(&band, fs)).unwrap();
        assert_eq!(cascade.len(), 60);
        assert!(cascade.is_stable());
        assert_approx_eq!(cascade.magnitude(0.0), 1.0, 1e-9);
    }

    #[test]
    fn test_normalize_zero_response() {
        // A zero at DC can't be scaled to unity there.
        let mut cascade = Cascade::new(vec![Biquad::new(
            [1.0, -1.0, 0.0],
            [1.0, -0.5, 0.0],
        )]);
        match cascade.normalize_gain(Complex::one()) {
            Err(FilterError::DesignError(_)) => (),
            other => panic!("expected DesignError, got {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_counts() {
        let zpk = Zpk::new(vec![], vec![Complex::new(0.5, 0.0)], 1.0);
        assert!(zpk_to_sos(&zpk).is_err());
    }
}
