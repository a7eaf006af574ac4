//! Analog Butterworth prototype.
//!
//! The prototype is a unit cutoff (1 rad/s) analog low pass filter.  Its `N`
//! poles sit evenly spaced on the left half of the unit circle in the s-plane
//! and it has no finite zeros.

use crate::filter::{validate_order, FilterError, Result, Zpk};
use log::debug;
use num_complex::Complex;
use std::f64::consts::PI;

/// Designs the normalized analog Butterworth low pass prototype.
///
/// Pole `k` (for `k` in `1..=order`) is placed at angle
/// `pi / 2 + (2k - 1) * pi / (2 * order)` on the unit circle.
///
/// # Arguments
///
/// * `order` - Number of poles of the prototype, at least 1.
///
/// # Examples
///
/// ```
/// use butter_rs::filter::prototype::butterworth_prototype;
///
/// let proto = butterworth_prototype(3).unwrap();
/// assert_eq!(proto.poles.len(), 3);
/// assert!(proto.poles.iter().all(|p| p.re < 0.0));
/// ```
pub fn butterworth_prototype(order: usize) -> Result<Zpk> {
    validate_order(order)?;

    let n = order as f64;
    let mut poles = Vec::with_capacity(order);
    for k in 1..=order {
        let theta = PI / 2.0 + (2.0 * k as f64 - 1.0) * PI / (2.0 * n);
        let pole = stabilize(Complex::from_polar(1.0, theta))?;
        poles.push(pole);
    }

    // The middle pole of an odd order lands on -1, but cos/sin leave a
    // residue in the imaginary part that would break conjugate pairing.
    if order % 2 == 1 {
        poles[order / 2] = Complex::new(-1.0, 0.0);
    }

    debug!("butterworth prototype of order {}: {:?}", order, poles);
    Ok(Zpk::new(Vec::new(), poles, 1.0))
}

/// Mirrors a pole into the left half plane.
///
/// A pole sitting on the imaginary axis can't be made stable and is reported
/// as a design error.
fn stabilize(pole: Complex<f64>) -> Result<Complex<f64>> {
    if pole.re < 0.0 {
        Ok(pole)
    } else if pole.re > 0.0 {
        Ok(Complex::new(-pole.re, pole.im))
    } else {
        Err(FilterError::DesignError(format!(
            "prototype pole {} lies on the imaginary axis",
            pole
        )))
    }
}

#[cfg(test)]
mod test {
    use crate::filter::prototype::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_prototype_order_two() {
        let proto = butterworth_prototype(2).unwrap();
        let half_sqrt2 = std::f64::consts::FRAC_1_SQRT_2;
        assert_eq!(proto.poles.len(), 2);
        assert!(proto.zeros.is_empty());
        assert_approx_eq!(proto.poles[0].re, -half_sqrt2);
        assert_approx_eq!(proto.poles[0].im, half_sqrt2);
        assert_approx_eq!(proto.poles[1].re, -half_sqrt2);
        assert_approx_eq!(proto.poles[1].im, -half_sqrt2);
    }

    #[test]
    fn test_prototype_unit_circle_left_half() {
        for order in 1..=12 {
            let proto = butterworth_prototype(order).unwrap();
            assert_eq!(proto.poles.len(), order);
            for pole in &proto.poles {
                assert!(pole.re < 0.0);
                assert_approx_eq!(pole.norm(), 1.0);
            }
        }
    }

    #[test]
    fn test_prototype_odd_real_pole() {
        let proto = butterworth_prototype(5).unwrap();
        assert_eq!(proto.poles[2], Complex::new(-1.0, 0.0));
        let real_poles = proto.poles.iter().filter(|p| p.im == 0.0).count();
        assert_eq!(real_poles, 1);
    }

    #[test]
    fn test_prototype_zero_order() {
        match butterworth_prototype(0) {
            Err(FilterError::InvalidParameter(_)) => (),
            other => panic!("expected InvalidParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_stabilize() {
        let flipped = stabilize(Complex::new(0.5, 0.2)).unwrap();
        assert_eq!(flipped, Complex::new(-0.5, 0.2));
        assert!(stabilize(Complex::new(0.0, 1.0)).is_err());
    }
}
