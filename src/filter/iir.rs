//! Implementation of an infinite impulse response (IIR) filter as a cascade
//! of second order sections.
//!
//! Each sample is passed through every section in turn, the output of one
//! section feeding the input of the next.  Every section keeps its own delay
//! registers.  Takes in `f64` samples, outputs `f64`.

use crate::filter::sos::{Biquad, Cascade};
use serde::{Deserialize, Serialize};

/// The structure used to evaluate each section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Realization {
    /// Direct form I, keeping the last two inputs and outputs.
    #[serde(rename = "direct_form_1")]
    DirectFormI,
    /// Transposed direct form II, keeping two accumulators.
    #[serde(rename = "transposed_direct_form_2")]
    TransposedDirectFormII,
}

impl Default for Realization {
    fn default() -> Self {
        Realization::TransposedDirectFormII
    }
}

/// Delay registers of a single section.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SectionState {
    DirectFormI { x1: f64, x2: f64, y1: f64, y2: f64 },
    TransposedDirectFormII { s1: f64, s2: f64 },
}

impl SectionState {
    /// Creates zeroed registers for the given realization.
    pub fn new(realization: Realization) -> SectionState {
        match realization {
            Realization::DirectFormI => SectionState::DirectFormI {
                x1: 0.0,
                x2: 0.0,
                y1: 0.0,
                y2: 0.0,
            },
            Realization::TransposedDirectFormII => {
                SectionState::TransposedDirectFormII { s1: 0.0, s2: 0.0 }
            }
        }
    }

    /// Runs one sample through `section`, updating the registers.
    #[inline]
    pub fn step(&mut self, section: &Biquad, x: f64) -> f64 {
        match self {
            SectionState::DirectFormI { x1, x2, y1, y2 } => {
                let y = section.b0 * x + section.b1 * *x1 + section.b2 * *x2
                    - section.a1 * *y1
                    - section.a2 * *y2;
                *x2 = *x1;
                *x1 = x;
                *y2 = *y1;
                *y1 = y;
                y
            }
            SectionState::TransposedDirectFormII { s1, s2 } => {
                let y = section.b0 * x + *s1;
                *s1 = section.b1 * x + *s2 - section.a1 * y;
                *s2 = section.b2 * x - section.a2 * y;
                y
            }
        }
    }
}

/// Creates zeroed state for every section of `cascade`.
pub fn zero_state(
    cascade: &Cascade,
    realization: Realization,
) -> Vec<SectionState> {
    vec![SectionState::new(realization); cascade.len()]
}

/// Runs a single sample through the cascade.
///
/// # Arguments
///
/// * `input` - Input sample to be filtered.
/// * `cascade` - Second order sections of the filter.
/// * `state` - One set of registers per section.
///
/// # Examples
///
/// ```
/// use butter_rs::filter::iir::*;
/// use butter_rs::filter::sos::{Biquad, Cascade};
///
/// let section = Biquad::new([0.5, 0.5, 0.0], [1.0, 0.0, 0.0]);
/// let cascade = Cascade::new(vec![section]);
/// let mut state = zero_state(&cascade, Realization::default());
///
/// assert_eq!(iir(1.0, &cascade, &mut state), 0.5);
/// assert_eq!(iir(1.0, &cascade, &mut state), 1.0);
/// ```
pub fn iir(input: f64, cascade: &Cascade, state: &mut [SectionState]) -> f64 {
    cascade
        .sections()
        .iter()
        .zip(state.iter_mut())
        .fold(input, |x, (section, regs)| regs.step(section, x))
}

/// Runs a batch of samples through the cascade.
///
/// # Arguments
///
/// * `input` - Input batch of samples to be filtered.
/// * `cascade` - Second order sections of the filter.
/// * `state` - One set of registers per section, carried across the batch.
///
/// # Examples
///
/// ```
/// use butter_rs::filter::iir::*;
/// use butter_rs::filter::sos::{Biquad, Cascade};
///
/// let input: Vec<f64> = (0..100).map(|x| (x as f64).cos()).collect();
/// let section = Biquad::new([0.2, 0.4, 0.2], [1.0, -0.5, 0.1]);
/// let cascade = Cascade::new(vec![section]);
/// let mut state = zero_state(&cascade, Realization::default());
///
/// let output = batch_iir(&input, &cascade, &mut state);
/// assert_eq!(output.len(), input.len());
/// ```
pub fn batch_iir(
    input: &[f64],
    cascade: &Cascade,
    state: &mut [SectionState],
) -> Vec<f64> {
    input
        .iter()
        .map(|sample| iir(*sample, cascade, state))
        .collect()
}

/// A cascade together with the state needed to run it sample by sample.
///
/// State persists across calls to `push` and `process` until `reset` is
/// called.
#[derive(Clone, Debug)]
pub struct IirFilter {
    cascade: Cascade,
    realization: Realization,
    state: Vec<SectionState>,
}

impl IirFilter {
    /// Creates a new `IirFilter` with zeroed state.
    ///
    /// # Examples
    ///
    /// ```
    /// use butter_rs::filter::iir::{IirFilter, Realization};
    /// use butter_rs::filter::sos::{Biquad, Cascade};
    ///
    /// let cascade = Cascade::new(vec![Biquad::identity()]);
    /// let mut filter = IirFilter::new(cascade, Realization::DirectFormI);
    /// assert_eq!(filter.push(3.0), 3.0);
    /// ```
    pub fn new(cascade: Cascade, realization: Realization) -> IirFilter {
        let state = zero_state(&cascade, realization);
        IirFilter {
            cascade,
            realization,
            state,
        }
    }

    /// Filters one sample.
    pub fn push(&mut self, input: f64) -> f64 {
        iir(input, &self.cascade, &mut self.state)
    }

    /// Filters a batch of samples, continuing from the current state.
    pub fn process(&mut self, input: &[f64]) -> Vec<f64> {
        batch_iir(input, &self.cascade, &mut self.state)
    }

    /// Zeroes every delay register.
    pub fn reset(&mut self) {
        self.state = zero_state(&self.cascade, self.realization);
    }

    pub fn cascade(&self) -> &Cascade {
        &self.cascade
    }

    pub fn realization(&self) -> Realization {
        self.realization
    }
}
