//! Butterworth low pass, high pass, band pass and band stop filters.
//!
//! Butterworth filters have the flattest possible passband, at the cost of a
//! slower roll-off (about 6 dB per octave per order) than Chebyshev or
//! elliptic designs.
//!
//! Each call designs a fresh cascade and runs it over the whole signal with
//! zeroed state, so calls never affect one another.

use crate::filter::bilinear::{bilinear_zpk, prewarp_band, reference_point};
use crate::filter::iir::{batch_iir, zero_state, IirFilter, Realization};
use crate::filter::prototype::butterworth_prototype;
use crate::filter::sos::{zpk_to_sos, Cascade};
use crate::filter::transform::transform;
use crate::filter::{
    validate_order, validate_sampling_freq, BandShape, FilterError, Result,
    Zpk,
};
use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Designs a Butterworth filter as a cascade of second order sections.
///
/// # Arguments
///
/// * `order` - Order of the prototype.  Band pass and band stop filters end
///   up with twice as many poles.
/// * `shape` - Band shape and corner frequencies in Hz.
/// * `fs` - Sampling frequency in Hz.
///
/// # Examples
///
/// ```
/// use butter_rs::filter::butterworth::design;
/// use butter_rs::filter::BandShape;
///
/// let shape = BandShape::LowPass { cutoff: 1000.0 };
/// let cascade = design(4, shape, 48000.0).unwrap();
/// assert_eq!(cascade.len(), 2);
/// assert!((cascade.magnitude(0.0) - 1.0).abs() < 1e-9);
/// ```
pub fn design(order: usize, shape: BandShape, fs: f64) -> Result<Cascade> {
    validate(order, &shape, fs).map_err(|e| {
        warn!("rejected butterworth design: {}", e);
        e
    })?;

    let proto = butterworth_prototype(order)?;
    let band = prewarp_band(&shape, fs);
    let analog = transform(&proto, &band)?;
    let digital = bilinear_zpk(&analog, fs)?;

    // Gain is set section by section once the cascade exists.
    let unscaled = Zpk::new(digital.zeros, digital.poles, 1.0);
    let mut cascade = zpk_to_sos(&unscaled)?;
    cascade.normalize_gain(reference_point(&band, fs))?;

    debug!(
        "designed order {} {:?} at {} Hz: {} sections",
        order,
        shape,
        fs,
        cascade.len()
    );
    Ok(cascade)
}

fn validate(order: usize, shape: &BandShape, fs: f64) -> Result<()> {
    validate_sampling_freq(fs)?;
    validate_order(order)?;
    shape.validate(fs)
}

/// Butterworth filters bound to a sampling frequency.
///
/// # Examples
///
/// ```
/// use butter_rs::filter::butterworth::Butterworth;
///
/// let butter = Butterworth::new(100.0).unwrap();
/// let signal = vec![1.0; 64];
/// let output = butter.low_pass(&signal, 2, 10.0).unwrap();
///
/// assert_eq!(output.len(), signal.len());
/// assert!(output[48..].iter().all(|y| (y - 1.0).abs() < 1e-3));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Butterworth {
    sampling_freq: f64,
    realization: Realization,
}

impl Butterworth {
    /// Creates a new `Butterworth` for signals sampled at `fs` Hz.
    pub fn new(fs: f64) -> Result<Butterworth> {
        validate_sampling_freq(fs)?;
        Ok(Butterworth {
            sampling_freq: fs,
            realization: Realization::default(),
        })
    }

    /// Uses `realization` to evaluate the sections.
    pub fn with_realization(mut self, realization: Realization) -> Butterworth {
        self.realization = realization;
        self
    }

    pub fn sampling_freq(&self) -> f64 {
        self.sampling_freq
    }

    pub fn realization(&self) -> Realization {
        self.realization
    }

    /// Designs the cascade for `shape` without filtering anything.
    pub fn design(&self, order: usize, shape: BandShape) -> Result<Cascade> {
        design(order, shape, self.sampling_freq)
    }

    /// Designs a filter and returns a streaming handle for it.
    pub fn stream(&self, order: usize, shape: BandShape) -> Result<IirFilter> {
        Ok(IirFilter::new(self.design(order, shape)?, self.realization))
    }

    /// Designs a filter for `shape` and runs it over `signal`.
    ///
    /// The output has the same length as the input.  Nothing is filtered if
    /// the parameters are rejected.
    pub fn filter(
        &self,
        signal: &[f64],
        order: usize,
        shape: BandShape,
    ) -> Result<Vec<f64>> {
        let cascade = self.design(order, shape)?;
        let mut state = zero_state(&cascade, self.realization);
        Ok(batch_iir(signal, &cascade, &mut state))
    }

    /// Low pass filters `signal`.
    ///
    /// # Arguments
    ///
    /// * `signal` - Signal to be filtered.
    /// * `order` - Order of the filter.
    /// * `cutoff` - Cutoff frequency in Hz, inside (0, fs / 2).
    pub fn low_pass(
        &self,
        signal: &[f64],
        order: usize,
        cutoff: f64,
    ) -> Result<Vec<f64>> {
        self.filter(signal, order, BandShape::LowPass { cutoff })
    }

    /// High pass filters `signal`.
    ///
    /// # Arguments
    ///
    /// * `signal` - Signal to be filtered.
    /// * `order` - Order of the filter.
    /// * `cutoff` - Cutoff frequency in Hz, inside (0, fs / 2).
    pub fn high_pass(
        &self,
        signal: &[f64],
        order: usize,
        cutoff: f64,
    ) -> Result<Vec<f64>> {
        self.filter(signal, order, BandShape::HighPass { cutoff })
    }

    /// Band pass filters `signal`.
    ///
    /// # Arguments
    ///
    /// * `signal` - Signal to be filtered.
    /// * `order` - Order of the filter.
    /// * `low` - Lower cutoff frequency in Hz.
    /// * `high` - Upper cutoff frequency in Hz, above `low` and below fs / 2.
    ///
    /// # Examples
    ///
    /// ```
    /// use butter_rs::filter::butterworth::Butterworth;
    /// use butter_rs::filter::FilterError;
    ///
    /// let butter = Butterworth::new(100.0).unwrap();
    /// match butter.band_pass(&[0.0; 16], 4, 30.0, 20.0) {
    ///     Err(FilterError::InvalidParameter(_)) => (),
    ///     _ => panic!("inverted band must be rejected"),
    /// }
    /// ```
    pub fn band_pass(
        &self,
        signal: &[f64],
        order: usize,
        low: f64,
        high: f64,
    ) -> Result<Vec<f64>> {
        self.filter(signal, order, BandShape::BandPass { low, high })
    }

    /// Band stop filters `signal`.
    ///
    /// # Arguments
    ///
    /// * `signal` - Signal to be filtered.
    /// * `order` - Order of the filter.
    /// * `low` - Lower cutoff frequency in Hz.
    /// * `high` - Upper cutoff frequency in Hz, above `low` and below fs / 2.
    pub fn band_stop(
        &self,
        signal: &[f64],
        order: usize,
        low: f64,
        high: f64,
    ) -> Result<Vec<f64>> {
        self.filter(signal, order, BandShape::BandStop { low, high })
    }

    /// Filters several independent channels with the same design.
    ///
    /// The filter is designed once, then every channel runs in parallel with
    /// its own zeroed state.
    pub fn filter_channels(
        &self,
        channels: &[Vec<f64>],
        order: usize,
        shape: BandShape,
    ) -> Result<Vec<Vec<f64>>> {
        let cascade = self.design(order, shape)?;
        let realization = self.realization;
        Ok(channels
            .par_iter()
            .map(|channel| {
                let mut state = zero_state(&cascade, realization);
                batch_iir(channel, &cascade, &mut state)
            })
            .collect())
    }
}

/// A complete filter description that can be loaded with serde.
///
/// # Examples
///
/// ```
/// use butter_rs::filter::butterworth::FilterConfig;
///
/// let config: FilterConfig = serde_json::from_str(r#"{
///     "sampling_freq": 8000.0,
///     "order": 4,
///     "shape": { "type": "high_pass", "cutoff": 300.0 }
/// }"#).unwrap();
/// let mut filter = config.build().unwrap();
/// let _ = filter.push(1.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub sampling_freq: f64,
    pub order: usize,
    pub shape: BandShape,
    #[serde(default)]
    pub realization: Realization,
}

impl FilterConfig {
    /// Designs the cascade described by this config.
    pub fn design(&self) -> Result<Cascade> {
        design(self.order, self.shape, self.sampling_freq)
    }

    /// Designs the filter and returns a streaming handle with zeroed state.
    pub fn build(&self) -> Result<IirFilter> {
        Ok(IirFilter::new(self.design()?, self.realization))
    }

    /// Builds a `Butterworth` for the sampling frequency of this config.
    pub fn butterworth(&self) -> Result<Butterworth> {
        Ok(Butterworth::new(self.sampling_freq)?
            .with_realization(self.realization))
    }
}

impl std::convert::TryFrom<&FilterConfig> for IirFilter {
    type Error = FilterError;

    fn try_from(config: &FilterConfig) -> Result<IirFilter> {
        config.build()
    }
}
