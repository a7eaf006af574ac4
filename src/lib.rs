//! Butterworth IIR filter design and filtering.
//!
//! Filters are designed from an analog prototype, moved into the z-plane with
//! the bilinear transform and run as a cascade of second order sections.
//!
//! # Example
//!
//! ```
//! use butter_rs::prelude::*;
//!
//! let butter = Butterworth::new(100.0).unwrap();
//! let signal: Vec<f64> = (0..256).map(|n| (n as f64 * 0.1).sin()).collect();
//!
//! let low = butter.low_pass(&signal, 4, 10.0).unwrap();
//! let band = butter.band_pass(&signal, 2, 5.0, 15.0).unwrap();
//! assert_eq!(low.len(), band.len());
//! ```

pub mod filter;
pub mod prelude;

pub use crate::filter::{FilterError, Result};
