//! This module provides an easy single import for those using this crate.

pub use crate::filter::butterworth::{design, Butterworth, FilterConfig};
pub use crate::filter::iir::{IirFilter, Realization};
pub use crate::filter::sos::{Biquad, Cascade};
pub use crate::filter::{BandShape, FilterError};
