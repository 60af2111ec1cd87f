//! Numerical utilities used by the analysis algorithms

pub mod brent;
pub mod fft;

pub use brent::minimize_brent;
pub use fft::FftTable;
