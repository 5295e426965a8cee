//! Numerical utilities: least squares for the forecast regressions.

pub mod ols;

pub use ols::*;
