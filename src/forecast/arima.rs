//! ARIMA(1,1,1) estimation and forecasting.
//!
//! The model, on the once-differenced series `w_t = y_t - y_{t-1}`:
//!
//! ```text
//! w_t = φ·w_{t-1} + ε_t + θ·ε_{t-1}
//! ```
//!
//! There is no trend term (the usual convention when `d = 1`).
//!
//! ## Estimation (Hannan–Rissanen)
//!
//! 1. Fit a long autoregression `AR(m)` to `w` by least squares; its residuals
//!    estimate the unobserved innovations `ε̂_t`.
//! 2. Regress `w_t` on `[w_{t-1}, ε̂_{t-1}]` to get `φ` and `θ`.
//!
//! ## Short series
//!
//! With fewer than `HR_MIN_DIFFS` differences the stage-1 regression has no
//! rows to spare, so `(φ, θ)` are chosen by conditional least squares instead:
//! a grid over the bounded square minimizing `Σ e_t²` (ties go to the smaller
//! `φ² + θ²`). The same fit is used when either Hannan–Rissanen regression is
//! singular.
//!
//! Both coefficients are bounded to `(-0.99, 0.99)` so the AR part stays
//! stationary and the MA part invertible. The residual variance comes from the
//! conditional recursion `e_t = w_t - φ·w_{t-1} - θ·e_{t-1}` with `e_{-1} = 0`.

use thiserror::Error;

use crate::math::regress;

/// Fewest observations we attempt to fit (two differences).
pub const MIN_OBSERVATIONS: usize = 3;

/// Differences needed before Hannan–Rissanen is used.
const HR_MIN_DIFFS: usize = 7;

const COEFF_BOUND: f64 = 0.99;

/// Grid resolution for the conditional least squares fit.
const CSS_STEP: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("series contains non-finite values")]
    NonFinite,
    #[error("series is constant")]
    Constant,
    #[error("lag regression is singular")]
    Singular,
}

/// A fitted ARIMA(1,1,1) model, holding the state needed to forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct Arima111 {
    ar: f64,
    ma: f64,
    sigma2: f64,
    n_obs: usize,
    last_level: f64,
    last_diff: f64,
    last_innovation: f64,
}

impl Arima111 {
    pub fn fit(series: &[f64]) -> Result<Self, FitError> {
        let n = series.len();
        if n < MIN_OBSERVATIONS {
            return Err(FitError::InsufficientData {
                required: MIN_OBSERVATIONS,
                actual: n,
            });
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite);
        }
        if series.windows(2).all(|w| w[0] == w[1]) {
            return Err(FitError::Constant);
        }

        let diffs = difference(series);
        let (ar, ma) = if diffs.len() >= HR_MIN_DIFFS {
            hannan_rissanen(&diffs).unwrap_or_else(|| conditional_least_squares(&diffs))
        } else {
            conditional_least_squares(&diffs)
        };

        let residuals = conditional_residuals(&diffs, ar, ma);
        let tail = &residuals[1..];
        let sigma2 = tail.iter().map(|e| e * e).sum::<f64>() / tail.len() as f64;
        if !sigma2.is_finite() {
            return Err(FitError::Singular);
        }

        Ok(Self {
            ar,
            ma,
            sigma2,
            n_obs: n,
            last_level: series[n - 1],
            last_diff: diffs[diffs.len() - 1],
            last_innovation: residuals[residuals.len() - 1],
        })
    }

    /// Point forecasts for the next `steps` periods, on the original scale.
    pub fn forecast(&self, steps: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(steps);
        let mut level = self.last_level;
        let mut prev_diff = self.last_diff;

        for h in 0..steps {
            // Future innovations have zero expectation; only the last observed
            // one feeds the first step through the MA term.
            let mut diff = self.ar * prev_diff;
            if h == 0 {
                diff += self.ma * self.last_innovation;
            }
            level += diff;
            prev_diff = diff;
            out.push(level);
        }

        out
    }

    pub fn ar(&self) -> f64 {
        self.ar
    }

    pub fn ma(&self) -> f64 {
        self.ma
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn n_obs(&self) -> usize {
        self.n_obs
    }
}

fn difference(series: &[f64]) -> Vec<f64> {
    series.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Bounded `(φ, θ)`, or `None` if either regression is singular.
fn hannan_rissanen(diffs: &[f64]) -> Option<(f64, f64)> {
    let order = long_ar_order(diffs.len());
    let innovations = long_ar_innovations(diffs, order)?;

    // Stage 2: w_t on [w_{t-1}, ε̂_{t-1}], only where ε̂_{t-1} is defined.
    let mut rows = Vec::with_capacity(diffs.len());
    let mut targets = Vec::with_capacity(diffs.len());
    for t in (order + 1)..diffs.len() {
        rows.push(vec![diffs[t - 1], innovations[t - 1]]);
        targets.push(diffs[t]);
    }
    let beta = regress(&rows, &targets)?;
    Some((
        beta[0].clamp(-COEFF_BOUND, COEFF_BOUND),
        beta[1].clamp(-COEFF_BOUND, COEFF_BOUND),
    ))
}

/// Grid search for the `(φ, θ)` with the smallest conditional sum of squares.
fn conditional_least_squares(diffs: &[f64]) -> (f64, f64) {
    let steps = (COEFF_BOUND / CSS_STEP).round() as i32;
    let mut best = (0.0, 0.0);
    let mut best_sse = conditional_sse(diffs, 0.0, 0.0);

    for i in -steps..=steps {
        for j in -steps..=steps {
            let (ar, ma) = (i as f64 * CSS_STEP, j as f64 * CSS_STEP);
            let sse = conditional_sse(diffs, ar, ma);
            let tol = 1e-9 * best_sse.max(1e-12);
            let shrinks = ar * ar + ma * ma < best.0 * best.0 + best.1 * best.1;
            if sse < best_sse - tol || (sse <= best_sse + tol && shrinks) {
                best = (ar, ma);
                best_sse = sse;
            }
        }
    }
    best
}

/// `Σ e_t²` over the residuals after the first, which only sees `w_0`.
fn conditional_sse(diffs: &[f64], ar: f64, ma: f64) -> f64 {
    conditional_residuals(diffs, ar, ma)[1..].iter().map(|e| e * e).sum()
}

/// Order of the stage-1 autoregression: `⌊ln n⌋`, at least 1, and small enough
/// to leave a few rows for the stage-2 regression.
fn long_ar_order(n: usize) -> usize {
    let by_length = (n as f64).ln().floor() as usize;
    by_length.clamp(1, (n / 4).max(1))
}

/// Residuals of an `AR(order)` fit; zero for the first `order` entries.
fn long_ar_innovations(diffs: &[f64], order: usize) -> Option<Vec<f64>> {
    let mut rows = Vec::with_capacity(diffs.len());
    let mut targets = Vec::with_capacity(diffs.len());
    for t in order..diffs.len() {
        rows.push((1..=order).map(|lag| diffs[t - lag]).collect::<Vec<f64>>());
        targets.push(diffs[t]);
    }
    let coeffs = regress(&rows, &targets)?;

    let mut innovations = vec![0.0; diffs.len()];
    for t in order..diffs.len() {
        let fitted: f64 = coeffs
            .iter()
            .enumerate()
            .map(|(j, c)| c * diffs[t - j - 1])
            .sum();
        innovations[t] = diffs[t] - fitted;
    }
    Some(innovations)
}

fn conditional_residuals(diffs: &[f64], ar: f64, ma: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(diffs.len());
    let mut prev_w = 0.0;
    let mut prev_e = 0.0;
    for &w in diffs {
        let e = w - ar * prev_w - ma * prev_e;
        out.push(e);
        prev_w = w;
        prev_e = e;
    }
    out
}

#[cfg(test)]
mod tests {
    use rand::prelude::*;
    use rand::rngs::StdRng;

    use super::*;

    /// Integrated AR(1) with uniform noise.
    fn simulate(phi: f64, n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut level = 100.0;
        let mut w = 0.0;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            w = phi * w + rng.gen_range(-1.0..1.0);
            level += w;
            out.push(level);
        }
        out
    }

    #[test]
    fn short_series_is_rejected() {
        let err = Arima111::fit(&[10.0, 12.0]).unwrap_err();
        assert_eq!(
            err,
            FitError::InsufficientData {
                required: MIN_OBSERVATIONS,
                actual: 2
            }
        );
    }

    #[test]
    fn six_observations_give_a_full_week() {
        let s = [21.0, 26.0, 24.0, 31.0, 29.0, 35.0];
        let fit = Arima111::fit(&s).unwrap();
        assert_eq!(fit.n_obs(), 6);
        assert!(fit.ar().abs() <= COEFF_BOUND);
        assert!(fit.ma().abs() <= COEFF_BOUND);
        assert!(fit.sigma2().is_finite());

        let fc = fit.forecast(7);
        assert_eq!(fc.len(), 7);
        assert!(fc.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn three_observations_are_enough() {
        let fit = Arima111::fit(&[10.0, 14.0, 13.0]).unwrap();
        assert_eq!(fit.forecast(7).len(), 7);
    }

    #[test]
    fn grid_fit_improves_on_zero_and_keeps_it_on_ties() {
        // Steady growth: (0, 0) leaves every residual at 5.
        let w = [5.0; 4];
        let (ar, ma) = conditional_least_squares(&w);
        assert!(conditional_sse(&w, ar, ma) < conditional_sse(&w, 0.0, 0.0));

        // A lone difference is never scored, so nothing beats (0, 0).
        assert_eq!(conditional_least_squares(&[3.0]), (0.0, 0.0));
    }

    #[test]
    fn constant_series_is_rejected() {
        assert_eq!(Arima111::fit(&[5.0; 20]).unwrap_err(), FitError::Constant);
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut s = simulate(0.3, 20, 1);
        s[7] = f64::NAN;
        assert_eq!(Arima111::fit(&s).unwrap_err(), FitError::NonFinite);
    }

    #[test]
    fn recovers_ar_coefficient() {
        let s = simulate(0.6, 600, 11);
        let fit = Arima111::fit(&s).unwrap();
        assert!((fit.ar() - 0.6).abs() < 0.15, "ar={}", fit.ar());
        assert!(fit.ma().abs() < 0.3, "ma={}", fit.ma());
        assert!(fit.sigma2() > 0.0);
        assert_eq!(fit.n_obs(), 600);
    }

    #[test]
    fn trending_series_keeps_rising() {
        let s: Vec<f64> = (0..20).map(|i| 10.0 + 3.0 * i as f64).collect();
        let fit = Arima111::fit(&s).unwrap();
        let fc = fit.forecast(7);
        assert_eq!(fc.len(), 7);
        assert!(fc[0] > s[s.len() - 1]);
        assert!(fc.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn coefficients_stay_bounded() {
        let s = simulate(0.95, 200, 5);
        let fit = Arima111::fit(&s).unwrap();
        assert!(fit.ar().abs() <= COEFF_BOUND);
        assert!(fit.ma().abs() <= COEFF_BOUND);
    }

    #[test]
    fn long_ar_order_leaves_room_for_stage_two() {
        assert_eq!(long_ar_order(7), 1);
        assert_eq!(long_ar_order(100), 4);
        for n in 7..200 {
            let m = long_ar_order(n);
            assert!(n - m - 1 >= 3, "n={n} m={m}");
        }
    }
}
