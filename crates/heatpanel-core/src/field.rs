//! Closed-form solution of the heat equation with a single sine mode.
//!
//! For a rod (or square plate) of side `L` with zero boundary values and
//! initial profile `(2M/L)·sin(πx/L)`, the temperature at time `t` is the
//! initial profile scaled by `exp(−π²·D·t/L²)`. Nothing is integrated; every
//! call evaluates the formula directly, so any two calls with the same inputs
//! produce identical samples.

use std::f64::consts::PI;

use crate::params::{Mode, SimulationParameters};

/// A sampled field, produced fresh for every frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSample {
    /// One value per display column, spanning `[0, L]`.
    OneD(Vec<f64>),
    /// Row-major `width × height` grid spanning `[0, L] × [0, L]`.
    TwoD {
        width: usize,
        height: usize,
        values: Vec<f64>,
    },
}

impl FieldSample {
    pub fn len(&self) -> usize {
        match self {
            FieldSample::OneD(v) => v.len(),
            FieldSample::TwoD { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> &[f64] {
        match self {
            FieldSample::OneD(v) => v,
            FieldSample::TwoD { values, .. } => values,
        }
    }
}

/// `|2M/L|`, the largest magnitude any sample can reach.
pub fn peak_amplitude(params: &SimulationParameters) -> f64 {
    (2.0 * params.amplitude / params.length).abs()
}

/// Temporal decay factor `exp(−π²·D·t/L²)`.
///
/// `D = 0` yields exactly 1. Negative `t` is clamped to 0.
pub fn decay(params: &SimulationParameters, t: f64) -> f64 {
    let t = t.max(0.0);
    if params.diffusivity == 0.0 || t == 0.0 {
        return 1.0;
    }
    let l2 = params.length * params.length;
    (-PI * PI * params.diffusivity * t / l2).exp()
}

/// Grid coordinates `x_i = i·L/(n−1)` for `i = 0..n`.
fn grid(length: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 { length / (n - 1) as f64 } else { 0.0 };
    (0..n).map(move |i| i as f64 * step)
}

/// `sin(πx/L)` for each grid coordinate.
fn sine_profile(length: f64, n: usize) -> Vec<f64> {
    grid(length, n).map(|x| (PI * x / length).sin()).collect()
}

/// Sample the 1D field at `n` evenly spaced points.
pub fn evaluate_1d(params: &SimulationParameters, n: usize, t: f64) -> Vec<f64> {
    let scale = 2.0 * params.amplitude / params.length * decay(params, t);
    sine_profile(params.length, n)
        .into_iter()
        .map(|s| scale * s)
        .collect()
}

/// Sample the 2D field on a `width × height` grid (row-major, `y` outer).
pub fn evaluate_2d(params: &SimulationParameters, width: usize, height: usize, t: f64) -> Vec<f64> {
    let scale = 2.0 * params.amplitude / params.length * decay(params, t);
    let sx = sine_profile(params.length, width);
    let sy = sine_profile(params.length, height);

    let mut values = Vec::with_capacity(width * height);
    for y in &sy {
        values.extend(sx.iter().map(|x| scale * x * y));
    }
    values
}

/// Evaluate the field for the parameter mode.
///
/// `columns` is the 1D sample count (the display width); `grid_size` is the
/// side of the square 2D grid.
pub fn evaluate(params: &SimulationParameters, columns: usize, grid_size: usize, t: f64) -> FieldSample {
    match params.mode {
        Mode::OneD => FieldSample::OneD(evaluate_1d(params, columns, t)),
        Mode::TwoD => FieldSample::TwoD {
            width: grid_size,
            height: grid_size,
            values: evaluate_2d(params, grid_size, grid_size, t),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(mode: Mode, length: f64, amplitude: f64, diffusivity: f64) -> SimulationParameters {
        SimulationParameters {
            mode,
            length,
            amplitude,
            diffusivity,
        }
    }

    #[test]
    fn test_1d_length_matches_columns() {
        let p = SimulationParameters::default();
        assert_eq!(evaluate_1d(&p, 240, 0.0).len(), 240);
        assert_eq!(evaluate_1d(&p, 1, 0.0).len(), 1);
        assert!(evaluate_1d(&p, 0, 0.0).is_empty());
    }

    #[test]
    fn test_1d_amplitude_bound() {
        for &(l, m, d) in &[(1.0, 1.0, 0.1), (0.3, -4.0, 2.0), (50.0, 7.5, 0.001)] {
            let p = params(Mode::OneD, l, m, d);
            let bound = peak_amplitude(&p);
            for &t in &[0.0, 0.01, 0.5, 3.0, 100.0] {
                for s in evaluate_1d(&p, 240, t) {
                    assert!(
                        s.abs() <= bound * (1.0 + 1e-12),
                        "sample {s} exceeds bound {bound} at t={t}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_1d_at_t0_is_initial_profile() {
        let p = params(Mode::OneD, 2.0, 1.5, 0.4);
        let n = 121;
        let samples = evaluate_1d(&p, n, 0.0);
        for (i, s) in samples.iter().enumerate() {
            let x = i as f64 * (p.length / (n - 1) as f64);
            let expected = (2.0 * p.amplitude / p.length) * (PI * x / p.length).sin();
            assert_eq!(*s, expected, "sample {i}");
        }
    }

    #[test]
    fn test_zero_diffusivity_never_decays() {
        let p = params(Mode::OneD, 1.0, 1.0, 0.0);
        assert_eq!(evaluate_1d(&p, 64, 0.5), evaluate_1d(&p, 64, 42.0));
        let p2 = params(Mode::TwoD, 1.0, 1.0, 0.0);
        assert_eq!(evaluate_2d(&p2, 9, 9, 1.0), evaluate_2d(&p2, 9, 9, 7.0));
    }

    #[test]
    fn test_decay_monotonic() {
        let p = params(Mode::OneD, 1.0, 1.0, 0.1);
        assert_eq!(decay(&p, 0.0), 1.0);
        assert!(decay(&p, 1.0) < 1.0);
        assert!(decay(&p, 2.0) < decay(&p, 1.0));
        assert_eq!(decay(&p, -5.0), 1.0);
    }

    #[test]
    fn test_1d_boundaries_near_zero() {
        let p = SimulationParameters::default();
        let s = evaluate_1d(&p, 240, 0.0);
        assert!(s[0].abs() < 1e-12);
        assert!(s[239].abs() < 1e-12);
    }

    #[test]
    fn test_2d_center_is_max() {
        let p = params(Mode::TwoD, 1.0, 1.0, 0.1);
        let n = 49;
        let values = evaluate_2d(&p, n, n, 0.0);
        let center = values[(n / 2) * n + n / 2];
        let max = values.iter().cloned().fold(f64::MIN, f64::max);
        assert_eq!(center, max);
        assert!((center - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_dispatches_on_mode() {
        let p1 = params(Mode::OneD, 1.0, 1.0, 0.1);
        assert!(matches!(evaluate(&p1, 100, 20, 0.0), FieldSample::OneD(v) if v.len() == 100));
        let p2 = params(Mode::TwoD, 1.0, 1.0, 0.1);
        match evaluate(&p2, 100, 20, 0.0) {
            FieldSample::TwoD {
                width,
                height,
                values,
            } => {
                assert_eq!((width, height), (20, 20));
                assert_eq!(values.len(), 400);
            }
            other => panic!("expected 2D sample, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_amplitude_inverts_sign() {
        let p = params(Mode::OneD, 1.0, -1.0, 0.1);
        let s = evaluate_1d(&p, 11, 0.0);
        assert!(s[5] < 0.0);
    }
}
