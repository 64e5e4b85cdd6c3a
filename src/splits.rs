// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Histogram split-point computation.
//!
//! A histogram with `b` bars needs `b - 1` interior boundaries between the
//! observed minimum and maximum. The linear variant spaces them evenly; the
//! logarithmic variant spaces them evenly in log10 space and exponentiates
//! back, so bucket widths grow geometrically.

use crate::traits::SketchError;

/// Returns `n` boundaries evenly spaced on the open interval `(min, max)`:
/// `min + delta * (i + 1)` with `delta = (max - min) / (n + 1)`.
///
/// `n = 0` yields an empty sequence. `min == max` yields `n` identical
/// boundaries rather than an error.
pub fn even_splits(min: f64, max: f64, n: usize) -> Vec<f64> {
    let delta = (max - min) / (n as f64 + 1.0);
    (0..n).map(|i| min + delta * (i as f64 + 1.0)).collect()
}

/// Returns `n` boundaries evenly spaced in log10 space over `(min, max)`,
/// exponentiated back with base 10.
///
/// A minimum of exactly zero is replaced by `zero_sub` before taking
/// logarithms. A negative (substituted) minimum is a configuration error:
/// log histograms are undefined for negative ranges.
pub fn log_splits(min: f64, max: f64, n: usize, zero_sub: f64) -> Result<Vec<f64>, SketchError> {
    let min = if min == 0.0 { zero_sub } else { min };
    if min < 0.0 {
        return Err(SketchError::Config(
            "log histogram cannot be produced from a stream with negative values".into(),
        ));
    }
    Ok(even_splits(min.log10(), max.log10(), n)
        .into_iter()
        .map(|s| 10f64.powf(s))
        .collect())
}
