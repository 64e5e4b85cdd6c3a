use std::cell::RefCell;

use serde::{Deserialize, Serialize};

/// Default resolution (compression) when no `-k` is given.
pub const DEFAULT_K: usize = 128;

/// A cluster of nearby values: weighted mean plus member count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Centroid {
    mean: f64,
    weight: f64,
}

impl Centroid {
    fn absorb(&mut self, mean: f64, weight: f64) {
        let total = self.weight + weight;
        self.mean = (self.mean * self.weight + mean * weight) / total;
        self.weight = total;
    }
}

/// Interior state kept behind a `RefCell` so queries on `&self` can fold the
/// pending buffer into centroids first.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Inner {
    centroids: Vec<Centroid>,
    buffer: Vec<f64>,
}

/// Quantile-estimating sketch over a stream of doubles, t-digest centroid
/// family.
///
/// Observations accumulate in a small buffer and are periodically merged
/// into a bounded set of centroids. The resolution parameter `k` is the
/// compression: more centroids, better accuracy, more memory.
///
/// Queries model the distribution as a piecewise linear CDF through each
/// centroid's midpoint rank, anchored at the exact observed minimum and
/// maximum, which makes `quantile` and `rank` mutually consistent.
///
/// The sketch is `Send` but not `Sync`; queries compress lazily through a
/// `RefCell`.
///
/// # Example
///
/// ```
/// use stream_summaries::QuantileSketch;
///
/// let mut sketch = QuantileSketch::new(128);
/// for i in 0..1000 {
///     sketch.update(i as f64);
/// }
///
/// let median = sketch.quantile(0.5).unwrap();
/// assert!(median > 400.0 && median < 600.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantileSketch {
    compression: f64,
    inner: RefCell<Inner>,
    count: u64,
    min: f64,
    max: f64,
}

impl Default for QuantileSketch {
    fn default() -> Self {
        Self::new(DEFAULT_K)
    }
}

impl QuantileSketch {
    /// Creates an empty sketch with resolution `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is zero. Callers resolve and validate `k` before
    /// construction.
    pub fn new(k: usize) -> Self {
        assert!(k > 0, "resolution parameter k must be positive, got {}", k);
        let compression = k as f64;
        Self {
            compression,
            inner: RefCell::new(Inner {
                centroids: Vec::new(),
                buffer: Vec::with_capacity(2 * k),
            }),
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Folds one observation into the sketch. NaN is ignored.
    pub fn update(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        let inner = self.inner.get_mut();
        inner.buffer.push(value);
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        if inner.buffer.len() >= 2 * self.compression as usize {
            Self::fold_buffer(inner, self.compression);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Smallest observed value, `None` when empty.
    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    /// Largest observed value, `None` when empty.
    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    pub fn k(&self) -> usize {
        self.compression as usize
    }

    /// Estimated value at `rank` in `[0, 1]`; `None` when empty.
    pub fn quantile(&self, rank: f64) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        self.ensure_compressed();
        let inner = self.inner.borrow();
        let q = rank.clamp(0.0, 1.0);
        if q <= 0.0 {
            return Some(self.min);
        }
        if q >= 1.0 {
            return Some(self.max);
        }
        if inner.centroids.is_empty() {
            return Some(self.min + (self.max - self.min) * q);
        }

        let target = q * self.count as f64;
        let mut anchor_rank = 0.0;
        let mut anchor_value = self.min;
        let mut cumulative = 0.0;

        for centroid in &inner.centroids {
            let mid_rank = cumulative + centroid.weight / 2.0;
            if target < mid_rank {
                return Some(interpolate(
                    anchor_rank,
                    anchor_value,
                    mid_rank,
                    centroid.mean,
                    target,
                ));
            }
            cumulative += centroid.weight;
            anchor_rank = mid_rank;
            anchor_value = centroid.mean;
        }

        Some(interpolate(
            anchor_rank,
            anchor_value,
            self.count as f64,
            self.max,
            target,
        ))
    }

    /// Estimated cumulative rank of `value` in `[0, 1]`; 0 when empty.
    pub fn rank(&self, value: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        // >= max first, so a degenerate min == max stream ranks its one
        // value at 1.0
        if value >= self.max {
            return 1.0;
        }
        if value <= self.min {
            return 0.0;
        }
        self.ensure_compressed();
        let inner = self.inner.borrow();
        if inner.centroids.is_empty() {
            return (value - self.min) / (self.max - self.min);
        }

        let n = self.count as f64;
        let mut anchor_rank = 0.0;
        let mut anchor_value = self.min;
        let mut cumulative = 0.0;

        for centroid in &inner.centroids {
            let mid_rank = cumulative + centroid.weight / 2.0;
            if value < centroid.mean {
                return interpolate(anchor_value, anchor_rank, centroid.mean, mid_rank, value) / n;
            }
            cumulative += centroid.weight;
            anchor_rank = mid_rank;
            anchor_value = centroid.mean;
        }

        interpolate(anchor_value, anchor_rank, self.max, n, value) / n
    }

    /// Probability mass per histogram bin for the given split points: one
    /// mass for each of the `len + 1` intervals they induce. Masses sum to
    /// 1 for a non-empty sketch.
    pub fn pmf(&self, split_points: &[f64]) -> Vec<f64> {
        let mut masses = Vec::with_capacity(split_points.len() + 1);
        let mut previous = 0.0;
        for split in split_points {
            let r = self.rank(*split);
            masses.push((r - previous).max(0.0));
            previous = r;
        }
        masses.push(if self.count == 0 {
            0.0
        } else {
            (1.0 - previous).max(0.0)
        });
        masses
    }

    /// Combines sketches into one of resolution `max_k` approximating the
    /// full combined stream: all centroids are pooled and recompressed.
    pub fn merged(max_k: usize, parts: &[Self]) -> Self {
        let compression = max_k as f64;
        let mut pooled: Vec<Centroid> = Vec::new();
        let mut count = 0u64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for part in parts {
            part.ensure_compressed();
            let inner = part.inner.borrow();
            pooled.extend(inner.centroids.iter().cloned());
            if part.count > 0 {
                min = min.min(part.min);
                max = max.max(part.max);
            }
            count += part.count;
        }

        pooled.sort_by(|a, b| a.mean.total_cmp(&b.mean));
        let centroids = Self::compress_sorted(pooled, compression);

        Self {
            compression,
            inner: RefCell::new(Inner {
                centroids,
                buffer: Vec::new(),
            }),
            count,
            min,
            max,
        }
    }

    fn ensure_compressed(&self) {
        if self.inner.borrow().buffer.is_empty() {
            return;
        }
        let mut inner = self.inner.borrow_mut();
        Self::fold_buffer(&mut inner, self.compression);
    }

    /// Drains the buffer into the centroid set and recompresses.
    fn fold_buffer(inner: &mut Inner, compression: f64) {
        if inner.buffer.is_empty() {
            return;
        }
        let mut pooled: Vec<Centroid> = inner
            .buffer
            .drain(..)
            .map(|v| Centroid {
                mean: v,
                weight: 1.0,
            })
            .collect();
        pooled.append(&mut inner.centroids);
        pooled.sort_by(|a, b| a.mean.total_cmp(&b.mean));
        inner.centroids = Self::compress_sorted(pooled, compression);
    }

    /// Merges mean-sorted centroids while the scale function allows,
    /// bounding the centroid count by the compression parameter.
    fn compress_sorted(sorted: Vec<Centroid>, compression: f64) -> Vec<Centroid> {
        let Some(first) = sorted.first().cloned() else {
            return Vec::new();
        };
        let total: f64 = sorted.iter().map(|c| c.weight).sum();
        let mut out: Vec<Centroid> = Vec::new();
        let mut current = first;
        let mut weight_before = 0.0;

        for centroid in sorted.into_iter().skip(1) {
            let q0 = weight_before / total;
            let q1 = (weight_before + current.weight + centroid.weight) / total;
            if Self::scale(q1, compression) - Self::scale(q0, compression) <= 1.0 {
                current.absorb(centroid.mean, centroid.weight);
            } else {
                weight_before += current.weight;
                out.push(current);
                current = centroid;
            }
        }
        out.push(current);
        out
    }

    /// Arcsin scale function: keeps centroids small near the tails.
    #[inline]
    fn scale(q: f64, compression: f64) -> f64 {
        let x = (2.0 * q - 1.0).clamp(-1.0, 1.0);
        compression * (x.asin() / std::f64::consts::PI + 0.5)
    }
}

/// Linear interpolation through `(x0, y0)` and `(x1, y1)`, collapsing to
/// `y0` when the segment has no extent.
fn interpolate(x0: f64, y0: f64, x1: f64, y1: f64, x: f64) -> f64 {
    let run = x1 - x0;
    if run <= 0.0 {
        return y0;
    }
    y0 + (x - x0) / run * (y1 - y0)
}
