use std::io::Write;

use crate::quantiles::sketch::{QuantileSketch, DEFAULT_K};
use crate::report::{group_float, group_int, Reporter};
use crate::splits::{even_splits, log_splits};
use crate::traits::{SketchBackend, SketchError};

/// Default number of histogram bars when no `-b` is given.
pub const DEFAULT_NUM_BINS: usize = 10;

/// Query options for the quantiles pipeline. Every selected option runs;
/// they are not mutually exclusive.
#[derive(Debug, Clone)]
pub struct QuantilesQuery {
    /// Linear histogram (`-h`).
    pub histogram: bool,
    /// Log-scale histogram with the given zero substitute (`-l`).
    pub log_histogram: Option<f64>,
    /// Number of histogram bars (`-b`).
    pub bins: usize,
    /// Value-at-rank lookups (`-r`).
    pub ranks: Vec<f64>,
    /// Value-at-rank lookups read from a file (`-R`), already resolved.
    pub file_ranks: Vec<f64>,
    /// Rank-at-value lookups (`-v`); sorted before querying.
    pub values: Vec<f64>,
    /// Rank-at-value lookups read from a file (`-V`), already resolved;
    /// queried in file order, unsorted.
    pub file_values: Vec<f64>,
}

impl Default for QuantilesQuery {
    fn default() -> Self {
        Self {
            histogram: false,
            log_histogram: None,
            bins: DEFAULT_NUM_BINS,
            ranks: Vec::new(),
            file_ranks: Vec::new(),
            values: Vec::new(),
            file_values: Vec::new(),
        }
    }
}

/// Quantiles pipeline backend: builds [`QuantileSketch`] instances from
/// numeric lines and answers histogram and rank/value query options.
#[derive(Debug, Clone)]
pub struct QuantilesBackend {
    k: usize,
    query: QuantilesQuery,
}

impl QuantilesBackend {
    /// Resolves the invocation configuration. `k` defaults to
    /// [`DEFAULT_K`] when absent and must be positive.
    pub fn new(k: Option<usize>, query: QuantilesQuery) -> Result<Self, SketchError> {
        let k = k.unwrap_or(DEFAULT_K);
        if k == 0 {
            return Err(SketchError::Config(
                "resolution parameter k must be positive".into(),
            ));
        }
        Ok(Self { k, query })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Writes a histogram table: the observed minimum with the mass below
    /// the first boundary, then each boundary with the mass of the bin it
    /// opens. Counts are mass times stream length, truncated.
    fn write_histogram<W: Write>(
        &self,
        sketch: &QuantileSketch,
        zero_sub: Option<f64>,
        report: &mut Reporter<W>,
    ) -> Result<(), SketchError> {
        let (Some(min), Some(max)) = (sketch.min(), sketch.max()) else {
            return Ok(());
        };
        let split_points = self.query.bins.saturating_sub(1);
        let splits = match zero_sub {
            None => even_splits(min, max, split_points),
            Some(zero_sub) => log_splits(min, max, split_points, zero_sub)?,
        };
        let masses = sketch.pmf(&splits);
        let n = sketch.count() as f64;

        report.header(&["Value", "Freq"])?;
        report.row(&[group_float(min), group_int((masses[0] * n) as u64)])?;
        for (split, mass) in splits.iter().zip(masses.iter().skip(1)) {
            report.row(&[group_float(*split), group_int((mass * n) as u64)])?;
        }
        Ok(())
    }

    fn write_rank_table<W: Write>(
        &self,
        ranks: &[f64],
        sketch: &QuantileSketch,
        report: &mut Reporter<W>,
    ) -> Result<(), SketchError> {
        report.header(&["Rank", "Value"])?;
        for rank in ranks {
            let Some(value) = sketch.quantile(*rank) else {
                continue;
            };
            report.row(&[rank.to_string(), format!("{:.2}", value)])?;
        }
        Ok(())
    }

    fn write_value_table<W: Write>(
        &self,
        values: &[f64],
        sketch: &QuantileSketch,
        report: &mut Reporter<W>,
    ) -> Result<(), SketchError> {
        report.header(&["Value", "Rank"])?;
        for value in values {
            report.row(&[format!("{:.2}", value), format!("{:.6}", sketch.rank(*value))])?;
        }
        Ok(())
    }

    fn write_deciles<W: Write>(
        &self,
        sketch: &QuantileSketch,
        report: &mut Reporter<W>,
    ) -> Result<(), SketchError> {
        report.line("Print deciles as default:")?;
        report.header(&["Rank", "Value"])?;
        for i in 0..=10 {
            let rank = i as f64 / 10.0;
            let Some(value) = sketch.quantile(rank) else {
                continue;
            };
            report.row(&[format!("{:.1}", rank), value.to_string()])?;
        }
        Ok(())
    }
}

impl SketchBackend for QuantilesBackend {
    type Sketch = QuantileSketch;

    fn build(&self) -> Result<Self::Sketch, SketchError> {
        Ok(QuantileSketch::new(self.k))
    }

    fn update(&self, sketch: &mut Self::Sketch, line: &str) -> Result<(), SketchError> {
        let value: f64 = line.trim().parse().map_err(|_| SketchError::Format {
            line: line.to_string(),
            reason: "value is not a number".into(),
        })?;
        sketch.update(value);
        Ok(())
    }

    fn merge(&self, parts: &[Self::Sketch]) -> Result<Self::Sketch, SketchError> {
        Ok(QuantileSketch::merged(self.k, parts))
    }

    fn serialize(&self, sketch: &Self::Sketch) -> Result<Vec<u8>, SketchError> {
        bincode::serialize(sketch).map_err(|e| SketchError::Serialize(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Sketch, SketchError> {
        bincode::deserialize(bytes).map_err(|e| SketchError::Deserialize(e.to_string()))
    }

    fn query<W: Write>(
        &self,
        sketch: &Self::Sketch,
        report: &mut Reporter<W>,
    ) -> Result<(), SketchError> {
        let mut option_chosen = false;

        if self.query.histogram {
            option_chosen = true;
            self.write_histogram(sketch, None, report)?;
        }

        if let Some(zero_sub) = self.query.log_histogram {
            option_chosen = true;
            self.write_histogram(sketch, Some(zero_sub), report)?;
        }

        if !self.query.ranks.is_empty() {
            option_chosen = true;
            self.write_rank_table(&self.query.ranks, sketch, report)?;
        }

        if !self.query.file_ranks.is_empty() {
            option_chosen = true;
            self.write_rank_table(&self.query.file_ranks, sketch, report)?;
        }

        if !self.query.values.is_empty() {
            option_chosen = true;
            // The list variant queries in sorted order; the file variant
            // below intentionally preserves file order.
            let mut sorted = self.query.values.clone();
            sorted.sort_by(|a, b| a.total_cmp(b));
            self.write_value_table(&sorted, sketch, report)?;
        }

        if !self.query.file_values.is_empty() {
            option_chosen = true;
            self.write_value_table(&self.query.file_values, sketch, report)?;
        }

        if !option_chosen {
            self.write_deciles(sketch, report)?;
        }
        Ok(())
    }
}
