use std::collections::HashMap;
use std::io::Write;

use crate::frequency::sketch::{ErrorType, FrequentItemsSketch, DEFAULT_K};
use crate::report::{group_int, Reporter};
use crate::traits::{SketchBackend, SketchError};

/// Query options for the frequency pipeline. Every selected option runs;
/// they are not mutually exclusive.
#[derive(Debug, Clone, Default)]
pub struct FrequencyQuery {
    /// Report the maximum error offset (`-e`).
    pub max_error: bool,
    /// Report the total weight processed (`-n`).
    pub stream_length: bool,
    /// Report frequent item identities only (`-t`).
    pub top_ids: bool,
    /// Report frequent item identities with estimates (`-T`).
    pub top_ids_with_freq: bool,
    /// Look up estimates for these ids (`-F`).
    pub ids: Vec<String>,
    /// Look up estimates for ids read from a file (`-f`), already resolved
    /// to tokens by the caller.
    pub file_ids: Vec<String>,
}

/// Frequency pipeline backend: builds [`FrequentItemsSketch`] instances from
/// text lines and answers the frequency query options.
#[derive(Debug, Clone)]
pub struct FrequencyBackend {
    k: usize,
    weighted: bool,
    query: FrequencyQuery,
}

impl FrequencyBackend {
    /// Resolves the invocation configuration. `k` defaults to
    /// [`DEFAULT_K`] when absent and must be positive.
    pub fn new(
        k: Option<usize>,
        weighted: bool,
        query: FrequencyQuery,
    ) -> Result<Self, SketchError> {
        let k = k.unwrap_or(DEFAULT_K);
        if k == 0 {
            return Err(SketchError::Config(
                "resolution parameter k must be positive".into(),
            ));
        }
        Ok(Self { k, weighted, query })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Splits a weighted line into `(item, weight)`.
    ///
    /// The line is split once on a run of tab, comma or space characters.
    /// A single token is an item with weight 1; otherwise token 0 must parse
    /// as a positive integer weight and the remainder is the item.
    fn parse_weighted(line: &str) -> Result<(&str, u64), SketchError> {
        let is_separator = |c: char| matches!(c, '\t' | ',' | ' ');
        let mut tokens = line.splitn(2, is_separator);
        let first = tokens.next().unwrap_or("");
        let Some(rest) = tokens.next() else {
            return Ok((first, 1));
        };
        let item = rest.trim_start_matches(is_separator);
        let weight: i64 = first.parse().map_err(|_| SketchError::Format {
            line: line.to_string(),
            reason: "weight is not an integer".into(),
        })?;
        if weight <= 0 {
            return Err(SketchError::Format {
                line: line.to_string(),
                reason: "weight must be a positive integer".into(),
            });
        }
        Ok((item, weight as u64))
    }

    fn write_freq_table<W: Write>(
        &self,
        sketch: &FrequentItemsSketch,
        report: &mut Reporter<W>,
    ) -> Result<(), SketchError> {
        report.header(&["Items", "Frequency"])?;
        for row in sketch.frequent_items(ErrorType::NoFalsePositives) {
            report.row(&[row.item, group_int(row.estimate)])?;
        }
        Ok(())
    }

    /// Looks each requested id up in the frequent-items row set. Ids below
    /// the retention threshold report zero; that is an approximation
    /// artifact, not an error.
    fn write_lookup_table<W: Write>(
        &self,
        ids: &[String],
        sketch: &FrequentItemsSketch,
        report: &mut Reporter<W>,
    ) -> Result<(), SketchError> {
        let retained: HashMap<String, u64> = sketch
            .frequent_items(ErrorType::NoFalsePositives)
            .into_iter()
            .map(|row| (row.item, row.estimate))
            .collect();
        report.header(&["Items", "Frequency"])?;
        for id in ids {
            let estimate = retained.get(id).copied().unwrap_or(0);
            report.row(&[id.clone(), group_int(estimate)])?;
        }
        Ok(())
    }
}

impl SketchBackend for FrequencyBackend {
    type Sketch = FrequentItemsSketch;

    fn build(&self) -> Result<Self::Sketch, SketchError> {
        Ok(FrequentItemsSketch::new(self.k))
    }

    fn update(&self, sketch: &mut Self::Sketch, line: &str) -> Result<(), SketchError> {
        if line.is_empty() {
            return Ok(());
        }
        if self.weighted {
            let (item, weight) = Self::parse_weighted(line)?;
            sketch.update(item, weight);
        } else {
            sketch.update(line, 1);
        }
        Ok(())
    }

    fn merge(&self, parts: &[Self::Sketch]) -> Result<Self::Sketch, SketchError> {
        Ok(FrequentItemsSketch::merged(self.k, parts))
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

        if self.query.max_error {
            option_chosen = true;
            report.line(&format!("Max Error Offset: {}", sketch.max_error()))?;
        }

        if self.query.stream_length {
            option_chosen = true;
            report.line(&format!("Stream Length   : {}", sketch.stream_weight()))?;
        }

        if self.query.top_ids {
            option_chosen = true;
            report.header(&["Items"])?;
            for row in sketch.frequent_items(ErrorType::NoFalsePositives) {
                report.line(&row.item)?;
            }
        }

        if self.query.top_ids_with_freq {
            option_chosen = true;
            self.write_freq_table(sketch, report)?;
        }

        if !self.query.ids.is_empty() {
            option_chosen = true;
            self.write_lookup_table(&self.query.ids, sketch, report)?;
        }

        if !self.query.file_ids.is_empty() {
            option_chosen = true;
            self.write_lookup_table(&self.query.file_ids, sketch, report)?;
        }

        if !option_chosen {
            self.write_freq_table(sketch, report)?;
        }
        Ok(())
    }
}
