// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! # stream-summaries
//!
//! Build, merge and query approximate summaries ("sketches") of text data
//! streams from the command line.
//!
//! Two pipelines are provided:
//!
//! - **Frequency**: estimates per-item counts and reports the heaviest items
//!   with deterministic error bounds ([`FrequentItemsSketch`]).
//! - **Quantiles**: estimates the value distribution of a numeric stream and
//!   answers rank/value and histogram queries ([`QuantileSketch`]).
//!
//! Both pipelines share one generic control flow ([`pipeline::run`]): ingest
//! lines from data sources, or load previously serialized sketches, merge when
//! more than one sketch is present, then answer the selected queries against
//! the most recently produced sketch.

pub mod frequency;
pub mod pipeline;
pub mod quantiles;
pub mod report;
pub mod splits;
pub mod traits;

// Re-export core types
pub use frequency::{ErrorType, FrequencyBackend, FrequencyQuery, FrequentItemsSketch};
pub use pipeline::{Invocation, Source};
pub use quantiles::{QuantileSketch, QuantilesBackend, QuantilesQuery};
pub use report::Reporter;
pub use traits::{SketchBackend, SketchError};
