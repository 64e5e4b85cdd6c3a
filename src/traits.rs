// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use std::io::Write;

use thiserror::Error;

use crate::report::Reporter;

/// Error type for sketch pipeline operations
#[derive(Debug, Error)]
pub enum SketchError {
    /// A line that could not be parsed into an update. The driver wraps this
    /// into [`SketchError::Read`] to name the originating source.
    #[error("malformed input line {line:?}: {reason}")]
    Format { line: String, reason: String },
    #[error("read error in {source_name}: {cause}")]
    Read {
        source_name: String,
        #[source]
        cause: Box<SketchError>,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("serialize error: {0}")]
    Serialize(String),
    #[error("deserialize error: {0}")]
    Deserialize(String),
    #[error("merge error: {0}")]
    Merge(String),
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

/// Lifecycle contract shared by every sketch pipeline.
///
/// One implementation exists per sketch kind (frequency, quantiles); the
/// subcommand selects the implementation once at invocation start, after
/// which the generic driver in [`crate::pipeline`] does the rest.
///
/// A backend owns the resolved invocation configuration (resolution
/// parameter, parse mode, selected queries). The sketch instances it builds
/// are plain values owned by the driver's working list.
pub trait SketchBackend {
    /// The sketch type this backend drives.
    type Sketch;

    /// Allocates a fresh, empty sketch using the resolved configuration.
    fn build(&self) -> Result<Self::Sketch, SketchError>;

    /// Folds one input line into the sketch.
    ///
    /// Line-format policy is backend-specific: the frequency backend skips
    /// blank lines and understands optional weights, the quantiles backend
    /// requires every line to parse as a number.
    fn update(&self, sketch: &mut Self::Sketch, line: &str) -> Result<(), SketchError>;

    /// Combines all given sketches into one new instance built with the
    /// resolved resolution parameter. Merge order must not affect query
    /// results beyond the algorithm's stated error bounds.
    fn merge(&self, parts: &[Self::Sketch]) -> Result<Self::Sketch, SketchError>;

    /// Encodes the sketch as an opaque byte blob.
    fn serialize(&self, sketch: &Self::Sketch) -> Result<Vec<u8>, SketchError>;

    /// Reconstructs a sketch from a blob produced by [`Self::serialize`].
    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Sketch, SketchError>;

    /// Answers every selected query option against the sketch, writing
    /// tables through the reporter. Options are checked independently; more
    /// than one may produce output in a single invocation.
    fn query<W: Write>(
        &self,
        sketch: &Self::Sketch,
        report: &mut Reporter<W>,
    ) -> Result<(), SketchError>;
}
