// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Generic pipeline driver shared by every sketch kind.
//!
//! One invocation acquires sketches (built from data sources, or loaded from
//! serialized blobs), merges when more than one is present, optionally saves
//! the result, then answers the selected queries. All operations act on an
//! ordered working list; the most recently produced sketch is the one
//! queried.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::report::Reporter;
use crate::traits::{SketchBackend, SketchError};

/// A named line-oriented text input.
#[derive(Debug, Clone)]
pub enum Source {
    Stdin,
    File(PathBuf),
}

impl Source {
    fn open(&self) -> Result<Box<dyn BufRead>, SketchError> {
        match self {
            Source::Stdin => Ok(Box::new(BufReader::new(io::stdin()))),
            Source::File(path) => {
                let file = File::open(path).map_err(|e| SketchError::Io {
                    path: path.display().to_string(),
                    source: e,
                })?;
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Stdin => write!(f, "stdin"),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Everything one invocation needs besides the backend: where the input
/// comes from and where the resulting sketch goes.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// Text sources, one fresh sketch built and updated per source.
    pub data_sources: Vec<Source>,
    /// Previously serialized sketches, loaded directly with no update pass.
    pub sketch_paths: Vec<PathBuf>,
    /// When set, the final sketch is serialized here after build/merge.
    pub save_path: Option<PathBuf>,
}

/// Runs one invocation end to end, writing query results to `out`.
///
/// Sketches accumulate in argument order: data sources first, then
/// serialized sketches. When the working list holds more than one sketch
/// they are merged with the backend's resolved resolution and the merged
/// instance is appended; queries always address the last list entry. An
/// empty working list makes the query stage a no-op.
///
/// Any parse or read failure aborts the invocation; there is no
/// partial-result recovery.
pub fn run<B: SketchBackend, W: Write>(
    backend: &B,
    invocation: &Invocation,
    out: W,
) -> Result<(), SketchError> {
    let mut sketches: Vec<B::Sketch> = Vec::new();

    for source in &invocation.data_sources {
        tracing::debug!(source = %source, "building sketch from data");
        let reader = source.open()?;
        let mut sketch = backend.build()?;
        update_from_lines(backend, &mut sketch, reader, &source.to_string())?;
        sketches.push(sketch);
    }

    for path in &invocation.sketch_paths {
        tracing::debug!(path = %path.display(), "loading serialized sketch");
        let bytes = fs::read(path).map_err(|e| SketchError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        sketches.push(backend.deserialize(&bytes)?);
    }

    if sketches.len() > 1 {
        tracing::debug!(count = sketches.len(), "merging sketches");
        let merged = backend.merge(&sketches)?;
        sketches.push(merged);
    }

    let Some(current) = sketches.last() else {
        return Ok(());
    };

    if let Some(path) = &invocation.save_path {
        let bytes = backend.serialize(current)?;
        fs::write(path, bytes).map_err(|e| SketchError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), "wrote serialized sketch");
    }

    let mut report = Reporter::new(out);
    backend.query(current, &mut report)
}

/// Streams lines from `reader` into the sketch. The first failing line
/// aborts the loop; the error names the source and carries the line.
pub fn update_from_lines<B: SketchBackend>(
    backend: &B,
    sketch: &mut B::Sketch,
    reader: impl BufRead,
    source_name: &str,
) -> Result<(), SketchError> {
    for line in reader.lines() {
        let line = line.map_err(|e| SketchError::Io {
            path: source_name.to_string(),
            source: e,
        })?;
        backend.update(sketch, &line).map_err(|e| {
            tracing::error!(source = source_name, "update failed: {}", e);
            SketchError::Read {
                source_name: source_name.to_string(),
                cause: Box::new(e),
            }
        })?;
    }
    Ok(())
}

/// Reads a bulk-query file into trimmed, non-empty tokens.
pub fn read_query_tokens(path: &Path) -> Result<Vec<String>, SketchError> {
    let content = fs::read_to_string(path).map_err(|e| SketchError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(content.split_whitespace().map(str::to_string).collect())
}

/// Reads a bulk-query file into doubles; a token that does not parse is a
/// format error naming the token.
pub fn read_query_doubles(path: &Path) -> Result<Vec<f64>, SketchError> {
    read_query_tokens(path)?
        .into_iter()
        .map(|token| {
            token.parse().map_err(|_| SketchError::Format {
                line: token,
                reason: "value is not a number".into(),
            })
        })
        .collect()
}
