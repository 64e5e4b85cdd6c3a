// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Query result formatting.
//!
//! All query output is tab-separated two-column tables: a blank line, a
//! one-line header, then one row per result. Counts are printed with
//! thousands separators; histogram boundaries as grouped floating point.

use std::io::{self, Write};

/// Writes query results as tab-separated rows to an output stream.
pub struct Reporter<W: Write> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Writes a table header preceded by a blank separator line.
    pub fn header(&mut self, columns: &[&str]) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{}", columns.join("\t"))
    }

    /// Writes one tab-joined result row.
    pub fn row(&mut self, cells: &[String]) -> io::Result<()> {
        writeln!(self.out, "{}", cells.join("\t"))
    }

    /// Writes a single free-form line (labelled scalars, banners).
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Formats an integer count with thousands separators: `1234567` → `1,234,567`.
pub fn group_int(value: u64) -> String {
    group_digits(&value.to_string())
}

/// Formats a float with six decimal places and a grouped integer part:
/// `12345.5` → `12,345.500000`. Non-finite values pass through ungrouped.
pub fn group_float(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let formatted = format!("{:.6}", value);
    let (int_part, frac_part) = formatted
        .split_once('.')
        .expect("fixed-precision format always contains a decimal point");
    match int_part.strip_prefix('-') {
        Some(digits) => format!("-{}.{}", group_digits(digits), frac_part),
        None => format!("{}.{}", group_digits(int_part), frac_part),
    }
}

fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
