// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stream_summaries::pipeline::{self, Invocation, Source};
use stream_summaries::{FrequencyBackend, FrequencyQuery, QuantilesBackend, QuantilesQuery};

#[derive(Debug, Parser)]
#[command(
    name = "sk",
    version,
    about = "Build, merge and query data-stream sketches"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Frequent-items sketch over text items
    Freq(FreqArgs),
    /// Quantiles sketch over numeric values
    Quant(QuantArgs),
}

// The short help flag is disabled on both subcommands so single-letter
// query flags stay available (`-h` is the histogram query on `quant`);
// `--help` works everywhere.
#[derive(Debug, Args)]
#[command(disable_help_flag = true)]
struct FreqArgs {
    /// Sketch resolution parameter
    #[arg(short, value_name = "INT")]
    k: Option<usize>,

    /// Build a sketch from each data FILE; stdin when no sources are given
    #[arg(short = 'd', long = "data", value_name = "FILE", num_args = 1..)]
    data: Vec<PathBuf>,

    /// Load previously serialized sketches from FILEs
    #[arg(short = 's', long = "sketch", value_name = "FILE", num_args = 1..)]
    sketch: Vec<PathBuf>,

    /// Write the resulting sketch to FILE after build/merge
    #[arg(short = 'o', long = "out", value_name = "FILE")]
    out: Option<PathBuf>,

    /// Each line is two tokens separated by a tab, comma, or spaces: an
    /// integer weight then the item. A single token is an item with weight 1
    #[arg(short = 'w', long = "weights")]
    weights: bool,

    /// Query just identities for the most frequent items
    #[arg(short = 't', long = "topk-ids")]
    topk_ids: bool,

    /// Query identities and estimated frequencies for the most frequent items
    #[arg(short = 'T', long = "topk-ids-with-freq")]
    topk_ids_with_freq: bool,

    /// Query the maximum error offset
    #[arg(short = 'e', long = "error-offset")]
    error_offset: bool,

    /// Query the stream length
    #[arg(short = 'n', long = "stream-length")]
    stream_length: bool,

    /// Query frequencies for items with the given IDs
    #[arg(short = 'F', long = "id2freq", value_name = "ID", num_args = 1..)]
    ids: Vec<String>,

    /// Query frequencies for items with IDs listed in FILE
    #[arg(short = 'f', long = "id2freq-file", value_name = "FILE")]
    ids_file: Option<PathBuf>,

    #[arg(long, action = ArgAction::Help, help = "Print help")]
    help: Option<bool>,
}

#[derive(Debug, Args)]
#[command(disable_help_flag = true)]
struct QuantArgs {
    /// Sketch resolution parameter
    #[arg(short, value_name = "INT")]
    k: Option<usize>,

    /// Build a sketch from each data FILE; stdin when no sources are given
    #[arg(short = 'd', long = "data", value_name = "FILE", num_args = 1..)]
    data: Vec<PathBuf>,

    /// Load previously serialized sketches from FILEs
    #[arg(short = 's', long = "sketch", value_name = "FILE", num_args = 1..)]
    sketch: Vec<PathBuf>,

    /// Write the resulting sketch to FILE after build/merge
    #[arg(short = 'o', long = "out", value_name = "FILE")]
    out: Option<PathBuf>,

    /// Query histogram
    #[arg(short = 'h', long = "histogram")]
    histogram: bool,

    /// Query log-scale histogram, substituting ZERO_SUB for a zero minimum
    #[arg(short = 'l', long = "log-histogram", value_name = "ZERO_SUB")]
    log_histogram: Option<f64>,

    /// Number of bars in the histogram
    #[arg(short = 'b', long = "bins", value_name = "INT", default_value_t = 10)]
    bins: usize,

    /// Query values at ranks from the list DOUBLES
    #[arg(short = 'r', long = "rank2value", value_name = "DOUBLES", num_args = 1..)]
    ranks: Vec<f64>,

    /// Query values at ranks read from FILE
    #[arg(short = 'R', long = "rank2value-file", value_name = "FILE")]
    ranks_file: Option<PathBuf>,

    /// Query ranks of values from the list DOUBLES
    #[arg(short = 'v', long = "value2rank", value_name = "DOUBLES", num_args = 1.., allow_negative_numbers = true)]
    values: Vec<f64>,

    /// Query ranks of values read from FILE
    #[arg(short = 'V', long = "value2rank-file", value_name = "FILE")]
    values_file: Option<PathBuf>,

    #[arg(long, action = ArgAction::Help, help = "Print help")]
    help: Option<bool>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sk=info,stream_summaries=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match Cli::parse().command {
        Command::Freq(args) => run_freq(args),
        Command::Quant(args) => run_quant(args),
    }
}

fn run_freq(args: FreqArgs) -> Result<()> {
    let file_ids = match &args.ids_file {
        Some(path) => pipeline::read_query_tokens(path)?,
        None => Vec::new(),
    };
    let query = FrequencyQuery {
        max_error: args.error_offset,
        stream_length: args.stream_length,
        top_ids: args.topk_ids,
        top_ids_with_freq: args.topk_ids_with_freq,
        ids: args.ids,
        file_ids,
    };
    let backend = FrequencyBackend::new(args.k, args.weights, query)?;
    let invocation = invocation_from(args.data, args.sketch, args.out);
    pipeline::run(&backend, &invocation, io::stdout().lock())?;
    Ok(())
}

fn run_quant(args: QuantArgs) -> Result<()> {
    let file_ranks = match &args.ranks_file {
        Some(path) => pipeline::read_query_doubles(path)?,
        None => Vec::new(),
    };
    let file_values = match &args.values_file {
        Some(path) => pipeline::read_query_doubles(path)?,
        None => Vec::new(),
    };
    let query = QuantilesQuery {
        histogram: args.histogram,
        log_histogram: args.log_histogram,
        bins: args.bins,
        ranks: args.ranks,
        file_ranks,
        values: args.values,
        file_values,
    };
    let backend = QuantilesBackend::new(args.k, query)?;
    let invocation = invocation_from(args.data, args.sketch, args.out);
    pipeline::run(&backend, &invocation, io::stdout().lock())?;
    Ok(())
}

/// Data sources in argument order, then serialized sketches; stdin is the
/// sole data source when neither kind was given.
fn invocation_from(
    data: Vec<PathBuf>,
    sketch: Vec<PathBuf>,
    out: Option<PathBuf>,
) -> Invocation {
    let mut data_sources: Vec<Source> = data.into_iter().map(Source::File).collect();
    if data_sources.is_empty() && sketch.is_empty() {
        data_sources.push(Source::Stdin);
    }
    Invocation {
        data_sources,
        sketch_paths: sketch,
        save_path: out,
    }
}
