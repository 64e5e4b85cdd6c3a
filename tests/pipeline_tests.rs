// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use std::fs;
use std::path::PathBuf;

use stream_summaries::pipeline::{self, Invocation, Source};
use stream_summaries::{
    FrequencyBackend, FrequencyQuery, QuantilesBackend, QuantilesQuery, Reporter, SketchBackend,
    SketchError,
};

/// Scratch file that removes itself on drop: create data file, run the
/// invocation, clean up.
struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn new(name: &str, content: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "stream_summaries_{}_{}",
            std::process::id(),
            name
        ));
        fs::write(&path, content).unwrap();
        Self { path }
    }

    fn empty(name: &str) -> Self {
        Self::new(name, "")
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// 19975 weight-1 items plus 25 items whose weight equals their own id.
fn freq_scenario_data() -> String {
    let mut data = String::new();
    for i in 1..=19975 {
        data.push_str(&format!("1\t{}\n", i));
    }
    for i in 19976..=20000 {
        data.push_str(&format!("{}\t{}\n", i, i));
    }
    data
}

fn uniques_data(n: u64) -> String {
    (0..n).map(|i| format!("{}\n", i)).collect()
}

fn run_to_string<B: SketchBackend>(backend: &B, invocation: &Invocation) -> String {
    let mut out = Vec::new();
    pipeline::run(backend, invocation, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

/// Table rows below the given header: (first cell, second cell).
fn table_rows(text: &str, header: &str) -> Vec<(String, String)> {
    let mut rows = Vec::new();
    let mut in_table = false;
    for line in text.lines() {
        if line == header {
            in_table = true;
            continue;
        }
        if in_table {
            match line.split_once('\t') {
                Some((a, b)) => rows.push((a.to_string(), b.to_string())),
                None => break,
            }
        }
    }
    rows
}

fn ungroup(cell: &str) -> u64 {
    cell.replace(',', "").parse().unwrap()
}

#[test]
fn freq_scenario_reports_all_heavy_items() {
    let data = ScratchFile::new("freq_data.txt", &freq_scenario_data());
    let query = FrequencyQuery {
        stream_length: true,
        top_ids_with_freq: true,
        ..FrequencyQuery::default()
    };
    let backend = FrequencyBackend::new(Some(1024), true, query).unwrap();
    let invocation = Invocation {
        data_sources: vec![Source::File(data.path.clone())],
        ..Invocation::default()
    };

    let text = run_to_string(&backend, &invocation);

    // total weight = 19975 singletons + sum of 19976..=20000
    let expected_stream: u64 = 19975 + (19976..=20000u64).sum::<u64>();
    assert!(text.contains(&format!("Stream Length   : {}", expected_stream)));

    let rows = table_rows(&text, "Items\tFrequency");
    assert!(!rows.is_empty());
    for i in 19976..=20000u64 {
        let row = rows
            .iter()
            .find(|(item, _)| item == &i.to_string())
            .unwrap_or_else(|| panic!("heavy item {} missing from report", i));
        assert!(ungroup(&row.1) >= i, "estimate below true count for {}", i);
    }
}

#[test]
fn freq_default_weight_matches_explicit_one() {
    let backend = FrequencyBackend::new(Some(64), true, FrequencyQuery::default()).unwrap();

    let mut implicit = backend.build().unwrap();
    pipeline::update_from_lines(&backend, &mut implicit, b"apple\napple\n" as &[u8], "mem")
        .unwrap();

    let mut explicit = backend.build().unwrap();
    pipeline::update_from_lines(
        &backend,
        &mut explicit,
        b"1\tapple\n1\tapple\n" as &[u8],
        "mem",
    )
    .unwrap();

    assert_eq!(implicit.estimate("apple"), explicit.estimate("apple"));
    assert_eq!(implicit.stream_weight(), explicit.stream_weight());
}

#[test]
fn freq_save_and_reload_round_trips() {
    let data = ScratchFile::new("freq_roundtrip_data.txt", &freq_scenario_data());
    let blob = ScratchFile::empty("freq_roundtrip.bin");
    let backend = FrequencyBackend::new(Some(256), true, FrequencyQuery::default()).unwrap();

    let build = Invocation {
        data_sources: vec![Source::File(data.path.clone())],
        save_path: Some(blob.path.clone()),
        ..Invocation::default()
    };
    let built_text = run_to_string(&backend, &build);

    let reload = Invocation {
        sketch_paths: vec![blob.path.clone()],
        ..Invocation::default()
    };
    let reloaded_text = run_to_string(&backend, &reload);

    assert_eq!(built_text, reloaded_text);
}

#[test]
fn freq_multiple_sources_merge_implicitly() {
    let first = ScratchFile::new("freq_merge_1.txt", "apple\napple\nbanana\n");
    let second = ScratchFile::new("freq_merge_2.txt", "apple\ncherry\n");
    let query = FrequencyQuery {
        stream_length: true,
        top_ids_with_freq: true,
        ..FrequencyQuery::default()
    };
    let backend = FrequencyBackend::new(Some(64), false, query).unwrap();
    let invocation = Invocation {
        data_sources: vec![Source::File(first.path.clone()), Source::File(second.path.clone())],
        ..Invocation::default()
    };

    let text = run_to_string(&backend, &invocation);
    assert!(text.contains("Stream Length   : 5"));
    let rows = table_rows(&text, "Items\tFrequency");
    let apple = rows.iter().find(|(item, _)| item == "apple").unwrap();
    assert_eq!(ungroup(&apple.1), 3);
}

#[test]
fn freq_bad_weight_aborts_with_source_name() {
    let data = ScratchFile::new("freq_bad.txt", "1\tapple\nnope\tbanana\n");
    let backend = FrequencyBackend::new(None, true, FrequencyQuery::default()).unwrap();
    let invocation = Invocation {
        data_sources: vec![Source::File(data.path.clone())],
        ..Invocation::default()
    };

    let err = pipeline::run(&backend, &invocation, Vec::new()).unwrap_err();
    match err {
        SketchError::Read { source_name, cause } => {
            assert!(source_name.contains("freq_bad.txt"));
            assert!(matches!(*cause, SketchError::Format { .. }));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn quant_default_query_prints_deciles() {
    let data = ScratchFile::new("quant_deciles.txt", &uniques_data(20_000));
    let backend = QuantilesBackend::new(Some(256), QuantilesQuery::default()).unwrap();
    let invocation = Invocation {
        data_sources: vec![Source::File(data.path.clone())],
        ..Invocation::default()
    };

    let text = run_to_string(&backend, &invocation);
    assert!(text.contains("Print deciles as default:"));

    let rows = table_rows(&text, "Rank\tValue");
    assert_eq!(rows.len(), 11);
    let mut previous = f64::NEG_INFINITY;
    for (i, (rank, value)) in rows.iter().enumerate() {
        assert_eq!(rank, &format!("{:.1}", i as f64 / 10.0));
        let value: f64 = value.parse().unwrap();
        assert!(value >= previous, "deciles went backwards at {}", rank);
        previous = value;
    }
    assert_eq!(rows[0].1.parse::<f64>().unwrap(), 0.0);
    assert_eq!(rows[10].1.parse::<f64>().unwrap(), 19999.0);
}

#[test]
fn quant_histogram_has_thirty_buckets_summing_to_stream() {
    let data = ScratchFile::new("quant_hist.txt", &uniques_data(20_000));
    let query = QuantilesQuery {
        histogram: true,
        bins: 30,
        ..QuantilesQuery::default()
    };
    let backend = QuantilesBackend::new(Some(256), query).unwrap();
    let invocation = Invocation {
        data_sources: vec![Source::File(data.path.clone())],
        ..Invocation::default()
    };

    let text = run_to_string(&backend, &invocation);
    let rows = table_rows(&text, "Value\tFreq");
    assert_eq!(rows.len(), 30);

    let boundaries: Vec<f64> = rows
        .iter()
        .map(|(value, _)| value.replace(',', "").parse().unwrap())
        .collect();
    for pair in boundaries.windows(2) {
        assert!(pair[0] < pair[1], "boundaries not strictly increasing");
    }

    let total: u64 = rows.iter().map(|(_, freq)| ungroup(freq)).sum();
    assert!(total <= 20_000 && total >= 20_000 - 30, "total={}", total);
}

#[test]
fn quant_log_histogram_with_zero_substitute() {
    let data = ScratchFile::new("quant_loghist.txt", &uniques_data(20_000));
    let query = QuantilesQuery {
        log_histogram: Some(1.0),
        bins: 30,
        ..QuantilesQuery::default()
    };
    let backend = QuantilesBackend::new(Some(256), query).unwrap();
    let invocation = Invocation {
        data_sources: vec![Source::File(data.path.clone())],
        ..Invocation::default()
    };

    // stream minimum is exactly zero; the substitute must avoid the
    // negative-range error
    let text = run_to_string(&backend, &invocation);
    let rows = table_rows(&text, "Value\tFreq");
    assert_eq!(rows.len(), 30);

    let boundaries: Vec<f64> = rows
        .iter()
        .skip(1)
        .map(|(value, _)| value.replace(',', "").parse().unwrap())
        .collect();
    assert_eq!(boundaries.len(), 29);
    for pair in boundaries.windows(2) {
        assert!(pair[0] < pair[1], "exponentiated splits not increasing");
    }
}

#[test]
fn quant_negative_stream_rejects_log_histogram() {
    let data = ScratchFile::new("quant_negative.txt", "-5\n1\n100\n");
    let query = QuantilesQuery {
        log_histogram: Some(1.0),
        ..QuantilesQuery::default()
    };
    let backend = QuantilesBackend::new(None, query).unwrap();
    let invocation = Invocation {
        data_sources: vec![Source::File(data.path.clone())],
        ..Invocation::default()
    };

    let err = pipeline::run(&backend, &invocation, Vec::new()).unwrap_err();
    assert!(matches!(err, SketchError::Config(_)));
}

#[test]
fn quant_non_numeric_line_aborts() {
    let data = ScratchFile::new("quant_bad.txt", "1\n2\nnot-a-number\n");
    let backend = QuantilesBackend::new(None, QuantilesQuery::default()).unwrap();
    let invocation = Invocation {
        data_sources: vec![Source::File(data.path.clone())],
        ..Invocation::default()
    };

    let err = pipeline::run(&backend, &invocation, Vec::new()).unwrap_err();
    match err {
        SketchError::Read { source_name, .. } => {
            assert!(source_name.contains("quant_bad.txt"))
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn quant_save_merge_and_query_serialized_sketches() {
    let low = ScratchFile::new("quant_merge_low.txt", &uniques_data(10_000));
    let high = ScratchFile::new(
        "quant_merge_high.txt",
        &(10_000..20_000u64).map(|i| format!("{}\n", i)).collect::<String>(),
    );
    let blob_low = ScratchFile::empty("quant_low.bin");
    let blob_high = ScratchFile::empty("quant_high.bin");
    let backend = QuantilesBackend::new(Some(256), QuantilesQuery::default()).unwrap();

    for (data, blob) in [(&low, &blob_low), (&high, &blob_high)] {
        let invocation = Invocation {
            data_sources: vec![Source::File(data.path.clone())],
            save_path: Some(blob.path.clone()),
            ..Invocation::default()
        };
        run_to_string(&backend, &invocation);
    }

    let invocation = Invocation {
        sketch_paths: vec![blob_low.path.clone(), blob_high.path.clone()],
        ..Invocation::default()
    };
    let text = run_to_string(&backend, &invocation);

    let rows = table_rows(&text, "Rank\tValue");
    assert_eq!(rows.len(), 11);
    assert_eq!(rows[0].1.parse::<f64>().unwrap(), 0.0);
    assert_eq!(rows[10].1.parse::<f64>().unwrap(), 19999.0);
    let median: f64 = rows[5].1.parse().unwrap();
    assert!(median > 9000.0 && median < 11_000.0, "median={}", median);
}

#[test]
fn quant_rank_and_value_queries_through_pipeline() {
    let data = ScratchFile::new("quant_rank_value.txt", &uniques_data(20_000));
    let query = QuantilesQuery {
        ranks: vec![0.0, 0.5, 1.0],
        values: vec![20_000.0, 0.0, 10_000.0],
        ..QuantilesQuery::default()
    };
    let backend = QuantilesBackend::new(Some(256), query).unwrap();
    let invocation = Invocation {
        data_sources: vec![Source::File(data.path.clone())],
        ..Invocation::default()
    };

    let text = run_to_string(&backend, &invocation);

    let rank_rows = table_rows(&text, "Rank\tValue");
    assert_eq!(rank_rows.len(), 3);
    assert_eq!(rank_rows[0].1, "0.00");
    assert_eq!(rank_rows[2].1, "19999.00");

    // list-supplied values are queried in sorted order
    let value_rows = table_rows(&text, "Value\tRank");
    let queried: Vec<&str> = value_rows.iter().map(|(v, _)| v.as_str()).collect();
    assert_eq!(queried, vec!["0.00", "10000.00", "20000.00"]);
    assert_eq!(value_rows[0].1, "0.000000");
    assert_eq!(value_rows[2].1, "1.000000");
}

#[test]
fn query_file_tokens_are_trimmed() {
    let ids = ScratchFile::new("query_ids.txt", "apple\n  banana  \n\ncherry");
    let tokens = pipeline::read_query_tokens(&ids.path).unwrap();
    assert_eq!(tokens, vec!["apple", "banana", "cherry"]);

    let ranks = ScratchFile::new("query_ranks.txt", "0.0\n0.5\n1.0");
    let doubles = pipeline::read_query_doubles(&ranks.path).unwrap();
    assert_eq!(doubles, vec![0.0, 0.5, 1.0]);

    let bad = ScratchFile::new("query_bad.txt", "0.0\nxyz\n");
    let err = pipeline::read_query_doubles(&bad.path).unwrap_err();
    assert!(matches!(err, SketchError::Format { .. }));
}

#[test]
fn freq_id_lookup_through_pipeline() {
    let data = ScratchFile::new("freq_lookup.txt", &freq_scenario_data());
    let query = FrequencyQuery {
        ids: vec!["19999".into(), "no-such-item".into()],
        ..FrequencyQuery::default()
    };
    let backend = FrequencyBackend::new(Some(1024), true, query).unwrap();
    let invocation = Invocation {
        data_sources: vec![Source::File(data.path.clone())],
        ..Invocation::default()
    };

    let text = run_to_string(&backend, &invocation);
    let rows = table_rows(&text, "Items\tFrequency");
    assert_eq!(rows.len(), 2);
    assert!(ungroup(&rows[0].1) >= 19_999);
    assert_eq!(ungroup(&rows[1].1), 0);
}

#[test]
fn reporter_used_directly_writes_reference_layout() {
    let mut report = Reporter::new(Vec::new());
    report.header(&["Items", "Frequency"]).unwrap();
    report
        .row(&["apple".to_string(), "1,024".to_string()])
        .unwrap();
    let text = String::from_utf8(report.into_inner()).unwrap();
    assert_eq!(text, "\nItems\tFrequency\napple\t1,024\n");
}
