#![no_main]

use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;

use logsift_ingest::sniff::{sample_lines, sniff_lines};
use logsift_ingest::{FormatCatalog, ScoringConfig};

fn catalog() -> &'static FormatCatalog {
    static CATALOG: OnceLock<FormatCatalog> = OnceLock::new();
    CATALOG.get_or_init(|| FormatCatalog::builtin().expect("builtin catalog must load"))
}

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let scoring = ScoringConfig::default();
    let lines = sample_lines(&text, scoring.max_sample_lines);

    let result = sniff_lines(&lines, catalog().formats(), &scoring);

    assert!((0.0..=1.0).contains(&result.confidence));
    assert_eq!(result.lines_tested, lines.len());
    // 채택되지 않았으면 사유가 있어야 함
    assert!(result.chosen_format.is_some() || result.error.is_some());
});
