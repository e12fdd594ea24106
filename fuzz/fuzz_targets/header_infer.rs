#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use logsift_ingest::sniff::{infer_columns, infer_header_offset};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    lines: Vec<String>,
    delimiter: u8,
    infer_types: bool,
}

fuzz_target!(|input: FuzzInput| {
    // 샘플 크기 제한 (성능)
    let lines: Vec<&str> = input.lines.iter().map(String::as_str).take(64).collect();
    let delimiter = if input.delimiter.is_ascii() && input.delimiter != b'"' {
        input.delimiter
    } else {
        b','
    };

    let detection = infer_header_offset(&lines, char::from(delimiter));

    // 빈 샘플이 아니면 오프셋은 항상 샘플 안쪽
    if !lines.is_empty() {
        assert!(detection.header_offset < lines.len());
    }

    let columns = infer_columns(&lines, detection, delimiter, input.infer_types);
    let mut names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), columns.len(), "column names must be unique");
});
