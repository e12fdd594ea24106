//! 형식 감지 벤치마크
//!
//! 내장 카탈로그 전체에 대한 샘플 점수 계산과 헤더 위치 추론 속도를 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use logsift_ingest::sniff::{sample_lines, sniff_lines};
use logsift_ingest::{FormatCatalog, ScoringConfig, infer_header_offset};

/// nginx combined 샘플 라인
const NGINX_LINE: &str = r#"203.0.113.7 - - [10/Oct/2023:13:55:36 +0000] "GET /index.html HTTP/1.1" 200 2326 "-" "Mozilla/5.0 (X11; Linux x86_64)""#;

/// 어떤 형식에도 맞지 않는 라인
const UNKNOWN_LINE: &str = "lorem ipsum dolor sit amet consectetur adipiscing elit";

fn repeated(line: &str, count: usize) -> String {
    let mut text = String::with_capacity((line.len() + 1) * count);
    for _ in 0..count {
        text.push_str(line);
        text.push('\n');
    }
    text
}

fn csv_sample(rows: usize) -> Vec<String> {
    let mut lines = vec![
        "# exported by audit tool".to_owned(),
        String::new(),
        "id,status,day,path".to_owned(),
    ];
    lines.extend((0..rows).map(|i| format!("{i},200,2024-01-{:02},/api/v1/items/{i}", i % 28 + 1)));
    lines
}

fn bench_sniff_lines(c: &mut Criterion) {
    let catalog = FormatCatalog::builtin().unwrap();
    let scoring = ScoringConfig::default();

    let mut group = c.benchmark_group("sniff_lines");
    group.throughput(Throughput::Elements(catalog.len() as u64));

    // 첫 형식에서 바로 결정되는 경우
    let nginx = repeated(NGINX_LINE, scoring.max_sample_lines);
    group.bench_function("nginx_short_circuit", |b| {
        b.iter(|| {
            let lines = sample_lines(black_box(&nginx), scoring.max_sample_lines);
            sniff_lines(&lines, catalog.formats(), &scoring)
        })
    });

    // 모든 형식을 끝까지 점수 계산하는 경우
    let unknown = repeated(UNKNOWN_LINE, scoring.max_sample_lines);
    group.bench_function("no_match_full_scan", |b| {
        b.iter(|| {
            let lines = sample_lines(black_box(&unknown), scoring.max_sample_lines);
            sniff_lines(&lines, catalog.formats(), &scoring)
        })
    });

    group.finish();
}

fn bench_header_inference(c: &mut Criterion) {
    let mut group = c.benchmark_group("infer_header_offset");

    for rows in [10, 40, 400] {
        let lines = csv_sample(rows);
        group.throughput(Throughput::Elements(lines.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &lines, |b, lines| {
            b.iter(|| infer_header_offset(black_box(lines), ','))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sniff_lines, bench_header_inference);
criterion_main!(benches);
