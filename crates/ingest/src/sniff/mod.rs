//! 형식 감지 -- 파일 샘플을 카탈로그의 각 형식과 비교해 점수를 매깁니다.
//!
//! 파일 전체가 아닌 앞부분 샘플만 읽으므로 파일 크기와 무관하게 빠릅니다.
//!
//! # 점수
//! `score = regex_weight * ratio + heuristic_weight * heuristic` (0..=1로 제한)
//!
//! - `ratio`: 샘플 라인 중 형식 정규식에 일치하는 비율
//! - `heuristic`: 형식 계열별 보조 신호 (CSV 쉼표 밀도, JSON 객체, HTTP 토큰)
//!
//! 정규식이 모든 샘플 라인에 일치하면 즉시 신뢰도 1로 반환합니다.
//! 그 외에는 최고 점수가 채택 임계값을 **초과**해야 채택됩니다.

pub mod header;

pub use header::{HeaderDetection, infer_columns, infer_header_offset, sniff_csv_header};

use std::path::Path;

use logsift_core::error::DetectionError;
use logsift_core::metrics as m;
use serde::Serialize;
use tokio::io::AsyncReadExt;

use crate::catalog::{FormatCatalog, FormatDescriptor};
use crate::config::ScoringConfig;
use crate::error::LogIngestError;

/// 샘플에 비어있지 않은 라인이 없을 때의 메시지
pub const EMPTY_CONTENT: &str = "empty content";
/// 임계값을 넘는 형식이 없을 때의 메시지
pub const NO_CONFIDENT_MATCH: &str = "no confident match";

/// 형식 감지 결과
#[derive(Debug, Clone, Serialize)]
pub struct SniffResult {
    /// 채택된 형식
    pub chosen_format: Option<FormatDescriptor>,
    /// 신뢰도 (0..=1)
    pub confidence: f64,
    /// 점수 계산에 사용한 라인 수
    pub lines_tested: usize,
    /// 실패 사유 (읽기 실패 포함)
    pub error: Option<String>,
}

impl SniffResult {
    fn failed(confidence: f64, lines_tested: usize, error: impl Into<String>) -> Self {
        Self {
            chosen_format: None,
            confidence,
            lines_tested,
            error: Some(error.into()),
        }
    }

    /// 실패 결과를 에러로 변환합니다.
    pub fn into_format(self) -> Result<FormatDescriptor, DetectionError> {
        match self.chosen_format {
            Some(format) => Ok(format),
            None => Err(match self.error.as_deref() {
                Some(EMPTY_CONTENT) => DetectionError::EmptyContent,
                Some(NO_CONFIDENT_MATCH) | None => DetectionError::NoConfidentMatch {
                    confidence: self.confidence,
                },
                Some(other) => DetectionError::Read(other.to_owned()),
            }),
        }
    }
}

/// 원문 텍스트에서 점수용 샘플 라인을 추출합니다.
///
/// `\n`/`\r\n`으로 나누고, 앞뒤 공백을 제거하고, 빈 줄을 버린 뒤 최대 `max_lines`개를 취합니다.
pub fn sample_lines(text: &str, max_lines: usize) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(max_lines)
        .collect()
}

/// 샘플 라인과 형식 목록으로 형식을 감지합니다.
pub fn sniff_lines<S: AsRef<str>>(
    lines: &[S],
    formats: &[FormatDescriptor],
    scoring: &ScoringConfig,
) -> SniffResult {
    if lines.is_empty() {
        return SniffResult::failed(0.0, 0, EMPTY_CONTENT);
    }

    let mut best: Option<&FormatDescriptor> = None;
    let mut best_score = 0.0_f64;

    for format in formats {
        let ratio = regex_match_ratio(lines, format);
        if ratio >= 1.0 {
            return SniffResult {
                chosen_format: Some(format.clone()),
                confidence: 1.0,
                lines_tested: lines.len(),
                error: None,
            };
        }

        let score = (scoring.regex_weight * ratio
            + scoring.heuristic_weight * heuristic_score(lines, format))
        .clamp(0.0, 1.0);
        tracing::trace!(slug = %format.slug, ratio, score, "scored format");

        // 동점이면 카탈로그 순서상 앞선 형식 유지
        if score > best_score {
            best = Some(format);
            best_score = score;
        }
    }

    match best {
        Some(format) if best_score > scoring.acceptance_threshold => SniffResult {
            chosen_format: Some(format.clone()),
            confidence: best_score,
            lines_tested: lines.len(),
            error: None,
        },
        _ => SniffResult::failed(best_score, lines.len(), NO_CONFIDENT_MATCH),
    }
}

/// 정규식 일치 비율. 정규식이 없거나 잘못되면 0입니다.
fn regex_match_ratio<S: AsRef<str>>(lines: &[S], format: &FormatDescriptor) -> f64 {
    let regex = match format.compile_regex() {
        Ok(Some(regex)) => regex,
        Ok(None) => return 0.0,
        Err(e) => {
            tracing::warn!(slug = %format.slug, error = %e, "invalid regex in catalog, scoring as non-match");
            return 0.0;
        }
    };
    let matches = lines
        .iter()
        .filter(|line| regex.is_match(line.as_ref()))
        .count();
    matches as f64 / lines.len() as f64
}

/// 형식 계열별 보조 점수
fn heuristic_score<S: AsRef<str>>(lines: &[S], format: &FormatDescriptor) -> f64 {
    if format.is_delimited() {
        let density = average(lines, |line| line.matches(',').count() as f64);
        if density > 2.0 {
            return (0.6 + (density / 20.0).min(0.4)).clamp(0.0, 1.0);
        }
    }

    if format.slug.contains("json") {
        let density = average(lines, |line| {
            let has_object = line
                .find('{')
                .is_some_and(|open| line[open..].contains('}'));
            if has_object { 1.0 } else { 0.0 }
        });
        if density > 0.3 {
            return 0.8;
        }
    }

    if format.category.to_ascii_lowercase().contains("web")
        && lines.iter().any(|line| line.as_ref().contains("HTTP"))
    {
        return 0.4;
    }

    0.0
}

fn average<S: AsRef<str>>(lines: &[S], per_line: impl Fn(&str) -> f64) -> f64 {
    if lines.is_empty() {
        return 0.0;
    }
    lines.iter().map(|line| per_line(line.as_ref())).sum::<f64>() / lines.len() as f64
}

/// 파일 앞부분을 읽어 형식을 감지합니다.
///
/// 읽기 실패는 에러로 반환하지 않고 결과의 `error` 필드에 담습니다.
pub async fn sniff_file(
    path: impl AsRef<Path>,
    catalog: &FormatCatalog,
    scoring: &ScoringConfig,
) -> SniffResult {
    let path = path.as_ref();
    let result = match read_head(path, scoring.sample_bytes).await {
        Ok(text) => {
            let lines = sample_lines(&text, scoring.max_sample_lines);
            sniff_lines(&lines, catalog.formats(), scoring)
        }
        Err(e) => SniffResult::failed(0.0, 0, format!("failed to read {}: {e}", path.display())),
    };

    let outcome = if result.chosen_format.is_some() {
        "detected"
    } else {
        "undetected"
    };
    metrics::counter!(m::SNIFF_TOTAL, m::LABEL_RESULT => outcome).increment(1);
    tracing::info!(
        path = %path.display(),
        format = result.chosen_format.as_ref().map_or("-", |f| f.slug.as_str()),
        confidence = result.confidence,
        lines_tested = result.lines_tested,
        "format sniff finished"
    );

    result
}

async fn read_head(path: &Path, sample_bytes: usize) -> std::io::Result<String> {
    let file = tokio::fs::File::open(path).await?;
    let mut buf = Vec::new();
    // 한 바이트 더 읽어 경계에서 끝나는 파일과 잘린 파일을 구분
    file.take(sample_bytes as u64 + 1)
        .read_to_end(&mut buf)
        .await?;

    // 샘플 경계에서 잘린 마지막 라인은 점수에서 제외
    if buf.len() > sample_bytes {
        let end = buf
            .iter()
            .rposition(|b| *b == b'\n')
            .unwrap_or(sample_bytes);
        buf.truncate(end);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// 적재할 형식을 결정합니다.
///
/// 1. `explicit` slug가 있으면 카탈로그에서 조회
/// 2. 없으면 감지 실행
/// 3. 감지 실패 시 `.csv` 파일은 첫 구분자 기반 형식으로 대체
pub async fn resolve_format(
    path: impl AsRef<Path>,
    catalog: &FormatCatalog,
    scoring: &ScoringConfig,
    explicit: Option<&str>,
) -> Result<(FormatDescriptor, Option<SniffResult>), LogIngestError> {
    let path = path.as_ref();

    if let Some(slug) = explicit {
        let format = catalog
            .get(slug)
            .cloned()
            .ok_or_else(|| LogIngestError::UnknownFormat(slug.to_owned()))?;
        return Ok((format, None));
    }

    let result = sniff_file(path, catalog, scoring).await;
    if let Some(format) = result.chosen_format.clone() {
        return Ok((format, Some(result)));
    }

    let is_csv_file = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv_file {
        if let Some(format) = catalog.first_delimited() {
            tracing::info!(
                slug = %format.slug,
                "no confident match, using delimited format for .csv file"
            );
            return Ok((format.clone(), Some(result)));
        }
    }

    Err(result.into_format().err().map_or_else(
        || LogIngestError::UnknownFormat("<undetected>".to_owned()),
        LogIngestError::Detection,
    ))
}
