//! 헤더 위치 추론 -- 구분자 기반 텍스트의 헤더 행과 데이터 시작 위치를 찾습니다.
//!
//! 파일 앞부분에 설명 문구나 빈 줄 같은 서문(preamble)이 있어도
//! 가장 흔한 필드 수(최빈값)를 데이터 행의 모양으로 보고 그 앞을 건너뜁니다.
//!
//! # 알고리즘
//! 1. 라인별 필드 수 계산 (단순 구분자 분할)
//! 2. 빈 줄을 제외한 최빈 필드 수 계산 (동률이면 큰 값)
//! 3. 최빈 필드 수를 가진 첫 후보 라인부터 다음 라인과 필드 종류 비교
//! 4. 후보가 STRING이고 다음 라인이 NUMBER/DATE면 +2, BOOL이면 +1
//! 5. 점수 > 0이면 해당 위치가 헤더

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tokio::io::AsyncReadExt;

use crate::catalog::types::is_identifier;
use crate::catalog::{ColumnSpec, SqlType};

/// 헤더 감지 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderDetection {
    /// 헤더(또는 헤더가 없으면 첫 데이터 행)의 0부터 시작하는 라인 위치
    pub header_offset: usize,
    /// 헤더 행 존재 여부
    pub has_header: bool,
}

impl Default for HeaderDetection {
    /// 관례적인 파일로 가정 (첫 줄이 헤더)
    fn default() -> Self {
        Self {
            header_offset: 0,
            has_header: true,
        }
    }
}

impl HeaderDetection {
    /// 데이터 행 앞에서 건너뛸 물리적 라인 수 (헤더 포함)
    pub fn lines_before_data(&self) -> usize {
        self.header_offset + usize::from(self.has_header)
    }
}

/// 필드 값 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// 빈 값
    Empty,
    /// 유한한 숫자
    Number,
    /// `YYYY-MM-DD`로 시작하는 값
    Date,
    /// `true` / `false` (대소문자 무시)
    Bool,
    /// 그 외 문자열
    String,
}

/// 필드 값을 분류합니다.
///
/// 앞뒤 공백과 한 쌍의 큰따옴표를 제거한 뒤 판단합니다.
pub fn classify_field(raw: &str) -> FieldKind {
    let value = strip_quotes(raw.trim());
    if value.is_empty() {
        return FieldKind::Empty;
    }
    if value.parse::<f64>().is_ok_and(f64::is_finite) {
        return FieldKind::Number;
    }
    if has_date_prefix(value) {
        return FieldKind::Date;
    }
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
        return FieldKind::Bool;
    }
    FieldKind::String
}

fn strip_quotes(value: &str) -> &str {
    let value = value.strip_prefix('"').unwrap_or(value);
    value.strip_suffix('"').unwrap_or(value)
}

fn has_date_prefix(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit)
}

fn field_count(line: &str, delimiter: char) -> usize {
    line.split(delimiter).count()
}

fn row_kinds(line: &str, delimiter: char) -> Vec<FieldKind> {
    line.split(delimiter).map(classify_field).collect()
}

fn header_score(candidate: &[FieldKind], next: &[FieldKind]) -> u32 {
    candidate
        .iter()
        .zip(next)
        .map(|pair| match pair {
            (FieldKind::String, FieldKind::Number | FieldKind::Date) => 2,
            (FieldKind::String, FieldKind::Bool) => 1,
            _ => 0,
        })
        .sum()
}

/// 샘플 라인에서 헤더 위치를 추론합니다.
///
/// 샘플 크기에 비례하는 시간만 사용하며 패닉하지 않습니다.
pub fn infer_header_offset<S: AsRef<str>>(lines: &[S], delimiter: char) -> HeaderDetection {
    let counts: Vec<Option<usize>> = lines
        .iter()
        .map(|line| {
            let line = line.as_ref();
            (!line.trim().is_empty()).then(|| field_count(line, delimiter))
        })
        .collect();

    let mut frequency: HashMap<usize, usize> = HashMap::new();
    for count in counts.iter().flatten() {
        *frequency.entry(*count).or_default() += 1;
    }

    // 동률이면 필드 수가 큰 쪽을 데이터 모양으로 봅니다.
    let Some(modal) = frequency
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(count, _)| count)
    else {
        return HeaderDetection::default();
    };

    let mut first_candidate = None;
    for i in 0..lines.len().saturating_sub(1) {
        if counts[i] != Some(modal) {
            continue;
        }
        first_candidate.get_or_insert(i);

        let current = row_kinds(lines[i].as_ref(), delimiter);
        let next = row_kinds(lines[i + 1].as_ref(), delimiter);
        if header_score(&current, &next) > 0 {
            return HeaderDetection {
                header_offset: i,
                has_header: true,
            };
        }
    }

    match first_candidate {
        Some(offset) => HeaderDetection {
            header_offset: offset,
            has_header: false,
        },
        None => HeaderDetection::default(),
    }
}

/// 파일 앞부분을 읽어 헤더 위치를 추론합니다.
///
/// 최대 `sample_bytes` 바이트, `sample_lines` 라인만 읽으며, 샘플 경계에서
/// 잘린 마지막 라인은 버립니다. 감지 결과와 샘플 라인을 함께 반환합니다.
pub async fn sniff_csv_header(
    path: impl AsRef<Path>,
    delimiter: char,
    sample_bytes: usize,
    sample_lines: usize,
) -> std::io::Result<(HeaderDetection, Vec<String>)> {
    let lines = read_sample_lines(path.as_ref(), sample_bytes, sample_lines).await?;
    let detection = infer_header_offset(&lines, delimiter);
    tracing::debug!(
        header_offset = detection.header_offset,
        has_header = detection.has_header,
        sampled = lines.len(),
        "inferred header position"
    );
    Ok((detection, lines))
}

/// 파일 앞부분에서 물리적 라인을 읽습니다 (빈 줄 포함, `\r\n` 처리).
pub(crate) async fn read_sample_lines(
    path: &Path,
    sample_bytes: usize,
    max_lines: usize,
) -> std::io::Result<Vec<String>> {
    let file = tokio::fs::File::open(path).await?;
    let mut buf = Vec::with_capacity(sample_bytes.min(64 * 1024));
    file.take(sample_bytes as u64 + 1)
        .read_to_end(&mut buf)
        .await?;

    // 샘플 경계에서 잘린 라인 제거 (경계 바로 뒤가 개행이면 마지막 라인은 온전함)
    if buf.len() > sample_bytes {
        let end = buf.iter().rposition(|b| *b == b'\n').unwrap_or(0);
        buf.truncate(end);
    }
    let text = String::from_utf8_lossy(&buf);
    let mut lines: Vec<String> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_owned())
        .collect();

    // 마지막 개행 뒤의 빈 조각 제거
    if lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines.truncate(max_lines);
    Ok(lines)
}

/// CSV 규칙으로 한 라인을 필드로 분할합니다 (따옴표 처리).
pub(crate) fn split_record(line: &str, delimiter: u8) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(line.as_bytes());
    let mut record = csv::StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => record.iter().map(str::to_owned).collect(),
        _ => line.split(char::from(delimiter)).map(str::to_owned).collect(),
    }
}

/// 샘플에서 컬럼 이름과 타입을 추론합니다.
///
/// 이름은 헤더 행에서 가져오고(식별자 규칙으로 정리, 중복 제거),
/// 헤더가 없으면 `column0`, `column1`, ... 을 사용합니다.
/// 타입은 데이터 행의 필드 종류 다수결로 결정합니다.
pub fn infer_columns<S: AsRef<str>>(
    lines: &[S],
    detection: HeaderDetection,
    delimiter: u8,
    infer_types: bool,
) -> Vec<ColumnSpec> {
    let data_rows: Vec<Vec<String>> = lines
        .iter()
        .skip(detection.lines_before_data())
        .map(|line| line.as_ref())
        .filter(|line| !line.trim().is_empty())
        .map(|line| split_record(line, delimiter))
        .collect();

    let header = if detection.has_header {
        lines
            .get(detection.header_offset)
            .map(|line| split_record(line.as_ref(), delimiter))
    } else {
        None
    };

    let width = match &header {
        Some(names) => names.len(),
        None => modal_width(&data_rows),
    };
    if width == 0 {
        return Vec::new();
    }

    let names = match header {
        Some(raw) => sanitize_names(&raw),
        None => (0..width).map(|i| format!("column{i}")).collect(),
    };

    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let sql_type = if infer_types {
                vote_type(data_rows.iter().filter_map(|row| row.get(i)).map(String::as_str))
            } else {
                SqlType::Varchar
            };
            ColumnSpec::new(name, sql_type)
        })
        .collect()
}

fn modal_width(rows: &[Vec<String>]) -> usize {
    let mut frequency: HashMap<usize, usize> = HashMap::new();
    for row in rows {
        *frequency.entry(row.len()).or_default() += 1;
    }
    frequency
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
        .map_or(0, |(width, _)| width)
}

fn vote_type<'a>(values: impl Iterator<Item = &'a str>) -> SqlType {
    let mut votes: HashMap<FieldKind, usize> = HashMap::new();
    let mut all_integers = true;
    let mut all_bare_dates = true;

    for value in values {
        let kind = classify_field(value);
        let trimmed = strip_quotes(value.trim());
        match kind {
            FieldKind::Empty => continue,
            FieldKind::Number => all_integers &= trimmed.parse::<i64>().is_ok(),
            FieldKind::Date => all_bare_dates &= trimmed.len() == 10,
            _ => {}
        }
        *votes.entry(kind).or_default() += 1;
    }

    let mut ranked: Vec<(FieldKind, usize)> = votes.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    match ranked.as_slice() {
        [] => SqlType::Varchar,
        [(_, top), (_, second), ..] if top == second => SqlType::Varchar,
        [(kind, _), ..] => match kind {
            FieldKind::Number if all_integers => SqlType::Bigint,
            FieldKind::Number => SqlType::Double,
            FieldKind::Date if all_bare_dates => SqlType::Date,
            FieldKind::Bool => SqlType::Boolean,
            _ => SqlType::Varchar,
        },
    }
}

fn sanitize_names(raw: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.iter()
        .enumerate()
        .map(|(i, name)| {
            let cleaned: String = strip_quotes(name.trim())
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect();
            let cleaned = cleaned.trim_matches('_');
            let base = if cleaned.is_empty() {
                format!("column{i}")
            } else if is_identifier(cleaned) {
                cleaned.to_owned()
            } else {
                format!("_{cleaned}")
            };

            let key = base.to_ascii_lowercase();
            let n = seen.entry(key).or_default();
            *n += 1;
            if *n == 1 {
                base
            } else {
                format!("{base}_{n}")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_kinds() {
        assert_eq!(classify_field(""), FieldKind::Empty);
        assert_eq!(classify_field("  \"\" "), FieldKind::Empty);
        assert_eq!(classify_field("42"), FieldKind::Number);
        assert_eq!(classify_field(" -3.5 "), FieldKind::Number);
        assert_eq!(classify_field("\"7\""), FieldKind::Number);
        assert_eq!(classify_field("2024-01-15"), FieldKind::Date);
        assert_eq!(classify_field("2024-01-15T10:00:00Z"), FieldKind::Date);
        assert_eq!(classify_field("TRUE"), FieldKind::Bool);
        assert_eq!(classify_field("name"), FieldKind::String);
        assert_eq!(classify_field("NaN"), FieldKind::String);
        assert_eq!(classify_field("inf"), FieldKind::String);
    }

    #[test]
    fn empty_sample_defaults_to_header_at_zero() {
        let lines: Vec<&str> = Vec::new();
        assert_eq!(
            infer_header_offset(&lines, ','),
            HeaderDetection {
                header_offset: 0,
                has_header: true
            }
        );
    }

    #[test]
    fn conventional_header_detected() {
        let lines = ["id,name", "1,alice", "2,bob"];
        assert_eq!(
            infer_header_offset(&lines, ','),
            HeaderDetection {
                header_offset: 0,
                has_header: true
            }
        );
    }

    #[test]
    fn preamble_is_skipped() {
        let lines = [
            "Export generated 2024-01-15",
            "Source: billing",
            "",
            "id,amount,created",
            "1,9.99,2024-01-01",
            "2,5.00,2024-01-02",
        ];
        let detection = infer_header_offset(&lines, ',');
        assert_eq!(detection.header_offset, 3);
        assert!(detection.has_header);
        assert_eq!(detection.lines_before_data(), 4);
    }

    #[test]
    fn headerless_data_starts_at_first_modal_line() {
        let lines = ["# comment", "a,b,c", "d,e,f", "g,h,i"];
        let detection = infer_header_offset(&lines, ',');
        assert_eq!(detection.header_offset, 1);
        assert!(!detection.has_header);
        assert_eq!(detection.lines_before_data(), 1);
    }

    #[test]
    fn all_data_rows_have_no_header() {
        let lines = ["alice,30,nyc", "bob,25,la"];
        assert_eq!(
            infer_header_offset(&lines, ','),
            HeaderDetection {
                header_offset: 0,
                has_header: false
            }
        );
    }

    #[test]
    fn bool_column_scores_header() {
        let lines = ["name,active", "alice,true", "bob,false"];
        assert!(infer_header_offset(&lines, ',').has_header);
    }

    #[test]
    fn last_line_is_not_a_candidate() {
        // 최빈 필드 수(동률 -> 3)가 마지막 줄에만 있으면 비교할 다음 라인이 없습니다.
        let lines = ["a", "b,c", "d,e,f"];
        assert_eq!(infer_header_offset(&lines, ','), HeaderDetection::default());
    }

    #[test]
    fn single_line_sample_fails_open() {
        let lines = ["a,b,c"];
        assert_eq!(infer_header_offset(&lines, ','), HeaderDetection::default());
    }

    #[test]
    fn custom_delimiter() {
        let lines = ["host;status", "web01;200", "web02;500"];
        let detection = infer_header_offset(&lines, ';');
        assert!(detection.has_header);
        assert_eq!(detection.header_offset, 0);
    }

    #[test]
    fn infer_columns_types_by_majority() {
        let lines = [
            "id,name,score,joined,active",
            "1,alice,9.5,2024-01-01,true",
            "\"bob\",bob,7,2024-01-02,false",
            "3,charlie,8,2024-01-03,true",
        ];
        let columns = infer_columns(&lines, HeaderDetection::default(), b',', true);
        let types: Vec<SqlType> = columns.iter().map(|c| c.sql_type).collect();
        assert_eq!(
            types,
            vec![
                SqlType::Bigint,
                SqlType::Varchar,
                SqlType::Double,
                SqlType::Date,
                SqlType::Boolean
            ]
        );
        assert_eq!(columns[0].name, "id");
    }

    #[test]
    fn infer_columns_without_header_uses_positional_names() {
        let lines = ["a,1", "b,2"];
        let detection = HeaderDetection {
            header_offset: 0,
            has_header: false,
        };
        let columns = infer_columns(&lines, detection, b',', true);
        assert_eq!(columns[0].name, "column0");
        assert_eq!(columns[1].name, "column1");
        assert_eq!(columns[1].sql_type, SqlType::Bigint);
    }

    #[test]
    fn infer_columns_without_typing_is_varchar() {
        let lines = ["id,n", "1,2"];
        let columns = infer_columns(&lines, HeaderDetection::default(), b',', false);
        assert!(columns.iter().all(|c| c.sql_type == SqlType::Varchar));
    }

    #[test]
    fn tied_vote_is_varchar() {
        let lines = ["v", "1", "x"];
        let columns = infer_columns(&lines, HeaderDetection::default(), b',', true);
        assert_eq!(columns[0].sql_type, SqlType::Varchar);
    }

    #[test]
    fn timestamps_stay_text() {
        let lines = ["at", "2024-01-01 10:00:00", "2024-01-02 11:00:00"];
        let columns = infer_columns(&lines, HeaderDetection::default(), b',', true);
        assert_eq!(columns[0].sql_type, SqlType::Varchar);
    }

    #[test]
    fn header_names_are_sanitized_and_deduplicated() {
        let raw: Vec<String> = ["User Name", "user-name", "", "1st", "\"id\""]
            .iter()
            .map(|s| (*s).to_owned())
            .collect();
        assert_eq!(
            sanitize_names(&raw),
            vec!["User_Name", "user_name_2", "column2", "_1st", "id"]
        );
    }

    #[test]
    fn quoted_delimiters_are_respected_when_splitting() {
        assert_eq!(
            split_record("1,\"Smith, J\",x", b','),
            vec!["1", "Smith, J", "x"]
        );
    }

    #[tokio::test]
    async fn sample_reader_drops_truncated_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "id,name\r\n1,alice\r\n2,bo").unwrap();

        // 전체 크기보다 작은 샘플 -> 마지막 조각은 잘린 라인
        let lines = read_sample_lines(&path, 20, 40).await.unwrap();
        assert_eq!(lines, vec!["id,name", "1,alice"]);

        let lines = read_sample_lines(&path, 1024, 40).await.unwrap();
        assert_eq!(lines, vec!["id,name", "1,alice", "2,bo"]);
    }

    #[tokio::test]
    async fn sample_reader_keeps_last_line_at_exact_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let content = "id,name\n1,alice\n2,bob";
        std::fs::write(&path, content).unwrap();

        // 파일 크기와 샘플 크기가 같으면 잘린 것이 아님
        let lines = read_sample_lines(&path, content.len(), 40).await.unwrap();
        assert_eq!(lines, vec!["id,name", "1,alice", "2,bob"]);

        // 경계 바로 뒤가 개행이면 마지막 라인은 온전함
        let lines = read_sample_lines(&path, "id,name\n1,alice".len(), 40)
            .await
            .unwrap();
        assert_eq!(lines, vec!["id,name", "1,alice"]);
    }

    #[tokio::test]
    async fn sniff_csv_header_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "report\n\nid,name\n1,alice\n2,bob\n").unwrap();
        let (detection, lines) = sniff_csv_header(&path, ',', 65536, 40).await.unwrap();
        assert_eq!(detection.header_offset, 2);
        assert!(detection.has_header);
        assert_eq!(lines.len(), 5);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn offset_is_within_sample(lines in prop::collection::vec("[a-z0-9,\"]{0,20}", 0..40)) {
                let detection = infer_header_offset(&lines, ',');
                prop_assert!(detection.header_offset < lines.len().max(1));
            }

            #[test]
            fn arbitrary_text_does_not_panic(text in "\\PC{0,400}") {
                let lines: Vec<&str> = text.split('\n').collect();
                let detection = infer_header_offset(&lines, ',');
                let _ = infer_columns(&lines, detection, b',', true);
            }

            #[test]
            fn numeric_body_under_text_header_is_detected(
                names in prop::collection::vec("[a-z]{1,8}_col", 2..6),
                rows in 1usize..10,
            ) {
                let mut lines = vec![names.join(",")];
                for r in 0..rows {
                    lines.push(vec![r.to_string(); names.len()].join(","));
                }
                let detection = infer_header_offset(&lines, ',');
                prop_assert_eq!(detection, HeaderDetection { header_offset: 0, has_header: true });
            }
        }
    }
}
