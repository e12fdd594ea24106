//! 물리적 라인 읽기
//!
//! 라인 번호는 항상 원본 파일의 물리적 라인 기준(1부터)입니다.
//! 빈 줄은 건너뛰지만 번호는 유지합니다.

use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::LogIngestError;

/// 파일 전체를 UTF-8 텍스트로 읽습니다.
///
/// 유효하지 않은 바이트가 있으면 해당 물리적 라인 번호와 함께 실패합니다.
pub(crate) fn read_text(path: &Path) -> Result<String, LogIngestError> {
    let bytes = std::fs::read(path)?;
    String::from_utf8(bytes).map_err(|e| {
        let valid = e.utf8_error().valid_up_to();
        let line = e.as_bytes()[..valid]
            .iter()
            .filter(|b| **b == b'\n')
            .count()
            + 1;
        LogIngestError::Decode {
            path: path.display().to_string(),
            line,
        }
    })
}

/// 파일이 UTF-8인지 라인 단위로 확인합니다 (파일 전체를 메모리에 올리지 않음).
///
/// 개행 바이트는 멀티바이트 문자 안에 나타나지 않으므로 라인별 검사로 충분합니다.
pub(crate) async fn ensure_utf8(path: &Path) -> Result<(), LogIngestError> {
    let file = tokio::fs::File::open(path).await?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut line = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        line += 1;
        if std::str::from_utf8(&buf).is_err() {
            return Err(LogIngestError::Decode {
                path: path.display().to_string(),
                line,
            });
        }
    }
}

/// `(라인 번호, 라인)` 목록. `\r\n`의 `\r`과 빈 줄을 제거합니다.
pub(crate) fn non_blank_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split('\n')
        .enumerate()
        .map(|(i, line)| (i + 1, line.strip_suffix('\r').unwrap_or(line)))
        .filter(|(_, line)| !line.trim().is_empty())
}

/// 앞의 `lines` 개 물리적 라인을 건너뛴 바이트 위치
pub(crate) fn offset_after_lines(text: &str, lines: usize) -> usize {
    if lines == 0 {
        return 0;
    }
    text.match_indices('\n')
        .nth(lines - 1)
        .map_or(text.len(), |(pos, _)| pos + 1)
}

/// 문자열 끝의 개행 문자를 모두 제거합니다.
pub(crate) fn trim_line_end(raw: &str) -> &str {
    raw.trim_end_matches(['\r', '\n'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn numbering_survives_blank_lines_and_crlf() {
        let text = "a\r\n\r\nb\n   \nc\n";
        let lines: Vec<_> = non_blank_lines(text).collect();
        assert_eq!(lines, vec![(1, "a"), (3, "b"), (5, "c")]);
    }

    #[test]
    fn offset_skips_physical_lines() {
        let text = "# preamble\nid,name\n1,a\n";
        assert_eq!(offset_after_lines(text, 0), 0);
        assert_eq!(&text[offset_after_lines(text, 2)..], "1,a\n");
        assert_eq!(offset_after_lines(text, 10), text.len());
    }

    #[test]
    fn line_end_is_trimmed() {
        assert_eq!(trim_line_end("1,a\r\n"), "1,a");
        assert_eq!(trim_line_end("1,a\r"), "1,a");
        assert_eq!(trim_line_end("1,a"), "1,a");
    }

    #[test]
    fn invalid_utf8_reports_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"ok\nstill ok\nbad \xff byte\n").unwrap();
        let err = read_text(file.path()).unwrap_err();
        assert!(matches!(err, LogIngestError::Decode { line: 3, .. }));
    }

    #[tokio::test]
    async fn utf8_check_matches_read_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"id,name\n1,alice\n2,bo\xff\xfeb\n3,carol\n").unwrap();
        let err = ensure_utf8(file.path()).await.unwrap_err();
        assert!(matches!(err, LogIngestError::Decode { line: 3, .. }));

        let mut ok = tempfile::NamedTempFile::new().unwrap();
        ok.write_all("ts,msg\n1,caf\u{e9}\n".as_bytes()).unwrap();
        ensure_utf8(ok.path()).await.unwrap();
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_text(Path::new("/nonexistent/logsift/input.log")).unwrap_err();
        assert!(matches!(err, LogIngestError::Io(_)));
    }
}
