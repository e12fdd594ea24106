//! 카탈로그 로더 -- YAML 형식 정의 파일을 파싱합니다.
//!
//! 내장 카탈로그는 바이너리에 포함되며, 사용자 카탈로그는 디스크에서 읽습니다.
//! 어느 쪽이든 하나의 정의라도 잘못되면 전체 로딩이 실패합니다.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::LogIngestError;

use super::types::FormatDescriptor;

/// 카탈로그 파일 최대 크기
const MAX_CATALOG_FILE_SIZE: u64 = 4 * 1024 * 1024; // 4MB
/// 카탈로그 하나에 허용되는 최대 형식 수
const MAX_FORMATS_COUNT: usize = 1_000;

/// 내장 카탈로그 원문
const BUILTIN_CATALOG: &str = include_str!("../../formats/builtin.yaml");

/// 카탈로그 파일 최상위 구조
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    formats: Vec<FormatDescriptor>,
}

/// 카탈로그 로더
pub struct CatalogLoader;

impl CatalogLoader {
    /// 내장 카탈로그를 파싱합니다.
    pub fn builtin() -> Result<Vec<FormatDescriptor>, LogIngestError> {
        Self::parse_yaml(BUILTIN_CATALOG, "<builtin>")
    }

    /// 디스크의 YAML 카탈로그 파일을 로드합니다.
    ///
    /// # Errors
    /// - 파일을 읽을 수 없거나 크기 제한을 넘는 경우
    /// - YAML 파싱 또는 형식 검증에 실패한 경우
    pub async fn load_file(
        path: impl AsRef<Path>,
    ) -> Result<Vec<FormatDescriptor>, LogIngestError> {
        let path = path.as_ref();

        let metadata =
            tokio::fs::metadata(path)
                .await
                .map_err(|e| LogIngestError::CatalogLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to read file metadata: {e}"),
                })?;

        if metadata.len() > MAX_CATALOG_FILE_SIZE {
            return Err(LogIngestError::CatalogLoad {
                path: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max: {MAX_CATALOG_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| LogIngestError::CatalogLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to read file: {e}"),
                })?;

        let formats = Self::parse_yaml(&content, &path.display().to_string())?;

        tracing::info!(
            path = %path.display(),
            count = formats.len(),
            "loaded format catalog"
        );

        Ok(formats)
    }

    /// YAML 문자열을 파싱하여 형식 목록을 생성합니다.
    ///
    /// 각 형식을 검증하고 slug 중복을 거부합니다.
    pub fn parse_yaml(yaml_str: &str, source: &str) -> Result<Vec<FormatDescriptor>, LogIngestError> {
        let file: CatalogFile =
            serde_yaml::from_str(yaml_str).map_err(|e| LogIngestError::CatalogLoad {
                path: source.to_owned(),
                reason: format!("YAML parse error: {e}"),
            })?;

        if file.formats.len() > MAX_FORMATS_COUNT {
            return Err(LogIngestError::CatalogLoad {
                path: source.to_owned(),
                reason: format!("too many formats: max {MAX_FORMATS_COUNT}"),
            });
        }

        let mut seen = HashSet::new();
        for format in &file.formats {
            format.validate()?;
            if !seen.insert(format.slug.as_str()) {
                return Err(LogIngestError::CatalogLoad {
                    path: source.to_owned(),
                    reason: format!("duplicate format slug '{}'", format.slug),
                });
            }
        }

        Ok(file.formats)
    }
}
