//! 형식 카탈로그 -- 알려진 로그 형식의 정적 레지스트리
//!
//! 카탈로그는 한 번 로드된 뒤 변경되지 않습니다. 감지기는 카탈로그 순서대로
//! 형식을 평가하므로, 순서는 동점 처리에 영향을 줍니다.
//!
//! # 카탈로그 구성
//! 1. 내장 카탈로그 (`formats/builtin.yaml`, 바이너리에 포함)
//! 2. 사용자 카탈로그 (`[catalog] path`) -- 같은 slug는 내장 형식을 대체하고,
//!    새 slug는 뒤에 추가됩니다.

pub mod loader;
pub mod types;

pub use loader::CatalogLoader;
pub use types::{ColumnSpec, FormatDescriptor, SqlType};

use logsift_core::config::CatalogConfig;

use crate::error::LogIngestError;

/// 형식 카탈로그
#[derive(Debug, Clone, Default)]
pub struct FormatCatalog {
    formats: Vec<FormatDescriptor>,
}

impl FormatCatalog {
    /// 검증된 형식 목록으로 카탈로그를 생성합니다.
    pub fn new(formats: Vec<FormatDescriptor>) -> Self {
        Self { formats }
    }

    /// 내장 카탈로그
    pub fn builtin() -> Result<Self, LogIngestError> {
        Ok(Self::new(CatalogLoader::builtin()?))
    }

    /// 설정에 따라 내장/사용자 카탈로그를 조합합니다.
    pub async fn load(config: &CatalogConfig) -> Result<Self, LogIngestError> {
        let mut catalog = if config.include_builtin {
            Self::builtin()?
        } else {
            Self::default()
        };

        if !config.path.is_empty() {
            let user = CatalogLoader::load_file(&config.path).await?;
            catalog.merge(user);
        }

        if catalog.is_empty() {
            return Err(LogIngestError::CatalogLoad {
                path: config.path.clone(),
                reason: "catalog contains no formats".to_owned(),
            });
        }

        Ok(catalog)
    }

    /// 다른 형식 목록을 병합합니다.
    ///
    /// 같은 slug는 제자리에서 대체되고 새 slug는 뒤에 추가됩니다.
    pub fn merge(&mut self, formats: Vec<FormatDescriptor>) {
        for format in formats {
            match self.formats.iter_mut().find(|f| f.slug == format.slug) {
                Some(existing) => {
                    tracing::debug!(slug = %format.slug, "user catalog overrides format");
                    *existing = format;
                }
                None => self.formats.push(format),
            }
        }
    }

    /// slug로 형식을 조회합니다.
    pub fn get(&self, slug: &str) -> Option<&FormatDescriptor> {
        self.formats.iter().find(|f| f.slug == slug)
    }

    /// 전체 형식 (카탈로그 순서)
    pub fn formats(&self) -> &[FormatDescriptor] {
        &self.formats
    }

    /// 분류로 필터링합니다 (대소문자 무시, 부분 일치).
    pub fn by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a FormatDescriptor> + 'a {
        let needle = category.to_ascii_lowercase();
        self.formats
            .iter()
            .filter(move |f| f.category.to_ascii_lowercase().contains(&needle))
    }

    /// 구분자 기반 형식 중 첫 번째 (감지 실패 시 `.csv` 파일의 대체 형식)
    pub fn first_delimited(&self) -> Option<&FormatDescriptor> {
        self.formats.iter().find(|f| f.is_delimited())
    }

    /// 형식 수
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    /// 비어있는지 여부
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_format(slug: &str) -> FormatDescriptor {
        FormatDescriptor {
            slug: slug.to_owned(),
            name: "User".to_owned(),
            description: String::new(),
            category: "custom".to_owned(),
            file_extension: ".log".to_owned(),
            regex: Some(r"^(.*)$".to_owned()),
            schema: vec![ColumnSpec::new("line", SqlType::Varchar)],
            sample_line: None,
            default_query: None,
            common_error_codes: Vec::new(),
        }
    }

    #[test]
    fn merge_replaces_same_slug_in_place() {
        let mut catalog = FormatCatalog::builtin().unwrap();
        let before = catalog.len();
        let position = catalog
            .formats()
            .iter()
            .position(|f| f.slug == "syslog_bsd")
            .unwrap();

        catalog.merge(vec![user_format("syslog_bsd")]);

        assert_eq!(catalog.len(), before);
        assert_eq!(catalog.formats()[position].category, "custom");
    }

    #[test]
    fn merge_appends_new_slug() {
        let mut catalog = FormatCatalog::builtin().unwrap();
        let before = catalog.len();
        catalog.merge(vec![user_format("my_app")]);
        assert_eq!(catalog.len(), before + 1);
        assert_eq!(catalog.formats().last().unwrap().slug, "my_app");
    }

    #[test]
    fn category_filter_is_case_insensitive() {
        let catalog = FormatCatalog::builtin().unwrap();
        let web: Vec<_> = catalog.by_category("WEB").collect();
        assert!(web.iter().any(|f| f.slug == "nginx_combined"));
        assert!(web.iter().all(|f| f.category.contains("web")));
    }

    #[test]
    fn first_delimited_is_generic_csv() {
        let catalog = FormatCatalog::builtin().unwrap();
        assert_eq!(catalog.first_delimited().unwrap().slug, "generic_csv");
    }

    #[tokio::test]
    async fn load_without_builtin_or_path_fails() {
        let config = CatalogConfig {
            path: String::new(),
            include_builtin: false,
        };
        assert!(FormatCatalog::load(&config).await.is_err());
    }

    #[tokio::test]
    async fn load_default_config_uses_builtin() {
        let catalog = FormatCatalog::load(&CatalogConfig::default()).await.unwrap();
        assert!(catalog.get("nginx_combined").is_some());
    }
}
