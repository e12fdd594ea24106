#![no_main]

use libfuzzer_sys::fuzz_target;
use logsift_ingest::catalog::CatalogLoader;

fuzz_target!(|data: &[u8]| {
    // YAML 파서는 &str을 받으므로 UTF-8 변환 필요
    if let Ok(yaml_str) = std::str::from_utf8(data) {
        // 검증을 통과한 형식은 정규식이 컴파일되어야 함
        if let Ok(formats) = CatalogLoader::parse_yaml(yaml_str, "fuzz-input.yaml") {
            for format in &formats {
                assert!(format.validate().is_ok());
            }
        }
    }
});
