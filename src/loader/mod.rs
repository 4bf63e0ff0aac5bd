//! 데이터셋 로더 - CSV 파일을 행 문서로 변환
//!
//! CSV의 각 데이터 행을 하나의 `RowDocument`로 만듭니다.
//! 컬럼은 구조화된 (이름, 값) 쌍으로 보관하고, 임베딩용 텍스트는
//! `"컬럼: 값"` 줄로 렌더링합니다. 필드 조회는 부분 문자열 검색이 아닌
//! 명시적 lookup입니다.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::DatasetError;

// ============================================================================
// Types
// ============================================================================

/// 행 문서 - CSV 한 행의 구조화된 표현
///
/// 로드 후 불변이며 프로세스 수명 동안 유지됩니다.
#[derive(Debug, Clone, Serialize)]
pub struct RowDocument {
    /// 원본 CSV 파일 경로
    pub source: PathBuf,
    /// 데이터 행 인덱스 (0부터, 헤더 제외)
    pub row_index: usize,
    /// 컬럼 (이름, 값) 쌍 - 헤더 순서 유지
    pub fields: Vec<(String, String)>,
}

impl RowDocument {
    /// 임베딩/컨텍스트용 텍스트 렌더링
    ///
    /// 모든 컬럼을 `"컬럼: 값"` 형태로 줄바꿈 연결합니다.
    pub fn page_content(&self) -> String {
        self.fields
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 컬럼 이름으로 값 조회
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

// ============================================================================
// Loader
// ============================================================================

/// CSV 파일을 행 문서 목록으로 로드
///
/// 헤더 행이 컬럼 이름을 정의하며, 데이터 행마다 문서 하나를 만듭니다.
/// 헤더와 컬럼 수가 다른 행은 파싱 에러로 처리합니다.
///
/// # Arguments
/// * `path` - CSV 파일 경로 (UTF-8)
///
/// # Returns
/// 행 순서대로 정렬된 문서 목록
pub fn load_dataset(path: &Path) -> Result<Vec<RowDocument>, DatasetError> {
    if !path.exists() {
        return Err(DatasetError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let file = std::fs::File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| DatasetError::Parse {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut documents = Vec::new();

    for (row_index, record) in reader.records().enumerate() {
        let record = record.map_err(|source| DatasetError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let fields = headers
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let value = record.get(i).unwrap_or("").trim().to_string();
                (name.clone(), value)
            })
            .collect();

        documents.push(RowDocument {
            source: path.to_path_buf(),
            row_index,
            fields,
        });
    }

    tracing::info!(
        "Loaded dataset: {} ({} rows, {} columns)",
        path.display(),
        documents.len(),
        headers.len()
    );

    Ok(documents)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_one_document_per_row() {
        let file = write_csv("Brand,Size,Price\nTrailMix,8oz,$5\nNutBar,2oz,$2\n");
        let docs = load_dataset(file.path()).unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].row_index, 0);
        assert_eq!(docs[1].row_index, 1);
    }

    #[test]
    fn test_page_content_contains_all_columns() {
        let file = write_csv("Brand,Size,Price\nTrailMix,8oz,$5\n");
        let docs = load_dataset(file.path()).unwrap();

        let content = docs[0].page_content();
        assert_eq!(content, "Brand: TrailMix\nSize: 8oz\nPrice: $5");
    }

    #[test]
    fn test_field_lookup() {
        let file = write_csv("Brand,Size\nTrailMix,8oz\n");
        let docs = load_dataset(file.path()).unwrap();

        assert_eq!(docs[0].field("Brand"), Some("TrailMix"));
        assert_eq!(docs[0].field("Size"), Some("8oz"));
        assert_eq!(docs[0].field("Weight"), None);
    }

    #[test]
    fn test_missing_file() {
        let result = load_dataset(Path::new("does/not/exist.csv"));
        assert!(matches!(result, Err(DatasetError::FileNotFound { .. })));
    }

    #[test]
    fn test_ragged_row_is_parse_error() {
        // 헤더는 3 컬럼, 두 번째 행은 2 컬럼
        let file = write_csv("Brand,Size,Price\nTrailMix,8oz,$5\nNutBar,2oz\n");
        let result = load_dataset(file.path());
        assert!(matches!(result, Err(DatasetError::Parse { .. })));
    }

    #[test]
    fn test_empty_dataset() {
        let file = write_csv("Brand,Size,Price\n");
        let docs = load_dataset(file.path()).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_values_are_trimmed() {
        let file = write_csv("Brand,Size\n TrailMix , 8oz \n");
        let docs = load_dataset(file.path()).unwrap();
        assert_eq!(docs[0].field("Brand"), Some("TrailMix"));
    }
}
