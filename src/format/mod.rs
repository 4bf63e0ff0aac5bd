//! 응답 포맷터 - 답변과 출처 행 렌더링
//!
//! 답변은 `"Result: ..."` 형태로, 출처 행은 Brand 필드를 굵게 표시한
//! 마크다운 리스트 줄로 렌더링합니다. Brand 필드는 구조화된 lookup으로
//! 찾으므로 필드가 없는 행도 안전하게 처리됩니다.

use crate::loader::RowDocument;
use crate::qa::AnswerResult;

/// 굵게 표시할 필드 이름
const BRAND_FIELD: &str = "Brand";

/// 필드 구분자
const FIELD_SEPARATOR: &str = " | ";

// ============================================================================
// Formatting
// ============================================================================

/// 답변 텍스트 렌더링
pub fn format_result(answer: &str) -> String {
    format!("Result: {}", answer)
}

/// 출처 행 한 줄 렌더링 (마크다운)
///
/// Brand 필드가 있으면 `- **Brand: 값** | 나머지 필드...` 형태로,
/// 없으면 전체 행을 굵은 표시 없이 한 줄로 렌더링합니다.
pub fn format_source_line(doc: &RowDocument) -> String {
    let fragments: Vec<String> = doc
        .fields
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect();

    match doc.field(BRAND_FIELD) {
        Some(brand) => {
            let bold_brand = format!("**{}: {}**", BRAND_FIELD, brand);
            let brand_prefix = format!("{}:", BRAND_FIELD);
            let others: Vec<&String> = fragments
                .iter()
                .filter(|f| !f.starts_with(&brand_prefix))
                .collect();

            if others.is_empty() {
                format!("- {}", bold_brand)
            } else {
                format!(
                    "- {}{}{}",
                    bold_brand,
                    FIELD_SEPARATOR,
                    others
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(FIELD_SEPARATOR)
                )
            }
        }
        // Brand 필드가 없는 행 - 전체를 굵은 표시 없이 렌더링
        None => format!("- {}", fragments.join(FIELD_SEPARATOR)),
    }
}

/// 모든 출처 행 렌더링
pub fn format_sources(result: &AnswerResult) -> Vec<String> {
    result.sources.iter().map(format_source_line).collect()
}

/// 답변 + 출처 전체 블록 렌더링 (CLI 출력용)
pub fn format_answer(result: &AnswerResult) -> String {
    let mut output = format_result(&result.answer);

    if !result.sources.is_empty() {
        output.push_str("\n\nSources:\n");
        output.push_str(&format_sources(result).join("\n"));
    }

    output
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn doc(fields: Vec<(&str, &str)>) -> RowDocument {
        RowDocument {
            source: PathBuf::from("test.csv"),
            row_index: 0,
            fields: fields
                .into_iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_format_result() {
        assert_eq!(format_result("TrailMix is cheap."), "Result: TrailMix is cheap.");
    }

    #[test]
    fn test_source_line_bolds_brand() {
        let doc = doc(vec![("Brand", "TrailMix"), ("Size", "8oz"), ("Price", "$5")]);
        assert_eq!(
            format_source_line(&doc),
            "- **Brand: TrailMix** | Size: 8oz | Price: $5"
        );
    }

    #[test]
    fn test_source_line_brand_not_first_column() {
        let doc = doc(vec![("Size", "8oz"), ("Brand", "TrailMix"), ("Price", "$5")]);
        // Brand가 앞으로 오고 나머지는 컬럼 순서 유지
        assert_eq!(
            format_source_line(&doc),
            "- **Brand: TrailMix** | Size: 8oz | Price: $5"
        );
    }

    #[test]
    fn test_source_line_without_brand_does_not_panic() {
        let doc = doc(vec![("Name", "Jerky"), ("Price", "$7")]);
        assert_eq!(format_source_line(&doc), "- Name: Jerky | Price: $7");
    }

    #[test]
    fn test_source_line_brand_only() {
        let doc = doc(vec![("Brand", "TrailMix")]);
        assert_eq!(format_source_line(&doc), "- **Brand: TrailMix**");
    }

    #[test]
    fn test_format_answer_block() {
        let result = AnswerResult {
            answer: "TrailMix.".to_string(),
            sources: vec![doc(vec![("Brand", "TrailMix"), ("Size", "8oz")])],
        };

        let block = format_answer(&result);
        assert!(block.starts_with("Result: TrailMix."));
        assert!(block.contains("- **Brand: TrailMix** | Size: 8oz"));
    }

    #[test]
    fn test_format_answer_no_sources() {
        let result = AnswerResult {
            answer: "I don't know.".to_string(),
            sources: vec![],
        };

        assert_eq!(format_answer(&result), "Result: I don't know.");
    }
}
