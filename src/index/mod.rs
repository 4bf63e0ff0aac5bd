//! 인메모리 벡터 인덱스 - 코사인 유사도 검색
//!
//! 시작 시 모든 행 문서를 임베딩하여 메모리에 보관하고,
//! 쿼리 임베딩과의 코사인 유사도로 top-k 검색을 제공합니다.
//! 영속화하지 않으며 프로세스 종료 시 사라집니다. CSV가 바뀌면
//! 재시작해야 반영됩니다.

use crate::error::ProviderError;
use crate::gemini::EmbeddingProvider;
use crate::loader::RowDocument;

// ============================================================================
// Types
// ============================================================================

/// 인덱스 엔트리 - 문서와 임베딩 쌍
#[derive(Debug, Clone)]
struct IndexEntry {
    document: RowDocument,
    embedding: Vec<f32>,
}

/// 검색 결과 - 유사도 점수가 붙은 문서
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    /// 행 문서
    pub document: RowDocument,
    /// 코사인 유사도 (-1.0 ~ 1.0)
    pub similarity: f32,
}

// ============================================================================
// MemoryIndex
// ============================================================================

/// 인메모리 벡터 인덱스
///
/// 빌드 후 읽기 전용입니다. 행 수가 CSV 하나 분량이므로
/// 전수 코사인 비교로 충분합니다.
pub struct MemoryIndex {
    entries: Vec<IndexEntry>,
    dimension: usize,
}

impl MemoryIndex {
    /// 문서 목록을 임베딩하여 인덱스 빌드
    ///
    /// 행마다 한 번씩 임베딩을 호출합니다 (프로바이더가 속도를 조절).
    /// 임베딩 실패는 그대로 전파되며 시작을 중단시켜야 합니다.
    ///
    /// # Arguments
    /// * `documents` - 로드된 행 문서 목록
    /// * `embedder` - 임베딩 프로바이더
    pub async fn build(
        documents: Vec<RowDocument>,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Self, ProviderError> {
        let total = documents.len();
        let mut entries = Vec::with_capacity(total);

        for (i, document) in documents.into_iter().enumerate() {
            tracing::debug!("Embedding row {}/{}", i + 1, total);
            let embedding = embedder.embed(&document.page_content()).await?;
            entries.push(IndexEntry {
                document,
                embedding,
            });
        }

        tracing::info!("Built vector index: {} rows", entries.len());

        Ok(Self {
            entries,
            dimension: embedder.dimension(),
        })
    }

    /// 쿼리 임베딩으로 top-k 검색
    ///
    /// 모든 엔트리와의 코사인 유사도를 계산하여 내림차순 정렬 후
    /// 상위 `limit`개를 반환합니다.
    pub fn search(&self, query_embedding: &[f32], limit: usize) -> Vec<ScoredDocument> {
        let mut scored: Vec<ScoredDocument> = self
            .entries
            .iter()
            .map(|entry| ScoredDocument {
                document: entry.document.clone(),
                similarity: cosine_similarity(&entry.embedding, query_embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        scored
    }

    /// 인덱스된 행 수
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 인덱스가 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 임베딩 차원
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 코사인 유사도 계산
///
/// 두 벡터 간의 코사인 유사도를 계산합니다.
/// 결과는 -1.0 ~ 1.0 범위입니다. 길이가 다르거나 빈 벡터면 0.0입니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

// ============================================================================
// Tests
// ============================================================================
