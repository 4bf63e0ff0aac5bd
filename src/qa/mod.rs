//! 질의응답 파이프라인 - 검색 증강 생성 (RAG)
//!
//! 질문을 임베딩하여 인덱스에서 top-k 행을 찾고, 찾은 행 텍스트를
//! 컨텍스트로 붙인 프롬프트로 답변을 생성합니다. 캐시나 대화 상태 없이
//! 매 질문마다 임베딩-검색-생성 전체를 수행합니다.

use std::sync::Arc;

use crate::error::QaError;
use crate::gemini::{ChatProvider, EmbeddingProvider};
use crate::index::MemoryIndex;
use crate::loader::RowDocument;

// ============================================================================
// Types
// ============================================================================

/// 검색 결과 기본 개수 (top-k)
pub const DEFAULT_TOP_K: usize = 4;

/// 답변 결과
///
/// 생성된 답변 텍스트와 근거로 사용된 행 문서 목록 (검색 순서 유지).
#[derive(Debug, Clone)]
pub struct AnswerResult {
    /// 모델이 생성한 답변 텍스트
    pub answer: String,
    /// 컨텍스트로 사용된 행 문서 (유사도 내림차순)
    pub sources: Vec<RowDocument>,
}

// ============================================================================
// RetrievalQa
// ============================================================================

/// 검색 증강 질의응답기
///
/// 빌드된 인덱스를 소유하며, 질문당 한 번의 임베딩 호출과
/// 한 번의 답변 생성 호출을 수행합니다.
pub struct RetrievalQa {
    index: MemoryIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatProvider>,
    top_k: usize,
}

impl RetrievalQa {
    /// 새 질의응답기 생성 (top-k 기본값 사용)
    pub fn new(
        index: MemoryIndex,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatProvider>,
    ) -> Self {
        Self::with_top_k(index, embedder, chat, DEFAULT_TOP_K)
    }

    /// top-k를 지정하여 생성
    pub fn with_top_k(
        index: MemoryIndex,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            chat,
            top_k,
        }
    }

    /// 질문에 답변
    ///
    /// 1. 질문 임베딩
    /// 2. 인덱스에서 top-k 행 검색
    /// 3. 컨텍스트 + 질문 프롬프트 구성
    /// 4. 답변 생성
    ///
    /// 실패는 단계를 구분한 `QaError`로 전파됩니다.
    pub async fn ask(&self, question: &str) -> Result<AnswerResult, QaError> {
        // 1. 질문 임베딩
        let query_embedding = self
            .embedder
            .embed_query(question)
            .await
            .map_err(QaError::Embedding)?;

        // 2. top-k 검색
        let hits = self.index.search(&query_embedding, self.top_k);

        tracing::debug!("Retrieved {} rows for question", hits.len());

        // 3. 프롬프트 구성
        let sources: Vec<RowDocument> = hits.into_iter().map(|h| h.document).collect();
        let prompt = build_prompt(&sources, question);

        // 4. 답변 생성
        let answer = self
            .chat
            .complete(&prompt)
            .await
            .map_err(QaError::Completion)?;

        Ok(AnswerResult { answer, sources })
    }

    /// 인덱스된 행 수
    pub fn row_count(&self) -> usize {
        self.index.len()
    }
}

/// "stuff" 방식 프롬프트 구성
///
/// 검색된 모든 행 텍스트를 컨텍스트 블록으로 붙이고 질문을 뒤에 둡니다.
/// 모르면 모른다고 답하도록 지시하여 행 밖의 내용을 지어내지 않게 합니다.
fn build_prompt(sources: &[RowDocument], question: &str) -> String {
    let context = sources
        .iter()
        .map(|doc| doc.page_content())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Use the following pieces of context to answer the question at the end. \
         If you don't know the answer, just say that you don't know, \
         don't try to make up an answer.\n\n\
         {}\n\n\
         Question: {}\n\
         Helpful Answer:",
        context, question
    )
}

// ============================================================================
// Tests
// ============================================================================
