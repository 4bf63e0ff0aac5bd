//! Gemini API 모듈 - 임베딩 및 답변 생성
//!
//! 텍스트 임베딩(embedContent)과 채팅 답변 생성(generateContent)을 담당하는
//! Gemini API 클라이언트입니다. API 키는 환경변수에서 읽습니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = GeminiEmbedding::from_env()?;
//! let vector = embedder.embed("Hello, world!").await?;
//!
//! let chat = GeminiChat::from_env()?;
//! let answer = chat.complete("What is RAG?").await?;
//! ```

mod chat;
mod embedding;

pub use chat::{ChatProvider, GeminiChat, DEFAULT_CHAT_MODEL};
pub use embedding::{EmbeddingProvider, GeminiEmbedding, DEFAULT_DIMENSION};

use crate::error::ProviderError;

// ============================================================================
// API Key Management
// ============================================================================

/// API 키 로드 (환경변수에서)
///
/// 우선순위:
/// 1. `GEMINI_API_KEY` 환경변수
/// 2. `GOOGLE_AI_API_KEY` 환경변수
pub fn get_api_key() -> Result<String, ProviderError> {
    // 1. GEMINI_API_KEY 확인
    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            tracing::debug!("Using API key from GEMINI_API_KEY");
            return Ok(key);
        }
    }

    // 2. GOOGLE_AI_API_KEY 확인 (대체)
    if let Ok(key) = std::env::var("GOOGLE_AI_API_KEY") {
        if !key.is_empty() {
            tracing::debug!("Using API key from GOOGLE_AI_API_KEY");
            return Ok(key);
        }
    }

    Err(ProviderError::MissingApiKey)
}

/// API 키 존재 여부 확인
pub fn has_api_key() -> bool {
    get_api_key().is_ok()
}

// ============================================================================
// Tests
// ============================================================================
