//! 에러 타입 정의
//!
//! 라이브러리 경계에서는 타입이 있는 에러를, CLI 경계에서는 anyhow를 사용합니다.
//! - `DatasetError`: CSV 로딩 실패 (시작 시 치명적)
//! - `ProviderError`: Gemini API 호출 실패 (임베딩/채팅 공통)
//! - `QaError`: 질의응답 파이프라인 실패 (어느 단계인지 구분)

use std::path::PathBuf;

use thiserror::Error;

/// CSV 데이터셋 로딩 에러
#[derive(Debug, Error)]
pub enum DatasetError {
    /// CSV 파일이 존재하지 않음
    #[error("CSV file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// 파일 읽기 실패
    #[error("Failed to read CSV file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV 파싱 실패 (헤더와 컬럼 수 불일치 포함)
    #[error("Malformed CSV in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Gemini API 호출 에러
///
/// 임베딩(embedContent)과 채팅(generateContent) 양쪽에서 공유합니다.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// API 키 미설정
    #[error(
        "API key not found. Set GEMINI_API_KEY or GOOGLE_AI_API_KEY environment variable.\n\
         Get your API key at: https://aistudio.google.com/app/apikey"
    )]
    MissingApiKey,

    /// 인증 실패 (401/403, UNAUTHENTICATED, PERMISSION_DENIED)
    #[error("Authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    /// 잘못된 클라이언트 설정 (지원하지 않는 차원 등)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Rate limit 초과 (재시도 소진)
    #[error("Rate limit exceeded after {retries} retries")]
    RateLimited { retries: u32 },

    /// HTTP 전송 실패 (타임아웃, 연결 실패 등)
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API 에러 응답
    #[error("Gemini API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// 응답 파싱 실패
    #[error("Failed to parse API response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ProviderError {
    /// 인증 관련 에러 여부
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::MissingApiKey | Self::Auth { .. })
    }
}

/// 질의응답 파이프라인 에러
///
/// 실패한 단계(임베딩 vs 답변 생성)를 구분하여 UI에 표시합니다.
#[derive(Debug, Error)]
pub enum QaError {
    /// 쿼리 임베딩 실패
    #[error("Failed to embed query: {0}")]
    Embedding(#[source] ProviderError),

    /// 답변 생성 실패
    #[error("Completion request failed: {0}")]
    Completion(#[source] ProviderError),
}

impl QaError {
    /// 내부 프로바이더 에러 참조
    pub fn provider_error(&self) -> &ProviderError {
        match self {
            Self::Embedding(e) | Self::Completion(e) => e,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
