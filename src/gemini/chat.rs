//! 채팅 클라이언트 - Gemini generateContent
//!
//! 검색된 컨텍스트와 질문으로 구성된 프롬프트를 보내 답변 텍스트를 받습니다.
//! 쿼리당 한 번 호출되므로 재시도 없이 단일 시도입니다.
//!
//! ref: https://ai.google.dev/gemini-api/docs/text-generation

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

use super::embedding::api_error;
use super::get_api_key;

// ============================================================================
// ChatProvider Trait
// ============================================================================

/// 답변 생성 프로바이더 트레이트
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// 프롬프트에 대한 답변 텍스트 생성
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Google Gemini Chat
// ============================================================================

/// 기본 채팅 모델
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.0-flash";

/// 답변 생성 온도 (사실 기반 QA이므로 낮게)
const TEMPERATURE: f32 = 0.2;
/// 최대 출력 토큰
const MAX_OUTPUT_TOKENS: u32 = 2048;

/// Google Gemini 채팅 구현체
#[derive(Debug)]
pub struct GeminiChat {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

impl GeminiChat {
    /// 새 Gemini 채팅 인스턴스 생성
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Self::with_model(api_key, DEFAULT_CHAT_MODEL)
    }

    /// 모델을 지정하여 생성
    pub fn with_model(api_key: String, model: &str) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            api_key,
            client,
            model: model.to_string(),
        })
    }

    /// 환경변수에서 API 키를 읽어 생성
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = get_api_key()?;
        Self::new(api_key)
    }

    /// generateContent 엔드포인트 URL
    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        )
    }
}

#[async_trait]
impl ChatProvider for GeminiChat {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        // 요청 구성
        let request = GenerateRequest {
            contents: vec![GenerateContent {
                parts: vec![GeneratePart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        // API 호출 (API 키는 헤더로 전송)
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }

        // 응답 파싱 - 첫 번째 candidate의 텍스트
        let generate_response: GenerateResponse = serde_json::from_str(&body)?;

        let text = generate_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();

        if text.is_empty() {
            tracing::warn!("Empty completion from model {}", self.model);
        }

        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<GenerateContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerateContent {
    parts: Vec<GeneratePart>,
}

#[derive(Debug, Serialize)]
struct GeneratePart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    text: String,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_contains_model() {
        let chat = GeminiChat::with_model("fake_key".to_string(), "gemini-2.0-flash").unwrap();
        assert_eq!(
            chat.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_generate_request_serialization() {
        let request = GenerateRequest {
            contents: vec![GenerateContent {
                parts: vec![GeneratePart {
                    text: "question".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: 2048,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "question");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn test_generate_response_parsing() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "TrailMix is available."}]}}
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.candidates.len(), 1);
        assert_eq!(
            parsed.candidates[0].content.parts[0].text,
            "TrailMix is available."
        );
    }

    #[test]
    fn test_generate_response_empty_candidates() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.candidates.is_empty());
    }
}
