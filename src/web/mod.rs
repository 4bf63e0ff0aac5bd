//! 웹 UI - 단일 입력창 질의응답 셸
//!
//! 질문 입력창 하나와 출력 영역 하나로 구성된 페이지를 서빙하고,
//! `POST /api/ask`로 질의응답 파이프라인을 호출합니다.
//! 답변과 출처는 마크다운으로 렌더링 후 sanitize하여 내려보냅니다.
//! 쿼리 실패는 에러 메시지로 표시되며 셸은 다음 질문을 받을 수 있습니다.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::QaError;
use crate::format::{format_result, format_sources};
use crate::qa::{AnswerResult, RetrievalQa};

// ============================================================================
// Server
// ============================================================================

#[derive(Clone)]
struct AppState {
    qa: Arc<RetrievalQa>,
}

/// 웹 서버 실행
///
/// 종료될 때까지 블록합니다.
///
/// # Arguments
/// * `addr` - 바인드 주소
/// * `qa` - 빌드 완료된 질의응답기
pub async fn start_server(addr: SocketAddr, qa: Arc<RetrievalQa>) -> Result<()> {
    let state = AppState { qa };

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/api/ask", post(ask_handler))
        .route("/health", get(health_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Web UI listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Web server error")?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// 질문 요청
#[derive(Debug, Deserialize)]
struct AskRequest {
    question: String,
}

/// 질문 응답 (렌더링된 HTML)
#[derive(Debug, Serialize)]
struct AskResponse {
    /// "Result: ..." 답변 영역 HTML
    result_html: String,
    /// 출처 목록 HTML (출처가 없으면 빈 문자열)
    sources_html: String,
}

/// API 에러 응답
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
        }
    }
}

impl From<&QaError> for ApiError {
    fn from(err: &QaError) -> Self {
        // 인증 실패는 401, 나머지 업스트림 실패는 502
        let status = if err.provider_error().is_auth() {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::BAD_GATEWAY
        };

        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "rows": state.qa.row_count(),
    }))
}

async fn ask_handler(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    // 빈 질문은 파이프라인을 호출하지 않음
    if request.question.trim().is_empty() {
        return Err(ApiError::bad_request("Question is empty"));
    }

    let result = state.qa.ask(request.question.trim()).await.map_err(|e| {
        tracing::warn!("Query failed: {}", e);
        ApiError::from(&e)
    })?;

    Ok(Json(build_response(&result)))
}

/// 답변 결과를 렌더링된 응답으로 변환
fn build_response(result: &AnswerResult) -> AskResponse {
    let sources_markdown = format_sources(result).join("\n");

    AskResponse {
        result_html: render_markdown(&format_result(&result.answer)),
        sources_html: if sources_markdown.is_empty() {
            String::new()
        } else {
            render_markdown(&sources_markdown)
        },
    }
}

/// 마크다운을 sanitize된 HTML로 렌더링
///
/// 모델 출력이 그대로 브라우저에 들어가므로 ammonia로 정리합니다.
fn render_markdown(markdown: &str) -> String {
    use pulldown_cmark::{html, Options, Parser};

    let parser = Parser::new_ext(markdown, Options::empty());
    let mut rendered = String::new();
    html::push_html(&mut rendered, parser);

    ammonia::clean(&rendered)
}

// ============================================================================
// Page
// ============================================================================

/// 단일 페이지 UI
///
/// 입력창 하나 + 출력 영역 하나. 요청 중에는 입력을 비활성화하고,
/// 응답이 오면 이전 출력을 교체합니다.
const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="ko">
<head>
<meta charset="utf-8">
<title>rowchat</title>
<style>
  body { font-family: sans-serif; max-width: 720px; margin: 2rem auto; padding: 0 1rem; }
  #question { width: 100%; padding: 0.5rem; font-size: 1rem; box-sizing: border-box; }
  #result { margin-top: 1.5rem; }
  #sources-box { display: none; margin-top: 1rem; }
  #sources ul { padding-left: 1.2rem; }
  .error { color: #c0392b; }
</style>
</head>
<body>
<h1>rowchat</h1>
<form id="ask-form">
  <input id="question" type="text" placeholder="질문을 입력하세요" autocomplete="off" autofocus>
</form>
<div id="result"></div>
<details id="sources-box">
  <summary>출처 문서 보기</summary>
  <div id="sources"></div>
</details>
<script>
const form = document.getElementById('ask-form');
const input = document.getElementById('question');
const result = document.getElementById('result');
const sourcesBox = document.getElementById('sources-box');
const sources = document.getElementById('sources');

form.addEventListener('submit', async (e) => {
  e.preventDefault();
  const question = input.value.trim();
  if (!question) return;

  input.disabled = true;
  result.textContent = '답변 생성 중...';
  sourcesBox.style.display = 'none';
  sourcesBox.open = false;

  try {
    const res = await fetch('/api/ask', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify({ question }),
    });
    const data = await res.json();

    if (!res.ok) {
      result.innerHTML = '<p class="error"></p>';
      result.firstChild.textContent = data.error || res.statusText;
      return;
    }

    result.innerHTML = data.result_html;
    if (data.sources_html) {
      sources.innerHTML = data.sources_html;
      sourcesBox.style.display = 'block';
    }
  } catch (err) {
    result.innerHTML = '<p class="error"></p>';
    result.firstChild.textContent = String(err);
  } finally {
    input.disabled = false;
    input.focus();
  }
});
</script>
</body>
</html>
"#;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::gemini::{ChatProvider, EmbeddingProvider};
    use crate::index::MemoryIndex;
    use crate::loader::RowDocument;
    use async_trait::async_trait;
    use std::path::PathBuf;

    struct MockEmbedder;

    #[async_trait]
    impl EmbeddingProvider for MockEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            Ok(vec![1.0, 0.0])
        }

        fn dimension(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    struct MockChat;

    #[async_trait]
    impl ChatProvider for MockChat {
        async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
            Ok("TrailMix is available in 8oz for $5.".to_string())
        }

        fn name(&self) -> &str {
            "mock-chat"
        }
    }

    fn trailmix_row() -> RowDocument {
        RowDocument {
            source: PathBuf::from("data/Hiker_Food.csv"),
            row_index: 0,
            fields: vec![
                ("Brand".to_string(), "TrailMix".to_string()),
                ("Size".to_string(), "8oz".to_string()),
                ("Price".to_string(), "$5".to_string()),
            ],
        }
    }

    async fn test_state() -> AppState {
        let index = MemoryIndex::build(vec![trailmix_row()], &MockEmbedder)
            .await
            .unwrap();
        let qa = RetrievalQa::new(index, Arc::new(MockEmbedder), Arc::new(MockChat));
        AppState { qa: Arc::new(qa) }
    }

    #[test]
    fn test_render_markdown_bold() {
        let html = render_markdown("- **Brand: TrailMix** | Size: 8oz");
        assert!(html.contains("<strong>Brand: TrailMix</strong>"));
        assert!(html.contains("<li>"));
    }

    #[test]
    fn test_render_markdown_strips_script() {
        let html = render_markdown("hello <script>alert(1)</script> world");
        assert!(!html.contains("<script>"));
        assert!(html.contains("hello"));
    }

    #[tokio::test]
    async fn test_empty_question_rejected_without_pipeline() {
        let state = test_state().await;

        let result = ask_handler(
            State(state),
            Json(AskRequest {
                question: "   ".to_string(),
            }),
        )
        .await;

        let err = result.err().unwrap();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_end_to_end_trailmix_scenario() {
        let state = test_state().await;

        let response = ask_handler(
            State(state),
            Json(AskRequest {
                question: "What trail mix options are there?".to_string(),
            }),
        )
        .await
        .unwrap();

        assert!(response.0.result_html.contains("Result: TrailMix is available"));
        assert!(response
            .0
            .sources_html
            .contains("<strong>Brand: TrailMix</strong> | Size: 8oz | Price: $5"));
    }

    #[tokio::test]
    async fn test_health_reports_rows() {
        let state = test_state().await;
        assert_eq!(state.qa.row_count(), 1);
    }

    #[test]
    fn test_auth_error_maps_to_401() {
        let err = QaError::Completion(ProviderError::Auth {
            status: 401,
            message: "bad key".to_string(),
        });
        let api_err = ApiError::from(&err);
        assert_eq!(api_err.status, StatusCode::UNAUTHORIZED);

        let err = QaError::Completion(ProviderError::Api {
            status: 500,
            message: "boom".to_string(),
        });
        let api_err = ApiError::from(&err);
        assert_eq!(api_err.status, StatusCode::BAD_GATEWAY);
    }
}
