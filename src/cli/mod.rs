//! CLI 모듈
//!
//! rowchat CLI 명령어 정의 및 구현
//! - serve: 데이터셋 로드 → 인덱스 빌드 → 웹 UI 서버 실행
//! - ask: 터미널에서 단일 질문
//! - status: 상태 확인

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::format::format_answer;
use crate::gemini::{has_api_key, GeminiChat, GeminiEmbedding};
use crate::index::MemoryIndex;
use crate::loader::load_dataset;
use crate::qa::{RetrievalQa, DEFAULT_TOP_K};
use crate::web::start_server;

/// 기본 CSV 데이터셋 경로
const DEFAULT_DATASET: &str = "data/Hiker_Food.csv";

/// 기본 바인드 주소
const DEFAULT_ADDR: &str = "127.0.0.1:8080";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "rowchat")]
#[command(version, about = "CSV 질의응답 RAG 챗봇", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 웹 UI 서버 실행
    Serve {
        /// CSV 데이터셋 경로
        #[arg(short, long, default_value = DEFAULT_DATASET)]
        file: PathBuf,

        /// 바인드 주소
        #[arg(short, long, default_value = DEFAULT_ADDR)]
        addr: String,

        /// 질문당 검색할 행 수 (top-k)
        #[arg(short, long, default_value_t = DEFAULT_TOP_K)]
        limit: usize,
    },

    /// 터미널에서 단일 질문
    Ask {
        /// 질문
        question: String,

        /// CSV 데이터셋 경로
        #[arg(short, long, default_value = DEFAULT_DATASET)]
        file: PathBuf,

        /// 질문당 검색할 행 수 (top-k)
        #[arg(short, long, default_value_t = DEFAULT_TOP_K)]
        limit: usize,
    },

    /// 상태 확인
    Status {
        /// CSV 데이터셋 경로
        #[arg(short, long, default_value = DEFAULT_DATASET)]
        file: PathBuf,
    },
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve { file, addr, limit } => cmd_serve(&file, &addr, limit).await,
        Commands::Ask {
            question,
            file,
            limit,
        } => cmd_ask(&question, &file, limit).await,
        Commands::Status { file } => cmd_status(&file).await,
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 서버 명령어 (serve)
///
/// 데이터셋을 로드하고 인덱스를 빌드한 뒤 웹 UI를 띄웁니다.
/// 로드/빌드 실패는 시작을 중단시킵니다.
async fn cmd_serve(file: &PathBuf, addr: &str, limit: usize) -> Result<()> {
    let qa = setup_qa(file, limit).await?;

    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("잘못된 바인드 주소: {}", addr))?;

    println!("[OK] 준비 완료: http://{}", addr);

    start_server(addr, Arc::new(qa)).await
}

/// 질문 명령어 (ask)
///
/// 웹 UI 없이 같은 파이프라인으로 한 번 질문하고 결과를 출력합니다.
async fn cmd_ask(question: &str, file: &PathBuf, limit: usize) -> Result<()> {
    if question.trim().is_empty() {
        bail!("질문이 비어 있습니다");
    }

    let qa = setup_qa(file, limit).await?;

    println!("[*] 질문: \"{}\"", question.trim());

    let result = qa.ask(question.trim()).await.context("질의응답 실패")?;

    println!();
    println!("{}", format_answer(&result));

    Ok(())
}

/// 상태 명령어 (status)
///
/// 버전, API 키, 데이터셋 상태를 확인합니다.
async fn cmd_status(file: &PathBuf) -> Result<()> {
    println!("rowchat v{}", env!("CARGO_PKG_VERSION"));
    println!();

    // API 키 상태
    if has_api_key() {
        println!("[OK] API 키: 설정됨");
    } else {
        println!("[!] API 키: 미설정");
        println!("    설정: export GEMINI_API_KEY=your-key");
    }

    // 데이터셋 상태
    match load_dataset(file) {
        Ok(docs) => {
            println!("[OK] 데이터셋: {} ({} 행)", file.display(), docs.len());
        }
        Err(e) => {
            println!("[!] 데이터셋 로드 실패: {}", e);
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 공통 시작 경로: 키 확인 → 데이터셋 로드 → 인덱스 빌드 → 질의응답기 구성
async fn setup_qa(file: &PathBuf, limit: usize) -> Result<RetrievalQa> {
    // API 키 확인
    if !has_api_key() {
        bail!(
            "API 키가 설정되지 않았습니다.\n\n\
             설정 방법:\n  \
             export GEMINI_API_KEY=your-api-key\n  \
             또는\n  \
             export GOOGLE_AI_API_KEY=your-api-key\n\n\
             API 키 발급: https://aistudio.google.com/app/apikey"
        );
    }

    // 데이터셋 로드
    let documents = load_dataset(file).context("데이터셋 로드 실패")?;

    if documents.is_empty() {
        bail!("데이터셋에 행이 없습니다: {}", file.display());
    }

    println!("[*] 데이터셋: {} ({} 행)", file.display(), documents.len());
    println!("[*] 임베딩 생성 및 인덱스 빌드 중...");

    // 임베딩 + 채팅 클라이언트
    let embedder = GeminiEmbedding::from_env().context("임베딩 클라이언트 생성 실패")?;
    let chat = GeminiChat::from_env().context("채팅 클라이언트 생성 실패")?;

    // 인덱스 빌드 (실패 시 시작 중단)
    let index = MemoryIndex::build(documents, &embedder)
        .await
        .context("인덱스 빌드 실패")?;

    println!("[OK] 인덱스 빌드 완료: {} 행", index.len());

    Ok(RetrievalQa::with_top_k(
        index,
        Arc::new(embedder),
        Arc::new(chat),
        limit,
    ))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["rowchat", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { file, addr, limit } => {
                assert_eq!(file, PathBuf::from(DEFAULT_DATASET));
                assert_eq!(addr, DEFAULT_ADDR);
                assert_eq!(limit, DEFAULT_TOP_K);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_ask_requires_question() {
        assert!(Cli::try_parse_from(["rowchat", "ask"]).is_err());
        assert!(Cli::try_parse_from(["rowchat", "ask", "what is cheap?"]).is_ok());
    }
}
