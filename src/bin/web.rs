//! Plume HTTP 边界
//!
//! 启动: cargo run --bin plume-web
//! POST /mcp/chat 处理一轮对话，GET /mcp/download/:filename 下载生成的产物。
//! Agent 组件在启动时构建一次并注入 AppState（无惰性全局量），所有会话共享。

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use plume::agent::{create_agent_components, process_message, AgentComponents};
use plume::config::{load_config, AppConfig};
use plume::memory::SessionStore;
use plume::workspace::{find_by_basename, resolve_artifact, validate_basename, ResolvedArtifact};

struct AppState {
    config: AppConfig,
    /// 进程级共享的 Agent 组件，启动时显式构建并注入
    components: Arc<AgentComponents>,
    store: SessionStore,
    workspace: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    session_id: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    answer: String,
    /// 产物在 workspace 中按 basename 定位成功时的下载地址
    #[serde(skip_serializing_if = "Option::is_none")]
    file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_name: Option<String>,
    /// 未能定位（或引用不合法）时原样返回，仅作诊断
    #[serde(skip_serializing_if = "Option::is_none")]
    file_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    message: &'static str,
    agent_ready: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();

    let cfg = load_config(None).unwrap_or_default();
    let workspace = cfg
        .app
        .workspace_root
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap().join("workspace"));
    std::fs::create_dir_all(&workspace).ok();
    let workspace = workspace.canonicalize().unwrap_or(workspace);

    let components = Arc::new(create_agent_components(&cfg, &workspace));
    let store = SessionStore::new(&workspace)?;

    let state = Arc::new(AppState {
        config: cfg.clone(),
        components,
        store,
        workspace,
    });

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/mcp/chat", post(api_chat))
        .route("/mcp/download/:filename", get(api_download))
        .with_state(Arc::clone(&state));

    let port = std::env::var("PLUME_WEB_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(cfg.web.port);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Plume web API: http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        message: "Serveur Plume opérationnel",
        agent_ready: true,
    })
}

async fn health() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "healthy",
        message: "",
        agent_ready: true,
    })
}

/// POST /mcp/chat：完整一轮对话。内部失败已在运行时折叠为诊断回复，
/// 本处永不向客户端返回 5xx；仅空消息按输入校验拒绝。
async fn api_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "message is required".to_string()));
    }
    let session_id = if req.session_id.trim().is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        req.session_id.clone()
    };

    let reply = process_message(
        &state.components,
        &state.store,
        &session_id,
        message,
        state.config.app.max_context_turns,
    )
    .await;

    let mut response = ChatResponse {
        answer: reply.text,
        file_url: None,
        file_name: None,
        file_path: None,
    };

    // 产物引用解析：裸文件名在 workspace 内检索；含分隔符或 .. 的引用整体判无效，只作诊断回显
    if let Some(reference) = reply.artifact {
        match resolve_artifact(&state.workspace, &reference) {
            ResolvedArtifact::Download { file_url, file_name } => {
                response.file_url = Some(file_url);
                response.file_name = Some(file_name);
            }
            ResolvedArtifact::Unresolved { file_path } => {
                response.file_path = Some(file_path);
            }
        }
    }

    Ok(Json(response))
}

/// GET /mcp/download/:filename：按 basename 下载产物。
/// 含路径分隔符或上级目录标记的名字在任何文件系统访问之前拒绝（400）。
async fn api_download(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    if validate_basename(&filename).is_err() {
        return Err((StatusCode::BAD_REQUEST, "Invalid filename".to_string()));
    }
    let found = find_by_basename(&state.workspace, &filename)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Fichier introuvable".to_string()))?;
    let bytes = std::fs::read(&found)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(bytes))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
