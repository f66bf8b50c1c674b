//! End-to-end tests: the HTTP API against a stub gateway, both on random ports.

use async_trait::async_trait;
use axum::extract::{Json, Path};
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use deskpilot_core::api::{ApiServer, AppState};
use deskpilot_core::desktop::{ComputerActionHandler, DesktopSandbox, SandboxFactory, SessionManager};
use deskpilot_core::tools::HandlerSet;
use deskpilot_core::types::{ComponentEndpoint, Config};
use deskpilot_core::Result;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

// =============================================================================
// Stub gateway
// =============================================================================

async fn stub_execute(Path(id): Path<String>, Json(body): Json<Value>) -> Json<Value> {
    if id == "browserbase" {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
    Json(json!({
        "success": true,
        "data": { "tool": id, "action": body["action"], "parameters": body["parameters"] }
    }))
}

async fn spawn_gateway() -> SocketAddr {
    let app = Router::new()
        .route(
            "/status",
            get(|| async {
                Json(json!({
                    "status": "online",
                    "version": "1.0.0",
                    "connected_tools": 5,
                    "total_tools": 7,
                    "active_connections": 2
                }))
            }),
        )
        .route("/restart", post(|| async { Json(json!({ "ok": true })) }))
        .route(
            "/tools/{id}/health",
            get(|| async { Json(json!({ "status": "ok" })) }),
        )
        .route("/tools/{id}/execute", post(stub_execute))
        .route(
            "/components/vnc",
            get(|| async { Json(json!({ "status": "healthy", "fps": 60 })) }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing listens on.
async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

// =============================================================================
// Fake desktop
// =============================================================================

#[derive(Debug)]
struct NullSandbox;

#[async_trait]
impl DesktopSandbox for NullSandbox {
    fn sandbox_id(&self) -> &str {
        "sbx_test"
    }
    async fn start_stream(&self) -> Result<()> {
        Ok(())
    }
    async fn stream_url(&self) -> Result<String> {
        Ok("https://stream.test/sbx_test".to_string())
    }
    async fn click(&self, _x: i64, _y: i64) -> Result<()> {
        Ok(())
    }
    async fn type_text(&self, _text: &str) -> Result<()> {
        Ok(())
    }
    async fn press(&self, _key: &str) -> Result<()> {
        Ok(())
    }
    async fn launch(&self, _app: &str) -> Result<()> {
        Ok(())
    }
    async fn screenshot(&self) -> Result<Bytes> {
        Ok(Bytes::new())
    }
    async fn kill(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct NullFactory;

#[async_trait]
impl SandboxFactory for NullFactory {
    async fn create(&self) -> Result<Arc<dyn DesktopSandbox>> {
        Ok(Arc::new(NullSandbox))
    }
}

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    base: String,
    http: reqwest::Client,
    server: Arc<ApiServer>,
}

impl Harness {
    async fn start(gateway: SocketAddr) -> Self {
        let mut config = Config::default();
        config.gateway.base_url = format!("http://{}", gateway);
        config.gateway.restart_settle_delay = Duration::from_millis(50);
        config.health.probe_timeout = Duration::from_secs(1);
        config.health.components = vec![ComponentEndpoint {
            id: "vncStream".to_string(),
            url: format!("http://{}/components/vnc", gateway),
        }];

        let desktop = ComputerActionHandler::new(Arc::new(SessionManager::new(Arc::new(NullFactory))));
        let handlers = HandlerSet::new().bind("desktop", Arc::new(desktop));
        let state = AppState::with_handlers(&config, handlers).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(ApiServer::new(state, true));
        let serving = server.clone();
        tokio::spawn(async move {
            serving.serve_on(listener).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
            http: reqwest::Client::new(),
            server,
        }
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let response = self.http.get(format!("{}{}", self.base, path)).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .http
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.server.shutdown();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_list_tools() {
    let h = Harness::start(spawn_gateway().await).await;
    let (status, body) = h.get("/api/mcp/tools").await;
    assert_eq!(status, 200);
    assert_eq!(body["total"], 7);
    assert_eq!(body["enabled"], 5);
    assert_eq!(body["tools"][0]["id"], "github");
}

#[tokio::test]
async fn test_execute_records_history_and_stats() {
    let h = Harness::start(spawn_gateway().await).await;

    let (status, body) = h
        .post(
            "/api/mcp/execute",
            json!({
                "toolId": "github",
                "parameters": { "action": "search_repos", "query": "rust" }
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["result"]["tool"], "github");
    assert_eq!(body["result"]["action"], "search_repos");
    let execution_id = body["executionId"].as_str().unwrap().to_string();
    assert!(execution_id.starts_with("exec_"));

    let (status, body) = h
        .get(&format!("/api/mcp/execute?executionId={}", execution_id))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["progress"], 100);

    let (_, body) = h.get("/api/mcp/history?toolId=github").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["executions"][0]["executionId"], execution_id.as_str());

    let (_, body) = h.get("/api/mcp/stats").await;
    assert_eq!(body["totalRequests"], 1);
    assert_eq!(body["successfulRequests"], 1);
    assert_eq!(body["toolsUsed"]["github"], 1);
}

#[tokio::test]
async fn test_execute_failures() {
    let h = Harness::start(spawn_gateway().await).await;

    let (status, body) = h.post("/api/mcp/execute", json!({ "parameters": {} })).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("toolId"));

    let (status, body) = h
        .post("/api/mcp/execute", json!({ "toolId": "nonexistent" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "error");
    assert!(body["error"].as_str().unwrap().contains("tool not found"));

    let (_, body) = h.post("/api/mcp/execute", json!({ "toolId": "docker" })).await;
    assert!(body["error"].as_str().unwrap().contains("unavailable"));

    let (_, body) = h.get("/api/mcp/history").await;
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn test_execute_timeout() {
    let h = Harness::start(spawn_gateway().await).await;
    let started = std::time::Instant::now();
    let (status, body) = h
        .post(
            "/api/mcp/execute",
            json!({
                "toolId": "browserbase",
                "parameters": { "url": "https://example.com" },
                "config": { "timeout": 200 }
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["error"], "timeout");
    assert!(body["duration"].as_u64().unwrap() >= 200);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_execution_status_lookup_errors() {
    let h = Harness::start(spawn_gateway().await).await;
    let (status, _) = h.get("/api/mcp/execute").await;
    assert_eq!(status, 400);
    let (status, body) = h.get("/api/mcp/execute?executionId=exec_missing").await;
    assert_eq!(status, 404);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_clear_history() {
    let h = Harness::start(spawn_gateway().await).await;
    h.post("/api/mcp/execute", json!({ "toolId": "filesystem" })).await;

    let response = h
        .http
        .delete(format!("{}/api/mcp/history", h.base))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["cleared"], 1);

    let (_, body) = h.get("/api/mcp/history").await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_gateway_status_and_restart() {
    let h = Harness::start(spawn_gateway().await).await;
    let (status, body) = h.get("/api/mcp/status").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "online");
    assert_eq!(body["connections"], 2);

    let (status, body) = h.post("/api/mcp/restart", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_health_all_healthy() {
    let h = Harness::start(spawn_gateway().await).await;
    let (status, body) = h.post("/api/health", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["overall"], "healthy");
    // gateway, five enabled tools, one component
    assert_eq!(body["checks"].as_object().unwrap().len(), 7);

    let (status, body) = h.get("/api/mcp/tools/exa/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    let (status, _) = h.get("/api/mcp/tools/nope/health").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_health_component_header() {
    let h = Harness::start(spawn_gateway().await).await;

    let response = h
        .http
        .get(format!("{}/api/health", h.base))
        .header("X-Health-Check", "vnc-stream")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["subsystemId"], "vncStream");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["details"]["fps"], 60);

    let response = h
        .http
        .get(format!("{}/api/health", h.base))
        .header("X-Health-Check", "gemini3")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "unhealthy");

    let (status, body) = h.get("/api/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"]["gateway"], "healthy");
}

#[tokio::test]
async fn test_gateway_down_dominates() {
    let h = Harness::start(dead_addr().await).await;

    let (status, body) = h.post("/api/health", json!({ "components": ["all"] })).await;
    assert_eq!(status, 200);
    assert_eq!(body["overall"], "down");
    assert_eq!(body["checks"].as_object().unwrap().len(), 1);

    let (status, body) = h.get("/api/mcp/status").await;
    assert_eq!(status, 500);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_agent_lifecycle() {
    let h = Harness::start(spawn_gateway().await).await;

    let (status, body) = h
        .post("/api/agent/start", json!({ "mode": "autonomous" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["config"]["mode"], "autonomous");
    assert!(body["agentId"].as_str().unwrap().starts_with("agent_"));

    let (status, _) = h.post("/api/agent/start", json!({})).await;
    assert_eq!(status, 400);

    let (status, body) = h.post("/api/agent/stop", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Agent stopped successfully");
}

#[tokio::test]
async fn test_desktop_session_via_execute() {
    let h = Harness::start(spawn_gateway().await).await;

    let (_, body) = h
        .post(
            "/api/mcp/execute",
            json!({ "toolId": "desktop", "action": "click", "parameters": { "x": 1, "y": 1 },
                    "config": { "sessionId": "s1" } }),
        )
        .await;
    assert_eq!(body["status"], "error");
    assert!(body["error"].as_str().unwrap().contains("desktop not initialized"));

    let (_, body) = h
        .post(
            "/api/mcp/execute",
            json!({ "toolId": "desktop", "action": "init_desktop", "config": { "sessionId": "s1" } }),
        )
        .await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["result"]["vncUrl"], "https://stream.test/sbx_test");

    let (_, body) = h
        .post(
            "/api/mcp/execute",
            json!({ "toolId": "desktop", "action": "click", "parameters": { "x": 1, "y": 1 },
                    "config": { "sessionId": "s1" } }),
        )
        .await;
    assert_eq!(body["status"], "completed");
}

#[tokio::test]
async fn test_system_status_shape() {
    let h = Harness::start(spawn_gateway().await).await;
    let (status, body) = h.get("/api/system/status").await;
    assert_eq!(status, 200);
    assert_eq!(body["services"]["mcp_gateway"]["status"], "online");
    assert_eq!(body["services"]["backend"]["status"], "online");
    assert!(body["resources"]["cpu_usage"].is_number());
    assert!(body["last_updated"].is_string());
}
