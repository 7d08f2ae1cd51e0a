// HTTP front of the text-to-SQL pipeline. Handlers stay thin: validation
// happens here, the pipeline itself lives on AppState.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::WebConfig;
use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::ui_routes())
        .merge(routes::api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Serves until Ctrl-C.
pub async fn run_server(config: WebConfig, state: Arc<AppState>) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::db_pool::{memory_pool, DbPool, DuckDBConnectionManager};
    use crate::llm::generator::tests::CannedCompletion;
    use crate::llm::LlmManager;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct TestApp {
        state: Arc<AppState>,
        prompts_seen: Arc<Mutex<Vec<String>>>,
        _dir: TempDir,
    }

    fn test_config(dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.database.connection_string = ":memory:".to_string();
        config.audit.generation_log = dir.join("generation_log.csv");
        config.audit.metrics_log = dir.join("metrics_log.csv");
        config
    }

    fn population_pool() -> DbPool {
        let pool = memory_pool();
        pool.get()
            .unwrap()
            .execute_batch(
                "CREATE TABLE population (state VARCHAR, district VARCHAR, total BIGINT);
                 INSERT INTO population VALUES
                   ('Maharashtra', 'Mumbai', 18400000),
                   ('Maharashtra', 'Pune', 9200000),
                   ('Tamil Nadu', 'Chennai', 8400000);",
            )
            .unwrap();
        pool
    }

    fn app_with(
        completion: CannedCompletion,
        pool: DbPool,
        dir: TempDir,
        config: AppConfig,
    ) -> TestApp {
        let prompts_seen = Arc::clone(&completion.prompts);
        let llm = LlmManager::with_client(Box::new(completion));
        TestApp {
            state: Arc::new(AppState::new(config, pool, llm)),
            prompts_seen,
            _dir: dir,
        }
    }

    fn test_app(completion: CannedCompletion) -> TestApp {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        app_with(completion, population_pool(), dir, config)
    }

    async fn send(app: &TestApp, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = build_router(Arc::clone(&app.state))
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn csv_rows(path: &Path) -> Vec<csv::StringRecord> {
        if !path.exists() {
            return Vec::new();
        }
        csv::Reader::from_path(path)
            .unwrap()
            .records()
            .map(Result::unwrap)
            .collect()
    }

    #[tokio::test]
    async fn root_reports_liveness() {
        let app = test_app(CannedCompletion::ok("SELECT 1"));
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = build_router(Arc::clone(&app.state))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["message"].as_str().unwrap().contains("running"));
    }

    #[tokio::test]
    async fn blank_question_is_rejected_before_completion_call() {
        let app = test_app(CannedCompletion::ok("SELECT 1"));

        let (status, body) = send(&app, "POST", "/generate-select-sql", json!({ "question": "   \n\t" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Question cannot be empty.");

        let (status, body) = send(&app, "POST", "/generate-other-sql", json!({ "question": "" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Instruction cannot be empty.");

        assert!(app.prompts_seen.lock().unwrap().is_empty());
        assert!(!app.state.audit.generation_path().exists());
    }

    #[tokio::test]
    async fn select_generation_uses_live_schema_and_logs() {
        let app = test_app(CannedCompletion::ok(
            "```sql\nSELECT total FROM population WHERE district ILIKE 'pune';\n```",
        ));

        let (status, body) = send(
            &app,
            "POST",
            "/generate-select-sql",
            json!({ "question": "What is the population of Pune?" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["question"], "What is the population of Pune?");
        let sql = body["sql_query"].as_str().unwrap();
        assert_eq!(sql, "\nSELECT total FROM population WHERE district ILIKE 'pune';\n");

        let prompts = app.prompts_seen.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Table 'population' has columns: state, district, total"));
        assert!(prompts[0].contains("**read-only SELECT**"));

        let rows = csv_rows(app.state.audit.generation_path());
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "What is the population of Pune?");
        assert_eq!(&rows[0][1], sql);
    }

    #[tokio::test]
    async fn other_generation_uses_modify_template() {
        let app = test_app(CannedCompletion::ok("DELETE FROM population WHERE district ILIKE 'pune'"));

        let (status, body) = send(
            &app,
            "POST",
            "/generate-other-sql",
            json!({ "question": "Remove Pune" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sql_query"], "DELETE FROM population WHERE district ILIKE 'pune'");
        assert!(app.prompts_seen.lock().unwrap()[0].contains("Instruction: Remove Pune"));
    }

    #[tokio::test]
    async fn completion_failure_is_a_server_error() {
        let app = test_app(CannedCompletion::failing("upstream unavailable"));

        let (status, body) = send(
            &app,
            "POST",
            "/generate-select-sql",
            json!({ "question": "How many districts?" }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.starts_with("LLM Error:"));
        assert!(detail.contains("upstream unavailable"));
        assert!(csv_rows(app.state.audit.generation_path()).is_empty());
    }

    #[tokio::test]
    async fn unavailable_schema_aborts_before_completion_call() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let pool = r2d2::Pool::builder()
            .max_size(1)
            .connection_timeout(Duration::from_millis(200))
            .build(DuckDBConnectionManager::open(":memory:").unwrap())
            .unwrap();
        let app = app_with(CannedCompletion::ok("SELECT 1"), pool.clone(), dir, config);

        // Introspection cannot get a connection while this one is checked out
        let _held = pool.get().unwrap();

        let (status, body) = send(
            &app,
            "POST",
            "/generate-select-sql",
            json!({ "question": "How many districts?" }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Could not retrieve database schema.");
        assert!(app.prompts_seen.lock().unwrap().is_empty());
        assert!(!app.state.audit.generation_path().exists());
    }

    #[tokio::test]
    async fn generation_log_failure_is_reported_as_llm_error() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(dir.path());
        config.audit.generation_log = dir.path().join("missing").join("generation_log.csv");
        let app = app_with(
            CannedCompletion::ok("SELECT COUNT(*) FROM population"),
            population_pool(),
            dir,
            config,
        );

        let (status, body) = send(
            &app,
            "POST",
            "/generate-select-sql",
            json!({ "question": "How many districts?" }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().starts_with("LLM Error:"));
        assert_eq!(app.prompts_seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn insert_reports_rows_affected_and_logs_once() {
        let app = test_app(CannedCompletion::ok("SELECT 1"));

        let (status, body) = send(
            &app,
            "POST",
            "/execute-sql",
            json!({
                "sql_query": "INSERT INTO population (state, district, total) VALUES ('Kerala', 'Kochi', 2100000)",
                "question": "Add Kochi"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], json!({ "rows_affected": 1 }));
        assert_eq!(body["status"], "success");
        assert!(body["latency_ms"].as_f64().unwrap() >= 0.0);

        let rows = csv_rows(app.state.audit.metrics_path());
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "Add Kochi");
        assert_eq!(&rows[0][3], "success");
    }

    #[tokio::test]
    async fn select_returns_all_matching_rows() {
        let app = test_app(CannedCompletion::ok("SELECT 1"));

        let (status, body) = send(
            &app,
            "POST",
            "/execute-sql",
            json!({ "sql_query": "SELECT district FROM population WHERE state ILIKE 'maharashtra'" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["result"].as_array().unwrap().len(), 2);

        let rows = csv_rows(app.state.audit.metrics_path());
        assert_eq!(&rows[0][0], "N/A");
    }

    #[tokio::test]
    async fn driver_error_is_reported_inline() {
        let app = test_app(CannedCompletion::ok("SELECT 1"));

        let (status, body) = send(
            &app,
            "POST",
            "/execute-sql",
            json!({ "sql_query": "SELECT * FROM missing_table" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
        assert!(!body["result"].as_str().unwrap().is_empty());

        let rows = csv_rows(app.state.audit.metrics_path());
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][3], "error");
    }

    #[tokio::test]
    async fn blank_sql_is_rejected_without_logging() {
        let app = test_app(CannedCompletion::ok("SELECT 1"));

        let (status, body) = send(&app, "POST", "/execute-sql", json!({ "sql_query": "  " })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "SQL query cannot be empty.");
        assert!(!app.state.audit.metrics_path().exists());
    }
}
