use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info};
use tokio::task::JoinHandle;
use warp::{Filter, Reply};

use super::routes::*;
use crate::configuration::config::Config;
use crate::error_handling::types::WebError;
use crate::storage::file_storage::FileStorage;
use crate::storage::storage_trait::Storage;
use crate::task_management::TaskManager;

/// Web server for the upload page and the validation API
pub struct WebServer {
    config: Config,
    storage: Arc<dyn Storage>,
    tasks: Arc<TaskManager>,
}

impl WebServer {
    /// Create a new WebServer instance
    pub fn new(config: Config, storage: Arc<dyn Storage>, tasks: Arc<TaskManager>) -> Self {
        Self {
            config,
            storage,
            tasks,
        }
    }

    /// Builds the filesystem storage and the task registry described by `config`.
    pub fn from_config(config: Config) -> Result<Self, WebError> {
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::from_config(&config)?);
        let tasks = Arc::new(TaskManager::new(storage.clone(), config.task_ttl_secs));
        Ok(Self::new(config, storage, tasks))
    }

    pub fn tasks(&self) -> &Arc<TaskManager> {
        &self.tasks
    }

    /// Every route, with CORS for any origin and JSON error payloads.
    pub fn routes(&self) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
        index_route()
            .or(static_route(self.storage.clone()))
            .or(upload_route(
                self.tasks.clone(),
                self.config.max_upload_bytes,
            ))
            .or(upload_without_form_route())
            .or(status_route(self.tasks.clone()))
            .or(download_route(self.storage.clone()))
            .or(acuse_route(self.tasks.clone(), self.config.logo_path()))
            .or(health_route(self.tasks.clone()))
            .or(preflight_route())
            .recover(handle_rejection)
            .with(warp::reply::with::header(
                "access-control-allow-origin",
                "*",
            ))
            .with(warp::log("sipot_validator::web"))
    }

    /// Start the web server on the configured address
    pub async fn start(&self) -> Result<(), WebError> {
        let addr = self.config.socket_addr()?;

        // Bind once up front so an address in use is reported instead of panicking
        let probe = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| WebError::BindFailed(format!("{}: {}", addr, e)))?;
        drop(probe);

        let _sweeper = self.spawn_cleanup();
        info!("Web interface listening on http://{}", addr);
        warp::serve(self.routes()).run(addr).await;

        Ok(())
    }

    /// Periodically drops expired tasks and their exports.
    pub fn spawn_cleanup(&self) -> Option<JoinHandle<()>> {
        let every = self.config.cleanup_interval_secs;
        if every == 0 || self.config.task_ttl_secs == 0 {
            debug!("Task retention sweep disabled");
            return None;
        }

        let tasks = self.tasks.clone();
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(every));
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let dropped = tasks.cleanup_expired(Utc::now());
                debug!("Retention sweep done, {} task(s) dropped", dropped);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_management::TaskState;
    use serde_json::Value;
    use tempfile::TempDir;
    use warp::http::StatusCode;

    const BOUNDARY: &str = "XBOUNDARYX";
    const CLEAN_CSV: &str = "FMT-1,,,\nsujeto\ntitulo,,,NC_OK\n3\ndesc\ncampos\nMonto\n10\n";
    const BAD_CSV: &str = "FMT-1,,,\nsujeto\ntitulo,,,NC_BAD\n3\ndesc\ncampos\nMonto\nx\n";

    fn server(dir: &TempDir) -> WebServer {
        let config = Config {
            upload_dir: dir.path().join("temp_uploads"),
            download_dir: dir.path().join("temp_downloads"),
            log_dir: dir.path().join("logs"),
            static_dir: dir.path().join("static"),
            max_upload_bytes: 64 * 1024,
            ..Config::default()
        };
        WebServer::from_config(config).unwrap()
    }

    fn multipart(field: &str, file_name: Option<&str>, data: &str) -> Vec<u8> {
        let disposition = match file_name {
            Some(name) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: text/csv",
                field, name
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"", field),
        };
        format!(
            "--{b}\r\n{d}\r\n\r\n{data}\r\n--{b}--\r\n",
            b = BOUNDARY,
            d = disposition,
            data = data
        )
        .into_bytes()
    }

    async fn upload(server: &WebServer, body: Vec<u8>) -> (StatusCode, Value) {
        let res = warp::test::request()
            .method("POST")
            .path("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(body)
            .reply(&server.routes())
            .await;
        let json = serde_json::from_slice(res.body()).unwrap_or(Value::Null);
        (res.status(), json)
    }

    async fn wait_for(server: &WebServer, task_id: &str) -> Value {
        for _ in 0..200 {
            let res = warp::test::request()
                .path(&format!("/status/{}", task_id))
                .reply(&server.routes())
                .await;
            assert_eq!(res.status(), StatusCode::OK);
            let json: Value = serde_json::from_slice(res.body()).unwrap();
            if json["status"] != "processing" {
                return json;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("task {} did not finish", task_id);
    }

    #[tokio::test]
    async fn test_index_and_health() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);

        let res = warp::test::request().path("/").reply(&server.routes()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(String::from_utf8_lossy(res.body()).contains("archivo"));

        let res = warp::test::request()
            .path("/health")
            .reply(&server.routes())
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let json: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);
        let (status, json) = upload(&server, multipart("otro", Some("a.csv"), "x")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No se encontró archivo");
    }

    #[tokio::test]
    async fn test_upload_without_multipart_body() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);

        let res = warp::test::request()
            .method("POST")
            .path("/upload")
            .header("content-type", "application/json")
            .body("{}")
            .reply(&server.routes())
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(json["error"], "No se encontró archivo");

        let res = warp::test::request()
            .method("POST")
            .path("/upload")
            .reply(&server.routes())
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(json["error"], "No se encontró archivo");
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin_and_header() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);

        let res = warp::test::request()
            .method("OPTIONS")
            .path("/upload")
            .header("origin", "https://portal.example.mx")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "x-custom-token, content-type")
            .reply(&server.routes())
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["access-control-allow-origin"], "*");
        assert_eq!(
            res.headers()["access-control-allow-headers"],
            "x-custom-token, content-type"
        );

        let res = warp::test::request()
            .path("/health")
            .header("origin", "https://portal.example.mx")
            .header("x-custom-token", "abc")
            .reply(&server.routes())
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["access-control-allow-origin"], "*");

        let res = warp::test::request()
            .path("/no/existe")
            .reply(&server.routes())
            .await;
        assert_eq!(res.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn test_upload_with_empty_file_name() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);
        let (status, json) = upload(&server, multipart("archivo", Some(""), "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No se seleccionó archivo");
    }

    #[tokio::test]
    async fn test_upload_too_large() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);
        let big = "x".repeat(128 * 1024);
        let (status, _) = upload(&server, multipart("archivo", Some("a.csv"), &big)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_clean_upload_can_be_downloaded() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);

        let (status, json) = upload(&server, multipart("archivo", Some("ok.csv"), CLEAN_CSV)).await;
        assert_eq!(status, StatusCode::OK);
        let task_id = json["task_id"].as_str().unwrap().to_string();

        let state = wait_for(&server, &task_id).await;
        assert_eq!(state["status"], "complete");
        assert_eq!(state["result"]["status"], "success");
        assert_eq!(state["result"]["nombre_corto"], "NC_OK");
        let file = state["result"]["download_file"].as_str().unwrap().to_string();

        let res = warp::test::request()
            .path(&format!("/download/{}", file))
            .reply(&server.routes())
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()["content-disposition"],
            format!("attachment; filename=\"{}\"", file).as_str()
        );
        let export: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(export["data"][0]["Monto"], "10");

        // A clean file has no acuse
        let res = warp::test::request()
            .path(&format!("/acuse_errores/{}", task_id))
            .reply(&server.routes())
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let json: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(json["error"], "No hay errores registrados para este task_id.");
    }

    #[tokio::test]
    async fn test_upload_with_errors_produces_acuse() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);

        let (status, json) = upload(&server, multipart("archivo", Some("bad.csv"), BAD_CSV)).await;
        assert_eq!(status, StatusCode::OK);
        let task_id = json["task_id"].as_str().unwrap().to_string();

        let state = wait_for(&server, &task_id).await;
        assert_eq!(state["result"]["status"], "error");
        assert_eq!(
            state["result"]["errors"][0],
            "Celda A8 ('x') inválida. Se esperaba: Número."
        );

        let res = warp::test::request()
            .path(&format!("/acuse_errores/{}", task_id))
            .reply(&server.routes())
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["content-type"], "application/pdf");
        assert_eq!(
            res.headers()["content-disposition"],
            "attachment; filename=\"ACUSE_DE_ERRORES.pdf\""
        );
        assert!(res.body().starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn test_unknown_task_and_files() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);

        let res = warp::test::request()
            .path("/status/desconocido")
            .reply(&server.routes())
            .await;
        let json: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(json["status"], "not_found");

        let res = warp::test::request()
            .path("/download/nada.json")
            .reply(&server.routes())
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = warp::test::request()
            .path("/download/..%2F..%2Fsecreto")
            .reply(&server.routes())
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = warp::test::request()
            .path("/no/existe")
            .reply(&server.routes())
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_static_files_are_served_with_mime() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);
        std::fs::write(dir.path().join("static").join("estilo.css"), "body{}").unwrap();

        let res = warp::test::request()
            .path("/static/estilo.css")
            .reply(&server.routes())
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["content-type"], "text/css");
        assert_eq!(res.body().as_ref(), b"body{}");
    }

    #[tokio::test]
    async fn test_cleanup_disabled_without_ttl() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            upload_dir: dir.path().join("u"),
            download_dir: dir.path().join("d"),
            static_dir: dir.path().join("s"),
            task_ttl_secs: 0,
            ..Config::default()
        };
        let server = WebServer::from_config(config).unwrap();
        assert!(server.spawn_cleanup().is_none());
        assert_eq!(server.tasks().status("x"), TaskState::NotFound);
    }
}
