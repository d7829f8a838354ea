use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use thinkbot_common::gateway::ApiKey;

use crate::config::Config;
use crate::model::PipelineResult;
use crate::pipeline::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

pub fn router(state: AppState, config: &Config) -> Router {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/run-pipeline", post(run_pipeline))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "ThinkBot API is running 🚀" }))
}

async fn health() -> &'static str {
    "OK"
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
    api_key: ApiKey,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, String> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut api_key: Option<ApiKey> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| e.to_string())?;
                file = Some((file_name, bytes.to_vec()));
            }
            "api_key" => {
                let text = field.text().await.map_err(|e| e.to_string())?;
                api_key = Some(ApiKey::new(text));
            }
            _ => {}
        }
    }

    let (file_name, bytes) = file.ok_or("missing file field")?;
    if file_name.trim().is_empty() {
        return Err("uploaded file has no name".to_string());
    }
    let api_key = api_key
        .filter(|k| !k.is_empty())
        .ok_or("missing api_key field")?;

    Ok(Upload {
        file_name,
        bytes,
        api_key,
    })
}

/// Always answers 200; failures are reported in the `error` field.
async fn run_pipeline(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<PipelineResult> {
    let upload = match multipart {
        Ok(multipart) => read_upload(multipart).await,
        Err(rejection) => Err(rejection.body_text()),
    };
    let upload = match upload {
        Ok(upload) => upload,
        Err(e) => {
            warn!(error = %e, "upload rejected");
            return Json(PipelineResult::failed(format!("File upload error: {e}")));
        }
    };

    info!(file_name = %upload.file_name, "upload received");
    let result = state
        .pipeline
        .run(&upload.file_name, &upload.bytes, &upload.api_key)
        .await;
    Json(result)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use thinkbot_common::gateway::Gateway;
    use thinkbot_common::testing::{MockProvider, MockReply};
    use tower::ServiceExt;

    use super::*;
    use crate::catalog::Catalog;
    use crate::document::Normalizer;

    const BOUNDARY: &str = "thinkbot-test-boundary";

    fn test_config() -> Config {
        Config {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cors_origins: vec!["http://localhost:5173".to_string()],
            max_upload_bytes: 1024 * 1024,
            catalog_path: None,
        }
    }

    fn app(provider: &MockProvider) -> Router {
        let pipeline = Pipeline::new(
            Arc::new(Gateway::new(provider.gateway_config()).unwrap()),
            Arc::new(Catalog::builtin()),
            Arc::new(Normalizer::new()),
        );
        router(AppState::new(pipeline), &test_config())
    }

    fn multipart_body(file: Option<(&str, &str)>, api_key: Option<&str>) -> Body {
        let mut body = String::new();
        if let Some((name, content)) = file {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n{content}\r\n"
            ));
        }
        if let Some(key) = api_key {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"api_key\"\r\n\r\n{key}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Body::from(body)
    }

    fn upload_request(body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/run-pipeline")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body)
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn root_reports_running() {
        let provider = MockProvider::start(vec![]).await;
        let response = app(&provider)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "message": "ThinkBot API is running 🚀" })
        );
    }

    #[tokio::test]
    async fn health_is_ok() {
        let provider = MockProvider::start(vec![]).await;
        let response = app(&provider)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn full_upload_runs_the_pipeline() {
        let provider = MockProvider::start(vec![
            MockReply::content(
                r#"{"similar_ideas": [{"idea_name": "Wyzant", "idea_description": "Tutor marketplace"}]}"#,
            ),
            MockReply::content(
                r#"{"validation_scores": {"uniqueness": 3, "feasibility": 8, "market_trend": 6,
                "scalability": 7, "problem_relevance": 8, "user_adoption_potential": 7}}"#,
            ),
            MockReply::content("Focus on exam prep"),
        ])
        .await;

        let response = app(&provider)
            .oneshot(upload_request(multipart_body(
                Some(("idea.txt", "An app connecting freelance tutors with students")),
                Some("sk-or-test"),
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert!(json["error"].is_null(), "{json}");
        assert_eq!(json["competitors"].as_array().unwrap().len(), 1);
        assert_eq!(json["competitors"][0]["website"], "");
        assert_eq!(json["scores"].as_array().unwrap().len(), 6);
        assert_eq!(json["scores"][1]["score"], 80);
        assert_eq!(json["suggestions"][0]["priority"], "high");
        assert_eq!(json["suggestions"][0]["category"], "Enhancement");

        let auth = provider.requests()[0].authorization.clone();
        assert_eq!(auth.as_deref(), Some("Bearer sk-or-test"));
    }

    #[tokio::test]
    async fn missing_api_key_is_reported_in_band() {
        let provider = MockProvider::start(vec![]).await;
        let response = app(&provider)
            .oneshot(upload_request(multipart_body(
                Some(("idea.txt", "tutors")),
                None,
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        let error = json["error"].as_str().unwrap();
        assert!(error.starts_with("File upload error:"), "{error}");
        assert_eq!(json["scores"], json!([]));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn missing_file_is_reported_in_band() {
        let provider = MockProvider::start(vec![]).await;
        let response = app(&provider)
            .oneshot(upload_request(multipart_body(None, Some("k"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert!(json["error"].as_str().unwrap().contains("missing file"));
    }

    #[tokio::test]
    async fn unsupported_format_returns_empty_arrays() {
        let provider = MockProvider::start(vec![]).await;
        let response = app(&provider)
            .oneshot(upload_request(multipart_body(
                Some(("deck.pdf", "%PDF")),
                Some("k"),
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["scores"], json!([]));
        assert_eq!(json["suggestions"], json!([]));
        assert_eq!(json["competitors"], json!([]));
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("Unsupported file format: deck.pdf"));
    }

    #[tokio::test]
    async fn non_multipart_request_is_reported_in_band() {
        let provider = MockProvider::start(vec![]).await;
        let response = app(&provider)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/run-pipeline")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert!(json["error"]
            .as_str()
            .unwrap()
            .starts_with("File upload error:"));
    }
}
