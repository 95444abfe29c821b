//! HTTP transport in front of the dispatcher.
//!
//! Routes `POST /v1/{traces,metrics,logs}` to the matching endpoint and maps
//! export errors onto status codes. The transport never retries; a
//! `503` carries `Retry-After` so clients know to come back.

use crate::dispatcher::Dispatcher;
use crate::errors::ExportError;
use crate::handler::{ExportRequest, ExportResponse, Signal};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::{ALLOW, CONTENT_TYPE, HeaderValue, RETRY_AFTER};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use shared::http::make_boxed_error_response;
use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub const CONTENT_TYPE_PROTOBUF: &str = "application/x-protobuf";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Seconds a client should wait before retrying an unavailable endpoint.
const RETRY_AFTER_SECS: &str = "1";

pub type ResponseBody = BoxBody<Bytes, Infallible>;

pub struct ExportService {
    dispatcher: Arc<Dispatcher>,
}

impl ExportService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub async fn handle<B>(dispatcher: &Dispatcher, req: Request<B>) -> Response<ResponseBody>
    where
        B: Body,
        B::Error: Display,
    {
        let Some(signal) = signal_for_path(req.uri().path()) else {
            return make_boxed_error_response(StatusCode::NOT_FOUND);
        };

        if req.method() != Method::POST {
            let mut response = make_boxed_error_response(StatusCode::METHOD_NOT_ALLOWED);
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("POST"));
            return response;
        }

        let content_type = match request_content_type(&req) {
            Some(content_type) => content_type,
            None => return make_boxed_error_response(StatusCode::UNSUPPORTED_MEDIA_TYPE),
        };

        let payload = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                let err = ExportError::InvalidRequest(format!("failed to read body: {e}"));
                return error_response(signal, &err);
            }
        };

        let request = ExportRequest {
            payload,
            content_type: Some(content_type.to_string()),
        };

        match dispatcher.call(signal, request).await {
            Ok(response) => json_response(StatusCode::OK, &SuccessBody::from(response)),
            Err(err) => error_response(signal, &err),
        }
    }
}

impl Service<Request<Incoming>> for ExportService {
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let dispatcher = self.dispatcher.clone();
        Box::pin(async move { Ok(Self::handle(&dispatcher, req).await) })
    }
}

fn signal_for_path(path: &str) -> Option<Signal> {
    match path.trim_end_matches('/') {
        "/v1/traces" => Some(Signal::Traces),
        "/v1/metrics" => Some(Signal::Metrics),
        "/v1/logs" => Some(Signal::Logs),
        _ => None,
    }
}

/// Supported content type of the request. A missing header means protobuf.
fn request_content_type<B>(req: &Request<B>) -> Option<&'static str> {
    let Some(value) = req.headers().get(CONTENT_TYPE) else {
        return Some(CONTENT_TYPE_PROTOBUF);
    };

    let essence = value.to_str().ok()?.split(';').next()?.trim();
    if essence.eq_ignore_ascii_case(CONTENT_TYPE_PROTOBUF) {
        Some(CONTENT_TYPE_PROTOBUF)
    } else if essence.eq_ignore_ascii_case(CONTENT_TYPE_JSON) {
        Some(CONTENT_TYPE_JSON)
    } else {
        None
    }
}

#[derive(Serialize)]
struct SuccessBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    partial_success: Option<PartialSuccess>,
}

#[derive(Serialize)]
struct PartialSuccess {
    rejected: u64,
    error_message: String,
}

impl From<ExportResponse> for SuccessBody {
    fn from(response: ExportResponse) -> Self {
        let partial_success = response.is_partial().then(|| PartialSuccess {
            rejected: response.rejected,
            error_message: response.message.unwrap_or_default(),
        });
        SuccessBody { partial_success }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

fn error_response(signal: Signal, err: &ExportError) -> Response<ResponseBody> {
    let status = err.status_code();
    if status.is_server_error() && !err.is_retryable() {
        tracing::warn!(%signal, error = %err, "export failed");
    } else {
        tracing::debug!(%signal, error = %err, "export rejected");
    }

    let body = ErrorBody {
        code: status.as_u16(),
        message: err.to_string(),
    };
    let mut response = json_response(status, &body);
    if err.is_retryable() {
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
    }
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<ResponseBody> {
    let bytes = match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response body");
            return make_boxed_error_response(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(bytes)).boxed());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Backends;
    use crate::handler::Handler;
    use crate::exporter::DiscardExporter;
    use crate::testutils::{FailingHandler, StaticHandler, tagged};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct PartialHandler;

    #[async_trait]
    impl Handler for PartialHandler {
        fn name(&self) -> &'static str {
            "partial"
        }

        async fn call(&self, _request: ExportRequest) -> Result<ExportResponse, ExportError> {
            Ok(ExportResponse::partial(2, "2 spans dropped"))
        }
    }

    async fn configured_dispatcher() -> Dispatcher {
        let dispatcher = Dispatcher::new();
        let backends: Backends = HashMap::from([
            (Signal::Traces, Arc::new(DiscardExporter) as Arc<dyn Handler>),
            (Signal::Metrics, Arc::new(FailingHandler) as Arc<dyn Handler>),
        ]);
        dispatcher.reconfigure(backends).await;
        dispatcher
    }

    fn request(method: Method, path: &str, content_type: Option<&str>) -> Request<Full<Bytes>> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder.body(Full::new(Bytes::from("{}"))).unwrap()
    }

    async fn body_string(response: Response<ResponseBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_export_success() {
        let dispatcher = configured_dispatcher().await;
        let response = ExportService::handle(
            &dispatcher,
            request(Method::POST, "/v1/traces", Some("application/json; charset=utf-8")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], CONTENT_TYPE_JSON);
        assert_eq!(body_string(response).await, "{}");
    }

    #[tokio::test]
    async fn test_backend_message_reported_as_partial_success() {
        let dispatcher = Dispatcher::new();
        dispatcher.endpoint(Signal::Metrics).install(StaticHandler::new("m"));

        let response =
            ExportService::handle(&dispatcher, request(Method::POST, "/v1/metrics", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(tagged("m").is_partial());
        assert_eq!(
            body_string(response).await,
            r#"{"partial_success":{"rejected":0,"error_message":"m"}}"#
        );
    }

    #[tokio::test]
    async fn test_partial_success_body() {
        let dispatcher = Dispatcher::new();
        dispatcher.endpoint(Signal::Logs).install(Arc::new(PartialHandler));

        let response =
            ExportService::handle(&dispatcher, request(Method::POST, "/v1/logs", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_string(response).await,
            r#"{"partial_success":{"rejected":2,"error_message":"2 spans dropped"}}"#
        );
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let dispatcher = configured_dispatcher().await;

        // Not enabled: logs has no backend in this configuration.
        let response =
            ExportService::handle(&dispatcher, request(Method::POST, "/v1/logs", None)).await;
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert!(response.headers().get(RETRY_AFTER).is_none());
        assert_eq!(
            body_string(response).await,
            r#"{"code":501,"message":"logs not enabled"}"#
        );

        // Backend errors are passed through.
        let response =
            ExportService::handle(&dispatcher, request(Method::POST, "/v1/metrics", None)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_string(response).await,
            r#"{"code":500,"message":"backend exploded"}"#
        );

        // Unavailable while nothing is installed.
        dispatcher.shutdown().await;
        let response =
            ExportService::handle(&dispatcher, request(Method::POST, "/v1/traces", None)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[RETRY_AFTER], "1");
    }

    #[tokio::test]
    async fn test_request_validation() {
        let dispatcher = configured_dispatcher().await;

        let response =
            ExportService::handle(&dispatcher, request(Method::POST, "/v1/profiles", None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response =
            ExportService::handle(&dispatcher, request(Method::GET, "/v1/traces", None)).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "POST");

        let response = ExportService::handle(
            &dispatcher,
            request(Method::POST, "/v1/traces", Some("text/plain")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let response = ExportService::handle(
            &dispatcher,
            request(Method::POST, "/v1/traces/", Some(CONTENT_TYPE_PROTOBUF)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
