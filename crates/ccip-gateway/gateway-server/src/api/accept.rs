use ccip_gateway_core::{
    Gateway,
    GatewayResponse,
    envelope::CcipErrorBody,
};

use core::convert::Infallible;
use std::{
    net::SocketAddr,
    sync::Arc,
    time::Instant,
};

use http_body_util::{
    BodyExt,
    Full,
    Limited,
};
use hyper::{
    Method,
    Request,
    Response,
    StatusCode,
    body::Bytes,
    header::{
        self,
        HeaderValue,
    },
};
use metrics::{
    counter,
    histogram,
};
use serde_json::json;
use tracing::{
    debug,
    info,
    warn,
};
use uuid::Uuid;

fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = CcipErrorBody {
        message: message.to_string(),
    };
    json_response(status, json!(body).to_string())
}

/// Records a request rejected before it reached the gateway pipeline.
fn record_rejection(outcome: &'static str, started: Instant) {
    counter!("ccip_requests_total", "outcome" => outcome).increment(1);
    histogram!("ccip_request_duration_seconds").record(started.elapsed().as_secs_f64());
}

/// Accepts an incoming HTTP request and answers it through the gateway
/// pipeline.
#[tracing::instrument(
    level = "debug",
    skip_all,
    target = "api::accept_request",
    fields(request_id, client_addr = %client_addr)
)]
pub async fn accept_request<B>(
    req: Request<B>,
    gateway: Arc<Gateway>,
    max_body_size: usize,
    client_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: hyper::body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let method = req.method().clone();

    if req.uri().path() == "/health" && method == Method::GET {
        let mut response = Response::new(Full::new(Bytes::from("ok")));
        *response.status_mut() = StatusCode::OK;
        return Ok(response);
    }

    if method == Method::OPTIONS {
        let mut response = json_response(StatusCode::NO_CONTENT, String::new());
        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("content-type"),
        );
        return Ok(response);
    }

    if method != Method::POST {
        let mut response = error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
        response
            .headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("POST"));
        record_rejection("method_not_allowed", started);
        return Ok(response);
    }

    let request_id = Uuid::new_v4();
    tracing::Span::current().record("request_id", tracing::field::display(&request_id));

    let body = match Limited::new(req.into_body(), max_body_size).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!(target: "api::accept_request", %request_id, %client_addr, error = %err, "Failed to read request body");
            record_rejection("malformed_envelope", started);
            return Ok(error_response(
                StatusCode::BAD_REQUEST,
                "malformed request body: failed to read request body",
            ));
        }
    };
    debug!(target: "api::accept_request", %request_id, size = body.len(), "Incoming request");

    // Handlers may block on storage, so keep them off the reactor threads. The
    // blocking task is not aborted if the client goes away.
    let outcome = tokio::task::spawn_blocking(move || gateway.respond(&body)).await;
    histogram!("ccip_request_duration_seconds").record(started.elapsed().as_secs_f64());

    let GatewayResponse { status, body } = match outcome {
        Ok(response) => response,
        Err(err) => {
            warn!(target: "api::accept_request", %request_id, error = %err, "Handler task failed");
            counter!("ccip_requests_total", "outcome" => "handler_panic").increment(1);
            return Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "handler error: handler task failed",
            ));
        }
    };

    info!(
        target: "api::accept_request",
        %request_id,
        %client_addr,
        status,
        elapsed_ms = started.elapsed().as_millis(),
        "Served request"
    );

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok(json_response(status, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_dyn_abi::DynSolValue;
    use alloy_primitives::Address;
    use ccip_gateway_core::GatewayConfig;
    use metrics_util::{
        MetricKind,
        debugging::{
            DebugValue,
            DebuggingRecorder,
        },
    };

    fn gateway() -> Arc<Gateway> {
        let mut gateway = Gateway::new(GatewayConfig::default());
        gateway
            .handle(
                "function addr(bytes32 namehash) view returns (address)",
                |_| Ok(vec![DynSolValue::Address(Address::ZERO)]),
            )
            .unwrap();
        Arc::new(gateway)
    }

    fn request(method: Method, path: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn send(req: Request<Full<Bytes>>, max_body_size: usize) -> (StatusCode, String) {
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let response = accept_request(req, gateway(), max_body_size, addr).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(request(Method::GET, "/health", ""), 1024).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_non_post_is_rejected() {
        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let (status, _) = send(request(method, "/", ""), 1024).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        }
    }

    #[tokio::test]
    async fn test_preflight() {
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let response = accept_request(request(Method::OPTIONS, "/", ""), gateway(), 1024, addr)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            HeaderValue::from_static("*")
        );
    }

    #[tokio::test]
    async fn test_post_runs_pipeline() {
        let body = format!(r#"{{"data":"0x3b3b57de{}"}}"#, "00".repeat(32));
        let (status, body) = send(request(Method::POST, "/", &body), 1024).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, format!(r#"{{"data":"0x{}"}}"#, "0".repeat(64)));
    }

    #[tokio::test]
    async fn test_oversized_body() {
        let body = format!(r#"{{"data":"0x3b3b57de{}"}}"#, "00".repeat(32));
        let (status, body) = send(request(Method::POST, "/", &body), 16).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("malformed request body"));
    }

    #[tokio::test]
    async fn test_unknown_function() {
        let (status, _) = send(request(Method::POST, "/", r#"{"data":"0xdeadbeef"}"#), 1024).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_rejections_are_counted() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("create tokio runtime");
            runtime.block_on(async {
                let (status, _) = send(request(Method::PUT, "/", ""), 1024).await;
                assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

                let body = format!(r#"{{"data":"0x3b3b57de{}"}}"#, "00".repeat(32));
                let (status, _) = send(request(Method::POST, "/", &body), 16).await;
                assert_eq!(status, StatusCode::BAD_REQUEST);
            });
        });

        let snapshot = snapshotter.snapshot().into_vec();
        for outcome in ["method_not_allowed", "malformed_envelope"] {
            let (_, _, _, value) = snapshot
                .iter()
                .find(|(composite_key, _, _, _)| {
                    composite_key.kind() == MetricKind::Counter
                        && composite_key.key().name() == "ccip_requests_total"
                        && composite_key
                            .key()
                            .labels()
                            .any(|label| label.key() == "outcome" && label.value() == outcome)
                })
                .expect("rejection counter should be emitted");
            assert_eq!(*value, DebugValue::Counter(1));
        }

        assert!(snapshot.iter().any(|(composite_key, _, _, _)| {
            composite_key.kind() == MetricKind::Histogram
                && composite_key.key().name() == "ccip_request_duration_seconds"
        }));
    }
}
