//! Fn FDK listener
//!
//! The platform talks HTTP/1.1 over a unix socket named by `FN_LISTENER` and
//! delivers each invocation as `POST /call`. The socket is bound under a
//! phony name, opened up to 0666 and then symlinked into place so the agent
//! never connects to a half-initialized socket.

use std::path::{Path, PathBuf};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::net::{TcpListener, UnixListener};
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::{error, info, warn, Instrument};

use urlcast_core::{Error, Result};

use crate::handler::Relay;

const FDK_VERSION_HEADER: &str = "fn-fdk-version";
const CALL_ID_HEADER: &str = "fn-call-id";
const DEADLINE_HEADER: &str = "fn-deadline";

/// Where the listener binds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddr {
    Unix(PathBuf),
    Tcp(String),
}

impl ListenAddr {
    /// Parse `unix:/path/to/sock` or `tcp:host:port`
    pub fn parse(s: &str) -> Result<Self> {
        if let Some(path) = s.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(Error::Config("FN_LISTENER has an empty socket path".into()));
            }
            Ok(Self::Unix(PathBuf::from(path)))
        } else if let Some(addr) = s.strip_prefix("tcp:") {
            Ok(Self::Tcp(addr.to_string()))
        } else {
            Err(Error::Config(format!(
                "FN_LISTENER must start with unix: or tcp:, got {}",
                s
            )))
        }
    }
}

fn fdk_version() -> HeaderValue {
    HeaderValue::from_static(concat!("fdk-rust/", env!("CARGO_PKG_VERSION")))
}

pub fn router(relay: Relay) -> Router {
    Router::new()
        .route("/call", post(call))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(relay)
}

async fn call(State(relay): State<Relay>, headers: HeaderMap, body: Bytes) -> Response {
    let call_id = headers
        .get(CALL_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let span = tracing::info_span!("invocation", call_id = %call_id);

    let deadline = match parse_deadline(&headers) {
        Ok(deadline) => deadline,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e),
    };
    let remaining = match deadline {
        Some(deadline) => match (deadline - Utc::now()).to_std() {
            Ok(remaining) => Some(remaining),
            Err(_) => {
                warn!(parent: &span, "Deadline {} already passed", deadline);
                return timeout_response();
            }
        },
        None => None,
    };

    // The publish runs to completion even if the caller gives up on us.
    let task = tokio::spawn(async move { relay.handle(&body).await }.instrument(span.clone()));

    let joined = match remaining {
        Some(remaining) => match tokio::time::timeout(remaining, task).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(parent: &span, "Invocation exceeded its deadline");
                return timeout_response();
            }
        },
        None => task.await,
    };

    match joined {
        Ok(Ok(invocation)) => {
            let mut response = (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                invocation.url,
            )
                .into_response();
            response
                .headers_mut()
                .insert(FDK_VERSION_HEADER, fdk_version());
            response
        }
        Ok(Err(e)) => {
            error!(parent: &span, code = e.code(), "Invocation failed: {}", e);
            error_response(StatusCode::BAD_GATEWAY, &e)
        }
        Err(e) => {
            let e = Error::Internal(format!("handler task failed: {}", e));
            error!(parent: &span, "{}", e);
            error_response(StatusCode::BAD_GATEWAY, &e)
        }
    }
}

fn parse_deadline(headers: &HeaderMap) -> Result<Option<DateTime<Utc>>> {
    let Some(value) = headers.get(DEADLINE_HEADER) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| Error::InvalidRequest("Fn-Deadline is not ASCII".into()))?;
    DateTime::parse_from_rfc3339(value)
        .map(|d| Some(d.with_timezone(&Utc)))
        .map_err(|e| Error::InvalidRequest(format!("invalid Fn-Deadline {}: {}", value, e)))
}

fn error_response(status: StatusCode, e: &Error) -> Response {
    let mut response = (
        status,
        Json(json!({ "code": e.code(), "message": e.to_string() })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(FDK_VERSION_HEADER, fdk_version());
    response
}

fn timeout_response() -> Response {
    let mut response = (
        StatusCode::GATEWAY_TIMEOUT,
        Json(json!({ "code": "Timeout", "message": "function deadline exceeded" })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(FDK_VERSION_HEADER, fdk_version());
    response
}

/// Serve invocations until SIGTERM or ctrl-c
pub async fn serve(relay: Relay, addr: ListenAddr) -> Result<()> {
    let app = router(relay);

    match addr {
        ListenAddr::Unix(path) => {
            let listener = bind_unix(&path)?;
            info!("Listening for invocations on unix:{}", path.display());
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            let _ = std::fs::remove_file(&path);
        }
        ListenAddr::Tcp(addr) => {
            let listener = TcpListener::bind(&addr).await?;
            info!("Listening for invocations on tcp:{}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    info!("Listener stopped");
    Ok(())
}

fn bind_unix(path: &Path) -> Result<UnixListener> {
    use std::os::unix::fs::PermissionsExt;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Config(format!("socket path {} has no parent", path.display())))?;
    let name = path
        .file_name()
        .ok_or_else(|| Error::Config(format!("socket path {} has no file name", path.display())))?;
    let phony_name = format!("phony{}", name.to_string_lossy());
    let phony = dir.join(&phony_name);

    for stale in [phony.as_path(), path] {
        if stale.symlink_metadata().is_ok() {
            std::fs::remove_file(stale)?;
        }
    }

    let listener = UnixListener::bind(&phony)?;
    std::fs::set_permissions(&phony, std::fs::Permissions::from_mode(0o666))?;
    // relative target
    std::os::unix::fs::symlink(&phony_name, path)?;

    Ok(listener)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::{event_body, producer, Stub};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;
    use urlcast_core::config::PublishFailurePolicy;

    fn relay(stub: Stub, policy: PublishFailurePolicy) -> Relay {
        Relay::new("us-phoenix-1", producer(stub), policy)
    }

    fn call_request() -> axum::http::request::Builder {
        Request::builder()
            .method("POST")
            .uri("/call")
            .header(CALL_ID_HEADER, "01ABC")
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_call_returns_url() {
        let app = router(relay(
            Stub::Accept {
                offset: 42,
                partition: 0,
            },
            PublishFailurePolicy::Log,
        ));

        let response = app
            .oneshot(
                call_request()
                    .body(Body::from(event_body()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get(FDK_VERSION_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("fdk-rust/"));
        assert_eq!(
            body_string(response).await,
            "https://objectstorage.us-phoenix-1.oraclecloud.com/n/ns1/b/bkt1/o/obj1"
        );
    }

    #[tokio::test]
    async fn test_call_rejects_bad_event() {
        let app = router(relay(
            Stub::Accept {
                offset: 1,
                partition: 0,
            },
            PublishFailurePolicy::Log,
        ));

        let response = app
            .oneshot(
                call_request()
                    .body(Body::from(r#"{"data":{}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().contains_key(FDK_VERSION_HEADER));
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["code"], "DecodeError");
    }

    #[tokio::test]
    async fn test_call_publish_failure_policies() {
        let logged = router(relay(Stub::Refuse, PublishFailurePolicy::Log))
            .oneshot(
                call_request()
                    .body(Body::from(event_body()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(logged.status(), StatusCode::OK);

        let failed = router(relay(Stub::Refuse, PublishFailurePolicy::Fail))
            .oneshot(
                call_request()
                    .body(Body::from(event_body()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(failed.status(), StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = serde_json::from_str(&body_string(failed).await).unwrap();
        assert_eq!(body["code"], "PublishError");
    }

    #[tokio::test]
    async fn test_call_past_deadline() {
        let app = router(relay(
            Stub::Accept {
                offset: 1,
                partition: 0,
            },
            PublishFailurePolicy::Log,
        ));

        let response = app
            .oneshot(
                call_request()
                    .header(DEADLINE_HEADER, "2001-01-01T00:00:00.000Z")
                    .body(Body::from(event_body()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(response.headers().contains_key(FDK_VERSION_HEADER));
    }

    #[tokio::test]
    async fn test_call_deadline_while_publishing() {
        let app = router(relay(Stub::Hang, PublishFailurePolicy::Log));
        let deadline = (Utc::now() + chrono::Duration::milliseconds(200)).to_rfc3339();

        let response = app
            .oneshot(
                call_request()
                    .header(DEADLINE_HEADER, deadline)
                    .body(Body::from(event_body()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_call_invalid_deadline() {
        let app = router(relay(
            Stub::Accept {
                offset: 1,
                partition: 0,
            },
            PublishFailurePolicy::Log,
        ));

        let response = app
            .oneshot(
                call_request()
                    .header(DEADLINE_HEADER, "tomorrow")
                    .body(Body::from(event_body()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["code"], "InvalidRequest");
    }

    #[test]
    fn test_listen_addr_parse() {
        assert_eq!(
            ListenAddr::parse("unix:/tmp/iofs/lsnr.sock").unwrap(),
            ListenAddr::Unix(PathBuf::from("/tmp/iofs/lsnr.sock"))
        );
        assert_eq!(
            ListenAddr::parse("tcp:127.0.0.1:8080").unwrap(),
            ListenAddr::Tcp("127.0.0.1:8080".into())
        );
        assert!(ListenAddr::parse("unix:").is_err());
        assert!(ListenAddr::parse("/tmp/lsnr.sock").is_err());
    }

    #[tokio::test]
    async fn test_bind_unix_phony_symlink() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lsnr.sock");

        let _listener = bind_unix(&path).unwrap();

        let link = std::fs::symlink_metadata(&path).unwrap();
        assert!(link.file_type().is_symlink());
        assert_eq!(
            std::fs::read_link(&path).unwrap(),
            PathBuf::from("phonylsnr.sock")
        );
        let mode = std::fs::metadata(dir.path().join("phonylsnr.sock"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o666);
    }
}
