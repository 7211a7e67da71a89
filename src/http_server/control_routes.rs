//! Control Routes
//!
//! The per-node control surface. Operators and peers use the same
//! endpoints:
//!
//! - `GET  /status`       current status, mode and neighbours
//! - `POST /reset`        stop if running, clear temp status
//! - `POST /stop`         stop, optionally with a temp status message
//! - `POST /temp-status`  set a temp status without stopping
//! - `POST /update`       store a pushed payload
//! - `GET  /sync`         read the cached payload
//! - `POST /topology`     sender is now this node's parent
//! - `POST /push`         fan a payload out (active node only)
//!
//! Bodies are parsed by hand so malformed input gets the same JSON error
//! shape as every other failure.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::engine::Lighthouse;
use crate::errors::{FailoverError, FailoverResult};
use crate::protocol::{StatusReport, StopRequest, SyncReport, TempStatusRequest, TopologyNotice};
use crate::registry::split_host_port;
use crate::status::StopReason;
use crate::sync::PushReport;

/// Create control routes
pub fn control_routes(engine: Arc<Lighthouse>) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/reset", post(reset_handler))
        .route("/stop", post(stop_handler))
        .route("/temp-status", post(temp_status_handler))
        .route("/update", post(update_handler))
        .route("/sync", get(sync_handler))
        .route("/topology", post(topology_handler))
        .route("/push", post(push_handler))
        .with_state(engine)
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> FailoverResult<T> {
    if body.is_empty() {
        return Err(FailoverError::InvalidRequest("empty body".to_string()));
    }
    serde_json::from_slice(body).map_err(|e| FailoverError::InvalidRequest(e.to_string()))
}

// ==================
// Status
// ==================

async fn status_handler(State(engine): State<Arc<Lighthouse>>) -> Json<StatusReport> {
    Json(engine.status_report())
}

async fn reset_handler(State(engine): State<Arc<Lighthouse>>) -> Result<StatusCode, FailoverError> {
    engine.status_machine().reset()?;
    Ok(StatusCode::NO_CONTENT)
}

async fn stop_handler(
    State(engine): State<Arc<Lighthouse>>,
    body: Bytes,
) -> Result<StatusCode, FailoverError> {
    let reason = if body.is_empty() {
        None
    } else {
        let request: StopRequest = parse_body(&body)?;
        let reason = StopReason::new(request.message);
        Some(match request.timeout_secs {
            Some(secs) => reason.with_timeout(Duration::from_secs(secs)),
            None => reason,
        })
    };

    engine.status_machine().stop_main(reason)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn temp_status_handler(
    State(engine): State<Arc<Lighthouse>>,
    body: Bytes,
) -> Result<Json<StatusReport>, FailoverError> {
    let request: TempStatusRequest = parse_body(&body)?;
    engine
        .status_machine()
        .set_temporary_status(request.message, Duration::from_secs(request.timeout_secs));
    Ok(Json(engine.status_report()))
}

// ==================
// Updates
// ==================

async fn update_handler(
    State(engine): State<Arc<Lighthouse>>,
    body: Bytes,
) -> Result<StatusCode, FailoverError> {
    let payload: Value = parse_body(&body)?;
    engine.propagation().receive_update(payload);
    Ok(StatusCode::NO_CONTENT)
}

async fn sync_handler(State(engine): State<Arc<Lighthouse>>) -> Json<SyncReport> {
    Json(SyncReport::from(engine.propagation().current().as_ref()))
}

async fn push_handler(
    State(engine): State<Arc<Lighthouse>>,
    body: Bytes,
) -> Result<Json<PushReport>, FailoverError> {
    let payload: Value = parse_body(&body)?;
    let report = engine.propagation().push_update(payload).await?;
    Ok(Json(report))
}

// ==================
// Topology
// ==================

async fn topology_handler(
    State(engine): State<Arc<Lighthouse>>,
    body: Bytes,
) -> Result<StatusCode, FailoverError> {
    let notice: TopologyNotice = parse_body(&body)?;
    if split_host_port(&notice.parent_addr).is_none() {
        return Err(FailoverError::InvalidRequest(format!(
            "parent_addr must be host:port, got {:?}",
            notice.parent_addr
        )));
    }
    engine.coordinator().accept_topology_notice(&notice.parent_addr);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::HandlerRegistry;
    use crate::registry::NodeConfig;
    use crate::status::Status;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    fn standby() -> Arc<Lighthouse> {
        Lighthouse::new(
            NodeConfig::standby("127.0.0.1:9002", "127.0.0.1:9001", vec![]),
            HandlerRegistry::new(),
        )
        .unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_status_reports_waiting() {
        let app = control_routes(standby());
        let response = app
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "waiting");
        assert_eq!(body["mode"], "standby");
        assert_eq!(body["parent_addr"], "127.0.0.1:9001");
    }

    #[tokio::test]
    async fn test_stop_with_message_sets_temp_status() {
        let engine = standby();
        engine.status_machine().start_main().unwrap();

        let response = control_routes(Arc::clone(&engine))
            .oneshot(post_json("/stop", json!({"message": "upgrade", "timeout_secs": 30})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let status = engine.status_machine().status();
        assert_eq!(status.message(), Some("upgrade"));
    }

    #[tokio::test]
    async fn test_plain_stop_and_reset() {
        let engine = standby();
        engine.status_machine().start_main().unwrap();

        let response = control_routes(Arc::clone(&engine))
            .oneshot(Request::post("/stop").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(engine.status_machine().status(), Status::Waiting);

        engine
            .status_machine()
            .set_temporary_status("hold", Duration::from_secs(60));
        let response = control_routes(Arc::clone(&engine))
            .oneshot(Request::post("/reset").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(engine.status_machine().status(), Status::Waiting);
    }

    #[tokio::test]
    async fn test_update_then_sync() {
        let engine = standby();

        let response = control_routes(Arc::clone(&engine))
            .oneshot(post_json("/update", json!({"leader": "n1", "epoch": 4})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = control_routes(engine)
            .oneshot(Request::get("/sync").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["payload"], json!({"leader": "n1", "epoch": 4}));
        assert!(body["received_at"].is_string());
    }

    #[tokio::test]
    async fn test_empty_sync_is_null() {
        let response = control_routes(standby())
            .oneshot(Request::get("/sync").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert!(body["payload"].is_null());
        assert!(body["received_at"].is_null());
    }

    #[tokio::test]
    async fn test_push_on_standby_conflicts() {
        let response = control_routes(standby())
            .oneshot(post_json("/push", json!({"k": 1})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert_eq!(body["code"], "LIGHTHOUSE_NOT_ACTIVE");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let response = control_routes(standby())
            .oneshot(
                Request::post("/temp-status")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "LIGHTHOUSE_INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_topology_notice_repoints_parent() {
        let engine = standby();
        let response = control_routes(Arc::clone(&engine))
            .oneshot(post_json("/topology", json!({"parent_addr": "127.0.0.1:9005"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            engine.status_report().parent_addr.as_deref(),
            Some("127.0.0.1:9005")
        );
    }

    #[tokio::test]
    async fn test_topology_notice_rejects_bad_address() {
        let response = control_routes(standby())
            .oneshot(post_json("/topology", json!({"parent_addr": "nowhere"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_failing_update_callback_still_accepted() {
        let engine = Lighthouse::new(
            NodeConfig::standby("127.0.0.1:9002", "127.0.0.1:9001", vec![]),
            HandlerRegistry::new().on_update(|_| Err("rejected".into())),
        )
        .unwrap();

        let response = control_routes(Arc::clone(&engine))
            .oneshot(post_json("/update", json!([1, 2, 3])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(engine.metrics().snapshot().callback_failures, 1);
    }
}
