//! HTTP server for Attest.
//!
//! Exposes the record lifecycle over a small JSON API. Caller identity comes
//! from the `x-principal` header set by the upstream authentication layer;
//! the server itself performs no authentication.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use auth::{Caller, PRINCIPAL_HEADER};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use server::{spawn_sweeper, AttestServer};

#[cfg(test)]
mod tests {
    use super::*;
    use attest_sdk::{Attest, ContentHash, PrincipalId};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::util::ServiceExt;

    fn app() -> (Attest, Router) {
        let attest = Attest::in_memory().unwrap();
        let router = router::build_router(AppState::new(attest.clone()), 1024);
        (attest, router)
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        principal: Option<&str>,
        body: Body,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(p) = principal {
            builder = builder.header(PRINCIPAL_HEADER, p);
        }
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn upload(app: &Router, owner: &str, bytes: &'static [u8]) -> String {
        let (status, json) = call(app, Method::POST, "/v1/records", Some(owner), Body::from(bytes)).await;
        assert_eq!(status, StatusCode::CREATED);
        json["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (_, app) = app();
        let (status, json) = call(&app, Method::GET, "/v1/health", None, Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn info_endpoint() {
        let (attest, app) = app();
        let (status, json) = call(&app, Method::GET, "/v1/info", None, Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["writer"], attest.writer().as_str());
    }

    #[tokio::test]
    async fn missing_principal_is_unauthorized() {
        let (_, app) = app();
        let (status, json) =
            call(&app, Method::POST, "/v1/records", None, Body::from("data")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "unauthenticated");
    }

    #[tokio::test]
    async fn full_lifecycle_over_http() {
        let (_, app) = app();
        let id = upload(&app, "alice", b"report").await;

        let commit_uri = format!("/v1/records/{id}/commit");
        let (status, json) = call(&app, Method::POST, &commit_uri, Some("alice"), Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["ledger_ref"]["sequence"], 1);

        let (status, json) = call(&app, Method::POST, &commit_uri, Some("alice"), Body::empty()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "already_committed");

        let verify_uri = format!("/v1/records/{id}/verify");
        let (status, json) = call(&app, Method::GET, &verify_uri, Some("alice"), Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["verdict"], "verified");
        assert_eq!(json["local_hash"], json["ledger_hash"]);

        let access_uri = format!("/v1/records/{id}/access?accessor=bob");
        let (status, json) = call(&app, Method::POST, &access_uri, Some("alice"), Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["history"][0]["accessor"], "bob");

        let access_uri = format!("/v1/records/{id}/access");
        let (_, json) = call(&app, Method::POST, &access_uri, Some("alice"), Body::empty()).await;
        assert_eq!(json["history"].as_array().unwrap().len(), 2);
        assert_eq!(json["history"][1]["accessor"], "alice");

        let history_uri = format!("/v1/records/{id}/history");
        let (status, json) = call(&app, Method::GET, &history_uri, Some("alice"), Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["entries"].as_array().unwrap().len(), 2);
        assert!(json.get("warning").is_none());

        let record_uri = format!("/v1/records/{id}");
        let (status, _) = call(&app, Method::DELETE, &record_uri, Some("alice"), Body::empty()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, json) = call(&app, Method::GET, &verify_uri, Some("alice"), Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "not_found");
    }

    #[tokio::test]
    async fn records_are_scoped_to_owner() {
        let (_, app) = app();
        let id = upload(&app, "alice", b"private").await;

        let uri = format!("/v1/records/{id}/commit");
        let (status, _) = call(&app, Method::POST, &uri, Some("mallory"), Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, listed) = call(&app, Method::GET, "/v1/records", Some("mallory"), Body::empty()).await;
        assert!(listed.as_array().unwrap().is_empty());
        let (_, listed) = call(&app, Method::GET, "/v1/records", Some("alice"), Body::empty()).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn uncommitted_record_cannot_be_verified() {
        let (_, app) = app();
        let id = upload(&app, "alice", b"draft").await;
        let uri = format!("/v1/records/{id}/verify");
        let (status, _) = call(&app, Method::GET, &uri, Some("alice"), Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ledger_failures_map_to_gateway_statuses() {
        let (attest, app) = app();
        let id = upload(&app, "alice", b"flaky").await;
        let node = attest.ledger_node().unwrap().clone();

        node.set_offline(true);
        let uri = format!("/v1/records/{id}/commit");
        let (status, json) = call(&app, Method::POST, &uri, Some("alice"), Body::empty()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"], "ledger_unavailable");
        node.set_offline(false);

        call(&app, Method::POST, &uri, Some("alice"), Body::empty()).await;
        let verify_uri = format!("/v1/records/{id}/verify");
        let record_hash = attest.list(&PrincipalId::new("alice").unwrap()).unwrap()[0].content_hash();
        node.tamper_document(&record_hash, ContentHash::from_digest([5; 32]))
            .unwrap();
        let (status, json) = call(&app, Method::GET, &verify_uri, Some("alice"), Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["verdict"], "ledger_mismatch");
    }

    #[tokio::test]
    async fn malformed_id_is_bad_request() {
        let (_, app) = app();
        let (status, json) = call(
            &app,
            Method::POST,
            "/v1/records/not-a-uuid/commit",
            Some("alice"),
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "bad_request");
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let (_, app) = app();
        let body = Body::from(vec![0u8; 4096]);
        let (status, _) = call(&app, Method::POST, "/v1/records", Some("alice"), body).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }
}
