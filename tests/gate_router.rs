//! In-process tests of the gate middleware.

use axum::body::Body;
use axum::extract::Extension;
use axum::http::{header, Request, StatusCode};
use axum::routing::post;
use axum::Router;
use tower::ServiceExt;

use request_gate::auth::digest::{self, Algorithm, DigestResponse, Qop};
use request_gate::auth::AuthMethod;
use request_gate::lifecycle::startup;
use request_gate::{ConnectionContext, GateServer};

mod common;

#[tokio::test]
async fn test_options_preflight_is_admin() {
    let (app, authenticator) = common::router(common::test_config());

    let response = app
        .oneshot(Request::options("/anything").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = common::json_body(response).await;
    assert_eq!(json["identity"]["name"], "admin");
    assert_eq!(json["identity"]["builtin"], true);
    assert!(authenticator.blocker().is_empty());
}

#[tokio::test]
async fn test_unsupported_method_is_405() {
    let (app, authenticator) = common::router(common::test_config());

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/")
                .header(header::AUTHORIZATION, common::basic_header("alice", "secret"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(authenticator.blocker().is_empty());
}

#[tokio::test]
async fn test_failures_are_charged_to_forwarded_client() {
    let (app, authenticator) = common::router(common::test_config());

    let response = app
        .oneshot(
            Request::get("/")
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                .header(header::AUTHORIZATION, common::basic_header("mallory", "x"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["x-status-message"], "unknown user");
    assert_eq!(authenticator.blocker().failures("203.0.113.9"), 1);
    assert_eq!(authenticator.blocker().failures("127.0.0.1"), 0);
}

#[tokio::test]
async fn test_basic_on_digest_gate_gets_digest_challenge() {
    let mut config = common::test_config();
    config.auth.method = AuthMethod::Digest;
    let (app, _) = common::router(config);

    let response = app
        .oneshot(
            Request::get("/")
                .header(header::AUTHORIZATION, common::basic_header("alice", "secret"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["x-status-message"], "wrong authentication method");
    let challenge = response.headers()[header::WWW_AUTHENTICATE].to_str().unwrap();
    assert!(challenge.starts_with("Digest realm=\"docstore\""));
}

#[tokio::test]
async fn test_default_user_without_credentials() {
    let mut config = common::test_config();
    config.auth.default_user = Some("alice".into());
    let (app, _) = common::router(config);

    let response = app
        .oneshot(
            Request::get("/db")
                .header(header::ACCEPT, "application/json, text/*;q=0.5, */*;q=0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = common::json_body(response).await;
    assert_eq!(json["identity"]["name"], "alice");
    assert_eq!(json["accept"].as_array().unwrap().len(), 2);
    assert_eq!(json["serialization"]["media_type"], "application/json");
    assert_eq!(json["serialization"]["method"], "xml");
}

#[tokio::test]
async fn test_oversized_body_is_400() {
    let mut config = common::test_config();
    config.listener.max_body_size = 8;
    let (app, _) = common::router(config);

    let response = app
        .oneshot(
            Request::post("/")
                .header(header::AUTHORIZATION, common::basic_header("alice", "secret"))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("a=0123456789abcdef"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_downstream_reads_cached_body() {
    let config = common::test_config();
    let authenticator = startup::build_authenticator(&config);
    let downstream = Router::new().route(
        "/upload",
        post(|Extension(ctx): Extension<ConnectionContext>| async move {
            let first = ctx.body().await.unwrap();
            let second = ctx.body().await.unwrap();
            assert_eq!(first, second);
            format!("{}:{}", ctx.body_cache().transport_reads(), first.len())
        }),
    );
    let app = GateServer::with_downstream(config, authenticator, downstream)
        .router()
        .layer(axum::extract::connect_info::MockConnectInfo(std::net::SocketAddr::from(common::PEER)));

    let response = app
        .oneshot(
            Request::post("/upload")
                .header(header::AUTHORIZATION, common::basic_header("admin", "admin"))
                .body(Body::from("<doc/>"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"1:6");
}

#[tokio::test]
async fn test_oversized_auth_int_body_is_400_and_not_charged() {
    let mut config = common::test_config();
    config.auth.method = AuthMethod::Digest;
    config.listener.max_body_size = 8;
    let (app, authenticator) = common::router(config);

    let body = b"0123456789abcdefghij";
    let ha1 = digest::ha1("alice", "docstore", "secret");
    let response = DigestResponse {
        ha1: &ha1,
        algorithm: Algorithm::Md5,
        nonce: "b1f3e0",
        cnonce: "0a4f113b",
        nc: "00000001",
        qop: Some(Qop::AuthInt),
        method: "POST",
        uri: "/upload",
        body,
    }
    .compute();
    let authorization = format!(
        "Digest username=\"alice\", realm=\"docstore\", nonce=\"b1f3e0\", uri=\"/upload\", \
         qop=auth-int, nc=00000001, cnonce=\"0a4f113b\", response=\"{}\"",
        response
    );

    let response = app
        .oneshot(
            Request::post("/upload")
                .header(header::AUTHORIZATION, authorization)
                .body(Body::from(&body[..]))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    assert!(authenticator.blocker().is_empty());
}
