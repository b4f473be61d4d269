//! End-to-end tests against a running gate.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::StatusCode;
use serde_json::Value;

use request_gate::auth::digest::{self, Challenge, DigestResponse, Qop};
use request_gate::auth::AuthMethod;

mod common;

#[tokio::test]
async fn test_basic_login() {
    let (addr, shutdown, _) = common::spawn_gate(common::test_config()).await;

    let res = reqwest::Client::new()
        .get(format!("http://{}//rest//db/?q=1", addr))
        .header(AUTHORIZATION, common::basic_header("alice", "secret"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));

    let json: Value = res.json().await.unwrap();
    assert_eq!(json["identity"]["name"], "alice");
    assert_eq!(json["path"], "/rest/db");
    assert_eq!(json["method"], "GET");
    assert_eq!(json["params"]["q"], "1");
    assert_eq!(json["client"], "127.0.0.1");

    shutdown.trigger();
}

#[tokio::test]
async fn test_missing_credentials_are_challenged() {
    let (addr, shutdown, _) = common::spawn_gate(common::test_config()).await;

    let res = reqwest::get(format!("http://{}/", addr)).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()[WWW_AUTHENTICATE], "Basic realm=\"docstore\"");
    assert_eq!(res.headers()["x-status-message"], "no username specified");
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "no username specified");

    shutdown.trigger();
}

#[tokio::test]
async fn test_digest_round_trip_with_body_integrity() {
    let mut config = common::test_config();
    config.auth.method = AuthMethod::Digest;
    let (addr, shutdown, _) = common::spawn_gate(config).await;
    let client = reqwest::Client::new();
    let url = format!("http://{}/rest/db", addr);
    let body = "name=report&tag=a&tag=b";

    let first = client.post(&url).body(body).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);
    let challenge = first
        .headers()
        .get(WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .and_then(Challenge::parse)
        .expect("digest challenge");
    assert_eq!(challenge.realm, "docstore");
    assert_eq!(challenge.qop, vec![Qop::Auth, Qop::AuthInt]);

    let ha1 = digest::ha1("alice", &challenge.realm, "secret");
    let response = DigestResponse {
        ha1: &ha1,
        algorithm: challenge.algorithm,
        nonce: &challenge.nonce,
        cnonce: "0a4f113b",
        nc: "00000001",
        qop: Some(Qop::AuthInt),
        method: "POST",
        uri: "/rest/db",
        body: body.as_bytes(),
    }
    .compute();
    let authorization = format!(
        "Digest username=\"alice\", realm=\"docstore\", nonce=\"{}\", uri=\"/rest/db\", \
         qop=auth-int, nc=00000001, cnonce=\"0a4f113b\", response=\"{}\"",
        challenge.nonce, response
    );

    let res = client
        .post(&url)
        .header(AUTHORIZATION, authorization)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let json: Value = res.json().await.unwrap();
    assert_eq!(json["identity"]["name"], "alice");
    assert_eq!(json["params"]["name"], "report");
    assert_eq!(json["params"]["tag"], serde_json::json!(["a", "b"]));

    shutdown.trigger();
}

#[tokio::test]
async fn test_failed_logins_are_delayed_until_success() {
    let (addr, shutdown, authenticator) = common::spawn_gate(common::test_config()).await;
    let client = reqwest::Client::new();
    let url = format!("http://{}/", addr);

    for _ in 0..2 {
        let start = Instant::now();
        let res = client
            .get(&url)
            .header(AUTHORIZATION, common::basic_header("alice", "wrong"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
    assert_eq!(authenticator.blocker().failures("127.0.0.1"), 2);
    assert_eq!(
        authenticator.blocker().current_delay("127.0.0.1"),
        Some(Duration::from_millis(100))
    );

    let res = client
        .get(&url)
        .header(AUTHORIZATION, common::basic_header("alice", "secret"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(authenticator.blocker().failures("127.0.0.1"), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_shutdown_stops_server() {
    let authenticator = request_gate::lifecycle::startup::build_authenticator(&common::test_config());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let shutdown = request_gate::Shutdown::new();
    let server = request_gate::GateServer::new(common::test_config(), authenticator);
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}
