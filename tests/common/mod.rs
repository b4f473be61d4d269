//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::Response;
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;

use request_gate::auth::basic;
use request_gate::config::{GateConfig, UserConfig};
use request_gate::lifecycle::{startup, Shutdown};
use request_gate::{Authenticator, GateServer};

pub const PEER: ([u8; 4], u16) = ([127, 0, 0, 1], 40000);

/// Config with two users and short login delays.
pub fn test_config() -> GateConfig {
    let mut config = GateConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.blocker.base_delay_ms = 50;
    config.blocker.max_delay_ms = 200;
    config.users.push(UserConfig { name: "alice".into(), password: "secret".into() });
    config.users.push(UserConfig { name: "admin".into(), password: "admin".into() });
    config
}

pub fn basic_header(user: &str, password: &str) -> String {
    format!("Basic {}", basic::encode(user, password))
}

/// An in-process router with a fixed peer address.
pub fn router(config: GateConfig) -> (Router, Arc<Authenticator>) {
    let authenticator = startup::build_authenticator(&config);
    let server = GateServer::new(config, authenticator.clone());
    let router = server.router().layer(MockConnectInfo(SocketAddr::from(PEER)));
    (router, authenticator)
}

/// Start a gate on an ephemeral port.
pub async fn spawn_gate(config: GateConfig) -> (SocketAddr, Shutdown, Arc<Authenticator>) {
    let authenticator = startup::build_authenticator(&config);
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = GateServer::new(config, authenticator.clone());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown, authenticator)
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
