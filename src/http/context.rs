//! Per-request connection context.
//!
//! # Responsibilities
//! - Capture the normalized path, method, headers and query of a request
//! - Resolve the client address and accepted media types once
//! - Carry the identity established by the authenticator
//! - Own the body cache, serializer options and response state
//!
//! # Design Decisions
//! - Built before authentication so failures still have a response state
//! - Chained contexts share the body cache but start a fresh response

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::{
    body::{Body, Bytes},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::auth::{AuthMethod, Identity};
use crate::config::GateConfig;
use crate::error::GateError;
use crate::http::address;
use crate::http::body::BodyCache;
use crate::http::form::{self, Params};
use crate::http::media::{self, AcceptEntry};
use crate::http::method::Method;
use crate::http::path;
use crate::http::request::RequestIdExt;
use crate::http::response::ResponseState;

/// Output options consulted by downstream serializers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SerializerOptions {
    pub method: String,
    pub indent: bool,
    pub encoding: String,
    pub media_type: Option<String>,
    /// Free-form serializer parameters.
    pub parameters: BTreeMap<String, String>,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            method: "xml".to_string(),
            indent: true,
            encoding: "UTF-8".to_string(),
            media_type: None,
            parameters: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionContext {
    request_id: String,
    path: String,
    method: Method,
    headers: HeaderMap,
    query: Option<String>,
    accepts: Vec<AcceptEntry>,
    client_address: String,
    auth_method: AuthMethod,
    identity: Option<Identity>,
    serialization: Option<SerializerOptions>,
    body: BodyCache,
    response: ResponseState,
}

impl ConnectionContext {
    /// Build a context from the request head and its unread body.
    ///
    /// Fails only for methods the gate does not serve.
    pub fn from_parts(
        parts: &Parts,
        body: Body,
        peer: SocketAddr,
        config: &GateConfig,
    ) -> Result<Self, GateError> {
        let method = Method::try_from(&parts.method)?;
        let headers = parts.headers.clone();
        let accepts = media::parse_accept(headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()));
        let client_address = address::client_address(&headers, peer, &config.proxy.forward_headers);

        Ok(Self {
            request_id: headers.request_id().to_string(),
            path: path::normalize(Some(parts.uri.path())),
            method,
            query: parts.uri.query().map(str::to_string),
            accepts,
            client_address,
            auth_method: config.auth.method,
            identity: None,
            serialization: None,
            body: BodyCache::new(body, config.listener.max_body_size),
            response: ResponseState::default(),
            headers,
        })
    }

    /// Derive a context for a nested request on another path.
    ///
    /// The body cache is shared, so the transport is never read twice.
    pub fn chain(&self, path: &str) -> Self {
        Self {
            path: path::normalize(Some(path)),
            response: ResponseState::default(),
            ..self.clone()
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value, if present and valid ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn accepted(&self) -> &[AcceptEntry] {
        &self.accepts
    }

    /// Whether any accepted entry covers `main/sub`.
    pub fn accepts(&self, main: &str, sub: &str) -> bool {
        self.accepts.iter().any(|entry| entry.matches(main, sub))
    }

    pub fn client_address(&self) -> &str {
        &self.client_address
    }

    pub fn auth_method(&self) -> AuthMethod {
        self.auth_method
    }

    pub fn set_auth_method(&mut self, method: AuthMethod) {
        self.auth_method = method;
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Serializer options, created with defaults on first access.
    pub fn serialization(&mut self) -> &mut SerializerOptions {
        self.serialization.get_or_insert_with(SerializerOptions::default)
    }

    /// Serializer options without materializing them.
    pub fn serialization_options(&self) -> SerializerOptions {
        self.serialization.clone().unwrap_or_default()
    }

    pub fn body_cache(&self) -> &BodyCache {
        &self.body
    }

    /// The request body, read from the transport on first use.
    pub async fn body(&self) -> Result<Bytes, GateError> {
        self.body.body().await
    }

    /// Query parameters followed by body parameters.
    ///
    /// The body is only decoded for methods that carry one.
    pub async fn params(&self) -> Result<Params, GateError> {
        let mut params = Params::new();
        if let Some(query) = &self.query {
            form::decode_urlencoded(query, &mut params);
        }
        if self.method.permits_body() {
            let body = self.body().await?;
            params.merge(form::decode(&body, self.header(header::CONTENT_TYPE.as_str())));
        }
        Ok(params)
    }

    /// Commit a response status. See [`ResponseState::status`].
    pub fn status(&mut self, status: StatusCode, message: Option<&str>, body: Option<&str>) -> bool {
        self.response.status(status, message, body)
    }

    pub fn response_mut(&mut self) -> &mut ResponseState {
        &mut self.response
    }

    pub fn response(&self) -> &ResponseState {
        &self.response
    }
}

impl IntoResponse for ConnectionContext {
    fn into_response(self) -> Response {
        self.response.into_response()
    }
}
