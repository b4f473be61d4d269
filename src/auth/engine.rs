//! Request authentication.
//!
//! # Responsibilities
//! - Pick the scheme from the `Authorization` header or configuration
//! - Verify Basic and Digest credentials against the credential store
//! - Charge failed attempts to the brute-force blocker
//! - Write 401 challenges for rejected requests
//!
//! # Design Decisions
//! - `OPTIONS` preflights pass as the built-in administrator
//! - Digest credentials are accepted on a Basic-configured gate; Basic
//!   credentials on a Digest-configured gate are refused
//! - The blocker delay is paid before an authentication failure is returned
//! - Request errors met while verifying (unreadable `auth-int` body) are not
//!   charged to the client

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::header::AUTHORIZATION;
use axum::http::Uri;
use serde::Serialize;

use crate::auth::basic;
use crate::auth::digest::{Algorithm, DigestParams, DigestResponse, Qop};
use crate::auth::AuthMethod;
use crate::config::AuthConfig;
use crate::error::{AuthFailure, Rejection};
use crate::http::context::ConnectionContext;
use crate::http::method::Method;
use crate::http::path;
use crate::observability::metrics;
use crate::security::blocker::Blocker;
use crate::users::{constant_time_eq, CredentialStore, User};

/// Name of the built-in administrative identity.
pub const ADMIN_USER: &str = "admin";

/// An authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    name: String,
    builtin: bool,
}

impl Identity {
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            builtin: false,
        }
    }

    /// The built-in administrator, granted without consulting the store.
    pub fn admin() -> Self {
        Self {
            name: ADMIN_USER.to_string(),
            builtin: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin
    }
}

/// Resolves identities for incoming requests.
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    blocker: Arc<Blocker>,
    config: AuthConfig,
}

impl Authenticator {
    pub fn new(store: Arc<dyn CredentialStore>, blocker: Arc<Blocker>, config: AuthConfig) -> Self {
        Self { store, blocker, config }
    }

    pub fn init(&self) {
        tracing::info!(
            method = %self.config.method,
            realm = %self.config.realm,
            default_user = ?self.config.default_user,
            "Authenticator ready"
        );
    }

    /// Release waiting requests. Pending blocker sleeps end immediately.
    pub fn close(&self) {
        self.blocker.close();
        tracing::info!(blocked = self.blocker.len(), "Authenticator closed");
    }

    pub fn realm(&self) -> &str {
        &self.config.realm
    }

    pub fn method(&self) -> AuthMethod {
        self.config.method
    }

    pub fn blocker(&self) -> &Blocker {
        &self.blocker
    }

    /// Establish the identity of a request.
    ///
    /// `default_user` overrides the configured default for requests without
    /// credentials. On an authentication failure the blocker delay has
    /// already been served when this returns; request errors are returned
    /// without a delay.
    pub async fn authenticate(
        &self,
        ctx: &mut ConnectionContext,
        default_user: Option<&str>,
    ) -> Result<Identity, Rejection> {
        if ctx.method() == Method::Options {
            let identity = Identity::admin();
            ctx.set_identity(identity.clone());
            return Ok(identity);
        }

        let attempt = self.resolve(ctx, default_user).await;
        let scheme = ctx.auth_method().scheme();

        match attempt {
            Ok(user) => {
                metrics::record_auth_attempt(scheme, "success");
                self.blocker.remove(ctx.client_address());
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    client = %ctx.client_address(),
                    user = %user.name(),
                    scheme,
                    "Authenticated"
                );
                let identity = Identity::user(user.name());
                ctx.set_identity(identity.clone());
                Ok(identity)
            }
            Err(Rejection::Auth(failure)) => {
                metrics::record_auth_attempt(scheme, failure.label());
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    client = %ctx.client_address(),
                    path = %ctx.path(),
                    reason = failure.label(),
                    "Authentication failed"
                );
                self.blocker.delay(ctx.client_address()).await;
                Err(Rejection::Auth(failure))
            }
            Err(Rejection::Request(e)) => {
                metrics::record_auth_attempt(scheme, "request_error");
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    client = %ctx.client_address(),
                    error = %e,
                    "Request failed during authentication"
                );
                Err(Rejection::Request(e))
            }
        }
    }

    /// Commit a 401 with a challenge for the scheme attached to `ctx`.
    pub fn reject(&self, ctx: &mut ConnectionContext, failure: AuthFailure) {
        let challenge = ctx.auth_method().challenge(&self.config.realm);
        ctx.response_mut().unauthorized(challenge, &failure.to_string());
    }

    async fn resolve(
        &self,
        ctx: &mut ConnectionContext,
        default_user: Option<&str>,
    ) -> Result<Arc<User>, Rejection> {
        let header = match ctx.headers().get(AUTHORIZATION) {
            None => return Ok(self.default_login(default_user)?),
            Some(value) => value
                .to_str()
                .map_err(|_| AuthFailure::MalformedHeader)?
                .trim()
                .to_string(),
        };

        let (token, payload) = header.split_once(' ').unwrap_or((header.as_str(), ""));
        let presented = AuthMethod::from_scheme(token).ok_or(AuthFailure::WrongAuthMethod)?;

        match (self.config.method, presented) {
            (AuthMethod::Digest, AuthMethod::Basic) => return Err(AuthFailure::WrongAuthMethod.into()),
            (AuthMethod::Basic, AuthMethod::Digest) => {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    "Accepting digest credentials on a basic gate"
                );
            }
            _ => {}
        }
        ctx.set_auth_method(presented);

        match presented {
            AuthMethod::Basic => Ok(self.basic(payload)?),
            AuthMethod::Digest => self.digest(ctx, payload).await,
            AuthMethod::Custom => Err(AuthFailure::WrongAuthMethod.into()),
        }
    }

    fn default_login(&self, default_user: Option<&str>) -> Result<Arc<User>, AuthFailure> {
        let configured = self.config.default_user.as_deref();
        let name = default_user.or(configured).ok_or(AuthFailure::NoUsername)?;
        let user = self.store.user(name).ok_or(AuthFailure::UnknownUser)?;

        if let Some(password) = &self.config.default_password {
            if configured == Some(name) && !user.matches(password) {
                return Err(AuthFailure::BadCredentials);
            }
        }
        Ok(user)
    }

    fn basic(&self, payload: &str) -> Result<Arc<User>, AuthFailure> {
        let (name, password) = basic::decode(payload)?;
        let user = self.store.user(&name).ok_or(AuthFailure::UnknownUser)?;
        if user.matches(&password) {
            Ok(user)
        } else {
            Err(AuthFailure::BadCredentials)
        }
    }

    async fn digest(&self, ctx: &ConnectionContext, payload: &str) -> Result<Arc<User>, Rejection> {
        let params = DigestParams::parse(payload)?;
        let username = params.username.as_deref().ok_or(AuthFailure::NoUsername)?;
        let (nonce, uri, response) = match (
            params.nonce.as_deref(),
            params.uri.as_deref(),
            params.response.as_deref(),
        ) {
            (Some(nonce), Some(uri), Some(response)) => (nonce, uri, response),
            _ => return Err(AuthFailure::MalformedDigestHeader.into()),
        };

        let user = self.store.user(username).ok_or(AuthFailure::UnknownUser)?;

        let algorithm = match params.algorithm.as_deref() {
            Some(algorithm) => algorithm.parse::<Algorithm>()?,
            None => Algorithm::Md5,
        };
        let qop = params.qop.as_deref().map(str::parse::<Qop>).transpose()?;

        if qop.is_some() && (params.nc.is_none() || params.cnonce.is_none()) {
            return Err(AuthFailure::MalformedDigestHeader.into());
        }
        if algorithm == Algorithm::Md5Sess && params.cnonce.is_none() {
            return Err(AuthFailure::MalformedDigestHeader.into());
        }
        if !targets_request(uri, ctx) {
            tracing::debug!(request_id = %ctx.request_id(), digest_uri = %uri, "Digest uri does not match request");
            return Err(AuthFailure::MalformedDigestHeader.into());
        }

        let body = if qop == Some(Qop::AuthInt) {
            ctx.body().await?
        } else {
            Bytes::new()
        };

        let expected = DigestResponse {
            ha1: user.digest_hash(),
            algorithm,
            nonce,
            cnonce: params.cnonce.as_deref().unwrap_or_default(),
            nc: params.nc.as_deref().unwrap_or_default(),
            qop,
            method: ctx.method().as_str(),
            uri,
            body: &body,
        }
        .compute();

        if constant_time_eq(expected.as_bytes(), response.as_bytes()) {
            Ok(user)
        } else {
            Err(AuthFailure::BadCredentials.into())
        }
    }
}

/// Whether the digest `uri` names the request being authenticated.
///
/// Origin and absolute forms are both accepted; paths compare normalized.
fn targets_request(uri: &str, ctx: &ConnectionContext) -> bool {
    match uri.parse::<Uri>() {
        Ok(uri) => path::normalize(Some(uri.path())) == ctx.path() && uri.query() == ctx.query(),
        Err(_) => false,
    }
}
