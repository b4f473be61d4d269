//! Authentication and request front door for a document-store server.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod users;

pub use auth::{Authenticator, Identity};
pub use config::schema::GateConfig;
pub use error::{AuthFailure, GateError};
pub use http::{ConnectionContext, GateServer};
pub use lifecycle::Shutdown;
