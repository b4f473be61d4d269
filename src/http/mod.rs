//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, gate middleware)
//!     → context.rs (path, method, client address, Accept, body cache)
//!     → [authenticator resolves identity]
//!     → downstream handler (context in request extensions)
//!     → response.rs (status, challenge, sanitized message)
//! ```

pub mod address;
pub mod body;
pub mod context;
pub mod form;
pub mod media;
pub mod method;
pub mod multipart;
pub mod path;
pub mod request;
pub mod response;
pub mod server;

pub use context::{ConnectionContext, SerializerOptions};
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::GateServer;
