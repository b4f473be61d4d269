//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization header
//!     → method.rs (scheme selection, challenges)
//!     → basic.rs / digest.rs (credential decoding and hashing)
//!     → engine.rs (store lookup, blocker, identity)
//! ```

pub mod basic;
pub mod digest;
pub mod engine;
pub mod method;

pub use engine::{Authenticator, Identity, ADMIN_USER};
pub use method::AuthMethod;
