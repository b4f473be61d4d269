//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Failed login:
//!     → blocker.rs (escalate per-address delay, sleep it out)
//!     → 401 challenge
//! Successful login:
//!     → blocker.rs (forget the address)
//! ```

pub mod blocker;

pub use blocker::Blocker;
