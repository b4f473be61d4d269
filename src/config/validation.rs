//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, delays ordered)
//! - Check the user list for duplicates and unusable names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GateConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address: {0}")]
    BindAddress(String),
    #[error("realm must not be empty")]
    EmptyRealm,
    #[error("max_delay_ms ({max}) is below base_delay_ms ({base})")]
    DelayRange { base: u64, max: u64 },
    #[error("default_password is set without default_user")]
    PasswordWithoutUser,
    #[error("invalid user name: {0:?}")]
    UserName(String),
    #[error("duplicate user: {0}")]
    DuplicateUser(String),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::Zero("max_body_size"));
    }
    if config.blocker.retention_secs == 0 {
        errors.push(ValidationError::Zero("retention_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("request_secs"));
    }
    if config.auth.realm.trim().is_empty() {
        errors.push(ValidationError::EmptyRealm);
    }
    if config.auth.default_password.is_some() && config.auth.default_user.is_none() {
        errors.push(ValidationError::PasswordWithoutUser);
    }

    let blocker = &config.blocker;
    if blocker.max_delay_ms < blocker.base_delay_ms {
        errors.push(ValidationError::DelayRange {
            base: blocker.base_delay_ms,
            max: blocker.max_delay_ms,
        });
    }

    let mut seen = HashSet::new();
    for user in &config.users {
        if user.name.is_empty() || user.name.contains(':') {
            errors.push(ValidationError::UserName(user.name.clone()));
        } else if !seen.insert(user.name.as_str()) {
            errors.push(ValidationError::DuplicateUser(user.name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
