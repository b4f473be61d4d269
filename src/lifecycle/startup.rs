//! Startup orchestration.
//!
//! Subsystems initialize in dependency order: credential store, blocker,
//! authenticator. Listeners start last, in `main`.

use std::sync::Arc;

use crate::auth::Authenticator;
use crate::config::GateConfig;
use crate::security::Blocker;
use crate::users::UserDirectory;

/// Build and initialize the authenticator described by `config`.
pub fn build_authenticator(config: &GateConfig) -> Arc<Authenticator> {
    let directory = Arc::new(UserDirectory::from_config(config));
    let blocker = Arc::new(Blocker::new(&config.blocker));
    let authenticator = Arc::new(Authenticator::new(directory, blocker, config.auth.clone()));
    authenticator.init();
    authenticator
}
