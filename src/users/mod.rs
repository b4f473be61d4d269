//! Credential store.
//!
//! # Responsibilities
//! - Map user names to credential records
//! - Compare plaintext passwords against salted hashes
//! - Hold the precomputed digest hash (`HA1`) per user
//!
//! # Design Decisions
//! - Plaintext passwords are never stored
//! - Readers take a lock-free snapshot (`ArcSwap`); writers copy-on-write
//! - The authenticator only sees the `CredentialStore` trait

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::auth::digest;
use crate::config::GateConfig;

/// Read access to user credentials.
pub trait CredentialStore: Send + Sync {
    /// Look up a user by name.
    fn user(&self, name: &str) -> Option<Arc<User>>;
}

/// A stored credential record.
#[derive(Debug, Clone)]
pub struct User {
    name: String,
    salt: String,
    password_hash: String,
    digest_hash: String,
}

impl User {
    /// Create a record, deriving both hashes from the plaintext password.
    pub fn new(name: impl Into<String>, password: &str, realm: &str) -> Self {
        let name = name.into();
        let salt = hex::encode(rand::thread_rng().gen::<[u8; 16]>());
        let password_hash = salted_hash(&salt, password);
        let digest_hash = digest::ha1(&name, realm, password);
        Self {
            name,
            salt,
            password_hash,
            digest_hash,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check a plaintext password.
    pub fn matches(&self, password: &str) -> bool {
        constant_time_eq(
            salted_hash(&self.salt, password).as_bytes(),
            self.password_hash.as_bytes(),
        )
    }

    /// `MD5(name:realm:password)`.
    pub fn digest_hash(&self) -> &str {
        &self.digest_hash
    }
}

fn salted_hash(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare without short-circuiting on the first differing byte.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// In-process user directory.
pub struct UserDirectory {
    realm: String,
    users: ArcSwap<HashMap<String, Arc<User>>>,
}

impl UserDirectory {
    /// Create an empty directory for the given realm.
    pub fn new(realm: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
            users: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Build a directory seeded with the configured users.
    pub fn from_config(config: &GateConfig) -> Self {
        let directory = Self::new(config.auth.realm.clone());
        for user in &config.users {
            directory.add(&user.name, &user.password);
        }
        tracing::info!(users = directory.len(), realm = %directory.realm, "User directory loaded");
        directory
    }

    /// Add or replace a user.
    pub fn add(&self, name: &str, password: &str) {
        let user = Arc::new(User::new(name, password, &self.realm));
        self.users.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(name.to_string(), user.clone());
            next
        });
    }

    pub fn len(&self) -> usize {
        self.users.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStore for UserDirectory {
    fn user(&self, name: &str) -> Option<Arc<User>> {
        self.users.load().get(name).cloned()
    }
}
