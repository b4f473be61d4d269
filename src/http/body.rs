//! One-shot request body cache.
//!
//! The transport stream can only be consumed once. The first caller reads it
//! and every later caller (digest `auth-int` hashing, form decoding,
//! downstream handlers) gets the same bytes.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::body::{Body, Bytes};
use tokio::sync::OnceCell;

use crate::error::GateError;

/// Name tag attached to cached bodies.
pub const BODY_NAME: &str = "request-body";

struct Inner {
    source: Mutex<Option<Body>>,
    limit: usize,
    bytes: OnceCell<Bytes>,
    transport_reads: AtomicUsize,
}

/// Shared, lazily materialized request body.
///
/// Clones share the same cache, so a chained context never re-reads.
#[derive(Clone)]
pub struct BodyCache {
    inner: Arc<Inner>,
}

impl BodyCache {
    /// Wrap an unread transport body, reading at most `limit` bytes.
    pub fn new(body: Body, limit: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                source: Mutex::new(Some(body)),
                limit,
                bytes: OnceCell::new(),
                transport_reads: AtomicUsize::new(0),
            }),
        }
    }

    /// Adopt bytes that were already materialized elsewhere.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            inner: Arc::new(Inner {
                source: Mutex::new(None),
                limit: bytes.len(),
                bytes: OnceCell::new_with(Some(bytes)),
                transport_reads: AtomicUsize::new(0),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        BODY_NAME
    }

    pub fn is_materialized(&self) -> bool {
        self.inner.bytes.initialized()
    }

    /// Number of times the transport stream was consumed (0 or 1).
    pub fn transport_reads(&self) -> usize {
        self.inner.transport_reads.load(Ordering::SeqCst)
    }

    /// The request body. Reads the transport on the first call only.
    pub async fn body(&self) -> Result<Bytes, GateError> {
        self.inner
            .bytes
            .get_or_try_init(|| async {
                let source = self
                    .inner
                    .source
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                let body = source
                    .ok_or_else(|| GateError::BodyRead("request body already consumed".into()))?;

                self.inner.transport_reads.fetch_add(1, Ordering::SeqCst);
                axum::body::to_bytes(body, self.inner.limit)
                    .await
                    .map_err(|e| GateError::BodyRead(e.to_string()))
            })
            .await
            .cloned()
    }
}

impl fmt::Debug for BodyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyCache")
            .field("name", &BODY_NAME)
            .field("materialized", &self.is_materialized())
            .field("transport_reads", &self.transport_reads())
            .finish()
    }
}
