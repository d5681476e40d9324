//! Shared continuation point store for concurrent request handlers.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::store::{ContinuationPointStore, Page};
use super::token::ContinuationToken;
use crate::config::WireConfig;
use crate::error::ContinuationError;

/// Cloneable handle to one session's continuation points.
///
/// Every operation holds the lock for its whole duration, so a cancel racing
/// a redemption of the same token sees exactly one of them succeed.
#[derive(Debug)]
pub struct SessionContinuationPoints<T> {
    inner: Arc<Mutex<ContinuationPointStore<T>>>,
}

impl<T> Clone for SessionContinuationPoints<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send> SessionContinuationPoints<T> {
    /// Create a handle allowing at most `max_points` live points.
    pub fn new(max_points: usize) -> Self {
        Self::from_store(ContinuationPointStore::new(max_points))
    }

    /// Create a handle using `config.max_continuation_points`.
    pub fn from_config(config: &WireConfig) -> Self {
        Self::from_store(ContinuationPointStore::from_config(config))
    }

    /// Wrap an existing store.
    pub fn from_store(store: ContinuationPointStore<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// See [`ContinuationPointStore::register`].
    pub async fn register(&self, max_page_size: usize, items: Vec<T>) -> Result<Page<T>, ContinuationError> {
        self.inner.lock().await.register(max_page_size, items)
    }

    /// See [`ContinuationPointStore::get_next`].
    pub async fn get_next(
        &self,
        token: &ContinuationToken,
        max_count: usize,
        release: bool,
    ) -> Result<Page<T>, ContinuationError> {
        self.inner.lock().await.get_next(token, max_count, release)
    }

    /// See [`ContinuationPointStore::cancel`].
    pub async fn cancel(&self, token: &ContinuationToken) -> Result<(), ContinuationError> {
        self.inner.lock().await.cancel(token)
    }

    /// Release everything. Called when the session closes.
    pub async fn clear_all(&self) -> usize {
        self.inner.lock().await.clear_all()
    }

    /// See [`ContinuationPointStore::has_reached_maximum`].
    pub async fn has_reached_maximum(&self, limit: usize) -> bool {
        self.inner.lock().await.has_reached_maximum(limit)
    }

    /// Number of live points.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// True if no points are live.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
