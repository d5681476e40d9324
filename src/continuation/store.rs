//! Per-session continuation point store.
//!
//! Results larger than a page are split: the first page goes back to the
//! client immediately, the rest is parked under a freshly minted token.
//!
//! A continuation point is removed when its last item is handed out, when
//! it is released or cancelled, on [`clear_all`], or when the store is
//! dropped with its session. There is no timer.
//!
//! # Example
//!
//! ```
//! use ua_wire::continuation::ContinuationPointStore;
//!
//! let mut store = ContinuationPointStore::new(10);
//!
//! let first = store.register(2, vec!['a', 'b', 'c']).unwrap();
//! assert_eq!(first.items, vec!['a', 'b']);
//!
//! let token = first.token.unwrap();
//! let next = store.get_next(&token, 0, false).unwrap();
//! assert_eq!(next.items, vec!['c']);
//! assert!(next.token.is_none());
//! assert!(store.is_empty());
//! ```
//!
//! [`clear_all`]: ContinuationPointStore::clear_all

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tracing::debug;

use super::token::ContinuationToken;
use crate::config::{WireConfig, DEFAULT_MAX_CONTINUATION_POINTS};
use crate::error::ContinuationError;

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items in this page, in original order.
    pub items: Vec<T>,
    /// Token for the rest, `None` when nothing is left.
    pub token: Option<ContinuationToken>,
}

impl<T> Page<T> {
    /// True if no continuation follows.
    pub fn is_last(&self) -> bool {
        self.token.is_none()
    }
}

/// Results parked behind a token.
#[derive(Debug)]
pub struct ContinuationPoint<T> {
    remaining: VecDeque<T>,
    page_size: usize,
    created_at: Instant,
}

impl<T> ContinuationPoint<T> {
    /// Items not yet handed out.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Page size used when the caller does not ask for one.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// When the point was created.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Time since creation.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Continuation points of one session.
#[derive(Debug)]
pub struct ContinuationPointStore<T> {
    points: HashMap<u64, ContinuationPoint<T>>,
    /// Next token id. Ids are never reused within a store.
    next_id: u64,
    /// Maximum live points; 0 means unlimited.
    max_points: usize,
}

impl<T> ContinuationPointStore<T> {
    /// Create a store allowing at most `max_points` live points.
    /// 0 means unlimited.
    pub fn new(max_points: usize) -> Self {
        Self {
            points: HashMap::new(),
            next_id: 1,
            max_points,
        }
    }

    /// Create a store using `config.max_continuation_points`.
    pub fn from_config(config: &WireConfig) -> Self {
        Self::new(config.max_continuation_points)
    }

    /// Return the first page of `items` and park the rest.
    ///
    /// With `max_page_size == 0` or when everything fits, all items are
    /// returned and no token is created.
    ///
    /// # Errors
    ///
    /// Returns [`ContinuationError::NoContinuationPoints`] if a token is
    /// needed and the store is full.
    pub fn register(&mut self, max_page_size: usize, items: Vec<T>) -> Result<Page<T>, ContinuationError> {
        if max_page_size == 0 || items.len() <= max_page_size {
            return Ok(Page { items, token: None });
        }
        if self.is_full() {
            debug!(limit = self.max_points, "continuation point limit reached");
            return Err(ContinuationError::NoContinuationPoints {
                limit: self.max_points,
            });
        }

        let mut remaining = VecDeque::from(items);
        let page: Vec<T> = remaining.drain(..max_page_size).collect();

        let id = self.next_id;
        self.next_id += 1;
        debug!(id, remaining = remaining.len(), page_size = max_page_size, "continuation point created");
        self.points.insert(
            id,
            ContinuationPoint {
                remaining,
                page_size: max_page_size,
                created_at: Instant::now(),
            },
        );

        Ok(Page {
            items: page,
            token: Some(ContinuationToken::from_id(id)),
        })
    }

    /// Take the next page from a continuation point.
    ///
    /// `max_count == 0` uses the page size given at registration. The point
    /// is removed when it runs empty or `release` is set; the returned token
    /// is then `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ContinuationError::ContinuationPointInvalid`] for an unknown,
    /// released or malformed token.
    pub fn get_next(
        &mut self,
        token: &ContinuationToken,
        max_count: usize,
        release: bool,
    ) -> Result<Page<T>, ContinuationError> {
        let id = token.id().ok_or(ContinuationError::ContinuationPointInvalid)?;
        let point = self
            .points
            .get_mut(&id)
            .ok_or(ContinuationError::ContinuationPointInvalid)?;

        let count = if max_count == 0 { point.page_size } else { max_count };
        let take = count.min(point.remaining.len());
        let items: Vec<T> = point.remaining.drain(..take).collect();

        if release || point.remaining.is_empty() {
            self.points.remove(&id);
            debug!(id, release, "continuation point released");
            return Ok(Page { items, token: None });
        }

        Ok(Page {
            items,
            token: Some(token.clone()),
        })
    }

    /// Release a continuation point early.
    ///
    /// # Errors
    ///
    /// Returns [`ContinuationError::ContinuationPointInvalid`] if the token
    /// is not live.
    pub fn cancel(&mut self, token: &ContinuationToken) -> Result<(), ContinuationError> {
        let id = token.id().ok_or(ContinuationError::ContinuationPointInvalid)?;
        match self.points.remove(&id) {
            Some(_) => {
                debug!(id, "continuation point cancelled");
                Ok(())
            }
            None => Err(ContinuationError::ContinuationPointInvalid),
        }
    }

    /// Release every continuation point. Returns how many were live.
    pub fn clear_all(&mut self) -> usize {
        let released = self.points.len();
        self.points.clear();
        if released > 0 {
            debug!(released, "continuation points cleared");
        }
        released
    }

    /// True if at least `limit` points are live. A limit of 0 is never reached.
    pub fn has_reached_maximum(&self, limit: usize) -> bool {
        limit != 0 && self.points.len() >= limit
    }

    /// True if the configured maximum is reached.
    pub fn is_full(&self) -> bool {
        self.has_reached_maximum(self.max_points)
    }

    /// Look up a live point without changing it.
    pub fn get(&self, token: &ContinuationToken) -> Option<&ContinuationPoint<T>> {
        self.points.get(&token.id()?)
    }

    /// Number of live points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if no points are live.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Configured maximum; 0 means unlimited.
    pub fn max_points(&self) -> usize {
        self.max_points
    }
}

impl<T> Default for ContinuationPointStore<T> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONTINUATION_POINTS)
    }
}
