//! Continuation points - paging of large result sets.
//!
//! - [`ContinuationPointStore`] owns the parked results of one session
//! - [`SessionContinuationPoints`] shares a store between async handlers
//! - [`ContinuationToken`] is what the client holds in between

mod session;
mod store;
mod token;

pub use session::SessionContinuationPoints;
pub use store::{ContinuationPoint, ContinuationPointStore, Page};
pub use token::ContinuationToken;
