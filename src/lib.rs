//! Fair-price scoring for server-auction listings.
//!
//! The feed's free-text disk descriptions are parsed into SSD/HDD totals, a
//! linear price model is fitted over every listing, and the valuated records are
//! exposed through an immutable [`domain::QueryView`].

pub mod app;
pub mod domain;
pub mod infra;
pub mod ui;
pub mod util;

pub use app::{AppError, FeedOrigin, ServerAuction};
pub use domain::{ListingFilter, QueryView, Record, SortMode};
