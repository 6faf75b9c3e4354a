//! Listing parsing, valuation and querying live here.

pub mod dataset;
pub mod description;
pub mod entities;
pub mod least_squares;
pub mod query;
pub mod valuation;

pub use dataset::{build_rows, repair_benchmarks};
pub use description::{disk_totals, parse_line, DescriptionError, DiskTotals};
pub use entities::{CapacityUnit, DiskKind, Listing, ParsedCapacity, Record, ServerRow};
pub use least_squares::{LeastSquaresError, LeastSquaresSolution};
pub use query::{ListingFilter, QueryView, SortMode};
pub use valuation::{fit, score, valuate, FitSummary, PriceModel, FEATURE_NAMES};
