//! Shared utilities for the Stratum data-access layer.
//!
//! This crate holds the pieces the storage and application layers agree on:
//! - Filter values, field maps, and the filter-cleaning policy
//! - Pagination parameters and page assembly
//! - DateTime helpers (the clock the soft-delete path stamps from)
//! - Tracing subscriber setup

pub mod datetime;
pub mod filters;
pub mod pagination;
pub mod telemetry;

// Re-export commonly used types
pub use datetime::{format_datetime, now_utc, parse_datetime};
pub use filters::{clean_filters, FieldMap, FilterValue};
pub use pagination::{DateRange, PaginatedResult, PaginationParams};
pub use telemetry::{init_test_tracing, init_tracing};
