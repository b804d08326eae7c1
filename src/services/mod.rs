//! Service layer for the spider.
//!
//! This module contains the business logic for:
//! - Listing pagination (`ListingPaginator`)
//! - Listing row extraction (`topics`)
//! - Topic detail parsing and persistence (`DetailParser`)
//! - File listing reconstruction (`file_tree`)
//! - Title-based media identification (`title`)

pub mod detail;
pub mod file_tree;
pub mod paginator;
mod resolver;
pub mod title;
pub mod topics;

pub use detail::{AbandonReason, DetailOutcome, DetailParser};
pub use paginator::{ListingPaginator, PageEmission, PageEvent, PaginatorState};
pub use resolver::MediaResolver;
