//! codsync Portal - data portal API client
//!
//! The humanitarian data portal is CKAN-based; this crate wraps the two
//! actions the sync needs (read a dataset, push a dataset update) behind
//! [`client::PortalClient`].

pub mod client;

pub use client::{BatchMode, PortalClient, UpdateOptions};
