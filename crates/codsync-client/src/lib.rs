//! codsync Client - HTTP access to the upstream boundary and population APIs
//!
//! This crate provides the network-facing half of the sync:
//!
//! - [`fetch`] - the JSON GET seam and its reqwest implementation
//! - [`geoservice`] - boundary catalog fetching and per-country resource discovery
//! - [`countries`] - country reference data
//!
//! # Overview
//!
//! Discovery only ever consumes JSON documents, so everything here runs
//! against the [`fetch::JsonFetch`] trait; production code plugs in the
//! retrying [`fetch::HttpFetcher`].

pub mod countries;
pub mod fetch;
pub mod geoservice;

pub use countries::fetch_countries;
pub use fetch::{HttpFetcher, JsonFetch};
pub use geoservice::{discover_resources, fetch_boundary_catalogs, ServiceCatalogs};
