//! # Imagery Relay
//!
//! A thin HTTP relay in front of a remote satellite-imagery service.
//!
//! Clients ask for a county, a year, a cloud-cover bound and an enhancement
//! mode; the relay resolves the county geometry, builds a median composite
//! query, checks that imagery exists, and returns a tile handle plus a legend
//! for the selected mode. All heavy lifting happens remotely.
//!
//! ## Architecture
//!
//! - [`config`]: TOML and environment configuration
//! - [`models`]: areas, filters and the image expression sent to the service
//! - [`enhancement`]: the fixed table of analysis modes and their legends
//! - [`remote`]: the [`remote::ImageryService`] trait with local and HTTP backends
//! - [`services`]: region resolution, query building, analysis pipeline
//! - [`http`]: axum router, readiness gate and handlers

// Remote errors carry context for debugging
#![allow(clippy::result_large_err)]

pub mod config;
pub mod enhancement;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
