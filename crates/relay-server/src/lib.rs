//! Relay Server Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! A REST front for four independently owned backends (object store, blob
//! store, rules engine, indexer). Most routes forward one call to one backend;
//! the customer import is the only workflow with logic of its own.
//!
//! # Modules
//!
//! - **api**: router, application state and the server loop
//! - **clients**: HTTP facades with retry and circuit breaking
//! - **config**: environment-driven configuration
//! - **features**: route slices under `/api/v1`
//! - **import**: the bulk customer import pipeline
//! - **middleware**: CORS, tracing and body limits

pub mod api;
pub mod clients;
pub mod config;
pub mod error;
pub mod features;
pub mod import;
pub mod middleware;

pub use error::{ApiResult, AppError};
