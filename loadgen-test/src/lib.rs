//! Test utilities for the load generator.
//!
//! This crate provides in-process fakes of the storefront aggregator and the product service, and
//! a server to host them during integration tests. See the modules for all available utilities.

pub mod product_service;
pub mod server;
pub mod storefront;
pub mod stub;
pub mod tracing;
