//! Load generation for the storefront aggregator and the product microservice.
//!
//! A run starts a number of simulated users. Each picks weighted random actions, such as browsing
//! the catalog or creating a product, and pauses for a think-time between them. Every request is
//! scored as success or failure from its status code and the presence of expected JSON fields,
//! and the counters are printed when the run ends.
//!
//! The two kinds of users are [`StorefrontUser`] and [`ProductServiceUser`]. Both remember the
//! identifiers they discovered in their own cache, so later actions can refer to existing
//! products.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod cli;
pub mod config;
pub mod error;
pub mod ids;
pub mod observability;
pub mod report;
pub mod runner;
pub mod session;
pub mod stats;
pub mod tasks;
pub mod users;

pub use crate::runner::{Plan, Summary, run};
pub use crate::users::{ProductServiceUser, SimulatedUser, StorefrontUser, UserKind};
