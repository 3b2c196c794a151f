//! The simulated users and their action sets.
//!
//! Every simulated user owns its [`Session`] and its identifier caches. Nothing is shared between
//! users besides the [`Stats`](crate::stats::Stats) sink inside their sessions.

use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::session::{Session, ThinkTime};
use crate::tasks::TaskSet;

pub mod product_service;
pub mod storefront;

pub use product_service::{ProductServiceTask, ProductServiceUser};
pub use storefront::{StorefrontTask, StorefrontUser};

/// The kind of simulated user to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserKind {
    /// A shopper on the storefront aggregator.
    #[default]
    Storefront,
    /// A client of the product microservice.
    ProductService,
}

impl UserKind {
    /// The pause between actions used unless configured otherwise.
    pub fn default_think_time(self) -> ThinkTime {
        match self {
            UserKind::Storefront => StorefrontUser::THINK_TIME,
            UserKind::ProductService => ProductServiceUser::THINK_TIME,
        }
    }

    /// Validates that `tags` select at least one action of this kind.
    pub fn check_tags<S: AsRef<str>>(self, tags: &[S]) -> Result<()> {
        match self {
            UserKind::Storefront => TaskSet::<StorefrontTask>::tagged(tags).map(drop),
            UserKind::ProductService => TaskSet::<ProductServiceTask>::tagged(tags).map(drop),
        }
    }
}

impl fmt::Display for UserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserKind::Storefront => f.write_str("storefront"),
            UserKind::ProductService => f.write_str("product_service"),
        }
    }
}

/// One simulated user of either kind.
#[derive(Debug)]
pub enum SimulatedUser {
    /// See [`StorefrontUser`].
    Storefront(StorefrontUser),
    /// See [`ProductServiceUser`].
    ProductService(ProductServiceUser),
}

impl SimulatedUser {
    /// Creates a user of `kind` whose actions are restricted to `tags`.
    ///
    /// An empty `tags` slice enables every action.
    pub fn new<S: AsRef<str>>(kind: UserKind, session: Session, tags: &[S]) -> Result<Self> {
        Ok(match kind {
            UserKind::Storefront => {
                SimulatedUser::Storefront(StorefrontUser::new(session, TaskSet::tagged(tags)?))
            }
            UserKind::ProductService => SimulatedUser::ProductService(ProductServiceUser::new(
                session,
                TaskSet::tagged(tags)?,
            )),
        })
    }

    /// Runs the user's session setup.
    pub async fn on_start(&mut self) {
        match self {
            SimulatedUser::Storefront(user) => user.on_start().await,
            SimulatedUser::ProductService(user) => user.on_start().await,
        }
    }

    /// Runs one weighted random action and returns its request name.
    pub async fn step(&mut self) -> &'static str {
        match self {
            SimulatedUser::Storefront(user) => user.step().await.name(),
            SimulatedUser::ProductService(user) => user.step().await.name(),
        }
    }

    /// Pauses for one think-time interval.
    pub async fn think(&mut self) {
        let session = match self {
            SimulatedUser::Storefront(user) => user.session_mut(),
            SimulatedUser::ProductService(user) => user.session_mut(),
        };
        session.think().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_think_times() {
        use std::time::Duration;

        let storefront = UserKind::Storefront.default_think_time();
        assert_eq!(storefront.min, Duration::from_secs(1));
        assert_eq!(storefront.max, Duration::from_secs(5));

        let product = UserKind::ProductService.default_think_time();
        assert_eq!(product.min, Duration::from_secs(1));
        assert_eq!(product.max, Duration::from_secs(3));
    }

    #[test]
    fn tags_are_per_kind() {
        assert!(UserKind::Storefront.check_tags(&["checkout"]).is_ok());
        assert!(UserKind::ProductService.check_tags(&["checkout"]).is_err());
        assert!(UserKind::ProductService.check_tags(&["health", "list"]).is_ok());
        assert!(UserKind::Storefront.check_tags::<&str>(&[]).is_ok());
    }
}
