//! Spawns simulated users against the target and lets them run until the deadline.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::session::{Session, ThinkTime};
use crate::stats::Stats;
use crate::users::{SimulatedUser, UserKind};

/// Parameters of a single run.
#[derive(Clone, Debug)]
pub struct Plan {
    /// Base URL of the target.
    pub host: String,
    /// Which simulated user to run.
    pub user: UserKind,
    /// Number of simulated users to start.
    pub users: usize,
    /// Simulated users started per second.
    pub spawn_rate: f64,
    /// Total run time.
    pub duration: Duration,
    /// Tag filter; empty enables every action.
    pub tags: Vec<String>,
    /// Pause between actions.
    pub think_time: ThinkTime,
    /// Seed from which every user's RNG seed is drawn.
    pub seed: Option<u64>,
}

impl Plan {
    /// Derives the plan from a loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.host.clone(),
            user: config.user,
            users: config.users,
            spawn_rate: config.spawn_rate,
            duration: config.duration,
            tags: config.tags.clone(),
            think_time: config.think_time(),
            seed: config.seed,
        }
    }
}

/// What a finished run produced.
#[derive(Debug)]
pub struct Summary {
    /// Outcome counters of every request.
    pub stats: Stats,
    /// Wall-clock time the run took.
    pub elapsed: Duration,
    /// Number of users that were started.
    pub users: usize,
}

/// Runs the plan until its duration elapsed or `shutdown` is cancelled.
///
/// Users are started at the plan's spawn rate. Each runs its setup, then alternates between a
/// weighted random action and a think-time pause. Requests still in flight at the deadline are
/// abandoned and not recorded.
pub async fn run(plan: &Plan, shutdown: CancellationToken) -> Result<Summary> {
    plan.user.check_tags(&plan.tags)?;

    let stats = Stats::new();
    let mut seeder = SmallRng::seed_from_u64(plan.seed.unwrap_or_else(rand::random));
    let spawn_interval = spawn_interval(plan.spawn_rate)?;

    let start = Instant::now();
    let deadline = start
        .checked_add(plan.duration)
        .with_context(|| format!("`duration` of {:?} is too long", plan.duration))?;

    tracing::info!(
        user = %plan.user,
        users = plan.users,
        host = %plan.host,
        "starting load test"
    );

    let bar = ProgressBar::new_spinner()
        .with_style(ProgressStyle::with_template("{spinner} {msg} {elapsed}")?)
        .with_message(format!("Running {} users:", plan.user));
    bar.enable_steady_tick(Duration::from_millis(100));

    let mut tasks = Vec::with_capacity(plan.users);
    for index in 0..plan.users {
        if index > 0 {
            tokio::select! {
                _ = tokio::time::sleep(spawn_interval) => {}
                _ = tokio::time::sleep_until(deadline) => break,
                _ = shutdown.cancelled() => break,
            }
        }

        let session = Session::builder(plan.host.as_str())
            .seed(seeder.next_u64())
            .think_time(plan.think_time)
            .stats(stats.clone())
            .build()?;
        let user = SimulatedUser::new(plan.user, session, &plan.tags)?;

        tasks.push(tokio::spawn(run_user(index, user, deadline, shutdown.clone())));
    }

    let users = tasks.len();
    for result in futures::future::join_all(tasks).await {
        result?;
    }
    bar.finish_and_clear();

    let elapsed = start.elapsed();
    tracing::info!(users, ?elapsed, "load test finished");

    Ok(Summary {
        stats,
        elapsed,
        users,
    })
}

/// Returns the pause between two user starts at `spawn_rate` users per second.
pub(crate) fn spawn_interval(spawn_rate: f64) -> Result<Duration> {
    if spawn_rate <= 0.0 || !spawn_rate.is_finite() {
        bail!("`spawn_rate` must be a positive number, got {spawn_rate}");
    }
    Duration::try_from_secs_f64(spawn_rate.recip())
        .with_context(|| format!("`spawn_rate` of {spawn_rate} users per second is too low"))
}

async fn run_user(
    index: usize,
    mut user: SimulatedUser,
    deadline: Instant,
    shutdown: CancellationToken,
) {
    tracing::debug!(user = index, "simulated user started");

    let lifecycle = async {
        user.on_start().await;
        loop {
            user.step().await;
            user.think().await;
        }
    };

    tokio::select! {
        _ = lifecycle => {}
        _ = tokio::time::sleep_until(deadline) => {}
        _ = shutdown.cancelled() => {}
    }

    tracing::debug!(user = index, "simulated user stopped");
}
