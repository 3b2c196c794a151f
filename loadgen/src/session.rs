//! Per-user HTTP session against the target host.

use std::time::Duration;

use anyhow::Result;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Failure;
use crate::stats::Stats;

const USER_AGENT: &str = concat!("loadgen/", env!("CARGO_PKG_VERSION"));

/// Range of the pause a simulated user takes between two actions.
///
/// The pause is drawn uniformly from `min..=max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ThinkTime {
    /// Shortest pause.
    #[serde(with = "humantime_serde")]
    pub min: Duration,
    /// Longest pause.
    #[serde(with = "humantime_serde")]
    pub max: Duration,
}

impl ThinkTime {
    /// No pause at all.
    pub const ZERO: Self = Self::between(Duration::ZERO, Duration::ZERO);

    /// Creates a think-time range.
    pub const fn between(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Draws one pause duration.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min >= self.max {
            return self.min;
        }
        let secs = rng.random_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Builder for a [`Session`].
#[derive(Debug)]
pub struct SessionBuilder {
    host: String,
    seed: Option<u64>,
    think_time: ThinkTime,
    stats: Stats,
}

impl SessionBuilder {
    /// Seeds the session's RNG. Without a seed the RNG is seeded randomly.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Pause between actions. Defaults to [`ThinkTime::ZERO`].
    pub fn think_time(mut self, think_time: ThinkTime) -> Self {
        self.think_time = think_time;
        self
    }

    /// The sink that request outcomes are recorded into.
    pub fn stats(mut self, stats: Stats) -> Self {
        self.stats = stats;
        self
    }

    /// Creates the session along with its own HTTP client.
    ///
    /// The JSON `Content-Type` and `Accept` headers are installed as client defaults, so they are
    /// set once for the whole session. The client keeps a private cookie jar.
    pub fn build(self) -> Result<Session> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()?;

        let rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::seed_from_u64(rand::random()),
        };

        Ok(Session {
            client,
            host: self.host.trim_end_matches('/').to_owned(),
            rng,
            think_time: self.think_time,
            stats: self.stats,
        })
    }
}

/// State shared by all actions of one simulated user.
#[derive(Debug)]
pub struct Session {
    client: reqwest::Client,
    host: String,
    rng: SmallRng,
    think_time: ThinkTime,
    stats: Stats,
}

impl Session {
    /// Creates a builder for a session against `host`, e.g. `http://localhost:8080`.
    pub fn builder(host: impl Into<String>) -> SessionBuilder {
        SessionBuilder {
            host: host.into(),
            seed: None,
            think_time: ThinkTime::ZERO,
            stats: Stats::default(),
        }
    }

    /// Returns the full URL of `path` on the target host.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.host, path)
    }

    /// Starts a request to `path` on the target host.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// The session's RNG.
    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// The sink request outcomes are recorded into.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Sleeps for one think-time interval.
    pub async fn think(&mut self) {
        let pause = self.think_time.sample(&mut self.rng);
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    /// Records the outcome of a request named `name`.
    pub fn record(&self, name: &'static str, outcome: Result<(), Failure>) {
        if let Err(ref failure) = outcome {
            tracing::debug!(request = name, %failure, "request failed");
        }
        self.stats.record(name, &outcome);
    }

    /// Sends a request and scores it with the default classification.
    ///
    /// Transport errors and error statuses are failures. The body is discarded.
    pub async fn fire(&self, name: &'static str, request: RequestBuilder) {
        let outcome = match request.send().await {
            Ok(response) => Failure::from_status(response.status()),
            Err(err) => Err(Failure::Transport(err)),
        };
        self.record(name, outcome);
    }
}

/// Reads the response body and parses it as JSON.
pub async fn json_body(response: Response) -> Result<Value, Failure> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(Failure::Parse)
}

/// Fails with [`Failure::Status`] unless the response status is one of `expected`.
pub fn expect_status(response: &Response, expected: &[StatusCode]) -> Result<(), Failure> {
    let status = response.status();
    if expected.contains(&status) {
        Ok(())
    } else {
        Err(Failure::Status(status))
    }
}

/// Returns the value of `field`, failing with [`Failure::MissingField`] if the body lacks it.
pub fn require_field<'a>(body: &'a Value, field: &'static str) -> Result<&'a Value, Failure> {
    body.get(field).ok_or(Failure::MissingField(field))
}

/// Returns `true` for `null`, `false`, zero, and empty strings, arrays and objects.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
