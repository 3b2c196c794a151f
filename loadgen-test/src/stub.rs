//! Canned responses that take precedence over a fake's own routes.
//!
//! ```
//! use axum::http::{Method, StatusCode};
//! use loadgen_test::product_service::ProductService;
//!
//! let service = ProductService::new();
//! service.stubs().insert(Method::GET, "/health", StatusCode::SERVICE_UNAVAILABLE, "");
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};

type Key = (Method, String);

/// A shared table of canned responses keyed by method and path.
#[derive(Clone, Debug, Default)]
pub struct Stubs {
    responses: Arc<Mutex<HashMap<Key, (StatusCode, String)>>>,
}

impl Stubs {
    /// Answers `method path` with `status` and the raw `body` from now on.
    pub fn insert(&self, method: Method, path: &str, status: StatusCode, body: impl Into<String>) {
        self.lock().insert((method, path.to_owned()), (status, body.into()));
    }

    /// Lets `method path` reach the fake's route again.
    pub fn remove(&self, method: Method, path: &str) {
        self.lock().remove(&(method, path.to_owned()));
    }

    /// Wraps `router` so that stubbed requests never reach it.
    pub fn apply(&self, router: Router) -> Router {
        router.layer(middleware::from_fn_with_state(self.clone(), respond))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Key, (StatusCode, String)>> {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn respond(State(stubs): State<Stubs>, request: Request, next: Next) -> Response {
    let key = (request.method().clone(), request.uri().path().to_owned());
    let stub = stubs.lock().get(&key).cloned();
    match stub {
        Some((status, body)) => (status, body).into_response(),
        None => next.run(request).await,
    }
}
