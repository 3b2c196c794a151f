//! A fake product service keeping its catalog in memory.
//!
//! Routes mirror the real service: `GET /health`, `GET /`, `POST /`, `PUT /`, `GET /{id}` and
//! `DELETE /{id}`. Unknown identifiers are answered with `404 Product not found`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::stub::Stubs;

const NOT_FOUND: &str = "Product not found";

#[derive(Debug)]
struct Catalog {
    products: Vec<Value>,
    next_id: i64,
    delete_status: StatusCode,
}

/// Shared handle on the fake service's catalog.
///
/// Clones share the same catalog, so a test can keep one handle and inspect or tamper with the
/// catalog while the router serves requests.
#[derive(Clone, Debug)]
pub struct ProductService {
    catalog: Arc<Mutex<Catalog>>,
    stubs: Stubs,
}

impl Default for ProductService {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductService {
    /// Creates a service with an empty catalog.
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(Mutex::new(Catalog {
                products: Vec::new(),
                next_id: 1,
                delete_status: StatusCode::OK,
            })),
            stubs: Stubs::default(),
        }
    }

    /// Creates a service whose catalog holds products with the given identifiers.
    pub fn with_products(ids: impl IntoIterator<Item = i64>) -> Self {
        let service = Self::new();
        {
            let mut catalog = service.lock();
            for id in ids {
                catalog.products.push(product(id));
                catalog.next_id = catalog.next_id.max(id + 1);
            }
        }
        service
    }

    /// Sets the identifier assigned to the next created product.
    pub fn set_next_id(&self, id: i64) {
        self.lock().next_id = id;
    }

    /// Sets the status of successful deletes. Non-success statuses leave the product in place.
    pub fn set_delete_status(&self, status: StatusCode) {
        self.lock().delete_status = status;
    }

    /// Removes a product behind the clients' backs.
    pub fn forget(&self, id: i64) {
        self.lock().products.retain(|p| p["id"] != id);
    }

    /// Identifiers currently in the catalog.
    pub fn ids(&self) -> Vec<i64> {
        self.lock()
            .products
            .iter()
            .filter_map(|p| p["id"].as_i64())
            .collect()
    }

    /// Canned responses overriding the catalog's routes.
    pub fn stubs(&self) -> &Stubs {
        &self.stubs
    }

    /// Returns the router serving this catalog.
    pub fn router(&self) -> Router {
        let router = Router::new()
            .route("/health", get(health))
            .route("/", get(list).post(create).put(update))
            .route("/{id}", get(fetch).delete(delete))
            .with_state(self.clone());
        self.stubs.apply(router)
    }

    fn lock(&self) -> MutexGuard<'_, Catalog> {
        self.catalog.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn product(id: i64) -> Value {
    json!({
        "id": id,
        "name": format!("Product {id}"),
        "price": 9.99,
        "description": "A product",
        "image": "/placeholder.png",
    })
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn list(State(service): State<ProductService>) -> Json<Value> {
    Json(Value::Array(service.lock().products.clone()))
}

async fn create(State(service): State<ProductService>, Json(mut body): Json<Value>) -> Response {
    let mut catalog = service.lock();
    let id = catalog.next_id;
    catalog.next_id += 1;

    body["id"] = json!(id);
    catalog.products.push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn fetch(State(service): State<ProductService>, Path(id): Path<i64>) -> Response {
    let catalog = service.lock();
    match catalog.products.iter().find(|p| p["id"] == id) {
        Some(product) => Json(product.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, NOT_FOUND).into_response(),
    }
}

async fn update(State(service): State<ProductService>, Json(body): Json<Value>) -> Response {
    let mut catalog = service.lock();
    let existing = catalog.products.iter_mut().find(|p| p["id"] == body["id"]);
    match existing {
        Some(product) => {
            *product = body.clone();
            Json(body).into_response()
        }
        None => (StatusCode::NOT_FOUND, NOT_FOUND).into_response(),
    }
}

async fn delete(State(service): State<ProductService>, Path(id): Path<i64>) -> Response {
    let mut catalog = service.lock();
    let Some(index) = catalog.products.iter().position(|p| p["id"] == id) else {
        return (StatusCode::NOT_FOUND, NOT_FOUND).into_response();
    };

    let status = catalog.delete_status;
    if status.is_success() {
        catalog.products.remove(index);
    }
    status.into_response()
}
