//! A fake storefront aggregator with a product catalog, per-session carts and checkout.
//!
//! Carts are keyed by a `sid` cookie which the fake hands out on the first cart request of a
//! client.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::stub::Stubs;

const SESSION_COOKIE: &str = "sid";

#[derive(Debug, Default)]
struct Shop {
    products: Vec<Value>,
    carts: BTreeMap<u64, Vec<Value>>,
    next_session: u64,
    orders: u64,
    checkout_response: Option<Value>,
    views: Vec<String>,
}

/// Shared handle on the fake storefront's state.
///
/// Clones share the same state, so a test can keep one handle to inspect carts and orders while
/// the router serves requests.
#[derive(Clone, Debug, Default)]
pub struct Storefront {
    shop: Arc<Mutex<Shop>>,
    stubs: Stubs,
}

impl Storefront {
    /// Creates a storefront with products `1..=count`.
    pub fn with_catalog(count: i64) -> Self {
        let storefront = Self::default();
        storefront.set_products(
            (1..=count)
                .map(|id| json!({"productId": id, "name": format!("Product {id}")}))
                .collect(),
        );
        storefront
    }

    /// Replaces the catalog returned by `GET /api/products`.
    pub fn set_products(&self, products: Vec<Value>) {
        self.lock().products = products;
    }

    /// Answers every checkout with `200` and this body instead of placing an order.
    pub fn set_checkout_response(&self, body: Value) {
        self.lock().checkout_response = Some(body);
    }

    /// Number of sessions handed out so far.
    pub fn sessions(&self) -> usize {
        self.lock().carts.len()
    }

    /// Items currently in the cart of every session, in session order.
    pub fn carts(&self) -> Vec<Vec<Value>> {
        self.lock().carts.values().cloned().collect()
    }

    /// Number of orders placed.
    pub fn orders(&self) -> u64 {
        self.lock().orders
    }

    /// Identifiers requested from `GET /api/products/{id}`, in request order.
    pub fn views(&self) -> Vec<String> {
        self.lock().views.clone()
    }

    /// Canned responses overriding the storefront's routes.
    pub fn stubs(&self) -> &Stubs {
        &self.stubs
    }

    /// Returns the router serving this storefront.
    pub fn router(&self) -> Router {
        let router = Router::new()
            .route("/api/products", get(list_products))
            .route("/api/products/{id}", get(product_details))
            .route("/api/orders/items", post(add_item))
            .route("/api/orders/cart", get(view_cart))
            .route("/api/orders/checkout", post(checkout))
            .with_state(self.clone());
        self.stubs.apply(router)
    }

    fn lock(&self) -> MutexGuard<'_, Shop> {
        self.shop.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Shop {
    /// Resolves the session of a request, opening a new one if the client has none.
    fn session(&mut self, headers: &HeaderMap) -> (u64, Option<HeaderValue>) {
        let existing = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|cookie| cookie.trim().strip_prefix("sid="))
            .find_map(|sid| sid.parse::<u64>().ok())
            .filter(|sid| self.carts.contains_key(sid));

        if let Some(sid) = existing {
            return (sid, None);
        }

        self.next_session += 1;
        let sid = self.next_session;
        self.carts.insert(sid, Vec::new());
        let cookie = HeaderValue::from_str(&format!("{SESSION_COOKIE}={sid}; Path=/")).unwrap();
        (sid, Some(cookie))
    }
}

fn respond(status: StatusCode, body: Value, cookie: Option<HeaderValue>) -> Response {
    let mut response = (status, Json(body)).into_response();
    if let Some(cookie) = cookie {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

fn matches_id(product: &Value, id: &str) -> bool {
    match &product["productId"] {
        Value::String(s) => s == id,
        Value::Null => false,
        other => other.to_string() == id,
    }
}

async fn list_products(State(storefront): State<Storefront>) -> Json<Value> {
    Json(Value::Array(storefront.lock().products.clone()))
}

async fn product_details(
    State(storefront): State<Storefront>,
    Path(id): Path<String>,
) -> Response {
    let mut shop = storefront.lock();
    shop.views.push(id.clone());
    match shop.products.iter().find(|p| matches_id(p, &id)) {
        Some(product) => Json(product.clone()).into_response(),
        None => {
            let body = json!({"error": "Product not found"});
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
    }
}

async fn add_item(
    State(storefront): State<Storefront>,
    headers: HeaderMap,
    Json(item): Json<Value>,
) -> Response {
    let mut shop = storefront.lock();
    let (sid, cookie) = shop.session(&headers);
    shop.carts.entry(sid).or_default().push(item.clone());
    respond(StatusCode::CREATED, item, cookie)
}

async fn view_cart(State(storefront): State<Storefront>, headers: HeaderMap) -> Response {
    let mut shop = storefront.lock();
    let (sid, cookie) = shop.session(&headers);
    let items = shop.carts.get(&sid).cloned().unwrap_or_default();
    respond(StatusCode::OK, json!({"items": items}), cookie)
}

async fn checkout(
    State(storefront): State<Storefront>,
    headers: HeaderMap,
    Json(customer): Json<Value>,
) -> Response {
    let mut shop = storefront.lock();
    let (sid, cookie) = shop.session(&headers);

    if let Some(body) = shop.checkout_response.clone() {
        return respond(StatusCode::OK, body, cookie);
    }

    let items = shop.carts.get_mut(&sid).map(std::mem::take).unwrap_or_default();
    if items.is_empty() {
        return respond(
            StatusCode::BAD_REQUEST,
            json!({"error": "Cart is empty"}),
            cookie,
        );
    }

    shop.orders += 1;
    let order = json!({
        "orderId": format!("order-{}", shop.orders),
        "customer": customer,
        "items": items,
    });
    respond(StatusCode::CREATED, order, cookie)
}
