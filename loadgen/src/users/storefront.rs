//! A shopper on the storefront aggregator who fills a cart and checks out.

use std::time::Duration;

use rand::Rng;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::error::Failure;
use crate::ids::{Id, IdCache};
use crate::session::{Session, ThinkTime, expect_status, is_blank, json_body, require_field};
use crate::tasks::{Task, TaskSet};

const PRODUCT_ID: &str = "productId";
const ORDER_ID: &str = "orderId";

/// Actions of a [`StorefrontUser`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorefrontTask {
    /// `GET /api/products`
    GetAllProducts,
    /// `GET /api/products/{id}`
    GetProductDetails,
    /// `POST /api/orders/items`
    AddToCart,
    /// `GET /api/orders/cart`
    ViewCart,
    /// `POST /api/orders/checkout`
    Checkout,
    /// Several unvalidated `GET /api/products/{id}` with pauses in between.
    BrowseRandomProducts,
}

impl StorefrontTask {
    /// The name requests of this action are reported under.
    pub fn name(self) -> &'static str {
        match self {
            StorefrontTask::GetAllProducts => "Get All Products",
            StorefrontTask::GetProductDetails => "Get Product Details",
            StorefrontTask::AddToCart => "Add to Cart",
            StorefrontTask::ViewCart => "View Cart",
            StorefrontTask::Checkout => "Checkout",
            StorefrontTask::BrowseRandomProducts => "Browse Random Products",
        }
    }
}

impl Task for StorefrontTask {
    const ALL: &'static [Self] = &[
        StorefrontTask::GetAllProducts,
        StorefrontTask::GetProductDetails,
        StorefrontTask::AddToCart,
        StorefrontTask::ViewCart,
        StorefrontTask::Checkout,
        StorefrontTask::BrowseRandomProducts,
    ];

    fn weight(self) -> u32 {
        match self {
            StorefrontTask::GetAllProducts => 3,
            StorefrontTask::GetProductDetails => 2,
            StorefrontTask::AddToCart => 1,
            StorefrontTask::ViewCart => 1,
            StorefrontTask::Checkout => 1,
            StorefrontTask::BrowseRandomProducts => 2,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            StorefrontTask::GetAllProducts | StorefrontTask::BrowseRandomProducts => "browse",
            StorefrontTask::GetProductDetails => "product_detail",
            StorefrontTask::AddToCart | StorefrontTask::ViewCart => "cart",
            StorefrontTask::Checkout => "checkout",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CartItem<'a> {
    product_id: &'a Id,
    quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Customer {
    first_name: &'static str,
    last_name: &'static str,
    email: String,
    address: &'static str,
    city: &'static str,
    state: &'static str,
    zip_code: &'static str,
}

impl Customer {
    fn synthetic(suffix: u32) -> Self {
        Self {
            first_name: "Test",
            last_name: "User",
            email: format!("test.user.{suffix}@example.com"),
            address: "123 Test Street",
            city: "Test City",
            state: "TS",
            zip_code: "12345",
        }
    }
}

/// A simulated storefront shopper.
///
/// Keeps the product identifiers of the last catalog fetch and the items it put into its cart.
#[derive(Debug)]
pub struct StorefrontUser {
    session: Session,
    tasks: TaskSet<StorefrontTask>,
    product_ids: IdCache,
    cart_items: Vec<Value>,
}

impl StorefrontUser {
    /// Default pause between actions.
    pub const THINK_TIME: ThinkTime =
        ThinkTime::between(Duration::from_secs(1), Duration::from_secs(5));

    /// Creates a shopper with an empty catalog and cart.
    pub fn new(session: Session, tasks: TaskSet<StorefrontTask>) -> Self {
        Self {
            session,
            tasks,
            product_ids: IdCache::default(),
            cart_items: Vec::new(),
        }
    }

    /// Product identifiers from the most recent successful catalog fetch.
    pub fn product_ids(&self) -> &IdCache {
        &self.product_ids
    }

    /// Items added to the cart since the last successful checkout.
    pub fn cart_items(&self) -> &[Value] {
        &self.cart_items
    }

    /// The underlying session.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Loads the catalog so that later actions have products to pick from.
    pub async fn on_start(&mut self) {
        self.get_all_products().await;
    }

    /// Picks a weighted random action and runs it.
    pub async fn step(&mut self) -> StorefrontTask {
        let task = self.tasks.pick(self.session.rng());
        self.run(task).await;
        task
    }

    /// Runs a single action.
    pub async fn run(&mut self, task: StorefrontTask) {
        match task {
            StorefrontTask::GetAllProducts => self.get_all_products().await,
            StorefrontTask::GetProductDetails => self.get_product_details().await,
            StorefrontTask::AddToCart => self.add_to_cart().await,
            StorefrontTask::ViewCart => self.view_cart().await,
            StorefrontTask::Checkout => self.checkout().await,
            StorefrontTask::BrowseRandomProducts => self.browse_random_products().await,
        }
    }

    /// Fetches the catalog and replaces the known product identifiers.
    pub async fn get_all_products(&mut self) {
        let outcome = self.fetch_catalog().await;
        self.session.record(StorefrontTask::GetAllProducts.name(), outcome);
    }

    async fn fetch_catalog(&mut self) -> Result<(), Failure> {
        let response = self
            .session
            .request(Method::GET, "/api/products")
            .send()
            .await?;
        expect_status(&response, &[StatusCode::OK])?;

        let products = json_body(response).await?;
        let products = match products.as_array() {
            Some(products) if !products.is_empty() => products,
            _ => return Err(Failure::Invalid("no products found in the response")),
        };

        self.product_ids.replace(
            products
                .iter()
                .filter_map(|product| Id::from_field(product, PRODUCT_ID)),
        );
        Ok(())
    }

    /// Views the details of a random known product.
    pub async fn get_product_details(&mut self) {
        let Some(id) = self.product_ids.choose(self.session.rng()) else {
            self.get_all_products().await;
            return;
        };

        let outcome = self.fetch_details(&id).await;
        self.session.record(StorefrontTask::GetProductDetails.name(), outcome);
    }

    async fn fetch_details(&self, id: &Id) -> Result<(), Failure> {
        let response = self
            .session
            .request(Method::GET, &format!("/api/products/{id}"))
            .send()
            .await?;
        expect_status(&response, &[StatusCode::OK])?;

        let product = json_body(response).await?;
        require_field(&product, PRODUCT_ID)?;
        Ok(())
    }

    /// Adds one to three units of a random known product to the cart.
    pub async fn add_to_cart(&mut self) {
        let Some(id) = self.product_ids.choose(self.session.rng()) else {
            self.get_all_products().await;
            return;
        };
        let quantity = self.session.rng().random_range(1..=3);

        let outcome = self.post_cart_item(&id, quantity).await;
        self.session.record(StorefrontTask::AddToCart.name(), outcome);
    }

    async fn post_cart_item(&mut self, id: &Id, quantity: u32) -> Result<(), Failure> {
        let item = CartItem {
            product_id: id,
            quantity,
        };
        let response = self
            .session
            .request(Method::POST, "/api/orders/items")
            .json(&item)
            .send()
            .await?;
        expect_status(&response, &[StatusCode::OK, StatusCode::CREATED])?;

        let item = json_body(response).await?;
        if is_blank(&item) {
            return Err(Failure::Invalid("invalid cart item response"));
        }
        self.cart_items.push(item);
        Ok(())
    }

    /// Looks at the server-side cart.
    pub async fn view_cart(&mut self) {
        let outcome = self.fetch_cart().await;
        self.session.record(StorefrontTask::ViewCart.name(), outcome);
    }

    async fn fetch_cart(&self) -> Result<(), Failure> {
        let response = self
            .session
            .request(Method::GET, "/api/orders/cart")
            .send()
            .await?;
        expect_status(&response, &[StatusCode::OK])?;
        json_body(response).await?;
        Ok(())
    }

    /// Places an order, adding an item first if the cart is empty.
    ///
    /// The cart is only cleared when the response confirms the order.
    pub async fn checkout(&mut self) {
        if self.cart_items.is_empty() {
            self.add_to_cart().await;
        }

        let suffix = self.session.rng().random_range(1000..=9999);
        let customer = Customer::synthetic(suffix);

        let outcome = self.post_checkout(&customer).await;
        self.session.record(StorefrontTask::Checkout.name(), outcome);
    }

    async fn post_checkout(&mut self, customer: &Customer) -> Result<(), Failure> {
        let response = self
            .session
            .request(Method::POST, "/api/orders/checkout")
            .json(customer)
            .send()
            .await?;
        expect_status(&response, &[StatusCode::OK, StatusCode::CREATED])?;

        let order = json_body(response).await?;
        require_field(&order, ORDER_ID)?;
        self.cart_items.clear();
        Ok(())
    }

    /// Views two to five random products in a row, pausing between each.
    pub async fn browse_random_products(&mut self) {
        if self.product_ids.is_empty() {
            self.get_all_products().await;
            return;
        }

        let views = self.session.rng().random_range(2..=5);
        for _ in 0..views {
            let Some(id) = self.product_ids.choose(self.session.rng()) else {
                break;
            };
            let request = self
                .session
                .request(Method::GET, &format!("/api/products/{id}"));
            self.session
                .fire(StorefrontTask::BrowseRandomProducts.name(), request)
                .await;
            self.session.think().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_shape() {
        let customer = serde_json::to_value(Customer::synthetic(4321)).unwrap();
        assert_eq!(
            customer,
            serde_json::json!({
                "firstName": "Test",
                "lastName": "User",
                "email": "test.user.4321@example.com",
                "address": "123 Test Street",
                "city": "Test City",
                "state": "TS",
                "zipCode": "12345",
            })
        );
    }

    #[test]
    fn cart_item_shape() {
        let id = Id::Number(3);
        let item = serde_json::to_value(CartItem {
            product_id: &id,
            quantity: 2,
        })
        .unwrap();
        assert_eq!(item, serde_json::json!({"productId": 3, "quantity": 2}));
    }

    #[test]
    fn weights_and_tags() {
        let total: u32 = StorefrontTask::ALL.iter().map(|t| t.weight()).sum();
        assert_eq!(total, 10);

        let cart = TaskSet::<StorefrontTask>::tagged(&["cart"]).unwrap();
        assert_eq!(
            cart.tasks(),
            &[StorefrontTask::AddToCart, StorefrontTask::ViewCart]
        );
    }
}
