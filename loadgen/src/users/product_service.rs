//! A client of the product microservice exercising its CRUD endpoints.

use std::time::Duration;

use rand::Rng;
use reqwest::{Method, StatusCode};
use serde::Serialize;

use crate::error::Failure;
use crate::ids::{Id, IdCache};
use crate::session::{Session, ThinkTime, expect_status, json_body, require_field};
use crate::tasks::{Task, TaskSet};

const ID: &str = "id";
const PLACEHOLDER_IMAGE: &str = "/placeholder.png";

/// Actions of a [`ProductServiceUser`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductServiceTask {
    /// `GET /health`
    HealthCheck,
    /// `GET /`
    GetProducts,
    /// `POST /`
    AddProduct,
    /// `GET /{id}`
    GetProductById,
    /// `PUT /`
    UpdateProduct,
    /// `DELETE /{id}`
    DeleteProduct,
}

impl ProductServiceTask {
    /// The name requests of this action are reported under.
    pub fn name(self) -> &'static str {
        match self {
            ProductServiceTask::HealthCheck => "Health Check",
            ProductServiceTask::GetProducts => "Get All Products",
            ProductServiceTask::AddProduct => "Add Product",
            ProductServiceTask::GetProductById => "Get Product By ID",
            ProductServiceTask::UpdateProduct => "Update Product",
            ProductServiceTask::DeleteProduct => "Delete Product",
        }
    }
}

impl Task for ProductServiceTask {
    const ALL: &'static [Self] = &[
        ProductServiceTask::HealthCheck,
        ProductServiceTask::GetProducts,
        ProductServiceTask::AddProduct,
        ProductServiceTask::GetProductById,
        ProductServiceTask::UpdateProduct,
        ProductServiceTask::DeleteProduct,
    ];

    fn weight(self) -> u32 {
        match self {
            ProductServiceTask::HealthCheck => 2,
            ProductServiceTask::GetProducts => 3,
            ProductServiceTask::AddProduct => 1,
            ProductServiceTask::GetProductById => 2,
            ProductServiceTask::UpdateProduct => 1,
            ProductServiceTask::DeleteProduct => 1,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            ProductServiceTask::HealthCheck => "health",
            ProductServiceTask::GetProducts => "list",
            ProductServiceTask::AddProduct => "create",
            ProductServiceTask::GetProductById => "detail",
            ProductServiceTask::UpdateProduct => "update",
            ProductServiceTask::DeleteProduct => "delete",
        }
    }
}

/// Full product record as accepted by `POST /` and `PUT /`.
#[derive(Debug, Serialize)]
struct ProductRecord<'a> {
    id: &'a Id,
    name: String,
    price: f64,
    description: String,
    image: &'static str,
}

/// A price between 5.99 and 199.99, rounded to cents.
fn random_price<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let price: f64 = rng.random_range(5.99..=199.99);
    (price * 100.0).round() / 100.0
}

/// A simulated product-service client.
///
/// Tracks the identifiers it saw in listings or created itself, and forgets those the service
/// reports as gone.
#[derive(Debug)]
pub struct ProductServiceUser {
    session: Session,
    tasks: TaskSet<ProductServiceTask>,
    product_ids: IdCache,
}

impl ProductServiceUser {
    /// Default pause between actions.
    pub const THINK_TIME: ThinkTime =
        ThinkTime::between(Duration::from_secs(1), Duration::from_secs(3));

    /// Creates a client without any known products.
    pub fn new(session: Session, tasks: TaskSet<ProductServiceTask>) -> Self {
        Self {
            session,
            tasks,
            product_ids: IdCache::default(),
        }
    }

    /// Identifiers currently believed to exist.
    pub fn product_ids(&self) -> &IdCache {
        &self.product_ids
    }

    /// The underlying session.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Nothing to prepare besides the session headers, which the session already carries.
    pub async fn on_start(&mut self) {}

    /// Picks a weighted random action and runs it.
    pub async fn step(&mut self) -> ProductServiceTask {
        let task = self.tasks.pick(self.session.rng());
        self.run(task).await;
        task
    }

    /// Runs a single action.
    pub async fn run(&mut self, task: ProductServiceTask) {
        match task {
            ProductServiceTask::HealthCheck => self.health_check().await,
            ProductServiceTask::GetProducts => self.get_products().await,
            ProductServiceTask::AddProduct => self.add_product().await,
            ProductServiceTask::GetProductById => self.get_product_by_id().await,
            ProductServiceTask::UpdateProduct => self.update_product().await,
            ProductServiceTask::DeleteProduct => self.delete_product().await,
        }
    }

    /// Probes `GET /health`.
    pub async fn health_check(&mut self) {
        let outcome = self.probe_health().await;
        self.session.record(ProductServiceTask::HealthCheck.name(), outcome);
    }

    async fn probe_health(&self) -> Result<(), Failure> {
        let response = self.session.request(Method::GET, "/health").send().await?;
        expect_status(&response, &[StatusCode::OK])
    }

    /// Lists all products and learns the identifiers not yet known.
    ///
    /// An empty catalog is a valid listing and counts as a success. Only a body that is not a
    /// JSON array fails.
    pub async fn get_products(&mut self) {
        let outcome = self.list_products().await;
        self.session.record(ProductServiceTask::GetProducts.name(), outcome);
    }

    async fn list_products(&mut self) -> Result<(), Failure> {
        let response = self.session.request(Method::GET, "/").send().await?;
        expect_status(&response, &[StatusCode::OK])?;

        let products = json_body(response).await?;
        let Some(products) = products.as_array() else {
            return Err(Failure::Invalid("invalid products response"));
        };

        for id in products.iter().filter_map(|p| Id::from_field(p, ID)) {
            self.product_ids.insert(id);
        }
        Ok(())
    }

    /// Creates a product with synthetic attributes and remembers its identifier.
    pub async fn add_product(&mut self) {
        let outcome = self.create_product().await;
        self.session.record(ProductServiceTask::AddProduct.name(), outcome);
    }

    async fn create_product(&mut self) -> Result<(), Failure> {
        // The service assigns the real identifier.
        let placeholder_id = Id::Number(0);
        let rng = self.session.rng();
        let name = format!("Test Product {}", rng.random_range(1000..=9999));
        let record = ProductRecord {
            id: &placeholder_id,
            description: format!(
                "This is a test product {name} created for load testing. \
                 It features multiple great qualities and is perfect for testing. \
                 Every pet owner should have this amazing product for their furry friend."
            ),
            name,
            price: random_price(rng),
            image: PLACEHOLDER_IMAGE,
        };

        let response = self
            .session
            .request(Method::POST, "/")
            .json(&record)
            .send()
            .await?;
        expect_status(&response, &[StatusCode::OK, StatusCode::CREATED])?;

        let product = json_body(response).await?;
        require_field(&product, ID)?;
        match Id::from_field(&product, ID) {
            Some(id) => {
                self.product_ids.insert(id);
                Ok(())
            }
            None => Err(Failure::Invalid("product id is neither a number nor a string")),
        }
    }

    /// Fetches a random known product, forgetting it if the service answers 404.
    pub async fn get_product_by_id(&mut self) {
        let Some(id) = self.product_ids.choose(self.session.rng()) else {
            self.get_products().await;
            return;
        };

        let outcome = self.fetch_product(&id).await;
        self.session.record(ProductServiceTask::GetProductById.name(), outcome);
    }

    async fn fetch_product(&mut self, id: &Id) -> Result<(), Failure> {
        let response = self
            .session
            .request(Method::GET, &format!("/{id}"))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            self.product_ids.remove(id);
            return Err(Failure::NotFound(id.clone()));
        }
        expect_status(&response, &[StatusCode::OK])?;

        let product = json_body(response).await?;
        require_field(&product, ID)?;
        Ok(())
    }

    /// Replaces a random known product with a new synthetic record.
    pub async fn update_product(&mut self) {
        let Some(id) = self.product_ids.choose(self.session.rng()) else {
            self.get_products().await;
            return;
        };

        let outcome = self.replace_product(&id).await;
        self.session.record(ProductServiceTask::UpdateProduct.name(), outcome);
    }

    async fn replace_product(&mut self, id: &Id) -> Result<(), Failure> {
        let rng = self.session.rng();
        let record = ProductRecord {
            id,
            name: format!("Updated Product {}", rng.random_range(1000..=9999)),
            price: random_price(rng),
            description: "This is an updated test product description with plenty of text to \
                meet the minimum length requirements. It provides detailed information about the \
                product features and benefits for your pets. Every pet owner would love this \
                amazing product."
                .to_owned(),
            image: PLACEHOLDER_IMAGE,
        };

        let response = self
            .session
            .request(Method::PUT, "/")
            .json(&record)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            self.product_ids.remove(id);
            return Err(Failure::NotFound(id.clone()));
        }
        expect_status(&response, &[StatusCode::OK])?;

        let product = json_body(response).await?;
        require_field(&product, ID)?;
        Ok(())
    }

    /// Deletes a random known product.
    ///
    /// The identifier is forgotten on success and on 404, and kept on any other status.
    pub async fn delete_product(&mut self) {
        let Some(id) = self.product_ids.choose(self.session.rng()) else {
            self.get_products().await;
            return;
        };

        let outcome = self.remove_product(&id).await;
        self.session.record(ProductServiceTask::DeleteProduct.name(), outcome);
    }

    async fn remove_product(&mut self, id: &Id) -> Result<(), Failure> {
        let response = self
            .session
            .request(Method::DELETE, &format!("/{id}"))
            .send()
            .await?;
        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => {
                self.product_ids.remove(id);
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                self.product_ids.remove(id);
                Err(Failure::NotFound(id.clone()))
            }
            status => Err(Failure::Status(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn prices_are_rounded_to_cents() {
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..1000 {
            let price = random_price(&mut rng);
            assert!((5.99..=199.99).contains(&price), "{price} out of range");
            let cents = price * 100.0;
            assert!((cents - cents.round()).abs() < 1e-6, "{price} not rounded");
        }
    }

    #[test]
    fn record_shape() {
        let id = Id::Number(0);
        let record = serde_json::to_value(ProductRecord {
            id: &id,
            name: "Test Product 1234".into(),
            price: 12.5,
            description: "desc".into(),
            image: PLACEHOLDER_IMAGE,
        })
        .unwrap();
        assert_eq!(
            record,
            serde_json::json!({
                "id": 0,
                "name": "Test Product 1234",
                "price": 12.5,
                "description": "desc",
                "image": "/placeholder.png",
            })
        );
    }

    #[test]
    fn every_action_has_its_own_tag() {
        for task in ProductServiceTask::ALL {
            let set = TaskSet::<ProductServiceTask>::tagged(&[task.tag()]).unwrap();
            assert_eq!(set.tasks(), &[*task]);
        }
    }
}
