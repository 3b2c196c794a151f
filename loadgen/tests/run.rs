use std::time::Duration;

use loadgen::runner::{self, Plan};
use loadgen::session::ThinkTime;
use loadgen::users::UserKind;
use loadgen_test::product_service::ProductService;
use loadgen_test::server::TestServer;
use loadgen_test::storefront::Storefront;
use tokio_util::sync::CancellationToken;

fn plan(host: String, user: UserKind) -> Plan {
    Plan {
        host,
        user,
        users: 3,
        spawn_rate: 100.0,
        duration: Duration::from_millis(500),
        tags: Vec::new(),
        think_time: ThinkTime::between(Duration::from_millis(1), Duration::from_millis(5)),
        seed: Some(1234),
    }
}

#[tokio::test]
async fn runs_product_service_users() {
    loadgen_test::tracing::init();
    let service = ProductService::with_products(1..=10);
    let server = TestServer::new(service.router()).await;

    let plan = plan(server.host(), UserKind::ProductService);
    let summary = runner::run(&plan, CancellationToken::new()).await.unwrap();

    assert_eq!(summary.users, 3);
    assert!(summary.elapsed >= Duration::from_millis(500));
    let total = summary.stats.total();
    assert!(total.requests > 0);
    assert!(summary.stats.get("Health Check").requests > 0);
    assert_eq!(summary.stats.get("Health Check").failures, 0);
}

#[tokio::test]
async fn runs_only_tagged_actions() {
    let storefront = Storefront::with_catalog(4);
    let server = TestServer::new(storefront.router()).await;

    let mut plan = plan(server.host(), UserKind::Storefront);
    plan.tags = vec!["cart".to_owned()];
    let summary = runner::run(&plan, CancellationToken::new()).await.unwrap();

    let snapshot = summary.stats.snapshot();
    // The catalog is always loaded on start; everything else must be tagged `cart`.
    for name in snapshot.keys() {
        assert!(
            ["Get All Products", "Add to Cart", "View Cart"].contains(name),
            "unexpected request {name}"
        );
    }
    assert!(summary.stats.get("Add to Cart").requests > 0);
    assert_eq!(summary.stats.total().failures, 0);
}

#[tokio::test]
async fn rejects_unknown_tags() {
    let plan = Plan {
        tags: vec!["checkout".to_owned()],
        ..plan("http://127.0.0.1:1".to_owned(), UserKind::ProductService)
    };
    let err = runner::run(&plan, CancellationToken::new()).await.unwrap_err();
    assert!(err.to_string().contains("no actions match"), "{err}");
}

#[tokio::test]
async fn rejects_unusable_spawn_rates() {
    for spawn_rate in [1e-20, 0.0, f64::NAN] {
        let plan = Plan {
            spawn_rate,
            ..plan("http://127.0.0.1:1".to_owned(), UserKind::ProductService)
        };
        let err = runner::run(&plan, CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("spawn_rate"), "{err}");
    }
}

#[tokio::test]
async fn stops_when_cancelled() {
    let service = ProductService::new();
    let server = TestServer::new(service.router()).await;

    let mut plan = plan(server.host(), UserKind::ProductService);
    plan.duration = Duration::from_secs(60);

    let shutdown = CancellationToken::new();
    let cancel = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
    });

    let summary = tokio::time::timeout(Duration::from_secs(10), runner::run(&plan, shutdown))
        .await
        .unwrap()
        .unwrap();
    assert!(summary.elapsed < Duration::from_secs(10));
}
