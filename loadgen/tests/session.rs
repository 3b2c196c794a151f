use loadgen::session::Session;
use loadgen_test::product_service::ProductService;
use loadgen_test::server::TestServer;
use reqwest::Method;

#[tokio::test]
async fn fire_scores_by_status() {
    let service = ProductService::new();
    let server = TestServer::new(service.router()).await;

    let session = Session::builder(server.url("/")).build().unwrap();
    session
        .fire("Health", session.request(Method::GET, "/health"))
        .await;
    session
        .fire("Missing", session.request(Method::GET, "/404"))
        .await;

    assert_eq!(session.stats().get("Health").successes(), 1);
    let missing = session.stats().get("Missing");
    assert_eq!(missing.failures, 1);
    assert!(missing.reasons.contains_key("unexpected status 404"));
}

#[tokio::test]
async fn fire_counts_transport_errors() {
    // Nothing listens on port 1.
    let session = Session::builder("http://127.0.0.1:1").build().unwrap();
    session
        .fire("Unreachable", session.request(Method::GET, "/"))
        .await;

    let unreachable = session.stats().get("Unreachable");
    assert_eq!(unreachable.failures, 1);
    assert!(
        unreachable
            .reasons
            .keys()
            .all(|reason| reason.starts_with("request error")),
        "{:?}",
        unreachable.reasons
    );
}
