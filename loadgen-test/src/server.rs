//! Exposes an in-process test server for use in integration tests.
//!
//! ```
//! use loadgen_test::product_service::ProductService;
//! use loadgen_test::server::TestServer;
//!
//! #[tokio::main]
//! async fn main() {
//!    let service = ProductService::new();
//!    let server = TestServer::new(service.router()).await;
//!    let url = server.url("/health");
//!    // use the URL in tests...
//! }
//! ```

use std::net::{SocketAddr, TcpListener};

use axum::Router;

/// An in-process test server for use in integration tests.
///
/// The server hosts the given router on a random available port on localhost and stops when it is
/// dropped.
#[derive(Debug)]
pub struct TestServer {
    handle: tokio::task::JoinHandle<()>,
    socket: SocketAddr,
}

impl TestServer {
    /// Starts serving `router`.
    pub async fn new(router: Router) -> Self {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = TcpListener::bind(addr).unwrap();
        listener.set_nonblocking(true).unwrap();
        let socket = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, router).await.unwrap();
        });

        Self { handle, socket }
    }

    /// Returns the base URL of the server, suitable as the load generator's host.
    pub fn host(&self) -> String {
        format!("http://127.0.0.1:{}", self.socket.port())
    }

    /// Returns a full URL pointing to the given path.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.host(), path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
