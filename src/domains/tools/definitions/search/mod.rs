//! Search tools backed by third-party HTTP APIs.
//!
//! - `intent`: structured Google results through ScraperAPI
//! - `trending`: Google Trends related queries through SerpApi
//!
//! Both share a [`SearchClient`]; a failed or non-2xx upstream call fails
//! only the invocation that made it.

pub mod client;
pub mod intent;
pub mod trending;

pub use client::SearchClient;
pub use intent::{SearchIntentParams, SearchIntentTool};
pub use trending::{SearchTrendingParams, SearchTrendingTool};

#[cfg(test)]
pub(crate) mod testing {
    use axum::Router;

    /// Serve `router` on an ephemeral local port and return its base URL.
    pub(crate) async fn mock_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
