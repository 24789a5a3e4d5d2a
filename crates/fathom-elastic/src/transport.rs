//! Request dispatch.
//!
//! The backend builds request bodies; a [`Transport`] sends them and returns
//! the parsed response body. Errors reported by the engine are the
//! transport's to map, since only it sees the status line.

use async_trait::async_trait;
use fathom_core::Result;
use serde_json::Value;

use crate::request::SearchRequest;

/// Sends search requests to an engine.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes one search and returns the response body.
    ///
    /// Dropping the returned future cancels the request.
    async fn search(&self, request: SearchRequest) -> Result<Value>;
}

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use async_trait::async_trait;
    use fathom_core::{Error, Result};
    use reqwest::Url;
    use serde_json::Value;

    use super::Transport;
    use crate::backend::{BACKEND_NAME, elastic_error};
    use crate::request::SearchRequest;

    /// Transport over HTTP.
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: reqwest::Client,
        base_url: Url,
    }

    impl HttpTransport {
        /// Creates a transport to the cluster at `base_url`.
        pub fn new(base_url: &str) -> Result<Self> {
            Self::with_client(reqwest::Client::new(), base_url)
        }

        /// Creates a transport using a preconfigured client.
        pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self> {
            let base_url = Url::parse(base_url)
                .map_err(|e| Error::config(format!("invalid cluster URL '{base_url}': {e}")))?;
            Ok(Self { client, base_url })
        }

        fn url(&self, request: &SearchRequest) -> Result<Url> {
            let mut url = self
                .base_url
                .join(request.path().trim_start_matches('/'))
                .map_err(|e| Error::config(format!("invalid search path: {e}")))?;
            if let Some(routing) = &request.routing {
                url.query_pairs_mut().append_pair("routing", routing);
            }
            Ok(url)
        }
    }

    #[async_trait]
    impl Transport for HttpTransport {
        async fn search(&self, request: SearchRequest) -> Result<Value> {
            let url = self.url(&request)?;
            log::debug!("POST {url}");

            let response = self
                .client
                .post(url)
                .json(&request.body)
                .send()
                .await
                .map_err(|e| elastic_error("search request failed", e))?;

            let status = response.status();
            let body: Value = response
                .json()
                .await
                .map_err(|e| elastic_error("failed to read search response", e))?;
            if !status.is_success() {
                let reason = body
                    .pointer("/error/reason")
                    .and_then(Value::as_str)
                    .unwrap_or("no reason given");
                return Err(Error::backend(
                    BACKEND_NAME,
                    format!("search rejected (HTTP {status}): {reason}"),
                ));
            }
            Ok(body)
        }
    }

}
