//! # Azure AI client library
//!
//! A Rust library for calling Azure AI services (Computer Vision Read OCR,
//! Document Intelligence, the Language service, Azure OpenAI) with a shared
//! configuration layer and a generic long-running-operation poller.
//!
//! Services that answer submissions asynchronously (the Read API, Document
//! Intelligence analysis and model builds, dated Azure OpenAI image
//! generation) are driven through [`poll_operation`], which enforces a
//! bounded attempt budget and a minimum pacing interval between status
//! checks.
//!
//! ## Example
//!
//! ```rust,no_run
//! use azureai::{clients::ComputerVision, create_http_client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::default();
//!     let http = create_http_client(&config)?;
//!
//!     let vision = ComputerVision::new(
//!         http,
//!         "https://my-resource.cognitiveservices.azure.com",
//!         "your-subscription-key",
//!         config,
//!     )?;
//!
//!     for line in vision.recognize_text("https://example.com/printed_text.jpg").await? {
//!         println!("{}", line);
//!     }
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub mod clients;
pub mod error;
pub mod poller;
pub mod retry;

pub use clients::*;
pub use error::*;
pub use poller::{
    poll_operation, wait_all, OperationHandle, OperationState, OperationStatus, PollConfig, Poller,
};
pub use retry::execute_with_retry;

/// Configuration shared by all service clients
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Timeout for individual HTTP requests
    pub timeout: Duration,
    /// Number of retry attempts for failed single-shot requests
    pub retries: u32,
    /// Pacing and budget for long-running operations
    pub poll: PollConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retries: 0,
            poll: PollConfig::default(),
        }
    }
}

/// Build the HTTP client shared by the service clients
pub fn create_http_client(config: &ClientConfig) -> Result<Client, ClientError> {
    Client::builder()
        .timeout(config.timeout)
        .use_rustls_tls()
        .user_agent(format!("azureai/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ClientError::config(format!("Failed to create HTTP client: {}", e), None))
}

/// Common trait for services that answer a free-text query with text
///
/// Implemented by the clients whose request shape boils down to "send a
/// question, get an answer": Azure OpenAI chat, QnA Maker, and LUIS (which
/// answers with the top-scoring intent).
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Send a query and return the service's textual answer
    async fn query(&self, input: &str) -> Result<String, ClientError>;

    /// Returns the name/identifier of this service client
    fn name(&self) -> &str;
}

/// Send the same input to multiple query services in parallel
///
/// Useful for fanning a user utterance out to, say, LUIS for the intent and
/// QnA Maker for a canned answer at the same time. Returns one
/// `(client name, result)` pair per client; one service failing does not
/// affect the others.
pub async fn query_all(
    clients: Vec<Box<dyn QueryClient>>,
    input: &str,
) -> Vec<(String, Result<String, ClientError>)> {
    use futures::future;

    let futures: Vec<_> = clients
        .iter()
        .map(|client| {
            let name = client.name().to_string();
            let input = input.to_string();
            async move {
                let result = client.query(&input).await;
                (name, result)
            }
        })
        .collect();

    future::join_all(futures).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    // Mock service for testing
    struct MockService {
        name: String,
        responses: Arc<Mutex<VecDeque<Result<String, ClientError>>>>,
    }

    impl MockService {
        fn new(name: &str, responses: Vec<Result<String, ClientError>>) -> Self {
            Self {
                name: name.to_string(),
                responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            }
        }
    }

    #[async_trait]
    impl QueryClient for MockService {
        async fn query(&self, _input: &str) -> Result<String, ClientError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("mock answer".to_string()))
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retries, 0);
        assert_eq!(config.poll.max_attempts, 60);
    }

    #[tokio::test]
    async fn test_query_all() {
        let clients: Vec<Box<dyn QueryClient>> = vec![
            Box::new(MockService::new("luis", vec![Ok("BookFlight".to_string())])),
            Box::new(MockService::new(
                "qna",
                vec![Err(ClientError::rate_limit("slow down"))],
            )),
        ];

        let results = query_all(clients, "book a flight to London").await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "luis");
        assert_eq!(results[0].1.as_deref().unwrap(), "BookFlight");
        assert_eq!(results[1].0, "qna");
        assert!(results[1].1.is_err());
    }
}
