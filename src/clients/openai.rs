//! Azure OpenAI client: chat completions and image generation
//!
//! Chat completions are synchronous. The dated image-generation API is a
//! long-running operation: submission returns an `operation-location`
//! header and the image URLs are fetched from there once the job succeeds.

use crate::poller::{poll_operation, OperationHandle, OperationState, OperationStatus, PollConfig};
use crate::{execute_with_retry, ClientConfig, ClientError, QueryClient};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const CHAT_API_VERSION: &str = "2023-05-15";
const IMAGE_API_VERSION: &str = "2023-06-01-preview";

/// Client for an Azure OpenAI resource
pub struct AzureOpenAi {
    /// Reqwest HTTP client used for requests
    http: Client,
    /// Base URL of the Azure OpenAI resource
    endpoint: String,
    /// API key for the resource
    key: String,
    /// Deployment name to call, e.g. `"gpt-4"`
    deployment: String,
    /// Optional temperature parameter controlling response creativity
    temperature: Option<f32>,
    /// Optional cap on completion tokens
    max_tokens: Option<u32>,
    /// Number of times to retry a failed request
    retries: u32,
    /// Pacing and budget for the image-generation poll
    poll: PollConfig,
}

/// One chat message with its role
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

impl AzureOpenAi {
    /// Create a new Azure OpenAI client for one deployment
    pub fn new(
        http: Client,
        endpoint: impl Into<String>,
        key: impl Into<String>,
        deployment: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http,
            endpoint: super::normalize_endpoint(endpoint.into())?,
            key: key.into(),
            deployment: deployment.into(),
            temperature: None,
            max_tokens: None,
            retries: config.retries,
            poll: config.poll,
        })
    }

    /// Set the sampling temperature (0.0-2.0)
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap the number of completion tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Send a chat conversation and return the assistant's reply
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ClientError> {
        #[derive(Serialize)]
        struct Request<'a> {
            messages: &'a [ChatMessage],
            #[serde(skip_serializing_if = "Option::is_none")]
            temperature: Option<f32>,
            #[serde(skip_serializing_if = "Option::is_none")]
            max_tokens: Option<u32>,
        }

        #[derive(Deserialize)]
        struct Response {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: RespMessage,
        }

        #[derive(Deserialize)]
        struct RespMessage {
            content: String,
        }

        let body = Request {
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let target = format!(
            "{}/openai/deployments/{}/chat/completions",
            self.endpoint, self.deployment
        );

        execute_with_retry(self.retries, || async {
            let response = self
                .http
                .post(&target)
                .query(&[("api-version", CHAT_API_VERSION)])
                .header("api-key", &self.key)
                .json(&body)
                .send()
                .await?
                .error_for_status()?;

            let resp: Response = response.json().await?;
            resp.choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .ok_or_else(|| ClientError::missing_field("completion carried no choices"))
        })
        .await
    }

    /// Send a single user prompt with a stock system message
    pub async fn send_prompt(&self, prompt: &str) -> Result<String, ClientError> {
        self.chat(&[
            ChatMessage::system("You are an AI assistant."),
            ChatMessage::user(prompt),
        ])
        .await
    }

    /// Submit an image-generation job, returning the operation handle
    pub async fn begin_image_generation(
        &self,
        prompt: &str,
        n: u32,
        size: &str,
    ) -> Result<OperationHandle, ClientError> {
        #[derive(Serialize)]
        struct Request<'a> {
            prompt: &'a str,
            n: u32,
            size: &'a str,
        }

        let target = format!("{}/openai/images/generations:submit", self.endpoint);

        execute_with_retry(self.retries, || async {
            let response = self
                .http
                .post(&target)
                .query(&[("api-version", IMAGE_API_VERSION)])
                .header("api-key", &self.key)
                .json(&Request { prompt, n, size })
                .send()
                .await?
                .error_for_status()?;

            OperationHandle::from_response(&response)
        })
        .await
    }

    /// Fetch the current state of a previously submitted image generation
    pub async fn image_result(
        &self,
        handle: &OperationHandle,
    ) -> Result<OperationState<Vec<String>>, ClientError> {
        #[derive(Deserialize)]
        struct Image {
            url: String,
        }

        #[derive(Deserialize)]
        struct ImageData {
            data: Vec<Image>,
        }

        #[derive(Deserialize)]
        struct Response {
            status: OperationStatus,
            result: Option<ImageData>,
            error: Option<super::ServiceError>,
        }

        let response = self
            .http
            .get(handle.as_str())
            .header("api-key", &self.key)
            .send()
            .await?
            .error_for_status()?;

        let body: Response = response.json().await?;
        Ok(match body.status {
            OperationStatus::NotStarted => OperationState::NotStarted,
            OperationStatus::Running => OperationState::Running,
            OperationStatus::Succeeded => {
                let result = body.result.ok_or_else(|| {
                    ClientError::missing_field("succeeded generation carried no image data")
                })?;
                OperationState::Succeeded(result.data.into_iter().map(|img| img.url).collect())
            }
            OperationStatus::Failed => OperationState::Failed(body.error.map(|e| e.reason())),
            OperationStatus::Cancelled => OperationState::Cancelled(body.error.map(|e| e.reason())),
        })
    }

    /// Generate images from a prompt and wait for their URLs
    /// (`size` is one of `256x256`, `512x512`, `1024x1024`)
    pub async fn generate_image(
        &self,
        prompt: &str,
        n: u32,
        size: &str,
    ) -> Result<Vec<String>, ClientError> {
        let handle = self.begin_image_generation(prompt, n, size).await?;
        debug!(operation = %handle, "image generation submitted");
        poll_operation(&self.poll, || self.image_result(&handle)).await
    }
}

#[async_trait]
impl QueryClient for AzureOpenAi {
    async fn query(&self, input: &str) -> Result<String, ClientError> {
        self.send_prompt(input).await
    }

    fn name(&self) -> &str {
        "AzureOpenAI"
    }
}
