//! Computer Vision Read (OCR) client
//!
//! The Read API is asynchronous: submitting an image returns `202 Accepted`
//! with an `Operation-Location` header, and the recognized text has to be
//! fetched from that location once the operation reports `succeeded`.

use crate::poller::{poll_operation, OperationHandle, OperationState, OperationStatus, PollConfig};
use crate::{execute_with_retry, ClientConfig, ClientError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Client for the Computer Vision Read API
pub struct ComputerVision {
    /// Reqwest HTTP client used for requests
    http: Client,
    /// Base URL of the Computer Vision resource
    endpoint: String,
    /// Subscription key for the resource
    key: String,
    /// Number of times to retry a failed submission request
    retries: u32,
    /// Pacing and budget for the read operation poll
    poll: PollConfig,
}

/// Result of a completed Read operation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResult {
    pub read_results: Vec<ReadPage>,
}

/// Text extracted from one page of the analyzed image or document
#[derive(Debug, Deserialize)]
pub struct ReadPage {
    #[serde(default)]
    pub page: Option<u32>,
    pub lines: Vec<ReadLine>,
}

#[derive(Debug, Deserialize)]
pub struct ReadLine {
    pub text: String,
}

impl ReadResult {
    /// All recognized lines across pages, in reading order
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.read_results
            .iter()
            .flat_map(|page| page.lines.iter().map(|line| line.text.as_str()))
    }
}

impl ComputerVision {
    /// Create a new Computer Vision client
    pub fn new(
        http: Client,
        endpoint: impl Into<String>,
        key: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http,
            endpoint: super::normalize_endpoint(endpoint.into())?,
            key: key.into(),
            retries: config.retries,
            poll: config.poll,
        })
    }

    /// Submit an image URL to the Read API, returning the operation handle
    pub async fn read(&self, image_url: &str) -> Result<OperationHandle, ClientError> {
        #[derive(Serialize)]
        struct Request<'a> {
            url: &'a str,
        }

        let target = format!("{}/vision/v3.2/read/analyze", self.endpoint);

        execute_with_retry(self.retries, || async {
            let response = self
                .http
                .post(&target)
                .header("Ocp-Apim-Subscription-Key", &self.key)
                .json(&Request { url: image_url })
                .send()
                .await?
                .error_for_status()?;

            OperationHandle::from_response(&response)
        })
        .await
    }

    /// Fetch the current state of a previously submitted Read operation
    pub async fn read_result(
        &self,
        handle: &OperationHandle,
    ) -> Result<OperationState<ReadResult>, ClientError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            status: OperationStatus,
            analyze_result: Option<ReadResult>,
            error: Option<super::ServiceError>,
        }

        let response = self
            .http
            .get(handle.as_str())
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .send()
            .await?
            .error_for_status()?;

        let body: Response = response.json().await?;
        Ok(match body.status {
            OperationStatus::NotStarted => OperationState::NotStarted,
            OperationStatus::Running => OperationState::Running,
            OperationStatus::Succeeded => {
                let result = body.analyze_result.ok_or_else(|| {
                    ClientError::missing_field("succeeded Read operation carried no analyzeResult")
                })?;
                OperationState::Succeeded(result)
            }
            OperationStatus::Failed => OperationState::Failed(body.error.map(|e| e.reason())),
            OperationStatus::Cancelled => OperationState::Cancelled(body.error.map(|e| e.reason())),
        })
    }

    /// Extract text from an image URL: submit, poll to completion, and
    /// return the recognized lines
    pub async fn recognize_text(&self, image_url: &str) -> Result<Vec<String>, ClientError> {
        let handle = self.read(image_url).await?;
        debug!(operation = %handle, "read operation submitted");

        let result = poll_operation(&self.poll, || self.read_result(&handle)).await?;
        Ok(result.lines().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_result_lines_in_reading_order() {
        let json = r#"{
            "readResults": [
                {"page": 1, "lines": [{"text": "NOTHING"}, {"text": "AHEAD"}]},
                {"page": 2, "lines": [{"text": "EXCEPT"}]}
            ]
        }"#;

        let result: ReadResult = serde_json::from_str(json).unwrap();
        let lines: Vec<_> = result.lines().collect();
        assert_eq!(lines, vec!["NOTHING", "AHEAD", "EXCEPT"]);
    }

    #[test]
    fn test_read_result_page_is_optional() {
        let json = r#"{"readResults": [{"lines": [{"text": "hi"}]}]}"#;
        let result: ReadResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.read_results[0].page, None);
    }
}
