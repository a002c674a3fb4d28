//! Document Intelligence (Form Recognizer) client
//!
//! Both document analysis and custom model builds are long-running
//! operations: submission answers with an `Operation-Location` header and
//! the outcome is fetched from there through the poller.

use crate::poller::{poll_operation, OperationHandle, OperationState, OperationStatus, PollConfig};
use crate::{execute_with_retry, ClientConfig, ClientError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

const API_VERSION: &str = "2023-07-31";

/// Client for the Document Intelligence REST API
pub struct DocumentIntelligence {
    /// Reqwest HTTP client used for requests
    http: Client,
    /// Base URL of the Document Intelligence resource
    endpoint: String,
    /// Subscription key for the resource
    key: String,
    /// Number of times to retry a failed submission request
    retries: u32,
    /// Pacing and budget for analysis and build polls
    poll: PollConfig,
}

/// Result of a completed document analysis
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    /// Concatenated text content of the document
    #[serde(default)]
    pub content: Option<String>,
    /// Structured documents extracted by the model
    #[serde(default)]
    pub documents: Vec<AnalyzedDocument>,
}

/// One document instance found by the analysis model
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedDocument {
    pub doc_type: Option<String>,
    #[serde(default)]
    pub fields: HashMap<String, DocumentField>,
    pub confidence: Option<f64>,
}

impl AnalyzedDocument {
    /// Look up a named field, e.g. `MerchantName` or `Total`
    pub fn field(&self, name: &str) -> Option<&DocumentField> {
        self.fields.get(name)
    }
}

/// A single extracted field with its confidence score
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentField {
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    pub content: Option<String>,
    pub confidence: Option<f64>,
}

/// How a custom model is trained from labeled source documents
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Template,
    Neural,
}

/// Outcome of a completed custom model build
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub model_id: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeStatusResponse {
    status: OperationStatus,
    analyze_result: Option<AnalyzeResult>,
    error: Option<super::ServiceError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildStatusResponse {
    status: OperationStatus,
    result: Option<ModelInfo>,
    error: Option<super::ServiceError>,
}

impl DocumentIntelligence {
    /// Create a new Document Intelligence client
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

    fn analyze_url_for(&self, model_id: &str) -> String {
        format!(
            "{}/formrecognizer/documentModels/{}:analyze",
            self.endpoint, model_id
        )
    }

    /// Submit a document by URL for analysis with the given model
    /// (e.g. `prebuilt-invoice`, `prebuilt-receipt`, or a custom model id)
    pub async fn begin_analyze_url(
        &self,
        model_id: &str,
        document_url: &str,
    ) -> Result<OperationHandle, ClientError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Request<'a> {
            url_source: &'a str,
        }

        let target = self.analyze_url_for(model_id);

        execute_with_retry(self.retries, || async {
            let response = self
                .http
                .post(&target)
                .query(&[("api-version", API_VERSION)])
                .header("Ocp-Apim-Subscription-Key", &self.key)
                .json(&Request {
                    url_source: document_url,
                })
                .send()
                .await?
                .error_for_status()?;

            OperationHandle::from_response(&response)
        })
        .await
    }

    /// Submit raw document bytes (PDF, JPEG, ...) for analysis
    pub async fn begin_analyze(
        &self,
        model_id: &str,
        document: Vec<u8>,
        content_type: &str,
    ) -> Result<OperationHandle, ClientError> {
        let target = self.analyze_url_for(model_id);

        execute_with_retry(self.retries, || {
            let document = document.clone();
            async {
                let response = self
                    .http
                    .post(&target)
                    .query(&[("api-version", API_VERSION)])
                    .header("Ocp-Apim-Subscription-Key", &self.key)
                    .header("Content-Type", content_type)
                    .body(document)
                    .send()
                    .await?
                    .error_for_status()?;

                OperationHandle::from_response(&response)
            }
        })
        .await
    }

    /// Fetch the current state of a previously submitted analysis
    pub async fn analyze_result(
        &self,
        handle: &OperationHandle,
    ) -> Result<OperationState<AnalyzeResult>, ClientError> {
        let response = self
            .http
            .get(handle.as_str())
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .send()
            .await?
            .error_for_status()?;

        let body: AnalyzeStatusResponse = response.json().await?;
        Ok(match body.status {
            OperationStatus::NotStarted => OperationState::NotStarted,
            OperationStatus::Running => OperationState::Running,
            OperationStatus::Succeeded => {
                let result = body.analyze_result.ok_or_else(|| {
                    ClientError::missing_field("succeeded analysis carried no analyzeResult")
                })?;
                OperationState::Succeeded(result)
            }
            OperationStatus::Failed => OperationState::Failed(body.error.map(|e| e.reason())),
            OperationStatus::Cancelled => OperationState::Cancelled(body.error.map(|e| e.reason())),
        })
    }

    /// Analyze a document by URL and wait for the result
    pub async fn analyze_url(
        &self,
        model_id: &str,
        document_url: &str,
    ) -> Result<AnalyzeResult, ClientError> {
        let handle = self.begin_analyze_url(model_id, document_url).await?;
        debug!(operation = %handle, model = model_id, "analysis submitted");
        poll_operation(&self.poll, || self.analyze_result(&handle)).await
    }

    /// Analyze raw document bytes and wait for the result
    pub async fn analyze_document(
        &self,
        model_id: &str,
        document: Vec<u8>,
        content_type: &str,
    ) -> Result<AnalyzeResult, ClientError> {
        let handle = self
            .begin_analyze(model_id, document, content_type)
            .await?;
        debug!(operation = %handle, model = model_id, "analysis submitted");
        poll_operation(&self.poll, || self.analyze_result(&handle)).await
    }

    /// Start building a custom model from labeled documents in a blob container
    pub async fn begin_build_model(
        &self,
        model_id: &str,
        container_url: &str,
        build_mode: BuildMode,
    ) -> Result<OperationHandle, ClientError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct BlobSource<'a> {
            container_url: &'a str,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Request<'a> {
            model_id: &'a str,
            build_mode: BuildMode,
            azure_blob_source: BlobSource<'a>,
        }

        let target = format!("{}/formrecognizer/documentModels:build", self.endpoint);

        execute_with_retry(self.retries, || async {
            let response = self
                .http
                .post(&target)
                .query(&[("api-version", API_VERSION)])
                .header("Ocp-Apim-Subscription-Key", &self.key)
                .json(&Request {
                    model_id,
                    build_mode,
                    azure_blob_source: BlobSource {
                        container_url,
                    },
                })
                .send()
                .await?
                .error_for_status()?;

            OperationHandle::from_response(&response)
        })
        .await
    }

    /// Fetch the current state of a previously started model build
    pub async fn build_result(
        &self,
        handle: &OperationHandle,
    ) -> Result<OperationState<ModelInfo>, ClientError> {
        let response = self
            .http
            .get(handle.as_str())
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .send()
            .await?
            .error_for_status()?;

        let body: BuildStatusResponse = response.json().await?;
        Ok(match body.status {
            OperationStatus::NotStarted => OperationState::NotStarted,
            OperationStatus::Running => OperationState::Running,
            OperationStatus::Succeeded => {
                let result = body.result.ok_or_else(|| {
                    ClientError::missing_field("succeeded build carried no model result")
                })?;
                OperationState::Succeeded(result)
            }
            OperationStatus::Failed => OperationState::Failed(body.error.map(|e| e.reason())),
            OperationStatus::Cancelled => OperationState::Cancelled(body.error.map(|e| e.reason())),
        })
    }

    /// Build a custom model and wait for it to become usable
    pub async fn build_model(
        &self,
        model_id: &str,
        container_url: &str,
        build_mode: BuildMode,
    ) -> Result<ModelInfo, ClientError> {
        let handle = self
            .begin_build_model(model_id, container_url, build_mode)
            .await?;
        debug!(operation = %handle, model = model_id, "model build submitted");
        poll_operation(&self.poll, || self.build_result(&handle)).await
    }
}
