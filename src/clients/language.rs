//! Language service clients: Text Analytics entity recognition, QnA Maker
//! answer lookup, and LUIS intent prediction.
//!
//! All three are synchronous request/response APIs; none of them involve
//! the long-running-operation poller.

use crate::{execute_with_retry, ClientConfig, ClientError, QueryClient};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Client for Text Analytics named entity recognition
pub struct TextAnalytics {
    http: Client,
    endpoint: String,
    key: String,
    /// ISO 639-1 language hint sent with every document
    language: String,
    retries: u32,
}

/// Entities recognized in one input document
#[derive(Debug, Deserialize)]
pub struct DocumentEntities {
    pub id: String,
    pub entities: Vec<Entity>,
}

/// A single recognized entity
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub text: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    pub confidence_score: f64,
}

impl TextAnalytics {
    /// Create a new Text Analytics client (documents are assumed English;
    /// see [`with_language`](Self::with_language))
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
            language: "en".to_string(),
            retries: config.retries,
        })
    }

    /// Override the language hint sent with the documents
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Recognize named entities in a batch of documents
    pub async fn recognize_entities(
        &self,
        documents: &[&str],
    ) -> Result<Vec<DocumentEntities>, ClientError> {
        #[derive(Serialize)]
        struct Document<'a> {
            id: String,
            language: &'a str,
            text: &'a str,
        }

        #[derive(Serialize)]
        struct Request<'a> {
            documents: Vec<Document<'a>>,
        }

        #[derive(Deserialize)]
        struct DocumentError {
            id: String,
            error: super::ServiceError,
        }

        #[derive(Deserialize)]
        struct Response {
            documents: Vec<DocumentEntities>,
            #[serde(default)]
            errors: Vec<DocumentError>,
        }

        let body = Request {
            documents: documents
                .iter()
                .enumerate()
                .map(|(idx, text)| Document {
                    id: (idx + 1).to_string(),
                    language: &self.language,
                    text,
                })
                .collect(),
        };
        let target = format!(
            "{}/text/analytics/v3.1/entities/recognition/general",
            self.endpoint
        );

        execute_with_retry(self.retries, || async {
            let response = self
                .http
                .post(&target)
                .header("Ocp-Apim-Subscription-Key", &self.key)
                .json(&body)
                .send()
                .await?
                .error_for_status()?;

            let parsed: Response = response.json().await?;
            for doc_error in &parsed.errors {
                warn!(
                    document = %doc_error.id,
                    "entity recognition skipped a document: {}",
                    doc_error.error.reason()
                );
            }
            Ok(parsed.documents)
        })
        .await
    }
}

/// Client for a published QnA Maker knowledge base
pub struct QnaMaker {
    http: Client,
    endpoint: String,
    knowledge_base_id: String,
    key: String,
    retries: u32,
}

/// Best answer returned for a question
#[derive(Debug, Deserialize)]
pub struct QnaAnswer {
    pub answer: String,
    pub score: f64,
    #[serde(default)]
    pub questions: Vec<String>,
}

impl QnaMaker {
    /// Create a new QnA Maker client for one knowledge base
    pub fn new(
        http: Client,
        endpoint: impl Into<String>,
        knowledge_base_id: impl Into<String>,
        key: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http,
            endpoint: super::normalize_endpoint(endpoint.into())?,
            knowledge_base_id: knowledge_base_id.into(),
            key: key.into(),
            retries: config.retries,
        })
    }

    /// Ask the knowledge base a question and return the top-scoring answer
    pub async fn generate_answer(&self, question: &str) -> Result<QnaAnswer, ClientError> {
        #[derive(Serialize)]
        struct Request<'a> {
            question: &'a str,
        }

        #[derive(Deserialize)]
        struct Response {
            answers: Vec<QnaAnswer>,
        }

        let target = format!(
            "{}/knowledgebases/{}/generateAnswer",
            self.endpoint, self.knowledge_base_id
        );

        execute_with_retry(self.retries, || async {
            let response = self
                .http
                .post(&target)
                .header("Authorization", format!("EndpointKey {}", self.key))
                .json(&Request { question })
                .send()
                .await?
                .error_for_status()?;

            let mut parsed: Response = response.json().await?;
            if parsed.answers.is_empty() {
                return Err(ClientError::missing_field(
                    "knowledge base returned no answers",
                ));
            }
            Ok(parsed.answers.remove(0))
        })
        .await
    }
}

#[async_trait]
impl QueryClient for QnaMaker {
    async fn query(&self, input: &str) -> Result<String, ClientError> {
        Ok(self.generate_answer(input).await?.answer)
    }

    fn name(&self) -> &str {
        "QnAMaker"
    }
}

/// Client for LUIS prediction against a published app slot
pub struct Luis {
    http: Client,
    endpoint: String,
    app_id: String,
    key: String,
    slot: String,
    retries: u32,
}

/// Prediction for one utterance
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LuisPrediction {
    pub top_intent: String,
    #[serde(default)]
    pub intents: HashMap<String, IntentScore>,
    #[serde(default)]
    pub entities: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct IntentScore {
    pub score: f64,
}

impl Luis {
    /// Create a new LUIS client against the `production` slot
    pub fn new(
        http: Client,
        endpoint: impl Into<String>,
        app_id: impl Into<String>,
        key: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http,
            endpoint: super::normalize_endpoint(endpoint.into())?,
            app_id: app_id.into(),
            key: key.into(),
            slot: "production".to_string(),
            retries: config.retries,
        })
    }

    /// Target a different published slot, e.g. `staging`
    pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = slot.into();
        self
    }

    /// Predict the intent of an utterance
    pub async fn predict(&self, query: &str) -> Result<LuisPrediction, ClientError> {
        #[derive(Deserialize)]
        struct Response {
            prediction: LuisPrediction,
        }

        let target = format!(
            "{}/luis/prediction/v3.0/apps/{}/slots/{}/predict",
            self.endpoint, self.app_id, self.slot
        );

        execute_with_retry(self.retries, || async {
            let response = self
                .http
                .get(&target)
                .query(&[("query", query), ("subscription-key", &self.key)])
                .send()
                .await?
                .error_for_status()?;

            let parsed: Response = response.json().await?;
            Ok(parsed.prediction)
        })
        .await
    }
}

#[async_trait]
impl QueryClient for Luis {
    async fn query(&self, input: &str) -> Result<String, ClientError> {
        Ok(self.predict(input).await?.top_intent)
    }

    fn name(&self) -> &str {
        "LUIS"
    }
}
