//! Azure AI service client implementations

use crate::ClientError;
use serde::Deserialize;

pub mod document;
pub mod language;
pub mod openai;
pub mod vision;

pub use document::DocumentIntelligence;
pub use language::{Luis, QnaMaker, TextAnalytics};
pub use openai::AzureOpenAi;
pub use vision::ComputerVision;

/// Validate a resource endpoint and strip any trailing slash.
///
/// Endpoints arrive from user configuration in both
/// `https://resource.cognitiveservices.azure.com` and `.../` forms; the
/// clients join paths onto them, so the slash has to go.
pub(crate) fn normalize_endpoint(endpoint: String) -> Result<String, ClientError> {
    let trimmed = endpoint.trim_end_matches('/');
    if !trimmed.starts_with("https://") && !trimmed.starts_with("http://") {
        return Err(ClientError::config(
            format!("endpoint must be an absolute URL, got '{}'", endpoint),
            Some("endpoint".to_string()),
        ));
    }
    Ok(trimmed.to_string())
}

/// Error payload Azure services embed in failed operation responses
#[derive(Debug, Deserialize)]
pub(crate) struct ServiceError {
    pub code: Option<String>,
    pub message: String,
}

impl ServiceError {
    pub fn reason(&self) -> String {
        match &self.code {
            Some(code) => format!("{}: {}", code, self.message),
            None => self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint_strips_trailing_slash() {
        let endpoint =
            normalize_endpoint("https://my-resource.cognitiveservices.azure.com/".to_string())
                .unwrap();
        assert_eq!(endpoint, "https://my-resource.cognitiveservices.azure.com");
    }

    #[test]
    fn test_normalize_endpoint_rejects_bare_hostname() {
        let err = normalize_endpoint("my-resource.cognitiveservices.azure.com".to_string());
        assert!(matches!(err, Err(ClientError::Configuration(_))));
    }

    #[test]
    fn test_service_error_reason() {
        let err = ServiceError {
            code: Some("InvalidRequest".to_string()),
            message: "the source is unreachable".to_string(),
        };
        assert_eq!(err.reason(), "InvalidRequest: the source is unreachable");
    }
}
