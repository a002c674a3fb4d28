//! Error types for the Azure AI client library

use std::fmt;

/// Errors that can occur when calling Azure AI services
#[derive(Debug)]
pub enum ClientError {
    /// Network-related errors (timeouts, connection failures, etc.)
    Network(NetworkError),
    /// API-specific errors (invalid responses, rate limits, etc.)
    Api(ApiError),
    /// Authentication errors (invalid subscription keys, etc.)
    Authentication(AuthError),
    /// Configuration errors (invalid endpoints or parameters)
    Configuration(ConfigError),
    /// Response parsing errors
    Parse(ParseError),
    /// Long-running operation errors (remote failure, timeout, polling trouble)
    Operation(OperationError),
}

/// Network-related error details
#[derive(Debug)]
pub struct NetworkError {
    pub message: String,
    pub error_type: NetworkErrorType,
}

#[derive(Debug)]
pub enum NetworkErrorType {
    Timeout,
    ConnectionFailed,
    Other,
}

/// API-related error details
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: Option<u16>,
    pub error_type: ApiErrorType,
}

#[derive(Debug)]
pub enum ApiErrorType {
    RateLimit,
    ServerError,
    BadRequest,
    Other,
}

/// Authentication error details
#[derive(Debug)]
pub struct AuthError {
    pub message: String,
    pub error_type: AuthErrorType,
}

#[derive(Debug)]
pub enum AuthErrorType {
    InvalidApiKey,
    Other,
}

/// Configuration error details
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub parameter: Option<String>,
}

/// Parse error details
#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    pub error_type: ParseErrorType,
}

#[derive(Debug)]
pub enum ParseErrorType {
    JsonParsing,
    MissingField,
    InvalidFormat,
}

/// Long-running operation error details
#[derive(Debug)]
pub struct OperationError {
    pub message: String,
    pub error_type: OperationErrorType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationErrorType {
    /// The remote job reported failure
    Failed,
    /// The remote job was cancelled on the service side
    Cancelled,
    /// The polling budget was exhausted while the job was still in flight
    TimedOut,
    /// Transient transport errors exhausted the per-check retry budget
    Polling,
}

impl ClientError {
    /// Create a timeout network error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Network(NetworkError {
            message: message.into(),
            error_type: NetworkErrorType::Timeout,
        })
    }

    /// Create a rate limit API error
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::Api(ApiError {
            message: message.into(),
            status_code: Some(429),
            error_type: ApiErrorType::RateLimit,
        })
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>, parameter: Option<String>) -> Self {
        Self::Configuration(ConfigError {
            message: message.into(),
            parameter,
        })
    }

    /// Create a missing-field parse error
    pub fn missing_field(message: impl Into<String>) -> Self {
        Self::Parse(ParseError {
            message: message.into(),
            error_type: ParseErrorType::MissingField,
        })
    }

    /// Create an invalid-format parse error
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::Parse(ParseError {
            message: message.into(),
            error_type: ParseErrorType::InvalidFormat,
        })
    }

    /// Create an error for a remote job that reported failure
    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::Operation(OperationError {
            message: message.into(),
            error_type: OperationErrorType::Failed,
        })
    }

    /// Create an error for a remote job cancelled on the service side
    pub fn operation_cancelled(message: impl Into<String>) -> Self {
        Self::Operation(OperationError {
            message: message.into(),
            error_type: OperationErrorType::Cancelled,
        })
    }

    /// Create an error for a poll that exhausted its attempt budget
    pub fn operation_timed_out(attempts: u32) -> Self {
        Self::Operation(OperationError {
            message: format!(
                "operation still not terminal after {} status checks",
                attempts
            ),
            error_type: OperationErrorType::TimedOut,
        })
    }

    /// Create an error for a status check that kept failing at the transport level
    pub fn polling(message: impl Into<String>) -> Self {
        Self::Operation(OperationError {
            message: message.into(),
            error_type: OperationErrorType::Polling,
        })
    }

    /// Whether retrying the same request may reasonably succeed.
    ///
    /// Covers transport-level trouble and the HTTP statuses Azure documents
    /// as retryable (429 and 5xx). Remote job failures are never transient:
    /// the job itself is done, and retrying the status check changes nothing.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Network(net_err) => matches!(
                net_err.error_type,
                NetworkErrorType::Timeout | NetworkErrorType::ConnectionFailed
            ),
            ClientError::Api(api_err) => matches!(
                api_err.error_type,
                ApiErrorType::RateLimit | ApiErrorType::ServerError
            ),
            _ => false,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Network(err) => write!(f, "Network error: {}", err.message),
            ClientError::Api(err) => {
                if let Some(status) = err.status_code {
                    write!(f, "API error ({}): {}", status, err.message)
                } else {
                    write!(f, "API error: {}", err.message)
                }
            }
            ClientError::Authentication(err) => write!(f, "Authentication error: {}", err.message),
            ClientError::Configuration(err) => {
                if let Some(param) = &err.parameter {
                    write!(f, "Configuration error ({}): {}", param, err.message)
                } else {
                    write!(f, "Configuration error: {}", err.message)
                }
            }
            ClientError::Parse(err) => write!(f, "Parse error: {}", err.message),
            ClientError::Operation(err) => match err.error_type {
                OperationErrorType::Failed => write!(f, "Operation failed: {}", err.message),
                OperationErrorType::Cancelled => write!(f, "Operation cancelled: {}", err.message),
                OperationErrorType::TimedOut => write!(f, "Operation timed out: {}", err.message),
                OperationErrorType::Polling => write!(f, "Polling error: {}", err.message),
            },
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            let url = err.url().map(|u| u.as_str()).unwrap_or("unknown");
            ClientError::Network(NetworkError {
                message: format!(
                    "Request to {} timed out. Consider increasing the client timeout or checking network connectivity.",
                    url
                ),
                error_type: NetworkErrorType::Timeout,
            })
        } else if err.is_connect() {
            let host = err
                .url()
                .and_then(|u| u.host_str())
                .unwrap_or("unknown host");
            ClientError::Network(NetworkError {
                message: format!(
                    "Failed to connect to {}. Check the resource endpoint and DNS resolution.",
                    host
                ),
                error_type: NetworkErrorType::ConnectionFailed,
            })
        } else if let Some(status) = err.status() {
            let status_code = status.as_u16();

            if status_code == 401 || status_code == 403 {
                ClientError::Authentication(AuthError {
                    message: "Invalid or unauthorized subscription key".to_string(),
                    error_type: AuthErrorType::InvalidApiKey,
                })
            } else if status_code == 429 {
                ClientError::Api(ApiError {
                    message: "Rate limit exceeded".to_string(),
                    status_code: Some(status_code),
                    error_type: ApiErrorType::RateLimit,
                })
            } else if status_code >= 500 {
                ClientError::Api(ApiError {
                    message: format!("Server error: {err}"),
                    status_code: Some(status_code),
                    error_type: ApiErrorType::ServerError,
                })
            } else if status_code >= 400 {
                ClientError::Api(ApiError {
                    message: format!("Bad request: {err}"),
                    status_code: Some(status_code),
                    error_type: ApiErrorType::BadRequest,
                })
            } else {
                ClientError::Api(ApiError {
                    message: format!("HTTP {status}: {err}"),
                    status_code: Some(status_code),
                    error_type: ApiErrorType::Other,
                })
            }
        } else {
            ClientError::Network(NetworkError {
                message: err.to_string(),
                error_type: NetworkErrorType::Other,
            })
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Parse(ParseError {
            message: format!("JSON parsing failed: {err}"),
            error_type: ParseErrorType::JsonParsing,
        })
    }
}
