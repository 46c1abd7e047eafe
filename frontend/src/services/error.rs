use serde_json::Value;
use shared::ValidationErrors;

/// Every way a call into the back-office API can fail.
///
/// The layer never retries: the message is shown to the operator and they
/// decide whether to submit again.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error {status}: {message}")]
    Server {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid input: {0}")]
    Validation(ValidationErrors),

    #[error("Query is disabled")]
    Disabled,
}

impl ApiError {
    /// Build a server error, pulling the message out of the response body
    pub fn from_response(status: u16, text: &str) -> Self {
        let body = serde_json::from_str::<Value>(text).ok();
        let message = body
            .as_ref()
            .and_then(extract_message)
            .unwrap_or_else(|| {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    format!("Request failed with status {}", status)
                } else {
                    trimmed.to_string()
                }
            });
        ApiError::Server {
            status,
            message,
            body,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Text for a toast or inline form message
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Server { message, .. } => message.clone(),
            ApiError::Validation(errors) => errors
                .iter()
                .next()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "Invalid input".to_string()),
            other => other.to_string(),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::Decode(error.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ApiError::Decode(error.to_string())
        } else {
            ApiError::Network(error.to_string())
        }
    }
}

fn extract_message(body: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"error":"Bank name already exists"}"#, "Bank name already exists")]
    #[case(r#"{"message":"Not allowed"}"#, "Not allowed")]
    #[case(r#"{"error":"first","message":"second"}"#, "first")]
    #[case("plain failure", "plain failure")]
    #[case("", "Request failed with status 500")]
    fn test_message_extraction(#[case] body: &str, #[case] expected: &str) {
        let error = ApiError::from_response(500, body);
        assert_eq!(error.user_message(), expected);
        assert_eq!(error.status(), Some(500));
    }

    #[test]
    fn test_validation_message_is_first_error() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "Name is required");
        errors.add("value", "Value must be greater than zero");
        assert_eq!(ApiError::from(errors).user_message(), "Name is required");
    }

    #[test]
    fn test_not_found() {
        assert!(ApiError::from_response(404, "").is_not_found());
        assert!(!ApiError::Network("down".to_string()).is_not_found());
    }
}
