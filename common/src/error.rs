use serde::Serialize;

/// The JSON body every `ResponseError` implementation in this workspace
/// renders for a failed request, kept deliberately small: an error code a
/// client can match on, a human message, and optional details.
#[derive(Debug, Serialize)]
pub struct ErrorInformation {
    pub error: String,
    pub message: String,
    pub details: Option<String>,
}

impl ErrorInformation {
    pub fn new(error: impl Into<String>, message: impl ToString) -> Self {
        Self {
            error: error.into(),
            message: message.to_string(),
            details: None,
        }
    }
}
