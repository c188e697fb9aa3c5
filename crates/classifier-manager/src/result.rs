//! Result envelope relayed to clients

use crate::ClassifierError;
use serde::{Deserialize, Serialize};

/// Outcome of a lifecycle operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Ok,
    Error,
}

/// Uniform `{status, message, value}` envelope for train/predict/delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierResult {
    pub status: ResultStatus,
    pub message: String,
    /// Predicted label for predict; null otherwise
    pub value: Option<String>,
}

impl ClassifierResult {
    /// Successful result without a payload
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Ok,
            message: message.into(),
            value: None,
        }
    }

    /// Successful result carrying a value
    pub fn ok_with(message: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Ok,
            message: message.into(),
            value: Some(value.into()),
        }
    }

    /// Failed result
    pub fn error(err: &ClassifierError) -> Self {
        Self {
            status: ResultStatus::Error,
            message: err.to_string(),
            value: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResultStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let result = ClassifierResult::ok_with("Prediction made", "occupied");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "ok", "message": "Prediction made", "value": "occupied"})
        );

        let failed = ClassifierResult::error(&ClassifierError::NoSamples("s1".to_string()));
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json["value"].is_null());
        assert!(!failed.is_ok());
    }
}
