//! Error types for change notification operations

use thiserror::Error;

/// Change notification errors
#[derive(Error, Debug)]
pub enum InvalidationError {
    /// Redis connection or operation error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Message serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid message format received
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    /// Callback execution failed
    #[error("Callback execution failed: {0}")]
    CallbackFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChangeNotification, InteractionTable};

    #[test]
    fn test_unknown_table_is_invalid_message() {
        let err = "tips".parse::<InteractionTable>().unwrap_err();
        assert!(matches!(err, InvalidationError::InvalidMessage(_)));
        assert_eq!(
            err.to_string(),
            "Invalid message format: Unknown interaction table: tips"
        );
    }

    #[test]
    fn test_notification_missing_table_is_serialization_error() {
        let payload = r#"{"message_id":"m-1","user_id":null,"action":"Insert"}"#;
        let err: InvalidationError = serde_json::from_str::<ChangeNotification>(payload)
            .unwrap_err()
            .into();

        assert!(matches!(err, InvalidationError::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization error:"));
    }

    #[test]
    fn test_rejected_invalidation_display() {
        let err = InvalidationError::CallbackFailed("interaction cache unavailable".to_string());
        assert_eq!(
            err.to_string(),
            "Callback execution failed: interaction cache unavailable"
        );
    }
}
