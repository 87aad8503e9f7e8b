use thiserror::Error;

/// Errors returned by event bus operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// An operation was attempted before `init` established the channel.
    #[error("event bus was not initialized; call init() first")]
    Uninitialized,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The broadcast transport refused a subscription or a topic.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_display() {
        let err = BusError::Uninitialized;
        assert!(err.to_string().contains("init()"));
    }

    #[test]
    fn test_invalid_argument_display() {
        let err = BusError::InvalidArgument("receiver id contains '/'".to_string());
        assert_eq!(err.to_string(), "invalid argument: receiver id contains '/'");
    }

    #[test]
    fn test_transport_error_display() {
        let err = BusError::Transport("malformed topic".to_string());
        assert_eq!(err.to_string(), "transport error: malformed topic");
    }
}
