use thiserror::Error;

/// Errors produced by the mudlink engine and its stores.
#[derive(Debug, Error)]
pub enum MudError {
    #[error("cannot resolve {0}")]
    Resolve(String),

    #[error("connect error: {0}")]
    Connect(String),

    #[error("timeout")]
    Timeout,

    #[error("connection closed")]
    Closed,

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("credential store error: {0}")]
    Credential(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl MudError {
    /// Whether this failure should trigger the one-shot fallback to the
    /// alternate transport.
    pub fn is_timeout_class(&self) -> bool {
        match self {
            MudError::Timeout => true,
            MudError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for MudError {
    fn from(e: serde_json::Error) -> Self {
        MudError::Persistence(e.to_string())
    }
}

pub type MudResult<T> = Result<T, MudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_timeout_class() {
        assert!(MudError::Timeout.is_timeout_class());
    }

    #[test]
    fn io_timed_out_is_timeout_class() {
        let e = MudError::from(std::io::Error::from(std::io::ErrorKind::TimedOut));
        assert!(e.is_timeout_class());
    }

    #[test]
    fn refused_is_not_timeout_class() {
        let e = MudError::from(std::io::Error::from(std::io::ErrorKind::ConnectionRefused));
        assert!(!e.is_timeout_class());
        assert!(!MudError::Resolve("nowhere.invalid".into()).is_timeout_class());
    }
}
