/// Crate-wide result alias.
pub type ReplayResult<T> = Result<T, ReplayError>;

/// Failures while obtaining a trace from the algorithm backend.
///
/// None of these leave engine state touched: a trace is only handed to the engine after it was
/// fully decoded and validated.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    /// The caller asked for something the adapter refuses to send (e.g. an empty algorithm name).
    #[error("invalid trace request: {0}")]
    InvalidRequest(String),

    /// Transport failure, non-success status, or a backend-reported `error` field.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The response arrived but does not have the required shape.
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),
}

impl TraceError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}

/// Failures raised by the replay engine while applying a trace.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// An action references a cell outside the working array. Fatal to the playback session.
    #[error("action at position {position} references index {index}, array length is {len}")]
    IndexOutOfRange {
        position: usize,
        index: usize,
        len: usize,
    },

    #[error("playback interval must be non-zero")]
    InvalidInterval,
}

#[derive(thiserror::Error, Debug)]
pub enum ReplayError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReplayError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Return the engine error this wraps, if any.
    pub fn as_engine(&self) -> Option<&EngineError> {
        match self {
            Self::Engine(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ReplayError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(ReplayError::render("x").to_string().contains("render error:"));
        assert!(ReplayError::encode("x").to_string().contains("encode error:"));
        assert!(
            TraceError::malformed("x")
                .to_string()
                .contains("malformed backend response:")
        );
        assert!(
            TraceError::backend_unavailable("x")
                .to_string()
                .contains("backend unavailable:")
        );
    }

    #[test]
    fn engine_errors_pass_through_transparently() {
        let err = ReplayError::from(EngineError::IndexOutOfRange {
            position: 3,
            index: 9,
            len: 4,
        });
        assert_eq!(
            err.to_string(),
            "action at position 3 references index 9, array length is 4"
        );
        assert!(err.as_engine().is_some());
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ReplayError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
