use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the collision engine.
///
/// Construction-time parameter problems are the only failures a host is
/// expected to see; the remaining variants mark engine bugs or numeric
/// corruption and are surfaced rather than swallowed.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid construction or population parameter.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Extraction from an empty event queue. The step loop checks for
    /// emptiness first, so this surfacing means a bug in the engine itself.
    #[error("event queue is empty")]
    EmptyQueue,

    /// Numeric corruption that would poison the run (NaN event time, event
    /// time behind current time). Fatal to the run.
    #[error("numeric error: {0}")]
    Numeric(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let e = Error::InvalidConfig("radius must be > 0".to_string());
        let msg = format!("{e}");
        assert!(msg.contains("invalid configuration"));
        assert!(msg.contains("radius"));
    }

    #[test]
    fn empty_queue_display() {
        let msg = Error::EmptyQueue.to_string();
        assert!(msg.contains("empty"));
    }
}
