//! Agent error types.

/// Errors reported by an automation agent or its driver.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Agent resources could not be allocated (browser launch, context).
    #[error("agent initialization failed: {0}")]
    Initialization(String),

    /// An automation step failed against the target site.
    #[error("automation step failed: {0}")]
    Automation(String),

    /// The blocking worker task panicked or was aborted.
    #[error("worker task failed: {0}")]
    Worker(String),
}

impl AgentError {
    /// Error category string for log fields.
    pub fn category(&self) -> &str {
        match self {
            Self::Initialization(_) => "initialization",
            Self::Automation(_) => "automation",
            Self::Worker(_) => "worker",
        }
    }
}
