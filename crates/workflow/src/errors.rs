use thiserror::Error;

/// Workflow error taxonomy.
///
/// `Validation` never reaches the network; `Transport` means neither the
/// primary nor the fallback call reached the server and a retry may help;
/// `Rejected` is a business-level refusal from the record system and must
/// not be blindly retried; `Verification` is recoverable by re-initiating
/// the identity flow.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(#[from] domain::Error),

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Rejected by record system: {message}")]
    Rejected {
        message: String,
        details: Option<String>,
    },

    #[error("Verification error: {message}")]
    Verification { message: String },

    #[error("Session store error: {message}")]
    Store { message: String },
}

impl Error {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>, details: Option<String>) -> Self {
        Self::Rejected {
            message: message.into(),
            details,
        }
    }

    pub fn verification(message: impl Into<String>) -> Self {
        Self::Verification {
            message: message.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// The inline message rendered next to the triggering action: the
    /// remote-provided text plus any structured details, verbatim.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected {
                message,
                details: Some(details),
            } => format!("{message} ({details})"),
            other => other.to_string(),
        }
    }
}
