//! Errors raised by the command-line front end.

use podupu_core::PodupuError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// A write command was run without a saved session.
    #[error("Not signed in: {0}")]
    NotSignedIn(String),

    /// The saved session's access token has expired.
    #[error("Session expired")]
    SessionExpired,

    #[error(transparent)]
    Core(#[from] PodupuError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CliResult<T> = std::result::Result<T, CliError>;

impl CliError {
    /// The line printed to stderr before exiting.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotSignedIn(action) => format!("Login to {action}. Run `podupu login` first."),
            Self::SessionExpired => "Your session has expired. Run `podupu login` again.".to_string(),
            Self::Core(e) => e.user_message(),
            Self::Io(e) => format!("File error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_messages_pass_through() {
        let e: CliError =
            PodupuError::Validation("Question and Answer are required.".to_string()).into();
        assert_eq!(e.user_message(), "Question and Answer are required.");
    }

    #[test]
    fn test_not_signed_in_names_the_action() {
        let e = CliError::NotSignedIn("add riddles".to_string());
        assert_eq!(e.user_message(), "Login to add riddles. Run `podupu login` first.");
    }
}
