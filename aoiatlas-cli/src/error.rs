//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;
use aoiatlas::arcgis::ArcGisError;
use aoiatlas::resolver::ResolveError;
use aoiatlas::service::ReportError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Failed to create the report service
    ServiceCreation(ArcGisError),
    /// Failed to resolve the requested AOI
    Resolve(ResolveError),
    /// Failed to assemble the report
    Report(ReportError),
    /// Failed to serialize the output
    Serialize(serde_json::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Resolve(ResolveError::StateNotFound(_)) => {
                eprintln!();
                eprintln!("The state name must match the boundary dataset, for example:");
                eprintln!("  aoiatlas --state \"Tripura\" --district \"Dhalai\"");
            }
            CliError::ServiceCreation(_) => {
                eprintln!();
                eprintln!("Check your network configuration and ARCGIS_* environment variables.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::ServiceCreation(e) => write!(f, "Failed to create report service: {}", e),
            CliError::Resolve(e) => write!(f, "Failed to resolve AOI: {}", e),
            CliError::Report(e) => write!(f, "Failed to assemble report: {}", e),
            CliError::Serialize(e) => write!(f, "Failed to serialize output: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ServiceCreation(e) => Some(e),
            CliError::Resolve(e) => Some(e),
            CliError::Report(e) => Some(e),
            CliError::Serialize(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CliError::LoggingInit("disk full".to_string());
        assert_eq!(err.to_string(), "Failed to initialize logging: disk full");

        let err = CliError::Resolve(ResolveError::StateNotFound("Atlantis".to_string()));
        assert_eq!(
            err.to_string(),
            "Failed to resolve AOI: state 'Atlantis' not found"
        );
    }

    #[test]
    fn test_error_sources() {
        use std::error::Error;
        let err = CliError::LoggingInit("oops".to_string());
        assert!(err.source().is_none());

        let err = CliError::Resolve(ResolveError::MissingState);
        assert!(err.source().is_some());
    }
}
