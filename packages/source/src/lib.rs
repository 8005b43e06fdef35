#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Socrata dataset extraction.
//!
//! A [`socrata::SodaClient`] answers filtered queries against a dataset,
//! [`extract::extract_dataset`] pages through the results into a
//! [`table::Table`] and writes an audit CSV, and [`registry`] holds the
//! embedded definitions of the datasets this tool reads.

pub mod dataset_def;
pub mod extract;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod progress;
pub mod registry;
pub mod socrata;
pub mod table;

/// Errors that can occur while extracting a dataset.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The Socrata service answered with a non-success status.
    #[error("Socrata API error (HTTP {status}): {message}")]
    Remote {
        /// HTTP status code returned by the service.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// A dataset definition could not be parsed.
    #[error("Dataset definition error: {0}")]
    Definition(#[from] toml::de::Error),
}

impl SourceError {
    /// Returns `true` if the failure happened talking to the remote service
    /// rather than locally.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. } | Self::Http(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_remote_errors() {
        let remote = SourceError::Remote {
            status: 400,
            message: "No such column: foo".to_string(),
        };
        assert!(remote.is_remote());
        assert_eq!(
            remote.to_string(),
            "Socrata API error (HTTP 400): No such column: foo"
        );

        let io = SourceError::Io(std::io::Error::other("disk full"));
        assert!(!io.is_remote());
    }
}
