#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the prgraph crate."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.
//!
//! Variants fall into two groups. [`Error::Config`] and the I/O and parsing
//! variants are fatal for a whole run and surface before any request is
//! made. [`Error::Fetch`] and [`Error::Classification`] fail a single target
//! and are collected by the pipeline while sibling targets keep running.

use std::path::{Path, PathBuf};

/// Unified error type returned by the pipeline, configuration loader and CLI.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// Invalid targets string or run settings.
    #[error("invalid configuration: {message}")]
    Config {
        /// Human readable message describing the configuration problem.
        message: String
    },
    /// Remote API failure that could not be recovered by retrying.
    #[error("fetch failed ({status}): {message}")]
    Fetch {
        /// Last HTTP status observed, when the failure carried one.
        status:  FetchStatus,
        /// Human readable description of the failure.
        message: String
    },
    /// Malformed event data returned by the remote API.
    #[error("malformed contribution data: {message}")]
    Classification {
        /// Description of the offending record.
        message: String
    },
    /// Wraps I/O errors that occur while reading configuration or writing
    /// datasets.
    #[error("i/o failure at {path:?}: {source}")]
    Io {
        /// Location of the file being accessed.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Wraps YAML decoding errors.
    #[error("failed to parse configuration: {source}")]
    Parse {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error
    },
    /// Wraps serialization errors when writing datasets.
    #[error("failed to serialize datasets: {source}")]
    Serialize {
        /// Underlying serialization error.
        source: serde_json::Error
    },
    /// Returned when the HTTP client cannot be constructed.
    #[error("failed to initialize GitHub client: {message}")]
    Client {
        /// Human readable message describing the failure.
        message: String
    }
}

/// Last HTTP status observed before a fetch gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchStatus(pub Option<u16>);

impl FetchStatus {
    /// Returns the raw status code, if any.
    pub fn code(self) -> Option<u16> {
        self.0
    }
}

impl std::fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(code) => write!(f, "status {code}"),
            None => f.write_str("no status")
        }
    }
}

impl Error {
    /// Constructs a configuration error from the provided message.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the configuration problem.
    pub fn config<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Config {
            message: message.into()
        }
    }

    /// Constructs a fetch error carrying the last observed status.
    pub fn fetch<M>(status: Option<u16>, message: M) -> Self
    where
        M: Into<String>
    {
        Self::Fetch {
            status:  FetchStatus(status),
            message: message.into()
        }
    }

    /// Constructs a classification error for malformed remote data.
    pub fn classification<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Classification {
            message: message.into()
        }
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// The returned string matches the [`std::fmt::Display`] implementation.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Parse {
            source
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialize {
            source
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn config_constructor_populates_message() {
        let error = Error::config("something went wrong");
        match error {
            Error::Config {
                ref message
            } => {
                assert_eq!(message, "something went wrong");
            }
            other => panic!("expected config error, got {other:?}")
        }
    }

    #[test]
    fn fetch_error_display_includes_status() {
        let error = Error::fetch(Some(502), "bad gateway");
        assert_eq!(error.to_string(), "fetch failed (status 502): bad gateway");
    }

    #[test]
    fn fetch_error_display_reports_missing_status() {
        let error = Error::fetch(None, "connection reset");
        assert_eq!(error.to_string(), "fetch failed (no status): connection reset");
    }

    #[test]
    fn fetch_error_exposes_status_code() {
        match Error::fetch(Some(403), "rate limited") {
            Error::Fetch {
                status, ..
            } => assert_eq!(status.code(), Some(403)),
            other => panic!("expected fetch error, got {other:?}")
        }
    }

    #[test]
    fn to_display_string_matches_display() {
        let error = Error::classification("display me");
        assert_eq!(error.to_string(), error.to_display_string());
    }

    #[test]
    fn io_error_helper_wraps_path_and_source() {
        let path = std::path::Path::new("/tmp/prgraph.yaml");
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error = super::io_error(path, io_error);

        match error {
            Error::Io {
                path: ref stored_path,
                ref source
            } => {
                assert_eq!(stored_path, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected io error, got {other:?}")
        }
    }

    #[test]
    fn serde_yaml_conversion_maps_to_parse_variant() {
        let error = serde_yaml::from_str::<usize>("not-a-number").unwrap_err();
        let mapped: Error = error.into();
        assert!(matches!(mapped, Error::Parse { .. }));
    }

    #[test]
    fn serde_json_conversion_maps_to_serialize_variant() {
        let invalid = serde_json::from_str::<serde_json::Value>("not-json").unwrap_err();
        let mapped: Error = invalid.into();
        assert!(matches!(mapped, Error::Serialize { .. }));
    }
}
